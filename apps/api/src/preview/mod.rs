// Preview orchestration: per-session state machine (LIVE / VARIANT) driving
// the reconciliation engine from debounced, fenced rules-engine calls.

pub mod channel;
#[cfg(test)]
pub mod fakes;
pub mod handlers;
pub mod registry;
pub mod session;
pub mod theme;
