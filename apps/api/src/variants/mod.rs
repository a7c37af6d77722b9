// Variant persistence: named job-tag/template/override combinations that can
// be re-resolved against the live library at any later time.

pub mod handlers;
pub mod store;
