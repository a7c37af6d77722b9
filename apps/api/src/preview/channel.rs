//! Per-channel debounce timer and request fencing.
//!
//! Each output channel keeps one monotonically increasing token. Scheduling a
//! recomputation resets the pending timer and issues a new token; a result is
//! applied only if the token it was issued under is still the current one.
//! In-flight calls are never aborted, only outdated.

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::errors::PreviewFailure;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    /// Structured-data preview (rules-engine payload → reconciliation).
    Data,
    /// Rendered-document preview.
    Document,
}

impl std::str::FromStr for ChannelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "data" => Ok(ChannelKind::Data),
            "document" => Ok(ChannelKind::Document),
            other => Err(format!("Unknown channel '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelStatus {
    pub loading: bool,
    pub error: Option<PreviewFailure>,
}

#[derive(Debug, Default)]
pub struct Channel {
    token: u64,
    timer: Option<JoinHandle<()>>,
    loading: bool,
    error: Option<PreviewFailure>,
}

impl Channel {
    /// Cancels any pending timer and outdates every in-flight request.
    pub fn invalidate(&mut self) -> u64 {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.token += 1;
        self.loading = false;
        self.token
    }

    /// Installs the debounce timer for the request issued under `token`.
    pub fn arm(&mut self, token: u64, timer: JoinHandle<()>) {
        debug_assert_eq!(token, self.token);
        self.timer = Some(timer);
    }

    pub fn is_current(&self, token: u64) -> bool {
        self.token == token
    }

    pub fn token(&self) -> u64 {
        self.token
    }

    /// Marks the request issued under `token` as on the wire.
    pub fn begin(&mut self, token: u64) -> bool {
        if !self.is_current(token) {
            return false;
        }
        self.loading = true;
        self.error = None;
        true
    }

    /// Records the outcome of the request issued under `token`. Returns false,
    /// leaving the channel untouched, when a newer request has been issued.
    pub fn finish(&mut self, token: u64, error: Option<PreviewFailure>) -> bool {
        if !self.is_current(token) {
            return false;
        }
        self.loading = false;
        self.error = error;
        true
    }

    pub fn status(&self) -> ChannelStatus {
        ChannelStatus {
            loading: self.loading,
            error: self.error.clone(),
        }
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}
