//! Ordered progress stream for a search run.
//!
//! The pipeline reports human-readable progress lines through an unbounded
//! channel rather than a callback. The format of the lines is informational
//! only and not part of the API contract; structured telemetry goes through
//! `tracing` instead.

use tokio::sync::mpsc;

/// Sender half of the progress stream.
///
/// Cheap to clone. Sending never blocks; once the receiver is dropped,
/// further messages are silently discarded so a disinterested caller cannot
/// stall the run.
#[derive(Clone)]
pub struct Progress {
    tx: Option<mpsc::UnboundedSender<String>>,
}

impl Progress {
    /// Create a connected progress stream.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A progress handle that discards everything.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Emit one progress line.
    pub fn log(&self, message: impl Into<String>) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(message.into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_messages_in_order() {
        let (progress, mut rx) = Progress::channel();
        progress.log("first");
        progress.log("second");
        assert_eq!(rx.recv().await.as_deref(), Some("first"));
        assert_eq!(rx.recv().await.as_deref(), Some("second"));
    }

    #[test]
    fn dropped_receiver_does_not_panic() {
        let (progress, rx) = Progress::channel();
        drop(rx);
        progress.log("into the void");
    }

    #[test]
    fn disabled_handle_is_silent() {
        Progress::disabled().log("nobody listens");
    }
}
