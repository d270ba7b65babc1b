use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tracing::trace;

/// One unit of streamed output, in emission order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    LineReady(Vec<u8>),
    Error(String),
}

/// Sending half of a run's output channel.
///
/// Every clone feeds the same ordered channel; the run is over for the
/// receiver once all clones are dropped.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<StreamEvent>,
}

impl EventSink {
    pub fn new(tx: mpsc::UnboundedSender<StreamEvent>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<StreamEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn line(&self, bytes: impl Into<Vec<u8>>) {
        self.send(StreamEvent::LineReady(bytes.into()));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.send(StreamEvent::Error(message.into()));
    }

    fn send(&self, event: StreamEvent) {
        if self.tx.send(event).is_err() {
            trace!("stream receiver gone, dropping output");
        }
    }
}

/// Interrupt flag shared between a run and whoever may stop it
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_arrive_in_send_order() {
        let (sink, mut rx) = EventSink::channel();
        let clone = sink.clone();
        sink.line("a");
        clone.error("b");
        sink.line(b"c".to_vec());
        drop((sink, clone));

        assert_eq!(rx.try_recv().unwrap(), StreamEvent::LineReady(b"a".to_vec()));
        assert_eq!(rx.try_recv().unwrap(), StreamEvent::Error("b".to_string()));
        assert_eq!(rx.try_recv().unwrap(), StreamEvent::LineReady(b"c".to_vec()));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn send_after_receiver_dropped_is_silent() {
        let (sink, rx) = EventSink::channel();
        drop(rx);
        sink.line("nobody listens");
    }

    #[test]
    fn cancel_is_shared_between_clones() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }
}
