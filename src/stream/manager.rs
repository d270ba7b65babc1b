use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use super::bridge::{Outcome, ScriptBridge};
use super::error::StreamError;
use super::events::{CancelToken, EventSink, StreamEvent};
use crate::editor::{Buffer, Tab, Workspace};

/// What kind of stream to start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    /// Run the source document as a Lua script
    Lua,
}

impl StreamKind {
    pub fn label(self) -> &'static str {
        match self {
            StreamKind::Lua => "Lua",
        }
    }

    pub fn requires_document(self) -> bool {
        match self {
            StreamKind::Lua => true,
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for StreamKind {
    type Err = StreamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lua" => Ok(StreamKind::Lua),
            _ => Err(StreamError::UnknownKind(s.to_string())),
        }
    }
}

type ActiveRuns = Arc<Mutex<HashMap<usize, CancelToken>>>;

/// Starts script streams and keeps track of the ones still running
pub struct StreamManager {
    workspace: Arc<Workspace>,
    runtime: Handle,
    next_number: AtomicUsize,
    active: ActiveRuns,
}

/// A started stream
pub struct Stream {
    tab: Arc<Tab>,
    label: String,
    finished: oneshot::Receiver<Outcome>,
}

impl Stream {
    /// The tab receiving this stream's output
    pub fn tab(&self) -> &Arc<Tab> {
        &self.tab
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Wait for the run to end. Every event of the run is in the tab by the
    /// time this resolves.
    pub async fn finished(self) -> Outcome {
        self.finished.await.unwrap_or(Outcome::Aborted)
    }
}

impl StreamManager {
    pub fn new(workspace: Arc<Workspace>, runtime: Handle) -> Self {
        Self {
            workspace,
            runtime,
            next_number: AtomicUsize::new(0),
            active: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Start streaming `source` into a new tab named after `kind`.
    ///
    /// Returns immediately; the script runs on its own worker thread.
    /// `None` when `kind` needs a document and there is none.
    pub fn start_stream(&self, source: Option<&Buffer>, kind: StreamKind) -> Option<Stream> {
        info!(%kind, "starting stream");

        if kind.requires_document() && source.is_none() {
            warn!(%kind, "unable to start stream without editor");
            return None;
        }

        let script = source.map(Buffer::text_bytes).unwrap_or_default();
        let number = self.next_number.fetch_add(1, Ordering::Relaxed);
        let label = format!("{}({})", kind.label(), number);

        let (events, rx) = EventSink::channel();
        let (done_tx, done_rx) = oneshot::channel();
        let cancel = CancelToken::new();

        let bridge = match ScriptBridge::new(&script, events, cancel.clone(), done_tx) {
            Ok(bridge) => bridge,
            Err(err) => {
                error!(stream = %label, error = %err, "failed to create stream");
                return None;
            }
        };

        let tab = self.workspace.create_editor(&label);
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(number, cancel);

        let (finished_tx, finished_rx) = oneshot::channel();
        self.runtime.spawn(relay(
            rx,
            done_rx,
            Arc::clone(&tab),
            label.clone(),
            number,
            Arc::clone(&self.active),
            finished_tx,
        ));

        // The worker detaches; it is gone once `process` returns.
        let spawned = std::thread::Builder::new()
            .name(format!("stream-{number}"))
            .spawn(move || {
                bridge.process();
            });
        if let Err(err) = spawned.map_err(StreamError::Spawn) {
            error!(stream = %label, error = %err, "stream worker not started");
        }

        Some(Stream {
            tab,
            label,
            finished: finished_rx,
        })
    }

    /// Ask every running stream to stop. Does not wait for them.
    pub fn stop_all(&self) {
        let active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        info!(count = active.len(), "stopping all streams");
        for cancel in active.values() {
            cancel.cancel();
        }
    }

    /// Streams that have not finished yet
    pub fn active_count(&self) -> usize {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Moves one run's events into its tab, in order, then reports the outcome.
async fn relay(
    mut events: mpsc::UnboundedReceiver<StreamEvent>,
    done: oneshot::Receiver<Outcome>,
    tab: Arc<Tab>,
    label: String,
    number: usize,
    active: ActiveRuns,
    finished: oneshot::Sender<Outcome>,
) {
    while let Some(event) = events.recv().await {
        match event {
            StreamEvent::LineReady(bytes) => tab.append_bytes(&bytes),
            StreamEvent::Error(message) => {
                tab.append_error(&message);
                warn!(stream = %label, error = %message, "stream error");
            }
        }
    }

    let outcome = match done.await {
        Ok(outcome) => outcome,
        Err(_) => {
            tab.append_error("stream worker terminated abnormally");
            Outcome::Aborted
        }
    };

    active
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(&number);
    info!(stream = %label, ?outcome, "stream finished");
    let _ = finished.send(outcome);
}
