//! Script streams: run a document as a Lua script on a worker thread and
//! stream what it prints, yields and returns into a fresh editor tab.
//!
//! - `interpreter` - one Lua state per run, with `print` captured
//! - `bridge` - the run loop on the worker thread
//! - `manager` - wires a run to its tab and worker

mod bridge;
mod error;
mod events;
mod interpreter;
mod manager;

pub use bridge::{Outcome, ScriptBridge};
pub use error::StreamError;
pub use events::{CancelToken, EventSink, StreamEvent};
pub use interpreter::LuaInterpreter;
pub use manager::{Stream, StreamKind, StreamManager};
