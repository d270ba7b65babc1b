//! Drives one script run on its worker thread.
//!
//! A script either returns a plain value, which is printed once, or a
//! coroutine, which is resumed until it finishes. Each resume emits at most
//! one value: the top of whatever the step yielded.

use mlua::{MultiValue, ThreadStatus, Value};
use tokio::sync::oneshot;
use tracing::{debug, info_span};

use super::error::Result;
use super::events::{CancelToken, EventSink};
use super::interpreter::{CANCELLED_MESSAGE, LuaInterpreter, error_message};

/// Terminal state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    /// The script did not compile
    LoadError,
    /// Running the compiled chunk failed
    CallError,
    /// A coroutine step failed
    RuntimeError,
    /// Interrupted through the run's cancel token
    Cancelled,
    /// The worker ended without reporting an outcome
    Aborted,
}

impl Outcome {
    pub fn is_success(self) -> bool {
        self == Outcome::Completed
    }
}

pub struct ScriptBridge {
    interpreter: LuaInterpreter,
    events: EventSink,
    cancel: CancelToken,
    done: oneshot::Sender<Outcome>,
}

impl ScriptBridge {
    /// Set up a fresh interpreter with `script` loaded. `done` receives the
    /// outcome once the interpreter is gone.
    pub fn new(
        script: &[u8],
        events: EventSink,
        cancel: CancelToken,
        done: oneshot::Sender<Outcome>,
    ) -> Result<Self> {
        let mut interpreter = LuaInterpreter::new(events.clone(), cancel.clone())?;
        interpreter.load_buffer(script);

        Ok(Self {
            interpreter,
            events,
            cancel,
            done,
        })
    }

    /// Run the script to a terminal state.
    ///
    /// The interpreter is dropped before `done` fires, on every path.
    pub fn process(self) -> Outcome {
        let Self {
            interpreter,
            events,
            cancel,
            done,
        } = self;

        let span = info_span!("stream_process");
        let _enter = span.enter();

        let outcome = run(interpreter, &events, &cancel);
        debug!(?outcome, "script finished");

        drop(events);
        if done.send(outcome).is_err() {
            debug!("nobody waiting for stream outcome");
        }
        outcome
    }
}

fn run(mut interpreter: LuaInterpreter, events: &EventSink, cancel: &CancelToken) -> Outcome {
    let chunk = match interpreter.take_chunk() {
        Ok(chunk) => chunk,
        Err(message) => {
            events.error(message);
            return Outcome::LoadError;
        }
    };

    if cancel.is_cancelled() {
        events.error(CANCELLED_MESSAGE);
        return Outcome::Cancelled;
    }

    let returned = match chunk.call::<MultiValue>(()) {
        Ok(values) => values,
        Err(err) => return fail(events, cancel, &err, Outcome::CallError),
    };

    // A chunk without a return statement yields nil, like any other value
    let thread = match returned.into_iter().next().unwrap_or(Value::Nil) {
        Value::Thread(thread) => thread,
        value => {
            return match interpreter.display(value) {
                Ok(text) => {
                    events.line(text);
                    Outcome::Completed
                }
                Err(err) => fail(events, cancel, &err, Outcome::RuntimeError),
            };
        }
    };

    interpreter.watch_thread(&thread);

    loop {
        if cancel.is_cancelled() {
            events.error(CANCELLED_MESSAGE);
            return Outcome::Cancelled;
        }

        match thread.resume::<MultiValue>(()) {
            Ok(values) => {
                if let Some(top) = values.into_iter().last() {
                    match interpreter.display(top) {
                        Ok(text) => events.line(text),
                        Err(err) => events.error(error_message(&err)),
                    }
                }
                if thread.status() != ThreadStatus::Resumable {
                    return Outcome::Completed;
                }
            }
            Err(err) => return fail(events, cancel, &err, Outcome::RuntimeError),
        }
    }
}

fn fail(events: &EventSink, cancel: &CancelToken, err: &mlua::Error, outcome: Outcome) -> Outcome {
    if cancel.is_cancelled() {
        events.error(CANCELLED_MESSAGE);
        Outcome::Cancelled
    } else {
        events.error(error_message(err));
        outcome
    }
}
