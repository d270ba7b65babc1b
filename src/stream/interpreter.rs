//! One embedded Lua state per stream run.
//!
//! The state's `print` is replaced with a binding that writes into the run's
//! own [`EventSink`], so output from concurrent runs never mixes.

use mlua::{Function, HookTriggers, Lua, MultiValue, Thread, Value, VmState};

use super::events::{CancelToken, EventSink};

/// Instructions between two cancellation checks inside Lua code
pub const CANCEL_CHECK_INTERVAL: u32 = 1_000;

pub const CANCELLED_MESSAGE: &str = "stream cancelled";

const CHUNK_NAME: &str = "=script";

const TRACEBACK_MARKER: &str = "\nstack traceback:";

/// Registry slot for the stock `tostring`, so scripts that reassign the
/// global still get standard conversion in `print`.
const TOSTRING_KEY: &str = "nextpad.tostring";

pub struct LuaInterpreter {
    lua: Lua,
    cancel: CancelToken,
    chunk: Option<Result<Function, String>>,
}

impl LuaInterpreter {
    pub fn new(events: EventSink, cancel: CancelToken) -> mlua::Result<Self> {
        let lua = Lua::new();

        let tostring: Function = lua.globals().get("tostring")?;
        lua.set_named_registry_value(TOSTRING_KEY, tostring)?;
        install_print(&lua, events)?;

        lua.set_hook(cancel_triggers(), cancel_hook(cancel.clone()));

        Ok(Self {
            lua,
            cancel,
            chunk: None,
        })
    }

    /// Install the cancel check on a coroutine the host is about to resume.
    /// Hooks are per Lua thread, so the main state's hook does not cover it.
    pub fn watch_thread(&self, thread: &Thread) {
        thread.set_hook(cancel_triggers(), cancel_hook(self.cancel.clone()));
    }

    /// Compile `script` without running it. A compile error is kept and
    /// reported when the chunk is taken.
    pub fn load_buffer(&mut self, script: &[u8]) {
        let compiled = self
            .lua
            .load(script)
            .set_name(CHUNK_NAME)
            .into_function()
            .map_err(|err| error_message(&err));
        self.chunk = Some(compiled);
    }

    /// The compiled chunk, or the compile error text
    pub fn take_chunk(&mut self) -> Result<Function, String> {
        self.chunk
            .take()
            .unwrap_or_else(|| Err("no script loaded".to_string()))
    }

    /// Convert a value with the interpreter's own `tostring`
    pub fn display(&self, value: Value) -> mlua::Result<Vec<u8>> {
        display(&self.lua, value)
    }

    #[cfg(test)]
    pub(crate) fn lua(&self) -> &Lua {
        &self.lua
    }
}

fn cancel_triggers() -> HookTriggers {
    HookTriggers::new().every_nth_instruction(CANCEL_CHECK_INTERVAL)
}

fn cancel_hook(
    cancel: CancelToken,
) -> impl Fn(&Lua, mlua::Debug<'_>) -> mlua::Result<VmState> + Send + 'static {
    move |_lua, _debug| {
        if cancel.is_cancelled() {
            Err(mlua::Error::RuntimeError(CANCELLED_MESSAGE.to_string()))
        } else {
            Ok(VmState::Continue)
        }
    }
}

fn install_print(lua: &Lua, events: EventSink) -> mlua::Result<()> {
    let print = lua.create_function(move |lua, args: MultiValue| {
        match format_print(lua, args) {
            Ok(Some(line)) => events.line(line),
            Ok(None) => {}
            Err(err) => events.error(error_message(&err)),
        }
        Ok(())
    })?;
    lua.globals().set("print", print)
}

/// Standard `print` formatting: arguments through `tostring`, tab separated,
/// one trailing newline. `None` when there is nothing to print.
fn format_print(lua: &Lua, args: MultiValue) -> mlua::Result<Option<Vec<u8>>> {
    if args.is_empty() {
        return Ok(None);
    }

    let mut line = Vec::new();
    for (i, value) in args.into_iter().enumerate() {
        if i > 0 {
            line.push(b'\t');
        }
        line.extend_from_slice(&display(lua, value)?);
    }
    line.push(b'\n');
    Ok(Some(line))
}

fn display(lua: &Lua, value: Value) -> mlua::Result<Vec<u8>> {
    let tostring: Function = lua.named_registry_value(TOSTRING_KEY)?;
    let text: mlua::String = tostring.call(value)?;
    Ok(text.as_bytes().to_vec())
}

/// The Lua-level message of an error, without the stack traceback
pub fn error_message(err: &mlua::Error) -> String {
    let message = match err {
        mlua::Error::SyntaxError { message, .. } => message.clone(),
        mlua::Error::RuntimeError(msg) => msg.clone(),
        mlua::Error::CallbackError { cause, .. } => return error_message(cause),
        other => other.to_string(),
    };
    let message = match message.find(TRACEBACK_MARKER) {
        Some(at) => &message[..at],
        None => &message,
    };
    message.trim_end().to_string()
}
