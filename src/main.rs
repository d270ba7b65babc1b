use std::env;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::{error, info, warn};

use nextpad::config::{ConfigEngine, SettingsStore};
use nextpad::editor::{Buffer, Workspace};
use nextpad::logging;
use nextpad::render::Renderer;
use nextpad::stream::{StreamError, StreamKind, StreamManager};

const USAGE: &str = "usage: nextpad [--kind NAME] [FILE]";

#[derive(Debug)]
struct Args {
    kind: StreamKind,
    file: Option<PathBuf>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut kind = StreamKind::Lua;
    let mut file = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--kind" => {
                let name = args.next().ok_or("--kind needs a value")?;
                kind = name.parse().map_err(|e: StreamError| e.to_string())?;
            }
            _ if file.is_none() => file = Some(PathBuf::from(arg)),
            _ => return Err(format!("unexpected argument '{}'", arg)),
        }
    }

    Ok(Args { kind, file })
}

/// Settings file plus `init.rhai`. Failures fall back to defaults.
fn load_settings() -> Arc<SettingsStore> {
    let store = match SettingsStore::open_default() {
        Ok(store) => store,
        Err(err) => {
            warn!(%err, "using default settings");
            SettingsStore::in_memory()
        }
    };
    let store = Arc::new(store);

    let mut engine = ConfigEngine::new(Arc::clone(&store));
    if let Err(err) = engine.load_default() {
        warn!(%err, "failed to load init.rhai");
    }

    store
}

fn read_source(file: Option<PathBuf>) -> io::Result<Buffer> {
    match file {
        Some(path) => Buffer::from_file(path),
        None => Buffer::from_reader(io::stdin().lock()),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();

    let args = match parse_args(env::args().skip(1)) {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("nextpad: {}", msg);
            eprintln!("{}", USAGE);
            return ExitCode::from(2);
        }
    };

    let settings = load_settings();

    let buffer = match read_source(args.file) {
        Ok(buffer) => buffer,
        Err(err) => {
            error!(%err, "failed to read script");
            return ExitCode::FAILURE;
        }
    };

    let workspace = Arc::new(Workspace::new());
    let manager = StreamManager::new(workspace, Handle::current());

    let Some(stream) = manager.start_stream(Some(&buffer), args.kind) else {
        return ExitCode::FAILURE;
    };
    let tab = Arc::clone(stream.tab());
    let label = stream.label().to_string();

    let finished = stream.finished();
    tokio::pin!(finished);

    let interrupted = tokio::select! {
        outcome = &mut finished => Err(outcome),
        _ = tokio::signal::ctrl_c() => Ok(()),
    };
    let outcome = match interrupted {
        Err(outcome) => outcome,
        Ok(()) => {
            info!(stream = %label, "interrupted, stopping streams");
            manager.stop_all();
            finished.await
        }
    };

    let renderer = Renderer::new(&settings.get());
    if let Err(err) = renderer.render_tab(&tab, &mut io::stdout().lock()) {
        error!(%err, "failed to write output");
        return ExitCode::FAILURE;
    }

    info!(stream = %label, ?outcome, "stream finished");
    if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args, String> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn defaults_to_lua_on_stdin() {
        let parsed = args(&[]).unwrap();
        assert_eq!(parsed.kind, StreamKind::Lua);
        assert!(parsed.file.is_none());
    }

    #[test]
    fn kind_and_file() {
        let parsed = args(&["--kind", "LUA", "run.lua"]).unwrap();
        assert_eq!(parsed.kind, StreamKind::Lua);
        assert_eq!(parsed.file, Some(PathBuf::from("run.lua")));
    }

    #[test]
    fn bad_arguments() {
        assert!(args(&["--kind"]).is_err());
        assert!(args(&["--kind", "python"]).unwrap_err().contains("python"));
        assert!(args(&["a.lua", "b.lua"]).is_err());
    }
}
