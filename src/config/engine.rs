use std::path::{Path, PathBuf};
use std::sync::Arc;

use rhai::{Engine, Scope};
use tracing::info;

use super::SettingsStore;
use super::error::{ConfigError, Result};

/// Registers `set_<name>(bool)` and `get_<name>()` for boolean settings
macro_rules! register_bool_settings {
    ($engine:expr, $store:expr, $($field:ident),+ $(,)?) => {
        $(
            {
                let s = Arc::clone($store);
                $engine.register_fn(concat!("set_", stringify!($field)), move |enabled: bool| {
                    s.update(|settings| settings.$field = enabled);
                });
            }
            {
                let s = Arc::clone($store);
                $engine.register_fn(concat!("get_", stringify!($field)), move || -> bool {
                    s.get().$field
                });
            }
        )+
    };
}

/// The Rhai scripting engine for configuration
pub struct ConfigEngine {
    engine: Engine,
    store: Arc<SettingsStore>,
}

impl ConfigEngine {
    pub fn new(store: Arc<SettingsStore>) -> Self {
        let engine = Self::create_engine(&store);
        Self { engine, store }
    }

    fn create_engine(store: &Arc<SettingsStore>) -> Engine {
        let mut engine = Engine::new();

        // Limit script execution for safety
        engine.set_max_expr_depths(64, 64);
        engine.set_max_operations(100_000);

        register_bool_settings!(
            engine,
            store,
            show_menu_bar,
            show_tool_bar,
            show_tab_bar,
            show_status_bar,
            tabs_closable,
            exit_on_last_tab_closed,
            combine_search_results,
            restore_previous_session,
            restore_unsaved_files,
            restore_temp_files,
            show_whitespace,
            show_end_of_line,
            show_wrap_symbol,
            show_indent_guide,
            word_wrap,
            show_line_numbers,
            auto_indent,
            insert_spaces,
        );

        {
            let s = Arc::clone(store);
            engine.register_fn("set_tab_width", move |width: i64| {
                s.update(|settings| settings.set_tab_width(width));
            });
        }

        {
            let s = Arc::clone(store);
            engine.register_fn("get_tab_width", move || -> i64 { s.get().tab_width as i64 });
        }

        {
            let s = Arc::clone(store);
            engine.register_fn("set_translation", move |locale: &str| {
                s.update(|settings| settings.translation = locale.to_string());
            });
        }

        {
            let s = Arc::clone(store);
            engine.register_fn("get_translation", move || -> String { s.get().translation });
        }

        engine.on_print(|msg| info!(target: "init.rhai", "{msg}"));

        engine
    }

    /// Load and execute a config file
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        self.eval(&content)
    }

    /// Evaluate a Rhai script string
    pub fn eval(&mut self, script: &str) -> Result<()> {
        let ast = self
            .engine
            .compile(script)
            .map_err(|e| ConfigError::Script(format!("parse error: {}", e)))?;

        let mut scope = Scope::new();
        self.engine
            .run_ast_with_scope(&mut scope, &ast)
            .map_err(|e| ConfigError::Script(e.to_string()))?;

        Ok(())
    }

    pub fn store(&self) -> &Arc<SettingsStore> {
        &self.store
    }

    /// Get the default config file path
    pub fn config_file() -> Option<PathBuf> {
        SettingsStore::config_dir().map(|p| p.join("init.rhai"))
    }

    /// Load the default config file if it exists
    pub fn load_default(&mut self) -> Result<()> {
        if let Some(config_file) = Self::config_file() {
            if config_file.exists() {
                return self.load_file(&config_file);
            }
        }
        Ok(()) // No config file is fine
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> ConfigEngine {
        ConfigEngine::new(Arc::new(SettingsStore::in_memory()))
    }

    #[test]
    fn test_set_word_wrap() {
        let mut engine = engine();
        engine.eval("set_word_wrap(true);").unwrap();
        assert!(engine.store().get().word_wrap);
    }

    #[test]
    fn test_set_tab_width() {
        let mut engine = engine();
        engine.eval("set_tab_width(2);").unwrap();
        assert_eq!(engine.store().get().tab_width, 2);
    }

    #[test]
    fn test_set_tab_width_clamped() {
        let mut engine = engine();
        engine.eval("set_tab_width(100);").unwrap();
        assert_eq!(engine.store().get().tab_width, 16); // Clamped to max
    }

    #[test]
    fn test_getters_read_current_values() {
        let mut engine = engine();
        engine
            .eval(
                r#"
                set_translation("fr_FR");
                if get_translation() != "fr_FR" { throw "translation not set"; }
                if !get_show_menu_bar() { throw "menu bar should default on"; }
                "#,
            )
            .unwrap();
    }

    #[test]
    fn test_multiple_settings() {
        let mut engine = engine();
        engine
            .eval(
                r#"
                set_show_tool_bar(false);
                set_tab_width(8);
                set_show_line_numbers(false);
                set_restore_previous_session(true);
            "#,
            )
            .unwrap();

        let settings = engine.store().get();
        assert!(!settings.show_tool_bar);
        assert_eq!(settings.tab_width, 8);
        assert!(!settings.show_line_numbers);
        assert!(settings.restore_previous_session);
    }

    #[test]
    fn test_changes_notify_subscribers() {
        let mut engine = engine();
        let mut rx = engine.store().subscribe();
        engine.eval("set_show_whitespace(true);").unwrap();
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().show_whitespace);
    }

    #[test]
    fn test_script_errors_are_returned() {
        let mut engine = engine();
        assert!(matches!(
            engine.eval("set_tab_width("),
            Err(ConfigError::Script(_))
        ));
        assert!(matches!(
            engine.eval("no_such_setting(1);"),
            Err(ConfigError::Script(_))
        ));
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("init.rhai");
        std::fs::write(&path, "set_insert_spaces(false);").unwrap();

        let mut engine = engine();
        engine.load_file(&path).unwrap();
        assert!(!engine.store().get().insert_spaces);
    }
}
