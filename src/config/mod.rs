//! Editor settings: typed values, JSON persistence and the `init.rhai`
//! config script that can adjust them at startup.

mod engine;
mod error;
mod settings;
mod store;

pub use engine::ConfigEngine;
pub use error::ConfigError;
pub use settings::Settings;
pub use store::SettingsStore;
