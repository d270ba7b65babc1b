//! nextpad: runs documents as Lua scripts and streams their output into
//! editor tabs.

pub mod config;
pub mod editor;
pub mod logging;
pub mod render;
pub mod stream;
