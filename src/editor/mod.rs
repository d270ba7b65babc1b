mod buffer;
mod tab;
mod workspace;

pub use buffer::Buffer;
pub use tab::{Tab, TabId};
pub use workspace::Workspace;
