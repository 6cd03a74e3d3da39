//! Tool abstraction for agent capabilities.

pub mod mailbox;
pub mod registry;
pub mod tool;

pub use mailbox::register_mailbox_tools;
pub use registry::ToolRegistry;
pub use tool::*;
