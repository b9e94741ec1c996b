pub mod blocks;
pub mod config;
pub mod error;
pub mod host;
pub mod logger;
pub mod plugin;
pub mod protocol;
pub mod types;

// Re-export commonly used items
pub use blocks::definition::CustomBlock;
pub use error::NotecraftError;
pub use logger::{log, LogSeverity};
pub use plugin::NotecraftPlugin;
pub use protocol::packet::Packet;
pub use types::Result;
