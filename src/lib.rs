pub mod commands;
pub mod config;
pub mod error;
pub mod logger;
pub mod protocol;
pub mod proxy;
pub mod server;
pub mod world;

// Re-export commonly used items
pub use config::Config;
pub use error::{Result, WaypointError};
pub use logger::{log, LogSeverity};
pub use protocol::{Codec, Direction, Packet};
pub use proxy::{ProxySession, SessionHandle};
pub use world::{SharedWorld, World};
