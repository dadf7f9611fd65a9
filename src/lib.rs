// SLV avatar sync: network-driven avatar state for a Second Life style viewer
// Pose decoding, identity tracking and animation blending for remote and local avatars

pub mod utils;
pub mod networking;
pub mod config;
pub mod world;

// Re-export commonly used types for convenience
pub use config::{AvatarSyncSettings, SettingsError};
pub use networking::{InboundEvent, NetworkError, NetworkResult};
pub use world::{SessionInfo, UpdateDispatcher, WorldEvent};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
