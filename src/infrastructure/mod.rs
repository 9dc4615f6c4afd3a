// Infrastructure layer - Storage, device adapters and HTTP plumbing
pub mod archive;
pub mod camera;
pub mod channel_log;
pub mod config;
pub mod hardware;
pub mod http_response;
pub mod rig_builder;
pub mod simulated;
pub mod sysfs_gpio;
