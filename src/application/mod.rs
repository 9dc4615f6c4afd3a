// Application layer - Sampling, session lifecycle and relay use cases
pub mod acquisition_service;
pub mod relay_service;
pub mod rig;
pub mod sampling_loop;
pub mod sensors;
pub mod video_recorder;
