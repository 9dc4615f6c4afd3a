// Domain layer - Plain data shared by every other layer
pub mod channel;
pub mod relay;
pub mod sample;
