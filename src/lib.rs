//! Control surface and geometric front-end for a visual SLAM engine.
//!
//! This crate owns the camera model (intrinsics, lens distortion, stereo
//! rectification), the tracking state machine, and the snapshot store that
//! makes pose/map queries atomic across threads. The feature tracking and
//! map optimization themselves live behind the [`engine::EstimationEngine`]
//! trait and are deliberately opaque to this layer.

pub mod camera;
pub mod engine;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod snapshot;
pub mod system;
pub mod tracking;

pub use error::{CameraParameterError, ProcessFrameError};
pub use frame::{Frame, Image};
pub use system::{SlamConfig, SlamSystem};
pub use tracking::State;
