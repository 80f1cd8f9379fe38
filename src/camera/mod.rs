//! Camera model: intrinsics, lens distortion, stereo rectification, and the
//! per-frame undistortion remap.

pub mod distortion;
pub mod model;

pub use distortion::{DistortionCoefficients, Pinhole, RectifiedCamera, NUM_DISTORTION_COEFFS};
pub use model::{Calibration, CameraModel};
