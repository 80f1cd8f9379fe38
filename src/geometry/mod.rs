//! Geometry primitives: wire value types and camera pose forms.

pub mod pose;
pub mod types;

pub use pose::CameraPose;
pub use types::{Matrix3, Matrix4, Quaternion, Vector2, Vector3};
