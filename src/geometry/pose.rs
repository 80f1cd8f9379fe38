//! Camera pose representations.
//!
//! A pose arrives from the estimation engine in camera-space form: the `R`
//! and `T` of the projection `P = K[R|T]`, i.e. the world origin expressed
//! in the camera frame. Renderers and most callers want the world-space
//! form instead: the camera centre `C = -Rᵀ·T` and orientation `Rᵀ`. This
//! module derives one from the other plus the two homogeneous 4x4 matrices.

use nalgebra as na;

use super::types::{Matrix3, Matrix4, Quaternion, Vector3};

/// A camera pose in camera-space form (`R`, `T` of `P = K[R|T]`).
#[derive(Debug, Clone, PartialEq)]
pub struct CameraPose {
    /// Orientation of the world about the camera centre.
    pub rotation: na::Matrix3<f64>,
    /// Position of the world origin in the camera frame.
    pub translation: na::Vector3<f64>,
}

impl CameraPose {
    pub fn new(rotation: na::Matrix3<f64>, translation: na::Vector3<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    pub fn identity() -> Self {
        Self {
            rotation: na::Matrix3::identity(),
            translation: na::Vector3::zeros(),
        }
    }

    /// Camera centre in the world frame: `C = -Rᵀ·T`.
    pub fn position(&self) -> na::Vector3<f64> {
        -(self.rotation.transpose() * self.translation)
    }

    /// Camera orientation about its own centre in the world frame: `Rᵀ`.
    pub fn orientation_in_world(&self) -> na::Matrix3<f64> {
        self.rotation.transpose()
    }

    /// Camera-space orientation as a quaternion.
    pub fn quaternion(&self) -> Quaternion {
        to_quaternion(&self.rotation)
    }

    /// World-space orientation as a quaternion.
    pub fn quaternion_in_world(&self) -> Quaternion {
        to_quaternion(&self.rotation.transpose())
    }

    /// The world-to-camera view matrix `[R|T]` in homogeneous form.
    pub fn view_matrix(&self) -> Matrix4 {
        homogeneous(&self.rotation, &self.translation)
    }

    /// The camera-to-world transform matrix `[Rᵀ|C]` in homogeneous form.
    pub fn transform_matrix(&self) -> Matrix4 {
        homogeneous(&self.orientation_in_world(), &self.position())
    }

    /// Camera-space translation as a wire value.
    pub fn translation_raw(&self) -> Vector3 {
        self.translation.into()
    }

    /// Camera-space rotation as a wire value.
    pub fn rotation_raw(&self) -> Matrix3 {
        self.rotation.into()
    }
}

fn to_quaternion(rotation: &na::Matrix3<f64>) -> Quaternion {
    let rot = na::Rotation3::from_matrix_unchecked(*rotation);
    na::UnitQuaternion::from_rotation_matrix(&rot).into()
}

fn homogeneous(rotation: &na::Matrix3<f64>, translation: &na::Vector3<f64>) -> Matrix4 {
    let mut m = na::Matrix4::identity();
    m.fixed_view_mut::<3, 3>(0, 0).copy_from(rotation);
    m.fixed_view_mut::<3, 1>(0, 3).copy_from(translation);
    m.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_pose() -> CameraPose {
        let rotation = na::Rotation3::from_euler_angles(0.3, -0.2, 0.7);
        CameraPose::new(rotation.into_inner(), na::Vector3::new(1.0, -2.0, 3.5))
    }

    #[test]
    fn test_position_is_inverse_of_translation() {
        let pose = sample_pose();
        // C = -Rᵀ·T implies T = -R·C.
        let recovered = -(pose.rotation * pose.position());
        assert_relative_eq!(recovered, pose.translation, epsilon = 1e-12);
    }

    #[test]
    fn test_orientation_in_world_is_transpose() {
        let pose = sample_pose();
        let product = pose.rotation * pose.orientation_in_world();
        assert_relative_eq!(product, na::Matrix3::identity(), epsilon = 1e-12);
    }

    #[test]
    fn test_view_and_transform_matrices_are_inverses() {
        let pose = sample_pose();
        let view: na::Matrix4<f64> = pose.view_matrix().into();
        let transform: na::Matrix4<f64> = pose.transform_matrix().into();
        assert_relative_eq!(view * transform, na::Matrix4::identity(), epsilon = 1e-12);
    }

    #[test]
    fn test_view_matrix_layout() {
        let pose = sample_pose();
        let view = pose.view_matrix();
        for row in 0..3 {
            for col in 0..3 {
                assert_relative_eq!(view.at(row, col), pose.rotation[(row, col)]);
            }
            assert_relative_eq!(view.at(row, 3), pose.translation[row]);
        }
        assert_eq!(view.at(3, 3), 1.0);
        assert_eq!(view.at(3, 0), 0.0);
    }

    #[test]
    fn test_quaternions_are_mutual_conjugates() {
        let pose = sample_pose();
        let q = pose.quaternion();
        let qw = pose.quaternion_in_world();
        // Rᵀ is the inverse rotation, so the quaternions are conjugate up
        // to overall sign.
        let dot = q.x * -qw.x + q.y * -qw.y + q.z * -qw.z + q.w * qw.w;
        assert_relative_eq!(dot.abs(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_identity_pose() {
        let pose = CameraPose::identity();
        assert_relative_eq!(pose.position(), na::Vector3::zeros());
        let q = pose.quaternion();
        assert_relative_eq!(q.w, 1.0);
        assert_eq!(pose.view_matrix(), Matrix4::identity());
    }
}
