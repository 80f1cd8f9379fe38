//! The camera model: intrinsics, distortion, rectification.
//!
//! Parameter setters validate eagerly and reject-and-keep-old on failure.
//! Rectification parameters may only be set after intrinsics; the intrinsics
//! set on this model are interpreted as the *post-rectification* values once
//! rectification is active.

use tracing::{debug, warn};

use crate::error::CameraParameterError;
use crate::frame::Frame;
use crate::geometry::{Matrix3, Vector2};

use super::distortion::{DistortionCoefficients, Pinhole, RectifiedCamera, RemapTable};

/// Validated intrinsic calibration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub width: f64,
    pub height: f64,
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl Calibration {
    fn pinhole(&self) -> Pinhole {
        // Always valid: the setter has already checked fx, fy > 0.
        Pinhole {
            fx: self.fx,
            fy: self.fy,
            cx: self.cx,
            cy: self.cy,
        }
    }
}

/// Active per-frame geometric correction.
#[derive(Debug, Clone, Default)]
enum Undistortion {
    /// Frames pass through unmodified.
    #[default]
    None,
    /// A single remap table, applied to whichever images the frame carries.
    Mono(RemapTable),
    /// Separate tables per stereo side (per-side distortion, or full
    /// rectification with the homography folded into the tables).
    Stereo {
        left: RemapTable,
        right: RemapTable,
    },
}

/// Camera model owned by the SLAM control layer.
#[derive(Debug, Clone, Default)]
pub struct CameraModel {
    calibration: Option<Calibration>,
    undistortion: Undistortion,
    /// Whether the active correction includes stereo rectification.
    rectified: bool,
    /// Whether the most recently processed frame was remapped.
    did_undistort: bool,
}

impl CameraModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the intrinsic calibration. Required before anything else.
    ///
    /// Success invalidates any previously configured distortion or
    /// rectification, since those assumed the old image size.
    pub fn set_calibration(
        &mut self,
        width: f64,
        height: f64,
        fx: f64,
        fy: f64,
        cx: f64,
        cy: f64,
    ) -> Result<(), CameraParameterError> {
        if width <= 0.0 || height <= 0.0 {
            warn!(width, height, "rejecting calibration: bad image size");
            return Err(CameraParameterError::BadSize);
        }
        if fx <= 0.0 || fy <= 0.0 {
            warn!(fx, fy, "rejecting calibration: bad focal length");
            return Err(CameraParameterError::BadFocalLength);
        }
        if cx < 0.0 || cx > width || cy < 0.0 || cy > height {
            warn!(cx, cy, "rejecting calibration: principal point outside image");
            return Err(CameraParameterError::BadPrincipalPoint);
        }

        self.calibration = Some(Calibration {
            width,
            height,
            fx,
            fy,
            cx,
            cy,
        });
        self.undistortion = Undistortion::None;
        self.rectified = false;
        debug!(width, height, fx, fy, cx, cy, "camera calibration set");
        Ok(())
    }

    /// Set a single distortion coefficient set, applied to every image.
    /// Requires calibration; exactly 8 coefficients.
    pub fn set_distortion(&mut self, coeffs: &[f64]) -> Result<(), CameraParameterError> {
        let calib = self
            .calibration
            .ok_or(CameraParameterError::InvalidCalibration)?;
        let distortion = DistortionCoefficients::from_slice(coeffs)?;
        let pinhole = calib.pinhole();
        self.undistortion = Undistortion::Mono(RemapTable::build(
            calib.width as usize,
            calib.height as usize,
            pinhole,
            pinhole,
            None,
            distortion,
        ));
        self.rectified = false;
        debug!("camera distortion set");
        Ok(())
    }

    /// Set separate distortion coefficient sets for a stereo pair.
    pub fn set_stereo_distortion(
        &mut self,
        left_coeffs: &[f64],
        right_coeffs: &[f64],
    ) -> Result<(), CameraParameterError> {
        let calib = self
            .calibration
            .ok_or(CameraParameterError::InvalidCalibration)?;
        let left = DistortionCoefficients::from_slice(left_coeffs)?;
        let right = DistortionCoefficients::from_slice(right_coeffs)?;
        let pinhole = calib.pinhole();
        let (w, h) = (calib.width as usize, calib.height as usize);
        self.undistortion = Undistortion::Stereo {
            left: RemapTable::build(w, h, pinhole, pinhole, None, left),
            right: RemapTable::build(w, h, pinhole, pinhole, None, right),
        };
        self.rectified = false;
        debug!("stereo distortion set");
        Ok(())
    }

    /// Set full stereo rectification: per-camera pre-rectification
    /// intrinsics, rotation and distortion. Supersedes plain distortion.
    /// The calibration already set on this model is treated as the shared
    /// post-rectification intrinsics.
    pub fn set_rectification(
        &mut self,
        left: RectifiedCamera,
        right: RectifiedCamera,
    ) -> Result<(), CameraParameterError> {
        let calib = self
            .calibration
            .ok_or(CameraParameterError::InvalidCalibration)?;
        let post = calib.pinhole();
        let (w, h) = (calib.width as usize, calib.height as usize);
        self.undistortion = Undistortion::Stereo {
            left: RemapTable::build(
                w,
                h,
                post,
                left.intrinsics,
                Some(&left.rotation),
                left.distortion,
            ),
            right: RemapTable::build(
                w,
                h,
                post,
                right.intrinsics,
                Some(&right.rotation),
                right.distortion,
            ),
        };
        self.rectified = true;
        debug!("stereo rectification set");
        Ok(())
    }

    /// Clear any distortion/rectification. Frames pass through unmodified
    /// (still validated against the calibrated size).
    pub fn reset_distortion(&mut self) {
        self.undistortion = Undistortion::None;
        self.rectified = false;
    }

    /// Full reset, as if newly constructed.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibration.is_some()
    }

    pub fn calibration(&self) -> Option<&Calibration> {
        self.calibration.as_ref()
    }

    pub fn is_rectified(&self) -> bool {
        self.rectified
    }

    /// Row-major 3x3 calibration matrix `[[fx,0,cx],[0,fy,cy],[0,0,1]]`.
    /// Returns the zero matrix before calibration; checking state is the
    /// caller's responsibility.
    pub fn calibration_matrix(&self) -> Matrix3 {
        match self.calibration {
            Some(c) => {
                let mut k = Matrix3::zeros();
                k.data[0] = c.fx;
                k.data[2] = c.cx;
                k.data[4] = c.fy;
                k.data[5] = c.cy;
                k.data[8] = 1.0;
                k
            }
            None => Matrix3::zeros(),
        }
    }

    /// Focal length as `{fx, fy}`; zero before calibration.
    pub fn focal_length(&self) -> Vector2 {
        match self.calibration {
            Some(c) => Vector2::new(c.fx, c.fy),
            None => Vector2::default(),
        }
    }

    /// Principal point as `{cx, cy}`; zero before calibration.
    pub fn principal_point(&self) -> Vector2 {
        match self.calibration {
            Some(c) => Vector2::new(c.cx, c.cy),
            None => Vector2::default(),
        }
    }

    /// Undistort/rectify the frame in place, if correction is active.
    /// Records whether any remap was applied for `frame_was_undistorted`.
    pub fn undistort_frame(&mut self, frame: &mut Frame) {
        match &self.undistortion {
            Undistortion::None => {
                self.did_undistort = false;
            }
            Undistortion::Mono(table) => {
                table.remap(&mut frame.left);
                if !frame.right.is_empty() {
                    table.remap(&mut frame.right);
                }
                self.did_undistort = true;
            }
            Undistortion::Stereo { left, right } => {
                left.remap(&mut frame.left);
                if !frame.right.is_empty() {
                    right.remap(&mut frame.right);
                }
                self.did_undistort = true;
            }
        }
    }

    /// Whether the last processed frame was remapped.
    pub fn frame_was_undistorted(&self) -> bool {
        self.did_undistort
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Image;
    use approx::assert_relative_eq;

    fn calibrated() -> CameraModel {
        let mut cam = CameraModel::new();
        cam.set_calibration(640.0, 480.0, 500.0, 500.0, 320.0, 240.0)
            .unwrap();
        cam
    }

    #[test]
    fn test_calibration_matrix_is_exact() {
        let cam = calibrated();
        let k = cam.calibration_matrix();
        assert_eq!(
            k.data,
            [500.0, 0.0, 320.0, 0.0, 500.0, 240.0, 0.0, 0.0, 1.0]
        );
    }

    #[test]
    fn test_calibration_matrix_is_zero_before_calibration() {
        assert_eq!(CameraModel::new().calibration_matrix(), Matrix3::zeros());
    }

    #[test]
    fn test_invalid_calibration_inputs() {
        let mut cam = CameraModel::new();
        assert_eq!(
            cam.set_calibration(0.0, 480.0, 500.0, 500.0, 320.0, 240.0),
            Err(CameraParameterError::BadSize)
        );
        assert_eq!(
            cam.set_calibration(640.0, -1.0, 500.0, 500.0, 320.0, 240.0),
            Err(CameraParameterError::BadSize)
        );
        assert_eq!(
            cam.set_calibration(640.0, 480.0, 0.0, 500.0, 320.0, 240.0),
            Err(CameraParameterError::BadFocalLength)
        );
        assert_eq!(
            cam.set_calibration(640.0, 480.0, 500.0, -2.0, 320.0, 240.0),
            Err(CameraParameterError::BadFocalLength)
        );
        assert_eq!(
            cam.set_calibration(640.0, 480.0, 500.0, 500.0, -0.5, 240.0),
            Err(CameraParameterError::BadPrincipalPoint)
        );
        assert_eq!(
            cam.set_calibration(640.0, 480.0, 500.0, 500.0, 320.0, 480.5),
            Err(CameraParameterError::BadPrincipalPoint)
        );
        assert!(!cam.is_calibrated());
    }

    #[test]
    fn test_principal_point_boundary_is_accepted() {
        let mut cam = CameraModel::new();
        assert!(cam
            .set_calibration(640.0, 480.0, 500.0, 500.0, 0.0, 480.0)
            .is_ok());
    }

    #[test]
    fn test_failed_calibration_keeps_old_values() {
        let mut cam = calibrated();
        assert!(cam
            .set_calibration(640.0, 480.0, -1.0, 500.0, 320.0, 240.0)
            .is_err());
        assert_relative_eq!(cam.focal_length().x, 500.0);
        assert_relative_eq!(cam.principal_point().y, 240.0);
    }

    #[test]
    fn test_distortion_requires_calibration() {
        let mut cam = CameraModel::new();
        let coeffs = [0.1, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        assert_eq!(
            cam.set_distortion(&coeffs),
            Err(CameraParameterError::InvalidCalibration)
        );
        assert_eq!(
            cam.set_stereo_distortion(&coeffs, &coeffs),
            Err(CameraParameterError::InvalidCalibration)
        );
        // Model otherwise unchanged.
        assert!(!cam.is_calibrated());
        assert_eq!(cam.calibration_matrix(), Matrix3::zeros());
    }

    #[test]
    fn test_rectification_requires_calibration() {
        let mut cam = CameraModel::new();
        let coeffs = [0.0; 8];
        let side = || {
            RectifiedCamera::from_scalars(
                450.0,
                450.0,
                320.0,
                240.0,
                Matrix3::identity(),
                &coeffs,
            )
            .unwrap()
        };
        assert_eq!(
            cam.set_rectification(side(), side()),
            Err(CameraParameterError::InvalidCalibration)
        );
    }

    #[test]
    fn test_distortion_rejects_wrong_length() {
        let mut cam = calibrated();
        assert_eq!(
            cam.set_distortion(&[0.1, 0.2]),
            Err(CameraParameterError::InvalidCalibration)
        );
    }

    #[test]
    fn test_recalibration_clears_distortion() {
        let mut cam = calibrated();
        cam.set_distortion(&[0.1, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0])
            .unwrap();
        cam.set_calibration(320.0, 240.0, 250.0, 250.0, 160.0, 120.0)
            .unwrap();

        let mut frame = Frame::mono(Image::new(320, 240));
        cam.undistort_frame(&mut frame);
        assert!(!cam.frame_was_undistorted());
    }

    #[test]
    fn test_undistort_sets_flag_and_rewrites_pixels() {
        let mut cam = calibrated();
        cam.set_distortion(&[0.2, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0])
            .unwrap();

        let mut image = Image::new(640, 480);
        for (i, px) in image.data.iter_mut().enumerate() {
            *px = (i % 255) as u8;
        }
        let original = image.data.clone();
        let mut frame = Frame::mono(image);
        cam.undistort_frame(&mut frame);

        assert!(cam.frame_was_undistorted());
        assert_ne!(frame.left.data, original);
    }

    #[test]
    fn test_reset_distortion_passes_frames_through() {
        let mut cam = calibrated();
        cam.set_distortion(&[0.2, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0])
            .unwrap();
        cam.reset_distortion();

        let mut frame = Frame::mono(Image::new(640, 480));
        let original = frame.left.data.clone();
        cam.undistort_frame(&mut frame);
        assert!(!cam.frame_was_undistorted());
        assert_eq!(frame.left.data, original);
    }

    #[test]
    fn test_reset_matches_fresh_instance() {
        let mut cam = calibrated();
        cam.set_distortion(&[0.1, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0])
            .unwrap();
        cam.reset();

        let fresh = CameraModel::new();
        assert_eq!(cam.calibration_matrix(), fresh.calibration_matrix());
        assert_eq!(cam.focal_length(), fresh.focal_length());
        assert_eq!(cam.principal_point(), fresh.principal_point());
        assert_eq!(cam.is_calibrated(), fresh.is_calibrated());
        assert_eq!(cam.frame_was_undistorted(), fresh.frame_was_undistorted());
    }

    #[test]
    fn test_stereo_rectification_remaps_both_sides() {
        let mut cam = calibrated();
        let coeffs = [0.05, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let left = RectifiedCamera::from_scalars(
            480.0,
            480.0,
            318.0,
            242.0,
            Matrix3::identity(),
            &coeffs,
        )
        .unwrap();
        let right = RectifiedCamera::from_scalars(
            482.0,
            481.0,
            322.0,
            238.0,
            Matrix3::identity(),
            &coeffs,
        )
        .unwrap();
        cam.set_rectification(left, right).unwrap();
        assert!(cam.is_rectified());

        let make = || {
            let mut img = Image::new(640, 480);
            for (i, px) in img.data.iter_mut().enumerate() {
                *px = (i % 253) as u8;
            }
            img
        };
        let mut frame = Frame::stereo(make(), make());
        let left_before = frame.left.data.clone();
        let right_before = frame.right.data.clone();
        cam.undistort_frame(&mut frame);

        assert!(cam.frame_was_undistorted());
        assert_ne!(frame.left.data, left_before);
        assert_ne!(frame.right.data, right_before);
        // Different per-side intrinsics produce different remaps.
        assert_ne!(frame.left.data, frame.right.data);
    }
}
