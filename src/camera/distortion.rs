//! Lens distortion and stereo rectification.
//!
//! The distortion model is the standard 8-coefficient rational model in
//! OpenCV coefficient order `[k1, k2, p1, p2, k3, k4, k5, k6]`:
//!
//! ```text
//! radial  = (1 + k1 r² + k2 r⁴ + k3 r⁶) / (1 + k4 r² + k5 r⁴ + k6 r⁶)
//! x' = x·radial + 2 p1 x y + p2 (r² + 2x²)
//! y' = y·radial + p1 (r² + 2y²) + 2 p2 x y
//! ```
//!
//! Undistortion is done by remapping: for every pixel of the (undistorted,
//! rectified) output image we compute where it lives in the raw input image
//! by running the *forward* model, then sample bilinearly. The per-pixel
//! source coordinates are precomputed once into a [`RemapTable`] when the
//! parameters are set, so the per-frame cost is a single table walk.

use nalgebra as na;

use crate::error::CameraParameterError;
use crate::frame::Image;
use crate::geometry::Matrix3;

/// Number of distortion coefficients. Shorter or longer inputs are rejected
/// rather than zero-padded.
pub const NUM_DISTORTION_COEFFS: usize = 8;

/// Radial and tangential distortion coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DistortionCoefficients {
    coeffs: [f64; NUM_DISTORTION_COEFFS],
}

impl DistortionCoefficients {
    /// Strict-length construction: exactly 8 coefficients.
    pub fn from_slice(coeffs: &[f64]) -> Result<Self, CameraParameterError> {
        if coeffs.len() != NUM_DISTORTION_COEFFS {
            return Err(CameraParameterError::InvalidCalibration);
        }
        let mut c = [0.0; NUM_DISTORTION_COEFFS];
        c.copy_from_slice(coeffs);
        Ok(Self { coeffs: c })
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// Apply the forward distortion model to normalized camera coordinates.
    pub fn distort(&self, x: f64, y: f64) -> (f64, f64) {
        let [k1, k2, p1, p2, k3, k4, k5, k6] = self.coeffs;
        let r2 = x * x + y * y;
        let r4 = r2 * r2;
        let r6 = r4 * r2;
        let num = 1.0 + k1 * r2 + k2 * r4 + k3 * r6;
        let den = 1.0 + k4 * r2 + k5 * r4 + k6 * r6;
        let radial = if den.abs() > f64::EPSILON { num / den } else { 1.0 };
        let xd = x * radial + 2.0 * p1 * x * y + p2 * (r2 + 2.0 * x * x);
        let yd = y * radial + p1 * (r2 + 2.0 * y * y) + 2.0 * p2 * x * y;
        (xd, yd)
    }
}

/// Pinhole intrinsics: focal lengths and principal point, zero skew.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pinhole {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl Pinhole {
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Result<Self, CameraParameterError> {
        if fx <= 0.0 || fy <= 0.0 {
            return Err(CameraParameterError::BadFocalLength);
        }
        Ok(Self { fx, fy, cx, cy })
    }

    /// Extract intrinsics from a 3x3 calibration matrix (skew is ignored).
    pub fn from_matrix(k: &Matrix3) -> Result<Self, CameraParameterError> {
        Self::new(k.at(0, 0), k.at(1, 1), k.at(0, 2), k.at(1, 2))
    }

    /// Pixel coordinates -> normalized camera coordinates.
    fn unproject(&self, u: f64, v: f64) -> (f64, f64) {
        ((u - self.cx) / self.fx, (v - self.cy) / self.fy)
    }

    /// Normalized camera coordinates -> pixel coordinates.
    fn project(&self, x: f64, y: f64) -> (f64, f64) {
        (self.fx * x + self.cx, self.fy * y + self.cy)
    }
}

/// Pre-rectification description of one physical camera of a stereo pair:
/// its intrinsics and distortion before rectification, and its rotation
/// with respect to the stereo origin.
#[derive(Debug, Clone)]
pub struct RectifiedCamera {
    pub intrinsics: Pinhole,
    pub rotation: na::Matrix3<f64>,
    pub distortion: DistortionCoefficients,
}

impl RectifiedCamera {
    /// Matrix-form construction (3x3 pre-rectification calibration matrix).
    pub fn from_matrix(
        intrinsics: Matrix3,
        rotation: Matrix3,
        coeffs: &[f64],
    ) -> Result<Self, CameraParameterError> {
        Ok(Self {
            intrinsics: Pinhole::from_matrix(&intrinsics)?,
            rotation: rotation.into(),
            distortion: DistortionCoefficients::from_slice(coeffs)?,
        })
    }

    /// Scalar-form construction (focal lengths and principal point).
    pub fn from_scalars(
        fx: f64,
        fy: f64,
        cx: f64,
        cy: f64,
        rotation: Matrix3,
        coeffs: &[f64],
    ) -> Result<Self, CameraParameterError> {
        Ok(Self {
            intrinsics: Pinhole::new(fx, fy, cx, cy)?,
            rotation: rotation.into(),
            distortion: DistortionCoefficients::from_slice(coeffs)?,
        })
    }
}

/// Precomputed per-pixel source coordinates for one camera.
#[derive(Debug, Clone)]
pub struct RemapTable {
    width: usize,
    height: usize,
    /// Source (x, y) in the raw image for each destination pixel, row-major.
    map: Vec<(f32, f32)>,
}

impl RemapTable {
    /// Build the table mapping each output pixel back into the raw image.
    ///
    /// `post` are the intrinsics of the output (post-rectification) image,
    /// `source` those of the raw camera. `rotation`, when present, is the
    /// camera's rectifying rotation; its transpose carries the output ray
    /// back into the physical camera frame before distortion is applied.
    pub fn build(
        width: usize,
        height: usize,
        post: Pinhole,
        source: Pinhole,
        rotation: Option<&na::Matrix3<f64>>,
        distortion: DistortionCoefficients,
    ) -> Self {
        let rot_inv = rotation.map(|r| r.transpose());
        let mut map = Vec::with_capacity(width * height);
        for v in 0..height {
            for u in 0..width {
                let (x, y) = post.unproject(u as f64, v as f64);
                let (x, y) = match &rot_inv {
                    Some(r) => {
                        let ray = r * na::Vector3::new(x, y, 1.0);
                        if ray.z.abs() > f64::EPSILON {
                            (ray.x / ray.z, ray.y / ray.z)
                        } else {
                            (x, y)
                        }
                    }
                    None => (x, y),
                };
                let (xd, yd) = distortion.distort(x, y);
                let (su, sv) = source.project(xd, yd);
                map.push((su as f32, sv as f32));
            }
        }
        Self { width, height, map }
    }

    /// Remap the image in place through the table with bilinear sampling.
    /// Pixels that map outside the source image become black.
    pub fn remap(&self, image: &mut Image) {
        debug_assert_eq!(image.width, self.width);
        debug_assert_eq!(image.height, self.height);
        let mut out = vec![0u8; self.width * self.height];
        for (dst, &(sx, sy)) in out.iter_mut().zip(self.map.iter()) {
            *dst = sample_bilinear(image, sx as f64, sy as f64);
        }
        image.data = out;
    }
}

fn sample_bilinear(image: &Image, x: f64, y: f64) -> u8 {
    if x < 0.0 || y < 0.0 {
        return 0;
    }
    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    if x0 >= image.width || y0 >= image.height {
        return 0;
    }
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;
    let x1 = (x0 + 1).min(image.width - 1);
    let y1 = (y0 + 1).min(image.height - 1);

    let p00 = image.at(x0, y0) as f64;
    let p10 = image.at(x1, y0) as f64;
    let p01 = image.at(x0, y1) as f64;
    let p11 = image.at(x1, y1) as f64;

    let top = p00 * (1.0 - fx) + p10 * fx;
    let bottom = p01 * (1.0 - fx) + p11 * fx;
    (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8
}
