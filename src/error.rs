//! Error codes surfaced by the control layer.
//!
//! No panics and no opaque error types cross this boundary: everything a
//! caller can mishandle comes back as one of these enumerated codes, so
//! transition sites can match exhaustively.

use thiserror::Error;

/// Things that can go wrong when setting camera parameters.
///
/// Setters reject-and-keep-old: a failed call leaves the previously valid
/// configuration untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CameraParameterError {
    /// The image size is invalid (zero or negative).
    #[error("bad image size")]
    BadSize,
    /// The focal length is invalid (zero or negative).
    #[error("bad focal length")]
    BadFocalLength,
    /// The principal point does not lie within the image.
    #[error("bad principal point")]
    BadPrincipalPoint,
    /// The calibration required for this operation is missing or invalid.
    #[error("invalid calibration")]
    InvalidCalibration,
    /// Unknown error occurred / error type is undefined.
    #[error("unknown camera parameter error")]
    Unknown,
}

/// Failure conditions for `process_frame`.
///
/// A successful return (`Ok`) means processing mechanics succeeded; tracking
/// itself may still be lost — that is state, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProcessFrameError {
    /// The input image data are missing, the wrong size, or (stereo) the
    /// left/right sizes disagree.
    #[error("input image error")]
    InputImage,
    /// No valid camera calibration has been set.
    #[error("calibration error")]
    Calibration,
    /// The initialisation attempt failed. This is a soft failure: the state
    /// stays `Initialising` and the caller should keep feeding frames.
    #[error("initialisation error")]
    Initialisation,
    /// Unknown error occurred / error type is undefined.
    #[error("unknown processing error")]
    Unknown,
}

/// Readable description of a `ProcessFrameError`, with `None` meaning
/// everything was fine.
pub fn describe_process_frame_result(result: Result<(), ProcessFrameError>) -> &'static str {
    match result {
        Ok(()) => "everything is fine",
        Err(ProcessFrameError::InputImage) => "input image error",
        Err(ProcessFrameError::Calibration) => "calibration error",
        Err(ProcessFrameError::Initialisation) => "initialisation error",
        Err(ProcessFrameError::Unknown) => "unknown processing error",
    }
}

/// Readable description of a `CameraParameterError`, with `None` meaning
/// everything was fine.
pub fn describe_camera_parameter_result(
    result: Result<(), CameraParameterError>,
) -> &'static str {
    match result {
        Ok(()) => "everything is fine",
        Err(CameraParameterError::BadSize) => "bad image size",
        Err(CameraParameterError::BadFocalLength) => "bad focal length",
        Err(CameraParameterError::BadPrincipalPoint) => "bad principal point",
        Err(CameraParameterError::InvalidCalibration) => "invalid calibration",
        Err(CameraParameterError::Unknown) => "unknown camera parameter error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_matches_display() {
        let err = ProcessFrameError::Calibration;
        assert_eq!(describe_process_frame_result(Err(err)), err.to_string());
        let err = CameraParameterError::BadFocalLength;
        assert_eq!(describe_camera_parameter_result(Err(err)), err.to_string());
    }

    #[test]
    fn test_ok_describes_as_fine() {
        assert_eq!(describe_process_frame_result(Ok(())), "everything is fine");
        assert_eq!(describe_camera_parameter_result(Ok(())), "everything is fine");
    }
}
