//! Input frame types.
//!
//! Images are single-channel 8-bit greyscale with explicit dimensions. The
//! caller owns the pixel data; `process_frame` may rewrite it in place when
//! undistortion or rectification is active, so callers that need the
//! original pixels must copy beforehand.

/// A rectangular single-channel 8-bit greyscale image.
#[derive(Debug, Clone, Default)]
pub struct Image {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl Image {
    /// Allocate a zero-filled image of the given size.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height],
        }
    }

    /// Wrap an existing buffer. The buffer length must be `width * height`
    /// for the image to be considered valid.
    pub fn from_data(width: usize, height: usize, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
        }
    }

    /// An image with no data, as used for the unused right slot in mono mode.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether the image has non-zero dimensions and a correctly sized buffer.
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0 && self.data.len() == self.width * self.height
    }

    /// Pixel value at (x, y). Out-of-bounds reads return 0.
    pub fn at(&self, x: usize, y: usize) -> u8 {
        if x < self.width && y < self.height {
            self.data[y * self.width + x]
        } else {
            0
        }
    }
}

/// One frame of input: a single image for mono SLAM, or a stereo pair.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    /// Left image (or the single monocular image).
    pub left: Image,
    /// Right image of a stereo pair; empty in mono mode.
    pub right: Image,
}

impl Frame {
    pub fn mono(image: Image) -> Self {
        Self {
            left: image,
            right: Image::empty(),
        }
    }

    pub fn stereo(left: Image, right: Image) -> Self {
        Self { left, right }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_image_is_valid() {
        let img = Image::new(4, 3);
        assert!(img.is_valid());
        assert_eq!(img.data.len(), 12);
    }

    #[test]
    fn test_empty_image_is_invalid() {
        assert!(!Image::empty().is_valid());
    }

    #[test]
    fn test_mismatched_buffer_is_invalid() {
        let img = Image::from_data(4, 4, vec![0; 10]);
        assert!(!img.is_valid());
    }

    #[test]
    fn test_pixel_access_out_of_bounds_is_zero() {
        let mut img = Image::new(2, 2);
        img.data[3] = 7;
        assert_eq!(img.at(1, 1), 7);
        assert_eq!(img.at(2, 0), 0);
        assert_eq!(img.at(0, 2), 0);
    }
}
