// SPDX-License-Identifier: GPL-3.0-only

//! Picture descriptor: geometry, pixel format and planar pixel storage
//!
//! Pictures are allocated once when the pipeline opens and then reused in
//! place for every frame. Plane buffers never change size after allocation.

use crate::errors::{PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};

/// Pixel format of a picture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    /// I420 - Planar 4:2:0 (separate Y, U, V planes)
    I420,
    /// RGB24 - 24-bit RGB (3 bytes per pixel, no alpha)
    RGB24,
    /// RGBA - 32-bit with alpha (4 bytes per pixel)
    RGBA,
    /// BGRA - 32-bit with alpha (B G R A byte order)
    BGRA,
}

impl PixelFormat {
    /// Check if this is a planar YUV format
    pub fn is_planar_yuv(&self) -> bool {
        matches!(self, Self::I420)
    }

    /// Number of planes for this format
    pub fn plane_count(&self) -> usize {
        match self {
            Self::I420 => 3,
            Self::RGB24 | Self::RGBA | Self::BGRA => 1,
        }
    }

    /// Bytes per pixel for packed formats (None for planar formats)
    pub fn packed_bytes_per_pixel(&self) -> Option<usize> {
        match self {
            Self::I420 => None,
            Self::RGB24 => Some(3),
            Self::RGBA | Self::BGRA => Some(4),
        }
    }

    /// Average bytes per pixel (accounting for chroma subsampling)
    pub fn bytes_per_pixel(&self) -> f32 {
        match self {
            Self::I420 => 1.5,
            Self::RGB24 => 3.0,
            Self::RGBA | Self::BGRA => 4.0,
        }
    }

    /// Short display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::I420 => "I420",
            Self::RGB24 => "RGB24",
            Self::RGBA => "RGBA",
            Self::BGRA => "BGRA",
        }
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Picture width and height in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of pixels
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Geometry of each chroma plane of a 4:2:0 picture
    pub fn chroma_420(&self) -> Geometry {
        Geometry::new(self.width / 2, self.height / 2)
    }
}

impl std::fmt::Display for Geometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Framerate as a fraction (numerator/denominator)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Framerate {
    pub num: u32,
    pub denom: u32,
}

impl Framerate {
    pub fn new(num: u32, denom: u32) -> Self {
        Self {
            num,
            denom: denom.max(1),
        }
    }

    pub fn from_int(fps: u32) -> Self {
        Self::new(fps, 1)
    }

    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.denom as f64
    }
}

impl std::fmt::Display for Framerate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.denom == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{:.2}", self.as_f64())
        }
    }
}

/// One plane of pixel data with its line stride
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plane {
    data: Vec<u8>,
    /// Bytes per row in `data`
    stride: usize,
    /// Meaningful bytes per row (stride may include padding)
    row_bytes: usize,
    rows: usize,
}

impl Plane {
    fn zeroed(row_bytes: usize, rows: usize) -> Self {
        Self {
            data: vec![0; row_bytes * rows],
            stride: row_bytes,
            row_bytes,
            rows,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable access to the plane bytes. The slice has a fixed length.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn row_bytes(&self) -> usize {
        self.row_bytes
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Meaningful bytes of row `y` (excluding stride padding)
    pub fn row(&self, y: usize) -> &[u8] {
        let start = y * self.stride;
        &self.data[start..start + self.row_bytes]
    }

    pub fn row_mut(&mut self, y: usize) -> &mut [u8] {
        let start = y * self.stride;
        &mut self.data[start..start + self.row_bytes]
    }
}

/// A video picture: format, geometry, frame rate and owned planes
///
/// For [`PixelFormat::I420`] the planes are Y (`width*height` bytes),
/// U and V (`width*height/4` bytes each). Packed formats have a single
/// plane of `width*bytes_per_pixel*height` bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PictureDescriptor {
    format: PixelFormat,
    geometry: Geometry,
    framerate: Framerate,
    planes: Vec<Plane>,
}

impl PictureDescriptor {
    /// Allocate a zeroed picture. 4:2:0 formats require even dimensions.
    pub fn allocate(
        format: PixelFormat,
        geometry: Geometry,
        framerate: Framerate,
    ) -> PipelineResult<Self> {
        if geometry.width == 0 || geometry.height == 0 {
            return Err(PipelineError::InvalidDefinition(format!(
                "picture geometry {} is empty",
                geometry
            )));
        }

        let width = geometry.width as usize;
        let height = geometry.height as usize;

        let planes = match format.packed_bytes_per_pixel() {
            Some(bpp) => vec![Plane::zeroed(width * bpp, height)],
            None => {
                if geometry.width % 2 != 0 || geometry.height % 2 != 0 {
                    return Err(PipelineError::InvalidDefinition(format!(
                        "{} requires even dimensions, got {}",
                        format, geometry
                    )));
                }
                let chroma = geometry.chroma_420();
                let (cw, ch) = (chroma.width as usize, chroma.height as usize);
                vec![
                    Plane::zeroed(width, height),
                    Plane::zeroed(cw, ch),
                    Plane::zeroed(cw, ch),
                ]
            }
        };

        Ok(Self {
            format,
            geometry,
            framerate,
            planes,
        })
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn width(&self) -> u32 {
        self.geometry.width
    }

    pub fn height(&self) -> u32 {
        self.geometry.height
    }

    pub fn framerate(&self) -> Framerate {
        self.framerate
    }

    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    /// Planes for in-place writes; the plane count and sizes stay fixed
    pub fn planes_mut(&mut self) -> &mut [Plane] {
        &mut self.planes
    }

    pub fn plane(&self, index: usize) -> &Plane {
        &self.planes[index]
    }

    pub fn plane_mut(&mut self, index: usize) -> &mut Plane {
        &mut self.planes[index]
    }

    /// Luma plane (I420) or the packed pixel plane
    pub fn luma(&self) -> &Plane {
        &self.planes[0]
    }

    /// Split borrow of the three I420 planes (Y, U, V)
    pub fn yuv_planes_mut(&mut self) -> Option<(&mut Plane, &mut Plane, &mut Plane)> {
        match self.planes.as_mut_slice() {
            [y, u, v] => Some((y, u, v)),
            _ => None,
        }
    }

    /// Total bytes across all planes
    pub fn byte_len(&self) -> usize {
        self.planes.iter().map(Plane::len).sum()
    }

    /// Set every byte of every plane to `value`
    pub fn fill(&mut self, value: u8) {
        for plane in &mut self.planes {
            plane.data.fill(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qvga_i420_plane_sizes() {
        let picture = PictureDescriptor::allocate(
            PixelFormat::I420,
            Geometry::new(320, 240),
            Framerate::from_int(30),
        )
        .unwrap();

        assert_eq!(picture.planes().len(), 3);
        assert_eq!(picture.plane(0).len(), 76_800);
        assert_eq!(picture.plane(1).len(), 19_200);
        assert_eq!(picture.plane(2).len(), 19_200);
        assert_eq!(picture.plane(0).stride(), 320);
        assert_eq!(picture.plane(1).stride(), 160);
        assert!(picture.planes().iter().all(|p| p.stride() >= p.row_bytes()));
    }

    #[test]
    fn test_packed_allocation() {
        let picture = PictureDescriptor::allocate(
            PixelFormat::RGB24,
            Geometry::new(320, 240),
            Framerate::from_int(30),
        )
        .unwrap();
        assert_eq!(picture.planes().len(), 1);
        assert_eq!(picture.byte_len(), 320 * 240 * 3);
        assert_eq!(picture.luma().row(239).len(), 960);
    }

    #[test]
    fn test_odd_geometry_rejected_for_420() {
        let result = PictureDescriptor::allocate(
            PixelFormat::I420,
            Geometry::new(321, 240),
            Framerate::from_int(30),
        );
        assert!(result.is_err());

        // Packed formats have no subsampling constraint
        assert!(
            PictureDescriptor::allocate(
                PixelFormat::RGBA,
                Geometry::new(321, 241),
                Framerate::from_int(30)
            )
            .is_ok()
        );
    }

    #[test]
    fn test_fill_keeps_capacity() {
        let mut picture = PictureDescriptor::allocate(
            PixelFormat::I420,
            Geometry::new(16, 8),
            Framerate::from_int(15),
        )
        .unwrap();
        let before = picture.byte_len();
        picture.fill(0x80);
        assert_eq!(picture.byte_len(), before);
        assert!(picture.plane(2).data().iter().all(|&b| b == 0x80));
    }

    #[test]
    fn test_framerate_display() {
        assert_eq!(Framerate::from_int(30).to_string(), "30");
        assert_eq!(Framerate::new(30000, 1001).to_string(), "29.97");
        assert_eq!(Framerate::new(30, 0).denom, 1);
    }
}
