// SPDX-License-Identifier: GPL-3.0-only

//! CPU colorspace conversion from planar YUV 4:2:0 to packed RGB formats
//!
//! Uses BT.601 full-range coefficients in 8.8 fixed point:
//! R = Y + 1.402 V, G = Y - 0.344 U - 0.714 V, B = Y + 1.772 U

use crate::errors::{StageError, StageResult};
use crate::media::picture::{PictureDescriptor, PixelFormat};

const CR_R: i32 = 359;
const CB_G: i32 = 88;
const CR_G: i32 = 183;
const CB_B: i32 = 454;

/// Convert one YUV sample to RGB (BT.601)
#[inline]
pub fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let y = y as i32;
    let u = u as i32 - 128;
    let v = v as i32 - 128;

    let r = y + ((CR_R * v) >> 8);
    let g = y - ((CB_G * u + CR_G * v) >> 8);
    let b = y + ((CB_B * u) >> 8);

    [clamp_u8(r), clamp_u8(g), clamp_u8(b)]
}

#[inline]
fn clamp_u8(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}

/// Convert an I420 picture into a packed RGB picture of the same geometry
///
/// Writes into `dst` in place; `dst` must already be allocated in one of the
/// packed formats.
pub fn convert_i420(src: &PictureDescriptor, dst: &mut PictureDescriptor) -> StageResult<()> {
    if src.format() != PixelFormat::I420 {
        return Err(StageError::Conversion(format!(
            "source format {} is not I420",
            src.format()
        )));
    }
    if src.geometry() != dst.geometry() {
        return Err(StageError::Conversion(format!(
            "source {} and destination {} differ in size",
            src.geometry(),
            dst.geometry()
        )));
    }

    // Byte positions of R, G, B (and alpha) within a pixel
    let (ri, gi, bi, alpha) = match dst.format() {
        PixelFormat::RGB24 => (0, 1, 2, None),
        PixelFormat::RGBA => (0, 1, 2, Some(3)),
        PixelFormat::BGRA => (2, 1, 0, Some(3)),
        PixelFormat::I420 => {
            return Err(StageError::Conversion(format!(
                "destination format {} is not packed",
                dst.format()
            )));
        }
    };
    let bpp = if alpha.is_some() { 4 } else { 3 };

    let width = src.width() as usize;
    let height = src.height() as usize;
    let (y_plane, u_plane, v_plane) = (src.plane(0), src.plane(1), src.plane(2));
    let out = dst.plane_mut(0);

    for row in 0..height {
        let y_row = y_plane.row(row);
        let u_row = u_plane.row(row / 2);
        let v_row = v_plane.row(row / 2);
        let out_row = out.row_mut(row);

        for x in 0..width {
            let [r, g, b] = yuv_to_rgb(y_row[x], u_row[x / 2], v_row[x / 2]);
            let px = &mut out_row[x * bpp..(x + 1) * bpp];
            px[ri] = r;
            px[gi] = g;
            px[bi] = b;
            if let Some(ai) = alpha {
                px[ai] = 255;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::picture::{Framerate, Geometry};

    fn picture(format: PixelFormat, w: u32, h: u32) -> PictureDescriptor {
        PictureDescriptor::allocate(format, Geometry::new(w, h), Framerate::from_int(30)).unwrap()
    }

    #[test]
    fn test_grey_maps_to_grey() {
        assert_eq!(yuv_to_rgb(128, 128, 128), [128, 128, 128]);
        assert_eq!(yuv_to_rgb(0, 128, 128), [0, 0, 0]);
        assert_eq!(yuv_to_rgb(255, 128, 128), [255, 255, 255]);
    }

    #[test]
    fn test_luma_is_full_range() {
        // No 16..235 expansion: studio black and white pass through unchanged
        assert_eq!(yuv_to_rgb(16, 128, 128), [16, 16, 16]);
        assert_eq!(yuv_to_rgb(235, 128, 128), [235, 235, 235]);
    }

    #[test]
    fn test_saturated_red_clamps() {
        // High V pushes red up and green down
        let [r, g, b] = yuv_to_rgb(200, 128, 255);
        assert_eq!(r, 255);
        assert!(g < 200);
        assert_eq!(b, 200);
    }

    #[test]
    fn test_convert_to_rgba_sets_alpha() {
        let mut src = picture(PixelFormat::I420, 4, 2);
        src.plane_mut(0).data_mut().fill(100);
        src.plane_mut(1).data_mut().fill(128);
        src.plane_mut(2).data_mut().fill(128);
        let mut dst = picture(PixelFormat::RGBA, 4, 2);

        convert_i420(&src, &mut dst).unwrap();

        for px in dst.plane(0).data().chunks_exact(4) {
            assert_eq!(px, &[100, 100, 100, 255]);
        }
    }

    #[test]
    fn test_bgra_swaps_channels() {
        let mut src = picture(PixelFormat::I420, 2, 2);
        src.plane_mut(0).data_mut().fill(200);
        src.plane_mut(1).data_mut().fill(128);
        src.plane_mut(2).data_mut().fill(255);

        let mut rgb = picture(PixelFormat::RGB24, 2, 2);
        let mut bgra = picture(PixelFormat::BGRA, 2, 2);
        convert_i420(&src, &mut rgb).unwrap();
        convert_i420(&src, &mut bgra).unwrap();

        let rgb_px = &rgb.plane(0).data()[0..3];
        let bgra_px = &bgra.plane(0).data()[0..4];
        assert_eq!(bgra_px, &[rgb_px[2], rgb_px[1], rgb_px[0], 255]);
    }

    #[test]
    fn test_size_mismatch_rejected() {
        let src = picture(PixelFormat::I420, 4, 4);
        let mut dst = picture(PixelFormat::RGB24, 8, 8);
        assert!(matches!(
            convert_i420(&src, &mut dst),
            Err(StageError::Conversion(_))
        ));
    }

    #[test]
    fn test_planar_destination_rejected() {
        let src = picture(PixelFormat::I420, 4, 4);
        let mut dst = picture(PixelFormat::I420, 4, 4);
        assert!(convert_i420(&src, &mut dst).is_err());
    }
}
