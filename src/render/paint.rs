//! The paint routine shared by both renderers
//!
//! Forward transform (viewport units): translate to `center + offset`,
//! rotate by the view rotation, draw the bitmap centered at
//! `natural * total_scale`. Each device pixel is mapped back through the
//! inverse transform and sampled nearest-neighbour.

use image::{Rgba, RgbaImage};
use rayon::prelude::*;

use super::bitmap::Bitmap;
use super::request::RenderRequest;
use crate::view::geometry::rotate_vec;

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Paint `bitmap` into `target` according to `request`.
///
/// `target` is blanked first; with no bitmap (or a degenerate scale) it
/// stays blank.
pub fn paint(target: &mut RgbaImage, bitmap: Option<&Bitmap>, request: &RenderRequest) {
    let width = target.width() as usize;
    if width == 0 || target.height() == 0 {
        return;
    }

    let total_scale = request.total_scale();
    let Some(bitmap) = bitmap.filter(|_| total_scale.is_finite() && total_scale > 0.0) else {
        for px in target.pixels_mut() {
            *px = TRANSPARENT;
        }
        return;
    };

    let source = bitmap.image();
    let (src_w, src_h) = (source.width() as f32, source.height() as f32);
    let dpr = if request.device_pixel_ratio > 0.0 {
        request.device_pixel_ratio
    } else {
        1.0
    };
    let origin_x = request.viewport_width / 2.0 + request.offset.x;
    let origin_y = request.viewport_height / 2.0 + request.offset.y;
    let theta = request.rotation.radians();
    let inv_scale = 1.0 / total_scale;

    let stride = width * 4;
    let samples: &mut [u8] = target;

    samples
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row)| {
            let view_y = (y as f32 + 0.5) / dpr - origin_y;
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                let view_x = (x as f32 + 0.5) / dpr - origin_x;
                let (local_x, local_y) = rotate_vec(view_x, view_y, -theta);
                let sx = local_x * inv_scale + src_w / 2.0;
                let sy = local_y * inv_scale + src_h / 2.0;

                let color = if sx >= 0.0 && sy >= 0.0 && sx < src_w && sy < src_h {
                    *source.get_pixel(sx as u32, sy as u32)
                } else {
                    TRANSPARENT
                };
                px.copy_from_slice(&color.0);
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{Offset, Rotation};

    fn request(rotation: Rotation, offset: Offset) -> RenderRequest {
        RenderRequest {
            viewport_width: 4.0,
            viewport_height: 4.0,
            base_scale: 1.0,
            scale: 1.0,
            offset,
            rotation,
            device_pixel_ratio: 1.0,
        }
    }

    // 2x2 bitmap: red, green / blue, white
    fn quad() -> Bitmap {
        let mut img = RgbaImage::new(2, 2);
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        img.put_pixel(1, 0, Rgba([0, 255, 0, 255]));
        img.put_pixel(0, 1, Rgba([0, 0, 255, 255]));
        img.put_pixel(1, 1, Rgba([255, 255, 255, 255]));
        Bitmap::new(img)
    }

    #[test]
    fn centers_bitmap_without_rotation() {
        let mut target = RgbaImage::new(4, 4);
        paint(&mut target, Some(&quad()), &request(Rotation::Deg0, Offset::ZERO));
        assert_eq!(target.get_pixel(1, 1).0, [255, 0, 0, 255]);
        assert_eq!(target.get_pixel(2, 1).0, [0, 255, 0, 255]);
        assert_eq!(target.get_pixel(1, 2).0, [0, 0, 255, 255]);
        assert_eq!(target.get_pixel(0, 0).0, [0, 0, 0, 0]);
    }

    #[test]
    fn rotates_clockwise() {
        let mut target = RgbaImage::new(4, 4);
        paint(&mut target, Some(&quad()), &request(Rotation::Deg90, Offset::ZERO));
        // After a clockwise quarter turn the top-left (red) lands top-right.
        assert_eq!(target.get_pixel(2, 1).0, [255, 0, 0, 255]);
        assert_eq!(target.get_pixel(1, 1).0, [0, 0, 255, 255]);
    }

    #[test]
    fn offset_translates_content() {
        let mut target = RgbaImage::new(4, 4);
        paint(&mut target, Some(&quad()), &request(Rotation::Deg0, Offset::new(1.0, 1.0)));
        assert_eq!(target.get_pixel(2, 2).0, [255, 0, 0, 255]);
    }

    #[test]
    fn no_bitmap_blanks_target() {
        let mut target = RgbaImage::from_pixel(4, 4, Rgba([9, 9, 9, 9]));
        paint(&mut target, None, &request(Rotation::Deg0, Offset::ZERO));
        assert!(target.pixels().all(|p| p.0 == [0, 0, 0, 0]));
    }
}
