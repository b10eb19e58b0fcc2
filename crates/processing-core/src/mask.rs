//! Binary masks for a single segmentation class.

use actsim_recording_model::labels::LabelColor;
use image::{GrayImage, Luma, RgbImage};

/// Foreground value in binary masks.
pub const FOREGROUND: u8 = 255;

/// Mask that is white exactly where the segmentation pixel equals `color`.
pub fn class_mask(segmentation: &RgbImage, color: LabelColor) -> GrayImage {
    let target = color.rgb();
    let mut mask = GrayImage::new(segmentation.width(), segmentation.height());
    for (src, dst) in segmentation.pixels().zip(mask.pixels_mut()) {
        if src.0 == target {
            *dst = Luma([FOREGROUND]);
        }
    }
    mask
}

/// Number of foreground pixels.
pub fn foreground_count(mask: &GrayImage) -> u64 {
    mask.pixels().filter(|p| p.0[0] != 0).count() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn class_mask_matches_exact_colour_only() {
        let mut seg = RgbImage::from_pixel(4, 3, Rgb([0, 0, 0]));
        seg.put_pixel(1, 1, Rgb([255, 127, 0]));
        seg.put_pixel(2, 1, Rgb([255, 128, 0]));
        seg.put_pixel(3, 2, Rgb([255, 127, 0]));

        let mask = class_mask(&seg, LabelColor([255, 127, 0]));
        assert_eq!(mask.dimensions(), (4, 3));
        assert_eq!(mask.get_pixel(1, 1).0[0], FOREGROUND);
        assert_eq!(mask.get_pixel(2, 1).0[0], 0);
        assert_eq!(mask.get_pixel(3, 2).0[0], FOREGROUND);
        assert_eq!(foreground_count(&mask), 2);
    }

    #[test]
    fn class_mask_of_absent_colour_is_empty() {
        let seg = RgbImage::from_pixel(5, 5, Rgb([10, 20, 30]));
        let mask = class_mask(&seg, LabelColor([1, 2, 3]));
        assert_eq!(foreground_count(&mask), 0);
    }
}
