//! Action instance tubes: the spatio-temporal extent of a retired instance.

use serde::{Deserialize, Serialize};

use crate::tracking::{FrameObservation, Instance};

/// Spatio-temporal bounds of one tracked instance.
#[derive(Debug, Clone, Serialize)]
pub struct Tube {
    /// Instance id.
    pub id: u64,
    /// Action label.
    pub label: String,
    pub min_frame: usize,
    pub max_frame: usize,
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
    /// Per-frame boxes the bounds were computed from.
    pub frames: Vec<FrameObservation>,
}

/// Crop rectangle in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Tube {
    /// Bounds over every bounding-box corner of every frame.
    pub fn from_instance(instance: Instance) -> Self {
        let mut tube = Tube {
            id: instance.id,
            label: instance.label,
            min_frame: usize::MAX,
            max_frame: 0,
            min_x: u32::MAX,
            min_y: u32::MAX,
            max_x: 0,
            max_y: 0,
            frames: vec![],
        };

        for obs in &instance.frames {
            tube.min_frame = tube.min_frame.min(obs.frame);
            tube.max_frame = tube.max_frame.max(obs.frame);
            for (x, y) in obs.bbox.corners() {
                tube.min_x = tube.min_x.min(x);
                tube.min_y = tube.min_y.min(y);
                tube.max_x = tube.max_x.max(x);
                tube.max_y = tube.max_y.max(y);
            }
        }
        if instance.frames.is_empty() {
            tube.min_frame = 0;
            tube.min_x = 0;
            tube.min_y = 0;
        }
        tube.frames = instance.frames;
        tube
    }

    /// Frames spanned, counted as `max_frame - min_frame`.
    pub fn len_frames(&self) -> usize {
        self.max_frame - self.min_frame
    }

    /// Whether the tube is long enough to be written.
    pub fn is_long_enough(&self, min_frames: u64) -> bool {
        self.len_frames() as u64 >= min_frames
    }

    /// Tube bounds padded on each side and clamped to a `width` x `height` frame.
    pub fn crop(&self, padding: u32, width: u32, height: u32) -> CropRect {
        let x0 = self.min_x.saturating_sub(padding).min(width);
        let y0 = self.min_y.saturating_sub(padding).min(height);
        let x1 = self.max_x.saturating_add(padding).min(width);
        let y1 = self.max_y.saturating_add(padding).min(height);
        CropRect {
            x: x0,
            y: y0,
            w: x1.saturating_sub(x0),
            h: y1.saturating_sub(y0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contours::external_regions;
    use crate::mask::FOREGROUND;
    use crate::tracking::InstanceDb;
    use image::{GrayImage, Luma};
    use proptest::prelude::*;

    fn track_square_path(path: &[(u32, u32)]) -> Instance {
        let mut db = InstanceDb::new();
        for (frame, &(x, y)) in path.iter().enumerate() {
            let mut mask = GrayImage::new(200, 100);
            for py in y..y + 10 {
                for px in x..x + 10 {
                    mask.put_pixel(px, py, Luma([FOREGROUND]));
                }
            }
            let region = external_regions(&mask, 0.0).remove(0);
            db.observe("walking", frame, region);
        }
        db.retire_all().remove(0)
    }

    #[test]
    fn tube_spans_all_frames_and_corners() {
        let instance = track_square_path(&[(20, 20), (24, 22), (28, 25)]);
        let tube = Tube::from_instance(instance);
        assert_eq!(tube.id, 1);
        assert_eq!(tube.label, "walking");
        assert_eq!((tube.min_frame, tube.max_frame), (0, 2));
        assert_eq!(tube.len_frames(), 2);
        assert_eq!((tube.min_x, tube.min_y), (20, 20));
        // Corners reach x + w and y + h of the last box.
        assert_eq!((tube.max_x, tube.max_y), (38, 35));
        assert_eq!(tube.frames.len(), 3);
    }

    #[test]
    fn crop_is_padded_and_clamped() {
        let instance = track_square_path(&[(5, 80), (8, 85)]);
        let tube = Tube::from_instance(instance);
        let crop = tube.crop(50, 200, 100);
        assert_eq!(crop, CropRect { x: 0, y: 30, w: 68, h: 70 });
    }

    #[test]
    fn length_filter_uses_frame_span() {
        let instance = track_square_path(&[(20, 20), (21, 20), (22, 20), (23, 20)]);
        let tube = Tube::from_instance(instance);
        assert!(tube.is_long_enough(3));
        assert!(!tube.is_long_enough(4));
    }

    proptest! {
        #[test]
        fn crop_stays_inside_frame(
            min_x in 0u32..600, min_y in 0u32..400,
            w in 1u32..300, h in 1u32..300,
            padding in 0u32..100,
        ) {
            let (width, height) = (640u32, 480u32);
            let tube = Tube {
                id: 1,
                label: "x".into(),
                min_frame: 0,
                max_frame: 1,
                min_x,
                min_y,
                max_x: (min_x + w).min(width),
                max_y: (min_y + h).min(height),
                frames: vec![],
            };
            let crop = tube.crop(padding, width, height);
            prop_assert!(crop.x + crop.w <= width);
            prop_assert!(crop.y + crop.h <= height);
            prop_assert!(crop.x <= tube.min_x);
            prop_assert!(crop.y <= tube.min_y);
            prop_assert!(crop.x + crop.w >= tube.max_x);
            prop_assert!(crop.y + crop.h >= tube.max_y);
        }
    }
}
