//! External region extraction from binary class masks.
//!
//! Only outermost borders count as regions. Holes are filled, and blobs
//! nested inside a hole belong to the enclosing region.

use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType};
use imageproc::drawing::draw_polygon_mut;
use imageproc::geometry::min_area_rect;
use imageproc::point::Point;
use serde::{Deserialize, Serialize};

use crate::mask::FOREGROUND;

/// Axis-aligned box in pixel coordinates.
///
/// `w` and `h` count pixels, so the box covers `x..x + w` horizontally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl BoundingBox {
    /// Corner points: top-left, bottom-left, bottom-right, top-right.
    pub fn corners(&self) -> [(u32, u32); 4] {
        [
            (self.x, self.y),
            (self.x, self.y + self.h),
            (self.x + self.w, self.y + self.h),
            (self.x + self.w, self.y),
        ]
    }

    fn from_points(points: &[Point<i32>]) -> Option<Self> {
        let min_x = points.iter().map(|p| p.x).min()?;
        let max_x = points.iter().map(|p| p.x).max()?;
        let min_y = points.iter().map(|p| p.y).min()?;
        let max_y = points.iter().map(|p| p.y).max()?;
        Some(Self {
            x: min_x.max(0) as u32,
            y: min_y.max(0) as u32,
            w: (max_x - min_x + 1) as u32,
            h: (max_y - min_y + 1) as u32,
        })
    }
}

/// Filled instance mask, stored only for its bounding box.
#[derive(Debug, Clone)]
pub struct RegionMask {
    x: u32,
    y: u32,
    pixels: GrayImage,
}

impl RegionMask {
    pub fn new(x: u32, y: u32, pixels: GrayImage) -> Self {
        Self { x, y, pixels }
    }

    /// Whether the frame pixel `(px, py)` belongs to the region.
    pub fn contains(&self, px: u32, py: u32) -> bool {
        if px < self.x || py < self.y {
            return false;
        }
        let (lx, ly) = (px - self.x, py - self.y);
        lx < self.pixels.width() && ly < self.pixels.height() && self.pixels.get_pixel(lx, ly).0[0] != 0
    }

    /// Number of filled pixels.
    pub fn pixel_count(&self) -> u64 {
        self.pixels.pixels().filter(|p| p.0[0] != 0).count() as u64
    }

    /// Number of frame pixels filled in both masks.
    pub fn overlap(&self, other: &RegionMask) -> u64 {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = (self.x + self.pixels.width()).min(other.x + other.pixels.width());
        let bottom = (self.y + self.pixels.height()).min(other.y + other.pixels.height());
        if left >= right || top >= bottom {
            return 0;
        }

        let mut count = 0;
        for py in top..bottom {
            for px in left..right {
                if self.contains(px, py) && other.contains(px, py) {
                    count += 1;
                }
            }
        }
        count
    }
}

/// One external region of a class mask.
#[derive(Debug, Clone)]
pub struct Region {
    /// Polygon area enclosed by the border.
    pub area: f64,
    /// Axis-aligned bounding box.
    pub bbox: BoundingBox,
    /// Minimum-area rotated rectangle, four corner points.
    pub rotated_box: [(i32, i32); 4],
    /// Filled region.
    pub mask: RegionMask,
}

/// Area threshold for a frame: regions must exceed `ratio` of the frame.
pub fn min_region_area(width: u32, height: u32, ratio: f64) -> f64 {
    width as f64 * height as f64 * ratio
}

/// Shoelace area of a closed polygon.
pub fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64)
        .sum();
    twice.abs() as f64 / 2.0
}

/// Find the external regions of `mask` with area above `min_area`,
/// largest first.
pub fn external_regions(mask: &GrayImage, min_area: f64) -> Vec<Region> {
    let mut regions: Vec<Region> = find_contours::<i32>(&with_background_border(mask))
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .filter_map(|contour| {
            let points: Vec<Point<i32>> = contour
                .points
                .iter()
                .map(|p| Point::new(p.x - 1, p.y - 1))
                .collect();
            let area = polygon_area(&points);
            if area <= min_area {
                return None;
            }
            let bbox = BoundingBox::from_points(&points)?;
            let rotated = min_area_rect(&points);
            Some(Region {
                area,
                bbox,
                rotated_box: rotated.map(|p| (p.x, p.y)),
                mask: RegionMask::new(bbox.x, bbox.y, fill_polygon(&points, bbox)),
            })
        })
        .collect();

    regions.sort_by(|a, b| b.area.total_cmp(&a.area));
    regions
}

/// Copy of `mask` inside a one pixel background frame.
///
/// `find_contours` only reports blobs touching the image edge as outer
/// borders when there is background on every side of them.
fn with_background_border(mask: &GrayImage) -> GrayImage {
    let mut padded = GrayImage::new(mask.width() + 2, mask.height() + 2);
    for (x, y, pixel) in mask.enumerate_pixels() {
        padded.put_pixel(x + 1, y + 1, *pixel);
    }
    padded
}

/// Rasterize the border polygon into a bbox-sized mask.
fn fill_polygon(points: &[Point<i32>], bbox: BoundingBox) -> GrayImage {
    let mut canvas = GrayImage::new(bbox.w, bbox.h);
    let mut poly: Vec<Point<i32>> = points
        .iter()
        .map(|p| Point::new(p.x - bbox.x as i32, p.y - bbox.y as i32))
        .collect();
    // draw_polygon_mut requires an open polygon.
    while poly.len() > 1 && poly.first() == poly.last() {
        poly.pop();
    }

    if poly.len() < 3 {
        for p in &poly {
            canvas.put_pixel(p.x as u32, p.y as u32, Luma([FOREGROUND]));
        }
    } else {
        draw_polygon_mut(&mut canvas, &poly, Luma([FOREGROUND]));
    }
    canvas
}
