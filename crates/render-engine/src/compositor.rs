//! Panel rendering and split-screen composition.
//!
//! Each output frame is built from one panel per requested mode:
//!
//! ```text
//! 1 panel   2 panels    4 panels
//! ┌─────┐   ┌──┬──┐     ┌──┬──┐
//! │  0  │   │0 │1 │     │0 │1 │
//! └─────┘   └──┴──┘     ├──┼──┤
//!                       │2 │3 │
//!                       └──┴──┘
//! ```

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use actsim_common::error::{ActsimError, ActsimResult};
use actsim_processing_core::contours::BoundingBox;
use actsim_processing_core::mask::class_mask;
use actsim_recording_model::labels::LabelColor;
use actsim_recording_model::modes::OutputMode;
use image::{imageops, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

/// Stroke width of bounding boxes in pixels.
const BOX_THICKNESS: i32 = 3;
/// Caption glyph height in pixels.
const CAPTION_SCALE: f32 = 24.0;

/// A labelled box to draw on the `bbox` panel.
#[derive(Debug, Clone)]
pub struct BoxAnnotation<'a> {
    pub label: &'a str,
    pub id: u64,
    pub bbox: BoundingBox,
    pub color: LabelColor,
}

/// Renders the per-mode panels of one frame.
pub struct PanelRenderer {
    modes: Vec<OutputMode>,
    overlay_alpha: f32,
    oneclass_color: Option<LabelColor>,
    caption_font: Option<FontVec>,
}

impl std::fmt::Debug for PanelRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PanelRenderer")
            .field("modes", &self.modes)
            .field("overlay_alpha", &self.overlay_alpha)
            .field("oneclass_color", &self.oneclass_color)
            .field("caption_font", &self.caption_font.is_some())
            .finish()
    }
}

impl PanelRenderer {
    pub fn new(modes: Vec<OutputMode>, overlay_alpha: f32) -> Self {
        Self {
            modes,
            overlay_alpha: overlay_alpha.clamp(0.0, 1.0),
            oneclass_color: None,
            caption_font: None,
        }
    }

    /// Colour highlighted by the `oneclass` panel.
    pub fn with_oneclass_color(mut self, color: LabelColor) -> Self {
        self.oneclass_color = Some(color);
        self
    }

    /// Font for `"<label> <id>"` captions on the `bbox` panel.
    pub fn with_caption_font(mut self, font: FontVec) -> Self {
        self.caption_font = Some(font);
        self
    }

    pub fn modes(&self) -> &[OutputMode] {
        &self.modes
    }

    /// Render one panel per mode, in mode order.
    pub fn render(
        &self,
        frame: &RgbImage,
        mask: &RgbImage,
        boxes: &[BoxAnnotation<'_>],
    ) -> ActsimResult<Vec<RgbImage>> {
        if frame.dimensions() != mask.dimensions() {
            return Err(ActsimError::render(format!(
                "Mask size {:?} differs from frame size {:?}",
                mask.dimensions(),
                frame.dimensions()
            )));
        }

        self.modes
            .iter()
            .map(|mode| match mode {
                OutputMode::Original => Ok(frame.clone()),
                OutputMode::Mask => Ok(mask.clone()),
                OutputMode::Overlay => Ok(blend(frame, mask, self.overlay_alpha)),
                OutputMode::Black => Ok(RgbImage::new(frame.width(), frame.height())),
                OutputMode::Oneclass => {
                    let color = self.oneclass_color.ok_or_else(|| {
                        ActsimError::render("oneclass panel requested without a class colour")
                    })?;
                    Ok(gray_to_rgb(&class_mask(mask, color)))
                }
                OutputMode::Bbox => Ok(self.draw_boxes(frame, boxes)),
            })
            .collect()
    }

    fn draw_boxes(&self, frame: &RgbImage, boxes: &[BoxAnnotation<'_>]) -> RgbImage {
        let mut canvas = frame.clone();
        for annotation in boxes {
            let color = Rgb(annotation.color.rgb());
            let bbox = annotation.bbox;
            for t in -(BOX_THICKNESS / 2)..=(BOX_THICKNESS / 2) {
                let w = (bbox.w as i32 + 1 - 2 * t).max(1) as u32;
                let h = (bbox.h as i32 + 1 - 2 * t).max(1) as u32;
                let rect = Rect::at(bbox.x as i32 + t, bbox.y as i32 + t).of_size(w, h);
                draw_hollow_rect_mut(&mut canvas, rect, color);
            }

            if let Some(font) = &self.caption_font {
                let caption = format!("{} {}", annotation.label, annotation.id);
                let y = bbox.y as i32 - CAPTION_SCALE as i32 - BOX_THICKNESS;
                draw_text_mut(
                    &mut canvas,
                    color,
                    bbox.x as i32,
                    y.max(0),
                    PxScale::from(CAPTION_SCALE),
                    font,
                    &caption,
                );
            }
        }
        canvas
    }
}

/// Load a TTF/OTF caption font.
pub fn load_caption_font(path: &Path) -> ActsimResult<FontVec> {
    if !path.is_file() {
        return Err(ActsimError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let bytes = std::fs::read(path).map_err(|e| {
        ActsimError::config(format!("Failed to read font {}: {e}", path.display()))
    })?;
    FontVec::try_from_vec(bytes)
        .map_err(|e| ActsimError::config(format!("Invalid font {}: {e}", path.display())))
}

/// `alpha * a + (1 - alpha) * b`, rounded and saturated per channel.
pub fn blend(a: &RgbImage, b: &RgbImage, alpha: f32) -> RgbImage {
    let mut out = RgbImage::new(a.width(), a.height());
    for ((pa, pb), po) in a.pixels().zip(b.pixels()).zip(out.pixels_mut()) {
        for c in 0..3 {
            let v = alpha * pa.0[c] as f32 + (1.0 - alpha) * pb.0[c] as f32;
            po.0[c] = v.round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

fn gray_to_rgb(gray: &image::GrayImage) -> RgbImage {
    let mut out = RgbImage::new(gray.width(), gray.height());
    for (g, o) in gray.pixels().zip(out.pixels_mut()) {
        *o = Rgb([g.0[0]; 3]);
    }
    out
}

/// Output size for `panels` panels of `width` x `height`.
pub fn output_size(width: u32, height: u32, panels: usize) -> ActsimResult<(u32, u32)> {
    match panels {
        1 => Ok((width, height)),
        2 => Ok((width * 2, height)),
        4 => Ok((width * 2, height * 2)),
        n => Err(ActsimError::render(format!(
            "Invalid panel count {n}: expected 1, 2, or 4"
        ))),
    }
}

/// Tile panels into one frame.
pub fn compose(panels: &[RgbImage]) -> ActsimResult<RgbImage> {
    let first = panels
        .first()
        .ok_or_else(|| ActsimError::render("No panels to compose"))?;
    let (w, h) = first.dimensions();
    if panels.iter().any(|p| p.dimensions() != (w, h)) {
        return Err(ActsimError::render("Panels differ in size"));
    }

    let (out_w, out_h) = output_size(w, h, panels.len())?;
    if panels.len() == 1 {
        return Ok(first.clone());
    }

    let mut canvas = RgbImage::new(out_w, out_h);
    for (i, panel) in panels.iter().enumerate() {
        let col = (i % 2) as i64;
        let row = (i / 2) as i64;
        imageops::replace(&mut canvas, panel, col * w as i64, row * h as i64);
    }
    Ok(canvas)
}
