//! Split-screen output modes and generation settings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::labels::DEFAULT_NO_ACTION_LABELS;

/// Maximum number of panels in one split-screen video.
pub const MAX_PANELS: usize = 4;

/// One panel of the split-screen output video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Rendered frame as-is.
    Original,
    /// Colour-coded segmentation mask.
    Mask,
    /// Half-transparent mask over the rendered frame.
    Overlay,
    /// Solid black, used as a spacer.
    Black,
    /// White silhouette of a single configured class.
    Oneclass,
    /// Rendered frame with labelled bounding boxes per action instance.
    Bbox,
}

impl OutputMode {
    pub const ALL: [OutputMode; 6] = [
        OutputMode::Original,
        OutputMode::Mask,
        OutputMode::Overlay,
        OutputMode::Black,
        OutputMode::Oneclass,
        OutputMode::Bbox,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OutputMode::Original => "original",
            OutputMode::Mask => "mask",
            OutputMode::Overlay => "overlay",
            OutputMode::Black => "black",
            OutputMode::Oneclass => "oneclass",
            OutputMode::Bbox => "bbox",
        }
    }

    /// Two-letter code used in output file names.
    pub fn short_code(self) -> &'static str {
        &self.as_str()[..2]
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputMode {
    type Err = ModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        OutputMode::ALL
            .into_iter()
            .find(|m| m.as_str() == wanted)
            .ok_or_else(|| ModeError::Unknown {
                value: s.to_string(),
            })
    }
}

/// Parse a comma separated mode list such as `original,mask,overlay,bbox`.
pub fn parse_mode_list(input: &str) -> Result<Vec<OutputMode>, ModeError> {
    input
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(OutputMode::from_str)
        .collect()
}

/// Lay out the requested modes for the compositor.
///
/// Three panels get a black fourth panel so they fill a 2x2 grid.
pub fn normalize_modes(modes: &[OutputMode]) -> Result<Vec<OutputMode>, ModeError> {
    if modes.is_empty() {
        return Err(ModeError::Empty);
    }
    if modes.len() > MAX_PANELS {
        return Err(ModeError::TooMany { count: modes.len() });
    }

    let mut normalized = modes.to_vec();
    if normalized.len() == 3 {
        normalized.push(OutputMode::Black);
    }
    Ok(normalized)
}

/// File name of the split-screen video, e.g. `output_ormaovbb.mp4`.
pub fn output_file_name(modes: &[OutputMode], lossy: bool) -> String {
    let codes: String = modes.iter().map(|m| m.short_code()).collect();
    let ext = if lossy { "mp4" } else { "avi" };
    format!("output_{codes}.{ext}")
}

/// Settings for one generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSettings {
    /// Panels in layout order.
    pub modes: Vec<OutputMode>,

    /// Frame rate of the input recording and output videos.
    pub fps: u32,

    /// Process at most this many frames.
    pub stop_after: Option<usize>,

    /// Class shown by the `oneclass` panel.
    pub oneclass_label: String,

    /// Labels excluded from tracking.
    pub no_action_labels: Vec<String>,

    /// Lossy mp4 output instead of lossless png-in-avi.
    pub lossy: bool,

    /// Write per-instance tube clips.
    pub save_tubes: bool,

    /// Tube output folder relative to the recording.
    pub tubes_folder: String,

    /// Pixels added on each side of a tube crop.
    pub tube_padding: u32,

    /// Minimum `max_frame - min_frame` for a tube to be written.
    pub min_tube_frames: u64,

    /// Weight of the rendered frame in the overlay panel.
    pub overlay_alpha: f32,

    /// Contours must cover more than this fraction of the frame area.
    pub min_contour_area_ratio: f64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            modes: vec![
                OutputMode::Original,
                OutputMode::Mask,
                OutputMode::Overlay,
                OutputMode::Bbox,
            ],
            fps: 30,
            stop_after: None,
            oneclass_label: "kicking".to_string(),
            no_action_labels: DEFAULT_NO_ACTION_LABELS
                .iter()
                .map(|l| l.to_string())
                .collect(),
            lossy: true,
            save_tubes: true,
            tubes_folder: "tubes".to_string(),
            tube_padding: 50,
            min_tube_frames: 30,
            overlay_alpha: 0.5,
            min_contour_area_ratio: 1.0 / (100.0 * 100.0),
        }
    }
}

impl GenerationSettings {
    /// Minimum tube length for `secs` seconds at the configured frame rate.
    pub fn with_min_tube_secs(mut self, secs: f64) -> Self {
        self.min_tube_frames = (secs.max(0.0) * self.fps as f64).round() as u64;
        self
    }

    /// Check the settings and return the normalized panel layout.
    pub fn validate(&self) -> Result<Vec<OutputMode>, ModeError> {
        if self.fps == 0 {
            return Err(ModeError::InvalidFps);
        }
        if self.save_tubes && !self.modes.contains(&OutputMode::Bbox) {
            return Err(ModeError::TubesNeedBbox);
        }
        normalize_modes(&self.modes)
    }

    /// Whether the instance tracker has to run.
    pub fn needs_tracking(&self) -> bool {
        self.modes.contains(&OutputMode::Bbox)
    }
}

/// Errors in mode lists and generation settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModeError {
    #[error("Unknown output mode: {value:?} (expected original, mask, overlay, black, oneclass, bbox)")]
    Unknown { value: String },

    #[error("At least one output mode is required")]
    Empty,

    #[error("There is a maximum of {MAX_PANELS} split-screen panels, got {count}")]
    TooMany { count: usize },

    #[error("Saving tubes requires the bbox mode")]
    TubesNeedBbox,

    #[error("Frame rate must be positive")]
    InvalidFps,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mode_list() {
        let modes = parse_mode_list("original, Mask,overlay,bbox").unwrap();
        assert_eq!(
            modes,
            vec![
                OutputMode::Original,
                OutputMode::Mask,
                OutputMode::Overlay,
                OutputMode::Bbox
            ]
        );
        assert!(matches!(
            parse_mode_list("original,heatmap"),
            Err(ModeError::Unknown { .. })
        ));
    }

    #[test]
    fn test_three_modes_get_black_spacer() {
        let modes = normalize_modes(&[OutputMode::Original, OutputMode::Mask, OutputMode::Bbox])
            .unwrap();
        assert_eq!(modes.len(), 4);
        assert_eq!(modes[3], OutputMode::Black);
    }

    #[test]
    fn test_normalize_rejects_empty_and_too_many() {
        assert_eq!(normalize_modes(&[]), Err(ModeError::Empty));
        let five = [OutputMode::Original; 5];
        assert_eq!(normalize_modes(&five), Err(ModeError::TooMany { count: 5 }));
    }

    #[test]
    fn test_output_file_name_uses_two_letter_codes() {
        let modes = [
            OutputMode::Original,
            OutputMode::Mask,
            OutputMode::Overlay,
            OutputMode::Bbox,
        ];
        assert_eq!(output_file_name(&modes, true), "output_ormaovbb.mp4");
        assert_eq!(
            output_file_name(&[OutputMode::Oneclass, OutputMode::Black], false),
            "output_onbl.avi"
        );
    }

    #[test]
    fn test_tubes_require_bbox() {
        let settings = GenerationSettings {
            modes: vec![OutputMode::Original, OutputMode::Mask],
            ..GenerationSettings::default()
        };
        assert_eq!(settings.validate(), Err(ModeError::TubesNeedBbox));

        let settings = GenerationSettings {
            save_tubes: false,
            ..settings
        };
        assert_eq!(settings.validate().unwrap().len(), 2);
    }

    #[test]
    fn test_min_tube_secs_scales_with_fps() {
        let settings = GenerationSettings {
            fps: 25,
            ..GenerationSettings::default()
        }
        .with_min_tube_secs(2.0);
        assert_eq!(settings.min_tube_frames, 50);
    }
}
