//! Unity recording folders.
//!
//! Layout of a recording directory:
//!
//! ```text
//! <recording>/
//!   _img/000000001.png     rendered frames
//!   _layer/000000001.png   colour-coded segmentation masks
//!   layer.json             label → colour table
//! ```

use std::path::{Path, PathBuf};

use crate::labels::{LabelError, LabelMap};

/// Sub-folder holding the rendered frames.
pub const IMAGE_FOLDER: &str = "_img";
/// Sub-folder holding the segmentation masks.
pub const MASK_FOLDER: &str = "_layer";
/// Label table file name.
pub const LAYER_FILE: &str = "layer.json";

/// An opened recording with its frame lists and label table.
#[derive(Debug, Clone)]
pub struct Recording {
    /// Recording directory.
    pub root: PathBuf,

    /// Label table from `layer.json`.
    pub labels: LabelMap,

    /// Rendered frame paths, sorted.
    pub image_frames: Vec<PathBuf>,

    /// Segmentation mask paths, sorted.
    pub mask_frames: Vec<PathBuf>,

    /// Width of the first rendered frame.
    pub width: u32,

    /// Height of the first rendered frame.
    pub height: u32,
}

impl Recording {
    /// Open a recording directory.
    ///
    /// `stop_after` truncates both frame lists to at most that many frames.
    pub fn open(root: impl AsRef<Path>, stop_after: Option<usize>) -> Result<Self, RecordingError> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(RecordingError::Missing { path: root });
        }

        let labels = LabelMap::load(root.join(LAYER_FILE))?;

        let mut image_frames = list_png_frames(&root.join(IMAGE_FOLDER))?;
        let mut mask_frames = list_png_frames(&root.join(MASK_FOLDER))?;
        if let Some(limit) = stop_after {
            image_frames.truncate(limit);
            mask_frames.truncate(limit);
        }

        let first = image_frames.first().ok_or_else(|| RecordingError::NoFrames {
            path: root.join(IMAGE_FOLDER),
        })?;
        let (width, height) =
            image::image_dimensions(first).map_err(|e| RecordingError::Image {
                path: first.clone(),
                source: e,
            })?;

        tracing::debug!(
            recording = %root.display(),
            frames = image_frames.len(),
            masks = mask_frames.len(),
            labels = labels.len(),
            width,
            height,
            "Opened recording"
        );

        Ok(Self {
            root,
            labels,
            image_frames,
            mask_frames,
            width,
            height,
        })
    }

    /// Recording name, i.e. the directory's file name.
    pub fn name(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "recording".to_string())
    }

    /// Number of frames that can be processed (frames with a matching mask).
    pub fn frame_count(&self) -> usize {
        self.image_frames.len().min(self.mask_frames.len())
    }

    /// Check the recording for structural problems.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = vec![];

        if self.image_frames.len() != self.mask_frames.len() {
            issues.push(format!(
                "Frame count mismatch: {} images in {IMAGE_FOLDER}, {} masks in {MASK_FOLDER}",
                self.image_frames.len(),
                self.mask_frames.len()
            ));
        }

        match self.mask_frames.first() {
            None => issues.push(format!("No mask frames in {MASK_FOLDER}")),
            Some(first_mask) => match image::image_dimensions(first_mask) {
                Ok((w, h)) if (w, h) != (self.width, self.height) => issues.push(format!(
                    "Mask size {w}x{h} differs from frame size {}x{}",
                    self.width, self.height
                )),
                Ok(_) => {}
                Err(e) => issues.push(format!(
                    "Unreadable mask {}: {e}",
                    first_mask.display()
                )),
            },
        }

        if self.labels.is_empty() {
            issues.push(format!("{LAYER_FILE} defines no labels"));
        }

        issues
    }
}

/// List `*.png` files of a folder in lexicographic order.
fn list_png_frames(dir: &Path) -> Result<Vec<PathBuf>, RecordingError> {
    if !dir.is_dir() {
        return Err(RecordingError::Missing {
            path: dir.to_path_buf(),
        });
    }

    let entries = std::fs::read_dir(dir).map_err(|e| RecordingError::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut frames = vec![];
    for entry in entries {
        let entry = entry.map_err(|e| RecordingError::Io {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        let is_png = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
        if is_png && path.is_file() {
            frames.push(path);
        }
    }
    frames.sort();
    Ok(frames)
}

/// Errors that can occur when opening a recording.
#[derive(Debug, thiserror::Error)]
pub enum RecordingError {
    #[error("Recording path does not exist: {path}")]
    Missing { path: PathBuf },

    #[error("No frames found in {path}")]
    NoFrames { path: PathBuf },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read image {path}: {source}")]
    Image {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error(transparent)]
    Labels(#[from] LabelError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn write_recording(dir: &Path, images: usize, masks: usize) {
        let _ = std::fs::remove_dir_all(dir);
        std::fs::create_dir_all(dir.join(IMAGE_FOLDER)).unwrap();
        std::fs::create_dir_all(dir.join(MASK_FOLDER)).unwrap();
        std::fs::write(
            dir.join(LAYER_FILE),
            r##"{"labels":[{"name":"Ground","color":"#00FF00"},{"name":"waving","color":"#FF0000"}]}"##,
        )
        .unwrap();
        for i in 0..images {
            RgbImage::from_pixel(8, 6, Rgb([10, 10, 10]))
                .save(dir.join(IMAGE_FOLDER).join(format!("{:09}.png", i + 1)))
                .unwrap();
        }
        for i in 0..masks {
            RgbImage::from_pixel(8, 6, Rgb([0, 255, 0]))
                .save(dir.join(MASK_FOLDER).join(format!("{:09}.png", i + 1)))
                .unwrap();
        }
    }

    #[test]
    fn test_open_lists_sorted_frames_and_size() {
        let dir = std::env::temp_dir().join("actsim_test_recording_open");
        write_recording(&dir, 3, 3);
        std::fs::write(dir.join(IMAGE_FOLDER).join("notes.txt"), "ignored").unwrap();

        let recording = Recording::open(&dir, None).unwrap();
        assert_eq!(recording.name(), "actsim_test_recording_open");
        assert_eq!(recording.frame_count(), 3);
        assert_eq!((recording.width, recording.height), (8, 6));
        assert!(recording.image_frames[0].ends_with("000000001.png"));
        assert!(recording.image_frames[2].ends_with("000000003.png"));
        assert!(recording.validate().is_empty());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_stop_after_truncates_frames() {
        let dir = std::env::temp_dir().join("actsim_test_recording_stop");
        write_recording(&dir, 4, 4);

        let recording = Recording::open(&dir, Some(2)).unwrap();
        assert_eq!(recording.frame_count(), 2);
        assert_eq!(recording.mask_frames.len(), 2);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_validate_reports_count_mismatch() {
        let dir = std::env::temp_dir().join("actsim_test_recording_mismatch");
        write_recording(&dir, 3, 2);

        let recording = Recording::open(&dir, None).unwrap();
        let issues = recording.validate();
        assert_eq!(recording.frame_count(), 2);
        assert!(issues.iter().any(|i| i.contains("Frame count mismatch")));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_open_missing_mask_folder_fails() {
        let dir = std::env::temp_dir().join("actsim_test_recording_nomasks");
        write_recording(&dir, 1, 0);
        std::fs::remove_dir_all(dir.join(MASK_FOLDER)).unwrap();

        let err = Recording::open(&dir, None).unwrap_err();
        assert!(matches!(err, RecordingError::Missing { .. }));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_open_without_frames_fails() {
        let dir = std::env::temp_dir().join("actsim_test_recording_empty");
        write_recording(&dir, 0, 0);

        let err = Recording::open(&dir, None).unwrap_err();
        assert!(matches!(err, RecordingError::NoFrames { .. }));

        std::fs::remove_dir_all(&dir).ok();
    }
}
