//! Tube manifest (`<tubes_folder>/manifest.json`).
//!
//! Lists every tube clip written for a recording, with the crop rectangle
//! it was cut from and the per-frame boxes of the instance.

use std::path::{Path, PathBuf};

use actsim_common::error::ActsimResult;
use actsim_processing_core::tracking::FrameObservation;
use actsim_processing_core::tube::{CropRect, Tube};
use serde::{Deserialize, Serialize};

/// Manifest file name inside the tubes folder.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Top-level manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TubeManifest {
    /// Recording the tubes were cut from.
    pub recording: String,

    /// Generation timestamp (RFC 3339).
    pub generated_at: String,

    /// Frame rate of the clips.
    pub fps: u32,

    /// Padding applied around each tube.
    pub padding: u32,

    /// Minimum `max_frame - min_frame` a tube needed to be written.
    pub min_tube_frames: u64,

    /// Written tubes, in write order.
    pub tubes: Vec<ManifestEntry>,
}

/// One written tube clip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub id: u64,
    pub label: String,

    /// Clip path relative to the tubes folder.
    pub path: PathBuf,

    pub min_frame: usize,
    pub max_frame: usize,
    pub crop: CropRect,
    pub frames: Vec<FrameObservation>,
}

impl TubeManifest {
    pub fn new(recording: impl Into<String>, fps: u32, padding: u32, min_tube_frames: u64) -> Self {
        Self {
            recording: recording.into(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            fps,
            padding,
            min_tube_frames,
            tubes: vec![],
        }
    }

    /// Record a written tube.
    pub fn push(&mut self, tube: &Tube, path: PathBuf, crop: CropRect) {
        self.tubes.push(ManifestEntry {
            id: tube.id,
            label: tube.label.clone(),
            path,
            min_frame: tube.min_frame,
            max_frame: tube.max_frame,
            crop,
            frames: tube.frames.clone(),
        });
    }

    /// Write the manifest into `tubes_dir`, returning the file path.
    pub fn save(&self, tubes_dir: &Path) -> ActsimResult<PathBuf> {
        std::fs::create_dir_all(tubes_dir)?;
        let path = tubes_dir.join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;
        Ok(path)
    }

    pub fn load(path: &Path) -> ActsimResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actsim_processing_core::contours::BoundingBox;

    fn tube() -> Tube {
        Tube {
            id: 4,
            label: "waving".to_string(),
            min_frame: 2,
            max_frame: 40,
            min_x: 10,
            min_y: 12,
            max_x: 30,
            max_y: 50,
            frames: vec![FrameObservation {
                frame: 2,
                bbox: BoundingBox {
                    x: 10,
                    y: 12,
                    w: 20,
                    h: 38,
                },
                rotated_box: [(10, 12), (30, 12), (30, 50), (10, 50)],
            }],
        }
    }

    #[test]
    fn test_manifest_save_and_load() {
        let dir = std::env::temp_dir().join("actsim-test-manifest");
        let _ = std::fs::remove_dir_all(&dir);

        let mut manifest = TubeManifest::new("rec01", 30, 50, 30);
        let crop = CropRect {
            x: 0,
            y: 0,
            w: 80,
            h: 100,
        };
        manifest.push(&tube(), PathBuf::from("waving/rec01_tube_4.mp4"), crop);
        let path = manifest.save(&dir).unwrap();
        assert_eq!(path, dir.join(MANIFEST_FILE));

        let loaded = TubeManifest::load(&path).unwrap();
        assert_eq!(loaded.recording, "rec01");
        assert_eq!(loaded.tubes.len(), 1);
        assert_eq!(loaded.tubes[0].id, 4);
        assert_eq!(loaded.tubes[0].crop, crop);
        assert_eq!(loaded.tubes[0].frames, tube().frames);
        assert!(chrono::DateTime::parse_from_rfc3339(&loaded.generated_at).is_ok());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
