//! Published dataset release metadata.
//!
//! Each release of the dataset is described by one row of a catalog
//! (`releases.json`). The numbers are editorial, so the catalog checks
//! only that they agree with each other.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Video file extensions counted when summarizing a tube tree.
const VIDEO_EXTENSIONS: [&str; 2] = ["mp4", "avi"];

/// Smallest and largest number of videos in any one class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerClassRange {
    pub min: u64,
    pub max: u64,
}

/// One dataset release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRelease {
    /// Release name, e.g. `v1.0`.
    pub version: String,

    /// Number of action clips.
    pub video_count: u64,

    /// Number of action classes.
    pub class_count: u64,

    /// Clips per class.
    pub videos_per_class: PerClassRange,

    /// Total size of all clips in bytes.
    pub total_size_bytes: u64,

    /// Length of the uncut source recordings in seconds.
    #[serde(default)]
    pub original_video_length_secs: f64,

    /// Size of the uncut source recordings in bytes.
    #[serde(default)]
    pub original_video_size_bytes: u64,

    /// Publication year.
    pub year: u16,
}

/// A consistency problem found in a catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyIssue {
    /// Release the issue belongs to.
    pub version: String,
    /// Human-readable description.
    pub message: String,
}

/// The full list of releases, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReleaseCatalog {
    pub releases: Vec<DatasetRelease>,
}

impl DatasetRelease {
    /// Mean clip size, `None` for an empty release.
    pub fn average_video_size_bytes(&self) -> Option<u64> {
        if self.video_count == 0 {
            None
        } else {
            Some(self.total_size_bytes / self.video_count)
        }
    }

    /// Derive a release row from a generated tube tree
    /// (`<tubes_dir>/<label>/<clip>.mp4`).
    ///
    /// Classes without any clip are not counted.
    pub fn summarize_tubes(
        tubes_dir: impl AsRef<Path>,
        version: impl Into<String>,
        year: u16,
    ) -> Result<Self, DatasetError> {
        let tubes_dir = tubes_dir.as_ref();
        let mut per_class: BTreeMap<String, u64> = BTreeMap::new();
        let mut total_size_bytes = 0u64;

        for class_entry in read_dir(tubes_dir)? {
            let class_path = class_entry.path();
            if !class_path.is_dir() {
                continue;
            }
            let class_name = class_entry.file_name().to_string_lossy().into_owned();

            for clip_entry in read_dir(&class_path)? {
                let clip_path = clip_entry.path();
                let is_video = clip_path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| {
                        VIDEO_EXTENSIONS
                            .iter()
                            .any(|v| ext.eq_ignore_ascii_case(v))
                    });
                if !is_video {
                    continue;
                }
                let metadata = clip_entry.metadata().map_err(|e| DatasetError::Io {
                    path: clip_path.clone(),
                    source: e,
                })?;
                total_size_bytes += metadata.len();
                *per_class.entry(class_name.clone()).or_default() += 1;
            }
        }

        let video_count = per_class.values().sum();
        let videos_per_class = PerClassRange {
            min: per_class.values().copied().min().unwrap_or(0),
            max: per_class.values().copied().max().unwrap_or(0),
        };

        tracing::debug!(
            tubes_dir = %tubes_dir.display(),
            classes = per_class.len(),
            video_count,
            total_size_bytes,
            "Summarized tube tree"
        );

        Ok(Self {
            version: version.into(),
            video_count,
            class_count: per_class.len() as u64,
            videos_per_class,
            total_size_bytes,
            original_video_length_secs: 0.0,
            original_video_size_bytes: 0,
            year,
        })
    }

    fn check_self(&self, issues: &mut Vec<ConsistencyIssue>) {
        let mut push = |message: String| {
            issues.push(ConsistencyIssue {
                version: self.version.clone(),
                message,
            })
        };

        let range = self.videos_per_class;
        if range.min > range.max {
            push(format!(
                "videos per class range is inverted ({} > {})",
                range.min, range.max
            ));
        }

        if self.class_count == 0 {
            if self.video_count > 0 {
                push(format!(
                    "{} videos listed without any class",
                    self.video_count
                ));
            }
            return;
        }

        let lower = self.class_count.saturating_mul(range.min);
        let upper = self.class_count.saturating_mul(range.max);
        if self.video_count < lower || self.video_count > upper {
            push(format!(
                "video count {} outside {}..={} implied by {} classes with {}-{} videos each",
                self.video_count, lower, upper, self.class_count, range.min, range.max
            ));
        }
    }
}

impl ReleaseCatalog {
    /// Load a catalog from JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| DatasetError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(|e| DatasetError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Save the catalog as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DatasetError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).map_err(|e| DatasetError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| DatasetError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        std::fs::write(path, json).map_err(|e| DatasetError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Check the published numbers against each other.
    ///
    /// Successive releases must grow strictly in video count and total
    /// size and must not go back in time.
    pub fn check_consistency(&self) -> Vec<ConsistencyIssue> {
        let mut issues = vec![];

        for release in &self.releases {
            release.check_self(&mut issues);
        }

        for pair in self.releases.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            let mut push = |message: String| {
                issues.push(ConsistencyIssue {
                    version: next.version.clone(),
                    message,
                })
            };

            if next.video_count <= prev.video_count {
                push(format!(
                    "video count {} does not exceed {} of {}",
                    next.video_count, prev.video_count, prev.version
                ));
            }
            if next.total_size_bytes <= prev.total_size_bytes {
                push(format!(
                    "total size {} B does not exceed {} B of {}",
                    next.total_size_bytes, prev.total_size_bytes, prev.version
                ));
            }
            if next.year < prev.year {
                push(format!(
                    "year {} precedes {} of {}",
                    next.year, prev.year, prev.version
                ));
            }
        }

        issues
    }

    /// Replace the release with the same version or append a new one.
    pub fn upsert(&mut self, release: DatasetRelease) {
        match self
            .releases
            .iter_mut()
            .find(|r| r.version == release.version)
        {
            Some(existing) => *existing = release,
            None => self.releases.push(release),
        }
    }
}

fn read_dir(dir: &Path) -> Result<Vec<std::fs::DirEntry>, DatasetError> {
    let map_err = |e| DatasetError::Io {
        path: dir.to_path_buf(),
        source: e,
    };
    let mut entries = std::fs::read_dir(dir)
        .map_err(map_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(map_err)?;
    entries.sort_by_key(|e| e.file_name());
    Ok(entries)
}

/// Errors raised while reading or deriving release metadata.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release(version: &str, videos: u64, classes: u64, size: u64, year: u16) -> DatasetRelease {
        DatasetRelease {
            version: version.to_string(),
            video_count: videos,
            class_count: classes,
            videos_per_class: PerClassRange {
                min: videos / classes.max(1),
                max: videos.div_ceil(classes.max(1)),
            },
            total_size_bytes: size,
            original_video_length_secs: 600.0,
            original_video_size_bytes: 1_000_000,
            year,
        }
    }

    #[test]
    fn test_growing_releases_are_consistent() {
        let catalog = ReleaseCatalog {
            releases: vec![
                release("v1", 100, 10, 1_000, 2021),
                release("v2", 200, 10, 2_000, 2021),
                release("v3", 400, 10, 4_000, 2022),
            ],
        };
        assert!(catalog.check_consistency().is_empty());
    }

    #[test]
    fn test_non_increasing_counts_and_sizes_are_flagged() {
        let catalog = ReleaseCatalog {
            releases: vec![
                release("v1", 100, 10, 1_000, 2021),
                release("v2", 100, 10, 900, 2020),
            ],
        };
        let issues = catalog.check_consistency();
        assert_eq!(issues.len(), 3);
        assert!(issues.iter().all(|i| i.version == "v2"));
        assert!(issues.iter().any(|i| i.message.contains("video count")));
        assert!(issues.iter().any(|i| i.message.contains("total size")));
        assert!(issues.iter().any(|i| i.message.contains("year")));
    }

    #[test]
    fn test_per_class_range_must_cover_video_count() {
        let mut bad = release("v1", 100, 10, 1_000, 2021);
        bad.videos_per_class = PerClassRange { min: 2, max: 5 };
        let catalog = ReleaseCatalog {
            releases: vec![bad],
        };
        let issues = catalog.check_consistency();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("outside 20..=50"));
    }

    #[test]
    fn test_single_and_empty_catalogs_are_consistent() {
        assert!(ReleaseCatalog::default().check_consistency().is_empty());
        let single = ReleaseCatalog {
            releases: vec![release("v1", 10, 2, 10, 2021)],
        };
        assert!(single.check_consistency().is_empty());
    }

    #[test]
    fn test_videos_without_classes_flagged() {
        let mut bad = release("v1", 10, 0, 10, 2021);
        bad.videos_per_class = PerClassRange { min: 0, max: 0 };
        let issues = ReleaseCatalog {
            releases: vec![bad],
        }
        .check_consistency();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("without any class"));
    }

    #[test]
    fn test_average_video_size() {
        assert_eq!(
            release("v1", 4, 2, 1_000, 2021).average_video_size_bytes(),
            Some(250)
        );
        assert_eq!(release("v0", 0, 0, 0, 2021).average_video_size_bytes(), None);
    }

    #[test]
    fn test_upsert_replaces_matching_version() {
        let mut catalog = ReleaseCatalog::default();
        catalog.upsert(release("v1", 10, 2, 10, 2021));
        catalog.upsert(release("v2", 20, 2, 20, 2021));
        catalog.upsert(release("v1", 12, 2, 12, 2021));
        assert_eq!(catalog.releases.len(), 2);
        assert_eq!(catalog.releases[0].video_count, 12);
    }

    #[test]
    fn test_summarize_tubes_counts_per_class() {
        let dir = std::env::temp_dir().join("actsim_test_summarize_tubes");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(dir.join("kicking")).unwrap();
        std::fs::create_dir_all(dir.join("waving")).unwrap();
        std::fs::create_dir_all(dir.join("empty")).unwrap();
        std::fs::write(dir.join("kicking").join("a_tube_1.mp4"), vec![0u8; 100]).unwrap();
        std::fs::write(dir.join("kicking").join("a_tube_2.mp4"), vec![0u8; 50]).unwrap();
        std::fs::write(dir.join("waving").join("a_tube_3.avi"), vec![0u8; 25]).unwrap();
        std::fs::write(dir.join("waving").join("notes.txt"), "skip").unwrap();
        std::fs::write(dir.join("manifest.json"), "{}").unwrap();

        let summary = DatasetRelease::summarize_tubes(&dir, "v-test", 2024).unwrap();
        assert_eq!(summary.video_count, 3);
        assert_eq!(summary.class_count, 2);
        assert_eq!(summary.videos_per_class, PerClassRange { min: 1, max: 2 });
        assert_eq!(summary.total_size_bytes, 175);

        let catalog = ReleaseCatalog {
            releases: vec![summary],
        };
        assert!(catalog.check_consistency().is_empty());

        let catalog_path = dir.join("releases.json");
        catalog.save(&catalog_path).unwrap();
        assert_eq!(ReleaseCatalog::load(&catalog_path).unwrap(), catalog);

        std::fs::remove_dir_all(&dir).ok();
    }
}
