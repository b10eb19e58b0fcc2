//! Segmentation labels and their mask colours.
//!
//! The Unity recorder writes a `layer.json` next to the frame folders:
//!
//! ```json
//! { "labels": [ { "name": "kicking", "color": "#FF8000FF" }, ... ] }
//! ```
//!
//! Every pixel of a `_layer` mask image carries exactly one of these colours.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Labels that are rendered into the masks but are scenery, not actions.
pub const DEFAULT_NO_ACTION_LABELS: [&str; 6] =
    ["Car", "Default", "UI", "Ground", "Water", "Lighting"];

/// An sRGB mask colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LabelColor(pub [u8; 3]);

impl LabelColor {
    pub fn rgb(self) -> [u8; 3] {
        self.0
    }

    /// Parse `#RRGGBB` or `#RRGGBBAA`. Alpha is ignored.
    ///
    /// With `fix_unity`, channels of exactly `0x80` are read as `0x7f`:
    /// Unity writes half-intensity label colours one step darker into the
    /// mask images than it lists in `layer.json`.
    pub fn parse_hex(input: &str, fix_unity: bool) -> Result<Self, LabelError> {
        let hex = input.trim().trim_start_matches('#');
        if hex.len() < 6 || !hex.is_ascii() {
            return Err(LabelError::InvalidColor {
                value: input.to_string(),
            });
        }

        let mut rgb = [0u8; 3];
        for (i, channel) in rgb.iter_mut().enumerate() {
            let pair = &hex[i * 2..i * 2 + 2];
            let value = u8::from_str_radix(pair, 16).map_err(|_| LabelError::InvalidColor {
                value: input.to_string(),
            })?;
            *channel = if fix_unity && value == 0x80 { 0x7f } else { value };
        }
        Ok(Self(rgb))
    }
}

impl fmt::Display for LabelColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "#{r:02X}{g:02X}{b:02X}")
    }
}

impl Serialize for LabelColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for LabelColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        LabelColor::parse_hex(&raw, false).map_err(serde::de::Error::custom)
    }
}

/// One entry of `layer.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerLabel {
    pub name: String,
    pub color: String,
}

/// Top-level `layer.json` document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerFile {
    pub labels: Vec<LayerLabel>,
}

/// Ordered mapping from label name to mask colour.
#[derive(Debug, Clone, Default)]
pub struct LabelMap {
    entries: Vec<(String, LabelColor)>,
}

impl LabelMap {
    /// Build from `layer.json` entries, keeping first-seen order.
    ///
    /// A repeated name keeps its original position and takes the later colour.
    pub fn from_layer_file(file: &LayerFile, fix_unity: bool) -> Result<Self, LabelError> {
        let mut map = Self::default();
        for label in &file.labels {
            let color = LabelColor::parse_hex(&label.color, fix_unity)?;
            map.insert(label.name.clone(), color);
        }
        Ok(map)
    }

    /// Load and parse a `layer.json` file (Unity colour fix applied).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LabelError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| LabelError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let file: LayerFile = serde_json::from_str(&content).map_err(|e| LabelError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_layer_file(&file, true)
    }

    pub fn insert(&mut self, name: impl Into<String>, color: LabelColor) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = color,
            None => self.entries.push((name, color)),
        }
    }

    pub fn color_of(&self, name: &str) -> Option<LabelColor> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| *c)
    }

    /// Reverse lookup. When several labels share a colour the last one wins.
    pub fn name_of(&self, color: LabelColor) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(_, c)| *c == color)
            .map(|(n, _)| n.as_str())
    }

    /// Labels that describe actions, i.e. everything not in `no_action`.
    pub fn action_labels<'a, S: AsRef<str>>(
        &'a self,
        no_action: &'a [S],
    ) -> impl Iterator<Item = (&'a str, LabelColor)> + 'a {
        self.entries
            .iter()
            .filter(move |(name, _)| !no_action.iter().any(|n| n.as_ref() == name))
            .map(|(name, color)| (name.as_str(), *color))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, LabelColor)> {
        self.entries.iter().map(|(n, c)| (n.as_str(), *c))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Errors raised while reading label definitions.
#[derive(Debug, thiserror::Error)]
pub enum LabelError {
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

    #[error("Invalid label colour: {value:?}")]
    InvalidColor { value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_rgb_and_rgba() {
        assert_eq!(
            LabelColor::parse_hex("#B4FBB8", false).unwrap(),
            LabelColor([180, 251, 184])
        );
        assert_eq!(
            LabelColor::parse_hex("B4FBB8FF", false).unwrap(),
            LabelColor([180, 251, 184])
        );
    }

    #[test]
    fn test_parse_hex_unity_fix_only_touches_half_channels() {
        let fixed = LabelColor::parse_hex("#FF8000FF", true).unwrap();
        assert_eq!(fixed, LabelColor([255, 127, 0]));

        let untouched = LabelColor::parse_hex("#FF8000FF", false).unwrap();
        assert_eq!(untouched, LabelColor([255, 128, 0]));

        // "08" followed by "0x" must not be treated as an 0x80 channel.
        let straddling = LabelColor::parse_hex("#080A10", true).unwrap();
        assert_eq!(straddling, LabelColor([8, 10, 16]));
    }

    #[test]
    fn test_parse_hex_rejects_garbage() {
        assert!(LabelColor::parse_hex("#12345", false).is_err());
        assert!(LabelColor::parse_hex("#GG0000", false).is_err());
        assert!(LabelColor::parse_hex("", false).is_err());
        assert!(matches!(
            LabelColor::parse_hex("#1\u{e9}2345", false),
            Err(LabelError::InvalidColor { .. })
        ));
        assert!(LabelColor::parse_hex("#FF00\u{e9}FF", true).is_err());
    }

    #[test]
    fn test_display_roundtrips_through_parse() {
        let color = LabelColor([1, 127, 255]);
        assert_eq!(color.to_string(), "#017FFF");
        assert_eq!(LabelColor::parse_hex(&color.to_string(), false).unwrap(), color);
    }

    #[test]
    fn test_label_map_keeps_order_and_overwrites_duplicates() {
        let file = LayerFile {
            labels: vec![
                LayerLabel {
                    name: "walking".into(),
                    color: "#FF0000".into(),
                },
                LayerLabel {
                    name: "Ground".into(),
                    color: "#00FF00".into(),
                },
                LayerLabel {
                    name: "walking".into(),
                    color: "#0000FF".into(),
                },
            ],
        };
        let map = LabelMap::from_layer_file(&file, true).unwrap();
        let names: Vec<_> = map.iter().map(|(n, _)| n.to_string()).collect();
        assert_eq!(names, vec!["walking", "Ground"]);
        assert_eq!(map.color_of("walking"), Some(LabelColor([0, 0, 255])));
    }

    #[test]
    fn test_name_of_prefers_last_label_for_shared_colour() {
        let mut map = LabelMap::default();
        map.insert("Default", LabelColor([0, 0, 0]));
        map.insert("UI", LabelColor([0, 0, 0]));
        assert_eq!(map.name_of(LabelColor([0, 0, 0])), Some("UI"));
        assert_eq!(map.name_of(LabelColor([1, 2, 3])), None);
    }

    #[test]
    fn test_action_labels_excludes_scenery() {
        let mut map = LabelMap::default();
        map.insert("Ground", LabelColor([1, 1, 1]));
        map.insert("kicking", LabelColor([2, 2, 2]));
        map.insert("Car", LabelColor([3, 3, 3]));
        map.insert("waving", LabelColor([4, 4, 4]));

        let actions: Vec<_> = map
            .action_labels(&DEFAULT_NO_ACTION_LABELS)
            .map(|(n, _)| n)
            .collect();
        assert_eq!(actions, vec!["kicking", "waving"]);
    }

    proptest::proptest! {
        #[test]
        fn unity_fix_only_touches_half_intensity_channels(r: u8, g: u8, b: u8) {
            let hex = format!("#{r:02x}{g:02x}{b:02x}ff");
            let plain = LabelColor::parse_hex(&hex, false).unwrap();
            let fixed = LabelColor::parse_hex(&hex, true).unwrap();
            proptest::prop_assert_eq!(plain, LabelColor([r, g, b]));
            for (p, f) in plain.0.iter().zip(fixed.0.iter()) {
                let expected = if *p == 0x80 { 0x7f } else { *p };
                proptest::prop_assert_eq!(*f, expected);
            }
        }
    }
}
