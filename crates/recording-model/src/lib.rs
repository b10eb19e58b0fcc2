//! ActSim Recording Model
//!
//! Defines the data contracts shared by the generation pipeline:
//! - **Labels:** Segmentation class names and their mask colours (`layer.json`)
//! - **Recording:** A Unity capture folder with rendered frames and masks
//! - **Modes:** Split-screen panel modes and generation settings
//! - **Dataset:** Published release metadata and its consistency rules
//!
//! Pixel coordinates are absolute and relative to the top-left corner of
//! the rendered frame.

pub mod dataset;
pub mod labels;
pub mod modes;
pub mod recording;

pub use dataset::*;
pub use labels::*;
pub use modes::*;
pub use recording::*;
