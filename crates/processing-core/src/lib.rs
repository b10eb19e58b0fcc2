//! ActSim Processing Core
//!
//! Turns colour-coded segmentation masks into tracked action instances:
//! - **Class masks:** Binary masks for a single label colour
//! - **Contours:** External regions with area, bounding boxes, and fill masks
//! - **Tracking:** Frame-to-frame instance identity by mask overlap
//! - **Tubes:** Spatio-temporal bounds of a finished instance
//!
//! This crate is pure computation, with no file or process I/O.
//! All inputs are image buffers; all outputs are data.

pub mod contours;
pub mod mask;
pub mod tracking;
pub mod tube;

pub use contours::{external_regions, BoundingBox, Region, RegionMask};
pub use mask::class_mask;
pub use tracking::{FrameObservation, Instance, InstanceDb};
pub use tube::{CropRect, Tube};
