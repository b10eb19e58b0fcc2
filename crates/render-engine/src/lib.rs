//! ActSim Render Engine
//!
//! Turns an opened recording into the dataset's output videos.
//!
//! # Pipeline Architecture
//!
//! ```text
//! _img/*.png ───┐
//!               ├── Panels (original, mask, overlay, black, oneclass, bbox)
//! _layer/*.png ─┤         │
//!               │         ├── Compose (1, 2, or 2x2 grid)
//! layer.json ───┘         │
//!      │                  ▼
//!      │           Encode (ffmpeg) ──► output_<modes>.mp4
//!      │
//!      └── Track instances ──► Tubes ──► tubes/<label>/<rec>_tube_<id>.mp4
//!                                  └──► tubes/manifest.json
//! ```

pub mod compositor;
pub mod encoder;
pub mod generate;
pub mod manifest;

pub use encoder::{EncodeSpec, FfmpegEncoder, FrameWriter, MemoryEncoder, VideoEncoder};
pub use generate::*;
