//! Show recording information.

use std::path::PathBuf;

use actsim_common::config::AppConfig;
use actsim_recording_model::recording::Recording;

pub fn run(config: &AppConfig, path: PathBuf) -> anyhow::Result<()> {
    let recording =
        Recording::open(&path, None).map_err(|e| anyhow::anyhow!("Failed to open recording: {e}"))?;
    let no_action = &config.generation.no_action_labels;

    println!("Recording: {}", recording.name());
    println!("  Path: {}", recording.root.display());
    println!("  Resolution: {}x{}", recording.width, recording.height);
    println!("  Frames: {}", recording.image_frames.len());
    println!("  Masks: {}", recording.mask_frames.len());
    println!();

    println!("Labels ({}):", recording.labels.len());
    for (name, color) in recording.labels.iter() {
        let kind = if no_action.iter().any(|n| n == name) {
            "scenery"
        } else {
            "action"
        };
        println!("  {color}  {name} ({kind})");
    }

    Ok(())
}
