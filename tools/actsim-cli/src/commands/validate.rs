//! Validate a Unity recording folder.

use std::path::PathBuf;

use actsim_recording_model::recording::Recording;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    println!("Validating recording at: {}", path.display());

    let recording =
        Recording::open(&path, None).map_err(|e| anyhow::anyhow!("Failed to open recording: {e}"))?;

    println!("  Name: {}", recording.name());
    println!("  Resolution: {}x{}", recording.width, recording.height);
    println!("  Frames: {}", recording.frame_count());
    println!("  Labels: {}", recording.labels.len());

    let issues = recording.validate();
    if issues.is_empty() {
        println!("\nRecording is valid.");
    } else {
        println!("\nValidation issues:");
        for issue in &issues {
            println!("  - {issue}");
        }
        println!(
            "\n{} issue(s) found. Generation may fail or skip frames.",
            issues.len()
        );
    }

    Ok(())
}
