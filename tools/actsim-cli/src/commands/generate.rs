//! Generate the split-screen video and tubes for a recording.

use std::io::Write;
use std::path::PathBuf;

use actsim_common::config::{AppConfig, GenerationDefaults};
use actsim_recording_model::modes::{parse_mode_list, GenerationSettings, OutputMode};
use actsim_render_engine::encoder::{FfmpegEncoder, MemoryEncoder, VideoEncoder};
use actsim_render_engine::generate::{generate, GenerationJob, GenerationProgress, GenerationStage};

/// Command-line values that take precedence over the config file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub modes: Option<String>,
    pub fps: Option<u32>,
    pub stop_after: Option<usize>,
    pub oneclass: Option<String>,
    pub no_tubes: bool,
    pub lossless: bool,
    pub tube_padding: Option<u32>,
    pub min_tube_secs: Option<f64>,
    pub font: Option<PathBuf>,
}

/// Merge config defaults and command-line overrides.
pub fn build_settings(
    defaults: &GenerationDefaults,
    overrides: &Overrides,
) -> anyhow::Result<GenerationSettings> {
    let modes = match &overrides.modes {
        Some(list) => parse_mode_list(list)?,
        None => defaults
            .modes
            .iter()
            .map(|m| m.parse::<OutputMode>())
            .collect::<Result<Vec<_>, _>>()?,
    };

    let settings = GenerationSettings {
        modes,
        fps: overrides.fps.unwrap_or(defaults.fps),
        stop_after: overrides.stop_after,
        oneclass_label: overrides
            .oneclass
            .clone()
            .unwrap_or_else(|| defaults.oneclass_label.clone()),
        no_action_labels: defaults.no_action_labels.clone(),
        lossy: defaults.lossy && !overrides.lossless,
        save_tubes: defaults.save_tubes && !overrides.no_tubes,
        tubes_folder: defaults.tubes_folder.clone(),
        tube_padding: overrides.tube_padding.unwrap_or(defaults.tube_padding),
        ..GenerationSettings::default()
    }
    .with_min_tube_secs(overrides.min_tube_secs.unwrap_or(defaults.min_tube_secs));

    settings.validate()?;
    Ok(settings)
}

pub async fn run(
    config: &AppConfig,
    recording: PathBuf,
    overrides: Overrides,
    dry_run: bool,
) -> anyhow::Result<()> {
    println!("Generating from recording at: {}", recording.display());

    let settings = build_settings(&config.generation, &overrides)?;
    let label_font = overrides.font.or_else(|| config.generation.label_font.clone());

    let modes: Vec<String> = settings.modes.iter().map(|m| m.to_string()).collect();
    println!("  Modes: {}", modes.join(", "));
    println!("  FPS: {}", settings.fps);
    println!("  Output: {}", if settings.lossy { "lossy mp4" } else { "lossless avi" });
    if settings.save_tubes {
        println!(
            "  Tubes: {}/ (padding {}px, min {} frames)",
            settings.tubes_folder, settings.tube_padding, settings.min_tube_frames
        );
    } else {
        println!("  Tubes: disabled");
    }

    let encoder: Box<dyn VideoEncoder> = if dry_run {
        println!("  Dry run: no videos will be written");
        Box::new(MemoryEncoder::counting())
    } else {
        let ffmpeg = FfmpegEncoder::new();
        if !ffmpeg.is_available() {
            anyhow::bail!("ffmpeg not found in PATH. Install ffmpeg or use --dry-run.");
        }
        Box::new(ffmpeg)
    };

    let job = GenerationJob {
        recording_dir: recording,
        settings,
        label_font,
    };

    let progress_cb: Box<dyn Fn(GenerationProgress) + Send> = Box::new(|p| {
        let what = match p.stage {
            GenerationStage::Tubes => "tubes",
            _ => "frames",
        };
        if matches!(p.stage, GenerationStage::Compositing | GenerationStage::Tubes) {
            print!(
                "\r  Progress: {:.1}% ({}/{} {what})  ",
                p.fraction() * 100.0,
                p.frames_done,
                p.total_frames,
            );
            let _ = std::io::stdout().flush();
        }
    });

    let report = generate(job, encoder, Some(progress_cb)).await?;

    println!();
    println!(
        "Video: {} ({} frames, {}x{})",
        report.output_path.display(),
        report.frames_written,
        report.output_width,
        report.output_height
    );
    if report.tubes_skipped {
        println!("Tubes: skipped, recording is shorter than the minimum tube length");
    } else if let Some(manifest) = &report.manifest_path {
        println!(
            "Tubes: {} written, {} discarded as too short",
            report.tubes.len(),
            report.tubes_discarded
        );
        for tube in &report.tubes {
            println!(
                "  {} #{}: {} ({} frames)",
                tube.label,
                tube.id,
                tube.path.display(),
                tube.frames
            );
        }
        println!("Manifest: {}", manifest.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_are_used() {
        let settings = build_settings(&GenerationDefaults::default(), &Overrides::default()).unwrap();
        assert_eq!(
            settings.modes,
            vec![
                OutputMode::Original,
                OutputMode::Mask,
                OutputMode::Overlay,
                OutputMode::Bbox
            ]
        );
        assert_eq!(settings.fps, 30);
        assert_eq!(settings.min_tube_frames, 30);
        assert!(settings.lossy);
        assert!(settings.save_tubes);
    }

    #[test]
    fn test_overrides_take_precedence() {
        let overrides = Overrides {
            modes: Some("original,oneclass".to_string()),
            fps: Some(20),
            oneclass: Some("waving".to_string()),
            no_tubes: true,
            lossless: true,
            min_tube_secs: Some(2.0),
            ..Overrides::default()
        };
        let settings = build_settings(&GenerationDefaults::default(), &overrides).unwrap();
        assert_eq!(settings.modes, vec![OutputMode::Original, OutputMode::Oneclass]);
        assert_eq!(settings.fps, 20);
        assert_eq!(settings.oneclass_label, "waving");
        assert_eq!(settings.min_tube_frames, 40);
        assert!(!settings.lossy);
        assert!(!settings.save_tubes);
    }

    #[test]
    fn test_tubes_without_bbox_are_rejected() {
        let overrides = Overrides {
            modes: Some("original,mask".to_string()),
            ..Overrides::default()
        };
        assert!(build_settings(&GenerationDefaults::default(), &overrides).is_err());
    }
}
