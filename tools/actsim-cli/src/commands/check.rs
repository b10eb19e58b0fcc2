//! Check system capabilities.

use actsim_common::config::{config_file_path, AppConfig};
use actsim_render_engine::encoder::{FfmpegEncoder, VideoEncoder};

pub fn run(config: &AppConfig, init_config: bool) -> anyhow::Result<()> {
    println!("ActSim System Check");
    println!("{}", "=".repeat(50));

    let config_path = config_file_path();
    if config_path.exists() {
        println!("[OK] Config: {}", config_path.display());
    } else if init_config {
        config.save()?;
        println!("[OK] Config: wrote defaults to {}", config_path.display());
    } else {
        println!("[INFO] Config: defaults ({} not found)", config_path.display());
    }

    if config.recordings_dir.is_dir() {
        println!("[OK] Recordings: {}", config.recordings_dir.display());
    } else {
        println!(
            "[WARN] Recordings directory missing: {}",
            config.recordings_dir.display()
        );
    }

    match &config.generation.label_font {
        Some(font) if font.is_file() => println!("[OK] Caption font: {}", font.display()),
        Some(font) => println!("[WARN] Caption font not found: {}", font.display()),
        None => println!("[INFO] Caption font: none, boxes are drawn without captions"),
    }

    let ffmpeg = FfmpegEncoder::new();
    let ffmpeg_ok = ffmpeg.is_available();
    if ffmpeg_ok {
        println!("[OK] Encoder: {}", ffmpeg.name());
    } else {
        println!("[FAIL] Encoder: ffmpeg not found in PATH");
    }

    println!();
    if ffmpeg_ok {
        println!("All required capabilities are available. ActSim is ready.");
    } else {
        println!("Some required capabilities are missing. Install ffmpeg to write videos.");
    }

    Ok(())
}
