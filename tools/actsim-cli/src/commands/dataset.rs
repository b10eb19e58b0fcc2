//! Dataset release metadata.

use std::path::PathBuf;

use actsim_recording_model::dataset::{DatasetRelease, ReleaseCatalog};

pub fn summarize(
    tubes_dir: PathBuf,
    version: String,
    year: u16,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let release = DatasetRelease::summarize_tubes(&tubes_dir, version, year)?;

    println!("Release {} ({})", release.version, release.year);
    println!("  Videos: {}", release.video_count);
    println!("  Classes: {}", release.class_count);
    println!(
        "  Videos per class: {}-{}",
        release.videos_per_class.min, release.videos_per_class.max
    );
    println!("  Total size: {} B", release.total_size_bytes);
    if let Some(avg) = release.average_video_size_bytes() {
        println!("  Average video size: {avg} B");
    }

    match output {
        Some(path) => {
            let mut catalog = if path.exists() {
                ReleaseCatalog::load(&path)?
            } else {
                ReleaseCatalog::default()
            };
            catalog.upsert(release);
            catalog.save(&path)?;
            println!("\nCatalog updated: {}", path.display());
        }
        None => println!("\n{}", serde_json::to_string_pretty(&release)?),
    }

    Ok(())
}

pub fn check(catalog_path: PathBuf) -> anyhow::Result<()> {
    println!("Checking release catalog: {}", catalog_path.display());

    let catalog = ReleaseCatalog::load(&catalog_path)?;
    for release in &catalog.releases {
        println!(
            "  {} ({}): {} videos, {} classes, {} B",
            release.version,
            release.year,
            release.video_count,
            release.class_count,
            release.total_size_bytes
        );
    }

    let issues = catalog.check_consistency();
    if issues.is_empty() {
        println!("\nCatalog is consistent.");
        return Ok(());
    }

    println!("\nConsistency issues:");
    for issue in &issues {
        println!("  - {}: {}", issue.version, issue.message);
    }
    anyhow::bail!("{} consistency issue(s) found", issues.len())
}
