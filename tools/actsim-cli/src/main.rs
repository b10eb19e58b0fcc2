//! ActSim CLI: dataset generation from Unity recordings.
//!
//! Usage:
//!   actsim generate <RECORDING>   Render the split-screen video and action tubes
//!   actsim info <RECORDING>       Show recording information
//!   actsim validate <RECORDING>   Validate a recording folder
//!   actsim check                  Check system capabilities
//!   actsim dataset summarize      Derive a release row from a tubes folder
//!   actsim dataset check          Check a release catalog for consistency

use std::path::PathBuf;

use actsim_common::config::AppConfig;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "actsim",
    about = "Synthetic action recognition dataset generation for surveillance footage",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the split-screen video and tubes for a recording
    Generate {
        /// Recording directory, or a name under the configured recordings dir
        recording: PathBuf,

        /// Comma separated panel modes: original, mask, overlay, black, oneclass, bbox
        #[arg(short, long)]
        modes: Option<String>,

        /// Frame rate of the recording and output videos
        #[arg(long)]
        fps: Option<u32>,

        /// Process at most this many frames
        #[arg(long)]
        stop_after: Option<usize>,

        /// Label highlighted by the oneclass panel
        #[arg(long)]
        oneclass: Option<String>,

        /// Do not write tube clips
        #[arg(long)]
        no_tubes: bool,

        /// Lossless png-in-avi output instead of mp4
        #[arg(long)]
        lossless: bool,

        /// Pixels added on each side of a tube crop
        #[arg(long)]
        tube_padding: Option<u32>,

        /// Minimum tube length in seconds
        #[arg(long)]
        min_tube_secs: Option<f64>,

        /// TTF/OTF font for bounding-box captions
        #[arg(long)]
        font: Option<PathBuf>,

        /// Run the pipeline without writing any video
        #[arg(long)]
        dry_run: bool,
    },

    /// Show recording information
    Info {
        /// Recording directory, or a name under the configured recordings dir
        recording: PathBuf,
    },

    /// Validate a recording folder
    Validate {
        /// Recording directory, or a name under the configured recordings dir
        recording: PathBuf,
    },

    /// Check system capabilities
    Check {
        /// Write the default config file if none exists
        #[arg(long)]
        init_config: bool,
    },

    /// Dataset release metadata
    Dataset {
        #[command(subcommand)]
        command: DatasetCommands,
    },
}

#[derive(Subcommand)]
enum DatasetCommands {
    /// Summarize a generated tubes folder as a release row
    Summarize {
        /// Tubes folder (`<tubes>/<label>/*.mp4`)
        tubes_dir: PathBuf,

        /// Release version, e.g. "v2"
        #[arg(long)]
        version: String,

        /// Release year
        #[arg(long)]
        year: u16,

        /// Catalog file to insert or update the release in
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check a release catalog for consistency
    Check {
        /// Catalog JSON file
        catalog: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load();

    // Initialize logging
    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    actsim_common::logging::init_logging(&logging);
    tracing::debug!(
        config = %actsim_common::config::config_file_path().display(),
        recordings_dir = %config.recordings_dir.display(),
        "Configuration loaded"
    );

    match cli.command {
        Commands::Generate {
            recording,
            modes,
            fps,
            stop_after,
            oneclass,
            no_tubes,
            lossless,
            tube_padding,
            min_tube_secs,
            font,
            dry_run,
        } => {
            let overrides = commands::generate::Overrides {
                modes,
                fps,
                stop_after,
                oneclass,
                no_tubes,
                lossless,
                tube_padding,
                min_tube_secs,
                font,
            };
            let recording = config.resolve_recording(&recording);
            commands::generate::run(&config, recording, overrides, dry_run).await
        }
        Commands::Info { recording } => {
            commands::info::run(&config, config.resolve_recording(&recording))
        }
        Commands::Validate { recording } => {
            commands::validate::run(config.resolve_recording(&recording))
        }
        Commands::Check { init_config } => commands::check::run(&config, init_config),
        Commands::Dataset { command } => match command {
            DatasetCommands::Summarize {
                tubes_dir,
                version,
                year,
                output,
            } => commands::dataset::summarize(tubes_dir, version, year, output),
            DatasetCommands::Check { catalog } => commands::dataset::check(catalog),
        },
    }
}
