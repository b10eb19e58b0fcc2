//! Generation pipeline: recording in, split-screen video and tube clips out.

use std::path::{Component, Path, PathBuf};

use actsim_common::error::{ActsimError, ActsimResult};
use actsim_processing_core::contours::{external_regions, min_region_area};
use actsim_processing_core::mask::class_mask;
use actsim_processing_core::tracking::InstanceDb;
use actsim_processing_core::tube::{CropRect, Tube};
use actsim_recording_model::labels::LabelColor;
use actsim_recording_model::modes::{output_file_name, GenerationSettings, OutputMode};
use actsim_recording_model::recording::Recording;
use image::{imageops, RgbImage};

use crate::compositor::{compose, load_caption_font, output_size, BoxAnnotation, PanelRenderer};
use crate::encoder::{EncodeSpec, FrameWriter, VideoEncoder};
use crate::manifest::TubeManifest;

/// A generation job for one recording.
#[derive(Debug, Clone)]
pub struct GenerationJob {
    /// Recording directory (`_img/`, `_layer/`, `layer.json`).
    pub recording_dir: PathBuf,

    /// Modes, tube, and encoding settings.
    pub settings: GenerationSettings,

    /// Font for bounding-box captions. Boxes are drawn without captions when unset.
    pub label_font: Option<PathBuf>,
}

/// Progress callback for generation.
pub type ProgressCallback = Box<dyn Fn(GenerationProgress) + Send>;

/// Generation progress report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationProgress {
    /// Current stage.
    pub stage: GenerationStage,

    /// Frames composited, or tubes written during [`GenerationStage::Tubes`].
    pub frames_done: u64,

    /// Total frames, or total tubes during [`GenerationStage::Tubes`].
    pub total_frames: u64,
}

impl GenerationProgress {
    /// Completion of the current stage in `[0.0, 1.0]`.
    pub fn fraction(&self) -> f64 {
        if self.total_frames == 0 {
            return 0.0;
        }
        (self.frames_done as f64 / self.total_frames as f64).clamp(0.0, 1.0)
    }
}

/// Stages of a generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStage {
    Preparing,
    Compositing,
    Tubes,
    Complete,
}

/// A tube clip that was written.
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenTube {
    pub id: u64,
    pub label: String,
    pub path: PathBuf,
    pub frames: u64,
    pub crop: CropRect,
}

/// Outcome of a generation run.
#[derive(Debug, Clone)]
pub struct GenerationReport {
    /// Split-screen video path.
    pub output_path: PathBuf,

    /// Frames written to the split-screen video.
    pub frames_written: u64,

    pub output_width: u32,
    pub output_height: u32,

    /// Tube clips written, in retirement order.
    pub tubes: Vec<WrittenTube>,

    /// Tubes dropped for being shorter than the minimum length.
    pub tubes_discarded: usize,

    /// Tube saving was requested but the recording is too short.
    pub tubes_skipped: bool,

    /// Manifest path, when tubes were saved.
    pub manifest_path: Option<PathBuf>,
}

/// Generate the split-screen video and tubes for a recording.
///
/// The frame loop is CPU-bound and runs on a blocking task.
pub async fn generate(
    job: GenerationJob,
    encoder: Box<dyn VideoEncoder>,
    progress: Option<ProgressCallback>,
) -> ActsimResult<GenerationReport> {
    tracing::info!(
        recording = %job.recording_dir.display(),
        modes = ?job.settings.modes,
        encoder = encoder.name(),
        "Starting generation"
    );

    if !encoder.is_available() {
        return Err(ActsimError::unsupported(format!(
            "Encoder backend {} is not available",
            encoder.name()
        )));
    }

    tokio::task::spawn_blocking(move || run_generation(&job, encoder.as_ref(), progress.as_ref()))
        .await
        .map_err(|e| ActsimError::render(format!("Generation task failed: {e}")))?
}

/// Synchronous generation pipeline.
pub fn run_generation(
    job: &GenerationJob,
    encoder: &dyn VideoEncoder,
    progress: Option<&ProgressCallback>,
) -> ActsimResult<GenerationReport> {
    let report = |stage, frames_done: usize, total_frames: usize| {
        if let Some(cb) = progress {
            cb(GenerationProgress {
                stage,
                frames_done: frames_done as u64,
                total_frames: total_frames as u64,
            });
        }
    };
    report(GenerationStage::Preparing, 0, 0);

    let settings = &job.settings;
    let modes = settings
        .validate()
        .map_err(|e| ActsimError::config(e.to_string()))?;
    let recording = Recording::open(&job.recording_dir, settings.stop_after)
        .map_err(|e| ActsimError::recording(e.to_string()))?;

    let total = recording.frame_count();
    if total == 0 {
        return Err(ActsimError::recording(format!(
            "Recording {} has no frames with a matching mask",
            recording.root.display()
        )));
    }

    let mut save_tubes = settings.save_tubes;
    let mut tubes_skipped = false;
    if save_tubes && (total as u64) < settings.min_tube_frames {
        tracing::warn!(
            frames = total,
            min_tube_frames = settings.min_tube_frames,
            "Recording is shorter than the minimum tube length, tubes will not be saved"
        );
        save_tubes = false;
        tubes_skipped = true;
    }

    let renderer = build_renderer(job, &recording, &modes)?;
    let action_labels: Vec<(String, LabelColor)> = recording
        .labels
        .action_labels(&settings.no_action_labels)
        .map(|(name, color)| (name.to_string(), color))
        .collect();
    let tracking = settings.needs_tracking();
    if save_tubes {
        for (label, _) in &action_labels {
            tube_label_dir(label)?;
        }
    }
    let min_area = min_region_area(
        recording.width,
        recording.height,
        settings.min_contour_area_ratio,
    );

    let (output_width, output_height) = output_size(recording.width, recording.height, modes.len())?;
    let output_path = recording.root.join(output_file_name(&modes, settings.lossy));
    let mut writer = encoder.open(&EncodeSpec {
        path: output_path.clone(),
        width: output_width,
        height: output_height,
        fps: settings.fps,
        lossy: settings.lossy,
    })?;

    tracing::info!(
        output = %output_path.display(),
        frames = total,
        width = output_width,
        height = output_height,
        action_labels = action_labels.len(),
        tracking,
        save_tubes,
        "Compositing frames"
    );

    let mut db = InstanceDb::new();
    let mut tubes: Vec<Tube> = vec![];

    for frame in 0..total {
        let image = load_frame(&recording.image_frames[frame], &recording)?;
        let mask = load_frame(&recording.mask_frames[frame], &recording)?;

        let mut boxes = vec![];
        if tracking {
            for (label, color) in &action_labels {
                let class = class_mask(&mask, *color);
                for region in external_regions(&class, min_area) {
                    db.observe(label, frame, region);
                }
            }
            for instance in db.instances_in_frame(frame) {
                let Some(observation) = instance.observation(frame) else {
                    continue;
                };
                let Some(color) = action_labels
                    .iter()
                    .find(|(name, _)| *name == instance.label)
                    .map(|(_, color)| *color)
                else {
                    continue;
                };
                boxes.push(BoxAnnotation {
                    label: &instance.label,
                    id: instance.id,
                    bbox: observation.bbox,
                    color,
                });
            }
        }

        let panels = renderer.render(&image, &mask, &boxes)?;
        writer.write_frame(&compose(&panels)?)?;

        if tracking {
            let retired = db.retire_absent(frame);
            if save_tubes {
                tubes.extend(retired.into_iter().map(Tube::from_instance));
            }
        }
        report(GenerationStage::Compositing, frame + 1, total);
    }

    let frames_written = writer.finish()?;
    tracing::info!(
        output = %output_path.display(),
        frames = frames_written,
        "Split-screen video written"
    );

    if tracking && save_tubes {
        tubes.extend(db.retire_all().into_iter().map(Tube::from_instance));
    }

    let mut written = vec![];
    let mut tubes_discarded = 0;
    let mut manifest_path = None;
    if save_tubes {
        let (keep, short): (Vec<Tube>, Vec<Tube>) = tubes
            .into_iter()
            .partition(|t| t.is_long_enough(settings.min_tube_frames));
        tubes_discarded = short.len();
        tracing::info!(
            kept = keep.len(),
            discarded = tubes_discarded,
            min_tube_frames = settings.min_tube_frames,
            "Writing tubes"
        );

        let tubes_dir = recording.root.join(&settings.tubes_folder);
        let mut manifest = TubeManifest::new(
            recording.name(),
            settings.fps,
            settings.tube_padding,
            settings.min_tube_frames,
        );
        for (i, tube) in keep.iter().enumerate() {
            report(GenerationStage::Tubes, i, keep.len());
            let crop = tube.crop(settings.tube_padding, recording.width, recording.height);
            if crop.w == 0 || crop.h == 0 {
                tracing::warn!(id = tube.id, label = %tube.label, "Empty tube crop, skipping");
                tubes_discarded += 1;
                continue;
            }

            let relative = tube_relative_path(&recording.name(), tube, settings.lossy)?;
            let path = tubes_dir.join(&relative);
            let frames = write_tube(encoder, &recording, tube, crop, &path, settings)?;
            tracing::debug!(
                id = tube.id,
                label = %tube.label,
                frames,
                path = %path.display(),
                "Tube written"
            );

            manifest.push(tube, relative, crop);
            written.push(WrittenTube {
                id: tube.id,
                label: tube.label.clone(),
                path,
                frames,
                crop,
            });
        }
        report(GenerationStage::Tubes, keep.len(), keep.len());
        manifest_path = Some(manifest.save(&tubes_dir)?);
    }

    report(GenerationStage::Complete, total, total);
    tracing::info!(
        output = %output_path.display(),
        tubes = written.len(),
        tubes_discarded,
        "Generation complete"
    );

    Ok(GenerationReport {
        output_path,
        frames_written,
        output_width,
        output_height,
        tubes: written,
        tubes_discarded,
        tubes_skipped,
        manifest_path,
    })
}

fn build_renderer(
    job: &GenerationJob,
    recording: &Recording,
    modes: &[OutputMode],
) -> ActsimResult<PanelRenderer> {
    let mut renderer = PanelRenderer::new(modes.to_vec(), job.settings.overlay_alpha);
    if modes.contains(&OutputMode::Oneclass) {
        let label = &job.settings.oneclass_label;
        let color = recording.labels.color_of(label).ok_or_else(|| {
            ActsimError::config(format!("Label {label:?} for the oneclass panel is not in layer.json"))
        })?;
        renderer = renderer.with_oneclass_color(color);
    }
    if let Some(font) = &job.label_font {
        renderer = renderer.with_caption_font(load_caption_font(font)?);
    }
    Ok(renderer)
}

fn load_frame(path: &Path, recording: &Recording) -> ActsimResult<RgbImage> {
    let frame = image::open(path)
        .map_err(|e| ActsimError::recording(format!("Failed to read {}: {e}", path.display())))?
        .to_rgb8();
    if frame.dimensions() != (recording.width, recording.height) {
        return Err(ActsimError::recording(format!(
            "{} is {}x{}, expected {}x{}",
            path.display(),
            frame.width(),
            frame.height(),
            recording.width,
            recording.height
        )));
    }
    Ok(frame)
}

/// `<label>/<recording>_tube_<id>.<ext>`, relative to the tubes folder.
pub fn tube_relative_path(recording: &str, tube: &Tube, lossy: bool) -> ActsimResult<PathBuf> {
    let ext = if lossy { "mp4" } else { "avi" };
    Ok(tube_label_dir(&tube.label)?.join(format!("{recording}_tube_{}.{ext}", tube.id)))
}

/// Labels name a folder directly under the tubes folder.
fn tube_label_dir(label: &str) -> ActsimResult<&Path> {
    let path = Path::new(label);
    let mut components = path.components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !label.contains(['/', '\\']) => Ok(path),
        _ => Err(ActsimError::config(format!(
            "Label {label:?} cannot be used as a tube folder name"
        ))),
    }
}

fn write_tube(
    encoder: &dyn VideoEncoder,
    recording: &Recording,
    tube: &Tube,
    crop: CropRect,
    path: &Path,
    settings: &GenerationSettings,
) -> ActsimResult<u64> {
    let mut writer: Box<dyn FrameWriter> = encoder.open(&EncodeSpec {
        path: path.to_path_buf(),
        width: crop.w,
        height: crop.h,
        fps: settings.fps,
        lossy: settings.lossy,
    })?;

    for frame in tube.min_frame..=tube.max_frame {
        let source = recording.image_frames.get(frame).ok_or_else(|| {
            ActsimError::processing(format!("Tube {} references missing frame {frame}", tube.id))
        })?;
        let image = load_frame(source, recording)?;
        let cropped = imageops::crop_imm(&image, crop.x, crop.y, crop.w, crop.h).to_image();
        writer.write_frame(&cropped)?;
    }
    writer.finish()
}
