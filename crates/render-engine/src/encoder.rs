//! Video encoder backends.
//!
//! Frames are produced in-process and handed to an encoder one at a time.
//! The ffmpeg backend streams raw RGB into an `ffmpeg` child process.

use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use actsim_common::error::{ActsimError, ActsimResult};
use image::RgbImage;

/// Parameters of one output video.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeSpec {
    /// Output file path.
    pub path: PathBuf,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frames per second.
    pub fps: u32,
    /// Lossy MPEG-4 (`.mp4`) or lossless PNG-in-AVI (`.avi`).
    pub lossy: bool,
}

/// An open output video.
pub trait FrameWriter: Send {
    /// Append one frame. The frame must match the size the video was opened with.
    fn write_frame(&mut self, frame: &RgbImage) -> ActsimResult<()>;

    /// Flush and close the video, returning the number of frames written.
    fn finish(self: Box<Self>) -> ActsimResult<u64>;
}

/// Trait for encoder backends (ffmpeg, in-memory, ...).
pub trait VideoEncoder: Send + Sync {
    /// Open a new output video.
    fn open(&self, spec: &EncodeSpec) -> ActsimResult<Box<dyn FrameWriter>>;

    /// Check if this backend is available on the system.
    fn is_available(&self) -> bool;

    /// Backend name.
    fn name(&self) -> &str;
}

fn check_frame_size(spec: &EncodeSpec, frame: &RgbImage) -> ActsimResult<()> {
    if frame.dimensions() != (spec.width, spec.height) {
        return Err(ActsimError::encode(format!(
            "Frame size {:?} does not match video size {}x{} ({})",
            frame.dimensions(),
            spec.width,
            spec.height,
            spec.path.display()
        )));
    }
    Ok(())
}

/// Encoder that pipes raw frames into `ffmpeg`.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    binary: String,
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegEncoder {
    pub fn new() -> Self {
        Self {
            binary: "ffmpeg".to_string(),
        }
    }

    /// Use a specific ffmpeg executable.
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

/// Full ffmpeg argument list for reading raw RGB from stdin.
pub fn ffmpeg_args(spec: &EncodeSpec) -> Vec<String> {
    let mut args: Vec<String> = [
        "-hide_banner",
        "-loglevel",
        "error",
        "-y",
        "-f",
        "rawvideo",
        "-pix_fmt",
        "rgb24",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    args.extend([
        "-s".to_string(),
        format!("{}x{}", spec.width, spec.height),
        "-r".to_string(),
        spec.fps.to_string(),
        "-i".to_string(),
        "-".to_string(),
    ]);
    args.extend(codec_args(spec.lossy));
    args.push(spec.path.to_string_lossy().into_owned());
    args
}

fn codec_args(lossy: bool) -> Vec<String> {
    let args: &[&str] = if lossy {
        &[
            // yuv420p needs even dimensions; tube crops can be odd.
            "-vf",
            "pad=ceil(iw/2)*2:ceil(ih/2)*2",
            "-c:v",
            "mpeg4",
            "-tag:v",
            "mp4v",
            "-q:v",
            "2",
            "-pix_fmt",
            "yuv420p",
        ]
    } else {
        &["-c:v", "png"]
    };
    args.iter().map(|s| s.to_string()).collect()
}

impl VideoEncoder for FfmpegEncoder {
    fn open(&self, spec: &EncodeSpec) -> ActsimResult<Box<dyn FrameWriter>> {
        if spec.width == 0 || spec.height == 0 || spec.fps == 0 {
            return Err(ActsimError::encode(format!(
                "Invalid video parameters {}x{} @ {}fps",
                spec.width, spec.height, spec.fps
            )));
        }
        if let Some(parent) = spec.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let args = ffmpeg_args(spec);
        tracing::debug!(binary = %self.binary, args = ?args, "Running ffmpeg");
        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ActsimError::encode(format!("Failed to start ffmpeg: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ActsimError::encode("Failed to capture ffmpeg stdin"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ActsimError::encode("Failed to capture ffmpeg stderr"))?;

        // Drain stderr concurrently to avoid ffmpeg blocking on a full stderr pipe.
        let stderr_task = std::thread::spawn(move || -> String {
            let mut reader = BufReader::new(stderr);
            let mut output = String::new();
            match reader.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        tracing::info!(
            pid = child.id(),
            output = %spec.path.display(),
            width = spec.width,
            height = spec.height,
            fps = spec.fps,
            lossy = spec.lossy,
            "ffmpeg process started"
        );

        Ok(Box::new(FfmpegWriter {
            spec: spec.clone(),
            child: Some(child),
            stdin: Some(stdin),
            stderr_task: Some(stderr_task),
            frames: 0,
        }))
    }

    fn is_available(&self) -> bool {
        command_exists(&self.binary)
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

struct FfmpegWriter {
    spec: EncodeSpec,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_task: Option<JoinHandle<String>>,
    frames: u64,
}

impl FfmpegWriter {
    /// Close stdin, wait for the process, and collect its stderr.
    fn wait(&mut self) -> ActsimResult<(std::process::ExitStatus, String)> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| ActsimError::encode("ffmpeg process already finished"))?;
        let status = child
            .wait()
            .map_err(|e| ActsimError::encode(format!("Failed to wait on ffmpeg: {e}")))?;
        let stderr_output = self
            .stderr_task
            .take()
            .map(|task| {
                task.join()
                    .unwrap_or_else(|_| "<failed to join stderr reader>".to_string())
            })
            .unwrap_or_default();
        Ok((status, stderr_output))
    }
}

impl FrameWriter for FfmpegWriter {
    fn write_frame(&mut self, frame: &RgbImage) -> ActsimResult<()> {
        check_frame_size(&self.spec, frame)?;
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| ActsimError::encode("ffmpeg stdin already closed"))?;

        if let Err(err) = stdin.write_all(frame.as_raw()) {
            // ffmpeg usually died; its stderr says why.
            let detail = match self.wait() {
                Ok((status, stderr)) => format!("status {status}: {}", stderr.trim()),
                Err(e) => e.to_string(),
            };
            return Err(ActsimError::encode(format!(
                "Failed writing frame {} to ffmpeg ({err}); {detail}",
                self.frames
            )));
        }
        self.frames += 1;
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> ActsimResult<u64> {
        let (status, stderr_output) = self.wait()?;
        if !status.success() {
            return Err(ActsimError::encode(format!(
                "ffmpeg failed for {} (status {}): {}",
                self.spec.path.display(),
                status,
                stderr_output.trim()
            )));
        }
        tracing::debug!(
            output = %self.spec.path.display(),
            frames = self.frames,
            "ffmpeg finished"
        );
        Ok(self.frames)
    }
}

impl Drop for FfmpegWriter {
    fn drop(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// One video captured by [`MemoryEncoder`].
#[derive(Debug, Clone)]
pub struct CapturedVideo {
    pub spec: EncodeSpec,
    /// Frames, kept only when the encoder retains them.
    pub frames: Vec<RgbImage>,
    /// Number of frames written.
    pub frame_count: u64,
    /// Whether `finish` was called.
    pub finished: bool,
}

/// In-process encoder that records frames instead of writing files.
///
/// Clones share the same capture list.
#[derive(Debug, Clone, Default)]
pub struct MemoryEncoder {
    retain_frames: bool,
    videos: Arc<Mutex<Vec<CapturedVideo>>>,
}

impl MemoryEncoder {
    /// Encoder that keeps every frame.
    pub fn new() -> Self {
        Self {
            retain_frames: true,
            videos: Arc::default(),
        }
    }

    /// Encoder that only counts frames (dry runs).
    pub fn counting() -> Self {
        Self {
            retain_frames: false,
            videos: Arc::default(),
        }
    }

    /// Snapshot of the captured videos, in open order.
    pub fn videos(&self) -> Vec<CapturedVideo> {
        self.videos
            .lock()
            .map(|videos| videos.clone())
            .unwrap_or_default()
    }
}

impl VideoEncoder for MemoryEncoder {
    fn open(&self, spec: &EncodeSpec) -> ActsimResult<Box<dyn FrameWriter>> {
        let mut videos = self
            .videos
            .lock()
            .map_err(|_| ActsimError::encode("Memory encoder lock poisoned"))?;
        videos.push(CapturedVideo {
            spec: spec.clone(),
            frames: vec![],
            frame_count: 0,
            finished: false,
        });
        Ok(Box::new(MemoryWriter {
            index: videos.len() - 1,
            spec: spec.clone(),
            retain_frames: self.retain_frames,
            videos: Arc::clone(&self.videos),
        }))
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "memory"
    }
}

struct MemoryWriter {
    index: usize,
    spec: EncodeSpec,
    retain_frames: bool,
    videos: Arc<Mutex<Vec<CapturedVideo>>>,
}

impl MemoryWriter {
    fn with_video<T>(&self, f: impl FnOnce(&mut CapturedVideo) -> T) -> ActsimResult<T> {
        let mut videos = self
            .videos
            .lock()
            .map_err(|_| ActsimError::encode("Memory encoder lock poisoned"))?;
        let video = videos
            .get_mut(self.index)
            .ok_or_else(|| ActsimError::encode("Captured video missing"))?;
        Ok(f(video))
    }
}

impl FrameWriter for MemoryWriter {
    fn write_frame(&mut self, frame: &RgbImage) -> ActsimResult<()> {
        check_frame_size(&self.spec, frame)?;
        let retain = self.retain_frames;
        self.with_video(|video| {
            if retain {
                video.frames.push(frame.clone());
            }
            video.frame_count += 1;
        })
    }

    fn finish(self: Box<Self>) -> ActsimResult<u64> {
        self.with_video(|video| {
            video.finished = true;
            video.frame_count
        })
    }
}

/// Whether `binary` resolves on `PATH`.
pub fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}
