//! 通过 ffmpeg 按固定 fps 抽帧，ffprobe 取时长
//!
//! 帧以 PNG 写入临时目录，按文件名顺序读回，下标即采样序号。

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use log::{debug, info, warn};
use serde::Deserialize;

use crate::core::slides::error::{SlideError, SlideResult};
use crate::core::slides::frame::Frame;

const FRAME_PATTERN: &str = "frame_%06d.png";

/// 抽帧来源，分析核心只依赖这个 trait
pub trait FrameSource {
    fn extract_frames(&self, path: &Path, fps: f64, max_width: u32) -> SlideResult<Vec<Frame>>;

    /// 秒
    fn probe_duration(&self, path: &Path) -> SlideResult<f64>;
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    format: ProbeFormat,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// 采样 + 限宽（不放大），高度按比例取偶数
pub fn scale_filter(fps: f64, max_width: u32) -> String {
    format!("fps={},scale='min({},iw)':-2", fps, max_width)
}

fn parse_duration(stdout: &[u8]) -> SlideResult<f64> {
    let probe: ProbeOutput = serde_json::from_slice(stdout)?;
    probe
        .format
        .duration
        .as_deref()
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| SlideError::Extraction("ffprobe reported no duration".to_string()))
}

/// 目录下的 PNG，按文件名排序
fn frame_files(dir: &Path) -> SlideResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "png") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn check_status(tool: &str, output: Output) -> SlideResult<Output> {
    if output.status.success() {
        return Ok(output);
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
    Err(SlideError::Extraction(format!(
        "{} exited with {}: {}",
        tool,
        output.status,
        tail.into_iter().rev().collect::<Vec<_>>().join(" | ")
    )))
}

fn ensure_input(path: &Path) -> SlideResult<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(SlideError::Extraction(format!(
            "video file not found: {}",
            path.display()
        )))
    }
}

pub struct FfmpegFrameSource {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl FfmpegFrameSource {
    /// 在 PATH 中查找 ffmpeg 和 ffprobe
    pub fn locate() -> SlideResult<Self> {
        let ffmpeg = which::which("ffmpeg")
            .map_err(|_| SlideError::Extraction("ffmpeg not found in PATH".to_string()))?;
        let ffprobe = which::which("ffprobe")
            .map_err(|_| SlideError::Extraction("ffprobe not found in PATH".to_string()))?;
        debug!("ffmpeg: {}, ffprobe: {}", ffmpeg.display(), ffprobe.display());
        Ok(Self::with_paths(ffmpeg, ffprobe))
    }

    pub fn with_paths(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }
}

impl FrameSource for FfmpegFrameSource {
    fn extract_frames(&self, path: &Path, fps: f64, max_width: u32) -> SlideResult<Vec<Frame>> {
        ensure_input(path)?;
        if !(fps.is_finite() && fps > 0.0) {
            return Err(SlideError::InvalidConfig(format!("fps must be > 0, got {}", fps)));
        }

        let temp_dir = tempfile::tempdir()?;
        info!("🎬 extracting frames from {} at {} fps", path.display(), fps);

        let output = Command::new(&self.ffmpeg)
            .args(["-hide_banner", "-loglevel", "error", "-nostdin", "-i"])
            .arg(path)
            .args(["-vf", &scale_filter(fps, max_width)])
            .arg(temp_dir.path().join(FRAME_PATTERN))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()?;
        check_status("ffmpeg", output)?;

        let files = frame_files(temp_dir.path())?;
        if files.is_empty() {
            warn!("⚠️ ffmpeg produced no frames for {}", path.display());
        }

        let frames = files
            .iter()
            .enumerate()
            .map(|(index, file)| -> SlideResult<Frame> {
                Ok(Frame::new(index as u64, fps, fs::read(file)?))
            })
            .collect::<SlideResult<Vec<_>>>()?;

        info!("✅ extracted {} frames", frames.len());
        Ok(frames)
    }

    fn probe_duration(&self, path: &Path) -> SlideResult<f64> {
        ensure_input(path)?;

        let output = Command::new(&self.ffprobe)
            .args(["-v", "quiet", "-print_format", "json", "-show_format"])
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()?;
        let output = check_status("ffprobe", output)?;

        parse_duration(&output.stdout)
    }
}
