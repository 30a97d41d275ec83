//! 视频抽帧边界：外部 ffmpeg / ffprobe

pub mod ffmpeg;

pub use ffmpeg::{scale_filter, FfmpegFrameSource, FrameSource};
