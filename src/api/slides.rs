//! 幻灯片提取器

use std::path::Path;

use flutter_rust_bridge::frb;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::api::models::slides::{EncodedFrame, SlideAnalysisOptions, SlideReport};
use crate::core::slides::{ErrorClass, Frame, SlideError, VideoAnalyzer};
use crate::core::video::{FfmpegFrameSource, FrameSource};
use crate::core::youtube::extract_video_id;

/// 幻灯片 API 错误类型，FRB 友好的设计
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlideApiError {
    pub error_type: String,
    pub message: String,
}

impl SlideApiError {
    fn video_id_not_found() -> Self {
        Self {
            error_type: "VideoIdNotFound".to_string(),
            message: "未找到 YouTube 视频 ID".to_string(),
        }
    }
}

impl From<SlideError> for SlideApiError {
    fn from(err: SlideError) -> Self {
        let error_type = match err.class() {
            ErrorClass::Input => "InvalidInput",
            ErrorClass::Config => "InvalidConfig",
            ErrorClass::Internal => "Internal",
            ErrorClass::Extraction => "ExtractionFailed",
        };
        Self {
            error_type: error_type.to_string(),
            message: err.to_string(),
        }
    }
}

impl std::fmt::Display for SlideApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.error_type, self.message)
    }
}

impl std::error::Error for SlideApiError {}

/// 幻灯片提取器 - 静态画面分段 + 重复幻灯片标注
///
/// ```dart
/// final analyzer = SlideAnalyzer.create(videoId: "dQw4w9WgXcQ");
/// final report = await analyzer.analyzeVideo(path: mp4Path);
/// ```
#[frb(opaque)]
pub struct SlideAnalyzer {
    analyzer: VideoAnalyzer,
}

impl SlideAnalyzer {
    /// options 为空时使用默认配置
    #[frb(sync)]
    pub fn create(
        video_id: String,
        options: Option<SlideAnalysisOptions>,
    ) -> Result<Self, SlideApiError> {
        crate::init_logging();

        let config = options.unwrap_or_default().into_config()?;
        let analyzer = VideoAnalyzer::new(video_id, config)?;
        info!("🎞️ SlideAnalyzer: created for {}", analyzer.video_id());
        Ok(Self { analyzer })
    }

    /// 分析宿主已抽好的帧，按 index 顺序传入
    #[frb]
    pub fn analyze_frames(&self, frames: Vec<EncodedFrame>) -> Result<SlideReport, SlideApiError> {
        let fps = self.analyzer.config().fps;
        let frames = frames
            .into_iter()
            .map(|f| Frame::new(f.index, fps, f.image))
            .collect();
        let result = self.analyzer.analyze(frames)?;
        Ok(SlideReport::from_result(self.analyzer.video_id(), &result))
    }

    /// 用 ffmpeg 抽帧后分析本地视频文件
    #[frb]
    pub fn analyze_video(&self, path: String) -> Result<SlideReport, SlideApiError> {
        let source = FfmpegFrameSource::locate()?;
        self.analyze_with_source(&source, Path::new(&path))
    }

    #[frb(ignore)]
    pub fn analyze_with_source(
        &self,
        source: &impl FrameSource,
        path: &Path,
    ) -> Result<SlideReport, SlideApiError> {
        let config = self.analyzer.config();
        let frames = source.extract_frames(path, config.fps, config.max_width)?;

        // 时长取不到时按帧数估算，不影响分段
        let duration = source.probe_duration(path).unwrap_or_else(|e| {
            warn!("⚠️ duration probe failed, estimating from frame count: {}", e);
            frames.len() as f64 / config.fps
        });

        let result = self.analyzer.analyze_with_duration(frames, duration)?;
        Ok(SlideReport::from_result(self.analyzer.video_id(), &result))
    }

    #[frb(sync, getter)]
    pub fn video_id(&self) -> String {
        self.analyzer.video_id().to_string()
    }
}

impl Drop for SlideAnalyzer {
    fn drop(&mut self) {
        info!("🗑️ SlideAnalyzer: released");
    }
}

/// 从分享文本或链接中提取 YouTube 视频 ID
///
/// # 示例
/// ```ignore
/// let id = parse_youtube_video_id("看这个 https://youtu.be/dQw4w9WgXcQ".to_string())?;
/// assert_eq!(id, "dQw4w9WgXcQ");
/// ```
#[frb(sync)]
pub fn parse_youtube_video_id(text: String) -> Result<String, SlideApiError> {
    extract_video_id(&text).ok_or_else(SlideApiError::video_id_not_found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::slides::SlideResult;
    use image::{DynamicImage, GrayImage, ImageOutputFormat, Luma};
    use std::io::Cursor;

    fn slide_png(seed: u32) -> Vec<u8> {
        let img = GrayImage::from_fn(320, 240, |x, y| {
            let mut v = (x / 10).wrapping_mul(73_856_093) ^ (y / 10).wrapping_mul(19_349_663) ^ seed;
            v ^= v >> 13;
            v = v.wrapping_mul(0x5bd1_e995);
            v ^= v >> 15;
            Luma([(v & 0xFF) as u8])
        });
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageLuma8(img)
            .write_to(&mut buffer, ImageOutputFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    struct FakeSource {
        seeds: Vec<u32>,
        duration: Option<f64>,
    }

    impl FrameSource for FakeSource {
        fn extract_frames(&self, _path: &Path, fps: f64, _max_width: u32) -> SlideResult<Vec<Frame>> {
            Ok(self
                .seeds
                .iter()
                .enumerate()
                .map(|(i, seed)| Frame::new(i as u64, fps, slide_png(*seed)))
                .collect())
        }

        fn probe_duration(&self, _path: &Path) -> SlideResult<f64> {
            self.duration
                .ok_or_else(|| SlideError::Extraction("no duration".to_string()))
        }
    }

    #[test]
    fn test_parse_youtube_video_id() {
        let id = parse_youtube_video_id("看这个 https://youtu.be/dQw4w9WgXcQ".to_string()).unwrap();
        assert_eq!(id, "dQw4w9WgXcQ");

        let err = parse_youtube_video_id("没有链接".to_string()).unwrap_err();
        assert_eq!(err.error_type, "VideoIdNotFound");
    }

    #[test]
    fn test_create_rejects_bad_options() {
        let options = SlideAnalysisOptions {
            fps: Some(0.0),
            ..Default::default()
        };
        let err = SlideAnalyzer::create("v".to_string(), Some(options))
            .err()
            .unwrap();
        assert_eq!(err.error_type, "InvalidConfig");
    }

    #[test]
    fn test_analyze_frames_reports_slides() {
        let analyzer = SlideAnalyzer::create("abc".to_string(), None).unwrap();
        assert_eq!(analyzer.video_id(), "abc");

        let frames = [1, 1, 1, 2, 2, 2, 2]
            .iter()
            .enumerate()
            .map(|(i, seed)| EncodedFrame {
                index: i as u64,
                image: slide_png(*seed),
            })
            .collect();
        let report = analyzer.analyze_frames(frames).unwrap();

        assert_eq!(report.total_frames, 7);
        assert_eq!(report.unique_slide_count, 2);
        assert_eq!(report.segments[0].kind, "static");
    }

    #[test]
    fn test_corrupt_frame_maps_to_invalid_input() {
        let analyzer = SlideAnalyzer::create("abc".to_string(), None).unwrap();
        let frames = vec![EncodedFrame {
            index: 0,
            image: vec![1, 2, 3],
        }];
        let err = analyzer.analyze_frames(frames).unwrap_err();
        assert_eq!(err.error_type, "InvalidInput");
    }

    #[test]
    fn test_analyze_with_source_uses_probed_duration() {
        let analyzer = SlideAnalyzer::create("abc".to_string(), None).unwrap();
        let source = FakeSource {
            seeds: vec![3, 3, 3],
            duration: Some(3.7),
        };
        let report = analyzer
            .analyze_with_source(&source, Path::new("lecture.mp4"))
            .unwrap();
        assert_eq!(report.video_duration, 3.7);
        assert_eq!(report.segments.len(), 1);
    }

    #[test]
    fn test_analyze_with_source_estimates_missing_duration() {
        let analyzer = SlideAnalyzer::create("abc".to_string(), None).unwrap();
        let source = FakeSource {
            seeds: vec![3, 3, 3, 3],
            duration: None,
        };
        let report = analyzer
            .analyze_with_source(&source, Path::new("lecture.mp4"))
            .unwrap();
        assert_eq!(report.video_duration, 4.0);
    }
}
