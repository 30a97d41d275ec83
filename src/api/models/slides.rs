use serde::{Deserialize, Serialize};

use crate::api::slides::SlideApiError;
use crate::core::slides::{
    AnalysisConfig, AnalysisResult, DuplicateRef, FrameMetadata, Segment, SlideError,
    SlideResult,
};

/// 宿主传入的一帧（PNG / JPEG 等编码字节）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodedFrame {
    /// 采样序号，时间戳 = index / fps
    pub index: u64,
    pub image: Vec<u8>,
}

/// 分析参数，未填的字段取预设（或默认）值
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideAnalysisOptions {
    /// "default" | "lecture" | "screenRecording"
    pub preset: Option<String>,
    pub grid_cols: Option<u32>,
    pub grid_rows: Option<u32>,
    pub cell_hash_threshold: Option<u32>,
    pub min_static_cell_ratio: Option<f64>,
    pub min_static_frames: Option<u32>,
    pub fps: Option<f64>,
    pub max_width: Option<u32>,
    pub center_crop_ratio: Option<f64>,
    pub duplicate_hash_threshold: Option<u32>,
}

impl SlideAnalysisOptions {
    pub fn into_config(self) -> SlideResult<AnalysisConfig> {
        let mut config = match self.preset.as_deref() {
            None | Some("default") => AnalysisConfig::default(),
            Some("lecture") => AnalysisConfig::for_lecture(),
            Some("screenRecording") => AnalysisConfig::for_screen_recording(),
            Some(other) => {
                return Err(SlideError::InvalidConfig(format!("unknown preset: {}", other)))
            }
        };

        if let Some(v) = self.grid_cols {
            config.grid_cols = v;
        }
        if let Some(v) = self.grid_rows {
            config.grid_rows = v;
        }
        if let Some(v) = self.cell_hash_threshold {
            config.cell_hash_threshold = v;
        }
        if let Some(v) = self.min_static_cell_ratio {
            config.min_static_cell_ratio = v;
        }
        if let Some(v) = self.min_static_frames {
            config.min_static_frames = v;
        }
        if let Some(v) = self.fps {
            config.fps = v;
        }
        if let Some(v) = self.max_width {
            config.max_width = v;
        }
        if let Some(v) = self.center_crop_ratio {
            config.center_crop_ratio = v;
        }
        if let Some(v) = self.duplicate_hash_threshold {
            config.duplicate_hash_threshold = v;
        }

        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideDuplicateRef {
    pub segment_index: u32,
    /// "first" | "last"
    pub frame_position: String,
}

impl From<DuplicateRef> for SlideDuplicateRef {
    fn from(dup: DuplicateRef) -> Self {
        Self {
            segment_index: dup.segment_index as u32,
            frame_position: dup.frame_position.as_str().to_string(),
        }
    }
}

/// 静态段的代表帧
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideFrame {
    pub frame_id: String,
    pub frame_index: u64,
    pub timestamp: f64,
    /// 16 位十六进制
    pub perceptual_hash: String,
    pub duplicate_of: Option<SlideDuplicateRef>,
    pub skip_reason: Option<String>,
    pub url: Option<String>,
    pub blob_path: Option<String>,
}

impl SlideFrame {
    fn from_metadata(meta: &FrameMetadata, frame_index: u64, timestamp: f64) -> Self {
        Self {
            frame_id: meta.frame_id.clone(),
            frame_index,
            timestamp,
            perceptual_hash: meta.perceptual_hash.to_hex(),
            duplicate_of: meta.duplicate_of.map(SlideDuplicateRef::from),
            skip_reason: meta.skip_reason.clone(),
            url: meta.url.clone(),
            blob_path: meta.blob_path.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideSegment {
    /// "static" | "moving"
    pub kind: String,
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
    pub frame_count: u32,
    /// 仅静态段有
    pub first_frame: Option<SlideFrame>,
    pub last_frame: Option<SlideFrame>,
}

impl From<&Segment> for SlideSegment {
    fn from(segment: &Segment) -> Self {
        let indices = segment.frame_indices();
        let (first_frame, last_frame) = match segment.as_static() {
            Some(slide) => {
                let first_index = indices.first().copied().unwrap_or_default();
                let last_index = indices.last().copied().unwrap_or(first_index);
                (
                    Some(SlideFrame::from_metadata(
                        &slide.first_frame,
                        first_index,
                        slide.start_time,
                    )),
                    Some(SlideFrame::from_metadata(
                        &slide.last_frame,
                        last_index,
                        slide.end_time,
                    )),
                )
            }
            None => (None, None),
        };

        Self {
            kind: match segment {
                Segment::Static(_) => "static".to_string(),
                Segment::Moving(_) => "moving".to_string(),
            },
            start_time: segment.start_time(),
            end_time: segment.end_time(),
            duration: segment.duration(),
            frame_count: indices.len() as u32,
            first_frame,
            last_frame,
        }
    }
}

/// 一个视频的分析报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideReport {
    pub video_id: String,
    pub total_frames: u64,
    pub video_duration: f64,
    /// 静态段里首帧不是重复的数量
    pub unique_slide_count: u32,
    pub segments: Vec<SlideSegment>,
}

impl SlideReport {
    pub fn from_result(video_id: &str, result: &AnalysisResult) -> Self {
        let unique_slide_count = result
            .static_segments()
            .filter(|s| s.first_frame.duplicate_of.is_none())
            .count() as u32;

        Self {
            video_id: video_id.to_string(),
            total_frames: result.total_frames as u64,
            video_duration: result.video_duration,
            unique_slide_count,
            segments: result.segments.iter().map(SlideSegment::from).collect(),
        }
    }

    #[flutter_rust_bridge::frb(sync)]
    pub fn to_json(&self) -> Result<String, SlideApiError> {
        serde_json::to_string(self).map_err(|e| SlideApiError::from(SlideError::from(e)))
    }
}
