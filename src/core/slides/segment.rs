use serde::{Deserialize, Serialize};

use super::frame::{HashedFrame, Keyframe, Keyframes};
use super::phash::PerceptualHash;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Static,
    Moving,
}

/// 检测过程中的段，静态段带首尾代表帧
#[derive(Debug, Clone)]
pub struct DetectedSegment {
    pub kind: SegmentKind,
    pub start_time: f64,
    pub end_time: f64,
    pub frame_indices: Vec<u64>,
    pub keyframes: Option<Keyframes>,
}

impl DetectedSegment {
    /// 以该帧开启静态段，返回段和锚点哈希
    pub fn start_static(frame: HashedFrame) -> (Self, Vec<PerceptualHash>) {
        let (keyframe, anchor) = frame.into_keyframe();
        let segment = Self {
            kind: SegmentKind::Static,
            start_time: keyframe.timestamp,
            end_time: keyframe.timestamp,
            frame_indices: vec![keyframe.index],
            keyframes: Some(Keyframes::new(keyframe)),
        };
        (segment, anchor)
    }

    pub fn start_moving(frame: &HashedFrame) -> Self {
        Self {
            kind: SegmentKind::Moving,
            start_time: frame.timestamp,
            end_time: frame.timestamp,
            frame_indices: vec![frame.index],
            keyframes: None,
        }
    }

    /// 静态段吸收一帧匹配帧：尾帧更新为它
    pub fn extend_static(&mut self, frame: HashedFrame) {
        let (keyframe, _) = frame.into_keyframe();
        self.frame_indices.push(keyframe.index);
        self.end_time = keyframe.timestamp;
        if let Some(keyframes) = self.keyframes.as_mut() {
            keyframes.last = Some(keyframe);
        }
    }

    pub fn extend_moving(&mut self, frame: &HashedFrame) {
        self.frame_indices.push(frame.index);
        self.end_time = frame.timestamp;
    }

    /// 合并紧随其后的同类段
    pub fn merge(&mut self, next: DetectedSegment) {
        self.frame_indices.extend(next.frame_indices);
        self.end_time = next.end_time;
        if let (Some(keyframes), Some(next_keyframes)) = (self.keyframes.as_mut(), next.keyframes)
        {
            keyframes.last = Some(next_keyframes.into_last());
        }
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FramePosition {
    First,
    Last,
}

impl FramePosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            FramePosition::First => "first",
            FramePosition::Last => "last",
        }
    }
}

/// 指向更早静态段某一帧的重复引用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateRef {
    pub segment_index: usize,
    pub frame_position: FramePosition,
}

/// 静态段代表帧的对外描述
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameMetadata {
    pub frame_id: String,
    pub perceptual_hash: PerceptualHash,
    pub duplicate_of: Option<DuplicateRef>,
    /// 保留给外部处理失败的帧，核心不填
    pub skip_reason: Option<String>,
    /// 由外部存储分配
    pub url: Option<String>,
    pub blob_path: Option<String>,
}

impl FrameMetadata {
    pub fn new(
        video_id: &str,
        segment_index: usize,
        position: FramePosition,
        perceptual_hash: PerceptualHash,
    ) -> Self {
        Self {
            frame_id: format!("{}-{}-{}", video_id, segment_index, position.as_str()),
            perceptual_hash,
            duplicate_of: None,
            skip_reason: None,
            url: None,
            blob_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovingSegment {
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
    #[serde(skip)]
    pub frame_indices: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticSegment {
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
    pub first_frame: FrameMetadata,
    pub last_frame: FrameMetadata,
    #[serde(skip)]
    pub frame_indices: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Segment {
    Moving(MovingSegment),
    Static(StaticSegment),
}

impl Segment {
    pub fn kind(&self) -> SegmentKind {
        match self {
            Segment::Moving(_) => SegmentKind::Moving,
            Segment::Static(_) => SegmentKind::Static,
        }
    }

    pub fn start_time(&self) -> f64 {
        match self {
            Segment::Moving(s) => s.start_time,
            Segment::Static(s) => s.start_time,
        }
    }

    pub fn end_time(&self) -> f64 {
        match self {
            Segment::Moving(s) => s.end_time,
            Segment::Static(s) => s.end_time,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end_time() - self.start_time()
    }

    pub fn frame_indices(&self) -> &[u64] {
        match self {
            Segment::Moving(s) => &s.frame_indices,
            Segment::Static(s) => &s.frame_indices,
        }
    }

    pub fn as_static(&self) -> Option<&StaticSegment> {
        match self {
            Segment::Static(s) => Some(s),
            Segment::Moving(_) => None,
        }
    }

    pub fn as_static_mut(&mut self) -> Option<&mut StaticSegment> {
        match self {
            Segment::Static(s) => Some(s),
            Segment::Moving(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub segments: Vec<Segment>,
    pub total_frames: usize,
    pub video_duration: f64,
}

impl AnalysisResult {
    pub fn empty(video_duration: f64) -> Self {
        Self {
            segments: Vec::new(),
            total_frames: 0,
            video_duration,
        }
    }

    pub fn static_segments(&self) -> impl Iterator<Item = &StaticSegment> {
        self.segments.iter().filter_map(Segment::as_static)
    }
}
