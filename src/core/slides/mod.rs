//! 幻灯片分段引擎 - 从按序抽出的视频帧中找出静态画面（幻灯片）
//!
//! 核心流程：
//! 1. 网格哈希 - 中心裁剪后逐格 pHash，按格比较容忍局部遮挡
//! 2. 状态机分段 - 静态 / 运动两态，候选缓冲做迟滞，避免抖动
//! 3. 全帧哈希 - 仅对静态段首尾代表帧计算
//! 4. 跨段去重 - 与更早的静态段比较，记录最早的重复引用

pub mod analyzer;
pub mod config;
pub mod detector;
pub mod duplicates;
pub mod error;
pub mod frame;
pub mod grid;
pub mod phash;
pub mod segment;

pub use analyzer::{analyze_frames, VideoAnalyzer};
pub use config::AnalysisConfig;
pub use detector::{DetectorPhase, DetectorState, SegmentDetector};
pub use duplicates::detect_duplicates;
pub use error::{ErrorClass, SlideError, SlideResult};
pub use frame::{Frame, HashedFrame, Keyframe, Keyframes};
pub use grid::{center_crop, compare_grid_hashes, CropRect, GridHasher};
pub use phash::{distance, similar, PerceptualHash, PerceptualHasher};
pub use segment::{
    AnalysisResult, DetectedSegment, DuplicateRef, FrameMetadata, FramePosition, MovingSegment,
    Segment, SegmentKind, StaticSegment,
};
