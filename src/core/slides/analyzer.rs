use std::sync::Arc;

use log::{debug, info};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use super::config::AnalysisConfig;
use super::detector::SegmentDetector;
use super::duplicates::detect_duplicates;
use super::error::{SlideError, SlideResult};
use super::frame::{Frame, Keyframe, Keyframes};
use super::grid::GridHasher;
use super::phash::PerceptualHash;
use super::segment::{
    AnalysisResult, DetectedSegment, FrameMetadata, FramePosition, MovingSegment, Segment,
    SegmentKind, StaticSegment,
};

/// 全帧哈希后处理的并发上限
const MAX_HASH_WORKERS: usize = 4;

/// 单个视频的分析驱动：逐帧分段 -> 代表帧全帧哈希 -> 跨段去重
pub struct VideoAnalyzer {
    video_id: String,
    config: AnalysisConfig,
    grid: Arc<GridHasher>,
    pool: ThreadPool,
}

impl VideoAnalyzer {
    pub fn new(video_id: impl Into<String>, config: AnalysisConfig) -> SlideResult<Self> {
        config.validate()?;

        let num_threads = num_cpus::get().min(MAX_HASH_WORKERS);
        debug!("Using {} threads for keyframe hashing", num_threads);
        let pool = ThreadPoolBuilder::new().num_threads(num_threads).build()?;

        Ok(Self {
            video_id: video_id.into(),
            grid: Arc::new(GridHasher::from_config(&config)),
            config,
            pool,
        })
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// 视频时长按 帧数 / fps 估算
    pub fn analyze(&self, frames: Vec<Frame>) -> SlideResult<AnalysisResult> {
        let duration = frames.len() as f64 / self.config.fps;
        self.analyze_with_duration(frames, duration)
    }

    /// `video_duration` 由上游探测得到，原样写入结果
    pub fn analyze_with_duration(
        &self,
        frames: Vec<Frame>,
        video_duration: f64,
    ) -> SlideResult<AnalysisResult> {
        if frames.is_empty() {
            info!("🎞️ {}: no frames, nothing to analyze", self.video_id);
            return Ok(AnalysisResult::empty(video_duration));
        }

        let total_frames = frames.len();
        info!(
            "🎞️ {}: analyzing {} frames at {} fps",
            self.video_id, total_frames, self.config.fps
        );

        let mut detector = SegmentDetector::with_grid(self.config.clone(), self.grid.clone());
        for frame in frames {
            detector.process_frame(frame)?;
        }
        let mut detected = detector.finalize();

        self.hash_keyframes(&mut detected)?;

        let mut segments = self.build_segments(detected)?;
        detect_duplicates(&mut segments, self.config.duplicate_hash_threshold);

        let slides = segments.iter().filter(|s| s.kind() == SegmentKind::Static).count();
        info!(
            "✅ {}: {} segments, {} static",
            self.video_id,
            segments.len(),
            slides
        );

        Ok(AnalysisResult {
            segments,
            total_frames,
            video_duration,
        })
    }

    /// 静态段首尾帧的全帧哈希，段之间互不依赖，放到线程池里并行
    fn hash_keyframes(&self, detected: &mut [DetectedSegment]) -> SlideResult<()> {
        let grid = &self.grid;
        self.pool.install(|| {
            detected
                .par_iter_mut()
                .filter_map(|segment| segment.keyframes.as_mut())
                .try_for_each(|keyframes| Self::hash_pair(grid, keyframes))
        })
    }

    fn hash_pair(grid: &GridHasher, keyframes: &mut Keyframes) -> SlideResult<()> {
        Self::ensure_hash(grid, &mut keyframes.first)?;
        if let Some(last) = keyframes.last.as_mut() {
            Self::ensure_hash(grid, last)?;
        }
        Ok(())
    }

    fn ensure_hash(grid: &GridHasher, keyframe: &mut Keyframe) -> SlideResult<PerceptualHash> {
        if let Some(hash) = keyframe.full_frame_hash {
            return Ok(hash);
        }
        let hash = grid.frame_hash(keyframe.index, &keyframe.image)?;
        keyframe.full_frame_hash = Some(hash);
        Ok(hash)
    }

    fn build_segments(&self, detected: Vec<DetectedSegment>) -> SlideResult<Vec<Segment>> {
        detected
            .into_iter()
            .enumerate()
            .map(|(index, segment)| self.to_segment(index, segment))
            .collect()
    }

    fn to_segment(&self, index: usize, segment: DetectedSegment) -> SlideResult<Segment> {
        let duration = segment.duration();
        let mut keyframes = match (segment.kind, segment.keyframes) {
            (SegmentKind::Moving, _) => {
                return Ok(Segment::Moving(MovingSegment {
                    start_time: segment.start_time,
                    end_time: segment.end_time,
                    duration,
                    frame_indices: segment.frame_indices,
                }))
            }
            (SegmentKind::Static, Some(keyframes)) => keyframes,
            (SegmentKind::Static, None) => {
                return Err(SlideError::Internal(format!(
                    "static segment {} has no keyframes",
                    index
                )))
            }
        };

        let first_hash = Self::ensure_hash(&self.grid, &mut keyframes.first)?;
        // 单帧段的尾帧就是首帧，直接复用哈希
        let last_hash = match keyframes.last.as_mut() {
            Some(last) => Self::ensure_hash(&self.grid, last)?,
            None => first_hash,
        };

        Ok(Segment::Static(StaticSegment {
            start_time: segment.start_time,
            end_time: segment.end_time,
            duration,
            first_frame: FrameMetadata::new(&self.video_id, index, FramePosition::First, first_hash),
            last_frame: FrameMetadata::new(&self.video_id, index, FramePosition::Last, last_hash),
            frame_indices: segment.frame_indices,
        }))
    }
}

/// 一次性分析入口
pub fn analyze_frames(
    video_id: &str,
    frames: Vec<Frame>,
    config: AnalysisConfig,
) -> SlideResult<AnalysisResult> {
    VideoAnalyzer::new(video_id, config)?.analyze(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::slides::error::ErrorClass;
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

    fn frames(seeds: &[u32]) -> Vec<Frame> {
        seeds
            .iter()
            .enumerate()
            .map(|(i, seed)| Frame::new(i as u64, 1.0, slide_png(*seed)))
            .collect()
    }

    fn analyzer() -> VideoAnalyzer {
        VideoAnalyzer::new("abc123XYZ_-", AnalysisConfig::default()).unwrap()
    }

    #[test]
    fn test_empty_input() {
        let result = analyzer().analyze_with_duration(vec![], 42.5).unwrap();
        assert!(result.segments.is_empty());
        assert_eq!(result.total_frames, 0);
        assert_eq!(result.video_duration, 42.5);
    }

    #[test]
    fn test_repeated_slide_is_linked_to_first_occurrence() {
        // A A A B B B B A A A
        let result = analyzer().analyze(frames(&[1, 1, 1, 2, 2, 2, 2, 1, 1, 1])).unwrap();

        assert_eq!(result.total_frames, 10);
        assert_eq!(result.video_duration, 10.0);
        let kinds: Vec<SegmentKind> = result.segments.iter().map(Segment::kind).collect();
        assert_eq!(
            kinds,
            vec![
                SegmentKind::Static,
                SegmentKind::Moving,
                SegmentKind::Static,
                SegmentKind::Moving,
                SegmentKind::Static
            ]
        );

        let all: Vec<u64> = result
            .segments
            .iter()
            .flat_map(|s| s.frame_indices().iter().copied())
            .collect();
        assert_eq!(all, (0..10).collect::<Vec<_>>());

        let first = result.segments[0].as_static().unwrap();
        let second = result.segments[2].as_static().unwrap();
        let third = result.segments[4].as_static().unwrap();

        assert_eq!(first.first_frame.duplicate_of, None);
        assert_eq!(second.first_frame.duplicate_of, None);
        assert_eq!(second.last_frame.duplicate_of, None);
        let dup = third.first_frame.duplicate_of.unwrap();
        assert_eq!(dup.segment_index, 0);
        assert_eq!(dup.frame_position, FramePosition::First);
        assert_eq!(third.last_frame.duplicate_of.unwrap().segment_index, 0);

        assert_eq!(first.first_frame.frame_id, "abc123XYZ_--0-first");
        assert_eq!(third.last_frame.frame_id, "abc123XYZ_--4-last");
        assert_eq!(second.start_time, 3.0);
        assert_eq!(second.end_time, 6.0);
    }

    #[test]
    fn test_single_frame_static_copies_hash() {
        // 开头就是运动：第 0 帧单独成静态段
        let result = analyzer().analyze(frames(&[1, 2, 3, 4, 5])).unwrap();
        let opening = result.segments[0].as_static().unwrap();
        assert_eq!(opening.frame_indices, vec![0]);
        assert_eq!(
            opening.first_frame.perceptual_hash,
            opening.last_frame.perceptual_hash
        );
        assert_eq!(result.segments.len(), 2);
    }

    #[test]
    fn test_analysis_is_deterministic() {
        let seeds = [1, 1, 2, 3, 3, 3, 3, 1, 1, 1, 4];
        let a = analyzer().analyze(frames(&seeds)).unwrap();
        let b = analyzer().analyze(frames(&seeds)).unwrap();
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_no_adjacent_segments_share_kind() {
        let seeds = [1, 2, 2, 2, 3, 1, 1, 1, 1, 5, 6, 6];
        let result = analyzer().analyze(frames(&seeds)).unwrap();
        for pair in result.segments.windows(2) {
            assert_ne!(pair[0].kind(), pair[1].kind());
        }
    }

    #[test]
    fn test_corrupt_frame_aborts_analysis() {
        let mut input = frames(&[1, 1]);
        input.push(Frame::new(2, 1.0, vec![0xde, 0xad]));
        let err = analyzer().analyze(input).unwrap_err();
        assert!(matches!(err, SlideError::ImageDecode { frame_index: 2, .. }));
    }

    #[test]
    fn test_grid_too_fine_is_config_error() {
        let config = AnalysisConfig {
            grid_cols: 400,
            ..Default::default()
        };
        let err = VideoAnalyzer::new("v", config)
            .unwrap()
            .analyze(frames(&[1]))
            .unwrap_err();
        assert_eq!(err.class(), ErrorClass::Config);
    }

    #[test]
    fn test_invalid_config_rejected_up_front() {
        let config = AnalysisConfig {
            fps: -1.0,
            ..Default::default()
        };
        assert!(VideoAnalyzer::new("v", config).is_err());
    }

    #[test]
    fn test_analyze_frames_entry_point() {
        let result = analyze_frames("v", frames(&[7, 7, 7]), AnalysisConfig::default()).unwrap();
        assert_eq!(result.segments.len(), 1);
        assert_eq!(result.static_segments().count(), 1);
    }
}
