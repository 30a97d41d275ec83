//! 静态 / 运动分段状态机
//!
//! 状态：Idle -> Static <-> Moving -> (finish)
//!
//! 运动段内维护一个"候选缓冲"：连续匹配同一画面的帧达到
//! `min_static_frames` 时才确认为新的静态段，避免瞬时噪声来回切换。

use std::sync::Arc;

use log::debug;

use super::config::AnalysisConfig;
use super::error::{SlideError, SlideResult};
use super::frame::{Frame, HashedFrame};
use super::grid::{compare_grid_hashes, GridHasher};
use super::phash::PerceptualHash;
use super::segment::{DetectedSegment, SegmentKind};

#[derive(Debug, Default)]
pub enum DetectorPhase {
    #[default]
    Idle,
    Static {
        segment: DetectedSegment,
        anchor: Vec<PerceptualHash>,
    },
    /// 候选锚点 = tentative[0] 的网格哈希
    Moving {
        segment: DetectedSegment,
        tentative: Vec<HashedFrame>,
    },
}

impl DetectorPhase {
    pub fn kind(&self) -> Option<SegmentKind> {
        match self {
            DetectorPhase::Idle => None,
            DetectorPhase::Static { .. } => Some(SegmentKind::Static),
            DetectorPhase::Moving { .. } => Some(SegmentKind::Moving),
        }
    }
}

/// 状态机的完整状态，`step` 消费旧状态返回新状态
#[derive(Debug, Default)]
pub struct DetectorState {
    pub phase: DetectorPhase,
    pub committed: Vec<DetectedSegment>,
}

impl DetectorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(mut self, frame: HashedFrame, config: &AnalysisConfig) -> SlideResult<Self> {
        let phase = std::mem::take(&mut self.phase);

        self.phase = match phase {
            DetectorPhase::Idle => {
                debug!("frame {}: first frame, start static", frame.index);
                let (segment, anchor) = DetectedSegment::start_static(frame);
                DetectorPhase::Static { segment, anchor }
            }

            DetectorPhase::Static {
                mut segment,
                anchor,
            } => {
                if Self::matches(&anchor, &frame.grid_hashes, config) {
                    segment.extend_static(frame);
                    DetectorPhase::Static { segment, anchor }
                } else {
                    debug!(
                        "frame {}: left static scene started at {:.2}s",
                        frame.index, segment.start_time
                    );
                    self.commit(segment);
                    DetectorPhase::Moving {
                        segment: DetectedSegment::start_moving(&frame),
                        tentative: vec![frame],
                    }
                }
            }

            DetectorPhase::Moving {
                mut segment,
                mut tentative,
            } => {
                segment.extend_moving(&frame);

                let continues = tentative
                    .first()
                    .map(|anchor| Self::matches(&anchor.grid_hashes, &frame.grid_hashes, config));

                match continues {
                    Some(true) => {
                        tentative.push(frame);
                        if tentative.len() >= config.min_static_frames as usize {
                            self.confirm_static(segment, tentative)?
                        } else {
                            DetectorPhase::Moving { segment, tentative }
                        }
                    }
                    // 候选断了，以当前帧重新开始
                    Some(false) => DetectorPhase::Moving {
                        segment,
                        tentative: vec![frame],
                    },
                    None => DetectorPhase::Moving { segment, tentative },
                }
            }
        };

        Ok(self)
    }

    /// 结束：提交进行中的段，未确认的候选帧留在运动段里
    pub fn finish(mut self) -> Vec<DetectedSegment> {
        match std::mem::take(&mut self.phase) {
            DetectorPhase::Idle => {}
            DetectorPhase::Static { segment, .. } | DetectorPhase::Moving { segment, .. } => {
                self.commit(segment)
            }
        }
        self.committed
    }

    fn matches(anchor: &[PerceptualHash], hashes: &[PerceptualHash], config: &AnalysisConfig) -> bool {
        compare_grid_hashes(
            anchor,
            hashes,
            config.cell_hash_threshold,
            config.min_static_cell_ratio,
        )
    }

    /// 候选缓冲达到阈值：从运动段尾部剥离候选帧，提交运动段，开启新静态段
    fn confirm_static(
        &mut self,
        mut moving: DetectedSegment,
        tentative: Vec<HashedFrame>,
    ) -> SlideResult<DetectorPhase> {
        let keep = moving
            .frame_indices
            .len()
            .checked_sub(tentative.len())
            .ok_or_else(|| {
                SlideError::Internal(format!(
                    "tentative run of {} frames longer than moving segment of {}",
                    tentative.len(),
                    moving.frame_indices.len()
                ))
            })?;

        let is_suffix = moving.frame_indices[keep..]
            .iter()
            .zip(tentative.iter())
            .all(|(index, frame)| *index == frame.index);
        if !is_suffix {
            return Err(SlideError::Internal(format!(
                "tentative frames {:?} are not the tail of moving segment",
                tentative.iter().map(|f| f.index).collect::<Vec<_>>()
            )));
        }

        let mut frames = tentative.into_iter();
        let first = frames
            .next()
            .ok_or_else(|| SlideError::Internal("empty tentative run confirmed".to_string()))?;

        moving.frame_indices.truncate(keep);
        moving.end_time = first.timestamp;
        debug!(
            "frame {}: static scene confirmed, moving segment keeps {} frames",
            first.index, keep
        );
        self.commit(moving);

        let (mut segment, anchor) = DetectedSegment::start_static(first);
        for frame in frames {
            segment.extend_static(frame);
        }
        Ok(DetectorPhase::Static { segment, anchor })
    }

    /// 提交段；与上一个已提交段同类时合并
    fn commit(&mut self, segment: DetectedSegment) {
        match self.committed.last_mut() {
            Some(prev) if prev.kind == segment.kind => {
                debug!(
                    "merging {:?} segment {:.2}s-{:.2}s into previous",
                    segment.kind, segment.start_time, segment.end_time
                );
                prev.merge(segment);
            }
            _ => self.committed.push(segment),
        }
    }
}

/// 逐帧驱动状态机，负责计算（或复用）网格哈希
pub struct SegmentDetector {
    state: DetectorState,
    config: AnalysisConfig,
    grid: Arc<GridHasher>,
    frame_counter: u64,
}

impl SegmentDetector {
    pub fn new(config: AnalysisConfig) -> Self {
        let grid = Arc::new(GridHasher::from_config(&config));
        Self::with_grid(config, grid)
    }

    pub fn with_grid(config: AnalysisConfig, grid: Arc<GridHasher>) -> Self {
        Self {
            state: DetectorState::new(),
            config,
            grid,
            frame_counter: 0,
        }
    }

    /// 帧必须按 index 顺序送入；哈希失败则整次分析失败
    pub fn process_frame(&mut self, frame: Frame) -> SlideResult<()> {
        let grid_hashes = match frame.grid_hashes {
            Some(hashes) => hashes,
            None => self.grid.grid_hashes(frame.index, &frame.image)?,
        };
        let hashed = HashedFrame {
            index: frame.index,
            timestamp: frame.timestamp,
            image: frame.image,
            grid_hashes,
            full_frame_hash: frame.full_frame_hash,
        };

        let state = std::mem::take(&mut self.state);
        self.state = state.step(hashed, &self.config)?;
        self.frame_counter += 1;
        Ok(())
    }

    /// 提交最后一段并返回全部段，检测器回到初始状态
    pub fn finalize(&mut self) -> Vec<DetectedSegment> {
        self.frame_counter = 0;
        std::mem::take(&mut self.state).finish()
    }

    pub fn phase_kind(&self) -> Option<SegmentKind> {
        self.state.phase.kind()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_counter
    }

}
