//! 跨段去重：静态段首尾帧与更早的静态段比较，记录最早的匹配

use log::debug;

use super::phash::{similar, PerceptualHash};
use super::segment::{DuplicateRef, FramePosition, Segment};

struct Visited {
    segment_index: usize,
    first: PerceptualHash,
    last: PerceptualHash,
}

/// 按时间顺序扫描之前的静态段，取第一个命中（最早而不是最像）
fn earliest_match(
    visited: &[Visited],
    hash: PerceptualHash,
    threshold: u32,
) -> Option<DuplicateRef> {
    visited.iter().find_map(|prior| {
        if similar(hash, prior.first, threshold) {
            Some(DuplicateRef {
                segment_index: prior.segment_index,
                frame_position: FramePosition::First,
            })
        } else if similar(hash, prior.last, threshold) {
            Some(DuplicateRef {
                segment_index: prior.segment_index,
                frame_position: FramePosition::Last,
            })
        } else {
            None
        }
    })
}

/// 原地填充 `duplicate_of`；引用永远指向下标更小的段
pub fn detect_duplicates(segments: &mut [Segment], threshold: u32) {
    let mut visited: Vec<Visited> = Vec::new();

    for (segment_index, segment) in segments.iter_mut().enumerate() {
        let Some(slide) = segment.as_static_mut() else {
            continue;
        };

        let first = slide.first_frame.perceptual_hash;
        let last = slide.last_frame.perceptual_hash;

        slide.first_frame.duplicate_of = earliest_match(&visited, first, threshold);
        slide.last_frame.duplicate_of = earliest_match(&visited, last, threshold);

        if let Some(dup) = slide.first_frame.duplicate_of {
            debug!(
                "segment {} first frame duplicates segment {} ({})",
                segment_index,
                dup.segment_index,
                dup.frame_position.as_str()
            );
        }

        visited.push(Visited {
            segment_index,
            first,
            last,
        });
    }
}
