use super::phash::PerceptualHash;

/// 抽帧得到的一帧（编码后的图像字节）
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: u64,
    /// 秒，= index / fps
    pub timestamp: f64,
    /// PNG / JPEG / BMP 字节
    pub image: Vec<u8>,
    /// 网格哈希缓存，存在时检测器直接使用
    pub grid_hashes: Option<Vec<PerceptualHash>>,
    /// 全帧哈希缓存
    pub full_frame_hash: Option<PerceptualHash>,
}

impl Frame {
    pub fn new(index: u64, fps: f64, image: Vec<u8>) -> Self {
        Self {
            index,
            timestamp: index as f64 / fps,
            image,
            grid_hashes: None,
            full_frame_hash: None,
        }
    }

    pub fn with_grid_hashes(mut self, hashes: Vec<PerceptualHash>) -> Self {
        self.grid_hashes = Some(hashes);
        self
    }
}

/// 已算好网格哈希的帧，检测器内部流转用
#[derive(Debug, Clone)]
pub struct HashedFrame {
    pub index: u64,
    pub timestamp: f64,
    pub image: Vec<u8>,
    pub grid_hashes: Vec<PerceptualHash>,
    pub full_frame_hash: Option<PerceptualHash>,
}

impl HashedFrame {
    /// 拆成代表帧 + 网格哈希（后者作为锚点）
    pub fn into_keyframe(self) -> (Keyframe, Vec<PerceptualHash>) {
        let keyframe = Keyframe {
            index: self.index,
            timestamp: self.timestamp,
            image: self.image,
            full_frame_hash: self.full_frame_hash,
        };
        (keyframe, self.grid_hashes)
    }
}

/// 静态段的代表帧，图像字节的所有权转移到段上
#[derive(Debug, Clone)]
pub struct Keyframe {
    pub index: u64,
    pub timestamp: f64,
    pub image: Vec<u8>,
    pub full_frame_hash: Option<PerceptualHash>,
}

/// 静态段首尾帧
///
/// `last == None` 表示尾帧就是首帧本身（单帧静态段），此时全帧哈希直接复用首帧的。
#[derive(Debug, Clone)]
pub struct Keyframes {
    pub first: Keyframe,
    pub last: Option<Keyframe>,
}

impl Keyframes {
    pub fn new(first: Keyframe) -> Self {
        Self { first, last: None }
    }

    pub fn last_frame(&self) -> &Keyframe {
        self.last.as_ref().unwrap_or(&self.first)
    }

    pub fn has_distinct_last(&self) -> bool {
        self.last.is_some()
    }

    /// 取出"最后一帧"，单帧段时就是首帧
    pub fn into_last(self) -> Keyframe {
        match self.last {
            Some(last) => last,
            None => self.first,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyframe(index: u64) -> Keyframe {
        Keyframe {
            index,
            timestamp: index as f64,
            image: vec![],
            full_frame_hash: None,
        }
    }

    #[test]
    fn test_frame_timestamp_from_fps() {
        let frame = Frame::new(5, 2.0, vec![1, 2, 3]);
        assert_eq!(frame.timestamp, 2.5);
        assert!(frame.grid_hashes.is_none());
    }

    #[test]
    fn test_keyframes_last_defaults_to_first() {
        let mut frames = Keyframes::new(keyframe(3));
        assert!(!frames.has_distinct_last());
        assert_eq!(frames.last_frame().index, 3);

        frames.last = Some(keyframe(7));
        assert!(frames.has_distinct_last());
        assert_eq!(frames.last_frame().index, 7);
        assert_eq!(frames.into_last().index, 7);
    }
}
