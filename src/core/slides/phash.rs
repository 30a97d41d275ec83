//! DCT 感知哈希 + 汉明距离

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, Luma};
use rustdct::{Dct2, DctPlanner, TransformType2And3};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use super::error::{SlideError, SlideResult};

/// DCT 输入边长
const DCT_SIZE: usize = 32;
/// 取左上角低频块的边长，8x8 = 64 bit
const HASH_SIZE: usize = 8;
const HEX_LEN: usize = 16;

/// 64 bit 感知哈希，对外以 16 位小写十六进制字符串表示
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PerceptualHash(pub u64);

impl PerceptualHash {
    pub fn to_hex(&self) -> String {
        format!("{:016x}", self.0)
    }
}

impl fmt::Display for PerceptualHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid perceptual hash: {0:?}")]
pub struct ParseHashError(String);

impl FromStr for PerceptualHash {
    type Err = ParseHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != HEX_LEN {
            return Err(ParseHashError(s.to_string()));
        }
        u64::from_str_radix(s, 16)
            .map(PerceptualHash)
            .map_err(|_| ParseHashError(s.to_string()))
    }
}

impl Serialize for PerceptualHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PerceptualHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

pub fn distance(a: PerceptualHash, b: PerceptualHash) -> u32 {
    (a.0 ^ b.0).count_ones()
}

/// 阈值包含边界：distance == threshold 也算相似
pub fn similar(a: PerceptualHash, b: PerceptualHash, threshold: u32) -> bool {
    distance(a, b) <= threshold
}

/// 解码抽帧得到的图像字节（PNG / JPEG / BMP）
pub fn decode_image(frame_index: u64, bytes: &[u8]) -> SlideResult<DynamicImage> {
    image::load_from_memory(bytes).map_err(|source| SlideError::ImageDecode {
        frame_index,
        source,
    })
}

/// pHash 计算器，DCT plan 只规划一次，可跨线程共享
pub struct PerceptualHasher {
    dct: Arc<dyn TransformType2And3<f32>>,
}

impl PerceptualHasher {
    pub fn new() -> Self {
        let mut planner = DctPlanner::new();
        Self {
            dct: planner.plan_dct2(DCT_SIZE),
        }
    }

    /// 对灰度图（或其子视图）计算 pHash
    pub fn hash<I>(&self, image: &I) -> PerceptualHash
    where
        I: GenericImageView<Pixel = Luma<u8>>,
    {
        let resized = imageops::resize(image, DCT_SIZE as u32, DCT_SIZE as u32, FilterType::Triangle);
        let mut coeffs: Vec<f32> = resized.pixels().map(|p| p.0[0] as f32).collect();
        self.dct_2d(&mut coeffs);

        let low: Vec<f32> = (0..HASH_SIZE)
            .flat_map(|y| {
                let coeffs = &coeffs;
                (0..HASH_SIZE).map(move |x| coeffs[y * DCT_SIZE + x])
            })
            .collect();

        let mut sorted = low.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let mid = sorted.len() / 2;
        let median = (sorted[mid - 1] + sorted[mid]) / 2.0;

        let mut hash: u64 = 0;
        for (i, &val) in low.iter().enumerate() {
            if val > median {
                hash |= 1 << i;
            }
        }
        PerceptualHash(hash)
    }

    /// 行变换 -> 转置 -> 行变换 -> 转置回来
    fn dct_2d(&self, buffer: &mut [f32]) {
        for row in buffer.chunks_exact_mut(DCT_SIZE) {
            self.dct.process_dct2(row);
        }
        transpose(buffer);
        for row in buffer.chunks_exact_mut(DCT_SIZE) {
            self.dct.process_dct2(row);
        }
        transpose(buffer);
    }
}

impl Default for PerceptualHasher {
    fn default() -> Self {
        Self::new()
    }
}

fn transpose(buffer: &mut [f32]) {
    for y in 0..DCT_SIZE {
        for x in (y + 1)..DCT_SIZE {
            buffer.swap(y * DCT_SIZE + x, x * DCT_SIZE + y);
        }
    }
}
