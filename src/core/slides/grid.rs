//! 网格哈希 - 中心裁剪后按网格逐格计算 pHash
//!
//! 按格比较能容忍局部遮挡（光标、讲者小窗、角落时间戳），
//! 全帧哈希用于跨段去重。

use image::imageops;
use image::GrayImage;
use rayon::prelude::*;

use super::config::AnalysisConfig;
use super::error::{SlideError, SlideResult};
use super::phash::{decode_image, similar, PerceptualHash, PerceptualHasher};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// 居中裁剪，宽高向下取整
pub fn center_crop(width: u32, height: u32, ratio: f64) -> CropRect {
    let crop_w = (width as f64 * ratio).floor() as u32;
    let crop_h = (height as f64 * ratio).floor() as u32;
    CropRect {
        x: (width - crop_w.min(width)) / 2,
        y: (height - crop_h.min(height)) / 2,
        width: crop_w.min(width),
        height: crop_h.min(height),
    }
}

/// 两组网格哈希是否为同一画面
///
/// 长度不等或为空时返回 false。
pub fn compare_grid_hashes(
    a: &[PerceptualHash],
    b: &[PerceptualHash],
    threshold: u32,
    min_match_ratio: f64,
) -> bool {
    if a.is_empty() || a.len() != b.len() {
        return false;
    }
    let matches = a
        .iter()
        .zip(b.iter())
        .filter(|(x, y)| similar(**x, **y, threshold))
        .count();
    matches as f64 / a.len() as f64 >= min_match_ratio
}

pub struct GridHasher {
    hasher: PerceptualHasher,
    cols: u32,
    rows: u32,
    crop_ratio: f64,
}

impl GridHasher {
    pub fn new(cols: u32, rows: u32, crop_ratio: f64) -> Self {
        Self {
            hasher: PerceptualHasher::new(),
            cols,
            rows,
            crop_ratio,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.grid_cols, config.grid_rows, config.center_crop_ratio)
    }

    pub fn cell_count(&self) -> usize {
        (self.cols * self.rows) as usize
    }

    /// 行优先返回 cols * rows 个格子哈希
    pub fn grid_hashes(&self, frame_index: u64, bytes: &[u8]) -> SlideResult<Vec<PerceptualHash>> {
        let (gray, crop) = self.decode_cropped(frame_index, bytes)?;

        let cell_w = crop.width / self.cols;
        let cell_h = crop.height / self.rows;
        if cell_w == 0 || cell_h == 0 {
            return Err(self.too_fine(frame_index, crop));
        }

        let cols = self.cols;
        let hashes = (0..self.cell_count())
            .into_par_iter()
            .map(|i| {
                let col = i as u32 % cols;
                let row = i as u32 / cols;
                let cell = imageops::crop_imm(
                    &gray,
                    crop.x + col * cell_w,
                    crop.y + row * cell_h,
                    cell_w,
                    cell_h,
                )
                .to_image();
                self.hasher.hash(&cell)
            })
            .collect();

        Ok(hashes)
    }

    /// 裁剪后整图一个哈希
    pub fn frame_hash(&self, frame_index: u64, bytes: &[u8]) -> SlideResult<PerceptualHash> {
        let (gray, crop) = self.decode_cropped(frame_index, bytes)?;
        if crop.width == 0 || crop.height == 0 {
            return Err(self.too_fine(frame_index, crop));
        }
        let view = imageops::crop_imm(&gray, crop.x, crop.y, crop.width, crop.height).to_image();
        Ok(self.hasher.hash(&view))
    }

    fn decode_cropped(&self, frame_index: u64, bytes: &[u8]) -> SlideResult<(GrayImage, CropRect)> {
        let gray = decode_image(frame_index, bytes)?.to_luma8();
        let crop = center_crop(gray.width(), gray.height(), self.crop_ratio);
        Ok((gray, crop))
    }

    fn too_fine(&self, frame_index: u64, crop: CropRect) -> SlideError {
        SlideError::GridTooFine {
            frame_index,
            cols: self.cols,
            rows: self.rows,
            crop_width: crop.width,
            crop_height: crop.height,
        }
    }
}
