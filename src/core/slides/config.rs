use serde::{Deserialize, Serialize};

use super::error::{SlideError, SlideResult};

/// 单次分析的配置，创建后不可变
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// 网格列数
    pub grid_cols: u32,
    /// 网格行数
    pub grid_rows: u32,
    /// 两个格子哈希视为相似的最大汉明距离
    pub cell_hash_threshold: u32,
    /// 判定为同一静态画面所需的相似格子比例
    pub min_static_cell_ratio: f64,
    /// 运动段中确认新静态段所需的连续匹配帧数
    pub min_static_frames: u32,
    /// 抽帧帧率，用于 index -> timestamp
    pub fps: f64,
    /// 抽帧缩放上限（抽帧边界使用）
    pub max_width: u32,
    /// 中心裁剪保留的宽高比例
    pub center_crop_ratio: f64,
    /// 跨段去重的汉明距离阈值
    pub duplicate_hash_threshold: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            grid_cols: 4,
            grid_rows: 4,
            cell_hash_threshold: 5,
            min_static_cell_ratio: 0.8,
            min_static_frames: 3,
            fps: 1.0,
            max_width: 1280,
            center_crop_ratio: 0.6,
            duplicate_hash_threshold: 5,
        }
    }
}

impl AnalysisConfig {
    /// 讲座 / 幻灯片录像：翻页少，允许讲者小窗遮挡更多格子
    pub fn for_lecture() -> Self {
        Self {
            min_static_cell_ratio: 0.75,
            min_static_frames: 4,
            ..Default::default()
        }
    }

    /// 屏幕录制：光标、滚动多，网格更细、确认更快
    pub fn for_screen_recording() -> Self {
        Self {
            grid_cols: 6,
            grid_rows: 6,
            min_static_frames: 2,
            fps: 2.0,
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> SlideResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SlideResult<()> {
        if self.grid_cols == 0 || self.grid_rows == 0 {
            return Err(SlideError::InvalidConfig(format!(
                "grid must have at least one cell, got {}x{}",
                self.grid_cols, self.grid_rows
            )));
        }
        if !(self.min_static_cell_ratio > 0.0 && self.min_static_cell_ratio <= 1.0) {
            return Err(SlideError::InvalidConfig(format!(
                "min_static_cell_ratio must be in (0, 1], got {}",
                self.min_static_cell_ratio
            )));
        }
        if !(self.center_crop_ratio > 0.0 && self.center_crop_ratio <= 1.0) {
            return Err(SlideError::InvalidConfig(format!(
                "center_crop_ratio must be in (0, 1], got {}",
                self.center_crop_ratio
            )));
        }
        if !(self.fps.is_finite() && self.fps > 0.0) {
            return Err(SlideError::InvalidConfig(format!(
                "fps must be positive, got {}",
                self.fps
            )));
        }
        if self.min_static_frames == 0 {
            return Err(SlideError::InvalidConfig(
                "min_static_frames must be at least 1".to_string(),
            ));
        }
        if self.max_width == 0 {
            return Err(SlideError::InvalidConfig(
                "max_width must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
