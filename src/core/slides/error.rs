use thiserror::Error;

/// 错误大类，调用方据此决定补救方式（换输入 / 改配置 / 报 bug）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// 帧图像本身损坏
    Input,
    /// 网格 / 分辨率 / 参数不匹配，重试无意义
    Config,
    /// 内部不变量被破坏
    Internal,
    /// 抽帧边界（ffmpeg、文件系统）失败
    Extraction,
}

#[derive(Debug, Error)]
pub enum SlideError {
    #[error("Failed to decode frame {frame_index}: {source}")]
    ImageDecode {
        frame_index: u64,
        #[source]
        source: image::ImageError,
    },
    #[error(
        "Grid {cols}x{rows} too fine for {crop_width}x{crop_height} crop (frame {frame_index})"
    )]
    GridTooFine {
        frame_index: u64,
        cols: u32,
        rows: u32,
        crop_width: u32,
        crop_height: u32,
    },
    #[error("Invalid analysis config: {0}")]
    InvalidConfig(String),
    #[error("Segment detector invariant violated: {0}")]
    Internal(String),
    #[error("Frame extraction failed: {0}")]
    Extraction(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl SlideError {
    pub fn class(&self) -> ErrorClass {
        match self {
            SlideError::ImageDecode { .. } => ErrorClass::Input,
            SlideError::GridTooFine { .. } | SlideError::InvalidConfig(_) => ErrorClass::Config,
            SlideError::Internal(_) | SlideError::ThreadPool(_) => ErrorClass::Internal,
            SlideError::Extraction(_) | SlideError::Io(_) | SlideError::Json(_) => {
                ErrorClass::Extraction
            }
        }
    }
}

pub type SlideResult<T> = Result<T, SlideError>;
