use thiserror::Error;

/// 分析流水线的错误分类
///
/// 致命错误（Acquisition / Io / Image）中止整个流水线，不产生报告；
/// 非致命错误（Extraction / Computation）降级处理，并在报告中显式标注。
#[derive(Debug, Error)]
pub enum AnalyzeError {
    /// 视频源无法打开或未解出任何帧（致命）
    #[error("视频源获取失败: {0}")]
    Acquisition(String),

    /// 音频 / 转写不可用（非致命，报告中标注"无转写文本"）
    #[error("转写不可用: {0}")]
    Extraction(String),

    /// 单个采样帧无法计算指标（非致命，跳过该样本）
    #[error("帧指标计算失败: {0}")]
    Computation(String),

    /// 报告、快照或帧图片写入失败（对该产物致命）
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 帧图片编码 / 保存失败（对该产物致命）
    #[error("图像写入失败: {0}")]
    Image(#[from] image::ImageError),
}

impl AnalyzeError {
    /// 是否为致命错误（中止流水线，无部分报告输出）
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Extraction(_) | Self::Computation(_))
    }
}

pub type AnalyzeResult<T> = Result<T, AnalyzeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(AnalyzeError::Acquisition("打不开".into()).is_fatal());
        assert!(!AnalyzeError::Extraction("无音频".into()).is_fatal());
        assert!(!AnalyzeError::Computation("坏帧".into()).is_fatal());
        let io = AnalyzeError::Io(std::io::Error::new(std::io::ErrorKind::Other, "x"));
        assert!(io.is_fatal());
    }
}
