use serde::{Deserialize, Serialize};

/// 视频基本信息（从视频流探测得到，计算后不再变化）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoMeta {
    /// 视频帧率
    pub fps: f64,
    /// 总帧数
    pub total_frames: u64,
    /// 视频总时长（秒）= total_frames / fps
    pub duration: f64,
    /// 画面宽度（像素）
    pub width: u32,
    /// 画面高度（像素）
    pub height: u32,
}

impl VideoMeta {
    pub fn new(fps: f64, total_frames: u64, width: u32, height: u32) -> Self {
        let duration = if fps > 0.0 {
            total_frames as f64 / fps
        } else {
            0.0
        };
        Self {
            fps,
            total_frames,
            duration,
            width,
            height,
        }
    }

    /// 分辨率（宽x高）
    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// 场景复杂度分类（边缘密度的纯函数，固定三档）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityClass {
    Low,
    Medium,
    High,
}

impl ComplexityClass {
    /// 固定枚举顺序，所有分类统计都按此顺序零初始化
    pub const ALL: [ComplexityClass; 3] = [
        ComplexityClass::Low,
        ComplexityClass::Medium,
        ComplexityClass::High,
    ];

    /// 由边缘密度分类，阈值固定为 0.05 / 0.10
    pub fn from_edge_density(edge_density: f64) -> Self {
        if edge_density > 0.10 {
            ComplexityClass::High
        } else if edge_density > 0.05 {
            ComplexityClass::Medium
        } else {
            ComplexityClass::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComplexityClass::Low => "low",
            ComplexityClass::Medium => "medium",
            ComplexityClass::High => "high",
        }
    }
}

/// 单个采样帧的分析记录
///
/// 由指标提取器创建，创建后唯一允许的修改是附加对齐的转写文本。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameSample {
    /// 采样编号（从 0 开始，严格递增；被跳过的样本留下空洞）
    pub index: usize,
    /// 时间戳（秒）= 源帧序号 / fps
    pub timestamp: f64,
    /// 分辨率（宽x高）
    pub resolution: String,
    /// 平均亮度（灰度均值，0-255）
    pub brightness: f64,
    /// 对比度（灰度标准差）
    pub contrast: f64,
    /// 主色调（RGB 各通道均值）
    pub dominant_color: [f64; 3],
    /// 边缘密度（边缘像素占比，0-1）
    pub edge_density: f64,
    /// 场景复杂度
    pub complexity: ComplexityClass,
    /// 视觉描述（由亮度/对比度/边缘密度分档拼接）
    pub description: String,
    /// 帧图片文件名（位于 frames/ 目录下）
    pub frame_file: String,
    /// 对齐的转写文本（该时刻的语音内容，可能没有）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spoken_text: Option<String>,
}

/// 单个转写片段（核心只读，不创建也不修改）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// 片段开始时间（秒）
    pub start: f64,
    /// 片段结束时间（秒），start <= end
    pub end: f64,
    /// 该时间段的语音文本
    pub text: String,
}

/// 完整转写结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    /// 完整文本
    pub text: String,
    /// 按时间排序的片段列表
    pub segments: Vec<TranscriptSegment>,
}

/// 贯穿流水线的单一产物：视频信息 + 有序采样序列 + 可选转写
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    /// 视频信息
    pub meta: VideoMeta,
    /// 采样帧记录（插入顺序 = 时间戳升序）
    pub samples: Vec<FrameSample>,
    /// 转写结果（不可用时为 None）
    pub transcript: Option<Transcript>,
}

/// 某一复杂度档位的统计
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplexityBucket {
    /// 复杂度档位
    pub class: ComplexityClass,
    /// 该档位的样本数
    pub count: usize,
    /// 占比（0-100）
    pub percentage: f64,
}

/// 全序列汇总统计（采样完成后一次性计算，不做增量更新）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateStats {
    /// 平均亮度（无样本时为 None）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_brightness: Option<f64>,
    /// 平均对比度（无样本时为 None）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_contrast: Option<f64>,
    /// 平均边缘密度（无样本时为 None）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_edge_density: Option<f64>,
    /// 复杂度分布（固定三档，按 Low/Medium/High 顺序）
    pub distribution: Vec<ComplexityBucket>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complexity_thresholds() {
        // 阶梯函数，断点在 0.05 和 0.10
        assert_eq!(ComplexityClass::from_edge_density(0.0), ComplexityClass::Low);
        assert_eq!(ComplexityClass::from_edge_density(0.05), ComplexityClass::Low);
        assert_eq!(
            ComplexityClass::from_edge_density(0.051),
            ComplexityClass::Medium
        );
        assert_eq!(
            ComplexityClass::from_edge_density(0.10),
            ComplexityClass::Medium
        );
        assert_eq!(
            ComplexityClass::from_edge_density(0.101),
            ComplexityClass::High
        );
        assert_eq!(ComplexityClass::from_edge_density(1.0), ComplexityClass::High);
    }

    #[test]
    fn test_complexity_monotonic() {
        fn rank(c: ComplexityClass) -> u8 {
            match c {
                ComplexityClass::Low => 0,
                ComplexityClass::Medium => 1,
                ComplexityClass::High => 2,
            }
        }

        // 随边缘密度单调不减
        let densities = [0.0, 0.03, 0.05, 0.07, 0.10, 0.12, 0.5];
        let mut last = ComplexityClass::Low;
        for d in densities {
            let c = ComplexityClass::from_edge_density(d);
            assert!(rank(c) >= rank(last), "edge_density={} 处分类回退", d);
            last = c;
        }
    }

    #[test]
    fn test_video_meta_duration() {
        let meta = VideoMeta::new(30.0, 300, 640, 360);
        assert!((meta.duration - 10.0).abs() < 1e-9);
        assert_eq!(meta.resolution(), "640x360");
    }
}
