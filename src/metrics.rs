use crate::error::{AnalyzeError, AnalyzeResult};
use crate::metadata::{ComplexityClass, FrameSample};
use crate::sampler::SampledFrame;
use image::GrayImage;
use rayon::prelude::*;
use tracing::warn;

/// 梯度幅值超过该阈值的像素视为边缘像素（固定常量，不可配置）
const EDGE_MAGNITUDE_THRESHOLD: f64 = 128.0;

/// 帧指标提取器：从单帧计算亮度、对比度、主色调、边缘密度等视觉统计量
///
/// 无状态，帧与帧之间互不依赖，可以安全并行。
pub struct MetricExtractor;

impl MetricExtractor {
    pub fn new() -> Self {
        Self
    }

    /// 对全部采样帧并行计算指标
    ///
    /// 无法计算的帧（坏缓冲区）记录日志后跳过，不中止流水线；
    /// 输出顺序与输入一致（时间戳升序），满足聚合前的排序约束。
    pub fn extract_all(&self, frames: &[SampledFrame]) -> Vec<FrameSample> {
        frames
            .par_iter()
            .filter_map(|frame| match self.extract(frame) {
                Ok(sample) => Some(sample),
                Err(e) => {
                    warn!(
                        "⚠️  [指标] 跳过样本 {} (t={:.2}s): {}",
                        frame.index, frame.timestamp, e
                    );
                    None
                }
            })
            .collect()
    }

    /// 计算单帧指标，返回尚未附加转写文本的 FrameSample
    pub fn extract(&self, frame: &SampledFrame) -> AnalyzeResult<FrameSample> {
        let rgb = frame.image.to_rgb8();
        let (width, height) = (rgb.width(), rgb.height());
        if width == 0 || height == 0 {
            return Err(AnalyzeError::Computation(format!(
                "样本 {} 无法转换为灰度数据（空缓冲区）",
                frame.index
            )));
        }

        let gray = frame.image.to_luma8();

        // 亮度 = 灰度均值，对比度 = 灰度标准差
        let total_pixels = (width as u64 * height as u64) as f64;
        let sum: f64 = gray.pixels().map(|p| p[0] as f64).sum();
        let brightness = sum / total_pixels;
        let variance: f64 = gray
            .pixels()
            .map(|p| {
                let d = p[0] as f64 - brightness;
                d * d
            })
            .sum::<f64>()
            / total_pixels;
        let contrast = variance.sqrt();

        // 主色调 = RGB 各通道均值
        let mut channel_sums = [0f64; 3];
        for pixel in rgb.pixels() {
            channel_sums[0] += pixel[0] as f64;
            channel_sums[1] += pixel[1] as f64;
            channel_sums[2] += pixel[2] as f64;
        }
        let dominant_color = [
            channel_sums[0] / total_pixels,
            channel_sums[1] / total_pixels,
            channel_sums[2] / total_pixels,
        ];

        let edge_density = edge_density(&gray);
        let complexity = ComplexityClass::from_edge_density(edge_density);
        let description = describe(brightness, contrast, edge_density);

        Ok(FrameSample {
            index: frame.index,
            timestamp: frame.timestamp,
            resolution: format!("{}x{}", width, height),
            brightness,
            contrast,
            dominant_color,
            edge_density,
            complexity,
            description,
            frame_file: frame.frame_file.clone(),
            spoken_text: None,
        })
    }
}

/// 边缘密度：Sobel 梯度幅值超阈值的像素占比（0-1）
///
/// 最外圈像素不参与梯度计算，计为非边缘；分母始终是 宽x高。
fn edge_density(gray: &GrayImage) -> f64 {
    let width = gray.width();
    let height = gray.height();
    if width < 3 || height < 3 {
        return 0.0;
    }

    let sobel_x: [[i32; 3]; 3] = [[-1, 0, 1], [-2, 0, 2], [-1, 0, 1]];
    let sobel_y: [[i32; 3]; 3] = [[-1, -2, -1], [0, 0, 0], [1, 2, 1]];

    let mut edge_pixels = 0u64;
    for y in 1..(height - 1) {
        for x in 1..(width - 1) {
            let mut gx = 0i32;
            let mut gy = 0i32;
            for ky in 0..3u32 {
                for kx in 0..3u32 {
                    let pixel = gray.get_pixel(x + kx - 1, y + ky - 1)[0] as i32;
                    gx += pixel * sobel_x[ky as usize][kx as usize];
                    gy += pixel * sobel_y[ky as usize][kx as usize];
                }
            }
            let magnitude = ((gx * gx + gy * gy) as f64).sqrt();
            if magnitude > EDGE_MAGNITUDE_THRESHOLD {
                edge_pixels += 1;
            }
        }
    }

    edge_pixels as f64 / (width as u64 * height as u64) as f64
}

/// 视觉描述：三项独立判断按固定顺序用逗号拼接
///
/// 亮度必有一条描述，对比度和边缘密度只在越过边界时给出描述。
pub fn describe(brightness: f64, contrast: f64, edge_density: f64) -> String {
    let mut parts = Vec::new();

    if brightness < 50.0 {
        parts.push("dark scene");
    } else if brightness > 200.0 {
        parts.push("very bright scene");
    } else {
        parts.push("medium lighting");
    }

    if contrast < 30.0 {
        parts.push("low contrast");
    } else if contrast > 70.0 {
        parts.push("high contrast");
    }

    if edge_density > 0.10 {
        parts.push("rich detail");
    } else if edge_density < 0.05 {
        parts.push("simple scene");
    }

    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageBuffer};

    fn make_frame(index: usize, timestamp: f64, image: DynamicImage) -> SampledFrame {
        SampledFrame {
            index,
            source_index: index as u64,
            timestamp,
            frame_file: format!("{:04}_{:.2}s.jpg", index, timestamp),
            image,
        }
    }

    fn uniform_gray(size: u32, value: u8) -> DynamicImage {
        DynamicImage::ImageRgb8(ImageBuffer::from_fn(size, size, |_, _| {
            image::Rgb([value, value, value])
        }))
    }

    #[test]
    fn test_uniform_frame_metrics() {
        let extractor = MetricExtractor::new();
        let frame = make_frame(0, 0.0, uniform_gray(32, 100));
        let sample = extractor.extract(&frame).unwrap();

        assert!((sample.brightness - 100.0).abs() < 1.0);
        assert!(sample.contrast < 1.0);
        assert!(sample.edge_density < 1e-9);
        assert_eq!(sample.complexity, ComplexityClass::Low);
        assert_eq!(sample.description, "medium lighting, low contrast, simple scene");
        assert!((sample.dominant_color[0] - 100.0).abs() < 1.0);
    }

    #[test]
    fn test_stripes_are_high_complexity() {
        // 2 像素宽的竖条纹：每个内部像素左右梯度都很大
        let img = DynamicImage::ImageRgb8(ImageBuffer::from_fn(16, 16, |x, _| {
            if (x / 2) % 2 == 0 {
                image::Rgb([255u8, 255, 255])
            } else {
                image::Rgb([0u8, 0, 0])
            }
        }));
        let extractor = MetricExtractor::new();
        let sample = extractor.extract(&make_frame(0, 0.0, img)).unwrap();

        assert!(sample.edge_density > 0.10);
        assert_eq!(sample.complexity, ComplexityClass::High);
        assert!(sample.description.contains("rich detail"));
    }

    #[test]
    fn test_split_frame_has_high_contrast() {
        // 左黑右白：对比度高，边缘只集中在分界线附近
        let img = DynamicImage::ImageRgb8(ImageBuffer::from_fn(64, 64, |x, _| {
            if x < 32 {
                image::Rgb([0u8, 0, 0])
            } else {
                image::Rgb([255u8, 255, 255])
            }
        }));
        let extractor = MetricExtractor::new();
        let sample = extractor.extract(&make_frame(0, 0.0, img)).unwrap();

        assert!((sample.brightness - 127.5).abs() < 2.0);
        assert!(sample.contrast > 70.0);
        assert!(sample.description.contains("high contrast"));
        assert!(sample.edge_density < 0.05);
        assert_eq!(sample.complexity, ComplexityClass::Low);
    }

    #[test]
    fn test_describe_bright_flat_frame() {
        // 亮度 220 / 对比度 20 / 边缘密度 0.02
        assert_eq!(
            describe(220.0, 20.0, 0.02),
            "very bright scene, low contrast, simple scene"
        );
        assert_eq!(ComplexityClass::from_edge_density(0.02), ComplexityClass::Low);
    }

    #[test]
    fn test_describe_middle_bands_say_nothing() {
        // 对比度和边缘密度处在中间区间时不产生描述
        assert_eq!(describe(128.0, 50.0, 0.07), "medium lighting");
        assert_eq!(describe(30.0, 80.0, 0.2), "dark scene, high contrast, rich detail");
    }

    #[test]
    fn test_empty_frame_is_computation_error() {
        let extractor = MetricExtractor::new();
        let empty = DynamicImage::ImageRgb8(ImageBuffer::new(0, 0));
        let err = extractor.extract(&make_frame(3, 3.0, empty)).unwrap_err();
        assert!(matches!(err, AnalyzeError::Computation(_)));
    }

    #[test]
    fn test_extract_all_preserves_order_and_skips_bad_frames() {
        let extractor = MetricExtractor::new();
        let frames = vec![
            make_frame(0, 0.0, uniform_gray(16, 10)),
            make_frame(1, 1.0, DynamicImage::ImageRgb8(ImageBuffer::new(0, 0))),
            make_frame(2, 2.0, uniform_gray(16, 250)),
        ];
        let samples = extractor.extract_all(&frames);

        // 坏帧被跳过，其余保持时间戳升序，编号保留空洞
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].index, 0);
        assert_eq!(samples[1].index, 2);
        assert!(samples[0].timestamp < samples[1].timestamp);
        assert!(samples[1].description.contains("very bright scene"));
    }
}
