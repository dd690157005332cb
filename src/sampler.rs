use crate::error::{AnalyzeError, AnalyzeResult};
use crate::video_source::FrameSource;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 一个被选中的采样帧：原始图像 + 时间信息 + 已落盘的图片文件名
#[derive(Debug)]
pub struct SampledFrame {
    /// 采样编号（从 0 开始）
    pub index: usize,
    /// 源帧序号
    pub source_index: u64,
    /// 时间戳（秒）= source_index / fps
    pub timestamp: f64,
    /// 帧图片文件名（相对 frames/ 目录）
    pub frame_file: String,
    /// 原始帧图像
    pub image: DynamicImage,
}

/// 帧采样器：按固定时间间隔从帧源中选出确定性子序列
pub struct FrameSampler {
    /// 采样间隔（秒），必须大于 0
    interval: f64,
}

impl FrameSampler {
    pub fn new(interval: f64) -> Self {
        Self { interval }
    }

    /// 采样步长：floor(fps * interval)，间隔短于一帧时退化为逐帧采样
    pub fn step(fps: f64, interval: f64) -> u64 {
        let step = (fps * interval).floor() as u64;
        step.max(1)
    }

    /// 顺序消费帧源，选出源帧序号满足 k mod step == 0 的帧
    ///
    /// 副作用：每个选中的帧以确定性文件名落盘到 frames_dir，
    /// 供报告外链引用。帧源一帧都解不出来时返回获取失败（致命）。
    pub fn sample<S: FrameSource + ?Sized>(
        &self,
        source: &mut S,
        frames_dir: &Path,
    ) -> AnalyzeResult<Vec<SampledFrame>> {
        let fps = source.meta().fps;
        let step = Self::step(fps, self.interval);
        debug!(
            "📊 [采样] fps={:.2}, interval={:.2}s, step={} 帧",
            fps, self.interval, step
        );

        std::fs::create_dir_all(frames_dir)?;

        let mut sampled = Vec::new();
        let mut source_index: u64 = 0;

        while let Some(image) = source.next_frame()? {
            if source_index % step == 0 {
                let sample_index = sampled.len();
                let timestamp = source_index as f64 / fps;

                // 文件名编码采样编号和时间戳（保留两位小数）
                let frame_file = format!("{:04}_{:.2}s.jpg", sample_index, timestamp);
                let frame_path: PathBuf = frames_dir.join(&frame_file);
                image.save(&frame_path)?;

                sampled.push(SampledFrame {
                    index: sample_index,
                    source_index,
                    timestamp,
                    frame_file,
                    image,
                });

                if sampled.len() % 10 == 0 {
                    info!("📸 [采样] 已采样 {} 帧...", sampled.len());
                }
            }
            source_index += 1;
        }

        if source_index == 0 {
            return Err(AnalyzeError::Acquisition(
                "视频未解出任何帧".to_string(),
            ));
        }

        info!(
            "✅ [采样] 采样完成: 共读取 {} 帧，选出 {} 帧",
            source_index,
            sampled.len()
        );
        Ok(sampled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::VideoMeta;
    use image::{DynamicImage, ImageBuffer};

    /// 合成帧源：产出指定数量的纯色帧
    struct SyntheticSource {
        meta: VideoMeta,
        remaining: u64,
    }

    impl SyntheticSource {
        fn new(fps: f64, total_frames: u64) -> Self {
            Self {
                meta: VideoMeta::new(fps, total_frames, 8, 8),
                remaining: total_frames,
            }
        }
    }

    impl FrameSource for SyntheticSource {
        fn meta(&self) -> &VideoMeta {
            &self.meta
        }

        fn next_frame(&mut self) -> AnalyzeResult<Option<DynamicImage>> {
            if self.remaining == 0 {
                return Ok(None);
            }
            self.remaining -= 1;
            Ok(Some(DynamicImage::ImageRgb8(ImageBuffer::from_fn(
                8,
                8,
                |_, _| image::Rgb([128u8, 128, 128]),
            ))))
        }
    }

    fn temp_frames_dir(tag: &str) -> PathBuf {
        std::env::temp_dir()
            .join("video-analyze-tests")
            .join(format!("{}-{}", tag, uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_one_second_interval() {
        // fps=30, 300 帧, 间隔 1.0s -> 10 个样本，时间戳 0.00..9.00
        let dir = temp_frames_dir("one-second");
        let mut source = SyntheticSource::new(30.0, 300);
        let sampler = FrameSampler::new(1.0);
        let samples = sampler.sample(&mut source, &dir).unwrap();

        assert_eq!(samples.len(), 10);
        for (i, sample) in samples.iter().enumerate() {
            assert_eq!(sample.index, i);
            assert_eq!(sample.source_index, i as u64 * 30);
            assert!((sample.timestamp - i as f64).abs() < 1e-9);
        }
        assert_eq!(samples[0].frame_file, "0000_0.00s.jpg");
        assert_eq!(samples[9].frame_file, "0009_9.00s.jpg");
        // 图片文件已落盘
        assert!(dir.join("0000_0.00s.jpg").exists());
        assert!(dir.join("0009_9.00s.jpg").exists());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_sampled_count_matches_ceil() {
        // 采样数 = ceil(N / step)
        let cases = [(30.0, 300u64, 1.0), (30.0, 301, 1.0), (25.0, 100, 0.5), (24.0, 7, 2.0)];
        for (fps, total, interval) in cases {
            let dir = temp_frames_dir("count");
            let mut source = SyntheticSource::new(fps, total);
            let samples = FrameSampler::new(interval).sample(&mut source, &dir).unwrap();
            let step = FrameSampler::step(fps, interval);
            let expected = (total + step - 1) / step;
            assert_eq!(
                samples.len() as u64,
                expected,
                "fps={} total={} interval={}",
                fps,
                total,
                interval
            );
            std::fs::remove_dir_all(&dir).ok();
        }
    }

    #[test]
    fn test_degenerate_interval_selects_every_frame() {
        // 间隔短于一帧时 floor(fps*I)==0，退化为逐帧采样
        assert_eq!(FrameSampler::step(10.0, 0.05), 1);

        let dir = temp_frames_dir("degenerate");
        let mut source = SyntheticSource::new(10.0, 5);
        let samples = FrameSampler::new(0.05).sample(&mut source, &dir).unwrap();
        assert_eq!(samples.len(), 5);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_empty_source_is_acquisition_error() {
        let dir = temp_frames_dir("empty");
        let mut source = SyntheticSource::new(30.0, 0);
        let err = FrameSampler::new(1.0).sample(&mut source, &dir).unwrap_err();
        assert!(matches!(err, AnalyzeError::Acquisition(_)));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_timestamps_strictly_increasing() {
        let dir = temp_frames_dir("increasing");
        let mut source = SyntheticSource::new(29.97, 120);
        let samples = FrameSampler::new(1.0).sample(&mut source, &dir).unwrap();
        for pair in samples.windows(2) {
            assert!(pair[0].timestamp < pair[1].timestamp);
        }
        std::fs::remove_dir_all(&dir).ok();
    }
}
