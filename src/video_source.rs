use crate::error::{AnalyzeError, AnalyzeResult};
use crate::metadata::VideoMeta;
use ffmpeg_next as ffmpeg;
use image::DynamicImage;
use std::path::Path;
use tracing::warn;

/// 帧源契约：顺序解码、保序输出，耗尽时返回 None
///
/// 采样器只依赖这个 trait，测试时可以用合成帧源替代真实视频。
pub trait FrameSource {
    /// 视频基本信息（fps、总帧数、分辨率）
    fn meta(&self) -> &VideoMeta;

    /// 解出下一帧，流结束返回 Ok(None)
    fn next_frame(&mut self) -> AnalyzeResult<Option<DynamicImage>>;
}

/// 基于 FFmpeg 的视频帧源，顺序解码整个视频流
pub struct VideoSource {
    ictx: ffmpeg::format::context::Input,
    decoder: ffmpeg::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    stream_index: usize,
    meta: VideoMeta,
    eof_sent: bool,
}

impl VideoSource {
    /// 打开视频文件并探测基本信息
    ///
    /// 打不开文件或没有视频流属于获取失败（致命）。
    pub fn open(input_path: impl AsRef<Path>) -> AnalyzeResult<Self> {
        let input_path = input_path.as_ref();

        ffmpeg::init()
            .map_err(|e| AnalyzeError::Acquisition(format!("初始化 FFmpeg 失败: {}", e)))?;

        // 设置 FFmpeg 日志级别为 ERROR，抑制警告和信息消息
        unsafe {
            ffmpeg::sys::av_log_set_level(ffmpeg::sys::AV_LOG_ERROR as i32);
        }

        let ictx = ffmpeg::format::input(&input_path).map_err(|e| {
            AnalyzeError::Acquisition(format!("无法打开视频文件 {}: {}", input_path.display(), e))
        })?;

        let stream = ictx
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| {
                AnalyzeError::Acquisition(format!("未找到视频流: {}", input_path.display()))
            })?;
        let stream_index = stream.index();

        let rate = stream.avg_frame_rate();
        let fps = if rate.denominator() > 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            30.0 // 默认值
        };

        // 总帧数：优先用流自带的帧数，未知时按时长估算
        let total_frames = if stream.frames() > 0 {
            stream.frames() as u64
        } else {
            let duration = ictx.duration() as f64 / ffmpeg::ffi::AV_TIME_BASE as f64;
            (duration.max(0.0) * fps).round() as u64
        };

        let decoder_context =
            ffmpeg::codec::context::Context::from_parameters(stream.parameters())
                .map_err(|e| AnalyzeError::Acquisition(format!("无法创建解码器上下文: {}", e)))?;
        let decoder = decoder_context
            .decoder()
            .video()
            .map_err(|e| AnalyzeError::Acquisition(format!("无法创建视频解码器: {}", e)))?;

        // 统一转换到 RGB24，后续指标计算都基于这个格式
        let scaler = ffmpeg::software::scaling::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::format::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::Flags::BILINEAR,
        )
        .map_err(|e| AnalyzeError::Acquisition(format!("无法创建缩放器: {}", e)))?;

        let meta = VideoMeta::new(fps, total_frames, decoder.width(), decoder.height());

        Ok(Self {
            ictx,
            decoder,
            scaler,
            stream_index,
            meta,
            eof_sent: false,
        })
    }

    /// 将解码帧转换为 RGB 图像（按行拷贝，跳过 stride 填充字节）
    fn to_image(&mut self, frame: &ffmpeg::frame::Video) -> AnalyzeResult<DynamicImage> {
        let mut rgb = ffmpeg::frame::Video::empty();
        self.scaler
            .run(frame, &mut rgb)
            .map_err(|e| AnalyzeError::Computation(format!("帧格式转换失败: {}", e)))?;

        let width = rgb.width();
        let height = rgb.height();
        let stride = rgb.stride(0);
        let data = rgb.data(0);

        let row_bytes = width as usize * 3;
        let mut buf = Vec::with_capacity(row_bytes * height as usize);
        for y in 0..height as usize {
            let offset = y * stride;
            if offset + row_bytes > data.len() {
                return Err(AnalyzeError::Computation("帧缓冲区数据不完整".to_string()));
            }
            buf.extend_from_slice(&data[offset..offset + row_bytes]);
        }

        let img = image::RgbImage::from_raw(width, height, buf)
            .ok_or_else(|| AnalyzeError::Computation("帧缓冲区尺寸不匹配".to_string()))?;
        Ok(DynamicImage::ImageRgb8(img))
    }
}

impl FrameSource for VideoSource {
    fn meta(&self) -> &VideoMeta {
        &self.meta
    }

    fn next_frame(&mut self) -> AnalyzeResult<Option<DynamicImage>> {
        let mut decoded = ffmpeg::frame::Video::empty();
        loop {
            // 先尝试从解码器取已缓冲的帧
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                match self.to_image(&decoded) {
                    Ok(img) => return Ok(Some(img)),
                    Err(e) => {
                        // 单帧转换失败不终止解码，继续取下一帧
                        warn!("⚠️  [帧源] 跳过无法转换的帧: {}", e);
                        continue;
                    }
                }
            }

            if self.eof_sent {
                return Ok(None);
            }

            // 读取下一个数据包送入解码器
            match self.ictx.packets().next() {
                Some((stream, packet)) => {
                    if stream.index() != self.stream_index {
                        continue;
                    }
                    if let Err(e) = self.decoder.send_packet(&packet) {
                        // 坏包跳过，不影响后续帧
                        warn!("⚠️  [帧源] 跳过无法解码的数据包: {}", e);
                    }
                }
                None => {
                    // 数据包读完，冲刷解码器缓冲
                    let _ = self.decoder.send_eof();
                    self.eof_sent = true;
                }
            }
        }
    }
}
