use crate::aggregate::Aggregator;
use crate::audio_extractor::AudioExtractor;
use crate::error::AnalyzeResult;
use crate::metadata::{AggregateStats, AnalysisResult, Transcript};
use crate::metrics::MetricExtractor;
use crate::report::ReportRenderer;
use crate::sampler::FrameSampler;
use crate::transcriber::TranscriptProvider;
use crate::video_source::{FrameSource, VideoSource};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, warn};

/// 视频分析配置
#[derive(Debug, Clone)]
pub struct AnalyzeConfig {
    /// 帧采样间隔（秒），必须大于 0
    pub interval: f64,
    /// 快照中内嵌完整转写（false 时只写布尔标志）
    pub embed_transcript: bool,
    /// Webhook URL（分析完成后回调）
    pub webhook_url: Option<String>,
}

impl AnalyzeConfig {
    /// 从环境变量和配置文件加载配置
    pub fn from_env_and_file(config_file: Option<&Path>) -> anyhow::Result<Self> {
        use crate::config::ConfigLoader;
        ConfigLoader::load_config(config_file, None, None, None)
    }
}

impl Default for AnalyzeConfig {
    fn default() -> Self {
        Self {
            interval: 1.0,
            embed_transcript: false,
            webhook_url: None,
        }
    }
}

/// 分析结果产物
#[derive(Debug, Clone)]
pub struct AnalyzeOutput {
    /// 输出目录
    pub output_dir: PathBuf,
    /// Markdown 报告路径
    pub report_file: PathBuf,
    /// JSON 快照路径
    pub snapshot_file: PathBuf,
    /// 成功分析的采样帧数
    pub sample_count: usize,
    /// 是否拿到了转写
    pub has_transcript: bool,
}

/// 分析视频文件：采样 → 指标 → 对齐 → 聚合 → 渲染
///
/// 各阶段严格顺序执行，聚合与渲染在采样全部完成后才开始。
/// 转写器是调用方传入的显式依赖，核心不持有共享可变状态。
pub async fn analyze_video(
    input_video_path: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    config: AnalyzeConfig,
    transcriber: Option<&dyn TranscriptProvider>,
) -> AnalyzeResult<AnalyzeOutput> {
    let input_video_path = input_video_path.as_ref();
    let output_dir = output_dir.as_ref();
    let video_source_name = input_video_path.to_string_lossy().to_string();

    let total_start = Instant::now();
    info!("🎬 [分析] 开始分析视频: {}", input_video_path.display());
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    std::fs::create_dir_all(output_dir)?;

    // 1. 打开视频源并探测信息
    let (meta, sampled, frames_dir, sample_elapsed) = {
        let open_start = Instant::now();
        let mut source = VideoSource::open(input_video_path).map_err(|e| {
            error!("❌ [分析] 打开视频源失败: {}", e);
            e
        })?;
        let meta = source.meta().clone();
        info!(
            "✅ [分析] 视频源已打开，耗时: {:.2}秒",
            open_start.elapsed().as_secs_f64()
        );
        info!("  • 分辨率: {}", meta.resolution());
        info!("  • 帧率: {:.2} fps", meta.fps);
        info!("  • 总帧数: {} 帧，时长 {:.2} 秒", meta.total_frames, meta.duration);

        // 2. 按间隔采样并落盘帧图片
        let sample_start = Instant::now();
        info!("⏳ [分析] 正在采样视频帧（间隔: {:.2} 秒）...", config.interval);
        let frames_dir = output_dir.join("frames");
        let sampler = FrameSampler::new(config.interval);
        let sampled = sampler.sample(&mut source, &frames_dir).map_err(|e| {
            error!("❌ [分析] 帧采样失败: {}", e);
            e
        })?;
        drop(source);
        (meta, sampled, frames_dir, sample_start.elapsed())
    };
    info!(
        "✅ [分析] 帧采样完成，耗时: {:.2}秒，共 {} 帧",
        sample_elapsed.as_secs_f64(),
        sampled.len()
    );

    // 3. 并行计算逐帧指标（坏帧跳过，不中止）
    let metrics_start = Instant::now();
    info!("⏳ [分析] 正在计算帧指标...");
    let extractor = MetricExtractor::new();
    let mut samples = extractor.extract_all(&sampled);
    let skipped = sampled.len() - samples.len();
    if skipped > 0 {
        warn!("⚠️  [分析] {} 个样本因指标计算失败被跳过", skipped);
    }
    info!(
        "✅ [分析] 指标计算完成，耗时: {:.2}秒，有效样本 {} 个",
        metrics_start.elapsed().as_secs_f64(),
        samples.len()
    );

    // 4. 转写并对齐（不可用时降级，报告中显式标注）
    let transcript = obtain_transcript(input_video_path, output_dir, transcriber);
    if let Some(transcript) = &transcript {
        crate::transcript::attach_spoken_text(&mut samples, transcript);
    }

    // 5. 汇总统计（采样全部完成后一次性计算）
    let stats = Aggregator::aggregate(&samples);

    // 6. 渲染报告和快照
    let render_start = Instant::now();
    let result = AnalysisResult {
        meta,
        samples,
        transcript,
    };
    let renderer = ReportRenderer::new(config.embed_transcript);
    let (report_file, snapshot_file) =
        renderer.write_outputs(output_dir, &video_source_name, &result, &stats)?;
    info!(
        "✅ [分析] 报告渲染完成，耗时: {:.2}秒",
        render_start.elapsed().as_secs_f64()
    );

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!(
        "🎉 [分析] 分析完成！总耗时: {:.2}秒",
        total_start.elapsed().as_secs_f64()
    );
    info!("📁 [分析] 输出目录: {}", output_dir.display());
    info!("📄 [分析] 报告: {}", report_file.display());
    info!("📊 [分析] 快照: {}", snapshot_file.display());
    info!("🖼️  [分析] 帧图片目录: {}", frames_dir.display());

    let output = AnalyzeOutput {
        output_dir: output_dir.to_path_buf(),
        report_file,
        snapshot_file,
        sample_count: result.samples.len(),
        has_transcript: result.transcript.is_some(),
    };

    // 调用 webhook 回调（如果配置了）
    if let Some(webhook_url) = &config.webhook_url {
        info!("⏳ [分析] 正在调用 Webhook 回调...");
        if let Err(e) = call_webhook(webhook_url, &video_source_name, &output, &stats).await {
            warn!("⚠️  [分析] Webhook 回调失败: {}", e);
        } else {
            info!("✅ [分析] Webhook 回调成功");
        }
    }

    Ok(output)
}

/// 提取音频并转写，任何一步失败都降级为"无转写"
fn obtain_transcript(
    input_video_path: &Path,
    output_dir: &Path,
    transcriber: Option<&dyn TranscriptProvider>,
) -> Option<Transcript> {
    let transcriber = match transcriber {
        Some(t) => t,
        None => {
            info!("ℹ️  [分析] 未配置转写器，跳过语音对齐");
            return None;
        }
    };

    let audio_start = Instant::now();
    info!("⏳ [分析] 正在提取音频...");
    let audio_path = output_dir.join("audio.wav");
    if let Err(e) = AudioExtractor::new(input_video_path).extract_to_file(&audio_path) {
        warn!("⚠️  [分析] 音频提取失败，跳过转写: {}", e);
        return None;
    }
    info!(
        "✅ [分析] 音频提取完成，耗时: {:.2}秒",
        audio_start.elapsed().as_secs_f64()
    );

    let transcribe_start = Instant::now();
    match transcriber.transcribe(&audio_path) {
        Ok(transcript) => {
            info!(
                "✅ [分析] 转写完成，耗时: {:.2}秒，共 {} 个片段",
                transcribe_start.elapsed().as_secs_f64(),
                transcript.segments.len()
            );
            Some(transcript)
        }
        Err(e) => {
            warn!("⚠️  [分析] 转写失败，报告将标注转写缺失: {}", e);
            None
        }
    }
}

/// Webhook 回调数据结构
#[derive(Debug, serde::Serialize)]
struct WebhookPayload<'a> {
    /// 处理状态
    status: &'a str,
    /// 视频来源
    video_source: &'a str,
    /// 输出目录
    output_dir: String,
    /// 采样帧数
    sample_count: usize,
    /// 是否有转写
    has_transcript: bool,
    /// 汇总统计
    aggregate: &'a AggregateStats,
    /// 回调时间戳
    timestamp: String,
}

/// 调用 webhook 回调
async fn call_webhook(
    webhook_url: &str,
    video_source: &str,
    output: &AnalyzeOutput,
    stats: &AggregateStats,
) -> anyhow::Result<()> {
    use anyhow::Context;
    use chrono::Utc;

    let payload = WebhookPayload {
        status: "success",
        video_source,
        output_dir: output.output_dir.to_string_lossy().to_string(),
        sample_count: output.sample_count,
        has_transcript: output.has_transcript,
        aggregate: stats,
        timestamp: Utc::now().to_rfc3339(),
    };

    let client = reqwest::Client::new();
    let response = client
        .post(webhook_url)
        .json(&payload)
        .timeout(std::time::Duration::from_secs(30))
        .send()
        .await
        .context("Webhook 请求失败")?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        anyhow::bail!("Webhook 返回错误状态: {} - {}", status, error_text);
    }

    Ok(())
}
