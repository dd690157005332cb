use crate::error::AnalyzeResult;
use crate::metadata::{AggregateStats, AnalysisResult, Transcript, VideoMeta};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;

/// 报告中的固定产物文件名
pub const REPORT_FILE: &str = "video_analysis_report.md";
pub const SNAPSHOT_FILE: &str = "analysis_data.json";

/// 结构化数据快照：镜像 AnalysisResult + 汇总统计，图片只引用路径不内嵌
#[derive(Serialize)]
struct AnalysisSnapshot<'a> {
    /// 视频来源（URL 或本地路径）
    video_source: &'a str,
    /// 视频信息
    video: &'a VideoMeta,
    /// 采样帧数量
    frame_count: usize,
    /// 采样帧记录（图片以 frames/ 下的路径引用）
    frames: &'a [crate::metadata::FrameSample],
    /// 汇总统计
    aggregate: &'a AggregateStats,
    /// 是否有转写文本
    has_transcript: bool,
    /// 完整转写（仅在配置要求内嵌时出现）
    #[serde(skip_serializing_if = "Option::is_none")]
    transcript: Option<&'a Transcript>,
}

/// 报告渲染器：把分析结果组装成 Markdown 文档和 JSON 快照
///
/// 对所有输入都是全函数：空采样序列、缺失转写都产出良构文档，
/// 同样的输入渲染两次字节相同（内容里没有时钟和随机性）。
pub struct ReportRenderer {
    /// 快照中内嵌完整转写（false 时只写入布尔标志）
    embed_transcript: bool,
}

impl ReportRenderer {
    pub fn new(embed_transcript: bool) -> Self {
        Self { embed_transcript }
    }

    /// 渲染 Markdown 报告
    pub fn render_markdown(
        &self,
        video_source: &str,
        result: &AnalysisResult,
        stats: &AggregateStats,
    ) -> String {
        let mut md = String::new();

        let _ = writeln!(md, "# 📹 Video Analysis Report");
        let _ = writeln!(md);
        let _ = writeln!(md, "---");
        let _ = writeln!(md);

        // 视频信息
        let _ = writeln!(md, "## 📊 General Video Information");
        let _ = writeln!(md);
        let _ = writeln!(md, "- **Source**: `{}`", video_source);
        let _ = writeln!(md, "- **Total Duration**: {}", format_clock(result.meta.duration));
        let _ = writeln!(md, "- **Resolution**: {}", result.meta.resolution());
        let _ = writeln!(md, "- **FPS**: {:.2}", result.meta.fps);
        let _ = writeln!(md, "- **Total Frames**: {}", result.meta.total_frames);
        let _ = writeln!(md, "- **Analyzed Frames**: {}", result.samples.len());
        let _ = writeln!(md);

        // 转写部分：没有转写时显式标注，而不是静默省略
        let _ = writeln!(md, "## 🎤 Full Audio Transcription");
        let _ = writeln!(md);
        match &result.transcript {
            Some(transcript) => {
                let _ = writeln!(md, "### Complete Text:");
                let _ = writeln!(md);
                let _ = writeln!(md, "```");
                let _ = writeln!(md, "{}", transcript.text.trim());
                let _ = writeln!(md, "```");
                let _ = writeln!(md);
                let _ = writeln!(md, "### Time-Segmented Transcription:");
                let _ = writeln!(md);
                for segment in &transcript.segments {
                    let _ = writeln!(
                        md,
                        "**[{} - {}]**",
                        format_clock(segment.start),
                        format_clock(segment.end)
                    );
                    let _ = writeln!(md, "> {}", segment.text.trim());
                    let _ = writeln!(md);
                }
            }
            None => {
                let _ = writeln!(
                    md,
                    "⚠️ **Transcript unavailable** — the video was analyzed without spoken-word alignment."
                );
                let _ = writeln!(md);
            }
        }

        // 逐帧分析
        let _ = writeln!(md, "## 🎬 Frame-by-Frame Analysis");
        let _ = writeln!(md);
        if result.samples.is_empty() {
            let _ = writeln!(md, "⚠️ **No frames could be analyzed.**");
            let _ = writeln!(md);
        }
        for sample in &result.samples {
            let clock = format_clock(sample.timestamp);
            let _ = writeln!(md, "### ⏱️ Second {:.2} ({})", sample.timestamp, clock);
            let _ = writeln!(md);
            let _ = writeln!(
                md,
                "![Frame {} at {}](frames/{})",
                sample.index, clock, sample.frame_file
            );
            let _ = writeln!(md);
            let _ = writeln!(md, "**Visual Description**: {}", sample.description);
            let _ = writeln!(md);
            let _ = writeln!(md, "<details>");
            let _ = writeln!(md, "<summary><strong>Technical Details</strong></summary>");
            let _ = writeln!(md);
            let _ = writeln!(md, "- **Resolution**: {}", sample.resolution);
            let _ = writeln!(md, "- **Brightness**: {:.2}/255", sample.brightness);
            let _ = writeln!(md, "- **Contrast**: {:.2}", sample.contrast);
            let _ = writeln!(md, "- **Scene Complexity**: {}", sample.complexity.as_str());
            let _ = writeln!(md, "- **Edge Density**: {:.4}", sample.edge_density);
            let _ = writeln!(
                md,
                "- **Average Color (RGB)**: [{:.1}, {:.1}, {:.1}]",
                sample.dominant_color[0], sample.dominant_color[1], sample.dominant_color[2]
            );
            let _ = writeln!(md);
            let _ = writeln!(md, "</details>");
            let _ = writeln!(md);
            if let Some(text) = &sample.spoken_text {
                let _ = writeln!(md, "**Spoken Text at This Moment:**");
                let _ = writeln!(md);
                let _ = writeln!(md, "> 🗣️ {}", text);
                let _ = writeln!(md);
            }
            let _ = writeln!(md, "---");
            let _ = writeln!(md);
        }

        // 统计部分
        let _ = writeln!(md, "## 📈 Statistics & Analysis");
        let _ = writeln!(md);
        let _ = writeln!(md, "### General Statistics");
        let _ = writeln!(md);
        match (stats.mean_brightness, stats.mean_contrast, stats.mean_edge_density) {
            (Some(brightness), Some(contrast), Some(edge_density)) => {
                let _ = writeln!(md, "- **Average Brightness**: {:.2}/255", brightness);
                let _ = writeln!(md, "- **Average Contrast**: {:.2}", contrast);
                let _ = writeln!(md, "- **Average Edge Density**: {:.4}", edge_density);
            }
            _ => {
                let _ = writeln!(md, "No samples were analyzed; statistics are unavailable.");
            }
        }
        let _ = writeln!(md);

        let _ = writeln!(md, "### Scene Complexity Distribution");
        let _ = writeln!(md);
        let _ = writeln!(md, "| Complexity | Frames | Share | |");
        let _ = writeln!(md, "|------------|--------|-------|---|");
        for bucket in &stats.distribution {
            // 条形长度与占比成比例：每 2 个百分点一个字符
            let bar = "█".repeat((bucket.percentage / 2.0) as usize);
            let _ = writeln!(
                md,
                "| {} | {} | {:.1}% | {} |",
                bucket.class.as_str(),
                bucket.count,
                bucket.percentage,
                bar
            );
        }
        let _ = writeln!(md);

        let _ = writeln!(md, "---");
        let _ = writeln!(md);
        let _ = writeln!(md, "*Report automatically generated by video-analyze*");

        md
    }

    /// 渲染 JSON 快照
    pub fn render_snapshot(
        &self,
        video_source: &str,
        result: &AnalysisResult,
        stats: &AggregateStats,
    ) -> AnalyzeResult<String> {
        let snapshot = AnalysisSnapshot {
            video_source,
            video: &result.meta,
            frame_count: result.samples.len(),
            frames: &result.samples,
            aggregate: stats,
            has_transcript: result.transcript.is_some(),
            transcript: if self.embed_transcript {
                result.transcript.as_ref()
            } else {
                None
            },
        };
        serde_json::to_string_pretty(&snapshot)
            .map_err(|e| crate::error::AnalyzeError::Computation(format!("序列化快照失败: {}", e)))
    }

    /// 渲染并写出两个产物文件，返回 (报告路径, 快照路径)
    ///
    /// 写入失败对该产物致命，已写出的文件不回滚。
    pub fn write_outputs(
        &self,
        output_dir: &Path,
        video_source: &str,
        result: &AnalysisResult,
        stats: &AggregateStats,
    ) -> AnalyzeResult<(PathBuf, PathBuf)> {
        let report_path = output_dir.join(REPORT_FILE);
        let snapshot_path = output_dir.join(SNAPSHOT_FILE);

        std::fs::write(&report_path, self.render_markdown(video_source, result, stats))?;
        info!("📄 [报告] 已写出 Markdown 报告: {}", report_path.display());

        std::fs::write(&snapshot_path, self.render_snapshot(video_source, result, stats)?)?;
        info!("📊 [报告] 已写出数据快照: {}", snapshot_path.display());

        Ok((report_path, snapshot_path))
    }
}

/// 时间戳格式化为 时:分:秒（与报告各处一致，内容与墙钟无关）
fn format_clock(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}
