use crate::error::{AnalyzeError, AnalyzeResult};
use std::path::Path;
use tracing::info;

/// 音频提取器：调用外部 ffmpeg 把视频中的音轨抽成 WAV
///
/// 输出 16kHz 单声道 PCM，是语音转写模型期望的输入格式。
/// 提取失败不致命：流水线继续，报告中标注转写缺失。
pub struct AudioExtractor {
    input_path: String,
}

impl AudioExtractor {
    pub fn new(input_path: impl AsRef<Path>) -> Self {
        Self {
            input_path: input_path.as_ref().to_string_lossy().to_string(),
        }
    }

    /// 提取音频到 WAV 文件
    pub fn extract_to_file(&self, output_path: impl AsRef<Path>) -> AnalyzeResult<()> {
        use std::process::Command;

        let output_path_str = output_path.as_ref().to_string_lossy().to_string();

        // 使用 -loglevel error 抑制警告和信息消息
        let status = Command::new("ffmpeg")
            .arg("-loglevel")
            .arg("error")
            .arg("-i")
            .arg(&self.input_path)
            .arg("-vn") // 不包含视频
            .arg("-acodec")
            .arg("pcm_s16le")
            .arg("-ar")
            .arg("16000")
            .arg("-ac")
            .arg("1")
            .arg("-y") // 覆盖输出文件
            .arg(&output_path_str)
            .status()
            .map_err(|e| AnalyzeError::Extraction(format!("执行 ffmpeg 命令失败: {}", e)))?;

        if !status.success() {
            return Err(AnalyzeError::Extraction(format!(
                "音频提取失败（ffmpeg 退出码: {:?}）",
                status.code()
            )));
        }

        info!("🎵 [音频] 已提取音频: {}", output_path_str);
        Ok(())
    }
}
