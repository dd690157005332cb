use crate::error::{AnalyzeError, AnalyzeResult};
use crate::metadata::{Transcript, TranscriptSegment};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// 转写提供方契约
///
/// 模型的加载和生命周期由调用方持有，流水线只在构造时接收这个
/// 依赖，核心不会惰性初始化共享状态。转写不可用是非致命结果。
pub trait TranscriptProvider: Sync {
    /// 对音频文件产出转写结果，不可用时返回 Extraction 错误
    fn transcribe(&self, audio_path: &Path) -> AnalyzeResult<Transcript>;
}

/// Whisper CLI 的 JSON 输出格式（只取需要的字段）
#[derive(Debug, Deserialize)]
struct WhisperOutput {
    text: String,
    #[serde(default)]
    segments: Vec<WhisperSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    start: f64,
    end: f64,
    text: String,
}

/// 解析 whisper 风格的转写 JSON：{text, segments: [{start, end, text}]}
pub fn parse_whisper_json(raw: &str) -> AnalyzeResult<Transcript> {
    let output: WhisperOutput = serde_json::from_str(raw)
        .map_err(|e| AnalyzeError::Extraction(format!("解析转写 JSON 失败: {}", e)))?;

    Ok(Transcript {
        text: output.text,
        segments: output
            .segments
            .into_iter()
            .map(|s| TranscriptSegment {
                start: s.start,
                end: s.end,
                text: s.text,
            })
            .collect(),
    })
}

/// 调用外部 whisper 命令行做语音转写
pub struct WhisperCommandTranscriber {
    /// 模型名（base 兼顾速度和质量）
    model: String,
    /// 语言代码（None 时让模型自动检测）
    language: Option<String>,
}

impl WhisperCommandTranscriber {
    pub fn new(model: impl Into<String>, language: Option<String>) -> Self {
        Self {
            model: model.into(),
            language,
        }
    }
}

impl Default for WhisperCommandTranscriber {
    fn default() -> Self {
        Self::new("base", None)
    }
}

impl TranscriptProvider for WhisperCommandTranscriber {
    fn transcribe(&self, audio_path: &Path) -> AnalyzeResult<Transcript> {
        use std::process::Command;

        let output_dir = audio_path
            .parent()
            .ok_or_else(|| AnalyzeError::Extraction("音频路径没有父目录".to_string()))?;

        info!("🎤 [转写] 正在调用 whisper（模型: {}）...", self.model);

        let mut cmd = Command::new("whisper");
        cmd.arg(audio_path)
            .arg("--model")
            .arg(&self.model)
            .arg("--output_format")
            .arg("json")
            .arg("--output_dir")
            .arg(output_dir);
        if let Some(language) = &self.language {
            cmd.arg("--language").arg(language);
        }

        let status = cmd
            .status()
            .map_err(|e| AnalyzeError::Extraction(format!("执行 whisper 命令失败: {}", e)))?;
        if !status.success() {
            return Err(AnalyzeError::Extraction(format!(
                "whisper 转写失败（退出码: {:?}）",
                status.code()
            )));
        }

        // whisper 在输出目录写出 <音频文件名>.json
        let json_path = output_dir.join(
            audio_path
                .with_extension("json")
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_default(),
        );
        let raw = std::fs::read_to_string(&json_path).map_err(|e| {
            AnalyzeError::Extraction(format!("读取转写输出 {} 失败: {}", json_path.display(), e))
        })?;

        let transcript = parse_whisper_json(&raw)?;
        info!("✅ [转写] 转写完成，共 {} 个片段", transcript.segments.len());
        Ok(transcript)
    }
}

/// 直接加载预先算好的转写 JSON 文件（whisper 格式）
pub struct JsonTranscriptFile {
    path: PathBuf,
}

impl JsonTranscriptFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TranscriptProvider for JsonTranscriptFile {
    fn transcribe(&self, _audio_path: &Path) -> AnalyzeResult<Transcript> {
        let raw = std::fs::read_to_string(&self.path).map_err(|e| {
            AnalyzeError::Extraction(format!("读取转写文件 {} 失败: {}", self.path.display(), e))
        })?;
        parse_whisper_json(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_JSON: &str = r#"{
        "text": " hello world, this is a test.",
        "language": "en",
        "segments": [
            {"id": 0, "start": 0.0, "end": 2.5, "text": " hello world,"},
            {"id": 1, "start": 2.5, "end": 4.0, "text": " this is a test."}
        ]
    }"#;

    #[test]
    fn test_parse_whisper_json() {
        let transcript = parse_whisper_json(SAMPLE_JSON).unwrap();
        assert_eq!(transcript.segments.len(), 2);
        assert_eq!(transcript.segments[0].text.trim(), "hello world,");
        assert!((transcript.segments[1].start - 2.5).abs() < 1e-9);
        assert!(transcript.text.contains("hello world"));
    }

    #[test]
    fn test_parse_without_segments() {
        let transcript = parse_whisper_json(r#"{"text": "silent"}"#).unwrap();
        assert!(transcript.segments.is_empty());
    }

    #[test]
    fn test_parse_invalid_json_is_extraction_error() {
        let err = parse_whisper_json("not json").unwrap_err();
        assert!(matches!(err, AnalyzeError::Extraction(_)));
    }

    #[test]
    fn test_json_transcript_file_provider() {
        let dir = std::env::temp_dir().join("video-analyze-tests");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("transcript-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, SAMPLE_JSON).unwrap();

        let provider = JsonTranscriptFile::new(&path);
        let transcript = provider.transcribe(Path::new("unused.wav")).unwrap();
        assert_eq!(transcript.segments.len(), 2);
        std::fs::remove_file(&path).ok();
    }
}
