use crate::pipeline::AnalyzeConfig;
use anyhow::Result;
use std::env;
use std::path::{Path, PathBuf};

/// 配置加载器
///
/// 优先级：命令行参数 > 环境变量 > 配置文件 > 默认值
pub struct ConfigLoader;

impl ConfigLoader {
    /// 从多个源合并加载分析配置
    pub fn load_config(
        config_file: Option<&Path>,
        interval: Option<f64>,
        embed_transcript: Option<bool>,
        webhook_url: Option<String>,
    ) -> Result<AnalyzeConfig> {
        // 1. 先加载配置文件（如果存在）
        let file_config = if let Some(config_path) = config_file {
            Self::load_from_file(config_path).ok()
        } else {
            // 尝试从默认位置加载
            Self::load_from_default_locations().ok()
        };

        // 2. 加载环境变量
        let (env_interval, env_embed_transcript, env_webhook_url) = Self::load_from_env();

        // 3. 合并配置
        let config = AnalyzeConfig {
            interval: interval
                .or(env_interval)
                .or(file_config.as_ref().map(|c| c.interval))
                .unwrap_or(1.0),
            embed_transcript: embed_transcript
                .or(env_embed_transcript)
                .or(file_config.as_ref().map(|c| c.embed_transcript))
                .unwrap_or(false),
            webhook_url: webhook_url
                .or(env_webhook_url)
                .or(file_config.as_ref().and_then(|c| c.webhook_url.clone())),
        };

        if config.interval <= 0.0 {
            anyhow::bail!("采样间隔必须大于 0，当前为 {}", config.interval);
        }

        Ok(config)
    }

    /// 从环境变量加载配置
    fn load_from_env() -> (Option<f64>, Option<bool>, Option<String>) {
        (
            env::var("VIDEO_ANALYZE_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok()),
            env::var("VIDEO_ANALYZE_EMBED_TRANSCRIPT")
                .ok()
                .map(|v| v.to_lowercase() == "true"),
            env::var("VIDEO_ANALYZE_WEBHOOK_URL").ok(),
        )
    }

    /// 从 INI 配置文件加载配置
    fn load_from_file(config_path: &Path) -> Result<AnalyzeConfig> {
        if !config_path.exists() {
            return Err(anyhow::anyhow!("配置文件不存在: {}", config_path.display()));
        }

        let mut config_parser = configparser::ini::Ini::new();
        config_parser
            .load(config_path)
            .map_err(|e| anyhow::anyhow!("读取配置文件失败: {}: {}", config_path.display(), e))?;

        // 尝试从 [video_analyze] 节读取，如果没有则使用 [DEFAULT] 节
        let interval = config_parser
            .get("video_analyze", "interval")
            .or_else(|| config_parser.get("DEFAULT", "interval"))
            .and_then(|v| v.parse().ok());

        let embed_transcript = config_parser
            .get("video_analyze", "embed_transcript")
            .or_else(|| config_parser.get("DEFAULT", "embed_transcript"))
            .map(|v| v.to_lowercase() == "true");

        let webhook_url = config_parser
            .get("video_analyze", "webhook_url")
            .or_else(|| config_parser.get("DEFAULT", "webhook_url"))
            .filter(|v| !v.is_empty());

        Ok(AnalyzeConfig {
            interval: interval.unwrap_or(1.0),
            embed_transcript: embed_transcript.unwrap_or(false),
            webhook_url,
        })
    }

    /// 从默认位置加载配置文件
    fn load_from_default_locations() -> Result<AnalyzeConfig> {
        // 1. 当前目录的 video-analyze.ini
        let current_dir_config = PathBuf::from("video-analyze.ini");
        if current_dir_config.exists() {
            return Self::load_from_file(&current_dir_config);
        }

        // 2. 当前目录的 .video-analyze.ini
        let hidden_config = PathBuf::from(".video-analyze.ini");
        if hidden_config.exists() {
            return Self::load_from_file(&hidden_config);
        }

        // 3. 用户主目录的 .video-analyze.ini
        if let Some(home) = env::var_os("HOME") {
            let home_config = PathBuf::from(home).join(".video-analyze.ini");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        // 4. /etc/video-analyze.ini (Linux/macOS)
        let etc_config = PathBuf::from("/etc/video-analyze.ini");
        if etc_config.exists() {
            return Self::load_from_file(&etc_config);
        }

        Err(anyhow::anyhow!("未找到配置文件"))
    }

    /// 创建默认配置文件
    pub fn create_default_config(config_path: &Path) -> Result<()> {
        let mut config_parser = configparser::ini::Ini::new();
        config_parser.set("video_analyze", "interval", Some("1.0".to_string()));
        config_parser.set("video_analyze", "embed_transcript", Some("false".to_string()));
        config_parser.set("video_analyze", "webhook_url", Some("".to_string()));

        config_parser
            .write(config_path)
            .map_err(|e| anyhow::anyhow!("写入配置文件失败: {}: {}", config_path.display(), e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_file() {
        let dir = std::env::temp_dir().join("video-analyze-tests");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("config-{}.ini", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            "[video_analyze]\ninterval = 2.5\nembed_transcript = true\n",
        )
        .unwrap();

        // 文件值生效
        let from_file = ConfigLoader::load_config(Some(&path), None, None, None).unwrap();
        assert!((from_file.interval - 2.5).abs() < 1e-9);
        assert!(from_file.embed_transcript);

        // 命令行参数覆盖文件
        let overridden =
            ConfigLoader::load_config(Some(&path), Some(0.5), Some(false), None).unwrap();
        assert!((overridden.interval - 0.5).abs() < 1e-9);
        assert!(!overridden.embed_transcript);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_invalid_interval_rejected() {
        let err = ConfigLoader::load_config(None, Some(0.0), None, None).unwrap_err();
        assert!(err.to_string().contains("采样间隔"));
        assert!(ConfigLoader::load_config(None, Some(-1.0), None, None).is_err());
    }

    #[test]
    fn test_default_config_roundtrip() {
        let dir = std::env::temp_dir().join("video-analyze-tests");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("default-{}.ini", uuid::Uuid::new_v4()));

        ConfigLoader::create_default_config(&path).unwrap();
        let config = ConfigLoader::load_config(Some(&path), None, None, None).unwrap();
        assert!((config.interval - 1.0).abs() < 1e-9);
        assert!(!config.embed_transcript);
        assert!(config.webhook_url.is_none());

        std::fs::remove_file(&path).ok();
    }
}
