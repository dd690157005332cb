use axum::{
    extract::{Json, Query},
    http::StatusCode,
    response::Json as ResponseJson,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{error, info};

use crate::config::ConfigLoader;
use crate::downloader::fetch_video;
use crate::pipeline::analyze_video;
use crate::transcriber::WhisperCommandTranscriber;

/// 分析请求
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    /// 视频来源：URL 或服务器本地路径
    pub input: String,
    /// 采样间隔（秒），缺省走配置加载链
    pub interval: Option<f64>,
    /// 快照中内嵌完整转写
    pub embed_transcript: Option<bool>,
    /// 输出目录（缺省使用请求专属的临时目录）
    pub output: Option<String>,
}

/// GET 便捷接口的查询参数
#[derive(Debug, Deserialize)]
pub struct AnalyzeQuery {
    pub input: String,
    pub interval: Option<f64>,
}

/// 分析响应
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub success: bool,
    pub message: String,
    pub result: Option<AnalyzeSummary>,
}

/// 分析结果摘要
#[derive(Debug, Serialize)]
pub struct AnalyzeSummary {
    pub output_dir: String,
    pub report_file: String,
    pub snapshot_file: String,
    pub sample_count: usize,
    pub has_transcript: bool,
}

/// 健康检查
pub async fn health_check() -> ResponseJson<serde_json::Value> {
    ResponseJson(serde_json::json!({
        "status": "ok",
        "service": "video-analyze",
    }))
}

/// POST /analyze：下载（或定位）视频并执行完整分析流水线
#[axum::debug_handler]
pub async fn handle_analyze(
    Json(request): Json<AnalyzeRequest>,
) -> Result<ResponseJson<AnalyzeResponse>, (StatusCode, String)> {
    info!("收到分析请求: input={}", request.input);
    run_analysis(request).await
}

/// GET /analyze/query：查询参数形式的便捷接口，方便测试
#[axum::debug_handler]
pub async fn handle_analyze_query(
    Query(params): Query<AnalyzeQuery>,
) -> Result<ResponseJson<AnalyzeResponse>, (StatusCode, String)> {
    info!("收到查询分析请求: input={}", params.input);
    run_analysis(AnalyzeRequest {
        input: params.input,
        interval: params.interval,
        embed_transcript: None,
        output: None,
    })
    .await
}

async fn run_analysis(
    request: AnalyzeRequest,
) -> Result<ResponseJson<AnalyzeResponse>, (StatusCode, String)> {
    // 配置：请求参数 > 环境变量 > 配置文件 > 默认值
    let config = ConfigLoader::load_config(None, request.interval, request.embed_transcript, None)
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("配置无效: {}", e)))?;

    // 每个请求使用独立的输出目录，避免并发请求互相覆盖
    let output_dir = match &request.output {
        Some(path) => PathBuf::from(path),
        None => std::env::temp_dir()
            .join("video-analyze")
            .join(uuid::Uuid::new_v4().to_string()),
    };
    std::fs::create_dir_all(&output_dir)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("创建输出目录失败: {}", e)))?;

    let video_path = fetch_video(&request.input, &output_dir).await.map_err(|e| {
        error!("视频获取失败: {}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, format!("视频获取失败: {}", e))
    })?;

    // 转写器由服务端持有并显式传入流水线
    let transcriber = WhisperCommandTranscriber::default();
    match analyze_video(&video_path, &output_dir, config, Some(&transcriber)).await {
        Ok(output) => Ok(ResponseJson(AnalyzeResponse {
            success: true,
            message: format!("分析完成，共 {} 个采样帧", output.sample_count),
            result: Some(AnalyzeSummary {
                output_dir: output.output_dir.to_string_lossy().to_string(),
                report_file: output.report_file.to_string_lossy().to_string(),
                snapshot_file: output.snapshot_file.to_string_lossy().to_string(),
                sample_count: output.sample_count,
                has_transcript: output.has_transcript,
            }),
        })),
        Err(e) => {
            error!("分析失败: {}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, format!("分析失败: {}", e)))
        }
    }
}
