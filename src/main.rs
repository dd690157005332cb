use clap::{Parser, Subcommand};
use anyhow::{Context, Result};
use std::path::PathBuf;
use video_analyze::{
    analyze_video, config::ConfigLoader, fetch_video, transcriber::JsonTranscriptFile,
    transcriber::WhisperCommandTranscriber, TranscriptProvider,
};

/// 视频分析工具 - 按固定间隔采样帧、计算视觉指标、对齐语音转写
#[derive(Parser, Debug)]
#[command(name = "video-analyze")]
#[command(about = "视频分析工具：采样帧、计算视觉指标、对齐语音转写、生成报告和数据快照", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// CLI 模式：分析一个视频（URL 或本地文件）
    Analyze {
        /// 视频来源：URL 或本地文件路径
        input: String,

        /// 输出目录
        #[arg(short, long, default_value = "./video_analysis")]
        output: String,

        /// 配置文件路径（可选，支持 .ini 格式）
        /// 优先级：命令行参数 > 环境变量 > 配置文件 > 默认值
        #[arg(long)]
        config: Option<PathBuf>,

        /// 帧采样间隔（秒），必须大于 0
        /// 可通过环境变量 VIDEO_ANALYZE_INTERVAL 或配置文件设置
        #[arg(short, long)]
        interval: Option<f64>,

        /// 快照中内嵌完整转写
        #[arg(long)]
        embed_transcript: bool,

        /// 跳过语音转写，只做视觉分析
        #[arg(long)]
        no_transcript: bool,

        /// whisper 模型名
        #[arg(long, default_value = "base")]
        whisper_model: String,

        /// 预先算好的转写 JSON 文件（whisper 格式），跳过音频提取
        #[arg(long)]
        transcript_file: Option<PathBuf>,
    },
    /// Web 服务模式：启动 HTTP 分析服务
    Serve {
        /// 监听地址（默认从环境变量 VIDEO_ANALYZE_PORT 读取，如果不存在则使用 0.0.0.0:9000）
        #[arg(short, long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    match args.command {
        Commands::Analyze {
            input,
            output,
            config: config_file,
            interval,
            embed_transcript,
            no_transcript,
            whisper_model,
            transcript_file,
        } => {
            // CLI 模式：从配置文件、环境变量和命令行参数加载配置
            let config = ConfigLoader::load_config(
                config_file.as_deref(),
                interval,
                if embed_transcript { Some(true) } else { None },
                None, // webhook_url 从配置文件或环境变量读取
            )
            .context("加载配置失败")?;

            println!(
                "使用配置: interval={:.2}s, embed_transcript={}",
                config.interval, config.embed_transcript
            );

            let output_dir = PathBuf::from(&output);
            let video_path = fetch_video(&input, &output_dir)
                .await
                .context("获取视频失败")?;

            // 转写器：预先算好的 JSON > whisper 命令行 > 不转写
            let transcriber: Option<Box<dyn TranscriptProvider>> = if no_transcript {
                None
            } else if let Some(path) = transcript_file {
                Some(Box::new(JsonTranscriptFile::new(path)))
            } else {
                Some(Box::new(WhisperCommandTranscriber::new(whisper_model, None)))
            };

            analyze_video(&video_path, &output_dir, config, transcriber.as_deref())
                .await
                .context("分析视频失败")?;
        }
        Commands::Serve { bind } => {
            // Web 服务模式
            // 优先使用命令行参数，其次使用环境变量 VIDEO_ANALYZE_PORT，最后使用默认值 9000
            let bind_addr = bind.unwrap_or_else(|| {
                std::env::var("VIDEO_ANALYZE_PORT")
                    .map(|port| format!("0.0.0.0:{}", port))
                    .unwrap_or_else(|_| "0.0.0.0:9000".to_string())
            });
            start_web_server(&bind_addr).await?;
        }
    }

    Ok(())
}

async fn start_web_server(bind: &str) -> Result<()> {
    use axum::{
        routing::{get, post},
        Router,
    };
    use tower_http::cors::CorsLayer;
    use video_analyze::handler;

    let app = Router::new()
        .route("/", get(handler::health_check))
        .route("/health", get(handler::health_check))
        // 完整分析端点
        .route("/analyze", post(handler::handle_analyze))
        // 查询参数分析端点（GET请求，方便测试）
        .route("/analyze/query", get(handler::handle_analyze_query))
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .context(format!("绑定地址失败: {}", bind))?;

    tracing::info!("Web 服务器启动在: http://{}", bind);
    tracing::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    tracing::info!("可用端点:");
    tracing::info!("  • 健康检查: GET  http://{}/health", bind);
    tracing::info!("  • 视频分析: POST http://{}/analyze", bind);
    tracing::info!("  • 查询分析: GET  http://{}/analyze/query?input=<path>", bind);
    tracing::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    axum::serve(listener, app)
        .await
        .context("启动服务器失败")?;

    Ok(())
}
