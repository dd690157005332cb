use crate::error::{AnalyzeError, AnalyzeResult};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// 每下载这么多字节打印一次进度
const PROGRESS_STEP: u64 = 5 * 1024 * 1024;

/// 把视频源解析为本地文件：URL 下载到输出目录，本地路径直接透传
///
/// 拿不到视频字节属于获取失败（致命，不产生任何报告）。
pub async fn fetch_video(source: &str, dest_dir: &Path) -> AnalyzeResult<PathBuf> {
    if source.starts_with("http://") || source.starts_with("https://") {
        download_video(source, dest_dir).await
    } else {
        let path = PathBuf::from(source);
        if !path.exists() {
            return Err(AnalyzeError::Acquisition(format!(
                "本地视频文件不存在: {}",
                path.display()
            )));
        }
        Ok(path)
    }
}

/// 通过 HTTP(S) 下载视频到 dest_dir/video.mp4
async fn download_video(url: &str, dest_dir: &Path) -> AnalyzeResult<PathBuf> {
    info!("📥 [下载] 正在下载视频: {}", url);
    std::fs::create_dir_all(dest_dir)?;

    let mut response = reqwest::get(url)
        .await
        .map_err(|e| AnalyzeError::Acquisition(format!("下载请求失败: {}", e)))?
        .error_for_status()
        .map_err(|e| AnalyzeError::Acquisition(format!("下载返回错误状态: {}", e)))?;

    let dest_path = dest_dir.join("video.mp4");
    let mut file = std::fs::File::create(&dest_path)?;

    let mut downloaded: u64 = 0;
    let mut next_progress = PROGRESS_STEP;
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| AnalyzeError::Acquisition(format!("下载数据流中断: {}", e)))?
    {
        file.write_all(&chunk)?;
        downloaded += chunk.len() as u64;
        if downloaded >= next_progress {
            info!("  📥 已下载 {:.1} MB...", downloaded as f64 / 1024.0 / 1024.0);
            next_progress += PROGRESS_STEP;
        }
    }

    info!(
        "✅ [下载] 视频下载完成: {} ({:.2} MB)",
        dest_path.display(),
        downloaded as f64 / 1024.0 / 1024.0
    );
    Ok(dest_path)
}
