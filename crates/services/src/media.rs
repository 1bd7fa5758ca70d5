//! ffmpeg 音视频后处理
//!
//! 合并旁白与视频、对齐音频时长、截取缩略图。全部通过外部
//! ffmpeg / ffprobe 进程完成，产物落盘到输出目录并以
//! `/static/outputs/` URL 对外暴露。

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};
use uuid::Uuid;

/// 媒体处理错误
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("产物下载失败: {0}")]
    Download(String),

    #[error("ffmpeg 执行失败: {0}")]
    Ffmpeg(String),

    #[error("媒体探测失败: {0}")]
    Probe(String),

    #[error("本地找不到产物: {0}")]
    MissingArtifact(String),

    #[error("媒体处理超时 ({0} 秒)")]
    Timeout(u64),
}

impl From<MediaError> for String {
    fn from(err: MediaError) -> Self {
        err.to_string()
    }
}

/// 音频时长对齐时允许的变速范围
const MIN_TEMPO: f64 = 0.5;
const MAX_TEMPO: f64 = 2.0;

/// 计算对齐到目标时长所需的变速倍率（钳制在 ffmpeg atempo 范围内）
fn clamped_tempo(actual_secs: f64, target_secs: f64) -> f64 {
    if actual_secs <= 0.0 || target_secs <= 0.0 {
        return 1.0;
    }
    (actual_secs / target_secs).clamp(MIN_TEMPO, MAX_TEMPO)
}

/// ffmpeg 后处理器
pub struct MediaProcessor {
    outputs_dir: PathBuf,
    temp_dir: PathBuf,
    client: reqwest::Client,
}

impl MediaProcessor {
    /// `fetch_timeout_secs` 约束单次产物下载的整体耗时
    pub fn new(outputs_dir: PathBuf, temp_dir: PathBuf, fetch_timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(fetch_timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            outputs_dir,
            temp_dir,
            client,
        }
    }

    /// ffmpeg 是否可用；不可用时合并步骤降级为直接返回原始视频
    pub async fn is_available(&self) -> bool {
        match Command::new("ffmpeg")
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
        {
            Ok(status) => status.success(),
            Err(error) => {
                warn!(error = %error, "ffmpeg 不可用");
                false
            }
        }
    }

    /// 将产物 URL 解析为本地文件：远程 URL 下载到临时目录，
    /// `/static/outputs/` URL 映射回输出目录
    pub async fn fetch(&self, url: &str) -> Result<PathBuf, MediaError> {
        if let Some(filename) = url.strip_prefix("/static/outputs/") {
            let path = self.outputs_dir.join(filename);
            if !path.exists() {
                return Err(MediaError::MissingArtifact(url.to_string()));
            }
            return Ok(path);
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(MediaError::Download(format!("不支持的产物地址: {url}")));
        }

        let extension = url.rsplit('.').next().filter(|e| e.len() <= 4).unwrap_or("bin");
        let path = self.temp_dir.join(format!("dl_{}.{extension}", Uuid::new_v4()));
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|error| MediaError::Download(error.to_string()))?;
        if !response.status().is_success() {
            return Err(MediaError::Download(format!(
                "下载失败 ({}): {url}",
                response.status().as_u16()
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|error| MediaError::Download(error.to_string()))?;
        tokio::fs::write(&path, &bytes).await?;
        debug!(url = %url, size = bytes.len(), "产物已下载");
        Ok(path)
    }

    /// ffprobe 探测媒体时长（秒）
    pub async fn probe_duration(&self, path: &Path) -> Result<f64, MediaError> {
        let output = Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .output()
            .await?;
        if !output.status.success() {
            return Err(MediaError::Probe(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        String::from_utf8_lossy(&output.stdout)
            .trim()
            .parse::<f64>()
            .map_err(|error| MediaError::Probe(error.to_string()))
    }

    /// 将音频对齐到目标时长：先变速（0.5-2.0 倍），不足部分补静音，
    /// 超出部分截断
    pub async fn adjust_audio_length(
        &self,
        audio_path: &Path,
        target_secs: f64,
    ) -> Result<PathBuf, MediaError> {
        let actual = self.probe_duration(audio_path).await?;
        if target_secs <= 0.0 || (actual - target_secs).abs() < 0.25 {
            return Ok(audio_path.to_path_buf());
        }

        let tempo = clamped_tempo(actual, target_secs);
        let output_path = self.temp_dir.join(format!("aligned_{}.mp3", Uuid::new_v4()));
        let filter = format!("atempo={tempo:.4},apad");

        let output = Command::new("ffmpeg")
            .arg("-y")
            .arg("-i")
            .arg(audio_path)
            .args(["-af", &filter, "-t", &format!("{target_secs:.3}")])
            .arg(&output_path)
            .output()
            .await?;
        if !output.status.success() {
            return Err(MediaError::Ffmpeg(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        debug!(
            actual_secs = actual,
            target_secs = target_secs,
            tempo = tempo,
            "音频时长已对齐"
        );
        Ok(output_path)
    }

    /// 合并视频与旁白音轨，视频流直接拷贝
    pub async fn merge_audio_video(
        &self,
        video_path: &Path,
        audio_path: &Path,
    ) -> Result<PathBuf, MediaError> {
        let output_path = self.outputs_dir.join(format!("video_{}.mp4", Uuid::new_v4()));

        let output = Command::new("ffmpeg")
            .arg("-y")
            .arg("-i")
            .arg(video_path)
            .arg("-i")
            .arg(audio_path)
            .args([
                "-map", "0:v:0", "-map", "1:a:0", "-c:v", "copy", "-c:a", "aac", "-shortest",
            ])
            .arg(&output_path)
            .output()
            .await?;
        if !output.status.success() {
            return Err(MediaError::Ffmpeg(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        debug!(output = %output_path.display(), "音视频合并完成");
        Ok(output_path)
    }

    /// 截取首秒画面作为缩略图
    pub async fn thumbnail(&self, video_path: &Path) -> Result<PathBuf, MediaError> {
        let output_path = self.outputs_dir.join(format!("thumb_{}.jpg", Uuid::new_v4()));

        let output = Command::new("ffmpeg")
            .arg("-y")
            .args(["-ss", "00:00:01"])
            .arg("-i")
            .arg(video_path)
            .args(["-vframes", "1", "-q:v", "3"])
            .arg(&output_path)
            .output()
            .await?;
        if !output.status.success() {
            return Err(MediaError::Ffmpeg(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(output_path)
    }

    /// 输出目录下文件的静态服务 URL
    pub fn static_url(&self, path: &Path) -> Option<String> {
        let filename = path.strip_prefix(&self.outputs_dir).ok()?.to_str()?;
        Some(format!("/static/outputs/{filename}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamped_tempo() {
        // 音频 10s 对齐 8s：加速 1.25 倍
        assert!((clamped_tempo(10.0, 8.0) - 1.25).abs() < 1e-9);
        // 超出范围钳制
        assert_eq!(clamped_tempo(30.0, 8.0), 2.0);
        assert_eq!(clamped_tempo(2.0, 8.0), 0.5);
        // 非法输入不变速
        assert_eq!(clamped_tempo(0.0, 8.0), 1.0);
        assert_eq!(clamped_tempo(8.0, 0.0), 1.0);
    }

    #[test]
    fn test_static_url() {
        let dir = tempfile::tempdir().unwrap();
        let media = MediaProcessor::new(dir.path().to_path_buf(), dir.path().join("temp"), 5);
        let inside = dir.path().join("video_abc.mp4");
        assert_eq!(
            media.static_url(&inside).as_deref(),
            Some("/static/outputs/video_abc.mp4")
        );
        assert!(media.static_url(Path::new("/elsewhere/x.mp4")).is_none());
    }

    #[tokio::test]
    async fn test_fetch_static_url_maps_to_outputs_dir() {
        let dir = tempfile::tempdir().unwrap();
        let media = MediaProcessor::new(dir.path().to_path_buf(), dir.path().join("temp"), 5);

        std::fs::write(dir.path().join("speech_x.mp3"), b"audio").unwrap();
        let path = media.fetch("/static/outputs/speech_x.mp3").await.unwrap();
        assert_eq!(path, dir.path().join("speech_x.mp3"));

        // 不存在的产物
        assert!(matches!(
            media.fetch("/static/outputs/missing.mp3").await,
            Err(MediaError::MissingArtifact(_))
        ));
        // 非法协议
        assert!(matches!(
            media.fetch("ftp://example.com/a.mp4").await,
            Err(MediaError::Download(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_aborts_on_stalled_server() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("temp")).unwrap();
        let media = MediaProcessor::new(dir.path().to_path_buf(), dir.path().join("temp"), 1);

        // 接受连接后不回应，模拟卡死的产物服务器
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let _held = listener.accept().await;
            tokio::time::sleep(Duration::from_secs(60)).await;
        });

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            media.fetch(&format!("http://{addr}/video.mp4")),
        )
        .await
        .expect("下载必须在客户端超时内返回");
        assert!(matches!(result, Err(MediaError::Download(_))));
        server.abort();
    }
}
