//! 生成流水线编排
//!
//! 驱动任务状态机：pending → detecting_language → cloning_voice →
//! generating_speech → generating_video → merging → completed / failed。
//! 每一步按注册表的降级链逐个尝试 Provider，单次尝试受超时约束，
//! 全链失败时保留最后一个错误。
//!
//! 路由规则：选型到的视频 Provider 自带原生音频时跳过旁白合成；
//! 降级到无音频 Provider 时再补合成旁白并走 ffmpeg 合并。

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use dashmap::DashMap;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use vidcast_core::config::AppConfig;
use vidcast_core::errors::{JobError, RegistryError};
use vidcast_core::jobs::{JobTracker, ProgressSink};
use vidcast_core::models::{
    AudioArtifact, GenerationRequest, GenerationResult, JobStatus, LanguageDetection,
    LanguageInfo, VideoArtifact, VoiceCloneInfo,
};
use vidcast_core::registry::{
    ProviderCategory, ProviderDescriptor, ProviderRegistry, SelectionConstraints,
};
use vidcast_providers::{
    ProviderCallError, ProviderCallResult, ProviderDirectory, VideoCallParams,
};

use crate::media::{MediaError, MediaProcessor};
use crate::prompt::PromptEnhancer;

/// 各步骤完成后的进度百分比
const PROGRESS_DETECTING: u8 = 10;
const PROGRESS_CLONING: u8 = 18;
const PROGRESS_SPEECH: u8 = 25;
const PROGRESS_VIDEO: u8 = 50;
const PROGRESS_MERGING: u8 = 85;

/// 流水线错误
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// 降级链全部失败，消息为最后一个 Provider 的原始错误
    #[error("{0}")]
    AllProvidersFailed(String),

    /// 链上所有 Provider 都没有可用客户端
    #[error("没有可用的 {0} 客户端")]
    NoUsableClient(String),

    #[error(transparent)]
    Media(#[from] MediaError),
}

impl From<PipelineError> for String {
    fn from(err: PipelineError) -> Self {
        err.to_string()
    }
}

/// 成本估算
#[derive(Debug, Clone, Serialize)]
pub struct CostEstimate {
    /// 选型到的视频 Provider
    pub video_provider: String,
    /// 视频生成成本
    pub video_cost: f64,
    /// 旁白合成成本
    pub voice_cost: f64,
    /// 总成本
    pub total: f64,
    /// 币种
    pub currency: String,
}

/// 一次降级执行的结果
struct FallbackOutcome<T> {
    value: T,
    provider: ProviderDescriptor,
    attempts: u32,
}

type ProviderFuture<T> = Pin<Box<dyn Future<Output = ProviderCallResult<T>> + Send>>;

/// 根据请求推导视频选型约束
fn video_constraints(request: &GenerationRequest) -> SelectionConstraints {
    let mut constraints = SelectionConstraints::none().with_min_duration(request.duration);
    if request.requires_4k() {
        constraints = constraints.with_4k();
    }
    if request.include_audio {
        constraints = constraints.prefer_audio();
    }
    constraints
}

/// 生成流水线编排器
pub struct Orchestrator {
    registry: Arc<ProviderRegistry>,
    directory: Arc<ProviderDirectory>,
    tracker: Arc<JobTracker>,
    notifier: Arc<dyn ProgressSink>,
    media: Arc<MediaProcessor>,
    enhancer: PromptEnhancer,
    config: Arc<AppConfig>,
    handles: DashMap<String, JoinHandle<()>>,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        directory: Arc<ProviderDirectory>,
        tracker: Arc<JobTracker>,
        notifier: Arc<dyn ProgressSink>,
        config: Arc<AppConfig>,
    ) -> Self {
        let media = Arc::new(MediaProcessor::new(
            config.outputs_dir(),
            config.temp_dir(),
            config.timeouts.merge_secs,
        ));
        Self {
            registry,
            directory,
            tracker,
            notifier,
            media,
            enhancer: PromptEnhancer,
            config,
            handles: DashMap::new(),
        }
    }

    /// 提交生成任务，立即返回 job_id，流水线在后台执行
    pub fn generate(self: &Arc<Self>, request: GenerationRequest) -> String {
        let job_id = Uuid::new_v4().to_string();
        self.tracker.insert(&job_id);
        info!(job_id = %job_id, prompt_len = request.prompt.len(), "任务已接受");

        let orchestrator = Arc::clone(self);
        let spawned_id = job_id.clone();
        let handle = tokio::spawn(async move {
            orchestrator.run(spawned_id, request).await;
        });
        self.handles.insert(job_id.clone(), handle);
        job_id
    }

    /// 取消任务：中止后台流水线并标记失败
    ///
    /// 已终态的任务不受影响（更新被吸收态忽略）。
    pub fn cancel(&self, job_id: &str) -> Result<(), JobError> {
        self.tracker.get(job_id)?;
        if let Some((_, handle)) = self.handles.remove(job_id) {
            handle.abort();
        }
        self.publish_progress(
            job_id,
            JobStatus::Failed,
            0,
            "已取消",
            None,
            Some("任务已被用户取消".to_string()),
        );
        Ok(())
    }

    /// 等待任务的后台流水线结束（优雅停机 / 测试用）
    pub async fn join(&self, job_id: &str) {
        if let Some((_, handle)) = self.handles.remove(job_id) {
            let _ = handle.await;
        }
    }

    /// 估算一次生成的成本，不发起任何远程调用
    pub fn estimate(&self, request: &GenerationRequest) -> Result<CostEstimate, RegistryError> {
        let constraints = video_constraints(request);
        let video = self
            .registry
            .get_best_provider(ProviderCategory::Video, &constraints)?;
        let units = f64::from(request.duration);
        let video_cost = video.cost_per_unit * units;

        let voice_cost = if request.include_audio && !video.supports_audio {
            self.registry
                .get_best_provider(ProviderCategory::Voice, &SelectionConstraints::none())
                .map(|voice| voice.cost_per_unit * units)
                .unwrap_or(0.0)
        } else {
            0.0
        };

        Ok(CostEstimate {
            video_provider: video.id,
            video_cost,
            voice_cost,
            total: video_cost + voice_cost,
            currency: "USD".to_string(),
        })
    }

    /// 检测文本语言（带降级链）
    pub async fn detect_language(&self, text: &str) -> Result<LanguageDetection, PipelineError> {
        let chain = self
            .registry
            .get_fallback_chain(ProviderCategory::Language, &SelectionConstraints::none())?;
        let directory = Arc::clone(&self.directory);
        let text = text.to_string();

        let outcome = self
            .execute_with_fallback(
                ProviderCategory::Language,
                &chain,
                self.config.timeouts.language_secs,
                1.0,
                move |descriptor| {
                    let client = directory.language(&descriptor.id)?;
                    let text = text.clone();
                    Some(Box::pin(async move { client.detect(&text).await }) as ProviderFuture<_>)
                },
            )
            .await?;
        Ok(outcome.value)
    }

    /// 克隆声音（带降级链）
    pub async fn clone_voice(
        &self,
        sample_base64: &str,
        name: &str,
    ) -> Result<VoiceCloneInfo, PipelineError> {
        let chain = self
            .registry
            .get_fallback_chain(ProviderCategory::Voice, &SelectionConstraints::none())?;
        let directory = Arc::clone(&self.directory);
        let sample = sample_base64.to_string();
        let voice_name = name.to_string();

        let outcome = self
            .execute_with_fallback(
                ProviderCategory::Voice,
                &chain,
                self.config.timeouts.voice_secs,
                1.0,
                move |descriptor| {
                    let client = directory.voice(&descriptor.id)?;
                    let sample = sample.clone();
                    let voice_name = voice_name.clone();
                    Some(Box::pin(async move {
                        client.clone_voice(&sample, &voice_name).await
                    }) as ProviderFuture<_>)
                },
            )
            .await?;
        Ok(VoiceCloneInfo {
            voice_id: outcome.value,
            name: name.to_string(),
            status: "ready".to_string(),
            created_at: Utc::now(),
        })
    }

    /// 合成语音（带降级链）
    pub async fn synthesize(
        &self,
        text: &str,
        voice_id: Option<&str>,
        language: Option<&str>,
        speed: f64,
    ) -> Result<AudioArtifact, PipelineError> {
        let chain = self
            .registry
            .get_fallback_chain(ProviderCategory::Voice, &SelectionConstraints::none())?;
        let directory = Arc::clone(&self.directory);
        let text = text.to_string();
        let voice_id = voice_id.map(str::to_string);
        let language = language.map(str::to_string);

        let outcome = self
            .execute_with_fallback(
                ProviderCategory::Voice,
                &chain,
                self.config.timeouts.voice_secs,
                1.0,
                move |descriptor| {
                    let client = directory.voice(&descriptor.id)?;
                    let text = text.clone();
                    let voice_id = voice_id.clone();
                    let language = language.clone();
                    Some(Box::pin(async move {
                        client
                            .synthesize(&text, voice_id.as_deref(), language.as_deref(), speed)
                            .await
                    }) as ProviderFuture<_>)
                },
            )
            .await?;
        Ok(outcome.value)
    }

    async fn run(self: Arc<Self>, job_id: String, request: GenerationRequest) {
        if let Err(error) = self.run_pipeline(&job_id, &request).await {
            let message = error.to_string();
            let progress = self
                .tracker
                .get(&job_id)
                .map(|snapshot| snapshot.progress)
                .unwrap_or(0);
            self.publish_progress(
                &job_id,
                JobStatus::Failed,
                progress,
                "失败",
                None,
                Some(message),
            );
        }
        self.handles.remove(&job_id);
    }

    async fn run_pipeline(
        &self,
        job_id: &str,
        request: &GenerationRequest,
    ) -> Result<(), PipelineError> {
        let started = Instant::now();
        let mut metadata: HashMap<String, serde_json::Value> = HashMap::new();

        // 语言检测：尽力而为，失败不终止任务
        let mut detected: Option<LanguageInfo> = None;
        if request.detect_language {
            self.publish_progress(
                job_id,
                JobStatus::DetectingLanguage,
                PROGRESS_DETECTING,
                "检测语言",
                None,
                None,
            );
            match self.detect_language(&request.prompt).await {
                Ok(detection) => detected = Some(detection.detected_language),
                Err(error) => {
                    warn!(job_id = %job_id, error = %error, "语言检测失败，继续执行");
                }
            }
        }

        // 声音克隆：用户显式提供样本，失败即任务失败
        let mut voice_id = request.voice_id.clone();
        if let Some(sample) = &request.voice_sample {
            self.publish_progress(
                job_id,
                JobStatus::CloningVoice,
                PROGRESS_CLONING,
                "克隆声音",
                Some(format!("样本: {}", sample.name)),
                None,
            );
            let info = self.clone_voice(&sample.audio_base64, &sample.name).await?;
            metadata.insert("cloned_voice_id".to_string(), json!(info.voice_id));
            voice_id = Some(info.voice_id);
        }

        // 视频选型：无满足约束的 Provider 时直接失败，零远程调用
        let constraints = video_constraints(request);
        let chain = self
            .registry
            .get_fallback_chain(ProviderCategory::Video, &constraints)?;
        let native_audio_planned = request.include_audio
            && chain.first().map(|d| d.supports_audio).unwrap_or(false);
        let explicit_voice = request.voice_id.is_some() || request.voice_sample.is_some();

        // 旁白合成：首选 Provider 自带音频时跳过
        let mut audio: Option<AudioArtifact> = None;
        let mut narration_attempted = false;
        if request.include_audio && !native_audio_planned {
            self.publish_progress(
                job_id,
                JobStatus::GeneratingSpeech,
                PROGRESS_SPEECH,
                "合成旁白",
                None,
                None,
            );
            narration_attempted = true;
            match self
                .synthesize(
                    &request.prompt,
                    voice_id.as_deref(),
                    detected.as_ref().map(|l| l.code.as_str()),
                    1.0,
                )
                .await
            {
                Ok(artifact) => audio = Some(artifact),
                Err(error) if !explicit_voice => {
                    warn!(job_id = %job_id, error = %error, "旁白合成失败，降级为无声视频");
                    metadata.insert("narration_skipped".to_string(), json!(error.to_string()));
                }
                Err(error) => return Err(error),
            }
        }

        // 视频生成
        self.publish_progress(
            job_id,
            JobStatus::GeneratingVideo,
            PROGRESS_VIDEO,
            "生成视频",
            Some(format!("候选 Provider {} 个", chain.len())),
            None,
        );
        // 提示词增强只作用于视频生成，旁白文案保持原文
        let mut video_prompt = request.prompt.clone();
        if request.enhance_prompt {
            let enhanced = self
                .enhancer
                .enhance(&request.prompt, request.style.as_deref());
            if enhanced.enhanced != enhanced.original {
                metadata.insert("enhanced_prompt".to_string(), json!(enhanced.enhanced));
                video_prompt = enhanced.enhanced;
            }
        }
        let params = VideoCallParams {
            prompt: video_prompt,
            duration: request.duration,
            resolution: request.resolution.clone(),
            aspect_ratio: request.aspect_ratio.clone(),
            style: request.style.clone(),
            include_audio: request.include_audio,
        };
        let units = f64::from(request.duration);
        let directory = Arc::clone(&self.directory);
        let outcome = self
            .execute_with_fallback(
                ProviderCategory::Video,
                &chain,
                self.config.timeouts.video_secs,
                units,
                move |descriptor| {
                    let client = directory.video(&descriptor.id)?;
                    let params = params.clone();
                    Some(Box::pin(async move { client.generate(&params).await })
                        as ProviderFuture<_>)
                },
            )
            .await?;
        let video: VideoArtifact = outcome.value;
        let fallback_used = chain
            .first()
            .map(|d| d.id != outcome.provider.id)
            .unwrap_or(false);
        metadata.insert("video_provider".to_string(), json!(outcome.provider.id));
        metadata.insert("video_attempts".to_string(), json!(outcome.attempts));
        metadata.insert("fallback_used".to_string(), json!(fallback_used));

        // 计划用原生音频、却降级到了无音频 Provider：此时补合成旁白
        if request.include_audio && audio.is_none() && !video.has_audio && !narration_attempted {
            match self
                .synthesize(
                    &request.prompt,
                    voice_id.as_deref(),
                    detected.as_ref().map(|l| l.code.as_str()),
                    1.0,
                )
                .await
            {
                Ok(artifact) => audio = Some(artifact),
                Err(error) => {
                    warn!(job_id = %job_id, error = %error, "降级后旁白合成失败，保留无声视频");
                    metadata.insert("narration_skipped".to_string(), json!(error.to_string()));
                }
            }
        }

        // 音视频合并：仅当视频无音轨且旁白存在
        let mut video_url = video.video_url.clone();
        let mut thumbnail_url = None;
        if let Some(audio_artifact) = audio.as_ref().filter(|_| !video.has_audio) {
            self.publish_progress(
                job_id,
                JobStatus::Merging,
                PROGRESS_MERGING,
                "合并音视频",
                None,
                None,
            );
            if self.media.is_available().await {
                let target_secs = if video.duration_seconds > 0.0 {
                    video.duration_seconds
                } else {
                    units
                };
                // 合并整体受超时约束，过期视为该步骤失败
                let merge_secs = self.config.timeouts.merge_secs;
                let (merged_url, thumb) = tokio::time::timeout(
                    Duration::from_secs(merge_secs),
                    self.merge_narration(&video.video_url, &audio_artifact.audio_url, target_secs),
                )
                .await
                .map_err(|_| MediaError::Timeout(merge_secs))??;
                video_url = merged_url;
                thumbnail_url = thumb;
            } else {
                warn!(job_id = %job_id, "ffmpeg 不可用，跳过合并");
                metadata.insert("merge_skipped".to_string(), json!("ffmpeg 不可用"));
            }
        }

        let duration_seconds = if video.duration_seconds > 0.0 {
            video.duration_seconds
        } else {
            units
        };
        let result = GenerationResult {
            job_id: job_id.to_string(),
            status: JobStatus::Completed,
            video_url,
            audio_url: audio.map(|artifact| artifact.audio_url),
            thumbnail_url,
            duration_seconds,
            detected_language: detected,
            processing_time_seconds: started.elapsed().as_secs_f64(),
            cost_estimate: Some(outcome.provider.cost_per_unit * units),
            metadata,
        };
        self.tracker.store_result(result);
        self.publish_progress(
            job_id,
            JobStatus::Completed,
            100,
            "完成",
            Some("视频生成完成".to_string()),
            None,
        );
        info!(
            job_id = %job_id,
            provider = %outcome.provider.id,
            attempts = outcome.attempts,
            elapsed_secs = started.elapsed().as_secs_f64(),
            "任务完成"
        );
        Ok(())
    }

    /// 下载视频与旁白、对齐时长并合并，返回合并产物与缩略图的静态 URL
    async fn merge_narration(
        &self,
        video_url: &str,
        audio_url: &str,
        target_secs: f64,
    ) -> Result<(String, Option<String>), MediaError> {
        let local_video = self.media.fetch(video_url).await?;
        let local_audio = self.media.fetch(audio_url).await?;
        let aligned = self
            .media
            .adjust_audio_length(&local_audio, target_secs)
            .await?;
        let merged = self.media.merge_audio_video(&local_video, &aligned).await?;

        let mut thumbnail_url = None;
        if let Ok(thumb) = self.media.thumbnail(&merged).await {
            thumbnail_url = self.media.static_url(&thumb);
        }
        let merged_url = self
            .media
            .static_url(&merged)
            .unwrap_or_else(|| video_url.to_string());
        Ok((merged_url, thumbnail_url))
    }

    /// 沿降级链逐个尝试，单次尝试受超时约束
    ///
    /// 无客户端的 Provider 直接跳过、不计入尝试；失败与超时计入
    /// 使用统计后继续降级；全链失败时保留最后一个错误原文。
    async fn execute_with_fallback<T, F>(
        &self,
        category: ProviderCategory,
        chain: &[ProviderDescriptor],
        timeout_secs: u64,
        cost_units: f64,
        call: F,
    ) -> Result<FallbackOutcome<T>, PipelineError>
    where
        F: Fn(&ProviderDescriptor) -> Option<ProviderFuture<T>>,
    {
        let mut attempts = 0u32;
        let mut last_error: Option<ProviderCallError> = None;

        for descriptor in chain {
            let Some(future) = call(descriptor) else {
                debug!(provider = %descriptor.id, "无客户端，跳过");
                continue;
            };
            attempts += 1;
            let started = Instant::now();
            let result = tokio::time::timeout(Duration::from_secs(timeout_secs), future).await;
            let latency_ms = started.elapsed().as_millis() as f64;

            match result {
                Ok(Ok(value)) => {
                    self.registry.record_usage(
                        &descriptor.id,
                        latency_ms,
                        true,
                        descriptor.cost_per_unit * cost_units,
                    );
                    return Ok(FallbackOutcome {
                        value,
                        provider: descriptor.clone(),
                        attempts,
                    });
                }
                Ok(Err(error)) => {
                    self.registry
                        .record_usage(&descriptor.id, latency_ms, false, 0.0);
                    warn!(provider = %descriptor.id, error = %error, "Provider 调用失败，尝试降级");
                    last_error = Some(error);
                }
                Err(_elapsed) => {
                    self.registry
                        .record_usage(&descriptor.id, latency_ms, false, 0.0);
                    warn!(provider = %descriptor.id, timeout_secs, "Provider 调用超时，尝试降级");
                    last_error = Some(ProviderCallError::Timeout(timeout_secs));
                }
            }
        }

        match last_error {
            Some(error) => Err(PipelineError::AllProvidersFailed(error.to_string())),
            None => Err(PipelineError::NoUsableClient(category.as_str().to_string())),
        }
    }

    fn publish_progress(
        &self,
        job_id: &str,
        status: JobStatus,
        progress: u8,
        step: &str,
        message: Option<String>,
        error: Option<String>,
    ) {
        if let Some(snapshot) = self
            .tracker
            .update(job_id, status, progress, step, message, error)
        {
            self.notifier.publish(&snapshot);
        }
    }
}
