//! 任务进度跟踪模块
//!
//! 任务状态的唯一事实来源，供轮询接口与推送通道共同消费。
//! 推送是尽力而为（允许丢失），拉取以本模块快照为准。

use crate::errors::JobError;
use crate::models::{GenerationResult, JobProgress, JobStatus};
use chrono::{Duration, Utc};
use dashmap::DashMap;
use tracing::{info, warn};

/// 进度推送接口
///
/// 由推送通道（WebSocket 等）实现；发送失败直接丢弃，不阻塞编排器。
pub trait ProgressSink: Send + Sync {
    /// 推送一次进度快照
    fn publish(&self, progress: &JobProgress);
}

/// 空实现，用于无推送通道的场景
#[derive(Debug, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn publish(&self, _progress: &JobProgress) {}
}

/// 任务跟踪器
///
/// 每个任务仅由驱动它的编排器写入，按 job_id 覆盖写（last-writer-wins）。
#[derive(Default)]
pub struct JobTracker {
    jobs: DashMap<String, JobProgress>,
    results: DashMap<String, GenerationResult>,
}

impl JobTracker {
    /// 创建空跟踪器
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记新任务（pending 态）
    pub fn insert(&self, job_id: &str) -> JobProgress {
        let progress = JobProgress::pending(job_id);
        self.jobs.insert(job_id.to_string(), progress.clone());
        progress
    }

    /// 覆盖更新任务状态
    ///
    /// 任务不存在时仅记录日志不报错：清理之后的迟到更新是预期行为。
    /// 终态任务不再被改写（failed / completed 为吸收态）。
    pub fn update(
        &self,
        job_id: &str,
        status: JobStatus,
        progress: u8,
        current_step: &str,
        message: Option<String>,
        error: Option<String>,
    ) -> Option<JobProgress> {
        let mut entry = match self.jobs.get_mut(job_id) {
            Some(entry) => entry,
            None => {
                warn!(job_id = %job_id, status = %status, "更新的任务不存在，忽略");
                return None;
            }
        };

        if entry.status.is_terminal() {
            warn!(job_id = %job_id, current = %entry.status, "任务已处于终态，忽略更新");
            return None;
        }

        entry.status = status;
        entry.progress = progress.min(100);
        entry.current_step = current_step.to_string();
        entry.message = message;
        entry.error = error;
        entry.updated_at = Utc::now();

        info!(
            job_id = %job_id,
            status = %status,
            progress = entry.progress,
            step = %entry.current_step,
            "任务进度"
        );
        Some(entry.clone())
    }

    /// 获取任务进度快照
    ///
    /// 无中间 update 时重复调用返回一致快照。
    pub fn get(&self, job_id: &str) -> Result<JobProgress, JobError> {
        self.jobs
            .get(job_id)
            .map(|entry| entry.clone())
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))
    }

    /// 保存最终结果
    pub fn store_result(&self, result: GenerationResult) {
        self.results.insert(result.job_id.clone(), result);
    }

    /// 获取最终结果
    ///
    /// 未完成返回 NotFinished，失败返回 Failed（携带错误信息），
    /// 未知任务返回 NotFound。
    pub fn result(&self, job_id: &str) -> Result<GenerationResult, JobError> {
        if let Some(result) = self.results.get(job_id) {
            return Ok(result.clone());
        }
        match self.jobs.get(job_id) {
            Some(job) if job.status == JobStatus::Failed => Err(JobError::Failed(
                job.error.clone().unwrap_or_else(|| "未知错误".to_string()),
            )),
            Some(job) => Err(JobError::NotFinished(
                job_id.to_string(),
                job.status.to_string(),
            )),
            None => Err(JobError::NotFound(job_id.to_string())),
        }
    }

    /// 清理超过保留窗口的终态任务
    ///
    /// 返回清理数量。非终态任务不清理。
    pub fn purge_expired(&self, retention_secs: i64) -> usize {
        let cutoff = Utc::now() - Duration::seconds(retention_secs);
        let expired: Vec<String> = self
            .jobs
            .iter()
            .filter(|entry| entry.status.is_terminal() && entry.updated_at < cutoff)
            .map(|entry| entry.job_id.clone())
            .collect();

        for job_id in &expired {
            self.jobs.remove(job_id);
            self.results.remove(job_id);
        }
        if !expired.is_empty() {
            info!(count = expired.len(), "已清理过期任务");
        }
        expired.len()
    }

    /// 当前跟踪的任务数
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get_idempotent() {
        let tracker = JobTracker::new();
        tracker.insert("job-1");

        let first = tracker.get("job-1").unwrap();
        let second = tracker.get("job-1").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.status, JobStatus::Pending);
        assert_eq!(first.progress, 0);
    }

    #[test]
    fn test_get_unknown_is_not_found() {
        let tracker = JobTracker::new();
        assert_eq!(
            tracker.get("missing").unwrap_err(),
            JobError::NotFound("missing".to_string())
        );
    }

    #[test]
    fn test_update_unknown_is_silent() {
        let tracker = JobTracker::new();
        // 不 panic、不报错，仅记录日志
        let result = tracker.update(
            "missing",
            JobStatus::GeneratingVideo,
            50,
            "生成视频",
            None,
            None,
        );
        assert!(result.is_none());
    }

    #[test]
    fn test_update_advances_snapshot() {
        let tracker = JobTracker::new();
        tracker.insert("job-1");

        tracker.update(
            "job-1",
            JobStatus::DetectingLanguage,
            10,
            "检测语言",
            Some("分析提示词".to_string()),
            None,
        );
        let snapshot = tracker.get("job-1").unwrap();
        assert_eq!(snapshot.status, JobStatus::DetectingLanguage);
        assert_eq!(snapshot.progress, 10);
        assert_eq!(snapshot.current_step, "检测语言");
    }

    #[test]
    fn test_terminal_state_is_absorbing() {
        let tracker = JobTracker::new();
        tracker.insert("job-1");
        tracker.update(
            "job-1",
            JobStatus::Failed,
            0,
            "失败",
            None,
            Some("provider 全部失败".to_string()),
        );

        // 终态之后的更新被忽略
        let result = tracker.update(
            "job-1",
            JobStatus::GeneratingVideo,
            50,
            "生成视频",
            None,
            None,
        );
        assert!(result.is_none());
        let snapshot = tracker.get("job-1").unwrap();
        assert_eq!(snapshot.status, JobStatus::Failed);
        assert_eq!(snapshot.error.as_deref(), Some("provider 全部失败"));
    }

    #[test]
    fn test_result_states() {
        let tracker = JobTracker::new();
        tracker.insert("job-1");

        assert!(matches!(
            tracker.result("job-1"),
            Err(JobError::NotFinished(_, _))
        ));
        assert!(matches!(
            tracker.result("missing"),
            Err(JobError::NotFound(_))
        ));

        tracker.update("job-1", JobStatus::Failed, 0, "失败", None, Some("超时".to_string()));
        assert_eq!(
            tracker.result("job-1").unwrap_err(),
            JobError::Failed("超时".to_string())
        );
    }

    #[test]
    fn test_purge_only_expired_terminal_jobs() {
        let tracker = JobTracker::new();
        tracker.insert("running");
        tracker.insert("done");
        tracker.update("done", JobStatus::Completed, 100, "完成", None, None);

        // 保留窗口很大时不清理
        assert_eq!(tracker.purge_expired(3600), 0);
        // 窗口为负（立即过期）时只清理终态任务
        assert_eq!(tracker.purge_expired(-1), 1);
        assert!(tracker.get("running").is_ok());
        assert!(tracker.get("done").is_err());
    }
}
