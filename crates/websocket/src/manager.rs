//! 订阅管理器

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::debug;
use vidcast_core::jobs::ProgressSink;
use vidcast_core::models::JobProgress;

/// 按 job_id 分发进度快照的订阅管理器
#[derive(Default)]
pub struct ConnectionManager {
    subscribers: DashMap<String, Vec<mpsc::UnboundedSender<JobProgress>>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 订阅某个任务的进度流
    pub fn subscribe(&self, job_id: &str) -> mpsc::UnboundedReceiver<JobProgress> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscribers
            .entry(job_id.to_string())
            .or_default()
            .push(sender);
        debug!(job_id = %job_id, "新增进度订阅");
        receiver
    }

    /// 某个任务当前的订阅者数量
    pub fn subscriber_count(&self, job_id: &str) -> usize {
        self.subscribers
            .get(job_id)
            .map(|senders| senders.len())
            .unwrap_or(0)
    }
}

impl ProgressSink for ConnectionManager {
    fn publish(&self, progress: &JobProgress) {
        let mut emptied = false;
        if let Some(mut senders) = self.subscribers.get_mut(&progress.job_id) {
            senders.retain(|sender| sender.send(progress.clone()).is_ok());
            emptied = senders.is_empty();
        }
        // 终态或订阅者全部断开后清理条目
        if progress.status.is_terminal() || emptied {
            self.subscribers.remove(&progress.job_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidcast_core::models::JobStatus;

    fn snapshot(job_id: &str, status: JobStatus, progress: u8) -> JobProgress {
        let mut p = JobProgress::pending(job_id);
        p.status = status;
        p.progress = progress;
        p
    }

    #[tokio::test]
    async fn test_subscribe_and_receive() {
        let manager = ConnectionManager::new();
        let mut receiver = manager.subscribe("job-1");

        manager.publish(&snapshot("job-1", JobStatus::GeneratingVideo, 50));
        let received = receiver.recv().await.unwrap();
        assert_eq!(received.status, JobStatus::GeneratingVideo);
        assert_eq!(received.progress, 50);
    }

    #[tokio::test]
    async fn test_publish_to_other_job_is_isolated() {
        let manager = ConnectionManager::new();
        let mut receiver = manager.subscribe("job-1");

        manager.publish(&snapshot("job-2", JobStatus::GeneratingVideo, 50));
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_dropped_receiver_is_pruned() {
        let manager = ConnectionManager::new();
        let receiver = manager.subscribe("job-1");
        assert_eq!(manager.subscriber_count("job-1"), 1);

        drop(receiver);
        manager.publish(&snapshot("job-1", JobStatus::GeneratingVideo, 50));
        assert_eq!(manager.subscriber_count("job-1"), 0);
    }

    #[tokio::test]
    async fn test_terminal_status_cleans_up_entry() {
        let manager = ConnectionManager::new();
        let mut receiver = manager.subscribe("job-1");

        manager.publish(&snapshot("job-1", JobStatus::Completed, 100));
        // 终态快照仍会送达，之后条目被清理
        assert_eq!(receiver.recv().await.unwrap().status, JobStatus::Completed);
        assert_eq!(manager.subscriber_count("job-1"), 0);
    }
}
