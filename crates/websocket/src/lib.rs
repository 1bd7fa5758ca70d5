//! 进度推送通道
//!
//! 按 job_id 管理订阅者，编排器每次状态更新都会推送一份进度快照。
//! 推送是尽力而为：发送失败的订阅者直接移除，不影响任务执行；
//! 任务进入终态后清理订阅列表。

mod manager;

pub use manager::ConnectionManager;
