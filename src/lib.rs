//! # Grade Distributor
//!
//! 把学生的表现总分拆分到各项评分细则上的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 数据模型层（Models）
//! - `models/` - 细则、学生、设置、分配结果，以及成绩单加载
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `repair` - 把 oracle 的建议修复到合法且合计正确
//! - `LlmService` - 作为 oracle 提出初始分配
//! - `SettingsStore` - 按用户读写设置
//! - `ReportRenderer` / `WarnWriter` - 输出报表和警告
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个批次"的完整处理流程
//! - `ChunkCtx` - 上下文封装（班级 + 课程 + 批次序号）
//! - `ChunkFlow` - 流程编排（构建请求 → oracle → 修复）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/app` - 应用入口，管理输入输出
//! - `orchestrator/batch_processor` - 分组分批、串行调度、容错
//!
//! ## 模块结构

pub mod config;
pub mod error;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{DistributionJob, DistributionReport, PerformanceType, RubricCriterion, Student};
pub use orchestrator::{App, BatchProcessor, CancelHandle, CancelSignal};
pub use services::{repair, ScoreOracle};
pub use workflow::{ChunkCtx, ChunkFlow};
