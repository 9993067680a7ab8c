//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责分组分批和流程调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `app` - 应用入口
//! - 管理应用生命周期（初始化、运行、收尾）
//! - 加载成绩单和用户设置
//! - 审计结果，写出 warn.txt 与报表
//!
//! ### `batch_processor` - 批量分配处理器
//! - 输入校验
//! - 串行调度批次，控制请求间隔
//! - 容忍部分失败，合并结果，上报进度
//!
//! ### `grouping` - 分组与分批
//! - 按 (班级, 课程) 分组，组内切成固定大小的批次
//!
//! ### `cancel` - 取消信号
//! - 在批次之间（以及请求间隔中）响应取消
//!
//! ## 层次关系
//!
//! ```text
//! app (成绩单 → 学生 → 报表)
//!     ↓
//! batch_processor (处理 Vec<StudentChunk>)
//!     ↓
//! workflow::ChunkFlow (处理单个批次)
//!     ↓
//! services (能力层：oracle / repair / report / warn)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：app 管输入输出，batch_processor 管调度
//! 2. **向下依赖**：编排层 → workflow → services → models
//! 3. **无业务逻辑**：得分修复在 services，这里只做调度和统计

pub mod app;
pub mod batch_processor;
pub mod cancel;
pub mod grouping;

// 重新导出主要类型
pub use app::App;
pub use batch_processor::BatchProcessor;
pub use cancel::{CancelHandle, CancelSignal};
pub use grouping::{group_students, plan_chunks, GroupKey, StudentChunk};
