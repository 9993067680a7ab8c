use anyhow::Result;
/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use std::fs;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::models::distribution::DistributionReport;
use crate::workflow::ChunkCtx;

/// 初始化 tracing 日志
///
/// 优先使用 `RUST_LOG`，否则按 `verbose` 选择 debug / info
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 初始化日志文件
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n成绩分配日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 成绩细则分配");
    info!("🤖 模型: {}", config.llm_model_name);
    info!(
        "📊 每批学生数: {} | 请求间隔: {} ms | 超时: {} s",
        config.batch_size, config.request_delay_ms, config.request_timeout_secs
    );
    info!("{}", "=".repeat(60));
}

/// 记录批次开始信息
pub fn log_batch_start(ctx: &ChunkCtx, start: usize, end: usize, total: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始处理 {}", ctx);
    info!("📄 本批学生: {}-{} / 共 {} 名", start, end, total);
    info!("{}", "=".repeat(60));
}

/// 记录批次完成信息
pub fn log_batch_complete(ctx: &ChunkCtx, produced: usize, total: usize) {
    info!("\n{}", "─".repeat(60));
    info!("✓ {} 完成: 生成 {}/{}", ctx, produced, total);
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
pub fn print_final_stats(report: &DistributionReport, warnings: usize, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!(
        "✅ 生成分配: {}/{}",
        report.distributions.len(),
        report.total_students
    );
    info!("❌ 失败批次: {}", report.failures.len());
    info!("⚠️ 警告: {}", warnings);
    if report.cancelled {
        info!("⏹️ 任务被取消，结果不完整");
    }
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
