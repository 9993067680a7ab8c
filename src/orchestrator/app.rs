//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：日志文件、LLM 客户端、设置存储
//! 2. **加载输入**：扫描成绩单目录，展开为学生列表
//! 3. **运行任务**：交给 [`BatchProcessor`]，Ctrl-C 触发取消
//! 4. **收尾输出**：审计警告、warn.txt、报表文件、最终统计

use crate::config::Config;
use crate::models::distribution::DistributionReport;
use crate::models::job::DistributionJob;
use crate::models::load_all_class_sheets;
use crate::models::student::Student;
use crate::orchestrator::batch_processor::BatchProcessor;
use crate::orchestrator::cancel::CancelSignal;
use crate::orchestrator::grouping::{group_students, GroupKey};
use crate::services::oracle::ScoreOracle;
use crate::services::report::{write_report, ReportRenderer};
use crate::services::settings_store::{load_or_init, SettingsStore, TomlSettingsStore};
use crate::services::{LlmService, WarnWriter};
use crate::utils::logging::{init_log_file, log_startup, print_final_stats};
use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

/// 应用主结构
pub struct App {
    config: Config,
    oracle: Arc<dyn ScoreOracle>,
    settings_store: Box<dyn SettingsStore>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        config.validate()?;

        // 初始化日志文件
        init_log_file(&config.output_log_file)?;

        log_startup(&config);

        let oracle = Arc::new(LlmService::new(&config)?);
        let settings_store = Box::new(TomlSettingsStore::new(&config.settings_dir));

        Ok(Self::with_collaborators(config, oracle, settings_store))
    }

    /// 使用外部提供的 oracle 和设置存储创建应用
    pub fn with_collaborators(
        config: Config,
        oracle: Arc<dyn ScoreOracle>,
        settings_store: Box<dyn SettingsStore>,
    ) -> Self {
        Self {
            config,
            oracle,
            settings_store,
        }
    }

    /// 运行应用主逻辑
    ///
    /// 没有找到任何学生时返回 `Ok(None)`
    pub async fn run(&self) -> Result<Option<DistributionReport>> {
        let students = self.load_students().await?;

        if students.is_empty() {
            warn!("⚠️ 没有找到待处理的成绩单，程序结束");
            return Ok(None);
        }

        let settings = load_or_init(self.settings_store.as_ref(), &self.config.user_id).await?;
        let job = DistributionJob::new(&settings, &self.config);
        let fallback = GroupKey::new(
            job.fallback_class_name.clone(),
            job.fallback_lesson_name.clone(),
        );
        let processor = BatchProcessor::new(self.oracle.clone(), job);

        let (handle, signal) = CancelSignal::pair();
        let ctrl_c = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("⏹️ 收到中断信号，当前批次结束后停止");
                handle.cancel();
            }
        });

        let result = processor
            .run(&students, &signal, |progress| {
                info!(
                    "⏳ 进度: {}% ({}/{})",
                    progress.percent(),
                    progress.processed,
                    progress.total
                );
            })
            .await;
        ctrl_c.abort();
        let report = result?;

        let warnings = report.audit(&students);
        for warning in &warnings {
            warn!("⚠️ {}", warning);
        }
        WarnWriter::with_path(&self.config.warn_file).write(&warnings, &report.failures)?;

        let groups: Vec<(String, Vec<Student>)> = group_students(&students, &fallback)
            .into_iter()
            .map(|(key, members)| (key.to_string(), members))
            .collect();
        let content = ReportRenderer::new(&settings).render(&groups, &report);
        write_report(&self.config.report_file, &content)?;
        info!("📄 报表已写入: {}", self.config.report_file);

        print_final_stats(&report, warnings.len(), &self.config.output_log_file);

        Ok(Some(report))
    }

    /// 加载所有成绩单并展开为学生
    async fn load_students(&self) -> Result<Vec<Student>> {
        info!("\n📁 正在扫描成绩单目录: {}", self.config.input_folder);
        let sheets = load_all_class_sheets(&self.config.input_folder).await?;
        Ok(sheets.iter().flat_map(|sheet| sheet.to_students()).collect())
    }
}
