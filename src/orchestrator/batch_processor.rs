//! 批量分配处理器 - 编排层
//!
//! ## 职责
//!
//! 驱动 oracle 处理成百上千名学生，是分配任务的"指挥中心"。
//!
//! ## 核心功能
//!
//! 1. **输入校验**：细则、粒度、学生列表不合法时直接终止
//! 2. **分组分批**：按 (班级, 课程) 分组，组内按固定大小切批
//! 3. **串行调度**：一次只发一个请求，第一次之后每次请求前等待固定间隔
//! 4. **容错**：单个批次失败只记录，继续处理后续批次
//! 5. **结果合并**：批次完全成功后才整体并入结果
//! 6. **进度上报**：每个批次结束后上报已处理学生比例
//!
//! 所有批次都没有产出结果时，任务失败并返回最近一次失败的错误信息。

use crate::error::{AppError, AppResult, DistributionError, InputError};
use crate::models::distribution::{ChunkFailure, DistributionReport, JobProgress};
use crate::models::job::DistributionJob;
use crate::models::rubric::{PerformanceType, RubricCriterion};
use crate::models::student::Student;
use crate::orchestrator::cancel::CancelSignal;
use crate::orchestrator::grouping::{plan_chunks, GroupKey};
use crate::services::oracle::ScoreOracle;
use crate::utils::logging::{log_batch_complete, log_batch_start};
use crate::workflow::{ChunkCtx, ChunkFlow};
use fastrand::Rng;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, warn};

/// 所有批次都失败且没有捕获到错误信息时的提示
pub const GENERIC_FAILURE_MESSAGE: &str = "分配失败：没有生成任何数据";

/// 批量分配处理器
pub struct BatchProcessor {
    oracle: Arc<dyn ScoreOracle>,
    job: DistributionJob,
}

impl BatchProcessor {
    pub fn new(oracle: Arc<dyn ScoreOracle>, job: DistributionJob) -> Self {
        Self { oracle, job }
    }

    /// 运行分配任务
    ///
    /// # 参数
    /// - `students`: 全部学生
    /// - `cancel`: 取消信号，在批次之间检查
    /// - `on_progress`: 每个批次结束后调用（无论成功与否）
    ///
    /// # 返回
    /// 至少一个批次产出结果时返回（可能不完整的）报告
    pub async fn run<F>(
        &self,
        students: &[Student],
        cancel: &CancelSignal,
        mut on_progress: F,
    ) -> AppResult<DistributionReport>
    where
        F: FnMut(JobProgress),
    {
        validate(students, &self.job)?;

        let fallback = GroupKey::new(
            self.job.fallback_class_name.clone(),
            self.job.fallback_lesson_name.clone(),
        );
        let chunks = plan_chunks(students, self.job.batch_size, &fallback);
        let total_chunks = chunks.len();
        let total_students = students.len();

        info!(
            "📋 共 {} 名学生，分为 {} 个批次（每批最多 {} 名）",
            total_students, total_chunks, self.job.batch_size
        );

        let flow = ChunkFlow::new(self.oracle.as_ref(), &self.job);
        let mut rng = match self.job.seed {
            Some(seed) => Rng::with_seed(seed),
            None => Rng::new(),
        };

        let mut report = DistributionReport {
            total_students,
            ..DistributionReport::default()
        };
        let mut processed = 0;
        let mut requests_sent = 0;
        let mut last_error: Option<String> = None;

        'chunks: for (index, chunk) in chunks.iter().enumerate() {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let ctx = ChunkCtx::new(
                chunk.key.class_name.clone(),
                chunk.key.lesson_name.clone(),
                chunk.chunk_index,
                index + 1,
                total_chunks,
            );
            log_batch_start(&ctx, processed + 1, processed + chunk.students.len(), total_students);

            let mut outcome = None;
            let mut attempts = 0;
            let mut chunk_error = None;

            while attempts < self.job.max_attempts {
                if requests_sent > 0 && self.pace(cancel).await {
                    report.cancelled = true;
                    break 'chunks;
                }
                attempts += 1;
                requests_sent += 1;

                match flow.run(&ctx, &chunk.students, &mut rng).await {
                    Ok(distributions) => {
                        outcome = Some(distributions);
                        break;
                    }
                    Err(e) => {
                        warn!(
                            "{} ⚠️ 第 {}/{} 次尝试失败: {}",
                            ctx, attempts, self.job.max_attempts, e
                        );
                        chunk_error = Some(e);
                    }
                }
            }

            match outcome {
                Some(distributions) => {
                    log_batch_complete(&ctx, distributions.len(), chunk.students.len());
                    report.distributions.extend(distributions);
                }
                None => {
                    let message = chunk_error
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string());
                    error!("{} ❌ 批次失败，继续处理后续批次: {}", ctx, message);
                    report.failures.push(ChunkFailure {
                        label: ctx.label(),
                        student_ids: chunk.students.iter().map(|s| s.id.clone()).collect(),
                        message: message.clone(),
                        attempts,
                    });
                    last_error = Some(message);
                }
            }

            processed += chunk.students.len();
            on_progress(JobProgress {
                processed,
                total: total_students,
            });
        }

        if report.cancelled {
            warn!("⏹️ 任务已取消，已处理 {}/{} 名学生", processed, total_students);
        }

        if report.distributions.is_empty() {
            if report.cancelled {
                return Err(DistributionError::Cancelled.into());
            }
            return Err(DistributionError::NothingProduced {
                message: last_error.unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string()),
            }
            .into());
        }

        Ok(report)
    }

    /// 请求间隔；等待期间被取消时返回 `true`
    async fn pace(&self, cancel: &CancelSignal) -> bool {
        if self.job.request_delay.is_zero() {
            return cancel.is_cancelled();
        }
        tokio::select! {
            _ = tokio::time::sleep(self.job.request_delay) => false,
            _ = cancel.cancelled() => true,
        }
    }
}

/// 输入校验：不合法时不发起任何请求
fn validate(students: &[Student], job: &DistributionJob) -> AppResult<()> {
    if students.is_empty() {
        return Err(InputError::NoStudents.into());
    }
    if job.rounding_rule == 0 {
        return Err(InputError::InvalidRoundingRule {
            value: job.rounding_rule,
        }
        .into());
    }
    if job.batch_size == 0 {
        return Err(InputError::InvalidBatchSize.into());
    }
    if job.max_attempts == 0 {
        return Err(AppError::Other("每个批次至少尝试一次".to_string()));
    }
    for perf in PerformanceType::ALL {
        validate_rubrics(job.rubrics(perf))?;
    }

    let mut ids = HashSet::new();
    for student in students {
        if !ids.insert(student.id.as_str()) {
            return Err(InputError::DuplicateStudent {
                student_id: student.id.clone(),
            }
            .into());
        }
    }
    Ok(())
}

fn validate_rubrics(rubrics: &[RubricCriterion]) -> AppResult<()> {
    let mut ids = HashSet::new();
    for rubric in rubrics {
        // 修正引擎在整数域内工作
        if !(rubric.max_score > 0.0) || rubric.max_score.fract() != 0.0 {
            return Err(InputError::InvalidMaxScore {
                criterion_id: rubric.id.clone(),
                max_score: rubric.max_score,
            }
            .into());
        }
        if !ids.insert(rubric.id.as_str()) {
            return Err(InputError::DuplicateCriterion {
                criterion_id: rubric.id.clone(),
            }
            .into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::settings::AppSettings;
    use std::time::Duration;

    fn job() -> DistributionJob {
        let settings = AppSettings::default();
        DistributionJob {
            rubrics_p1: settings.rubrics_p1,
            rubrics_p2: settings.rubrics_p2,
            rounding_rule: 5,
            batch_size: 20,
            request_delay: Duration::ZERO,
            request_timeout: Duration::from_secs(1),
            max_attempts: 1,
            fallback_class_name: "Sınıf".into(),
            fallback_lesson_name: "Ders".into(),
            seed: Some(1),
        }
    }

    #[test]
    fn test_validate_rejects_malformed_input() {
        let student = Student::new("s1", "x").with_targets(50.0, 50.0);

        assert!(matches!(
            validate(&[], &job()),
            Err(AppError::Input(InputError::NoStudents))
        ));

        let zero_rule = DistributionJob {
            rounding_rule: 0,
            ..job()
        };
        assert!(validate(&[student.clone()], &zero_rule).is_err());

        let mut bad_max = job();
        bad_max.rubrics_p2[0].max_score = 0.0;
        assert!(matches!(
            validate(&[student.clone()], &bad_max),
            Err(AppError::Input(InputError::InvalidMaxScore { .. }))
        ));

        let mut fractional_max = job();
        fractional_max.rubrics_p1[0].max_score = 12.5;
        assert!(matches!(
            validate(&[student.clone()], &fractional_max),
            Err(AppError::Input(InputError::InvalidMaxScore { .. }))
        ));

        let mut dup_criterion = job();
        dup_criterion.rubrics_p1[1].id = "p1_1".into();
        assert!(matches!(
            validate(&[student.clone()], &dup_criterion),
            Err(AppError::Input(InputError::DuplicateCriterion { .. }))
        ));

        assert!(matches!(
            validate(&[student.clone(), student.clone()], &job()),
            Err(AppError::Input(InputError::DuplicateStudent { .. }))
        ));

        assert!(validate(&[student], &job()).is_ok());
    }
}
