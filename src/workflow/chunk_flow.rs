//! 批次处理流程 - 流程层
//!
//! 核心职责：定义"一个批次"的完整处理流程
//!
//! 流程顺序：
//! 1. 构建请求（班级 / 课程上下文 + 两套细则 + 学生目标分）
//! 2. 调用 oracle（带超时）
//! 3. 对每个学生的 P1 / P2 分别运行修正引擎
//!
//! 只处理一次尝试；重试、节奏控制与结果合并由编排层负责。

use fastrand::Rng;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::error::OracleError;
use crate::models::distribution::{Assignment, StudentDistribution};
use crate::models::job::DistributionJob;
use crate::models::rubric::{PerformanceType, ScoreEntry};
use crate::models::student::Student;
use crate::services::distribution::repair;
use crate::services::oracle::{
    OracleContext, OracleRequest, OracleResponse, OracleStudent, ProposedDistribution, ScoreOracle,
};
use crate::workflow::chunk_ctx::ChunkCtx;

/// 批次处理流程
///
/// - 不持有任何可变状态
/// - 只依赖 oracle 能力和修正引擎
pub struct ChunkFlow<'a> {
    oracle: &'a dyn ScoreOracle,
    job: &'a DistributionJob,
}

impl<'a> ChunkFlow<'a> {
    pub fn new(oracle: &'a dyn ScoreOracle, job: &'a DistributionJob) -> Self {
        Self { oracle, job }
    }

    /// 处理一个批次，返回修正后的分配；oracle 失败时返回错误，不产出任何部分结果
    pub async fn run(
        &self,
        ctx: &ChunkCtx,
        students: &[Student],
        rng: &mut Rng,
    ) -> Result<Vec<StudentDistribution>, OracleError> {
        let request = self.build_request(ctx, students);

        info!("{} 📤 请求 oracle，学生 {} 名", ctx, students.len());

        let call = self.oracle.propose(&request);
        let response = tokio::time::timeout(self.job.request_timeout, call)
            .await
            .map_err(|_| OracleError::Timeout {
                seconds: self.job.request_timeout.as_secs(),
            })??;

        debug!(
            "{} oracle 返回 {} 条分配",
            ctx,
            response.distributions.len()
        );

        Ok(self.repair_response(ctx, &request, response, rng))
    }

    /// 构建 oracle 请求；被排除的表现类型目标分为 `None`
    pub fn build_request(&self, ctx: &ChunkCtx, students: &[Student]) -> OracleRequest {
        OracleRequest {
            context: OracleContext {
                class_name: ctx.class_name.clone(),
                lesson_name: ctx.lesson_name.clone(),
            },
            rubrics_p1: self.job.rubrics_p1.clone(),
            rubrics_p2: self.job.rubrics_p2.clone(),
            rounding_rule: self.job.rounding_rule,
            students: students
                .iter()
                .map(|s| OracleStudent {
                    id: s.id.clone(),
                    name: s.name.clone(),
                    prior_exam_scores: s.prior_exam_scores.clone(),
                    target_p1: s.requested_target(PerformanceType::P1),
                    target_p2: s.requested_target(PerformanceType::P2),
                })
                .collect(),
        }
    }

    /// 对 oracle 的每条提议独立修正
    pub fn repair_response(
        &self,
        ctx: &ChunkCtx,
        request: &OracleRequest,
        response: OracleResponse,
        rng: &mut Rng,
    ) -> Vec<StudentDistribution> {
        let mut seen = HashSet::new();
        let mut distributions = Vec::with_capacity(response.distributions.len());

        for proposal in response.distributions {
            if !seen.insert(proposal.student_id.clone()) {
                warn!(
                    "{} ⚠️ oracle 重复返回学生 {}，只保留第一条",
                    ctx, proposal.student_id
                );
                continue;
            }

            match request.find_student(&proposal.student_id) {
                Some(student) => {
                    distributions.push(self.repair_student(ctx, request, student, &proposal, rng));
                }
                None => {
                    warn!(
                        "{} ⚠️ oracle 返回了未知学生 {}，原样保留",
                        ctx, proposal.student_id
                    );
                    distributions.push(pass_through(proposal));
                }
            }
        }

        let missing = request
            .students
            .iter()
            .filter(|s| !seen.contains(&s.id))
            .count();
        if missing > 0 {
            warn!("{} ⚠️ oracle 未返回 {} 名学生的分配", ctx, missing);
        }

        distributions
    }

    fn repair_student(
        &self,
        ctx: &ChunkCtx,
        request: &OracleRequest,
        student: &OracleStudent,
        proposal: &ProposedDistribution,
        rng: &mut Rng,
    ) -> StudentDistribution {
        let mut assignment_for = |perf: PerformanceType| -> Assignment {
            // 被排除、目标分为 0 或没有细则时不分配
            let rubrics = request.rubrics(perf);
            let target = match student.target(perf) {
                Some(t) if t > 0.0 && !rubrics.is_empty() => t,
                _ => return Assignment::excluded(),
            };

            let outcome = repair(
                proposal.scores(perf),
                rubrics,
                Some(target),
                request.rounding_rule,
                rng,
            );
            if outcome.status.is_off_target() {
                warn!(
                    "{} ⚠️ 学生 {} 的 {} 无法精确达到目标 {}: {:?}",
                    ctx, student.id, perf, target, outcome.status
                );
            }
            Assignment::from_outcome(outcome, Some(target))
        };

        let p1 = assignment_for(PerformanceType::P1);
        let p2 = assignment_for(PerformanceType::P2);

        StudentDistribution {
            student_id: student.id.clone(),
            p1,
            p2,
            matched: true,
        }
    }
}

/// 未匹配的学生：不修正，原样保留 oracle 数据
fn pass_through(proposal: ProposedDistribution) -> StudentDistribution {
    let raw = |scores: Vec<ScoreEntry>| Assignment {
        scores,
        ..Assignment::excluded()
    };
    StudentDistribution {
        student_id: proposal.student_id,
        p1: raw(proposal.p1_scores),
        p2: raw(proposal.p2_scores),
        matched: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::distribution::{DistributionReport, RepairStatus};
    use crate::models::rubric::{total_of, RubricCriterion};
    use crate::models::settings::AppSettings;
    use crate::services::report::ReportRenderer;
    use async_trait::async_trait;
    use std::time::Duration;

    struct FixedOracle(OracleResponse);

    #[async_trait]
    impl ScoreOracle for FixedOracle {
        async fn propose(&self, _request: &OracleRequest) -> Result<OracleResponse, OracleError> {
            Ok(self.0.clone())
        }
    }

    struct SlowOracle;

    #[async_trait]
    impl ScoreOracle for SlowOracle {
        async fn propose(&self, _request: &OracleRequest) -> Result<OracleResponse, OracleError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(OracleResponse::default())
        }
    }

    fn job() -> DistributionJob {
        DistributionJob {
            rubrics_p1: vec![
                RubricCriterion::new("a", "A", 50.0),
                RubricCriterion::new("b", "B", 50.0),
            ],
            rubrics_p2: vec![RubricCriterion::new("c", "C", 100.0)],
            rounding_rule: 5,
            batch_size: 40,
            request_delay: Duration::ZERO,
            request_timeout: Duration::from_millis(50),
            max_attempts: 1,
            fallback_class_name: "Sınıf".into(),
            fallback_lesson_name: "Ders".into(),
            seed: Some(1),
        }
    }

    fn ctx() -> ChunkCtx {
        ChunkCtx::new("9/A".into(), "KİMYA".into(), 1, 1, 1)
    }

    fn proposal(id: &str, p1: &[(&str, f64)], p2: &[(&str, f64)]) -> ProposedDistribution {
        let entries = |xs: &[(&str, f64)]| -> Vec<ScoreEntry> {
            xs.iter().map(|(c, s)| ScoreEntry::new(*c, *s)).collect()
        };
        ProposedDistribution {
            student_id: id.to_string(),
            p1_scores: entries(p1),
            p2_scores: entries(p2),
        }
    }

    #[test]
    fn test_request_honors_opt_out() {
        let job = job();
        let oracle = FixedOracle(OracleResponse::default());
        let flow = ChunkFlow::new(&oracle, &job);

        let mut student = Student::new("s1", "Ayşe").with_targets(80.0, 70.0);
        student.distribute_p2 = false;
        student.prior_exam_scores = vec![65.0, 75.0];

        let request = flow.build_request(&ctx(), &[student]);

        assert_eq!(request.context.lesson_name, "KİMYA");
        assert_eq!(request.rounding_rule, 5);
        assert_eq!(request.students[0].target_p1, Some(80.0));
        assert_eq!(request.students[0].target_p2, None);
        assert_eq!(request.students[0].prior_exam_scores, vec![65.0, 75.0]);
    }

    #[tokio::test]
    async fn test_run_repairs_each_performance_type() {
        let job = job();
        let oracle = FixedOracle(OracleResponse {
            distributions: vec![
                proposal("s1", &[("a", 49.0), ("b", 49.0)], &[("c", 10.0)]),
                proposal("ghost", &[("a", 999.0)], &[]),
                proposal("s1", &[("a", 0.0)], &[]),
            ],
        });
        let flow = ChunkFlow::new(&oracle, &job);
        let students = vec![
            Student::new("s1", "Ayşe").with_targets(85.0, 70.0),
            Student::new("s2", "Can").with_targets(50.0, 50.0),
        ];

        let result = flow
            .run(&ctx(), &students, &mut Rng::with_seed(9))
            .await
            .unwrap();

        assert_eq!(result.len(), 2);

        let s1 = &result[0];
        assert!(s1.matched);
        assert_eq!(s1.p1.status, RepairStatus::Exact);
        assert_eq!(total_of(&s1.p1.scores), 85.0);
        assert_eq!(total_of(&s1.p2.scores), 70.0);

        let ghost = &result[1];
        assert!(!ghost.matched);
        assert_eq!(ghost.p1.scores, vec![ScoreEntry::new("a", 999.0)]);
    }

    #[tokio::test]
    async fn test_zero_and_opted_out_targets_yield_empty_mapping() {
        let job = job();
        let oracle = FixedOracle(OracleResponse {
            distributions: vec![
                proposal("s1", &[("a", 999.0), ("b", -40.0)], &[("c", 500.0)]),
                proposal("s2", &[("a", 25.0), ("b", 25.0)], &[]),
            ],
        });
        let flow = ChunkFlow::new(&oracle, &job);

        let mut zero = Student::new("s1", "Ayşe").with_targets(0.0, 80.0);
        zero.student_no = "1".into();
        zero.distribute_p2 = false;
        let mut regular = Student::new("s2", "Can").with_targets(50.0, 0.0);
        regular.student_no = "2".into();
        let students = vec![zero, regular];

        let result = flow
            .run(&ctx(), &students, &mut Rng::with_seed(3))
            .await
            .unwrap();

        assert_eq!(result[0].p1, Assignment::excluded());
        assert_eq!(result[0].p2, Assignment::excluded());
        assert_eq!(total_of(&result[1].p1.scores), 50.0);

        let report = DistributionReport {
            distributions: result,
            total_students: 2,
            ..DistributionReport::default()
        };
        assert!(report.audit(&students).is_empty());

        let settings = AppSettings {
            rubrics_p1: job.rubrics_p1.clone(),
            rubrics_p2: job.rubrics_p2.clone(),
            ..AppSettings::default()
        };
        let out = ReportRenderer::new(&settings)
            .render(&[("9/A · KİMYA".to_string(), students)], &report);

        assert!(!out.contains("999"));
        assert!(!out.contains("500"));
        assert!(!out.contains("(P2)"));
        let zero_row = out.lines().find(|l| l.contains("Ayşe")).unwrap();
        assert!(zero_row.ends_with("| -"), "{}", zero_row);
    }

    #[tokio::test]
    async fn test_empty_rubric_set_yields_empty_mapping() {
        let mut job = job();
        job.rubrics_p2.clear();
        let oracle = FixedOracle(OracleResponse {
            distributions: vec![proposal("s1", &[("a", 25.0), ("b", 25.0)], &[("c", 40.0)])],
        });
        let flow = ChunkFlow::new(&oracle, &job);

        let result = flow
            .run(
                &ctx(),
                &[Student::new("s1", "Ayşe").with_targets(50.0, 40.0)],
                &mut Rng::with_seed(3),
            )
            .await
            .unwrap();

        assert_eq!(result[0].p2, Assignment::excluded());
        assert_eq!(result[0].p1.status, RepairStatus::Exact);
        assert_eq!(result[0].p1.target, Some(50.0));
    }

    #[tokio::test]
    async fn test_slow_oracle_times_out() {
        let job = job();
        let flow = ChunkFlow::new(&SlowOracle, &job);

        let err = flow
            .run(&ctx(), &[Student::new("s1", "x")], &mut Rng::with_seed(1))
            .await
            .unwrap_err();

        assert!(matches!(err, OracleError::Timeout { .. }));
    }
}
