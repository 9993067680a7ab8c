//! 分配结果模型：修正状态、单个学生的分配、整次任务的报告

use super::rubric::{total_of, PerformanceType, ScoreEntry};
use super::student::Student;
use std::collections::HashMap;
use std::fmt;

/// 修正结果状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairStatus {
    /// 未请求分配（无目标分或提议为空），原样返回
    NotRequested,
    /// 合计已精确等于目标分
    Exact,
    /// 所有细则在所需方向上都已饱和，目标分不可达
    Unreachable { target: i64, achieved: i64 },
    /// 迭代次数耗尽仍未收敛
    BudgetExhausted { target: i64, achieved: i64 },
    /// 目标分不是整数：合计收敛到最接近的整数
    FractionalTarget { achieved: i64 },
}

impl RepairStatus {
    /// 合计是否与目标不符（需要在报表中标记）
    pub fn is_off_target(&self) -> bool {
        matches!(
            self,
            RepairStatus::Unreachable { .. }
                | RepairStatus::BudgetExhausted { .. }
                | RepairStatus::FractionalTarget { .. }
        )
    }
}

/// 修正结果
#[derive(Debug, Clone, PartialEq)]
pub struct RepairOutcome {
    pub scores: Vec<ScoreEntry>,
    pub status: RepairStatus,
}

/// 某个学生某个表现类型的最终得分
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub scores: Vec<ScoreEntry>,
    pub target: Option<f64>,
    pub status: RepairStatus,
}

impl Assignment {
    /// 未请求分配：空映射
    pub fn excluded() -> Self {
        Self {
            scores: Vec::new(),
            target: None,
            status: RepairStatus::NotRequested,
        }
    }

    pub fn from_outcome(outcome: RepairOutcome, target: Option<f64>) -> Self {
        Self {
            scores: outcome.scores,
            target,
            status: outcome.status,
        }
    }

    pub fn total(&self) -> f64 {
        total_of(&self.scores)
    }

    pub fn score_of(&self, criterion_id: &str) -> Option<f64> {
        self.scores
            .iter()
            .find(|s| s.criterion_id == criterion_id)
            .map(|s| s.score)
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// 单个学生的分配结果
#[derive(Debug, Clone, PartialEq)]
pub struct StudentDistribution {
    pub student_id: String,
    pub p1: Assignment,
    pub p2: Assignment,
    /// oracle 返回的 ID 是否与本批次学生匹配；不匹配的条目原样保留、未经修正
    pub matched: bool,
}

impl StudentDistribution {
    pub fn assignment(&self, perf: PerformanceType) -> &Assignment {
        match perf {
            PerformanceType::P1 => &self.p1,
            PerformanceType::P2 => &self.p2,
        }
    }
}

/// 失败批次记录
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkFailure {
    /// 批次描述（班级 / 课程 / 序号）
    pub label: String,
    pub student_ids: Vec<String>,
    pub message: String,
    pub attempts: usize,
}

/// 进度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobProgress {
    pub processed: usize,
    pub total: usize,
}

impl JobProgress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.processed as f64 / self.total as f64
        }
    }

    pub fn percent(&self) -> u32 {
        (self.fraction() * 100.0).round() as u32
    }
}

/// 事后警告
#[derive(Debug, Clone, PartialEq)]
pub enum WarningKind {
    /// 没有产出任何分配
    Missing,
    /// 请求了分配但 oracle 没有给出任何细则得分
    EmptyBreakdown { perf: PerformanceType },
    /// 合计与目标不符
    OffTarget {
        perf: PerformanceType,
        target: i64,
        achieved: i64,
    },
    /// 目标分不是整数，合计只能取最接近的整数
    FractionalTarget {
        perf: PerformanceType,
        target: f64,
        achieved: i64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudentWarning {
    pub student_id: String,
    pub name: String,
    pub kind: WarningKind,
}

impl fmt::Display for StudentWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            WarningKind::Missing => {
                write!(f, "学生 {} ({}) | 未生成分配", self.student_id, self.name)
            }
            WarningKind::EmptyBreakdown { perf } => {
                write!(f, "学生 {} ({}) | {} 没有细则得分", self.student_id, self.name, perf)
            }
            WarningKind::OffTarget {
                perf,
                target,
                achieved,
            } => write!(
                f,
                "学生 {} ({}) | {} 合计 {} 与目标 {} 不符",
                self.student_id, self.name, perf, achieved, target
            ),
            WarningKind::FractionalTarget {
                perf,
                target,
                achieved,
            } => write!(
                f,
                "学生 {} ({}) | {} 目标 {} 不是整数，合计取 {}",
                self.student_id, self.name, perf, target, achieved
            ),
        }
    }
}

/// 整次分配任务的结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistributionReport {
    pub distributions: Vec<StudentDistribution>,
    pub failures: Vec<ChunkFailure>,
    pub total_students: usize,
    /// 任务是否在中途被取消
    pub cancelled: bool,
}

impl DistributionReport {
    pub fn find(&self, student_id: &str) -> Option<&StudentDistribution> {
        self.distributions
            .iter()
            .find(|d| d.student_id == student_id)
    }

    /// 列出没有结果或合计不符的学生
    pub fn audit(&self, students: &[Student]) -> Vec<StudentWarning> {
        let by_id: HashMap<&str, &StudentDistribution> = self
            .distributions
            .iter()
            .map(|d| (d.student_id.as_str(), d))
            .collect();

        let mut warnings = Vec::new();
        for student in students {
            let Some(distribution) = by_id.get(student.id.as_str()) else {
                warnings.push(StudentWarning {
                    student_id: student.id.clone(),
                    name: student.name.clone(),
                    kind: WarningKind::Missing,
                });
                continue;
            };

            for perf in PerformanceType::ALL {
                let assignment = distribution.assignment(perf);
                match assignment.status {
                    RepairStatus::Unreachable { target, achieved }
                    | RepairStatus::BudgetExhausted { target, achieved } => {
                        warnings.push(StudentWarning {
                            student_id: student.id.clone(),
                            name: student.name.clone(),
                            kind: WarningKind::OffTarget {
                                perf,
                                target,
                                achieved,
                            },
                        });
                    }
                    RepairStatus::FractionalTarget { achieved } => {
                        warnings.push(StudentWarning {
                            student_id: student.id.clone(),
                            name: student.name.clone(),
                            kind: WarningKind::FractionalTarget {
                                perf,
                                target: assignment.target.unwrap_or_default(),
                                achieved,
                            },
                        });
                    }
                    RepairStatus::NotRequested if assignment.target.is_some() => {
                        warnings.push(StudentWarning {
                            student_id: student.id.clone(),
                            name: student.name.clone(),
                            kind: WarningKind::EmptyBreakdown { perf },
                        });
                    }
                    RepairStatus::NotRequested | RepairStatus::Exact => {}
                }
            }
        }
        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exact(scores: &[(&str, f64)], target: f64) -> Assignment {
        Assignment {
            scores: scores
                .iter()
                .map(|(id, s)| ScoreEntry::new(*id, *s))
                .collect(),
            target: Some(target),
            status: RepairStatus::Exact,
        }
    }

    #[test]
    fn test_audit_flags_missing_and_short_sums() {
        let students = vec![
            Student::new("s1", "Ayşe").with_targets(40.0, 30.0),
            Student::new("s2", "Mehmet").with_targets(90.0, 30.0),
            Student::new("s3", "Zeynep").with_targets(50.0, 50.0),
        ];
        let report = DistributionReport {
            distributions: vec![
                StudentDistribution {
                    student_id: "s1".into(),
                    p1: exact(&[("a", 20.0), ("b", 20.0)], 40.0),
                    p2: exact(&[("c", 30.0)], 30.0),
                    matched: true,
                },
                StudentDistribution {
                    student_id: "s2".into(),
                    p1: Assignment {
                        scores: vec![ScoreEntry::new("a", 20.0), ScoreEntry::new("b", 20.0)],
                        target: Some(90.0),
                        status: RepairStatus::Unreachable {
                            target: 90,
                            achieved: 40,
                        },
                    },
                    p2: Assignment {
                        scores: Vec::new(),
                        target: Some(30.0),
                        status: RepairStatus::NotRequested,
                    },
                    matched: true,
                },
            ],
            failures: Vec::new(),
            total_students: 3,
            cancelled: false,
        };

        let warnings = report.audit(&students);

        assert_eq!(warnings.len(), 3);
        assert_eq!(
            warnings[0].kind,
            WarningKind::OffTarget {
                perf: PerformanceType::P1,
                target: 90,
                achieved: 40
            }
        );
        assert_eq!(
            warnings[1].kind,
            WarningKind::EmptyBreakdown {
                perf: PerformanceType::P2
            }
        );
        assert_eq!(warnings[2].student_id, "s3");
        assert_eq!(warnings[2].kind, WarningKind::Missing);
        assert!(warnings[0].to_string().contains("P1 合计 40 与目标 90 不符"));
    }

    #[test]
    fn test_audit_flags_fractional_target() {
        let students = vec![Student::new("s1", "Ayşe").with_targets(85.5, 0.0)];
        let report = DistributionReport {
            distributions: vec![StudentDistribution {
                student_id: "s1".into(),
                p1: Assignment {
                    scores: vec![ScoreEntry::new("a", 86.0)],
                    target: Some(85.5),
                    status: RepairStatus::FractionalTarget { achieved: 86 },
                },
                p2: Assignment::excluded(),
                matched: true,
            }],
            total_students: 1,
            ..DistributionReport::default()
        };

        let warnings = report.audit(&students);

        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].to_string().contains("P1 目标 85.5 不是整数，合计取 86"));
    }

    #[test]
    fn test_progress_fraction() {
        let progress = JobProgress {
            processed: 20,
            total: 60,
        };
        assert!((progress.fraction() - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(progress.percent(), 33);
        assert_eq!(
            JobProgress {
                processed: 0,
                total: 0
            }
            .fraction(),
            1.0
        );
    }
}
