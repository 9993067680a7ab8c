//! 报表渲染 - 业务能力层
//!
//! 把最终得分排成"学生 × 细则 + 合计"的文本表格，每个班级 / 课程一张

use crate::models::distribution::{Assignment, DistributionReport};
use crate::models::rubric::{PerformanceType, RubricCriterion};
use crate::models::settings::AppSettings;
use crate::models::student::Student;
use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::path::Path;

const MISSING_CELL: &str = "-";
const OFF_TARGET_MARK: &str = " *";

/// 报表渲染器
pub struct ReportRenderer<'a> {
    settings: &'a AppSettings,
}

impl<'a> ReportRenderer<'a> {
    pub fn new(settings: &'a AppSettings) -> Self {
        Self { settings }
    }

    /// 渲染所有班级的报表
    ///
    /// `groups` 为 (标题, 学生列表)，顺序即输出顺序
    pub fn render(&self, groups: &[(String, Vec<Student>)], report: &DistributionReport) -> String {
        let mut out = String::new();
        for (title, students) in groups {
            for perf in PerformanceType::ALL {
                if students.iter().all(|s| s.requested_target(perf).is_none()) {
                    continue;
                }
                out.push_str(&self.render_table(title, perf, students, report));
                out.push('\n');
            }
        }
        out.push_str(&self.render_footer());
        out
    }

    /// 渲染一张表：一个班级 / 课程的一个表现类型
    pub fn render_table(
        &self,
        title: &str,
        perf: PerformanceType,
        students: &[Student],
        report: &DistributionReport,
    ) -> String {
        let rubrics = self.settings.rubrics(perf);

        let mut header = vec!["No".to_string(), "Ad Soyad".to_string()];
        header.extend(rubrics.iter().map(|r| r.label.clone()));
        header.push("Toplam".to_string());

        let rows: Vec<Vec<String>> = students
            .iter()
            .map(|student| {
                let assignment = report.find(&student.id).map(|d| d.assignment(perf));
                row_for(student, rubrics, assignment)
            })
            .collect();

        let widths: Vec<usize> = (0..header.len())
            .map(|col| {
                std::iter::once(&header)
                    .chain(rows.iter())
                    .map(|row| row[col].chars().count())
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} - {} ({})",
            title,
            self.settings.performance_name(perf),
            perf
        );
        let _ = writeln!(out, "{}", format_row(&header, &widths));
        let _ = writeln!(
            out,
            "{}",
            widths
                .iter()
                .map(|w| "-".repeat(*w))
                .collect::<Vec<_>>()
                .join("-+-")
        );
        for row in &rows {
            let _ = writeln!(out, "{}", format_row(row, &widths));
        }
        out
    }

    fn render_footer(&self) -> String {
        let s = self.settings;
        let mut out = String::new();
        if !s.teacher_name.is_empty() {
            let _ = writeln!(out, "Ders Öğretmeni: {} {}", s.teacher_name, s.teacher_branch);
        }
        if !s.principal_name.is_empty() {
            let _ = writeln!(out, "Okul Müdürü: {}", s.principal_name);
        }
        let _ = writeln!(out, "({} 标记的行合计与目标分不符)", OFF_TARGET_MARK.trim());
        out
    }
}

/// 一行：缺失的细则按 0 显示，合计取所输出分配的总和
fn row_for(
    student: &Student,
    rubrics: &[RubricCriterion],
    assignment: Option<&Assignment>,
) -> Vec<String> {
    let mut row = vec![student.student_no.clone(), student.name.clone()];

    match assignment.filter(|a| !a.is_empty()) {
        Some(assignment) => {
            row.extend(
                rubrics
                    .iter()
                    .map(|r| format_score(assignment.score_of(&r.id).unwrap_or(0.0))),
            );
            let mut total = format_score(assignment.total());
            if assignment.status.is_off_target() {
                total.push_str(OFF_TARGET_MARK);
            }
            row.push(total);
        }
        None => {
            row.extend(rubrics.iter().map(|_| MISSING_CELL.to_string()));
            row.push(MISSING_CELL.to_string());
        }
    }
    row
}

fn format_row(cells: &[String], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect::<Vec<_>>()
        .join(" | ")
        .trim_end()
        .to_string()
}

fn format_score(score: f64) -> String {
    if score.fract() == 0.0 {
        format!("{}", score as i64)
    } else {
        format!("{:.2}", score)
    }
}

/// 写出报表文件
pub fn write_report(path: impl AsRef<Path>, content: &str) -> Result<()> {
    let path = path.as_ref();
    std::fs::write(path, content)
        .with_context(|| format!("无法写入报表文件: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::distribution::{RepairStatus, StudentDistribution};
    use crate::models::rubric::ScoreEntry;

    fn settings() -> AppSettings {
        AppSettings {
            rubrics_p1: vec![
                RubricCriterion::new("a", "Katılım", 50.0),
                RubricCriterion::new("b", "Ödev", 50.0),
            ],
            rubrics_p2: vec![RubricCriterion::new("c", "Proje", 100.0)],
            teacher_name: "Elif".to_string(),
            ..AppSettings::default()
        }
    }

    fn student(no: &str, name: &str, p1: f64) -> Student {
        let mut s = Student::new(format!("{}-X", no), name).with_targets(p1, 0.0);
        s.student_no = no.to_string();
        s.distribute_p2 = false;
        s
    }

    #[test]
    fn test_table_fills_missing_criteria_and_marks_short_totals() {
        let settings = settings();
        let students = vec![
            student("1", "Ayşe", 85.0),
            student("2", "Mehmet", 100.0),
            student("3", "Zeynep", 60.0),
        ];
        let report = DistributionReport {
            distributions: vec![
                StudentDistribution {
                    student_id: "1-X".into(),
                    p1: Assignment {
                        scores: vec![ScoreEntry::new("a", 85.0)],
                        target: Some(85.0),
                        status: RepairStatus::Exact,
                    },
                    p2: Assignment::excluded(),
                    matched: true,
                },
                StudentDistribution {
                    student_id: "2-X".into(),
                    p1: Assignment {
                        scores: vec![ScoreEntry::new("a", 50.0), ScoreEntry::new("b", 45.0)],
                        target: Some(100.0),
                        status: RepairStatus::BudgetExhausted {
                            target: 100,
                            achieved: 95,
                        },
                    },
                    p2: Assignment::excluded(),
                    matched: true,
                },
            ],
            total_students: 3,
            ..DistributionReport::default()
        };

        let out = ReportRenderer::new(&settings)
            .render(&[("9/A · KİMYA".to_string(), students)], &report);

        assert!(out.contains("9/A · KİMYA - Derse Hazırlık ve Katılım (P1)"));
        assert!(!out.contains("(P2)"));
        assert!(out.contains("1  | Ayşe     | 85      | 0    | 85"));
        assert!(out.contains("| 95 *"));
        assert!(out.contains("3  | Zeynep   | -       | -    | -"));
        assert!(out.contains("Ders Öğretmeni: Elif"));
    }

    #[test]
    fn test_format_score() {
        assert_eq!(format_score(15.0), "15");
        assert_eq!(format_score(7.5), "7.50");
    }
}
