//! 分数生成 oracle 的能力接口
//!
//! oracle 是不可信的外部依赖：它的所有输出都必须经过 [`super::distribution::repair`] 重新校验。

use crate::error::OracleError;
use crate::models::rubric::{PerformanceType, RubricCriterion, ScoreEntry};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// 班级 / 课程上下文
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleContext {
    pub class_name: String,
    pub lesson_name: String,
}

/// 请求中的单个学生
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleStudent {
    pub id: String,
    pub name: String,
    /// 笔试成绩，仅作参考
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prior_exam_scores: Vec<f64>,
    /// `None` 表示该表现类型已被排除
    pub target_p1: Option<f64>,
    pub target_p2: Option<f64>,
}

impl OracleStudent {
    pub fn target(&self, perf: PerformanceType) -> Option<f64> {
        match perf {
            PerformanceType::P1 => self.target_p1,
            PerformanceType::P2 => self.target_p2,
        }
    }
}

/// 一次 oracle 请求（对应一个批次）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleRequest {
    pub context: OracleContext,
    pub rubrics_p1: Vec<RubricCriterion>,
    pub rubrics_p2: Vec<RubricCriterion>,
    pub rounding_rule: u32,
    pub students: Vec<OracleStudent>,
}

impl OracleRequest {
    pub fn rubrics(&self, perf: PerformanceType) -> &[RubricCriterion] {
        match perf {
            PerformanceType::P1 => &self.rubrics_p1,
            PerformanceType::P2 => &self.rubrics_p2,
        }
    }

    pub fn find_student(&self, student_id: &str) -> Option<&OracleStudent> {
        self.students.iter().find(|s| s.id == student_id)
    }
}

/// oracle 为单个学生提议的得分
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedDistribution {
    #[serde(rename = "studentId")]
    pub student_id: String,
    #[serde(default)]
    pub p1_scores: Vec<ScoreEntry>,
    #[serde(default)]
    pub p2_scores: Vec<ScoreEntry>,
}

impl ProposedDistribution {
    pub fn scores(&self, perf: PerformanceType) -> &[ScoreEntry] {
        match perf {
            PerformanceType::P1 => &self.p1_scores,
            PerformanceType::P2 => &self.p2_scores,
        }
    }
}

/// oracle 响应
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OracleResponse {
    pub distributions: Vec<ProposedDistribution>,
}

/// 分数生成能力
///
/// 编排层只依赖这个 trait，测试中可替换为确定性的桩实现
#[async_trait]
pub trait ScoreOracle: Send + Sync {
    async fn propose(&self, request: &OracleRequest) -> Result<OracleResponse, OracleError>;
}
