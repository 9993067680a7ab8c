//! 评分细则（Rubric）相关的数据模型

use serde::{Deserialize, Serialize};
use std::fmt;

/// 未知细则 ID 的默认满分
pub const DEFAULT_MAX_SCORE: f64 = 100.0;

/// 单条评分细则
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RubricCriterion {
    /// 细则 ID（在同一细则集合内唯一）
    pub id: String,
    /// 显示名称
    pub label: String,
    /// 满分（> 0）
    pub max_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RubricCriterion {
    pub fn new(id: impl Into<String>, label: impl Into<String>, max_score: f64) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            max_score,
            description: None,
        }
    }
}

/// 按 ID 查找细则的满分，找不到时返回 [`DEFAULT_MAX_SCORE`]
pub fn max_score_of(rubrics: &[RubricCriterion], criterion_id: &str) -> f64 {
    rubrics
        .iter()
        .find(|r| r.id == criterion_id)
        .map(|r| r.max_score)
        .unwrap_or(DEFAULT_MAX_SCORE)
}

/// 一条细则得分
///
/// 兼容 oracle 返回的 `rubricId` 字段名。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreEntry {
    #[serde(alias = "rubricId")]
    pub criterion_id: String,
    pub score: f64,
}

impl ScoreEntry {
    pub fn new(criterion_id: impl Into<String>, score: f64) -> Self {
        Self {
            criterion_id: criterion_id.into(),
            score,
        }
    }
}

/// 得分合计
pub fn total_of(scores: &[ScoreEntry]) -> f64 {
    scores.iter().map(|s| s.score).sum()
}

/// 表现类型（P1 / P2）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PerformanceType {
    P1,
    P2,
}

impl PerformanceType {
    pub const ALL: [PerformanceType; 2] = [PerformanceType::P1, PerformanceType::P2];
}

impl fmt::Display for PerformanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PerformanceType::P1 => write!(f, "P1"),
            PerformanceType::P2 => write!(f, "P2"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_score_falls_back_for_unknown_id() {
        let rubrics = vec![RubricCriterion::new("a", "A", 20.0)];
        assert_eq!(max_score_of(&rubrics, "a"), 20.0);
        assert_eq!(max_score_of(&rubrics, "zzz"), DEFAULT_MAX_SCORE);
    }

    #[test]
    fn test_score_entry_accepts_rubric_id_alias() {
        let entry: ScoreEntry = serde_json::from_str(r#"{"rubricId":"p1_1","score":15}"#).unwrap();
        assert_eq!(entry, ScoreEntry::new("p1_1", 15.0));

        let entry: ScoreEntry =
            serde_json::from_str(r#"{"criterionId":"p1_2","score":7.5}"#).unwrap();
        assert_eq!(entry.criterion_id, "p1_2");
    }
}
