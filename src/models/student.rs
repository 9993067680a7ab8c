//! 学生与班级成绩单模型

use super::rubric::PerformanceType;
use serde::{Deserialize, Deserializer, Serialize};

/// 成绩单的班级元信息
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassMetadata {
    #[serde(default)]
    pub school_name: String,
    #[serde(default)]
    pub academic_year: String,
    #[serde(default)]
    pub class_name: String,
    #[serde(default)]
    pub lesson_name: String,
}

/// 成绩单中的一行（解析器输出）
///
/// 缺失、非数字或"免考"一类的单元格一律按 0 处理
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetStudent {
    #[serde(default, deserialize_with = "deserialize_text")]
    pub student_no: String,
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_lenient_number")]
    pub p1: f64,
    #[serde(default, deserialize_with = "deserialize_lenient_number")]
    pub p2: f64,
    /// 笔试成绩（仅作参考信息）
    #[serde(default, deserialize_with = "deserialize_lenient_number")]
    pub y1: f64,
    #[serde(default, deserialize_with = "deserialize_lenient_number")]
    pub y2: f64,
    #[serde(default = "default_true")]
    pub distribute_p1: bool,
    #[serde(default = "default_true")]
    pub distribute_p2: bool,
}

/// 一页成绩单 = 一个班级的一门课
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassSheet {
    #[serde(default)]
    pub metadata: ClassMetadata,
    #[serde(default)]
    pub students: Vec<SheetStudent>,
    #[serde(skip_serializing, skip_deserializing)]
    pub file_path: Option<String>,
}

impl ClassSheet {
    /// 展开为核心使用的学生列表
    ///
    /// 学生 ID 由 `学号-课程-班级` 组成，同一学号在不同课程中不会冲突
    pub fn to_students(&self) -> Vec<Student> {
        let meta = &self.metadata;
        self.students
            .iter()
            .map(|s| Student {
                id: format!("{}-{}-{}", s.student_no, meta.lesson_name, meta.class_name),
                student_no: s.student_no.clone(),
                name: s.name.clone(),
                class_name: non_empty(&meta.class_name),
                lesson_name: non_empty(&meta.lesson_name),
                prior_exam_scores: vec![s.y1, s.y2],
                p1: Some(s.p1),
                p2: Some(s.p2),
                distribute_p1: s.distribute_p1,
                distribute_p2: s.distribute_p2,
            })
            .collect()
    }
}

/// 参与分配的学生
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    #[serde(default)]
    pub student_no: String,
    pub name: String,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub lesson_name: Option<String>,
    #[serde(default)]
    pub prior_exam_scores: Vec<f64>,
    #[serde(default)]
    pub p1: Option<f64>,
    #[serde(default)]
    pub p2: Option<f64>,
    #[serde(default = "default_true")]
    pub distribute_p1: bool,
    #[serde(default = "default_true")]
    pub distribute_p2: bool,
}

impl Student {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            student_no: String::new(),
            name: name.into(),
            class_name: None,
            lesson_name: None,
            prior_exam_scores: Vec::new(),
            p1: None,
            p2: None,
            distribute_p1: true,
            distribute_p2: true,
        }
    }

    pub fn with_context(mut self, class_name: &str, lesson_name: &str) -> Self {
        self.class_name = Some(class_name.to_string());
        self.lesson_name = Some(lesson_name.to_string());
        self
    }

    pub fn with_targets(mut self, p1: f64, p2: f64) -> Self {
        self.p1 = Some(p1);
        self.p2 = Some(p2);
        self
    }

    /// 请求给 oracle 的目标分；被排除或目标分为 0 的表现类型返回 `None`
    pub fn requested_target(&self, perf: PerformanceType) -> Option<f64> {
        let target = match perf {
            PerformanceType::P1 if self.distribute_p1 => self.p1,
            PerformanceType::P2 if self.distribute_p2 => self.p2,
            _ => None,
        };
        target.filter(|t| *t > 0.0)
    }
}

fn default_true() -> bool {
    true
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// 成绩单单元格：数字、数字字符串或其他任何值（按 0 处理）
fn deserialize_lenient_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = toml::Value::deserialize(deserializer)?;
    Ok(match value {
        toml::Value::Integer(i) => i as f64,
        toml::Value::Float(f) if f.is_finite() => f,
        toml::Value::String(s) => s.trim().replace(',', ".").parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    })
}

// 学号可能写成数字也可能写成字符串
fn deserialize_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = toml::Value::deserialize(deserializer)?;
    Ok(match value {
        toml::Value::String(s) => s,
        toml::Value::Integer(i) => i.to_string(),
        other => other.to_string(),
    })
}
