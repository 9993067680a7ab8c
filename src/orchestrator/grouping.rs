//! 分组与分批
//!
//! 纯数据划分：学生列表 → 按 (班级, 课程) 分组 → 每组切成固定大小的批次。
//! 一个批次只包含同一组的学生，保证 oracle 每次收到的上下文是单一的。

use crate::models::student::Student;
use std::collections::HashMap;
use std::fmt;

/// 分组键：(班级, 课程)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    pub class_name: String,
    pub lesson_name: String,
}

impl GroupKey {
    pub fn new(class_name: impl Into<String>, lesson_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            lesson_name: lesson_name.into(),
        }
    }

    /// 学生所属的组；缺失的班级 / 课程使用 `fallback`
    pub fn of(student: &Student, fallback: &GroupKey) -> Self {
        Self {
            class_name: student
                .class_name
                .clone()
                .unwrap_or_else(|| fallback.class_name.clone()),
            lesson_name: student
                .lesson_name
                .clone()
                .unwrap_or_else(|| fallback.lesson_name.clone()),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} · {}", self.class_name, self.lesson_name)
    }
}

/// 一个批次
#[derive(Debug, Clone, PartialEq)]
pub struct StudentChunk {
    pub key: GroupKey,
    /// 组序号（从 1 开始）
    pub group_index: usize,
    /// 组内批次序号（从 1 开始）
    pub chunk_index: usize,
    pub students: Vec<Student>,
}

/// 按 (班级, 课程) 分组，组的顺序为首次出现的顺序，组内保持原顺序
pub fn group_students(students: &[Student], fallback: &GroupKey) -> Vec<(GroupKey, Vec<Student>)> {
    let mut groups: Vec<(GroupKey, Vec<Student>)> = Vec::new();
    let mut index: HashMap<GroupKey, usize> = HashMap::new();

    for student in students {
        let key = GroupKey::of(student, fallback);
        match index.get(&key) {
            Some(&i) => groups[i].1.push(student.clone()),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push((key, vec![student.clone()]));
            }
        }
    }
    groups
}

/// 分组后按 `batch_size` 切批
pub fn plan_chunks(students: &[Student], batch_size: usize, fallback: &GroupKey) -> Vec<StudentChunk> {
    let batch_size = batch_size.max(1);

    group_students(students, fallback)
        .into_iter()
        .enumerate()
        .flat_map(|(g, (key, members))| {
            members
                .chunks(batch_size)
                .enumerate()
                .map(|(c, chunk)| StudentChunk {
                    key: key.clone(),
                    group_index: g + 1,
                    chunk_index: c + 1,
                    students: chunk.to_vec(),
                })
                .collect::<Vec<_>>()
        })
        .collect()
}
