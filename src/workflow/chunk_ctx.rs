//! 批次处理上下文
//!
//! 封装"我正在处理哪个班级 / 课程的第几批"这一信息

use std::fmt::Display;

/// 批次处理上下文
#[derive(Debug, Clone)]
pub struct ChunkCtx {
    pub class_name: String,
    pub lesson_name: String,
    /// 组内批次序号（从 1 开始）
    pub chunk_index: usize,
    /// 全局批次序号（从 1 开始，仅用于日志显示）
    pub chunk_number: usize,
    pub total_chunks: usize,
}

impl ChunkCtx {
    pub fn new(
        class_name: String,
        lesson_name: String,
        chunk_index: usize,
        chunk_number: usize,
        total_chunks: usize,
    ) -> Self {
        Self {
            class_name,
            lesson_name,
            chunk_index,
            chunk_number,
            total_chunks,
        }
    }

    /// 失败记录中使用的批次描述
    pub fn label(&self) -> String {
        format!("{} · {} #{}", self.class_name, self.lesson_name, self.chunk_index)
    }
}

impl Display for ChunkCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[批次 {}/{} {}]",
            self.chunk_number,
            self.total_chunks,
            self.label()
        )
    }
}
