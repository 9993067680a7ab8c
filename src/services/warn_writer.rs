//! 警告写入服务 - 业务能力层
//!
//! 只负责"写 warn.txt"能力：记录没有结果或合计不符的学生、失败的批次

use crate::models::distribution::{ChunkFailure, StudentWarning};
use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use tracing::debug;

/// 警告写入服务
pub struct WarnWriter {
    warn_file_path: String,
}

impl WarnWriter {
    /// 创建新的警告写入服务
    pub fn new() -> Self {
        Self {
            warn_file_path: "warn.txt".to_string(),
        }
    }

    /// 使用自定义文件路径创建
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            warn_file_path: path.into(),
        }
    }

    /// 追加写入本次任务的警告
    ///
    /// 没有任何警告时不创建文件
    pub fn write(&self, warnings: &[StudentWarning], failures: &[ChunkFailure]) -> Result<()> {
        if warnings.is_empty() && failures.is_empty() {
            return Ok(());
        }

        debug!(
            "写入警告: {} 条学生警告, {} 个失败批次",
            warnings.len(),
            failures.len()
        );

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.warn_file_path)
            .with_context(|| format!("无法打开警告文件: {}", self.warn_file_path))?;

        let mut content = format!(
            "# {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        for failure in failures {
            content.push_str(&format!(
                "批次 {} | {} 名学生 | 尝试 {} 次 | 错误: {}\n",
                failure.label,
                failure.student_ids.len(),
                failure.attempts,
                failure.message
            ));
        }
        for warning in warnings {
            content.push_str(&format!("{}\n", warning));
        }

        file.write_all(content.as_bytes())?;

        Ok(())
    }
}

impl Default for WarnWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::distribution::WarningKind;

    #[test]
    fn test_write_appends_warnings_and_failures() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("warn.txt");
        let writer = WarnWriter::with_path(path.to_string_lossy());

        writer.write(&[], &[]).unwrap();
        assert!(!path.exists());

        let warnings = vec![StudentWarning {
            student_id: "12-KİMYA-9/A".into(),
            name: "Ayşe".into(),
            kind: WarningKind::Missing,
        }];
        let failures = vec![ChunkFailure {
            label: "9/A · KİMYA #2".into(),
            student_ids: vec!["a".into(), "b".into()],
            message: "timeout".into(),
            attempts: 1,
        }];
        writer.write(&warnings, &failures).unwrap();
        writer.write(&warnings, &[]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("批次 9/A · KİMYA #2 | 2 名学生 | 尝试 1 次 | 错误: timeout"));
        assert_eq!(content.matches("未生成分配").count(), 2);
    }
}
