use crate::models::student::ClassSheet;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

/// 从 TOML 文件加载一页班级成绩单
pub async fn load_class_sheet(toml_file_path: &Path) -> Result<ClassSheet> {
    let content = fs::read_to_string(toml_file_path)
        .await
        .with_context(|| format!("无法读取TOML文件: {}", toml_file_path.display()))?;

    let mut sheet: ClassSheet = toml::from_str(&content)
        .with_context(|| format!("无法解析TOML文件: {}", toml_file_path.display()))?;

    sheet.file_path = Some(toml_file_path.to_string_lossy().to_string());

    Ok(sheet)
}

/// 从文件夹中加载所有成绩单（按文件名排序，保证班级顺序稳定）
///
/// 单个文件解析失败只记录警告，不影响其他文件
pub async fn load_all_class_sheets(folder_path: &str) -> Result<Vec<ClassSheet>> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        anyhow::bail!("文件夹不存在: {}", folder_path);
    }

    let mut toml_files = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .with_context(|| format!("无法读取文件夹: {}", folder_path))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml_files.push(path);
        }
    }
    toml_files.sort();

    let mut sheets = Vec::new();
    for path in toml_files {
        tracing::info!(
            "正在加载: {}",
            path.file_name().unwrap_or_default().to_string_lossy()
        );

        match load_class_sheet(&path).await {
            Ok(sheet) => {
                tracing::info!(
                    "成功加载 {} {} 共 {} 名学生",
                    sheet.metadata.class_name,
                    sheet.metadata.lesson_name,
                    sheet.students.len()
                );
                sheets.push(sheet);
            }
            Err(e) => {
                tracing::warn!("加载文件失败 {}: {:#}", path.display(), e);
            }
        }
    }

    Ok(sheets)
}
