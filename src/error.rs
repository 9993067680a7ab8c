use std::fmt;
use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug)]
pub enum AppError {
    /// 配置错误（终止，不做任何处理）
    Config(ConfigError),
    /// 输入校验错误（终止，不做任何处理）
    Input(InputError),
    /// 分配任务错误
    Distribution(DistributionError),
    /// 文件操作错误
    File(FileError),
    /// 其他错误（用于包装第三方库错误）
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(e) => write!(f, "配置错误: {}", e),
            AppError::Input(e) => write!(f, "输入错误: {}", e),
            AppError::Distribution(e) => write!(f, "分配错误: {}", e),
            AppError::File(e) => write!(f, "文件错误: {}", e),
            AppError::Other(msg) => write!(f, "错误: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(e) => Some(e),
            AppError::Input(e) => Some(e),
            AppError::Distribution(e) => Some(e),
            AppError::File(e) => Some(e),
            AppError::Other(_) => None,
        }
    }
}

/// 配置错误
#[derive(Debug)]
pub enum ConfigError {
    /// 环境变量解析失败
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 缺少凭据（API Key）
    MissingCredential {
        var_name: String,
    },
    /// 配置值不合法
    InvalidValue {
        name: String,
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EnvVarParseFailed {
                var_name,
                value,
                expected_type,
            } => {
                write!(
                    f,
                    "环境变量 {} 解析失败: 值 '{}' 无法转换为 {}",
                    var_name, value, expected_type
                )
            }
            ConfigError::MissingCredential { var_name } => {
                write!(f, "缺少凭据: 请设置环境变量 {}", var_name)
            }
            ConfigError::InvalidValue { name, reason } => {
                write!(f, "配置项 {} 不合法: {}", name, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// 输入校验错误
#[derive(Debug)]
pub enum InputError {
    /// 学生列表为空
    NoStudents,
    /// 取整粒度必须为正整数
    InvalidRoundingRule {
        value: u32,
    },
    /// 批次大小必须为正
    InvalidBatchSize,
    /// 细则满分必须为正整数
    InvalidMaxScore {
        criterion_id: String,
        max_score: f64,
    },
    /// 同一细则集合中 ID 重复
    DuplicateCriterion {
        criterion_id: String,
    },
    /// 学生 ID 重复
    DuplicateStudent {
        student_id: String,
    },
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::NoStudents => write!(f, "学生列表不能为空"),
            InputError::InvalidRoundingRule { value } => {
                write!(f, "取整粒度必须为正整数 (当前: {})", value)
            }
            InputError::InvalidBatchSize => write!(f, "批次大小必须大于 0"),
            InputError::InvalidMaxScore {
                criterion_id,
                max_score,
            } => {
                write!(f, "细则 {} 的满分必须为正整数 (当前: {})", criterion_id, max_score)
            }
            InputError::DuplicateCriterion { criterion_id } => {
                write!(f, "细则 ID 重复: {}", criterion_id)
            }
            InputError::DuplicateStudent { student_id } => {
                write!(f, "学生 ID 重复: {}", student_id)
            }
        }
    }
}

impl std::error::Error for InputError {}

/// Oracle 调用错误（按批次记录，不终止任务）
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("LLM API调用失败 (模型: {model}): {message}")]
    Transport { model: String, message: String },

    #[error("Oracle 调用超时 ({seconds} 秒)")]
    Timeout { seconds: u64 },

    #[error("LLM返回内容为空 (模型: {model})")]
    EmptyResponse { model: String },

    #[error("无法解析 Oracle 返回的 JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Oracle 返回结构不符合约定: {0}")]
    SchemaMismatch(String),
}

/// 分配任务错误
#[derive(Debug)]
pub enum DistributionError {
    /// 所有批次都没有产出结果
    NothingProduced {
        message: String,
    },
    /// 任务在产出任何结果前被取消
    Cancelled,
}

impl fmt::Display for DistributionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistributionError::NothingProduced { message } => write!(f, "{}", message),
            DistributionError::Cancelled => write!(f, "分配任务已取消"),
        }
    }
}

impl std::error::Error for DistributionError {}

/// 文件操作错误
#[derive(Debug)]
pub enum FileError {
    /// 读取文件失败
    ReadFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 写入文件失败
    WriteFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// TOML 解析失败
    TomlParseFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileError::ReadFailed { path, source } => {
                write!(f, "读取文件失败 ({}): {}", path, source)
            }
            FileError::WriteFailed { path, source } => {
                write!(f, "写入文件失败 ({}): {}", path, source)
            }
            FileError::TomlParseFailed { path, source } => {
                write!(f, "TOML解析失败 ({}): {}", path, source)
            }
        }
    }
}

impl std::error::Error for FileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FileError::ReadFailed { source, .. }
            | FileError::WriteFailed { source, .. }
            | FileError::TomlParseFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
        }
    }
}

// ========== 从常见错误类型转换 ==========

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<InputError> for AppError {
    fn from(err: InputError) -> Self {
        AppError::Input(err)
    }
}

impl From<DistributionError> for AppError {
    fn from(err: DistributionError) -> Self {
        AppError::Distribution(err)
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件读取错误
    pub fn file_read_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建 TOML 解析错误
    pub fn toml_parse_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::TomlParseFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
