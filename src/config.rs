use crate::error::ConfigError;
use std::str::FromStr;
use std::time::Duration;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 每批发送给 oracle 的学生数
    pub batch_size: usize,
    /// 两次 oracle 请求之间的间隔（毫秒）
    pub request_delay_ms: u64,
    /// 单次 oracle 请求超时（秒）
    pub request_timeout_secs: u64,
    /// 每个批次最多尝试次数（1 = 不重试）
    pub chunk_max_attempts: usize,
    /// 成绩单 TOML 目录
    pub input_folder: String,
    /// 用户设置目录
    pub settings_dir: String,
    pub user_id: String,
    /// 班级 / 课程缺失时使用的名称
    pub fallback_class_name: String,
    pub fallback_lesson_name: String,
    /// 报表输出文件
    pub report_file: String,
    /// 警告输出文件
    pub warn_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    pub llm_temperature: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            batch_size: 40,
            request_delay_ms: 2000,
            request_timeout_secs: 60,
            chunk_max_attempts: 1,
            input_folder: "input_toml".to_string(),
            settings_dir: "settings".to_string(),
            user_id: "default".to_string(),
            fallback_class_name: "Sınıf".to_string(),
            fallback_lesson_name: "Ders".to_string(),
            report_file: "report.txt".to_string(),
            warn_file: "warn.txt".to_string(),
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
            llm_api_key: String::new(),
            llm_api_base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            llm_model_name: "gemini-2.0-flash".to_string(),
            llm_temperature: 0.7,
        }
    }
}

impl Config {
    /// 从环境变量读取配置，未设置的项使用默认值
    pub fn from_env() -> Result<Self, ConfigError> {
        let default = Self::default();
        Ok(Self {
            batch_size: parse_env("BATCH_SIZE", default.batch_size)?,
            request_delay_ms: parse_env("REQUEST_DELAY_MS", default.request_delay_ms)?,
            request_timeout_secs: parse_env("REQUEST_TIMEOUT_SECS", default.request_timeout_secs)?,
            chunk_max_attempts: parse_env("CHUNK_MAX_ATTEMPTS", default.chunk_max_attempts)?,
            input_folder: std::env::var("INPUT_FOLDER").unwrap_or(default.input_folder),
            settings_dir: std::env::var("SETTINGS_DIR").unwrap_or(default.settings_dir),
            user_id: std::env::var("USER_ID").unwrap_or(default.user_id),
            fallback_class_name: std::env::var("FALLBACK_CLASS_NAME")
                .unwrap_or(default.fallback_class_name),
            fallback_lesson_name: std::env::var("FALLBACK_LESSON_NAME")
                .unwrap_or(default.fallback_lesson_name),
            report_file: std::env::var("REPORT_FILE").unwrap_or(default.report_file),
            warn_file: std::env::var("WARN_FILE").unwrap_or(default.warn_file),
            verbose_logging: parse_env("VERBOSE_LOGGING", default.verbose_logging)?,
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(default.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
            llm_temperature: parse_env("LLM_TEMPERATURE", default.llm_temperature)?,
        })
    }

    /// 校验配置；缺少 API Key 属于终止性错误
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm_api_key.trim().is_empty() {
            return Err(ConfigError::MissingCredential {
                var_name: "LLM_API_KEY".to_string(),
            });
        }
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                name: "BATCH_SIZE".to_string(),
                reason: "必须大于 0".to_string(),
            });
        }
        if self.chunk_max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                name: "CHUNK_MAX_ATTEMPTS".to_string(),
                reason: "必须大于 0".to_string(),
            });
        }
        Ok(())
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_env<T: FromStr>(var_name: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var_name) {
        Ok(value) => parse_value(var_name, &value),
        Err(_) => Ok(default),
    }
}

fn parse_value<T: FromStr>(var_name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::EnvVarParseFailed {
            var_name: var_name.to_string(),
            value: value.to_string(),
            expected_type: std::any::type_name::<T>().to_string(),
        })
}
