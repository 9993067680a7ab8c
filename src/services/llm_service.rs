//! LLM 分数生成服务 - 业务能力层
//!
//! [`ScoreOracle`] 的生产实现，只负责"请 LLM 提议细则得分"，不关心批次和修正
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 兼容 OpenAI API 的服务（如 Gemini 的 OpenAI 兼容端点）

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use regex::Regex;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{ConfigError, OracleError};
use crate::models::rubric::RubricCriterion;
use crate::services::oracle::{OracleRequest, OracleResponse, ScoreOracle};
use crate::utils::logging::truncate_text;

const SYSTEM_MESSAGE: &str = "You are an expert educational assistant specializing in grade distribution. \
                              You always answer with a single JSON object and nothing else.";

/// LLM 服务
///
/// 职责：
/// - 把一个批次的请求转成提示词
/// - 调用 LLM API
/// - 把响应解析为 [`OracleResponse`]（不做任何数值校验）
pub struct LlmService {
    client: Client<OpenAIConfig>,
    model_name: String,
    temperature: f32,
}

impl LlmService {
    /// 创建新的 LLM 服务；缺少 API Key 时直接失败
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        if config.llm_api_key.trim().is_empty() {
            return Err(ConfigError::MissingCredential {
                var_name: "LLM_API_KEY".to_string(),
            });
        }

        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Ok(Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
            temperature: config.llm_temperature,
        })
    }

    /// 通用的 LLM 调用
    ///
    /// # 参数
    /// - `user_message`: 用户消息内容
    /// - `system_message`: 系统消息（可选）
    ///
    /// # 返回
    /// 返回 LLM 的响应内容（字符串）
    pub async fn send_to_llm(
        &self,
        user_message: &str,
        system_message: Option<&str>,
    ) -> Result<String, OracleError> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", user_message.len());

        let mut messages = Vec::new();

        if let Some(sys_msg) = system_message {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(sys_msg)
                .build()
                .map_err(|e| self.transport_error(e))?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()
            .map_err(|e| self.transport_error(e))?;
        messages.push(ChatCompletionRequestMessage::User(user_msg));

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(self.temperature)
            .max_tokens(16384u32)
            .build()
            .map_err(|e| self.transport_error(e))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            self.transport_error(e)
        })?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| OracleError::EmptyResponse {
                model: self.model_name.clone(),
            })?;

        Ok(content.trim().to_string())
    }

    fn transport_error(&self, err: impl std::fmt::Display) -> OracleError {
        OracleError::Transport {
            model: self.model_name.clone(),
            message: err.to_string(),
        }
    }
}

#[async_trait]
impl ScoreOracle for LlmService {
    async fn propose(&self, request: &OracleRequest) -> Result<OracleResponse, OracleError> {
        let user_message = build_distribution_prompt(request);
        let response = self.send_to_llm(&user_message, Some(SYSTEM_MESSAGE)).await?;
        debug!("LLM 响应: {}", truncate_text(&response, 200));
        parse_distribution_response(&response)
    }
}

/// 构建分配提示词
pub fn build_distribution_prompt(request: &OracleRequest) -> String {
    let students: Vec<_> = request
        .students
        .iter()
        .map(|s| {
            json!({
                "id": s.id,
                "name": s.name,
                "WrittenExams": s.prior_exam_scores,
                "Targets": { "P1": s.target_p1, "P2": s.target_p2 },
                "ProcessP1": s.target_p1.is_some(),
                "ProcessP2": s.target_p2.is_some(),
            })
        })
        .collect();
    let students_json = serde_json::to_string_pretty(&students).unwrap_or_default();

    format!(
        r#"CRITICAL MISSION:
You are processing data for a SPECIFIC class and a SPECIFIC lesson.
- Class: {class}
- Lesson: {lesson}

Rounding Rule: Scores must be multiples of {rule}.

RUBRIC P1 CONFIGURATION:
{p1}

RUBRIC P2 CONFIGURATION:
{p2}

STUDENTS DATA:
{students}

STRICT RULES:
1. Check 'ProcessP1' and 'ProcessP2' flags for each student.
2. IF ProcessP1 is TRUE: provide one score for EVERY P1 rubric so that the scores sum exactly to Target P1.
3. IF ProcessP1 is FALSE: return an empty array [] for p1_scores.
4. IF ProcessP2 is TRUE: provide one score for EVERY P2 rubric so that the scores sum exactly to Target P2.
5. IF ProcessP2 is FALSE: return an empty array [] for p2_scores.
6. No individual rubric score can exceed its Max Score or go below 0.
7. Students with equal targets must NOT all receive the same breakdown; vary them naturally.

OUTPUT FORMAT:
Return a JSON object with a 'distributions' array. Each item must contain 'studentId',
'p1_scores' and 'p2_scores', where each score item is {{"rubricId": string, "score": number}}."#,
        class = request.context.class_name,
        lesson = request.context.lesson_name,
        rule = request.rounding_rule,
        p1 = format_rubrics(&request.rubrics_p1),
        p2 = format_rubrics(&request.rubrics_p2),
        students = students_json,
    )
}

fn format_rubrics(rubrics: &[RubricCriterion]) -> String {
    rubrics
        .iter()
        .enumerate()
        .map(|(i, r)| {
            format!(
                "{}. ID: \"{}\", Label: \"{}\", Max: {}",
                i + 1,
                r.id,
                r.label,
                r.max_score
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// 解析 LLM 响应
///
/// 兼容 ```json 代码块包裹和前后附带说明文字的情况
pub fn parse_distribution_response(response: &str) -> Result<OracleResponse, OracleError> {
    let json_text = extract_json_object(response).ok_or_else(|| {
        OracleError::SchemaMismatch("响应中没有找到 JSON 对象".to_string())
    })?;

    let value: serde_json::Value = serde_json::from_str(json_text)?;

    if !value
        .get("distributions")
        .map(|d| d.is_array())
        .unwrap_or(false)
    {
        return Err(OracleError::SchemaMismatch(
            "缺少 distributions 数组".to_string(),
        ));
    }

    serde_json::from_value(value).map_err(|e| OracleError::SchemaMismatch(e.to_string()))
}

fn extract_json_object(response: &str) -> Option<&str> {
    if let Ok(fence) = Regex::new(r"(?s)```(?:json)?\s*(\{.*\})\s*```") {
        if let Some(m) = fence.captures(response).and_then(|c| c.get(1)) {
            return Some(m.as_str());
        }
    }

    let start = response.find('{')?;
    let end = response.rfind('}')?;
    (start < end).then(|| &response[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::rubric::ScoreEntry;
    use crate::services::oracle::{OracleContext, OracleStudent};

    fn sample_request() -> OracleRequest {
        OracleRequest {
            context: OracleContext {
                class_name: "9/A".to_string(),
                lesson_name: "KİMYA".to_string(),
            },
            rubrics_p1: vec![RubricCriterion::new("p1_1", "Katılım", 50.0)],
            rubrics_p2: vec![RubricCriterion::new("p2_1", "Proje", 100.0)],
            rounding_rule: 5,
            students: vec![OracleStudent {
                id: "1-KİMYA-9/A".to_string(),
                name: "Ayşe".to_string(),
                prior_exam_scores: vec![70.0, 80.0],
                target_p1: Some(85.0),
                target_p2: None,
            }],
        }
    }

    #[test]
    fn test_prompt_carries_context_and_flags() {
        let prompt = build_distribution_prompt(&sample_request());

        assert!(prompt.contains("- Class: 9/A"));
        assert!(prompt.contains("- Lesson: KİMYA"));
        assert!(prompt.contains("multiples of 5"));
        assert!(prompt.contains(r#"1. ID: "p1_1", Label: "Katılım", Max: 50"#));
        assert!(prompt.contains(r#""ProcessP1": true"#));
        assert!(prompt.contains(r#""ProcessP2": false"#));
    }

    #[test]
    fn test_parse_fenced_response() {
        let response = r#"Here you go:
```json
{"distributions":[{"studentId":"s1","p1_scores":[{"rubricId":"p1_1","score":40}],"p2_scores":[]}]}
```"#;

        let parsed = parse_distribution_response(response).unwrap();
        assert_eq!(parsed.distributions.len(), 1);
        assert_eq!(
            parsed.distributions[0].p1_scores,
            vec![ScoreEntry::new("p1_1", 40.0)]
        );
        assert!(parsed.distributions[0].p2_scores.is_empty());
    }

    #[test]
    fn test_parse_bare_object_with_missing_arrays() {
        let parsed =
            parse_distribution_response(r#"{"distributions":[{"studentId":"s1"}]}"#).unwrap();
        assert!(parsed.distributions[0].p1_scores.is_empty());
    }

    #[test]
    fn test_parse_rejects_wrong_shape() {
        assert!(matches!(
            parse_distribution_response("no json here"),
            Err(OracleError::SchemaMismatch(_))
        ));
        assert!(matches!(
            parse_distribution_response(r#"{"result": []}"#),
            Err(OracleError::SchemaMismatch(_))
        ));
        assert!(matches!(
            parse_distribution_response(r#"{"distributions": [{"p1_scores": []}]}"#),
            Err(OracleError::SchemaMismatch(_))
        ));
        assert!(matches!(
            parse_distribution_response(r#"{"distributions": [}"#),
            Err(OracleError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_new_requires_api_key() {
        assert!(LlmService::new(&Config::default()).is_err());
    }

    /// 真实调用 LLM，需要设置 LLM_API_KEY
    ///
    /// 运行方式：
    /// ```bash
    /// cargo test test_llm_propose -- --ignored --nocapture
    /// ```
    #[tokio::test]
    #[ignore]
    async fn test_llm_propose() {
        let _ = tracing_subscriber::fmt::try_init();

        let config = Config::from_env().expect("读取配置失败");
        let service = LlmService::new(&config).expect("缺少 LLM_API_KEY");

        let response = service.propose(&sample_request()).await.expect("调用失败");
        println!("{:#?}", response);
        assert!(!response.distributions.is_empty());
    }
}
