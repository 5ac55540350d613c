//! LLM 服务 - 业务能力层
//!
//! 只负责"调用模型"能力，不关心流程
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务（如 Azure, Ollama 等）
//! - 结构化输出使用 `json_schema` 响应格式，返回后再用 serde 校验

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage,
        ChatCompletionRequestMessageContentPartText, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContent,
        ChatCompletionRequestUserMessageContentPart, CreateChatCompletionRequestArgs, ImageDetail,
        ImageUrl, ResponseFormat, ResponseFormatJsonSchema,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, LlmError};
use crate::models::{FeedbackIssue, FeedbackIssueList, FeedbackKind, SectionName};

/// 图片描述提示词
pub const IMAGE_DESCRIPTION_PROMPT: &str =
    "Accurately describe the image in detail so a blind person can understand it perfectly:";

/// 一次反馈请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackRequest {
    pub section: SectionName,
    pub kind: FeedbackKind,
    pub system_message: String,
    pub user_message: String,
}

/// 评审所需的模型能力
///
/// `LlmService` 是真实实现，测试中替换为计数的假模型
#[async_trait]
pub trait ReviewModel: Send + Sync {
    /// 请求一组结构化反馈
    async fn request_issues(&self, request: &FeedbackRequest) -> AppResult<FeedbackIssueList>;

    /// 用视觉模型描述一张图片
    async fn describe_image(&self, image_url: &str) -> AppResult<String>;
}

/// LLM 服务
///
/// 职责：
/// - 调用 LLM API 获取结构化反馈
/// - 调用视觉模型生成图片描述
/// - 不关心章节顺序和并发
pub struct LlmService {
    client: Client<OpenAIConfig>,
    model_name: String,
    image_model_name: String,
    temperature: Option<f32>,
    max_completion_tokens: u32,
}

impl LlmService {
    /// 创建新的 LLM 服务
    pub fn new(config: &Config) -> Self {
        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        let client = Client::with_config(openai_config);

        Self {
            client,
            model_name: config.llm_model_name.clone(),
            image_model_name: config.image_model_name.clone(),
            temperature: config.temperature,
            max_completion_tokens: config.max_completion_tokens,
        }
    }

    /// 通用的 LLM 调用函数
    ///
    /// 其他所有 LLM 相关功能都基于此函数。
    ///
    /// # 参数
    /// - `model`: 模型名称
    /// - `user_message`: 用户消息内容
    /// - `system_message`: 系统消息（可选）
    /// - `imgs`: 图片 URL 列表（可选），会追加到用户消息中
    /// - `response_format`: 响应格式（可选）
    ///
    /// # 返回
    /// 返回 LLM 的响应内容（字符串）
    pub async fn send_to_llm(
        &self,
        model: &str,
        user_message: &str,
        system_message: Option<&str>,
        imgs: Option<&[String]>,
        response_format: Option<ResponseFormat>,
    ) -> AppResult<String> {
        debug!("调用 LLM API，模型: {}", model);
        debug!("用户消息长度: {} 字符", user_message.len());

        let mut messages = Vec::new();

        if let Some(sys_msg) = system_message {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(sys_msg)
                .build()
                .map_err(LlmError::RequestBuild)?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        // 构建用户消息内容（支持图片）
        let user_msg = match imgs {
            Some(img_urls) if !img_urls.is_empty() => {
                let mut content_parts: Vec<ChatCompletionRequestUserMessageContentPart> =
                    Vec::with_capacity(img_urls.len() + 1);

                content_parts.push(ChatCompletionRequestUserMessageContentPart::Text(
                    ChatCompletionRequestMessageContentPartText {
                        text: user_message.to_string(),
                    },
                ));

                for url in img_urls {
                    content_parts.push(ChatCompletionRequestUserMessageContentPart::ImageUrl(
                        ChatCompletionRequestMessageContentPartImage {
                            image_url: ImageUrl {
                                url: url.clone(),
                                detail: Some(ImageDetail::Auto),
                            },
                        },
                    ));
                }

                debug!("使用 Vision API，包含 {} 张图片", img_urls.len());

                ChatCompletionRequestUserMessageArgs::default()
                    .content(ChatCompletionRequestUserMessageContent::Array(
                        content_parts,
                    ))
                    .build()
                    .map_err(LlmError::RequestBuild)?
            }
            _ => ChatCompletionRequestUserMessageArgs::default()
                .content(user_message)
                .build()
                .map_err(LlmError::RequestBuild)?,
        };

        messages.push(ChatCompletionRequestMessage::User(user_msg));

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(model)
            .messages(messages)
            .max_completion_tokens(self.max_completion_tokens);
        if let Some(temperature) = self.temperature {
            builder.temperature(temperature);
        }
        if let Some(format) = response_format {
            builder.response_format(format);
        }
        let request = builder.build().map_err(LlmError::RequestBuild)?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            AppError::llm_api_failed(model, e)
        })?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| LlmError::EmptyContent {
                model: model.to_string(),
            })?;

        Ok(content.trim().to_string())
    }

    fn issue_list_format() -> ResponseFormat {
        ResponseFormat::JsonSchema {
            json_schema: ResponseFormatJsonSchema {
                description: Some("A list of feedback issues.".to_string()),
                name: "FeedbackIssueList".to_string(),
                schema: Some(FeedbackIssueList::json_schema()),
                strict: Some(true),
            },
        }
    }
}

#[async_trait]
impl ReviewModel for LlmService {
    async fn request_issues(&self, request: &FeedbackRequest) -> AppResult<FeedbackIssueList> {
        debug!(
            "请求 {} 章节的{}反馈，模型: {}",
            request.section, request.kind, self.model_name
        );

        let response = self
            .send_to_llm(
                &self.model_name,
                &request.user_message,
                Some(&request.system_message),
                None,
                Some(Self::issue_list_format()),
            )
            .await?;

        Ok(parse_issue_list(&response, &self.model_name)?)
    }

    async fn describe_image(&self, image_url: &str) -> AppResult<String> {
        let images = [image_url.to_string()];
        self.send_to_llm(
            &self.image_model_name,
            IMAGE_DESCRIPTION_PROMPT,
            None,
            Some(&images),
            None,
        )
        .await
    }
}

/// 解析模型返回的反馈列表
///
/// 兼容 ```json 代码块包裹和直接返回数组两种偏差
pub fn parse_issue_list(response: &str, model: &str) -> Result<FeedbackIssueList, LlmError> {
    let body = strip_code_fence(response);

    match serde_json::from_str::<FeedbackIssueList>(body) {
        Ok(list) => Ok(list),
        Err(object_err) => match serde_json::from_str::<Vec<FeedbackIssue>>(body) {
            Ok(issues) => Ok(FeedbackIssueList { issues }),
            Err(_) => {
                warn!("无法解析结构化输出: {}", crate::utils::logging::truncate_text(body, 200));
                Err(LlmError::MalformedOutput {
                    model: model.to_string(),
                    source: object_err,
                })
            }
        },
    }
}

fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // 跳过语言标记（如 json）所在的第一行
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}
