use crate::catalog;
use crate::types::ChatMessage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ============================================
// Error Types
// ============================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    #[error("메시지나 이미지 중 하나는 필요합니다")]
    EmptyMessage,

    #[error("API 키가 설정되지 않았습니다")]
    MissingApiKey,

    #[error("이전 요청을 처리하는 중입니다")]
    Busy,

    /// The conversation was closed while the request was pending.
    #[error("대화가 이미 닫혔습니다")]
    SessionClosed,

    #[error("이미지를 읽을 수 없습니다")]
    ImageUnreadable,

    #[error("{0}")]
    Api(String),

    #[error("네트워크 오류가 발생했어요: {0}")]
    Network(String),
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        ChatError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        ChatError::Api(err.to_string())
    }
}

pub type ChatResult<T> = Result<T, ChatError>;

// ============================================
// Instructions
// ============================================

pub const ANSWER_RULES: &str = "답변 작성 규칙:
1. 일반적인 질문은 6문장 이내로 간결하게 답변하세요
2. 순위/목록/비교표는 완전하게 제공하세요
3. 실시간 정보, 최신 뉴스, 날씨, 주가, 이벤트 등이 필요하면 반드시 Google 검색을 활용하세요
4. 검색 결과를 바탕으로 정확하고 최신 정보를 제공하세요
5. 불필요한 인사말은 생략하세요";

pub const IMAGE_ANALYSIS_INSTRUCTION: &str = "이미지를 분석하고 간결하게 답변하세요 (6문장 이내).";

/// Instruction used when the user asked to install an app we cannot resolve.
pub fn unsupported_app_instruction() -> String {
    format!(
        "사용자가 앱 설치를 요청했지만 현재 지원하지 않는 앱입니다.
다음과 같이 답변하세요:
\"죄송합니다. 해당 앱은 현재 지원하지 않습니다.
지원하는 앱: {}
다른 앱을 요청해주시거나, 직접 플레이스토어에서 검색해보세요.\"",
        catalog::supported_apps().join(", ")
    )
}

// ============================================
// Request / Reply
// ============================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineImage {
    pub mime_type: String,
    /// Base64 without line wrapping.
    pub data: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LlmRequest {
    /// Earlier turns, oldest first. Does not include `message`.
    pub history: Vec<ChatMessage>,
    pub message: String,
    pub image: Option<InlineImage>,
    pub system_instruction: Option<String>,
    pub search_grounding: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Source {
    pub title: String,
    pub uri: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LlmReply {
    /// `None` when the endpoint answered without any text part.
    pub text: Option<String>,
    pub sources: Vec<Source>,
}

impl LlmReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            sources: Vec::new(),
        }
    }

    /// Reply text with grounding sources appended as markdown links.
    pub fn render(&self, fallback: &str) -> String {
        let body = self.text.as_deref().unwrap_or(fallback);
        if self.sources.is_empty() {
            return body.to_string();
        }
        let links = self
            .sources
            .iter()
            .map(|source| format!("[{}]({})", source.title, source.uri))
            .collect::<Vec<_>>()
            .join("\n");
        format!("{body}\n\n**참고 출처:**\n{links}")
    }
}

/// Hosted LLM endpoint.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn generate(&self, request: LlmRequest) -> ChatResult<LlmReply>;
}

/// Last `window` messages of `messages`.
pub fn history_window(messages: &[ChatMessage], window: usize) -> Vec<ChatMessage> {
    let start = messages.len().saturating_sub(window);
    messages[start..].to_vec()
}
