use super::client::{ChatBackend, ChatError, ChatResult, LlmReply, LlmRequest, Source};
use crate::types::{ChatMessage, Role};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://us-central1-aiplatform.googleapis.com/v1/projects/yeollimi-dev/locations/us-central1/publishers/google/models/gemini-2.5-flash:generateContent";

/// Client for the Gemini `generateContent` endpoint (Vertex AI).
pub struct GeminiClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

// Gemini request types

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
}

#[derive(Serialize)]
struct SystemInstruction<'a> {
    parts: Vec<TextPart<'a>>,
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
}

#[derive(Serialize)]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Serialize)]
struct GoogleSearch {}

#[derive(Serialize, Deserialize, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
}

#[derive(Serialize, Deserialize, Default)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Serialize, Deserialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

// Gemini response types

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    web_search_queries: Option<Vec<String>>,
    grounding_chunks: Option<Vec<GroundingChunk>>,
}

#[derive(Deserialize)]
struct GroundingChunk {
    web: Option<WebChunk>,
}

#[derive(Deserialize)]
struct WebChunk {
    uri: Option<String>,
    title: Option<String>,
}

#[derive(Deserialize)]
struct GeminiError {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

impl GeminiClient {
    pub fn new(endpoint: String, api_key: String, timeout: Duration) -> ChatResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    fn build_request<'a>(request: &'a LlmRequest) -> GeminiRequest<'a> {
        let mut contents: Vec<Content> = request.history.iter().map(history_content).collect();

        let mut parts = Vec::new();
        if !request.message.trim().is_empty() {
            parts.push(Part {
                text: Some(request.message.clone()),
                inline_data: None,
            });
        }
        if let Some(image) = &request.image {
            parts.push(Part {
                text: None,
                inline_data: Some(InlineData {
                    mime_type: image.mime_type.clone(),
                    data: image.data.clone(),
                }),
            });
        }
        contents.push(Content {
            parts,
            role: Some("user".to_string()),
        });

        let (generation_config, tools) = if request.search_grounding {
            (
                Some(GenerationConfig {
                    temperature: 0.7,
                    top_p: 0.95,
                    top_k: 40,
                }),
                Some(vec![Tool {
                    google_search: GoogleSearch {},
                }]),
            )
        } else {
            (None, None)
        };

        GeminiRequest {
            contents,
            system_instruction: request.system_instruction.as_deref().map(|text| {
                SystemInstruction {
                    parts: vec![TextPart { text }],
                }
            }),
            generation_config,
            tools,
        }
    }
}

fn history_content(message: &ChatMessage) -> Content {
    let role = match message.role() {
        Role::User => "user",
        Role::Model => "model",
    };
    Content {
        parts: vec![Part {
            text: Some(message.content.clone()),
            inline_data: None,
        }],
        role: Some(role.to_string()),
    }
}

/// Parses a successful `generateContent` body.
pub fn parse_reply(body: &str) -> ChatResult<LlmReply> {
    let parsed: GeminiResponse = serde_json::from_str(body)?;
    let Some(candidate) = parsed.candidates.into_iter().next() else {
        return Ok(LlmReply::default());
    };

    let text = candidate
        .content
        .and_then(|content| content.parts.into_iter().next())
        .and_then(|part| part.text);

    let mut sources = Vec::new();
    if let Some(metadata) = candidate.grounding_metadata {
        for query in metadata.web_search_queries.unwrap_or_default() {
            tracing::debug!(%query, "grounding search query");
        }
        for (index, chunk) in metadata
            .grounding_chunks
            .unwrap_or_default()
            .into_iter()
            .enumerate()
        {
            let Some(web) = chunk.web else { continue };
            let uri = web.uri.unwrap_or_default();
            if uri.is_empty() {
                continue;
            }
            let title = web.title.unwrap_or_else(|| format!("출처 {}", index + 1));
            sources.push(Source { title, uri });
        }
    }

    Ok(LlmReply { text, sources })
}

/// User-facing message for a failed request.
pub fn parse_error(status: u16, body: &str) -> String {
    serde_json::from_str::<GeminiError>(body)
        .map(|err| err.error.message)
        .unwrap_or_else(|_| format!("API 요청 실패: {status}"))
}

#[async_trait]
impl ChatBackend for GeminiClient {
    async fn generate(&self, request: LlmRequest) -> ChatResult<LlmReply> {
        let body = Self::build_request(&request);
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = parse_error(status.as_u16(), &text);
            tracing::error!(status = status.as_u16(), %message, "gemini request failed");
            return Err(ChatError::Api(message));
        }

        parse_reply(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::client::InlineImage;

    #[test]
    fn test_parse_reply_with_grounding() {
        let body = r#"{
            "candidates": [{
                "content": {"parts": [{"text": "내일은 맑아요"}], "role": "model"},
                "groundingMetadata": {
                    "webSearchQueries": ["서울 날씨"],
                    "groundingChunks": [
                        {"web": {"uri": "https://a.example", "title": "A"}},
                        {"web": {"uri": "https://b.example"}},
                        {"web": {"uri": ""}}
                    ]
                }
            }]
        }"#;
        let reply = parse_reply(body).unwrap();
        assert_eq!(reply.text.as_deref(), Some("내일은 맑아요"));
        assert_eq!(reply.sources.len(), 2);
        assert_eq!(reply.sources[1].title, "출처 2");
    }

    #[test]
    fn test_parse_reply_without_candidates() {
        let reply = parse_reply(r#"{"candidates": []}"#).unwrap();
        assert_eq!(reply.text, None);
    }

    #[test]
    fn test_parse_error_body() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}}"#;
        assert_eq!(parse_error(400, body), "API key not valid");
        assert_eq!(parse_error(503, "<html>"), "API 요청 실패: 503");
    }

    #[test]
    fn test_request_shape() {
        let request = LlmRequest {
            history: vec![
                ChatMessage::user("안녕", None),
                ChatMessage::assistant("안녕하세요"),
            ],
            message: "이건 뭐야".to_string(),
            image: Some(InlineImage {
                mime_type: "image/png".to_string(),
                data: "AAAA".to_string(),
            }),
            system_instruction: Some("짧게".to_string()),
            search_grounding: true,
        };
        let json = serde_json::to_value(GeminiClient::build_request(&request)).unwrap();

        assert_eq!(json["contents"].as_array().unwrap().len(), 3);
        assert_eq!(json["contents"][1]["role"], "model");
        assert_eq!(json["contents"][2]["parts"][1]["inline_data"]["mime_type"], "image/png");
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "짧게");
        assert_eq!(json["generationConfig"]["topK"], 40);
        assert!(json["tools"][0]["google_search"].is_object());
    }

    #[test]
    fn test_request_without_grounding_omits_tools() {
        let request = LlmRequest {
            message: "hi".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_value(GeminiClient::build_request(&request)).unwrap();
        assert!(json.get("tools").is_none());
        assert!(json.get("systemInstruction").is_none());
    }
}
