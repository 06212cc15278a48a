//! Per-session message pipeline.
//!
//! `send_message` records the user's turn, classifies it and either answers
//! with a structured [`ChatResponse`] or asks the LLM. Only LLM answers are
//! written back to the conversation; structured results are left to the
//! caller to act on.

use crate::ai::{
    ANSWER_RULES, ChatBackend, ChatError, ChatResult, IMAGE_ANALYSIS_INSTRUCTION, LlmRequest,
    history_window, unsupported_app_instruction,
};
use crate::intent::{self, Intent, IntentClassifier, KeywordClassifier};
use crate::maps::RouteFinder;
use crate::media;
use crate::response::ChatResponse;
use crate::session::{self, SharedStore};
use crate::types::{ChatMessage, SessionId};
use std::sync::Arc;

pub const DEFAULT_HISTORY_WINDOW: usize = 10;

const NO_ANSWER: &str = "응답을 받을 수 없습니다.";
const NO_IMAGE_ANSWER: &str = "이미지를 분석할 수 없습니다.";

pub struct ChatRepository {
    store: SharedStore,
    backend: Option<Arc<dyn ChatBackend>>,
    routes: Arc<dyn RouteFinder>,
    classifier: Arc<dyn IntentClassifier>,
    history_window: usize,
}

impl ChatRepository {
    /// `backend` is `None` until an API key is configured; every send is then
    /// rejected with [`ChatError::MissingApiKey`].
    pub fn new(
        store: SharedStore,
        backend: Option<Arc<dyn ChatBackend>>,
        routes: Arc<dyn RouteFinder>,
    ) -> Self {
        Self {
            store,
            backend,
            routes,
            classifier: Arc::new(KeywordClassifier),
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn IntentClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    pub fn set_backend(&mut self, backend: Option<Arc<dyn ChatBackend>>) {
        self.backend = backend;
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Processes one user turn in `session_id`.
    ///
    /// The session's loading flag is held for the whole call and cleared on
    /// every path. A reply for a session closed meanwhile yields
    /// [`ChatError::SessionClosed`].
    pub async fn send_message(
        &self,
        session_id: &SessionId,
        text: &str,
        image_uri: Option<&str>,
    ) -> ChatResult<ChatResponse> {
        if text.trim().is_empty() && image_uri.is_none() {
            return Err(ChatError::EmptyMessage);
        }
        let backend = self.backend.clone().ok_or(ChatError::MissingApiKey)?;

        let history = {
            let mut store = session::lock(&self.store);
            store.begin_request(session_id)?;
            let history = store
                .messages(session_id)
                .map(|messages| history_window(&messages, self.history_window))
                .unwrap_or_default();
            store.append(
                session_id,
                ChatMessage::user(text, image_uri.map(str::to_string)),
            );
            history
        };

        let result = match image_uri {
            Some(uri) => {
                self.process_image(backend.as_ref(), session_id, history, text, uri)
                    .await
            }
            None => {
                self.process_text(backend.as_ref(), session_id, history, text)
                    .await
            }
        };

        session::lock(&self.store).end_request(session_id);
        if let Err(err) = &result {
            tracing::warn!(session = %session_id, error = %err, "message failed");
        }
        result
    }

    /// Answers `text` as plain chat without recording a new user turn.
    ///
    /// Used when the user declines a structured result and wants a normal
    /// answer to what they already asked.
    pub async fn answer(&self, session_id: &SessionId, text: &str) -> ChatResult<ChatResponse> {
        let backend = self.backend.clone().ok_or(ChatError::MissingApiKey)?;
        let history = {
            let mut store = session::lock(&self.store);
            store.begin_request(session_id)?;
            store
                .messages(session_id)
                .map(|messages| history_window(&messages, self.history_window))
                .unwrap_or_default()
        };

        let result = self
            .chat(backend.as_ref(), session_id, history, text)
            .await;
        session::lock(&self.store).end_request(session_id);
        result
    }

    async fn process_image(
        &self,
        backend: &dyn ChatBackend,
        session_id: &SessionId,
        history: Vec<ChatMessage>,
        text: &str,
        image_uri: &str,
    ) -> ChatResult<ChatResponse> {
        let intent = self.classifier.classify(text, true);
        tracing::debug!(session = %session_id, ?intent, "image message classified");

        match intent {
            Intent::KakaoShare => Ok(ChatResponse::KakaoSdkImageShare(image_uri.to_string())),
            Intent::AndroidShare => Ok(ChatResponse::AndroidImageShare(image_uri.to_string())),
            _ => {
                let image = media::load_inline_image(image_uri).await?;
                let reply = backend
                    .generate(LlmRequest {
                        history,
                        message: text.to_string(),
                        image: Some(image),
                        system_instruction: Some(IMAGE_ANALYSIS_INSTRUCTION.to_string()),
                        search_grounding: false,
                    })
                    .await?;
                self.record_answer(session_id, reply.render(NO_IMAGE_ANSWER))
            }
        }
    }

    async fn process_text(
        &self,
        backend: &dyn ChatBackend,
        session_id: &SessionId,
        history: Vec<ChatMessage>,
        text: &str,
    ) -> ChatResult<ChatResponse> {
        let intent = self.classifier.classify(text, false);
        tracing::debug!(session = %session_id, ?intent, "text message classified");

        match intent {
            Intent::ImagePickerRequest { prompt } => Ok(ChatResponse::ImagePickerRequest(prompt)),
            Intent::KakaoMessageRequest { payload } => {
                Ok(ChatResponse::KakaoMessageShare(payload.unwrap_or_default()))
            }
            Intent::AppInstallRequest { package, app_name } => {
                Ok(ChatResponse::PlayStoreLink { package, app_name })
            }
            Intent::NavigationRequest { query } => {
                match self.routes.maplink(&query, None).await.map(ChatResponse::navigation) {
                    Ok(Some(response)) => Ok(response),
                    Ok(None) => {
                        tracing::warn!("route lookup returned a non-nmap link, answering as chat");
                        self.chat(backend, session_id, history, text).await
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "route lookup failed, answering as chat");
                        self.chat(backend, session_id, history, text).await
                    }
                }
            }
            _ => self.chat(backend, session_id, history, text).await,
        }
    }

    async fn chat(
        &self,
        backend: &dyn ChatBackend,
        session_id: &SessionId,
        history: Vec<ChatMessage>,
        text: &str,
    ) -> ChatResult<ChatResponse> {
        let instruction = if intent::is_unrecognized_install(text) {
            unsupported_app_instruction()
        } else {
            ANSWER_RULES.to_string()
        };

        let reply = backend
            .generate(LlmRequest {
                history,
                message: text.to_string(),
                image: None,
                system_instruction: Some(instruction),
                search_grounding: true,
            })
            .await?;
        self.record_answer(session_id, reply.render(NO_ANSWER))
    }

    fn record_answer(&self, session_id: &SessionId, answer: String) -> ChatResult<ChatResponse> {
        let mut store = session::lock(&self.store);
        if !store.append(session_id, ChatMessage::assistant(answer.clone())) {
            return Err(ChatError::SessionClosed);
        }
        Ok(ChatResponse::Text(answer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::LlmReply;
    use crate::maps::{LocationHint, MapError};
    use crate::session::SessionStore;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingBackend {
        requests: Mutex<Vec<LlmRequest>>,
    }

    #[async_trait]
    impl ChatBackend for RecordingBackend {
        async fn generate(&self, request: LlmRequest) -> ChatResult<LlmReply> {
            let answer = format!("answer to {}", request.message);
            self.requests.lock().unwrap().push(request);
            Ok(LlmReply::text(answer))
        }
    }

    struct FixedRoutes(Result<String, MapError>);

    #[async_trait]
    impl RouteFinder for FixedRoutes {
        async fn maplink(
            &self,
            _query: &str,
            _current: Option<&LocationHint>,
        ) -> Result<String, MapError> {
            self.0.clone()
        }
    }

    fn setup(
        routes: Result<String, MapError>,
    ) -> (ChatRepository, Arc<RecordingBackend>, SessionId) {
        let store = SessionStore::new().shared();
        let id = session::lock(&store).active_id();
        let backend = Arc::new(RecordingBackend::default());
        let repository = ChatRepository::new(
            store,
            Some(backend.clone() as Arc<dyn ChatBackend>),
            Arc::new(FixedRoutes(routes)),
        );
        (repository, backend, id)
    }

    fn no_route() -> Result<String, MapError> {
        Err(MapError::Network("offline".into()))
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let (repository, _, id) = setup(no_route());
        let result = repository.send_message(&id, "  ", None).await;
        assert_eq!(result, Err(ChatError::EmptyMessage));
    }

    #[tokio::test]
    async fn test_missing_backend_rejected() {
        let store = SessionStore::new().shared();
        let id = session::lock(&store).active_id();
        let repository = ChatRepository::new(store, None, Arc::new(FixedRoutes(no_route())));
        let result = repository.send_message(&id, "안녕", None).await;
        assert_eq!(result, Err(ChatError::MissingApiKey));
    }

    #[tokio::test]
    async fn test_plain_chat_records_answer() {
        let (repository, backend, id) = setup(no_route());
        let response = repository.send_message(&id, "오늘 날씨", None).await.unwrap();
        assert_eq!(response, ChatResponse::Text("answer to 오늘 날씨".to_string()));

        let messages = session::lock(repository.store()).messages(&id).unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].is_user);
        assert!(!messages[1].is_user);

        let requests = backend.requests.lock().unwrap();
        assert!(requests[0].search_grounding);
        assert!(requests[0].history.is_empty());
        assert_eq!(requests[0].system_instruction.as_deref(), Some(ANSWER_RULES));
        assert!(!session::lock(repository.store()).is_loading(&id));
    }

    #[tokio::test]
    async fn test_history_excludes_current_message() {
        let (repository, backend, id) = setup(no_route());
        repository.send_message(&id, "첫 질문", None).await.unwrap();
        repository.send_message(&id, "두번째 질문", None).await.unwrap();

        let requests = backend.requests.lock().unwrap();
        let history = &requests[1].history;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "첫 질문");
        assert!(history.iter().all(|m| m.content != "두번째 질문"));
    }

    #[tokio::test]
    async fn test_structured_intents_skip_llm() {
        let (repository, backend, id) = setup(no_route());
        let response = repository
            .send_message(&id, "GS SHOP 설치해줘", None)
            .await
            .unwrap();
        assert_eq!(
            response,
            ChatResponse::PlayStoreLink {
                package: "gsshop.mobile.v2".to_string(),
                app_name: "GS SHOP".to_string(),
            }
        );
        assert!(backend.requests.lock().unwrap().is_empty());
        assert_eq!(
            session::lock(repository.store()).messages(&id).unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_navigation_link() {
        let link = "nmap://route/public?dname=서울역".to_string();
        let (repository, _, id) = setup(Ok(link.clone()));
        let response = repository
            .send_message(&id, "서울역 가는 길 알려줘", None)
            .await
            .unwrap();
        assert_eq!(response, ChatResponse::NavigationLink(link));
    }

    #[tokio::test]
    async fn test_navigation_failure_falls_back_to_chat() {
        let (repository, backend, id) = setup(no_route());
        let response = repository
            .send_message(&id, "서울역 가는 길 알려줘", None)
            .await
            .unwrap();
        assert!(matches!(response, ChatResponse::Text(_)));
        assert_eq!(backend.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_web_route_link_falls_back_to_chat() {
        let (repository, backend, id) = setup(Ok("https://map.naver.com/x".to_string()));
        let response = repository
            .send_message(&id, "서울역 가는 길 알려줘", None)
            .await
            .unwrap();
        assert!(matches!(response, ChatResponse::Text(_)));
        assert_eq!(backend.requests.lock().unwrap().len(), 1);
    }

    /// Closes the session it is answering for before replying.
    struct ClosingBackend {
        store: SharedStore,
    }

    #[async_trait]
    impl ChatBackend for ClosingBackend {
        async fn generate(&self, _request: LlmRequest) -> ChatResult<LlmReply> {
            let mut store = session::lock(&self.store);
            let id = store.active_id();
            store.close(&id);
            Ok(LlmReply::text("too late"))
        }
    }

    #[tokio::test]
    async fn test_answer_for_closed_session_is_dropped() {
        let store = SessionStore::new().shared();
        let id = session::lock(&store).active_id();
        let backend = Arc::new(ClosingBackend {
            store: store.clone(),
        });
        let repository = ChatRepository::new(
            store.clone(),
            Some(backend as Arc<dyn ChatBackend>),
            Arc::new(FixedRoutes(no_route())),
        );

        let result = repository.send_message(&id, "안녕", None).await;
        assert_eq!(result, Err(ChatError::SessionClosed));

        let store = session::lock(&store);
        assert_eq!(store.len(), 1);
        assert!(!store.contains(&id));
        assert!(store.sessions().iter().all(|s| s.messages.is_empty()));
    }

    #[tokio::test]
    async fn test_unknown_app_uses_supported_list() {
        let (repository, backend, id) = setup(no_route());
        repository
            .send_message(&id, "무슨무슨앱 설치해줘", None)
            .await
            .unwrap();
        let requests = backend.requests.lock().unwrap();
        let instruction = requests[0].system_instruction.clone().unwrap();
        assert!(instruction.contains("지원하지 않는 앱"));
    }

    #[tokio::test]
    async fn test_image_share_targets() {
        let (repository, backend, id) = setup(no_route());
        let kakao = repository
            .send_message(&id, "카톡으로 보내줘", Some("/tmp/a.jpg"))
            .await
            .unwrap();
        assert_eq!(kakao, ChatResponse::KakaoSdkImageShare("/tmp/a.jpg".into()));

        let android = repository
            .send_message(&id, "공유해줘", Some("/tmp/a.jpg"))
            .await
            .unwrap();
        assert_eq!(android, ChatResponse::AndroidImageShare("/tmp/a.jpg".into()));
        assert!(backend.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_image_analysis_sends_inline_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("menu.png");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();
        let uri = path.to_str().unwrap();

        let (repository, backend, id) = setup(no_route());
        let response = repository.send_message(&id, "", Some(uri)).await.unwrap();
        assert!(matches!(response, ChatResponse::Text(_)));

        let requests = backend.requests.lock().unwrap();
        let image = requests[0].image.clone().unwrap();
        assert_eq!(image.mime_type, "image/png");
        assert!(!requests[0].search_grounding);
        assert_eq!(
            requests[0].system_instruction.as_deref(),
            Some(IMAGE_ANALYSIS_INSTRUCTION)
        );
    }

    #[tokio::test]
    async fn test_unreadable_image_clears_loading() {
        let (repository, _, id) = setup(no_route());
        let result = repository
            .send_message(&id, "이게 뭐야", Some("/no/such/file.jpg"))
            .await;
        assert_eq!(result, Err(ChatError::ImageUnreadable));
        assert!(!session::lock(repository.store()).is_loading(&id));
    }

    #[tokio::test]
    async fn test_answer_does_not_add_user_turn() {
        let (repository, _, id) = setup(no_route());
        repository.answer(&id, "서울역 가는 길").await.unwrap();
        let messages = session::lock(repository.store()).messages(&id).unwrap();
        assert_eq!(messages.len(), 1);
        assert!(!messages[0].is_user);
    }
}
