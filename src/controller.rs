//! Front-end facing state machine.
//!
//! [`ChatController`] owns the session store, the repository and the device
//! collaborators. It sends messages on the active session and acts on the
//! resulting [`ChatResponse`]: opening dialogs, handing links to the device
//! and posting status lines into the conversation.
//!
//! Every handler works against the session the request came from. When that
//! session has been closed in the meantime the handler does nothing.

use crate::ai::{ChatBackend, ChatError};
use crate::media;
use crate::platform::{Friend, MessageTarget, Messenger, Platform, StoreOpened};
use crate::repository::ChatRepository;
use crate::response::{self, ChatResponse};
use crate::session::{self, SharedStore};
use crate::types::{ChatMessage, ChatSession, NEW_CHAT_TITLE, SessionId};
use std::sync::Arc;

const KAKAO_PROMPT_MARKER: &str = "카카오톡";

const MSG_LOGIN_OK: &str = "카카오 로그인에 성공했습니다. 이제 메시지를 전송할 수 있습니다.";
const MSG_EMPTY_KAKAO: &str = "전송할 메시지가 비어있습니다.";
const MSG_EMPTY_KAKAO_WITH_IMAGE: &str = "전송할 메시지나 이미지 중 하나는 필요합니다.";
const MSG_CHOOSER_OPENED: &str = "카카오톡 공유 화면이 열렸습니다. 전송할 대화방을 선택하세요.";
const MSG_IMAGE_LOGIN_NEEDED: &str = "카카오톡으로 이미지를 전송하려면 카카오 로그인이 필요합니다.";
const MSG_IMAGE_FILE_UNREADABLE: &str = "이미지 파일을 읽을 수 없습니다.";
const MSG_UPLOADING: &str = "이미지를 카카오 서버에 업로드하고 있습니다...";
const MSG_SHARE_SHEET_OPENED: &str = "공유 화면이 열렸습니다. 원하는 앱을 선택하세요.";
const MSG_IMAGE_AND_TEXT_OPENED: &str = "카카오톡으로 이미지와 메시지 전송 화면이 열렸습니다.";
const MSG_FRIENDS_LOGIN_NEEDED: &str = "친구 목록을 불러오려면 카카오 로그인이 필요합니다.";
const MSG_FRIENDS_FAILED: &str = "친구 목록을 불러오는데 실패했습니다. 카카오톡 친구 목록 동의를 확인해주세요.\n\nKakao Developers에서 '카카오 서비스 내 친구 목록' 권한을 활성화해야 합니다.";

/// Draft shown in the KakaoTalk send dialog.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KakaoDraft {
    pub message: String,
    pub image_uri: Option<String>,
}

/// Dialogs and composer attachments the front-end should render.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UiState {
    /// Deep link offered in the map dialog.
    pub map_link: Option<String>,
    pub kakao_dialog: Option<KakaoDraft>,
    pub image_picker_open: bool,
    pub friend_picker: Option<Vec<Friend>>,
    /// Image attached to the next message from the composer.
    pub attached_image: Option<String>,
}

/// Text waiting on a follow-up action, tied to the session it came from.
#[derive(Clone, Debug)]
struct Pending {
    session: SessionId,
    text: String,
}

pub struct ChatController {
    store: SharedStore,
    repository: ChatRepository,
    messenger: Arc<dyn Messenger>,
    platform: Arc<dyn Platform>,
    ui: UiState,
    pending_share: Option<Pending>,
    pending_navigation: Option<Pending>,
    pending_friend_message: String,
}

impl ChatController {
    pub fn new(
        repository: ChatRepository,
        messenger: Arc<dyn Messenger>,
        platform: Arc<dyn Platform>,
    ) -> Self {
        Self {
            store: repository.store().clone(),
            repository,
            messenger,
            platform,
            ui: UiState::default(),
            pending_share: None,
            pending_navigation: None,
            pending_friend_message: String::new(),
        }
    }

    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    pub fn set_backend(&mut self, backend: Option<Arc<dyn ChatBackend>>) {
        self.repository.set_backend(backend);
    }

    // ============================================
    // Sessions
    // ============================================

    pub fn sessions(&self) -> Vec<ChatSession> {
        session::lock(&self.store).sessions()
    }

    pub fn active_id(&self) -> SessionId {
        session::lock(&self.store).active_id()
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        let store = session::lock(&self.store);
        store.messages(&store.active_id()).unwrap_or_default()
    }

    pub fn is_loading(&self) -> bool {
        let store = session::lock(&self.store);
        store.is_loading(&store.active_id())
    }

    pub fn new_session(&mut self) -> SessionId {
        session::lock(&self.store).create(NEW_CHAT_TITLE)
    }

    pub fn select_session(&mut self, id: &SessionId) -> bool {
        session::lock(&self.store).select(id)
    }

    /// Closes a tab and forgets follow-ups that belonged to it.
    pub fn close_session(&mut self, id: &SessionId) -> SessionId {
        if self.pending_share.as_ref().is_some_and(|p| &p.session == id) {
            self.pending_share = None;
            self.ui.image_picker_open = false;
        }
        if self.pending_navigation.as_ref().is_some_and(|p| &p.session == id) {
            self.pending_navigation = None;
            self.ui.map_link = None;
        }
        session::lock(&self.store).close(id)
    }

    pub fn clear_messages(&mut self) {
        let mut store = session::lock(&self.store);
        let id = store.active_id();
        store.clear(&id);
    }

    // ============================================
    // Messages
    // ============================================

    /// Sends `text` (and the composer attachment, if any) on the active session.
    ///
    /// Returns the handled response, or `None` when the request failed. Failures
    /// are posted into the conversation.
    pub async fn send_message(&mut self, text: &str) -> Option<ChatResponse> {
        let session_id = self.active_id();
        let image = self.ui.attached_image.take();
        self.submit(&session_id, text, image.as_deref()).await
    }

    async fn submit(
        &mut self,
        session_id: &SessionId,
        text: &str,
        image_uri: Option<&str>,
    ) -> Option<ChatResponse> {
        match self.repository.send_message(session_id, text, image_uri).await {
            Ok(response) => {
                self.dispatch(session_id, text, &response).await;
                Some(response)
            }
            Err(ChatError::SessionClosed) => None,
            Err(err) => {
                self.post(session_id, format!("오류가 발생했습니다: {err}"));
                None
            }
        }
    }

    /// Decodes a tagged response string and acts on it in the active session,
    /// as if the repository had returned it.
    pub async fn handle_encoded(&mut self, encoded: &str) -> ChatResponse {
        let session_id = self.active_id();
        let response = response::decode(encoded);
        self.dispatch(&session_id, "", &response).await;
        response
    }

    async fn dispatch(&mut self, session_id: &SessionId, text: &str, response: &ChatResponse) {
        if !session::lock(&self.store).contains(session_id) {
            tracing::debug!(session = %session_id, "response for closed session dropped");
            return;
        }

        match response {
            ChatResponse::Text(_) => {}
            ChatResponse::NavigationLink(link) => {
                self.post(
                    session_id,
                    format!("🗺️ 네이버 지도 길찾기 링크가 생성되었습니다.\n\n[{link}]({link})"),
                );
                self.ui.map_link = Some(link.clone());
                self.pending_navigation = Some(Pending {
                    session: session_id.clone(),
                    text: text.to_string(),
                });
            }
            ChatResponse::ImagePickerRequest(prompt) => {
                if prompt.contains(KAKAO_PROMPT_MARKER) {
                    self.ui.kakao_dialog = Some(KakaoDraft::default());
                } else {
                    self.pending_share = Some(Pending {
                        session: session_id.clone(),
                        text: text.to_string(),
                    });
                    self.ui.image_picker_open = true;
                }
            }
            ChatResponse::KakaoMessageShare(message) => {
                self.pending_friend_message = message.clone();
                self.ui.kakao_dialog = Some(KakaoDraft {
                    message: message.clone(),
                    image_uri: None,
                });
            }
            ChatResponse::KakaoSdkImageShare(uri) => self.share_to_kakao(session_id, uri).await,
            ChatResponse::AndroidImageShare(uri) => {
                let notice = match self.platform.share_image(uri) {
                    Ok(()) => MSG_SHARE_SHEET_OPENED.to_string(),
                    Err(err) => format!("이미지 공유에 실패했습니다: {err}"),
                };
                self.post(session_id, notice);
            }
            ChatResponse::PlayStoreLink { package, app_name } => {
                let notice = match self.platform.open_store(package) {
                    Ok(StoreOpened::App) => format!("📱 {app_name} 앱의 플레이스토어 페이지가 열렸습니다."),
                    Ok(StoreOpened::Web) => {
                        format!("📱 {app_name} 앱의 플레이스토어 웹페이지가 열렸습니다.")
                    }
                    Err(err) => format!("플레이스토어를 열 수 없습니다: {err}"),
                };
                self.post(session_id, notice);
            }
            ChatResponse::Error(message) => self.post(session_id, format!("오류: {message}")),
        }
    }

    async fn share_to_kakao(&mut self, session_id: &SessionId, uri: &str) {
        if !self.messenger.is_logged_in().await {
            self.post(session_id, MSG_IMAGE_LOGIN_NEEDED);
            self.login_kakao().await;
            return;
        }

        let exists = tokio::fs::try_exists(media::image_path(uri))
            .await
            .unwrap_or(false);
        if !exists {
            self.post(session_id, MSG_IMAGE_FILE_UNREADABLE);
            return;
        }

        self.post(session_id, MSG_UPLOADING);
        let notice = match self.messenger.upload_and_share_image(uri).await {
            Ok(()) => MSG_CHOOSER_OPENED.to_string(),
            Err(err) => format!("카카오톡 이미지 공유에 실패했습니다: {}", err.user_message()),
        };
        self.post(session_id, notice);
    }

    // ============================================
    // Image picker
    // ============================================

    /// Image chosen in the picker. A remembered request is re-sent with the
    /// image and classified again; otherwise the image goes to the composer.
    pub async fn on_image_selected(&mut self, uri: &str) -> Option<ChatResponse> {
        self.ui.image_picker_open = false;
        match self.pending_share.take() {
            Some(pending) => self.submit(&pending.session, &pending.text, Some(uri)).await,
            None => {
                self.ui.attached_image = Some(uri.to_string());
                None
            }
        }
    }

    pub fn open_image_picker(&mut self) {
        self.ui.image_picker_open = true;
    }

    pub fn dismiss_image_picker(&mut self) {
        self.ui.image_picker_open = false;
        self.pending_share = None;
    }

    pub fn attach_image(&mut self, uri: &str) {
        self.ui.attached_image = Some(uri.to_string());
    }

    pub fn remove_attached_image(&mut self) {
        self.ui.attached_image = None;
    }

    // ============================================
    // Map dialog
    // ============================================

    pub fn open_map(&mut self) {
        let Some(link) = self.ui.map_link.take() else {
            return;
        };
        let pending = self.pending_navigation.take();
        if let Err(err) = self.platform.open_map(&link) {
            tracing::warn!(error = %err, "failed to open map");
            if let Some(pending) = pending {
                self.post(&pending.session, format!("지도를 열 수 없습니다: {err}"));
            }
        }
    }

    pub fn dismiss_map_dialog(&mut self) {
        self.ui.map_link = None;
    }

    /// Declines the route and answers the original question as plain chat.
    pub async fn cancel_map_dialog(&mut self) -> Option<ChatResponse> {
        self.ui.map_link = None;
        let pending = self.pending_navigation.take()?;
        match self.repository.answer(&pending.session, &pending.text).await {
            Ok(response) => Some(response),
            Err(ChatError::SessionClosed) => None,
            Err(err) => {
                self.post(&pending.session, format!("오류가 발생했습니다: {err}"));
                None
            }
        }
    }

    // ============================================
    // KakaoTalk
    // ============================================

    pub async fn login_kakao(&mut self) -> bool {
        let session_id = self.active_id();
        match self.messenger.login().await {
            Ok(()) => {
                self.post(&session_id, MSG_LOGIN_OK);
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "kakao login failed");
                self.post(&session_id, err.user_message());
                false
            }
        }
    }

    /// Opens the share chooser with `text`. Prompts for login first when needed.
    pub async fn send_kakao_message(&mut self, text: &str) {
        if !self.messenger.is_logged_in().await {
            self.login_kakao().await;
            return;
        }
        let session_id = self.active_id();
        if text.trim().is_empty() {
            self.post(&session_id, MSG_EMPTY_KAKAO);
            return;
        }

        let notice = match self.messenger.send_text(text, MessageTarget::Chooser).await {
            Ok(()) => MSG_CHOOSER_OPENED.to_string(),
            Err(err) => err.user_message(),
        };
        self.post(&session_id, notice);
        self.ui.kakao_dialog = None;
    }

    pub async fn send_kakao_message_with_image(&mut self, text: &str, image_uri: Option<&str>) {
        if !self.messenger.is_logged_in().await {
            self.login_kakao().await;
            return;
        }
        let session_id = self.active_id();
        let Some(uri) = image_uri else {
            if text.trim().is_empty() {
                self.post(&session_id, MSG_EMPTY_KAKAO_WITH_IMAGE);
            } else {
                self.send_kakao_message(text).await;
            }
            return;
        };

        let notice = match self.messenger.share_image(uri, text).await {
            Ok(()) => MSG_IMAGE_AND_TEXT_OPENED.to_string(),
            Err(err) => format!("이미지 전송 실패: {}", err.user_message()),
        };
        self.post(&session_id, notice);
        self.ui.kakao_dialog = None;
    }

    /// Sends the open Kakao dialog's draft.
    pub async fn submit_kakao_dialog(&mut self) {
        let Some(draft) = self.ui.kakao_dialog.clone() else {
            return;
        };
        self.send_kakao_message_with_image(&draft.message, draft.image_uri.as_deref())
            .await;
    }

    pub fn select_kakao_image(&mut self, uri: &str) {
        let draft = self.ui.kakao_dialog.get_or_insert_with(KakaoDraft::default);
        draft.image_uri = Some(uri.to_string());
    }

    pub fn remove_kakao_image(&mut self) {
        if let Some(draft) = self.ui.kakao_dialog.as_mut() {
            draft.image_uri = None;
        }
    }

    pub fn dismiss_kakao_dialog(&mut self) {
        self.ui.kakao_dialog = None;
    }

    /// Remembers `message` for a direct send and loads the friend list.
    pub async fn open_friend_picker(&mut self, message: &str) {
        self.pending_friend_message = message.to_string();
        self.load_friends().await;
    }

    pub async fn load_friends(&mut self) {
        let session_id = self.active_id();
        if !self.messenger.is_logged_in().await {
            self.post(&session_id, MSG_FRIENDS_LOGIN_NEEDED);
            return;
        }
        match self.messenger.friends().await {
            Ok(friends) => {
                tracing::debug!(count = friends.len(), "friends loaded");
                self.ui.friend_picker = Some(friends);
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to load friends");
                self.post(&session_id, MSG_FRIENDS_FAILED);
            }
        }
    }

    pub async fn send_message_to_friend(&mut self, friend: &Friend) {
        let session_id = self.active_id();
        let message = self.pending_friend_message.clone();
        if message.trim().is_empty() {
            self.post(&session_id, MSG_EMPTY_KAKAO);
            return;
        }

        let target = MessageTarget::Friends(vec![friend.uuid.clone()]);
        match self.messenger.send_text(&message, target).await {
            Ok(()) => {
                self.post(
                    &session_id,
                    format!("{}님에게 메시지를 전송했습니다: \"{message}\"", friend.nickname),
                );
                self.ui.friend_picker = None;
                self.pending_friend_message.clear();
            }
            Err(err) => self.post(&session_id, err.user_message()),
        }
    }

    pub fn dismiss_friend_picker(&mut self) {
        self.ui.friend_picker = None;
    }

    fn post(&self, session_id: &SessionId, content: impl Into<String>) {
        session::lock(&self.store).append(session_id, ChatMessage::assistant(content));
    }
}
