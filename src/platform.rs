//! Outward-facing collaborators: the KakaoTalk messenger and the device
//! (share sheet, store, map app).
//!
//! The core only decides which call to make and with what payload; these
//! traits are implemented by the host application. The console versions
//! below back the terminal front-end.

use crate::catalog;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessengerError {
    #[error("NotRegisteredUserException: {0}")]
    NotRegisteredUser(String),

    #[error("NotSupportedException: {0}")]
    NotSupported(String),

    #[error("NetworkError: {0}")]
    Network(String),

    #[error("InsufficientScope: {0}")]
    InsufficientScope(String),

    #[error("{0}")]
    Failed(String),
}

impl MessengerError {
    pub fn user_message(&self) -> String {
        match self {
            MessengerError::NotRegisteredUser(_) => {
                "카카오톡에 로그인이 필요합니다. 로그인 후 다시 시도해주세요.".to_string()
            }
            MessengerError::NotSupported(_) => {
                "카카오톡이 설치되어 있지 않거나 지원되지 않는 기능입니다.".to_string()
            }
            MessengerError::Network(_) => {
                "네트워크 오류가 발생했습니다. 연결 상태를 확인해주세요.".to_string()
            }
            MessengerError::InsufficientScope(_) => {
                "권한이 부족합니다. 카카오톡 메시지 전송 권한을 허용해주세요.".to_string()
            }
            MessengerError::Failed(message) => format!("메시지 전송에 실패했습니다: {message}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Friend {
    pub id: i64,
    pub uuid: String,
    pub nickname: String,
    #[serde(default)]
    pub profile_thumbnail_image: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MessageTarget {
    /// "Send to me" memo chat.
    Me,
    /// Share sheet where the user picks the chat room.
    Chooser,
    Friends(Vec<String>),
}

#[async_trait]
pub trait Messenger: Send + Sync {
    async fn is_logged_in(&self) -> bool;
    async fn login(&self) -> Result<(), MessengerError>;
    async fn send_text(&self, text: &str, target: MessageTarget) -> Result<(), MessengerError>;
    /// Image (plus optional caption) through the KakaoTalk share intent.
    async fn share_image(&self, image_uri: &str, text: &str) -> Result<(), MessengerError>;
    /// Uploads the image to Kakao and opens the feed-template share.
    async fn upload_and_share_image(&self, image_uri: &str) -> Result<(), MessengerError>;
    async fn friends(&self) -> Result<Vec<Friend>, MessengerError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    #[error("no application can handle {0}")]
    NoHandler(String),

    #[error("{0}")]
    Failed(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreOpened {
    App,
    Web,
}

/// Device actions. All of them only hand the request to the OS.
pub trait Platform: Send + Sync {
    fn open_map(&self, deep_link: &str) -> Result<(), PlatformError>;
    fn share_image(&self, image_uri: &str) -> Result<(), PlatformError>;
    fn open_store(&self, package: &str) -> Result<StoreOpened, PlatformError>;
}

/// Prints what a device would open.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsolePlatform;

impl Platform for ConsolePlatform {
    fn open_map(&self, deep_link: &str) -> Result<(), PlatformError> {
        println!("[map] {deep_link}");
        Ok(())
    }

    fn share_image(&self, image_uri: &str) -> Result<(), PlatformError> {
        println!("[share] {image_uri}");
        Ok(())
    }

    fn open_store(&self, package: &str) -> Result<StoreOpened, PlatformError> {
        println!("[store] {}", catalog::web_store_url(package));
        Ok(StoreOpened::Web)
    }
}

/// Messenger for hosts without KakaoTalk.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnavailableMessenger;

impl UnavailableMessenger {
    fn unsupported() -> MessengerError {
        MessengerError::NotSupported("카카오톡이 설치되어 있지 않습니다.".to_string())
    }
}

#[async_trait]
impl Messenger for UnavailableMessenger {
    async fn is_logged_in(&self) -> bool {
        false
    }

    async fn login(&self) -> Result<(), MessengerError> {
        Err(Self::unsupported())
    }

    async fn send_text(&self, _text: &str, _target: MessageTarget) -> Result<(), MessengerError> {
        Err(Self::unsupported())
    }

    async fn share_image(&self, _image_uri: &str, _text: &str) -> Result<(), MessengerError> {
        Err(Self::unsupported())
    }

    async fn upload_and_share_image(&self, _image_uri: &str) -> Result<(), MessengerError> {
        Err(Self::unsupported())
    }

    async fn friends(&self) -> Result<Vec<Friend>, MessengerError> {
        Err(Self::unsupported())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messenger_error_messages() {
        assert!(
            MessengerError::NotRegisteredUser(String::new())
                .user_message()
                .contains("로그인이 필요")
        );
        assert_eq!(
            MessengerError::Failed("timeout".into()).user_message(),
            "메시지 전송에 실패했습니다: timeout"
        );
    }

    #[tokio::test]
    async fn test_unavailable_messenger() {
        let messenger = UnavailableMessenger;
        assert!(!messenger.is_logged_in().await);
        assert!(matches!(
            messenger.send_text("hi", MessageTarget::Me).await,
            Err(MessengerError::NotSupported(_))
        ));
    }

    #[test]
    fn test_console_store_opens_web() {
        assert_eq!(ConsolePlatform.open_store("com.discord"), Ok(StoreOpened::Web));
    }
}
