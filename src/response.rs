//! What should happen after a message has been processed, plus its one-line
//! string form.
//!
//! Wire format is `"<TAG>:<payload>"`. Plain text carries no tag and a
//! navigation link is recognized by its `nmap://` scheme. Tags are matched
//! case-insensitively by prefix in declaration order.

use serde::{Deserialize, Serialize};

const IMAGE_SEND: &str = "IMAGE_SEND:";
const KAKAO_SDK_IMAGE_SHARE: &str = "KAKAO_SDK_IMAGE_SHARE:";
const ANDROID_IMAGE_SHARE: &str = "ANDROID_IMAGE_SHARE:";
const KAKAO_MESSAGE_SHARE: &str = "KAKAO_MESSAGE_SHARE:";
const PLAYSTORE_LINK: &str = "PLAYSTORE_LINK:";
const ERROR: &str = "ERROR:";

pub const NAVIGATION_SCHEME: &str = "nmap://";

const MALFORMED_PLAYSTORE_LINK: &str = "잘못된 PlayStore 링크 형식입니다.";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ChatResponse {
    Text(String),
    /// An `nmap://` deep link. Build it with [`ChatResponse::navigation`]; any
    /// other payload has no tagged form and decodes back as [`ChatResponse::Text`].
    NavigationLink(String),
    /// Prompt shown while asking for an image.
    ImagePickerRequest(String),
    KakaoSdkImageShare(String),
    AndroidImageShare(String),
    KakaoMessageShare(String),
    PlayStoreLink {
        package: String,
        app_name: String,
    },
    Error(String),
}

impl ChatResponse {
    pub fn encode(&self) -> String {
        match self {
            ChatResponse::Text(content) => content.clone(),
            ChatResponse::NavigationLink(link) => link.clone(),
            ChatResponse::ImagePickerRequest(prompt) => format!("{IMAGE_SEND}{prompt}"),
            ChatResponse::KakaoSdkImageShare(uri) => format!("{KAKAO_SDK_IMAGE_SHARE}{uri}"),
            ChatResponse::AndroidImageShare(uri) => format!("{ANDROID_IMAGE_SHARE}{uri}"),
            ChatResponse::KakaoMessageShare(message) => format!("{KAKAO_MESSAGE_SHARE}{message}"),
            ChatResponse::PlayStoreLink { package, app_name } => {
                format!("{PLAYSTORE_LINK}{package}:{app_name}")
            }
            ChatResponse::Error(message) => format!("{ERROR}{message}"),
        }
    }

    /// Never fails: unknown input is plain text, a malformed store link is an
    /// [`ChatResponse::Error`].
    pub fn decode(encoded: &str) -> Self {
        if let Some(prompt) = strip_tag(encoded, IMAGE_SEND) {
            return ChatResponse::ImagePickerRequest(prompt.to_string());
        }
        if let Some(uri) = strip_tag(encoded, KAKAO_SDK_IMAGE_SHARE) {
            return ChatResponse::KakaoSdkImageShare(uri.to_string());
        }
        if let Some(uri) = strip_tag(encoded, ANDROID_IMAGE_SHARE) {
            return ChatResponse::AndroidImageShare(uri.to_string());
        }
        if let Some(message) = strip_tag(encoded, KAKAO_MESSAGE_SHARE) {
            return ChatResponse::KakaoMessageShare(message.to_string());
        }
        if let Some(link) = strip_tag(encoded, PLAYSTORE_LINK) {
            // Package ids never contain ':', app names may.
            return match link.split_once(':') {
                Some((package, app_name)) => ChatResponse::PlayStoreLink {
                    package: package.to_string(),
                    app_name: app_name.to_string(),
                },
                None => ChatResponse::Error(MALFORMED_PLAYSTORE_LINK.to_string()),
            };
        }
        // Case-sensitive so ordinary text such as "Error: ..." stays text.
        if let Some(message) = encoded.strip_prefix(ERROR) {
            return ChatResponse::Error(message.to_string());
        }
        if strip_tag(encoded, NAVIGATION_SCHEME).is_some() {
            return ChatResponse::NavigationLink(encoded.to_string());
        }
        ChatResponse::Text(encoded.to_string())
    }

    /// `NavigationLink` for an `nmap://` link, `None` for anything else.
    pub fn navigation(link: impl Into<String>) -> Option<Self> {
        let link = link.into();
        Self::is_navigation_link(&link).then_some(ChatResponse::NavigationLink(link))
    }

    pub fn is_navigation_link(link: &str) -> bool {
        strip_tag(link, NAVIGATION_SCHEME).is_some()
    }
}

fn strip_tag<'a>(encoded: &'a str, tag: &str) -> Option<&'a str> {
    let head = encoded.get(..tag.len())?;
    if head.eq_ignore_ascii_case(tag) {
        Some(&encoded[tag.len()..])
    } else {
        None
    }
}

pub fn encode(response: &ChatResponse) -> String {
    response.encode()
}

pub fn decode(encoded: &str) -> ChatResponse {
    ChatResponse::decode(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_is_untagged() {
        let response = ChatResponse::Text("서울 날씨는 맑음".to_string());
        assert_eq!(response.encode(), "서울 날씨는 맑음");
    }

    #[test]
    fn test_tag_match_ignores_case() {
        assert_eq!(
            decode("image_send:사진을 골라주세요"),
            ChatResponse::ImagePickerRequest("사진을 골라주세요".to_string())
        );
        assert_eq!(
            decode("NMAP://route/public?dname=x"),
            ChatResponse::NavigationLink("NMAP://route/public?dname=x".to_string())
        );
    }

    #[test]
    fn test_playstore_link_splits_on_first_colon() {
        assert_eq!(
            decode("PLAYSTORE_LINK:com.example:Foo: The App"),
            ChatResponse::PlayStoreLink {
                package: "com.example".to_string(),
                app_name: "Foo: The App".to_string(),
            }
        );
    }

    #[test]
    fn test_malformed_playstore_link_is_error() {
        assert!(matches!(
            decode("PLAYSTORE_LINK:com.example"),
            ChatResponse::Error(_)
        ));
        assert!(matches!(decode("PLAYSTORE_LINK:"), ChatResponse::Error(_)));
    }

    #[test]
    fn test_error_tag_is_case_sensitive() {
        let text = ChatResponse::Text("Error: 404 means not found".to_string());
        assert_eq!(decode(&text.encode()), text);
        assert_eq!(
            decode("ERROR:서버 오류"),
            ChatResponse::Error("서버 오류".to_string())
        );
    }

    #[test]
    fn test_navigation_constructor_requires_nmap() {
        assert_eq!(
            ChatResponse::navigation("nmap://route/public?dname=x"),
            Some(ChatResponse::NavigationLink("nmap://route/public?dname=x".to_string()))
        );
        assert_eq!(ChatResponse::navigation("https://map.naver.com/x"), None);
    }

    #[test]
    fn test_short_input_is_text() {
        assert_eq!(decode(""), ChatResponse::Text(String::new()));
        assert_eq!(decode("nm"), ChatResponse::Text("nm".to_string()));
    }

    #[test]
    fn test_multibyte_prefix_does_not_panic() {
        assert_eq!(
            decode("카카오톡 공유"),
            ChatResponse::Text("카카오톡 공유".to_string())
        );
    }
}
