/// Intent detection for incoming chat messages
///
/// Classifies a message (plus whether an image is attached) into exactly one
/// action. Structured commands win over free text; every structured branch
/// that cannot be satisfied degrades to [`Intent::PlainChat`].
///
/// - `keywords` - keyword sets behind each rule
/// - `extract` - slot extraction (KakaoTalk payload, app name)
pub mod extract;
pub mod keywords;

use crate::catalog;
use serde::{Deserialize, Serialize};

pub use extract::{extract_app_name, extract_kakao_message};

/// Prompt attached to an image-only KakaoTalk share request.
pub const KAKAO_IMAGE_PROMPT: &str = "카카오톡으로 사진을 보내주세요.";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Intent {
    /// Send the attached image to the LLM and describe it.
    ImageAnalysis,
    /// Share the attached image through the KakaoTalk SDK.
    KakaoShare,
    /// Share the attached image through the system share sheet.
    AndroidShare,
    /// Ask the map backend for a route; `query` is the raw message.
    NavigationRequest { query: String },
    AppInstallRequest { package: String, app_name: String },
    /// `payload` is `None` when nothing usable could be extracted.
    KakaoMessageRequest { payload: Option<String> },
    /// Ask the user to pick an image. A prompt equal to
    /// [`KAKAO_IMAGE_PROMPT`] marks an image-only KakaoTalk share.
    ImagePickerRequest { prompt: String },
    PlainChat,
}

impl Intent {
    pub fn is_structured(&self) -> bool {
        !matches!(self, Intent::PlainChat)
    }
}

/// Seam for swapping the keyword heuristics for another classifier.
pub trait IntentClassifier: Send + Sync {
    fn classify(&self, message: &str, has_image: bool) -> Intent;
}

/// Rule-based classifier; first matching rule wins.
#[derive(Clone, Copy, Debug, Default)]
pub struct KeywordClassifier;

impl IntentClassifier for KeywordClassifier {
    fn classify(&self, message: &str, has_image: bool) -> Intent {
        classify(message, has_image)
    }
}

pub fn classify(message: &str, has_image: bool) -> Intent {
    if has_image {
        classify_with_image(message)
    } else {
        classify_text(message)
    }
}

fn classify_with_image(message: &str) -> Intent {
    if message.trim().is_empty() || keywords::has_analysis_intent(message) {
        Intent::ImageAnalysis
    } else if keywords::has_kakao_share(message) {
        Intent::KakaoShare
    } else if keywords::has_share(message) {
        Intent::AndroidShare
    } else {
        // Ambiguous text next to a photo is treated as a question about it.
        Intent::ImageAnalysis
    }
}

fn classify_text(message: &str) -> Intent {
    if keywords::has_image_request(message) {
        return Intent::ImagePickerRequest {
            prompt: String::new(),
        };
    }

    if keywords::has_kakao_message(message) {
        if keywords::has_kakao_image(message) {
            return Intent::ImagePickerRequest {
                prompt: KAKAO_IMAGE_PROMPT.to_string(),
            };
        }
        return Intent::KakaoMessageRequest {
            payload: extract_kakao_message(message),
        };
    }

    if keywords::has_app_install(message) {
        if let Some(app_name) = extract_app_name(message)
            && let Some(package) = catalog::package_name(app_name)
        {
            return Intent::AppInstallRequest {
                package: package.to_string(),
                app_name: app_name.to_string(),
            };
        }
        // Unknown app: the LLM explains what is supported.
    }

    if keywords::has_navigation(message) {
        return Intent::NavigationRequest {
            query: message.to_string(),
        };
    }

    Intent::PlainChat
}

/// True when the message asks to install an app we cannot name. Plain chat then
/// answers with the supported-app list instead of the general instruction.
pub fn is_unrecognized_install(message: &str) -> bool {
    keywords::has_app_install(message) && extract_app_name(message).is_none()
}
