//! Keyword sets behind each intent rule. All checks are case-insensitive
//! substring tests on the whole message.

const ANALYSIS: &[&str] = &[
    "분석",
    "뭐야",
    "무엇",
    "설명",
    "알려",
    "이게",
    "무슨",
    "뭔지",
    "analyze",
    "explain",
    "what is this",
    "what's this",
];

const KAKAO_SHARE: &[&str] = &["카톡", "카카오", "카카오톡"];

const SHARE: &[&str] = &["공유", "보내", "전송"];

const IMAGE_REQUEST: &[&str] = &["이미지", "사진", "그림", "첨부", "업로드", "선택"];

const KAKAO_MESSAGE: &[&str] = &["카톡", "카카오", "카카오톡", "kakao"];

const KAKAO_IMAGE: &[&str] = &["사진", "이미지", "그림", "photo", "image", "picture"];

const APP_INSTALL: &[&str] = &["설치", "다운", "받아", "깔아", "인스톨", "install"];

const NAVIGATION: &[&str] = &[
    "길찾기",
    "길",
    "가고",
    "가자",
    "가려고",
    "가야",
    "가고싶",
    "가고 싶",
    "경로",
    "네비",
    "내비",
    "navigation",
    "route",
];

fn contains_any(message: &str, keywords: &[&str]) -> bool {
    let lower = message.to_lowercase();
    keywords.iter().any(|keyword| lower.contains(keyword))
}

/// The user is asking about the attached picture.
pub fn has_analysis_intent(message: &str) -> bool {
    contains_any(message, ANALYSIS)
}

/// An attached picture should go out through KakaoTalk.
pub fn has_kakao_share(message: &str) -> bool {
    contains_any(message, KAKAO_SHARE)
}

pub fn has_share(message: &str) -> bool {
    contains_any(message, SHARE)
}

/// The user wants to attach a picture before continuing.
pub fn has_image_request(message: &str) -> bool {
    contains_any(message, IMAGE_REQUEST)
}

pub fn has_kakao_message(message: &str) -> bool {
    contains_any(message, KAKAO_MESSAGE)
}

pub fn has_kakao_image(message: &str) -> bool {
    contains_any(message, KAKAO_IMAGE)
}

pub fn has_app_install(message: &str) -> bool {
    contains_any(message, APP_INSTALL)
}

pub fn has_navigation(message: &str) -> bool {
    contains_any(message, NAVIGATION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_ignores_case() {
        assert!(has_kakao_message("KAKAO로 보내줘"));
        assert!(has_app_install("Install zoom"));
        assert!(has_navigation("Route to Seoul station"));
    }

    #[test]
    fn test_spaced_variant_of_navigation() {
        assert!(has_navigation("부산 가고 싶어"));
    }

    #[test]
    fn test_unrelated_text() {
        let text = "오늘 날씨 어때?";
        assert!(!has_analysis_intent(text));
        assert!(!has_image_request(text));
        assert!(!has_kakao_message(text));
        assert!(!has_app_install(text));
        assert!(!has_navigation(text));
    }
}
