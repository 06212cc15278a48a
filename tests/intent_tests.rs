//! Integration tests for intent detection and slot extraction

use opener::catalog;
use opener::intent::{
    Intent, IntentClassifier, KAKAO_IMAGE_PROMPT, KeywordClassifier, classify,
    extract_app_name, extract_kakao_message,
};

mod priority_tests {
    use super::*;

    #[test]
    fn test_blank_text_with_image() {
        assert_eq!(classify("", true), Intent::ImageAnalysis);
    }

    #[test]
    fn test_kakao_before_navigation() {
        let intent = classify("서울역 가는 길 카톡으로 보내줘", false);
        assert!(matches!(intent, Intent::KakaoMessageRequest { .. }));
    }

    #[test]
    fn test_image_request_before_kakao() {
        assert_eq!(
            classify("사진 카톡으로 보내줘", false),
            Intent::ImagePickerRequest {
                prompt: String::new()
            }
        );
    }

    #[test]
    fn test_install_before_navigation() {
        assert_eq!(
            classify("쿠팡 설치해줘 가야 해", false),
            Intent::AppInstallRequest {
                package: "com.coupang.mobile".to_string(),
                app_name: "쿠팡".to_string(),
            }
        );
    }

    #[test]
    fn test_classifier_trait_matches_free_function() {
        let classifier = KeywordClassifier;
        for (message, has_image) in [
            ("GS SHOP 설치해줘", false),
            ("강남역 가는 길", false),
            ("이거 공유해줘", true),
            ("안녕하세요", false),
        ] {
            assert_eq!(
                classifier.classify(message, has_image),
                classify(message, has_image)
            );
        }
    }
}

mod install_tests {
    use super::*;

    #[test]
    fn test_gs_shop() {
        assert_eq!(
            classify("GS SHOP 설치해줘", false),
            Intent::AppInstallRequest {
                package: "gsshop.mobile.v2".to_string(),
                app_name: "GS SHOP".to_string(),
            }
        );
    }

    #[test]
    fn test_other_install_phrasings() {
        let intent = classify("넷플릭스 다운받아줘", false);
        assert_eq!(
            intent,
            Intent::AppInstallRequest {
                package: "com.netflix.mediaclient".to_string(),
                app_name: "넷플릭스".to_string(),
            }
        );
        assert!(catalog::is_supported("넷플릭스"));
    }

    #[test]
    fn test_alias_wins_over_longer_catalog_name() {
        assert_eq!(extract_app_name("네이버맵 깔아줘"), Some("네이버"));
    }

    #[test]
    fn test_unknown_app_is_plain_chat() {
        assert_eq!(classify("없는앱이름 설치해줘", false), Intent::PlainChat);
    }
}

mod kakao_tests {
    use super::*;

    #[test]
    fn test_payload_extraction() {
        assert_eq!(
            extract_kakao_message("내일 보자 라고 카톡 보내줘"),
            Some("내일 보자".to_string())
        );
    }

    #[test]
    fn test_image_only_request_uses_kakao_prompt() {
        assert_eq!(
            classify("카카오톡으로 사진 보낼래", false),
            Intent::ImagePickerRequest {
                prompt: String::new()
            }
        );
        assert_eq!(
            classify("카톡으로 photo 보내줘", false),
            Intent::ImagePickerRequest {
                prompt: KAKAO_IMAGE_PROMPT.to_string()
            }
        );
    }
}
