//! Slot extraction: the message payload of a KakaoTalk request and the app
//! name of an install request.

use crate::catalog;
use once_cell::sync::Lazy;
use regex::Regex;

/// Phrasings that wrap a message payload, tried in order.
static KAKAO_TEMPLATES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // "<payload> 라고 카톡 보내줘"
        r"(?i)(.+?)(?:라고|라고 |라고해서|고 |랑 )(?:카카오톡|카톡)",
        r#"(?i)카카오톡으로\s+["']?(.+?)["']?\s*보내"#,
        r#"(?i)카톡으로\s+["']?(.+?)["']?\s*보내"#,
        r#"(?i)메시지\s+["']?(.+?)["']?\s*보내"#,
        r#"(?i)["'](.+?)["']\s*(?:를|을)?\s*카카오톡"#,
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).expect("kakao template must compile"))
    .collect()
});

static TRAILING_CONNECTOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:라고|라고 |라고해서|고 |랑 |라고 말해|라고 말하면|이라고)\s*$")
        .expect("connector pattern must compile")
});

static COMMAND_WORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"카카오톡으로|카톡으로|메시지로|보내줘|전송해줘|보내|전송|라고|라고 |라고해서|고 |랑 |라고 말해|라고 말하면|이라고",
    )
    .expect("command word pattern must compile")
});

/// Surface forms mapped to the canonical app name, checked in order.
const APP_ALIASES: &[(&str, &str)] = &[
    ("네이버", "네이버"),
    ("naver", "네이버"),
    ("카카오톡", "카카오톡"),
    ("카톡", "카카오톡"),
    ("kakao", "카카오톡"),
    ("유튜브", "유튜브"),
    ("youtube", "유튜브"),
    ("인스타그램", "인스타그램"),
    ("instagram", "인스타그램"),
    ("인스타", "인스타그램"),
    ("틱톡", "틱톡"),
    ("tiktok", "틱톡"),
    ("페이스북", "페이스북"),
    ("facebook", "페이스북"),
    ("왓츠앱", "왓츠앱"),
    ("whatsapp", "왓츠앱"),
    ("텔레그램", "텔레그램"),
    ("telegram", "텔레그램"),
    ("닥터나우", "닥터나우"),
    ("닥터나", "닥터나우"),
    ("doctornow", "닥터나우"),
];

/// Pulls the text to send out of a KakaoTalk request such as
/// `"내일 보자 라고 카톡 보내줘"`.
///
/// Returns `None` when nothing is left after stripping command words; callers
/// should ask the user for the message instead of sending an empty one.
pub fn extract_kakao_message(message: &str) -> Option<String> {
    for template in KAKAO_TEMPLATES.iter() {
        let Some(captures) = template.captures(message) else {
            continue;
        };
        let Some(group) = captures.get(1) else {
            continue;
        };
        let extracted = TRAILING_CONNECTOR.replace(group.as_str().trim(), "");
        let extracted = extracted.trim();
        if !extracted.is_empty() {
            return Some(extracted.to_string());
        }
    }

    let stripped = COMMAND_WORDS.replace_all(message, "");
    let stripped = stripped.trim();
    let stripped = strip_quote(stripped, '"');
    let stripped = strip_quote(stripped, '\'').trim();

    if stripped.is_empty() {
        None
    } else {
        Some(stripped.to_string())
    }
}

fn strip_quote(text: &str, quote: char) -> &str {
    let text = text.strip_prefix(quote).unwrap_or(text);
    text.strip_suffix(quote).unwrap_or(text)
}

/// Canonical app name mentioned in an install request, if any.
///
/// Aliases win over the catalog scan, so "네이버맵" resolves to "네이버".
pub fn extract_app_name(message: &str) -> Option<&'static str> {
    let normalized = message.to_lowercase().replace(' ', "");

    if let Some((_, app)) = APP_ALIASES
        .iter()
        .find(|(alias, _)| normalized.contains(alias))
    {
        return Some(app);
    }

    catalog::supported_apps().into_iter().find(|app| {
        let lower = app.to_lowercase();
        normalized.contains(&lower) || normalized.contains(&lower.replace(' ', ""))
    })
}
