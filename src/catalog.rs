//! Store package ids for the apps the assistant can install.
//!
//! The table is ordered; `supported_apps` preserves that order so the
//! "not supported" reply lists apps by category.

const APP_PACKAGES: &[(&str, &str)] = &[
    // Portals / communication
    ("네이버", "com.nhn.android.search"),
    ("카카오톡", "com.kakao.talk"),
    ("다음", "net.daum.android.daum"),
    ("유튜브", "com.google.android.youtube"),
    ("인스타그램", "com.instagram.android"),
    ("트위터", "com.twitter.android"),
    ("디스코드", "com.discord"),
    ("당근마켓", "com.towneers.www"),
    // Media / shopping
    ("쿠팡", "com.coupang.mobile"),
    ("아마존", "com.amazon.mShop.android.shopping"),
    ("넷플릭스", "com.netflix.mediaclient"),
    ("스포티파이", "com.spotify.music"),
    ("GS SHOP", "gsshop.mobile.v2"),
    ("현대홈쇼핑", "com.hmallapp"),
    // Delivery
    ("배달의민족", "com.baemin.app"),
    ("요기요", "com.fineapp.yogiyo"),
    // Maps / transport
    ("티맵", "com.skt.tmap.ku"),
    ("구글맵", "com.google.android.apps.maps"),
    ("네이버맵", "com.nhn.android.nmap"),
    ("카카오맵", "net.daum.android.map"),
    // Translation / cloud
    ("구글번역", "com.google.android.apps.translate"),
    ("파파고", "com.naver.labs.translator"),
    ("구글드라이브", "com.google.android.apps.docs"),
    ("원드라이브", "com.microsoft.skydrive"),
    ("드롭박스", "com.dropbox.android"),
    ("구글포토", "com.google.android.apps.photos"),
    // Calendar / notes
    ("구글캘린더", "com.google.android.calendar"),
    ("삼성캘린더", "com.samsung.android.calendar"),
    ("구글메모", "com.google.android.keep"),
    ("삼성메모", "com.samsung.android.app.notes"),
    // Health
    ("닥터나우", "com.baedalyakgook_user"),
    ("The건강보험", "kr.or.nhic"),
    ("모바일건강보험증", "kr.or.nhiq"),
    ("삼성헬스", "com.sec.android.app.shealth"),
    // Other
    ("줌", "us.zoom.videomeetings"),
    ("구글미트", "com.google.android.apps.tachyon"),
    ("폴라리스오피스", "com.infraware.office.link"),
    ("정부24", "kr.go.minwon.m"),
];

/// Package id for a canonical app name (exact match).
pub fn package_name(app_name: &str) -> Option<&'static str> {
    APP_PACKAGES
        .iter()
        .find(|(name, _)| *name == app_name)
        .map(|(_, package)| *package)
}

pub fn is_supported(app_name: &str) -> bool {
    package_name(app_name).is_some()
}

pub fn supported_apps() -> Vec<&'static str> {
    APP_PACKAGES.iter().map(|(name, _)| *name).collect()
}

/// Web listing used when the store app is not installed.
pub fn web_store_url(package: &str) -> String {
    format!("https://play.google.com/store/apps/details?id={package}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_app() {
        assert_eq!(package_name("GS SHOP"), Some("gsshop.mobile.v2"));
        assert_eq!(package_name("카카오톡"), Some("com.kakao.talk"));
    }

    #[test]
    fn test_lookup_is_exact() {
        assert_eq!(package_name("gs shop"), None);
        assert!(!is_supported("틱톡"));
    }

    #[test]
    fn test_supported_apps_preserves_order() {
        let apps = supported_apps();
        assert_eq!(apps.first(), Some(&"네이버"));
        assert_eq!(apps.last(), Some(&"정부24"));
        assert_eq!(apps.len(), APP_PACKAGES.len());
    }

    #[test]
    fn test_web_store_url() {
        assert!(web_store_url("com.discord").ends_with("id=com.discord"));
    }
}
