//! Language codes and the language sets supported by each backend family.
//!
//! Translation and speech backends speak slightly different dialects of ISO
//! 639-1: M2M100 calls Hebrew `he` while Google TTS still calls it `iw`,
//! Javanese is `jv` vs `jw`, and Chinese needs a region for speech. A target
//! language is only accepted when it survives *both* stages, so the check
//! happens once, before any model is invoked.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The 100 language codes accepted by `facebook/m2m100_418M`.
pub const M2M100_LANGUAGES: &[&str] = &[
    "af", "am", "ar", "ast", "az", "ba", "be", "bg", "bn", "br", "bs", "ca", "ceb", "cs", "cy",
    "da", "de", "el", "en", "es", "et", "fa", "ff", "fi", "fr", "fy", "ga", "gd", "gl", "gu",
    "ha", "he", "hi", "hr", "ht", "hu", "hy", "id", "ig", "ilo", "is", "it", "ja", "jv", "ka",
    "kk", "km", "kn", "ko", "lb", "lg", "ln", "lo", "lt", "lv", "mg", "mk", "ml", "mn", "mr",
    "ms", "my", "ne", "nl", "no", "ns", "oc", "or", "pa", "pl", "ps", "pt", "ro", "ru", "sd",
    "si", "sk", "sl", "so", "sq", "sr", "ss", "su", "sv", "sw", "ta", "th", "tl", "tn", "tr",
    "uk", "ur", "uz", "vi", "wo", "xh", "yi", "yo", "zh", "zu",
];

/// Language codes accepted by the Google Translate TTS endpoint.
pub const GOOGLE_TTS_LANGUAGES: &[&str] = &[
    "af", "am", "ar", "bg", "bn", "bs", "ca", "cs", "cy", "da", "de", "el", "en", "es", "et",
    "eu", "fi", "fr", "fr-CA", "gl", "gu", "ha", "hi", "hr", "hu", "id", "is", "it", "iw", "ja",
    "jw", "km", "kn", "ko", "la", "lt", "lv", "ml", "mr", "ms", "my", "ne", "nl", "no", "pa",
    "pl", "pt", "pt-PT", "ro", "ru", "si", "sk", "sq", "sr", "su", "sv", "sw", "ta", "te", "th",
    "tl", "tr", "uk", "ur", "vi", "yue", "zh-CN", "zh-TW",
];

/// A normalised language code as supplied by the caller (`"es"`, `"zh"`, `"pt-PT"`).
///
/// Normalisation trims whitespace, lowercases the primary subtag and
/// uppercases a region subtag, so `" ZH-cn "` becomes `"zh-CN"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageCode(String);

impl LanguageCode {
    pub fn new(code: impl AsRef<str>) -> Self {
        let code = code.as_ref().trim();
        let normalised = match code.split_once(['-', '_']) {
            Some((primary, region)) => {
                format!("{}-{}", primary.to_lowercase(), region.to_uppercase())
            }
            None => code.to_lowercase(),
        };
        Self(normalised)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The primary subtag (`"pt"` for `"pt-PT"`).
    pub fn primary(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }

    /// English display name, falling back to the code itself.
    pub fn english_name(&self) -> String {
        isolang::Language::from_639_1(self.primary())
            .or_else(|| isolang::Language::from_639_3(self.primary()))
            .map(|l| l.to_name().to_string())
            .unwrap_or_else(|| self.0.clone())
    }

    /// The code the Google TTS endpoint expects for this language.
    pub fn google_tts_code(&self) -> String {
        match self.0.as_str() {
            "he" => "iw".to_string(),
            "jv" => "jw".to_string(),
            "zh" | "zh-CN" | "zh-HANS" => "zh-CN".to_string(),
            "zh-TW" | "zh-HANT" => "zh-TW".to_string(),
            other => other.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LanguageCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// True when `code` is a translation target M2M100 can produce.
pub fn m2m100_supports(code: &LanguageCode) -> bool {
    M2M100_LANGUAGES.contains(&code.as_str())
}

/// True when the Google TTS endpoint can speak `code`.
pub fn google_tts_supports(code: &LanguageCode) -> bool {
    GOOGLE_TTS_LANGUAGES.contains(&code.google_tts_code().as_str())
}

/// A selectable target language, as listed by the web form and `/api/languages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanguageOption {
    pub code: LanguageCode,
    pub name: String,
}

/// Languages present in both `translation` and `speech` support sets,
/// sorted by English name.
pub fn end_to_end_languages(
    translation: impl Fn(&LanguageCode) -> bool,
    speech: impl Fn(&LanguageCode) -> bool,
) -> Vec<LanguageOption> {
    let mut options: Vec<LanguageOption> = M2M100_LANGUAGES
        .iter()
        .map(|c| LanguageCode::new(c))
        .filter(|c| translation(c) && speech(c))
        .map(|code| LanguageOption {
            name: code.english_name(),
            code,
        })
        .collect();
    options.sort_by(|a, b| a.name.cmp(&b.name));
    options
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalises_case_and_region() {
        assert_eq!(LanguageCode::new(" ES ").as_str(), "es");
        assert_eq!(LanguageCode::new("zh-cn").as_str(), "zh-CN");
        assert_eq!(LanguageCode::new("pt_pt").as_str(), "pt-PT");
        assert_eq!(LanguageCode::new("pt-PT").primary(), "pt");
    }

    #[test]
    fn m2m100_has_one_hundred_languages() {
        assert_eq!(M2M100_LANGUAGES.len(), 100);
        assert!(m2m100_supports(&"es".into()));
        assert!(!m2m100_supports(&"xx".into()));
    }

    #[test]
    fn tts_aliases() {
        assert_eq!(LanguageCode::new("he").google_tts_code(), "iw");
        assert_eq!(LanguageCode::new("jv").google_tts_code(), "jw");
        assert_eq!(LanguageCode::new("zh").google_tts_code(), "zh-CN");
        assert!(google_tts_supports(&"he".into()));
        assert!(google_tts_supports(&"zh".into()));
        assert!(!google_tts_supports(&"ast".into()));
    }

    #[test]
    fn english_names() {
        assert_eq!(LanguageCode::new("es").english_name(), "Spanish");
        assert_eq!(LanguageCode::new("de").english_name(), "German");
        assert_eq!(LanguageCode::new("xx").english_name(), "xx");
    }

    #[test]
    fn end_to_end_list_is_intersection() {
        let langs = end_to_end_languages(m2m100_supports, google_tts_supports);
        assert!(langs.iter().any(|l| l.code.as_str() == "es"));
        assert!(langs.iter().any(|l| l.code.as_str() == "he"));
        // M2M100-only languages are not offered.
        assert!(!langs.iter().any(|l| l.code.as_str() == "ast"));
        let names: Vec<&str> = langs.iter().map(|l| l.name.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }
}
