//! Voice description and the "best voice" heuristic.

/// A voice offered by the speech backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceInfo {
    /// Backend-specific identifier used to select the voice.
    pub id: String,
    /// Display name (e.g. `"Microsoft Aria Online (Natural)"`).
    pub name: String,
    /// BCP 47 language tag (e.g. `"en-US"`).
    pub language: String,
}

impl VoiceInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            language: language.into(),
        }
    }
}

/// Pick a voice for commentary.
///
/// In priority order:
/// 1. the first voice whose language starts with `language_prefix` and whose
///    name contains any of `markers`;
/// 2. the first voice whose language starts with `language_prefix`;
/// 3. `None`, meaning the platform default.
///
/// Matching is case-sensitive, both for the prefix and for the markers.
pub fn select_voice<'a>(
    voices: &'a [VoiceInfo],
    language_prefix: &str,
    markers: &[String],
) -> Option<&'a VoiceInfo> {
    let in_language = |v: &&VoiceInfo| v.language.starts_with(language_prefix);

    voices
        .iter()
        .filter(in_language)
        .find(|v| markers.iter().any(|m| v.name.contains(m.as_str())))
        .or_else(|| voices.iter().find(in_language))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markers() -> Vec<String> {
        vec!["Natural".into(), "Google".into(), "Microsoft".into()]
    }

    #[test]
    fn prefers_branded_english_voice() {
        let voices = vec![
            VoiceInfo::new("1", "eSpeak English", "en-GB"),
            VoiceInfo::new("2", "Google Deutsch", "de-DE"),
            VoiceInfo::new("3", "Google US English", "en-US"),
            VoiceInfo::new("4", "Microsoft Aria Online (Natural)", "en-US"),
        ];
        let chosen = select_voice(&voices, "en", &markers()).expect("voice");
        assert_eq!(chosen.id, "3");
    }

    #[test]
    fn falls_back_to_any_english_voice() {
        let voices = vec![
            VoiceInfo::new("1", "Google Deutsch", "de-DE"),
            VoiceInfo::new("2", "eSpeak English", "en-GB"),
            VoiceInfo::new("3", "Festival Voice", "en-US"),
        ];
        let chosen = select_voice(&voices, "en", &markers()).expect("voice");
        assert_eq!(chosen.id, "2");
    }

    #[test]
    fn branded_non_english_voice_is_not_enough() {
        let voices = vec![VoiceInfo::new("1", "Microsoft Hedda", "de-DE")];
        assert!(select_voice(&voices, "en", &markers()).is_none());
    }

    #[test]
    fn no_voices_means_platform_default() {
        assert!(select_voice(&[], "en", &markers()).is_none());
    }

    #[test]
    fn markers_are_case_sensitive() {
        let voices = vec![
            VoiceInfo::new("1", "natural sounding", "en-US"),
            VoiceInfo::new("2", "Natural Jenny", "en-US"),
        ];
        let chosen = select_voice(&voices, "en", &markers()).expect("voice");
        assert_eq!(chosen.id, "2");
    }
}
