//! Content-type classification for parsed playlist entries
//!
//! Providers, notably Turkish-language ones, use localized group titles, so
//! each rule matches both English and Turkish tokens. Rules are checked in
//! order and the first match wins; anything unmatched is live TV.

use crate::models::ContentType;

/// Tokens that mark radio when found in either the group or the name
const RADIO_TOKENS: &[&str] = &["radio", "radyo"];

/// Tokens that mark radio when found in the group only
const RADIO_GROUP_TOKENS: &[&str] = &["music", "müzik"];

const VOD_GROUP_TOKENS: &[&str] = &["vod", "movie", "series", "film", "dizi", "sinema"];

/// Classify an entry from its display name and group title (case-insensitive)
pub fn classify(name: &str, group: &str) -> ContentType {
    let name = name.to_lowercase();
    let group = group.to_lowercase();

    let contains_any = |haystack: &str, tokens: &[&str]| tokens.iter().any(|t| haystack.contains(t));

    if contains_any(&group, RADIO_TOKENS)
        || contains_any(&name, RADIO_TOKENS)
        || contains_any(&group, RADIO_GROUP_TOKENS)
    {
        ContentType::Radio
    } else if contains_any(&group, VOD_GROUP_TOKENS) {
        ContentType::Vod
    } else {
        ContentType::Tv
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radio_rule_wins_over_vod() {
        assert_eq!(classify("Radyo TV", "Müzik"), ContentType::Radio);
        assert_eq!(classify("Radio One", "Film"), ContentType::Radio);
    }

    #[test]
    fn test_radio_from_group_or_name() {
        assert_eq!(classify("Power FM", "Radyolar"), ContentType::Radio);
        assert_eq!(classify("Best RADIO", "Ulusal"), ContentType::Radio);
        assert_eq!(classify("Power", "MUSIC"), ContentType::Radio);
    }

    #[test]
    fn test_music_in_name_alone_is_not_radio() {
        assert_eq!(classify("Music Box", "Eglence"), ContentType::Tv);
    }

    #[test]
    fn test_vod_tokens_only_checked_in_group() {
        for group in ["VOD", "Movies", "TV Series", "Yerli Film", "Diziler", "Sinema"] {
            assert_eq!(classify("Anything", group), ContentType::Vod, "group {group}");
        }
        assert_eq!(classify("Film Box", "Ulusal"), ContentType::Tv);
    }

    #[test]
    fn test_defaults_to_tv() {
        assert_eq!(classify("Kanal 1", "Haber"), ContentType::Tv);
        assert_eq!(classify("Unknown Channel", "Uncategorized"), ContentType::Tv);
    }
}
