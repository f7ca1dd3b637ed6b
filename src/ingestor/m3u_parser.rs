use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, info};

use super::classifier::classify;
use crate::models::{PendingChannel, UNKNOWN_CHANNEL_NAME};

const EXTINF_PREFIX: &str = "#EXTINF:";

type AttributeSetter = fn(&mut PendingChannel, String);

/// `key="value"` attributes recognised on `#EXTINF:` lines. Adding an
/// attribute is one entry here.
const EXTINF_ATTRIBUTES: &[(&str, AttributeSetter)] = &[
    ("tvg-logo", |channel, value| channel.logo = Some(value)),
    ("group-title", |channel, value| channel.group = value),
    ("tvg-id", |channel, value| channel.tvg_id = Some(value)),
    ("tvg-language", |channel, value| channel.language = Some(value)),
    ("tvg-country", |channel, value| channel.country = Some(value)),
];

fn attribute_patterns() -> &'static [(Regex, AttributeSetter)] {
    static PATTERNS: OnceLock<Vec<(Regex, AttributeSetter)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        EXTINF_ATTRIBUTES
            .iter()
            .filter_map(|(key, setter)| {
                Regex::new(&format!(r#"{}="([^"]+)""#, regex::escape(key)))
                    .ok()
                    .map(|pattern| (pattern, *setter))
            })
            .collect()
    })
}

/// Parser progress, reported each time a record is emitted
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParseProgress {
    pub line: usize,
    pub total_lines: usize,
    pub records: usize,
}

impl ParseProgress {
    pub fn fraction(&self) -> f64 {
        if self.total_lines == 0 {
            1.0
        } else {
            self.line as f64 / self.total_lines as f64
        }
    }
}

/// Single-pass M3U/M3U8 parser.
///
/// Each `#EXTINF:` line replaces the pending metadata; the next non-blank,
/// non-comment line completes it as the stream URL. Metadata never followed
/// by a URL is dropped, and URLs without pending metadata are ignored.
#[derive(Debug, Clone)]
pub struct M3uParser {
    progress_log_interval: usize,
}

impl Default for M3uParser {
    fn default() -> Self {
        Self::new(100)
    }
}

impl M3uParser {
    pub fn new(progress_log_interval: usize) -> Self {
        Self {
            progress_log_interval: progress_log_interval.max(1),
        }
    }

    pub fn parse(&self, content: &str) -> Vec<PendingChannel> {
        self.parse_with_progress(content, |_| {})
    }

    pub fn parse_with_progress<F>(&self, content: &str, mut on_progress: F) -> Vec<PendingChannel>
    where
        F: FnMut(ParseProgress),
    {
        let content = normalize_newlines(content.strip_prefix('\u{feff}').unwrap_or(content));
        let lines: Vec<&str> = content.split('\n').collect();
        let total_lines = lines.len();

        debug!("Parsing M3U content with {} lines", total_lines);

        let mut channels = Vec::new();
        let mut pending: Option<PendingChannel> = None;

        for (i, line) in lines.iter().enumerate() {
            let line = line.trim();

            if line.starts_with(EXTINF_PREFIX) {
                if let Some(orphan) = pending.replace(parse_extinf_line(line)) {
                    debug!("Discarding '{}': no stream URL before next #EXTINF", orphan.name);
                }
            } else if !line.is_empty() && !line.starts_with('#') {
                let Some(mut channel) = pending.take() else {
                    debug!("Ignoring URL without #EXTINF metadata at line {}", i + 1);
                    continue;
                };

                channel.url = line.to_string();
                channel.content_type = classify(&channel.name, &channel.group);
                channels.push(channel);

                if channels.len() % self.progress_log_interval == 0 {
                    debug!("Parsed {} channels ({}/{} lines)", channels.len(), i + 1, total_lines);
                }
                on_progress(ParseProgress {
                    line: i,
                    total_lines,
                    records: channels.len(),
                });
            }
        }

        if let Some(orphan) = pending {
            debug!("Discarding '{}': playlist ended before its stream URL", orphan.name);
        }

        info!("M3U parsing completed: {} channels parsed", channels.len());
        channels
    }
}

fn normalize_newlines(content: &str) -> String {
    content.replace("\r\n", "\n").replace('\r', "\n")
}

/// Build pending metadata from a trimmed `#EXTINF:` line.
///
/// The display name is everything after the last comma. Malformed attributes
/// (unterminated or empty quotes) simply fail to match.
fn parse_extinf_line(line: &str) -> PendingChannel {
    let name = line
        .rfind(',')
        .map(|comma| line[comma + 1..].trim())
        .filter(|name| !name.is_empty())
        .unwrap_or(UNKNOWN_CHANNEL_NAME);

    let mut channel = PendingChannel::from_metadata(name.to_string());
    for (pattern, setter) in attribute_patterns() {
        if let Some(value) = pattern.captures(line).and_then(|c| c.get(1)) {
            setter(&mut channel, value.as_str().to_string());
        }
    }
    channel
}
