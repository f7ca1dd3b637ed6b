use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Placeholder name for `#EXTINF:` lines without a comma-delimited title
pub const UNKNOWN_CHANNEL_NAME: &str = "Unknown Channel";

/// Group assigned when a playlist entry carries no `group-title`
pub const DEFAULT_GROUP: &str = "Uncategorized";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Tv,
    Radio,
    Vod,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Tv => "tv",
            ContentType::Radio => "radio",
            ContentType::Vod => "vod",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tv" => Ok(ContentType::Tv),
            "radio" => Ok(ContentType::Radio),
            "vod" => Ok(ContentType::Vod),
            _ => Err(format!("Invalid content type: {}", s)),
        }
    }
}

/// A parsed playlist entry staged for import.
///
/// Records have no natural key; they are addressed by their position in the
/// parse-ordered sequence until they are imported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingChannel {
    pub name: String,
    pub url: String,
    pub logo: Option<String>,
    pub group: String,
    pub tvg_id: Option<String>,
    pub language: Option<String>,
    pub country: Option<String>,
    #[serde(rename = "type")]
    pub content_type: ContentType,
}

impl PendingChannel {
    /// Metadata accumulated from an `#EXTINF:` line, still waiting for its URL
    pub(crate) fn from_metadata(name: String) -> Self {
        Self {
            name,
            url: String::new(),
            logo: None,
            group: DEFAULT_GROUP.to_string(),
            tvg_id: None,
            language: None,
            country: None,
            content_type: ContentType::Tv,
        }
    }
}

/// Channel body understood by the storage collaborator (`POST /api/channels`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedChannel {
    pub name: String,
    pub category: String,
    pub logo_url: Option<String>,
    pub stream_url: String,
    pub is_live: bool,
    pub stream_type: String,
    pub age_rating: i32,
    pub is_catchup_enabled: bool,
    pub country_code: Option<String>,
}

impl From<&PendingChannel> for ImportedChannel {
    fn from(channel: &PendingChannel) -> Self {
        let stream_type = match channel.content_type {
            ContentType::Radio => "radio",
            ContentType::Tv | ContentType::Vod => "hls",
        };

        Self {
            name: channel.name.clone(),
            category: channel.group.clone(),
            logo_url: channel.logo.clone(),
            stream_url: channel.url.clone(),
            is_live: true,
            stream_type: stream_type.to_string(),
            age_rating: 0,
            is_catchup_enabled: false,
            country_code: channel.country.clone(),
        }
    }
}

/// Per-type record counts reported after a load or an import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseSummary {
    pub total: usize,
    pub tv: usize,
    pub radio: usize,
    pub vod: usize,
}

impl ParseSummary {
    pub fn from_channels<'a, I>(channels: I) -> Self
    where
        I: IntoIterator<Item = &'a PendingChannel>,
    {
        channels
            .into_iter()
            .fold(Self::default(), |mut summary, channel| {
                summary.record(channel.content_type);
                summary
            })
    }

    pub fn record(&mut self, content_type: ContentType) {
        self.total += 1;
        match content_type {
            ContentType::Tv => self.tv += 1,
            ContentType::Radio => self.radio += 1,
            ContentType::Vod => self.vod += 1,
        }
    }
}

impl fmt::Display for ParseSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} channels ({} TV, {} radio, {} VOD)",
            self.total, self.tv, self.radio, self.vod
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeFilter {
    #[default]
    All,
    Tv,
    Radio,
    Vod,
}

impl TypeFilter {
    pub fn matches(&self, content_type: ContentType) -> bool {
        match self {
            TypeFilter::All => true,
            TypeFilter::Tv => content_type == ContentType::Tv,
            TypeFilter::Radio => content_type == ContentType::Radio,
            TypeFilter::Vod => content_type == ContentType::Vod,
        }
    }
}

impl From<ContentType> for TypeFilter {
    fn from(content_type: ContentType) -> Self {
        match content_type {
            ContentType::Tv => TypeFilter::Tv,
            ContentType::Radio => TypeFilter::Radio,
            ContentType::Vod => TypeFilter::Vod,
        }
    }
}

/// View predicate over the staged sequence. Never mutates staged records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    #[serde(rename = "type")]
    pub content_type: TypeFilter,
    /// `None` means every group
    pub group: Option<String>,
    pub search: String,
}

impl FilterCriteria {
    pub fn matches(&self, channel: &PendingChannel) -> bool {
        if !self.content_type.matches(channel.content_type) {
            return false;
        }
        if let Some(group) = &self.group {
            if &channel.group != group {
                return false;
            }
        }
        if !self.search.is_empty()
            && !channel
                .name
                .to_lowercase()
                .contains(&self.search.to_lowercase())
        {
            return false;
        }
        true
    }
}

/// One failed submission during an import pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportFailure {
    pub index: usize,
    pub name: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportReport {
    pub attempted: usize,
    pub imported: ParseSummary,
    /// Staged indices that were accepted by the storage collaborator
    pub submitted: Vec<usize>,
    pub failures: Vec<ImportFailure>,
    /// True when a fail-fast import stopped at a failed submission
    pub aborted: bool,
    pub finished_at: DateTime<Utc>,
}

impl ImportReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && !self.aborted
    }
}
