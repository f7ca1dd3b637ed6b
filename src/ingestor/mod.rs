use std::path::PathBuf;
use tracing::info;

use crate::config::Config;
use crate::errors::AppResult;
use crate::models::PendingChannel;

pub mod classifier;
pub mod m3u_parser;
pub mod reader;

pub use m3u_parser::{M3uParser, ParseProgress};
pub use reader::PlaylistReader;

/// Where a playlist comes from
#[derive(Debug, Clone)]
pub enum PlaylistSource {
    Url(String),
    File(PathBuf),
    /// File contents received over HTTP
    Upload { name: String, bytes: Vec<u8> },
}

impl std::fmt::Display for PlaylistSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaylistSource::Url(url) => write!(f, "{}", url),
            PlaylistSource::File(path) => write!(f, "{}", path.display()),
            PlaylistSource::Upload { name, .. } => write!(f, "upload '{}'", name),
        }
    }
}

/// Reader and parser pair used to load a playlist into an import session
#[derive(Debug, Clone)]
pub struct PlaylistIngestor {
    reader: PlaylistReader,
    parser: M3uParser,
}

impl PlaylistIngestor {
    pub fn new(reader: PlaylistReader, parser: M3uParser) -> Self {
        Self { reader, parser }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            PlaylistReader::new(&config.fetch),
            M3uParser::new(config.parser.progress_log_interval),
        )
    }

    /// Obtain the raw playlist text
    pub async fn read(&self, source: PlaylistSource) -> AppResult<String> {
        let text = match source {
            PlaylistSource::Url(url) => self.reader.fetch_url(&url).await?,
            PlaylistSource::File(path) => self.reader.read_file(&path).await?,
            PlaylistSource::Upload { name, bytes } => reader::decode_text(&name, bytes)?,
        };
        Ok(text)
    }

    pub fn parse(&self, content: &str) -> Vec<PendingChannel> {
        let mut last_fraction = 0.0;
        self.parser.parse_with_progress(content, |progress| {
            let fraction = progress.fraction();
            if fraction - last_fraction >= 0.1 {
                info!("Parsing playlist: {:.0}%", fraction * 100.0);
                last_fraction = fraction;
            }
        })
    }
}
