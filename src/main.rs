use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use m3u_importer::{
    config::{Config, ImportPolicy},
    errors::{AppError, SessionError},
    importer::{ChannelSink, HttpChannelSink, Importer, MemoryChannelSink},
    ingestor::{PlaylistIngestor, PlaylistSource},
    models::{ContentType, FilterCriteria},
    session::SessionService,
    web::WebServer,
};

#[derive(Parser)]
#[command(name = "m3u-importer")]
#[command(version)]
#[command(about = "Parse M3U playlists and import their channels into a storage API")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Storage API root receiving POST /api/channels (overrides config file)
    #[arg(long, value_name = "URL", global = true)]
    api_base_url: Option<String>,

    /// Import failure policy: best_effort or fail_fast (overrides config file)
    #[arg(long, global = true)]
    policy: Option<ImportPolicy>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the import session HTTP API (default)
    Serve {
        /// Listening IP address
        #[arg(short = 'H', long, value_name = "IP")]
        host: Option<String>,

        /// Listening port
        #[arg(short, long, value_name = "PORT")]
        port: Option<u16>,
    },
    /// Load one playlist and import the matching channels
    Import {
        /// Playlist URL
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        url: Option<String>,

        /// Playlist file
        #[arg(long)]
        file: Option<PathBuf>,

        /// Only import channels of this type (tv, radio, vod)
        #[arg(long = "type")]
        content_type: Option<ContentType>,

        /// Only import channels in this group
        #[arg(long)]
        group: Option<String>,

        /// Only import channels whose name contains this text
        #[arg(long)]
        search: Option<String>,

        /// Print the channel bodies instead of submitting them
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = if cli.log_level == "trace" {
        format!("m3u_importer={},tower_http=trace", cli.log_level)
    } else {
        format!("m3u_importer={}", cli.log_level)
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting M3U importer v{}", env!("CARGO_PKG_VERSION"));

    std::env::set_var("CONFIG_FILE", &cli.config);
    let mut config = Config::load()?;
    info!("Configuration loaded from: {}", cli.config);

    if let Some(api_base_url) = cli.api_base_url {
        config.importer.api_base_url = api_base_url;
    }
    if let Some(policy) = cli.policy {
        config.importer.policy = policy;
    }
    config.validate()?;

    match cli.command.unwrap_or(Command::Serve {
        host: None,
        port: None,
    }) {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.web.host = host;
            }
            if let Some(port) = port {
                config.web.port = port;
            }
            serve(config).await
        }
        Command::Import {
            url,
            file,
            content_type,
            group,
            search,
            dry_run,
        } => {
            let source = match (url, file) {
                (Some(url), _) => PlaylistSource::Url(url),
                (None, Some(file)) => PlaylistSource::File(file),
                (None, None) => anyhow::bail!("either --url or --file is required"),
            };
            let filter = FilterCriteria {
                content_type: content_type.map(Into::into).unwrap_or_default(),
                group,
                search: search.unwrap_or_default(),
            };
            import_once(config, source, filter, dry_run).await
        }
    }
}

async fn serve(config: Config) -> Result<()> {
    let sink = Arc::new(HttpChannelSink::new(&config.importer));
    info!(
        "Importing to {} ({} policy)",
        sink.endpoint(),
        config.importer.policy
    );

    let service = SessionService::new(
        PlaylistIngestor::from_config(&config),
        Importer::new(sink, config.importer.policy),
    );

    let web_server = WebServer::new(&config, service)?;
    info!("Starting web server on {}", web_server.addr());
    web_server.serve().await
}

async fn import_once(
    config: Config,
    source: PlaylistSource,
    filter: FilterCriteria,
    dry_run: bool,
) -> Result<()> {
    let memory_sink = Arc::new(MemoryChannelSink::new());
    let sink: Arc<dyn ChannelSink> = if dry_run {
        memory_sink.clone()
    } else {
        Arc::new(HttpChannelSink::new(&config.importer))
    };

    let service = SessionService::new(
        PlaylistIngestor::from_config(&config),
        Importer::new(sink, config.importer.policy),
    );

    let summary = service.load(source).await?;
    println!("Loaded {}", summary);

    if filter != FilterCriteria::default() {
        let selected = service
            .with_session(|session| session.select_only(filter))
            .await?;
        println!("{} channels match the filter", selected);
    }

    let report = match service.commit().await {
        Ok(report) => report,
        Err(AppError::Session(SessionError::NothingSelected)) => {
            println!("No channels matched; nothing to import");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if dry_run {
        println!(
            "{}",
            serde_json::to_string_pretty(&memory_sink.channels().await)?
        );
    }
    for failure in &report.failures {
        warn!("#{} '{}': {}", failure.index, failure.name, failure.error);
    }
    println!("Imported {} ({} failed)", report.imported, report.failures.len());

    Ok(())
}
