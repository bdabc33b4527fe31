use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use covergrab::app::{App, CancelFlag, RunOptions};
use covergrab::catalog::HttpCatalogClient;
use covergrab::config::ConfigLoader;
use covergrab::download::HttpAssetFetcher;
use covergrab::error::GrabError;
use covergrab::model::Username;
use covergrab::output::{JsonOutput, OutputMode, TextProgress};

#[derive(Parser)]
#[command(name = "covergrab")]
#[command(about = "Scrape a catalog's playlists into checkpointed artist/album maps and download cover art")]
#[command(version, author)]
struct Cli {
    /// Catalog user whose playlists seed the extraction. Falls back to the
    /// config file when omitted.
    username: Option<String>,

    /// Path to a covergrab.json run config.
    #[arg(long)]
    config: Option<String>,

    /// Restrict extraction to these playlist ids instead of every playlist
    /// of the user. Repeatable.
    #[arg(long = "playlist")]
    playlists: Vec<String>,

    /// Artist checkpoint file.
    #[arg(long)]
    artist_checkpoint: Option<Utf8PathBuf>,

    /// Album checkpoint file.
    #[arg(long)]
    album_checkpoint: Option<Utf8PathBuf>,

    /// Directory the cover images are written to.
    #[arg(long)]
    out_dir: Option<Utf8PathBuf>,

    /// Ignore existing checkpoints and re-extract both stages.
    #[arg(long)]
    refresh: bool,

    /// Re-fetch cover files that already exist.
    #[arg(long)]
    overwrite: bool,

    #[arg(long)]
    non_interactive: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(grab) = report.downcast_ref::<GrabError>() {
            return ExitCode::from(map_exit_code(grab));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &GrabError) -> u8 {
    match error {
        GrabError::InvalidUsername(_)
        | GrabError::ConfigRead(_)
        | GrabError::ConfigParse(_)
        | GrabError::MissingCredentials(_) => 2,
        GrabError::Auth(_)
        | GrabError::CatalogHttp(_)
        | GrabError::CatalogStatus { .. }
        | GrabError::AssetHttp(_)
        | GrabError::AssetStatus { .. }
        | GrabError::AssetTruncated { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let config = ConfigLoader::resolve(cli.config.as_deref()).into_diagnostic()?;

    let username: Username = match (cli.username, config.username) {
        (Some(value), _) => value.parse().into_diagnostic()?,
        (None, Some(username)) => username,
        (None, None) => {
            return Err(miette::Report::msg(
                "username required (argument or covergrab.json)",
            ));
        }
    };

    let options = RunOptions {
        username,
        playlists: if cli.playlists.is_empty() {
            config.playlists
        } else {
            cli.playlists
        },
        artist_checkpoint: cli.artist_checkpoint.unwrap_or(config.artist_checkpoint),
        album_checkpoint: cli.album_checkpoint.unwrap_or(config.album_checkpoint),
        output_dir: cli.out_dir.unwrap_or(config.output_dir),
        refresh: cli.refresh,
        overwrite: cli.overwrite || config.overwrite,
    };

    let catalog = HttpCatalogClient::new().into_diagnostic()?;
    let fetcher = HttpAssetFetcher::new().into_diagnostic()?;
    let app = App::new(catalog, fetcher);
    let cancel = CancelFlag::new();

    match output_mode {
        OutputMode::NonInteractive => {
            let result = app.run(&options, &JsonOutput, &cancel).into_diagnostic()?;
            JsonOutput::print_run(&result).into_diagnostic()?;
            Ok(())
        }
        OutputMode::Interactive => {
            let progress = TextProgress;
            let result = app.run(&options, &progress, &cancel).into_diagnostic()?;
            progress.finish(&result);
            Ok(())
        }
    }
}
