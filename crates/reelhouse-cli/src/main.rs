use clap::{ArgAction, Parser, Subcommand};
use color_eyre::eyre::eyre;
use commands::context::AppContext;
use commands::download_posters::PosterOptions;
use commands::{config, download_posters, import_movies, import_ratings, movies, stats};
use movie_catalog_config::FetchMode;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

mod commands;
mod logging;
mod output;
mod progress_ui;

#[derive(Parser)]
#[command(name = "reelhouse")]
#[command(about = "Reelhouse - import a movie catalog and its posters")]
#[command(version)]
struct Cli {
    /// Enable verbose output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    /// Use this config file instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Also write logs to a daily-rotated file
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import movies and genres from the movies table
    #[command(long_about = "Create or update movies and genres from movies.csv. Movies with a TMDB id in links.csv become eligible for poster download; pass --download-posters to fetch them right away.")]
    ImportMovies {
        /// Path to movies.csv (movie_id,title,genres)
        #[arg(long, value_name = "PATH")]
        movies: Option<PathBuf>,

        /// Path to links.csv (movie_id,tmdb_id)
        #[arg(long, value_name = "PATH")]
        links: Option<PathBuf>,

        /// Download posters for the imported movies afterwards
        #[arg(long, action = ArgAction::SetTrue)]
        download_posters: bool,
    },
    /// Import user ratings from the ratings table
    ImportRatings {
        /// Path to ratings.csv (user_id,movie_id,rating)
        #[arg(long, value_name = "PATH")]
        ratings: Option<PathBuf>,
    },
    /// Download posters for every stored movie with a TMDB id
    #[command(long_about = "Fetch a poster for each stored movie that has a TMDB id in links.csv. Posters already on disk are skipped without any network call, so the command can be re-run to resume.")]
    DownloadPosters {
        /// Path to links.csv (movie_id,tmdb_id)
        #[arg(long, value_name = "PATH")]
        links: Option<PathBuf>,

        /// How poster URLs are resolved: details or direct
        #[arg(long, value_name = "MODE")]
        mode: Option<FetchMode>,

        /// Number of concurrent downloads
        #[arg(long, value_name = "N")]
        workers: Option<usize>,
    },
    /// List imported movies
    Movies {
        /// Maximum number of movies to show
        #[arg(long, default_value_t = movies::DEFAULT_LIST_LIMIT)]
        limit: usize,
    },
    /// Show catalog counts
    Stats,
    /// Show or edit configuration
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration (masks the API key)
    Show {
        /// Show the API key unmasked
        #[arg(long, action = ArgAction::SetTrue)]
        full: bool,
    },
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long, action = ArgAction::SetTrue)]
        force: bool,
    },
    /// Store the TMDB API key in the credentials file
    SetApiKey {
        /// TMDB v3 API key
        key: String,
    },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    logging::init_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())
        .map_err(|e| eyre!("{}", e))?;

    let output = output::Output::new(cli.output, cli.quiet);

    // First Ctrl-C requests a clean stop; commands report it themselves
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("Received Ctrl-C, cancelling");
            signal_token.cancel();
        }
    });

    let ctx = AppContext::load(cli.config, cancel)?;

    let result = match cli.command {
        Commands::ImportMovies {
            movies,
            links,
            download_posters,
        } => import_movies::run_import_movies(&ctx, movies, links, download_posters, &output).await,
        Commands::ImportRatings { ratings } => import_ratings::run_import_ratings(&ctx, ratings, &output).await,
        Commands::DownloadPosters { links, mode, workers } => {
            download_posters::run_download_posters(&ctx, links, PosterOptions { mode, workers }, &output).await
        }
        Commands::Movies { limit } => movies::run_movies(&ctx, limit, &output).await,
        Commands::Stats => stats::run_stats(&ctx, &output).await,
        Commands::Config { cmd } => config::run_config(cmd, &ctx, &output).await,
    };

    signal_task.abort();
    if let Err(e) = &result {
        // Humans get the color-eyre report; JSON consumers also get an object
        if !output.is_human() {
            output.error(format!("{:#}", e));
        }
    }
    result
}
