//! subtitlino: search and download subtitles from the command line.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use subtitlino_core::{
    content, fingerprint_file, load_config, load_env_config, retrieve_to, ClientError, Config,
    Movie, OsdbClient, RetrieveOutcome, UploadCandidate,
};

#[derive(Parser)]
#[command(
    name = "subtitlino",
    version,
    about = "Search and download subtitles from the command line."
)]
struct Cli {
    /// Subtitle languages, comma separated (default from config/env).
    #[arg(long, short, global = true)]
    lang: Option<String>,

    /// TOML configuration file (also read from SUBTITLINO_CONFIG).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download the best subtitles for files, or every video in a directory.
    Get {
        /// Video files or directories.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Print the fingerprint hash of files.
    Hash {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Search movies on IMDB, or show movie details.
    Imdb(ImdbArgs),
    /// Check whether subtitles for a movie already exist in the database.
    Put {
        movie: PathBuf,
        subtitle: PathBuf,
    },
}

#[derive(Args)]
#[command(args_conflicts_with_subcommands = true)]
struct ImdbArgs {
    #[command(subcommand)]
    command: Option<ImdbCommand>,

    /// Search query.
    query: Vec<String>,

    /// Print results as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum ImdbCommand {
    /// Display movie facts for IMDB ids.
    Show {
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        error!("{e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = load_configuration(&cli)?;

    let languages = match &cli.lang {
        Some(lang) => split_languages(lang),
        None => config.languages(),
    };

    match cli.command {
        Command::Hash { files } => run_hash(&files),
        Command::Get { paths } => run_get(&config, &languages, &paths).await,
        Command::Imdb(args) => run_imdb(&config, args).await,
        Command::Put { movie, subtitle } => run_put(&config, &movie, &subtitle).await,
    }
}

fn load_configuration(cli: &Cli) -> Result<Config> {
    let path = cli
        .config
        .clone()
        .or_else(|| std::env::var("SUBTITLINO_CONFIG").ok().map(PathBuf::from));

    match path {
        Some(path) => load_config(&path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => load_env_config().context("Failed to read configuration from environment"),
    }
}

/// Connect and log in with the configured account (anonymously when no
/// credentials are set).
async fn connect(config: &Config) -> Result<OsdbClient> {
    let mut client = OsdbClient::from_config(config)?;
    client
        .login(&config.login, &config.password, &config.language)
        .await
        .context("Login failed")?;
    Ok(client)
}

fn run_hash(files: &[PathBuf]) -> Result<()> {
    for file in files {
        let fingerprint = fingerprint_file(file)
            .with_context(|| format!("Failed to hash {}", file.display()))?;
        println!("{}: {}", file_name(file), fingerprint.hex());
    }
    Ok(())
}

async fn run_get(config: &Config, languages: &[String], paths: &[PathBuf]) -> Result<()> {
    if languages.is_empty() {
        bail!("No subtitle languages configured");
    }
    let client = connect(config).await?;

    for path in paths {
        let meta = std::fs::metadata(path)
            .with_context(|| format!("Cannot access {}", path.display()))?;
        let files = if meta.is_dir() {
            content::find_video_files(path)?
        } else {
            vec![path.clone()]
        };
        if files.is_empty() {
            println!("- No video files in: {}", path.display());
            continue;
        }
        for file in files {
            get_one(&client, &file, languages).await?;
        }
    }
    Ok(())
}

/// Try each language in order; the first hit wins.
async fn get_one(client: &OsdbClient, file: &Path, languages: &[String]) -> Result<()> {
    for lang in languages {
        println!("- Getting {} subtitles for file: {}", lang, file_name(file));
        match retrieve_to(client, file, std::slice::from_ref(lang)).await? {
            RetrieveOutcome::Saved(dest) => {
                println!("- Downloaded to: {}", dest.display());
                return Ok(());
            }
            RetrieveOutcome::NoSubtitleFound => continue,
        }
    }
    println!("- No subtitles found!");
    Ok(())
}

async fn run_imdb(config: &Config, args: ImdbArgs) -> Result<()> {
    let client = connect(config).await?;

    match args.command {
        Some(ImdbCommand::Show { ids }) => {
            for id in ids {
                let movie = client.imdb_details(&id).await?;
                print_movie_details(&movie);
            }
        }
        None => {
            if args.query.is_empty() {
                bail!("Missing IMDB query");
            }
            let query = args.query.join(" ");
            println!("Searching {query} on IMDB...\n");
            let movies = client.imdb_search(&query).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&movies)?);
            } else if movies.is_empty() {
                println!("No results.");
            } else {
                for movie in &movies {
                    println!(
                        "{} {} http://www.imdb.com/title/tt{}/",
                        movie.id, movie.title, movie.id
                    );
                }
            }
        }
    }
    Ok(())
}

fn print_movie_details(movie: &Movie) {
    println!("{:<9} {}", "IMDB Id:", movie.id);
    println!("{:<9} {}", "Title:", movie.title);
    println!("{:<9} {}", "Year:", movie.year);
    println!("{:<9} {}", "Duration:", movie.duration);
    println!("{:<9} {}", "Cover:", movie.cover);
    println!("{:<9} {}", "TagLine:", movie.tag_line);
    println!("{:<9} {}", "Plot:", movie.plot);
    println!("{:<9} {}", "Goofs:", movie.goofs);
    println!("{:<9} {}", "Trivia:", movie.trivia);
    println!();
}

async fn run_put(config: &Config, movie: &Path, subtitle: &Path) -> Result<()> {
    println!("- Checking file against the subtitle database...");
    let client = connect(config).await?;
    let candidate = UploadCandidate::from_files(movie, subtitle)
        .context("Failed to prepare upload")?;

    if client
        .has_subtitles(std::slice::from_ref(&candidate))
        .await?
    {
        println!("These subtitles already exist.");
        return Ok(());
    }

    match client.upload_subtitles(&[candidate]).await {
        Ok(url) => println!("Uploaded: {url}"),
        Err(ClientError::UploadUnsupported) => {
            println!("Uploading new subtitles... once the feature's implemented.");
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

fn split_languages(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .map(str::to_string)
        .collect()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
