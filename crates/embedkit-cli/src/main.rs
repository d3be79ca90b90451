mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "embedkit-cli")]
#[command(about = "Fetch, check and store embed metadata")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch a URL and print its embedded asset document
    Fetch { url: String },
    /// Report whether a stored document is safe to render
    Check { file: PathBuf },
    /// Print the image or provider icon closest to a size
    Image {
        file: PathBuf,
        /// Target edge length in pixels
        #[arg(long, default_value = "300")]
        size: u32,
        /// Select from provider icons instead of images
        #[arg(long)]
        icon: bool,
    },
    /// Fetch a URL and save it under the storage root
    Save {
        url: String,
        /// Folder relative to the storage root
        #[arg(long, default_value = "")]
        folder: String,
    },
    /// Rewrite a document (legacy or current) in the current schema
    Migrate {
        file: PathBuf,
        /// Write here instead of overwriting the input
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = embedkit_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let settings = embedkit_core::load_settings_or_default(config.settings_path.as_deref())?;

    match cli.command {
        Commands::Fetch { url } => {
            let cache = commands::build_cache(&config, &settings)?;
            let document = commands::run_fetch(&cache, &url).await?;
            println!("{document}");
        }
        Commands::Check { file } => {
            let validator = commands::build_validator(&settings)?;
            let (report, safe) = commands::run_check(&validator, &file).await?;
            println!("{report}");
            if !safe {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Image { file, size, icon } => {
            match commands::run_image(&file, size, icon).await? {
                Some(line) => println!("{line}"),
                None => {
                    eprintln!("no matching image in {}", file.display());
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Commands::Save { url, folder } => {
            let cache = commands::build_cache(&config, &settings)?;
            let store = embedkit_store::AssetStore::from_app_config(&config);
            let saved = commands::run_save(&cache, &store, &url, &folder).await?;
            println!("{}", saved.path.display());
        }
        Commands::Migrate { file, output } => {
            let written = commands::run_migrate(&file, output.as_deref()).await?;
            println!("{}", written.display());
        }
    }

    Ok(ExitCode::SUCCESS)
}
