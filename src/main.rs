use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tubescribe::cli::{Cli, Commands};
use tubescribe::config::Config;
use tubescribe::extractors::manifest::CaptionManifestFetcher;
use tubescribe::format::TranscriptFormatter;
use tubescribe::service::{ExtractionOutcome, TranscriptService};
use tubescribe::video;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose {
        "tubescribe=debug"
    } else {
        "tubescribe=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load().await?;

    match cli.command {
        Commands::Extract { url, lang, output, json } => {
            let lang = lang.unwrap_or_else(|| config.extraction.default_language.clone());
            let service = TranscriptService::new(config.http_client()?);

            let result = service.extract(&url, Some(&lang)).await;

            if json {
                let outcome = ExtractionOutcome::from(result);
                println!("{}", serde_json::to_string_pretty(&outcome)?);
                return Ok(());
            }

            let transcript = result?;
            match output {
                Some(path) => {
                    fs_err::write(&path, &transcript)?;
                    if !cli.quiet {
                        println!("Transcript saved to: {}", path.display());
                    }
                }
                None => println!("{transcript}"),
            }
        }
        Commands::Languages { url } => {
            let video_id = video::resolve(&url)?;
            let fetcher = CaptionManifestFetcher::new(config.http_client()?);

            let tracks = fetcher.fetch_manifest(&video_id, None).await?;
            if !cli.quiet {
                println!("Available caption languages for {video_id}:");
            }
            for track in tracks {
                println!("{}", track.language_code);
            }
        }
        Commands::Format { input, api_key, instructions, model, output } => {
            let transcript = fs_err::read_to_string(&input)?;
            let instructions =
                instructions.unwrap_or_else(|| config.formatting.instructions.clone());
            let formatter = TranscriptFormatter::new(config.http_client()?, &config.formatting);

            let formatted = formatter
                .format(&transcript, &api_key, &instructions, model.as_deref())
                .await?;

            match output {
                Some(path) => {
                    fs_err::write(&path, &formatted)?;
                    if !cli.quiet {
                        println!("Formatted transcript saved to: {}", path.display());
                    }
                }
                None => println!("{formatted}"),
            }
        }
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                config.save().await?;
                println!("Configuration written to disk. Edit it and rerun with --show to review.");
            }
        }
    }

    Ok(())
}
