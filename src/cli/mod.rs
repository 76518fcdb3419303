use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "tubescribe",
    about = "Extract YouTube video transcripts, with optional AI reformatting",
    version,
    long_about = "A CLI tool for extracting video transcripts from YouTube watch pages. \
Captions are pulled from the embedded caption manifest and the timed-text endpoint; \
the raw transcript can optionally be reformatted through an OpenAI-compatible API."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print the transcript or error, no progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract the transcript of a video
    Extract {
        /// Watch-page URL or bare 11-character video id
        #[arg(value_name = "URL_OR_ID")]
        url: String,

        /// Caption language to request
        #[arg(short, long, value_name = "LANG")]
        lang: Option<String>,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Emit the outcome as JSON instead of plain text
        #[arg(long)]
        json: bool,
    },

    /// List the caption languages available for a video
    Languages {
        /// Watch-page URL or bare 11-character video id
        #[arg(value_name = "URL_OR_ID")]
        url: String,
    },

    /// Reformat a previously extracted transcript
    Format {
        /// File holding the raw transcript text
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// API key for the completion API
        #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
        api_key: String,

        /// Formatting instructions (config default if not specified)
        #[arg(short, long)]
        instructions: Option<String>,

        /// Model to use (config default if not specified)
        #[arg(short, long)]
        model: Option<String>,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Show or initialize the configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },
}
