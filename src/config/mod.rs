pub mod api;

pub use api::ApiConfig;

use std::path::PathBuf;

use clap::Parser;

/// Command-line surface: validate and convert by default, submit to the API
/// with `--send-api`, optionally restricted to a retry subset.
#[derive(Debug, Parser)]
#[command(name = "bulkpost")]
#[command(about = "Validate CSV business records, convert them to nested JSON, and batch-post them to an API")]
pub struct CliArgs {
    /// Path to the input CSV file
    pub input: PathBuf,

    /// Path to the validation rules file
    #[arg(long, default_value = "rules/business_rules.json")]
    pub rules: PathBuf,

    /// Directory for validated-record and outcome artifacts
    #[arg(long, default_value = "output")]
    pub output: PathBuf,

    /// Submit converted records to the API after conversion
    #[arg(long)]
    pub send_api: bool,

    /// Resubmit only these 1-based record indexes
    #[arg(long, num_args = 1.., value_name = "INDEX")]
    pub retry_indexes: Option<Vec<usize>>,

    /// Resubmit every record listed in a failed_*.json artifact
    #[arg(long, value_name = "PATH", conflicts_with = "retry_indexes")]
    pub retry_failed: Option<PathBuf>,

    /// Explicit path to a .env file with API credentials
    #[arg(long, value_name = "PATH")]
    pub env_file: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,
}
