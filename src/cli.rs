//! Command Line Interface (CLI) arguments.

use clap::Parser;

/// Taxi analysis command line interface
#[derive(Clone, Debug, Parser)]
#[command(version, about)]
pub struct CommandLineArgs {
    /// The IP address on which the server should listen
    #[arg(long, default_value = "0.0.0.0", env = "TAXI_ANALYSIS_HOST")]
    pub host: String,
    /// The port to which the server should bind
    #[arg(long, default_value_t = 8080, env = "TAXI_ANALYSIS_PORT")]
    pub port: u16,
    /// Flag indicating whether HTTPS should be used
    #[arg(long, default_value_t = false, env = "TAXI_ANALYSIS_HTTPS")]
    pub https: bool,
    /// Path to the certificate file to be used for HTTPS encryption
    #[arg(
        long,
        default_value = "~/.config/taxi-analysis/certs/cert.pem",
        env = "TAXI_ANALYSIS_CERT_FILE"
    )]
    pub cert_file: String,
    /// Path to the key file to be used for HTTPS encryption
    #[arg(
        long,
        default_value = "~/.config/taxi-analysis/certs/key.pem",
        env = "TAXI_ANALYSIS_KEY_FILE"
    )]
    pub key_file: String,
    /// Maximum time in seconds to wait for requests to complete upon receiving `ctrl+c` signal.
    #[arg(long, default_value_t = 60, env = "TAXI_ANALYSIS_SHUTDOWN_TIMEOUT")]
    pub graceful_shutdown_timeout: u64,
    /// Directory containing the `<year>/yellow_tripdata_<year>-<month>.parquet` partitions
    #[arg(long, default_value = "Data", env = "TAXI_ANALYSIS_DATA_DIR")]
    pub data_dir: String,
    /// Whether to use Rayon for execution of CPU-bound tasks.
    #[arg(long, default_value_t = false, env = "TAXI_ANALYSIS_USE_RAYON")]
    pub use_rayon: bool,
    /// Compute every query on each request instead of caching results.
    #[arg(long, default_value_t = false, env = "TAXI_ANALYSIS_DISABLE_CACHE")]
    pub disable_cache: bool,
    /// Maximum number of concurrent analysis tasks. Defaults to one less than the number of CPUs.
    #[arg(long, env = "TAXI_ANALYSIS_TASK_LIMIT")]
    pub task_limit: Option<usize>,
}

/// Returns parsed command line arguments.
pub fn parse() -> CommandLineArgs {
    CommandLineArgs::parse()
}
