use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run the demo service until a signal or a worker failure stops it
    Run(RunArgs),

    /// Print the effective shutdown configuration as JSON
    Config {
        /// JSON config file to load before environment overrides
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Number of poller workers
    #[arg(long, default_value_t = 2)]
    pub pollers: usize,

    /// Interval between poller ticks, in milliseconds
    #[arg(long, default_value_t = 250)]
    pub tick_ms: u64,

    /// Simulate a fatal worker error after this many milliseconds
    #[arg(long)]
    pub fail_after_ms: Option<u64>,

    /// JSON config file to load before environment overrides
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Do not block in wait(); a halt exits the process directly
    #[arg(long)]
    pub non_blocking: bool,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            pollers: 2,
            tick_ms: 250,
            fail_after_ms: None,
            config: None,
            non_blocking: false,
        }
    }
}
