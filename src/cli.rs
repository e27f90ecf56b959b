use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "file-session")]
#[command(about = "A headless file browser session with history and streaming search")]
pub struct Cli {
    /// Path to a JSON configuration file (overrides FILE_SESSION_CONFIG)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read commands from stdin and print the view after each one (default)
    Shell,
    /// Print a directory listing
    List {
        path: String,
        /// Bypass the listing cache
        #[arg(long)]
        fresh: bool,
    },
    /// Run a streaming search and print results as they arrive
    Search {
        query: String,
        /// Directory to search in (defaults to home)
        #[arg(short, long)]
        path: Option<String>,
        #[arg(long)]
        max_results: Option<usize>,
    },
    /// Run a headless test script against a session
    Test {
        /// Path to the script file
        script: String,
        /// Seconds to wait for the session to settle
        #[arg(long, default_value = "10")]
        settle_timeout: u64,
    },
}
