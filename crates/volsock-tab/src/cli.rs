use clap::Parser;

/// Headless VolSock tab: one simulated video whose volume follows the group.
///
/// Type a volume between 0.0 and 1.0 on stdin to change it locally.
#[derive(Parser, Debug)]
#[command(name = "volsock-tab", version, about)]
pub struct Args {
    /// Config file path override.
    #[arg(long)]
    pub config: Option<String>,

    /// Relay URL override.
    #[arg(long)]
    pub url: Option<String>,

    /// Join this group instead of a generated one.
    #[arg(long)]
    pub group: Option<String>,

    /// Log level override (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Print the resolved config as JSON and exit.
    #[arg(long)]
    pub print_config: bool,
}

pub fn parse() -> Args {
    Args::parse()
}
