use std::path::PathBuf;

use clap::Parser;

#[derive(clap::Parser, Debug)]
#[command(author, version, about = "Scoped reconnaissance for authorized engagements", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable detailed debug logging (global)
    #[arg(long, global = true, default_value_t = false)]
    pub debug: bool,

    /// Enable verbose logging (global)
    #[arg(long, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Run an engagement: port scan, endpoint enumeration, reports
    Run {
        /// Engagement definition (YAML)
        config: PathBuf,

        /// Treat every scope target as a web target and skip the port scan
        #[arg(long, default_value_t = false)]
        skip_portscan: bool,
    },

    /// Write an annotated engagement template to <NAME>.yaml
    Gen {
        /// Template name, without extension
        name: String,

        /// Directory to write into
        #[arg(short = 'o', long, default_value = ".")]
        dir: PathBuf,
    },
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}
