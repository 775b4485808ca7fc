use crate::bootstrap::{parse_override, BootstrapOptions};
use crate::logging::LogFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "rewards-bootstrap",
    version,
    about = "Startup configuration resolver for the Rewards API"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Args)]
pub struct GlobalOpts {
    /// Directory holding application*.{properties,yaml,json,toml}
    #[arg(long, global = true, default_value = ".")]
    pub config_dir: PathBuf,
    /// Active profiles, comma-separated
    #[arg(long, global = true)]
    pub profile: Option<String>,
    /// Property override with command-line precedence (repeatable)
    #[arg(long = "set", global = true, value_name = "KEY=VALUE", value_parser = parse_override)]
    pub overrides: Vec<(String, String)>,
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl GlobalOpts {
    pub fn bootstrap_options(&self) -> BootstrapOptions {
        BootstrapOptions {
            config_dir: self.config_dir.clone(),
            profile: self.profile.clone(),
            overrides: self.overrides.clone(),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve startup configuration and print the layers
    Resolve(ResolveOpts),
    /// Resolve startup configuration, then serve HTTP
    Serve,
    /// Print the version
    Version,
}

#[derive(clap::Args)]
pub struct ResolveOpts {
    #[arg(long)]
    pub json: bool,
}
