use clap::{Parser, Subcommand};

use std::path::PathBuf;

use super::constants::{ENV_ADMIN_EMAIL, ENV_ADMIN_NAME, ENV_ADMIN_PASSWORD, ENV_CONFIG, ENV_HOST, ENV_PORT};

#[derive(Parser)]
#[command(name = "findo")]
#[command(version, about = "Pharmacy directory server", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Server host address
    #[arg(long, short = 'H', global = true, env = ENV_HOST)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, short = 'p', global = true, env = ENV_PORT)]
    pub port: Option<u16>,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Email of the admin account seeded on first start
    #[arg(long, global = true, env = ENV_ADMIN_EMAIL)]
    pub admin_email: Option<String>,

    /// Password of the seeded admin account
    #[arg(long, global = true, env = ENV_ADMIN_PASSWORD)]
    pub admin_password: Option<String>,

    /// Display name of the seeded admin account
    #[arg(long, global = true, env = ENV_ADMIN_NAME)]
    pub admin_name: Option<String>,

    /// Session token lifetime in days
    #[arg(long, global = true)]
    pub session_ttl_days: Option<u32>,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Start the server (default command)
    Start,
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub config: Option<PathBuf>,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub admin_name: Option<String>,
    pub session_ttl_days: Option<u32>,
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Option<Commands>) {
    let cli = Cli::parse();
    let config = CliConfig {
        host: cli.host,
        port: cli.port,
        config: cli.config,
        admin_email: cli.admin_email,
        admin_password: cli.admin_password,
        admin_name: cli.admin_name,
        session_ttl_days: cli.session_ttl_days,
    };
    (config, cli.command)
}
