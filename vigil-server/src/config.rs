//! Server configuration from flags with environment fallback

use clap::Parser;
use std::path::PathBuf;

const DEV_SECRET: &str = "vigil-dev-secret";

#[derive(Debug, Clone, Parser)]
#[command(name = "vigil-server", about = "Screening and therapy backend")]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "VIGIL_BIND", default_value = "127.0.0.1:5800")]
    pub bind: String,

    /// SQLite database path, created on first run
    #[arg(long, env = "VIGIL_DB", default_value = "vigil.db")]
    pub database: PathBuf,

    /// JWT signing secret
    #[arg(long, env = "VIGIL_JWT_SECRET", default_value = DEV_SECRET)]
    pub jwt_secret: String,
}

impl Config {
    /// True when running on the built-in development secret
    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_SECRET
    }
}
