//! CLI arguments and server configuration defaults.

use clap::Parser;
use shadow_rs::formatcp;

use crate::build;

const VERSION_INFO: &str = formatcp!(
    r#"{}\ncommit_hash: {}\nbuild_time: {}\nbuild_env: {},{}"#,
    build::PKG_VERSION,
    build::SHORT_COMMIT,
    build::BUILD_TIME,
    build::RUST_VERSION,
    build::RUST_CHANNEL
);

pub const DEFAULT_ROOT_DIR: &str = "shared";
pub const DEFAULT_PORT: u16 = 8080;

/// CLI arguments and environment configuration for the server.
///
/// The root directory is the only state-bearing setting: it is created at
/// startup if absent and every request is confined below it.
#[derive(Parser, Debug)]
#[command(name = "fileshed", version = VERSION_INFO, about = "FileShed server")]
pub struct Args {
    #[arg(
        short = 'r',
        long,
        env = "FILESHED_ROOT",
        default_value = DEFAULT_ROOT_DIR,
        help = "Root directory to serve"
    )]
    pub root_dir: String,
    #[arg(
        short = 'b',
        long,
        env = "FILESHED_BIND",
        default_value = "0.0.0.0",
        help = "Bind address"
    )]
    pub host: String,
    #[arg(
        short = 'p',
        long,
        env = "FILESHED_PORT",
        default_value_t = DEFAULT_PORT,
        help = "HTTP port"
    )]
    pub port: u16,
}
