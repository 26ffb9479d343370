use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;

/// Resona music generation service
#[derive(Debug, Parser)]
#[command(name = "resona", about = "HTTP service for text-to-music generation and audio file management")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "resona.toml", env = "RESONA_CONFIG")]
    pub config: PathBuf,

    /// Override the listen address
    #[arg(long, env = "RESONA_LISTEN")]
    pub listen: Option<SocketAddr>,

    /// Log filter used when `RUST_LOG` is unset
    #[arg(long, default_value = "info", env = "RESONA_LOG")]
    pub log: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["resona"]).unwrap();
        assert_eq!(args.config, PathBuf::from("resona.toml"));
        assert_eq!(args.listen, None);
        assert_eq!(args.log, "info");
    }

    #[test]
    fn listen_override_parses() {
        let args = Args::try_parse_from(["resona", "--listen", "127.0.0.1:9000", "-c", "/etc/resona.toml"]).unwrap();
        assert_eq!(args.listen, Some(SocketAddr::from(([127, 0, 0, 1], 9000))));
        assert_eq!(args.config, PathBuf::from("/etc/resona.toml"));
    }
}
