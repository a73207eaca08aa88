//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

use crate::core::config::ConfigOverrides;
use crate::core::modlist::LoaderType;

/// Resolve and download the best file of every mod in a list for one
/// Minecraft version, from CurseForge, GitHub and Modrinth.
#[derive(Debug, Parser)]
#[command(name = "modsync")]
#[command(version)]
pub struct Cli {
    /// Configuration file (defaults to ./modsync.toml, then the user config dir)
    #[arg(short = 'c', long = "config", env = "MODSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Download without asking for confirmation
    #[arg(short = 'y', long = "yes")]
    pub yes: bool,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Target game version, overriding the configuration
    #[arg(long = "game-version")]
    pub game_version: Option<String>,

    /// Where downloaded files go, overriding the configuration
    #[arg(long = "output-dir")]
    pub output_dir: Option<PathBuf>,

    /// Default loader filter for entries without one
    #[arg(long = "loader")]
    pub loader: Option<LoaderType>,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            game_version: self.game_version.clone(),
            output_dir: self.output_dir.clone(),
            loader: self.loader,
            unattended: self.yes,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_become_overrides() {
        let cli = Cli::parse_from([
            "modsync",
            "-y",
            "-c",
            "pack.toml",
            "--game-version",
            "1.21.1",
            "--loader",
            "NeoForge",
            "--output-dir",
            "out",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("pack.toml")));
        assert!(!cli.verbose);

        let overrides = cli.overrides();
        assert!(overrides.unattended);
        assert_eq!(overrides.game_version.as_deref(), Some("1.21.1"));
        assert_eq!(overrides.loader, Some(LoaderType::NeoForge));
        assert_eq!(overrides.output_dir, Some(PathBuf::from("out")));
    }

    #[test]
    fn unknown_loader_is_rejected() {
        assert!(Cli::try_parse_from(["modsync", "--loader", "rift"]).is_err());
    }
}
