//! Command line arguments

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use mp_attachments::{EntityKind, ImageRole};

#[derive(Debug, Parser)]
#[command(
    name = "marketplace-images",
    version,
    about = "Validate, upload and reorder marketplace images"
)]
pub struct Cli {
    #[command(flatten)]
    pub target: Target,

    /// Stage uploads locally instead of calling the API
    #[arg(long)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// The image collection being edited
#[derive(Debug, Clone, Args)]
pub struct Target {
    /// Owning entity kind (item or producer)
    #[arg(long, default_value = "item", value_parser = parse_entity)]
    pub entity: EntityKind,

    /// Image kind (logo, portfolio or item)
    #[arg(long, default_value = "item", value_parser = parse_role)]
    pub role: ImageRole,

    /// Id of the owning entity; omit for an entity that is not saved yet
    #[arg(long)]
    pub owner: Option<String>,

    /// Urls already attached, comma separated
    #[arg(long, value_delimiter = ',')]
    pub existing: Vec<String>,

    /// Override the default max image count
    #[arg(long)]
    pub max_files: Option<usize>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Check file names and count without uploading
    Validate {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Upload files in order and print the resulting value
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Move the image at one position onto another
    Reorder {
        #[arg(long)]
        from: usize,
        #[arg(long)]
        to: usize,
    },
}

fn parse_entity(s: &str) -> Result<EntityKind, String> {
    EntityKind::from_str(s).ok_or_else(|| format!("unknown entity kind: {}", s))
}

fn parse_role(s: &str) -> Result<ImageRole, String> {
    ImageRole::from_str(s).ok_or_else(|| format!("unknown image kind: {}", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_upload() {
        let cli = Cli::try_parse_from([
            "marketplace-images",
            "--entity",
            "producer",
            "--role",
            "portfolio",
            "--owner",
            "p-4",
            "--existing",
            "https://cdn.example.com/a.png,https://cdn.example.com/b.png",
            "upload",
            "barn.jpg",
            "field.jpg",
        ])
        .unwrap();

        assert_eq!(cli.target.entity, EntityKind::Producer);
        assert_eq!(cli.target.role, ImageRole::Portfolio);
        assert_eq!(cli.target.owner.as_deref(), Some("p-4"));
        assert_eq!(cli.target.existing.len(), 2);
        assert!(!cli.offline);
        match cli.command {
            Commands::Upload { files } => assert_eq!(files.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_defaults_and_reorder() {
        let cli = Cli::try_parse_from(["marketplace-images", "reorder", "--from", "0", "--to", "2"])
            .unwrap();
        assert_eq!(cli.target.entity, EntityKind::Item);
        assert_eq!(cli.target.role, ImageRole::Item);
        assert!(cli.target.owner.is_none());
        assert!(matches!(cli.command, Commands::Reorder { from: 0, to: 2 }));
    }

    #[test]
    fn test_rejects_unknown_kinds() {
        assert!(Cli::try_parse_from(["marketplace-images", "--entity", "shop", "validate", "a.png"]).is_err());
        assert!(Cli::try_parse_from(["marketplace-images", "--role", "banner", "validate", "a.png"]).is_err());
        assert!(Cli::try_parse_from(["marketplace-images", "upload"]).is_err());
    }
}
