use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Deserialize;
use thiserror::Error;

use hpack::HtpackError;

#[derive(Parser)]
#[command(name = "htpack")]
#[command(about = "Pack crawled html documents into compact htpack containers")]
#[command(author, version, long_about = None)]
pub struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Packs newline delimited json `{url, title, keywords, html}` records
    Pack {
        /// Input records, `-` for stdin
        input: PathBuf,

        /// The container to create, must not exist yet
        output: PathBuf,

        /// Keep the digest in memory instead of an extended attribute
        #[arg(long)]
        no_xattr: bool,
    },

    /// Prints every page of a container as json lines
    Dump {
        /// Container to read, stdin if absent
        file: Option<PathBuf>,

        /// Print the element tree instead of html
        #[arg(long)]
        tree: bool,
    },

    /// Prints `{title, url, body}` per page for indexing
    Text {
        /// Container to read, stdin if absent
        file: Option<PathBuf>,
    },

    /// Prints the page at one position of a container
    Show {
        file: PathBuf,

        /// Byte offset of the page, the first page if absent
        #[arg(short, long)]
        position: Option<u64>,
    },

    /// Checks a container against its stored digest
    Verify { file: PathBuf },
}

pub const DEFAULT_CONFIG: &str = r#"
namespace = "feep"
collapse_whitespace = true
strict = false

[attrs]
"#;

#[derive(Deserialize, Debug)]
pub struct Config {
    /// Extended attribute namespace for the digest
    pub namespace: String,
    pub collapse_whitespace: bool,

    /// Abort on the first page that fails to pack instead of skipping it
    pub strict: bool,

    /// Extra extended attributes for packed files, by full attribute name
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
}

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    #[error(transparent)]
    Htpack(#[from] HtpackError),
    #[error("bad config: {0}")]
    Config(#[from] toml::de::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("no page at position {0}")]
    NoPage(u64),
    #[error("verification failed: {0}")]
    Verify(String),
}

#[cfg(test)]
mod test_cli {
    use super::*;

    #[test]
    fn default_config() {
        let config: Config = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.namespace, "feep");
        assert!(config.collapse_whitespace);
        assert!(!config.strict);
        assert!(config.attrs.is_empty());
    }

    #[test]
    fn custom_config() {
        let config: Config = toml::from_str(
            r#"
            namespace = "crawl"
            collapse_whitespace = false
            strict = true

            [attrs]
            "user.crawl.source" = "commoncrawl"
        "#,
        )
        .unwrap();

        assert_eq!(config.namespace, "crawl");
        assert!(config.strict);
        assert_eq!(config.attrs["user.crawl.source"], "commoncrawl");
    }

    #[test]
    fn parse_args() {
        let cli = Cli::parse_from(["htpack", "show", "a.htpack", "--position", "42"]);
        assert!(matches!(
            cli.command,
            Commands::Show { position: Some(42), .. }
        ));

        let cli = Cli::parse_from(["htpack", "-c", "x.toml", "dump", "--tree"]);
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        assert!(matches!(cli.command, Commands::Dump { file: None, tree: true }));
    }
}
