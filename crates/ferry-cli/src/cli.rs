use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "ferry",
    about = "Copy files to and from an object store",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Store root directory (overrides the configuration file)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Upload a local file as an object
    Put(PutArgs),
    /// Download an object into a local file
    Get(GetArgs),
    /// Show an object's metadata
    Stat(StatArgs),
}

#[derive(Args, Debug)]
pub struct PutArgs {
    pub bucket: String,
    pub src: PathBuf,
    pub key: String,
    /// Expiration as unix seconds or an RFC 3339 timestamp
    #[arg(long)]
    pub expires: Option<String>,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    pub bucket: String,
    pub key: String,
    pub dest: PathBuf,
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    pub offset: i64,
    /// Bytes to read; negative reads to the end
    #[arg(long, default_value = "-1", allow_negative_numbers = true)]
    pub length: i64,
}

#[derive(Args, Debug)]
pub struct StatArgs {
    pub bucket: String,
    pub key: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_put() {
        let cli = Cli::try_parse_from([
            "ferry", "--root", "/tmp/s", "put", "photos", "cat.jpg", "cats/1.jpg", "--expires",
            "1700000000",
        ])
        .unwrap();
        assert_eq!(cli.root, Some(PathBuf::from("/tmp/s")));
        match cli.command {
            Command::Put(args) => {
                assert_eq!(args.bucket, "photos");
                assert_eq!(args.key, "cats/1.jpg");
                assert_eq!(args.expires.as_deref(), Some("1700000000"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parse_get_defaults() {
        let cli = Cli::try_parse_from(["ferry", "get", "b", "k", "out", "-v"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Command::Get(args) => {
                assert_eq!(args.offset, 0);
                assert_eq!(args.length, -1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_operand_rejected() {
        assert!(Cli::try_parse_from(["ferry", "stat", "bucket"]).is_err());
    }
}
