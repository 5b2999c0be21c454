use anyhow::bail;
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};

/// Runtime configuration for the `rekey` binary.
///
/// Both paths are parsed from CLI arguments or environment variables. The
/// worker count is fixed by the library.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "rekey",
    version,
    about = "Re-keys every record of a CSV file with a fresh UUIDv4"
)]
pub struct CliArgs {
    /// Path of the CSV file to read.
    ///
    /// The first row is treated as a header and discarded. Every following
    /// row must carry exactly seven fields:
    /// `id, firstName, lastName, email, address, city, country`.
    ///
    /// Environment variable: `REKEY_INPUT`
    #[arg(long, env = "REKEY_INPUT", default_value = "data.csv")]
    pub input: PathBuf,

    /// Path of the CSV file to write.
    ///
    /// The file is created, or truncated if it already exists. No header row
    /// is written.
    ///
    /// Environment variable: `REKEY_OUTPUT`
    #[arg(long, env = "REKEY_OUTPUT", default_value = "output.csv")]
    pub output: PathBuf,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub input: PathBuf,
    pub output: PathBuf,
}

impl TryFrom<CliArgs> for AppConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if is_same_file(&args.input, &args.output) {
            bail!(
                "REKEY_INPUT ({}) and REKEY_OUTPUT ({}) must be different files",
                args.input.display(),
                args.output.display()
            );
        }

        Ok(Self {
            input: args.input,
            output: args.output,
        })
    }
}

/// Returns `true` if both paths name the same file, through any spelling,
/// symlink or hard link.
///
/// A path that does not exist yet can only match another by spelling.
fn is_same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    let (Ok(meta_a), Ok(meta_b)) = (fs::metadata(a), fs::metadata(b)) else {
        return false;
    };

    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        meta_a.dev() == meta_b.dev() && meta_a.ino() == meta_b.ino()
    }
    #[cfg(not(unix))]
    {
        let _ = (meta_a, meta_b);
        matches!(
            (fs::canonicalize(a), fs::canonicalize(b)),
            (Ok(a), Ok(b)) if a == b
        )
    }
}
