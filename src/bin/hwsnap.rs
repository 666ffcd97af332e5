// CLASSIFICATION: COMMUNITY
// Filename: hwsnap.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-15

use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use hwsnap::snapshot::{self, CaptureConfig, Snapshotter, SnapshotError};
use sha2::{Digest, Sha256};

#[derive(Parser)]
#[command(name = "hwsnap", about = "Hardware description snapshots", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture /proc and /sys into a tarball (Linux only)
    Create {
        /// Output file path; defaults to $OS-$ARCH-$HOSTHASH.tar.gz
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Root to capture from instead of / (or $HWSNAP_SOURCE_ROOT)
        #[arg(long)]
        source_root: Option<PathBuf>,
        /// Staging directory; a temporary one is used and removed otherwise
        #[arg(long)]
        build_dir: Option<PathBuf>,
    },
    /// Expand a snapshot into an empty or missing directory
    Expand { archive: PathBuf, dest: PathBuf },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Create { out, source_root, build_dir } => {
            let out = out.unwrap_or_else(default_out_path);
            create(out, source_root, build_dir)
        }
        Commands::Expand { archive, dest } => snapshot::expand(&archive, &dest).map(|_| ()),
    };
    if let Err(err) = result {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

fn create(
    out: PathBuf,
    source_root: Option<PathBuf>,
    build_dir: Option<PathBuf>,
) -> Result<(), SnapshotError> {
    // Kept alive until the archive is written; dropping it removes the tree.
    let scratch;
    let build = match build_dir {
        Some(dir) => dir,
        None => {
            scratch = tempfile::Builder::new()
                .prefix("hwsnap-build")
                .tempdir()
                .map_err(|source| SnapshotError::Path {
                    op: "mkdtemp",
                    path: std::env::temp_dir(),
                    source,
                })?;
            scratch.path().to_path_buf()
        }
    };
    let mut cfg = CaptureConfig::new(build, &out);
    if let Some(root) = source_root {
        cfg = cfg.with_source_root(root);
    }
    let report = Snapshotter::new(cfg).capture()?;
    for path in &report.skipped {
        eprintln!("skipped (permission denied): {}", path.display());
    }
    println!("successfully wrote snapshot to {}", out.display());
    Ok(())
}

fn default_out_path() -> PathBuf {
    PathBuf::from(format!(
        "{}-{}-{}.tar.gz",
        std::env::consts::OS,
        std::env::consts::ARCH,
        host_fingerprint()
    ))
}

/// Hash of the host name, so output names identify hosts without exposing them.
fn host_fingerprint() -> String {
    let Ok(name) = fs::read_to_string("/proc/sys/kernel/hostname") else {
        return "unknown".into();
    };
    let digest = Sha256::digest(name.trim().as_bytes());
    hex::encode(&digest[..16])
}
