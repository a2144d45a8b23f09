//! Thin CLI surface over `photodex_core`: argument parsing and dispatch only,
//! no pipeline logic (spec §6). `main` owns logging setup and the catalog
//! connection; every subcommand is a direct call into the library.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use photodex_core::config::{MetadataExtractorConfig, MetadataSelectionStrategy, PlannerConfig, ScannerConfig};
use photodex_core::db::{open_connection, run_migrations};
use photodex_core::metadata::{self, SubprocessMetadataTool};
use photodex_core::pathdate;
use photodex_core::planner;
use photodex_core::scanner::{self, DriveUuidOracle};
use photodex_core::PhotodexError;

#[derive(Parser)]
#[command(name = "photodex", about = "Resumable photo-archive catalog pipeline")]
struct Cli {
    /// Path to the catalog database file.
    #[arg(long, global = true, default_value = "photodex.sqlite3")]
    catalog: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Walk a source root and record its inventory, then run PathDateExtractor.
    Scan {
        root: Option<PathBuf>,
        /// Continue a previously interrupted/running session for this root.
        /// Resumption happens whenever such a session exists and `--fresh`
        /// is absent; this flag exists so that is explicit, and is rejected
        /// together with `--fresh`.
        #[arg(long, conflicts_with = "fresh")]
        resume: bool,
        /// Force a fresh scan, discarding any prior session for this root.
        #[arg(long)]
        fresh: bool,
        /// Print the current session's status and exit without scanning.
        #[arg(long)]
        status: bool,
        #[arg(long)]
        stats: bool,
    },
    /// Run MetadataExtractor over the most recent scan session.
    ExtractMetadata {
        #[arg(long, default_value = "full")]
        strategy: String,
        #[arg(long)]
        batch_size: Option<usize>,
        #[arg(long)]
        limit: Option<usize>,
        /// External metadata tool command (default `exiftool`).
        #[arg(long, default_value = "exiftool")]
        tool: String,
        #[arg(long)]
        root: PathBuf,
        #[arg(long)]
        stats: bool,
    },
    /// Run the Planner over the most recent scan session.
    Plan {
        #[arg(long)]
        min_coverage: Option<f64>,
        #[arg(long)]
        min_prevalence: Option<f64>,
        #[arg(long)]
        max_span: Option<i64>,
        #[arg(long)]
        root: PathBuf,
        #[arg(long)]
        stats: bool,
    },
}

/// Real drive-UUID oracle: identifies a mount point by its device id. A
/// stand-in for the repository's actual detector, which is out of scope here
/// (spec §1 external collaborators) — this exists so the CLI is runnable
/// end-to-end.
struct DeviceIdOracle;

impl DriveUuidOracle for DeviceIdOracle {
    fn uuid_for(&self, mount_point: &Path) -> Result<String, scanner::uuid::UuidError> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            let meta = std::fs::metadata(mount_point)
                .map_err(|e| scanner::uuid::UuidError(format!("cannot stat {}: {}", mount_point.display(), e)))?;
            Ok(format!("dev-{:x}", meta.dev()))
        }
        #[cfg(not(unix))]
        {
            Ok(format!("root-{}", mount_point.display()))
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), PhotodexError> {
    let conn = open_connection(&cli.catalog)?;
    run_migrations(&conn)?;

    match cli.command {
        Command::Scan { root, resume, fresh, status, stats } => {
            if status {
                return print_scan_status(&conn, root.as_deref());
            }
            let root = root.ok_or_else(|| {
                PhotodexError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "scan requires a root path unless --status is given",
                ))
            })?;
            if resume {
                let resumable = photodex_core::catalog::session_repository::find_by_root(&conn, &root)
                    .map_err(PhotodexError::CatalogWrite)?
                    .is_some_and(|s| {
                        matches!(
                            s.status,
                            photodex_core::catalog::model::ScanSessionStatus::Running
                                | photodex_core::catalog::model::ScanSessionStatus::Interrupted
                        )
                    });
                if !resumable {
                    tracing::warn!("scan --resume: no resumable session for {}, starting fresh", root.display());
                }
            }
            let oracle = DeviceIdOracle;
            let outcome = scanner::run_scan(&conn, &root, &oracle, &ScannerConfig::default(), fresh)?;
            tracing::info!(
                "scan: {} files, {} directories, {} bytes",
                outcome.stats.files_scanned,
                outcome.stats.directories_scanned,
                outcome.stats.total_bytes
            );
            let path_date_stats = pathdate::run(&conn, outcome.session_id)?;
            if stats {
                print_json(&outcome.stats)?;
                print_json(&path_date_stats)?;
            }
            Ok(())
        }

        Command::ExtractMetadata { strategy, batch_size, limit, tool, root, stats } => {
            let session = photodex_core::catalog::session_repository::find_by_root(&conn, &root)
                .map_err(PhotodexError::CatalogWrite)?
                .ok_or_else(|| no_session_error(&root))?;
            let mut config = MetadataExtractorConfig::default();
            config.strategy = match strategy.as_str() {
                "selective" => MetadataSelectionStrategy::Selective,
                _ => MetadataSelectionStrategy::Full,
            };
            if let Some(n) = batch_size {
                config.batch_size = n;
            }
            config.limit = limit;

            let subprocess_tool = SubprocessMetadataTool::new(tool);
            let outcome_stats = metadata::run(&conn, session.id, &subprocess_tool, &config)?;
            if stats {
                print_json(&outcome_stats)?;
            }
            Ok(())
        }

        Command::Plan { min_coverage, min_prevalence, max_span, root, stats } => {
            let session = photodex_core::catalog::session_repository::find_by_root(&conn, &root)
                .map_err(PhotodexError::CatalogWrite)?
                .ok_or_else(|| no_session_error(&root))?;
            let mut config = PlannerConfig::default();
            if let Some(v) = min_coverage {
                config.min_coverage = v;
            }
            if let Some(v) = min_prevalence {
                config.min_prevalence = v;
            }
            if let Some(v) = max_span {
                config.max_date_span_months = v;
            }
            let plan_stats = planner::run(&conn, session.id, &config)?;
            if stats {
                print_json(&plan_stats)?;
            }
            Ok(())
        }
    }
}

fn no_session_error(root: &Path) -> PhotodexError {
    PhotodexError::Io(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        format!("no scan session recorded for {}; run `scan` first", root.display()),
    ))
}

fn print_scan_status(conn: &rusqlite::Connection, root: Option<&Path>) -> Result<(), PhotodexError> {
    let root = root.ok_or_else(|| {
        PhotodexError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "scan --status requires a root path",
        ))
    })?;
    match photodex_core::catalog::session_repository::find_by_root(conn, root).map_err(PhotodexError::CatalogWrite)? {
        Some(session) => {
            println!(
                "{}: {:?} ({} files, {} directories, {} bytes)",
                root.display(),
                session.status,
                session.file_count,
                session.directory_count,
                session.total_bytes
            );
            Ok(())
        }
        None => {
            println!("{}: no scan session", root.display());
            Ok(())
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), PhotodexError> {
    let json = serde_json::to_string_pretty(value).unwrap_or_default();
    println!("{}", json);
    Ok(())
}
