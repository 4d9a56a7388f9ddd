use anyhow::{bail, Result};
use std::path::PathBuf;

use vidmerge::catalog::{Database, FileStatus};
use vidmerge::config::Config;
use vidmerge::logging;
use vidmerge::scanner::Scanner;
use vidmerge::status::StatusTracker;

enum Command {
    Scan { directory: PathBuf },
    Check,
    Ignore { path: String },
    Unignore { path: String },
    History(HistoryFilter),
    Prune,
    Stats,
}

enum HistoryFilter {
    Code(String),
    Session(i64),
    Days(i64),
}

struct Args {
    config_path: Option<PathBuf>,
    command: Command,
}

fn parse_args() -> Result<Args> {
    let args: Vec<String> = std::env::args().collect();
    let mut config_path = None;
    let mut command = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("vidmerge {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                } else {
                    bail!("--config requires a path argument");
                }
            }
            "scan" => {
                if i + 1 < args.len() {
                    command = Some(Command::Scan {
                        directory: PathBuf::from(&args[i + 1]),
                    });
                    i += 1;
                } else {
                    bail!("scan requires a directory argument");
                }
            }
            "check" => command = Some(Command::Check),
            "ignore" => {
                if i + 1 < args.len() {
                    command = Some(Command::Ignore {
                        path: args[i + 1].clone(),
                    });
                    i += 1;
                } else {
                    bail!("ignore requires a file path argument");
                }
            }
            "unignore" => {
                if i + 1 < args.len() {
                    command = Some(Command::Unignore {
                        path: args[i + 1].clone(),
                    });
                    i += 1;
                } else {
                    bail!("unignore requires a file path argument");
                }
            }
            "history" => {
                let filter = match args.get(i + 1).map(String::as_str) {
                    Some("--code") => {
                        let code = args
                            .get(i + 2)
                            .ok_or_else(|| anyhow::anyhow!("--code requires a value"))?;
                        i += 2;
                        HistoryFilter::Code(code.clone())
                    }
                    Some("--session") => {
                        let id = args
                            .get(i + 2)
                            .ok_or_else(|| anyhow::anyhow!("--session requires a value"))?;
                        i += 2;
                        HistoryFilter::Session(id.parse()?)
                    }
                    Some("--days") => {
                        let days = args
                            .get(i + 2)
                            .ok_or_else(|| anyhow::anyhow!("--days requires a value"))?;
                        i += 2;
                        HistoryFilter::Days(days.parse()?)
                    }
                    _ => HistoryFilter::Days(7),
                };
                command = Some(Command::History(filter));
            }
            "prune" => command = Some(Command::Prune),
            "stats" => command = Some(Command::Stats),
            other => {
                eprintln!("Unknown argument: {other}");
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let command = match command {
        Some(c) => c,
        None => {
            print_help();
            std::process::exit(1);
        }
    };

    Ok(Args {
        config_path,
        command,
    })
}

fn print_help() {
    println!(
        r#"vidmerge - video catalog reconciliation

USAGE:
    vidmerge [OPTIONS] COMMAND

COMMANDS:
    scan DIR            Scan a directory and merge results into the catalog
    check               Check on-disk presence of every catalog entry
    ignore PATH         Exclude a catalog entry from presence checks
    unignore PATH       Restore an ignored entry
    history [FILTER]    Show merge history (--code CODE | --session ID | --days N)
    prune               Delete merge events older than the configured age
    stats               Show catalog statistics

OPTIONS:
    --config, -c PATH   Path to config file
    --version, -V       Show version
    --help, -h          Show this help message

ENVIRONMENT:
    VIDMERGE_LOG        Log level (trace, debug, info, warn, error)

Config file location: $XDG_CONFIG_HOME/vidmerge/config.toml"#
    );
}

fn main() -> Result<()> {
    let args = parse_args()?;

    // Initialize logging (uses journald on Linux, file fallback otherwise)
    let _ = logging::init(Some(Config::config_dir().join("logs")));

    let config = match &args.config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let db = Database::open(&config.db_path)?;

    match args.command {
        Command::Scan { directory } => {
            let scanner = Scanner::new(config);
            let report = scanner.full_scan(&directory, &db)?;
            println!("Scan session {} complete", report.session_id);
            println!(
                "  found {} files, processed {}",
                report.files_found, report.files_processed
            );
            println!(
                "  inserted {}, updated {}, missing {}, replaced {}, duplicates {}, errors {}",
                report.stats.inserted,
                report.stats.updated,
                report.stats.marked_missing,
                report.stats.marked_replaced,
                report.stats.duplicates_detected,
                report.stats.errors
            );
        }
        Command::Check => {
            let mut records = db.all_videos()?;
            let mut tracker = StatusTracker::new();
            let report = tracker.batch_check(&mut records);
            for change in &report.changes {
                if let Some(entry) = db.get_video_by_path(&change.file_path)? {
                    if let Some(id) = entry.id {
                        db.update_video_status(id, change.new_status)?;
                    }
                }
            }
            println!(
                "Checked {}: {} present, {} missing, {} ignored, {} replaced",
                report.checked, report.present, report.missing, report.ignored, report.replaced
            );
            for change in &report.changes {
                println!(
                    "  {} {} -> {}",
                    change.file_path,
                    change.old_status.as_str(),
                    change.new_status.as_str()
                );
            }
        }
        Command::Ignore { path } => {
            let entry = db
                .get_video_by_path(&path)?
                .ok_or_else(|| anyhow::anyhow!("no catalog entry for {path}"))?;
            match entry.id {
                Some(id) => {
                    db.update_video_status(id, FileStatus::Ignore)?;
                    println!("Ignored {path}");
                }
                None => bail!("catalog entry for {path} has no row id"),
            }
        }
        Command::Unignore { path } => {
            let entry = db
                .get_video_by_path(&path)?
                .ok_or_else(|| anyhow::anyhow!("no catalog entry for {path}"))?;
            if entry.file_status != FileStatus::Ignore {
                bail!("{path} is not ignored");
            }
            match entry.id {
                Some(id) => {
                    let actual = vidmerge::status::probe(&path);
                    db.update_video_status(id, actual)?;
                    println!("Restored {path} as {}", actual.as_str());
                }
                None => bail!("catalog entry for {path} has no row id"),
            }
        }
        Command::History(filter) => {
            let events = match filter {
                HistoryFilter::Code(code) => db.merge_history_by_code(&code)?,
                HistoryFilter::Session(id) => db.merge_history_by_session(id)?,
                HistoryFilter::Days(days) => {
                    let start = (chrono::Local::now() - chrono::Duration::days(days))
                        .format("%Y-%m-%dT%H:%M:%S")
                        .to_string();
                    let end = chrono::Local::now().format("%Y-%m-%dT%H:%M:%S").to_string();
                    db.merge_history_between(&start, &end)?
                }
            };
            for event in &events {
                println!(
                    "{} {} code={} old={} new={}{}",
                    event.merge_time,
                    event.event_type.as_str(),
                    event.video_code.as_deref().unwrap_or("-"),
                    event.old_path.as_deref().unwrap_or("-"),
                    event.new_path.as_deref().unwrap_or("-"),
                    event
                        .details
                        .as_deref()
                        .map(|d| format!(" ({d})"))
                        .unwrap_or_default()
                );
            }
            println!("{} events", events.len());
        }
        Command::Prune => {
            let removed = db.prune_merge_history(config.history.max_age_days)?;
            println!(
                "Pruned {removed} merge events older than {} days",
                config.history.max_age_days
            );
        }
        Command::Stats => {
            let stats = db.statistics()?;
            println!("Catalog entries: {}", stats.total);
            println!("  present:  {}", stats.present);
            println!("  missing:  {}", stats.missing);
            println!("  ignored:  {}", stats.ignored);
            println!("  replaced: {}", stats.replaced);
            println!("Master codes:   {}", stats.codes);
            println!("Merge events:   {}", stats.merge_events);
            let dupes = db.duplicate_code_groups()?;
            if !dupes.is_empty() {
                println!("Codes with multiple present files:");
                for (code, count) in dupes {
                    println!("  {code}: {count}");
                }
            }
        }
    }

    Ok(())
}
