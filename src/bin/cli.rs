//! faltas CLI
//!
//! Local entry point: synchronize attendance data from the portal, inspect
//! the persisted snapshot and run what-if calculations against it.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use faltas_sync::{
    error::{AppError, Result},
    models::{default_week_index, Config, PlanEntry},
    pipeline,
    services::Role,
    stats,
    storage::{LocalStorage, SnapshotStorage},
    utils::weekly_absence_summary,
};

/// faltas - student attendance synchronizer
#[derive(Parser, Debug)]
#[command(name = "faltas", version, about = "Attendance portal synchronizer")]
struct Cli {
    /// Path to the data directory containing config and snapshots
    #[arg(short, long, default_value = ".data")]
    data_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl the whole academic year and persist a fresh snapshot
    Sync {
        /// Portal username
        #[arg(short, long)]
        user: String,

        /// Portal password
        #[arg(short, long)]
        password: String,

        /// Portal role code (A=student, P=teacher, D=management, E=educator)
        #[arg(short, long, default_value = "A")]
        role: Role,
    },

    /// Show snapshot and configuration status for a student
    Status {
        /// Student identifier (DNI)
        #[arg(long)]
        dni: String,
    },

    /// Single-scenario query: what if N more hours of a module are missed
    Calc {
        #[arg(long)]
        dni: String,

        /// Module code
        #[arg(short, long)]
        module: String,

        /// Hypothetical additional absent hours
        #[arg(short, long, default_value_t = 0.0)]
        added: f64,
    },

    /// Apply a plan of absence/attendance entries from a JSON file
    Plan {
        #[arg(long)]
        dni: String,

        /// JSON array of {kind, scope, code?, hours} entries
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Print the per-day absence summary of one crawled week
    Week {
        #[arg(long)]
        dni: String,

        /// Any date inside the wanted week (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Set general weekly hours per module, e.g. M1=5 M2=3.5
    SetHours {
        #[arg(long)]
        dni: String,

        /// CODE=HOURS assignments
        #[arg(required = true)]
        assignments: Vec<String>,
    },

    /// Select the target modules of a reto
    SetTargets {
        #[arg(long)]
        dni: String,

        /// Reto code
        #[arg(short, long)]
        reto: String,

        /// Target module codes
        #[arg(required = true)]
        modules: Vec<String>,
    },
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

async fn load_snapshot_or_fail(
    storage: &LocalStorage,
    dni: &str,
) -> Result<(
    faltas_sync::models::DistributedSnapshot,
    pipeline::ConfigStatus,
)> {
    pipeline::load_processed(storage, dni)
        .await?
        .ok_or_else(|| AppError::config(format!("no snapshot for {dni}, run 'sync' first")))
}

fn parse_assignment(raw: &str) -> Result<(String, f64)> {
    let (code, hours) = raw
        .split_once('=')
        .ok_or_else(|| AppError::validation(format!("expected CODE=HOURS, got {raw:?}")))?;
    let hours: f64 = hours
        .parse()
        .map_err(|_| AppError::validation(format!("invalid hours in {raw:?}")))?;
    if !hours.is_finite() || hours < 0.0 {
        return Err(AppError::validation(format!("hours must be >= 0 in {raw:?}")));
    }
    Ok((code.to_string(), hours))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.data_dir.join("config.toml");
    let config = Config::load_or_default(&config_path);
    let storage = LocalStorage::new(&cli.data_dir);

    match cli.command {
        Command::Sync {
            user,
            password,
            role,
        } => {
            let today = Local::now().date_naive();
            let report =
                pipeline::run_sync(&config, &storage, role, &user, &password, today).await?;

            log::info!(
                "Synchronized {} ({}): {} weeks crawled, {} failed",
                report.snapshot.raw.identity.full_name,
                report.snapshot.raw.identity.dni,
                report.attempted_weeks - report.failed_weeks.len(),
                report.failed_weeks.len()
            );
            for reason in &report.config_status.reasons {
                log::warn!("Configuration advisory: {}", reason);
            }
        }

        Command::Status { dni } => {
            let (snapshot, status) = load_snapshot_or_fail(&storage, &dni).await?;

            log::info!(
                "{} ({}) - {} weeks, {} subjects, {} retos",
                snapshot.raw.identity.full_name,
                snapshot.raw.identity.dni,
                snapshot.raw.weeks.len(),
                snapshot.raw.aggregated.modules.len(),
                snapshot.distribution.retos.len()
            );
            if status.configured {
                log::info!("Configuration complete");
            } else {
                for reason in &status.reasons {
                    log::warn!("Configuration advisory: {}", reason);
                }
            }
        }

        Command::Calc { dni, module, added } => {
            let (snapshot, _) = load_snapshot_or_fail(&storage, &dni).await?;
            let response = stats::calculate(&snapshot, &module, added)?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }

        Command::Plan { dni, file } => {
            let content = std::fs::read_to_string(&file)?;
            let entries: Vec<PlanEntry> = serde_json::from_str(&content)?;

            let (snapshot, _) = load_snapshot_or_fail(&storage, &dni).await?;
            let response = stats::compute_plan(&snapshot, &entries);
            println!("{}", serde_json::to_string_pretty(&response)?);
        }

        Command::Week { dni, date } => {
            let (snapshot, _) = load_snapshot_or_fail(&storage, &dni).await?;
            let wanted = date
                .unwrap_or_else(|| Local::now().date_naive())
                .format("%Y-%m-%d")
                .to_string();

            let Some(index) = default_week_index(&snapshot.raw.weeks, &wanted) else {
                return Err(AppError::config("snapshot contains no weeks"));
            };
            let week = &snapshot.raw.weeks[index];
            log::info!("Week {} to {}", week.week_start, week.week_end);
            for day in weekly_absence_summary(week) {
                if day.total == 0 {
                    log::info!("  {}: no absences", day.date);
                } else {
                    let mut parts: Vec<String> =
                        day.types.iter().map(|(c, n)| format!("{c}x{n}")).collect();
                    parts.sort();
                    log::info!("  {}: {} absent ({})", day.date, day.total, parts.join(", "));
                }
            }
        }

        Command::SetHours { dni, assignments } => {
            let mut student = storage.load_student_config(&dni).await?;
            for raw in &assignments {
                let (code, hours) = parse_assignment(raw)?;
                student.hours_per_module.insert(code, hours);
            }
            storage.save_student_config(&dni, &student).await?;
            log::info!("Stored hours for {} modules", assignments.len());
        }

        Command::SetTargets { dni, reto, modules } => {
            let mut student = storage.load_student_config(&dni).await?;
            let selection: BTreeMap<String, bool> =
                modules.iter().map(|m| (m.clone(), true)).collect();
            student.reto_targets.insert(reto.clone(), selection);
            storage.save_student_config(&dni, &student).await?;
            log::info!("Reto {} now targets {} modules", reto, modules.len());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignments_parse_code_and_hours() {
        assert_eq!(parse_assignment("M1=5").unwrap(), ("M1".to_string(), 5.0));
        assert_eq!(
            parse_assignment("M2=3.5").unwrap(),
            ("M2".to_string(), 3.5)
        );
        assert!(parse_assignment("M1").is_err());
        assert!(parse_assignment("M1=abc").is_err());
        assert!(parse_assignment("M1=-2").is_err());
    }

    #[test]
    fn cli_parses_sync_command() {
        let cli = Cli::parse_from([
            "faltas", "sync", "--user", "mikel", "--password", "secret",
        ]);
        match cli.command {
            Command::Sync { user, role, .. } => {
                assert_eq!(user, "mikel");
                assert_eq!(role.code(), "A");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
