use std::path::PathBuf;

use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime};
use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use academic_performance_engine::engine::analytics::{analyze, AnalyticsView};
use academic_performance_engine::engine::council::{evaluate_class, CouncilQuery};
use academic_performance_engine::engine::export::{grade_sheet, year_summary};
use academic_performance_engine::filters::{SubjectFilter, ViewFilters};
use academic_performance_engine::models::{Id, StudentStatus, TermLimit};
use academic_performance_engine::{config, db, logging, report};

#[derive(Parser)]
#[command(name = "academic-performance")]
#[command(about = "Bimester averages, recovery and class council reports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum StatusArg {
    Active,
    Transferred,
    Dropped,
    All,
}

impl StatusArg {
    fn filter(self) -> Option<StudentStatus> {
        match self {
            StatusArg::Active => Some(StudentStatus::Active),
            StatusArg::Transferred => Some(StudentStatus::Transferred),
            StatusArg::Dropped => Some(StudentStatus::Dropped),
            StatusArg::All => None,
        }
    }
}

/// Curriculum scope shared by council and analytics.
#[derive(Args)]
struct ScopeArgs {
    #[arg(long)]
    formation: Option<String>,
    #[arg(long)]
    area: Option<String>,
    #[arg(long = "sub-area")]
    sub_area: Vec<String>,
    #[arg(long)]
    subject: Option<String>,
}

impl ScopeArgs {
    fn into_filter(self) -> anyhow::Result<SubjectFilter> {
        Ok(SubjectFilter {
            formation_id: optional_id("formation_id", self.formation)?,
            area_id: optional_id("area_id", self.area)?,
            sub_area_ids: self
                .sub_area
                .iter()
                .map(|raw| Id::parse("sub_area_id", raw))
                .collect::<Result<Vec<_>, _>>()?,
            subject_id: optional_id("subject_id", self.subject)?,
        })
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import grades from a CSV file (student_id,subject_id,term,value)
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Build the class council board
    Council {
        #[arg(long)]
        year: i32,
        #[arg(long)]
        class: String,
        /// Last bimester considered; 4 is the final view with recovery
        #[arg(long, default_value_t = 4)]
        reference_term: u8,
        #[arg(long, value_enum, default_value = "active")]
        status: StatusArg,
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long)]
        min_above: Option<usize>,
        #[arg(long)]
        min_below: Option<usize>,
        /// Evaluate deadlines as of this date instead of today
        #[arg(long)]
        as_of: Option<NaiveDate>,
        #[arg(long, default_value = "council.md")]
        out: PathBuf,
        #[arg(long)]
        csv: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Knowledge-area performance analytics
    #[command(group(
        ArgGroup::new("view")
            .args(["reference_term", "bimester"])
            .multiple(false)
    ))]
    Analytics {
        #[arg(long)]
        year: i32,
        #[arg(long)]
        class: Option<String>,
        #[arg(long)]
        reference_term: Option<u8>,
        #[arg(long)]
        bimester: Option<u8>,
        #[arg(long, value_enum, default_value = "active")]
        status: StatusArg,
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long, default_value_t = 15)]
        top: usize,
        #[arg(long)]
        as_of: Option<NaiveDate>,
        #[arg(long, default_value = "analytics.md")]
        out: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Export the yearly grade sheet
    Export {
        #[arg(long)]
        year: i32,
        #[arg(long, default_value = "grades.csv")]
        out: PathBuf,
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
}

fn evaluation_time(as_of: Option<NaiveDate>) -> anyhow::Result<NaiveDateTime> {
    match as_of {
        Some(date) => date
            .and_hms_opt(23, 59, 59)
            .context("invalid --as-of date"),
        None => Ok(chrono::Local::now().naive_local()),
    }
}

fn optional_id(field: &'static str, raw: Option<String>) -> anyhow::Result<Option<Id>> {
    Ok(raw.map(|raw| Id::parse(field, &raw)).transpose()?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    let cli = Cli::parse();
    let settings = config::Settings::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .connect(&settings.database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let written = db::import_csv(&pool, &csv).await?;
            println!("Stored {written} grades from {}.", csv.display());
        }
        Commands::Council {
            year,
            class,
            reference_term,
            status,
            scope,
            min_above,
            min_below,
            as_of,
            out,
            csv,
            json,
        } => {
            let now = evaluation_time(as_of)?;
            let mut query = CouncilQuery::new(
                Id::parse("class_id", &class)?,
                TermLimit::new(reference_term)?,
            );
            query.status = status.filter();
            query.subjects = scope.into_filter()?;
            query.min_above = min_above;
            query.min_below = min_below;

            let snapshot = db::load_snapshot(&pool, year).await?;
            let board = evaluate_class(&snapshot, &query, now)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&board)?);
            } else {
                std::fs::write(&out, report::build_council_report(&board))?;
                println!("Council report written to {}.", out.display());
            }
            if let Some(path) = csv {
                std::fs::write(&path, report::council_csv(&board)?)?;
                println!("Council sheet written to {}.", path.display());
            }
            info!(students = board.rows.len(), "council finished");
        }
        Commands::Analytics {
            year,
            class,
            reference_term,
            bimester,
            status,
            scope,
            top,
            as_of,
            out,
            json,
        } => {
            let now = evaluation_time(as_of)?;
            let view = match (bimester, reference_term) {
                (Some(term), _) => AnalyticsView::bimester(term)?,
                (None, Some(limit)) => AnalyticsView::Accumulated(TermLimit::new(limit)?),
                (None, None) => AnalyticsView::Accumulated(TermLimit::FULL_YEAR),
            };
            let filters = ViewFilters {
                year,
                status: status.filter(),
                class_id: optional_id("class_id", class)?,
                subjects: scope.into_filter()?,
            };

            let snapshot = db::load_snapshot(&pool, year).await?;
            let analytics = analyze(&snapshot, &filters, view, now);

            if json {
                println!("{}", serde_json::to_string_pretty(&analytics)?);
            } else {
                std::fs::write(&out, report::build_analytics_report(year, &analytics, top))?;
                println!("Analytics report written to {}.", out.display());
            }
        }
        Commands::Export { year, out, as_of } => {
            let now = evaluation_time(as_of)?;
            let snapshot = db::load_snapshot(&pool, year).await?;
            let rows = grade_sheet(&snapshot, now);
            std::fs::write(&out, report::grade_sheet_csv(&rows)?)?;

            print!("{}", report::build_summary_report(&year_summary(&snapshot)));
            println!();
            println!("Exported {} grade rows to {}.", rows.len(), out.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn council_accepts_curriculum_scope() {
        let cli = Cli::try_parse_from([
            "academic-performance",
            "council",
            "--year",
            "2026",
            "--class",
            "c1",
            "--area",
            "a-exatas",
            "--sub-area",
            "sa-mat",
            "--sub-area",
            "sa-nat",
        ])
        .unwrap();

        let Commands::Council { scope, .. } = cli.command else {
            panic!("expected the council subcommand");
        };
        let filter = scope.into_filter().unwrap();
        assert_eq!(filter.area_id, Some(Id::from("a-exatas")));
        assert_eq!(filter.sub_area_ids, vec![Id::from("sa-mat"), Id::from("sa-nat")]);
        assert_eq!(filter.formation_id, None);
    }

    #[test]
    fn blank_scope_id_is_rejected() {
        let scope = ScopeArgs {
            formation: Some("  ".to_string()),
            area: None,
            sub_area: Vec::new(),
            subject: None,
        };
        assert!(scope.into_filter().is_err());
    }
}
