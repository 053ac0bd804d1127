use clap::{Parser, Subcommand, ValueEnum};
use hse_report::aggregate::{self, TotalsView};
use hse_report::catalog::{Catalog, Project};
use hse_report::config::Config;
use hse_report::dataset::DatasetPatch;
use hse_report::store::{self, StoreError};
use hse_report::{pipeline, report};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hse-report", version, about = "Extract, store and total HSE indicators")]
struct Cli {
    /// Config file; the built-in defaults are used when it does not exist
    #[arg(long, global = true, default_value = "config/hse.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print projects, indicators and months
    Catalog,
    /// Extract indicator values from a report without saving them
    Extract {
        file: PathBuf,
        #[arg(long)]
        contract: Option<String>,
    },
    /// Extract indicator values from a report and save them for one contract
    Import {
        project: String,
        month: String,
        file: PathBuf,
        #[arg(long)]
        contract: String,
    },
    /// Print the stored dataset of a project month
    Show { project: String, month: String },
    /// Merge a JSON patch into a project month
    Save {
        project: String,
        month: String,
        patch: PathBuf,
    },
    /// Totals for one month
    Monthly {
        project: String,
        month: String,
        #[arg(long, value_enum, default_value_t = Format::Table)]
        format: Format,
    },
    /// Totals across every configured month
    Cumulative {
        project: String,
        #[arg(long, value_enum, default_value_t = Format::Table)]
        format: Format,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Table,
    Json,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // init tracing; stdout carries command output
    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = Config::load_or_builtin(&cli.config)?;
    let catalog = cfg.catalog();

    match cli.command {
        Command::Catalog => {
            println!("{}", serde_json::to_string_pretty(&catalog)?);
        }
        Command::Extract { file, contract } => {
            let bytes = fs::read(&file)?;
            let outcome = pipeline::process_upload(
                &file_name(&file),
                &bytes,
                contract.as_deref(),
                &catalog,
                &cfg.upload,
            )?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Command::Import {
            project,
            month,
            file,
            contract,
        } => {
            let bytes = fs::read(&file)?;
            let outcome = pipeline::process_upload(
                &file_name(&file),
                &bytes,
                Some(&contract),
                &catalog,
                &cfg.upload,
            )?;
            let db = store::open(&cfg.storage)?;
            let dataset = pipeline::commit(
                db.as_ref(),
                &catalog,
                &project,
                &month,
                &contract,
                &outcome.extracted,
            )?;
            info!(
                project = %project,
                month = %month,
                contract = %contract,
                detected = outcome.detected,
                total = outcome.total,
                "Report imported"
            );
            println!("{}", serde_json::to_string_pretty(&dataset)?);
        }
        Command::Show { project, month } => {
            let db = store::open(&cfg.storage)?;
            let dataset = db.load(&catalog, &project, &month)?;
            println!("{}", serde_json::to_string_pretty(&dataset)?);
        }
        Command::Save {
            project,
            month,
            patch,
        } => {
            let patch: DatasetPatch = serde_json::from_str(&fs::read_to_string(&patch)?)?;
            let db = store::open(&cfg.storage)?;
            let dataset = db.save(&catalog, &project, &month, &patch)?;
            println!("{}", serde_json::to_string_pretty(&dataset)?);
        }
        Command::Monthly {
            project,
            month,
            format,
        } => {
            let db = store::open(&cfg.storage)?;
            let dataset = db.load(&catalog, &project, &month)?;
            let project = find_project(&catalog, &project)?;
            print_view(
                &aggregate::monthly_total(&dataset, &project.contracts, &catalog),
                format,
            )?;
        }
        Command::Cumulative { project, format } => {
            let db = store::open(&cfg.storage)?;
            let datasets = db.load_all(&catalog, &project, &catalog.months)?;
            let project = find_project(&catalog, &project)?;
            print_view(
                &aggregate::cumulative(&project.id, &datasets, &project.contracts, &catalog),
                format,
            )?;
        }
    }

    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn find_project<'a>(catalog: &'a Catalog, id: &str) -> Result<&'a Project, StoreError> {
    catalog
        .project(id)
        .ok_or_else(|| StoreError::UnknownProject(id.to_string()))
}

fn print_view(view: &TotalsView, format: Format) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        Format::Table => print!("{}", report::render_table(view)),
        Format::Json => println!("{}", serde_json::to_string_pretty(view)?),
    }
    Ok(())
}
