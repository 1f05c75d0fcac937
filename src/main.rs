use clap::{Parser, Subcommand};
use idcard_export::archive::ArchiveLayout;
use idcard_export::batch::{self, BatchOptions, Delivery, ExportEvent};
use idcard_export::card::{ResvgRenderer, Staging};
use idcard_export::document::{PageSize, PdfComposer};
use idcard_export::pipeline::{CancelToken, Pipeline};
use idcard_export::summary::{self, ExportSummary};
use idcard_export::{config, output, roster};
use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};
use std::thread::JoinHandle;
use tracing_subscriber::EnvFilter;

/// Flags for the full export.
#[derive(clap::Args, Clone)]
struct ExportArgs {
    /// Write plain images/ and documents/ folders instead of a ZIP
    #[arg(long)]
    unpacked: bool,

    /// Also write a JSON summary (entries, hashes, failures) to this path
    #[arg(long)]
    summary: Option<PathBuf>,
}

#[derive(Parser)]
#[command(name = "idcard-export")]
#[command(about = "Batch exporter for employee ID cards")]
#[command(long_about = "\
Batch exporter for employee ID cards

Renders the front and back of every card in a roster to PNG, builds a
two-page print-ready PDF per card (85.6 x 53.98 mm, ID-1), and packages
everything into one archive:

  TOMO_Academy_ID_Cards.zip
  ├── images/
  │   ├── Jane_Doe_E001_front.png
  │   └── Jane_Doe_E001_back.png
  └── documents/
      └── Jane_Doe_E001.pdf

Roster (JSON array; extra keys are ignored):

  [{ \"id\": \"emp-001\", \"name\": \"Jane Doe\", \"employeeId\": \"E001\",
     \"role\": \"Designer\", \"location\": \"Tokyo\", \"photo\": \"photos/jane.jpg\" }]

Run 'idcard-export gen-config' to generate a documented export.toml.")]
#[command(version)]
struct Cli {
    /// Config file (missing file = stock defaults)
    #[arg(long, default_value = config::CONFIG_FILE_NAME, global = true)]
    config: PathBuf,

    /// Roster JSON file
    #[arg(long, default_value = "roster.json", global = true)]
    roster: PathBuf,

    /// Output directory
    #[arg(long, default_value = "dist", global = true)]
    output: PathBuf,

    /// Log more to stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Export every card into one archive
    Export(ExportArgs),
    /// Export a single card by record id
    Render {
        /// Record id from the roster
        id: String,
    },
    /// Write every card into one combined PDF
    Sheet,
    /// Stage every face without rendering and report missing ones
    Check,
    /// Print a stock export.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Command::Export(args) => {
            let (config, roster, staging) = load_inputs(&cli)?;
            let pipeline = build_pipeline(&config, staging);
            let delivery = if args.unpacked {
                Delivery::Unpacked {
                    dir: cli.output.clone(),
                }
            } else {
                Delivery::Zip {
                    dir: cli.output.clone(),
                    file_name: config.archive_name(),
                }
            };
            let options = batch_options(&config, delivery);
            let (tx, printer) = spawn_printer();
            let result = batch::run(&pipeline, &roster.records, &options, Some(tx));
            join_printer(printer);
            let report = result?;
            output::print_report(&report);

            if let Some(path) = &args.summary {
                let summary = ExportSummary {
                    organization: config.organization.name.clone(),
                    archive: report.delivered.display().to_string(),
                    archive_sha256: report.archive_sha256.clone(),
                    total: report.total,
                    exported: report.exported,
                    entries: report.entries.clone(),
                    failures: report.failures.clone(),
                };
                summary::write_summary(path, &summary)?;
                println!("Summary: {}", path.display());
            }
        }
        Command::Render { id } => {
            let (config, roster, staging) = load_inputs(&cli)?;
            let record = roster
                .find(id)
                .cloned()
                .ok_or_else(|| format!("no record with id '{id}' in {}", cli.roster.display()))?;
            let pipeline = build_pipeline(&config, staging);
            let options = batch_options(
                &config,
                Delivery::Unpacked {
                    dir: cli.output.clone(),
                },
            );
            let (tx, printer) = spawn_printer();
            let result = batch::run(&pipeline, &[record], &options, Some(tx));
            join_printer(printer);
            output::print_report(&result?);
        }
        Command::Sheet => {
            let (config, roster, staging) = load_inputs(&cli)?;
            let pipeline = build_pipeline(&config, staging);
            let options = batch_options(
                &config,
                Delivery::Unpacked {
                    dir: cli.output.clone(),
                },
            );
            let (tx, printer) = spawn_printer();
            let result = batch::run_sheet(
                &pipeline,
                &roster.records,
                &options,
                &config.sheet_name(),
                Some(tx),
            );
            join_printer(printer);
            output::print_sheet_report(&result?);
        }
        Command::Check => {
            let (_, roster, staging) = load_inputs(&cli)?;
            println!("==> Checking {}", cli.roster.display());
            let checks = batch::check(&staging, &roster.records);
            output::print_check(&checks);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load config and roster, and set up face staging for them.
fn load_inputs(
    cli: &Cli,
) -> Result<(config::ExportConfig, roster::Roster, Staging), Box<dyn std::error::Error>> {
    let config = config::load_config(&cli.config)?;
    let roster = roster::load_roster(&cli.roster)?;
    let staging = Staging::from_config(&config, &roster.base_dir);
    tracing::info!(
        records = roster.len(),
        roster = %cli.roster.display(),
        "inputs loaded"
    );
    Ok((config, roster, staging))
}

/// Install the stderr log subscriber. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("idcard_export={}", level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn build_pipeline(
    config: &config::ExportConfig,
    staging: Staging,
) -> Pipeline<Staging, ResvgRenderer, PdfComposer> {
    Pipeline::new(
        staging,
        ResvgRenderer::new(config.canvas()),
        PdfComposer::new(PageSize::from(&config.document)),
    )
    .with_render_timeout(config.export.render_timeout())
}

fn batch_options(config: &config::ExportConfig, delivery: Delivery) -> BatchOptions {
    BatchOptions {
        layout: ArchiveLayout::from(&config.archive),
        delivery,
        pace: config.export.pace(),
        cancel: CancelToken::new(),
    }
}

/// Print progress events from a dedicated thread while the batch runs.
fn spawn_printer() -> (Sender<ExportEvent>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_export_event(&event) {
                println!("{}", line);
            }
        }
    });
    (tx, printer)
}

fn join_printer(printer: JoinHandle<()>) {
    if printer.join().is_err() {
        tracing::warn!("progress printer panicked");
    }
}
