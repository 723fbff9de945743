use std::io::{self, Write};
use tracing::error;

use crate::cli::args::{Cli, Commands, OutputFormat, QuerySource, SourceSelection};
use crate::config::Settings;
use crate::context::DataContext;
use crate::error::Result;
use crate::fetch::Fetcher;
use crate::ingest::{BootstrapReport, DataSource, IngestionService};
use crate::models::{ArchiveColumn, LocalColumn, Value};
use crate::query::{Page, PageRequest, QueryEngine, SortSpec};
use crate::utils::constants::TIMESTAMP_DISPLAY_FORMAT;
use crate::utils::progress::ProgressReporter;

pub async fn run(cli: Cli) -> Result<()> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut settings);
    let context = DataContext::from_settings(&settings)?;

    match cli.command {
        Commands::Ingest { source } => {
            let progress = ProgressReporter::new(cli.quiet);
            let reports = match source {
                SourceSelection::Local => {
                    vec![bootstrap_with_progress(context.local(), &progress).await]
                }
                SourceSelection::Archive => {
                    vec![bootstrap_with_progress(context.archive(), &progress).await]
                }
                SourceSelection::All => {
                    let (local, archive) = tokio::join!(
                        bootstrap_with_progress(context.local(), &progress),
                        bootstrap_with_progress(context.archive(), &progress)
                    );
                    vec![local, archive]
                }
            };

            let mut first_error = None;
            for report in reports {
                match report {
                    Ok(report) => println!("{}", report.summary()),
                    Err(e) => {
                        error!(error = %e, "ingestion failed");
                        first_error.get_or_insert(e);
                    }
                }
            }
            if let Some(e) = first_error {
                return Err(e);
            }
        }

        Commands::Query {
            source,
            filter,
            sort,
            page,
            page_size,
            format,
            refresh,
        } => {
            let sort = match sort {
                Some(spec) => spec.parse::<SortSpec>()?,
                None => SortSpec::default(),
            };
            let request = PageRequest::new(filter)
                .with_sort(sort)
                .with_page(page, page_size);

            let page = match source {
                QuerySource::Local => query(context.local(), &request, refresh).await?,
                QuerySource::Archive => query(context.archive(), &request, refresh).await?,
            };
            print_page(&page, format)?;
        }

        Commands::Info => {
            context.load_all();
            print_info(&context)?;
        }
    }

    Ok(())
}

async fn bootstrap_with_progress<S: DataSource, F: Fetcher>(
    service: &IngestionService<S, F>,
    progress: &ProgressReporter,
) -> Result<BootstrapReport> {
    let spinner = progress.spinner(service.name());
    spinner.set_message("refreshing...");
    match service.bootstrap().await {
        Ok(report) => {
            spinner.finish_with_message(&format!("{} rows", report.rows));
            Ok(report)
        }
        Err(e) => {
            spinner.finish_with_message("failed");
            Err(e)
        }
    }
}

async fn query<S: DataSource, F: Fetcher>(
    service: &IngestionService<S, F>,
    request: &PageRequest,
    refresh: bool,
) -> Result<Page> {
    if refresh {
        service.bootstrap().await?;
    } else {
        service.load();
    }
    let snapshot = service.snapshot();
    Ok(QueryEngine::page(&snapshot, request))
}

fn print_page(page: &Page, format: OutputFormat) -> Result<()> {
    let stdout = io::stdout();

    match format {
        OutputFormat::Json => {
            let mut out = stdout.lock();
            for record in &page.records {
                serde_json::to_writer(&mut out, record)?;
                writeln!(out)?;
            }
            out.flush()?;
        }
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(stdout.lock());
            if let Some(first) = page.records.first() {
                writer.write_record(first.columns())?;
            }
            for record in &page.records {
                writer.write_record(record.values().map(|v| v.to_string()))?;
            }
            writer.flush()?;
        }
    }

    for rejected in &page.rejected {
        eprintln!("skipped filter fragment: {}", rejected);
    }
    eprintln!(
        "page {} of {} ({} matching rows)",
        page.page_index + 1,
        page.page_count().max(1),
        page.total_matches
    );
    Ok(())
}

fn print_info<F: Fetcher>(context: &DataContext<F>) -> Result<()> {
    let local = context.local();
    let local_table = local.snapshot();
    println!("{} (real-time)", local.name());
    println!("  Rows: {}", local_table.len());
    println!(
        "  First observation: {}",
        display_timestamp(local.history().min(LocalColumn::Timestamp))
    );
    println!(
        "  Last observation: {}",
        display_timestamp(local.history().max(LocalColumn::Timestamp))
    );
    println!("  Pulls stored: {}", local.history().distinct_keys());
    println!(
        "  Sites: {}",
        local_table.distinct_count(LocalColumn::Site)
    );

    let archive = context.archive();
    let archive_table = archive.snapshot();
    println!("\n{} (annual archive)", archive.name());
    println!("  Rows: {}", archive_table.len());
    match (
        archive.history().min(ArchiveColumn::YearInt),
        archive.history().max(ArchiveColumn::YearInt),
    ) {
        (Some(first), Some(last)) => println!("  Years: {} - {}", first, last),
        _ => println!("  Years: n/a"),
    }
    println!(
        "  Countries: {}",
        archive_table.distinct_count(ArchiveColumn::CountryName)
    );

    println!("\nFile Details:");
    for key in [local.history().key(), archive.history().key()] {
        if context.store().exists(key) {
            println!("{}", context.store().file_info(key)?.summary());
        } else {
            println!("{}: not stored yet", context.store().path_for(key).display());
        }
    }
    Ok(())
}

fn display_timestamp(value: Option<Value>) -> String {
    match value {
        Some(Value::Timestamp(ts)) => ts.format(TIMESTAMP_DISPLAY_FORMAT).to_string(),
        Some(other) => other.to_string(),
        None => "n/a".to_string(),
    }
}
