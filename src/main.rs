use clap::Parser;
use tess_fetch::config::Command;
use tess_fetch::domain::ports::Storage;
use tess_fetch::utils::error::{ErrorSeverity, FetchError};
use tess_fetch::utils::logger;
use tess_fetch::{CacheStatus, Cli, FetchConfig, LocalStorage, MastCatalog, TessArchive};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("🚀 Starting tess-fetch");

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };
    if cli.verbose {
        tracing::debug!("Configuration: {:?}", config);
    }

    if cli.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    match run(&cli, &config).await {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::error!(
                "❌ Download failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
            Ok(())
        }
    }
}

async fn run(cli: &Cli, config: &FetchConfig) -> Result<(), FetchError> {
    let storage = LocalStorage::from_config(config);
    storage.ensure_root()?;

    let archive: TessArchive<LocalStorage, MastCatalog> =
        TessArchive::from_config(config, storage, cli.monitor)?;

    match &cli.command {
        Command::Stars(args) => {
            let selection = args.selection();
            for acquired in archive.stars_from_sectors(&selection, false).await? {
                report(&archive, &acquired.path, acquired.table.len(), acquired.status);
            }
        }
        Command::Catalog {
            sectors,
            keep_duplicates,
        } => {
            let sectors = (!sectors.is_empty()).then_some(sectors.as_slice());
            let catalog = archive
                .stellar_catalog(sectors, !keep_duplicates, false)
                .await?;
            let path = archive.save_stellar_catalog(&catalog).await?;
            println!("✅ Stellar catalog: {} stars", catalog.len());
            println!("📁 Output saved to: {}", path);
        }
        Command::Tois { source } => {
            let source = source.unwrap_or(config.toi_source);
            let acquired = archive.tois(source, false).await?;
            report(&archive, &acquired.path, acquired.table.len(), acquired.status);
        }
        Command::CheckSectors => {
            let count = archive.check_sectors().await?;
            if count.is_current() {
                println!("✅ {} sectors configured and available", count.available);
            } else {
                println!(
                    "⚠️  {} sectors configured, {} available: set num_sectors = {}",
                    count.configured, count.available, count.available
                );
            }
        }
        Command::Ffi(args) => {
            let request = args.to_request()?;
            let files = archive.ffi_cutouts(&request, false).await?;
            println!("✅ {} cutout file(s) for {}", files.len(), request.label());
            for file in files {
                println!("📁 {}", archive.engine().storage().describe(&file));
            }
        }
    }

    archive.engine().monitor().log_final_stats();
    Ok(())
}

fn report(
    archive: &TessArchive<LocalStorage, MastCatalog>,
    path: &str,
    rows: usize,
    status: CacheStatus,
) {
    let how = match status {
        CacheStatus::Cached => "cached",
        CacheStatus::Refreshed => "updated",
        CacheStatus::Downloaded => "downloaded",
    };
    println!(
        "✅ {} rows ({}) 📁 {}",
        rows,
        how,
        archive.engine().storage().describe(path)
    );
}
