mod bootstrap;

use anyhow::{Context, Result};
use logs_core::settings::Settings;
use logs_data::analysis::run_reports;
use logs_data::Loader;
use logs_report::{render_bundle, OutputFormat};

fn main() -> Result<()> {
    let settings = Settings::load();
    bootstrap::setup_logging(&settings.log_level)?;

    tracing::info!("curriculum-logs v{} starting", env!("CARGO_PKG_VERSION"));

    let output = run(&settings)?;
    println!("{}", output);
    Ok(())
}

/// Load the log table, run the selected reports and render them.
fn run(settings: &Settings) -> Result<String> {
    let credentials = settings.resolve_credentials()?;
    if let Some(creds) = &credentials {
        tracing::debug!("Using database {}", creds.redacted_url());
    }

    let loader = Loader::new(credentials, &settings.cache_file);
    let raw = if settings.refresh {
        tracing::info!("Refreshing {} from the database", loader.cache_path().display());
        loader.refresh()
    } else {
        loader.acquire()
    }
    .with_context(|| format!("loading logs via {}", loader.cache_path().display()))?;

    tracing::info!("Loaded {} raw log rows", raw.len());

    let reports = settings.selected_reports();
    let bundle = run_reports(&raw, &reports)?;
    tracing::info!(
        "Reports ready in {:.3}s (wrangle {:.3}s)",
        bundle.metadata.wrangle_time_seconds + bundle.metadata.aggregate_time_seconds,
        bundle.metadata.wrangle_time_seconds
    );

    let format = OutputFormat::parse(&settings.format)?;
    Ok(render_bundle(&bundle, format, settings.limit)?)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
