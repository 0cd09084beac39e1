mod app;
mod config;

use anyhow::anyhow;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Args;

fn main() -> anyhow::Result<()> {
    // A missing .env file is not an error.
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(args.log_level.as_deref());
    let config = args.into_config()?;
    info!(api = %config.api_base, chain = %config.chain, "starting bubblemap");

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "bubblemap",
        options,
        Box::new(move |cc| Ok(Box::new(app::BubbleMapApp::new(cc, config)))),
    )
    .map_err(|error| anyhow!("viewer failed: {error}"))
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bubblemap=info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
