use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod controller;
mod display;
mod domain;
mod export;
mod inputter;
mod loader;
mod model;
mod schema;
mod ui;

use controller::Controller;
use domain::{ViewerConfig, ViewerError};
use model::{Model, Status};
use ui::TableUI;

/// A tui based viewer for Instagram comment exports.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Spreadsheet to open at startup (xlsx, csv, parquet or arrow)
    file: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing();

    match run(args) {
        Err(e) => {
            ratatui::restore();
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => {
            ratatui::restore();
            ExitCode::SUCCESS
        }
    }
}

// Logs go to a file when RUST_LOG is set; the terminal belongs to the UI.
fn init_tracing() {
    if std::env::var("RUST_LOG").is_err() {
        return;
    }
    let Ok(file) = std::fs::File::create("igview.log") else {
        return;
    };
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Arc::new(file))
                .with_ansi(false),
        )
        .with(ErrorLayer::default())
        .init();
}

fn run(args: Args) -> Result<(), ViewerError> {
    let cfg = ViewerConfig::default();
    let mut terminal = ratatui::init();
    let size = terminal.size()?;

    let mut model = Model::init(&cfg, size.width as usize, size.height as usize);
    if let Some(path) = args.file {
        model.open_file(path);
    }

    let ui = TableUI::new(&cfg);
    let controller = Controller::new(&cfg);

    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui.draw(model.get_uidata(), f))?;

        // Handle events and map to a Message
        if let Some(message) = controller.handle_event(&model)? {
            model.update(message)?;
        }
    }

    Ok(())
}
