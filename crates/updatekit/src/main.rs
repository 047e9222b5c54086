mod commands;
mod error;
mod logging;
mod settings;
mod settings_io;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::settings::AppSettings;

/// Check for and launch updates of a network-deployed application
#[derive(Parser)]
#[command(name = "updatekit")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Print debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the deployment variables of this process
    Info,

    /// Check the update location once
    Check,

    /// Poll the update location until an update is found
    Watch {
        /// Seconds between checks (default: from settings)
        #[arg(long)]
        interval: Option<u64>,

        /// Launch the update as soon as it is found
        #[arg(long)]
        apply: bool,
    },

    /// Check once and launch the update if one is available
    Update,

    /// Print the version recorded in a manifest file
    Manifest {
        /// Path to the deployment manifest
        path: PathBuf,
    },

    /// Export or import settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Write the current settings to a JSON file
    Export { path: PathBuf },
    /// Replace the current settings with a JSON file
    Import { path: PathBuf },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let settings = AppSettings::load();
    logging::init_logging(
        cli.debug || settings.debug_logging,
        settings.max_log_size_bytes,
    );

    let result = match cli.command {
        Commands::Info => commands::info(&settings),
        Commands::Check => commands::check(&settings),
        Commands::Watch { interval, apply } => commands::watch(&settings, interval, apply),
        Commands::Update => commands::update(&settings),
        Commands::Manifest { path } => commands::manifest(&path),
        Commands::Settings { action } => match action {
            SettingsAction::Export { path } => settings_io::export_settings(&settings, &path)
                .map(|()| println!("Settings exported to {}", path.display())),
            SettingsAction::Import { path } => settings_io::import_settings(&path)
                .map(|_| println!("Settings imported from {}", path.display())),
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            log::error!("{error}");
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}
