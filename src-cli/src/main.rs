mod args;
mod commands;

use std::process::ExitCode;

use docdash::logging::init_logging;
use docdash::{Config, Dashboard, DocdashError};
use log::info;

use args::{parse_args, Command, USAGE};
use commands::{CommandError, NotificationPrinter};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match parse_args(std::env::args().skip(1)) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("Error: {}\n\n{}", e, USAGE);
            return ExitCode::from(2);
        }
    };

    if cli.command == Command::Help {
        println!("{}", USAGE);
        return ExitCode::SUCCESS;
    }

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("Warning: {}", e);
    }

    info!("Starting docdash v{}", env!("CARGO_PKG_VERSION"));
    info!("Backend: {}", config.backend.base_url());

    match run(config, cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config, command: Command) -> Result<(), CommandError> {
    let dashboard = Dashboard::new(config).map_err(DocdashError::from)?;
    let printer = NotificationPrinter::spawn(dashboard.notifications().subscribe());

    let result = match command {
        Command::Upload { files } => commands::run_upload(&dashboard, &files).await,
        Command::Jobs => commands::list_jobs(&dashboard).await,
        Command::Watch => commands::watch_jobs(&dashboard).await,
        Command::Show { id } => commands::show_job(&dashboard, id).await,
        Command::Delete { id } => commands::delete_job(&dashboard, id).await,
        Command::Chat { id } => commands::run_chat(&dashboard, id).await,
        Command::Help => Ok(()),
    };

    drop(dashboard);
    printer.finish().await;
    result
}
