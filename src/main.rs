mod aliases;
mod categorizer;
mod cli;
mod dates;
mod db;
mod error;
mod fmt;
mod forecast;
mod importer;
mod mapper;
mod metrics;
mod models;
mod parser;
mod reports;
mod settings;
mod validator;
mod working_capital;

use clap::Parser;
use tracing_subscriber::{fmt as log_fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::{Cli, Commands};

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ledgerlens=warn")))
        .with(log_fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init {
            data_dir,
            user,
            currency,
        } => cli::init::run(data_dir, user, currency),
        Commands::Upload {
            file,
            upload_type,
            user,
            dry_run,
            json,
        } => cli::upload::run(&file, &upload_type, user, dry_run, json),
        Commands::Metrics(args) => cli::report::metrics(args),
        Commands::Summary(args) => cli::report::summary(args),
        Commands::Forecast(args) => cli::report::forecast(args),
        Commands::WorkingCapital(args) => cli::report::working_capital(args),
        Commands::Inventory(args) => cli::report::inventory(args),
        Commands::Loans(args) => cli::report::loans(args),
        Commands::Status => cli::status::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
