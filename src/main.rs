//! Command-line entry point for the microserve static-file server.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::SystemTime;

use clap::{CommandFactory, Parser};
use log::LevelFilter;

use microserve::server::configuration_file;
use microserve::{AccessLog, HttpServer, ServerConfig};

/// Serve static files over HTTP/1.1.
#[derive(Debug, Parser)]
#[command(name = "microserve", version, about)]
struct Cli {
    /// Log mundane inner workings as well as transfers.
    #[arg(long = "log-debug")]
    log_debug: bool,

    /// Configuration files (.json); the first readable one is used.
    #[arg(value_name = "CONFIG")]
    configs: Vec<PathBuf>,
}

fn init_logging(log_file: Option<&Path>, debug: bool) -> std::io::Result<()> {
    let level = if debug { LevelFilter::Debug } else { LevelFilter::Info };

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level).format(|buf, record| {
        writeln!(
            buf,
            "{} [{}] {}",
            record.level(),
            httpdate::fmt_http_date(SystemTime::now()),
            record.args()
        )
    });

    if let Some(path) = log_file {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.init();
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let Some(config_path) = configuration_file(&cli.configs) else {
        eprintln!("{}", Cli::command().render_usage());
        eprintln!("Pass the path of a readable .json configuration file.");
        eprintln!("Add --log-debug to log mundane inner workings as well as transfers.");
        return ExitCode::FAILURE;
    };

    let config = match ServerConfig::from_file(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(config.log_file.as_deref(), cli.log_debug) {
        eprintln!("Could not open log file: {e}");
        return ExitCode::FAILURE;
    }

    let server = match HttpServer::new(config, AccessLog::new()) {
        Ok(server) => server,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match server.start().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
