use psql_session::config::{self, Config};
use psql_session::{PsqlSessionError, QuerySession, Result};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: psql-session [--config FILE] [--json] <query> [database...]";

/// Parsed command line.
#[derive(Debug, Default, PartialEq)]
struct Args {
    help: bool,
    config: Option<PathBuf>,
    json: bool,
    query: String,
    databases: Vec<String>,
}

fn parse_args(args: &[String]) -> std::result::Result<Args, String> {
    let mut parsed = Args::default();
    let mut positional = Vec::new();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let path = iter.next().ok_or("--config needs a file argument")?;
                parsed.config = Some(PathBuf::from(path));
            }
            "--json" => parsed.json = true,
            "-h" | "--help" => {
                parsed.help = true;
                return Ok(parsed);
            }
            _ => positional.push(arg.clone()),
        }
    }

    let mut positional = positional.into_iter();
    parsed.query = positional.next().ok_or_else(|| USAGE.to_string())?;
    parsed.databases = positional.collect();
    Ok(parsed)
}

fn load(args: &Args) -> Result<Config> {
    match &args.config {
        Some(path) => config::load_config(path),
        None => match config::default_config_path().filter(|p| p.exists()) {
            Some(path) => config::load_config(path),
            None => Ok(Config::default()),
        },
    }
}

fn run(args: &Args) -> Result<()> {
    let mut config = load(args)?;
    config.connection.apply_env()?;

    let params = config.connection.to_params()?;
    let classifier = config.classifier.build()?;
    let session = QuerySession::connect_with(params, psql_session::ShellRunner::new(), classifier)?;

    let databases: &[String] = if args.databases.is_empty() {
        &config.connection.databases
    } else {
        &args.databases
    };

    let result = session.query(&args.query, databases)?;
    info!("{}", result);

    if args.json {
        let json = serde_json::to_string(&result.lines())
            .map_err(|e| PsqlSessionError::Config(format!("cannot encode result: {e}")))?;
        println!("{json}");
    } else {
        for line in result.lines() {
            println!("{line}");
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    // Logs go to stderr so query output stays clean on stdout
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let raw: Vec<String> = std::env::args().skip(1).collect();
    let args = match parse_args(&raw) {
        Ok(args) if args.help => {
            println!("{USAGE}");
            return ExitCode::SUCCESS;
        }
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::from(2);
        }
    };

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(category = e.category(), "query failed");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
