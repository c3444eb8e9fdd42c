//! this binary starts the nobel backend, the service that owns the prize collection
//! to see the list of options, type: `nobel-backend --help`
//!
//! If the data file does not exist yet, the public Nobel Prize dataset is downloaded into it
//! before the server starts listening.

use clap::{crate_version, App, Arg};
use nobel::config::{credentials, BackendConfig, DEFAULT_BACKEND_ADDRESS, DEFAULT_DATA_FILE};
use nobel::dataset::{ensure_dataset, DEFAULT_DATASET_URL};
use nobel::{BackendServer, JsonPrizeStore, NobelError, Result};
use std::process::exit;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() {
    let matches = App::new("nobel-backend")
        .version(crate_version!())
        .author("strohs <strohs1@gmail.com>")
        .about("serves and edits a collection of Nobel Prize records")
        .arg(Arg::with_name("addr")
            .long("addr")
            .value_name("IP_ADDR:PORT")
            .help("sets the IP_ADDR:PORT that the backend listens on")
            .env("NOBEL_BACKEND_ADDR")
            .default_value(DEFAULT_BACKEND_ADDRESS))
        .arg(Arg::with_name("data-file")
            .long("data-file")
            .value_name("PATH")
            .help("the JSON file holding the prize collection")
            .env("NOBEL_DATA_FILE")
            .default_value(DEFAULT_DATA_FILE))
        .arg(Arg::with_name("dataset-url")
            .long("dataset-url")
            .value_name("URL")
            .help("where the collection is downloaded from when the data file does not exist")
            .env("NOBEL_DATASET_URL")
            .default_value(DEFAULT_DATASET_URL))
        .arg(Arg::with_name("user")
            .long("user")
            .value_name("IDENTITY:SECRET:ROLE")
            .help("a caller allowed to use the backend, may be repeated")
            .multiple(true)
            .number_of_values(1))
        .arg(Arg::with_name("log-level")
            .long("log-level")
            .value_name("LEVEL")
            .help("one of trace, debug, info, warn, error")
            .env("NOBEL_LOG")
            .default_value("info"))
        .get_matches();

    // set up a tracing subscriber to log to STDERR
    if let Err(e) = subscriber_config(matches.value_of("log-level").unwrap_or("info")) {
        eprintln!("{}", e);
        exit(1);
    }

    // validate command line options
    let users: Vec<&str> = matches.values_of("user").map(|v| v.collect()).unwrap_or_default();
    let config = match BackendConfig::build(
        matches.value_of("addr").unwrap_or(DEFAULT_BACKEND_ADDRESS),
        matches.value_of("data-file").unwrap_or(DEFAULT_DATA_FILE),
        matches.value_of("dataset-url").unwrap_or(DEFAULT_DATASET_URL),
        &users,
    ) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}", err);
            exit(1);
        }
    };

    // start the server
    if let Err(e) = run(config).await {
        eprintln!("{}", e);
        exit(1);
    }
}

async fn run(config: BackendConfig) -> Result<()> {
    info!("nobel-backend {}", env!("CARGO_PKG_VERSION"));
    info!("Data file: {}", config.data_file.display());

    if ensure_dataset(&config.data_file, &config.dataset_url).await? {
        info!("downloaded the initial dataset from {}", config.dataset_url);
    }
    let store = JsonPrizeStore::open(&config.data_file)?;

    let server = BackendServer::new(store, credentials(&config.users));
    server.run(config.addr).await
}

/// configures a tracing subscriber that will log to STDERR, at most at `level`
fn subscriber_config(level: &str) -> Result<()> {
    let level: Level = level
        .parse()
        .map_err(|_| NobelError::Parsing(format!("could not parse {} into a log level", level)))?;
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        // log to stderr instead of stdout
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| NobelError::Parsing(format!("setting the tracing subscriber failed: {}", e)))
}
