//! this binary starts the nobel gateway, the client facing service in front of the backend
//! to see the list of options, type: `nobel-gateway --help`

use clap::{crate_version, App, Arg};
use nobel::config::{
    credentials, GatewayConfig, DEFAULT_GATEWAY_ADDRESS, DEFAULT_GATEWAY_IDENTITY,
    DEFAULT_GATEWAY_SECRET,
};
use nobel::{GatewayServer, NobelError, Result};
use std::process::exit;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8001";

#[tokio::main]
async fn main() {
    let matches = App::new("nobel-gateway")
        .version(crate_version!())
        .author("strohs <strohs1@gmail.com>")
        .about("rate limiting, authenticating gateway for the nobel backend")
        .arg(Arg::with_name("addr")
            .long("addr")
            .value_name("IP_ADDR:PORT")
            .help("sets the IP_ADDR:PORT that the gateway listens on")
            .env("NOBEL_GATEWAY_ADDR")
            .default_value(DEFAULT_GATEWAY_ADDRESS))
        .arg(Arg::with_name("backend")
            .long("backend")
            .value_name("URL")
            .help("base URL of the backend")
            .env("NOBEL_BACKEND_URL")
            .default_value(DEFAULT_BACKEND_URL))
        .arg(Arg::with_name("backend-user")
            .long("backend-user")
            .value_name("IDENTITY")
            .help("identity the gateway uses when calling the backend")
            .env("NOBEL_BACKEND_USER")
            .default_value(DEFAULT_GATEWAY_IDENTITY))
        .arg(Arg::with_name("backend-secret")
            .long("backend-secret")
            .value_name("SECRET")
            .help("secret the gateway uses when calling the backend")
            .env("NOBEL_BACKEND_SECRET")
            .default_value(DEFAULT_GATEWAY_SECRET))
        .arg(Arg::with_name("rate-limit")
            .long("rate-limit")
            .value_name("REQUESTS")
            .help("requests accepted from one client within the rate window")
            .default_value("5"))
        .arg(Arg::with_name("rate-window-ms")
            .long("rate-window-ms")
            .value_name("MILLIS")
            .help("length of the sliding rate window, in milliseconds")
            .default_value("1000"))
        .arg(Arg::with_name("user")
            .long("user")
            .value_name("IDENTITY:SECRET:ROLE")
            .help("a caller allowed to use the gateway, may be repeated. ROLE is reader or admin")
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

    let users: Vec<&str> = matches.values_of("user").map(|v| v.collect()).unwrap_or_default();
    let config = match GatewayConfig::build(
        matches.value_of("addr").unwrap_or(DEFAULT_GATEWAY_ADDRESS),
        matches.value_of("backend").unwrap_or(DEFAULT_BACKEND_URL),
        matches.value_of("backend-user").unwrap_or(DEFAULT_GATEWAY_IDENTITY),
        matches.value_of("backend-secret").unwrap_or(DEFAULT_GATEWAY_SECRET),
        matches.value_of("rate-limit").unwrap_or("5"),
        matches.value_of("rate-window-ms").unwrap_or("1000"),
        &users,
    ) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}", err);
            exit(1);
        }
    };

    if let Err(e) = run(config).await {
        eprintln!("{}", e);
        exit(1);
    }
}

async fn run(config: GatewayConfig) -> Result<()> {
    info!("nobel-gateway {}", env!("CARGO_PKG_VERSION"));
    info!(
        "rate limit: {} requests per {:?}",
        config.rate_limit.max_requests, config.rate_limit.window
    );

    let server = GatewayServer::new(&config, credentials(&config.users))?;
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
