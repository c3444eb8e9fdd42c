//! The nobel-client executable talks to the nobel gateway. It supports the following command
//! line arguments:
//!
//! `nobel-client all [--addr URL]`
//!
//!     List every prize, one `year - category` per line.
//!
//! `nobel-client year <YEAR> [--addr URL]`
//!
//!     List the prizes awarded in YEAR.
//!
//! `nobel-client get <YEAR> <CATEGORY> [--addr URL]`
//!
//!     Print the prizes awarded in YEAR for CATEGORY, as JSON.
//!
//! `nobel-client delete <YEAR> <CATEGORY> [--addr URL]`
//!
//!     Delete a prize. Requires admin credentials.
//!
//! `nobel-client [menu] [--addr URL]`
//!
//!     Start the interactive menu.
//!
//! Credentials are given with `--user` and `--secret`. Any error, including an error status
//! returned by the gateway, is printed as `Error: <status> <body>` and results in a non-zero
//! exit code.
//!
//! `nobel-client -V`
//!
//!     Print the version.

use std::io;
use std::process::exit;

use clap::{crate_version, App, Arg, ArgMatches, SubCommand};
use nobel::{Menu, NobelClient, NobelError, Prize, Result};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

const DEFAULT_GATEWAY_URL: &str = "http://127.0.0.1:8000";

/// the request to run, parsed from the command line
#[derive(Debug)]
enum Request {
    All,
    Year { year: i32 },
    Get { year: i32, category: String },
    Delete { year: i32, category: String },
    Menu,
}

/// ['Opt'] holds parsed and validated options from the command line
#[derive(Debug)]
struct Opt {
    addr: String,
    identity: String,
    secret: String,
    req: Request,
}

#[tokio::main]
async fn main() {
    let year_arg = || {
        Arg::with_name("YEAR")
            .required(true)
            .index(1)
            .allow_hyphen_values(true)
    };
    let matches = App::new("nobel-client")
        .version(crate_version!())
        .author("strohs <strohs1@gmail.com>")
        .about("client for the nobel prize gateway")
        .subcommands(vec![
            SubCommand::with_name("all").about("List every prize"),
            SubCommand::with_name("year")
                .about("List the prizes awarded in a year")
                .arg(year_arg()),
            SubCommand::with_name("get")
                .about("Print the prizes of a year and category")
                .arg(year_arg())
                .arg(Arg::with_name("CATEGORY").required(true).index(2)),
            SubCommand::with_name("delete")
                .about("Delete a prize")
                .arg(year_arg())
                .arg(Arg::with_name("CATEGORY").required(true).index(2)),
            SubCommand::with_name("menu").about("Start the interactive menu (the default)"),
        ])
        .arg(Arg::with_name("addr")
            .global(true)
            .long("addr")
            .value_name("URL")
            .help("sets the base URL of the gateway to connect to")
            .env("NOBEL_GATEWAY_URL")
            .default_value(DEFAULT_GATEWAY_URL))
        .arg(Arg::with_name("user")
            .global(true)
            .long("user")
            .value_name("IDENTITY")
            .help("the identity to authenticate as")
            .default_value("admin"))
        .arg(Arg::with_name("secret")
            .global(true)
            .long("secret")
            .value_name("SECRET")
            .help("the secret of the identity")
            .default_value("1234"))
        .arg(Arg::with_name("log-level")
            .global(true)
            .long("log-level")
            .value_name("LEVEL")
            .help("one of trace, debug, info, warn, error")
            .env("NOBEL_LOG")
            .default_value("warn"))
        .get_matches();

    let result = match parse_options(&matches) {
        Ok(opt) => run(opt).await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        exit(1);
    }
}

/// runs the requested command against the gateway
async fn run(opt: Opt) -> Result<()> {
    let client = NobelClient::connect(&opt.addr, &opt.identity, &opt.secret)?;
    match opt.req {
        Request::All => print_list(&client.all().await?.prizes),
        Request::Year { year } => print_list(&client.by_year(year).await?),
        Request::Get { year, category } => {
            let prizes = client.by_year_and_category(year, &category).await?;
            println!("{}", serde_json::to_string_pretty(&prizes)?);
        }
        Request::Delete { year, category } => {
            let deleted = client.delete(year, &category).await?;
            println!("{}", deleted.message);
        }
        Request::Menu => {
            let stdin = io::stdin();
            Menu::new(client, stdin.lock(), io::stdout()).run().await?;
        }
    }
    Ok(())
}

/// parses the matches from the command line into an [`Opt`] struct
fn parse_options(matches: &ArgMatches) -> Result<Opt> {
    subscriber_config(global_value(matches, "log-level").unwrap_or("warn"))?;

    let req = match matches.subcommand() {
        ("all", Some(_)) => Request::All,
        ("year", Some(args)) => Request::Year {
            year: parse_year(args.value_of("YEAR").unwrap_or_default())?,
        },
        ("get", Some(args)) => Request::Get {
            year: parse_year(args.value_of("YEAR").unwrap_or_default())?,
            category: args.value_of("CATEGORY").unwrap_or_default().to_string(),
        },
        ("delete", Some(args)) => Request::Delete {
            year: parse_year(args.value_of("YEAR").unwrap_or_default())?,
            category: args.value_of("CATEGORY").unwrap_or_default().to_string(),
        },
        _ => Request::Menu,
    };

    let addr = global_value(matches, "addr").unwrap_or(DEFAULT_GATEWAY_URL);
    // fail early on a bad address, before any prompt is shown
    nobel::config::parse_url(addr)?;

    Ok(Opt {
        addr: addr.to_string(),
        identity: global_value(matches, "user").unwrap_or("admin").to_string(),
        secret: global_value(matches, "secret").unwrap_or("1234").to_string(),
        req,
    })
}

/// the value of a global option. Options may follow the subcommand, in which case the value
/// given there wins over the top level one (which may be a default or come from the environment)
fn global_value<'a>(matches: &'a ArgMatches, name: &str) -> Option<&'a str> {
    match matches.subcommand() {
        (_, Some(sub)) if sub.occurrences_of(name) > 0 => sub.value_of(name),
        _ => matches.value_of(name),
    }
}

fn parse_year(year: &str) -> Result<i32> {
    year.trim()
        .parse()
        .map_err(|_| NobelError::Parsing(format!("could not parse {} into a year", year)))
}

fn print_list(prizes: &[Prize]) {
    for prize in prizes {
        println!("{} - {}", prize.year, prize.category);
    }
}

/// configures a tracing subscriber that will log to STDERR, at most at `level`
fn subscriber_config(level: &str) -> Result<()> {
    let level: Level = level
        .parse()
        .map_err(|_| NobelError::Parsing(format!("could not parse {} into a log level", level)))?;
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| NobelError::Parsing(format!("setting the tracing subscriber failed: {}", e)))
}
