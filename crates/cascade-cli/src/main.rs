use anyhow::Context;
use cascade_cli::demo::{version_feature, version_fingerprint};
use cascade_cli::{FleetConfig, SimulateOptions};
use cascade_feature::{ComparisonPolicy, Feature};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::cmp::Ordering;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn cli() -> Command {
    Command::new("cascade")
        .version(cascade_cli::VERSION)
        .about("Feature convergence engine simulator")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("json")
                .long("json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("JSON logs and JSON output"),
        )
        .subcommand(
            Command::new("simulate")
                .about("Push one repository of a TOML-described fleet through the engine")
                .arg(
                    Arg::new("fleet")
                        .long("fleet")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .help("Fleet description (TOML)"),
                )
                .arg(
                    Arg::new("auto-approve")
                        .long("auto-approve")
                        .action(ArgAction::SetTrue)
                        .help("Approve the proposal, set the new ideal and fan out"),
                )
                .arg(
                    Arg::new("converge")
                        .long("converge")
                        .requires("auto-approve")
                        .action(ArgAction::SetTrue)
                        .help("Accept every fan-out invitation"),
                ),
        )
        .subcommand(
            Command::new("compare")
                .about("Compare two versions under the quality policy")
                .arg(Arg::new("a").required(true).help("Left version"))
                .arg(Arg::new("b").required(true).help("Right version")),
        )
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn simulate(args: &ArgMatches, json: bool) -> anyhow::Result<()> {
    let path = args
        .get_one::<PathBuf>("fleet")
        .context("--fleet is required")?;
    let config = FleetConfig::from_file(path)?;
    let options = SimulateOptions {
        auto_approve: args.get_flag("auto-approve"),
        converge: args.get_flag("converge"),
    };
    let report = cascade_cli::run(&config, options).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.render_text());
    }
    Ok(())
}

fn compare(args: &ArgMatches) -> anyhow::Result<()> {
    let a = args.get_one::<String>("a").context("missing left version")?;
    let b = args.get_one::<String>("b").context("missing right version")?;
    let feature = version_feature("version")?;
    let ordering = feature.compare(
        &version_fingerprint("version", a),
        &version_fingerprint("version", b),
        ComparisonPolicy::Quality,
    )?;
    let symbol = match ordering {
        Ordering::Less => "<",
        Ordering::Equal => "=",
        Ordering::Greater => ">",
    };
    println!("{a} {symbol} {b}");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    let json = matches.get_flag("json");
    init_tracing(json);

    match matches.subcommand() {
        Some(("simulate", args)) => simulate(args, json).await,
        Some(("compare", args)) => compare(args),
        _ => unreachable!("subcommand is required"),
    }
}
