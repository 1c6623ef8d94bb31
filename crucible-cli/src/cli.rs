//! Application definition.

use std::sync::atomic::Ordering;

use anyhow::Result;
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use fnv::FnvHashMap;

use crucible_core::config::FieldValue;
use crucible_core::{profiles, DEFAULT_PROFILE};

use crate::router::Router;
use crate::runtime::{DashboardServer, DryRunEngine, ScriptedEval, TerrainStager};

pub const VERSION: &'static str = env!("CARGO_PKG_VERSION");

pub fn app<'a, 'b>() -> App<'a, 'b> {
    App::new("crucible")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .version(VERSION)
        .about(
            "Compose experiment configurations and launch multi-agent \
             simulation training runs.",
        )
        .arg(
            Arg::with_name("verbosity")
                .long("verbosity")
                .short("v")
                .takes_value(true)
                .default_value("info")
                .value_name("verb")
                .global(true)
                .help("Set the verbosity of the log output"),
        )
        .arg(
            Arg::with_name("config")
                .long("config")
                .short("c")
                .takes_value(true)
                .value_name("profile")
                .default_value(DEFAULT_PROFILE)
                .global(true)
                .help("Select the configuration profile to compose"),
        )
        .arg(
            Arg::with_name("set")
                .long("set")
                .short("s")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                .value_name("KEY=VALUE")
                .global(true)
                .help("Override a configuration field; may be given multiple times"),
        )
        .subcommand(
            SubCommand::with_name("train")
                .display_order(10)
                .about("Start or resume a distributed training run"),
        )
        .subcommand(
            SubCommand::with_name("evaluate")
                .display_order(11)
                .about("Run a fixed-length evaluation pass and report aggregate metrics"),
        )
        .subcommand(
            SubCommand::with_name("render")
                .display_order(12)
                .about("Open a streaming session for external visualization clients"),
        )
        .subcommand(
            SubCommand::with_name("generate")
                .display_order(13)
                .about("Generate environment content for the composed configuration"),
        )
        .subcommand(
            SubCommand::with_name("visualize")
                .display_order(14)
                .about("Launch a dashboard over prior run artifacts"),
        )
}

/// Runs based on the specified subcommand.
pub fn start(matches: ArgMatches) -> Result<()> {
    let (verb, sub) = match matches.subcommand() {
        (v, Some(m)) => (v, m),
        _ => return Ok(()),
    };
    setup_log_verbosity(sub);

    let profile = sub.value_of("config").unwrap_or(DEFAULT_PROFILE);
    let overrides = parse_overrides(sub.values_of("set"))?;

    let mut router = Router::new(
        profiles::builtin(),
        Box::new(DryRunEngine::new()),
        Box::new(ScriptedEval),
        Box::new(TerrainStager),
        Box::new(DashboardServer),
    );

    // cooperative shutdown for the long-lived verbs
    let running = router.running_flag();
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl-C handler");

    router.dispatch(verb, profile, &overrides)?;
    Ok(())
}

/// Parses repeated `KEY=VALUE` override arguments into a field map.
/// Values parse into the most specific type; validity of the key against
/// the composed profile is checked at composition time.
pub fn parse_overrides(values: Option<clap::Values>) -> Result<FnvHashMap<String, FieldValue>> {
    let mut overrides = FnvHashMap::default();
    if let Some(values) = values {
        for raw in values {
            let mut parts = raw.splitn(2, '=');
            match (parts.next(), parts.next()) {
                (Some(key), Some(value)) if !key.is_empty() => {
                    overrides.insert(key.to_string(), FieldValue::from_literal(value));
                }
                _ => anyhow::bail!("override must have the form KEY=VALUE: {}", raw),
            }
        }
    }
    Ok(overrides)
}

fn setup_log_verbosity(matches: &ArgMatches) {
    use simplelog::{LevelFilter, TermLogger};
    let level_filter = match matches.value_of("verbosity") {
        Some(s) => match s {
            "0" | "none" => LevelFilter::Off,
            "1" | "err" | "error" | "min" => LevelFilter::Error,
            "2" | "warn" | "warning" => LevelFilter::Warn,
            "3" | "info" | "default" => LevelFilter::Info,
            "4" | "debug" => LevelFilter::Debug,
            "5" | "trace" | "max" | "all" => LevelFilter::Trace,
            _ => LevelFilter::Info,
        },
        _ => LevelFilter::Info,
    };
    let mut config_builder = simplelog::ConfigBuilder::new();
    let logger_conf = config_builder
        .set_time_level(LevelFilter::Error)
        .set_target_level(LevelFilter::Debug)
        .set_location_level(LevelFilter::Error)
        .set_time_format_str("%H:%M:%S%.6f")
        .build();
    TermLogger::init(level_filter, logger_conf, simplelog::TerminalMode::Mixed).ok();
}
