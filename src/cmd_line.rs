//! Command line options that are used across applications.

use std::path::{Path, PathBuf};

use clap::{crate_version, App, Arg, ArgMatches};
use log::LevelFilter;

use crate::{config::Config, errors::SeisDataErr};

/// Struct to package up command line arguments.
#[derive(Clone, Debug)]
pub struct CommonCmdLineArgs {
    // Settings loaded from the configuration file and environment.
    config: Config,
    // Path given with --config, if any.
    config_path: Option<PathBuf>,
    // How much to log.
    log_level: LevelFilter,
}

impl<'a, 'b> CommonCmdLineArgs {
    /// Create a new set of args.
    pub fn new_app(app_name: &'static str, about: &'static str) -> App<'a, 'b> {
        App::new(app_name)
            .about(about)
            .version(crate_version!())
            .arg(
                Arg::with_name("config")
                    .short("c")
                    .long("config")
                    .takes_value(true)
                    .help("Path to the configuration file.")
                    .long_help("Path to the configuration file. Defaults to '${HOME}/.seis-data.toml'"),
            )
            .arg(
                Arg::with_name("verbose")
                    .short("v")
                    .long("verbose")
                    .multiple(true)
                    .help("Print more, repeat for even more."),
            )
            .arg(
                Arg::with_name("quiet")
                    .short("q")
                    .long("quiet")
                    .conflicts_with("verbose")
                    .help("Only print errors."),
            )
            .after_help(concat!(
                "Hi-net credentials are read from the configuration file, the HINET_USER and ",
                "HINET_PASSWORD environment variables override them.\n\n",
                "RUST_LOG overrides the -v and -q options."
            ))
    }

    /// Process an `App` to get the parsed values out of it and the matches object so an application
    /// can continue with further argument parsing. This also starts the logger.
    pub fn matches(app: App<'a, 'b>) -> Result<(Self, ArgMatches<'a>), SeisDataErr> {
        let matches = app.get_matches();

        let log_level = log_level(matches.occurrences_of("verbose"), matches.is_present("quiet"));
        init_logger(log_level);

        let config_path = matches.value_of("config").map(PathBuf::from);
        let config = Config::load(config_path.as_deref())?;

        Ok((
            CommonCmdLineArgs {
                config,
                config_path,
                log_level,
            },
            matches,
        ))
    }

    /// Get the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get a mutable configuration so command line options can override it.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Get the configuration file named on the command line.
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Get the log level.
    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }
}

fn log_level(verbose: u64, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }

    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn init_logger(level: LevelFilter) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level).parse_env("RUST_LOG");

    // Only fails if a logger is already set.
    let _ = builder.try_init();
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
