use std::ffi::OsString;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use clap::{App, Arg, ArgMatches};

use crate::error::ConfigError;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_DATABASE: &str = "webhooks.db";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub bind: IpAddr,
    pub port: u16,
    pub database: PathBuf,
}

impl Config {
    /// Reads the process arguments; exits with usage on `--help` or bad flags.
    pub fn from_args() -> Result<Config, ConfigError> {
        Config::from_matches(&app().get_matches())
    }

    pub fn parse_from<I, T>(args: I) -> Result<Config, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Config::from_matches(&app().get_matches_from_safe(args)?)
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    fn from_matches(matches: &ArgMatches) -> Result<Config, ConfigError> {
        let port = matches.value_of("port").unwrap_or_default();
        let port = port
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort(port.to_owned()))?;
        let bind = matches.value_of("bind").unwrap_or(DEFAULT_BIND);
        let bind = bind
            .parse::<IpAddr>()
            .map_err(|_| ConfigError::InvalidBind(bind.to_owned()))?;
        let database = matches
            .value_of_os("database")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE));
        Ok(Config {
            bind,
            port,
            database,
        })
    }
}

fn app() -> App<'static, 'static> {
    App::new("hookjar")
        .about("Records every call under /webhook into a SQLite database")
        .arg(
            Arg::with_name("port")
                .long("port")
                .short("p")
                .env("HOOKJAR_PORT")
                .takes_value(true)
                .default_value("8080"),
        )
        .arg(
            Arg::with_name("bind")
                .long("bind")
                .env("HOOKJAR_BIND")
                .takes_value(true)
                .default_value(DEFAULT_BIND),
        )
        .arg(
            Arg::with_name("database")
                .long("database")
                .short("d")
                .env("HOOKJAR_DATABASE")
                .takes_value(true)
                .default_value(DEFAULT_DATABASE),
        )
}
