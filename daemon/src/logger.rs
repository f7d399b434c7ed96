use std::{
    fmt::{self, Display, Formatter},
    fs,
    path::Path,
};

use anyhow::Result;
use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Off => "off",
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        };
        write!(f, "{}", s)
    }
}

pub fn default_logs_datetime_format() -> String {
    "[%Y-%m-%d] (%H:%M:%S%.3f)".to_owned()
}

pub struct LoggerConfig<'a> {
    pub level: LogLevel,
    pub dir_path: &'a str,
    pub filename_log: &'a str,
    pub disable_file_logging: bool,
    pub disable_colors: bool,
    pub datetime_format: String,
}

/// Install the global logger: colored terminal output plus, unless
/// disabled, a file per day under `dir_path`.
pub fn init_logger(config: LoggerConfig<'_>) -> Result<()> {
    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Cyan)
        .trace(Color::Magenta);

    let disable_colors = config.disable_colors;
    let format = config.datetime_format.clone();
    let terminal = fern::Dispatch::new()
        .format(move |out, message, record| {
            let level = if disable_colors {
                record.level().to_string()
            } else {
                colors.color(record.level()).to_string()
            };
            out.finish(format_args!(
                "{} {} [{}] {}",
                chrono::Local::now().format(&format),
                level,
                record.target(),
                message
            ))
        })
        .chain(std::io::stdout());

    let mut dispatch = fern::Dispatch::new()
        .level(config.level.into())
        .chain(terminal);

    if !config.disable_file_logging {
        fs::create_dir_all(config.dir_path)?;
        let prefix = Path::new(config.dir_path).join("");
        let format = config.datetime_format;
        let file = fern::Dispatch::new()
            .format(move |out, message, record| {
                out.finish(format_args!(
                    "{} {} [{}] {}",
                    chrono::Local::now().format(&format),
                    record.level(),
                    record.target(),
                    message
                ))
            })
            .chain(fern::DateBased::new(
                prefix,
                format!("%Y-%m-%d.{}", config.filename_log),
            ));
        dispatch = dispatch.chain(file);
    }

    dispatch.apply()?;
    Ok(())
}
