//! Module for errors.
use std::{error::Error, fmt::Display, path::PathBuf};

/// Error from the library interface.
#[derive(Debug)]
pub enum SeisDataErr {
    // Inherited errors from std
    /// Error forwarded from std
    IO(::std::io::Error),

    // Other forwarded errors
    /// Error forwarded from the http client
    Http(::reqwest::Error),
    /// Database error
    Database(::rusqlite::Error),
    /// Error reading a zip archive
    Zip(::zip::result::ZipError),
    /// Error reading a csv file
    Csv(::csv::Error),
    /// Error parsing a configuration file
    Config(::toml::de::Error),
    /// Error parsing a date or time
    TimeParse(::chrono::ParseError),
    /// Invalid wildcard pattern
    Pattern(::globset::Error),
    /// Error forwarded from the strum crate
    StrumError(strum::ParseError),
    /// General error with any cause information erased and replaced by a string
    GeneralError(String),

    // My own errors from this crate
    /// The database structure is wrong.
    InvalidSchema,
    /// A catalog entry could not be parsed.
    InvalidCatalogEntry(String),
    /// A CMTSOLUTION block is missing a required field.
    MissingCmtField(&'static str),
    /// Invalid calendar values.
    InvalidDate(String),
    /// Invalid or unknown network code.
    InvalidNetworkCode(String),
    /// Malformed WIN32 data.
    InvalidWin32(String),
    /// Malformed SAC file.
    InvalidSac(String),
    /// The remote service refused the credentials.
    LoginFailed,
    /// The remote service answered with something unexpected.
    RemoteService(String),
    /// Timed out waiting for the remote service to prepare data.
    RequestTimeout(String),
    /// An external program failed.
    ExternalTool(String),
    /// A required file was not found.
    MissingFile(PathBuf),
    /// Not enough data to complete the task.
    NotEnoughData,
    /// There was an internal logic error.
    LogicError(&'static str),
}

impl Display for SeisDataErr {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        use crate::errors::SeisDataErr::*;

        match self {
            IO(err) => write!(f, "std lib io error: {}", err),

            Http(err) => write!(f, "http error: {}", err),
            Database(err) => write!(f, "database error: {}", err),
            Zip(err) => write!(f, "zip archive error: {}", err),
            Csv(err) => write!(f, "csv error: {}", err),
            Config(err) => write!(f, "configuration error: {}", err),
            TimeParse(err) => write!(f, "time parse error: {}", err),
            Pattern(err) => write!(f, "pattern error: {}", err),
            StrumError(err) => write!(f, "error forwarded from strum crate: {}", err),
            GeneralError(msg) => write!(f, "general error forwarded: {}", msg),

            InvalidSchema => write!(f, "invalid index format"),
            InvalidCatalogEntry(line) => write!(f, "invalid catalog entry: {}", line),
            MissingCmtField(field) => write!(f, "CMTSOLUTION missing field: {}", field),
            InvalidDate(msg) => write!(f, "invalid date: {}", msg),
            InvalidNetworkCode(code) => write!(f, "invalid network code: {}", code),
            InvalidWin32(msg) => write!(f, "invalid WIN32 data: {}", msg),
            InvalidSac(msg) => write!(f, "invalid SAC file: {}", msg),
            LoginFailed => write!(f, "login failed, check the user name and password"),
            RemoteService(msg) => write!(f, "unexpected response from remote service: {}", msg),
            RequestTimeout(msg) => write!(f, "timed out: {}", msg),
            ExternalTool(msg) => write!(f, "external tool failed: {}", msg),
            MissingFile(path) => write!(f, "no file: {}", path.display()),
            NotEnoughData => write!(f, "not enough data to complete task"),
            LogicError(msg) => write!(f, "internal logic error: {}", msg),
        }
    }
}

impl Error for SeisDataErr {}

impl From<::std::io::Error> for SeisDataErr {
    fn from(err: ::std::io::Error) -> SeisDataErr {
        SeisDataErr::IO(err)
    }
}

impl From<::reqwest::Error> for SeisDataErr {
    fn from(err: ::reqwest::Error) -> SeisDataErr {
        SeisDataErr::Http(err)
    }
}

impl From<::rusqlite::Error> for SeisDataErr {
    fn from(err: ::rusqlite::Error) -> SeisDataErr {
        SeisDataErr::Database(err)
    }
}

impl From<::zip::result::ZipError> for SeisDataErr {
    fn from(err: ::zip::result::ZipError) -> SeisDataErr {
        SeisDataErr::Zip(err)
    }
}

impl From<::csv::Error> for SeisDataErr {
    fn from(err: ::csv::Error) -> SeisDataErr {
        SeisDataErr::Csv(err)
    }
}

impl From<::toml::de::Error> for SeisDataErr {
    fn from(err: ::toml::de::Error) -> SeisDataErr {
        SeisDataErr::Config(err)
    }
}

impl From<::chrono::ParseError> for SeisDataErr {
    fn from(err: ::chrono::ParseError) -> SeisDataErr {
        SeisDataErr::TimeParse(err)
    }
}

impl From<::globset::Error> for SeisDataErr {
    fn from(err: ::globset::Error) -> SeisDataErr {
        SeisDataErr::Pattern(err)
    }
}

impl From<strum::ParseError> for SeisDataErr {
    fn from(err: strum::ParseError) -> SeisDataErr {
        SeisDataErr::StrumError(err)
    }
}

impl From<Box<dyn Error>> for SeisDataErr {
    fn from(err: Box<dyn Error>) -> SeisDataErr {
        SeisDataErr::GeneralError(err.to_string())
    }
}
