//! Settings loaded from an optional TOML file.
//!
//! Every value has a default, so a missing file or a missing section is fine. The Hi-net
//! credentials can also come from the `HINET_USER` and `HINET_PASSWORD` environment variables,
//! which take precedence over the file.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{errors::SeisDataErr, fdsn::RectangularDomain};

/// Default location of the configuration file.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".seis-data.toml"))
}

/// All settings.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Settings for the Hi-net download.
    pub hinet: HinetConfig,
    /// Settings for the FDSN mass download.
    pub fdsn: FdsnConfig,
    /// Settings for the time revision.
    pub sac: SacConfig,
}

impl Config {
    /// Load from `path`, or the default path if `None`. A missing default file gives the
    /// defaults, a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, SeisDataErr> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(ref path) if path.exists() => Self::from_file(path)?,
                _ => Config::default(),
            },
        };

        config.hinet.apply_env();

        Ok(config)
    }

    /// Parse a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, SeisDataErr> {
        if !path.exists() {
            return Err(SeisDataErr::MissingFile(path.to_path_buf()));
        }

        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Parse configuration text.
    pub fn from_toml(text: &str) -> Result<Self, SeisDataErr> {
        Ok(toml::from_str(text)?)
    }
}

/// Settings for downloading from Hi-net.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct HinetConfig {
    #[allow(missing_docs)]
    pub user: String,
    #[allow(missing_docs)]
    pub password: String,
    /// Minutes of data before the origin time.
    pub before_minutes: f64,
    /// Minutes of data to download.
    pub duration_minutes: u32,
    /// Events must be strictly larger than this magnitude.
    pub min_magnitude: f64,
    /// Events must be strictly smaller than this magnitude.
    pub max_magnitude: f64,
    /// Skip catalog entries that start before this line (zero based).
    pub start_line: usize,
    /// Hours added to UTC to get the time zone of the service.
    pub timezone_offset_hours: i32,
    /// Seconds to pause after a failed download.
    pub error_pause_secs: u64,
    /// Seconds between checks of the request status page.
    pub poll_interval_secs: u64,
    /// Give up waiting for a request after this many seconds.
    pub request_timeout_secs: u64,
}

impl Default for HinetConfig {
    fn default() -> Self {
        HinetConfig {
            user: String::new(),
            password: String::new(),
            before_minutes: 2.5,
            duration_minutes: 8,
            min_magnitude: 0.0,
            max_magnitude: 10.0,
            start_line: 0,
            timezone_offset_hours: 9,
            error_pause_secs: 5,
            poll_interval_secs: 2,
            request_timeout_secs: 300,
        }
    }
}

impl HinetConfig {
    fn apply_env(&mut self) {
        if let Ok(user) = std::env::var("HINET_USER") {
            self.user = user;
        }
        if let Ok(password) = std::env::var("HINET_PASSWORD") {
            self.password = password;
        }
    }

    /// Check that a magnitude is inside the open interval allowed.
    pub fn magnitude_in_range(&self, mag: f64) -> bool {
        mag > self.min_magnitude && mag < self.max_magnitude
    }
}

/// Settings for the FDSN mass download.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct FdsnConfig {
    /// Geographic domain.
    pub domain: RectangularDomain,
    /// Seconds of data before the origin time.
    pub before_secs: f64,
    /// Seconds of data after the origin time.
    pub after_secs: f64,
    /// Data center names or base URLs, empty means all known data centers.
    pub providers: Vec<String>,
    /// Shell style patterns of channels in order of preference.
    pub channel_priorities: Vec<String>,
    /// Location codes in order of preference.
    pub location_priorities: Vec<String>,
    /// Restrict to these network codes (comma separated patterns).
    pub network: Option<String>,
    /// Restrict to these station codes (comma separated patterns).
    pub station: Option<String>,
    /// Restrict to these location codes. Replaces the location priorities.
    pub location: Option<String>,
    /// Restrict to these channel codes. Replaces the channel priorities.
    pub channel: Option<String>,
    /// Networks never downloaded.
    pub exclude_networks: Vec<String>,
    /// Stations never downloaded, as `NET.STA` or `STA` patterns.
    pub exclude_stations: Vec<String>,
    /// Minimum distance between selected stations in meters.
    pub minimum_interstation_distance_in_m: f64,
    /// Directory for the waveforms.
    pub mseed_root: PathBuf,
    /// Directory for the station metadata.
    pub stationxml_root: PathBuf,
    /// HTTP timeout for each request in seconds.
    pub timeout_secs: u64,
}

impl Default for FdsnConfig {
    fn default() -> Self {
        FdsnConfig {
            domain: RectangularDomain::default(),
            before_secs: 60.0,
            after_secs: 120.0,
            providers: vec![],
            channel_priorities: crate::fdsn::DEFAULT_CHANNEL_PRIORITIES
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
            location_priorities: crate::fdsn::DEFAULT_LOCATION_PRIORITIES
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
            network: None,
            station: None,
            location: None,
            channel: None,
            exclude_networks: vec![],
            exclude_stations: vec![],
            minimum_interstation_distance_in_m: 0.0,
            mseed_root: PathBuf::from("miniseed"),
            stationxml_root: PathBuf::from("stations"),
            timeout_secs: 120,
        }
    }
}

/// Settings for revising SAC reference times.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct SacConfig {
    /// Hours the recorded reference times are ahead of UTC.
    pub timezone_offset_hours: i32,
    /// Path to an external `sac` program. When set the headers are changed by running it.
    pub sac_bin: Option<PathBuf>,
}

impl Default for SacConfig {
    fn default() -> Self {
        SacConfig {
            timezone_offset_hours: 9,
            sac_bin: None,
        }
    }
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
#[cfg(test)]
mod unit {
    use super::*;

    #[test]
    fn test_empty_config_is_default() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.hinet.duration_minutes, 8);
        assert_eq!(config.fdsn.channel_priorities.len(), 11);
        assert_eq!(config.fdsn.location_priorities[0], "");
    }

    #[test]
    fn test_partial_config() {
        let config = Config::from_toml(
            r#"
            [hinet]
            user = "someone"
            duration_minutes = 20
            min_magnitude = 5.5

            [fdsn]
            providers = ["IRIS", "http://example.org"]
            channel = "HH?,BH?"
            domain = { min_latitude = 30.0, max_latitude = 40.0, min_longitude = 130.0, max_longitude = 145.0 }

            [sac]
            sac_bin = "/usr/local/sac/bin/sac"
            "#,
        )
        .unwrap();

        assert_eq!(config.hinet.user, "someone");
        assert_eq!(config.hinet.duration_minutes, 20);
        assert_eq!(config.hinet.before_minutes, 2.5);
        assert!(config.hinet.magnitude_in_range(6.0));
        assert!(!config.hinet.magnitude_in_range(5.5));

        assert_eq!(config.fdsn.providers.len(), 2);
        assert_eq!(config.fdsn.domain.max_longitude, 145.0);
        assert_eq!(config.fdsn.before_secs, 60.0);
        assert_eq!(config.fdsn.channel.as_deref(), Some("HH?,BH?"));
        assert_eq!(config.fdsn.location, None);

        assert_eq!(config.sac.timezone_offset_hours, 9);
        assert!(config.sac.sac_bin.is_some());
    }

    #[test]
    fn test_bad_config() {
        assert!(Config::from_toml("[hinet]\nduration_minutes = \"long\"").is_err());
        assert!(Config::from_file(Path::new("no_such_config.toml")).is_err());
    }
}
