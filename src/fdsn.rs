//! Mass download of waveforms and station metadata from FDSN web services.
//!
//! For every event in a list, each data center is asked which channels it has inside a
//! rectangular domain. One set of channels per station is chosen by location and channel
//! priority, and the waveforms around the origin time are saved as miniSEED along with a
//! StationXML file for each station.

use std::{path::Path, str::FromStr};

use chrono::{DateTime, Duration, NaiveDateTime};
use serde::Deserialize;
use strum_macros::{AsRefStr, EnumIter, EnumString};

use crate::{config::FdsnConfig, errors::SeisDataErr};

pub use self::download::{
    dataselect_params, station_params, stationxml_params, DownloadSummary, MassDownloader, Storage,
};
pub use self::pattern::Patterns;
pub use self::station::{
    haversine_m, parse_station_text, select_channels, thin_stations, ChannelInfo, StationPick,
};

mod download;
mod pattern;
mod station;

/// Channel patterns in order of preference.
pub const DEFAULT_CHANNEL_PRIORITIES: [&str; 11] = [
    "BH[ZNE12]",
    "BL[ZNE12]",
    "HH[ZNE12]",
    "HL[ZNE12]",
    "SH[ZNE12]",
    "SL[ZNE12]",
    "EH[ZNE12]",
    "EL[ZNE12]",
    "SP[ZNE12]",
    "EP[ZNE12]",
    "DP[ZNE12]",
];

/// Location codes in order of preference.
pub const DEFAULT_LOCATION_PRIORITIES: [&str; 20] = [
    "", "00", "10", "01", "20", "02", "30", "03", "40", "04", "50", "05", "60", "06", "70", "07",
    "80", "08", "90", "09",
];

/// A latitude and longitude box.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(default)]
#[allow(missing_docs)]
pub struct RectangularDomain {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

impl Default for RectangularDomain {
    fn default() -> Self {
        RectangularDomain {
            min_latitude: 35.5,
            max_latitude: 36.0,
            min_longitude: -118.0,
            max_longitude: -117.3,
        }
    }
}

impl RectangularDomain {
    /// Is the point inside the box, edges included.
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        latitude >= self.min_latitude
            && latitude <= self.max_latitude
            && longitude >= self.min_longitude
            && longitude <= self.max_longitude
    }
}

/// What to download for one event.
#[derive(Clone, Debug, PartialEq)]
pub struct Restrictions {
    /// Start of the data window, UTC.
    pub starttime: NaiveDateTime,
    /// End of the data window, UTC.
    pub endtime: NaiveDateTime,
    /// Comma separated network patterns.
    pub network: Option<String>,
    /// Comma separated station patterns.
    pub station: Option<String>,
    /// Comma separated location patterns. When set the location priorities are not used.
    pub location: Option<String>,
    /// Comma separated channel patterns. When set the channel priorities are not used.
    pub channel: Option<String>,
    #[allow(missing_docs)]
    pub exclude_networks: Vec<String>,
    #[allow(missing_docs)]
    pub exclude_stations: Vec<String>,
    #[allow(missing_docs)]
    pub minimum_interstation_distance_in_m: f64,
    #[allow(missing_docs)]
    pub channel_priorities: Vec<String>,
    #[allow(missing_docs)]
    pub location_priorities: Vec<String>,
}

impl Restrictions {
    /// The restrictions for an event at `origin`.
    pub fn for_origin(origin: &NaiveDateTime, config: &FdsnConfig) -> Self {
        let to_duration = |secs: f64| Duration::milliseconds((secs * 1000.0).round() as i64);

        Restrictions {
            starttime: *origin - to_duration(config.before_secs),
            endtime: *origin + to_duration(config.after_secs),
            network: config.network.clone(),
            station: config.station.clone(),
            location: config.location.clone(),
            channel: config.channel.clone(),
            exclude_networks: config.exclude_networks.clone(),
            exclude_stations: config.exclude_stations.clone(),
            minimum_interstation_distance_in_m: config.minimum_interstation_distance_in_m,
            channel_priorities: config.channel_priorities.clone(),
            location_priorities: config.location_priorities.clone(),
        }
    }
}

/// Known FDSN data centers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumString, AsRefStr, EnumIter)]
#[allow(missing_docs)]
pub enum Provider {
    #[strum(serialize = "IRIS")]
    Iris,
    #[strum(serialize = "ORFEUS")]
    Orfeus,
    #[strum(serialize = "GFZ")]
    Gfz,
    #[strum(serialize = "SCEDC")]
    Scedc,
    #[strum(serialize = "NCEDC")]
    Ncedc,
    #[strum(serialize = "ETH")]
    Eth,
    #[strum(serialize = "INGV")]
    Ingv,
    #[strum(serialize = "RESIF")]
    Resif,
    #[strum(serialize = "BGR")]
    Bgr,
    #[strum(serialize = "NOA")]
    Noa,
    #[strum(serialize = "KOERI")]
    Koeri,
    #[strum(serialize = "GEONET")]
    Geonet,
}

impl Provider {
    /// Base url of the data center's web services.
    pub fn base_url(self) -> &'static str {
        use Provider::*;

        match self {
            Iris => "http://service.iris.edu",
            Orfeus => "http://www.orfeus-eu.org",
            Gfz => "http://geofon.gfz-potsdam.de",
            Scedc => "http://service.scedc.caltech.edu",
            Ncedc => "http://service.ncedc.org",
            Eth => "http://eida.ethz.ch",
            Ingv => "http://webservices.ingv.it",
            Resif => "http://ws.resif.fr",
            Bgr => "http://eida.bgr.de",
            Noa => "http://eida.gein.noa.gr",
            Koeri => "http://eida.koeri.boun.edu.tr",
            Geonet => "http://service.geonet.org.nz",
        }
    }
}

/// Turn a data center name or a base url into a base url without a trailing slash.
pub fn resolve_provider(name: &str) -> Result<String, SeisDataErr> {
    let name = name.trim();

    if name.starts_with("http://") || name.starts_with("https://") {
        return Ok(name.trim_end_matches('/').to_owned());
    }

    let provider = Provider::from_str(&name.to_uppercase())?;
    Ok(provider.base_url().to_owned())
}

/// One row of the event list.
#[derive(Clone, Debug, PartialEq)]
pub struct FdsnEvent {
    /// Origin time, UTC.
    pub origin: NaiveDateTime,
    /// Directory name for the event's waveforms.
    pub fname: String,
}

impl FdsnEvent {
    /// Parse an ISO-8601 origin time such as `2019-07-06T03:19:53.040Z`.
    pub fn parse(time: &str) -> Result<Self, SeisDataErr> {
        let time = time.trim();

        let origin = match DateTime::parse_from_rfc3339(time) {
            Ok(with_zone) => with_zone.naive_utc(),
            Err(_) => {
                NaiveDateTime::parse_from_str(time.trim_end_matches('Z'), "%Y-%m-%dT%H:%M:%S%.f")?
            }
        };

        Ok(FdsnEvent {
            origin,
            fname: event_fname(time),
        })
    }
}

/// The date digits followed by the time digits, `2019-07-06T03:19:53.040Z` gives
/// `20190706031953040`.
pub fn event_fname(time: &str) -> String {
    let mut parts = time.splitn(2, 'T');
    let date = parts.next().unwrap_or("");
    let clock = parts.next().unwrap_or("");

    date.chars()
        .filter(|&c| c != '-')
        .chain(clock.chars().filter(|&c| c != 'Z' && c != '.' && c != ':'))
        .collect()
}

/// Read an event list. The first row is a header and the first column the origin time. Rows that
/// can't be understood are reported and skipped.
pub fn read_events(path: &Path) -> Result<Vec<FdsnEvent>, SeisDataErr> {
    if !path.exists() {
        return Err(SeisDataErr::MissingFile(path.to_path_buf()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let mut events = vec![];
    for (idx, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                log::warn!("skipping row {} of {}: {}", idx + 2, path.display(), err);
                continue;
            }
        };

        match record.get(0).map(FdsnEvent::parse) {
            Some(Ok(event)) => events.push(event),
            Some(Err(err)) => {
                log::warn!("skipping row {} of {}: {}", idx + 2, path.display(), err)
            }
            None => log::warn!("skipping empty row {} of {}", idx + 2, path.display()),
        }
    }

    Ok(events)
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
