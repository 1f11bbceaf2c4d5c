//! Choosing which channels to download from a station service channel listing.

use std::collections::BTreeMap;

use super::{Patterns, Restrictions};
use crate::errors::SeisDataErr;

const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// One line of a channel level text response.
#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub struct ChannelInfo {
    pub network: String,
    pub station: String,
    /// Empty for the blank location code.
    pub location: String,
    pub channel: String,
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: f64,
    pub depth: f64,
    pub sample_rate: Option<f64>,
}

/// Parse the `format=text` response of a channel level station query.
///
/// Lines are `Network|Station|Location|Channel|Latitude|Longitude|Elevation|Depth|...`, lines
/// starting with `#` are headers.
pub fn parse_station_text(text: &str) -> Vec<ChannelInfo> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let parsed = parse_channel_line(line);
            if parsed.is_none() {
                log::warn!("skipping channel line: {}", line);
            }
            parsed
        })
        .collect()
}

fn parse_channel_line(line: &str) -> Option<ChannelInfo> {
    let cols: Vec<&str> = line.split('|').map(str::trim).collect();
    if cols.len() < 8 {
        return None;
    }

    let location = match cols[2] {
        "--" => "",
        loc => loc,
    };

    Some(ChannelInfo {
        network: cols[0].to_owned(),
        station: cols[1].to_owned(),
        location: location.to_owned(),
        channel: cols[3].to_owned(),
        latitude: cols[4].parse().ok()?,
        longitude: cols[5].parse().ok()?,
        elevation: cols[6].parse().unwrap_or(0.0),
        depth: cols[7].parse().unwrap_or(0.0),
        sample_rate: cols.get(14).and_then(|rate| rate.parse().ok()),
    })
}

/// The channels chosen at one station.
#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub struct StationPick {
    pub network: String,
    pub station: String,
    pub latitude: f64,
    pub longitude: f64,
    pub channels: Vec<ChannelInfo>,
}

impl StationPick {
    /// `NET.STA`
    pub fn id(&self) -> String {
        format!("{}.{}", self.network, self.station)
    }

    /// Great circle distance to another station in meters.
    pub fn distance_m(&self, other: &StationPick) -> f64 {
        haversine_m(self.latitude, self.longitude, other.latitude, other.longitude)
    }
}

/// Great circle distance in meters on a spherical earth.
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().min(1.0).asin()
}

/// Choose the channels to download at every station in a listing.
///
/// Unless the restrictions name locations, only the highest priority location with a usable
/// channel is kept. Unless they name channels, only the channels matching the highest priority
/// pattern at that location are kept. Stations with nothing left are dropped.
pub fn select_channels(
    channels: &[ChannelInfo],
    restrictions: &Restrictions,
) -> Result<Vec<StationPick>, SeisDataErr> {
    let filter = ChannelFilter::new(restrictions)?;

    let mut stations: BTreeMap<(String, String), Vec<&ChannelInfo>> = BTreeMap::new();
    for chan in channels.iter().filter(|chan| filter.allowed(chan)) {
        stations
            .entry((chan.network.clone(), chan.station.clone()))
            .or_insert_with(Vec::new)
            .push(chan);
    }

    let picks = stations
        .into_iter()
        .filter_map(|((network, station), chans)| {
            let chosen = filter.choose_at_station(&chans, restrictions);
            let first = chosen.first()?;

            Some(StationPick {
                network,
                station,
                latitude: first.latitude,
                longitude: first.longitude,
                channels: chosen.into_iter().cloned().collect(),
            })
        })
        .collect();

    Ok(picks)
}

// The restrictions with every pattern compiled.
struct ChannelFilter {
    network: Option<Patterns>,
    station: Option<Patterns>,
    location: Option<Patterns>,
    channel: Option<Patterns>,
    exclude_networks: Patterns,
    exclude_stations: Patterns,
    channel_priorities: Patterns,
}

impl ChannelFilter {
    fn new(restrictions: &Restrictions) -> Result<Self, SeisDataErr> {
        let list = |filter: &Option<String>| -> Result<Option<Patterns>, SeisDataErr> {
            filter.as_deref().map(Patterns::from_list).transpose()
        };

        Ok(ChannelFilter {
            network: list(&restrictions.network)?,
            station: list(&restrictions.station)?,
            location: list(&restrictions.location)?,
            channel: list(&restrictions.channel)?,
            exclude_networks: Patterns::new(&restrictions.exclude_networks)?,
            exclude_stations: Patterns::new(&restrictions.exclude_stations)?,
            channel_priorities: Patterns::new(&restrictions.channel_priorities)?,
        })
    }

    fn allowed(&self, chan: &ChannelInfo) -> bool {
        let id = format!("{}.{}", chan.network, chan.station);

        let pass = |filter: &Option<Patterns>, value: &str| {
            filter
                .as_ref()
                .map(|pats| pats.is_match(value))
                .unwrap_or(true)
        };

        pass(&self.network, &chan.network)
            && pass(&self.station, &chan.station)
            && pass(&self.location, &chan.location)
            && pass(&self.channel, &chan.channel)
            && !self.exclude_networks.is_match(&chan.network)
            && !self.exclude_stations.is_match(&id)
            && !self.exclude_stations.is_match(&chan.station)
    }

    fn choose_at_station<'a>(
        &self,
        chans: &[&'a ChannelInfo],
        restrictions: &Restrictions,
    ) -> Vec<&'a ChannelInfo> {
        let usable = |chan: &ChannelInfo| {
            self.channel.is_some() || self.channel_priorities.is_match(&chan.channel)
        };

        let at_location: Vec<&ChannelInfo> = if self.location.is_some() {
            chans.to_vec()
        } else {
            restrictions
                .location_priorities
                .iter()
                .map(|loc| -> Vec<&ChannelInfo> {
                    chans
                        .iter()
                        .copied()
                        .filter(|chan| &chan.location == loc && usable(chan))
                        .collect()
                })
                .find(|found| !found.is_empty())
                .unwrap_or_default()
        };

        if self.channel.is_some() {
            return at_location;
        }

        (0..self.channel_priorities.len())
            .map(|idx| -> Vec<&ChannelInfo> {
                at_location
                    .iter()
                    .copied()
                    .filter(|chan| self.channel_priorities.matches_at(idx, &chan.channel))
                    .collect()
            })
            .find(|found| !found.is_empty())
            .unwrap_or_default()
    }
}

/// Drop stations already taken and stations too close to one already taken or kept.
///
/// Candidates are considered in order, so earlier stations win.
pub fn thin_stations(
    candidates: Vec<StationPick>,
    taken: &[StationPick],
    min_distance_m: f64,
) -> Vec<StationPick> {
    let mut kept: Vec<StationPick> = vec![];

    for pick in candidates {
        let id = pick.id();
        let clashes = |other: &StationPick| {
            other.id() == id || (min_distance_m > 0.0 && pick.distance_m(other) < min_distance_m)
        };

        if taken.iter().any(clashes) || kept.iter().any(clashes) {
            log::debug!("dropping {}, already covered", id);
            continue;
        }

        kept.push(pick);
    }

    kept
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
