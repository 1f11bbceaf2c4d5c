use std::{
    io::Read,
    path::{Path, PathBuf},
    time::Duration as StdDuration,
};

use chrono::NaiveDateTime;
use reqwest::{blocking::Client, StatusCode};
use strum::IntoEnumIterator;

use super::{
    parse_station_text, resolve_provider, select_channels, thin_stations, ChannelInfo, FdsnEvent,
    Provider, RectangularDomain, Restrictions, StationPick,
};
use crate::errors::SeisDataErr;

const STATION_PATH: &str = "/fdsnws/station/1/query";
const DATASELECT_PATH: &str = "/fdsnws/dataselect/1/query";

type Params = Vec<(&'static str, String)>;

/// Where the downloaded files go.
#[derive(Clone, Debug)]
pub struct Storage {
    mseed_root: PathBuf,
    stationxml_root: PathBuf,
}

impl Storage {
    #[allow(missing_docs)]
    pub fn new(mseed_root: &Path, stationxml_root: &Path) -> Self {
        Storage {
            mseed_root: mseed_root.to_path_buf(),
            stationxml_root: stationxml_root.to_path_buf(),
        }
    }

    /// `<mseed_root>/<event>/<net>.<sta>.<loc>.<cha>.mseed`
    pub fn mseed_path(&self, event_fname: &str, chan: &ChannelInfo) -> PathBuf {
        self.mseed_root.join(event_fname).join(format!(
            "{}.{}.{}.{}.mseed",
            chan.network, chan.station, chan.location, chan.channel
        ))
    }

    /// `<stationxml_root>/<net>.<sta>.xml`
    pub fn stationxml_path(&self, pick: &StationPick) -> PathBuf {
        self.stationxml_root.join(format!("{}.xml", pick.id()))
    }
}

/// Counts of what happened while downloading one event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    /// Stations selected across all providers.
    pub stations: usize,
    /// Waveform files written.
    pub downloaded: usize,
    /// Waveform files already present.
    pub existing: usize,
    /// Channels the data center had no data for.
    pub no_data: usize,
    /// Requests that failed.
    pub failed: usize,
}

/// Downloads from a list of FDSN data centers, one after the other.
#[derive(Debug)]
pub struct MassDownloader {
    client: Client,
    providers: Vec<String>,
}

impl MassDownloader {
    /// Create a downloader. `providers` are data center names or base urls, when empty every known
    /// data center is used.
    pub fn new(providers: &[String], timeout_secs: u64) -> Result<Self, SeisDataErr> {
        let providers: Vec<String> = if providers.is_empty() {
            Provider::iter().map(|p| p.base_url().to_owned()).collect()
        } else {
            providers
                .iter()
                .map(|name| resolve_provider(name))
                .collect::<Result<_, _>>()?
        };

        let client = Client::builder()
            .timeout(StdDuration::from_secs(timeout_secs))
            .build()?;

        Ok(MassDownloader { client, providers })
    }

    /// The base urls in the order they are asked.
    pub fn providers(&self) -> &[String] {
        &self.providers
    }

    /// Download everything for one event. A failing provider, station or channel is logged and
    /// skipped.
    pub fn download(
        &self,
        event: &FdsnEvent,
        domain: &RectangularDomain,
        restrictions: &Restrictions,
        storage: &Storage,
    ) -> DownloadSummary {
        let mut summary = DownloadSummary::default();
        let mut taken: Vec<StationPick> = vec![];

        for base in &self.providers {
            let picks = match self.available_stations(base, domain, restrictions) {
                Ok(picks) => picks,
                Err(err) => {
                    log::warn!("provider {}: {}", base, err);
                    continue;
                }
            };

            let picks = thin_stations(
                picks,
                &taken,
                restrictions.minimum_interstation_distance_in_m,
            );
            log::info!(
                "event {}: {} new stations from {}",
                event.fname,
                picks.len(),
                base
            );

            for pick in picks {
                let have_data =
                    self.download_station(base, event, &pick, restrictions, storage, &mut summary);

                if have_data {
                    let path = storage.stationxml_path(&pick);
                    if let Err(err) = self.fetch_to_file(
                        base,
                        STATION_PATH,
                        &stationxml_params(&pick, restrictions),
                        &path,
                    ) {
                        log::warn!("station {} from {}: {}", pick.id(), base, err);
                    }
                }

                summary.stations += 1;
                taken.push(pick);
            }
        }

        summary
    }

    // Returns true when at least one waveform for the station is on disk.
    fn download_station(
        &self,
        base: &str,
        event: &FdsnEvent,
        pick: &StationPick,
        restrictions: &Restrictions,
        storage: &Storage,
        summary: &mut DownloadSummary,
    ) -> bool {
        let mut have_data = false;

        for chan in &pick.channels {
            let path = storage.mseed_path(&event.fname, chan);
            if path.exists() {
                log::debug!("{} exists, skipping", path.display());
                summary.existing += 1;
                have_data = true;
                continue;
            }

            match self.fetch_to_file(
                base,
                DATASELECT_PATH,
                &dataselect_params(chan, restrictions),
                &path,
            ) {
                Ok(true) => {
                    summary.downloaded += 1;
                    have_data = true;
                }
                Ok(false) => {
                    log::debug!("no data for {}", path.display());
                    summary.no_data += 1;
                }
                Err(err) => {
                    log::warn!("{} from {}: {}", path.display(), base, err);
                    summary.failed += 1;
                }
            }
        }

        have_data
    }

    fn available_stations(
        &self,
        base: &str,
        domain: &RectangularDomain,
        restrictions: &Restrictions,
    ) -> Result<Vec<StationPick>, SeisDataErr> {
        let text = match self.fetch(base, STATION_PATH, &station_params(domain, restrictions))? {
            Some(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            None => return Ok(vec![]),
        };

        let channels: Vec<ChannelInfo> = parse_station_text(&text)
            .into_iter()
            .filter(|chan| domain.contains(chan.latitude, chan.longitude))
            .collect();

        select_channels(&channels, restrictions)
    }

    // Save a response to `path` unless the file already exists. Returns false if there was no data.
    fn fetch_to_file(
        &self,
        base: &str,
        service: &str,
        params: &Params,
        path: &Path,
    ) -> Result<bool, SeisDataErr> {
        if path.exists() {
            return Ok(true);
        }

        match self.fetch(base, service, params)? {
            Some(bytes) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(path, bytes)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn fetch(
        &self,
        base: &str,
        service: &str,
        params: &Params,
    ) -> Result<Option<Vec<u8>>, SeisDataErr> {
        let mut response = self
            .client
            .get(&format!("{}{}", base, service))
            .query(params)
            .send()?;

        match response.status() {
            StatusCode::OK => {
                let mut buffer = vec![];
                response.read_to_end(&mut buffer)?;
                Ok(Some(buffer))
            }
            StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => Ok(None),
            code => Err(SeisDataErr::RemoteService(format!(
                "{}{} answered {}",
                base, service, code
            ))),
        }
    }
}

fn format_time(time: &NaiveDateTime) -> String {
    time.format("%Y-%m-%dT%H:%M:%S%.3f").to_string()
}

fn location_param(location: &str) -> String {
    if location.is_empty() {
        "--".to_owned()
    } else {
        location.to_owned()
    }
}

/// Query parameters for the channel listing of a domain.
pub fn station_params(domain: &RectangularDomain, restrictions: &Restrictions) -> Params {
    let mut params = vec![
        ("level", "channel".to_owned()),
        ("format", "text".to_owned()),
        ("minlatitude", domain.min_latitude.to_string()),
        ("maxlatitude", domain.max_latitude.to_string()),
        ("minlongitude", domain.min_longitude.to_string()),
        ("maxlongitude", domain.max_longitude.to_string()),
        ("starttime", format_time(&restrictions.starttime)),
        ("endtime", format_time(&restrictions.endtime)),
    ];

    let filters = [
        ("network", &restrictions.network),
        ("station", &restrictions.station),
        ("location", &restrictions.location),
        ("channel", &restrictions.channel),
    ];
    for (name, value) in filters.iter() {
        if let Some(value) = value {
            params.push((*name, value.replace(' ', "")));
        }
    }

    params
}

/// Query parameters for the waveform of one channel.
pub fn dataselect_params(chan: &ChannelInfo, restrictions: &Restrictions) -> Params {
    vec![
        ("network", chan.network.clone()),
        ("station", chan.station.clone()),
        ("location", location_param(&chan.location)),
        ("channel", chan.channel.clone()),
        ("starttime", format_time(&restrictions.starttime)),
        ("endtime", format_time(&restrictions.endtime)),
    ]
}

/// Query parameters for the response level metadata of the chosen channels at a station.
pub fn stationxml_params(pick: &StationPick, restrictions: &Restrictions) -> Params {
    let mut locations: Vec<String> = pick
        .channels
        .iter()
        .map(|chan| location_param(&chan.location))
        .collect();
    locations.dedup();

    let channels: Vec<&str> = pick.channels.iter().map(|c| c.channel.as_str()).collect();

    vec![
        ("network", pick.network.clone()),
        ("station", pick.station.clone()),
        ("location", locations.join(",")),
        ("channel", channels.join(",")),
        ("level", "response".to_owned()),
        ("starttime", format_time(&restrictions.starttime)),
        ("endtime", format_time(&restrictions.endtime)),
    ]
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
#[cfg(test)]
mod unit {
    use super::*;

    use crate::config::FdsnConfig;

    use chrono::NaiveDate;

    fn restrictions() -> Restrictions {
        let origin = NaiveDate::from_ymd_opt(2019, 7, 6)
            .unwrap()
            .and_hms_milli_opt(3, 19, 53, 40)
            .unwrap();
        Restrictions::for_origin(&origin, &FdsnConfig::default())
    }

    fn channel(loc: &str, cha: &str) -> ChannelInfo {
        ChannelInfo {
            network: "CI".to_owned(),
            station: "CLC".to_owned(),
            location: loc.to_owned(),
            channel: cha.to_owned(),
            latitude: 35.8157,
            longitude: -117.5975,
            elevation: 775.0,
            depth: 0.0,
            sample_rate: Some(40.0),
        }
    }

    fn param<'a>(params: &'a Params, name: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, val)| val.as_str())
    }

    #[test]
    fn test_storage_paths() {
        let storage = Storage::new(Path::new("miniseed"), Path::new("stations"));
        let chan = channel("", "BHZ");

        assert_eq!(
            storage.mseed_path("20190706031953040", &chan),
            PathBuf::from("miniseed/20190706031953040/CI.CLC..BHZ.mseed")
        );

        let pick = StationPick {
            network: "CI".to_owned(),
            station: "CLC".to_owned(),
            latitude: 35.8157,
            longitude: -117.5975,
            channels: vec![chan],
        };
        assert_eq!(
            storage.stationxml_path(&pick),
            PathBuf::from("stations/CI.CLC.xml")
        );
    }

    #[test]
    fn test_station_params() {
        let mut restrictions = restrictions();
        restrictions.network = Some("CI, NN".to_owned());

        let params = station_params(&RectangularDomain::default(), &restrictions);

        assert_eq!(param(&params, "level"), Some("channel"));
        assert_eq!(param(&params, "format"), Some("text"));
        assert_eq!(param(&params, "minlatitude"), Some("35.5"));
        assert_eq!(param(&params, "maxlongitude"), Some("-117.3"));
        assert_eq!(param(&params, "starttime"), Some("2019-07-06T03:18:53.040"));
        assert_eq!(param(&params, "endtime"), Some("2019-07-06T03:21:53.040"));
        assert_eq!(param(&params, "network"), Some("CI,NN"));
        assert_eq!(param(&params, "station"), None);
    }

    #[test]
    fn test_dataselect_params() {
        let params = dataselect_params(&channel("", "BHZ"), &restrictions());

        assert_eq!(param(&params, "location"), Some("--"));
        assert_eq!(param(&params, "channel"), Some("BHZ"));

        let params = dataselect_params(&channel("00", "HHZ"), &restrictions());
        assert_eq!(param(&params, "location"), Some("00"));
    }

    #[test]
    fn test_stationxml_params() {
        let pick = StationPick {
            network: "CI".to_owned(),
            station: "CLC".to_owned(),
            latitude: 35.8157,
            longitude: -117.5975,
            channels: vec![channel("", "BHE"), channel("", "BHN"), channel("", "BHZ")],
        };

        let params = stationxml_params(&pick, &restrictions());
        assert_eq!(param(&params, "location"), Some("--"));
        assert_eq!(param(&params, "channel"), Some("BHE,BHN,BHZ"));
        assert_eq!(param(&params, "level"), Some("response"));
    }

    #[test]
    fn test_default_providers() {
        let mdl = MassDownloader::new(&[], 30).unwrap();
        assert_eq!(mdl.providers().len(), Provider::iter().count());
        assert_eq!(mdl.providers()[0], "http://service.iris.edu");

        let mdl =
            MassDownloader::new(&["SCEDC".to_owned(), "http://example.org/".to_owned()], 30)
                .unwrap();
        assert_eq!(
            mdl.providers(),
            &["http://service.scedc.caltech.edu", "http://example.org"]
        );

        assert!(MassDownloader::new(&["nowhere".to_owned()], 30).is_err());
    }
}
