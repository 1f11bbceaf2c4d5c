//! The STATIONS table built from the headers of converted SAC files.

use std::{
    collections::HashSet,
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

use super::{CharField, FloatField, SacFile};
use crate::errors::SeisDataErr;

/// One line of a STATIONS file.
#[derive(Clone, Debug, PartialEq)]
pub struct StationEntry {
    /// Network name, `Unknown` if the header did not say.
    pub network: String,
    /// Station code.
    pub station: String,
    #[allow(missing_docs)]
    pub latitude: f64,
    #[allow(missing_docs)]
    pub longitude: f64,
    /// Elevation in meters.
    pub elevation: f64,
    /// Burial depth in meters.
    pub burial: f64,
}

impl StationEntry {
    /// Pull the station description out of a SAC header.
    pub fn from_header(header: &super::SacHeader) -> Result<Self, SeisDataErr> {
        let station = header
            .string(CharField::Kstnm)
            .ok_or_else(|| SeisDataErr::InvalidSac("missing kstnm".to_owned()))?;
        // `kevnm` takes precedence over `knetwk`.
        let network = header
            .string(CharField::Kevnm)
            .or_else(|| header.string(CharField::Knetwk))
            .unwrap_or_else(|| "Unknown".to_owned());

        let coord = |field: FloatField| {
            header.float(field).map(f64::from).ok_or_else(|| {
                SeisDataErr::InvalidSac(format!("{} missing {}", station, field.as_ref()))
            })
        };

        Ok(StationEntry {
            latitude: coord(FloatField::Stla)?,
            longitude: coord(FloatField::Stlo)?,
            elevation: header.float(FloatField::Stel).map(f64::from).unwrap_or(0.0),
            burial: 0.0,
            network,
            station,
        })
    }

    /// Format as a line of the table, without the line ending.
    pub fn to_line(&self) -> String {
        format!(
            "{:<8}  {:<8}  {:8.4}  {:8.4}  {:7.1}  {:.1}",
            self.network, self.station, self.latitude, self.longitude, self.elevation, self.burial
        )
    }
}

/// Build the table from a list of SAC files. The first file seen for a station wins, files that
/// can't be read are logged and skipped.
pub fn collect_stations(sac_files: &[PathBuf]) -> Vec<StationEntry> {
    let mut seen = HashSet::new();
    let mut entries = vec![];

    for path in sac_files {
        log::debug!("{}", path.display());

        let entry = match SacFile::read_header(path).and_then(|hdr| StationEntry::from_header(&hdr))
        {
            Ok(entry) => entry,
            Err(err) => {
                log::warn!("skipping {}: {}", path.display(), err);
                continue;
            }
        };

        if seen.insert(entry.station.clone()) {
            entries.push(entry);
        }
    }

    entries
}

/// Write a STATIONS file.
pub fn write_stations(path: &Path, entries: &[StationEntry]) -> Result<(), SeisDataErr> {
    let mut file = File::create(path)?;

    for entry in entries {
        writeln!(file, "{}", entry.to_line())?;
    }

    Ok(())
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
