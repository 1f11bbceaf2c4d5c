//! Channel tables distributed alongside WIN32 data.

use std::path::Path;

use crate::errors::SeisDataErr;

/// One line of a channel table.
#[derive(Clone, Debug, PartialEq)]
pub struct Channel {
    /// Channel id as in the data blocks.
    pub id: u16,
    /// Station code, e.g. `N.NGUH`.
    pub station: String,
    /// Component code, e.g. `U`, `N`, `E`.
    pub component: String,
    /// Monitor amplitude exponent.
    pub monitor_exponent: i32,
    /// Bits of the A/D converter.
    pub adc_bits: u32,
    /// Sensor sensitivity in V per `unit`.
    pub sensitivity: f64,
    /// Physical unit of the sensor, `m/s`, `m/s/s` or `m`.
    pub unit: String,
    /// Natural period of the sensor in seconds.
    pub natural_period: f64,
    /// Damping constant.
    pub damping: f64,
    /// Amplifier gain in dB.
    pub gain_db: f64,
    /// Voltage of one count.
    pub lsb_value: f64,
    #[allow(missing_docs)]
    pub latitude: f64,
    #[allow(missing_docs)]
    pub longitude: f64,
    /// Elevation in meters.
    pub elevation: f64,
    /// Station correction for P in seconds.
    pub p_correction: f64,
    /// Station correction for S in seconds.
    pub s_correction: f64,
    /// Station name, if given.
    pub station_name: Option<String>,
}

impl Channel {
    /// Parse a line. Returns `Ok(None)` for comments and blank lines.
    pub fn parse(line: &str) -> Result<Option<Self>, SeisDataErr> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < 18 {
            return Err(SeisDataErr::GeneralError(format!(
                "channel table line has {} columns: {}",
                tokens.len(),
                line
            )));
        }

        let bad = |col: usize| {
            SeisDataErr::GeneralError(format!(
                "channel table column {} unreadable: {}",
                col + 1,
                line
            ))
        };
        let float = |col: usize| tokens[col].parse::<f64>().map_err(|_| bad(col));

        Ok(Some(Channel {
            id: u16::from_str_radix(tokens[0], 16).map_err(|_| bad(0))?,
            station: tokens[3].to_owned(),
            component: tokens[4].to_owned(),
            monitor_exponent: tokens[5].parse().map_err(|_| bad(5))?,
            adc_bits: tokens[6].parse().map_err(|_| bad(6))?,
            sensitivity: float(7)?,
            unit: tokens[8].to_owned(),
            natural_period: float(9)?,
            damping: float(10)?,
            gain_db: float(11)?,
            lsb_value: float(12)?,
            latitude: float(13)?,
            longitude: float(14)?,
            elevation: float(15)?,
            p_correction: float(16)?,
            s_correction: float(17)?,
            station_name: if tokens.len() > 18 {
                Some(tokens[18..].join(" "))
            } else {
                None
            },
        }))
    }

    /// Factor converting counts to the physical unit of the sensor.
    pub fn counts_to_unit(&self) -> f64 {
        self.lsb_value / (self.sensitivity * 10f64.powf(self.gain_db / 20.0))
    }

    /// SAC style name, `<station>.<component>`.
    pub fn name(&self) -> String {
        format!("{}.{}", self.station, self.component)
    }

    /// Component azimuth and incidence in degrees, if the component code is a known orientation.
    pub fn orientation(&self) -> Option<(f32, f32)> {
        match self.component.as_str() {
            "U" | "Z" => Some((0.0, 0.0)),
            "N" | "NS" => Some((0.0, 90.0)),
            "E" | "EW" => Some((90.0, 90.0)),
            _ => None,
        }
    }
}

/// Read a channel table. Lines that can't be parsed are logged and skipped.
///
/// Station names are in EUC-JP, which is replaced lossily because only the codes are needed.
pub fn read_channel_table(path: &Path) -> Result<Vec<Channel>, SeisDataErr> {
    if !path.exists() {
        return Err(SeisDataErr::MissingFile(path.to_path_buf()));
    }

    let bytes = std::fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes);

    let channels = text
        .lines()
        .filter_map(|line| match Channel::parse(line) {
            Ok(channel) => channel,
            Err(err) => {
                log::warn!("{}: {}", path.display(), err);
                None
            }
        })
        .collect();

    Ok(channels)
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
#[cfg(test)]
mod unit {
    use super::*;

    use tempdir::TempDir;

    const TABLE: &str = "\
# ch_id flag delay station comp ...
3001 1 0 N.NGUH U 6 27 175.60 m/s 1.00 0.700 0 1.023e-07 37.4335 138.0544 -90 0.00 0.00 Ngu
3002 1 0 N.NGUH N 6 27 175.60 m/s 1.00 0.700 0 1.023e-07 37.4335 138.0544 -90 0.00 0.00 Ngu
3003 1 0 N.NGUH E 6 27 175.60 m/s 1.00 0.700 0 1.023e-07 37.4335 138.0544 -90 0.00 0.00 Ngu
3004 1 0 N.NGUH X 6 27 175.60 m/s/s 1.00 0.700 20 1.023e-07
";

    #[test]
    fn test_parse_line() {
        let ch = Channel::parse(TABLE.lines().nth(1).unwrap())
            .unwrap()
            .unwrap();

        assert_eq!(ch.id, 0x3001);
        assert_eq!(ch.name(), "N.NGUH.U");
        assert_eq!(ch.unit, "m/s");
        assert_eq!(ch.elevation, -90.0);
        assert_eq!(ch.station_name.as_deref(), Some("Ngu"));
        assert_eq!(ch.orientation(), Some((0.0, 0.0)));
        assert!((ch.counts_to_unit() - 1.023e-07 / 175.6).abs() < 1.0e-15);

        assert!(Channel::parse("# comment").unwrap().is_none());
        assert!(Channel::parse("   ").unwrap().is_none());
    }

    #[test]
    fn test_read_table_skips_bad_lines() {
        let tmp = TempDir::new("seis-data-ctable").unwrap();
        let path = tmp.path().join("0101.ch");
        std::fs::write(&path, TABLE).unwrap();

        let channels = read_channel_table(&path).unwrap();
        assert_eq!(channels.len(), 3);
        assert_eq!(channels[2].component, "E");

        assert!(read_channel_table(&tmp.path().join("0103.ch")).is_err());
    }
}
