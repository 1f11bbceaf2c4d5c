//! CMT catalogs: concatenated CMTSOLUTION blocks.

use std::{
    fs::File,
    io::{BufRead, BufReader, Write},
    path::Path,
};

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::{config::HinetConfig, errors::SeisDataErr};

/// Number of lines following the header line in a CMTSOLUTION block.
pub const CMT_BODY_LINES: usize = 12;

/// The hypocenter line that starts a CMTSOLUTION block.
#[derive(Clone, Debug, PartialEq)]
pub struct PdeHeader {
    /// Four character catalog code, e.g. `PDE ` or `PDEW`.
    pub code: String,
    /// Everything after the code, verbatim.
    pub rest: String,
    /// Hypocenter origin time, UTC.
    pub origin: NaiveDateTime,
    #[allow(missing_docs)]
    pub latitude: f64,
    #[allow(missing_docs)]
    pub longitude: f64,
    /// Depth in km.
    pub depth: f64,
    /// Body wave magnitude.
    pub mb: f64,
    /// Surface wave magnitude.
    pub ms: f64,
    /// Flinn-Engdahl region name, may be empty.
    pub region: String,
}

impl PdeHeader {
    /// Parse a header line. The catalog code starts at the `PDE` token and is four characters
    /// long, so both `PDE 2011  3 11 ...` and `PDEW2011  3 11 ...` are understood.
    pub fn parse(line: &str) -> Result<Self, SeisDataErr> {
        let bad_entry = || SeisDataErr::InvalidCatalogEntry(line.trim_end().to_owned());

        let start = line.find("PDE").ok_or_else(bad_entry)?;
        let code_end = line[start..]
            .char_indices()
            .nth(4)
            .map(|(idx, _)| start + idx)
            .ok_or_else(bad_entry)?;

        let code = line[start..code_end].to_owned();
        let rest = line[code_end..].trim_end_matches(&['\r', '\n'][..]).to_owned();

        let tokens: Vec<&str> = rest.split_whitespace().collect();
        if tokens.len() < 11 {
            return Err(bad_entry());
        }

        let int_at = |idx: usize| -> Result<u32, SeisDataErr> {
            tokens[idx].parse::<u32>().map_err(|_| bad_entry())
        };
        let float_at = |idx: usize| -> Result<f64, SeisDataErr> {
            tokens[idx].parse::<f64>().map_err(|_| bad_entry())
        };

        let year = tokens[0].parse::<i32>().map_err(|_| bad_entry())?;
        let (month, day, hour, minute) = (int_at(1)?, int_at(2)?, int_at(3)?, int_at(4)?);
        let second = float_at(5)?;
        if !(0.0..=60.0).contains(&second) {
            return Err(bad_entry());
        }

        // Build from the minute so a seconds value of 60.00 rolls over.
        let origin = NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(hour, minute, 0))
            .and_then(|start| {
                start.checked_add_signed(Duration::microseconds((second * 1.0e6).round() as i64))
            })
            .ok_or_else(bad_entry)?;

        Ok(PdeHeader {
            code,
            origin,
            latitude: float_at(6)?,
            longitude: float_at(7)?,
            depth: float_at(8)?,
            mb: float_at(9)?,
            ms: float_at(10)?,
            region: tokens[11..].join(" "),
            rest,
        })
    }

    /// The larger of the two catalog magnitudes.
    pub fn magnitude(&self) -> f64 {
        self.mb.max(self.ms)
    }

    /// Event id, `YYYYMMDDhhmmss` of the origin with the fractional seconds dropped.
    pub fn event_id(&self) -> String {
        self.origin.format("%Y%m%d%H%M%S").to_string()
    }

    /// The header as written to a per-event CMTSOLUTION file.
    pub fn to_line(&self) -> String {
        format!("{} {}", self.code, self.rest)
    }
}

/// A single CMTSOLUTION block.
#[derive(Clone, Debug, PartialEq)]
pub struct CmtSolution {
    /// The parsed first line.
    pub header: PdeHeader,
    /// The lines after the header, verbatim and without line endings.
    pub body: Vec<String>,
}

impl CmtSolution {
    /// Parse a block from its lines, the first being the header.
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Result<Self, SeisDataErr> {
        let (first, others) = lines.split_first().ok_or(SeisDataErr::NotEnoughData)?;

        let header = PdeHeader::parse(first.as_ref())?;
        let body = others
            .iter()
            .take(CMT_BODY_LINES)
            .map(|line| line.as_ref().trim_end_matches(&['\r', '\n'][..]).to_owned())
            .collect();

        Ok(CmtSolution { header, body })
    }

    /// Load a single event CMTSOLUTION file.
    pub fn load(path: &Path) -> Result<Self, SeisDataErr> {
        let lines = read_lines(path)?;
        Self::from_lines(&lines)
    }

    /// Look up a `key: value` field in the body, the key is matched case-insensitively.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.body.iter().find_map(|line| {
            let mut parts = line.splitn(2, ':');
            let name = parts.next()?.trim();
            let value = parts.next()?.trim();

            if name.eq_ignore_ascii_case(key) {
                Some(value)
            } else {
                None
            }
        })
    }

    fn float_field(&self, key: &'static str) -> Result<f64, SeisDataErr> {
        self.field(key)
            .and_then(|val| val.split_whitespace().next())
            .and_then(|val| val.parse::<f64>().ok())
            .ok_or(SeisDataErr::MissingCmtField(key))
    }

    /// The `time shift` field, seconds from the hypocenter origin to the centroid.
    pub fn time_shift(&self) -> Result<f64, SeisDataErr> {
        self.float_field("time shift")
    }

    /// The `half duration` field in seconds.
    pub fn half_duration(&self) -> Result<f64, SeisDataErr> {
        self.float_field("half duration")
    }

    /// Centroid time in UTC.
    pub fn centroid_time(&self) -> Result<NaiveDateTime, SeisDataErr> {
        let shift = self.time_shift()?;
        let bad_shift = || SeisDataErr::InvalidCatalogEntry(format!("time shift {}", shift));

        if !shift.is_finite() {
            return Err(bad_shift());
        }

        self.header
            .origin
            .checked_add_signed(Duration::microseconds((shift * 1.0e6).round() as i64))
            .ok_or_else(bad_shift)
    }

    /// Write the block to `path` as a single event CMTSOLUTION file.
    pub fn write(&self, path: &Path) -> Result<(), SeisDataErr> {
        let mut file = File::create(path)?;

        writeln!(file, "{}", self.header.to_line())?;
        for line in &self.body {
            writeln!(file, "{}", line)?;
        }

        Ok(())
    }
}

/// A catalog entry along with the line it started on.
#[derive(Clone, Debug)]
pub struct CatalogEntry {
    /// Zero based line index of the header line in the catalog file.
    pub line: usize,
    /// The parsed block.
    pub cmt: CmtSolution,
}

/// Parse every block in a catalog. Header lines that fail to parse are reported and skipped.
pub fn parse_catalog<S: AsRef<str>>(lines: &[S]) -> Vec<CatalogEntry> {
    let mut entries = vec![];

    for (idx, line) in lines.iter().enumerate() {
        if !line.as_ref().contains("PDE") {
            continue;
        }

        match CmtSolution::from_lines(&lines[idx..]) {
            Ok(cmt) => {
                if cmt.body.len() < CMT_BODY_LINES {
                    log::warn!(
                        "catalog entry at line {} has only {} of {} body lines",
                        idx + 1,
                        cmt.body.len(),
                        CMT_BODY_LINES
                    );
                }
                entries.push(CatalogEntry { line: idx, cmt });
            }
            Err(err) => log::warn!("skipping line {}: {}", idx + 1, err),
        }
    }

    entries
}

/// The entries to download: those starting at or after `config.start_line` whose magnitude is
/// strictly inside the configured bounds.
pub fn select_entries<'a>(
    entries: &'a [CatalogEntry],
    config: &HinetConfig,
) -> Vec<&'a CatalogEntry> {
    entries
        .iter()
        .filter(|entry| entry.line >= config.start_line)
        .filter(|entry| {
            let mag = entry.cmt.header.magnitude();
            let keep = config.magnitude_in_range(mag);
            if !keep {
                log::debug!("skipping {}, magnitude {}", entry.cmt.header.event_id(), mag);
            }
            keep
        })
        .collect()
}

/// Load and parse a catalog file.
pub fn load_catalog(path: &Path) -> Result<Vec<CatalogEntry>, SeisDataErr> {
    let lines = read_lines(path)?;
    Ok(parse_catalog(&lines))
}

fn read_lines(path: &Path) -> Result<Vec<String>, SeisDataErr> {
    let file = File::open(path).map_err(|err| match err.kind() {
        std::io::ErrorKind::NotFound => SeisDataErr::MissingFile(path.to_path_buf()),
        _ => SeisDataErr::IO(err),
    })?;

    let lines: Result<Vec<String>, std::io::Error> = BufReader::new(file).lines().collect();
    Ok(lines?)
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
#[cfg(test)]
mod unit {
    use super::*;

    use tempdir::TempDir;

    const TOHOKU: &str = "\
 PDE 2011  3 11  5 46 23.00  38.2960  142.4980  19.7 7.9 9.1 NEAR EAST COAST OF HONSHU, JAPAN
event name:     201103110546A
time shift:     70.0000
half duration:  70.0000
latitude:       37.5200
longitude:      143.0500
depth:          20.0000
Mrr:       1.730000e+29
Mtt:      -2.810000e+28
Mpp:      -1.450000e+29
Mrt:       2.120000e+29
Mrp:       4.550000e+29
Mtp:      -6.570000e+28";

    const KUMAMOTO: &str = "\
 PDEW2016  4 15 16 25  5.40  32.7900  130.7500  10.0 6.0 7.0 KYUSHU, JAPAN
event name:     201604151625A
time shift:     11.2000
half duration:   9.6000
latitude:       32.7500
longitude:      130.7600
depth:          12.7000
Mrr:      -2.320000e+25
Mtt:      -2.850000e+26
Mpp:       3.080000e+26
Mrt:      -1.260000e+26
Mrp:       1.810000e+26
Mtp:      -1.680000e+26";

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(ToOwned::to_owned).collect()
    }

    #[test]
    fn test_parse_pde_header() {
        let header = PdeHeader::parse(TOHOKU.lines().next().unwrap()).unwrap();

        assert_eq!(header.code, "PDE ");
        assert_eq!(
            header.origin,
            NaiveDate::from_ymd_opt(2011, 3, 11)
                .unwrap()
                .and_hms_opt(5, 46, 23)
                .unwrap()
        );
        assert_eq!(header.magnitude(), 9.1);
        assert_eq!(header.event_id(), "20110311054623");
        assert_eq!(header.region, "NEAR EAST COAST OF HONSHU, JAPAN");
    }

    #[test]
    fn test_parse_pdew_header() {
        let header = PdeHeader::parse(KUMAMOTO.lines().next().unwrap()).unwrap();

        assert_eq!(header.code, "PDEW");
        assert_eq!(header.event_id(), "20160415162505");
        assert_eq!(header.magnitude(), 7.0);
        assert!(header.to_line().starts_with("PDEW 2016  4 15"));
    }

    #[test]
    fn test_sixty_seconds_rolls_over() {
        let header =
            PdeHeader::parse(" PDE 2011  3 11  5 46 60.00  38.2960  142.4980  19.7 7.9 9.1 X")
                .unwrap();
        assert_eq!(header.event_id(), "20110311054700");
    }

    #[test]
    fn test_bad_header() {
        assert!(PdeHeader::parse(" PDE 2011  3 11  5").is_err());
        assert!(PdeHeader::parse(" PDE 2011 13 11  5 46 23.00 1 2 3 4 5").is_err());
        assert!(PdeHeader::parse("nothing here").is_err());
    }

    #[test]
    fn test_cmt_fields() {
        let cmt = CmtSolution::from_lines(&lines(TOHOKU)).unwrap();

        assert_eq!(cmt.body.len(), CMT_BODY_LINES);
        assert_eq!(cmt.field("event name"), Some("201103110546A"));
        assert_eq!(cmt.time_shift().unwrap(), 70.0);
        assert_eq!(cmt.half_duration().unwrap(), 70.0);
        assert_eq!(
            cmt.centroid_time().unwrap(),
            NaiveDate::from_ymd_opt(2011, 3, 11)
                .unwrap()
                .and_hms_opt(5, 47, 33)
                .unwrap()
        );
    }

    #[test]
    fn test_parse_catalog() {
        let text = format!("{}\n{}\n", TOHOKU, KUMAMOTO);
        let entries = parse_catalog(&lines(&text));

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].line, 0);
        assert_eq!(entries[1].line, 13);
        assert_eq!(entries[1].cmt.header.event_id(), "20160415162505");
    }

    #[test]
    fn test_select_entries() {
        let text = format!("{}\n{}\n", TOHOKU, KUMAMOTO);
        let entries = parse_catalog(&lines(&text));
        let ids = |config: &HinetConfig| -> Vec<String> {
            select_entries(&entries, config)
                .iter()
                .map(|entry| entry.cmt.header.event_id())
                .collect()
        };

        let mut config = HinetConfig::default();
        assert_eq!(ids(&config), vec!["20110311054623", "20160415162505"]);

        // Resume at the second entry's header line.
        config.start_line = 13;
        assert_eq!(ids(&config), vec!["20160415162505"]);
        config.start_line = 14;
        assert!(ids(&config).is_empty());

        config.start_line = 0;
        config.min_magnitude = 7.0;
        assert_eq!(ids(&config), vec!["20110311054623"]);

        config.min_magnitude = 6.0;
        config.max_magnitude = 9.1;
        assert_eq!(ids(&config), vec!["20160415162505"]);
    }

    #[test]
    fn test_absurd_times_are_errors() {
        for second in &["1e300", "-1.0", "NaN"] {
            let line = format!(
                " PDE 2011  3 11  5 46 {}  38.2960  142.4980  19.7 7.9 9.1 X",
                second
            );
            assert!(PdeHeader::parse(&line).is_err(), "seconds {}", second);
        }

        let text = TOHOKU.replace("time shift:     70.0000", "time shift:     1.0e300");
        let cmt = CmtSolution::from_lines(&lines(&text)).unwrap();
        assert!(cmt.centroid_time().is_err());
    }

    #[test]
    fn test_write_and_load() {
        let tmp = TempDir::new("seis-data-catalog").unwrap();
        let path = tmp.path().join("CMTSOLUTION");

        let cmt = CmtSolution::from_lines(&lines(KUMAMOTO)).unwrap();
        cmt.write(&path).unwrap();

        let loaded = CmtSolution::load(&path).unwrap();
        assert_eq!(loaded.header.origin, cmt.header.origin);
        assert_eq!(loaded.body, cmt.body);
        assert_eq!(loaded.time_shift().unwrap(), 11.2);
    }

    #[test]
    fn test_load_missing_file() {
        match CmtSolution::load(Path::new("no_such_dir/CMTSOLUTION")) {
            Err(SeisDataErr::MissingFile(_)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
