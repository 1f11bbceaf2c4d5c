//! Turn the downloads for one event into SAC files, pole-zero files and a station list.

use std::path::Path;

use crate::{
    errors::SeisDataErr,
    layout,
    network::NetworkCode,
    sac::stations::{collect_stations, write_stations},
    win32::{extract_pz, extract_sac, ExtractOptions},
};

/// What was produced for one event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConvertSummary {
    /// SAC files written.
    pub sac_files: usize,
    /// Pole-zero files written.
    pub pz_files: usize,
    /// Lines in the STATIONS file.
    pub stations: usize,
    /// Networks without a data file.
    pub missing: usize,
    /// Networks that failed to convert.
    pub failed: usize,
}

/// Convert the data of each network in `event_dir` into `out_dir`.
///
/// A missing or broken network is logged and skipped. The STATIONS file lists every station in
/// the SAC directory, and the CMTSOLUTION file is copied along when there is one.
pub fn convert_event(
    event_dir: &Path,
    out_dir: &Path,
    codes: &[NetworkCode],
    opts: &ExtractOptions,
) -> Result<ConvertSummary, SeisDataErr> {
    let evid = layout::file_name_string(event_dir);
    let sac_dir = out_dir.join(layout::SAC_DIR);
    let pz_dir = out_dir.join(layout::INSTRUMENT_DIR);

    std::fs::create_dir_all(out_dir)?;

    let mut summary = ConvertSummary::default();
    for code in codes {
        let data = event_dir.join(layout::data_file_name(&evid, code));
        let ctable = event_dir.join(layout::ctable_file_name(code));

        if !data.exists() {
            log::warn!("no file {}", data.display());
            summary.missing += 1;
            continue;
        }

        let res = extract_sac(&data, &ctable, &sac_dir, opts)
            .and_then(|sacs| Ok((sacs, extract_pz(&ctable, &pz_dir, opts)?)));

        match res {
            Ok((sacs, pzs)) => {
                log::info!(
                    "ev:{}, net:{} {} SAC and {} SAC_PZ files",
                    evid,
                    code,
                    sacs.len(),
                    pzs.len()
                );
                summary.sac_files += sacs.len();
                summary.pz_files += pzs.len();
            }
            Err(err) => {
                log::warn!("ev:{}, net:{} error: {}", evid, code, err);
                summary.failed += 1;
            }
        }
    }

    if sac_dir.is_dir() {
        let stations = collect_stations(&layout::sorted_files(&sac_dir)?);
        write_stations(&out_dir.join(layout::STATIONS), &stations)?;
        summary.stations = stations.len();
    }

    let cmt = event_dir.join(layout::CMTSOLUTION);
    if cmt.exists() {
        std::fs::copy(&cmt, out_dir.join(layout::CMTSOLUTION))?;
    }

    Ok(summary)
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
#[cfg(test)]
mod unit {
    use super::*;

    use crate::win32::{encode, ChannelBlock, SecondBlock};

    use chrono::NaiveDate;
    use tempdir::TempDir;

    const TABLE: &str = "\
3001 1 0 N.NGUH U 6 27 200.00 m/s 1.00 0.700 0 2.0e-07 37.4335 138.0544 -90 0.00 0.00
3002 1 0 N.NGUH E 6 27 200.00 m/s 1.00 0.700 0 2.0e-07 37.4335 138.0544 -90 0.00 0.00
3101 1 0 N.TYOH U 6 27 200.00 m/s/s 1.00 0.700 0 2.0e-07 35.6812 139.7671 40 0.00 0.00
";

    fn second(sec: u32) -> SecondBlock {
        let block = |channel: u16| ChannelBlock {
            org: 1,
            net: 1,
            channel,
            rate: 4,
            samples: vec![1, 2, 3, 4],
        };

        SecondBlock {
            time: NaiveDate::from_ymd_opt(2011, 3, 11)
                .unwrap()
                .and_hms_opt(14, 46, sec)
                .unwrap(),
            frame_tenths: 10,
            channels: vec![block(0x3001), block(0x3002), block(0x3101)],
        }
    }

    #[test]
    fn test_convert_event() {
        let tmp = TempDir::new("seis-data-convert").unwrap();
        let event_dir = tmp.path().join("Waveform").join("20110311054623");
        let out_dir = tmp.path().join("Data").join("20110311054623");
        std::fs::create_dir_all(&event_dir).unwrap();

        std::fs::write(
            event_dir.join("20110311054623_0101.cnt"),
            encode(&[second(0), second(1)]),
        )
        .unwrap();
        std::fs::write(event_dir.join("0101.ch"), TABLE).unwrap();
        std::fs::write(event_dir.join("CMTSOLUTION"), "PDE 2011 ...\n").unwrap();

        let codes = NetworkCode::parse_list("0101,0103").unwrap();
        let summary =
            convert_event(&event_dir, &out_dir, &codes, &ExtractOptions::default()).unwrap();

        assert_eq!(summary.sac_files, 3);
        assert_eq!(summary.pz_files, 2);
        assert_eq!(summary.stations, 2);
        assert_eq!(summary.missing, 1);
        assert_eq!(summary.failed, 0);

        assert!(out_dir.join("SAC/N.NGUH.U.SAC").exists());
        assert!(out_dir.join("instrument/N.NGUH.E.SAC_PZ").exists());
        assert!(out_dir.join("CMTSOLUTION").exists());

        let stations = std::fs::read_to_string(out_dir.join("STATIONS")).unwrap();
        let lines: Vec<&str> = stations.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Unknown   N.NGUH"));
        assert!(lines[1].contains("N.TYOH"));
    }

    #[test]
    fn test_convert_without_data() {
        let tmp = TempDir::new("seis-data-convert").unwrap();
        let event_dir = tmp.path().join("20110311054623");
        std::fs::create_dir_all(&event_dir).unwrap();

        let codes = NetworkCode::parse_list("0101").unwrap();
        let summary = convert_event(
            &event_dir,
            &tmp.path().join("out"),
            &codes,
            &ExtractOptions::default(),
        )
        .unwrap();

        assert_eq!(summary.missing, 1);
        assert_eq!(summary.stations, 0);
        assert!(!tmp.path().join("out/STATIONS").exists());
    }
}
