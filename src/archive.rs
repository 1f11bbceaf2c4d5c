//! An index of downloaded Hi-net waveforms.
//!
//! The index lives next to the event directories it describes, so a download can be stopped and
//! restarted without fetching the same data twice.

use std::path::PathBuf;

/// The archive.
#[derive(Debug)]
pub struct Archive {
    root: PathBuf,                 // The root directory.
    db_conn: rusqlite::Connection, // An sqlite connection.
}

/// An event recorded in the index.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq)]
pub struct EventRecord {
    pub event_id: String,
    pub origin: chrono::NaiveDateTime,
    pub latitude: f64,
    pub longitude: f64,
    pub depth_km: f64,
    pub magnitude: f64,
    pub region: Option<String>,
}

/// A downloaded waveform file and its channel table.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq)]
pub struct WaveformRecord {
    pub event_id: String,
    pub network: String,
    pub start_time: chrono::NaiveDateTime,
    pub span_minutes: u32,
    /// Relative to the archive root.
    pub data_file: PathBuf,
    /// Relative to the archive root.
    pub ctable_file: PathBuf,
}

mod add_data;
mod query;
mod root;

#[cfg(test)]
mod unit {
    use super::*;
    use crate::{catalog::CmtSolution, errors::SeisDataErr, network::NetworkCode};

    use chrono::NaiveDate;
    use tempdir::TempDir;

    // struct to hold temporary data for tests.
    struct TestArchive {
        tmp: TempDir,
        arch: Archive,
    }

    // Function to create a new archive to test.
    fn create_test_archive() -> Result<TestArchive, SeisDataErr> {
        let tmp = TempDir::new("seis-data-test-archive")?;
        let arch = Archive::create(&tmp.path())?;

        Ok(TestArchive { tmp, arch })
    }

    fn test_events() -> Vec<CmtSolution> {
        let text = std::fs::read_to_string("example_data/CMTlist").expect("missing example data");
        let lines: Vec<&str> = text.lines().collect();

        crate::catalog::parse_catalog(&lines)
            .into_iter()
            .map(|entry| entry.cmt)
            .collect()
    }

    fn fill_test_archive(arch: &Archive) -> Result<(), SeisDataErr> {
        let hinet = NetworkCode::new("0101")?;

        for cmt in test_events() {
            arch.add_event(&cmt)?;

            let evid = cmt.header.event_id();
            arch.add_waveform(&WaveformRecord {
                event_id: evid.clone(),
                network: hinet.to_string(),
                start_time: cmt.header.origin,
                span_minutes: 8,
                data_file: PathBuf::from(&evid).join(format!("{}_0101.cnt", evid)),
                ctable_file: PathBuf::from(&evid).join("0101.ch"),
            })?;
        }

        Ok(())
    }

    #[test]
    fn test_archive_create_new() {
        assert!(create_test_archive().is_ok());
    }

    #[test]
    fn test_archive_connect() {
        let TestArchive { tmp, arch } =
            create_test_archive().expect("Failed to create test archive.");
        drop(arch);

        assert!(Archive::connect(&tmp.path()).is_ok());
        assert!(Archive::connect(&"unlikely_directory_in_my_project").is_err());
    }

    #[test]
    fn test_create_or_connect() {
        let TestArchive { tmp, arch } =
            create_test_archive().expect("Failed to create test archive.");
        fill_test_archive(&arch).expect("Error filling test archive.");
        drop(arch);

        let arch = Archive::create_or_connect(&tmp.path()).expect("Error reconnecting.");
        assert_eq!(arch.events().unwrap().len(), test_events().len());
    }

    #[test]
    fn test_get_root() {
        let TestArchive { tmp, arch } =
            create_test_archive().expect("Failed to create test archive.");

        assert_eq!(arch.root(), tmp.path());
    }

    #[test]
    fn test_events_round_trip() {
        let TestArchive { tmp: _tmp, arch } =
            create_test_archive().expect("Failed to create test archive.");
        fill_test_archive(&arch).expect("Error filling test archive.");

        let events = arch.events().expect("Error retrieving events.");
        assert_eq!(events.len(), 3);

        let tohoku = arch
            .event("20110311054623")
            .expect("db error")
            .expect("missing event");
        assert_eq!(
            tohoku.origin,
            NaiveDate::from_ymd_opt(2011, 3, 11)
                .unwrap()
                .and_hms_opt(5, 46, 23)
                .unwrap()
        );
        assert_eq!(tohoku.magnitude, 9.1);

        assert!(arch.event("19000101000000").expect("db error").is_none());
    }

    #[test]
    fn test_adding_duplicates() {
        let TestArchive { tmp: _tmp, arch } =
            create_test_archive().expect("Failed to create test archive.");

        fill_test_archive(&arch).expect("Error filling test archive.");
        fill_test_archive(&arch).expect("Error filling test archive twice.");

        assert_eq!(arch.events().unwrap().len(), 3);
        assert_eq!(arch.waveforms("20110311054623").unwrap().len(), 1);
    }

    #[test]
    fn test_waveform_exists() {
        let TestArchive { tmp: _tmp, arch } =
            create_test_archive().expect("Failed to create test archive.");
        fill_test_archive(&arch).expect("Error filling test archive.");

        let hinet = NetworkCode::new("0101").unwrap();
        let fnet = NetworkCode::new("0103").unwrap();

        assert!(arch.exists("20110311054623", &hinet).unwrap());
        assert!(!arch.exists("20110311054623", &fnet).unwrap());
        assert!(!arch.exists("19000101000000", &hinet).unwrap());

        let records = arch.waveforms("20110311054623").unwrap();
        assert_eq!(records[0].span_minutes, 8);
        assert_eq!(
            records[0].data_file,
            PathBuf::from("20110311054623/20110311054623_0101.cnt")
        );
    }

    #[test]
    fn test_remove_waveform() {
        let TestArchive { tmp: _tmp, arch } =
            create_test_archive().expect("Failed to create test archive.");
        fill_test_archive(&arch).expect("Error filling test archive.");

        let hinet = NetworkCode::new("0101").unwrap();

        assert!(arch.exists("20110311054623", &hinet).unwrap());
        arch.remove_waveform("20110311054623", &hinet)
            .expect("Error while removing.");
        assert!(!arch.exists("20110311054623", &hinet).unwrap());
    }
}
