//! Names of the files and directories the tools hand to each other.
//!
//! ```text
//! <root>/<evid>/CMTSOLUTION
//! <root>/<evid>/<evid>_<net>.cnt      downloaded WIN32 data
//! <root>/<evid>/<net>.ch              channel table
//! <root>/<evid>/SAC/<sta>.<cmp>.SAC   converted waveforms
//! <root>/<evid>/instrument/*.SAC_PZ   instrument responses
//! <root>/<evid>/STATIONS
//! ```

use std::path::{Path, PathBuf};

use crate::{errors::SeisDataErr, network::NetworkCode};

/// Per-event CMTSOLUTION file.
pub const CMTSOLUTION: &str = "CMTSOLUTION";
/// Per-event station list.
pub const STATIONS: &str = "STATIONS";
/// Directory of converted waveforms.
pub const SAC_DIR: &str = "SAC";
/// Directory of instrument responses.
pub const INSTRUMENT_DIR: &str = "instrument";

/// The downloaded data file of a network for an event.
pub fn data_file_name(event_id: &str, code: &NetworkCode) -> String {
    format!("{}_{}.cnt", event_id, code)
}

/// The channel table of a network.
pub fn ctable_file_name(code: &NetworkCode) -> String {
    format!("{}.ch", code)
}

/// The sub directories of `root` in name order.
pub fn event_dirs(root: &Path) -> Result<Vec<PathBuf>, SeisDataErr> {
    sorted_entries(root, |path| path.is_dir())
}

/// The regular files in `dir` in name order.
pub fn sorted_files(dir: &Path) -> Result<Vec<PathBuf>, SeisDataErr> {
    sorted_entries(dir, |path| path.is_file())
}

fn sorted_entries<F>(dir: &Path, keep: F) -> Result<Vec<PathBuf>, SeisDataErr>
where
    F: Fn(&Path) -> bool,
{
    if !dir.is_dir() {
        return Err(SeisDataErr::MissingFile(dir.to_path_buf()));
    }

    let mut entries = vec![];
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if keep(&path) {
            entries.push(path);
        }
    }
    entries.sort();

    Ok(entries)
}

/// The last component of a path as a string, empty if there isn't one.
pub fn file_name_string(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
#[cfg(test)]
mod unit {
    use super::*;

    use tempdir::TempDir;

    #[test]
    fn test_names() {
        let code = NetworkCode::new("0101").unwrap();

        assert_eq!(data_file_name("20110311054623", &code), "20110311054623_0101.cnt");
        assert_eq!(ctable_file_name(&code), "0101.ch");
    }

    #[test]
    fn test_listing_is_sorted() {
        let tmp = TempDir::new("seis-data-layout").unwrap();

        for dir in &["20160415162505", "20110311054623"] {
            std::fs::create_dir(tmp.path().join(dir)).unwrap();
        }
        for file in &["b.SAC", "a.SAC"] {
            std::fs::write(tmp.path().join(file), b"").unwrap();
        }

        let dirs = event_dirs(tmp.path()).unwrap();
        let names: Vec<String> = dirs.iter().map(|p| file_name_string(p)).collect();
        assert_eq!(names, vec!["20110311054623", "20160415162505"]);

        let files = sorted_files(tmp.path()).unwrap();
        let names: Vec<String> = files.iter().map(|p| file_name_string(p)).collect();
        assert_eq!(names, vec!["a.SAC", "b.SAC"]);
    }

    #[test]
    fn test_missing_dir() {
        assert!(event_dirs(Path::new("no_such_directory_here")).is_err());
    }
}
