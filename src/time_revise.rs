//! Move SAC reference times from local time to UTC and set the origin time.
//!
//! Hi-net records in Japan Standard Time. After the shift the reference time fields describe the
//! same instant in UTC, and `o` holds the centroid time relative to the reference time.

use std::{
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use chrono::{Duration, NaiveDateTime};

use crate::{
    calendar,
    catalog::CmtSolution,
    errors::SeisDataErr,
    layout,
    sac::{FloatField, IntField, SacFile, SacHeader},
};

/// The header values to change in one file.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeCorrection {
    #[allow(missing_docs)]
    pub nzyear: i32,
    #[allow(missing_docs)]
    pub nzjday: i32,
    #[allow(missing_docs)]
    pub nzhour: i32,
    /// Seconds from the new reference time to the centroid time.
    pub o: f64,
}

impl TimeCorrection {
    /// Work out the correction for a header whose reference time is `offset_hours` ahead of UTC.
    pub fn compute(
        header: &SacHeader,
        centroid: &NaiveDateTime,
        offset_hours: i32,
    ) -> Result<Self, SeisDataErr> {
        let local = header.reference_time()?;

        let get = |field: IntField| {
            header
                .int(field)
                .ok_or_else(|| SeisDataErr::InvalidSac(format!("undefined {}", field.as_ref())))
        };
        let (nzyear, nzjday, nzhour) = calendar::shift_reference_hours(
            get(IntField::Nzyear)?,
            get(IntField::Nzjday)?,
            get(IntField::Nzhour)?,
            offset_hours.checked_neg().unwrap_or(i32::MAX),
        )?;

        let utc = local - Duration::hours(i64::from(offset_hours));
        let o = (*centroid - utc)
            .num_microseconds()
            .map(|us| us as f64 / 1.0e6)
            .ok_or(SeisDataErr::LogicError("time difference overflow"))?;

        Ok(TimeCorrection {
            nzyear,
            nzjday,
            nzhour,
            o,
        })
    }
}

/// Something that can write a copy of a SAC file with corrected header values.
pub trait HeaderWriter {
    /// Read `input`, apply `correction` and write the result to `output`.
    fn write(
        &self,
        input: &Path,
        output: &Path,
        correction: &TimeCorrection,
    ) -> Result<(), SeisDataErr>;
}

/// Rewrites the header directly.
#[derive(Clone, Copy, Debug, Default)]
pub struct NativeWriter;

impl HeaderWriter for NativeWriter {
    fn write(
        &self,
        input: &Path,
        output: &Path,
        correction: &TimeCorrection,
    ) -> Result<(), SeisDataErr> {
        let mut sac = SacFile::read(input)?;

        sac.header.set_float(FloatField::O, correction.o as f32);
        sac.header.set_int(IntField::Nzyear, correction.nzyear);
        sac.header.set_int(IntField::Nzjday, correction.nzjday);
        sac.header.set_int(IntField::Nzhour, correction.nzhour);

        sac.write(output)
    }
}

/// Runs an external `sac` program with a macro on its standard input.
#[derive(Clone, Debug)]
pub struct SacProcessWriter {
    sac_bin: PathBuf,
}

impl SacProcessWriter {
    #[allow(missing_docs)]
    pub fn new(sac_bin: &Path) -> Self {
        SacProcessWriter {
            sac_bin: sac_bin.to_path_buf(),
        }
    }

    /// The commands fed to `sac`.
    pub fn macro_script(input: &Path, output: &Path, correction: &TimeCorrection) -> String {
        format!(
            "r {}\nch {} {}\nch {} {}\nch {} {}\nch {} {}\nw {}\nq\n",
            input.display(),
            FloatField::O.as_ref(),
            correction.o,
            IntField::Nzyear.as_ref(),
            correction.nzyear,
            IntField::Nzjday.as_ref(),
            correction.nzjday,
            IntField::Nzhour.as_ref(),
            correction.nzhour,
            output.display(),
        )
    }
}

impl HeaderWriter for SacProcessWriter {
    fn write(
        &self,
        input: &Path,
        output: &Path,
        correction: &TimeCorrection,
    ) -> Result<(), SeisDataErr> {
        let script = Self::macro_script(input, output, correction);

        // A file left by an earlier run would hide a failure.
        match std::fs::remove_file(output) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }

        let mut child = Command::new(&self.sac_bin)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .spawn()
            .map_err(|err| {
                SeisDataErr::ExternalTool(format!("{}: {}", self.sac_bin.display(), err))
            })?;

        // Dropping stdin closes the pipe so `sac` sees the end of the macro.
        let fed = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(script.as_bytes()),
            None => Ok(()),
        };
        let status = child.wait()?;

        if !status.success() {
            return Err(SeisDataErr::ExternalTool(format!(
                "{} exited with {}",
                self.sac_bin.display(),
                status
            )));
        }
        if let Err(err) = fed {
            return Err(SeisDataErr::ExternalTool(format!(
                "{} did not read its macro: {}",
                self.sac_bin.display(),
                err
            )));
        }
        if !output.exists() {
            return Err(SeisDataErr::ExternalTool(format!(
                "{} did not write {}",
                self.sac_bin.display(),
                output.display()
            )));
        }

        Ok(())
    }
}

/// Correct every file in `<event_dir>/<sub_in>` and write it to `<event_dir>/<sub_out>`.
///
/// Files that fail are logged and skipped. Returns the number of files written.
pub fn revise_event(
    event_dir: &Path,
    sub_in: &str,
    sub_out: &str,
    offset_hours: i32,
    writer: &dyn HeaderWriter,
) -> Result<usize, SeisDataErr> {
    let cmt = CmtSolution::load(&event_dir.join(layout::CMTSOLUTION))?;
    let centroid = cmt.centroid_time()?;

    let out_dir = event_dir.join(sub_out);
    std::fs::create_dir_all(&out_dir)?;

    let mut written = 0;
    for input in layout::sorted_files(&event_dir.join(sub_in))? {
        let output = out_dir.join(layout::file_name_string(&input));

        let res = SacFile::read_header(&input)
            .and_then(|header| TimeCorrection::compute(&header, &centroid, offset_hours))
            .and_then(|correction| {
                log::debug!("{}: {:?}", input.display(), correction);
                writer.write(&input, &output, &correction)
            });

        match res {
            Ok(()) => written += 1,
            Err(err) => log::warn!("skipping {}: {}", input.display(), err),
        }
    }

    Ok(written)
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
#[cfg(test)]
mod unit {
    use super::*;

    use chrono::NaiveDate;
    use tempdir::TempDir;

    const CMT: &str = "\
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
Mtp:      -6.570000e+28
";

    fn at(y: i32, m: u32, d: u32, hh: u32, mm: u32, ss: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(hh, mm, ss)
            .unwrap()
    }

    fn header_at(time: &NaiveDateTime) -> SacHeader {
        let mut header = SacHeader::default();
        header.set_reference_time(time);
        header
    }

    #[test]
    fn test_compute_same_day() {
        // Data starting 14:43:53 JST, the centroid at 05:47:33 UTC.
        let header = header_at(&at(2011, 3, 11, 14, 43, 53));
        let corr = TimeCorrection::compute(&header, &at(2011, 3, 11, 5, 47, 33), 9).unwrap();

        assert_eq!(corr.nzyear, 2011);
        assert_eq!(corr.nzjday, 70);
        assert_eq!(corr.nzhour, 5);
        assert!((corr.o - 220.0).abs() < 1.0e-6);
    }

    #[test]
    fn test_compute_crosses_new_year() {
        let header = header_at(&at(2012, 1, 1, 3, 0, 0));
        let corr = TimeCorrection::compute(&header, &at(2011, 12, 31, 18, 1, 0), 9).unwrap();

        assert_eq!(corr.nzyear, 2011);
        assert_eq!(corr.nzjday, 365);
        assert_eq!(corr.nzhour, 18);
        assert!((corr.o - 60.0).abs() < 1.0e-6);

        // 2009 day 1 goes back to the last day of leap year 2008.
        let header = header_at(&at(2009, 1, 1, 8, 59, 0));
        let corr = TimeCorrection::compute(&header, &at(2008, 12, 31, 23, 59, 0), 9).unwrap();
        assert_eq!((corr.nzyear, corr.nzjday, corr.nzhour), (2008, 366, 23));
        assert!(corr.o.abs() < 1.0e-6);
    }

    #[test]
    fn test_compute_needs_reference_time() {
        let header = SacHeader::default();
        assert!(TimeCorrection::compute(&header, &at(2011, 3, 11, 5, 47, 33), 9).is_err());
    }

    #[test]
    fn test_macro_script() {
        let corr = TimeCorrection {
            nzyear: 2011,
            nzjday: 70,
            nzhour: 5,
            o: 220.5,
        };

        let script =
            SacProcessWriter::macro_script(Path::new("in/A.U.SAC"), Path::new("out/A.U.SAC"), &corr);
        assert_eq!(
            script,
            "r in/A.U.SAC\nch o 220.5\nch nzyear 2011\nch nzjday 70\nch nzhour 5\nw out/A.U.SAC\nq\n"
        );
    }

    #[cfg(unix)]
    fn fake_sac(dir: &Path, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn test_sac_process_reads_whole_macro() {
        let tmp = TempDir::new("seis-data-sac-bin").unwrap();
        let input = tmp.path().join("in.SAC");
        let output = tmp.path().join("out.SAC");
        let seen = tmp.path().join("macro.txt");

        // `cat` only returns once stdin is closed.
        let sac_bin = fake_sac(
            tmp.path(),
            "sac",
            &format!("cat > '{}'\ntouch '{}'\n", seen.display(), output.display()),
        );
        let corr = TimeCorrection {
            nzyear: 2011,
            nzjday: 70,
            nzhour: 5,
            o: 220.5,
        };

        SacProcessWriter::new(&sac_bin)
            .write(&input, &output, &corr)
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(&seen).unwrap(),
            SacProcessWriter::macro_script(&input, &output, &corr)
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_sac_process_without_output_fails() {
        let tmp = TempDir::new("seis-data-sac-bin").unwrap();
        let input = tmp.path().join("in.SAC");
        let output = tmp.path().join("out.SAC");
        std::fs::write(&output, b"left over from an earlier run").unwrap();

        let sac_bin = fake_sac(tmp.path(), "sac", "cat > /dev/null\nexit 0\n");
        let corr = TimeCorrection {
            nzyear: 2011,
            nzjday: 70,
            nzhour: 5,
            o: 220.5,
        };

        assert!(SacProcessWriter::new(&sac_bin)
            .write(&input, &output, &corr)
            .is_err());
        assert!(!output.exists());

        let failing = fake_sac(tmp.path(), "sac_exit_3", "exit 3\n");
        assert!(SacProcessWriter::new(&failing)
            .write(&input, &output, &corr)
            .is_err());
    }

    #[test]
    fn test_revise_event() {
        let tmp = TempDir::new("seis-data-revise").unwrap();
        let event_dir = tmp.path().join("20110311054623");
        let sac_dir = event_dir.join("SAC");
        std::fs::create_dir_all(&sac_dir).unwrap();
        std::fs::write(event_dir.join(layout::CMTSOLUTION), CMT).unwrap();

        let mut header = header_at(&at(2011, 3, 11, 14, 43, 53));
        header.set_float(FloatField::Delta, 0.01);
        header.set_float(FloatField::B, 0.0);
        SacFile::new(header, vec![0.0, 1.0, -1.0])
            .write(&sac_dir.join("N.KAKH.U.SAC"))
            .unwrap();
        std::fs::write(sac_dir.join("garbage.SAC"), b"not a sac file").unwrap();

        let written = revise_event(&event_dir, "SAC", "rSAC", 9, &NativeWriter).unwrap();
        assert_eq!(written, 1);

        let revised = SacFile::read(&event_dir.join("rSAC/N.KAKH.U.SAC")).unwrap();
        assert_eq!(revised.header.int(IntField::Nzhour), Some(5));
        assert_eq!(revised.header.int(IntField::Nzmin), Some(43));
        assert_eq!(revised.header.float(FloatField::O), Some(220.0));
        assert_eq!(revised.data, vec![0.0, 1.0, -1.0]);
        assert!(!event_dir.join("rSAC/garbage.SAC").exists());
    }

    #[test]
    fn test_revise_event_without_cmt() {
        let tmp = TempDir::new("seis-data-revise").unwrap();
        std::fs::create_dir_all(tmp.path().join("SAC")).unwrap();

        assert!(revise_event(tmp.path(), "SAC", "rSAC", 9, &NativeWriter).is_err());
    }
}
