//! Reading and writing binary SAC files.

use std::{
    fs::File,
    io::{Read, Write},
    path::Path,
};

use crate::errors::SeisDataErr;

pub use self::header::{
    CharField, FloatField, IntField, SacHeader, IACC, IB, IDISP, IO, ITIME, IUNKN, IVEL,
};
use self::header::{HEADER_BYTES, NUM_CHARS, NUM_FLOATS, NUM_INTS};

mod header;
pub mod stations;

/// Byte order of a file on disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ByteOrder {
    #[allow(missing_docs)]
    Little,
    #[allow(missing_docs)]
    Big,
}

impl ByteOrder {
    fn read_i32(self, bytes: &[u8]) -> i32 {
        let raw = [bytes[0], bytes[1], bytes[2], bytes[3]];
        match self {
            ByteOrder::Little => i32::from_le_bytes(raw),
            ByteOrder::Big => i32::from_be_bytes(raw),
        }
    }

    fn read_f32(self, bytes: &[u8]) -> f32 {
        f32::from_bits(self.read_i32(bytes) as u32)
    }

    // Header versions 6 and 7 are the only ones in use.
    fn detect(header: &[u8]) -> Option<Self> {
        let nvhdr_offset = 4 * (NUM_FLOATS + IntField::Nvhdr.index());
        let word = &header[nvhdr_offset..nvhdr_offset + 4];

        [ByteOrder::Little, ByteOrder::Big]
            .iter()
            .copied()
            .find(|order| (1..=7).contains(&order.read_i32(word)))
    }
}

/// A single trace.
#[derive(Clone, Debug, PartialEq)]
pub struct SacFile {
    /// The header.
    pub header: SacHeader,
    /// The samples.
    pub data: Vec<f32>,
}

impl SacFile {
    /// Create an evenly sampled trace and fill in the header values that depend on the data.
    pub fn new(header: SacHeader, data: Vec<f32>) -> Self {
        let mut sac = SacFile { header, data };
        sac.update_data_stats();
        sac
    }

    /// Set `npts`, `depmin`, `depmax`, `depmen` and `e` from the data.
    pub fn update_data_stats(&mut self) {
        let npts = self.data.len();
        self.header.set_int(IntField::Npts, npts as i32);

        if npts == 0 {
            return;
        }

        let (min, max, sum) = self.data.iter().fold(
            (f32::INFINITY, f32::NEG_INFINITY, 0.0f64),
            |(min, max, sum), &val| (min.min(val), max.max(val), sum + f64::from(val)),
        );
        self.header.set_float(FloatField::Depmin, min);
        self.header.set_float(FloatField::Depmax, max);
        self.header
            .set_float(FloatField::Depmen, (sum / npts as f64) as f32);

        if let Some(delta) = self.header.float(FloatField::Delta) {
            let begin = self.header.float(FloatField::B).unwrap_or(0.0);
            self.header
                .set_float(FloatField::E, begin + delta * (npts - 1) as f32);
        }
    }

    /// Read a whole file.
    pub fn read(path: &Path) -> Result<Self, SeisDataErr> {
        let mut bytes = vec![];
        open(path)?.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }

    /// Read only the header of a file.
    pub fn read_header(path: &Path) -> Result<SacHeader, SeisDataErr> {
        let mut bytes = vec![0u8; HEADER_BYTES];
        open(path)?
            .read_exact(&mut bytes)
            .map_err(|_| SeisDataErr::InvalidSac(format!("{} is too short", path.display())))?;

        let (header, _) = parse_header(&bytes)?;
        Ok(header)
    }

    /// Decode a file held in memory.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SeisDataErr> {
        let (header, order) = parse_header(bytes)?;

        let npts = header.npts();
        let end = HEADER_BYTES + 4 * npts;
        if bytes.len() < end {
            return Err(SeisDataErr::InvalidSac(format!(
                "header says {} points, file holds {}",
                npts,
                (bytes.len() - HEADER_BYTES) / 4
            )));
        }

        let data = bytes[HEADER_BYTES..end]
            .chunks_exact(4)
            .map(|word| order.read_f32(word))
            .collect();

        Ok(SacFile { header, data })
    }

    /// Encode as a little endian file.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_BYTES + 4 * self.data.len());

        for val in self.header.floats.iter() {
            bytes.extend_from_slice(&val.to_le_bytes());
        }
        for val in self.header.ints.iter() {
            bytes.extend_from_slice(&val.to_le_bytes());
        }
        bytes.extend_from_slice(&self.header.chars);
        for val in self.data.iter() {
            bytes.extend_from_slice(&val.to_le_bytes());
        }

        bytes
    }

    /// Write the file, replacing anything at `path`.
    pub fn write(&self, path: &Path) -> Result<(), SeisDataErr> {
        let mut file = File::create(path)?;
        file.write_all(&self.to_bytes())?;
        Ok(())
    }
}

fn open(path: &Path) -> Result<File, SeisDataErr> {
    File::open(path).map_err(|err| match err.kind() {
        std::io::ErrorKind::NotFound => SeisDataErr::MissingFile(path.to_path_buf()),
        _ => SeisDataErr::IO(err),
    })
}

fn parse_header(bytes: &[u8]) -> Result<(SacHeader, ByteOrder), SeisDataErr> {
    if bytes.len() < HEADER_BYTES {
        return Err(SeisDataErr::InvalidSac(format!(
            "{} bytes is too short for a header",
            bytes.len()
        )));
    }

    let order = ByteOrder::detect(bytes)
        .ok_or_else(|| SeisDataErr::InvalidSac("unrecognized header version".to_owned()))?;

    let mut header = SacHeader::default();

    for (i, word) in bytes[..4 * NUM_FLOATS].chunks_exact(4).enumerate() {
        header.floats[i] = order.read_f32(word);
    }

    let int_start = 4 * NUM_FLOATS;
    for (i, word) in bytes[int_start..int_start + 4 * NUM_INTS]
        .chunks_exact(4)
        .enumerate()
    {
        header.ints[i] = order.read_i32(word);
    }

    let char_start = int_start + 4 * NUM_INTS;
    header
        .chars
        .copy_from_slice(&bytes[char_start..char_start + NUM_CHARS]);

    Ok((header, order))
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
#[cfg(test)]
mod unit {
    use super::*;

    use tempdir::TempDir;

    fn test_trace() -> SacFile {
        let mut header = SacHeader::default();
        header.set_float(FloatField::Delta, 0.01);
        header.set_float(FloatField::B, 0.0);
        header.set_float(FloatField::Stla, 36.1234);
        header.set_string(CharField::Kstnm, "N.TYOH");

        SacFile::new(header, vec![1.0, -2.0, 4.0, 1.0])
    }

    #[test]
    fn test_data_stats() {
        let sac = test_trace();

        assert_eq!(sac.header.npts(), 4);
        assert_eq!(sac.header.float(FloatField::Depmin), Some(-2.0));
        assert_eq!(sac.header.float(FloatField::Depmax), Some(4.0));
        assert_eq!(sac.header.float(FloatField::Depmen), Some(1.0));
        assert!((sac.header.float(FloatField::E).unwrap() - 0.03).abs() < 1.0e-6);
    }

    #[test]
    fn test_file_round_trip() {
        let tmp = TempDir::new("seis-data-sac").unwrap();
        let path = tmp.path().join("N.TYOH.U.SAC");

        let sac = test_trace();
        sac.write(&path).unwrap();

        assert_eq!(SacFile::read(&path).unwrap(), sac);
        assert_eq!(SacFile::read_header(&path).unwrap(), sac.header);
    }

    #[test]
    fn test_read_big_endian() {
        let sac = test_trace();

        // Swap every word of the little endian encoding except the strings.
        let mut bytes = sac.to_bytes();
        let char_start = 4 * (NUM_FLOATS + NUM_INTS);
        for (i, word) in bytes.chunks_exact_mut(4).enumerate() {
            if i * 4 < char_start || i * 4 >= char_start + NUM_CHARS {
                word.reverse();
            }
        }

        assert_eq!(SacFile::from_bytes(&bytes).unwrap(), sac);
    }

    #[test]
    fn test_bad_files() {
        assert!(SacFile::from_bytes(&[0u8; 100]).is_err());

        // Valid header, missing samples.
        let bytes = test_trace().to_bytes();
        assert!(SacFile::from_bytes(&bytes[..HEADER_BYTES + 4]).is_err());

        // Garbage where the version should be.
        assert!(SacFile::from_bytes(&[0xffu8; HEADER_BYTES]).is_err());

        match SacFile::read(Path::new("no_such_file.SAC")) {
            Err(SeisDataErr::MissingFile(_)) => {}
            other => panic!("unexpected: {:?}", other),
        }
    }
}
