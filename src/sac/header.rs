//! The fixed 158 word SAC header.

use std::convert::TryFrom;

use chrono::{Datelike, NaiveDateTime, Timelike};
use strum_macros::{AsRefStr, EnumIter, EnumString};

use crate::{calendar, errors::SeisDataErr};

/// Value of an undefined float header variable.
pub const UNDEF_F: f32 = -12345.0;
/// Value of an undefined integer header variable.
pub const UNDEF_I: i32 = -12345;
/// Value of an undefined string header variable.
pub const UNDEF_K: &str = "-12345";

/// Header version written by this crate.
pub const NVHDR: i32 = 6;

/// Number of float words.
pub const NUM_FLOATS: usize = 70;
/// Number of integer and logical words.
pub const NUM_INTS: usize = 40;
/// Number of bytes of strings.
pub const NUM_CHARS: usize = 192;
/// Size of the header in bytes.
pub const HEADER_BYTES: usize = 4 * NUM_FLOATS + 4 * NUM_INTS + NUM_CHARS;

/// `iftype`: time series file.
pub const ITIME: i32 = 1;
/// `idep`: unknown units.
pub const IUNKN: i32 = 5;
/// `idep`: displacement in nm.
pub const IDISP: i32 = 6;
/// `idep`: velocity in nm/s.
pub const IVEL: i32 = 7;
/// `idep`: acceleration in nm/s/s.
pub const IACC: i32 = 8;
/// `iztype`: reference time is the begin time.
pub const IB: i32 = 9;
/// `iztype`: reference time is the event origin.
pub const IO: i32 = 11;

/// Float header variables.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumString, AsRefStr, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum FloatField {
    Delta,
    Depmin,
    Depmax,
    Scale,
    Odelta,
    B,
    E,
    O,
    A,
    T0,
    T1,
    T2,
    T3,
    T4,
    T5,
    T6,
    T7,
    T8,
    T9,
    F,
    Stla,
    Stlo,
    Stel,
    Stdp,
    Evla,
    Evlo,
    Evel,
    Evdp,
    Mag,
    User0,
    User1,
    User2,
    Dist,
    Az,
    Baz,
    Gcarc,
    Depmen,
    Cmpaz,
    Cmpinc,
}

impl FloatField {
    /// Word offset into the float section.
    pub fn index(self) -> usize {
        use FloatField::*;

        match self {
            Delta => 0,
            Depmin => 1,
            Depmax => 2,
            Scale => 3,
            Odelta => 4,
            B => 5,
            E => 6,
            O => 7,
            A => 8,
            T0 => 10,
            T1 => 11,
            T2 => 12,
            T3 => 13,
            T4 => 14,
            T5 => 15,
            T6 => 16,
            T7 => 17,
            T8 => 18,
            T9 => 19,
            F => 20,
            Stla => 31,
            Stlo => 32,
            Stel => 33,
            Stdp => 34,
            Evla => 35,
            Evlo => 36,
            Evel => 37,
            Evdp => 38,
            Mag => 39,
            User0 => 40,
            User1 => 41,
            User2 => 42,
            Dist => 50,
            Az => 51,
            Baz => 52,
            Gcarc => 53,
            Depmen => 56,
            Cmpaz => 57,
            Cmpinc => 58,
        }
    }
}

/// Integer, enumerated and logical header variables.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumString, AsRefStr, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum IntField {
    Nzyear,
    Nzjday,
    Nzhour,
    Nzmin,
    Nzsec,
    Nzmsec,
    Nvhdr,
    Norid,
    Nevid,
    Npts,
    Nwfid,
    Iftype,
    Idep,
    Iztype,
    Iinst,
    Istreg,
    Ievreg,
    Ievtyp,
    Iqual,
    Isynth,
    Imagtyp,
    Imagsrc,
    Leven,
    Lpspol,
    Lovrok,
    Lcalda,
}

impl IntField {
    /// Word offset into the integer section.
    pub fn index(self) -> usize {
        use IntField::*;

        match self {
            Nzyear => 0,
            Nzjday => 1,
            Nzhour => 2,
            Nzmin => 3,
            Nzsec => 4,
            Nzmsec => 5,
            Nvhdr => 6,
            Norid => 7,
            Nevid => 8,
            Npts => 9,
            Nwfid => 11,
            Iftype => 15,
            Idep => 16,
            Iztype => 17,
            Iinst => 19,
            Istreg => 20,
            Ievreg => 21,
            Ievtyp => 22,
            Iqual => 23,
            Isynth => 24,
            Imagtyp => 25,
            Imagsrc => 26,
            Leven => 35,
            Lpspol => 36,
            Lovrok => 37,
            Lcalda => 38,
        }
    }
}

/// String header variables.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumString, AsRefStr, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum CharField {
    Kstnm,
    Kevnm,
    Khole,
    Ko,
    Ka,
    Kt0,
    Kt1,
    Kt2,
    Kt3,
    Kt4,
    Kt5,
    Kt6,
    Kt7,
    Kt8,
    Kt9,
    Kf,
    Kuser0,
    Kuser1,
    Kuser2,
    Kcmpnm,
    Knetwk,
    Kdatrd,
    Kinst,
}

impl CharField {
    /// Byte offset and length in the string section.
    pub fn span(self) -> (usize, usize) {
        use CharField::*;

        match self {
            Kstnm => (0, 8),
            Kevnm => (8, 16),
            Khole => (24, 8),
            Ko => (32, 8),
            Ka => (40, 8),
            Kt0 => (48, 8),
            Kt1 => (56, 8),
            Kt2 => (64, 8),
            Kt3 => (72, 8),
            Kt4 => (80, 8),
            Kt5 => (88, 8),
            Kt6 => (96, 8),
            Kt7 => (104, 8),
            Kt8 => (112, 8),
            Kt9 => (120, 8),
            Kf => (128, 8),
            Kuser0 => (136, 8),
            Kuser1 => (144, 8),
            Kuser2 => (152, 8),
            Kcmpnm => (160, 8),
            Knetwk => (168, 8),
            Kdatrd => (176, 8),
            Kinst => (184, 8),
        }
    }
}

/// The header of a SAC file, stored as the raw words.
#[derive(Clone, Debug, PartialEq)]
pub struct SacHeader {
    pub(super) floats: [f32; NUM_FLOATS],
    pub(super) ints: [i32; NUM_INTS],
    pub(super) chars: [u8; NUM_CHARS],
}

impl Default for SacHeader {
    fn default() -> Self {
        let mut chars = [b' '; NUM_CHARS];
        // Every 8 byte slot starts as "-12345  ", kevnm is 16 bytes with one marker.
        for slot in (0..NUM_CHARS).step_by(8) {
            if slot == 16 {
                continue;
            }
            chars[slot..slot + UNDEF_K.len()].copy_from_slice(UNDEF_K.as_bytes());
        }

        let mut header = SacHeader {
            floats: [UNDEF_F; NUM_FLOATS],
            ints: [UNDEF_I; NUM_INTS],
            chars,
        };

        header.set_int(IntField::Nvhdr, NVHDR);
        header.set_int(IntField::Iftype, ITIME);
        header.set_logical(IntField::Leven, true);

        header
    }
}

impl SacHeader {
    /// Get a float value, `None` if undefined.
    pub fn float(&self, field: FloatField) -> Option<f32> {
        let val = self.floats[field.index()];
        if val == UNDEF_F {
            None
        } else {
            Some(val)
        }
    }

    #[allow(missing_docs)]
    pub fn set_float(&mut self, field: FloatField, val: f32) {
        self.floats[field.index()] = val;
    }

    /// Get an integer value, `None` if undefined.
    pub fn int(&self, field: IntField) -> Option<i32> {
        let val = self.ints[field.index()];
        if val == UNDEF_I {
            None
        } else {
            Some(val)
        }
    }

    #[allow(missing_docs)]
    pub fn set_int(&mut self, field: IntField, val: i32) {
        self.ints[field.index()] = val;
    }

    /// Logical values are stored as integers, anything but 1 is false.
    pub fn logical(&self, field: IntField) -> bool {
        self.ints[field.index()] == 1
    }

    #[allow(missing_docs)]
    pub fn set_logical(&mut self, field: IntField, val: bool) {
        self.ints[field.index()] = if val { 1 } else { 0 };
    }

    /// Get a string value with padding removed, `None` if undefined or blank.
    pub fn string(&self, field: CharField) -> Option<String> {
        let (start, len) = field.span();
        let raw = &self.chars[start..start + len];
        let val = String::from_utf8_lossy(raw)
            .trim_end_matches(|c: char| c == ' ' || c == '\0')
            .trim()
            .to_owned();

        if val.is_empty() || val == UNDEF_K {
            None
        } else {
            Some(val)
        }
    }

    /// Set a string value, it is truncated to fit.
    pub fn set_string(&mut self, field: CharField, val: &str) {
        let (start, len) = field.span();
        let slot = &mut self.chars[start..start + len];

        for b in slot.iter_mut() {
            *b = b' ';
        }
        for (dst, src) in slot.iter_mut().zip(val.bytes()) {
            *dst = src;
        }
    }

    /// Number of data points.
    pub fn npts(&self) -> usize {
        self.int(IntField::Npts).filter(|n| *n > 0).unwrap_or(0) as usize
    }

    /// The reference time from the `nz*` variables.
    pub fn reference_time(&self) -> Result<NaiveDateTime, SeisDataErr> {
        let get = |field: IntField| {
            self.int(field).ok_or_else(|| {
                SeisDataErr::InvalidSac(format!("undefined reference time field {}", field.as_ref()))
            })
        };

        let year = get(IntField::Nzyear)?;
        let jday = get(IntField::Nzjday)?;
        let hour = get(IntField::Nzhour)?;
        let minute = get(IntField::Nzmin)?;
        let second = get(IntField::Nzsec)?;
        let msec = get(IntField::Nzmsec)?;

        if jday <= 0 {
            return Err(SeisDataErr::InvalidDate(format!("nzjday {}", jday)));
        }
        let date = calendar::date_from_day_of_year(year, jday as u32)?;

        let part = |val: i32| u32::try_from(val).ok();
        match (part(hour), part(minute), part(second), part(msec)) {
            (Some(hh), Some(mm), Some(ss), Some(ms)) if ms < 1000 => {
                date.and_hms_milli_opt(hh, mm, ss, ms)
            }
            _ => None,
        }
        .ok_or_else(|| {
            SeisDataErr::InvalidDate(format!(
                "nzhour {} nzmin {} nzsec {} nzmsec {}",
                hour, minute, second, msec
            ))
        })
    }

    /// Set the `nz*` variables, sub-millisecond precision is dropped.
    pub fn set_reference_time(&mut self, time: &NaiveDateTime) {
        self.set_int(IntField::Nzyear, time.year());
        self.set_int(IntField::Nzjday, time.ordinal() as i32);
        self.set_int(IntField::Nzhour, time.hour() as i32);
        self.set_int(IntField::Nzmin, time.minute() as i32);
        self.set_int(IntField::Nzsec, time.second() as i32);
        self.set_int(IntField::Nzmsec, (time.nanosecond() / 1_000_000) as i32);
    }
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
