//! The NIED WIN32 continuous waveform container.
//!
//! A file is a 4 byte file header followed by one block per second of data. Each second block
//! starts with 8 bytes of BCD time (`YYYY MM DD hh mm ss` and hundredths), a 4 byte frame length
//! in tenths of a second and a 4 byte length of the channel data that follows. Every channel
//! block in the second holds an organization id, a network id, a channel id, a 4 bit sample size
//! code with a 12 bit sampling rate, the first sample and then `rate - 1` differences. Everything
//! is big endian.

use std::path::Path;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};

use crate::errors::SeisDataErr;

pub use self::ctable::{read_channel_table, Channel};
pub use self::extract::{extract_pz, extract_sac, ExtractOptions};

mod ctable;
mod extract;

/// Size of the file header.
pub const FILE_HEADER_BYTES: usize = 4;
/// File header written by this crate.
pub const FILE_HEADER: [u8; FILE_HEADER_BYTES] = [0x0A, 0x02, 0x00, 0x00];

// time (8) + frame length (4) + data block length (4)
const SECOND_HEADER_BYTES: usize = 16;
// org (1) + net (1) + channel (2) + size and rate (2) + first sample (4)
const CHANNEL_HEADER_BYTES: usize = 10;

/// The data for a channel in one second.
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelBlock {
    /// Organization id.
    pub org: u8,
    /// Network id.
    pub net: u8,
    /// Channel id, matches the hex id in the channel table.
    pub channel: u16,
    /// Samples per second.
    pub rate: u16,
    /// Integrated samples in counts.
    pub samples: Vec<i32>,
}

/// One second of data for all channels.
#[derive(Clone, Debug, PartialEq)]
pub struct SecondBlock {
    /// Start of the second, as recorded (JST for Hi-net data).
    pub time: NaiveDateTime,
    /// Frame length in tenths of a second.
    pub frame_tenths: u32,
    #[allow(missing_docs)]
    pub channels: Vec<ChannelBlock>,
}

/// Read and decode a file.
pub fn read_win32(path: &Path) -> Result<Vec<SecondBlock>, SeisDataErr> {
    if !path.exists() {
        return Err(SeisDataErr::MissingFile(path.to_path_buf()));
    }

    let bytes = std::fs::read(path)?;
    decode(&bytes)
}

/// Decode a whole file held in memory.
pub fn decode(bytes: &[u8]) -> Result<Vec<SecondBlock>, SeisDataErr> {
    if bytes.len() < FILE_HEADER_BYTES {
        return Err(SeisDataErr::InvalidWin32("missing file header".to_owned()));
    }

    let mut cursor = FILE_HEADER_BYTES;
    let mut seconds = vec![];

    while cursor < bytes.len() {
        let (second, used) = decode_second(&bytes[cursor..])
            .map_err(|err| add_context(err, cursor))?;
        seconds.push(second);
        cursor += used;
    }

    Ok(seconds)
}

fn add_context(err: SeisDataErr, offset: usize) -> SeisDataErr {
    match err {
        SeisDataErr::InvalidWin32(msg) => {
            SeisDataErr::InvalidWin32(format!("{} (second block at byte {})", msg, offset))
        }
        other => other,
    }
}

fn decode_second(bytes: &[u8]) -> Result<(SecondBlock, usize), SeisDataErr> {
    if bytes.len() < SECOND_HEADER_BYTES {
        return Err(SeisDataErr::InvalidWin32("truncated second header".to_owned()));
    }

    let time = decode_time(&bytes[0..8])?;
    let frame_tenths = read_u32(&bytes[8..12]);
    let block_len = read_u32(&bytes[12..16]) as usize;

    let end = SECOND_HEADER_BYTES + block_len;
    if bytes.len() < end {
        return Err(SeisDataErr::InvalidWin32(format!(
            "block says {} bytes, only {} left",
            block_len,
            bytes.len() - SECOND_HEADER_BYTES
        )));
    }

    let mut channels = vec![];
    let mut cursor = SECOND_HEADER_BYTES;
    while cursor < end {
        let (channel, used) = decode_channel(&bytes[cursor..end])?;
        channels.push(channel);
        cursor += used;
    }

    Ok((
        SecondBlock {
            time,
            frame_tenths,
            channels,
        },
        end,
    ))
}

fn decode_channel(bytes: &[u8]) -> Result<(ChannelBlock, usize), SeisDataErr> {
    if bytes.len() < CHANNEL_HEADER_BYTES {
        return Err(SeisDataErr::InvalidWin32("truncated channel header".to_owned()));
    }

    let org = bytes[0];
    let net = bytes[1];
    let channel = u16::from_be_bytes([bytes[2], bytes[3]]);
    let size_rate = u16::from_be_bytes([bytes[4], bytes[5]]);
    let size_code = (size_rate >> 12) as u8;
    let rate = size_rate & 0x0fff;

    if rate == 0 {
        return Err(SeisDataErr::InvalidWin32(format!(
            "channel {:04X} has zero sampling rate",
            channel
        )));
    }

    let diff_bytes = difference_bytes(size_code, rate as usize - 1).ok_or_else(|| {
        SeisDataErr::InvalidWin32(format!(
            "channel {:04X} has invalid sample size code {}",
            channel, size_code
        ))
    })?;

    let used = CHANNEL_HEADER_BYTES + diff_bytes;
    if bytes.len() < used {
        return Err(SeisDataErr::InvalidWin32(format!(
            "channel {:04X} needs {} bytes, {} left",
            channel,
            used,
            bytes.len()
        )));
    }

    let first = read_u32(&bytes[6..10]) as i32;
    let diffs = &bytes[CHANNEL_HEADER_BYTES..used];

    let mut samples = Vec::with_capacity(rate as usize);
    samples.push(first);
    let mut current = first;
    for i in 0..(rate as usize - 1) {
        let diff = read_difference(diffs, size_code, i);
        current = current.wrapping_add(diff);
        samples.push(current);
    }

    Ok((
        ChannelBlock {
            org,
            net,
            channel,
            rate,
            samples,
        },
        used,
    ))
}

// Bytes used by `count` differences with the given size code.
fn difference_bytes(size_code: u8, count: usize) -> Option<usize> {
    match size_code {
        0 => Some((count + 1) / 2),
        1..=4 => Some(count * size_code as usize),
        _ => None,
    }
}

fn read_difference(diffs: &[u8], size_code: u8, i: usize) -> i32 {
    match size_code {
        0 => {
            let byte = diffs[i / 2];
            let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
            // sign extend the 4 bit value
            ((nibble << 4) as i8 >> 4) as i32
        }
        1 => diffs[i] as i8 as i32,
        2 => i16::from_be_bytes([diffs[2 * i], diffs[2 * i + 1]]) as i32,
        3 => {
            let b = &diffs[3 * i..3 * i + 3];
            // place in the top three bytes then shift down to sign extend
            i32::from_be_bytes([b[0], b[1], b[2], 0]) >> 8
        }
        _ => read_u32(&diffs[4 * i..4 * i + 4]) as i32,
    }
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn bcd(byte: u8) -> Result<u32, SeisDataErr> {
    let (hi, lo) = (byte >> 4, byte & 0x0f);
    if hi > 9 || lo > 9 {
        return Err(SeisDataErr::InvalidWin32(format!("bad BCD byte {:#04x}", byte)));
    }
    Ok(u32::from(hi) * 10 + u32::from(lo))
}

fn to_bcd(val: u32) -> u8 {
    (((val / 10) % 10) << 4 | (val % 10)) as u8
}

fn decode_time(bytes: &[u8]) -> Result<NaiveDateTime, SeisDataErr> {
    let year = bcd(bytes[0])? * 100 + bcd(bytes[1])?;
    let month = bcd(bytes[2])?;
    let day = bcd(bytes[3])?;
    let hour = bcd(bytes[4])?;
    let minute = bcd(bytes[5])?;
    let second = bcd(bytes[6])?;
    let hundredths = bcd(bytes[7])?;

    NaiveDate::from_ymd_opt(year as i32, month, day)
        .and_then(|date| date.and_hms_milli_opt(hour, minute, second, hundredths * 10))
        .ok_or_else(|| {
            SeisDataErr::InvalidWin32(format!(
                "bad time {:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                year, month, day, hour, minute, second
            ))
        })
}

fn encode_time(time: &NaiveDateTime) -> [u8; 8] {
    let year = time.year() as u32;
    [
        to_bcd(year / 100),
        to_bcd(year % 100),
        to_bcd(time.month()),
        to_bcd(time.day()),
        to_bcd(time.hour()),
        to_bcd(time.minute()),
        to_bcd(time.second()),
        to_bcd(time.nanosecond() / 10_000_000),
    ]
}

/// Encode second blocks into a file, using 4 byte differences.
pub fn encode(seconds: &[SecondBlock]) -> Vec<u8> {
    let mut bytes = FILE_HEADER.to_vec();

    for second in seconds {
        let mut block = vec![];
        for ch in &second.channels {
            let rate = ch.samples.len().min(0x0fff) as u16;
            block.push(ch.org);
            block.push(ch.net);
            block.extend_from_slice(&ch.channel.to_be_bytes());
            block.extend_from_slice(&((4u16 << 12) | rate).to_be_bytes());

            let mut prev = ch.samples.first().copied().unwrap_or(0);
            block.extend_from_slice(&prev.to_be_bytes());
            for &sample in ch.samples.iter().take(rate as usize).skip(1) {
                block.extend_from_slice(&sample.wrapping_sub(prev).to_be_bytes());
                prev = sample;
            }
        }

        bytes.extend_from_slice(&encode_time(&second.time));
        bytes.extend_from_slice(&second.frame_tenths.to_be_bytes());
        bytes.extend_from_slice(&(block.len() as u32).to_be_bytes());
        bytes.extend_from_slice(&block);
    }

    bytes
}

/// Join several files into one, keeping only the file header of the first.
pub fn concatenate<B: AsRef<[u8]>>(files: &[B]) -> Vec<u8> {
    let mut joined = vec![];

    for file in files {
        let file = file.as_ref();
        if file.len() < FILE_HEADER_BYTES {
            continue;
        }

        if joined.is_empty() {
            joined.extend_from_slice(file);
        } else {
            joined.extend_from_slice(&file[FILE_HEADER_BYTES..]);
        }
    }

    joined
}

/// Offset of a second block relative to a start time, in whole seconds.
pub(crate) fn seconds_after(start: &NaiveDateTime, time: &NaiveDateTime) -> i64 {
    let diff: Duration = *time - *start;
    diff.num_seconds()
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
#[cfg(test)]
mod unit {
    use super::*;

    pub(crate) fn second(sec: u32, channels: Vec<ChannelBlock>) -> SecondBlock {
        SecondBlock {
            time: NaiveDate::from_ymd_opt(2011, 3, 11)
                .unwrap()
                .and_hms_opt(14, 46, sec)
                .unwrap(),
            frame_tenths: 10,
            channels,
        }
    }

    #[test]
    fn test_decode_small_differences() {
        // 4 bit and 1 byte differences, hand assembled.
        let mut bytes = FILE_HEADER.to_vec();
        let mut block = vec![];

        // channel 0x3001, size 0, 5 samples: first 100, diffs +1 -1 +7 -8
        block.extend_from_slice(&[0x01, 0x01, 0x30, 0x01, 0x00, 0x05]);
        block.extend_from_slice(&100i32.to_be_bytes());
        block.extend_from_slice(&[0x1f, 0x78]);

        // channel 0x3002, size 1, 3 samples: first -5, diffs -128 +127
        block.extend_from_slice(&[0x01, 0x01, 0x30, 0x02, 0x10, 0x03]);
        block.extend_from_slice(&(-5i32).to_be_bytes());
        block.extend_from_slice(&[0x80, 0x7f]);

        bytes.extend_from_slice(&[0x20, 0x11, 0x03, 0x11, 0x14, 0x46, 0x00, 0x00]);
        bytes.extend_from_slice(&10u32.to_be_bytes());
        bytes.extend_from_slice(&(block.len() as u32).to_be_bytes());
        bytes.extend_from_slice(&block);

        let seconds = decode(&bytes).unwrap();
        assert_eq!(seconds.len(), 1);
        assert_eq!(seconds[0].time, second(0, vec![]).time);

        let chans = &seconds[0].channels;
        assert_eq!(chans[0].channel, 0x3001);
        assert_eq!(chans[0].samples, vec![100, 101, 100, 107, 99]);
        assert_eq!(chans[1].rate, 3);
        assert_eq!(chans[1].samples, vec![-5, -133, -6]);
    }

    #[test]
    fn test_three_byte_differences() {
        let diffs = [0xff, 0xff, 0xfe, 0x01, 0x00, 0x00];
        assert_eq!(read_difference(&diffs, 3, 0), -2);
        assert_eq!(read_difference(&diffs, 3, 1), 65536);
    }

    #[test]
    fn test_encode_then_decode() {
        let ch = ChannelBlock {
            org: 1,
            net: 1,
            channel: 0x1234,
            rate: 4,
            samples: vec![i32::MAX, -3, 1_000_000, 0],
        };
        let seconds = vec![second(0, vec![ch.clone()]), second(1, vec![ch])];

        assert_eq!(decode(&encode(&seconds)).unwrap(), seconds);
    }

    #[test]
    fn test_concatenate() {
        let first = encode(&[second(0, vec![])]);
        let second_file = encode(&[second(1, vec![])]);

        let joined = concatenate(&[first.clone(), second_file.clone()]);
        assert_eq!(joined.len(), first.len() + second_file.len() - FILE_HEADER_BYTES);
        assert_eq!(decode(&joined).unwrap().len(), 2);
    }

    #[test]
    fn test_bad_data() {
        assert!(decode(&[0x0a]).is_err());

        let mut bytes = encode(&[second(0, vec![])]);
        bytes[6] = 0x1a; // not BCD
        assert!(decode(&bytes).is_err());

        let mut bytes = encode(&[second(
            0,
            vec![ChannelBlock {
                org: 1,
                net: 1,
                channel: 1,
                rate: 2,
                samples: vec![1, 2],
            }],
        )]);
        bytes.truncate(bytes.len() - 2);
        assert!(decode(&bytes).is_err());
    }
}
