//! Extracting SAC files and SAC pole-zero files from WIN32 data.

use std::{
    collections::{BTreeMap, HashMap},
    f64::consts::PI,
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

use chrono::NaiveDateTime;

use super::{read_channel_table, read_win32, seconds_after, Channel, SecondBlock};
use crate::{
    errors::SeisDataErr,
    sac::{CharField, FloatField, IntField, SacFile, SacHeader, IACC, IB, IDISP, IUNKN, IVEL},
};

// Pole-zero constants are normalized at this frequency.
const NORMALIZATION_FREQ_HZ: f64 = 20.0;

/// Options for `extract_sac` and `extract_pz`.
#[derive(Clone, Debug)]
pub struct ExtractOptions {
    /// Extension of the SAC files.
    pub suffix: String,
    /// Only these components, all if `None`.
    pub components: Option<Vec<String>>,
    /// Written to `knetwk` if set.
    pub network: Option<String>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        ExtractOptions {
            suffix: "SAC".to_owned(),
            components: None,
            network: None,
        }
    }
}

impl ExtractOptions {
    fn wants(&self, channel: &Channel) -> bool {
        match self.components {
            Some(ref comps) => comps.iter().any(|c| c == &channel.component),
            None => true,
        }
    }
}

// Continuous samples for one channel.
struct Series {
    start: NaiveDateTime,
    rate: u16,
    samples: Vec<i32>,
}

/// Convert a WIN32 file to one SAC file per channel in `outdir`. Returns the files written.
pub fn extract_sac(
    data: &Path,
    ctable: &Path,
    outdir: &Path,
    opts: &ExtractOptions,
) -> Result<Vec<PathBuf>, SeisDataErr> {
    let channels: HashMap<u16, Channel> = read_channel_table(ctable)?
        .into_iter()
        .filter(|ch| opts.wants(ch))
        .map(|ch| (ch.id, ch))
        .collect();

    let mut seconds = read_win32(data)?;
    seconds.sort_by_key(|sec| sec.time);

    let all_series = collect_series(&seconds, &channels);

    std::fs::create_dir_all(outdir)?;

    let mut written = vec![];
    for (id, series) in all_series {
        let channel = match channels.get(&id) {
            Some(channel) => channel,
            None => continue,
        };

        let sac = build_sac(channel, &series, opts);
        let path = outdir.join(format!("{}.{}", channel.name(), opts.suffix));
        sac.write(&path)?;
        written.push(path);
    }

    let missing = channels.len() - written.len();
    if missing > 0 {
        log::debug!(
            "{} channels in {} had no data in {}",
            missing,
            ctable.display(),
            data.display()
        );
    }

    Ok(written)
}

fn collect_series(seconds: &[SecondBlock], channels: &HashMap<u16, Channel>) -> BTreeMap<u16, Series> {
    let mut all_series: BTreeMap<u16, Series> = BTreeMap::new();

    for second in seconds {
        for block in &second.channels {
            if !channels.contains_key(&block.channel) {
                continue;
            }

            let series = all_series.entry(block.channel).or_insert_with(|| Series {
                start: second.time,
                rate: block.rate,
                samples: vec![],
            });

            if series.rate != block.rate {
                log::warn!(
                    "channel {:04X} changed rate from {} to {} at {}, skipping second",
                    block.channel,
                    series.rate,
                    block.rate,
                    second.time
                );
                continue;
            }

            let expected = seconds_after(&series.start, &second.time) * i64::from(series.rate);
            let have = series.samples.len() as i64;
            if expected > have {
                log::warn!(
                    "channel {:04X} missing {} samples before {}, filled with zeros",
                    block.channel,
                    expected - have,
                    second.time
                );
                series.samples.resize(expected as usize, 0);
            } else if expected < have {
                log::warn!(
                    "channel {:04X} has overlapping data at {}, skipping second",
                    block.channel,
                    second.time
                );
                continue;
            }

            series.samples.extend_from_slice(&block.samples);
        }
    }

    all_series
}

// Returns the SAC dependent variable type and the factor to nm based units.
fn unit_type(unit: &str) -> (i32, f64) {
    match unit {
        "m/s" => (IVEL, 1.0e9),
        "m/s/s" | "m/s2" => (IACC, 1.0e9),
        "m" => (IDISP, 1.0e9),
        _ => (IUNKN, 1.0),
    }
}

fn build_sac(channel: &Channel, series: &Series, opts: &ExtractOptions) -> SacFile {
    let (idep, to_nm) = unit_type(&channel.unit);
    let factor = channel.counts_to_unit() * to_nm;

    let mut header = SacHeader::default();
    header.set_float(FloatField::Delta, 1.0 / f32::from(series.rate));
    header.set_float(FloatField::B, 0.0);
    header.set_float(FloatField::Stla, channel.latitude as f32);
    header.set_float(FloatField::Stlo, channel.longitude as f32);
    header.set_float(FloatField::Stel, channel.elevation as f32);
    if let Some((az, inc)) = channel.orientation() {
        header.set_float(FloatField::Cmpaz, az);
        header.set_float(FloatField::Cmpinc, inc);
    }
    header.set_reference_time(&series.start);
    header.set_int(IntField::Idep, idep);
    header.set_int(IntField::Iztype, IB);
    header.set_string(CharField::Kstnm, &channel.station);
    header.set_string(CharField::Kcmpnm, &channel.component);
    if let Some(ref net) = opts.network {
        header.set_string(CharField::Knetwk, net);
    }

    let data = series
        .samples
        .iter()
        .map(|&count| (f64::from(count) * factor) as f32)
        .collect();

    SacFile::new(header, data)
}

/// Poles and normalization constant of a velocity sensor with the given natural period,
/// damping and overall sensitivity.
pub fn velocity_poles(period: f64, damping: f64, sensitivity: f64) -> Option<(f64, f64, f64)> {
    if period <= 0.0 || !(0.0..1.0).contains(&damping) {
        return None;
    }

    let w0 = 2.0 * PI / period;
    let real = -damping * w0;
    let imag = w0 * (1.0 - damping * damping).sqrt();

    // |(s^2 + 2 h w0 s + w0^2) / s^2| at s = i w
    let w = 2.0 * PI * NORMALIZATION_FREQ_HZ;
    let num_re = w0 * w0 - w * w;
    let num_im = 2.0 * damping * w0 * w;
    let a0 = (num_re * num_re + num_im * num_im).sqrt() / (w * w);

    Some((real, imag, a0 * sensitivity))
}

/// Write a SAC pole-zero file for every velocity channel in the table. Returns the files written.
pub fn extract_pz(
    ctable: &Path,
    outdir: &Path,
    opts: &ExtractOptions,
) -> Result<Vec<PathBuf>, SeisDataErr> {
    let channels = read_channel_table(ctable)?;

    std::fs::create_dir_all(outdir)?;

    let mut written = vec![];
    for channel in channels.iter().filter(|ch| opts.wants(ch)) {
        if unit_type(&channel.unit).0 != IVEL {
            continue;
        }

        let sensitivity = channel.sensitivity * 10f64.powf(channel.gain_db / 20.0);
        let (real, imag, constant) =
            match velocity_poles(channel.natural_period, channel.damping, sensitivity) {
                Some(pz) => pz,
                None => {
                    log::warn!(
                        "{}: period {} damping {} is not a velocity sensor response",
                        channel.name(),
                        channel.natural_period,
                        channel.damping
                    );
                    continue;
                }
            };

        let path = outdir.join(format!("{}.{}_PZ", channel.name(), opts.suffix));
        let mut file = File::create(&path)?;
        writeln!(file, "ZEROS 3")?;
        writeln!(file, "POLES 2")?;
        writeln!(file, "{:9.3} {:9.3}", real, imag)?;
        writeln!(file, "{:9.3} {:9.3}", real, -imag)?;
        writeln!(file, "CONSTANT {:>12}", scientific(constant, 8))?;

        written.push(path);
    }

    Ok(written)
}

// Signed two digit exponent, `4.21587651e+17`, the form other SAC_PZ writers use.
fn scientific(val: f64, precision: usize) -> String {
    let formatted = format!("{:.*e}", precision, val);
    match formatted.split_once('e') {
        Some((mantissa, exp)) => match exp.parse::<i32>() {
            Ok(exp) => format!(
                "{}e{}{:02}",
                mantissa,
                if exp < 0 { '-' } else { '+' },
                exp.abs()
            ),
            Err(_) => formatted,
        },
        None => formatted,
    }
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
