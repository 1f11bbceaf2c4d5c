//! WIN32 to SAC.
//!
//! Converts the waveforms downloaded by `hinetdn` into SAC files, writes SAC pole-zero files for
//! the velocity channels and a STATIONS list for every event.

use std::{error::Error, path::PathBuf};

use clap::Arg;
use seis_data::{convert_event, layout, CommonCmdLineArgs, ExtractOptions, NetworkCode};

fn main() {
    if let Err(ref e) = run() {
        println!("error: {}", e);

        let mut err: &dyn Error = e.as_ref();
        while let Some(cause) = err.source() {
            println!("caused by: {}", cause);
            err = cause;
        }

        ::std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let app = CommonCmdLineArgs::new_app("win32sac", "Convert downloaded WIN32 data to SAC.")
        .arg(
            Arg::with_name("input-dir")
                .index(1)
                .required(true)
                .help("Directory of event directories made by hinetdn."),
        )
        .arg(
            Arg::with_name("output-dir")
                .index(2)
                .required(true)
                .help("Where to write the converted event directories."),
        )
        .arg(
            Arg::with_name("netid")
                .index(3)
                .required(true)
                .help("Comma separated network codes or names, e.g. 0101,0103."),
        )
        .arg(
            Arg::with_name("components")
                .long("components")
                .takes_value(true)
                .help("Comma separated components to keep, e.g. U,N,E. Default is all."),
        )
        .arg(
            Arg::with_name("network-name")
                .long("network-name")
                .takes_value(true)
                .help("Network name written to the SAC headers and STATIONS file."),
        );

    let (_common_args, matches) = CommonCmdLineArgs::matches(app)?;

    let input_dir = PathBuf::from(matches.value_of("input-dir").ok_or("missing input-dir")?);
    let output_dir = PathBuf::from(matches.value_of("output-dir").ok_or("missing output-dir")?);
    let codes = NetworkCode::parse_list(matches.value_of("netid").ok_or("missing netid")?)?;

    let opts = ExtractOptions {
        components: matches
            .value_of("components")
            .map(|list| list.split(',').map(|c| c.trim().to_owned()).collect()),
        network: matches.value_of("network-name").map(ToOwned::to_owned),
        ..ExtractOptions::default()
    };

    std::fs::create_dir_all(&output_dir)?;

    for event_dir in layout::event_dirs(&input_dir)? {
        let evid = layout::file_name_string(&event_dir);
        log::info!("{}", evid);

        match convert_event(&event_dir, &output_dir.join(&evid), &codes, &opts) {
            Ok(summary) => log::info!(
                "{}: {} SAC files, {} SAC_PZ files, {} stations",
                evid,
                summary.sac_files,
                summary.pz_files,
                summary.stations
            ),
            Err(err) => log::warn!("{}: {}", evid, err),
        }
    }

    Ok(())
}
