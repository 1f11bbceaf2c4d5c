//! FDSN Mass Downloader.
//!
//! Downloads waveforms and station metadata inside a rectangular domain around every event in a
//! CSV event list.

use std::{error::Error, path::PathBuf};

use clap::Arg;
use seis_data::{read_events, CommonCmdLineArgs, MassDownloader, Restrictions, Storage};

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
    let app = CommonCmdLineArgs::new_app(
        "fdsndn",
        "Mass download waveforms from FDSN data centers for a list of events.",
    )
    .arg(
        Arg::with_name("events")
            .index(1)
            .default_value("events.csv")
            .help("CSV event list with a header row and the origin time in the first column."),
    )
    .arg(
        Arg::with_name("providers")
            .short("p")
            .long("providers")
            .takes_value(true)
            .help("Comma separated data center names or urls, e.g. IRIS,GFZ,SCEDC."),
    )
    .arg(
        Arg::with_name("mseed-root")
            .long("mseed-root")
            .takes_value(true)
            .help("Directory for the waveforms."),
    )
    .arg(
        Arg::with_name("stationxml-root")
            .long("stationxml-root")
            .takes_value(true)
            .help("Directory for the station metadata."),
    )
    .arg(
        Arg::with_name("location")
            .long("location")
            .takes_value(true)
            .help("Comma separated location patterns, replaces the location priorities."),
    )
    .arg(
        Arg::with_name("channel")
            .long("channel")
            .takes_value(true)
            .help("Comma separated channel patterns, replaces the channel priorities."),
    )
    .arg(
        Arg::with_name("min-distance")
            .long("min-distance")
            .takes_value(true)
            .help("Minimum distance between stations in meters."),
    );

    let (mut common_args, matches) = CommonCmdLineArgs::matches(app)?;

    {
        let fdsn = &mut common_args.config_mut().fdsn;
        if let Some(val) = matches.value_of("providers") {
            fdsn.providers = val.split(',').map(|p| p.trim().to_owned()).collect();
        }
        if let Some(val) = matches.value_of("mseed-root") {
            fdsn.mseed_root = PathBuf::from(val);
        }
        if let Some(val) = matches.value_of("stationxml-root") {
            fdsn.stationxml_root = PathBuf::from(val);
        }
        if let Some(val) = matches.value_of("location") {
            fdsn.location = Some(val.to_owned());
        }
        if let Some(val) = matches.value_of("channel") {
            fdsn.channel = Some(val.to_owned());
        }
        if let Some(val) = matches.value_of("min-distance") {
            fdsn.minimum_interstation_distance_in_m = val.parse()?;
        }
    }
    let config = &common_args.config().fdsn;

    let events_file = PathBuf::from(matches.value_of("events").ok_or("missing events")?);
    let events = read_events(&events_file)?;

    let mdl = MassDownloader::new(&config.providers, config.timeout_secs)?;
    let storage = Storage::new(&config.mseed_root, &config.stationxml_root);

    for event in &events {
        log::info!("event {} at {}", event.fname, event.origin);

        let restrictions = Restrictions::for_origin(&event.origin, config);
        let summary = mdl.download(event, &config.domain, &restrictions, &storage);

        log::info!(
            "event {}: {} stations, {} downloaded, {} already present, {} without data, {} failed",
            event.fname,
            summary.stations,
            summary.downloaded,
            summary.existing,
            summary.no_data,
            summary.failed
        );
    }

    Ok(())
}
