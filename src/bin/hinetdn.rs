//! Hi-net Downloader.
//!
//! Downloads continuous waveforms around every event in a CMT catalog and stores them with the
//! channel tables and a CMTSOLUTION file in one directory per event.

use std::{error::Error, path::PathBuf, thread::sleep, time::Duration};

use clap::Arg;
use seis_data::{
    layout, load_catalog, select_entries, Archive, CatalogEntry, CommonCmdLineArgs, EventWindow,
    HinetClient, HinetConfig, NetworkCode, SeisDataErr, WaveformRecord,
};

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
        "hinetdn",
        "Download Hi-net continuous waveforms for the events in a CMT catalog.",
    )
    .arg(
        Arg::with_name("cmt-file")
            .index(1)
            .required(true)
            .help("The CMT catalog."),
    )
    .arg(
        Arg::with_name("out-dir")
            .index(2)
            .required(true)
            .help("Where to store the event directories."),
    )
    .arg(
        Arg::with_name("netid")
            .index(3)
            .required(true)
            .help("Comma separated network codes or names, e.g. 0101,0103 or hinet,fnet."),
    )
    .arg(
        Arg::with_name("start-line")
            .long("start-line")
            .takes_value(true)
            .help("Skip catalog entries before this line (zero based)."),
    )
    .arg(
        Arg::with_name("min-mag")
            .long("min-mag")
            .takes_value(true)
            .help("Only events with a larger magnitude."),
    )
    .arg(
        Arg::with_name("max-mag")
            .long("max-mag")
            .takes_value(true)
            .help("Only events with a smaller magnitude."),
    )
    .arg(
        Arg::with_name("before")
            .long("before")
            .takes_value(true)
            .help("Minutes of data before the origin time."),
    )
    .arg(
        Arg::with_name("duration")
            .long("duration")
            .takes_value(true)
            .help("Minutes of data to download."),
    )
    .arg(
        Arg::with_name("force")
            .long("force")
            .help("Download again even if the index says it is done."),
    )
    .arg(
        Arg::with_name("dry-run")
            .long("dry-run")
            .help("Only print what would be downloaded."),
    );

    let (mut common_args, matches) = CommonCmdLineArgs::matches(app)?;

    {
        let hinet = &mut common_args.config_mut().hinet;
        if let Some(val) = matches.value_of("start-line") {
            hinet.start_line = val.parse()?;
        }
        if let Some(val) = matches.value_of("min-mag") {
            hinet.min_magnitude = val.parse()?;
        }
        if let Some(val) = matches.value_of("max-mag") {
            hinet.max_magnitude = val.parse()?;
        }
        if let Some(val) = matches.value_of("before") {
            hinet.before_minutes = val.parse()?;
        }
        if let Some(val) = matches.value_of("duration") {
            hinet.duration_minutes = val.parse()?;
        }
    }
    let config = &common_args.config().hinet;

    let cmt_file = PathBuf::from(matches.value_of("cmt-file").ok_or("missing cmt-file")?);
    let out_dir = PathBuf::from(matches.value_of("out-dir").ok_or("missing out-dir")?);
    let codes = NetworkCode::parse_list(matches.value_of("netid").ok_or("missing netid")?)?;
    let force = matches.is_present("force");
    let dry_run = matches.is_present("dry-run");

    std::fs::create_dir_all(&out_dir)?;
    let arch = Archive::create_or_connect(&out_dir)?;
    let catalog = load_catalog(&cmt_file)?;

    let client = if dry_run {
        None
    } else {
        Some(
            HinetClient::login(&config.user, &config.password)?
                .with_polling(config.poll_interval_secs, config.request_timeout_secs),
        )
    };

    select_entries(&catalog, config)
        .into_iter()
        .for_each(|entry| {
            let window = EventWindow::for_event(&entry.cmt.header, config);
            log::info!(
                "line {}: event {} M{} from {} for {} minutes",
                entry.line,
                window.event_id,
                entry.cmt.header.magnitude(),
                window.request_start(),
                window.span_minutes
            );

            match client {
                Some(ref client) => {
                    download_event(client, &arch, entry, &window, &codes, config, force)
                }
                None => print_plan(&arch, &window, &codes, force),
            }
        });

    Ok(())
}

fn download_event(
    client: &HinetClient,
    arch: &Archive,
    entry: &CatalogEntry,
    window: &EventWindow,
    codes: &[NetworkCode],
    config: &HinetConfig,
    force: bool,
) {
    let evid = &window.event_id;
    let event_dir = arch.root().join(evid);
    let mut any_success = false;

    for code in codes {
        if !force && arch.exists(evid, code).unwrap_or(false) {
            log::info!("ev:{}, net:{} already downloaded", evid, code);
            any_success = true;
            continue;
        }

        let data_name = layout::data_file_name(evid, code);
        let ctable_name = layout::ctable_file_name(code);

        let res = client.get_continuous_waveform(
            code,
            &window.request_start(),
            window.span_minutes,
            Some(&data_name),
            Some(&ctable_name),
            &event_dir,
        );

        match res {
            Ok((data_file, ctable_file)) => {
                any_success = true;

                let record = WaveformRecord {
                    event_id: evid.clone(),
                    network: code.to_string(),
                    start_time: window.request_start(),
                    span_minutes: window.span_minutes,
                    data_file,
                    ctable_file,
                };
                if let Err(err) = index(arch, entry, &record) {
                    log::warn!("ev:{}, net:{} not added to the index: {}", evid, code, err);
                }
            }
            Err(err) => {
                log::warn!("ev:{}, net:{} error", evid, code);
                log::warn!("  {}", err);
                sleep(Duration::from_secs(config.error_pause_secs));
            }
        }
    }

    if any_success {
        let path = event_dir.join(layout::CMTSOLUTION);
        if let Err(err) = entry.cmt.write(&path) {
            log::warn!("could not write {}: {}", path.display(), err);
        }
    }
}

fn index(arch: &Archive, entry: &CatalogEntry, record: &WaveformRecord) -> Result<(), SeisDataErr> {
    arch.add_event(&entry.cmt)?;
    arch.add_waveform(record)
}

fn print_plan(arch: &Archive, window: &EventWindow, codes: &[NetworkCode], force: bool) {
    for code in codes {
        let done = !force && arch.exists(&window.event_id, code).unwrap_or(false);

        println!(
            "{} {} {} {} min -> {}{}",
            window.event_id,
            code,
            window.request_start().format("%Y-%m-%d %H:%M"),
            window.span_minutes,
            arch.root()
                .join(&window.event_id)
                .join(layout::data_file_name(&window.event_id, code))
                .display(),
            if done { " (done)" } else { "" }
        );
    }
}
