//! SAC Time Revise.
//!
//! Moves the reference times of SAC files from Japan Standard Time to UTC and sets the origin
//! time `o` to the centroid time of the event.

use std::{error::Error, path::PathBuf};

use clap::Arg;
use seis_data::{
    layout, revise_event, CommonCmdLineArgs, HeaderWriter, NativeWriter, SacProcessWriter,
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
        "sacrev",
        "Correct SAC reference times to UTC and set the centroid origin time.",
    )
    .arg(
        Arg::with_name("input-dir")
            .index(1)
            .required(true)
            .help("Directory of event directories, each with a CMTSOLUTION file."),
    )
    .arg(
        Arg::with_name("sub-input-dir")
            .index(2)
            .required(true)
            .help("Name of the directory holding the SAC files in each event, e.g. SAC."),
    )
    .arg(
        Arg::with_name("sub-output-dir")
            .index(3)
            .required(true)
            .help("Name of the directory for the corrected files in each event, e.g. rSAC."),
    )
    .arg(
        Arg::with_name("sac-bin")
            .long("sac-bin")
            .takes_value(true)
            .help("Change the headers by running this sac program instead."),
    )
    .arg(
        Arg::with_name("tz-offset")
            .long("tz-offset")
            .takes_value(true)
            .allow_hyphen_values(true)
            .help("Hours the recorded times are ahead of UTC, default 9."),
    );

    let (mut common_args, matches) = CommonCmdLineArgs::matches(app)?;

    {
        let sac = &mut common_args.config_mut().sac;
        if let Some(val) = matches.value_of("tz-offset") {
            sac.timezone_offset_hours = val.parse()?;
        }
        if let Some(val) = matches.value_of("sac-bin") {
            sac.sac_bin = Some(PathBuf::from(val));
        }
    }
    let config = &common_args.config().sac;

    let input_dir = PathBuf::from(matches.value_of("input-dir").ok_or("missing input-dir")?);
    let sub_in = matches.value_of("sub-input-dir").ok_or("missing sub-input-dir")?;
    let sub_out = matches.value_of("sub-output-dir").ok_or("missing sub-output-dir")?;

    let writer: Box<dyn HeaderWriter> = match config.sac_bin {
        Some(ref sac_bin) => Box::new(SacProcessWriter::new(sac_bin)),
        None => Box::new(NativeWriter),
    };

    for event_dir in layout::event_dirs(&input_dir)? {
        let res = revise_event(
            &event_dir,
            sub_in,
            sub_out,
            config.timezone_offset_hours,
            writer.as_ref(),
        );

        match res {
            Ok(count) => log::info!("{}: {} files", event_dir.display(), count),
            Err(err) => log::warn!("skipping {}: {}", event_dir.display(), err),
        }
    }

    Ok(())
}
