use clap::{Arg, Command};
use log::LevelFilter;
use rand::Rng;

use dds100_driver::{MoveMode, Stage};

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp(None)
        .init();
}

fn main() -> dds100_driver::Result<()> {
    let matches = Command::new("DDS100 exercise")
        .about("Runs a DDS100 stage through its paces: range sweep, relative and random moves")
        .disable_version_flag(true)
        .arg(
            Arg::new("port")
                .help("The device path to a serial port")
                .required(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .takes_value(false)
                .help("Log the raw bytes of every exchange"),
        )
        .get_matches();

    init_logging(matches.is_present("verbose"));
    let port_name = matches.value_of("port").unwrap();

    let mut stage = Stage::open(port_name)?;

    println!("# Get position:");
    stage.get_position_mm()?;

    println!("# Test max range:");
    stage.move_mm(100.0, MoveMode::Absolute, true)?;
    stage.move_mm(0.0, MoveMode::Absolute, true)?;

    println!("# Some relative moves:");
    for _ in 0..3 {
        stage.move_mm(20.0, MoveMode::Relative, true)?;
    }
    for _ in 0..3 {
        stage.move_mm(-20.0, MoveMode::Relative, true)?;
    }

    println!("# Some random absolute moves:");
    let mut rng = rand::thread_rng();
    for _ in 0..3 {
        stage.move_mm(rng.gen_range(0.0..=100.0), MoveMode::Absolute, true)?;
    }

    println!("# Non-blocking move:");
    stage.move_mm(20.0, MoveMode::Absolute, false)?;
    // an immediate follow-up forces a finish on the pending move
    stage.move_mm(0.0, MoveMode::Absolute, false)?;
    println!("doing something else while the stage moves");
    stage.finish_move()?;

    stage.close();
    Ok(())
}
