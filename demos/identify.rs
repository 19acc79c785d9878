use clap::{Arg, Command};
use log::LevelFilter;

use dds100_driver::Stage;

fn main() -> dds100_driver::Result<()> {
    let matches = Command::new("DDS100 identify")
        .about("Opens the stage and flashes the controller's front panel LED")
        .disable_version_flag(true)
        .arg(
            Arg::new("port")
                .help("The device path to a serial port")
                .required(true),
        )
        .get_matches();

    env_logger::Builder::from_default_env()
        .filter_level(LevelFilter::Info)
        .format_timestamp(None)
        .init();

    let mut stage = Stage::open(matches.value_of("port").unwrap())?;
    stage.identify()?;
    let info = stage.device_info();
    println!(
        "{} serial {} firmware {}: watch the front panel",
        info.model_str(),
        info.serial_number,
        info.firmware_version
    );
    stage.close();
    Ok(())
}
