use phone_pong::config::PublisherConfig;
use phone_pong::frames::FrameReplay;
use phone_pong::logging;
use phone_pong::publisher::{Publisher, Step};
use phone_pong::sensors::{gamepad_sensors, GamepadSettings, SensorReader};
use phone_pong::transport::Connection;

use anyhow::Result;
use log::*;
use std::path::PathBuf;
use std::thread::sleep;

fn main() -> Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = PublisherConfig::load(config_path.as_deref())?;
    logging::init(config.log_level)?;

    // no sensors means nothing to publish, bail before connecting
    let (orientation, acceleration) = gamepad_sensors(GamepadSettings {
        deadzone: config.deadzone,
        acceleration_gain: config.acceleration_gain,
    })?;
    let readers: Vec<Box<dyn SensorReader>> = vec![Box::new(acceleration), Box::new(orientation)];

    let connection = Connection::open(config.endpoint(), config.connect_timeout());
    info!("publishing to {}", connection.endpoint().url());
    let mut publisher = Publisher::new(connection, readers);
    if let Some(frames_dir) = &config.frames_dir {
        let frames = FrameReplay::open(
            frames_dir,
            config.frame_width,
            config.frame_height,
            config.frame_rate_hz,
        )?;
        publisher = publisher.with_frames(Box::new(frames));
    }

    let period = config.period();
    loop {
        sleep(period);
        match publisher.step() {
            Ok(Step::Sent(_)) => {}
            Ok(Step::Stopped) => break,
            Err(error) => {
                error!("{}", error);
                publisher.stop();
                break;
            }
        }
    }
    info!("{} {} stopped publishing", config.kind, config.id);
    Ok(())
}
