use phone_pong::config::ObserverConfig;
use phone_pong::logging;
use phone_pong::session::{ObserverSession, SessionError};
use phone_pong::transport::{Channel, Connection};
use phone_pong::viewer::Viewer;

use anyhow::Result;
use log::*;
use std::path::PathBuf;

fn main() -> Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = ObserverConfig::load(config_path.as_deref())?;
    logging::init(config.log_level)?;

    let viewer = Viewer::new(&config.window_title, config.templates.clone())?;
    let mut session = ObserverSession::new(viewer, config.applier(), config.own_identity())
        .retire_absent(config.retire_absent);
    let mut connection = Connection::open(config.endpoint(), config.connect_timeout());
    info!("observing {}", connection.endpoint().url());

    while session.scene_mut().render() {
        while let Some(event) = connection.poll_event() {
            match session.handle_event(event) {
                Ok(()) => {}
                Err(error @ SessionError::Decode(_)) => warn!("{}", error),
                Err(error) => error!("{}", error),
            }
        }
    }
    info!("window closed, shutting down");
    Ok(())
}
