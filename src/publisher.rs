use crate::frames::FrameSource;
use crate::sensors::{SensorError, SensorReader};
use crate::transport::{Channel, TransportError, TransportEvent};
use log::*;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PublishError {
    #[error(transparent)]
    Sensor(#[from] SensorError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("failed to encode measurement: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Number of readings and frames handed to the channel.
    Sent(usize),
    Stopped,
}

/// Forwards sensor readings over a channel for as long as it stays open.
///
/// Readings taken before the channel reports connected are dropped, not
/// queued. The publisher owns its readers and frame source, they are
/// released as soon as the channel reports closed or errored, on
/// [`Publisher::stop`], or on drop.
pub struct Publisher<C: Channel> {
    channel: C,
    readers: Vec<Box<dyn SensorReader>>,
    frames: Option<Box<dyn FrameSource>>,
    connected: bool,
}

impl<C: Channel> Publisher<C> {
    pub fn new(channel: C, readers: Vec<Box<dyn SensorReader>>) -> Self {
        Self {
            channel,
            readers,
            frames: None,
            connected: false,
        }
    }

    pub fn with_frames(mut self, frames: Box<dyn FrameSource>) -> Self {
        self.frames = Some(frames);
        self
    }

    pub fn is_running(&self) -> bool {
        !self.readers.is_empty() || self.frames.is_some()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn stop(&mut self) {
        if self.is_running() {
            info!("releasing {} sensor readers", self.readers.len());
        }
        self.readers.clear();
        self.frames = None;
        self.connected = false;
    }

    fn drain_events(&mut self) {
        while let Some(event) = self.channel.poll_event() {
            match event {
                TransportEvent::Connected => {
                    info!("publisher connected");
                    self.connected = true;
                }
                TransportEvent::Closed(reason) => {
                    info!("publisher connection closed [{:?}]", reason);
                    self.stop();
                }
                TransportEvent::Error(error) => {
                    error!("publisher connection error [{}]", error);
                    self.stop();
                }
                TransportEvent::Message(payload) => trace!("ignoring inbound {:?}", payload),
                TransportEvent::Connecting => debug!("publisher connecting"),
            }
        }
    }

    pub fn step(&mut self) -> Result<Step, PublishError> {
        self.drain_events();
        if !self.is_running() {
            return Ok(Step::Stopped);
        }

        match self.forward() {
            Ok(sent) => Ok(Step::Sent(sent)),
            Err(PublishError::Transport(error)) => {
                // the channel reports why it went away through its events
                self.drain_events();
                if self.is_running() {
                    Err(PublishError::Transport(error))
                } else {
                    Ok(Step::Stopped)
                }
            }
            Err(error) => Err(error),
        }
    }

    fn forward(&mut self) -> Result<usize, PublishError> {
        let mut sent = 0;
        for reader in self.readers.iter_mut() {
            if let Some(measurement) = reader.poll()? {
                if !self.connected {
                    trace!("not connected, dropping {} reading", reader.name());
                    continue;
                }
                trace!("{} reading {:?}", reader.name(), measurement);
                self.channel.send_text(measurement.to_json()?)?;
                sent += 1;
            }
        }
        if let Some(frames) = self.frames.as_mut() {
            if let Some(frame) = frames.poll_frame()? {
                if self.connected {
                    self.channel.send_binary(frame)?;
                    sent += 1;
                }
            }
        }
        Ok(sent)
    }
}
