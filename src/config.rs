use crate::applier::{PoseApplier, PoseStrategy};
use crate::data::Identity;
use crate::participant::{Participant, ParticipantKind};
use crate::transport::Endpoint;
use crate::viewer::TemplateSpec;
use log::LevelFilter;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_HOST: &str = "localhost:42069";
pub const HOST_ENV: &str = "PHONE_PONG_HOST";

/// Rates outside this range either stall the loop or flood the socket.
pub const MIN_RATE_HZ: f32 = 0.1;
pub const MAX_RATE_HZ: f32 = 1000.0;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
    #[error("{0}")]
    Invalid(String),
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, ConfigError> {
    let display = path.display().to_string();
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: display.clone(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
        path: display,
        source,
    })
}

fn host_override(host: &mut String) {
    if let Ok(value) = std::env::var(HOST_ENV) {
        if !value.trim().is_empty() {
            *host = value;
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ObserverConfig {
    pub host: String,
    pub observer_id: Identity,
    /// Identity whose pose moves the camera, defaults to the head slot
    /// right before the observer slot.
    pub own_identity: Option<Identity>,
    pub strategy: PoseStrategy,
    pub position_scale: f32,
    pub retire_absent: bool,
    pub connect_timeout_ms: u64,
    pub log_level: LevelFilter,
    pub window_title: String,
    pub templates: BTreeMap<ParticipantKind, TemplateSpec>,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            observer_id: 2,
            own_identity: None,
            strategy: PoseStrategy::AxisRemapped,
            position_scale: 1.0,
            retire_absent: false,
            connect_timeout_ms: 5000,
            log_level: LevelFilter::Info,
            window_title: "phone pong observer".to_owned(),
            templates: TemplateSpec::defaults(),
        }
    }
}

impl ObserverConfig {
    /// Loads from an optional JSON file, then applies the host override.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config: Self = match path {
            Some(path) => read_json(path)?,
            None => Self::default(),
        };
        host_override(&mut config.host);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if ParticipantKind::for_identity(self.observer_id) != ParticipantKind::Observer {
            return Err(ConfigError::Invalid(format!(
                "observer_id {} is not an observer slot",
                self.observer_id
            )));
        }
        if !self.position_scale.is_finite() {
            return Err(ConfigError::Invalid("position_scale must be finite".to_owned()));
        }
        Ok(())
    }

    pub fn own_identity(&self) -> Option<Identity> {
        self.own_identity.or_else(|| self.observer_id.checked_sub(1))
    }

    pub fn applier(&self) -> PoseApplier {
        PoseApplier::new(self.strategy, self.position_scale)
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(
            &self.host,
            Participant::new(ParticipantKind::Observer, self.observer_id),
        )
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

fn check_rate(name: &str, rate: f32) -> Result<(), ConfigError> {
    if (MIN_RATE_HZ..=MAX_RATE_HZ).contains(&rate) {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{} must be between {} and {}, got {}",
            name, MIN_RATE_HZ, MAX_RATE_HZ, rate
        )))
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PublisherConfig {
    pub host: String,
    pub kind: ParticipantKind,
    pub id: Identity,
    pub frequency_hz: f32,
    pub deadzone: f32,
    pub acceleration_gain: f32,
    /// Directory of raw RGBA frames streamed as binary messages.
    pub frames_dir: Option<PathBuf>,
    pub frame_width: u32,
    pub frame_height: u32,
    pub frame_rate_hz: f32,
    pub connect_timeout_ms: u64,
    pub log_level: LevelFilter,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            kind: ParticipantKind::Racket,
            id: 0,
            frequency_hz: 60.0,
            deadzone: 0.2,
            acceleration_gain: 1.0,
            frames_dir: None,
            frame_width: 150,
            frame_height: 150,
            frame_rate_hz: 10.0,
            connect_timeout_ms: 5000,
            log_level: LevelFilter::Info,
        }
    }
}

impl PublisherConfig {
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config: Self = match path {
            Some(path) => read_json(path)?,
            None => Self::default(),
        };
        host_override(&mut config.host);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.kind.publishes() {
            return Err(ConfigError::Invalid(format!(
                "{} participants do not publish measurements",
                self.kind
            )));
        }
        check_rate("frequency_hz", self.frequency_hz)?;
        check_rate("frame_rate_hz", self.frame_rate_hz)?;
        if self.frame_width == 0 || self.frame_height == 0 {
            return Err(ConfigError::Invalid("frame size must be non-zero".to_owned()));
        }
        Ok(())
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs_f32(1.0 / self.frequency_hz)
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(&self.host, Participant::new(self.kind, self.id))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observer_defaults() {
        let config = ObserverConfig::default();
        config.validate().unwrap();
        assert_eq!(config.own_identity(), Some(1));
        assert_eq!(config.endpoint().participant.path(), "/observer/2");
        assert_eq!(config.applier(), PoseApplier::default());
    }

    #[test]
    fn observer_from_json() {
        let config: ObserverConfig = serde_json::from_str(
            r#"{"host": "https://pong.local/", "observer_id": 5, "strategy": "direct",
                "position_scale": 2000, "log_level": "debug"}"#,
        )
        .unwrap();
        config.validate().unwrap();
        assert_eq!(config.own_identity(), Some(4));
        assert_eq!(config.applier(), PoseApplier::new(PoseStrategy::Direct, 2000.0));
        assert_eq!(config.endpoint().url(), "ws://pong.local/observer/5");
        assert_eq!(config.log_level, LevelFilter::Debug);
        assert!(config.templates.contains_key(&ParticipantKind::Racket));
    }

    #[test]
    fn explicit_own_identity_wins() {
        let config = ObserverConfig {
            own_identity: Some(7),
            ..ObserverConfig::default()
        };
        assert_eq!(config.own_identity(), Some(7));
    }

    #[test]
    fn rejects_non_observer_slot() {
        let config = ObserverConfig {
            observer_id: 3,
            ..ObserverConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_unknown_fields() {
        let result = serde_json::from_str::<ObserverConfig>(r#"{"render_code": "x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn publisher_validation() {
        let config: PublisherConfig =
            serde_json::from_str(r#"{"kind": "eye", "id": 4, "frequency_hz": 30}"#).unwrap();
        config.validate().unwrap();
        assert_eq!(config.endpoint().participant.path(), "/head/4");
        assert_eq!(config.period(), Duration::from_secs_f32(1.0 / 30.0));

        let observer = PublisherConfig {
            kind: ParticipantKind::Observer,
            ..PublisherConfig::default()
        };
        assert!(observer.validate().is_err());
    }

    #[test]
    fn sample_configs_parse() {
        let observer: ObserverConfig =
            serde_json::from_str(include_str!("../config/observer.json")).unwrap();
        observer.validate().unwrap();
        assert_eq!(observer.templates, TemplateSpec::defaults());
        let publisher: PublisherConfig =
            serde_json::from_str(include_str!("../config/publisher.json")).unwrap();
        publisher.validate().unwrap();
    }

    #[test]
    fn publisher_rates_are_bounded() {
        for frequency_hz in &[1e-39, 0.0, -5.0, f32::NAN, f32::INFINITY, 5000.0] {
            let config = PublisherConfig {
                frequency_hz: *frequency_hz,
                ..PublisherConfig::default()
            };
            assert!(
                matches!(config.validate(), Err(ConfigError::Invalid(_))),
                "{} accepted",
                frequency_hz
            );
        }
        let slowest = PublisherConfig {
            frequency_hz: MIN_RATE_HZ,
            ..PublisherConfig::default()
        };
        slowest.validate().unwrap();
        assert_eq!(slowest.period(), Duration::from_secs_f32(1.0 / MIN_RATE_HZ));

        let frames = PublisherConfig {
            frame_rate_hz: 0.0,
            ..PublisherConfig::default()
        };
        assert!(frames.validate().is_err());
    }

    #[test]
    fn missing_file_is_reported() {
        let result = ObserverConfig::load(Some(Path::new("/nonexistent/phone_pong.json")));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
