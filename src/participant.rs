use crate::data::Identity;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of identity slots handed out per player.
/// Slot `0` is the racket, `1` the head sensor and `2` the observer screen.
pub const SLOTS_PER_PLAYER: Identity = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantKind {
    Racket,
    #[serde(alias = "eye")]
    Head,
    Observer,
}

impl ParticipantKind {
    pub fn for_identity(id: Identity) -> Self {
        match id % SLOTS_PER_PLAYER {
            0 => ParticipantKind::Racket,
            1 => ParticipantKind::Head,
            _ => ParticipantKind::Observer,
        }
    }

    pub fn path_segment(self) -> &'static str {
        match self {
            ParticipantKind::Racket => "racket",
            ParticipantKind::Head => "head",
            ParticipantKind::Observer => "observer",
        }
    }

    /// Sensor bearing kinds publish measurements, observers only listen.
    pub fn publishes(self) -> bool {
        !matches!(self, ParticipantKind::Observer)
    }
}

impl fmt::Display for ParticipantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ParticipantError {
    #[error("unknown participant kind {0:?}")]
    UnknownKind(String),
    #[error("invalid participant id {0:?}")]
    InvalidId(String),
    #[error("expected a path of the form /<kind>/<id>, got {0:?}")]
    MalformedPath(String),
}

impl FromStr for ParticipantKind {
    type Err = ParticipantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "racket" => Ok(ParticipantKind::Racket),
            "head" | "eye" => Ok(ParticipantKind::Head),
            "observer" => Ok(ParticipantKind::Observer),
            other => Err(ParticipantError::UnknownKind(other.to_owned())),
        }
    }
}

/// A single connection's role and identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Participant {
    pub kind: ParticipantKind,
    pub id: Identity,
}

impl Participant {
    pub fn new(kind: ParticipantKind, id: Identity) -> Self {
        Self { kind, id }
    }

    pub fn path(&self) -> String {
        format!("/{}/{}", self.kind, self.id)
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

impl FromStr for Participant {
    type Err = ParticipantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut segments = s.trim_start_matches('/').split('/');
        match (segments.next(), segments.next(), segments.next()) {
            (Some(kind), Some(id), None) if !kind.is_empty() => {
                let kind = kind.parse()?;
                let id = id
                    .parse()
                    .map_err(|_| ParticipantError::InvalidId(id.to_owned()))?;
                Ok(Participant { kind, id })
            }
            _ => Err(ParticipantError::MalformedPath(s.to_owned())),
        }
    }
}
