use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub type Identity = u32;
pub type Vec3 = [f32; 3];
/// Components in `(x, y, z, w)` order, not guaranteed to be normalized
pub type Quaternion = [f32; 4];

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    #[serde(alias = "rotation")]
    pub orientation: Quaternion,
}

/// One decoded message from the observer stream.
pub type PoseBatch = BTreeMap<Identity, Pose>;

/// Raw frame handed over by the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Binary(Vec<u8>),
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("expected a text frame, got {0} binary bytes")]
    NotText(usize),
    #[error("malformed pose batch: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub fn decode_batch(payload: &Payload) -> Result<PoseBatch, DecodeError> {
    match payload {
        Payload::Text(text) => decode_text(text),
        Payload::Binary(bytes) => Err(DecodeError::NotText(bytes.len())),
    }
}

pub fn decode_text(text: &str) -> Result<PoseBatch, DecodeError> {
    Ok(serde_json::from_str::<PoseBatch>(text)?)
}

/// Reading published by a sensor-bearing participant.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum Measurement {
    Rotation(Quaternion),
    Acceleration(Vec3),
}

impl Measurement {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_batch_keyed_by_identity() {
        let text = r#"{"0": {"position": [1, 2, 3], "orientation": [0, 0, 0, 1]},
                       "4": {"position": [0.5, 0, -1], "orientation": [0.1, 0.2, 0.3, 0.9]}}"#;
        let batch = decode_text(text).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[&0].position, [1.0, 2.0, 3.0]);
        assert_eq!(batch[&4].orientation, [0.1, 0.2, 0.3, 0.9]);
    }

    #[test]
    fn accepts_server_rotation_field() {
        let text = r#"{"3": {"position": [0, 0, 0], "rotation": [1, 0, 0, 0]}}"#;
        let batch = decode_text(text).unwrap();
        assert_eq!(batch[&3].orientation, [1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn key_order_does_not_matter() {
        let a = decode_text(
            r#"{"2": {"position": [2, 2, 2], "orientation": [0, 0, 0, 1]},
                "1": {"position": [1, 1, 1], "orientation": [0, 1, 0, 0]}}"#,
        )
        .unwrap();
        let b = decode_text(
            r#"{"1": {"position": [1, 1, 1], "orientation": [0, 1, 0, 0]},
                "2": {"position": [2, 2, 2], "orientation": [0, 0, 0, 1]}}"#,
        )
        .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_malformed_payloads() {
        assert!(matches!(decode_text("{not json"), Err(DecodeError::Malformed(_))));
        assert!(matches!(
            decode_text(r#"{"abc": {"position": [0, 0, 0], "orientation": [0, 0, 0, 1]}}"#),
            Err(DecodeError::Malformed(_))
        ));
        assert!(matches!(
            decode_text(r#"{"1": {"position": [0, 0], "orientation": [0, 0, 0, 1]}}"#),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_binary_frames() {
        let payload = Payload::Binary(vec![1, 2, 3]);
        assert!(matches!(decode_batch(&payload), Err(DecodeError::NotText(3))));
    }

    #[test]
    fn measurement_wire_format() {
        let rotation = Measurement::Rotation([0.0, 0.0, 0.0, 1.0]);
        assert_eq!(
            rotation.to_json().unwrap(),
            r#"{"type":"Rotation","data":[0.0,0.0,0.0,1.0]}"#
        );
        let acceleration: Measurement =
            serde_json::from_str(r#"{"type":"Acceleration","data":[1.5,0,-2]}"#).unwrap();
        assert_eq!(acceleration, Measurement::Acceleration([1.5, 0.0, -2.0]));
    }
}
