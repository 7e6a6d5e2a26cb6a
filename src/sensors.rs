use crate::data::Measurement;
use gilrs::{Axis, Gilrs};
use log::*;
use nalgebra as na;
use std::cell::RefCell;
use std::f32::consts::{FRAC_PI_2, PI};
use std::rc::Rc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SensorError {
    #[error("sensor unavailable: {0}")]
    Unavailable(String),
    #[error("invalid frame {path}: {len} bytes, expected {expected}")]
    InvalidFrame {
        path: String,
        len: usize,
        expected: usize,
    },
}

/// One independent reading source.
///
/// Dropping a reader stops it.
pub trait SensorReader {
    fn name(&self) -> &'static str;

    /// Latest reading, `None` when nothing new is available.
    fn poll(&mut self) -> Result<Option<Measurement>, SensorError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GamepadSettings {
    pub deadzone: f32,
    pub acceleration_gain: f32,
}

impl Default for GamepadSettings {
    fn default() -> Self {
        Self {
            deadzone: 0.2,
            acceleration_gain: 1.0,
        }
    }
}

struct Stick {
    gilrs: Gilrs,
}

impl Stick {
    fn axes(&mut self, axes: &[Axis]) -> Option<Vec<f32>> {
        // force consume all events
        while self.gilrs.next_event().is_some() {}
        let (_, gamepad) = self.gilrs.gamepads().next()?;
        if !gamepad.is_connected() {
            return None;
        }
        Some(axes.iter().map(|axis| gamepad.value(*axis)).collect())
    }
}

fn apply_deadzone(value: f32, deadzone: f32) -> f32 {
    if value.abs() > deadzone {
        value
    } else {
        0.0
    }
}

/// Emulates an absolute orientation sensor with the left stick and right stick X.
pub struct GamepadOrientation {
    stick: Rc<RefCell<Stick>>,
    settings: GamepadSettings,
}

/// Emulates a linear acceleration sensor with the right stick.
pub struct GamepadAcceleration {
    stick: Rc<RefCell<Stick>>,
    settings: GamepadSettings,
}

/// Acquires the first connected gamepad as a pair of sensor readers.
pub fn gamepad_sensors(
    settings: GamepadSettings,
) -> Result<(GamepadOrientation, GamepadAcceleration), SensorError> {
    let gilrs = Gilrs::new().map_err(|e| SensorError::Unavailable(e.to_string()))?;
    let connected = gilrs.gamepads().any(|(_, gamepad)| gamepad.is_connected());
    if !connected {
        return Err(SensorError::Unavailable("no gamepad connected".to_owned()));
    }
    if let Some((_, gamepad)) = gilrs.gamepads().next() {
        info!("using gamepad {} as sensor", gamepad.name());
    }
    let stick = Rc::new(RefCell::new(Stick { gilrs }));
    Ok((
        GamepadOrientation {
            stick: stick.clone(),
            settings,
        },
        GamepadAcceleration { stick, settings },
    ))
}

/// Sensor quaternion for the given stick deflections.
pub fn stick_orientation(roll: f32, pitch: f32, yaw: f32) -> [f32; 4] {
    let rotation = na::UnitQuaternion::from_euler_angles(roll * PI, pitch * FRAC_PI_2, yaw * PI);
    let q = rotation.quaternion();
    [q.i, q.j, q.k, q.w]
}

impl SensorReader for GamepadOrientation {
    fn name(&self) -> &'static str {
        "orientation"
    }

    fn poll(&mut self) -> Result<Option<Measurement>, SensorError> {
        let axes = self.stick.borrow_mut().axes(&[
            Axis::RightStickX,
            Axis::LeftStickY,
            Axis::LeftStickX,
        ]);
        Ok(axes.map(|values| {
            let deadzone = self.settings.deadzone;
            Measurement::Rotation(stick_orientation(
                apply_deadzone(values[0], deadzone),
                apply_deadzone(values[1], deadzone),
                apply_deadzone(values[2], deadzone),
            ))
        }))
    }
}

impl SensorReader for GamepadAcceleration {
    fn name(&self) -> &'static str {
        "acceleration"
    }

    fn poll(&mut self) -> Result<Option<Measurement>, SensorError> {
        let axes = self
            .stick
            .borrow_mut()
            .axes(&[Axis::RightStickX, Axis::RightStickY]);
        Ok(axes.map(|values| {
            let GamepadSettings {
                deadzone,
                acceleration_gain,
            } = self.settings;
            Measurement::Acceleration([
                apply_deadzone(values[0], deadzone) * acceleration_gain,
                apply_deadzone(values[1], deadzone) * acceleration_gain,
                0.0,
            ])
        }))
    }
}

impl Drop for GamepadOrientation {
    fn drop(&mut self) {
        debug!("orientation sensor stopped");
    }
}

impl Drop for GamepadAcceleration {
    fn drop(&mut self) {
        debug!("acceleration sensor stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_sticks_are_identity() {
        let [x, y, z, w] = stick_orientation(0.0, 0.0, 0.0);
        assert_eq!((x, y, z), (0.0, 0.0, 0.0));
        assert!((w - 1.0).abs() < 1e-6);
    }

    #[test]
    fn full_yaw_is_half_turn() {
        let [x, y, z, w] = stick_orientation(0.0, 0.0, 1.0);
        assert!(x.abs() < 1e-6 && y.abs() < 1e-6);
        assert!((z.abs() - 1.0).abs() < 1e-6);
        assert!(w.abs() < 1e-6);
    }

    #[test]
    fn deadzone_zeroes_small_deflections() {
        assert_eq!(apply_deadzone(0.1, 0.2), 0.0);
        assert_eq!(apply_deadzone(-0.5, 0.2), -0.5);
    }
}
