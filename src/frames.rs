use crate::sensors::SensorError;
use log::*;
use std::path::Path;
use std::time::{Duration, Instant};

/// Source of raw RGBA camera frames, sent as binary websocket frames.
pub trait FrameSource {
    /// Next frame once it is due, `None` in between.
    fn poll_frame(&mut self) -> Result<Option<Vec<u8>>, SensorError>;
}

/// Loops over pre-recorded raw RGBA frames at a fixed frame rate.
pub struct FrameReplay {
    frames: Vec<Vec<u8>>,
    next: usize,
    interval: Duration,
    last_sent: Option<Instant>,
}

impl FrameReplay {
    /// Loads every file in `dir`, ordered by name. Each file holds one
    /// `width * height` RGBA frame.
    pub fn open(dir: &Path, width: u32, height: u32, frame_rate: f32) -> Result<Self, SensorError> {
        let unavailable = |e: std::io::Error| SensorError::Unavailable(format!("{}: {}", dir.display(), e));
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(unavailable)? {
            let path = entry.map_err(unavailable)?.path();
            if path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();
        if paths.is_empty() {
            return Err(SensorError::Unavailable(format!(
                "no frames in {}",
                dir.display()
            )));
        }

        let expected = width as usize * height as usize * 4;
        let mut frames = Vec::with_capacity(paths.len());
        for path in &paths {
            let frame = std::fs::read(path).map_err(unavailable)?;
            if frame.len() != expected {
                return Err(SensorError::InvalidFrame {
                    path: path.display().to_string(),
                    len: frame.len(),
                    expected,
                });
            }
            frames.push(frame);
        }
        info!("replaying {} frames from {}", frames.len(), dir.display());
        Ok(Self {
            frames,
            next: 0,
            interval: Duration::from_secs_f32(1.0 / frame_rate),
            last_sent: None,
        })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FrameSource for FrameReplay {
    fn poll_frame(&mut self) -> Result<Option<Vec<u8>>, SensorError> {
        let now = Instant::now();
        if let Some(last) = self.last_sent {
            if now.duration_since(last) < self.interval {
                return Ok(None);
            }
        }
        self.last_sent = Some(now);
        let frame = self.frames[self.next].clone();
        self.next = (self.next + 1) % self.frames.len();
        Ok(Some(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn frame_dir(name: &str, frames: &[Vec<u8>]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "phone_pong_{}_{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        for (index, frame) in frames.iter().enumerate() {
            std::fs::write(dir.join(format!("{:04}.rgba", index)), frame).unwrap();
        }
        dir
    }

    #[test]
    fn replays_frames_in_name_order_and_loops() {
        let dir = frame_dir("replay_order", &[vec![1; 16], vec![2; 16]]);
        let mut replay = FrameReplay::open(&dir, 2, 2, 1000.0).unwrap();
        assert_eq!(replay.len(), 2);

        let mut seen = Vec::new();
        while seen.len() < 3 {
            if let Some(frame) = replay.poll_frame().unwrap() {
                seen.push(frame[0]);
            }
        }
        assert_eq!(seen, vec![1, 2, 1]);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn frames_are_paced() {
        let dir = frame_dir("replay_pace", &[vec![0; 16]]);
        let mut replay = FrameReplay::open(&dir, 2, 2, 1.0).unwrap();
        assert!(replay.poll_frame().unwrap().is_some());
        assert!(replay.poll_frame().unwrap().is_none());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn rejects_wrong_frame_size() {
        let dir = frame_dir("replay_size", &[vec![0; 10]]);
        assert!(matches!(
            FrameReplay::open(&dir, 2, 2, 10.0),
            Err(SensorError::InvalidFrame {
                len: 10,
                expected: 16,
                ..
            })
        ));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn empty_directory_is_unavailable() {
        let dir = frame_dir("replay_empty", &[]);
        assert!(matches!(
            FrameReplay::open(&dir, 2, 2, 10.0),
            Err(SensorError::Unavailable(_))
        ));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
