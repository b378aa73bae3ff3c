//! Transport boundary: where frames come from and the connection state the
//! session lifecycle follows.

use crate::audio::{AudioFrame, WavFrameSource};
use crate::error::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Lifecycle of one transport connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Connecting,
    Connected,
    Disconnected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "not connected",
        };
        f.write_str(label)
    }
}

/// Publishes [`ConnectionState`] changes to any number of observers.
#[derive(Debug)]
pub struct ConnectionMonitor {
    tx: watch::Sender<ConnectionState>,
}

impl Default for ConnectionMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionMonitor {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ConnectionState::Connecting);
        Self { tx }
    }

    /// Publish a new state. Repeating the current state notifies nobody.
    pub fn set(&self, state: ConnectionState) {
        self.tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }

    pub fn state(&self) -> ConnectionState {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.tx.subscribe()
    }
}

/// Something that delivers transport frames one at a time.
pub trait FrameSource: Send {
    /// Next frame, `Ok(None)` once the stream has ended.
    fn next_frame(&mut self) -> Result<Option<AudioFrame>>;
}

/// Replays a WAV file as if it arrived over a live connection.
///
/// Publishes `Connected` before the first frame and `Disconnected` on
/// [`WavTransport::close`]. In real-time mode each frame is held back until
/// its wall-clock offset from the start of the stream.
pub struct WavTransport {
    source: WavFrameSource,
    monitor: Arc<ConnectionMonitor>,
    realtime: bool,
    started: Option<Instant>,
    elapsed_ms: u64,
}

impl WavTransport {
    pub fn new(source: WavFrameSource, monitor: Arc<ConnectionMonitor>) -> Self {
        Self {
            source,
            monitor,
            realtime: false,
            started: None,
            elapsed_ms: 0,
        }
    }

    pub fn with_realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    pub fn monitor(&self) -> &Arc<ConnectionMonitor> {
        &self.monitor
    }

    /// Deliver every frame to `on_frame` until the stream ends.
    ///
    /// Returns the number of frames delivered. Echoed frames are dropped since
    /// replay has no outgoing stream.
    pub fn run<F>(&mut self, mut on_frame: F) -> Result<u64>
    where
        F: FnMut(AudioFrame) -> AudioFrame,
    {
        let mut delivered = 0;
        while let Some(frame) = self.next_frame()? {
            drop(on_frame(frame));
            delivered += 1;
        }
        Ok(delivered)
    }

    /// Hang up: observers see `Disconnected`.
    pub fn close(&self) {
        self.monitor.set(ConnectionState::Disconnected);
    }

    fn pace(&self, started: Instant) {
        if !self.realtime {
            return;
        }
        let due = started + Duration::from_millis(self.elapsed_ms);
        let now = Instant::now();
        if due > now {
            std::thread::sleep(due - now);
        }
    }
}

impl FrameSource for WavTransport {
    fn next_frame(&mut self) -> Result<Option<AudioFrame>> {
        let started = match self.started {
            Some(started) => started,
            None => {
                self.monitor.set(ConnectionState::Connected);
                let now = Instant::now();
                self.started = Some(now);
                now
            }
        };

        match self.source.next_frame() {
            Some(frame) => {
                self.pace(started);
                self.elapsed_ms += u64::from(frame.duration_ms());
                Ok(Some(frame))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn wav_source(samples: usize, frame_ms: u32) -> WavFrameSource {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for i in 0..samples {
                writer.write_sample((i % 100) as i16).unwrap();
            }
            writer.finalize().unwrap();
        }
        WavFrameSource::from_reader(Box::new(Cursor::new(cursor.into_inner())), frame_ms).unwrap()
    }

    #[test]
    fn monitor_starts_connecting_and_publishes_changes() {
        let monitor = ConnectionMonitor::new();
        let mut rx = monitor.subscribe();
        assert_eq!(monitor.state(), ConnectionState::Connecting);

        monitor.set(ConnectionState::Connected);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), ConnectionState::Connected);

        monitor.set(ConnectionState::Connected);
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn replay_connects_delivers_all_frames_and_close_disconnects() {
        let monitor = Arc::new(ConnectionMonitor::new());
        // 800 samples at 8 kHz in 20 ms frames = 5 frames of 160
        let mut transport = WavTransport::new(wav_source(800, 20), monitor.clone());

        let observer = monitor.clone();
        let mut states = Vec::new();
        let delivered = transport
            .run(|frame| {
                states.push(observer.state());
                frame
            })
            .unwrap();

        assert_eq!(delivered, 5);
        assert!(states.iter().all(|s| *s == ConnectionState::Connected));
        assert_eq!(monitor.state(), ConnectionState::Connected);

        transport.close();
        assert_eq!(monitor.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn realtime_replay_takes_wall_clock_time() {
        let monitor = Arc::new(ConnectionMonitor::new());
        // 4 frames of 10 ms: the last frame is due 30 ms after the first
        let mut transport = WavTransport::new(wav_source(320, 10), monitor).with_realtime(true);
        let start = Instant::now();
        assert_eq!(transport.run(|f| f).unwrap(), 4);
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn state_display_matches_user_wording() {
        assert_eq!(ConnectionState::Disconnected.to_string(), "not connected");
        assert_eq!(ConnectionState::Connected.to_string(), "connected");
    }
}
