//! Streaming engine: session lifecycle and the capture → transform → playback loop.
//!
//! A session owns both endpoints and the active effect for its whole life.
//! The loop runs on a dedicated thread (the engine actor); the device
//! callbacks exchange samples with it through lock-free SPSC rings, so the
//! real-time callbacks never block on processing. Buffer N's output is always
//! written after buffer N's input and transform: there is no pipelining
//! across buffers and never a concurrent `apply`.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

use crate::catalog::Direction;
use crate::config::SessionConfig;
use crate::event::{EngineEvent, EventCallback};
use crate::processor::BufferProcessor;
use crate::recorder::WavRecorder;
use crate::EngineError;

/// How long the engine thread sleeps while waiting on a ring.
/// Well under one buffer period (1024 samples at 44.1 kHz is ~23 ms).
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Lifecycle of one streaming session.
///
/// `Stopped` and `Failed` are terminal: a [`Session`] never runs twice, a new
/// one is constructed for the next run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StreamState {
    /// No session activity yet.
    #[default]
    Idle,
    /// Devices and effect are being resolved and opened.
    Starting,
    /// The processing loop is live.
    Running,
    /// Stop was requested; the loop is finishing its current buffer.
    Stopping,
    /// The session ended cleanly.
    Stopped,
    /// The session could not start, with a human-readable reason.
    Failed(String),
}

impl StreamState {
    /// Returns `true` once the session can never run again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamState::Stopped | StreamState::Failed(_))
    }

    /// Returns `true` while a session is starting, running, or stopping.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            StreamState::Starting | StreamState::Running | StreamState::Stopping
        )
    }
}

/// Statistics about a streaming session.
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    /// Buffers that went through the transform path.
    pub chunks_processed: u64,
    /// Samples that went through the transform path.
    pub samples_processed: u64,
    /// Samples dropped by the capture callback because the ring was full.
    pub dropped_input_samples: u64,
}

/// State shared between the session handle and the engine thread.
struct SessionShared {
    running: AtomicBool,
    state: Mutex<StreamState>,
    chunks_processed: AtomicU64,
    samples_processed: AtomicU64,
    dropped_input: Arc<AtomicU64>,
}

impl SessionShared {
    fn new(dropped_input: Arc<AtomicU64>) -> Self {
        Self {
            running: AtomicBool::new(true),
            state: Mutex::new(StreamState::Running),
            chunks_processed: AtomicU64::new(0),
            samples_processed: AtomicU64::new(0),
            dropped_input,
        }
    }

    fn set_state(&self, state: StreamState) {
        *self.state.lock() = state;
    }

    fn state(&self) -> StreamState {
        self.state.lock().clone()
    }
}

/// The opened CPAL endpoints for one session.
///
/// Capture and playback run while this exists; dropping it releases both.
pub(crate) struct OpenEndpoints {
    input: cpal::Stream,
    output: cpal::Stream,
}

impl OpenEndpoints {
    /// Stops both endpoints, best-effort. Failures are reported as
    /// [`EngineEvent::TeardownError`] and otherwise swallowed.
    fn shutdown(self, event_callback: Option<&EventCallback>) {
        for (stream, side) in [(&self.input, "input"), (&self.output, "output")] {
            if let Err(err) = stream.pause() {
                tracing::warn!(side, error = %err, "endpoint teardown failed");
                if let Some(callback) = event_callback {
                    callback(EngineEvent::TeardownError {
                        reason: format!("{side}: {err}"),
                    });
                }
            }
        }
        // Dropping releases the device handles.
    }
}

/// Handle to one running streaming session.
///
/// Created by [`VocalFx::start()`] for device-backed sessions, or by
/// [`Session::with_ring_buffers()`] for hardware-free ones. The processing
/// loop runs on its own thread until [`stop()`](Session::stop) is called or
/// the handle is dropped.
///
/// [`VocalFx::start()`]: crate::VocalFx::start
pub struct Session {
    shared: Arc<SessionShared>,
    handle: Option<JoinHandle<()>>,
    endpoints: Option<OpenEndpoints>,
    event_callback: Option<EventCallback>,
}

impl Session {
    pub(crate) fn new(
        processor: BufferProcessor,
        input: HeapCons<f32>,
        output: HeapProd<f32>,
        config: &SessionConfig,
        recorder: Option<WavRecorder>,
        event_callback: Option<EventCallback>,
        dropped_input: Arc<AtomicU64>,
        endpoints: Option<OpenEndpoints>,
    ) -> Self {
        let shared = Arc::new(SessionShared::new(dropped_input));

        let engine_loop = EngineLoop {
            input,
            output,
            processor,
            recorder,
            shared: Arc::clone(&shared),
            chunk_size: config.chunk_size,
            event_callback: event_callback.clone(),
        };
        let handle = thread::Builder::new()
            .name("vocalfx-engine".to_string())
            .spawn(move || engine_loop.run())
            .expect("failed to spawn engine thread");

        Self {
            shared,
            handle: Some(handle),
            endpoints,
            event_callback,
        }
    }

    /// Runs a session over caller-provided ring buffers instead of opened
    /// devices. The loop behaves identically to a device-backed session;
    /// this is how the test suite exercises the engine without hardware.
    pub fn with_ring_buffers(
        processor: BufferProcessor,
        input: HeapCons<f32>,
        output: HeapProd<f32>,
        config: &SessionConfig,
        recorder: Option<WavRecorder>,
        event_callback: Option<EventCallback>,
    ) -> Self {
        Self::new(
            processor,
            input,
            output,
            config,
            recorder,
            event_callback,
            Arc::new(AtomicU64::new(0)),
            None,
        )
    }

    /// Returns `true` while the processing loop is live.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Current session state.
    pub fn state(&self) -> StreamState {
        self.shared.state()
    }

    /// Current session statistics.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            chunks_processed: self.shared.chunks_processed.load(Ordering::SeqCst),
            samples_processed: self.shared.samples_processed.load(Ordering::SeqCst),
            dropped_input_samples: self.shared.dropped_input.load(Ordering::SeqCst),
        }
    }

    /// Stops the session cooperatively.
    ///
    /// The running flag is cleared and observed by the loop at its next
    /// check; an in-flight buffer is finished, not aborted, so termination
    /// latency is bounded by about one buffer period per endpoint. Both
    /// endpoints are then stopped and released unconditionally; teardown
    /// failures are swallowed (reported via the event callback) and the
    /// session still reaches `Stopped`.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if !self.shared.running.swap(false, Ordering::SeqCst) {
            return;
        }
        self.shared.set_state(StreamState::Stopping);

        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        if let Some(endpoints) = self.endpoints.take() {
            endpoints.shutdown(self.event_callback.as_ref());
        }
        self.shared.set_state(StreamState::Stopped);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// The engine actor: reads one buffer, transforms it, writes it, repeats.
struct EngineLoop {
    input: HeapCons<f32>,
    output: HeapProd<f32>,
    processor: BufferProcessor,
    recorder: Option<WavRecorder>,
    shared: Arc<SessionShared>,
    chunk_size: usize,
    event_callback: Option<EventCallback>,
}

impl EngineLoop {
    fn run(mut self) {
        let mut buf = vec![0.0_f32; self.chunk_size];
        let mut reported_dropped = 0_u64;

        loop {
            let filled = self.read_chunk(&mut buf);

            // Overrun at the driver level is suppressed: the loop accepts
            // whatever arrived and reports the loss as an event.
            let dropped = self.shared.dropped_input.load(Ordering::Relaxed);
            if dropped > reported_dropped {
                let delta = dropped - reported_dropped;
                reported_dropped = dropped;
                tracing::warn!(dropped_samples = delta, "input overrun");
                if let Some(callback) = &self.event_callback {
                    callback(EngineEvent::InputOverrun {
                        dropped_samples: delta,
                    });
                }
            }

            if filled > 0 {
                if let Some(processed) = self.processor.process(&buf[..filled]) {
                    self.write_chunk(&processed);
                    self.record(&processed);
                    self.shared.chunks_processed.fetch_add(1, Ordering::Relaxed);
                    self.shared
                        .samples_processed
                        .fetch_add(filled as u64, Ordering::Relaxed);
                }
            }

            if !self.shared.running.load(Ordering::SeqCst) {
                break;
            }
        }

        if let Some(mut recorder) = self.recorder.take() {
            if let Err(err) = recorder.finalize() {
                tracing::warn!(error = %err, "recorder finalize failed");
                if let Some(callback) = &self.event_callback {
                    callback(EngineEvent::RecorderError {
                        detail: err.to_string(),
                    });
                }
            }
        }
    }

    /// Blocks until one full buffer is available. A stop request releases
    /// the wait early; whatever partial data arrived is still processed,
    /// so stopping never discards captured audio.
    fn read_chunk(&mut self, buf: &mut [f32]) -> usize {
        let mut filled = 0;
        loop {
            filled += self.input.pop_slice(&mut buf[filled..]);
            if filled == buf.len() {
                return filled;
            }
            if !self.shared.running.load(Ordering::SeqCst) {
                return filled;
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Blocks until the playback endpoint accepts the whole buffer. The
    /// device callback keeps draining the ring until teardown, which happens
    /// only after this thread exits, so the write always completes while the
    /// session is live. If the sink is wedged after a stop request, the
    /// remainder is dropped rather than blocking shutdown.
    fn write_chunk(&mut self, samples: &[f32]) {
        let mut remaining = samples;
        loop {
            let pushed = self.output.push_slice(remaining);
            remaining = &remaining[pushed..];
            if remaining.is_empty() {
                return;
            }
            if pushed == 0 && !self.shared.running.load(Ordering::SeqCst) {
                return;
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    fn record(&mut self, samples: &[f32]) {
        if let Some(recorder) = self.recorder.as_mut() {
            if let Err(err) = recorder.write(samples) {
                tracing::warn!(error = %err, "recorder write failed, recording stops");
                if let Some(callback) = &self.event_callback {
                    callback(EngineEvent::RecorderError {
                        detail: err.to_string(),
                    });
                }
                self.recorder = None;
            }
        }
    }
}

/// Opens both endpoints for mono f32 streaming at the session format.
///
/// If either open fails, whatever was opened is released before returning,
/// so a failed start leaves no device held.
pub(crate) fn open_endpoints(
    input_index: usize,
    input_name: &str,
    output_index: usize,
    output_name: &str,
    config: &SessionConfig,
    dropped_input: Arc<AtomicU64>,
) -> Result<(OpenEndpoints, HeapCons<f32>, HeapProd<f32>), EngineError> {
    let stream_config = cpal::StreamConfig {
        channels: 1,
        sample_rate: cpal::SampleRate(config.sample_rate),
        buffer_size: cpal::BufferSize::Fixed(config.chunk_size as u32),
    };

    let (mut capture_producer, capture_consumer) =
        HeapRb::<f32>::new(config.ring_capacity()).split();
    let (playback_producer, mut playback_consumer) =
        HeapRb::<f32>::new(config.ring_capacity()).split();

    let input_device = device_at(input_index, Direction::Input, input_name)?;
    let input = input_device
        .build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let pushed = capture_producer.push_slice(data);
                if pushed < data.len() {
                    dropped_input.fetch_add((data.len() - pushed) as u64, Ordering::Relaxed);
                }
            },
            |err| {
                tracing::error!("input stream error: {err}");
            },
            None,
        )
        .map_err(|e| EngineError::DeviceOpen {
            direction: Direction::Input,
            name: input_name.to_string(),
            reason: e.to_string(),
        })?;

    let output_device = device_at(output_index, Direction::Output, output_name)?;
    let output = output_device
        .build_output_stream(
            &stream_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let popped = playback_consumer.pop_slice(data);
                // Underrun: pad with silence rather than replaying stale audio.
                data[popped..].fill(0.0);
            },
            |err| {
                tracing::error!("output stream error: {err}");
            },
            None,
        )
        .map_err(|e| EngineError::DeviceOpen {
            direction: Direction::Output,
            name: output_name.to_string(),
            reason: e.to_string(),
        })?;

    input.play().map_err(|e| EngineError::DeviceOpen {
        direction: Direction::Input,
        name: input_name.to_string(),
        reason: e.to_string(),
    })?;
    output.play().map_err(|e| EngineError::DeviceOpen {
        direction: Direction::Output,
        name: output_name.to_string(),
        reason: e.to_string(),
    })?;

    Ok((
        OpenEndpoints { input, output },
        capture_consumer,
        playback_producer,
    ))
}

/// Fetches the device at an enumeration index, re-enumerating the host.
fn device_at(index: usize, direction: Direction, name: &str) -> Result<cpal::Device, EngineError> {
    let host = cpal::default_host();
    host.devices()
        .map_err(|e| EngineError::Backend(e.to_string()))?
        .nth(index)
        .ok_or_else(|| EngineError::DeviceOpen {
            direction,
            name: name.to_string(),
            reason: "device no longer present".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{SessionParams, SharedParams};
    use std::time::Instant;

    fn mock_session(
        gain: f32,
        capacity: usize,
    ) -> (Session, HeapProd<f32>, HeapCons<f32>, SharedParams) {
        let (feed, input) = HeapRb::<f32>::new(capacity).split();
        let (output, drain) = HeapRb::<f32>::new(capacity).split();

        let params = SharedParams::new(SessionParams::with_gain(gain));
        let processor = BufferProcessor::new(None, params.reader(), 44_100);
        let config = SessionConfig {
            chunk_size: 4,
            ..Default::default()
        };

        let session = Session::with_ring_buffers(processor, input, output, &config, None, None);
        (session, feed, drain, params)
    }

    fn drain_samples(drain: &mut HeapCons<f32>, expected: usize) -> Vec<f32> {
        let deadline = Instant::now() + Duration::from_secs(2);
        let mut collected = Vec::new();
        while collected.len() < expected && Instant::now() < deadline {
            while let Some(sample) = drain.try_pop() {
                collected.push(sample);
            }
            thread::sleep(Duration::from_millis(1));
        }
        collected
    }

    #[test]
    fn test_session_starts_running() {
        let (session, _feed, _drain, _params) = mock_session(1.0, 64);
        assert!(session.is_running());
        assert_eq!(session.state(), StreamState::Running);
        session.stop();
    }

    #[test]
    fn test_pass_through_end_to_end() {
        let (session, mut feed, mut drain, _params) = mock_session(2.0, 64);

        feed.push_slice(&[0.1, -0.2, 0.3, -0.4]);
        let out = drain_samples(&mut drain, 4);
        assert_eq!(out, vec![0.2, -0.4, 0.6, -0.8]);

        session.stop();
    }

    #[test]
    fn test_stop_reaches_stopped_state() {
        let (session, mut feed, mut drain, _params) = mock_session(1.0, 64);
        feed.push_slice(&[0.5; 8]);
        let _ = drain_samples(&mut drain, 8);

        let shared = Arc::clone(&session.shared);
        session.stop();
        assert_eq!(shared.state(), StreamState::Stopped);
        assert!(!shared.running.load(Ordering::SeqCst));
    }

    #[test]
    fn test_stop_processes_partial_final_buffer() {
        // 3 samples against a chunk size of 4: the stop request releases the
        // blocking read and the partial buffer still reaches the output.
        let (session, mut feed, mut drain, _params) = mock_session(2.0, 64);
        feed.push_slice(&[0.1, 0.2, 0.3]);
        thread::sleep(Duration::from_millis(50));

        session.stop();
        let out = drain_samples(&mut drain, 3);
        assert_eq!(out, vec![0.2, 0.4, 0.6]);
    }

    #[test]
    fn test_stats_count_processed_buffers() {
        let (session, mut feed, mut drain, _params) = mock_session(1.0, 64);
        feed.push_slice(&[0.5; 8]);
        let _ = drain_samples(&mut drain, 8);

        let stats = session.stats();
        assert_eq!(stats.chunks_processed, 2);
        assert_eq!(stats.samples_processed, 8);
        assert_eq!(stats.dropped_input_samples, 0);
        session.stop();
    }

    #[test]
    fn test_drop_without_stop_shuts_down() {
        let (session, mut feed, _drain, _params) = mock_session(1.0, 64);
        feed.push_slice(&[0.1; 4]);
        drop(session);
        // Reaching here without hanging is the assertion: drop joined the
        // engine thread.
    }

    #[test]
    fn test_gain_update_applies_to_later_buffers() {
        let (session, mut feed, mut drain, params) = mock_session(1.0, 64);

        feed.push_slice(&[0.5; 4]);
        assert_eq!(drain_samples(&mut drain, 4), vec![0.5; 4]);

        params.set("gain", 2.0);
        feed.push_slice(&[0.5; 4]);
        assert_eq!(drain_samples(&mut drain, 4), vec![1.0; 4]);

        session.stop();
    }

    #[test]
    fn test_terminal_states() {
        assert!(StreamState::Stopped.is_terminal());
        assert!(StreamState::Failed("reason".into()).is_terminal());
        assert!(!StreamState::Running.is_terminal());
        assert!(StreamState::Running.is_active());
        assert!(!StreamState::Idle.is_active());
    }
}
