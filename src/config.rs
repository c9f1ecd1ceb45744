//! Configuration for streaming sessions.

use std::path::PathBuf;

/// Configuration for one streaming session.
///
/// Use [`SessionConfig::default()`] for the reference behavior: 44.1 kHz mono
/// with 1024-sample buffers (about 23 ms of one-way latency per buffer).
///
/// # Example
///
/// ```
/// use vocalfx::SessionConfig;
///
/// let config = SessionConfig {
///     capture_path: Some("take.wav".into()),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Sample rate in Hz for both endpoints.
    ///
    /// Default: 44100
    pub sample_rate: u32,

    /// Samples per buffer exchanged with the devices.
    ///
    /// Smaller values reduce latency but increase overhead.
    /// Default: 1024
    pub chunk_size: usize,

    /// Capacity of each device ring buffer, in chunks.
    ///
    /// The rings absorb scheduling jitter between the device callbacks and
    /// the processing thread. If the capture ring fills, oldest-first audio
    /// is dropped and an [`EngineEvent::InputOverrun`] is emitted.
    /// Default: 8
    ///
    /// [`EngineEvent::InputOverrun`]: crate::EngineEvent::InputOverrun
    pub ring_capacity_chunks: usize,

    /// When set, processed output is also written to this WAV file
    /// (16-bit PCM mono), finalized when the session stops.
    ///
    /// Default: `None`
    pub capture_path: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            chunk_size: 1024,
            ring_capacity_chunks: 8,
            capture_path: None,
        }
    }
}

impl SessionConfig {
    /// Total ring buffer capacity in samples.
    pub fn ring_capacity(&self) -> usize {
        self.chunk_size * self.ring_capacity_chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.sample_rate, 44_100);
        assert_eq!(config.chunk_size, 1024);
        assert_eq!(config.ring_capacity_chunks, 8);
        assert!(config.capture_path.is_none());
    }

    #[test]
    fn test_ring_capacity() {
        let config = SessionConfig::default();
        assert_eq!(config.ring_capacity(), 8192);
    }
}
