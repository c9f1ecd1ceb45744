//! Runtime events for monitoring session health.
//!
//! Events are non-fatal notifications about session behavior. The stream
//! continues running after an event is emitted; they exist for logging and
//! metrics, not error handling. Fatal conditions are [`EngineError`]s
//! returned from `start()` instead.
//!
//! [`EngineError`]: crate::EngineError

use std::sync::Arc;

/// Recoverable conditions emitted during a streaming session.
///
/// These are informational. The session keeps running after any of them;
/// in particular a [`PluginError`](EngineEvent::PluginError) affects only the
/// buffer it occurred on.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// Name resolution failed for one of the requested endpoints and both
    /// were replaced by first-valid devices.
    ///
    /// This is defined fallback behavior, not an error; the session starts
    /// on the substituted devices.
    DeviceFallback {
        /// Input name that was requested.
        requested_input: String,
        /// Output name that was requested.
        requested_output: String,
        /// Input device actually opened.
        resolved_input: String,
        /// Output device actually opened.
        resolved_output: String,
    },

    /// The active effect's `apply` failed for one buffer.
    ///
    /// The engine substituted the pass-through transform for that buffer and
    /// will call the plugin again on the next one.
    PluginError {
        /// Description of the failure.
        detail: String,
    },

    /// The capture ring filled up and the device callback dropped samples.
    ///
    /// Data loss under overrun is accepted; stream continuity is prioritized
    /// over sample accuracy here.
    InputOverrun {
        /// Samples dropped since the previous report.
        dropped_samples: u64,
    },

    /// The session WAV recorder failed to write or finalize.
    ///
    /// Recording stops; the audio stream is unaffected.
    RecorderError {
        /// Description of the failure.
        detail: String,
    },

    /// A failure occurred while stopping or closing an endpoint.
    ///
    /// Teardown is best-effort: the failure is reported here and the session
    /// still reaches `Stopped`.
    TeardownError {
        /// Description of the failure.
        reason: String,
    },
}

/// Callback type for receiving runtime events.
///
/// Register via [`VocalFx::with_event_callback()`] to observe fallbacks,
/// plugin errors, and teardown issues. Events are delivered from the engine
/// thread; keep the callback cheap.
///
/// [`VocalFx::with_event_callback()`]: crate::VocalFx::with_event_callback
pub type EventCallback = Arc<dyn Fn(EngineEvent) + Send + Sync>;

/// Creates an [`EventCallback`] from a closure.
///
/// # Example
///
/// ```
/// use vocalfx::{event_callback, EngineEvent};
///
/// let callback = event_callback(|event| {
///     println!("engine event: {:?}", event);
/// });
/// ```
pub fn event_callback<F>(f: F) -> EventCallback
where
    F: Fn(EngineEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_debug_format() {
        let event = EngineEvent::PluginError {
            detail: "boom".to_string(),
        };
        let debug = format!("{:?}", event);
        assert!(debug.contains("PluginError"));
        assert!(debug.contains("boom"));
    }

    #[test]
    fn test_event_callback_helper() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let called = Arc::new(AtomicBool::new(false));
        let called_clone = called.clone();

        let callback = event_callback(move |_| {
            called_clone.store(true, Ordering::SeqCst);
        });

        callback(EngineEvent::InputOverrun { dropped_samples: 0 });
        assert!(called.load(Ordering::SeqCst));
    }

    #[test]
    fn test_event_clone() {
        let event = EngineEvent::DeviceFallback {
            requested_input: "Z".to_string(),
            requested_output: "D".to_string(),
            resolved_input: "A".to_string(),
            resolved_output: "C".to_string(),
        };
        let cloned = event.clone();
        if let EngineEvent::DeviceFallback { resolved_input, .. } = cloned {
            assert_eq!(resolved_input, "A");
        } else {
            panic!("expected DeviceFallback variant");
        }
    }
}
