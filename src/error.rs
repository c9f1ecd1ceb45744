//! Error types for vocalfx.
//!
//! Errors are split into two categories:
//! - **Fatal errors** ([`EngineError`], [`LoadError`]): prevent a session from starting
//! - **Recoverable conditions**: runtime issues surfaced via [`EventCallback`](crate::EventCallback)
//!
//! A plugin failure during a running session is never fatal; it is contained to
//! the iteration it occurred in (see [`ApplyError`]).

use crate::catalog::Direction;

/// Fatal errors that prevent a streaming session from starting.
///
/// These errors are returned from [`VocalFx::start()`] and leave the session in
/// `Failed`. Runtime issues (plugin errors, input overruns, teardown failures)
/// are handled via the event callback instead.
///
/// [`VocalFx::start()`]: crate::VocalFx::start
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The host audio subsystem could not be queried for devices.
    #[error("device enumeration failed: {reason}")]
    DeviceEnumeration {
        /// Why the enumeration failed.
        reason: String,
    },

    /// No device in the catalog has a positive channel count for the direction.
    ///
    /// Raised when name resolution fails *and* the first-valid fallback finds
    /// nothing to fall back to.
    #[error("no usable {direction} device available")]
    NoUsableDevice {
        /// The direction that could not be satisfied.
        direction: Direction,
    },

    /// A resolved endpoint could not be opened (busy, removed, invalid config).
    #[error("failed to open {direction} device '{name}': {reason}")]
    DeviceOpen {
        /// Direction of the endpoint that failed to open.
        direction: Direction,
        /// Name of the device.
        name: String,
        /// Why the open failed.
        reason: String,
    },

    /// An error from the underlying audio library (CPAL).
    #[error("audio backend error: {0}")]
    Backend(String),

    /// The effect store could not be read or written.
    #[error("effect store error: {reason}")]
    Store {
        /// Description of the I/O failure.
        reason: String,
    },

    /// The selected effect failed to load.
    ///
    /// Raised before any device is opened; the session has no side effects.
    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Errors raised while loading an effect plugin from source text.
///
/// Load errors are detected before a session opens any device. An effect that
/// loads successfully can still fail at runtime; those failures are per-buffer
/// [`ApplyError`]s and never surface as a session failure.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The source compiled but defines no 3-argument `apply` function.
    #[error("no 'apply(samples, sample_rate, params)' function defined in effect source")]
    MissingEntryPoint,

    /// The source is not valid script code.
    #[error("effect source failed to compile: {detail}")]
    Compile {
        /// Compiler diagnostic, including position information.
        detail: String,
    },

    /// The effect could not be read from the store.
    #[error("failed to read effect '{name}': {source}")]
    Read {
        /// Name of the effect that could not be read.
        name: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// A plugin `apply` call failed for one buffer.
///
/// Apply errors are recoverable: the engine logs them, emits
/// [`EngineEvent::PluginError`], substitutes the pass-through transform for
/// that iteration, and keeps the plugin active for subsequent buffers.
///
/// [`EngineEvent::PluginError`]: crate::EngineEvent::PluginError
#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    /// The script raised an error during evaluation.
    #[error("effect script error: {detail}")]
    Script {
        /// The script engine's diagnostic.
        detail: String,
    },

    /// The script returned a value that is not a numeric sample buffer.
    #[error("effect returned a non-buffer value: {detail}")]
    NotABuffer {
        /// Description of the returned value.
        detail: String,
    },

    /// The returned buffer length differs from the input length.
    ///
    /// The engine never resizes downstream buffers, so a length change is a
    /// contract violation rather than something to pass along silently.
    #[error("effect returned {actual} samples, expected {expected}")]
    LengthMismatch {
        /// Number of samples the engine handed to the plugin.
        expected: usize,
        /// Number of samples the plugin returned.
        actual: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_display() {
        let err = EngineError::DeviceOpen {
            direction: Direction::Input,
            name: "USB Mic".to_string(),
            reason: "device busy".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "failed to open input device 'USB Mic': device busy"
        );
    }

    #[test]
    fn test_load_error_missing_entry_point() {
        let err = LoadError::MissingEntryPoint;
        assert!(err.to_string().contains("apply"));
    }

    #[test]
    fn test_load_error_into_engine_error() {
        let err: EngineError = LoadError::Compile {
            detail: "unexpected token".to_string(),
        }
        .into();
        assert!(matches!(err, EngineError::Load(LoadError::Compile { .. })));
    }

    #[test]
    fn test_apply_error_length_mismatch() {
        let err = ApplyError::LengthMismatch {
            expected: 1024,
            actual: 512,
        };
        assert_eq!(err.to_string(), "effect returned 512 samples, expected 1024");
    }
}
