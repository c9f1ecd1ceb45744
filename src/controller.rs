//! Control surface: the session-facing API consumed by UI and CLI layers.
//!
//! [`VocalFx`] is the control actor of the two-actor model: it handles
//! start/stop requests and parameter updates, and never blocks on the engine.
//! It owns the effect store and at most one live session at a time; sessions
//! are single-use, so every `start` constructs a fresh one.

use std::path::PathBuf;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use crate::catalog::DeviceCatalog;
use crate::config::SessionConfig;
use crate::effect::{EffectPlugin, EffectSelection, EffectStore, ScriptEffect};
use crate::engine::{open_endpoints, Session, SessionStats, StreamState};
use crate::event::{EngineEvent, EventCallback};
use crate::params::{SessionParams, SharedParams};
use crate::processor::BufferProcessor;
use crate::recorder::WavRecorder;
use crate::EngineError;

/// The streaming control surface.
///
/// # Example
///
/// ```no_run
/// use vocalfx::{EffectSelection, SessionParams, VocalFx};
///
/// let mut fx = VocalFx::new("effects");
/// fx.start(
///     "USB Microphone",
///     "Speakers",
///     EffectSelection::Stored("robo".to_string()),
///     SessionParams::with_gain(2.0),
/// )?;
/// // ... audio flows on the engine thread ...
/// fx.set_param("gain", 1.5);
/// fx.stop();
/// # Ok::<(), vocalfx::EngineError>(())
/// ```
pub struct VocalFx {
    store: EffectStore,
    config: SessionConfig,
    params: SharedParams,
    event_callback: Option<EventCallback>,
    session: Option<Session>,
    /// State reported while no session object exists (before the first
    /// start, after a stop, or after a failed start).
    resting_state: StreamState,
}

impl VocalFx {
    /// Creates a control surface with its effect store rooted at
    /// `effects_dir` and the default session configuration.
    pub fn new(effects_dir: impl Into<PathBuf>) -> Self {
        Self {
            store: EffectStore::new(effects_dir),
            config: SessionConfig::default(),
            params: SharedParams::default(),
            event_callback: None,
            session: None,
            resting_state: StreamState::Idle,
        }
    }

    /// Replaces the session configuration used by subsequent starts.
    #[must_use]
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets a callback to receive runtime events (device fallback, plugin
    /// errors, teardown issues).
    #[must_use]
    pub fn with_event_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(EngineEvent) + Send + Sync + 'static,
    {
        self.event_callback = Some(crate::event::event_callback(callback));
        self
    }

    /// The effect store backing this surface.
    pub fn store(&self) -> &EffectStore {
        &self.store
    }

    /// Starts a streaming session.
    ///
    /// Device names are resolved against a fresh enumeration with the joint
    /// fallback: if either name fails to resolve, both endpoints fall back to
    /// the first valid device of their direction. The effect (if any) is
    /// loaded before any device is opened.
    ///
    /// Calling `start` while a session is already starting or running is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Enumeration, load, and open failures abort the start, leave no device
    /// open, and put the surface in `Failed` with a human-readable reason.
    pub fn start(
        &mut self,
        input_name: &str,
        output_name: &str,
        selection: EffectSelection,
        initial_params: SessionParams,
    ) -> Result<(), EngineError> {
        if self.session.as_ref().is_some_and(|s| s.state().is_active()) {
            return Ok(());
        }
        self.session = None;
        self.resting_state = StreamState::Starting;

        match self.start_session(input_name, output_name, selection, initial_params) {
            Ok(session) => {
                self.session = Some(session);
                Ok(())
            }
            Err(err) => {
                self.resting_state = StreamState::Failed(err.to_string());
                Err(err)
            }
        }
    }

    fn start_session(
        &mut self,
        input_name: &str,
        output_name: &str,
        selection: EffectSelection,
        initial_params: SessionParams,
    ) -> Result<Session, EngineError> {
        let catalog = DeviceCatalog::enumerate()?;
        let pair = catalog.resolve_pair(input_name, output_name)?;

        let resolved_input = catalog.name_of(pair.input).unwrap_or("unknown").to_string();
        let resolved_output = catalog.name_of(pair.output).unwrap_or("unknown").to_string();
        if pair.fell_back {
            tracing::info!(
                requested_input = input_name,
                requested_output = output_name,
                resolved_input = %resolved_input,
                resolved_output = %resolved_output,
                "device resolution fell back to first valid endpoints"
            );
            if let Some(callback) = &self.event_callback {
                callback(EngineEvent::DeviceFallback {
                    requested_input: input_name.to_string(),
                    requested_output: output_name.to_string(),
                    resolved_input: resolved_input.clone(),
                    resolved_output: resolved_output.clone(),
                });
            }
        }

        let effect: Option<Box<dyn EffectPlugin>> = match selection {
            EffectSelection::DryMic => None,
            EffectSelection::Stored(name) => {
                Some(Box::new(ScriptEffect::load_from_store(&self.store, &name)?))
            }
            EffectSelection::Inline(source) => {
                Some(Box::new(ScriptEffect::load_from_source(&source)?))
            }
        };

        self.params.replace(initial_params);

        let recorder = self.config.capture_path.as_ref().and_then(|path| {
            match WavRecorder::create(path, self.config.sample_rate) {
                Ok(recorder) => Some(recorder),
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "capture file unavailable");
                    if let Some(callback) = &self.event_callback {
                        callback(EngineEvent::RecorderError {
                            detail: err.to_string(),
                        });
                    }
                    None
                }
            }
        });

        let dropped_input = Arc::new(AtomicU64::new(0));
        let (endpoints, capture, playback) = open_endpoints(
            pair.input,
            &resolved_input,
            pair.output,
            &resolved_output,
            &self.config,
            Arc::clone(&dropped_input),
        )?;

        let mut processor =
            BufferProcessor::new(effect, self.params.reader(), self.config.sample_rate);
        if let Some(callback) = self.event_callback.clone() {
            processor = processor.with_event_callback(callback);
        }

        Ok(Session::new(
            processor,
            capture,
            playback,
            &self.config,
            recorder,
            self.event_callback.clone(),
            dropped_input,
            Some(endpoints),
        ))
    }

    /// Stops the running session, if any. A stop request while idle is a
    /// no-op. Blocks for at most about one buffer period while the engine
    /// thread finishes its current buffer.
    pub fn stop(&mut self) {
        if let Some(session) = self.session.take() {
            session.stop();
            self.resting_state = StreamState::Stopped;
        }
    }

    /// Writes one live parameter. Takes effect on the engine's next buffer.
    pub fn set_param(&self, key: &str, value: f32) {
        self.params.set(key, value);
    }

    /// Current session state ([`StreamState::Idle`] before the first start).
    pub fn state(&self) -> StreamState {
        self.session
            .as_ref()
            .map(Session::state)
            .unwrap_or_else(|| self.resting_state.clone())
    }

    /// Statistics for the running session, if any.
    pub fn stats(&self) -> Option<SessionStats> {
        self.session.as_ref().map(Session::stats)
    }

    /// Lists the names of all stored effects.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Store`] if the store directory cannot be read.
    pub fn list_effects(&self) -> Result<Vec<String>, EngineError> {
        self.store.list().map_err(|e| EngineError::Store {
            reason: e.to_string(),
        })
    }

    /// Validates and persists effect source under `name`.
    ///
    /// The source is compiled and its entry point checked before anything is
    /// written, so the store only ever contains loadable effects saved
    /// through this path. Returns the path of the written record.
    ///
    /// # Errors
    ///
    /// [`LoadError`](crate::LoadError) variants for invalid source,
    /// [`EngineError::Store`] for I/O failures.
    pub fn save_effect(&self, name: &str, source: &str) -> Result<PathBuf, EngineError> {
        ScriptEffect::load_from_source(source)?;
        self.store.save(name, source).map_err(|e| EngineError::Store {
            reason: e.to_string(),
        })
    }
}
