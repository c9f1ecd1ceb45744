//! Per-buffer transform path of the streaming loop.
//!
//! [`BufferProcessor`] owns the session's effect plugin (if any) and applies
//! the per-iteration policy: empty buffers are skipped, a plugin failure
//! degrades to pass-through for that buffer only, and the plugin stays active
//! for subsequent buffers. It is pure with respect to audio I/O, which keeps
//! the whole policy testable without hardware.

use crate::effect::EffectPlugin;
use crate::error::ApplyError;
use crate::event::{EngineEvent, EventCallback};
use crate::params::ParamsReader;

/// Applies the active effect (or the pass-through gain) to each buffer.
///
/// One processor exists per session, used only by the engine actor; buffers
/// are processed strictly in order and `apply` is never invoked for two
/// buffers concurrently.
pub struct BufferProcessor {
    effect: Option<Box<dyn EffectPlugin>>,
    params: ParamsReader,
    sample_rate: u32,
    event_callback: Option<EventCallback>,
}

impl BufferProcessor {
    /// Creates a processor. `effect: None` selects pass-through mode.
    pub fn new(
        effect: Option<Box<dyn EffectPlugin>>,
        params: ParamsReader,
        sample_rate: u32,
    ) -> Self {
        Self {
            effect,
            params,
            sample_rate,
            event_callback: None,
        }
    }

    /// Sets a callback to receive per-buffer plugin error events.
    #[must_use]
    pub fn with_event_callback(mut self, callback: EventCallback) -> Self {
        self.event_callback = Some(callback);
        self
    }

    /// Returns `true` if an effect plugin is active.
    pub fn has_effect(&self) -> bool {
        self.effect.is_some()
    }

    /// Processes one buffer. Returns `None` for an empty input buffer, which
    /// the loop skips without writing anything downstream.
    ///
    /// The parameter cell is read exactly once per call, so a whole buffer
    /// sees one consistent parameter snapshot.
    pub fn process(&mut self, input: &[f32]) -> Option<Vec<f32>> {
        if input.is_empty() {
            return None;
        }

        let params = self.params.snapshot();

        if let Some(effect) = self.effect.as_mut() {
            match effect
                .apply(input, self.sample_rate, &params)
                .and_then(|out| {
                    if out.len() == input.len() {
                        Ok(out)
                    } else {
                        Err(ApplyError::LengthMismatch {
                            expected: input.len(),
                            actual: out.len(),
                        })
                    }
                }) {
                Ok(out) => return Some(out),
                Err(err) => {
                    // Contained to this buffer; the plugin is not disabled.
                    tracing::warn!(error = %err, "effect failed, passing buffer through");
                    if let Some(callback) = &self.event_callback {
                        callback(EngineEvent::PluginError {
                            detail: err.to_string(),
                        });
                    }
                }
            }
        }

        Some(input.iter().map(|&s| s * params.gain).collect())
    }
}
