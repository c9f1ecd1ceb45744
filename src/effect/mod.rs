//! Effect plugin contract and selection.
//!
//! An effect is a unit of user-authored transform logic with one entry point:
//! `apply(samples, sample_rate, params) -> samples`. The streaming engine
//! depends only on the [`EffectPlugin`] trait; [`ScriptEffect`] is the
//! built-in script-backed implementation, and custom hosts can provide their
//! own (a native DSP unit, a test double, ...).

mod script;
mod store;

pub use script::ScriptEffect;
pub use store::{EffectStore, EFFECT_EXTENSION};

use crate::error::ApplyError;
use crate::params::SessionParams;

/// A loaded effect plugin, exclusively owned by one session's engine actor.
///
/// # Contract
///
/// `apply` receives a buffer of single-precision samples nominally in
/// `[-1.0, 1.0]`, the session sample rate in Hz, and the current parameter
/// set. It must return a buffer of the same length; the engine treats a
/// changed length as a plugin error for that buffer. The engine imposes no
/// numeric clamping on the output — clamping is the plugin's own business.
///
/// Implementations are called from the engine thread only, one buffer at a
/// time, strictly in order; there is never a concurrent `apply` for two
/// buffers.
pub trait EffectPlugin: Send {
    /// Transforms one buffer of samples.
    ///
    /// # Errors
    ///
    /// An error here is contained to this buffer: the engine logs it, falls
    /// back to `input * gain` for this iteration, and calls `apply` again on
    /// the next buffer.
    fn apply(
        &mut self,
        samples: &[f32],
        sample_rate: u32,
        params: &SessionParams,
    ) -> Result<Vec<f32>, ApplyError>;
}

/// Which effect a session should run, if any.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EffectSelection {
    /// No effect: output is the input scaled by the gain parameter.
    #[default]
    DryMic,
    /// A named effect loaded from the [`EffectStore`].
    Stored(String),
    /// Unsaved source text, compiled directly. Used for live preview of
    /// in-progress edits; never touches the store.
    Inline(String),
}

impl EffectSelection {
    /// Returns `true` for the pass-through (no effect) selection.
    pub fn is_dry(&self) -> bool {
        matches!(self, EffectSelection::DryMic)
    }
}
