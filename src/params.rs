//! Live session parameters shared between the control surface and the engine.
//!
//! The parameter cell is the one piece of state both actors touch while a
//! session runs: the control actor writes at any time, the engine actor reads
//! one snapshot per buffer. The contract is last-write-wins; parameters are
//! continuously-adjustable controls, not transactional data, so no atomicity
//! across fields is guaranteed beyond "the next iteration sees some
//! recently-written value".

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

/// The parameter set for one session.
///
/// `gain` is the built-in control used by pass-through mode; any other named
/// parameter is forwarded to the active effect verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionParams {
    /// Output gain, applied in pass-through mode and offered to plugins
    /// under the key `"gain"`.
    pub gain: f32,
    /// Additional named parameters forwarded to the plugin.
    pub extra: BTreeMap<String, f32>,
}

impl Default for SessionParams {
    fn default() -> Self {
        Self {
            gain: 1.0,
            extra: BTreeMap::new(),
        }
    }
}

impl SessionParams {
    /// Creates a parameter set with the given gain and no extras.
    pub fn with_gain(gain: f32) -> Self {
        Self {
            gain,
            ..Self::default()
        }
    }

    /// Sets a parameter by name. `"gain"` targets the built-in gain field;
    /// any other key lands in [`extra`](Self::extra).
    pub fn set(&mut self, key: &str, value: f32) {
        if key == "gain" {
            self.gain = value;
        } else {
            self.extra.insert(key.to_string(), value);
        }
    }

    /// Reads a parameter by name, `"gain"` included.
    pub fn get(&self, key: &str) -> Option<f32> {
        if key == "gain" {
            Some(self.gain)
        } else {
            self.extra.get(key).copied()
        }
    }
}

/// Thread-safe parameter cell shared across the two session actors.
///
/// Cloning is cheap (the cell is `Arc`-backed) and all clones observe the
/// same values. The engine actor holds a [`ParamsReader`] so it cannot
/// accidentally write.
#[derive(Debug, Clone, Default)]
pub struct SharedParams {
    inner: Arc<RwLock<SessionParams>>,
}

impl SharedParams {
    /// Creates a cell holding the given initial parameters.
    pub fn new(params: SessionParams) -> Self {
        Self {
            inner: Arc::new(RwLock::new(params)),
        }
    }

    /// Replaces the whole parameter set.
    pub fn replace(&self, params: SessionParams) {
        *self.inner.write() = params;
    }

    /// Writes one parameter by name.
    pub fn set(&self, key: &str, value: f32) {
        self.inner.write().set(key, value);
    }

    /// Returns a copy of the current parameter set.
    pub fn snapshot(&self) -> SessionParams {
        self.inner.read().clone()
    }

    /// Hands out the read-only view given to the engine actor.
    pub fn reader(&self) -> ParamsReader {
        ParamsReader {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Read-only handle to a [`SharedParams`] cell.
#[derive(Debug, Clone)]
pub struct ParamsReader {
    inner: Arc<RwLock<SessionParams>>,
}

impl ParamsReader {
    /// Returns a copy of the current parameter set.
    pub fn snapshot(&self) -> SessionParams {
        self.inner.read().clone()
    }
}
