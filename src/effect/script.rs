//! Script-backed effect plugin.
//!
//! Effect source is Rhai script text defining a single `apply` function. The
//! entry point is validated at load time: a source that compiles but defines
//! no 3-argument `apply` is rejected with [`LoadError::MissingEntryPoint`],
//! so there is no attribute probing at call time.
//!
//! # Trust boundary
//!
//! Effect source is untrusted user input. It runs embedded, with no file or
//! network access (nothing is registered on the script engine), and with a
//! per-invocation operation budget so a runaway script fails that buffer
//! instead of stalling the capture/playback cadence. It is *not* a security
//! sandbox against a determined author; treat stored effects like any other
//! local configuration you choose to run.

use rhai::{Array, Dynamic, Engine, Map, Scope, AST};

use crate::effect::{EffectPlugin, EffectStore};
use crate::error::{ApplyError, LoadError};
use crate::params::SessionParams;

/// Name of the required entry-point function.
const ENTRY_POINT: &str = "apply";

/// Operation budget for one `apply` invocation. Orders of magnitude above
/// what a per-sample loop over a 1024-sample buffer needs; an effect that
/// exceeds it fails that buffer only.
const MAX_OPERATIONS: u64 = 5_000_000;

/// An effect compiled from script source text.
///
/// Construct with [`load_from_source`](Self::load_from_source) (live preview
/// of unsaved edits) or [`load_from_store`](Self::load_from_store) (persisted
/// effects). Both enforce the same contract.
pub struct ScriptEffect {
    engine: Engine,
    ast: AST,
    source: String,
}

impl std::fmt::Debug for ScriptEffect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptEffect")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl ScriptEffect {
    /// Compiles effect source text and binds its `apply` entry point.
    ///
    /// # Errors
    ///
    /// - [`LoadError::Compile`] if the source is not valid script code
    /// - [`LoadError::MissingEntryPoint`] if no 3-argument `apply` function
    ///   is defined
    pub fn load_from_source(source: &str) -> Result<Self, LoadError> {
        let mut engine = Engine::new();
        engine.set_max_operations(MAX_OPERATIONS);

        let ast = engine.compile(source).map_err(|e| LoadError::Compile {
            detail: e.to_string(),
        })?;

        let has_entry_point = ast
            .iter_functions()
            .any(|f| f.name == ENTRY_POINT && f.params.len() == 3);
        if !has_entry_point {
            return Err(LoadError::MissingEntryPoint);
        }

        Ok(Self {
            engine,
            ast,
            source: source.to_string(),
        })
    }

    /// Reads a named effect from the store and compiles it.
    ///
    /// # Errors
    ///
    /// [`LoadError::Read`] if the record cannot be read, otherwise the same
    /// errors as [`load_from_source`](Self::load_from_source).
    pub fn load_from_store(store: &EffectStore, name: &str) -> Result<Self, LoadError> {
        let source = store.read(name).map_err(|e| LoadError::Read {
            name: name.to_string(),
            source: e,
        })?;
        Self::load_from_source(&source)
    }

    /// The source text this effect was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl EffectPlugin for ScriptEffect {
    fn apply(
        &mut self,
        samples: &[f32],
        sample_rate: u32,
        params: &SessionParams,
    ) -> Result<Vec<f32>, ApplyError> {
        let buffer: Array = samples
            .iter()
            .map(|&s| Dynamic::from_float(f64::from(s)))
            .collect();

        let mut scope = Scope::new();
        let result: Dynamic = self
            .engine
            .call_fn(
                &mut scope,
                &self.ast,
                ENTRY_POINT,
                (buffer, i64::from(sample_rate), params_to_map(params)),
            )
            .map_err(|e| ApplyError::Script {
                detail: e.to_string(),
            })?;

        dynamic_to_samples(result)
    }
}

/// Builds the parameter mapping handed to the script: the built-in gain plus
/// every extra parameter, all as script floats.
fn params_to_map(params: &SessionParams) -> Map {
    let mut map = Map::new();
    map.insert("gain".into(), Dynamic::from_float(f64::from(params.gain)));
    for (key, value) in &params.extra {
        map.insert(key.as_str().into(), Dynamic::from_float(f64::from(*value)));
    }
    map
}

/// Converts a script return value back into a sample buffer.
/// Integer elements are accepted (scripts that compute `0` instead of `0.0`).
fn dynamic_to_samples(value: Dynamic) -> Result<Vec<f32>, ApplyError> {
    let type_name = value.type_name();
    let array = value
        .try_cast::<Array>()
        .ok_or_else(|| ApplyError::NotABuffer {
            detail: type_name.to_string(),
        })?;

    array
        .into_iter()
        .map(|item| {
            let item_type = item.type_name();
            if let Some(f) = item.clone().try_cast::<f64>() {
                Ok(f as f32)
            } else if let Some(i) = item.try_cast::<i64>() {
                Ok(i as f32)
            } else {
                Err(ApplyError::NotABuffer {
                    detail: format!("element of type {item_type}"),
                })
            }
        })
        .collect()
}
