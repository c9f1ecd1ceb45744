//! Directory-backed store of named effect records.
//!
//! One file per record: `<dir>/<name>.vocaleffect`, content = raw UTF-8
//! source text, no header or metadata. Membership is derived purely from the
//! directory listing at access time; there is no index file. The core never
//! deletes records.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// File extension carried by every effect record.
pub const EFFECT_EXTENSION: &str = "vocaleffect";

/// Source seeded into new effects by editor front ends: a gain with output
/// clamping, the simplest effect that exercises the whole `apply` contract.
const TEMPLATE: &str = r#"fn apply(samples, sample_rate, params) {
    let gain = params["gain"];
    let out = [];
    for x in samples {
        let y = x * gain;
        if y > 1.0 { y = 1.0 }
        if y < -1.0 { y = -1.0 }
        out.push(y);
    }
    out
}
"#;

/// A flat directory of named, persisted effect plugins.
///
/// # Example
///
/// ```no_run
/// use vocalfx::EffectStore;
///
/// let store = EffectStore::new("effects");
/// store.save("robo", EffectStore::template())?;
/// assert!(store.list()?.contains(&"robo".to_string()));
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct EffectStore {
    dir: PathBuf,
}

impl EffectStore {
    /// Creates a store rooted at `dir`. The directory is created lazily on
    /// the first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory backing this store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The path a record with this name lives at (whether or not it exists).
    pub fn path_of(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{EFFECT_EXTENSION}"))
    }

    /// Writes `source` verbatim as the record named `name`, creating the
    /// store directory if absent. Overwrites silently if the name exists.
    ///
    /// Returns the path of the written record.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the directory cannot be created
    /// or the file cannot be written.
    pub fn save(&self, name: &str, source: &str) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_of(name);
        fs::write(&path, source)?;
        tracing::debug!(path = %path.display(), "saved effect");
        Ok(path)
    }

    /// Lists every record name in the store, in directory-enumeration order
    /// (no guaranteed sort). A missing store directory is an empty store.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the directory cannot be read.
    pub fn list(&self) -> io::Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EFFECT_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        Ok(names)
    }

    /// Reads the raw source text of the record named `name`.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error (`NotFound` included) if the record
    /// cannot be read.
    pub fn read(&self, name: &str) -> io::Result<String> {
        fs::read_to_string(self.path_of(name))
    }

    /// The effect source seeded into editors for a new effect.
    pub fn template() -> &'static str {
        TEMPLATE
    }
}
