//! Panic-argument facts and the stores that hold them.
//!
//! A `PanicArgs` fact records, for one function, the parameter
//! positions at which a nil argument makes the body panic. Facts only
//! ever grow during a run; that monotonicity is what bounds the
//! interprocedural fixed point.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;

/// The set of parameter indices (0-based) of one function at which a
/// nil argument traps the body. Ordered so exports are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PanicArgs(BTreeSet<u32>);

impl PanicArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an index; returns true if it was not already present.
    pub fn insert(&mut self, index: u32) -> bool {
        self.0.insert(index)
    }

    pub fn contains(&self, index: u32) -> bool {
        self.0.contains(&index)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }

    pub fn is_superset(&self, other: &PanicArgs) -> bool {
        self.0.is_superset(&other.0)
    }

    /// Union `other` into `self`; returns true if anything was added.
    pub fn merge(&mut self, other: &PanicArgs) -> bool {
        let before = self.0.len();
        self.0.extend(other.0.iter().copied());
        self.0.len() > before
    }
}

impl FromIterator<u32> for PanicArgs {
    fn from_iter<T: IntoIterator<Item = u32>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Fact storage keyed by qualified function name.
///
/// `panic_args` answers for the current unit (empty set until proven
/// otherwise); `import_panic_args` answers for functions defined in
/// other units, where absence is meaningful. The per-package done
/// sentinel tells importers whether a package's own fixed point has
/// settled, i.e. whether an import is authoritative.
pub trait FactStore {
    /// Recorded facts for a function; empty set if none yet.
    fn panic_args(&self, func: &str) -> PanicArgs;

    /// Durably record a function's facts. Exports are monotone: indices
    /// already recorded are never removed, and re-exporting the same
    /// set is a no-op.
    fn export_panic_args(&mut self, func: &str, fact: &PanicArgs);

    /// Record a single index for a function; idempotent.
    fn add(&mut self, func: &str, index: u32) {
        let mut fact = self.panic_args(func);
        if fact.insert(index) {
            self.export_panic_args(func, &fact);
        }
    }

    /// Facts previously exported for a function defined elsewhere.
    fn import_panic_args(&self, func: &str) -> Option<PanicArgs>;

    /// Mark a package's intra-package fixed point as settled.
    fn export_package_done(&mut self, pkg: &str);

    /// Whether a package's fixed point has settled.
    fn package_done(&self, pkg: &str) -> bool;
}

/// In-memory fact store backing a single analysis run.
#[derive(Debug, Default)]
pub struct MemoryFactStore {
    functions: BTreeMap<String, PanicArgs>,
    done: HashSet<String>,
}

impl MemoryFactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with a previously persisted package archive.
    pub fn absorb(&mut self, archive: PackageFacts) {
        for (func, fact) in archive.functions {
            self.functions.entry(func).or_default().merge(&fact);
        }
        if archive.done {
            self.done.insert(archive.package);
        }
    }

    /// Extract one package's facts for persistence. Functions are
    /// matched by qualified-name prefix, so method names in receiver
    /// form (`(*path.T).M`) are included.
    pub fn snapshot(&self, pkg: &str) -> PackageFacts {
        let functions = self
            .functions
            .iter()
            .filter(|(name, fact)| belongs_to_package(name, pkg) && !fact.is_empty())
            .map(|(name, fact)| (name.clone(), fact.clone()))
            .collect();
        PackageFacts {
            package: pkg.to_string(),
            functions,
            done: self.done.contains(pkg),
        }
    }
}

impl FactStore for MemoryFactStore {
    fn panic_args(&self, func: &str) -> PanicArgs {
        self.functions.get(func).cloned().unwrap_or_default()
    }

    fn export_panic_args(&mut self, func: &str, fact: &PanicArgs) {
        self.functions.entry(func.to_string()).or_default().merge(fact);
    }

    fn import_panic_args(&self, func: &str) -> Option<PanicArgs> {
        self.functions.get(func).cloned()
    }

    fn export_package_done(&mut self, pkg: &str) {
        self.done.insert(pkg.to_string());
    }

    fn package_done(&self, pkg: &str) -> bool {
        self.done.contains(pkg)
    }
}

/// Whether a qualified function name belongs to a package, covering
/// both plain functions (`path.F`) and methods in receiver form
/// (`(path.T).M`, `(*path.T).M`).
pub fn belongs_to_package(func: &str, pkg: &str) -> bool {
    let plain = func
        .strip_prefix(pkg)
        .map(|rest| rest.starts_with('.') && !rest[1..].contains('/'))
        .unwrap_or(false);
    if plain {
        return true;
    }
    let recv = func
        .strip_prefix("(*")
        .or_else(|| func.strip_prefix('('))
        .unwrap_or(func);
    recv != func
        && recv
            .strip_prefix(pkg)
            .map(|rest| rest.starts_with('.'))
            .unwrap_or(false)
}

/// The package a qualified function name belongs to, if derivable.
pub fn package_of(func: &str) -> Option<&str> {
    if let Some(rest) = func.strip_prefix("(*").or_else(|| func.strip_prefix('(')) {
        // method in receiver form: strip the type segment too
        let recv = &rest[..rest.find(')')?];
        recv.rsplit_once('.').map(|(pkg, _)| pkg)
    } else {
        func.rsplit_once('.').map(|(pkg, _)| pkg)
    }
}

/// One package's facts in persistable form.
///
/// Archives are written as a JSON file per package so a later run of a
/// dependent unit can import them without re-analyzing the package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageFacts {
    pub package: String,
    pub functions: BTreeMap<String, PanicArgs>,
    /// True once the package's own fixed point settled.
    pub done: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum FactsError {
    #[error("facts io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("facts encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PackageFacts {
    /// Persist under `dir` as `<sanitized-package>.facts.json`,
    /// creating the directory if needed.
    pub fn save(&self, dir: &Path) -> Result<(), FactsError> {
        std::fs::create_dir_all(dir)?;
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(dir.join(Self::file_name(&self.package)), json)?;
        Ok(())
    }

    /// Load a package's archive from `dir`; `None` if never exported.
    pub fn load(dir: &Path, pkg: &str) -> Result<Option<Self>, FactsError> {
        let path = dir.join(Self::file_name(pkg));
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn file_name(pkg: &str) -> String {
        let sanitized: String = pkg
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            })
            .collect();
        format!("{sanitized}.facts.json")
    }
}
