//! Type system helpers over bridge type tables.

use crate::ir::{Package, TypeKind, TypeRef};
use std::collections::HashMap;

/// Type lookup table for a package.
pub struct TypeMap {
    types: HashMap<u32, TypeRef>,
}

impl TypeMap {
    pub fn from_package(pkg: &Package) -> Self {
        let types = pkg.types.iter().map(|t| (t.id, t.clone())).collect();
        Self { types }
    }

    /// Kind of a type after resolving `Named` wrappers to their
    /// underlying form. The resolution is bounded by the table size so
    /// a malformed `underlying` chain cannot loop.
    pub fn underlying_kind(&self, id: u32) -> Option<TypeKind> {
        let mut id = id;
        for _ in 0..=self.types.len() {
            let t = self.types.get(&id)?;
            if t.kind == TypeKind::Named && t.underlying != 0 && t.underlying != id {
                id = t.underlying;
                continue;
            }
            return Some(t.kind);
        }
        None
    }

    /// Whether values of this type include the nil reference in a way
    /// that dereferencing traps. Function types are syntactically
    /// nillable but excluded: calling a nil function value is not
    /// modeled by this analysis.
    pub fn is_nilable(&self, id: u32) -> bool {
        matches!(
            self.underlying_kind(id),
            Some(
                TypeKind::Pointer
                    | TypeKind::Interface
                    | TypeKind::Map
                    | TypeKind::Slice
                    | TypeKind::Chan
            )
        )
    }

    /// Whether the type's underlying form is a pointer. Distinguishes
    /// slicing through a pointer-to-array (traps on nil) from slicing
    /// a slice or string (does not).
    pub fn is_pointer_underlying(&self, id: u32) -> bool {
        self.underlying_kind(id) == Some(TypeKind::Pointer)
    }
}
