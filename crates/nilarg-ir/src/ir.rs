//! Owned SSA IR for nil-argument analysis.
//!
//! These types mirror the JSON schema produced by the frontend bridge:
//! one `AnalysisInput` per run, one `Package` per compilation unit, and
//! flattened instructions that reference other SSA values by id. The IR
//! is immutable once deserialized; analysis passes only read it.

use serde::{Deserialize, Serialize};

/// Root type - complete analysis input from the frontend bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisInput {
    pub packages: Vec<Package>,
    #[serde(default)]
    pub ssa_version: String,
}

/// A compilation unit with full SSA.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    /// Stable unit identity (import path).
    pub import_path: String,
    pub name: String,
    pub types: Vec<TypeRef>,
    pub functions: Vec<Function>,
}

/// Type reference with unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeRef {
    pub id: u32,
    pub kind: TypeKind,
    pub name: String,
    /// For `Named` types: the type id of the underlying form (0 = none).
    #[serde(default)]
    pub underlying: u32,
    /// For pointers, slices, maps, chans: the element type id (0 = none).
    #[serde(default)]
    pub elem: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TypeKind {
    Basic,
    Named,
    Pointer,
    Slice,
    Array,
    Map,
    Chan,
    Struct,
    Interface,
    Signature,
    Tuple,
    #[serde(other)]
    Unknown,
}

/// Source location span.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Span {
    pub file: String,
    pub start_line: u32,
    pub start_col: u32,
    #[serde(default)]
    pub end_line: u32,
    #[serde(default)]
    pub end_col: u32,
}

impl Span {
    pub fn new(file: impl Into<String>, line: u32, col: u32) -> Self {
        Self {
            file: file.into(),
            start_line: line,
            start_col: col,
            end_line: line,
            end_col: col,
        }
    }
}

/// SSA function with explicit parameter list and full CFG.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    /// Qualified name, stable across units (e.g. `example.com/pkg.Load`).
    pub name: String,
    pub short_name: String,
    #[serde(default)]
    pub span: Option<Span>,
    /// Parameters in declaration order.
    #[serde(default)]
    pub params: Vec<Parameter>,
    pub blocks: Vec<BasicBlock>,
    pub cfg_edges: Vec<CfgEdge>,
}

/// A function parameter. `id` is the parameter's SSA value id; uses of
/// the parameter reference this id in their operand lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub id: u32,
    pub name: String,
    pub type_id: u32,
}

/// SSA basic block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicBlock {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    pub instructions: Vec<Instruction>,
}

/// CFG edge between basic blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CfgEdge {
    pub from_block: u32,
    pub to_block: u32,
    pub kind: EdgeKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum EdgeKind {
    Unconditional,
    /// Taken when an `If` terminator's condition is true.
    CondTrue,
    /// Taken when an `If` terminator's condition is false.
    CondFalse,
    #[serde(other)]
    Unknown,
}

/// Flattened SSA instruction. Which payload fields are meaningful
/// depends on `kind`; the bridge leaves the rest at their defaults.
///
/// Operand layout by kind:
/// - `FieldAddr`/`Field`/`IndexAddr`/`Slice`/`TypeAssert`/`UnOp`/`Lookup`:
///   `operands[0]` is the accessed value.
/// - `Store`: `[addr, val]`. `MapUpdate`: `[map, key, val]`.
/// - `BinOp`: `[x, y]`. `If`: `[cond]`. `Return`/`Phi`: results/inputs.
/// - `Call`: the argument values in order; the callee is `callee`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instruction {
    pub id: u32,
    pub kind: ValueKind,
    pub name: String,
    #[serde(default)]
    pub type_id: u32,
    #[serde(default)]
    pub span: Option<Span>,
    #[serde(default)]
    pub operands: Vec<u32>,

    // Call-specific
    #[serde(default)]
    pub callee: Option<String>,
    /// True for dynamic (interface) dispatch; the concrete callee is
    /// unknown and `callee` names only the interface method.
    #[serde(default)]
    pub callee_is_interface: bool,

    // TypeAssert-specific
    /// True for the two-result `v, ok :=` form, which never traps.
    #[serde(default)]
    pub comma_ok: bool,

    // Const-specific
    #[serde(default)]
    pub const_value: Option<String>,
    #[serde(default)]
    pub is_nil: bool,

    // BinOp / UnOp operators ("==", "!=", "*", "-", ...)
    #[serde(default)]
    pub bin_op: Option<String>,
    #[serde(default)]
    pub un_op: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ValueKind {
    Const,
    Alloc,
    FieldAddr,
    Field,
    IndexAddr,
    Lookup,
    Slice,
    TypeAssert,
    Store,
    MapUpdate,
    UnOp,
    BinOp,
    Phi,
    Extract,
    Call,
    MakeMap,
    MakeSlice,
    MakeInterface,
    If,
    Jump,
    Return,
    Panic,
    #[serde(other)]
    Unknown,
}
