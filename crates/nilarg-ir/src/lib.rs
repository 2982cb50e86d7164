//! nilarg IR - the SSA representation consumed by the panic-argument
//! analysis.
//!
//! The IR is built by a compiler frontend and deserialized here. This
//! crate provides:
//! - Owned IR types matching the bridge's JSON output
//! - CFG navigation helpers and the dominator tree
//! - Type system helpers

pub mod cfg; // CFG navigation and dominators
pub mod ir; // Owned IR types
pub mod types; // Type system helpers

/// Load a bridge JSON file and deserialize it into the owned IR.
pub fn load_json_file(path: &std::path::Path) -> Result<ir::AnalysisInput, String> {
    let data = std::fs::read_to_string(path).map_err(|e| format!("read error: {e}"))?;
    serde_json::from_str(&data).map_err(|e| format!("invalid IR JSON: {e}"))
}
