//! Dominating nil-check recognition.
//!
//! A use of a parameter is suppressed when its block is dominated by a
//! branch that already proved the parameter non-nil. The walk ascends
//! the dominator tree looking for an `If` whose condition compares the
//! parameter against a nil literal, and checks which conditional
//! successor the walk came from. This is deliberately weaker than a
//! full dataflow join: checks routed through boolean temporaries or
//! non-dominating early returns are not recognized.

use std::collections::{HashMap, HashSet};

use nilarg_ir::cfg::{Cfg, DomTree};
use nilarg_ir::ir::{Instruction, ValueKind};

/// Whether execution reaching `block` implies the parameter `param` is
/// known to be non-nil.
pub fn is_nil_checked(
    param: u32,
    block: u32,
    cfg: &Cfg<'_>,
    dom: &DomTree,
    instr_map: &HashMap<u32, &Instruction>,
) -> bool {
    let mut visited = HashSet::new();
    walk(param, block, cfg, dom, instr_map, &mut visited, false)
}

/// Whether execution reaching `block` implies the parameter `param` is
/// known to be nil. Used by the call-site diagnostic pass only.
pub fn is_nil_proven(
    param: u32,
    block: u32,
    cfg: &Cfg<'_>,
    dom: &DomTree,
    instr_map: &HashMap<u32, &Instruction>,
) -> bool {
    let mut visited = HashSet::new();
    walk(param, block, cfg, dom, instr_map, &mut visited, true)
}

/// A value is a nil literal when its defining instruction is a `Const`
/// whose declared nilness is set.
pub fn is_nil_const(value: u32, instr_map: &HashMap<u32, &Instruction>) -> bool {
    instr_map
        .get(&value)
        .map(|i| i.kind == ValueKind::Const && i.is_nil)
        .unwrap_or(false)
}

fn walk(
    param: u32,
    block: u32,
    cfg: &Cfg<'_>,
    dom: &DomTree,
    instr_map: &HashMap<u32, &Instruction>,
    visited: &mut HashSet<u32>,
    prove_nil: bool,
) -> bool {
    // The visited set only matters if the SSA producer handed us a
    // cyclic idom chain; a well-formed tree always terminates upward.
    if !visited.insert(block) {
        return false;
    }
    let Some(idom) = dom.idom(block) else {
        return false;
    };

    if let Some(target) = proof_successor(param, idom, cfg, instr_map, prove_nil) {
        if block == target {
            return true;
        }
    }

    walk(param, idom, cfg, dom, instr_map, visited, prove_nil)
}

/// If `block` ends in `If(param == nil)` or `If(param != nil)`, the
/// successor on which the proof holds; `None` when the terminator is
/// no such comparison.
fn proof_successor(
    param: u32,
    block: u32,
    cfg: &Cfg<'_>,
    instr_map: &HashMap<u32, &Instruction>,
    prove_nil: bool,
) -> Option<u32> {
    let term = cfg.terminator(block)?;
    if term.kind != ValueKind::If {
        return None;
    }
    let cond = instr_map.get(term.operands.first()?)?;
    if cond.kind != ValueKind::BinOp {
        return None;
    }
    let is_eq = match cond.bin_op.as_deref() {
        Some("==") => true,
        Some("!=") => false,
        _ => return None,
    };
    let [x, y] = cond.operands[..] else {
        return None;
    };

    // Exactly one side is the nil literal and the other side is the
    // parameter itself (SSA identity, not name).
    let x_nil = is_nil_const(x, instr_map);
    let y_nil = is_nil_const(y, instr_map);
    let matches = (x_nil && !y_nil && y == param) || (y_nil && !x_nil && x == param);
    if !matches {
        return None;
    }

    let (on_true, on_false) = cfg.cond_successors(block)?;
    // `param == nil` proves non-nil on the false arm, nil on the true
    // arm; `param != nil` is the mirror image.
    Some(match (is_eq, prove_nil) {
        (true, false) => on_false,
        (true, true) => on_true,
        (false, false) => on_true,
        (false, true) => on_false,
    })
}
