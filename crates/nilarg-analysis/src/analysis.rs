//! Panic-argument analysis engine.
//!
//! For every function, finds the parameters whose being nil makes the
//! body panic with a nil dereference, and propagates those facts over
//! static call edges until the unit reaches a fixed point. The scan is
//! flow-insensitive per instruction; reports are suppressed only when
//! the use is dominated by a successful nil check.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use nilarg_diagnostics::Diagnostic;
use nilarg_facts::{belongs_to_package, package_of, FactStore, PanicArgs};
use nilarg_ir::cfg::{Cfg, DomTree};
use nilarg_ir::ir::{AnalysisInput, Function, Instruction, Package, ValueKind};
use nilarg_ir::types::TypeMap;

use crate::nilcheck;
use crate::rules;

/// Result of one unit's fixed point.
#[derive(Debug, Clone)]
pub struct UnitOutcome {
    pub package: String,
    /// True when the unit converged with no unresolved cross-unit
    /// callees; only then is the package-done sentinel exported.
    pub settled: bool,
    /// Full sweeps over the unit's functions, including the final
    /// no-addition sweep.
    pub sweeps: usize,
    /// Packages whose done sentinel was missing while their functions
    /// were being called. The driver should rerun this unit after they
    /// settle.
    pub pending_packages: BTreeSet<String>,
}

/// Interprocedural panic-argument analysis.
pub struct PanicArgsAnalyzer;

impl PanicArgsAnalyzer {
    /// Analyze every package of an input against one shared store.
    pub fn analyze(input: &AnalysisInput, store: &mut dyn FactStore) -> Vec<UnitOutcome> {
        input
            .packages
            .iter()
            .map(|pkg| Self::analyze_package(pkg, store))
            .collect()
    }

    /// Run one unit's fixed point to completion.
    pub fn analyze_package(pkg: &Package, store: &mut dyn FactStore) -> UnitOutcome {
        Self::analyze_package_with_cancel(pkg, store, &AtomicBool::new(false))
    }

    /// Like `analyze_package`, checking `cancel` between sweeps. A
    /// cancelled run leaves the store at the last completed sweep and
    /// reports `settled == false`.
    pub fn analyze_package_with_cancel(
        pkg: &Package,
        store: &mut dyn FactStore,
        cancel: &AtomicBool,
    ) -> UnitOutcome {
        let type_map = TypeMap::from_package(pkg);

        // Each sweep that is not the last adds at least one index, so a
        // well-formed unit settles within nillable-params + 1 sweeps.
        let sweep_bound = pkg
            .functions
            .iter()
            .map(|f| {
                f.params
                    .iter()
                    .filter(|p| type_map.is_nilable(p.type_id))
                    .count()
            })
            .sum::<usize>()
            + 1;

        let mut pending = BTreeSet::new();
        let mut sweeps = 0;
        let mut converged = false;

        while !cancel.load(Ordering::Relaxed) {
            sweeps += 1;
            pending.clear();
            let mut changed = false;
            for func in &pkg.functions {
                if check_function(func, pkg, &type_map, store, &mut pending) {
                    changed = true;
                }
            }
            if !changed {
                converged = true;
                break;
            }
            if sweeps >= sweep_bound {
                tracing::warn!(
                    package = %pkg.import_path,
                    sweeps,
                    "fixed point exceeded its monotone bound; SSA referrer lists are inconsistent"
                );
                break;
            }
        }

        let settled = converged && pending.is_empty();
        if settled {
            store.export_package_done(&pkg.import_path);
        }

        UnitOutcome {
            package: pkg.import_path.clone(),
            settled,
            sweeps,
            pending_packages: pending,
        }
    }

    /// Post-pass: for each static call whose argument at a flagged
    /// position is provably nil, emit a call-site diagnostic. Runs
    /// after the fixed point and never feeds back into it.
    pub fn collect_diagnostics(pkg: &Package, store: &dyn FactStore) -> Vec<Diagnostic> {
        let mut diags = Vec::new();
        for func in &pkg.functions {
            if func.blocks.is_empty() {
                continue;
            }
            let index = FuncIndex::build(func);
            let param_ids: HashSet<u32> = func.params.iter().map(|p| p.id).collect();
            for block in index.cfg.blocks() {
                for instr in &block.instructions {
                    if instr.kind != ValueKind::Call || instr.callee_is_interface {
                        continue;
                    }
                    let Some(callee) = instr.callee.as_deref() else {
                        continue;
                    };
                    let callee_fact = if belongs_to_package(callee, &pkg.import_path) {
                        store.panic_args(callee)
                    } else {
                        store.import_panic_args(callee).unwrap_or_default()
                    };
                    for k in callee_fact.iter() {
                        let Some(&arg) = instr.operands.get(k as usize) else {
                            continue;
                        };
                        let nil_literal = nilcheck::is_nil_const(arg, &index.instr_map);
                        let proven_nil = param_ids.contains(&arg)
                            && nilcheck::is_nil_proven(
                                arg,
                                block.id,
                                &index.cfg,
                                &index.dom,
                                &index.instr_map,
                            );
                        if nil_literal || proven_nil {
                            diags.push(rules::build_arg001(instr, callee, k, &func.short_name));
                        }
                    }
                }
            }
        }
        diags
    }
}

/// Per-function lookup structures, rebuilt for each scan of the
/// function. The referrer lists follow block order then instruction
/// order, so scans are deterministic across runs.
struct FuncIndex<'a> {
    cfg: Cfg<'a>,
    dom: DomTree,
    instr_map: HashMap<u32, &'a Instruction>,
    referrers: HashMap<u32, Vec<(u32, &'a Instruction)>>,
}

impl<'a> FuncIndex<'a> {
    fn build(func: &'a Function) -> Self {
        let cfg = Cfg::from_function(func);
        let dom = DomTree::compute(&cfg);

        let param_ids: HashSet<u32> = func.params.iter().map(|p| p.id).collect();
        let mut instr_map = HashMap::new();
        let mut referrers: HashMap<u32, Vec<(u32, &'a Instruction)>> = HashMap::new();
        for block in &func.blocks {
            for instr in &block.instructions {
                instr_map.insert(instr.id, instr);
                let mut seen = HashSet::new();
                for &op in &instr.operands {
                    if param_ids.contains(&op) && seen.insert(op) {
                        referrers.entry(op).or_default().push((block.id, instr));
                    }
                }
            }
        }

        Self {
            cfg,
            dom,
            instr_map,
            referrers,
        }
    }
}

/// Scan one function's parameters; export the fact if it grew.
/// Returns true when the store changed.
fn check_function(
    func: &Function,
    pkg: &Package,
    type_map: &TypeMap,
    store: &mut dyn FactStore,
    pending: &mut BTreeSet<String>,
) -> bool {
    if func.blocks.is_empty() {
        return false;
    }
    let index = FuncIndex::build(func);

    let mut fact = PanicArgs::new();
    for (i, param) in func.params.iter().enumerate() {
        if !type_map.is_nilable(param.type_id) {
            continue;
        }
        let Some(refs) = index.referrers.get(&param.id) else {
            continue;
        };
        for &(block_id, instr) in refs {
            // One witness per parameter: further referrers cannot
            // refine the result.
            if traps_when_nil(
                instr,
                block_id,
                param.id,
                param.type_id,
                pkg,
                type_map,
                &*store,
                &index,
                pending,
            ) {
                fact.insert(i as u32);
                break;
            }
        }
    }

    let old = store.panic_args(&func.name);
    if !fact.is_empty() && !old.is_superset(&fact) {
        tracing::debug!(
            func = %func.name,
            indices = ?fact.iter().collect::<Vec<_>>(),
            "exporting panic-args fact"
        );
        store.export_panic_args(&func.name, &fact);
        return true;
    }
    false
}

/// Whether executing `instr` traps whenever the parameter is nil.
#[allow(clippy::too_many_arguments)]
fn traps_when_nil(
    instr: &Instruction,
    block_id: u32,
    param_id: u32,
    param_type: u32,
    pkg: &Package,
    type_map: &TypeMap,
    store: &dyn FactStore,
    index: &FuncIndex<'_>,
    pending: &mut BTreeSet<String>,
) -> bool {
    let traps = match instr.kind {
        // p.field / &p.field / p[i]
        ValueKind::FieldAddr | ValueKind::Field | ValueKind::IndexAddr => {
            accesses_value(instr, param_id)
        }
        // Only the single-result assertion panics.
        ValueKind::TypeAssert => accesses_value(instr, param_id) && !instr.comma_ok,
        // p[:] traps only when slicing through a pointer-to-array.
        ValueKind::Slice => {
            accesses_value(instr, param_id) && type_map.is_pointer_underlying(param_type)
        }
        // *p = v; the stored value position is harmless.
        ValueKind::Store => accesses_value(instr, param_id),
        // p[k] = v
        ValueKind::MapUpdate => accesses_value(instr, param_id),
        // *p
        ValueKind::UnOp => accesses_value(instr, param_id) && instr.un_op.as_deref() == Some("*"),
        ValueKind::Call => call_traps_on(instr, param_id, pkg, store, pending),
        _ => false,
    };
    traps && !nilcheck::is_nil_checked(param_id, block_id, &index.cfg, &index.dom, &index.instr_map)
}

fn accesses_value(instr: &Instruction, value: u32) -> bool {
    instr.operands.first() == Some(&value)
}

/// The interprocedural case: a static call traps on the parameter when
/// the callee's recorded fact covers the position the parameter flows
/// into. Dynamic dispatch and unresolvable callees contribute nothing.
fn call_traps_on(
    instr: &Instruction,
    param_id: u32,
    pkg: &Package,
    store: &dyn FactStore,
    pending: &mut BTreeSet<String>,
) -> bool {
    if instr.callee_is_interface {
        return false;
    }
    let Some(callee) = instr.callee.as_deref() else {
        return false;
    };

    let callee_fact = if belongs_to_package(callee, &pkg.import_path) {
        store.panic_args(callee)
    } else {
        match package_of(callee) {
            Some(callee_pkg) => {
                if !store.package_done(callee_pkg) {
                    // The callee's unit has not settled; whatever we
                    // import now may still grow, so the driver must
                    // rerun this unit once it has.
                    pending.insert(callee_pkg.to_string());
                }
                store.import_panic_args(callee).unwrap_or_default()
            }
            // A builtin or other unqualified name.
            None => return false,
        }
    };

    let traps = callee_fact
        .iter()
        .any(|k| instr.operands.get(k as usize) == Some(&param_id));
    traps
}

#[cfg(test)]
mod tests {
    use super::*;
    use nilarg_facts::MemoryFactStore;
    use nilarg_ir::ir::*;

    const PKG: &str = "example.com/a";

    // type table: 1 int, 2 *int, 3 X (struct), 4 *X, 5 *[3]int,
    // 6 any (interface), 7 map[int]int, 8 [3]int, 9 []byte
    fn types() -> Vec<TypeRef> {
        let ty = |id, kind, name: &str| TypeRef {
            id,
            kind,
            name: name.into(),
            underlying: 0,
            elem: 0,
        };
        vec![
            ty(1, TypeKind::Basic, "int"),
            ty(2, TypeKind::Pointer, "*int"),
            ty(3, TypeKind::Struct, "X"),
            ty(4, TypeKind::Pointer, "*X"),
            ty(5, TypeKind::Pointer, "*[3]int"),
            ty(6, TypeKind::Interface, "any"),
            ty(7, TypeKind::Map, "map[int]int"),
            ty(8, TypeKind::Array, "[3]int"),
            ty(9, TypeKind::Slice, "[]byte"),
        ]
    }

    fn make_instr(id: u32, kind: ValueKind) -> Instruction {
        Instruction {
            id,
            kind,
            name: format!("t{id}"),
            type_id: 0,
            span: Some(Span::new("a.go", 10 + id, 1)),
            operands: vec![],
            callee: None,
            callee_is_interface: false,
            comma_ok: false,
            const_value: None,
            is_nil: false,
            bin_op: None,
            un_op: None,
        }
    }

    fn nil_const(id: u32) -> Instruction {
        let mut c = make_instr(id, ValueKind::Const);
        c.const_value = Some("nil".into());
        c.is_nil = true;
        c
    }

    fn deref(id: u32, x: u32) -> Instruction {
        let mut i = make_instr(id, ValueKind::UnOp);
        i.un_op = Some("*".into());
        i.operands = vec![x];
        i
    }

    fn store_instr(id: u32, addr: u32, val: u32) -> Instruction {
        let mut i = make_instr(id, ValueKind::Store);
        i.operands = vec![addr, val];
        i
    }

    fn call(id: u32, callee: &str, args: Vec<u32>) -> Instruction {
        let mut i = make_instr(id, ValueKind::Call);
        i.callee = Some(callee.into());
        i.operands = args;
        i
    }

    fn binop(id: u32, op: &str, x: u32, y: u32) -> Instruction {
        let mut i = make_instr(id, ValueKind::BinOp);
        i.bin_op = Some(op.into());
        i.operands = vec![x, y];
        i
    }

    fn if_instr(id: u32, cond: u32) -> Instruction {
        let mut i = make_instr(id, ValueKind::If);
        i.operands = vec![cond];
        i
    }

    fn param(id: u32, name: &str, type_id: u32) -> Parameter {
        Parameter {
            id,
            name: name.into(),
            type_id,
        }
    }

    fn block(id: u32, instructions: Vec<Instruction>) -> BasicBlock {
        BasicBlock {
            id,
            name: format!("b{id}"),
            instructions,
        }
    }

    fn edge(from: u32, to: u32, kind: EdgeKind) -> CfgEdge {
        CfgEdge {
            from_block: from,
            to_block: to,
            kind,
        }
    }

    fn single_block_func(name: &str, params: Vec<Parameter>, mut body: Vec<Instruction>) -> Function {
        body.push(make_instr(90, ValueKind::Return));
        Function {
            name: format!("{PKG}.{name}"),
            short_name: name.into(),
            span: None,
            params,
            blocks: vec![block(0, body)],
            cfg_edges: vec![],
        }
    }

    fn make_pkg(functions: Vec<Function>) -> Package {
        Package {
            import_path: PKG.into(),
            name: "a".into(),
            types: types(),
            functions,
        }
    }

    fn fact(indices: &[u32]) -> PanicArgs {
        indices.iter().copied().collect()
    }

    /// func f(i int, ip *int, x X, xp *X) { print(i, *ip, x, *xp) }
    fn func_f() -> Function {
        single_block_func(
            "f",
            vec![
                param(1, "i", 1),
                param(2, "ip", 2),
                param(3, "x", 3),
                param(4, "xp", 4),
            ],
            vec![
                deref(10, 2),
                deref(11, 4),
                call(12, "print", vec![1, 10, 3, 11]),
            ],
        )
    }

    /// func f3(ptr *[3]int) { *ptr = [3]int{} }
    fn func_f3() -> Function {
        single_block_func(
            "f3",
            vec![param(1, "ptr", 5)],
            vec![make_instr(10, ValueKind::Alloc), store_instr(11, 1, 10)],
        )
    }

    /// func f7(ptr *[3]int) { f3(ptr) }
    fn func_f7() -> Function {
        single_block_func(
            "f7",
            vec![param(1, "ptr", 5)],
            vec![call(10, &format!("{PKG}.f3"), vec![1])],
        )
    }

    #[test]
    fn test_value_params_excluded_pointer_derefs_flagged() {
        let pkg = make_pkg(vec![func_f()]);
        let mut store = MemoryFactStore::new();
        let outcome = PanicArgsAnalyzer::analyze_package(&pkg, &mut store);

        assert_eq!(store.panic_args(&format!("{PKG}.f")), fact(&[1, 3]));
        assert!(outcome.settled);
        assert!(outcome.pending_packages.is_empty());
    }

    #[test]
    fn test_store_slice_assert_and_map_update() {
        // func f2(x *int, ptr *[3]int, i any, m map[int]int) {
        //     *x = 5; print(ptr[:]); print(i.(Iface)); m[5] = 5
        // }
        let mut slice = make_instr(12, ValueKind::Slice);
        slice.operands = vec![2];
        let mut assert_i = make_instr(13, ValueKind::TypeAssert);
        assert_i.operands = vec![3];
        let mut update = make_instr(14, ValueKind::MapUpdate);
        update.operands = vec![4, 10, 10];

        let f2 = single_block_func(
            "f2",
            vec![
                param(1, "x", 2),
                param(2, "ptr", 5),
                param(3, "i", 6),
                param(4, "m", 7),
            ],
            vec![
                make_instr(10, ValueKind::Const),
                store_instr(11, 1, 10),
                slice,
                assert_i,
                update,
            ],
        );
        let pkg = make_pkg(vec![f2]);
        let mut store = MemoryFactStore::new();
        PanicArgsAnalyzer::analyze_package(&pkg, &mut store);

        assert_eq!(store.panic_args(&format!("{PKG}.f2")), fact(&[0, 1, 2, 3]));
    }

    #[test]
    fn test_store_through_pointer() {
        let pkg = make_pkg(vec![func_f3()]);
        let mut store = MemoryFactStore::new();
        PanicArgsAnalyzer::analyze_package(&pkg, &mut store);

        assert_eq!(store.panic_args(&format!("{PKG}.f3")), fact(&[0]));
    }

    #[test]
    fn test_dominating_nil_check_suppresses() {
        // func f4(ptr *[3]int) { if ptr == nil { return }; *ptr = ...; print(*ptr) }
        let f4 = Function {
            name: format!("{PKG}.f4"),
            short_name: "f4".into(),
            span: None,
            params: vec![param(1, "ptr", 5)],
            blocks: vec![
                block(0, vec![nil_const(10), binop(11, "==", 1, 10), if_instr(12, 11)]),
                block(1, vec![make_instr(13, ValueKind::Return)]),
                block(
                    2,
                    vec![
                        make_instr(14, ValueKind::Alloc),
                        store_instr(15, 1, 14),
                        deref(16, 1),
                        make_instr(17, ValueKind::Return),
                    ],
                ),
            ],
            cfg_edges: vec![
                edge(0, 1, EdgeKind::CondTrue),
                edge(0, 2, EdgeKind::CondFalse),
            ],
        };
        let pkg = make_pkg(vec![f4]);
        let mut store = MemoryFactStore::new();
        PanicArgsAnalyzer::analyze_package(&pkg, &mut store);

        assert!(store.panic_args(&format!("{PKG}.f4")).is_empty());
    }

    #[test]
    fn test_transitive_call_propagation() {
        // f7 calls f3; f7 precedes f3 so the fact arrives a sweep late.
        let pkg = make_pkg(vec![func_f7(), func_f3()]);
        let mut store = MemoryFactStore::new();
        let outcome = PanicArgsAnalyzer::analyze_package(&pkg, &mut store);

        assert_eq!(store.panic_args(&format!("{PKG}.f3")), fact(&[0]));
        assert_eq!(store.panic_args(&format!("{PKG}.f7")), fact(&[0]));
        assert!(outcome.settled);
        assert!(store.package_done(PKG));
        // two nillable params: settles within the monotone bound of 3
        assert_eq!(outcome.sweeps, 3);
    }

    #[test]
    fn test_two_level_transitive_propagation() {
        // f8 -> f7 -> f3, declared caller-first to force extra sweeps
        let f8 = single_block_func(
            "f8",
            vec![param(1, "ptr", 5)],
            vec![call(10, &format!("{PKG}.f7"), vec![1])],
        );
        let pkg = make_pkg(vec![f8, func_f7(), func_f3()]);
        let mut store = MemoryFactStore::new();
        let outcome = PanicArgsAnalyzer::analyze_package(&pkg, &mut store);

        assert_eq!(store.panic_args(&format!("{PKG}.f8")), fact(&[0]));
        assert!(outcome.sweeps <= 4, "sweeps = {}", outcome.sweeps);
    }

    #[test]
    fn test_guarded_call_not_flagged() {
        // func f9(ptr *[3]int) { if ptr != nil { f7(ptr) } }
        let f9 = Function {
            name: format!("{PKG}.f9"),
            short_name: "f9".into(),
            span: None,
            params: vec![param(1, "ptr", 5)],
            blocks: vec![
                block(0, vec![nil_const(10), binop(11, "!=", 1, 10), if_instr(12, 11)]),
                block(1, vec![call(13, &format!("{PKG}.f7"), vec![1])]),
                block(2, vec![make_instr(14, ValueKind::Return)]),
            ],
            cfg_edges: vec![
                edge(0, 1, EdgeKind::CondTrue),
                edge(0, 2, EdgeKind::CondFalse),
                edge(1, 2, EdgeKind::Unconditional),
            ],
        };
        let pkg = make_pkg(vec![f9, func_f7(), func_f3()]);
        let mut store = MemoryFactStore::new();
        PanicArgsAnalyzer::analyze_package(&pkg, &mut store);

        assert!(store.panic_args(&format!("{PKG}.f9")).is_empty());
        assert_eq!(store.panic_args(&format!("{PKG}.f7")), fact(&[0]));
    }

    #[test]
    fn test_comma_ok_assertion_is_safe() {
        // func f6(i any) Iface { i2, ok := i.(Iface); ... }
        let mut assert_i = make_instr(10, ValueKind::TypeAssert);
        assert_i.operands = vec![1];
        assert_i.comma_ok = true;
        let mut ext0 = make_instr(11, ValueKind::Extract);
        ext0.operands = vec![10];
        let mut ext1 = make_instr(12, ValueKind::Extract);
        ext1.operands = vec![10];

        let f6 = Function {
            name: format!("{PKG}.f6"),
            short_name: "f6".into(),
            span: None,
            params: vec![param(1, "i", 6)],
            blocks: vec![
                block(0, vec![assert_i, ext0, ext1, if_instr(13, 12)]),
                block(1, vec![make_instr(14, ValueKind::Return)]),
                block(2, vec![make_instr(15, ValueKind::Return)]),
            ],
            cfg_edges: vec![
                edge(0, 1, EdgeKind::CondTrue),
                edge(0, 2, EdgeKind::CondFalse),
            ],
        };
        let pkg = make_pkg(vec![f6]);
        let mut store = MemoryFactStore::new();
        PanicArgsAnalyzer::analyze_package(&pkg, &mut store);

        assert!(store.panic_args(&format!("{PKG}.f6")).is_empty());
    }

    #[test]
    fn test_slice_of_slice_not_flagged() {
        // func fs(s []byte) { print(s[:]) } - slicing a slice is safe
        let mut slice = make_instr(10, ValueKind::Slice);
        slice.operands = vec![1];
        let fs = single_block_func("fs", vec![param(1, "s", 9)], vec![slice]);
        let pkg = make_pkg(vec![fs]);
        let mut store = MemoryFactStore::new();
        PanicArgsAnalyzer::analyze_package(&pkg, &mut store);

        assert!(store.panic_args(&format!("{PKG}.fs")).is_empty());
    }

    #[test]
    fn test_param_in_stored_value_position_not_flagged() {
        // func fv(p *int) { sink = p } - p is the value, not the address
        let fv = single_block_func(
            "fv",
            vec![param(1, "p", 2)],
            vec![make_instr(10, ValueKind::Alloc), store_instr(11, 10, 1)],
        );
        let pkg = make_pkg(vec![fv]);
        let mut store = MemoryFactStore::new();
        PanicArgsAnalyzer::analyze_package(&pkg, &mut store);

        assert!(store.panic_args(&format!("{PKG}.fv")).is_empty());
    }

    #[test]
    fn test_dynamic_dispatch_contributes_nothing() {
        let mut invoke = call(10, "example.com/a.Iface.M", vec![1]);
        invoke.callee_is_interface = true;
        let fd = single_block_func("fd", vec![param(1, "p", 2)], vec![invoke]);
        let pkg = make_pkg(vec![fd]);
        let mut store = MemoryFactStore::new();
        // even with a fact recorded under the method name
        store.export_panic_args("example.com/a.Iface.M", &fact(&[0]));
        PanicArgsAnalyzer::analyze_package(&pkg, &mut store);

        assert!(store.panic_args(&format!("{PKG}.fd")).is_empty());
    }

    #[test]
    fn test_cross_unit_import_after_dep_settled() {
        let g = single_block_func(
            "g",
            vec![param(1, "ptr", 5)],
            vec![call(10, "example.com/dep.F", vec![1])],
        );
        let pkg = make_pkg(vec![g]);
        let mut store = MemoryFactStore::new();
        store.export_panic_args("example.com/dep.F", &fact(&[0]));
        store.export_package_done("example.com/dep");

        let outcome = PanicArgsAnalyzer::analyze_package(&pkg, &mut store);
        assert_eq!(store.panic_args(&format!("{PKG}.g")), fact(&[0]));
        assert!(outcome.settled);
        assert!(store.package_done(PKG));
    }

    #[test]
    fn test_cross_unit_pending_blocks_settlement() {
        let g = single_block_func(
            "g",
            vec![param(1, "ptr", 5)],
            vec![call(10, "example.com/dep.F", vec![1])],
        );
        let pkg = make_pkg(vec![g]);
        let mut store = MemoryFactStore::new();

        let outcome = PanicArgsAnalyzer::analyze_package(&pkg, &mut store);
        // no facts importable: same result as an empty callee fact set
        assert!(store.panic_args(&format!("{PKG}.g")).is_empty());
        assert!(!outcome.settled);
        assert!(outcome.pending_packages.contains("example.com/dep"));
        assert!(!store.package_done(PKG));
    }

    #[test]
    fn test_rerun_is_deterministic_and_idempotent() {
        let build = || make_pkg(vec![func_f7(), func_f3(), func_f()]);

        let mut store_a = MemoryFactStore::new();
        PanicArgsAnalyzer::analyze_package(&build(), &mut store_a);
        let mut store_b = MemoryFactStore::new();
        PanicArgsAnalyzer::analyze_package(&build(), &mut store_b);
        assert_eq!(store_a.snapshot(PKG).functions, store_b.snapshot(PKG).functions);

        // a second run on the same store adds nothing
        let again = PanicArgsAnalyzer::analyze_package(&build(), &mut store_a);
        assert_eq!(again.sweeps, 1);
        assert!(again.settled);
        assert_eq!(store_a.snapshot(PKG).functions, store_b.snapshot(PKG).functions);
    }

    #[test]
    fn test_cancelled_run_reports_unsettled() {
        let pkg = make_pkg(vec![func_f3()]);
        let mut store = MemoryFactStore::new();
        let cancel = AtomicBool::new(true);
        let outcome = PanicArgsAnalyzer::analyze_package_with_cancel(&pkg, &mut store, &cancel);

        assert!(!outcome.settled);
        assert_eq!(outcome.sweeps, 0);
        assert!(!store.package_done(PKG));
    }

    #[test]
    fn test_analyze_all_packages() {
        let input = AnalysisInput {
            packages: vec![make_pkg(vec![func_f3()])],
            ssa_version: "1".into(),
        };
        let mut store = MemoryFactStore::new();
        let outcomes = PanicArgsAnalyzer::analyze(&input, &mut store);

        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].settled);
        assert_eq!(store.panic_args(&format!("{PKG}.f3")), fact(&[0]));
    }

    #[test]
    fn test_diagnostic_for_literal_nil_argument() {
        // func h() { f3(nil) }
        let h = single_block_func(
            "h",
            vec![],
            vec![nil_const(10), call(11, &format!("{PKG}.f3"), vec![10])],
        );
        let pkg = make_pkg(vec![h, func_f3()]);
        let mut store = MemoryFactStore::new();
        PanicArgsAnalyzer::analyze_package(&pkg, &mut store);

        let diags = PanicArgsAnalyzer::collect_diagnostics(&pkg, &store);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].rule, "ARG001");
        assert!(diags[0].explanation.contains("f3"), "{}", diags[0].explanation);
        assert_eq!(diags[0].location.line, 21); // span of the call instr
    }

    #[test]
    fn test_diagnostic_for_proven_nil_parameter() {
        // func h2(ptr *[3]int) { if ptr == nil { f3(ptr) } }
        let h2 = Function {
            name: format!("{PKG}.h2"),
            short_name: "h2".into(),
            span: None,
            params: vec![param(1, "ptr", 5)],
            blocks: vec![
                block(0, vec![nil_const(10), binop(11, "==", 1, 10), if_instr(12, 11)]),
                block(1, vec![call(13, &format!("{PKG}.f3"), vec![1])]),
                block(2, vec![make_instr(14, ValueKind::Return)]),
            ],
            cfg_edges: vec![
                edge(0, 1, EdgeKind::CondTrue),
                edge(0, 2, EdgeKind::CondFalse),
                edge(1, 2, EdgeKind::Unconditional),
            ],
        };
        let pkg = make_pkg(vec![h2, func_f3()]);
        let mut store = MemoryFactStore::new();
        PanicArgsAnalyzer::analyze_package(&pkg, &mut store);

        let diags = PanicArgsAnalyzer::collect_diagnostics(&pkg, &store);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].rule, "ARG001");
    }

    #[test]
    fn test_no_diagnostic_without_nil_evidence() {
        let pkg = make_pkg(vec![func_f7(), func_f3()]);
        let mut store = MemoryFactStore::new();
        PanicArgsAnalyzer::analyze_package(&pkg, &mut store);

        let diags = PanicArgsAnalyzer::collect_diagnostics(&pkg, &store);
        assert!(diags.is_empty(), "got: {diags:?}");
    }
}
