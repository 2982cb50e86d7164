//! Diagnostic builders for the call-site post-pass.

use nilarg_diagnostics::{Diagnostic, DiagnosticBuilder, Severity};
use nilarg_ir::ir::Instruction;

/// ARG001: a provably nil argument reaches a parameter the callee
/// dereferences.
pub fn build_arg001(instr: &Instruction, callee: &str, index: u32, func_name: &str) -> Diagnostic {
    let (file, line, col) = extract_span(instr);
    DiagnosticBuilder::new(
        "ARG001",
        Severity::Critical,
        "nil argument dereferenced by callee",
    )
    .location(file, line, col)
    .explanation(format!(
        "In function `{func_name}`, argument {index} of the call to `{callee}` is nil, \
         and `{callee}` panics when that parameter is nil"
    ))
    .confidence(1.0)
    .build()
}

fn extract_span(instr: &Instruction) -> (String, u32, u32) {
    match &instr.span {
        Some(s) => (s.file.clone(), s.start_line, s.start_col),
        None => ("unknown".into(), 0, 0),
    }
}
