//! Byte-preserving annotation
//!
//! Emits the analyzed bundle with block comments inserted between top-level
//! statements: a header, a boundary comment where each module begins, and a
//! per-statement annotation. Statement and gap bytes are copied verbatim, so
//! stripping the inserted comments restores the original body exactly.
//!
//! The comment grammars are load-bearing: downstream tools parse them by
//! regex and they must be produced byte-for-byte as documented.

use crate::ast::{StatementInfo, WrapKind};
use crate::fingerprint::BundlerFingerprint;
use crate::graph::ModuleInfo;
use std::collections::BTreeMap;

/// The annotated output plus its byte accounting
#[derive(Debug)]
pub struct AnnotatedOutput {
    pub text: String,
    pub statement_bytes: usize,
    pub gap_bytes: usize,
    pub annotation_bytes: usize,
    pub accounting_match: bool,
}

/// Annotate the body left to right
pub fn annotate(
    shebang: &str,
    body: &str,
    statements: &[StatementInfo],
    modules: &[ModuleInfo],
    fingerprint: &BundlerFingerprint,
) -> AnnotatedOutput {
    // A module's boundary comment sits before its smallest statement
    let boundaries: BTreeMap<usize, &ModuleInfo> = modules
        .iter()
        .filter_map(|m| m.statements.first().map(|&s| (s, m)))
        .collect();

    let mut out = String::with_capacity(body.len() + 96 * (statements.len() + 1));
    out.push_str(shebang);
    out.push_str(&header_comment(body, statements, fingerprint));

    let mut cursor = 0usize;
    let mut statement_bytes = 0usize;
    let mut gap_bytes = 0usize;

    for stmt in statements {
        let gap = &body[cursor..stmt.start];
        out.push_str(gap);
        gap_bytes += gap.len();

        if let Some(module) = boundaries.get(&stmt.index) {
            out.push_str(&boundary_comment(module));
        }
        out.push_str(&statement_comment(stmt));

        out.push_str(stmt.source(body));
        statement_bytes += stmt.bytes();
        cursor = stmt.end;
    }

    let tail = &body[cursor..];
    out.push_str(tail);
    gap_bytes += tail.len();

    let accounting_match = statement_bytes + gap_bytes == body.len();
    let annotation_bytes = out.len() - body.len() - shebang.len();

    AnnotatedOutput {
        text: out,
        statement_bytes,
        gap_bytes,
        annotation_bytes,
        accounting_match,
    }
}

/// The six-line header block summarizing the whole bundle
pub fn header_comment(
    body: &str,
    statements: &[StatementInfo],
    fingerprint: &BundlerFingerprint,
) -> String {
    let statement_bytes: usize = statements.iter().map(|s| s.bytes()).sum();
    let gap_bytes = body.len() - statement_bytes;

    let distribution = WrapKind::ALL
        .iter()
        .map(|kind| {
            let count = statements.iter().filter(|s| s.wrap_kind == *kind).count();
            format!("{}={}", kind, count)
        })
        .collect::<Vec<_>>()
        .join(" ");

    format!(
        "/*\n * DEMINI-CLASSIFY BUNDLE ANALYSIS\n * Bundler: {} (confidence: {})\n * Statements: {}\n * WrapKind: {}\n * Size: {} bytes ({} statements, {} gaps)\n */\n",
        fingerprint.bundler,
        fingerprint.confidence.as_str(),
        statements.len(),
        distribution,
        body.len(),
        statement_bytes,
        gap_bytes,
    )
}

/// `/* === [IIII] TYPE: ... === */` for one statement
pub fn statement_comment(stmt: &StatementInfo) -> String {
    let name = if stmt.names.is_empty() {
        "-".to_string()
    } else {
        stmt.names.join(",")
    };
    format!(
        "/* === [{:04}] TYPE: {} | WRAPKIND: {} | NAME: {} | LINES: {}-{} | BYTES: {} === */\n",
        stmt.index,
        stmt.category,
        stmt.wrap_kind,
        name,
        stmt.start_line,
        stmt.end_line,
        stmt.bytes(),
    )
}

/// `/* --- MODULE BOUNDARY [NNN] ... --- */` where a module begins
pub fn boundary_comment(module: &ModuleInfo) -> String {
    let label = if module.inner_stmts > 0 {
        format!(
            "{} inner + {} hoisted",
            module.inner_stmts,
            module.statements.len() - 1
        )
    } else {
        format!("{} stmts", module.stmt_count)
    };
    format!(
        "/* --- MODULE BOUNDARY [{:03}] Wrap{} ({}, {} bytes) --- */\n",
        module.id, module.kind, label, module.bytes,
    )
}
