//! Report generation
//!
//! Global invariants enforced:
//! - Deterministic output ordering
//! - Byte-for-byte identical output across runs
//!
//! Two JSON documents are produced: classify stats (pre-identification view
//! of every statement) and trace data (modules, dependency edges, final
//! statement assignments). All maps are BTreeMaps and all index arrays are
//! emitted from sorted sets, so serialization order never depends on hash
//! state.

use crate::annotate::AnnotatedOutput;
use crate::ast::{StatementInfo, WrapKind};
use crate::defs::DefinitionMap;
use crate::fingerprint::BundlerFingerprint;
use crate::graph::ModuleInfo;
use crate::helpers::HelperMap;
use crate::refs::ReferenceGraph;
use serde::Serialize;
use std::collections::BTreeMap;

/// Classify stats document
#[derive(Debug, Serialize)]
pub struct ClassifyReport {
    pub input_file: String,
    pub original_size: usize,
    pub body_size: usize,
    pub shebang_size: usize,
    pub bundler: String,
    pub bundler_confidence: String,
    pub bundler_signals: Vec<String>,
    /// Minified helper name -> helper kind
    pub runtime_helpers: BTreeMap<String, String>,
    pub total_statements: usize,
    pub categories: BTreeMap<String, usize>,
    pub wrapkind_distribution: BTreeMap<String, usize>,
    pub total_bytes_statements: usize,
    pub total_bytes_gaps: usize,
    pub annotation_bytes: usize,
    pub byte_accounting_match: bool,
    pub statements: Vec<ClassifyStatement>,
}

#[derive(Debug, Serialize)]
pub struct ClassifyStatement {
    pub index: usize,
    pub category: String,
    #[serde(rename = "wrapKind")]
    pub wrap_kind: WrapKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "startLine")]
    pub start_line: usize,
    #[serde(rename = "endLine")]
    pub end_line: usize,
    pub bytes: usize,
}

/// Trace data document
#[derive(Debug, Serialize)]
pub struct TraceReport {
    pub bundler: String,
    pub total_statements: usize,
    pub total_modules: usize,
    pub total_edges: usize,
    pub top_level_names: usize,
    pub wrapkind_modules: BTreeMap<String, usize>,
    pub modules: Vec<TraceModule>,
    pub statements: Vec<TraceStatement>,
}

#[derive(Debug, Serialize)]
pub struct TraceModule {
    pub id: usize,
    #[serde(rename = "wrapKind")]
    pub wrap_kind: WrapKind,
    pub statements: Vec<usize>,
    pub line_start: usize,
    pub line_end: usize,
    pub bytes: usize,
    pub deps_out: Vec<usize>,
    pub deps_in: Vec<usize>,
}

#[derive(Debug, Serialize)]
pub struct TraceStatement {
    pub index: usize,
    pub module_id: usize,
    #[serde(rename = "wrapKind")]
    pub wrap_kind: WrapKind,
    pub names: Vec<String>,
    pub line_start: usize,
    pub line_end: usize,
    pub refs_out: Vec<usize>,
    pub refs_in: Vec<usize>,
}

/// Inputs for the classify report that are not part of the analysis itself
pub struct ClassifyInputs<'a> {
    pub input_file: &'a str,
    pub original_size: usize,
    pub body_size: usize,
    pub shebang_size: usize,
}

/// Build the classify stats document.
///
/// `classify_wraps` is the per-statement WrapKind as the classifier assigned
/// it, before module identification reclassifies hoisted and imported
/// statements.
pub fn build_classify_report(
    inputs: ClassifyInputs<'_>,
    fingerprint: &BundlerFingerprint,
    helpers: &HelperMap,
    statements: &[StatementInfo],
    classify_wraps: &[WrapKind],
    annotated: &AnnotatedOutput,
) -> ClassifyReport {
    let mut categories: BTreeMap<String, usize> = BTreeMap::new();
    for stmt in statements {
        *categories.entry(stmt.category.clone()).or_insert(0) += 1;
    }

    let mut wrapkind_distribution: BTreeMap<String, usize> = BTreeMap::new();
    for kind in classify_wraps {
        *wrapkind_distribution
            .entry(kind.as_str().to_string())
            .or_insert(0) += 1;
    }

    ClassifyReport {
        input_file: inputs.input_file.to_string(),
        original_size: inputs.original_size,
        body_size: inputs.body_size,
        shebang_size: inputs.shebang_size,
        bundler: fingerprint.bundler.clone(),
        bundler_confidence: fingerprint.confidence.as_str().to_string(),
        bundler_signals: fingerprint.signals.clone(),
        runtime_helpers: helpers
            .iter()
            .map(|(name, kind)| (name.clone(), kind.as_str().to_string()))
            .collect(),
        total_statements: statements.len(),
        categories,
        wrapkind_distribution,
        total_bytes_statements: annotated.statement_bytes,
        total_bytes_gaps: annotated.gap_bytes,
        annotation_bytes: annotated.annotation_bytes,
        byte_accounting_match: annotated.accounting_match,
        statements: statements
            .iter()
            .zip(classify_wraps.iter())
            .map(|(stmt, &wrap_kind)| ClassifyStatement {
                index: stmt.index,
                category: stmt.category.clone(),
                wrap_kind,
                name: if stmt.names.is_empty() {
                    None
                } else {
                    Some(stmt.names.join(","))
                },
                start_line: stmt.start_line,
                end_line: stmt.end_line,
                bytes: stmt.bytes(),
            })
            .collect(),
    }
}

/// Build the trace data document from the final assignment
pub fn build_trace_report(
    fingerprint: &BundlerFingerprint,
    statements: &[StatementInfo],
    defs: &DefinitionMap,
    refs: &ReferenceGraph,
    modules: &[ModuleInfo],
) -> TraceReport {
    let mut wrapkind_modules: BTreeMap<String, usize> = BTreeMap::new();
    for module in modules {
        *wrapkind_modules
            .entry(module.kind.as_str().to_string())
            .or_insert(0) += 1;
    }

    TraceReport {
        bundler: fingerprint.bundler.clone(),
        total_statements: statements.len(),
        total_modules: modules.len(),
        total_edges: refs.edge_count(),
        top_level_names: defs.len(),
        wrapkind_modules,
        modules: modules
            .iter()
            .map(|m| TraceModule {
                id: m.id,
                wrap_kind: m.kind,
                statements: m.statements.clone(),
                line_start: m.line_start,
                line_end: m.line_end,
                bytes: m.bytes,
                deps_out: m.deps_out.iter().copied().collect(),
                deps_in: m.deps_in.iter().copied().collect(),
            })
            .collect(),
        statements: statements
            .iter()
            .map(|stmt| TraceStatement {
                index: stmt.index,
                module_id: stmt.module_id.unwrap_or(usize::MAX),
                wrap_kind: stmt.wrap_kind,
                names: stmt.names.clone(),
                line_start: stmt.start_line,
                line_end: stmt.end_line,
                refs_out: refs.refs_out[stmt.index].iter().copied().collect(),
                refs_in: refs.refs_in[stmt.index].iter().copied().collect(),
            })
            .collect(),
    }
}

/// Render any report as pretty-printed JSON
pub fn render_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

/// Render a human-readable module table plus the bundler verdict
pub fn render_summary_text(
    fingerprint: &BundlerFingerprint,
    modules: &[ModuleInfo],
    statements: &[StatementInfo],
) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "Bundler: {} (confidence: {})\n",
        fingerprint.bundler,
        fingerprint.confidence.as_str()
    ));
    output.push_str(&format!(
        "Statements: {}   Modules: {}\n\n",
        statements.len(),
        modules.len()
    ));

    output.push_str(&format!(
        "{:<6} {:<8} {:<14} {:<10} {:<8} {:<8} {}\n",
        "ID", "WRAP", "STATEMENTS", "BYTES", "IN", "OUT", "LINES"
    ));
    for module in modules {
        let first = module.statements.first().copied().unwrap_or(0);
        let last = module.statements.last().copied().unwrap_or(0);
        let span = if first == last {
            format!("[{}]", first)
        } else {
            format!("[{}..{}]", first, last)
        };
        output.push_str(&format!(
            "{:<6} {:<8} {:<14} {:<10} {:<8} {:<8} {}-{}\n",
            module.id,
            module.kind.as_str(),
            span,
            module.bytes,
            module.deps_in.len(),
            module.deps_out.len(),
            module.line_start,
            module.line_end,
        ));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze_source;

    const SRC: &str = "var w=(a,b)=>()=>(b||a((b={exports:{}}).exports,b),b.exports);\nvar r=w((e,m)=>{m.exports=1;});\nvar x=r();\n";

    #[test]
    fn test_classify_report_fields() {
        let analysis = analyze_source(SRC, "bundle.js").unwrap();
        let report = &analysis.classify;

        assert_eq!(report.input_file, "bundle.js");
        assert_eq!(report.total_statements, 3);
        assert_eq!(report.shebang_size, 0);
        assert_eq!(report.body_size, SRC.len());
        assert!(report.byte_accounting_match);
        assert_eq!(
            report.runtime_helpers,
            BTreeMap::from([("w".to_string(), "__commonJS".to_string())])
        );
        assert_eq!(report.categories.get("MODULE_FACTORY.__commonJS"), Some(&1));
        // Classify view predates import detection: x is still None here
        assert_eq!(report.statements[2].wrap_kind, WrapKind::None);
    }

    #[test]
    fn test_trace_report_fields() {
        let analysis = analyze_source(SRC, "bundle.js").unwrap();
        let report = &analysis.trace;

        assert_eq!(report.total_statements, 3);
        assert_eq!(report.total_modules, 3);
        assert_eq!(report.top_level_names, 3);
        // Trace view is post-identification: x became an import
        assert_eq!(report.statements[2].wrap_kind, WrapKind::Import);
        for module in &report.modules {
            assert!(module.deps_out.windows(2).all(|w| w[0] < w[1]));
            assert!(module.deps_in.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_json_rendering_is_deterministic() {
        let a = analyze_source(SRC, "bundle.js").unwrap();
        let b = analyze_source(SRC, "bundle.js").unwrap();
        assert_eq!(render_json(&a.classify), render_json(&b.classify));
        assert_eq!(render_json(&a.trace), render_json(&b.trace));
    }

    #[test]
    fn test_summary_text() {
        let analysis = analyze_source(SRC, "bundle.js").unwrap();
        let summary = render_summary_text(
            &analysis.fingerprint,
            &analysis.modules,
            &analysis.statements,
        );
        assert!(summary.starts_with("Bundler: esbuild"));
        assert!(summary.contains("CJS"));
    }
}
