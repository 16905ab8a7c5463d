//! Analysis orchestration - ties together parsing, helper detection,
//! classification, module identification, annotation, and reporting

use crate::annotate::{annotate, AnnotatedOutput};
use crate::ast::{collect_statements, StatementInfo, WrapKind};
use crate::classify::classify_statements;
use crate::defs::{build_definition_map, DefinitionMap};
use crate::fingerprint::{fingerprint_bundle, BundlerFingerprint};
use crate::graph::{compile_module_graph, ModuleInfo};
use crate::helpers::{detect_helpers, HelperMap};
use crate::modules::identify_modules;
use crate::parser::{parse_body, split_shebang};
use crate::refs::{build_reference_graph, ReferenceGraph};
use crate::report::{
    build_classify_report, build_trace_report, ClassifyInputs, ClassifyReport, TraceReport,
};
use anyhow::{Context, Result};
use std::path::Path;

/// Everything one analysis run produces
#[derive(Debug)]
pub struct BundleAnalysis {
    pub shebang: String,
    pub body: String,
    pub helpers: HelperMap,
    pub fingerprint: BundlerFingerprint,
    pub statements: Vec<StatementInfo>,
    pub defs: DefinitionMap,
    pub refs: ReferenceGraph,
    pub modules: Vec<ModuleInfo>,
    pub annotated: AnnotatedOutput,
    pub classify: ClassifyReport,
    pub trace: TraceReport,
}

/// Analyze a bundle file on disk
pub fn analyze_file(path: &Path) -> Result<BundleAnalysis> {
    let input = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    analyze_source(&input, &path.to_string_lossy())
}

/// Analyze bundle source held in memory.
///
/// The analysis is a pure function of the input bytes: identical input
/// yields byte-identical annotated output and reports.
pub fn analyze_source(input: &str, input_name: &str) -> Result<BundleAnalysis> {
    let (shebang, body) = split_shebang(input);
    if !shebang.is_empty() && body.is_empty() {
        anyhow::bail!("shebang-only input: {}", input_name);
    }

    let bundle = parse_body(body, input_name)?;

    let mut statements = collect_statements(&bundle);
    let helpers = detect_helpers(&bundle, body);
    classify_statements(&bundle, &mut statements, &helpers);
    let fingerprint = fingerprint_bundle(body, &statements, &helpers);

    // Snapshot the classifier's view before module identification
    // reclassifies hoisted and imported statements
    let classify_wraps: Vec<WrapKind> = statements.iter().map(|s| s.wrap_kind).collect();

    let defs = build_definition_map(&bundle, &mut statements);
    let refs = build_reference_graph(&bundle, &statements, &defs);

    let assignment = identify_modules(&bundle, &mut statements, &helpers, &refs)?;
    let modules = compile_module_graph(&bundle, &statements, &assignment, &refs, &helpers);

    let annotated = annotate(shebang, body, &statements, &modules, &fingerprint);

    verify_invariants(body, &statements, &modules, &annotated)?;

    let classify = build_classify_report(
        ClassifyInputs {
            input_file: input_name,
            original_size: input.len(),
            body_size: body.len(),
            shebang_size: shebang.len(),
        },
        &fingerprint,
        &helpers,
        &statements,
        &classify_wraps,
        &annotated,
    );
    let trace = build_trace_report(&fingerprint, &statements, &defs, &refs, &modules);

    Ok(BundleAnalysis {
        shebang: shebang.to_string(),
        body: body.to_string(),
        helpers,
        fingerprint,
        statements,
        defs,
        refs,
        modules,
        annotated,
        classify,
        trace,
    })
}

/// Fingerprint a bundle without running module identification
pub fn fingerprint_source(
    input: &str,
    input_name: &str,
) -> Result<(HelperMap, BundlerFingerprint)> {
    let (shebang, body) = split_shebang(input);
    if !shebang.is_empty() && body.is_empty() {
        anyhow::bail!("shebang-only input: {}", input_name);
    }

    let bundle = parse_body(body, input_name)?;
    let statements = collect_statements(&bundle);
    let helpers = detect_helpers(&bundle, body);
    let fingerprint = fingerprint_bundle(body, &statements, &helpers);
    Ok((helpers, fingerprint))
}

/// Post-analysis assertions.
///
/// These are internal errors, not input errors: any failure here means a
/// pass broke its contract, and the run must abort with a diagnostic naming
/// the first offender.
fn verify_invariants(
    body: &str,
    statements: &[StatementInfo],
    modules: &[ModuleInfo],
    annotated: &AnnotatedOutput,
) -> Result<()> {
    if !annotated.accounting_match {
        anyhow::bail!(
            "byte accounting mismatch: {} statement + {} gap != {} body",
            annotated.statement_bytes,
            annotated.gap_bytes,
            body.len()
        );
    }

    for stmt in statements {
        match stmt.module_id {
            Some(id) if id < modules.len() => {}
            _ => anyhow::bail!(
                "statement {} (lines {}-{}) has no module assignment",
                stmt.index,
                stmt.start_line,
                stmt.end_line
            ),
        }
    }

    let mut seen_first = None;
    for (id, module) in modules.iter().enumerate() {
        if module.id != id {
            anyhow::bail!("module id {} stored at position {}", module.id, id);
        }
        let Some(&first) = module.statements.first() else {
            anyhow::bail!("module {} has no statements", id);
        };
        if let Some(prev) = seen_first {
            if first <= prev {
                anyhow::bail!("module {} out of source-position order", id);
            }
        }
        seen_first = Some(first);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_statement_input() {
        let analysis = analyze_source("", "empty.js").unwrap();
        assert!(analysis.statements.is_empty());
        assert!(analysis.modules.is_empty());
        assert!(analysis.annotated.accounting_match);
        assert_eq!(analysis.classify.total_statements, 0);
    }

    #[test]
    fn test_shebang_only_input_is_an_error() {
        assert!(analyze_source("#!/usr/bin/env node\n", "cli.js").is_err());
        assert!(analyze_source("#!/usr/bin/env node", "cli.js").is_err());
    }

    #[test]
    fn test_shebang_preserved_and_offsets_relative_to_body() {
        let input = "#!/usr/bin/env node\nvar a = 1;\n";
        let analysis = analyze_source(input, "cli.js").unwrap();
        assert_eq!(analysis.shebang, "#!/usr/bin/env node\n");
        assert_eq!(analysis.statements[0].start, 0);
        assert_eq!(analysis.classify.shebang_size, 20);
        assert!(analysis.annotated.text.starts_with("#!/usr/bin/env node\n"));
    }

    #[test]
    fn test_parse_error_is_fatal() {
        let result = analyze_source("var a = ;", "broken.js");
        assert!(result.is_err());
    }

    #[test]
    fn test_no_helpers_still_analyzes() {
        let analysis = analyze_source("var a = 1;\nconsole.log(a);\n", "plain.js").unwrap();
        assert!(analysis.helpers.is_empty());
        assert_eq!(analysis.fingerprint.bundler, "unknown");
        assert_eq!(analysis.modules.len(), 1);
    }

    #[test]
    fn test_determinism() {
        let src = "var w=(a,b)=>()=>(b||a((b={exports:{}}).exports,b),b.exports);\nvar r=w((e,m)=>{m.exports=1;});\nvar x=r();\nconsole.log(x);\n";
        let a = analyze_source(src, "bundle.js").unwrap();
        let b = analyze_source(src, "bundle.js").unwrap();
        assert_eq!(a.annotated.text, b.annotated.text);
        assert_eq!(
            crate::report::render_json(&a.trace),
            crate::report::render_json(&b.trace)
        );
    }
}
