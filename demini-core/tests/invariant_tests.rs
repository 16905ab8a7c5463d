//! Universal invariants checked over fixture bundles

use demini_core::{analyze_file, analyze_source, render_json, BundleAnalysis, WrapKind};
use regex::Regex;
use std::io::Write;

fn fixture() -> String {
    std::fs::read_to_string(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/esbuild_bundle.js"
    ))
    .unwrap()
}

fn analyzed() -> BundleAnalysis {
    analyze_source(&fixture(), "esbuild_bundle.js").unwrap()
}

/// Remove every inserted annotation comment (each owns its trailing newline)
fn strip_annotations(annotated: &str) -> String {
    let header = Regex::new(r"(?s)/\*\n \* DEMINI-CLASSIFY BUNDLE ANALYSIS\n.*? \*/\n").unwrap();
    let statement = Regex::new(r"/\* === \[\d{4}\] TYPE: [^\n]*? === \*/\n").unwrap();
    let boundary =
        Regex::new(r"/\* --- MODULE BOUNDARY \[\d{3}\] Wrap[^\n]*? --- \*/\n").unwrap();

    let text = header.replace(annotated, "");
    let text = statement.replace_all(&text, "");
    boundary.replace_all(&text, "").into_owned()
}

#[test]
fn test_i1_byte_preservation() {
    let input = fixture();
    let analysis = analyzed();
    assert_eq!(strip_annotations(&analysis.annotated.text), input);
}

#[test]
fn test_i2_partition() {
    let analysis = analyzed();
    let mut seen = vec![0usize; analysis.statements.len()];
    for module in &analysis.modules {
        for &s in &module.statements {
            seen[s] += 1;
        }
    }
    assert!(seen.iter().all(|&count| count == 1));
}

#[test]
fn test_i3_contiguity() {
    let analysis = analyzed();
    for module in &analysis.modules {
        if module.kind == WrapKind::Runtime {
            continue;
        }
        for pair in module.statements.windows(2) {
            assert_eq!(
                pair[1],
                pair[0] + 1,
                "module {} is not a contiguous index range",
                module.id
            );
        }
    }
}

#[test]
fn test_i4_dense_source_ordered_ids() {
    let analysis = analyzed();
    for (expected, module) in analysis.modules.iter().enumerate() {
        assert_eq!(module.id, expected);
    }
    for pair in analysis.modules.windows(2) {
        assert!(pair[0].statements[0] < pair[1].statements[0]);
    }
}

#[test]
fn test_i5_graph_symmetry() {
    let analysis = analyzed();
    for (i, outs) in analysis.refs.refs_out.iter().enumerate() {
        for &j in outs {
            assert!(analysis.refs.refs_in[j].contains(&i));
        }
    }
    for (j, ins) in analysis.refs.refs_in.iter().enumerate() {
        for &i in ins {
            assert!(analysis.refs.refs_out[i].contains(&j));
        }
    }
    for module in &analysis.modules {
        for &dep in &module.deps_out {
            assert!(analysis.modules[dep].deps_in.contains(&module.id));
        }
        for &dep in &module.deps_in {
            assert!(analysis.modules[dep].deps_out.contains(&module.id));
        }
    }
}

#[test]
fn test_i6_no_self_loops() {
    let analysis = analyzed();
    for (i, outs) in analysis.refs.refs_out.iter().enumerate() {
        assert!(!outs.contains(&i));
    }
    for module in &analysis.modules {
        assert!(!module.deps_out.contains(&module.id));
        assert!(!module.deps_in.contains(&module.id));
    }
}

#[test]
fn test_i7_byte_accounting() {
    let analysis = analyzed();
    assert!(analysis.annotated.accounting_match);
    assert_eq!(
        analysis.annotated.statement_bytes + analysis.annotated.gap_bytes,
        analysis.body.len()
    );
    assert_eq!(
        analysis.classify.total_bytes_statements + analysis.classify.total_bytes_gaps,
        analysis.classify.body_size
    );
}

#[test]
fn test_i8_sorted_outputs() {
    let analysis = analyzed();
    for module in &analysis.trace.modules {
        assert!(module.deps_out.windows(2).all(|w| w[0] < w[1]));
        assert!(module.deps_in.windows(2).all(|w| w[0] < w[1]));
        assert!(module.statements.windows(2).all(|w| w[0] < w[1]));
    }
    for stmt in &analysis.trace.statements {
        assert!(stmt.refs_out.windows(2).all(|w| w[0] < w[1]));
        assert!(stmt.refs_in.windows(2).all(|w| w[0] < w[1]));
    }
}

#[test]
fn test_i9_wrapkind_determined_by_category() {
    let analysis = analyzed();
    for stmt in &analysis.classify.statements {
        let expected = demini_core::classify::wrap_kind_for(&stmt.category);
        assert_eq!(
            stmt.wrap_kind, expected,
            "classify-stage WrapKind must follow from the category (statement {})",
            stmt.index
        );
    }
}

#[test]
fn test_i10_determinism() {
    let input = fixture();
    let a = analyze_source(&input, "esbuild_bundle.js").unwrap();
    let b = analyze_source(&input, "esbuild_bundle.js").unwrap();
    assert_eq!(a.annotated.text, b.annotated.text);
    assert_eq!(render_json(&a.classify), render_json(&b.classify));
    assert_eq!(render_json(&a.trace), render_json(&b.trace));
}

#[test]
fn test_roundtrip_statement_slices() {
    let analysis = analyzed();
    for stmt in &analysis.statements {
        let comment = demini_core::annotate::statement_comment(stmt);
        let expected = format!("{}{}", comment, stmt.source(&analysis.body));
        assert!(
            analysis.annotated.text.contains(&expected),
            "statement {} must follow its annotation verbatim",
            stmt.index
        );
    }
}

#[test]
fn test_trace_statement_lists_partition_indices() {
    let analysis = analyzed();
    let mut all: Vec<usize> = analysis
        .trace
        .modules
        .iter()
        .flat_map(|m| m.statements.iter().copied())
        .collect();
    all.sort();
    let expected: Vec<usize> = (0..analysis.trace.total_statements).collect();
    assert_eq!(all, expected);
}

#[test]
fn test_fixture_structure() {
    let analysis = analyzed();
    assert_eq!(analysis.trace.total_statements, 16);
    assert_eq!(analysis.trace.total_modules, 6);
    assert_eq!(analysis.fingerprint.bundler, "esbuild");
    assert_eq!(analysis.fingerprint.confidence.as_str(), "high");
    assert_eq!(analysis.helpers.len(), 4);

    let kinds: Vec<WrapKind> = analysis.modules.iter().map(|m| m.kind).collect();
    assert_eq!(
        kinds,
        vec![
            WrapKind::Runtime,
            WrapKind::Cjs,
            WrapKind::Esm,
            WrapKind::Esm,
            WrapKind::Import,
            WrapKind::None,
        ]
    );
}

#[test]
fn test_analyze_file_matches_analyze_source() {
    let input = fixture();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bundle.js");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(input.as_bytes()).unwrap();
    drop(file);

    let from_file = analyze_file(&path).unwrap();
    let from_source = analyze_source(&input, &path.to_string_lossy()).unwrap();
    assert_eq!(from_file.annotated.text, from_source.annotated.text);
}

#[test]
fn test_missing_file_is_an_input_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.js");
    let err = analyze_file(&missing).unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to read file"));
}
