//! End-to-end scenarios over concrete bundle shapes

use demini_core::{analyze_source, HelperKind, WrapKind};

const COMMONJS_HELPER: &str =
    "var w=(a,b)=>()=>(b||a((b={exports:{}}).exports,b),b.exports);\n";
const ESM_HELPER: &str = "var v=(a,b)=>()=>(a&&(b=a(a=0)),b);\n";

#[test]
fn test_pure_cjs_factory_bundle() {
    let src = format!("{}var r=w((e,m)=>{{m.exports=1;}});\n", COMMONJS_HELPER);
    let analysis = analyze_source(&src, "cjs.js").unwrap();

    assert_eq!(analysis.helpers.len(), 1);
    assert_eq!(analysis.helpers.get("w"), Some(&HelperKind::CommonJs));

    assert_eq!(analysis.modules.len(), 2);
    assert_eq!(analysis.modules[0].kind, WrapKind::Runtime);
    assert_eq!(analysis.modules[0].statements, vec![0]);
    assert_eq!(analysis.modules[1].kind, WrapKind::Cjs);
    assert_eq!(analysis.modules[1].statements, vec![1]);

    assert_eq!(analysis.fingerprint.bundler, "esbuild");
    // A lone helper is one signal; the preamble alias raises it to high
    assert_eq!(analysis.fingerprint.confidence.as_str(), "medium");
}

#[test]
fn test_cjs_bundle_with_preamble_is_high_confidence() {
    let src = format!(
        "var _=Object.create;\nvar __=Object.defineProperty;\nvar ___=Object.getOwnPropertyNames;\n{}var r=w((e,m)=>{{m.exports=1;}});\n",
        COMMONJS_HELPER
    );
    let analysis = analyze_source(&src, "cjs.js").unwrap();
    assert_eq!(analysis.fingerprint.bundler, "esbuild");
    assert_eq!(analysis.fingerprint.confidence.as_str(), "high");
}

#[test]
fn test_esm_backtrace() {
    // A CJS module first, so the hoisted declarations are not preamble
    let src = format!(
        "{}{}var r=w((e,m)=>{{m.exports=1;}});\nvar a;\nvar b;\nfunction f(){{}}\nvar m=v(()=>{{a=b=f();}});\n",
        ESM_HELPER, COMMONJS_HELPER
    );
    let analysis = analyze_source(&src, "esm.js").unwrap();

    let esm = analysis
        .modules
        .iter()
        .find(|m| m.kind == WrapKind::Esm)
        .unwrap();
    assert_eq!(esm.statements, vec![3, 4, 5, 6]);
    assert_eq!(esm.primary, 6);

    // The hoisted declarations were reclassified from None to ESM
    for i in 3..=5 {
        assert_eq!(analysis.statements[i].wrap_kind, WrapKind::Esm);
        assert_eq!(analysis.classify.statements[i].wrap_kind, WrapKind::None);
    }
}

#[test]
fn test_import_supernode_clustering() {
    let src = format!(
        "{}var R1=w((e,m)=>{{m.exports=1;}});\nvar R2=w((e,m)=>{{m.exports=2;}});\nvar R3=w((e,m)=>{{m.exports=3;}});\nvar x1=R1();\nvar x2=R2();\nvar x3=R3();\nconsole.log(x1+x2+x3);\nvar agg={{a:x1,b:x2,c:x3}};\n",
        COMMONJS_HELPER
    );
    let analysis = analyze_source(&src, "imports.js").unwrap();

    // The import block and both consumers merge into one module
    let cluster = analysis.modules.last().unwrap();
    assert_eq!(cluster.kind, WrapKind::None);
    assert_eq!(cluster.statements, vec![4, 5, 6, 7, 8]);

    for i in 4..=6 {
        assert_eq!(analysis.statements[i].wrap_kind, WrapKind::Import);
    }
}

#[test]
fn test_jaccard_split() {
    let src = format!(
        "{}var R1=w((e,m)=>{{m.exports=1;}});\nvar R2=w((e,m)=>{{m.exports=2;}});\nvar q=R1().a+R1().b;\nvar p=R2().c+R2().d;\n",
        COMMONJS_HELPER
    );
    let analysis = analyze_source(&src, "split.js").unwrap();

    // Disjoint fingerprints: the two consumers land in separate modules
    let n = analysis.modules.len();
    assert_eq!(analysis.modules[n - 2].statements, vec![3]);
    assert_eq!(analysis.modules[n - 1].statements, vec![4]);
}

#[test]
fn test_preamble_promotion() {
    let src = format!(
        "var _=Object.create;\nvar __=Object.defineProperty;\nvar ___=Object.getOwnPropertyNames;\n{}var r=w((e,m)=>{{m.exports=1;}});\n",
        COMMONJS_HELPER
    );
    let analysis = analyze_source(&src, "preamble.js").unwrap();

    assert_eq!(analysis.modules.len(), 2);
    assert_eq!(analysis.modules[0].kind, WrapKind::Runtime);
    assert_eq!(analysis.modules[0].statements, vec![0, 1, 2, 3]);
    assert_eq!(analysis.modules[1].kind, WrapKind::Cjs);
    assert_eq!(analysis.modules[1].statements, vec![4]);

    for i in 0..=2 {
        assert_eq!(
            analysis.statements[i].category, "RUNTIME_HELPER.preamble",
            "alias statement {} must classify as preamble",
            i
        );
    }
}

#[test]
fn test_idempotent_reannotation() {
    let src = std::fs::read_to_string(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/esbuild_bundle.js"
    ))
    .unwrap();

    let first = analyze_source(&src, "bundle.js").unwrap();
    let second = analyze_source(&first.annotated.text, "bundle.annotated.js").unwrap();

    // Comments are trivia: same statements, same structure, same sizes
    assert_eq!(second.statements.len(), first.statements.len());
    for (a, b) in first.statements.iter().zip(second.statements.iter()) {
        assert_eq!(a.category, b.category);
        assert_eq!(a.wrap_kind, b.wrap_kind);
        assert_eq!(a.names, b.names);
        assert_eq!(a.bytes(), b.bytes());
    }

    assert_eq!(second.modules.len(), first.modules.len());
    for (a, b) in first.modules.iter().zip(second.modules.iter()) {
        assert_eq!(a.kind, b.kind);
        assert_eq!(a.statements, b.statements);
        assert_eq!(a.bytes, b.bytes);
    }
}
