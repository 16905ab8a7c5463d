//! Runtime helper detection
//!
//! esbuild injects a handful of CJS/ESM interop shims at the top of every
//! bundle; after minification their names are arbitrary single letters, so
//! recognition goes by AST shape and by substring tests over the source slice
//! of the candidate body.
//!
//! Global invariants:
//! - Only top-level variable binding names enter the map
//! - The first matching rule wins; declarators are judged independently

use crate::ast::span_range;
use crate::parser::ParsedBundle;
use serde::Serialize;
use std::collections::BTreeMap;
use swc_common::Spanned;
use swc_ecma_ast::*;

/// The recognized interop helper shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum HelperKind {
    #[serde(rename = "__commonJS")]
    CommonJs,
    #[serde(rename = "__esm")]
    Esm,
    #[serde(rename = "__toESM")]
    ToEsm,
    #[serde(rename = "__copyProps")]
    CopyProps,
    #[serde(rename = "preamble")]
    Preamble,
}

impl HelperKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HelperKind::CommonJs => "__commonJS",
            HelperKind::Esm => "__esm",
            HelperKind::ToEsm => "__toESM",
            HelperKind::CopyProps => "__copyProps",
            HelperKind::Preamble => "preamble",
        }
    }
}

/// Minified helper name -> helper kind, for one bundle
pub type HelperMap = BTreeMap<String, HelperKind>;

/// Walk top-level variable declarators and recognize interop helpers.
///
/// Recognition rules, first match wins per declarator:
/// 1. the unminified helper names themselves
/// 2. the curried arrow shape `(a, b) => () => ...` whose inner body mentions
///    `exports` and `{}` (lazy CJS factory) or `=0` without `exports` (lazy
///    ESM initializer), tested with whitespace removed
/// 3. any function-valued initializer mentioning `esModule` (ESM adapter)
/// 4. any function-valued initializer mentioning both `getOwnPropertyNames`
///    and `defineProperty` (re-export copier)
pub fn detect_helpers(bundle: &ParsedBundle, body: &str) -> HelperMap {
    let mut map = HelperMap::new();

    for item in &bundle.module.body {
        let Some(var) = crate::ast::as_var_decl(item) else {
            continue;
        };
        for decl in &var.decls {
            let Pat::Ident(binding) = &decl.name else {
                continue;
            };
            let name = binding.id.sym.as_ref();
            let Some(init) = &decl.init else {
                continue;
            };

            let kind = match name {
                "__commonJS" => Some(HelperKind::CommonJs),
                "__esm" => Some(HelperKind::Esm),
                "__toESM" => Some(HelperKind::ToEsm),
                "__copyProps" => Some(HelperKind::CopyProps),
                _ => recognize_shape(init, bundle, body),
            };

            if let Some(kind) = kind {
                map.entry(name.to_string()).or_insert(kind);
            }
        }
    }

    map
}

/// Shape-based recognition for a single initializer expression
fn recognize_shape(init: &Expr, bundle: &ParsedBundle, body: &str) -> Option<HelperKind> {
    if let Some(kind) = recognize_curried_arrow(init, bundle, body) {
        return Some(kind);
    }

    if matches!(init, Expr::Arrow(_) | Expr::Fn(_)) {
        let (lo, hi) = span_range(init.span(), &bundle.source_file);
        let text = &body[lo..hi];
        if text.contains("esModule") {
            return Some(HelperKind::ToEsm);
        }
        if text.contains("getOwnPropertyNames") && text.contains("defineProperty") {
            return Some(HelperKind::CopyProps);
        }
    }

    None
}

/// Match `(a, b) => () => ...` and classify by the inner arrow's body text
fn recognize_curried_arrow(init: &Expr, bundle: &ParsedBundle, body: &str) -> Option<HelperKind> {
    let Expr::Arrow(outer) = init else {
        return None;
    };
    if outer.params.len() != 2 {
        return None;
    }
    let BlockStmtOrExpr::Expr(inner_expr) = &*outer.body else {
        return None;
    };
    let Expr::Arrow(inner) = &**inner_expr else {
        return None;
    };
    if !inner.params.is_empty() {
        return None;
    }

    let (lo, hi) = span_range(inner.body.span(), &bundle.source_file);
    let compact: String = body[lo..hi].chars().filter(|c| !c.is_whitespace()).collect();

    if compact.contains("exports") && compact.contains("{}") {
        Some(HelperKind::CommonJs)
    } else if compact.contains("=0") && !compact.contains("exports") {
        Some(HelperKind::Esm)
    } else {
        None
    }
}
