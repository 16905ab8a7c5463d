//! Bundler fingerprinting
//!
//! Aggregates structural signals (helper shapes, preamble density, node
//! compat shims) into a bundler verdict. The taxonomy is open: module
//! identification never consults the verdict, so new bundlers can be added
//! here without disturbing downstream passes.

use crate::ast::StatementInfo;
use crate::helpers::{HelperKind, HelperMap};
use serde::Serialize;
use std::collections::BTreeSet;

/// At least this many of the first five statements must mention an
/// `Object.*` member for the preamble signal to fire
pub const PREAMBLE_SIGNAL_MIN: usize = 3;

const PREAMBLE_MARKERS: &[&str] = &[
    "Object.create",
    "Object.defineProperty",
    "Object.getOwnPropertyDescriptor",
    "Object.getOwnPropertyNames",
];

const WEBPACK_MARKERS: &[&str] = &[
    "__webpack_require__",
    "__webpack_exports__",
    "__webpack_modules__",
    "webpackJsonp",
    "webpackBootstrap",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Confidence {
    #[serde(rename = "high")]
    High,
    #[serde(rename = "medium")]
    Medium,
    #[serde(rename = "low")]
    Low,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

/// The fingerprinter's verdict for one bundle
#[derive(Debug, Clone, Serialize)]
pub struct BundlerFingerprint {
    pub bundler: String,
    pub confidence: Confidence,
    pub signals: Vec<String>,
}

/// Collect signals and decide the bundler.
///
/// esbuild: each detected helper kind is one signal; dense `Object.*`
/// aliasing in the first five statements is one; the `createRequire` +
/// `import.meta.url` node-compat shim is one. Two or more signals mean high
/// confidence, one means medium.
///
/// webpack markers are consulted only when no esbuild signal fired.
pub fn fingerprint_bundle(
    body: &str,
    statements: &[StatementInfo],
    helpers: &HelperMap,
) -> BundlerFingerprint {
    let mut signals = Vec::new();

    let kinds: BTreeSet<HelperKind> = helpers.values().copied().collect();
    for kind in &kinds {
        signals.push(format!("helper:{}", kind.as_str()));
    }

    let preamble_hits = statements
        .iter()
        .take(5)
        .filter(|s| {
            let text = s.source(body);
            PREAMBLE_MARKERS.iter().any(|m| text.contains(m))
        })
        .count();
    if preamble_hits >= PREAMBLE_SIGNAL_MIN {
        signals.push(format!("preamble:object-aliases:{}", preamble_hits));
    }

    if body.contains("createRequire") && body.contains("import.meta.url") {
        signals.push("node-compat:createRequire+import.meta.url".to_string());
    }

    if !signals.is_empty() {
        let confidence = if signals.len() >= 2 {
            Confidence::High
        } else {
            Confidence::Medium
        };
        return BundlerFingerprint {
            bundler: "esbuild".to_string(),
            confidence,
            signals,
        };
    }

    let webpack_hits: Vec<&str> = WEBPACK_MARKERS
        .iter()
        .copied()
        .filter(|m| body.contains(m))
        .collect();
    if !webpack_hits.is_empty() {
        let confidence = if webpack_hits.len() >= 2 {
            Confidence::High
        } else {
            Confidence::Medium
        };
        return BundlerFingerprint {
            bundler: "webpack".to_string(),
            confidence,
            signals: webpack_hits
                .iter()
                .map(|m| format!("webpack:{}", m))
                .collect(),
        };
    }

    BundlerFingerprint {
        bundler: "unknown".to_string(),
        confidence: Confidence::Low,
        signals: Vec::new(),
    }
}
