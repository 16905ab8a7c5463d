//! Cross-statement reference graph
//!
//! For each top-level statement, walks every identifier occurrence in its
//! subtree and records an edge to the statement owning that name's first
//! binding. Shadowing is tested at statement granularity only: bundled code
//! uses globally-unique mangled names, so nested binding scopes are
//! deliberately ignored. A documented approximation.
//!
//! Both adjacency directions are kept as sorted integer sets keyed by
//! statement index; no pointer graphs, no hash-order iteration.

use crate::ast::StatementInfo;
use crate::defs::DefinitionMap;
use crate::parser::ParsedBundle;
use std::collections::{BTreeSet, HashSet};
use swc_ecma_ast::Ident;
use swc_ecma_visit::{Visit, VisitWith};

#[derive(Debug)]
pub struct ReferenceGraph {
    pub refs_out: Vec<BTreeSet<usize>>,
    pub refs_in: Vec<BTreeSet<usize>>,
}

impl ReferenceGraph {
    /// Total number of statement-level edges
    pub fn edge_count(&self) -> usize {
        self.refs_out.iter().map(|s| s.len()).sum()
    }
}

/// Collects the distinct identifier names occurring in one statement
struct IdentCollector {
    names: BTreeSet<String>,
}

impl Visit for IdentCollector {
    fn visit_ident(&mut self, ident: &Ident) {
        self.names.insert(ident.sym.to_string());
    }
}

/// Build the statement-level reference graph
pub fn build_reference_graph(
    bundle: &ParsedBundle,
    statements: &[StatementInfo],
    defs: &DefinitionMap,
) -> ReferenceGraph {
    let n = statements.len();
    let mut refs_out: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n];
    let mut refs_in: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n];

    for (item, stmt) in bundle.module.body.iter().zip(statements.iter()) {
        let mut collector = IdentCollector {
            names: BTreeSet::new(),
        };
        item.visit_with(&mut collector);

        let self_names: HashSet<&str> = stmt.names.iter().map(|s| s.as_str()).collect();

        for name in &collector.names {
            // The occurrence that IS the binding must not count as a
            // reference; names this statement defines are filtered wholesale.
            if self_names.contains(name.as_str()) {
                continue;
            }
            if let Some(target) = defs.get(name) {
                if target != stmt.index {
                    refs_out[stmt.index].insert(target);
                    refs_in[target].insert(stmt.index);
                }
            }
        }
    }

    ReferenceGraph { refs_out, refs_in }
}
