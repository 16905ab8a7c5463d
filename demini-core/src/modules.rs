//! Module identification
//!
//! Promotes top-level statements to modules in five passes: the runtime
//! group, CJS factories, ESM factories with hoisted-declaration back-trace,
//! import-call detection, and Jaccard clustering of whatever remains.
//! Finishes by renumbering modules in source-position order.
//!
//! Global invariants enforced:
//! - Every statement ends up in exactly one module
//! - Module ids are dense and increase with the smallest statement index
//! - All iteration is in statement-index order; no hash-order dependence

use crate::ast::{as_var_decl, call_callee_ident, StatementInfo, WrapKind};
use crate::classify::promote_preamble;
use crate::helpers::{HelperKind, HelperMap};
use crate::parser::ParsedBundle;
use crate::refs::ReferenceGraph;
use anyhow::Result;
use std::collections::BTreeSet;
use swc_ecma_ast::*;

/// Two elements cluster when the Jaccard similarity of their fingerprints
/// reaches this threshold. Fixed by design: raising it splits import blocks
/// from their consumers, lowering it glues unrelated statement runs.
pub const JACCARD_THRESHOLD: f64 = 0.5;

/// One identified module, before graph compilation
#[derive(Debug, Clone)]
pub struct ModuleDraft {
    pub kind: WrapKind,
    /// Member statement indices, ascending
    pub statements: Vec<usize>,
    /// The factory statement for CJS/ESM modules, the first statement
    /// otherwise
    pub primary: usize,
}

/// The finished statement -> module assignment
#[derive(Debug)]
pub struct ModuleAssignment {
    /// Modules in final id order (dense, source-position sorted)
    pub modules: Vec<ModuleDraft>,
    /// Module id for every statement index
    pub statement_modules: Vec<usize>,
}

/// Run all five passes plus renumbering.
///
/// Mutates each statement's WrapKind (ESM absorption, import detection) and
/// fills in its final module id.
pub fn identify_modules(
    bundle: &ParsedBundle,
    statements: &mut [StatementInfo],
    helpers: &HelperMap,
    refs: &ReferenceGraph,
) -> Result<ModuleAssignment> {
    let n = statements.len();

    // Precondition: leading unclassified statements join the runtime preamble
    promote_preamble(statements);

    let mut assigned: Vec<Option<usize>> = vec![None; n];
    let mut drafts: Vec<ModuleDraft> = Vec::new();

    // Pass 1: one module for all runtime statements
    let runtime: Vec<usize> = statements
        .iter()
        .filter(|s| s.wrap_kind == WrapKind::Runtime)
        .map(|s| s.index)
        .collect();
    if !runtime.is_empty() {
        push_draft(&mut drafts, &mut assigned, WrapKind::Runtime, runtime, None);
    }

    // Pass 2: each CJS factory statement is its own module
    for i in 0..n {
        if statements[i].wrap_kind == WrapKind::Cjs {
            push_draft(&mut drafts, &mut assigned, WrapKind::Cjs, vec![i], None);
        }
    }

    // Pass 3: ESM factories absorb the contiguous run of unassigned,
    // unclassified statements directly above them (hoisted declarations)
    for s in 0..n {
        if statements[s].wrap_kind != WrapKind::Esm || assigned[s].is_some() {
            continue;
        }

        if is_esm_factory(&bundle.module.body[s], helpers) {
            let mut members = Vec::new();
            let mut j = s;
            while j > 0 {
                j -= 1;
                if assigned[j].is_none() && statements[j].wrap_kind == WrapKind::None {
                    statements[j].wrap_kind = WrapKind::Esm;
                    members.push(j);
                } else {
                    break;
                }
            }
            members.reverse();
            members.push(s);
            push_draft(&mut drafts, &mut assigned, WrapKind::Esm, members, Some(s));
        } else {
            // __toESM / __copyProps adapter statements stand alone
            push_draft(&mut drafts, &mut assigned, WrapKind::Esm, vec![s], None);
        }
    }

    // Pass 4: statements that invoke a factory by name become imports;
    // they stay unassigned and cluster as super-nodes in pass 5
    let factory_names = collect_factory_names(&drafts, statements);
    for i in 0..n {
        if assigned[i].is_some() {
            continue;
        }
        if is_factory_invocation(&bundle.module.body[i], &factory_names) {
            statements[i].wrap_kind = WrapKind::Import;
        }
    }

    // Pass 5: cluster maximal runs of unassigned statements
    let mut i = 0;
    while i < n {
        if assigned[i].is_some() {
            i += 1;
            continue;
        }
        let mut run = Vec::new();
        while i < n && assigned[i].is_none() {
            run.push(i);
            i += 1;
        }
        cluster_run(&run, statements, refs, &mut assigned, &mut drafts);
    }

    renumber(drafts, statements)
}

fn push_draft(
    drafts: &mut Vec<ModuleDraft>,
    assigned: &mut [Option<usize>],
    kind: WrapKind,
    statements: Vec<usize>,
    primary: Option<usize>,
) {
    let id = drafts.len();
    for &s in &statements {
        assigned[s] = Some(id);
    }
    let primary = primary.unwrap_or(statements[0]);
    drafts.push(ModuleDraft {
        kind,
        statements,
        primary,
    });
}

/// A variable declaration with at least one declarator calling an
/// `__esm`-kind helper
fn is_esm_factory(item: &ModuleItem, helpers: &HelperMap) -> bool {
    let Some(var) = as_var_decl(item) else {
        return false;
    };
    var.decls.iter().any(|decl| {
        decl.init
            .as_deref()
            .and_then(call_callee_ident)
            .and_then(|callee| helpers.get(callee.sym.as_ref()))
            .is_some_and(|kind| *kind == HelperKind::Esm)
    })
}

/// Every name defined by a statement belonging to a CJS or ESM module
fn collect_factory_names(
    drafts: &[ModuleDraft],
    statements: &[StatementInfo],
) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for draft in drafts {
        if !matches!(draft.kind, WrapKind::Cjs | WrapKind::Esm) {
            continue;
        }
        for &s in &draft.statements {
            names.extend(statements[s].names.iter().cloned());
        }
    }
    names
}

/// `var x = F(...)` or bare `F(...);` where `F` is a factory name
fn is_factory_invocation(item: &ModuleItem, factory_names: &BTreeSet<String>) -> bool {
    if let Some(var) = as_var_decl(item) {
        return var.decls.iter().any(|decl| {
            decl.init
                .as_deref()
                .and_then(call_callee_ident)
                .is_some_and(|callee| factory_names.contains(callee.sym.as_ref()))
        });
    }
    if let ModuleItem::Stmt(Stmt::Expr(expr_stmt)) = item {
        return call_callee_ident(&expr_stmt.expr)
            .is_some_and(|callee| factory_names.contains(callee.sym.as_ref()));
    }
    false
}

/// Cluster one contiguous run of unassigned statements.
///
/// Consecutive import statements collapse into a single element first, so an
/// import block and the consumers that follow it are compared as units.
fn cluster_run(
    run: &[usize],
    statements: &[StatementInfo],
    refs: &ReferenceGraph,
    assigned: &mut [Option<usize>],
    drafts: &mut Vec<ModuleDraft>,
) {
    // Collapse consecutive IMPORT statements into super-nodes
    let mut elements: Vec<Vec<usize>> = Vec::new();
    for &s in run {
        let is_import = statements[s].wrap_kind == WrapKind::Import;
        if is_import {
            if let Some(last) = elements.last_mut() {
                if let Some(&prev) = last.last() {
                    if statements[prev].wrap_kind == WrapKind::Import && prev + 1 == s {
                        last.push(s);
                        continue;
                    }
                }
            }
        }
        elements.push(vec![s]);
    }

    // Fingerprints are computed against the assignments existing when the
    // run starts; clusters flushed within the run do not feed back in.
    let fingerprints: Vec<BTreeSet<usize>> = elements
        .iter()
        .map(|e| fingerprint_for(e, refs, assigned))
        .collect();

    let mut cluster: Vec<usize> = Vec::new();
    let mut cluster_fp: BTreeSet<usize> = BTreeSet::new();

    for (element, fp) in elements.iter().zip(fingerprints.iter()) {
        if cluster.is_empty() {
            cluster.extend(element);
            cluster_fp = fp.clone();
            continue;
        }
        if jaccard(&cluster_fp, fp) >= JACCARD_THRESHOLD {
            cluster.extend(element);
            cluster_fp.extend(fp.iter().copied());
        } else {
            flush_cluster(&mut cluster, statements, assigned, drafts);
            cluster.extend(element);
            cluster_fp = fp.clone();
        }
    }
    flush_cluster(&mut cluster, statements, assigned, drafts);
}

fn flush_cluster(
    cluster: &mut Vec<usize>,
    statements: &[StatementInfo],
    assigned: &mut [Option<usize>],
    drafts: &mut Vec<ModuleDraft>,
) {
    if cluster.is_empty() {
        return;
    }
    let all_imports = cluster
        .iter()
        .all(|&s| statements[s].wrap_kind == WrapKind::Import);
    let kind = if all_imports {
        WrapKind::Import
    } else {
        WrapKind::None
    };
    push_draft(drafts, assigned, kind, std::mem::take(cluster), None);
}

/// The set of module ids an element reaches through its outbound references.
///
/// References to assigned statements contribute that statement's module id;
/// references to still-unassigned statements contribute no id of their own
/// but are traversed, so a consumer of freshly-imported bindings inherits
/// the modules those imports pull in.
fn fingerprint_for(
    element: &[usize],
    refs: &ReferenceGraph,
    assigned: &[Option<usize>],
) -> BTreeSet<usize> {
    let mut fp = BTreeSet::new();
    let mut visited: BTreeSet<usize> = element.iter().copied().collect();
    let mut queue: Vec<usize> = element.to_vec();

    while let Some(s) = queue.pop() {
        for &target in &refs.refs_out[s] {
            match assigned[target] {
                Some(module) => {
                    fp.insert(module);
                }
                None => {
                    if visited.insert(target) {
                        queue.push(target);
                    }
                }
            }
        }
    }
    fp
}

/// Jaccard similarity of two fingerprints; two empty sets count as identical
pub fn jaccard(a: &BTreeSet<usize>, b: &BTreeSet<usize>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}

/// Sort modules by smallest statement index, assign dense final ids, and
/// record each statement's module
fn renumber(
    drafts: Vec<ModuleDraft>,
    statements: &mut [StatementInfo],
) -> Result<ModuleAssignment> {
    let mut order: Vec<usize> = (0..drafts.len()).collect();
    order.sort_by_key(|&d| drafts[d].statements[0]);

    let mut modules = Vec::with_capacity(drafts.len());
    let mut statement_modules = vec![usize::MAX; statements.len()];

    for (final_id, &d) in order.iter().enumerate() {
        let draft = &drafts[d];
        if draft.statements.is_empty() {
            anyhow::bail!("module {} has no statements", final_id);
        }
        for &s in &draft.statements {
            statement_modules[s] = final_id;
            statements[s].module_id = Some(final_id);
        }
        modules.push(draft.clone());
    }

    if let Some(unassigned) = statement_modules.iter().position(|&m| m == usize::MAX) {
        anyhow::bail!(
            "statement {} (lines {}-{}) left unassigned after clustering",
            unassigned,
            statements[unassigned].start_line,
            statements[unassigned].end_line
        );
    }

    Ok(ModuleAssignment {
        modules,
        statement_modules,
    })
}
