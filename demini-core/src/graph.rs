//! Module graph compilation
//!
//! Lifts statement-level data to module level: byte and line spans, the
//! inner-statement size metric, and dependency edges between modules.

use crate::ast::{as_var_decl, call_callee_ident, StatementInfo, WrapKind};
use crate::helpers::{HelperKind, HelperMap};
use crate::modules::ModuleAssignment;
use crate::parser::ParsedBundle;
use crate::refs::ReferenceGraph;
use std::collections::BTreeSet;
use swc_ecma_ast::*;
use swc_ecma_visit::{Visit, VisitWith};

/// One module with its compiled spans and edges
#[derive(Debug, Clone)]
pub struct ModuleInfo {
    pub id: usize,
    pub kind: WrapKind,
    /// Member statement indices, ascending
    pub statements: Vec<usize>,
    /// Factory statement for CJS/ESM modules, first statement otherwise
    pub primary: usize,
    pub line_start: usize,
    pub line_end: usize,
    /// Total bytes across member statements (gaps excluded)
    pub bytes: usize,
    /// Statements inside the factory callback, 0 for non-factory modules
    pub inner_stmts: usize,
    /// Human-readable size: inner statements plus hoisted companions, or
    /// plain member count when there is no factory body
    pub stmt_count: usize,
    pub deps_out: BTreeSet<usize>,
    pub deps_in: BTreeSet<usize>,
}

/// Compile per-module spans, sizes, and dependency edges
pub fn compile_module_graph(
    bundle: &ParsedBundle,
    statements: &[StatementInfo],
    assignment: &ModuleAssignment,
    refs: &ReferenceGraph,
    helpers: &HelperMap,
) -> Vec<ModuleInfo> {
    let mut modules: Vec<ModuleInfo> = assignment
        .modules
        .iter()
        .enumerate()
        .map(|(id, draft)| {
            let members: Vec<&StatementInfo> =
                draft.statements.iter().map(|&s| &statements[s]).collect();

            let inner_stmts = if matches!(draft.kind, WrapKind::Cjs | WrapKind::Esm) {
                count_factory_inner_statements(&bundle.module.body[draft.primary], helpers)
            } else {
                0
            };
            let stmt_count = if inner_stmts > 0 {
                inner_stmts + (draft.statements.len() - 1)
            } else {
                draft.statements.len()
            };

            ModuleInfo {
                id,
                kind: draft.kind,
                statements: draft.statements.clone(),
                primary: draft.primary,
                line_start: members.iter().map(|s| s.start_line).min().unwrap_or(0),
                line_end: members.iter().map(|s| s.end_line).max().unwrap_or(0),
                bytes: members.iter().map(|s| s.bytes()).sum(),
                inner_stmts,
                stmt_count,
                deps_out: BTreeSet::new(),
                deps_in: BTreeSet::new(),
            }
        })
        .collect();

    // Lift statement edges to module edges, dropping intra-module ones
    for (id, module) in modules.iter_mut().enumerate() {
        for &s in &module.statements {
            for &target in &refs.refs_out[s] {
                let target_module = assignment.statement_modules[target];
                if target_module != id {
                    module.deps_out.insert(target_module);
                }
            }
            for &source in &refs.refs_in[s] {
                let source_module = assignment.statement_modules[source];
                if source_module != id {
                    module.deps_in.insert(source_module);
                }
            }
        }
    }

    modules
}

/// Count the statements inside a factory's callback argument.
///
/// Walks every block statement in the first argument of the `__commonJS` /
/// `__esm` call and sums their lengths, so each inlined source statement
/// counts as one unit.
fn count_factory_inner_statements(item: &ModuleItem, helpers: &HelperMap) -> usize {
    let Some(var) = as_var_decl(item) else {
        return 0;
    };

    for decl in &var.decls {
        let Some(init) = decl.init.as_deref() else {
            continue;
        };
        let is_factory_call = call_callee_ident(init)
            .and_then(|callee| helpers.get(callee.sym.as_ref()))
            .is_some_and(|kind| matches!(kind, HelperKind::CommonJs | HelperKind::Esm));
        if !is_factory_call {
            continue;
        }

        let Expr::Call(call) = init else {
            continue;
        };
        let Some(first_arg) = call.args.first() else {
            continue;
        };

        let mut counter = BlockStmtCounter { total: 0 };
        first_arg.expr.visit_with(&mut counter);
        return counter.total;
    }

    0
}

struct BlockStmtCounter {
    total: usize,
}

impl Visit for BlockStmtCounter {
    fn visit_block_stmt(&mut self, block: &BlockStmt) {
        self.total += block.stmts.len();
        block.visit_children_with(self);
    }
}
