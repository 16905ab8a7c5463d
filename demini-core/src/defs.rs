//! Top-level definition map
//!
//! Records which statement binds each top-level name, first binding wins:
//! downstream passes treat the first binding site as the owning definition.
//! Destructuring patterns are flattened recursively down to identifier
//! leaves.

use crate::ast::StatementInfo;
use crate::parser::ParsedBundle;
use std::collections::BTreeMap;
use swc_ecma_ast::*;

/// Identifier -> index of the first statement that binds it
#[derive(Debug, Default)]
pub struct DefinitionMap {
    map: BTreeMap<String, usize>,
}

impl DefinitionMap {
    pub fn get(&self, name: &str) -> Option<usize> {
        self.map.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Fill each statement's `names` list and build the global first-wins map
pub fn build_definition_map(
    bundle: &ParsedBundle,
    statements: &mut [StatementInfo],
) -> DefinitionMap {
    let mut defs = DefinitionMap::default();

    for (item, stmt) in bundle.module.body.iter().zip(statements.iter_mut()) {
        stmt.names = statement_defined_names(item);
        for name in &stmt.names {
            defs.map.entry(name.clone()).or_insert(stmt.index);
        }
    }

    defs
}

/// All top-level names one statement binds, in binding order, deduplicated
fn statement_defined_names(item: &ModuleItem) -> Vec<String> {
    let mut names = Vec::new();

    match item {
        ModuleItem::Stmt(Stmt::Decl(decl)) => collect_decl_names(decl, &mut names),
        ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(export)) => {
            collect_decl_names(&export.decl, &mut names)
        }
        ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultDecl(export)) => match &export.decl {
            DefaultDecl::Fn(f) => {
                if let Some(ident) = &f.ident {
                    names.push(ident.sym.to_string());
                }
            }
            DefaultDecl::Class(c) => {
                if let Some(ident) = &c.ident {
                    names.push(ident.sym.to_string());
                }
            }
            DefaultDecl::TsInterfaceDecl(_) => {}
        },
        _ => {}
    }

    let mut seen = std::collections::HashSet::new();
    names.retain(|n| seen.insert(n.clone()));
    names
}

fn collect_decl_names(decl: &Decl, names: &mut Vec<String>) {
    match decl {
        Decl::Var(var) => {
            for declarator in &var.decls {
                collect_pat_names(&declarator.name, names);
            }
        }
        Decl::Fn(f) => names.push(f.ident.sym.to_string()),
        Decl::Class(c) => names.push(c.ident.sym.to_string()),
        _ => {}
    }
}

/// Flatten a binding pattern to its identifier leaves
fn collect_pat_names(pat: &Pat, names: &mut Vec<String>) {
    match pat {
        Pat::Ident(binding) => names.push(binding.id.sym.to_string()),
        Pat::Array(array) => {
            for elem in array.elems.iter().flatten() {
                collect_pat_names(elem, names);
            }
        }
        Pat::Object(object) => {
            for prop in &object.props {
                match prop {
                    ObjectPatProp::KeyValue(kv) => collect_pat_names(&kv.value, names),
                    ObjectPatProp::Assign(assign) => names.push(assign.key.id.sym.to_string()),
                    ObjectPatProp::Rest(rest) => collect_pat_names(&rest.arg, names),
                }
            }
        }
        Pat::Rest(rest) => collect_pat_names(&rest.arg, names),
        Pat::Assign(assign) => collect_pat_names(&assign.left, names),
        Pat::Invalid(_) | Pat::Expr(_) => {}
    }
}
