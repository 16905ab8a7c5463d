//! Statement classification
//!
//! Assigns each top-level statement a category string and derives its
//! WrapKind from the category prefix. Variable declarations accumulate one
//! contribution per declarator; contributions are deduplicated and joined
//! with `+` in sorted order, so compound statements classify deterministically.

use crate::ast::{as_var_decl, call_callee_ident, StatementInfo, WrapKind};
use crate::helpers::{HelperKind, HelperMap};
use crate::parser::ParsedBundle;
use std::collections::BTreeSet;
use swc_ecma_ast::*;

/// Statements past this index never classify as preamble `Object.*` aliases
pub const PREAMBLE_STATEMENT_CUTOFF: usize = 10;

/// `Object` members that esbuild aliases in its preamble
const PREAMBLE_OBJECT_PROPS: &[&str] = &[
    "create",
    "defineProperty",
    "getOwnPropertyDescriptor",
    "getOwnPropertyNames",
    "getPrototypeOf",
];

/// Assign a category and initial WrapKind to every statement
pub fn classify_statements(
    bundle: &ParsedBundle,
    statements: &mut [StatementInfo],
    helpers: &HelperMap,
) {
    for (item, stmt) in bundle.module.body.iter().zip(statements.iter_mut()) {
        stmt.category = match as_var_decl(item) {
            Some(var) => classify_var_decl(stmt.index, var, helpers),
            None => category_for_shape(stmt.shape),
        };
        stmt.wrap_kind = wrap_kind_for(&stmt.category);
    }
}

/// Category for a plain variable declaration: one contribution per declarator
fn classify_var_decl(index: usize, var: &VarDecl, helpers: &HelperMap) -> String {
    let mut contributions: BTreeSet<String> = BTreeSet::new();

    for decl in &var.decls {
        contributions.insert(declarator_contribution(index, decl, helpers));
    }

    // A statement that both defines a helper and calls one is a helper
    // definition first: the definition is what downstream passes key off.
    if contributions
        .iter()
        .any(|c| c.starts_with("RUNTIME_HELPER"))
    {
        contributions.retain(|c| {
            !c.starts_with("MODULE_FACTORY")
                && !c.starts_with("ADAPTED_IMPORT")
                && !c.starts_with("REEXPORT")
        });
    }

    contributions.into_iter().collect::<Vec<_>>().join("+")
}

fn declarator_contribution(index: usize, decl: &VarDeclarator, helpers: &HelperMap) -> String {
    if let Pat::Ident(binding) = &decl.name {
        if let Some(kind) = helpers.get(binding.id.sym.as_ref()) {
            return format!("RUNTIME_HELPER.{}", kind.as_str());
        }
    }

    if let Some(init) = &decl.init {
        if index < PREAMBLE_STATEMENT_CUTOFF && is_object_alias(init) {
            return format!("RUNTIME_HELPER.{}", HelperKind::Preamble.as_str());
        }

        if let Some(callee) = call_callee_ident(init) {
            if let Some(kind) = helpers.get(callee.sym.as_ref()) {
                return match kind {
                    HelperKind::CommonJs => "MODULE_FACTORY.__commonJS".to_string(),
                    HelperKind::Esm => "MODULE_FACTORY.__esm".to_string(),
                    HelperKind::ToEsm => "ADAPTED_IMPORT.__toESM".to_string(),
                    HelperKind::CopyProps => "REEXPORT.__copyProps".to_string(),
                    HelperKind::Preamble => "VAR_DECL".to_string(),
                };
            }
        }
    }

    "VAR_DECL".to_string()
}

/// `Object.create`, `Object.getOwnPropertyNames`, ...,
/// or `Object.prototype.hasOwnProperty`
fn is_object_alias(init: &Expr) -> bool {
    let Expr::Member(member) = init else {
        return false;
    };
    let MemberProp::Ident(prop) = &member.prop else {
        return false;
    };

    match &*member.obj {
        Expr::Ident(obj) if obj.sym.as_ref() == "Object" => {
            PREAMBLE_OBJECT_PROPS.contains(&prop.sym.as_ref())
        }
        Expr::Member(inner) => {
            let MemberProp::Ident(inner_prop) = &inner.prop else {
                return false;
            };
            matches!(&*inner.obj, Expr::Ident(obj) if obj.sym.as_ref() == "Object")
                && inner_prop.sym.as_ref() == "prototype"
                && prop.sym.as_ref() == "hasOwnProperty"
        }
        _ => false,
    }
}

/// Category for every non-VariableDeclaration shape
fn category_for_shape(shape: &str) -> String {
    match shape {
        "FunctionDeclaration" => "FUNCTION_DECL",
        "ClassDeclaration" => "CLASS_DECL",
        "ExpressionStatement" => "EXPRESSION",
        "ImportDeclaration" => "IMPORT",
        "ExportNamedDeclaration" => "EXPORT_NAMED",
        "ExportDefaultDeclaration" => "EXPORT_DEFAULT",
        "ExportAllDeclaration" => "EXPORT_ALL",
        "IfStatement" => "IF_STMT",
        "ForStatement" | "ForInStatement" | "ForOfStatement" => "FOR_STMT",
        "WhileStatement" | "DoWhileStatement" => "WHILE_STMT",
        "TryStatement" => "TRY_STMT",
        "SwitchStatement" => "SWITCH_STMT",
        "BlockStatement" => "BLOCK_STMT",
        "EmptyStatement" => "EMPTY",
        other => return other.to_uppercase(),
    }
    .to_string()
}

/// Derive WrapKind from the category prefix.
///
/// IMPORT is never produced here; it only appears during module
/// identification when a statement turns out to invoke a factory.
pub fn wrap_kind_for(category: &str) -> WrapKind {
    if category.starts_with("RUNTIME_HELPER") {
        WrapKind::Runtime
    } else if category.starts_with("MODULE_FACTORY.__commonJS") {
        WrapKind::Cjs
    } else if category.starts_with("MODULE_FACTORY.__esm")
        || category.starts_with("ADAPTED_IMPORT")
        || category.starts_with("REEXPORT")
    {
        WrapKind::Esm
    } else {
        WrapKind::None
    }
}

/// Extend the runtime preamble: every unclassified statement before the
/// first factory statement is bundler boilerplate, not module code.
///
/// Returns the number of statements promoted.
pub fn promote_preamble(statements: &mut [StatementInfo]) -> usize {
    let first_factory = statements
        .iter()
        .position(|s| matches!(s.wrap_kind, WrapKind::Cjs | WrapKind::Esm));

    let Some(first) = first_factory else {
        return 0;
    };

    let mut promoted = 0;
    for stmt in &mut statements[..first] {
        if stmt.wrap_kind == WrapKind::None {
            stmt.wrap_kind = WrapKind::Runtime;
            promoted += 1;
        }
    }
    promoted
}
