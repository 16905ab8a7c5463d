//! Statement model for top-level bundle analysis
//!
//! Global invariants enforced:
//! - Statements are totally ordered by index and by byte start
//! - Byte ranges are pairwise disjoint and relative to the stripped body

use crate::parser::ParsedBundle;
use serde::Serialize;
use swc_common::{BytePos, SourceFile, Span, Spanned};
use swc_ecma_ast::*;

/// The role a top-level statement plays in module wrapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum WrapKind {
    #[serde(rename = "CJS")]
    Cjs,
    #[serde(rename = "ESM")]
    Esm,
    #[serde(rename = "RUNTIME")]
    Runtime,
    #[serde(rename = "IMPORT")]
    Import,
    #[serde(rename = "None")]
    None,
}

impl WrapKind {
    /// Fixed presentation order used by histograms and the header comment
    pub const ALL: [WrapKind; 5] = [
        WrapKind::Cjs,
        WrapKind::Esm,
        WrapKind::Import,
        WrapKind::Runtime,
        WrapKind::None,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WrapKind::Cjs => "CJS",
            WrapKind::Esm => "ESM",
            WrapKind::Runtime => "RUNTIME",
            WrapKind::Import => "IMPORT",
            WrapKind::None => "None",
        }
    }
}

impl std::fmt::Display for WrapKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One top-level statement of the parsed body
#[derive(Debug, Clone)]
pub struct StatementInfo {
    /// Ordinal position in `module.body` (0-based)
    pub index: usize,
    /// Byte range `[start, end)` in the stripped body
    pub start: usize,
    pub end: usize,
    /// 1-based line range
    pub start_line: usize,
    pub end_line: usize,
    /// ESTree-style shape tag (e.g. `VariableDeclaration`)
    pub shape: &'static str,
    /// Category string assigned by the classifier
    pub category: String,
    pub wrap_kind: WrapKind,
    /// Top-level names this statement binds, in binding order
    pub names: Vec<String>,
    /// Module assignment, filled by the module identifier
    pub module_id: Option<usize>,
}

impl StatementInfo {
    pub fn bytes(&self) -> usize {
        self.end - self.start
    }

    /// The statement's verbatim source slice
    pub fn source<'a>(&self, body: &'a str) -> &'a str {
        &body[self.start..self.end]
    }
}

/// Convert an SWC span to a byte range relative to the parsed body
pub fn span_range(span: Span, source_file: &SourceFile) -> (usize, usize) {
    let base = source_file.start_pos.0;
    ((span.lo.0 - base) as usize, (span.hi.0 - base) as usize)
}

/// Collect all top-level statements in source order
pub fn collect_statements(bundle: &ParsedBundle) -> Vec<StatementInfo> {
    bundle
        .module
        .body
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let span = item.span();
            let (start, end) = span_range(span, &bundle.source_file);
            let start_line = bundle.source_map.lookup_char_pos(span.lo).line;
            // hi is exclusive; step back one byte so the last line is the
            // line actually containing statement text
            let end_pos = if span.hi > span.lo {
                BytePos(span.hi.0 - 1)
            } else {
                span.lo
            };
            let end_line = bundle.source_map.lookup_char_pos(end_pos).line;

            StatementInfo {
                index,
                start,
                end,
                start_line,
                end_line,
                shape: shape_tag(item),
                category: String::new(),
                wrap_kind: WrapKind::None,
                names: Vec::new(),
                module_id: None,
            }
        })
        .collect()
}

/// The statement's plain `var`/`let`/`const` declaration, if it is one.
///
/// Exported declarations are deliberately excluded: they classify as
/// EXPORT_NAMED and never participate in factory or helper recognition.
pub fn as_var_decl(item: &ModuleItem) -> Option<&VarDecl> {
    match item {
        ModuleItem::Stmt(Stmt::Decl(Decl::Var(var))) => Some(var.as_ref()),
        _ => None,
    }
}

/// The callee identifier of a direct call expression (`name(...)`), if any
pub fn call_callee_ident(expr: &Expr) -> Option<&Ident> {
    if let Expr::Call(call) = expr {
        if let Callee::Expr(callee) = &call.callee {
            if let Expr::Ident(ident) = &**callee {
                return Some(ident);
            }
        }
    }
    None
}

/// ESTree-style shape tag for a top-level node
pub fn shape_tag(item: &ModuleItem) -> &'static str {
    match item {
        ModuleItem::ModuleDecl(decl) => match decl {
            ModuleDecl::Import(_) => "ImportDeclaration",
            ModuleDecl::ExportDecl(_) | ModuleDecl::ExportNamed(_) => "ExportNamedDeclaration",
            ModuleDecl::ExportDefaultDecl(_) | ModuleDecl::ExportDefaultExpr(_) => {
                "ExportDefaultDeclaration"
            }
            ModuleDecl::ExportAll(_) => "ExportAllDeclaration",
            ModuleDecl::TsImportEquals(_) => "TsImportEquals",
            ModuleDecl::TsExportAssignment(_) => "TsExportAssignment",
            ModuleDecl::TsNamespaceExport(_) => "TsNamespaceExport",
        },
        ModuleItem::Stmt(stmt) => match stmt {
            Stmt::Decl(Decl::Var(_)) => "VariableDeclaration",
            Stmt::Decl(Decl::Fn(_)) => "FunctionDeclaration",
            Stmt::Decl(Decl::Class(_)) => "ClassDeclaration",
            Stmt::Decl(Decl::Using(_)) => "UsingDeclaration",
            Stmt::Decl(_) => "Declaration",
            Stmt::Expr(_) => "ExpressionStatement",
            Stmt::If(_) => "IfStatement",
            Stmt::For(_) => "ForStatement",
            Stmt::ForIn(_) => "ForInStatement",
            Stmt::ForOf(_) => "ForOfStatement",
            Stmt::While(_) => "WhileStatement",
            Stmt::DoWhile(_) => "DoWhileStatement",
            Stmt::Try(_) => "TryStatement",
            Stmt::Switch(_) => "SwitchStatement",
            Stmt::Block(_) => "BlockStatement",
            Stmt::Empty(_) => "EmptyStatement",
            Stmt::Return(_) => "ReturnStatement",
            Stmt::Throw(_) => "ThrowStatement",
            Stmt::Break(_) => "BreakStatement",
            Stmt::Continue(_) => "ContinueStatement",
            Stmt::Labeled(_) => "LabeledStatement",
            Stmt::Debugger(_) => "DebuggerStatement",
            Stmt::With(_) => "WithStatement",
        },
    }
}
