//! JavaScript bundle parser using SWC
//!
//! Global invariants enforced:
//! - All byte offsets are relative to the shebang-stripped body
//! - Parse failure is fatal; no recovery is attempted

use anyhow::Result;
use swc_common::{sync::Lrc, FileName, SourceFile, SourceMap, Spanned};
use swc_ecma_ast::{EsVersion, Module};
use swc_ecma_parser::{lexer::Lexer, EsSyntax, Parser, StringInput, Syntax};

/// A parsed bundle body plus the SWC machinery needed to resolve spans
pub struct ParsedBundle {
    pub module: Module,
    pub source_map: Lrc<SourceMap>,
    pub source_file: Lrc<SourceFile>,
}

impl std::fmt::Debug for ParsedBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParsedBundle")
            .field("module", &self.module)
            .finish_non_exhaustive()
    }
}

/// Split an optional `#!...\n` shebang off the front of the input.
///
/// Returns `(shebang, body)`. The shebang includes its trailing newline; when
/// no newline follows, the whole input is the shebang and the body is empty.
pub fn split_shebang(input: &str) -> (&str, &str) {
    if let Some(rest) = input.strip_prefix("#!") {
        match rest.find('\n') {
            Some(pos) => input.split_at(2 + pos + 1),
            None => (input, ""),
        }
    } else {
        ("", input)
    }
}

/// Parse a shebang-stripped bundle body as an ES2022 module.
///
/// Bundles are always parsed in module mode with plain ES syntax (no JSX, no
/// TypeScript): bundler output is post-transform JavaScript.
///
/// Returns an error carrying the offending position if parse errors occur.
pub fn parse_body(body: &str, input_name: &str) -> Result<ParsedBundle> {
    let source_map: Lrc<SourceMap> = Default::default();

    let source_file: Lrc<SourceFile> = source_map.new_source_file(
        FileName::Custom(input_name.into()).into(),
        body.to_string(),
    );

    let input = StringInput::from(&*source_file);

    let lexer = Lexer::new(
        Syntax::Es(EsSyntax {
            jsx: false,
            ..Default::default()
        }),
        EsVersion::Es2022,
        input,
        None,
    );

    let mut parser = Parser::new_from(lexer);

    let module = parser
        .parse_module()
        .map_err(|e| parse_error(&source_map, &e, input_name))?;

    // SWC recovers from some syntax errors and reports them on the side.
    // Any such error is still fatal for us: a partially-recovered AST would
    // break byte accounting downstream.
    if let Some(first) = parser.take_errors().into_iter().next() {
        return Err(parse_error(&source_map, &first, input_name));
    }

    Ok(ParsedBundle {
        module,
        source_map,
        source_file,
    })
}

/// Format a parser error with the position it points at, when it has one
fn parse_error(
    source_map: &SourceMap,
    e: &swc_ecma_parser::error::Error,
    input_name: &str,
) -> anyhow::Error {
    let msg = e.kind().msg();
    let span = e.span();
    if span.lo.0 == 0 {
        anyhow::anyhow!("parse error in {}: {}", input_name, msg)
    } else {
        let loc = source_map.lookup_char_pos(span.lo);
        anyhow::anyhow!(
            "parse error at {}:{}:{}: {}",
            input_name,
            loc.line,
            loc.col_display + 1,
            msg
        )
    }
}
