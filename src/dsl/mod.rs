//! Parser for the program indicator expression language.
//!
//! Expressions combine metadata items, program variables, literals,
//! operators and functions:
//!
//! - **Items**: `#{programStage.dataElement}`, `A{attribute}`, `C{constant}`,
//!   `PS_EVENTDATE:programStage`
//! - **Variables**: `V{enrollment_date}`, `V{event_count}`, ...
//! - **Program functions**: `d2:condition(..)`, `d2:count(..)`, `d2:daysBetween(..)`, ...
//! - **Aggregates and logical functions**: `sum(..)`, `avg(..)`, `if(..)`, ...
//!
//! # Example
//!
//! ```
//! use pi_engine::dsl;
//!
//! let result = dsl::parse("d2:zing(#{WZbXY0S00lP.h0xKKjijTdI} + 5)");
//! assert!(result.is_ok());
//! ```

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod span;

pub use ast::*;
pub use span::{Span, Spanned};

use crate::error::{ExpressionError, ExpressionResult};

/// Result of parsing an expression.
#[derive(Debug)]
pub struct ParseResult {
    /// The parsed tree, if parsing succeeded.
    pub expr: Option<ExprNode>,
    /// Diagnostic messages (errors and warnings).
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseResult {
    /// Returns true if parsing succeeded without errors.
    pub fn is_ok(&self) -> bool {
        self.expr.is_some() && !self.has_errors()
    }

    /// Returns true if there are any errors.
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Returns only the error diagnostics.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }

    /// Convert into the tree, or a `MalformedSyntax` error built from the
    /// first error diagnostic.
    pub fn into_result(self) -> ExpressionResult<ExprNode> {
        let first_error = self
            .diagnostics
            .into_iter()
            .find(|d| d.severity == Severity::Error);
        match (self.expr, first_error) {
            (Some(expr), None) => Ok(expr),
            (_, Some(diag)) => Err(ExpressionError::MalformedSyntax {
                message: diag.message,
                span: diag.span,
            }),
            (None, None) => Err(ExpressionError::MalformedSyntax {
                message: "empty expression".to_string(),
                span: 0..0,
            }),
        }
    }
}

/// A diagnostic message with source location.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// The span in the source where the diagnostic applies.
    pub span: Span,
    /// The severity level.
    pub severity: Severity,
    /// The diagnostic message.
    pub message: String,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            severity: Severity::Error,
            message: message.into(),
        }
    }

    /// Render the diagnostic against its source as an annotated report.
    pub fn render(&self, source: &str) -> String {
        use ariadne::{Config, Label, Report, ReportKind, Source};

        let kind = match self.severity {
            Severity::Error => ReportKind::Error,
            Severity::Warning => ReportKind::Warning,
        };
        let mut out = Vec::new();
        let written = Report::build(kind, ("expression", self.span.clone()))
            .with_config(Config::default().with_color(false))
            .with_message(&self.message)
            .with_label(Label::new(("expression", self.span.clone())).with_message(&self.message))
            .finish()
            .write(("expression", Source::from(source)), &mut out);
        match written {
            Ok(()) => String::from_utf8_lossy(&out).into_owned(),
            Err(_) => self.to_string(),
        }
    }
}

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {} (at {:?})", level, self.message, self.span)
    }
}

impl std::error::Error for Diagnostic {}

/// Parse an expression string.
///
/// Returns a `ParseResult` containing the tree (if successful) and any
/// diagnostic messages.
pub fn parse(source: &str) -> ParseResult {
    use chumsky::error::Rich;
    use chumsky::input::Input;
    use chumsky::span::SimpleSpan;
    use chumsky::span::Span as _;
    use chumsky::Parser as _;

    // Step 1: Lexical analysis
    let (tokens, lex_errs) = lexer::lexer().parse(source).into_output_errors();

    let mut diagnostics: Vec<Diagnostic> = lex_errs
        .into_iter()
        .map(|e: Rich<'_, char>| {
            let span = e.span();
            Diagnostic::error(span.start()..span.end(), e.to_string())
        })
        .collect();

    let tokens: Vec<(lexer::Token<'_>, SimpleSpan)> = match tokens {
        Some(t) if diagnostics.is_empty() => t,
        _ => {
            return ParseResult {
                expr: None,
                diagnostics,
            };
        }
    };

    // Step 2: Parsing
    let len = source.len();
    let eoi: SimpleSpan = (len..len).into();
    let token_stream = tokens.as_slice().map(
        eoi,
        |(tok, span): &(lexer::Token<'_>, SimpleSpan)| (tok, span),
    );

    let (expr, parse_errs) = parser::parser().parse(token_stream).into_output_errors();

    diagnostics.extend(
        parse_errs
            .into_iter()
            .map(|e: Rich<'_, lexer::Token<'_>, SimpleSpan>| {
                let span = e.span();
                Diagnostic::error(span.start()..span.end(), e.to_string())
            }),
    );

    ParseResult { expr, diagnostics }
}

/// Parse an expression, failing with `MalformedSyntax` on the first error.
pub fn parse_expression(source: &str) -> ExpressionResult<ExprNode> {
    parse(source).into_result()
}
