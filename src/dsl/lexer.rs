//! Lexer for program indicator expressions.
//!
//! Converts expression text into a sequence of tokens with span information.
//! Items (`#{..}`, `A{..}`, `C{..}`, `V{..}`, `PS_EVENTDATE:..`) are lexed as
//! single tokens so a malformed item is reported at the item, not at some
//! later brace.

use chumsky::prelude::*;
use std::fmt;

use super::ast::ItemKind;

/// A token in a program indicator expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'src> {
    // ========================================================================
    // Items and function names
    // ========================================================================
    Item(ItemKind),
    /// `d2:name`, carrying the bare name.
    D2Function(&'src str),
    Ident(&'src str),

    // ========================================================================
    // Literals
    // ========================================================================
    Number(f64),
    Str(String),
    True,
    False,

    // ========================================================================
    // Logical operators (symbolic or keyword form)
    // ========================================================================
    And,
    Or,
    Not,

    // ========================================================================
    // Arithmetic and comparison operators
    // ========================================================================
    Caret,
    Star,
    Slash,
    Percent,
    Plus,
    Minus,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    Ne,

    // ========================================================================
    // Punctuation
    // ========================================================================
    LParen,
    RParen,
    Comma,
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Item(item) => write!(f, "{}", item),
            Token::D2Function(name) => write!(f, "d2:{}", name),
            Token::Ident(name) => write!(f, "{}", name),
            Token::Number(n) => write!(f, "{}", n),
            Token::Str(s) => write!(f, "'{}'", s),
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::And => write!(f, "&&"),
            Token::Or => write!(f, "||"),
            Token::Not => write!(f, "!"),
            Token::Caret => write!(f, "^"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Lt => write!(f, "<"),
            Token::Le => write!(f, "<="),
            Token::Gt => write!(f, ">"),
            Token::Ge => write!(f, ">="),
            Token::EqEq => write!(f, "=="),
            Token::Ne => write!(f, "!="),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
        }
    }
}

/// Map an identifier to a keyword token, or keep it as an identifier.
fn keyword_or_ident(s: &str) -> Token<'_> {
    match s {
        "true" => Token::True,
        "false" => Token::False,
        "and" => Token::And,
        "or" => Token::Or,
        "not" => Token::Not,
        _ => Token::Ident(s),
    }
}

/// UIDs and variable names: ASCII alphanumerics and underscores.
fn is_uid(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn stage_data_element(body: &str) -> Option<ItemKind> {
    let (program_stage, data_element) = body.split_once('.')?;
    if !is_uid(program_stage) || !is_uid(data_element) {
        return None;
    }
    Some(ItemKind::StageDataElement {
        program_stage: program_stage.to_string(),
        data_element: data_element.to_string(),
    })
}

fn single_uid(body: &str) -> Option<String> {
    is_uid(body).then(|| body.to_string())
}

/// Create the lexer parser.
pub fn lexer<'src>(
) -> impl Parser<'src, &'src str, Vec<(Token<'src>, SimpleSpan)>, extra::Err<Rich<'src, char>>> {
    // Everything up to the closing brace; shape is checked per item kind.
    let body = none_of('}').repeated().to_slice();

    let stage_element = just("#{")
        .ignore_then(body.clone())
        .then_ignore(just('}'))
        .try_map(|body: &str, span| {
            stage_data_element(body).ok_or_else(|| {
                Rich::custom(
                    span,
                    format!(
                        "malformed data element item '#{{{}}}', expected #{{programStageUid.dataElementUid}}",
                        body
                    ),
                )
            })
        });

    let attribute = just("A{")
        .ignore_then(body.clone())
        .then_ignore(just('}'))
        .try_map(|body: &str, span| {
            single_uid(body).map(ItemKind::Attribute).ok_or_else(|| {
                Rich::custom(span, format!("malformed attribute item 'A{{{}}}'", body))
            })
        });

    let constant = just("C{")
        .ignore_then(body.clone())
        .then_ignore(just('}'))
        .try_map(|body: &str, span| {
            single_uid(body).map(ItemKind::Constant).ok_or_else(|| {
                Rich::custom(span, format!("malformed constant item 'C{{{}}}'", body))
            })
        });

    let variable = just("V{")
        .ignore_then(body)
        .then_ignore(just('}'))
        .try_map(|body: &str, span| {
            single_uid(body).map(ItemKind::ProgramVariable).ok_or_else(|| {
                Rich::custom(span, format!("malformed variable item 'V{{{}}}'", body))
            })
        });

    let uid = any()
        .filter(|c: &char| c.is_ascii_alphanumeric() || *c == '_')
        .repeated()
        .at_least(1)
        .to_slice();

    let event_date = just("PS_EVENTDATE:")
        .ignore_then(uid)
        .map(|uid: &str| ItemKind::StageEventDate(uid.to_string()));

    let item = choice((stage_element, attribute, constant, variable, event_date)).map(Token::Item);

    let d2_function = just("d2:").ignore_then(text::ident()).map(Token::D2Function);

    let ident = text::ident().map(keyword_or_ident);

    // Numbers: 12, 1.5, 2e3, 1.5E-2
    let exponent = one_of("eE")
        .then(one_of("+-").or_not())
        .then(text::digits(10));
    let number = text::digits(10)
        .then(just('.').then(text::digits(10)).or_not())
        .then(exponent.or_not())
        .to_slice()
        .try_map(|s: &str, span| {
            s.parse::<f64>()
                .map(Token::Number)
                .map_err(|_| Rich::custom(span, format!("invalid number '{}'", s)))
        });

    // String literals in either quote style, with backslash escapes.
    let escape = just('\\').ignore_then(choice((
        just('\\'),
        just('/'),
        just('\''),
        just('"'),
        just('n').to('\n'),
        just('r').to('\r'),
        just('t').to('\t'),
    )));
    let single_quoted = just('\'')
        .ignore_then(
            none_of("\\'")
                .or(escape.clone())
                .repeated()
                .collect::<String>(),
        )
        .then_ignore(just('\''));
    let double_quoted = just('"')
        .ignore_then(none_of("\\\"").or(escape).repeated().collect::<String>())
        .then_ignore(just('"'));
    let string_lit = single_quoted.or(double_quoted).map(Token::Str);

    // Symbols (multi-char first, then single-char)
    let symbol = choice((
        just("&&").to(Token::And),
        just("||").to(Token::Or),
        just("<=").to(Token::Le),
        just(">=").to(Token::Ge),
        just("==").to(Token::EqEq),
        just("!=").to(Token::Ne),
        just('<').to(Token::Lt),
        just('>').to(Token::Gt),
        just('!').to(Token::Not),
        just('^').to(Token::Caret),
        just('*').to(Token::Star),
        just('/').to(Token::Slash),
        just('%').to(Token::Percent),
        just('+').to(Token::Plus),
        just('-').to(Token::Minus),
        just('(').to(Token::LParen),
        just(')').to(Token::RParen),
        just(',').to(Token::Comma),
    ));

    // Items and d2: must be tried before plain identifiers.
    let token = choice((item, d2_function, number, string_lit, ident, symbol))
        .map_with(|tok, e| (tok, e.span()));

    token
        .padded()
        .repeated()
        .collect()
        .padded()
        .then_ignore(end())
}

/// Lex a source string into tokens.
///
/// Returns Ok with the token list on success, or Err with the lexing errors.
pub fn lex(source: &str) -> Result<Vec<(Token<'_>, SimpleSpan)>, Vec<Rich<'_, char>>> {
    let (tokens, errs) = lexer().parse(source).into_output_errors();
    if errs.is_empty() {
        Ok(tokens.unwrap_or_default())
    } else {
        Err(errs)
    }
}
