//! Parser for program indicator expressions using chumsky.
//!
//! Transforms the lexer's token stream into an [`ExprNode`] tree. Operator
//! precedence, loosest first:
//!
//! ```text
//! ||  or
//! &&  and
//! ==  !=
//! <  <=  >  >=
//! +  -
//! *  /  %
//! unary -  +  !  not
//! ^            (right associative)
//! ```

use chumsky::input::ValueInput;
use chumsky::prelude::*;

use super::ast::*;
use super::lexer::Token;
use super::span::{Span, Spanned};

/// Convert a SimpleSpan to our Span type (Range<usize>)
fn to_span(span: SimpleSpan) -> Span {
    span.start..span.end
}

fn binary(op: BinaryOp, left: ExprNode, right: ExprNode) -> ExprNode {
    let span = left.span.start..right.span.end;
    Spanned::new(
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        span,
    )
}

/// Create the expression parser.
///
/// The parser is generic over the input type, accepting any `ValueInput`
/// that produces `Token` values with `SimpleSpan` spans.
pub fn parser<'tokens, 'src: 'tokens, I>(
) -> impl Parser<'tokens, I, ExprNode, extra::Err<Rich<'tokens, Token<'src>, SimpleSpan>>>
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = SimpleSpan>,
{
    recursive(|expr| {
        // ======================================================================
        // Atoms
        // ======================================================================

        let literal = select! {
            Token::Number(n) => Expr::Number(n),
            Token::Str(s) => Expr::String(s),
            Token::True => Expr::Boolean(true),
            Token::False => Expr::Boolean(false),
            Token::Item(item) => Expr::Item(item),
        }
        .labelled("literal or item");

        let args = expr
            .clone()
            .separated_by(just(Token::Comma))
            .collect::<Vec<_>>()
            .delimited_by(just(Token::LParen), just(Token::RParen));

        // d2:name(args)
        let d2_call = select! {
            Token::D2Function(name) => name.to_string(),
        }
        .map_with(|name, e| Spanned::new(name, to_span(e.span())))
        .then(args.clone())
        .map(|(name, args)| {
            Expr::Function(FunctionCall {
                namespace: FunctionNamespace::D2,
                name,
                args,
            })
        });

        // name(args)
        let call = select! {
            Token::Ident(name) => name.to_string(),
        }
        .map_with(|name, e| Spanned::new(name, to_span(e.span())))
        .labelled("function name")
        .then(args)
        .map(|(name, args)| {
            Expr::Function(FunctionCall {
                namespace: FunctionNamespace::Plain,
                name,
                args,
            })
        });

        let paren = expr
            .delimited_by(just(Token::LParen), just(Token::RParen))
            .map(|inner| Expr::Paren(Box::new(inner)));

        let atom = choice((literal, d2_call, call, paren))
            .map_with(|expr, e| Spanned::new(expr, to_span(e.span())))
            .labelled("expression");

        // ======================================================================
        // Operators
        // ======================================================================

        let unary_op = select! {
            Token::Minus => UnaryOp::Neg,
            Token::Plus => UnaryOp::Plus,
            Token::Not => UnaryOp::Not,
        }
        .map_with(|op, e| (op, to_span(e.span())));

        let prefixed = |op_span: Span, op: UnaryOp, operand: ExprNode| {
            let span = op_span.start..operand.span.end;
            Spanned::new(
                Expr::Unary {
                    op,
                    operand: Box::new(operand),
                },
                span,
            )
        };

        // a ^ b ^ c  =>  a ^ (b ^ c); the exponent may carry a sign: 2 ^ -1
        let power = recursive(|power| {
            let exponent = unary_op
                .clone()
                .repeated()
                .foldr(power, move |(op, op_span), operand: ExprNode| prefixed(op_span, op, operand));
            atom.clone()
                .then(just(Token::Caret).ignore_then(exponent).or_not())
                .map(|(base, exponent)| match exponent {
                    Some(exponent) => binary(BinaryOp::Pow, base, exponent),
                    None => base,
                })
        });

        let unary = unary_op
            .repeated()
            .foldr(power, move |(op, op_span), operand: ExprNode| prefixed(op_span, op, operand));

        let product_op = select! {
            Token::Star => BinaryOp::Mul,
            Token::Slash => BinaryOp::Div,
            Token::Percent => BinaryOp::Mod,
        };
        let product = unary
            .clone()
            .foldl(product_op.then(unary).repeated(), |left, (op, right)| {
                binary(op, left, right)
            });

        let sum_op = select! {
            Token::Plus => BinaryOp::Add,
            Token::Minus => BinaryOp::Sub,
        };
        let sum = product
            .clone()
            .foldl(sum_op.then(product).repeated(), |left, (op, right)| {
                binary(op, left, right)
            });

        let compare_op = select! {
            Token::Lt => BinaryOp::Lt,
            Token::Le => BinaryOp::Le,
            Token::Gt => BinaryOp::Gt,
            Token::Ge => BinaryOp::Ge,
        };
        let comparison = sum
            .clone()
            .foldl(compare_op.then(sum).repeated(), |left, (op, right)| {
                binary(op, left, right)
            });

        let equality_op = select! {
            Token::EqEq => BinaryOp::Eq,
            Token::Ne => BinaryOp::Ne,
        };
        let equality = comparison
            .clone()
            .foldl(equality_op.then(comparison).repeated(), |left, (op, right)| {
                binary(op, left, right)
            });

        let and = equality.clone().foldl(
            just(Token::And).to(BinaryOp::And).then(equality).repeated(),
            |left, (op, right)| binary(op, left, right),
        );

        and.clone().foldl(
            just(Token::Or).to(BinaryOp::Or).then(and).repeated(),
            |left, (op, right)| binary(op, left, right),
        )
    })
    .then_ignore(end())
}
