//! One traversal shared by every pass over an expression tree.
//!
//! Validation, SQL generation and description each implement
//! [`ExpressionVisitor`] with their own `Output`. [`walk`] fixes the order in
//! which children are visited, looks functions up in the registry and checks
//! argument counts, so the passes cannot disagree on any of that.
//!
//! Operators are visited bottom-up: the visitor receives the outputs of the
//! operands. Functions receive the call itself, because several of them
//! treat their arguments specially (string sub-expressions, suspended null
//! replacement, item-only arguments).

use crate::dsl::{self, BinaryOp, Expr, ExprNode, FunctionCall, ItemKind, UnaryOp};
use crate::error::{ExpressionError, ExpressionResult};
use crate::registry::FunctionKind;

/// A pass over an expression tree.
pub trait ExpressionVisitor: Sized {
    type Output;

    /// Visit a node. Passes that need to intercept every node override this
    /// and call [`walk`] themselves.
    fn visit(&mut self, node: &ExprNode) -> ExpressionResult<Self::Output> {
        walk(self, node)
    }

    fn visit_number(&mut self, value: f64) -> ExpressionResult<Self::Output>;

    fn visit_string(&mut self, value: &str) -> ExpressionResult<Self::Output>;

    fn visit_boolean(&mut self, value: bool) -> ExpressionResult<Self::Output>;

    fn visit_item(&mut self, item: &ItemKind) -> ExpressionResult<Self::Output>;

    fn visit_unary(&mut self, op: UnaryOp, operand: Self::Output) -> ExpressionResult<Self::Output>;

    fn visit_binary(
        &mut self,
        op: BinaryOp,
        left: Self::Output,
        right: Self::Output,
    ) -> ExpressionResult<Self::Output>;

    fn visit_paren(&mut self, inner: Self::Output) -> ExpressionResult<Self::Output>;

    /// Visit a call whose name and argument count have been checked.
    fn visit_function(
        &mut self,
        kind: FunctionKind,
        call: &FunctionCall,
    ) -> ExpressionResult<Self::Output>;
}

/// Dispatch a node to the matching visitor method.
pub fn walk<V: ExpressionVisitor>(visitor: &mut V, node: &ExprNode) -> ExpressionResult<V::Output> {
    match &node.value {
        Expr::Number(n) => visitor.visit_number(*n),
        Expr::String(s) => visitor.visit_string(s),
        Expr::Boolean(b) => visitor.visit_boolean(*b),
        Expr::Item(item) => visitor.visit_item(item),
        Expr::Unary { op, operand } => {
            let operand = visitor.visit(operand)?;
            visitor.visit_unary(*op, operand)
        }
        Expr::Binary { op, left, right } => {
            let left = visitor.visit(left)?;
            let right = visitor.visit(right)?;
            visitor.visit_binary(*op, left, right)
        }
        Expr::Paren(inner) => {
            let inner = visitor.visit(inner)?;
            visitor.visit_paren(inner)
        }
        Expr::Function(call) => {
            let kind = lookup_function(call)?;
            visitor.visit_function(kind, call)
        }
    }
}

/// Resolve a call to its registry entry and check the argument count.
pub fn lookup_function(call: &FunctionCall) -> ExpressionResult<FunctionKind> {
    let kind = FunctionKind::lookup(call.namespace, &call.name.value)
        .ok_or_else(|| ExpressionError::UnknownFunction(call.display_name()))?;
    let arity = kind.arity();
    if !arity.accepts(call.args.len()) {
        return Err(ExpressionError::ArgumentCountMismatch {
            function: call.display_name(),
            expected: arity.to_string(),
            found: call.args.len(),
        });
    }
    Ok(kind)
}

/// Parse a sub-expression held in a string argument and visit it.
pub fn walk_source<V: ExpressionVisitor>(visitor: &mut V, source: &str) -> ExpressionResult<V::Output> {
    let tree = dsl::parse_expression(source)?;
    visitor.visit(&tree)
}

/// The full expression held in a condition string argument.
///
/// `d2:countIfCondition` conditions are a right-hand side only (`'> 5'`),
/// so they are completed with a `0` left operand.
pub fn condition_source(kind: FunctionKind, text: &str) -> String {
    match kind {
        FunctionKind::CountIfCondition => format!("0{}", text),
        _ => text.to_string(),
    }
}

/// The string literal at `index`, or an `InvalidArgument` error.
pub fn string_argument<'c>(call: &'c FunctionCall, index: usize) -> ExpressionResult<&'c str> {
    call.args
        .get(index)
        .and_then(|arg| arg.value.as_string_literal())
        .ok_or_else(|| ExpressionError::InvalidArgument {
            function: call.display_name(),
            message: format!("argument {} must be a string literal", index + 1),
        })
}

/// The `#{stage.element}` item at `index`, or an `InvalidArgument` error.
pub fn stage_element_argument<'c>(
    call: &'c FunctionCall,
    index: usize,
) -> ExpressionResult<(&'c ItemKind, &'c str, &'c str)> {
    match call.args.get(index).and_then(|arg| arg.value.as_item()) {
        Some(
            item @ ItemKind::StageDataElement {
                program_stage,
                data_element,
            },
        ) => Ok((item, program_stage.as_str(), data_element.as_str())),
        _ => Err(ExpressionError::InvalidArgument {
            function: call.display_name(),
            message: format!(
                "argument {} must be a program stage data element #{{stage.dataElement}}",
                index + 1
            ),
        }),
    }
}

/// Collects the items an expression references, in order of first
/// appearance. Sub-expressions held in string arguments are included.
#[derive(Debug, Default)]
pub struct ItemCollector {
    items: Vec<ItemKind>,
}

impl ItemCollector {
    pub fn collect(tree: &ExprNode) -> ExpressionResult<Vec<ItemKind>> {
        let mut collector = ItemCollector::default();
        collector.visit(tree)?;
        Ok(collector.items)
    }
}

impl ExpressionVisitor for ItemCollector {
    type Output = ();

    fn visit_number(&mut self, _value: f64) -> ExpressionResult<()> {
        Ok(())
    }

    fn visit_string(&mut self, _value: &str) -> ExpressionResult<()> {
        Ok(())
    }

    fn visit_boolean(&mut self, _value: bool) -> ExpressionResult<()> {
        Ok(())
    }

    fn visit_item(&mut self, item: &ItemKind) -> ExpressionResult<()> {
        if !self.items.contains(item) {
            self.items.push(item.clone());
        }
        Ok(())
    }

    fn visit_unary(&mut self, _op: UnaryOp, _operand: ()) -> ExpressionResult<()> {
        Ok(())
    }

    fn visit_binary(&mut self, _op: BinaryOp, _left: (), _right: ()) -> ExpressionResult<()> {
        Ok(())
    }

    fn visit_paren(&mut self, _inner: ()) -> ExpressionResult<()> {
        Ok(())
    }

    fn visit_function(&mut self, kind: FunctionKind, call: &FunctionCall) -> ExpressionResult<()> {
        for (index, arg) in call.args.iter().enumerate() {
            match (kind.condition_argument(), arg.value.as_string_literal()) {
                (Some(i), Some(text)) if i == index => {
                    walk_source(self, &condition_source(kind, text))?
                }
                _ => self.visit(arg)?,
            }
        }
        Ok(())
    }
}
