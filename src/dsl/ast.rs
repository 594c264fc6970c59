//! AST node types for program indicator expressions.
//!
//! A parsed expression is a tree of [`Expr`] nodes, each wrapped in a
//! [`Spanned`] so passes can point back into the source text.

use std::fmt;

use crate::dsl::span::Spanned;

/// A spanned expression node.
pub type ExprNode = Spanned<Expr>;

// ============================================================================
// Expressions
// ============================================================================

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal: `12`, `1.5`
    Number(f64),
    /// String literal, already unescaped: `'abc'`, `"abc"`
    String(String),
    /// Boolean literal: `true`, `false`
    Boolean(bool),
    /// A metadata or variable reference: `#{..}`, `A{..}`, `C{..}`, `V{..}`
    Item(ItemKind),
    /// A function call: `d2:hasValue(..)`, `sum(..)`
    Function(FunctionCall),
    /// A prefix operator application.
    Unary {
        op: UnaryOp,
        operand: Box<ExprNode>,
    },
    /// An infix operator application.
    Binary {
        op: BinaryOp,
        left: Box<ExprNode>,
        right: Box<ExprNode>,
    },
    /// A parenthesized expression, kept so generated SQL mirrors the source grouping.
    Paren(Box<ExprNode>),
}

impl Expr {
    /// The text of a string literal, if this node is one.
    pub fn as_string_literal(&self) -> Option<&str> {
        match self {
            Expr::String(s) => Some(s),
            _ => None,
        }
    }

    /// The item reference, if this node is one.
    pub fn as_item(&self) -> Option<&ItemKind> {
        match self {
            Expr::Item(item) => Some(item),
            _ => None,
        }
    }
}

// ============================================================================
// Items
// ============================================================================

/// The kinds of item an expression can reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemKind {
    /// `#{programStageUid.dataElementUid}`
    StageDataElement {
        program_stage: String,
        data_element: String,
    },
    /// `A{attributeUid}`
    Attribute(String),
    /// `C{constantUid}`
    Constant(String),
    /// `V{variable_name}`
    ProgramVariable(String),
    /// `PS_EVENTDATE:programStageUid`
    StageEventDate(String),
}

/// Items print exactly as they are written in an expression, which is also
/// the key used when substituting descriptions into the source text.
impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::StageDataElement {
                program_stage,
                data_element,
            } => write!(f, "#{{{}.{}}}", program_stage, data_element),
            ItemKind::Attribute(uid) => write!(f, "A{{{}}}", uid),
            ItemKind::Constant(uid) => write!(f, "C{{{}}}", uid),
            ItemKind::ProgramVariable(name) => write!(f, "V{{{}}}", name),
            ItemKind::StageEventDate(uid) => write!(f, "PS_EVENTDATE:{}", uid),
        }
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Which function family a call was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionNamespace {
    /// `d2:` prefixed program functions.
    D2,
    /// Unprefixed aggregate and logical functions.
    Plain,
}

/// A function call with its unevaluated arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub namespace: FunctionNamespace,
    pub name: Spanned<String>,
    pub args: Vec<ExprNode>,
}

impl FunctionCall {
    /// The name as written, including the `d2:` prefix when present.
    pub fn display_name(&self) -> String {
        match self.namespace {
            FunctionNamespace::D2 => format!("d2:{}", self.name.value),
            FunctionNamespace::Plain => self.name.value.clone(),
        }
    }
}

// ============================================================================
// Operators
// ============================================================================

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Neg,
    Not,
}

impl UnaryOp {
    pub fn sql(self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Neg => "-",
            UnaryOp::Not => "not ",
        }
    }
}

/// Infix operators, in decreasing precedence groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Pow,
    Mul,
    Div,
    Mod,
    Add,
    Sub,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl BinaryOp {
    /// The operator as written in an expression.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Pow => "^",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    /// The PostgreSQL spelling of the operator.
    pub fn sql(self) -> &'static str {
        match self {
            BinaryOp::Eq => "=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            other => other.symbol(),
        }
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Pow | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod | BinaryOp::Add | BinaryOp::Sub
        )
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge | BinaryOp::Eq | BinaryOp::Ne
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}
