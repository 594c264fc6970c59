//! Human-readable descriptions of expressions.
//!
//! Every item reference in the expression text is replaced by its display
//! name: `#{stage.element}` becomes `Stage name.Element name`, attributes
//! and constants their display names, and variables their localized names.

mod i18n;

pub use i18n::{DefaultI18n, I18n, MapI18n};

use serde::Serialize;
use std::collections::BTreeMap;

use crate::dsl::{BinaryOp, Expr, ExprNode, FunctionCall, ItemKind, UnaryOp};
use crate::error::{ExpressionError, ExpressionResult};
use crate::metadata::MetadataResolver;
use crate::registry::{resolve_item, FunctionKind, ProgramVariable};
use crate::sql::ProgramIndicatorContext;
use crate::visitor::{condition_source, walk_source, ExpressionVisitor};

/// Raw item text mapped to the display text that replaces it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ItemDescriptions {
    entries: BTreeMap<String, String>,
}

impl ItemDescriptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, raw: impl Into<String>, description: impl Into<String>) {
        self.entries.insert(raw.into(), description.into());
    }

    pub fn get(&self, raw: &str) -> Option<&str> {
        self.entries.get(raw).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn into_map(self) -> BTreeMap<String, String> {
        self.entries
    }

    /// Replace every recorded item in `expression` with its description.
    ///
    /// Longer keys go first so that no key is replaced inside a longer one.
    pub fn substitute(&self, expression: &str) -> String {
        let mut keys: Vec<&String> = self.entries.keys().collect();
        keys.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        keys.into_iter().fold(expression.to_string(), |text, key| {
            text.replace(key.as_str(), &self.entries[key])
        })
    }
}

/// Resolves every item in a tree and records its description.
pub struct DescriptionBuilder<'a> {
    resolver: &'a dyn MetadataResolver,
    i18n: &'a dyn I18n,
    descriptions: ItemDescriptions,
}

impl<'a> DescriptionBuilder<'a> {
    pub fn new(resolver: &'a dyn MetadataResolver, i18n: &'a dyn I18n) -> Self {
        Self {
            resolver,
            i18n,
            descriptions: ItemDescriptions::new(),
        }
    }

    /// Walk `tree`, returning the descriptions of everything it references.
    pub fn build(mut self, tree: &ExprNode) -> ExpressionResult<ItemDescriptions> {
        self.visit(tree)?;
        Ok(self.descriptions)
    }
}

impl ExpressionVisitor for DescriptionBuilder<'_> {
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
        let resolved = resolve_item(item, self.resolver)?;
        self.descriptions
            .insert(item.to_string(), resolved.description(self.i18n));
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
        if kind == FunctionKind::RelationshipCount {
            if let Some(uid) = call.args.first().and_then(|a| a.value.as_string_literal()) {
                let name = self
                    .resolver
                    .resolve_relationship_type(uid)
                    .ok_or_else(|| ExpressionError::UnknownRelationshipType(uid.to_string()))?;
                // keyed by the quoted literal so the bare uid elsewhere is left alone
                for quote in ['\'', '"'] {
                    self.descriptions.insert(
                        format!("{quote}{uid}{quote}"),
                        format!("{quote}{name}{quote}"),
                    );
                }
            }
            return Ok(());
        }

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

/// Render `expression` with every item replaced by its display name.
///
/// An expression that is exactly `V{due_date}` or `V{report_date}` renders
/// as the reporting end date instead.
pub fn describe(
    expression: &str,
    tree: &ExprNode,
    context: &ProgramIndicatorContext,
    resolver: &dyn MetadataResolver,
    i18n: &dyn I18n,
) -> ExpressionResult<String> {
    if let Expr::Item(ItemKind::ProgramVariable(name)) = &tree.value {
        if matches!(
            ProgramVariable::from_name(name),
            Some(ProgramVariable::DueDate | ProgramVariable::ReportDate)
        ) {
            return Ok(context.reporting_end_date.format("%Y-%m-%d").to_string());
        }
    }

    let descriptions = DescriptionBuilder::new(resolver, i18n).build(tree)?;
    Ok(descriptions.substitute(expression))
}
