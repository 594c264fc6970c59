//! Type rules for each function in the registry.

use crate::dsl::{FunctionCall, ItemKind};
use crate::error::{ExpressionError, ExpressionResult};
use crate::registry::{AggregateFunction, FunctionKind, SampleValue};
use crate::visitor::{stage_element_argument, string_argument, walk_source, ExpressionVisitor};

use super::{boolean, date_like, numeric, same_type, Validator};

impl Validator<'_> {
    pub(super) fn function_value(
        &mut self,
        kind: FunctionKind,
        call: &FunctionCall,
    ) -> ExpressionResult<SampleValue> {
        let name = call.display_name();
        let args = &call.args;

        match kind {
            FunctionKind::Condition => {
                let condition = walk_source(self, string_argument(call, 0)?)?;
                boolean(&condition, &name)?;
                self.branches(&name, call)
            }
            FunctionKind::Count => {
                stage_element_argument(call, 0)?;
                self.visit(&args[0])?;
                Ok(SampleValue::Number(1.0))
            }
            FunctionKind::CountIfValue => {
                stage_element_argument(call, 0)?;
                self.visit(&args[0])?;
                self.visit(&args[1])?;
                Ok(SampleValue::Number(1.0))
            }
            FunctionKind::CountIfCondition => {
                let (item, _, _) = stage_element_argument(call, 0)?;
                self.visit(&args[0])?;
                // The condition is a right-hand side; complete it with the item.
                let source = format!("{}{}", item, string_argument(call, 1)?);
                let condition = walk_source(self, &source)?;
                boolean(&condition, &name)?;
                Ok(SampleValue::Number(1.0))
            }
            FunctionKind::Between(_) => {
                for arg in args {
                    let value = self.visit(arg)?;
                    date_like(&value, &name)?;
                }
                Ok(SampleValue::Number(1.0))
            }
            FunctionKind::HasValue | FunctionKind::IsNull | FunctionKind::IsNotNull => {
                self.visit(&args[0])?;
                Ok(SampleValue::Boolean(true))
            }
            FunctionKind::MaxValue | FunctionKind::MinValue => {
                match args[0].value.as_item() {
                    Some(ItemKind::StageDataElement { .. } | ItemKind::StageEventDate(_)) => {
                        self.visit(&args[0])
                    }
                    _ => Err(ExpressionError::InvalidArgument {
                        function: name,
                        message: "argument must be a program stage data element or PS_EVENTDATE"
                            .to_string(),
                    }),
                }
            }
            FunctionKind::Oizp | FunctionKind::Zing => {
                let value = self.visit(&args[0])?;
                numeric(&value, &name)?;
                Ok(SampleValue::Number(1.0))
            }
            FunctionKind::Zpvc => {
                for arg in args {
                    let value = self.visit(arg)?;
                    numeric(&value, &name)?;
                }
                Ok(SampleValue::Number(1.0))
            }
            FunctionKind::RelationshipCount => {
                if !args.is_empty() {
                    let uid = string_argument(call, 0)?;
                    let type_name = self
                        .resolver
                        .resolve_relationship_type(uid)
                        .ok_or_else(|| ExpressionError::UnknownRelationshipType(uid.to_string()))?;
                    self.descriptions.insert(uid, type_name);
                }
                Ok(SampleValue::Number(1.0))
            }
            FunctionKind::Aggregate(aggregate) => {
                let value = self.visit(&args[0])?;
                if aggregate != AggregateFunction::Count {
                    numeric(&value, &name)?;
                }
                Ok(SampleValue::Number(1.0))
            }
            FunctionKind::If => {
                let test = self.visit(&args[0])?;
                boolean(&test, &name)?;
                self.branches(&name, call)
            }
            FunctionKind::Coalesce | FunctionKind::Greatest | FunctionKind::Least => {
                let first = self.visit(&args[0])?;
                for arg in &args[1..] {
                    let value = self.visit(arg)?;
                    same_type(&first, &value, &name)?;
                }
                Ok(first)
            }
        }
    }

    /// The second and third arguments, which must agree in type.
    fn branches(&mut self, name: &str, call: &FunctionCall) -> ExpressionResult<SampleValue> {
        let when_true = self.visit(&call.args[1])?;
        let when_false = self.visit(&call.args[2])?;
        same_type(&when_true, &when_false, name)?;
        Ok(when_true)
    }
}
