//! Resolution of item references against metadata.
//!
//! Every pass resolves items the same way, so an expression that validates
//! also describes and compiles (as long as metadata does not change between
//! calls).

use crate::describe::I18n;
use crate::dsl::ItemKind;
use crate::error::{ExpressionError, ExpressionResult};
use crate::metadata::{MetadataResolver, ResolvedConstant, ResolvedMetadataItem};

use super::value::DataType;
use super::variables::ProgramVariable;

/// An item reference with its metadata looked up.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedItem {
    DataElement {
        stage_uid: String,
        stage_name: String,
        item: ResolvedMetadataItem,
    },
    Attribute(ResolvedMetadataItem),
    Constant(ResolvedConstant),
    Variable(ProgramVariable),
    StageEventDate {
        stage_uid: String,
        stage_name: String,
    },
}

/// Look up the metadata an item refers to.
///
/// For `#{stage.element}` the stage is resolved first, so a bad stage
/// reports `UnknownProgramStage` even when the element is also unknown.
pub fn resolve_item(
    item: &ItemKind,
    resolver: &dyn MetadataResolver,
) -> ExpressionResult<ResolvedItem> {
    match item {
        ItemKind::StageDataElement {
            program_stage,
            data_element,
        } => {
            let stage_name = resolver
                .resolve_program_stage(program_stage)
                .ok_or_else(|| ExpressionError::UnknownProgramStage(program_stage.clone()))?;
            let element = resolver
                .resolve_data_element(program_stage, data_element)
                .ok_or_else(|| ExpressionError::UnknownDataElement {
                    program_stage: program_stage.clone(),
                    data_element: data_element.clone(),
                })?;
            Ok(ResolvedItem::DataElement {
                stage_uid: program_stage.clone(),
                stage_name,
                item: element,
            })
        }
        ItemKind::Attribute(uid) => resolver
            .resolve_attribute(uid)
            .map(ResolvedItem::Attribute)
            .ok_or_else(|| ExpressionError::UnknownAttribute(uid.clone())),
        ItemKind::Constant(uid) => resolver
            .resolve_constant(uid)
            .map(ResolvedItem::Constant)
            .ok_or_else(|| ExpressionError::UnknownConstant(uid.clone())),
        ItemKind::ProgramVariable(name) => ProgramVariable::from_name(name)
            .map(ResolvedItem::Variable)
            .ok_or_else(|| ExpressionError::UnknownVariable(name.clone())),
        ItemKind::StageEventDate(stage_uid) => {
            let stage_name = resolver
                .resolve_program_stage(stage_uid)
                .ok_or_else(|| ExpressionError::UnknownProgramStage(stage_uid.clone()))?;
            Ok(ResolvedItem::StageEventDate {
                stage_uid: stage_uid.clone(),
                stage_name,
            })
        }
    }
}

impl ResolvedItem {
    pub fn data_type(&self) -> DataType {
        match self {
            ResolvedItem::DataElement { item, .. } | ResolvedItem::Attribute(item) => {
                item.value_type.data_type()
            }
            ResolvedItem::Constant(_) => DataType::Number,
            ResolvedItem::Variable(variable) => variable.data_type(),
            ResolvedItem::StageEventDate { .. } => DataType::Date,
        }
    }

    /// Human-readable name substituted for the item in descriptions.
    pub fn description(&self, i18n: &dyn I18n) -> String {
        match self {
            ResolvedItem::DataElement {
                stage_name, item, ..
            } => format!("{}.{}", stage_name, item.display_name),
            ResolvedItem::Attribute(item) => item.display_name.clone(),
            ResolvedItem::Constant(constant) => constant.display_name.clone(),
            ResolvedItem::Variable(variable) => i18n
                .get_string(variable.name())
                .unwrap_or_else(|| variable.name().to_string()),
            ResolvedItem::StageEventDate { stage_name, .. } => {
                let event_date = i18n
                    .get_string(ProgramVariable::EventDate.name())
                    .unwrap_or_else(|| "Event date".to_string());
                format!("{}.{}", stage_name, event_date)
            }
        }
    }
}
