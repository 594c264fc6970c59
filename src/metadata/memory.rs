//! In-memory metadata store, loadable from a JSON snapshot.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::config::{MetadataSettings, SettingsError};

use super::resolver::MetadataResolver;
use super::types::{ResolvedConstant, ResolvedMetadataItem, ValueType};

/// Error type for loading metadata snapshots.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("Failed to read metadata snapshot: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse metadata snapshot: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid metadata settings: {0}")]
    Settings(#[from] SettingsError),
}

/// A named object with a UID, as found in a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedObject {
    pub uid: String,
    pub name: String,
}

/// Serialized form of an [`InMemoryMetadata`].
///
/// ```json
/// {
///   "programStages": [{ "uid": "ProgrmStagA", "name": "StageA" }],
///   "dataElements": [{ "uid": "DataElmentA", "displayName": "DataElementA", "valueType": "INTEGER" }],
///   "attributes": [],
///   "constants": [{ "uid": "Gfd3ppDfq8E", "displayName": "ConstantA", "value": 7.0 }],
///   "relationshipTypes": []
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetadataSnapshot {
    pub program_stages: Vec<NamedObject>,
    pub data_elements: Vec<ResolvedMetadataItem>,
    pub attributes: Vec<ResolvedMetadataItem>,
    pub constants: Vec<ResolvedConstant>,
    pub relationship_types: Vec<NamedObject>,
}

/// A [`MetadataResolver`] backed by hash maps.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMetadata {
    program_stages: HashMap<String, String>,
    data_elements: HashMap<String, ResolvedMetadataItem>,
    attributes: HashMap<String, ResolvedMetadataItem>,
    constants: HashMap<String, ResolvedConstant>,
    relationship_types: HashMap<String, String>,
}

impl InMemoryMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_program_stage(mut self, uid: &str, name: &str) -> Self {
        self.program_stages.insert(uid.to_string(), name.to_string());
        self
    }

    pub fn with_data_element(mut self, uid: &str, name: &str, value_type: ValueType) -> Self {
        self.data_elements
            .insert(uid.to_string(), ResolvedMetadataItem::new(uid, name, value_type));
        self
    }

    pub fn with_attribute(mut self, uid: &str, name: &str, value_type: ValueType) -> Self {
        self.attributes
            .insert(uid.to_string(), ResolvedMetadataItem::new(uid, name, value_type));
        self
    }

    pub fn with_constant(mut self, uid: &str, name: &str, value: f64) -> Self {
        self.constants.insert(
            uid.to_string(),
            ResolvedConstant {
                uid: uid.to_string(),
                display_name: name.to_string(),
                value,
            },
        );
        self
    }

    pub fn with_relationship_type(mut self, uid: &str, name: &str) -> Self {
        self.relationship_types.insert(uid.to_string(), name.to_string());
        self
    }

    /// Build from a deserialized snapshot.
    pub fn from_snapshot(snapshot: MetadataSnapshot) -> Self {
        Self {
            program_stages: snapshot
                .program_stages
                .into_iter()
                .map(|o| (o.uid, o.name))
                .collect(),
            data_elements: snapshot
                .data_elements
                .into_iter()
                .map(|d| (d.uid.clone(), d))
                .collect(),
            attributes: snapshot
                .attributes
                .into_iter()
                .map(|a| (a.uid.clone(), a))
                .collect(),
            constants: snapshot
                .constants
                .into_iter()
                .map(|c| (c.uid.clone(), c))
                .collect(),
            relationship_types: snapshot
                .relationship_types
                .into_iter()
                .map(|o| (o.uid, o.name))
                .collect(),
        }
    }

    /// Parse a JSON snapshot.
    pub fn from_json(json: &str) -> Result<Self, MetadataError> {
        let snapshot: MetadataSnapshot = serde_json::from_str(json)?;
        Ok(Self::from_snapshot(snapshot))
    }

    /// Load a JSON snapshot from disk.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, MetadataError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load the snapshot named in the settings, if there is one.
    pub fn from_settings(settings: &MetadataSettings) -> Result<Option<Self>, MetadataError> {
        settings
            .resolved_snapshot()?
            .map(Self::from_file)
            .transpose()
    }
}

impl MetadataResolver for InMemoryMetadata {
    fn resolve_data_element(
        &self,
        _program_stage_uid: &str,
        data_element_uid: &str,
    ) -> Option<ResolvedMetadataItem> {
        self.data_elements.get(data_element_uid).cloned()
    }

    fn resolve_attribute(&self, uid: &str) -> Option<ResolvedMetadataItem> {
        self.attributes.get(uid).cloned()
    }

    fn resolve_constant(&self, uid: &str) -> Option<ResolvedConstant> {
        self.constants.get(uid).cloned()
    }

    fn resolve_program_stage(&self, uid: &str) -> Option<String> {
        self.program_stages.get(uid).cloned()
    }

    fn resolve_relationship_type(&self, uid: &str) -> Option<String> {
        self.relationship_types.get(uid).cloned()
    }
}
