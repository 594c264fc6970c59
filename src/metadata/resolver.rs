//! The `MetadataResolver` trait.
//!
//! Every pass over an expression looks metadata up through this trait. A
//! lookup that fails for any reason, including I/O, returns `None`; the
//! passes turn that into the matching `Unknown*` error.

use super::types::{ResolvedConstant, ResolvedMetadataItem};

/// Lookups of program metadata by UID.
///
/// Implementations may block (a database round-trip, say). The engine calls
/// the resolver once per item occurrence in a tree walk and does not cache
/// results itself.
pub trait MetadataResolver: Send + Sync {
    /// Look up a data element referenced from a program stage.
    fn resolve_data_element(
        &self,
        program_stage_uid: &str,
        data_element_uid: &str,
    ) -> Option<ResolvedMetadataItem>;

    /// Look up a tracked entity attribute.
    fn resolve_attribute(&self, uid: &str) -> Option<ResolvedMetadataItem>;

    /// Look up a constant.
    fn resolve_constant(&self, uid: &str) -> Option<ResolvedConstant>;

    /// Display name of a program stage.
    fn resolve_program_stage(&self, uid: &str) -> Option<String>;

    /// Display name of a relationship type.
    fn resolve_relationship_type(&self, uid: &str) -> Option<String>;
}

impl<T: MetadataResolver + ?Sized> MetadataResolver for std::sync::Arc<T> {
    fn resolve_data_element(
        &self,
        program_stage_uid: &str,
        data_element_uid: &str,
    ) -> Option<ResolvedMetadataItem> {
        (**self).resolve_data_element(program_stage_uid, data_element_uid)
    }

    fn resolve_attribute(&self, uid: &str) -> Option<ResolvedMetadataItem> {
        (**self).resolve_attribute(uid)
    }

    fn resolve_constant(&self, uid: &str) -> Option<ResolvedConstant> {
        (**self).resolve_constant(uid)
    }

    fn resolve_program_stage(&self, uid: &str) -> Option<String> {
        (**self).resolve_program_stage(uid)
    }

    fn resolve_relationship_type(&self, uid: &str) -> Option<String> {
        (**self).resolve_relationship_type(uid)
    }
}
