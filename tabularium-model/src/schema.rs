//! Normalized schema shapes produced by connectors.

use serde::{Deserialize, Serialize};

/// One column of a source table, normalized across vendors.
///
/// Every connector reduces its dialect's catalog output to this shape;
/// `data_type` carries vendor syntax normalized to `BASETYPE(length)` or
/// `BASETYPE(precision,scale)`. Serialized field names follow the
/// enrichment collaborator's wire contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescriptor {
    pub field_name: String,
    pub data_type: String,
    pub is_nullable: bool,
    pub is_primary_key: bool,
    pub is_foreign_key: bool,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default)]
    pub referenced_table: Option<String>,
    #[serde(default)]
    pub referenced_column: Option<String>,
    /// Human description, filled in by the enrichment collaborator.
    #[serde(default)]
    pub description: Option<String>,
}

impl ColumnDescriptor {
    pub fn new(field_name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            data_type: data_type.into(),
            is_nullable: true,
            is_primary_key: false,
            is_foreign_key: false,
            default_value: None,
            referenced_table: None,
            referenced_column: None,
            description: None,
        }
    }
}
