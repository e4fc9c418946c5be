//! Arrow schema definitions for the identity Delta tables
//!
//! Every actor persists its state as one serialized blob per named state
//! entry, so a single narrow table holds users, roles and all indices.

use deltalake::arrow::datatypes::{DataType, Field, Schema};
use deltalake::kernel::{DataType as DeltaDataType, PrimitiveType, StructField};

// ─── Table Names (constants) ───

pub const TABLE_ACTOR_STATE: &str = "actor_state";

// ─── Actor State Table ───

/// Arrow schema for the `actor_state` Delta table
pub fn actor_state_arrow_schema() -> Schema {
    Schema::new(vec![
        Field::new("actor_type", DataType::Utf8, false),
        Field::new("actor_id", DataType::Utf8, false),
        Field::new("state_name", DataType::Utf8, false),
        Field::new("state_json", DataType::Utf8, false),
        Field::new("updated_at", DataType::Utf8, false),
    ])
}

/// Delta StructFields for `actor_state` table creation
pub fn actor_state_delta_fields() -> Vec<StructField> {
    vec![
        StructField::new("actor_type", DeltaDataType::Primitive(PrimitiveType::String), false),
        StructField::new("actor_id", DeltaDataType::Primitive(PrimitiveType::String), false),
        StructField::new("state_name", DeltaDataType::Primitive(PrimitiveType::String), false),
        StructField::new("state_json", DeltaDataType::Primitive(PrimitiveType::String), false),
        StructField::new("updated_at", DeltaDataType::Primitive(PrimitiveType::String), false),
    ]
}

pub fn actor_state_partition_columns() -> Vec<String> {
    vec![] // Point lookups by (actor_type, actor_id, state_name); rows are tiny
}

/// Table definition bundle for `DeltaStore::ensure_table`
pub struct TableDefinition {
    pub name: &'static str,
    pub arrow_schema: Schema,
    pub delta_fields: Vec<StructField>,
    pub partition_columns: Vec<String>,
}

/// Get all table definitions for store initialization
pub fn all_tables() -> Vec<TableDefinition> {
    vec![TableDefinition {
        name: TABLE_ACTOR_STATE,
        arrow_schema: actor_state_arrow_schema(),
        delta_fields: actor_state_delta_fields(),
        partition_columns: actor_state_partition_columns(),
    }]
}
