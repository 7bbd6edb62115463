//! Schema model: identifiers, field/type definitions, the dynamic schema,
//! and the stored entity row. Analogous in role to
//! `ormdb-core::catalog`, but describing a runtime-mutable schema instead
//! of a compile-time one.

pub mod entity;
pub mod entity_type;
pub mod field;
pub mod identifiers;
pub mod schema;

pub use entity::{Entity, Fieldset};
pub use entity_type::{FieldAttrs, TypeDef, TypeFieldEntry};
pub use field::{is_forbidden_input_field, is_identity_field, Condition, DataType, FieldDef, OptionDef};
pub use identifiers::{EntityId, EntityRef, Namespace, Uid};
pub use schema::NodeSchema;
