pub mod check;
pub mod codec;
pub mod data;
pub mod error;
pub mod schema;
pub mod validators;

pub use codec::{
    bool_of, expand_list, expand_single, expand_string_list, expand_tags, flatten_list, flatten_single,
    flatten_string_list, flatten_tags, i64_of, list_of, require_string, str_of, string_list_of, string_of, Block,
};
pub use data::ResourceData;
pub use error::{Diagnostic, SchemaError};
pub use schema::{Field, FieldType, Presence, Schema, ValidateFn};
