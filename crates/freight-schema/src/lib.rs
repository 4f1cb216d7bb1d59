//! Static description of the load-submission API's target schema.
//!
//! The registry is a fixed table: every target field the remote API accepts,
//! its type, whether it is required, the spreadsheet-header aliases it is
//! known by, and (for enum fields) the accepted values with their common
//! variations. Lookups are pure; there are no runtime failure modes beyond
//! handing in a path that is not in the table, which is a caller bug.

pub mod normalize;
mod registry;

pub use normalize::{normalize_header, tokenize};
pub use registry::{
    FieldSpec, FieldType, REFERENCE_PATH, canonicalize_enum, field, field_type, fields,
    required_fields, resolve_aliases,
};
