//! Document loading, schema modelling and reference resolution.
//!
//! A [`Document`] is parsed once at startup. [`build_endpoints`] walks it, resolves every
//! `$ref` through a [`Resolver`] and produces immutable [`EndpointDefinition`]s whose
//! schemas no longer contain references.

mod build;
mod load;
mod resolve;
mod schema;
mod types;

pub use build::build_endpoints;
pub use load::{load_document, load_spec, Document};
pub use resolve::{lookup_pointer, RefGuard, Resolver, MAX_REF_DEPTH};
pub use schema::{json_kind, ObjectSchema, SchemaNode, StringFormat, StringSchema};
pub use types::{
    derive_operation_id, normalize_path, DocumentForm, EndpointDefinition, ResponseBody,
    ResponseSpec, Responses,
};
