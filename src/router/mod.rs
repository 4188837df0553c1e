//! # Router Module
//!
//! Matches request paths against the endpoint templates declared in the document.
//!
//! Templates are split into literal and `{param}` segments and inserted into a radix tree.
//! A request matches a template when it has the same number of segments and every literal
//! segment is equal; parameter segments bind the request segment under their name.
//!
//! ## Collisions
//!
//! Two templates for the same method *collide* when they have the same segment count and,
//! at every position, the segments are equal literals or at least one is a parameter. A
//! collision is accepted only when one template is strictly more specific, meaning it has
//! the literal at every position where the two differ:
//!
//! - `/books/featured` and `/books/{id}`: accepted, `/books/featured` wins
//! - `/users/{id}` and `/users/{user_id}`: [`crate::error::MockError::DuplicateRoute`]
//! - `/a/{x}` and `/{y}/b`: [`crate::error::MockError::AmbiguousRoute`], since `/a/b`
//!   matches both and each has a literal the other lacks

mod core;
mod radix;
mod template;

pub use core::{ParamVec, RouteMatch, Router, MAX_INLINE_PARAMS};
pub use template::{PathTemplate, Segment};
