//! Quill Core
//!
//! Resource model, provider abstraction and the lifecycle helpers shared by
//! every Quill provider: schema validation, change detection, composite
//! identifiers and waiting on asynchronous remote operations.

pub mod differ;
pub mod identifier;
pub mod provider;
pub mod resource;
pub mod schema;
pub mod wait;
