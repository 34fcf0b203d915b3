//! Colegio Core: domain models, the error taxonomy, repository traits,
//! tenant context resolution and the scoped repository gate.
//!
//! Nothing in this crate performs I/O. Storage lives in `colegio-db`,
//! cafeteria policy in `colegio-comedor`.

pub mod error;
pub mod models;
pub mod repository;
pub mod scope;
pub mod tenant;

pub use error::{ColegioError, ColegioResult};
pub use scope::{ScopedRepository, ScopedStore, ScopedWriteStore};
pub use tenant::{Actor, ContextResolver, Resolution, TenantContext, resolve_context};
