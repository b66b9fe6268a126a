//! Request parameter subsystem.
//!
//! # Data Flow
//! ```text
//! ResolvedRoute.params (path captures)   raw query string
//!              │                                │
//!              │                      query.rs (decode pairs)
//!              ▼                                ▼
//!        store.rs: ParameterStore { path-origin | query-origin }
//!              → request extensions
//!              → ext.rs: req.param("id"), req.param_all("tag")
//! ```
//!
//! # Design Decisions
//! - A typed store in request extensions, never smuggled through headers
//! - Path values win over query values of the same name
//! - Malformed query pairs are skipped, never fatal

pub mod ext;
pub mod query;
pub mod store;

pub use ext::RequestParamsExt;
pub use query::decode_query;
pub use store::ParameterStore;
