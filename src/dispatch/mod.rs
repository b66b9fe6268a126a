//! Connection dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Transport delivers a parsed request on connection C
//!     → dispatcher.rs (C's ConnectionDispatcher)
//!         → Expect: 100-continue? → pipeline.send_continue(), stop
//!         → Router::resolve (or fallback.rs on NoMatch)
//!         → ParameterStore::merge into request extensions
//!         → swap the handler in C's pipeline slot if the target changed
//!     → pipeline.rs: forward(request) to the attached handler
//! ```
//!
//! # Design Decisions
//! - One dispatcher per connection, owned by that connection's task
//! - The router is shared read-only across all dispatchers
//! - Keep-alive fast path: consecutive requests for the same target leave
//!   the pipeline untouched

pub mod dispatcher;
pub mod fallback;
pub mod pipeline;

pub use dispatcher::{AttachState, ConnectionDispatcher, DispatchError, DispatchOutcome};
pub use fallback::NotFoundHandler;
pub use pipeline::{Pipeline, ROUTED_HANDLER_NAME};
