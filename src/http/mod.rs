//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (hyper http1, one ConnectionDispatcher per connection)
//!     → request.rs (request ID, Expect: 100-continue detection)
//!     → [dispatch layer picks and attaches the routed handler]
//!     → keep_alive.rs (Connection header on the response)
//!     → Send to client
//! ```

pub mod keep_alive;
pub mod request;
pub mod server;

pub use keep_alive::{Disposition, KeepAlive};
pub use request::{expects_continue, RequestId, RequestIdExt, X_REQUEST_ID};
pub use server::{HandlerSlot, HttpServer, ServerError};
