//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Setup (single-threaded):
//!     RouterBuilder::route(method, "/users/:id", target)
//!     → pattern.rs (compile template into segments)
//!     → table.rs (append to the method's route list)
//!     → RouterBuilder::build() freezes into an immutable Router
//!
//! Per request (any connection, concurrently):
//!     Router::resolve(method, path)
//!     → table.rs (routes for the method, O(1) when none)
//!     → matcher.rs (align segments, collect captures)
//!     → Return: ResolvedRoute { route, params } or NoMatch
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (segment comparison only)
//! - Deterministic: same input always matches same route
//! - First match wins (ordered by registration)

pub mod matcher;
pub mod pattern;
pub mod reverse;
pub mod router;
pub mod table;
pub mod target;

pub use matcher::PathParams;
pub use pattern::{Pattern, PatternError, Segment};
pub use reverse::ReverseError;
pub use router::{Resolution, ResolvedRoute, RouteError, Router, RouterBuilder};
pub use table::{Route, RoutingTable};
pub use target::{handler_fn, FactoryError, HandlerFactory, RouteTarget, RoutedHandler, TargetId};
