//! Request-time access control for the dashboards.
//!
//! A request for a gated path is resolved to a session, the user's profile
//! is loaded (re-reading briefly while onboarding propagates), and the path
//! is matched against the [`RouteTable`]. The outcome is always either
//! pass-through or a redirect; the gate never renders an error page.

pub mod decision;
pub mod middleware;
pub mod path;
pub mod retry;
pub mod routes;

pub use decision::{AccessEngine, Decision};
pub use middleware::access_gate;
pub use path::canonical_path;
pub use retry::{RetryPolicy, retry_until};
pub use routes::{DASHBOARD_ROOT, LANDING_PATH, RouteRule, RouteTable, WELCOME_PATH};
