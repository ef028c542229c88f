//! Coach — the conversational front: routing, rendering, reports and the
//! status API.

pub mod render;
pub mod reports;
pub mod router;
pub mod routes;

pub use reports::{ReportEntry, ReportLog, ReportOutcome};
pub use router::{Coach, CoachRouter, Command, run};
pub use routes::{StatusState, status_routes};
