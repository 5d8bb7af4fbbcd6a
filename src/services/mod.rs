pub mod dashboard;
pub mod entitlement;

pub use dashboard::DashboardService;
pub use entitlement::EntitlementService;
