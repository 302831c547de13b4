pub mod fundraising;
pub mod health;

pub use fundraising::api_routes;
pub use health::{AppStartTime, HealthService, health_routes};
