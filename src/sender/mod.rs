pub mod client;
pub mod params;
pub mod response;

pub use client::{ClientStats, ConnectionStats, REGISTRATION_PATH, REPORT_PATH, ReportingClient};
pub use params::{RegistrationMetadata, RegistrationParams, ReportParams};
pub use response::ApiResponse;
