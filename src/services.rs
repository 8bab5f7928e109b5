pub mod climate_service;
pub mod refresh_service;

pub use climate_service::ClimateService;
pub use refresh_service::RefreshService;
