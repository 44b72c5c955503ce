// Application layer - Use cases over the reading repository
pub mod analysis_service;
pub mod reading_repository;
pub mod service_error;
pub mod station_service;
pub mod telemetry_service;
