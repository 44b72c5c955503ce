// Application state for HTTP handlers
use crate::application::analysis_service::AnalysisService;
use crate::application::station_service::StationService;
use crate::application::telemetry_service::TelemetryService;

#[derive(Clone)]
pub struct AppState {
    pub station_service: StationService,
    pub telemetry_service: TelemetryService,
    pub analysis_service: AnalysisService,
}
