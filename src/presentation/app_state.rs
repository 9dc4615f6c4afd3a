// Application state for HTTP handlers
use crate::application::acquisition_service::AcquisitionService;
use crate::application::relay_service::RelayService;
use crate::infrastructure::archive::LogArchiver;

#[derive(Clone)]
pub struct AppState {
    pub acquisition: AcquisitionService,
    pub relays: RelayService,
    pub archiver: LogArchiver,
}
