// Station service - Use case for the node and base-station pickers
use crate::application::reading_repository::ReadingRepository;
use std::sync::Arc;

#[derive(Clone)]
pub struct StationService {
    repository: Arc<dyn ReadingRepository>,
}

impl StationService {
    pub fn new(repository: Arc<dyn ReadingRepository>) -> Self {
        Self { repository }
    }

    pub async fn list_nodes(&self) -> anyhow::Result<Vec<String>> {
        self.repository.list_nodes().await
    }

    pub async fn list_base_stations(&self, node: &str) -> anyhow::Result<Vec<String>> {
        self.repository.list_base_stations(node).await
    }
}
