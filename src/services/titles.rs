use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db::TitleStore,
    error::{AppError, AppResult},
    models::{Title, TitleType},
};

/// Catalog maintenance
pub struct TitleService {
    titles: Arc<dyn TitleStore>,
}

impl TitleService {
    pub fn new(titles: Arc<dyn TitleStore>) -> Self {
        Self { titles }
    }

    /// Adds a title to the catalog. External ids are unique across the catalog.
    pub async fn create_title(
        &self,
        external_id: &str,
        name: &str,
        title_type: TitleType,
    ) -> AppResult<Title> {
        let external_id = external_id.trim();
        let name = name.trim();
        if external_id.is_empty() || name.is_empty() {
            return Err(AppError::InvalidInput(
                "external id and name must not be empty".to_string(),
            ));
        }

        let title = Title::new(external_id, name, title_type);
        self.titles.save_title(&title).await?;

        tracing::info!(title_id = %title.id, external_id, "Title created");
        Ok(title)
    }

    pub async fn get_title(&self, title_id: Uuid) -> AppResult<Title> {
        self.titles
            .find_title(title_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("title {}", title_id)))
    }
}
