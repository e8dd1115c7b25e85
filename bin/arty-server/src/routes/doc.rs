use utoipa::OpenApi;

use crate::routes::{generate, health, history, models};

#[derive(OpenApi)]
#[openapi(info(
    title = "arty-server",
    description = "Streaming chat generation with artifact extraction",
    version = "0.1.0",
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(health::HealthApi::openapi());
    root.merge(generate::GenerateApi::openapi());
    root.merge(models::ModelsApi::openapi());
    root.merge(history::HistoryApi::openapi());
    root
}
