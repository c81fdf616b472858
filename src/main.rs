mod backend;
mod config;
mod db;
mod format;
mod model;
mod routes;
mod services;
mod state;
mod storage;

use std::sync::Arc;

use services::documents::PgDocumentRepo;
use services::report::{HttpPdfRenderer, PdfRenderer};
use storage::http::HttpObjectStore;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = config::AppConfig::from_env().expect("invalid configuration");
    let port = config.port;

    let pool = db::init_pool(&config.database_url)
        .await
        .expect("database init failed");

    let storage = HttpObjectStore::new(&config.storage, config.timeouts).expect("storage client init failed");
    let documents = PgDocumentRepo::new(pool.clone());
    let renderer: Option<Arc<dyn PdfRenderer>> = match config.pdf_renderer_url.as_deref() {
        Some(url) => Some(Arc::new(
            HttpPdfRenderer::new(url, config.timeouts).expect("pdf renderer client init failed"),
        )),
        None => {
            tracing::warn!("PDF_RENDERER_URL not set; report downloads will return 503");
            None
        }
    };

    let state = state::AppState::new(pool, config, Arc::new(storage), Arc::new(documents), renderer);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "claimdesk listening");
    axum::serve(listener, app).await.expect("server failed");
}
