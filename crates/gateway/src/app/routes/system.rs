use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Marketing shell; real pages are rendered elsewhere.
pub async fn home() -> impl IntoResponse {
    Html("<!doctype html><title>Balcão</title><h1>Balcão</h1><p>Gestão para o seu negócio.</p>")
}
