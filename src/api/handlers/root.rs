use axum::response::IntoResponse;

/// Undocumented identity endpoint at `/`.
pub async fn root() -> impl IntoResponse {
    concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"))
}
