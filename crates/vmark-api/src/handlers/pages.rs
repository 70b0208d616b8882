//! Static page handlers.

use axum::response::Html;

/// The upload form, compiled into the binary.
pub async fn index() -> Html<&'static str> {
    Html(include_str!("../../assets/index.html"))
}
