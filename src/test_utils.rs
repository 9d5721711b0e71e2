//! Helpers shared by tests across the crate.

use axum::response::Response;

/// Read a response body out to a string.
pub async fn response_body_text(response: Response) -> String {
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("could not read response body");

    String::from_utf8_lossy(&body_bytes).to_string()
}
