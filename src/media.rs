//! Serves objects from public buckets under `/media/<bucket>/<key>`.

use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};

use crate::object_store::{ObjectStoreError, content_type_for};
use crate::state::AppState;

/// `GET /media/:bucket/*key`
pub async fn serve_object(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
) -> Response {
    if !state.config.is_public_bucket(&bucket) {
        return StatusCode::NOT_FOUND.into_response();
    }
    match state.objects.get(&bucket, &key).await {
        Ok(data) => ([(header::CONTENT_TYPE, content_type_for(&key))], data).into_response(),
        Err(
            ObjectStoreError::NotFound(_)
            | ObjectStoreError::InvalidKey(_)
            | ObjectStoreError::NoSuchBucket(_),
        ) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            tracing::error!(bucket = %bucket, key = %key, error = %e, "failed to read object");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GardenConfig;

    #[tokio::test]
    async fn private_buckets_are_hidden() {
        let state = AppState::in_memory(GardenConfig::default());
        state.objects.ensure_bucket("scans").await.unwrap();
        state.ensure_buckets().await.unwrap();
        state.objects.put("scans", "a.png", vec![1]).await.unwrap();
        state.objects.put("images", "a.png", vec![1, 2]).await.unwrap();

        let hidden = serve_object(
            State(state.clone()),
            Path(("scans".to_string(), "a.png".to_string())),
        )
        .await;
        assert_eq!(hidden.status(), StatusCode::NOT_FOUND);

        let shown = serve_object(
            State(state.clone()),
            Path(("images".to_string(), "a.png".to_string())),
        )
        .await;
        assert_eq!(shown.status(), StatusCode::OK);
        assert_eq!(shown.headers()[header::CONTENT_TYPE], "image/png");

        let missing = serve_object(State(state), Path(("images".to_string(), "b.png".to_string()))).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }
}
