use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use storekit_core::{Error, ProviderConfig};
use storekit_deployer::HttpProvider;
use storekit_publisher::{FsStoreRepository, Publisher, StoreRepository};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
struct AppState {
    repo: Arc<FsStoreRepository>,
    /// Absent when provider credentials are not configured; publish then
    /// answers 503 while the read-only endpoints keep working.
    publisher: Option<Publisher>,
}

/// Serve the publish HTTP API over a directory of stores.
pub async fn run(stores: PathBuf, port: u16) -> Result<()> {
    if !stores.is_dir() {
        anyhow::bail!("stores directory does not exist: {}", stores.display());
    }

    let publisher = match ProviderConfig::load() {
        Ok(config) => {
            let provider = HttpProvider::new(&config)?;
            Some(Publisher::new(Arc::new(provider), config))
        }
        Err(e) => {
            tracing::warn!(error = %e, "provider not configured; publishing disabled");
            None
        }
    };

    let state = AppState {
        repo: Arc::new(FsStoreRepository::new(&stores)),
        publisher,
    };

    let app = Router::new()
        .route("/store/{id}/publish", post(publish_handler))
        .route("/store/{id}/publish/status", get(status_handler))
        .route("/store/{id}/layout", put(layout_handler))
        .route("/store/{id}/unpublish", delete(unpublish_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", port);
    println!("🌐 Publish API listening on http://{}", addr);
    println!("   Stores: {}", stores.display());

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

/// Fixed mapping from error kinds to status codes. Messages come from the
/// error's own display; raw provider payloads never pass through here.
fn error_response(err: &Error) -> Response {
    let status = match err {
        Error::Layout(_) => StatusCode::BAD_REQUEST,
        Error::Build(_) => StatusCode::BAD_REQUEST,
        Error::Scaffold(_) | Error::IoError(_) | Error::Alias(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        Error::Deployment(_) => StatusCode::BAD_GATEWAY,
        Error::Timeout(_) | Error::Cancelled(_) => StatusCode::GATEWAY_TIMEOUT,
        Error::Busy(_) => StatusCode::CONFLICT,
        Error::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
    };
    let body = serde_json::json!({ "error": err.to_string() });
    (status, Json(body)).into_response()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PublishResponse {
    url: String,
    deployment_id: String,
    published_at: String,
}

async fn publish_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    let Some(publisher) = &state.publisher else {
        return error_response(&Error::Config("hosting provider is not configured".into()));
    };
    let store = match state.repo.get(&id) {
        Ok(store) => store,
        Err(e) => return error_response(&e),
    };
    match publisher.publish(&store).await {
        Ok(receipt) => {
            if let Err(e) = state.repo.record_publish(&id, &receipt) {
                return error_response(&e);
            }
            Json(PublishResponse {
                url: receipt.url,
                deployment_id: receipt.deployment_id,
                published_at: receipt.published_at.to_rfc3339(),
            })
            .into_response()
        }
        Err(e) => error_response(&e),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    is_published: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    published_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_published: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    deployment_id: Option<String>,
}

async fn status_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match state.repo.publish_state(&id) {
        Ok(publish) => Json(StatusResponse {
            is_published: publish.is_published(),
            published_url: publish.published_url,
            last_published: publish.last_published.map(|t| t.to_rfc3339()),
            deployment_id: publish.deployment_id,
        })
        .into_response(),
        Err(e) => error_response(&e),
    }
}

async fn layout_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: String,
) -> Response {
    // Persist only documents the normalizer can make sense of; a hopeless
    // body is rejected here rather than at publish time.
    let store = match state.repo.get(&id) {
        Ok(store) => store,
        Err(e) => return error_response(&e),
    };
    if let Err(e) = storekit_layout::parse_layout(Some(&body), &store.store_name) {
        return error_response(&e);
    }
    match state.repo.put_layout(&id, &body) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(&e),
    }
}

async fn unpublish_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match state.repo.clear_publish(&id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (Error::Layout("x".into()), StatusCode::BAD_REQUEST),
            (Error::Build("x".into()), StatusCode::BAD_REQUEST),
            (Error::Deployment("x".into()), StatusCode::BAD_GATEWAY),
            (Error::Timeout("x".into()), StatusCode::GATEWAY_TIMEOUT),
            (Error::Busy("x".into()), StatusCode::CONFLICT),
            (Error::Config("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (Error::NotFound("x".into()), StatusCode::NOT_FOUND),
        ];
        for (err, expected) in cases {
            assert_eq!(error_response(&err).status(), expected, "{err}");
        }
    }
}
