//! HTTP routes
//!
//! | Method | Path        | Result                                   |
//! |--------|-------------|------------------------------------------|
//! | POST   | `/room`     | 201, body is the new room id             |
//! | GET    | `/room/:id` | 204 if the room is live, 404 otherwise   |
//! | GET    | `/ws/:id`   | WebSocket upgrade into the room          |
//!
//! Every response carries `Access-Control-Allow-Origin`.

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, State};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_ORIGIN, AUTHORIZATION, CONTENT_TYPE, ORIGIN,
};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::error::{Error, HubError, Result};
use crate::hub::Hub;

use super::config::ANY_ORIGIN;
use super::connection;

/// Shared handler state
#[derive(Debug, Clone)]
pub struct AppState {
    hub: Hub,
    cors_origin: Arc<str>,
}

impl AppState {
    pub fn new(hub: Hub, cors_origin: &str) -> Self {
        Self {
            hub,
            cors_origin: Arc::from(cors_origin),
        }
    }

    fn origin_allowed(&self, headers: &HeaderMap) -> bool {
        if &*self.cors_origin == ANY_ORIGIN {
            return true;
        }
        headers
            .get(ORIGIN)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|origin| origin == &*self.cors_origin)
    }
}

/// Build the application router
pub fn router(hub: Hub, cors_origin: &str) -> Result<Router> {
    let allow_origin = HeaderValue::from_str(cors_origin)
        .map_err(|e| Error::Config(format!("invalid CORS origin {:?}: {}", cors_origin, e)))?;

    let cors = CorsLayer::new()
        .allow_origin(if cors_origin == ANY_ORIGIN {
            AllowOrigin::any()
        } else {
            AllowOrigin::exact(allow_origin.clone())
        })
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);

    let state = AppState::new(hub, cors_origin);

    Ok(Router::new()
        .route("/room", post(create_room))
        .route("/room/:id", get(get_room))
        .route("/ws", get(missing_room_id))
        .route("/ws/", get(missing_room_id))
        .route("/ws/:id", get(connect))
        .layer(SetResponseHeaderLayer::if_not_present(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            allow_origin,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

async fn create_room(State(state): State<AppState>) -> Response {
    match state.hub.create_room().await {
        Ok(id) => (
            StatusCode::CREATED,
            [(CONTENT_TYPE, "text/plain; charset=utf-8")],
            id.to_string(),
        )
            .into_response(),
        Err(e) => hub_unavailable(e),
    }
}

async fn get_room(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.hub.get_room(&id).await {
        Ok(Some(_)) => StatusCode::NO_CONTENT.into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => hub_unavailable(e),
    }
}

async fn missing_room_id() -> Response {
    (StatusCode::BAD_REQUEST, "missing room id").into_response()
}

async fn connect(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    upgrade: Option<WebSocketUpgrade>,
) -> Response {
    let room = match state.hub.get_room(&id).await {
        Ok(Some(room)) => room,
        Ok(None) => return (StatusCode::NOT_FOUND, "room not found").into_response(),
        Err(e) => return hub_unavailable(e),
    };

    if !state.origin_allowed(&headers) {
        tracing::debug!(room = %room, "Rejected upgrade from foreign origin");
        return StatusCode::FORBIDDEN.into_response();
    }

    let Some(upgrade) = upgrade else {
        return (StatusCode::BAD_REQUEST, "expected a websocket upgrade").into_response();
    };

    let hub = state.hub.clone();
    let failed_room = room.clone();
    upgrade
        .on_failed_upgrade(move |e| {
            tracing::warn!(room = %failed_room, error = %e, "WebSocket upgrade failed");
        })
        .on_upgrade(move |socket| connection::handle_socket(socket, hub, room))
}

fn hub_unavailable(e: HubError) -> Response {
    tracing::error!(error = %e, "Hub unavailable");
    StatusCode::SERVICE_UNAVAILABLE.into_response()
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::hub::HubConfig;

    async fn app(origin: &str) -> (Router, Hub) {
        let (hub, _task) = Hub::spawn(HubConfig::default());
        (router(hub.clone(), origin).unwrap(), hub)
    }

    fn request(method: Method, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_then_get_room() {
        let (app, _hub) = app("*").await;

        let response = app
            .clone()
            .oneshot(request(Method::POST, "/room"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        let id = String::from_utf8(body.to_vec()).unwrap();
        assert_eq!(id.len(), 36);

        let response = app
            .oneshot(request(Method::GET, &format!("/room/{}", id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_get_unknown_room() {
        let (app, _hub) = app("*").await;

        let response = app
            .oneshot(request(Method::GET, "/room/does-not-exist"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().contains_key(ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[tokio::test]
    async fn test_ws_without_room_id() {
        let (app, _hub) = app("*").await;

        for uri in ["/ws", "/ws/"] {
            let response = app.clone().oneshot(request(Method::GET, uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_ws_unknown_room() {
        let (app, _hub) = app("*").await;

        let response = app
            .oneshot(request(Method::GET, "/ws/nope"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_ws_plain_get_rejected() {
        let (app, hub) = app("*").await;
        let room = hub.create_room().await.unwrap();

        let response = app
            .oneshot(request(Method::GET, &format!("/ws/{}", room)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_ws_origin_mismatch() {
        let (app, hub) = app("https://chat.example.com").await;
        let room = hub.create_room().await.unwrap();

        let req = Request::builder()
            .uri(format!("/ws/{}", room))
            .header(ORIGIN, "https://evil.example.com")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://chat.example.com"
        );
    }

    #[tokio::test]
    async fn test_preflight() {
        let (app, _hub) = app("*").await;

        let req = Request::builder()
            .method(Method::OPTIONS)
            .uri("/room")
            .header(ORIGIN, "https://chat.example.com")
            .header("access-control-request-method", "POST")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();

        assert!(response.status().is_success());
        let methods = response
            .headers()
            .get("access-control-allow-methods")
            .unwrap()
            .to_str()
            .unwrap();
        assert!(methods.contains("POST"));
        assert!(methods.contains("DELETE"));
    }

    #[tokio::test]
    async fn test_hub_stopped() {
        let (hub, task) = Hub::spawn(HubConfig::default());
        task.abort();
        let _ = task.await;
        let app = router(hub, "*").unwrap();

        let response = app.oneshot(request(Method::POST, "/room")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_invalid_origin_rejected() {
        let (hub, _task) = Hub::spawn(HubConfig::default());

        assert!(matches!(
            router(hub, "bad\norigin"),
            Err(Error::Config(_))
        ));
    }
}
