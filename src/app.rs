use std::net::SocketAddr;

use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::get,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

use crate::error::AppError;
use crate::state::AppState;
use crate::{auth, likes, posts, profiles};

pub const API_KEY_HEADER: &str = "apikey";

pub fn build_app(state: AppState) -> Router {
    let api = Router::new()
        .merge(auth::router())
        .merge(profiles::router())
        .merge(posts::router())
        .merge(likes::router())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    Router::new()
        .nest("/api/v1", api)
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

/// Rejects API calls without the configured public key, if one is set.
async fn require_api_key(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(expected) = state.config.public_api_key.as_deref() {
        let given = req
            .headers()
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok());
        if given != Some(expected) {
            warn!(uri = %req.uri(), "missing or wrong api key");
            return Err(AppError::Unauthorized("Invalid API key".into()));
        }
    }
    Ok(next.run(req).await)
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::AppConfig;

    async fn call(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        let req = match body {
            Some(b) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, value)
    }

    async fn register(app: &Router, email: &str) -> (String, String) {
        let (status, body) = call(
            app,
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({"email": email, "password": "long-enough", "name": "Tester"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        (
            body["access_token"].as_str().unwrap().to_string(),
            body["user"]["id"].as_str().unwrap().to_string(),
        )
    }

    #[tokio::test]
    async fn health_is_open() {
        let app = build_app(AppState::fake());
        let (status, body) = call(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::String("ok".into()));
    }

    #[tokio::test]
    async fn feed_requires_token() {
        let app = build_app(AppState::fake());
        let (status, _) = call(&app, Method::GET, "/api/v1/posts", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn refresh_token_is_not_an_access_token() {
        let app = build_app(AppState::fake());
        let (status, session) = call(
            &app,
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({"email": "ada@example.com", "password": "long-enough", "name": "Ada"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let refresh = session["refresh_token"].as_str().unwrap();

        let (status, body) = call(&app, Method::GET, "/api/v1/posts", Some(refresh), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, Value::String("Access token required".into()));
    }

    #[tokio::test]
    async fn post_like_and_read_back() {
        let app = build_app(AppState::fake());
        let (token, user_id) = register(&app, "ada@example.com").await;

        let (status, post) = call(
            &app,
            Method::POST,
            "/api/v1/posts",
            Some(&token),
            Some(json!({"content": "Hello network"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(post["user_id"], Value::String(user_id.clone()));
        assert_eq!(post["author"]["name"], "Tester");
        assert_eq!(post["likes"], json!({"state": "known", "count": 0, "liked": false}));
        let post_id = post["id"].as_str().unwrap().to_string();

        let toggle = format!("/api/v1/posts/{post_id}/like/toggle");
        let (status, change) = call(&app, Method::POST, &toggle, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(change["liked"], true);

        let (_, feed) = call(&app, Method::GET, "/api/v1/posts", Some(&token), None).await;
        assert_eq!(feed.as_array().unwrap().len(), 1);
        assert_eq!(feed[0]["likes"], json!({"state": "known", "count": 1, "liked": true}));

        let (_, mine) = call(
            &app,
            Method::GET,
            &format!("/api/v1/posts?author={user_id}"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(mine.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn blank_post_is_bad_request() {
        let app = build_app(AppState::fake());
        let (token, _) = register(&app, "ada@example.com").await;
        let (status, _) = call(
            &app,
            Method::POST,
            "/api/v1/posts",
            Some(&token),
            Some(json!({"content": "   "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let app = build_app(AppState::fake());
        register(&app, "ada@example.com").await;
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({"email": "ada@example.com", "password": "long-enough", "name": "Ada"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body, Value::String("Email already registered".into()));
    }

    #[tokio::test]
    async fn network_excludes_caller() {
        let app = build_app(AppState::fake());
        let (token, me) = register(&app, "ada@example.com").await;
        register(&app, "bob@example.com").await;

        let (status, people) =
            call(&app, Method::GET, "/api/v1/profiles", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        let people = people.as_array().unwrap();
        assert_eq!(people.len(), 1);
        assert_ne!(people[0]["id"], Value::String(me));
    }

    #[tokio::test]
    async fn api_key_gate() {
        let base = AppState::fake();
        let mut config: AppConfig = (*base.config).clone();
        config.public_api_key = Some("public-anon-key".into());
        let app = build_app(AppState::from_parts(base.store.clone(), Arc::new(config)));

        let (status, _) = call(&app, Method::GET, "/api/v1/posts", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/auth/login")
            .header(API_KEY_HEADER, "public-anon-key")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({"email": "nobody@example.com", "password": "whatever1"}).to_string(),
            ))
            .unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        // key accepted; the credentials are what fails now
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Invalid credentials");

        let (status, _) = call(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
    }
}
