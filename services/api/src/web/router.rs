//! services/api/src/web/router.rs
//!
//! Assembles the public and session-protected routes into one application.

use crate::config::ConfigError;
use crate::web::{
    auth::{
        login_handler, logout_handler, recover_handler, reset_password_handler,
        session_handler, signup_handler, update_password_handler,
    },
    middleware::require_auth,
    rest::{
        add_visited_handler, list_visited_handler, remove_visited_handler,
        search_countries_handler, stats_handler, ApiDoc,
    },
    state::AppState,
    ws_handler::ws_handler,
};
use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Builds the full application router, Swagger UI included.
pub fn build_router(app_state: Arc<AppState>) -> Result<Router, ConfigError> {
    let origin = app_state
        .config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| ConfigError::InvalidValue("CORS_ORIGIN".to_string(), e.to_string()))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(signup_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler))
        .route("/auth/reset-password", post(reset_password_handler))
        .route("/auth/recover", post(recover_handler))
        .route("/countries/search", get(search_countries_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/session", get(session_handler))
        .route("/auth/update-password", post(update_password_handler))
        .route("/visited", get(list_visited_handler).post(add_visited_handler))
        .route("/visited/{country_code}", delete(remove_visited_handler))
        .route("/stats", get(stats_handler))
        .route("/ws", get(ws_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .with_state(app_state);

    Ok(Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::RecordingNotifier;
    use crate::adapters::InMemoryDb;
    use crate::config::Config;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, Response, StatusCode},
    };
    use serde_json::{json, Value};
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;
    use travel_tracker_core::catalog::CountryCatalog;
    use travel_tracker_core::domain::CountryFeature;
    use uuid::Uuid;

    struct Harness {
        router: Router,
        notifier: Arc<RecordingNotifier>,
        state: Arc<AppState>,
    }

    fn harness() -> Harness {
        let db = Arc::new(InMemoryDb::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let config = Config::from_lookup(|key| match key {
            "DATABASE_URL" => Some("postgres://unused".to_string()),
            "PUBLIC_URL" => Some("https://tracker.test".to_string()),
            _ => None,
        })
        .unwrap();
        let catalog = CountryCatalog::new(
            [("FRA", "France"), ("ZAF", "South Africa"), ("PER", "Peru")]
                .into_iter()
                .map(|(code, name)| CountryFeature {
                    code: Some(code.to_string()),
                    name: name.to_string(),
                    geometry: Value::Null,
                })
                .collect(),
        );
        let app_state = Arc::new(AppState {
            db: db.clone(),
            visited: db,
            notifier: notifier.clone(),
            catalog: Arc::new(catalog),
            config: Arc::new(config),
            gates: Arc::default(),
            shutdown: CancellationToken::new(),
        });
        Harness {
            router: build_router(app_state.clone()).unwrap(),
            notifier,
            state: app_state,
        }
    }

    fn post_json(uri: &str, body: Value, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_with(uri: &str, cookie: &str) -> Request<Body> {
        Request::get(uri)
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap()
    }

    /// The `session=<id>` pair from a `Set-Cookie` header.
    fn session_cookie(response: &Response<Body>) -> String {
        let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    async fn body_json(response: Response<Body>) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn signup(router: &Router, email: &str) -> String {
        let response = router
            .clone()
            .oneshot(post_json(
                "/auth/signup",
                json!({ "email": email, "password": "secret1" }),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        session_cookie(&response)
    }

    #[tokio::test]
    async fn test_protected_routes_need_a_session() {
        let h = harness();
        for uri in ["/visited", "/stats", "/auth/session", "/ws"] {
            let response = h
                .router
                .clone()
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        }

        let response = h
            .router
            .clone()
            .oneshot(get_with("/visited", "session=forged"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_signup_validation() {
        let h = harness();
        let response = h
            .router
            .clone()
            .oneshot(post_json(
                "/auth/signup",
                json!({ "email": "not-an-email", "password": "secret1" }),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = h
            .router
            .clone()
            .oneshot(post_json(
                "/auth/signup",
                json!({ "email": "ada@example.com", "password": "12345" }),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        signup(&h.router, "ada@example.com").await;
        let response = h
            .router
            .clone()
            .oneshot(post_json(
                "/auth/signup",
                json!({ "email": "ADA@example.com", "password": "secret1" }),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_visited_round_trip_and_stats() {
        let h = harness();
        let cookie = signup(&h.router, "ada@example.com").await;

        let response = h
            .router
            .clone()
            .oneshot(post_json(
                "/visited",
                json!({ "country_code": "FRA" }),
                Some(&cookie),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = h.router.clone().oneshot(get_with("/visited", &cookie)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["visited"], json!(["FRA"]));

        let response = h.router.clone().oneshot(get_with("/stats", &cookie)).await.unwrap();
        let stats = body_json(response).await;
        assert_eq!(stats["visited"], 1);
        assert_eq!(stats["to_visit"], 194);
        assert_eq!(stats["percentage"], 1);

        let response = h
            .router
            .clone()
            .oneshot(
                Request::delete("/visited/FRA")
                    .header(header::COOKIE, &cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = h.router.clone().oneshot(get_with("/visited", &cookie)).await.unwrap();
        assert_eq!(body_json(response).await["visited"], json!([]));
    }

    #[tokio::test]
    async fn test_country_search_is_public() {
        let h = harness();
        let response = h
            .router
            .clone()
            .oneshot(Request::get("/countries/search?q=ER").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!([{ "code": "PER", "name": "Peru" }])
        );

        let response = h
            .router
            .clone()
            .oneshot(Request::get("/countries/search?q=a").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_json(response).await, json!([]));
    }

    #[tokio::test]
    async fn test_logout_ends_session() {
        let h = harness();
        let cookie = signup(&h.router, "ada@example.com").await;
        let session_id = cookie.trim_start_matches("session=");
        let mut open_map = h.state.gates.subscribe(session_id, Uuid::new_v4());

        let response = h
            .router
            .clone()
            .oneshot(post_json("/auth/logout", json!({}), Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        assert!(open_map.has_changed().unwrap());
        assert_eq!(*open_map.borrow_and_update(), None);

        let response = h.router.clone().oneshot(get_with("/auth/session", &cookie)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_password_reset_flow() {
        let h = harness();
        signup(&h.router, "ada@example.com").await;

        let response = h
            .router
            .clone()
            .oneshot(post_json(
                "/auth/reset-password",
                json!({ "email": "nobody@example.com" }),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert!(h.notifier.sent().is_empty());

        let response = h
            .router
            .clone()
            .oneshot(post_json(
                "/auth/reset-password",
                json!({ "email": "ada@example.com" }),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let sent = h.notifier.sent();
        assert_eq!(sent.len(), 1);
        let (email, link) = &sent[0];
        assert_eq!(email, "ada@example.com");
        let token = link
            .strip_prefix("https://tracker.test/update-password?token=")
            .unwrap();

        let response = h
            .router
            .clone()
            .oneshot(post_json("/auth/recover", json!({ "token": token }), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = session_cookie(&response);

        let response = h
            .router
            .clone()
            .oneshot(post_json(
                "/auth/update-password",
                json!({ "password": "newsecret" }),
                Some(&cookie),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = h
            .router
            .clone()
            .oneshot(post_json(
                "/auth/login",
                json!({ "email": "ada@example.com", "password": "newsecret" }),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Reset links work once.
        let response = h
            .router
            .clone()
            .oneshot(post_json("/auth/recover", json!({ "token": token }), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
