use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use netarm_provider::ProviderMeta;
use netarm_store::StateStore;
use tower_http::trace::TraceLayer;

use crate::auth::require_bearer_token;
use crate::handlers;
use crate::state::AppState;

pub fn build_app(store: Arc<dyn StateStore>, meta: ProviderMeta, auth_token: Arc<String>) -> Router {
    let state = AppState { store, meta, auth_token };

    let protected = Router::new()
        .route("/ready", get(handlers::ready))
        // Schemas
        .route("/schemas", get(handlers::list_schemas))
        .route("/schemas/:type", get(handlers::get_schema))
        // Resource lifecycle
        .route("/resources/:type/validate", post(handlers::validate_resource))
        .route("/resources/:type/create", post(handlers::create_resource))
        .route("/resources/:type/read", post(handlers::read_resource))
        .route("/resources/:type/update", post(handlers::update_resource))
        .route("/resources/:type/delete", post(handlers::delete_resource))
        .route("/resources/:type/import", post(handlers::import_resource))
        .route("/data/:type/read", post(handlers::read_data))
        // Reconcile
        .route("/plan", post(handlers::post_plan))
        .route("/apply", post(handlers::post_apply))
        .route("/destroy", post(handlers::post_destroy))
        // State
        .route("/state", get(handlers::list_state))
        .route("/events", get(handlers::list_events))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer_token));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use axum::response::Response;
    use netarm_client::LocalArm;
    use netarm_domain::{TypedId, VirtualNetworkId};
    use netarm_store::InMemoryStore;
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    const SUB: &str = "00000000-0000-0000-0000-000000000000";
    const TOKEN: &str = "test-token";

    fn test_app_with(arm: Arc<LocalArm>) -> Router {
        let store = Arc::new(InMemoryStore::new());
        build_app(store, ProviderMeta::new(arm, SUB), Arc::new(TOKEN.to_string()))
    }

    fn test_app() -> Router {
        test_app_with(Arc::new(LocalArm::new()))
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
            .body(Body::empty())
            .unwrap()
    }

    fn post_req(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(resp: Response) -> Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn vnet_config() -> Value {
        json!({
            "config": {
                "name": "vnet1",
                "resource_group_name": "rg1",
                "location": "West Europe",
                "address_space": ["10.0.0.0/16"],
            }
        })
    }

    #[tokio::test]
    async fn health_needs_no_token() {
        let resp = test_app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_or_wrong_token_is_rejected() {
        let resp = test_app()
            .oneshot(Request::builder().uri("/schemas").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = test_app()
            .oneshot(
                Request::builder()
                    .uri("/schemas")
                    .header(header::AUTHORIZATION, "Bearer nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn ready_returns_200_with_empty_store() {
        let resp = test_app().oneshot(get_req("/ready")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn schema_lookup() {
        let resp = test_app().oneshot(get_req("/schemas/azurerm_subnet")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["resource"]["virtual_network_name"]["force_new"], true);
        assert_eq!(body["data_source"]["virtual_network_name"]["required"], true);

        let resp = test_app().oneshot(get_req("/schemas/azurerm_virtual_wan")).await.unwrap();
        assert_eq!(json_body(resp).await["data_source"], Value::Null);

        let resp = test_app().oneshot(get_req("/schemas/azurerm_nope")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn validate_reports_every_problem() {
        let body = json!({ "config": { "name": "vnet1", "bogus": true } });
        let resp = test_app()
            .oneshot(post_req("/resources/azurerm_virtual_network/validate", body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let details = json_body(resp).await["details"].as_array().cloned().unwrap();
        assert!(details.iter().any(|d| d == "bogus: unsupported argument"), "{details:?}");
        assert!(details.len() > 1, "{details:?}");

        let resp = test_app()
            .oneshot(post_req("/resources/azurerm_virtual_network/validate", vnet_config()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_type_is_404() {
        let resp = test_app()
            .oneshot(post_req("/resources/azurerm_nope/create", json!({ "config": {} })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn create_read_delete_through_the_api() {
        let arm = Arc::new(LocalArm::new());
        let id = VirtualNetworkId::new(SUB, "rg1", "vnet1").id();

        let resp = test_app_with(arm.clone())
            .oneshot(post_req("/resources/azurerm_virtual_network/create", vnet_config()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let created = json_body(resp).await;
        assert_eq!(created["id"], id.as_str());
        assert_eq!(created["attributes"]["location"], "westeurope");

        let resp = test_app_with(arm.clone())
            .oneshot(post_req("/resources/azurerm_virtual_network/create", vnet_config()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let resp = test_app_with(arm.clone())
            .oneshot(post_req("/resources/azurerm_virtual_network/delete", json!({ "id": id })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert!(!arm.contains(&id));

        let resp = test_app_with(arm)
            .oneshot(post_req("/resources/azurerm_virtual_network/read", json!({ "id": id })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["id"], Value::Null);
    }

    #[tokio::test]
    async fn import_of_missing_object_is_404() {
        let id = VirtualNetworkId::new(SUB, "rg1", "vnet1").id();
        let resp = test_app()
            .oneshot(post_req("/resources/azurerm_virtual_network/import", json!({ "id": id })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn data_source_lookup() {
        let arm = Arc::new(LocalArm::new());
        let id = VirtualNetworkId::new(SUB, "rg1", "hub");
        arm.insert(
            &id.id(),
            json!({ "location": "westeurope", "properties": { "addressSpace": { "addressPrefixes": ["10.9.0.0/16"] } } }),
        );
        let body = json!({ "config": { "name": "hub", "resource_group_name": "rg1" } });
        let resp = test_app_with(arm).oneshot(post_req("/data/azurerm_virtual_network/read", body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["attributes"]["address_space"][0], "10.9.0.0/16");
    }

    #[tokio::test]
    async fn plan_of_missing_directory_is_unprocessable() {
        let resp = test_app()
            .oneshot(post_req("/plan", json!({ "config_dir": "/no/such/path" })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn apply_then_state_and_events() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("main.yml"),
            r#"
resources:
  - type: azurerm_virtual_network
    name: main
    config:
      name: vnet1
      resource_group_name: rg1
      location: westeurope
      address_space: ["10.0.0.0/16"]
"#,
        )
        .unwrap();

        let app = test_app();
        let body = json!({ "config_dir": dir.path() });
        let resp = app.clone().oneshot(post_req("/apply", body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let report = json_body(resp).await;
        assert_eq!(report["changes"][0]["action"]["kind"], "create");

        let resp = app.clone().oneshot(get_req("/state")).await.unwrap();
        let state = json_body(resp).await;
        assert_eq!(state.as_array().unwrap().len(), 1);
        assert_eq!(state[0]["status"], "present");

        let resp = app.clone().oneshot(get_req("/events?address=azurerm_virtual_network.main")).await.unwrap();
        let events = json_body(resp).await;
        assert_eq!(events[0]["kind"], "ResourceCreated");

        let resp = app.oneshot(get_req("/events?address=not-an-address")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn destroy_dry_run_sends_nothing() {
        let resp = test_app().oneshot(post_req("/destroy", json!({ "dry_run": true }))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["changes"], json!([]));
    }
}
