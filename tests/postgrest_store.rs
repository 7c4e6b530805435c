//! Integration tests for the PostgREST profile store against a stub
//! `/rest/v1/profiles` endpoint.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;
use uuid::Uuid;

use medicly::error::DatabaseError;
use medicly::profile::Role;
use medicly::store::{PostgrestProfileStore, Principal, ProfileStore};

const TEST_TIMEOUT: Duration = Duration::from_secs(5);

const ANON_KEY: &str = "anon-key";
const USER_TOKEN: &str = "user-jwt";

/// One request as the stub saw it.
#[derive(Debug, Clone)]
struct Recorded {
    method: Method,
    query: HashMap<String, String>,
    headers: HeaderMap,
    body: Option<Value>,
}

impl Recorded {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

struct StubRest {
    status: StatusCode,
    body: Value,
    requests: Mutex<Vec<Recorded>>,
}

impl StubRest {
    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

async fn profiles_endpoint(
    State(stub): State<Arc<StubRest>>,
    method: Method,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    stub.requests.lock().unwrap().push(Recorded {
        method,
        query,
        headers,
        body: serde_json::from_str(&body).ok(),
    });
    (stub.status, Json(stub.body.clone())).into_response()
}

async fn start_stub(status: StatusCode, body: Value) -> (PostgrestProfileStore, Arc<StubRest>) {
    let stub = Arc::new(StubRest {
        status,
        body,
        requests: Mutex::new(Vec::new()),
    });
    let app = axum::Router::new()
        .route(
            "/rest/v1/profiles",
            get(profiles_endpoint).post(profiles_endpoint),
        )
        .with_state(Arc::clone(&stub));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let store = PostgrestProfileStore::new(
        reqwest::Client::new(),
        &format!("http://127.0.0.1:{port}/"),
        SecretString::from(ANON_KEY),
    );
    (store, stub)
}

fn assert_acts_as_user(request: &Recorded) {
    assert_eq!(request.header("apikey"), Some(ANON_KEY));
    assert_eq!(
        request.header("authorization"),
        Some(format!("Bearer {USER_TOKEN}").as_str())
    );
}

#[tokio::test]
async fn profile_read_selects_by_id_as_the_user() {
    timeout(TEST_TIMEOUT, async {
        let (store, stub) =
            start_stub(StatusCode::OK, json!([{ "role": "doctor", "onboarded": true }])).await;
        let user_id = Uuid::new_v4();

        let profile = store
            .get_profile(Principal::with_token(user_id, USER_TOKEN))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(profile.role, Role::Doctor);
        assert!(profile.onboarded);

        let requests = stub.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.query["select"], "role,onboarded");
        assert_eq!(request.query["id"], format!("eq.{user_id}"));
        assert_acts_as_user(request);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn no_rows_is_no_profile() {
    timeout(TEST_TIMEOUT, async {
        let (store, _stub) = start_stub(StatusCode::OK, json!([])).await;

        let profile = store
            .get_profile(Principal::with_token(Uuid::new_v4(), USER_TOKEN))
            .await
            .unwrap();
        assert!(profile.is_none());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn error_statuses_are_query_errors() {
    timeout(TEST_TIMEOUT, async {
        for status in [
            StatusCode::NOT_FOUND,
            StatusCode::UNAUTHORIZED,
            StatusCode::INTERNAL_SERVER_ERROR,
        ] {
            let (store, _stub) =
                start_stub(status, json!({ "message": "relation does not exist" })).await;

            let err = store
                .get_profile(Principal::with_token(Uuid::new_v4(), USER_TOKEN))
                .await
                .unwrap_err();
            match err {
                DatabaseError::Query(message) => {
                    assert!(message.starts_with("get_profile:"), "{message}");
                    assert!(message.contains(status.as_str()), "{message}");
                }
                other => panic!("expected a query error for {status}, got {other:?}"),
            }
        }
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn role_assignment_upserts_on_id() {
    timeout(TEST_TIMEOUT, async {
        let (store, stub) = start_stub(StatusCode::CREATED, Value::Null).await;
        let user_id = Uuid::new_v4();

        store
            .assign_role(
                Principal::with_token(user_id, USER_TOKEN),
                Role::Doctor,
                Some("Dr Example"),
            )
            .await
            .unwrap();

        let requests = stub.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.query["on_conflict"], "id");
        assert!(
            request
                .header("prefer")
                .is_some_and(|p| p.contains("resolution=merge-duplicates"))
        );
        assert_acts_as_user(request);
        assert_eq!(
            request.body,
            Some(json!({
                "id": user_id,
                "role": "doctor",
                "onboarded": true,
                "name": "Dr Example",
            }))
        );
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn rejected_upsert_is_a_query_error() {
    timeout(TEST_TIMEOUT, async {
        let (store, _stub) = start_stub(
            StatusCode::FORBIDDEN,
            json!({ "message": "new row violates row-level security policy" }),
        )
        .await;

        let err = store
            .assign_role(
                Principal::with_token(Uuid::new_v4(), USER_TOKEN),
                Role::Client,
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Query(m) if m.starts_with("assign_role:")));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn calls_without_a_user_token_never_leave_the_process() {
    timeout(TEST_TIMEOUT, async {
        let (store, stub) = start_stub(StatusCode::OK, json!([])).await;
        let user = Principal::user(Uuid::new_v4());

        assert!(matches!(
            store.get_profile(user).await,
            Err(DatabaseError::Query(_))
        ));
        assert!(matches!(
            store.assign_role(user, Role::Client, None).await,
            Err(DatabaseError::Query(_))
        ));
        assert!(stub.requests().is_empty());
    })
    .await
    .expect("test timed out");
}
