//! HTTP layer: routes, boundary parsing, and error mapping.
//!
//! All decision logic lives in `store` and `query`; handlers only parse the
//! incoming strings into typed values, call the core, and shape the JSON.

use crate::config::Config;
use crate::error::Error;
use crate::model::{LogEntry, User};
use crate::query::{self, LogQuery, LogView};
use crate::store::UserStore;
use axum::extract::{Form, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Build the application router around a shared store handle.
pub fn app(store: Arc<UserStore>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/exercise/new-user", post(create_user_handler))
        .route("/api/exercise/users", get(list_users_handler))
        .route("/api/exercise/add", post(add_exercise_handler))
        .route("/api/exercise/log", get(log_handler))
        .fallback(not_found_handler)
        .layer(CorsLayer::permissive())
        .with_state(store)
}

/// Run the HTTP server until it is stopped.
pub async fn run(config: Config, store: Arc<UserStore>) -> anyhow::Result<()> {
    let app = app(store);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!("listening on port {}", config.port);
    axum::serve(listener, app).await?;
    Ok(())
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::InvalidArgument(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, msg).into_response(),
            Error::Internal(err) => {
                tracing::error!("request failed: {err:#}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }
}

async fn index_handler() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>fitlog</title>
    <style>
        body { font-family: system-ui, sans-serif; max-width: 640px; margin: 2rem auto; padding: 1rem; }
        form { padding: 1rem; background: #f0f0f0; border-radius: 4px; margin-bottom: 1rem; }
        input { display: block; margin: 0.5rem 0; }
        code { background: #e8e8e8; padding: 0 0.2rem; }
    </style>
</head>
<body>
    <h1>Exercise tracker</h1>
    <form action="/api/exercise/new-user" method="post">
        <h3>Create a new user</h3>
        <input name="username" placeholder="username">
        <input type="submit" value="Create">
    </form>
    <form action="/api/exercise/add" method="post">
        <h3>Add an exercise</h3>
        <input name="userId" placeholder="userId">
        <input name="description" placeholder="description">
        <input name="duration" placeholder="duration (minutes)">
        <input name="date" placeholder="date (yyyy-mm-dd, optional)">
        <input type="submit" value="Add">
    </form>
    <p>Query a log: <code>GET /api/exercise/log?userId=_id&amp;from=&amp;to=&amp;limit=</code></p>
    <p>All users: <code>GET /api/exercise/users</code></p>
</body>
</html>"#,
    )
}

async fn not_found_handler() -> Response {
    (StatusCode::NOT_FOUND, "not found").into_response()
}

/// User document plus its derived entry count.
fn user_payload(user: &User) -> Value {
    json!({
        "_id": user.id,
        "username": user.username,
        "count": user.count(),
        "log": user.log,
    })
}

#[derive(Debug, Deserialize)]
struct NewUserForm {
    #[serde(default)]
    username: String,
}

async fn create_user_handler(
    State(store): State<Arc<UserStore>>,
    Form(form): Form<NewUserForm>,
) -> Result<Json<Value>, Error> {
    let user = store.create(&form.username)?;
    tracing::debug!(user_id = %user.id, "created user");
    Ok(Json(user_payload(&user)))
}

async fn list_users_handler(State(store): State<Arc<UserStore>>) -> Json<Value> {
    let users: Vec<Value> = store.all_users().iter().map(user_payload).collect();
    Json(Value::Array(users))
}

#[derive(Debug, Deserialize)]
struct AddExerciseForm {
    #[serde(default, rename = "userId")]
    user_id: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    duration: String,
    #[serde(default)]
    date: String,
}

async fn add_exercise_handler(
    State(store): State<Arc<UserStore>>,
    Form(form): Form<AddExerciseForm>,
) -> Result<Json<Value>, Error> {
    if form.user_id.trim().is_empty() {
        return Err(Error::InvalidArgument("userId is required".to_string()));
    }
    let description = form.description.trim();
    if description.is_empty() {
        return Err(Error::InvalidArgument("description is required".to_string()));
    }
    let duration: u32 = form.duration.trim().parse().map_err(|_| {
        Error::InvalidArgument(format!(
            "invalid duration '{}', expected minutes as a non-negative integer",
            form.duration
        ))
    })?;
    let date = query::parse_entry_date(&form.date)?;

    let entry = LogEntry {
        description: description.to_string(),
        duration,
        date,
    };
    let user = store.append(&form.user_id, entry.clone())?;

    // Confirmation formatting happens after the durable write and can never
    // roll it back.
    Ok(Json(json!({
        "_id": user.id,
        "username": user.username,
        "description": entry.description,
        "duration": entry.duration,
        "date": query::confirmation_day(entry.date),
    })))
}

#[derive(Debug, Deserialize)]
struct LogParams {
    #[serde(default, rename = "userId")]
    user_id: String,
    from: Option<String>,
    to: Option<String>,
    limit: Option<String>,
}

async fn log_handler(
    State(store): State<Arc<UserStore>>,
    Query(params): Query<LogParams>,
) -> Result<Json<LogView>, Error> {
    if params.user_id.trim().is_empty() {
        return Err(Error::InvalidArgument("userId is required".to_string()));
    }
    let query = LogQuery::parse(
        params.from.as_deref(),
        params.to.as_deref(),
        params.limit.as_deref(),
    )?;
    let user = store.get(&params.user_id)?;
    Ok(Json(query::project(&user, &query)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use tower::ServiceExt;

    fn test_app() -> (Router, Arc<UserStore>) {
        let store = Arc::new(UserStore::in_memory());
        (app(store.clone()), store)
    }

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn post_form(app: &Router, uri: &str, body: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        (status, body_string(response).await)
    }

    async fn get_uri(app: &Router, uri: &str) -> (StatusCode, String) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        (status, body_string(response).await)
    }

    #[tokio::test]
    async fn test_create_user_roundtrip() {
        let (app, _) = test_app();
        let (status, body) = post_form(&app, "/api/exercise/new-user", "username=alice").await;
        assert_eq!(status, StatusCode::OK);

        let json: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["username"], "alice");
        assert_eq!(json["count"], 0);
        assert!(json["_id"].as_str().is_some());
        assert_eq!(json["log"], json!([]));
    }

    #[tokio::test]
    async fn test_create_user_requires_username() {
        let (app, _) = test_app();
        let (status, body) = post_form(&app, "/api/exercise/new-user", "username=").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("username"));
    }

    #[tokio::test]
    async fn test_list_users_includes_counts() {
        let (app, store) = test_app();
        let alice = store.create("alice").unwrap();
        store.create("bob").unwrap();
        store
            .append(
                &alice.id,
                LogEntry {
                    description: "run".to_string(),
                    duration: 30,
                    date: chrono::Utc::now(),
                },
            )
            .unwrap();

        let (status, body) = get_uri(&app, "/api/exercise/users").await;
        assert_eq!(status, StatusCode::OK);

        let json: Value = serde_json::from_str(&body).unwrap();
        let users = json.as_array().unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0]["username"], "alice");
        assert_eq!(users[0]["count"], 1);
        assert_eq!(users[1]["username"], "bob");
        assert_eq!(users[1]["count"], 0);
    }

    #[tokio::test]
    async fn test_add_exercise_confirmation() {
        let (app, store) = test_app();
        let user = store.create("alice").unwrap();

        let body = format!("userId={}&description=run&duration=30&date=2019-06-10", user.id);
        let (status, body) = post_form(&app, "/api/exercise/add", &body).await;
        assert_eq!(status, StatusCode::OK);

        let json: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["_id"], json!(user.id));
        assert_eq!(json["username"], "alice");
        assert_eq!(json["description"], "run");
        assert_eq!(json["duration"], 30);
        // Display day depends on the host offset; the format does not.
        let date = json["date"].as_str().unwrap();
        assert!(date.contains("Jun"));
        assert!(date.contains("2019"));
    }

    #[tokio::test]
    async fn test_add_exercise_defaults_date_to_now() {
        let (app, store) = test_app();
        let user = store.create("alice").unwrap();

        let body = format!("userId={}&description=run&duration=30&date=", user.id);
        let (status, _) = post_form(&app, "/api/exercise/add", &body).await;
        assert_eq!(status, StatusCode::OK);

        let log = store.log_for(&user.id).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].description, "run");
        assert_eq!(log[0].duration, 30);
    }

    #[tokio::test]
    async fn test_add_exercise_unknown_user_is_404() {
        let (app, _) = test_app();
        let (status, body) =
            post_form(&app, "/api/exercise/add", "userId=ghost&description=run&duration=30").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("ghost"));
    }

    #[tokio::test]
    async fn test_add_exercise_validates_fields() {
        let (app, store) = test_app();
        let user = store.create("alice").unwrap();

        let body = format!("userId={}&description=&duration=30", user.id);
        let (status, text) = post_form(&app, "/api/exercise/add", &body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(text.contains("description"));

        let body = format!("userId={}&description=run&duration=soon", user.id);
        let (status, text) = post_form(&app, "/api/exercise/add", &body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(text.contains("duration"));

        let body = format!("userId={}&description=run&duration=30&date=junk", user.id);
        let (status, text) = post_form(&app, "/api/exercise/add", &body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(text.contains("date"));
    }

    #[tokio::test]
    async fn test_log_query_full_flow() {
        let (app, store) = test_app();
        let user = store.create("alice").unwrap();
        for (desc, day) in [("one", 1), ("three", 3), ("five", 5)] {
            let body = format!(
                "userId={}&description={}&duration=10&date=2019-06-0{}",
                user.id, desc, day
            );
            let (status, _) = post_form(&app, "/api/exercise/add", &body).await;
            assert_eq!(status, StatusCode::OK);
        }

        let uri = format!(
            "/api/exercise/log?userId={}&from=2019-06-02&to=2019-06-04",
            user.id
        );
        let (status, body) = get_uri(&app, &uri).await;
        assert_eq!(status, StatusCode::OK);

        let json: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["username"], "alice");
        assert_eq!(json["count"], 1);
        let log = json["log"].as_array().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0]["description"], "three");
        assert_eq!(log[0]["date"], "Mon Jun 03 2019");
    }

    #[tokio::test]
    async fn test_log_query_limit_takes_first_entries() {
        let (app, store) = test_app();
        let user = store.create("alice").unwrap();
        for i in 1..=5 {
            let body = format!(
                "userId={}&description=e{}&duration=10&date=2019-06-0{}",
                user.id, i, i
            );
            post_form(&app, "/api/exercise/add", &body).await;
        }

        let uri = format!("/api/exercise/log?userId={}&limit=2", user.id);
        let (status, body) = get_uri(&app, &uri).await;
        assert_eq!(status, StatusCode::OK);

        let json: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["count"], 2);
        let log = json["log"].as_array().unwrap();
        assert_eq!(log[0]["description"], "e1");
        assert_eq!(log[1]["description"], "e2");
    }

    #[tokio::test]
    async fn test_log_query_ignores_unparsable_limit() {
        let (app, store) = test_app();
        let user = store.create("alice").unwrap();
        for i in 1..=3 {
            let body = format!("userId={}&description=e{}&duration=10", user.id, i);
            post_form(&app, "/api/exercise/add", &body).await;
        }

        let uri = format!("/api/exercise/log?userId={}&limit=abc", user.id);
        let (status, body) = get_uri(&app, &uri).await;
        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["count"], 3);
    }

    #[tokio::test]
    async fn test_log_query_errors() {
        let (app, store) = test_app();

        let (status, body) = get_uri(&app, "/api/exercise/log?userId=ghost").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("ghost"));

        let user = store.create("alice").unwrap();
        let uri = format!("/api/exercise/log?userId={}&from=junk", user.id);
        let (status, body) = get_uri(&app, &uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("from"));

        let (status, body) = get_uri(&app, "/api/exercise/log?userId=").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("userId"));
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let (app, _) = test_app();
        let (status, body) = get_uri(&app, "/api/exercise/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, "not found");
    }

    #[tokio::test]
    async fn test_index_serves_forms() {
        let (app, _) = test_app();
        let (status, body) = get_uri(&app, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("/api/exercise/new-user"));
        assert!(body.contains("/api/exercise/add"));
    }
}
