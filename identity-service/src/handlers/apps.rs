//! Admin endpoints for app lifecycle.

use axum::{extract::State, http::StatusCode, response::Html, Json};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use validator::Validate;

use crate::services::CallContext;
use crate::utils::ValidatedForm;
use crate::AppState;

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Identity apps</title></head>
<body>
  <h1>Apps</h1>
  <form method="post" action="/new_app"><button type="submit">New app</button></form>
  <form method="post" action="/get_apps"><button type="submit">List apps</button></form>
  <form method="post" action="/delete_app">
    <input name="key" placeholder="app key" required>
    <button type="submit">Delete app</button>
  </form>
</body>
</html>
"#;

#[derive(Debug, Serialize, Deserialize)]
pub struct NewAppResponse {
    pub key: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AppResponse {
    pub id: i32,
    pub key: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct DeleteAppForm {
    #[validate(length(min = 1, message = "key is required"))]
    pub key: String,
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn new_app(State(state): State<AppState>) -> Result<Json<NewAppResponse>, AppError> {
    let (ctx, _guard) = CallContext::cancel_on_drop(None);
    let key = state.apps.create(&ctx).await?;

    Ok(Json(NewAppResponse {
        key: String::from_utf8_lossy(&key).into_owned(),
    }))
}

pub async fn get_apps(State(state): State<AppState>) -> Result<Json<Vec<AppResponse>>, AppError> {
    let (ctx, _guard) = CallContext::cancel_on_drop(None);
    let apps = state.apps.list(&ctx).await?;

    Ok(Json(
        apps.into_iter()
            .map(|app| AppResponse {
                id: app.id,
                key: String::from_utf8_lossy(&app.key).into_owned(),
            })
            .collect(),
    ))
}

pub async fn delete_app(
    State(state): State<AppState>,
    ValidatedForm(form): ValidatedForm<DeleteAppForm>,
) -> Result<StatusCode, AppError> {
    let (ctx, _guard) = CallContext::cancel_on_drop(None);
    state.apps.delete_by_key(&ctx, form.key.as_bytes()).await?;
    Ok(StatusCode::OK)
}
