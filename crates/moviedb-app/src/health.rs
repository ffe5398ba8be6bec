use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use crate::state::{AppState, VERSION};

pub async fn healthcheck(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "available",
        "system_info": {
            "environment": state.config().env.to_string(),
            "version": VERSION,
        }
    }))
}
