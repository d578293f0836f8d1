use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::AppState;

use super::AppError;

// ─── Domain types ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    "viewer".into()
}

/// A handful of users so `GET /api/users/:id` has something to return.
pub fn seed() -> HashMap<String, User> {
    ["Emma", "Liam", "Olivia", "Noah", "Ava"]
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let id = format!("usr_{:08}", i + 1);
            let user = User {
                id: id.clone(),
                name: (*name).into(),
                email: format!("{}@example.com", name.to_lowercase()),
                role: "viewer".into(),
            };
            (id, user)
        })
        .collect()
}

// ─── GET /api/users/:id ──────────────────────────────────────────

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<User>, AppError> {
    state
        .users
        .read()
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("user {id} not found")))
}

// ─── POST /api/users ─────────────────────────────────────────────

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    if body.name.trim().is_empty() {
        return Err(AppError::BadRequest("name must not be empty".into()));
    }
    if !body.email.contains('@') {
        return Err(AppError::BadRequest("email must contain '@'".into()));
    }

    let mut users = state.users.write();
    let id = format!("usr_{:08}", users.len() + 1);
    let user = User {
        id: id.clone(),
        name: body.name,
        email: body.email,
        role: body.role,
    };
    users.insert(id, user.clone());

    Ok((StatusCode::CREATED, Json(user)))
}
