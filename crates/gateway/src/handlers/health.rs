//! Liveness and readiness endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::time::Instant;

use crate::AppState;
use partshelf_common::db::Repository;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Up,
    Down,
}

#[derive(Serialize)]
pub struct Liveness {
    pub status: &'static str,
    pub version: &'static str,
}

/// Database reachability
#[derive(Serialize)]
pub struct DatabaseCheck {
    pub status: CheckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Whether the stored category tree can be walked from its roots
#[derive(Serialize)]
pub struct CategoryTreeCheck {
    pub status: CheckStatus,
    pub categories: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct Readiness {
    pub ready: bool,
    pub database: DatabaseCheck,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_tree: Option<CategoryTreeCheck>,
}

pub async fn health() -> Json<Liveness> {
    Json(Liveness {
        status: "alive",
        version: partshelf_common::VERSION,
    })
}

/// Ready once the database answers and the category tree is acyclic
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Readiness>) {
    let repo = Repository::new(state.db.clone());
    let started = Instant::now();

    let database = match repo.ping().await {
        Ok(()) => DatabaseCheck {
            status: CheckStatus::Up,
            latency_ms: Some(started.elapsed().as_millis() as u64),
            error: None,
        },
        Err(e) => DatabaseCheck {
            status: CheckStatus::Down,
            latency_ms: None,
            error: Some(e.to_string()),
        },
    };

    // The tree is only worth loading when the database is reachable
    let category_tree = match database.status {
        CheckStatus::Up => Some(match repo.load_category_tree().await {
            Ok(tree) => {
                let walked = tree.rebuild_nested_set();
                CategoryTreeCheck {
                    status: if walked.is_ok() { CheckStatus::Up } else { CheckStatus::Down },
                    categories: tree.len(),
                    error: walked.err().map(|e| e.to_string()),
                }
            }
            Err(e) => CategoryTreeCheck {
                status: CheckStatus::Down,
                categories: 0,
                error: Some(e.to_string()),
            },
        }),
        CheckStatus::Down => None,
    };

    let ready = database.status == CheckStatus::Up
        && category_tree.as_ref().is_some_and(|check| check.status == CheckStatus::Up);
    let status = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };

    (status, Json(Readiness { ready, database, category_tree }))
}
