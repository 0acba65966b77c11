//! Footprint category handlers (`/api/footprint_categories`)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::footprints::FootprintSummary;
use crate::AppState;
use partshelf_common::{
    catalog::{CategoryInput, CategoryUpdate},
    db::{models::FootprintCategory, Repository},
    errors::{AppError, Result},
};

/// Category as exposed by the API
#[derive(Serialize)]
pub struct CategoryResponse {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
    pub category_path: String,
    pub lft: i32,
    pub rgt: i32,
    pub lvl: i32,
}

impl From<FootprintCategory> for CategoryResponse {
    fn from(category: FootprintCategory) -> Self {
        let category_path = category
            .category_path
            .unwrap_or_else(|| category.name.clone());

        Self {
            id: category.id,
            name: category.name,
            description: category.description,
            parent_id: category.parent_id,
            category_path,
            lft: category.lft,
            rgt: category.rgt,
            lvl: category.lvl,
        }
    }
}

/// Category with its parent and direct children
#[derive(Serialize)]
pub struct CategoryDetailResponse {
    #[serde(flatten)]
    pub category: CategoryResponse,
    pub parent: Option<CategoryResponse>,
    pub children: Vec<CategoryResponse>,
}

/// Request to re-parent a category
#[derive(Debug, Deserialize)]
pub struct MoveCategoryRequest {
    #[serde(default)]
    pub parent_id: Option<Uuid>,
}

/// List all categories in tree order
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryResponse>>> {
    let repo = Repository::new(state.db.clone());

    let categories = repo.list_categories().await?;

    Ok(Json(categories.into_iter().map(CategoryResponse::from).collect()))
}

/// Create a category
pub async fn create_category(
    State(state): State<AppState>,
    Json(request): Json<CategoryInput>,
) -> Result<(StatusCode, Json<CategoryResponse>)> {
    request.validate()?;

    let repo = Repository::new(state.db.clone());
    let category = repo.create_category(request).await?;

    Ok((StatusCode::CREATED, Json(category.into())))
}

/// Get a category with its parent and children
pub async fn get_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
) -> Result<Json<CategoryDetailResponse>> {
    let repo = Repository::new(state.db.clone());

    let category = repo.find_category_by_id(category_id)
        .await?
        .ok_or_else(|| AppError::CategoryNotFound {
            id: category_id.to_string()
        })?;

    let parent = repo.category_parent(category_id).await?;
    let children = repo.category_children(category_id).await?;

    Ok(Json(CategoryDetailResponse {
        category: category.into(),
        parent: parent.map(CategoryResponse::from),
        children: children.into_iter().map(CategoryResponse::from).collect(),
    }))
}

/// Rename or re-describe a category
pub async fn update_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
    Json(request): Json<CategoryUpdate>,
) -> Result<Json<CategoryResponse>> {
    request.validate()?;

    let repo = Repository::new(state.db.clone());
    let category = repo.update_category(category_id, request).await?;

    Ok(Json(category.into()))
}

/// Move a category under another parent, or to the top level
pub async fn move_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
    Json(request): Json<MoveCategoryRequest>,
) -> Result<Json<CategoryResponse>> {
    let repo = Repository::new(state.db.clone());
    let category = repo.move_category(category_id, request.parent_id).await?;

    Ok(Json(category.into()))
}

/// Delete a category and its subtree
pub async fn delete_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
) -> Result<StatusCode> {
    let repo = Repository::new(state.db.clone());

    repo.delete_category(category_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Direct children of a category
pub async fn list_children(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
) -> Result<Json<Vec<CategoryResponse>>> {
    let repo = Repository::new(state.db.clone());

    let children = repo.category_children(category_id).await?;

    Ok(Json(children.into_iter().map(CategoryResponse::from).collect()))
}

/// Footprints assigned to a category
pub async fn list_category_footprints(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
) -> Result<Json<Vec<FootprintSummary>>> {
    let repo = Repository::new(state.db.clone());

    let footprints = repo.category_footprints(category_id).await?;
    let path = repo.category_path(category_id).await?;

    Ok(Json(
        footprints
            .into_iter()
            .map(|footprint| FootprintSummary::new(footprint, path.clone()))
            .collect(),
    ))
}
