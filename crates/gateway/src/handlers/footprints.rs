//! Footprint handlers (`/api/footprints`)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use partshelf_common::{
    catalog::{FootprintAggregate, FootprintInput, UploadInput},
    db::{
        models::{Footprint, FootprintAttachment, FootprintImage},
        Repository,
    },
    errors::{AppError, Result},
    CategoryTree,
};

/// Pagination parameters for listing
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub offset: u64,
    pub limit: Option<u64>,
}

/// Reference to the category a footprint belongs to
#[derive(Serialize)]
pub struct CategoryRef {
    pub id: Uuid,
    pub name: String,
}

/// Uploaded file metadata
#[derive(Serialize)]
pub struct UploadResponse {
    pub id: Uuid,
    pub filename: String,
    pub original_filename: String,
    pub mimetype: String,
    pub size: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: String,
}

impl From<FootprintImage> for UploadResponse {
    fn from(image: FootprintImage) -> Self {
        Self {
            id: image.id,
            filename: image.filename,
            original_filename: image.original_filename,
            mimetype: image.mimetype,
            size: image.size,
            extension: image.extension,
            description: image.description,
            created_at: image.created_at.to_rfc3339(),
        }
    }
}

impl From<FootprintAttachment> for UploadResponse {
    fn from(attachment: FootprintAttachment) -> Self {
        Self {
            id: attachment.id,
            filename: attachment.filename,
            original_filename: attachment.original_filename,
            mimetype: attachment.mimetype,
            size: attachment.size,
            extension: attachment.extension,
            description: attachment.description,
            created_at: attachment.created_at.to_rfc3339(),
        }
    }
}

/// Footprint row as listed
#[derive(Serialize)]
pub struct FootprintSummary {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub category_path: String,
}

impl FootprintSummary {
    pub fn new(footprint: Footprint, category_path: String) -> Self {
        Self {
            id: footprint.id,
            name: footprint.name,
            description: footprint.description,
            category_id: footprint.category_id,
            category_path,
        }
    }
}

/// Full footprint with owned image and attachments
#[derive(Serialize)]
pub struct FootprintResponse {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category: Option<CategoryRef>,
    pub category_path: String,
    pub image: Option<UploadResponse>,
    pub attachments: Vec<UploadResponse>,
    pub created_at: String,
    pub updated_at: String,
}

impl FootprintResponse {
    fn build(aggregate: FootprintAggregate, tree: &CategoryTree) -> Result<Self> {
        let category_path = aggregate.category_path(tree)?;
        let category = aggregate.category().map(|c| CategoryRef {
            id: c.id,
            name: c.name.clone(),
        });
        let image = aggregate.image().cloned().map(UploadResponse::from);
        let attachments = aggregate
            .attachments()
            .iter()
            .cloned()
            .map(UploadResponse::from)
            .collect();
        let footprint = aggregate.into_footprint();

        Ok(Self {
            id: footprint.id,
            name: footprint.name,
            description: footprint.description,
            category,
            category_path,
            image,
            attachments,
            created_at: footprint.created_at.to_rfc3339(),
            updated_at: footprint.updated_at.to_rfc3339(),
        })
    }
}

/// Paginated footprint list
#[derive(Serialize)]
pub struct FootprintListResponse {
    pub items: Vec<FootprintSummary>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

async fn respond(repo: &Repository, aggregate: FootprintAggregate) -> Result<FootprintResponse> {
    let tree = match aggregate.category() {
        Some(_) => repo.load_category_tree().await?,
        None => CategoryTree::default(),
    };
    FootprintResponse::build(aggregate, &tree)
}

/// List footprints with their category paths
pub async fn list_footprints(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<FootprintListResponse>> {
    let repo = Repository::new(state.db.clone());
    let limit = state.config.catalog.page_size(params.limit);

    let page = repo.list_footprints(params.offset, limit).await?;
    let tree = repo.load_category_tree().await?;

    let items = page
        .items
        .into_iter()
        .map(|footprint| {
            let path = match footprint.category_id {
                Some(category_id) => tree.generate_category_path(category_id)?,
                None => String::new(),
            };
            Ok(FootprintSummary::new(footprint, path))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Json(FootprintListResponse {
        items,
        total: page.total,
        offset: params.offset,
        limit,
    }))
}

/// Create a footprint
pub async fn create_footprint(
    State(state): State<AppState>,
    Json(request): Json<FootprintInput>,
) -> Result<(StatusCode, Json<FootprintResponse>)> {
    request.validate()?;

    let repo = Repository::new(state.db.clone());
    let aggregate = repo.create_footprint(request).await?;

    Ok((StatusCode::CREATED, Json(respond(&repo, aggregate).await?)))
}

/// Get a footprint by ID
pub async fn get_footprint(
    State(state): State<AppState>,
    Path(footprint_id): Path<Uuid>,
) -> Result<Json<FootprintResponse>> {
    let repo = Repository::new(state.db.clone());

    let aggregate = repo.find_footprint(footprint_id)
        .await?
        .ok_or_else(|| AppError::FootprintNotFound {
            id: footprint_id.to_string()
        })?;

    Ok(Json(respond(&repo, aggregate).await?))
}

/// Replace a footprint's name, description and category
pub async fn update_footprint(
    State(state): State<AppState>,
    Path(footprint_id): Path<Uuid>,
    Json(request): Json<FootprintInput>,
) -> Result<Json<FootprintResponse>> {
    request.validate()?;

    let repo = Repository::new(state.db.clone());
    let aggregate = repo.update_footprint(footprint_id, request).await?;

    Ok(Json(respond(&repo, aggregate).await?))
}

/// Delete a footprint with its image and attachments
pub async fn delete_footprint(
    State(state): State<AppState>,
    Path(footprint_id): Path<Uuid>,
) -> Result<StatusCode> {
    let repo = Repository::new(state.db.clone());

    if !repo.delete_footprint(footprint_id).await? {
        return Err(AppError::FootprintNotFound {
            id: footprint_id.to_string(),
        });
    }

    tracing::info!(footprint_id = %footprint_id, "Footprint deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Set or replace the footprint image
pub async fn set_image(
    State(state): State<AppState>,
    Path(footprint_id): Path<Uuid>,
    Json(request): Json<UploadInput>,
) -> Result<Json<UploadResponse>> {
    request.validate()?;

    let repo = Repository::new(state.db.clone());
    let image = repo.set_footprint_image(footprint_id, request).await?;

    Ok(Json(image.into()))
}

/// Attach an uploaded file
pub async fn add_attachment(
    State(state): State<AppState>,
    Path(footprint_id): Path<Uuid>,
    Json(request): Json<UploadInput>,
) -> Result<(StatusCode, Json<UploadResponse>)> {
    request.validate()?;

    let repo = Repository::new(state.db.clone());
    let attachment = repo.add_footprint_attachment(footprint_id, request).await?;

    Ok((StatusCode::CREATED, Json(attachment.into())))
}

/// Detach and delete an attachment
pub async fn remove_attachment(
    State(state): State<AppState>,
    Path((footprint_id, attachment_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode> {
    let repo = Repository::new(state.db.clone());

    repo.remove_footprint_attachment(footprint_id, attachment_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
