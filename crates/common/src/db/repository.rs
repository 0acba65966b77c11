//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations
//! with proper error handling and transaction support.

use crate::catalog::{CategoryInput, CategoryTree, CategoryUpdate, FootprintAggregate, FootprintInput, UploadInput};
use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::metrics;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

/// One page of footprints
#[derive(Debug, Clone, Serialize)]
pub struct FootprintPage {
    pub items: Vec<Footprint>,
    pub total: u64,
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Category Operations
    // ========================================================================

    /// Find category by ID
    pub async fn find_category_by_id(&self, id: Uuid) -> Result<Option<FootprintCategory>> {
        FootprintCategoryEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// List all categories in tree order
    pub async fn list_categories(&self) -> Result<Vec<FootprintCategory>> {
        FootprintCategoryEntity::find()
            .order_by_asc(FootprintCategoryColumn::Lft)
            .order_by_asc(FootprintCategoryColumn::Name)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Load every category into an in-memory tree
    pub async fn load_category_tree(&self) -> Result<CategoryTree> {
        let rows = FootprintCategoryEntity::find().all(self.read_conn()).await?;
        Ok(CategoryTree::from_categories(rows))
    }

    /// Direct children of a category, ordered by `lft`
    pub async fn category_children(&self, id: Uuid) -> Result<Vec<FootprintCategory>> {
        let category = category_on(self.read_conn(), id).await?;

        FootprintCategoryEntity::find()
            .filter(FootprintCategoryColumn::ParentId.eq(category.id))
            .order_by_asc(FootprintCategoryColumn::Lft)
            .order_by_asc(FootprintCategoryColumn::Name)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Parent of a category (None for a root)
    pub async fn category_parent(&self, id: Uuid) -> Result<Option<FootprintCategory>> {
        let category = category_on(self.read_conn(), id).await?;

        category
            .find_linked(ParentCategory)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Resolve the root-to-node path of a category from the live tree
    pub async fn category_path(&self, id: Uuid) -> Result<String> {
        self.load_category_tree().await?.generate_category_path(id)
    }

    /// Footprints assigned to a category
    pub async fn category_footprints(&self, id: Uuid) -> Result<Vec<Footprint>> {
        let category = category_on(self.read_conn(), id).await?;

        category
            .find_related(FootprintEntity)
            .order_by_asc(FootprintColumn::Name)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Create a category, appended as the last child of its parent
    pub async fn create_category(&self, input: CategoryInput) -> Result<FootprintCategory> {
        let txn = self.write_conn().begin().await?;

        let tree = locked_category_tree(&txn).await?;
        if let Some(parent_id) = input.parent_id {
            if tree.get(parent_id).is_none() {
                return Err(AppError::CategoryNotFound { id: parent_id.to_string() });
            }
        }

        let now = chrono::Utc::now();
        let category = FootprintCategoryActiveModel {
            id: Set(Uuid::new_v4()),
            parent_id: Set(input.parent_id),
            name: Set(input.name),
            description: Set(input.description),
            lft: Set(0),
            rgt: Set(0),
            lvl: Set(0),
            category_path: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;

        refresh_category_tree(&txn).await?;
        let created = category_on(&txn, category.id).await?;
        txn.commit().await?;

        metrics::record_catalog_mutation("footprint_category", "create");
        info!(
            category_id = %created.id,
            path = created.category_path.as_deref().unwrap_or_default(),
            "Footprint category created"
        );

        Ok(created)
    }

    /// Rename or re-describe a category; descendant paths follow
    pub async fn update_category(&self, id: Uuid, update: CategoryUpdate) -> Result<FootprintCategory> {
        let txn = self.write_conn().begin().await?;

        let tree = locked_category_tree(&txn).await?;
        let mut category = tree
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::CategoryNotFound { id: id.to_string() })?
            .into_active_model();
        category.name = Set(update.name);
        category.description = Set(update.description);
        category.updated_at = Set(chrono::Utc::now().into());
        category.update(&txn).await?;

        refresh_category_tree(&txn).await?;
        let updated = category_on(&txn, id).await?;
        txn.commit().await?;

        metrics::record_catalog_mutation("footprint_category", "update");
        info!(category_id = %id, "Footprint category updated");

        Ok(updated)
    }

    /// Re-parent a category (None makes it a root). The category becomes the
    /// last child of its new parent.
    pub async fn move_category(&self, id: Uuid, new_parent: Option<Uuid>) -> Result<FootprintCategory> {
        let txn = self.write_conn().begin().await?;

        let tree = locked_category_tree(&txn).await?;
        tree.validate_move(id, new_parent)?;

        let mut category = tree
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::CategoryNotFound { id: id.to_string() })?
            .into_active_model();
        category.parent_id = Set(new_parent);
        category.lft = Set(0);
        category.rgt = Set(0);
        category.updated_at = Set(chrono::Utc::now().into());
        category.update(&txn).await?;

        refresh_category_tree(&txn).await?;
        let moved = category_on(&txn, id).await?;
        txn.commit().await?;

        metrics::record_catalog_mutation("footprint_category", "move");
        info!(
            category_id = %id,
            parent_id = ?new_parent,
            "Footprint category moved"
        );

        Ok(moved)
    }

    /// Delete a category with its whole subtree. Fails with `CategoryInUse`
    /// while any footprint still references a category in the subtree.
    /// Returns the number of categories removed.
    pub async fn delete_category(&self, id: Uuid) -> Result<u64> {
        let txn = self.write_conn().begin().await?;

        let tree = locked_category_tree(&txn).await?;
        let mut subtree: Vec<Uuid> = tree.descendants(id)?.iter().map(|c| c.id).collect();
        subtree.push(id);

        let in_use = FootprintEntity::find()
            .filter(FootprintColumn::CategoryId.is_in(subtree.clone()))
            .count(&txn)
            .await?;
        if in_use > 0 {
            return Err(AppError::CategoryInUse { id: id.to_string(), footprints: in_use });
        }

        let result = FootprintCategoryEntity::delete_many()
            .filter(FootprintCategoryColumn::Id.is_in(subtree))
            .exec(&txn)
            .await?;

        refresh_category_tree(&txn).await?;
        txn.commit().await?;

        metrics::record_catalog_mutation("footprint_category", "delete");
        info!(
            category_id = %id,
            removed = result.rows_affected,
            "Footprint category subtree deleted"
        );

        Ok(result.rows_affected)
    }

    // ========================================================================
    // Footprint Operations
    // ========================================================================

    /// Create a new footprint
    pub async fn create_footprint(&self, input: FootprintInput) -> Result<FootprintAggregate> {
        let category = match input.category_id {
            Some(category_id) => Some(category_on(self.write_conn(), category_id).await?),
            None => None,
        };

        let now = chrono::Utc::now();
        let name = input.name;

        let footprint = FootprintActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.clone()),
            description: Set(input.description),
            category_id: Set(input.category_id),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(self.write_conn())
        .await
        .map_err(|e| AppError::from_footprint_write(e, &name))?;

        metrics::record_catalog_mutation("footprint", "create");
        info!(footprint_id = %footprint.id, name = %footprint.name, "Footprint created");

        Ok(FootprintAggregate::from_parts(footprint, category, None, Vec::new()))
    }

    /// Find a footprint with its category, image and attachments
    pub async fn find_footprint(&self, id: Uuid) -> Result<Option<FootprintAggregate>> {
        let Some(footprint) = FootprintEntity::find_by_id(id).one(self.read_conn()).await? else {
            return Ok(None);
        };

        aggregate_for(self.read_conn(), footprint).await.map(Some)
    }

    /// List footprints ordered by name with pagination
    pub async fn list_footprints(&self, offset: u64, limit: u64) -> Result<FootprintPage> {
        let total = FootprintEntity::find().count(self.read_conn()).await?;
        let items = FootprintEntity::find()
            .order_by_asc(FootprintColumn::Name)
            .offset(offset)
            .limit(limit.max(1))
            .all(self.read_conn())
            .await?;

        Ok(FootprintPage { items, total })
    }

    /// Replace name, description and category of a footprint
    pub async fn update_footprint(&self, id: Uuid, input: FootprintInput) -> Result<FootprintAggregate> {
        let txn = self.write_conn().begin().await?;
        let mut aggregate = footprint_on(&txn, id).await?;

        aggregate.set_name(input.name);
        aggregate.set_description(input.description);
        match input.category_id {
            Some(category_id) => aggregate.set_category(category_on(&txn, category_id).await?),
            None => aggregate.clear_category(),
        }

        let footprint = aggregate.footprint();
        let mut active = footprint.clone().into_active_model();
        active.name = Set(footprint.name.clone());
        active.description = Set(footprint.description.clone());
        active.category_id = Set(footprint.category_id);
        active.updated_at = Set(chrono::Utc::now().into());
        active
            .update(&txn)
            .await
            .map_err(|e| AppError::from_footprint_write(e, aggregate.name()))?;

        let refreshed = footprint_on(&txn, id).await?;
        txn.commit().await?;

        metrics::record_catalog_mutation("footprint", "update");
        info!(footprint_id = %id, "Footprint updated");

        Ok(refreshed)
    }

    /// Replace the footprint image; the previous image row is deleted
    pub async fn set_footprint_image(&self, id: Uuid, upload: UploadInput) -> Result<FootprintImage> {
        let txn = self.write_conn().begin().await?;
        let mut aggregate = footprint_on(&txn, id).await?;

        let image = upload.into_image(id);
        let active = image.clone().into_active_model();

        if let Some(previous) = aggregate.set_image(image) {
            FootprintImageEntity::delete_by_id(previous.id).exec(&txn).await?;
            debug!(footprint_id = %id, image_id = %previous.id, "Previous footprint image removed");
        }

        let image = active.insert(&txn).await?;
        txn.commit().await?;

        metrics::record_catalog_mutation("footprint_image", "replace");
        info!(footprint_id = %id, image_id = %image.id, "Footprint image set");

        Ok(image)
    }

    /// Attach an uploaded file to a footprint
    pub async fn add_footprint_attachment(&self, id: Uuid, upload: UploadInput) -> Result<FootprintAttachment> {
        let mut aggregate = footprint_on(self.write_conn(), id).await?;

        let attachment = aggregate
            .add_attachment(upload.into_attachment())
            .clone()
            .into_active_model()
            .insert(self.write_conn())
            .await?;

        metrics::record_catalog_mutation("footprint_attachment", "create");
        info!(
            footprint_id = %id,
            attachment_id = %attachment.id,
            file = %attachment.original_filename,
            "Footprint attachment added"
        );

        Ok(attachment)
    }

    /// Detach an attachment from a footprint and delete the orphaned row
    pub async fn remove_footprint_attachment(&self, id: Uuid, attachment_id: Uuid) -> Result<()> {
        let txn = self.write_conn().begin().await?;
        let mut aggregate = footprint_on(&txn, id).await?;

        aggregate.remove_attachment(attachment_id)?;

        let orphans: Vec<Uuid> = aggregate.take_orphans().into_iter().map(|a| a.id).collect();
        FootprintAttachmentEntity::delete_many()
            .filter(FootprintAttachmentColumn::Id.is_in(orphans))
            .exec(&txn)
            .await?;
        txn.commit().await?;

        metrics::record_catalog_mutation("footprint_attachment", "delete");
        info!(footprint_id = %id, attachment_id = %attachment_id, "Footprint attachment removed");

        Ok(())
    }

    /// Delete a footprint together with its image and attachments
    pub async fn delete_footprint(&self, id: Uuid) -> Result<bool> {
        let txn = self.write_conn().begin().await?;

        FootprintImageEntity::delete_many()
            .filter(FootprintImageColumn::FootprintId.eq(id))
            .exec(&txn)
            .await?;

        FootprintAttachmentEntity::delete_many()
            .filter(FootprintAttachmentColumn::FootprintId.eq(id))
            .exec(&txn)
            .await?;

        let result = FootprintEntity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        if result.rows_affected > 0 {
            metrics::record_catalog_mutation("footprint", "delete");
        }

        Ok(result.rows_affected > 0)
    }
}

async fn category_on<C: ConnectionTrait>(conn: &C, id: Uuid) -> Result<FootprintCategory> {
    FootprintCategoryEntity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::CategoryNotFound { id: id.to_string() })
}

async fn footprint_on<C: ConnectionTrait>(conn: &C, id: Uuid) -> Result<FootprintAggregate> {
    let footprint = FootprintEntity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::FootprintNotFound { id: id.to_string() })?;

    aggregate_for(conn, footprint).await
}

async fn aggregate_for<C: ConnectionTrait>(conn: &C, footprint: Footprint) -> Result<FootprintAggregate> {
    let category = match footprint.category_id {
        Some(_) => footprint.find_related(FootprintCategoryEntity).one(conn).await?,
        None => None,
    };

    let image = footprint.find_related(FootprintImageEntity).one(conn).await?;

    let attachments = footprint
        .find_related(FootprintAttachmentEntity)
        .order_by_asc(FootprintAttachmentColumn::CreatedAt)
        .all(conn)
        .await?;

    Ok(FootprintAggregate::from_parts(footprint, category, image, attachments))
}

/// Load every category with `SELECT ... FOR UPDATE`, in id order.
///
/// Structural changes read the tree through this so concurrent moves queue
/// behind each other and validate against committed parent pointers.
async fn locked_category_tree<C: ConnectionTrait>(conn: &C) -> Result<CategoryTree> {
    let rows = FootprintCategoryEntity::find()
        .order_by_asc(FootprintCategoryColumn::Id)
        .lock_exclusive()
        .all(conn)
        .await?;

    Ok(CategoryTree::from_categories(rows))
}

/// Rewrite `lft`/`rgt`/`lvl` and `category_path` for every category whose
/// stored values differ from the ones derived from parent pointers.
/// Returns the number of rows rewritten.
async fn refresh_category_tree<C: ConnectionTrait>(conn: &C) -> Result<usize> {
    let started = Instant::now();

    let tree = locked_category_tree(conn).await?;
    let bounds = tree.rebuild_nested_set()?;
    let mut paths = tree.category_paths()?;

    let mut updated = 0;
    for b in bounds {
        let path = paths.remove(&b.id);
        let unchanged = tree.get(b.id).is_some_and(|node| {
            node.lft == b.lft && node.rgt == b.rgt && node.lvl == b.lvl && node.category_path == path
        });
        if unchanged {
            continue;
        }

        FootprintCategoryEntity::update_many()
            .col_expr(FootprintCategoryColumn::Lft, Expr::value(b.lft))
            .col_expr(FootprintCategoryColumn::Rgt, Expr::value(b.rgt))
            .col_expr(FootprintCategoryColumn::Lvl, Expr::value(b.lvl))
            .col_expr(FootprintCategoryColumn::CategoryPath, Expr::value(path))
            .filter(FootprintCategoryColumn::Id.eq(b.id))
            .exec(conn)
            .await?;
        updated += 1;
    }

    metrics::record_tree_rebuild(started.elapsed().as_secs_f64(), tree.len());
    debug!(nodes = tree.len(), updated, "Category tree refreshed");

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Value};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn category(id: u128, name: &str, parent: Option<u128>) -> FootprintCategory {
        let now = chrono::Utc::now();
        FootprintCategory {
            id: Uuid::from_u128(id),
            parent_id: parent.map(Uuid::from_u128),
            name: name.to_string(),
            description: None,
            lft: 0,
            rgt: 0,
            lvl: 0,
            category_path: None,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    fn placed(mut row: FootprintCategory, lft: i32, rgt: i32, lvl: i32, path: &str) -> FootprintCategory {
        row.lft = lft;
        row.rgt = rgt;
        row.lvl = lvl;
        row.category_path = Some(path.to_string());
        row
    }

    fn footprint(id: u128, name: &str) -> Footprint {
        let now = chrono::Utc::now();
        Footprint {
            id: Uuid::from_u128(id),
            name: name.to_string(),
            description: None,
            category_id: None,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    fn attachment(id: u128, footprint_id: u128) -> FootprintAttachment {
        FootprintAttachment {
            id: Uuid::from_u128(id),
            footprint_id: Some(Uuid::from_u128(footprint_id)),
            filename: format!("{}.pdf", id),
            original_filename: "datasheet.pdf".to_string(),
            mimetype: "application/pdf".to_string(),
            size: 2048,
            extension: Some("pdf".to_string()),
            description: None,
            created_at: chrono::Utc::now().into(),
        }
    }

    fn image(id: u128, footprint_id: u128) -> FootprintImage {
        FootprintImage {
            id: Uuid::from_u128(id),
            footprint_id: Uuid::from_u128(footprint_id),
            filename: format!("{}.png", id),
            original_filename: "sot23.png".to_string(),
            mimetype: "image/png".to_string(),
            size: 512,
            extension: Some("png".to_string()),
            description: None,
            created_at: chrono::Utc::now().into(),
        }
    }

    fn count_row(n: i64) -> BTreeMap<&'static str, Value> {
        BTreeMap::from([("num_items", Value::BigInt(Some(n)))])
    }

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult { last_insert_id: 0, rows_affected }
    }

    fn repo(db: MockDatabase) -> Repository {
        Repository::new(DbPool::from_connection(db.into_connection()))
    }

    /// Every statement the repository sent, with parameters inlined
    fn statements(repository: Repository) -> Vec<String> {
        let conn = Arc::try_unwrap(repository.pool.primary)
            .ok()
            .expect("connection still shared");

        conn.into_transaction_log()
            .iter()
            .flat_map(|txn| txn.statements().iter().map(ToString::to_string))
            .collect()
    }

    fn quoted(id: u128) -> String {
        format!("'{}'", Uuid::from_u128(id))
    }

    #[tokio::test]
    async fn test_category_path_from_stored_rows() {
        let repository = repo(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([vec![
                category(1, "Passive", None),
                category(2, "Resistors", Some(1)),
                category(3, "0805", Some(2)),
            ]]),
        );

        let path = repository.category_path(Uuid::from_u128(3)).await.unwrap();
        assert_eq!(path, "Passive / Resistors / 0805");
    }

    #[tokio::test]
    async fn test_missing_footprint_is_none() {
        let repository = repo(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<Footprint>::new()]),
        );

        assert!(repository.find_footprint(Uuid::from_u128(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_children_of_unknown_category() {
        let repository = repo(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<FootprintCategory>::new()]),
        );

        let err = repository.category_children(Uuid::from_u128(4)).await.unwrap_err();
        assert!(matches!(err, AppError::CategoryNotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_footprints_starts_at_requested_offset() {
        let repository = repo(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![count_row(12)]])
                .append_query_results([vec![footprint(6, "SOIC-8"), footprint(7, "SOT-23")]]),
        );

        let page = repository.list_footprints(5, 10).await.unwrap();
        assert_eq!(page.total, 12);
        assert_eq!(page.items.len(), 2);

        let log = statements(repository);
        let select = log.iter().find(|sql| sql.contains("ORDER BY")).unwrap();
        assert!(select.ends_with("LIMIT 10 OFFSET 5"), "{}", select);
    }

    #[tokio::test]
    async fn test_create_category_fills_bounds_and_path() {
        let repository = repo(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([
                    // locked tree before the insert
                    vec![placed(category(1, "Passive", None), 1, 2, 0, "Passive")],
                    // INSERT ... RETURNING
                    vec![category(2, "Resistors", Some(1))],
                    // locked tree for the rebuild
                    vec![
                        placed(category(1, "Passive", None), 1, 2, 0, "Passive"),
                        category(2, "Resistors", Some(1)),
                    ],
                    // re-read of the created row
                    vec![placed(category(2, "Resistors", Some(1)), 2, 3, 1, "Passive / Resistors")],
                ])
                .append_exec_results([exec(1), exec(1)]),
        );

        let created = repository
            .create_category(CategoryInput {
                name: "Resistors".to_string(),
                description: None,
                parent_id: Some(Uuid::from_u128(1)),
            })
            .await
            .unwrap();
        assert_eq!((created.lft, created.rgt, created.lvl), (2, 3, 1));
        assert_eq!(created.category_path.as_deref(), Some("Passive / Resistors"));

        let log = statements(repository);
        assert_eq!(log.first().map(String::as_str), Some("BEGIN"));
        assert!(log[1].ends_with("FOR UPDATE"), "{}", log[1]);
        assert!(log.iter().any(|sql| sql.starts_with("INSERT INTO \"footprint_categories\"")));

        let updates: Vec<&String> = log.iter().filter(|sql| sql.starts_with("UPDATE")).collect();
        assert_eq!(updates.len(), 2);
        assert!(updates.iter().any(|sql| sql.contains("\"rgt\" = 4") && sql.contains(&quoted(1))));
        assert!(updates.iter().any(|sql| sql.contains("'Passive / Resistors'") && sql.contains(&quoted(2))));
        assert_eq!(log.last().map(String::as_str), Some("COMMIT"));
    }

    #[tokio::test]
    async fn test_create_category_under_unknown_parent() {
        let repository = repo(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<FootprintCategory>::new()]),
        );

        let err = repository
            .create_category(CategoryInput {
                name: "Orphan".to_string(),
                description: None,
                parent_id: Some(Uuid::from_u128(9)),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::CategoryNotFound { .. }));

        let log = statements(repository);
        assert!(!log.iter().any(|sql| sql.starts_with("INSERT")));
        assert_eq!(log.last().map(String::as_str), Some("ROLLBACK"));
    }

    #[tokio::test]
    async fn test_move_below_descendant_writes_nothing() {
        let repository = repo(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([vec![
                category(1, "A", None),
                category(2, "B", Some(1)),
                category(3, "C", Some(2)),
            ]]),
        );

        let err = repository
            .move_category(Uuid::from_u128(1), Some(Uuid::from_u128(3)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCategoryMove { .. }));

        let log = statements(repository);
        assert!(log[1].ends_with("FOR UPDATE"), "{}", log[1]);
        assert!(!log.iter().any(|sql| sql.starts_with("UPDATE")));
        assert_eq!(log.last().map(String::as_str), Some("ROLLBACK"));
    }

    #[tokio::test]
    async fn test_move_rebuilds_bounds_and_paths() {
        let root = || placed(category(1, "Root", None), 1, 6, 0, "Root");
        let repository = repo(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([
                    vec![
                        root(),
                        placed(category(2, "A", Some(1)), 2, 3, 1, "Root / A"),
                        placed(category(3, "B", Some(1)), 4, 5, 1, "Root / B"),
                    ],
                    // UPDATE ... RETURNING for the moved row
                    vec![category(3, "B", Some(2))],
                    vec![
                        root(),
                        placed(category(2, "A", Some(1)), 2, 3, 1, "Root / A"),
                        {
                            let mut b = category(3, "B", Some(2));
                            b.category_path = Some("Root / B".to_string());
                            b
                        },
                    ],
                    vec![placed(category(3, "B", Some(2)), 3, 4, 2, "Root / A / B")],
                ])
                .append_exec_results([exec(1), exec(1)]),
        );

        let moved = repository
            .move_category(Uuid::from_u128(3), Some(Uuid::from_u128(2)))
            .await
            .unwrap();
        assert_eq!(moved.parent_id, Some(Uuid::from_u128(2)));
        assert_eq!(moved.category_path.as_deref(), Some("Root / A / B"));

        let log = statements(repository);
        let updates: Vec<&String> = log.iter().filter(|sql| sql.starts_with("UPDATE")).collect();
        // the re-parent itself plus A and B; Root keeps its bounds
        assert_eq!(updates.len(), 3);
        assert!(updates[0].contains(&format!("\"parent_id\" = {}", quoted(2))));
        assert!(updates.iter().any(|sql| sql.contains("\"rgt\" = 5") && sql.contains(&quoted(2))));
        assert!(updates.iter().any(|sql| sql.contains("'Root / A / B'") && sql.contains(&quoted(3))));
        assert!(!updates.iter().any(|sql| sql.ends_with(&format!("= {}", quoted(1)))));
        assert_eq!(log.last().map(String::as_str), Some("COMMIT"));
    }

    #[tokio::test]
    async fn test_delete_category_removes_whole_subtree() {
        let repository = repo(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![
                    placed(category(1, "Keep", None), 1, 2, 0, "Keep"),
                    placed(category(2, "SMD", None), 3, 6, 0, "SMD"),
                    placed(category(3, "SOT", Some(2)), 4, 5, 1, "SMD / SOT"),
                ]])
                .append_query_results([vec![count_row(0)]])
                .append_query_results([vec![placed(category(1, "Keep", None), 1, 2, 0, "Keep")]])
                .append_exec_results([exec(2)]),
        );

        let removed = repository.delete_category(Uuid::from_u128(2)).await.unwrap();
        assert_eq!(removed, 2);

        let log = statements(repository);
        let deletes: Vec<&String> = log.iter().filter(|sql| sql.starts_with("DELETE")).collect();
        assert_eq!(deletes.len(), 1);
        assert!(deletes[0].contains(&quoted(2)) && deletes[0].contains(&quoted(3)));
        assert!(!deletes[0].contains(&quoted(1)));
        assert!(!log.iter().any(|sql| sql.starts_with("UPDATE")));
        assert_eq!(log.last().map(String::as_str), Some("COMMIT"));
    }

    #[tokio::test]
    async fn test_delete_category_in_use_is_refused() {
        let repository = repo(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![
                    category(1, "SMD", None),
                    category(2, "SOT", Some(1)),
                ]])
                .append_query_results([vec![count_row(1)]]),
        );

        let err = repository.delete_category(Uuid::from_u128(1)).await.unwrap_err();
        assert!(matches!(err, AppError::CategoryInUse { footprints: 1, .. }));

        let log = statements(repository);
        let count = log.iter().find(|sql| sql.contains("COUNT(*)")).unwrap();
        assert!(count.contains(&quoted(1)) && count.contains(&quoted(2)));
        assert!(!log.iter().any(|sql| sql.starts_with("DELETE") || sql.starts_with("UPDATE")));
        assert_eq!(log.last().map(String::as_str), Some("ROLLBACK"));
    }

    #[tokio::test]
    async fn test_replacing_image_deletes_previous_row_first() {
        let repository = repo(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![footprint(1, "SOT-23")]])
                .append_query_results([vec![image(20, 1)]])
                .append_query_results([Vec::<FootprintAttachment>::new()])
                .append_query_results([vec![image(21, 1)]])
                .append_exec_results([exec(1)]),
        );

        repository
            .set_footprint_image(
                Uuid::from_u128(1),
                UploadInput {
                    original_filename: "sot23-top.PNG".to_string(),
                    mimetype: "image/png".to_string(),
                    size: 640,
                    description: None,
                },
            )
            .await
            .unwrap();

        let log = statements(repository);
        let delete = log.iter().position(|sql| sql.starts_with("DELETE FROM \"footprint_images\"")).unwrap();
        let insert = log.iter().position(|sql| sql.starts_with("INSERT INTO \"footprint_images\"")).unwrap();
        assert!(delete < insert);
        assert!(log[delete].contains(&quoted(20)));
        assert!(log[insert].contains("'png'"));
    }

    #[tokio::test]
    async fn test_removed_attachment_row_is_deleted() {
        let repository = repo(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![footprint(1, "SOT-23")]])
                .append_query_results([Vec::<FootprintImage>::new()])
                .append_query_results([vec![attachment(10, 1), attachment(11, 1)]])
                .append_exec_results([exec(1)]),
        );

        repository
            .remove_footprint_attachment(Uuid::from_u128(1), Uuid::from_u128(10))
            .await
            .unwrap();

        let log = statements(repository);
        let deletes: Vec<&String> = log.iter().filter(|sql| sql.starts_with("DELETE")).collect();
        assert_eq!(deletes.len(), 1);
        assert!(deletes[0].starts_with("DELETE FROM \"footprint_attachments\""));
        assert!(deletes[0].contains(&quoted(10)));
        assert!(!deletes[0].contains(&quoted(11)));
        assert_eq!(log.last().map(String::as_str), Some("COMMIT"));
    }

    #[tokio::test]
    async fn test_removing_unknown_attachment_deletes_nothing() {
        let repository = repo(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![footprint(1, "SOT-23")]])
                .append_query_results([Vec::<FootprintImage>::new()])
                .append_query_results([vec![attachment(10, 1)]]),
        );

        let err = repository
            .remove_footprint_attachment(Uuid::from_u128(1), Uuid::from_u128(99))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AttachmentNotFound { .. }));

        let log = statements(repository);
        assert!(!log.iter().any(|sql| sql.starts_with("DELETE")));
    }

    #[tokio::test]
    async fn test_delete_footprint_cascades_owned_rows() {
        let repository = repo(
            MockDatabase::new(DatabaseBackend::Postgres).append_exec_results([
                exec(0),
                exec(2),
                exec(1),
            ]),
        );

        assert!(repository.delete_footprint(Uuid::from_u128(1)).await.unwrap());

        let log = statements(repository);
        let deletes: Vec<&String> = log.iter().filter(|sql| sql.starts_with("DELETE")).collect();
        assert_eq!(deletes.len(), 3);
        assert!(deletes[0].starts_with("DELETE FROM \"footprint_images\""));
        assert!(deletes[1].starts_with("DELETE FROM \"footprint_attachments\""));
        assert!(deletes[2].starts_with("DELETE FROM \"footprints\""));
        assert_eq!(log.last().map(String::as_str), Some("COMMIT"));
    }
}
