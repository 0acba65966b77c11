//! In-memory footprint category tree
//!
//! Built from the flat category rows, it resolves category paths, answers
//! ancestor/descendant queries and recomputes nested-set bounds from the
//! parent pointers.

use crate::db::models::FootprintCategory;
use crate::errors::{AppError, Result};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Separator placed between ancestor names in a category path
pub const CATEGORY_PATH_SEPARATOR: &str = " / ";

/// Nested-set position computed for one category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NestedBounds {
    pub id: Uuid,
    pub lft: i32,
    pub rgt: i32,
    pub lvl: i32,
}

/// Category forest keyed by id
#[derive(Debug, Clone, Default)]
pub struct CategoryTree {
    /// All categories by id
    nodes: HashMap<Uuid, FootprintCategory>,

    /// parent id -> child ids in sibling order
    children: HashMap<Uuid, Vec<Uuid>>,

    /// Categories without a (known) parent, in sibling order
    roots: Vec<Uuid>,
}

impl CategoryTree {
    /// Build the tree from category rows in any order.
    ///
    /// A row whose parent is not among the rows is treated as a root.
    pub fn from_categories(categories: impl IntoIterator<Item = FootprintCategory>) -> Self {
        let nodes: HashMap<Uuid, FootprintCategory> = categories
            .into_iter()
            .map(|category| (category.id, category))
            .collect();

        let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        let mut roots = Vec::new();

        for node in nodes.values() {
            match node.parent_id {
                Some(parent_id) if nodes.contains_key(&parent_id) => {
                    children.entry(parent_id).or_default().push(node.id);
                }
                _ => roots.push(node.id),
            }
        }

        let sort_key = |id: &Uuid| {
            let node = &nodes[id];
            (!node.is_ranked(), node.lft, node.name.clone(), node.id)
        };
        roots.sort_by_key(sort_key);
        for siblings in children.values_mut() {
            siblings.sort_by_key(sort_key);
        }

        Self { nodes, children, roots }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&FootprintCategory> {
        self.nodes.get(&id)
    }

    /// Root categories in sibling order
    pub fn roots(&self) -> Vec<&FootprintCategory> {
        self.roots.iter().map(|id| &self.nodes[id]).collect()
    }

    /// Direct children of a category, ordered by `lft`
    pub fn children(&self, id: Uuid) -> Vec<&FootprintCategory> {
        self.child_ids(id).iter().map(|child| &self.nodes[child]).collect()
    }

    fn child_ids(&self, id: Uuid) -> &[Uuid] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    fn node(&self, id: Uuid) -> Result<&FootprintCategory> {
        self.nodes
            .get(&id)
            .ok_or_else(|| AppError::CategoryNotFound { id: id.to_string() })
    }

    /// Ancestors of a category ordered root first, the category itself excluded
    pub fn ancestors(&self, id: Uuid) -> Result<Vec<&FootprintCategory>> {
        let mut chain = self.chain_to_root(id)?;
        chain.remove(0);
        chain.reverse();
        Ok(chain)
    }

    /// All descendants in pre-order
    pub fn descendants(&self, id: Uuid) -> Result<Vec<&FootprintCategory>> {
        self.node(id)?;

        let mut out = Vec::new();
        let mut seen = HashSet::from([id]);
        let mut stack: Vec<Uuid> = self.child_ids(id).iter().rev().copied().collect();

        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                return Err(AppError::CategoryCycle { id: current.to_string() });
            }
            out.push(&self.nodes[&current]);
            stack.extend(self.child_ids(current).iter().rev());
        }

        Ok(out)
    }

    /// Walk from `id` up to its root, returning the nodes node-first.
    fn chain_to_root(&self, id: Uuid) -> Result<Vec<&FootprintCategory>> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(id);

        while let Some(node_id) = current {
            if !seen.insert(node_id) {
                return Err(AppError::CategoryCycle { id: id.to_string() });
            }
            let node = self.node(node_id)?;
            chain.push(node);
            current = node.parent_id.filter(|parent| self.nodes.contains_key(parent));
        }

        Ok(chain)
    }

    /// Human-readable path of a category: ancestor names from the root down
    /// to the category itself, joined by `" / "`. A root yields its own name.
    pub fn generate_category_path(&self, id: Uuid) -> Result<String> {
        let names: Vec<&str> = self
            .chain_to_root(id)?
            .into_iter()
            .rev()
            .map(|node| node.name.as_str())
            .collect();

        Ok(names.join(CATEGORY_PATH_SEPARATOR))
    }

    /// Paths for every category in the tree
    pub fn category_paths(&self) -> Result<HashMap<Uuid, String>> {
        self.nodes
            .keys()
            .map(|&id| Ok((id, self.generate_category_path(id)?)))
            .collect()
    }

    /// True when `ancestor` lies on the parent chain of `candidate`
    pub fn is_descendant(&self, candidate: Uuid, ancestor: Uuid) -> Result<bool> {
        Ok(self
            .chain_to_root(candidate)?
            .iter()
            .skip(1)
            .any(|node| node.id == ancestor))
    }

    /// Check that `id` may be re-parented under `new_parent`
    pub fn validate_move(&self, id: Uuid, new_parent: Option<Uuid>) -> Result<()> {
        self.node(id)?;

        let Some(parent_id) = new_parent else {
            return Ok(());
        };
        self.node(parent_id)?;

        if parent_id == id {
            return Err(AppError::InvalidCategoryMove {
                message: format!("category {} cannot be its own parent", id),
            });
        }
        if self.is_descendant(parent_id, id)? {
            return Err(AppError::InvalidCategoryMove {
                message: format!("category {} cannot move below its descendant {}", id, parent_id),
            });
        }

        Ok(())
    }

    /// Recompute nested-set bounds for the whole forest from parent pointers.
    ///
    /// Roots and siblings keep their current order; unranked nodes go last.
    /// Numbering is a single pre-order counter across all roots, so sorting
    /// by `lft` lists the forest depth-first.
    pub fn rebuild_nested_set(&self) -> Result<Vec<NestedBounds>> {
        let mut bounds: Vec<NestedBounds> = Vec::with_capacity(self.nodes.len());
        let mut counter = 0;
        let mut stack: Vec<Visit> = self
            .roots
            .iter()
            .rev()
            .map(|&id| Visit::Enter { id, lvl: 0 })
            .collect();

        while let Some(visit) = stack.pop() {
            match visit {
                Visit::Enter { id, lvl } => {
                    counter += 1;
                    stack.push(Visit::Leave { slot: bounds.len() });
                    bounds.push(NestedBounds { id, lft: counter, rgt: 0, lvl });
                    stack.extend(
                        self.child_ids(id)
                            .iter()
                            .rev()
                            .map(|&child| Visit::Enter { id: child, lvl: lvl + 1 }),
                    );
                }
                Visit::Leave { slot } => {
                    counter += 1;
                    bounds[slot].rgt = counter;
                }
            }
        }

        // Nodes on a parent cycle are never reached from a root
        if bounds.len() != self.nodes.len() {
            let reached: HashSet<Uuid> = bounds.iter().map(|b| b.id).collect();
            let stray = self
                .nodes
                .keys()
                .find(|id| !reached.contains(id))
                .copied()
                .unwrap_or_default();
            return Err(AppError::CategoryCycle { id: stray.to_string() });
        }

        Ok(bounds)
    }
}

/// Pre-order walk step used by the nested-set rebuild
enum Visit {
    Enter { id: Uuid, lvl: i32 },
    Leave { slot: usize },
}
