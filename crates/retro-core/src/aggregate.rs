//! Merge child retrospectives' roses, buds and thorns into a parent view.
//!
//! A multi-day trip is usually recorded as one parent retrospective with a
//! child per day or stop. [`aggregate`] produces the combined lists the
//! parent shows when children are folded in: the parent's own items first,
//! then each child's items in child-list order.
//!
//! The merge is pure. [`aggregate_store`] is the convenience that loads the
//! parent and the direct children a viewer may see from the store first.

use rusqlite::Connection;
use serde::Serialize;

use crate::db::query;
use crate::error::{Result, RetroError};
use crate::model::{Category, RbtItem, Retrospective};

/// Which lists a caller renders. Both are always computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RbtView {
    ParentOnly,
    #[default]
    Merged,
}

impl RbtView {
    #[must_use]
    pub const fn from_toggle(merge_children: bool) -> Self {
        if merge_children {
            Self::Merged
        } else {
            Self::ParentOnly
        }
    }
}

/// Combined RBT lists for a parent and its children.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct MergedRbt {
    pub roses: Vec<RbtItem>,
    pub buds: Vec<RbtItem>,
    pub thorns: Vec<RbtItem>,
    /// Items contributed by children across all three categories.
    pub merged_count: usize,
}

impl MergedRbt {
    #[must_use]
    pub fn items(&self, category: Category) -> &[RbtItem] {
        match category {
            Category::Rose => &self.roses,
            Category::Bud => &self.buds,
            Category::Thorn => &self.thorns,
        }
    }

    /// The lists to render for `view`: the merged ones, or the parent's own.
    #[must_use]
    pub fn view<'a>(
        &'a self,
        view: RbtView,
        parent: &'a Retrospective,
        category: Category,
    ) -> &'a [RbtItem] {
        match view {
            RbtView::Merged => self.items(category),
            RbtView::ParentOnly => parent.items(category),
        }
    }
}

/// Concatenate `parent`'s items with those of each child, parent first.
#[must_use]
pub fn aggregate(parent: &Retrospective, children: &[Retrospective]) -> MergedRbt {
    let mut merged = MergedRbt {
        roses: parent.roses.clone(),
        buds: parent.buds.clone(),
        thorns: parent.thorns.clone(),
        merged_count: 0,
    };

    for child in children {
        merged.roses.extend_from_slice(&child.roses);
        merged.buds.extend_from_slice(&child.buds);
        merged.thorns.extend_from_slice(&child.thorns);
        merged.merged_count += child.item_count();
    }

    merged
}

/// Load `parent_id` and its direct children, then [`aggregate`] them.
///
/// Children are taken in creation order, matching `get_children`. Private
/// children `viewer` cannot see contribute nothing.
///
/// # Errors
///
/// Returns [`RetroError::NotFound`] if the parent does not exist, or
/// [`RetroError::Db`] for store failures.
pub fn aggregate_store(
    conn: &Connection,
    parent_id: &str,
    viewer: Option<&str>,
) -> Result<(Retrospective, MergedRbt)> {
    let parent = query::get_retro(conn, parent_id)?
        .ok_or_else(|| RetroError::not_found("retrospective", parent_id))?;
    let mut children = query::get_children(conn, parent_id)?;
    let total = children.len();
    children.retain(|child| child.is_visible_to(viewer));
    tracing::debug!(
        parent = %parent_id,
        children = children.len(),
        hidden = total - children.len(),
        "aggregating child RBT items"
    );
    let merged = aggregate(&parent, &children);
    Ok((parent, merged))
}
