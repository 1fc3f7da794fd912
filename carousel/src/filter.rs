use std::collections::HashSet;

use crate::{GroupSource, ItemId};

/// The output of a filter pass: which items are hidden, and optionally the group display order.
///
/// The carousel treats this as authoritative. When `order` is set, groups missing from it are
/// hidden as well.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Visibility {
    hidden: HashSet<ItemId>,
    order: Option<Vec<ItemId>>,
}

impl Visibility {
    /// Everything visible, backing-store order.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn hide(&mut self, id: ItemId) {
        self.hidden.insert(id);
    }

    pub fn hidden(mut self, ids: impl IntoIterator<Item = ItemId>) -> Self {
        self.hidden.extend(ids);
        self
    }

    pub fn with_order(mut self, order: Vec<ItemId>) -> Self {
        self.order = Some(order);
        self
    }

    pub fn is_hidden(&self, id: ItemId) -> bool {
        self.hidden.contains(&id)
    }

    pub fn order(&self) -> Option<&[ItemId]> {
        self.order.as_deref()
    }
}

/// The external filtering/search engine.
///
/// Invoked on every filter-criteria change with the full backing collection.
pub trait FilterEngine {
    fn evaluate(&self, groups: &[GroupSource]) -> Visibility;
}

impl<F> FilterEngine for F
where
    F: Fn(&[GroupSource]) -> Visibility,
{
    fn evaluate(&self, groups: &[GroupSource]) -> Visibility {
        self(groups)
    }
}
