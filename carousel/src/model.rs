use std::collections::HashMap;

use crate::{ItemId, ItemKind, ItemState, Visibility, VisibleEntry};

/// A child as supplied by the backing store.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChildSource {
    pub id: ItemId,
    pub height: f32,
    /// Remote identity used for enrichment lookups and background choice.
    pub online_id: Option<u64>,
}

impl ChildSource {
    pub fn new(id: ItemId, height: f32) -> Self {
        Self {
            id,
            height,
            online_id: None,
        }
    }

    pub fn with_online_id(mut self, online_id: u64) -> Self {
        self.online_id = Some(online_id);
        self
    }
}

/// A group as supplied by the backing store.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GroupSource {
    pub id: ItemId,
    pub header_height: f32,
    pub children: Vec<ChildSource>,
}

impl GroupSource {
    pub fn new(id: ItemId, header_height: f32) -> Self {
        Self {
            id,
            header_height,
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: ChildSource) -> Self {
        self.children.push(child);
        self
    }
}

/// The laid-out extent of one visible group, children included when selected.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GroupSpan {
    pub id: ItemId,
    pub y: f32,
    pub total_height: f32,
}

impl GroupSpan {
    pub fn end(&self) -> f32 {
        self.y + self.total_height
    }
}

/// Child `y` is only stored for groups laid out expanded; collapsed groups compute it on demand.
#[derive(Clone, Debug)]
struct ChildNode {
    id: ItemId,
    height: f32,
    online_id: Option<u64>,
    visible: bool,
    state: ItemState,
    y: f32,
}

#[derive(Clone, Debug)]
struct GroupNode {
    id: ItemId,
    header_height: f32,
    visible: bool,
    state: ItemState,
    /// Whether the last layout pass walked this group's children.
    expanded: bool,
    y: f32,
    total_height: f32,
    children: Vec<ChildNode>,
}

impl GroupNode {
    /// `(y, total_height)` of child `ci` as of the last layout pass.
    fn child_layout(&self, ci: usize) -> (f32, f32) {
        let c = &self.children[ci];
        if self.expanded {
            let total = if c.visible { c.height } else { 0.0 };
            return (c.y, total);
        }
        let y = self.children[..ci]
            .iter()
            .filter(|c| c.visible)
            .map(|c| c.height)
            .sum();
        (y, 0.0)
    }
}

#[derive(Clone, Copy, Debug)]
enum Slot {
    Group(usize),
    Child(usize, usize),
}

/// Logical carousel entries: visibility, selection state and computed layout.
///
/// Layout is not recomputed on mutation. Mutations mark the model dirty and the next
/// [`ItemModel::recompute_if_dirty`] call performs a single O(visible) walk, so any number of
/// changes within a frame coalesce into one pass.
///
/// Coordinates: a group's `y` is absolute (the sum of `total_height` over preceding visible
/// groups). A child's `y` is relative to its group's child area (the sum of heights of preceding
/// visible siblings); its absolute offset is `group.y + header_height + child.y`.
#[derive(Clone, Debug, Default)]
pub struct ItemModel {
    sources: Vec<GroupSource>,
    groups: Vec<GroupNode>,
    slots: HashMap<ItemId, Slot>,
    order: Vec<usize>,
    entries: Vec<VisibleEntry>,
    spans: Vec<GroupSpan>,
    /// Groups whose children the last layout pass walked.
    expanded: Vec<usize>,
    content_height: f32,
    dirty: bool,
    layout_passes: u64,
}

impl ItemModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a model with every item visible and runs the initial layout pass.
    pub fn from_groups(groups: Vec<GroupSource>) -> Self {
        let mut model = Self::new();
        model.set_groups(groups);
        model.recompute_layout();
        model
    }

    /// Replaces the backing collection.
    ///
    /// Items that survive (by identity) keep their visibility and selection state; new items
    /// start visible and not selected. The group order resets to backing-store order until the
    /// next filter pass.
    pub fn set_groups(&mut self, groups: Vec<GroupSource>) {
        let mut previous: HashMap<ItemId, (bool, ItemState)> = HashMap::new();
        for g in &self.groups {
            previous.insert(g.id, (g.visible, g.state));
            for c in &g.children {
                previous.insert(c.id, (c.visible, c.state));
            }
        }

        let restore = |id: ItemId| {
            previous
                .get(&id)
                .copied()
                .unwrap_or((true, ItemState::NotSelected))
        };

        self.slots.clear();
        self.groups = groups
            .iter()
            .enumerate()
            .map(|(gi, g)| {
                self.slots.insert(g.id, Slot::Group(gi));
                let (visible, state) = restore(g.id);
                let children = g
                    .children
                    .iter()
                    .enumerate()
                    .map(|(ci, c)| {
                        self.slots.insert(c.id, Slot::Child(gi, ci));
                        let (visible, state) = restore(c.id);
                        ChildNode {
                            id: c.id,
                            height: c.height,
                            online_id: c.online_id,
                            visible,
                            state,
                            y: 0.0,
                        }
                    })
                    .collect();
                GroupNode {
                    id: g.id,
                    header_height: g.header_height,
                    visible,
                    state,
                    expanded: false,
                    y: 0.0,
                    total_height: 0.0,
                    children,
                }
            })
            .collect();
        self.order = (0..self.groups.len()).collect();
        self.expanded.clear();
        self.sources = groups;
        ctrace!(groups = self.groups.len(), "ItemModel::set_groups");
        self.dirty = true;
    }

    pub fn insert_group(&mut self, index: usize, group: GroupSource) {
        let mut sources = core::mem::take(&mut self.sources);
        let index = index.min(sources.len());
        sources.insert(index, group);
        self.set_groups(sources);
    }

    /// Removes a group and its children. Returns `false` if `id` is not a known group.
    pub fn remove_group(&mut self, id: ItemId) -> bool {
        let Some(Slot::Group(gi)) = self.slots.get(&id).copied() else {
            return false;
        };
        let mut sources = core::mem::take(&mut self.sources);
        sources.remove(gi);
        self.set_groups(sources);
        true
    }

    /// The backing collection, in backing-store order.
    pub fn sources(&self) -> &[GroupSource] {
        &self.sources
    }

    /// Applies the filter engine's output.
    pub fn apply_visibility(&mut self, visibility: &Visibility) {
        for g in &mut self.groups {
            g.visible = !visibility.is_hidden(g.id);
            for c in &mut g.children {
                c.visible = !visibility.is_hidden(c.id);
            }
        }

        match visibility.order() {
            Some(order) => {
                let mut seen = vec![false; self.groups.len()];
                self.order.clear();
                for id in order {
                    if let Some(Slot::Group(gi)) = self.slots.get(id).copied() {
                        if !seen[gi] {
                            seen[gi] = true;
                            self.order.push(gi);
                        }
                    }
                }
                for (gi, g) in self.groups.iter_mut().enumerate() {
                    if !seen[gi] {
                        g.visible = false;
                    }
                }
            }
            None => {
                self.order = (0..self.groups.len()).collect();
            }
        }

        self.dirty = true;
    }

    /// Sets an item's selection state. Returns `true` if the state changed.
    pub(crate) fn set_state(&mut self, id: ItemId, state: ItemState) -> bool {
        let current = match self.slots.get(&id).copied() {
            Some(Slot::Group(gi)) => &mut self.groups[gi].state,
            Some(Slot::Child(gi, ci)) => &mut self.groups[gi].children[ci].state,
            None => return false,
        };
        if *current == state {
            return false;
        }
        *current = state;
        self.dirty = true;
        true
    }

    /// Marks every child of `group` `NotSelected`, hidden ones included.
    pub(crate) fn clear_child_selection(&mut self, group: ItemId) {
        let Some(Slot::Group(gi)) = self.slots.get(&group).copied() else {
            return;
        };
        for c in &mut self.groups[gi].children {
            if c.state != ItemState::NotSelected {
                c.state = ItemState::NotSelected;
                self.dirty = true;
            }
        }
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.slots.contains_key(&id)
    }

    pub fn kind(&self, id: ItemId) -> Option<ItemKind> {
        match self.slots.get(&id)? {
            Slot::Group(_) => Some(ItemKind::Group),
            Slot::Child(gi, _) => Some(ItemKind::Child {
                group: self.groups[*gi].id,
            }),
        }
    }

    pub fn state(&self, id: ItemId) -> Option<ItemState> {
        match self.slots.get(&id)? {
            Slot::Group(gi) => Some(self.groups[*gi].state),
            Slot::Child(gi, ci) => Some(self.groups[*gi].children[*ci].state),
        }
    }

    /// Whether the item is visible. A child is only visible while its group is.
    pub fn is_visible(&self, id: ItemId) -> bool {
        match self.slots.get(&id) {
            Some(Slot::Group(gi)) => self.groups[*gi].visible,
            Some(Slot::Child(gi, ci)) => {
                let g = &self.groups[*gi];
                g.visible && g.children[*ci].visible
            }
            None => false,
        }
    }

    /// The item's `yPosition` as of the last layout pass.
    pub fn y_position(&self, id: ItemId) -> Option<f32> {
        match self.slots.get(&id)? {
            Slot::Group(gi) => Some(self.groups[*gi].y),
            Slot::Child(gi, ci) => Some(self.groups[*gi].child_layout(*ci).0),
        }
    }

    /// The item's offset in the scroll axis as of the last layout pass.
    pub fn absolute_y(&self, id: ItemId) -> Option<f32> {
        match self.slots.get(&id)? {
            Slot::Group(gi) => Some(self.groups[*gi].y),
            Slot::Child(gi, ci) => {
                let g = &self.groups[*gi];
                Some(g.y + g.header_height + g.child_layout(*ci).0)
            }
        }
    }

    /// The item's height contribution: zero while hidden, and zero for children of a collapsed
    /// group.
    pub fn total_height(&self, id: ItemId) -> Option<f32> {
        match self.slots.get(&id)? {
            Slot::Group(gi) => {
                let g = &self.groups[*gi];
                Some(if g.visible { g.total_height } else { 0.0 })
            }
            Slot::Child(gi, ci) => {
                let g = &self.groups[*gi];
                Some(if g.visible { g.child_layout(*ci).1 } else { 0.0 })
            }
        }
    }

    /// The item's own height: the header for groups, the row for children.
    pub fn height(&self, id: ItemId) -> Option<f32> {
        match self.slots.get(&id)? {
            Slot::Group(gi) => Some(self.groups[*gi].header_height),
            Slot::Child(gi, ci) => Some(self.groups[*gi].children[*ci].height),
        }
    }

    pub fn online_id(&self, id: ItemId) -> Option<u64> {
        match self.slots.get(&id)? {
            Slot::Group(_) => None,
            Slot::Child(gi, ci) => self.groups[*gi].children[*ci].online_id,
        }
    }

    pub fn group_of(&self, id: ItemId) -> Option<ItemId> {
        match self.slots.get(&id)? {
            Slot::Group(gi) | Slot::Child(gi, _) => Some(self.groups[*gi].id),
        }
    }

    /// The group's visible children, in backing-store order.
    pub fn visible_children(&self, group: ItemId) -> Vec<ItemId> {
        let Some(Slot::Group(gi)) = self.slots.get(&group) else {
            return Vec::new();
        };
        self.groups[*gi]
            .children
            .iter()
            .filter(|c| c.visible)
            .map(|c| c.id)
            .collect()
    }

    /// The child a group would hand to forward navigation: its selected child if still visible,
    /// otherwise its first visible child.
    pub fn next_to_select(&self, group: ItemId) -> Option<ItemId> {
        let Some(Slot::Group(gi)) = self.slots.get(&group) else {
            return None;
        };
        let children = &self.groups[*gi].children;
        children
            .iter()
            .find(|c| c.visible && c.state == ItemState::Selected)
            .or_else(|| children.iter().find(|c| c.visible))
            .map(|c| c.id)
    }

    /// The visible child whose content backs the group's panel: the lowest `online_id` wins.
    pub fn background_source(&self, group: ItemId) -> Option<ItemId> {
        let Some(Slot::Group(gi)) = self.slots.get(&group) else {
            return None;
        };
        let children = &self.groups[*gi].children;
        children
            .iter()
            .filter(|c| c.visible)
            .filter_map(|c| c.online_id.map(|online| (online, c.id)))
            .min_by_key(|(online, _)| *online)
            .map(|(_, id)| id)
            .or_else(|| children.iter().find(|c| c.visible).map(|c| c.id))
    }

    /// Groups currently in state `Selected`.
    pub fn selected_groups(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.groups
            .iter()
            .filter(|g| g.state == ItemState::Selected)
            .map(|g| g.id)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Forces the next `recompute_if_dirty` call to run a layout pass.
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    /// Runs a layout pass if anything changed since the last one.
    pub fn recompute_if_dirty(&mut self) -> bool {
        if !self.dirty {
            return false;
        }
        self.recompute_layout();
        true
    }

    /// Walks the visible sequence once and assigns every `y` and `total_height`.
    ///
    /// Children are only walked for expanded groups, so a pass costs O(visible items).
    pub fn recompute_layout(&mut self) {
        self.entries.clear();
        self.spans.clear();
        for gi in self.expanded.drain(..) {
            if let Some(g) = self.groups.get_mut(gi) {
                g.expanded = false;
            }
        }

        let mut y = 0.0f32;
        for &gi in &self.order {
            let g = &mut self.groups[gi];
            if !g.visible {
                g.total_height = 0.0;
                continue;
            }

            g.y = y;
            self.entries.push(VisibleEntry {
                id: g.id,
                kind: ItemKind::Group,
                y,
                absolute_y: y,
                height: g.header_height,
            });

            let mut child_y = 0.0f32;
            if g.state == ItemState::Selected {
                g.expanded = true;
                self.expanded.push(gi);
                let child_origin = y + g.header_height;
                for c in &mut g.children {
                    c.y = child_y;
                    if !c.visible {
                        continue;
                    }
                    self.entries.push(VisibleEntry {
                        id: c.id,
                        kind: ItemKind::Child { group: g.id },
                        y: child_y,
                        absolute_y: child_origin + child_y,
                        height: c.height,
                    });
                    child_y += c.height;
                }
            }

            g.total_height = g.header_height + child_y;
            self.spans.push(GroupSpan {
                id: g.id,
                y,
                total_height: g.total_height,
            });
            y += g.total_height;
        }

        self.content_height = y;
        self.dirty = false;
        self.layout_passes = self.layout_passes.saturating_add(1);
        cdebug!(
            visible = self.entries.len(),
            groups = self.spans.len(),
            content_height = self.content_height,
            "ItemModel::recompute_layout"
        );
    }

    /// The ordered visible traversal: groups, and the selected group's visible children.
    pub fn visible_entries(&self) -> &[VisibleEntry] {
        &self.entries
    }

    /// Visible groups in display order, with their laid-out extents.
    pub fn group_spans(&self) -> &[GroupSpan] {
        &self.spans
    }

    /// Visible groups whose extent intersects `[start, end)`.
    pub fn groups_in_range(&self, start: f32, end: f32) -> &[GroupSpan] {
        let first = self.spans.partition_point(|s| s.end() <= start);
        let last = self.spans.partition_point(|s| s.y < end);
        if first >= last {
            return &[];
        }
        &self.spans[first..last]
    }

    pub fn content_height(&self) -> f32 {
        self.content_height
    }

    /// The number of layout passes run so far.
    pub fn layout_passes(&self) -> u64 {
        self.layout_passes
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}
