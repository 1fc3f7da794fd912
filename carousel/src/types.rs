use core::fmt;

/// A stable identity for a group or child, supplied by the backing store.
///
/// Identities drive child-collection diffing and stale-result detection, so they must stay
/// stable across re-filtering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ItemKind {
    Group,
    Child { group: ItemId },
}

impl ItemKind {
    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ItemState {
    #[default]
    NotSelected,
    Selected,
}

/// Expansion phase of a group. Only the selected group is ever outside `Collapsed`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SelectionPhase {
    #[default]
    Collapsed,
    Expanding,
    Expanded,
    Collapsing,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Align {
    Start,
    Center,
    End,
    Auto,
}

/// The scroll container geometry, in the same units as item heights.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Viewport {
    pub scroll_offset: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(scroll_offset: f32, height: f32) -> Self {
        Self {
            scroll_offset,
            height,
        }
    }

    pub fn center(&self) -> f32 {
        self.scroll_offset + self.height / 2.0
    }

    pub fn end(&self) -> f32 {
        self.scroll_offset + self.height
    }
}

/// One entry of the ordered visible traversal.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VisibleEntry {
    pub id: ItemId,
    pub kind: ItemKind,
    /// The layout target (`yPosition`). Relative to the child area for children.
    pub y: f32,
    /// Absolute target offset in the scroll axis.
    pub absolute_y: f32,
    pub height: f32,
}

/// A bound panel as seen by the presentation layer for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawItem {
    pub id: ItemId,
    pub kind: ItemKind,
    pub panel: crate::PanelId,
    pub displayed_y: f32,
    pub target_y: f32,
    pub height: f32,
    pub state: ItemState,
    /// Content opacity in `[0, 1]`; `0` while content is still loading.
    pub content_alpha: f32,
}
