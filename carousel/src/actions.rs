use crate::{CarouselError, CarouselOptions, ItemId, ItemKind, ItemModel, ItemState};

/// An entry of an item's context menu.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ContextAction {
    Expand { group: ItemId },
    Play { child: ItemId },
    Edit { child: ItemId },
}

impl ContextAction {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Expand { .. } => "Expand",
            Self::Play { .. } => "Play",
            Self::Edit { .. } => "Edit",
        }
    }

    /// Whether the action is the primary one and should be emphasized.
    pub fn is_highlighted(&self) -> bool {
        matches!(self, Self::Expand { .. })
    }
}

/// The ordered context actions for `id`.
pub fn context_actions(
    model: &ItemModel,
    options: &CarouselOptions,
    id: ItemId,
) -> Result<Vec<ContextAction>, CarouselError> {
    let kind = model.kind(id).ok_or(CarouselError::UnknownItem(id))?;
    if !model.is_visible(id) {
        return Err(CarouselError::Hidden(id));
    }

    let mut actions = Vec::new();
    let target = match kind {
        ItemKind::Group => {
            if model.state(id) != Some(ItemState::Selected) {
                actions.push(ContextAction::Expand { group: id });
            }
            model.next_to_select(id)
        }
        ItemKind::Child { .. } => Some(id),
    };

    if options.forward_actions {
        if let Some(child) = target {
            actions.push(ContextAction::Play { child });
            actions.push(ContextAction::Edit { child });
        }
    }
    Ok(actions)
}
