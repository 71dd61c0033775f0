//! Post-commit scroll decision
//!
//! Priority: explicit coordinates, `Preserve`, restore on pop, hash anchor,
//! then scroll-to-top.

use super::context::{NavigationType, ScrollBehavior, ScrollPosition};

/// What to do with the viewport once a navigation committed
#[derive(Debug, Clone, PartialEq)]
pub enum ScrollAction {
    To(ScrollPosition),
    Anchor(String),
    Top,
    None,
}

/// Inputs of the scroll decision
#[derive(Debug, Clone, Copy)]
pub struct ScrollInput<'a> {
    pub requested: Option<ScrollBehavior>,
    pub navigation_type: NavigationType,
    /// Position stored for the entry being popped to
    pub saved: Option<ScrollPosition>,
    /// Hash of the target location, with its `#`
    pub hash: &'a str,
    pub scroll_to_top: bool,
}

pub fn decide(input: ScrollInput<'_>) -> ScrollAction {
    match input.requested {
        Some(ScrollBehavior::To(position)) => return ScrollAction::To(position),
        Some(ScrollBehavior::Preserve) => return ScrollAction::None,
        Some(ScrollBehavior::Top) => return ScrollAction::Top,
        None => {}
    }

    if input.navigation_type == NavigationType::Pop {
        if let Some(saved) = input.saved {
            return ScrollAction::To(saved);
        }
    }

    let anchor = input.hash.trim_start_matches('#');
    if !anchor.is_empty() {
        return ScrollAction::Anchor(anchor.to_string());
    }

    if input.scroll_to_top {
        ScrollAction::Top
    } else {
        ScrollAction::None
    }
}
