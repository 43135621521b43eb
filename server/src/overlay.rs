// server/src/overlay.rs
//
// The sort button overlay. A player has at most one row in
// `sort_button_overlay`; the row existing means the button is shown.
// Clients subscribe to their own row and draw the button from it.

use spacetimedb::{Identity, ReducerContext, Table};
use log;

use crate::lang::{self, MessageKey};
use crate::placement::RenderInstruction;

pub const ORDER_COLOR_CATEGORY: &str = "0.75 0.43 0.18 0.8";
pub const ORDER_COLOR_NAME: &str = "0.26 0.58 0.80 0.8";

#[spacetimedb::table(name = sort_button_overlay, public)]
#[derive(Clone, Debug, PartialEq)]
pub struct SortButtonOverlay {
    #[primary_key]
    pub player_identity: Identity,
    pub offset_x: f32,
    pub offset_y: f32,
    pub height: f32,
    pub sort_by_category: bool,
    /// "C" or "N"
    pub order_label: String,
    pub order_color: String,
    pub button_text: String,
}

pub fn build_overlay(
    player_identity: Identity,
    placement: &RenderInstruction,
    sort_by_category: bool,
    locale: &str,
) -> SortButtonOverlay {
    SortButtonOverlay {
        player_identity,
        offset_x: placement.offset_x,
        offset_y: placement.offset_y,
        height: placement.height,
        sort_by_category,
        order_label: if sort_by_category { "C" } else { "N" }.to_string(),
        order_color: if sort_by_category { ORDER_COLOR_CATEGORY } else { ORDER_COLOR_NAME }.to_string(),
        button_text: lang::message(locale, MessageKey::ButtonText).to_string(),
    }
}

// --- Visibility state machine ---

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    Hidden,
    Shown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    Show,
    Hide,
}

impl Visibility {
    /// Next state, and whether the overlay actually has to change.
    /// Show while shown and hide while hidden are suppressed.
    pub fn apply(self, transition: Transition) -> (Visibility, bool) {
        match (self, transition) {
            (Visibility::Hidden, Transition::Show) => (Visibility::Shown, true),
            (Visibility::Shown, Transition::Hide) => (Visibility::Hidden, true),
            (state, _) => (state, false),
        }
    }
}

/// Where overlays are drawn.
pub(crate) trait OverlaySink {
    fn is_shown(&self, player: Identity) -> bool;
    fn put(&mut self, overlay: SortButtonOverlay);
    fn remove(&mut self, player: Identity);
}

fn visibility<S: OverlaySink + ?Sized>(sink: &S, player: Identity) -> Visibility {
    if sink.is_shown(player) { Visibility::Shown } else { Visibility::Hidden }
}

/// Returns true if the overlay was drawn.
pub(crate) fn show_overlay<S: OverlaySink + ?Sized>(sink: &mut S, overlay: SortButtonOverlay) -> bool {
    let player = overlay.player_identity;
    let (_, changed) = visibility(sink, player).apply(Transition::Show);
    if changed {
        sink.put(overlay);
    }
    changed
}

/// Returns true if an overlay was removed.
pub(crate) fn hide_overlay<S: OverlaySink + ?Sized>(sink: &mut S, player: Identity) -> bool {
    let (_, changed) = visibility(sink, player).apply(Transition::Hide);
    if changed {
        sink.remove(player);
    }
    changed
}

/// Destroy then create, so the button reflects a changed sort mode.
pub(crate) fn recreate_overlay<S: OverlaySink + ?Sized>(sink: &mut S, overlay: SortButtonOverlay) {
    hide_overlay(sink, overlay.player_identity);
    show_overlay(sink, overlay);
}

// --- Table-backed sink ---

pub(crate) struct DbOverlaySink<'a> {
    pub ctx: &'a ReducerContext,
}

impl OverlaySink for DbOverlaySink<'_> {
    fn is_shown(&self, player: Identity) -> bool {
        self.ctx.db.sort_button_overlay().player_identity().find(player).is_some()
    }

    fn put(&mut self, overlay: SortButtonOverlay) {
        log::debug!("[Overlay] Showing sort button for {:?} at ({}, {}).",
            overlay.player_identity, overlay.offset_x, overlay.offset_y);
        if let Err(e) = self.ctx.db.sort_button_overlay().try_insert(overlay) {
            log::error!("[Overlay] Failed to insert overlay row: {}", e);
        }
    }

    fn remove(&mut self, player: Identity) {
        log::debug!("[Overlay] Hiding sort button for {:?}.", player);
        self.ctx.db.sort_button_overlay().player_identity().delete(player);
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::MemorySink;
    use super::*;

    const PLACEMENT: RenderInstruction = RenderInstruction { offset_x: 476.5, offset_y: 236.0, height: 23.0 };

    fn id(n: u8) -> Identity {
        Identity::from_byte_array([n; 32])
    }

    #[test]
    fn transitions() {
        assert_eq!(Visibility::Hidden.apply(Transition::Show), (Visibility::Shown, true));
        assert_eq!(Visibility::Shown.apply(Transition::Show), (Visibility::Shown, false));
        assert_eq!(Visibility::Shown.apply(Transition::Hide), (Visibility::Hidden, true));
        assert_eq!(Visibility::Hidden.apply(Transition::Hide), (Visibility::Hidden, false));
    }

    #[test]
    fn duplicate_show_and_hide_are_suppressed() {
        let mut sink = MemorySink::default();
        assert!(show_overlay(&mut sink, build_overlay(id(1), &PLACEMENT, true, "en")));
        assert!(!show_overlay(&mut sink, build_overlay(id(1), &PLACEMENT, true, "en")));
        assert_eq!(sink.puts, 1);

        assert!(hide_overlay(&mut sink, id(1)));
        assert!(!hide_overlay(&mut sink, id(1)));
        assert_eq!(sink.removes, 1);
    }

    #[test]
    fn recreate_refreshes_content() {
        let mut sink = MemorySink::default();
        show_overlay(&mut sink, build_overlay(id(1), &PLACEMENT, true, "en"));
        recreate_overlay(&mut sink, build_overlay(id(1), &PLACEMENT, false, "en"));
        let shown = &sink.shown[&id(1)];
        assert_eq!(shown.order_label, "N");
        assert_eq!(shown.order_color, ORDER_COLOR_NAME);
        assert_eq!((sink.puts, sink.removes), (2, 1));
    }

    #[test]
    fn recreate_from_hidden_just_shows() {
        let mut sink = MemorySink::default();
        recreate_overlay(&mut sink, build_overlay(id(2), &PLACEMENT, true, "en"));
        assert_eq!((sink.puts, sink.removes), (1, 0));
    }

    #[test]
    fn overlay_content_follows_mode_and_locale() {
        let overlay = build_overlay(id(1), &PLACEMENT, true, "ru");
        assert_eq!(overlay.order_label, "C");
        assert_eq!(overlay.order_color, ORDER_COLOR_CATEGORY);
        assert_eq!(overlay.button_text, "Сортировать");
        assert_eq!(overlay.offset_y, 236.0);
        assert_eq!(overlay.height, 23.0);
    }
}
