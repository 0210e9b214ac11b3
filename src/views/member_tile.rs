// ============================================================================
// MEMBER TILE VIEW - Tile táctil de un miembro en el kiosk
// ============================================================================

use wasm_bindgen::prelude::*;
use web_sys::Element;

use crate::dom::ElementBuilder;
use crate::viewmodels::kiosk_viewmodel::MemberTileModel;

pub fn render_member_tile<F>(tile: &MemberTileModel, on_toggle: F) -> Result<Element, JsValue>
where
    F: Fn() + 'static,
{
    let mut class = String::from(if tile.is_in { "tile tile--in" } else { "tile tile--out" });
    if tile.pending {
        class.push_str(" tile--pending");
    }

    let avatar = match &tile.photo_url {
        Some(url) => ElementBuilder::new("img")?
            .class("tile-photo")
            .attr("src", url)?
            .attr("alt", &tile.label)?
            .build(),
        None => ElementBuilder::new("div")?
            .class("tile-initials")
            .attr("aria-hidden", "true")?
            .text(&tile.initials)
            .build(),
    };

    let state_text = match (tile.is_in, &tile.since) {
        (true, Some(since)) => format!("Clocked in · since {}", since),
        (true, None) => "Clocked in".to_string(),
        (false, _) => "Clocked out".to_string(),
    };

    let mut info = ElementBuilder::new("div")?
        .class("tile-info")
        .child(ElementBuilder::new("div")?.class("tile-name").text(&tile.label).build())?
        .child(ElementBuilder::new("div")?.class("tile-state").text(&state_text).build())?;
    if tile.pending {
        info = info.child(ElementBuilder::new("div")?.class("tile-sync").text("⏳ Waiting to sync").build())?;
    }

    ElementBuilder::new("button")?
        .class(&class)
        .attr("type", "button")?
        .attr("data-member", &tile.member_id)?
        .child(avatar)?
        .child(info.build())?
        .on_click(move |_| on_toggle())
        .map(ElementBuilder::build)
}
