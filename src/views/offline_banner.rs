// ============================================================================
// OFFLINE BANNER VIEW - Aviso de modo offline / cola pendiente
// ============================================================================

use gloo_storage::{LocalStorage, Storage};
use wasm_bindgen::prelude::*;
use web_sys::Element;

use crate::config::CONFIG;
use crate::dom::ElementBuilder;
use crate::services::network_monitor;
use crate::state::app_state::AppState;
use crate::viewmodels::banner_viewmodel::{banner, queued_count, BannerTone};

/// Retorna None cuando no hay nada que avisar
pub fn render_offline_banner(state: &AppState) -> Result<Option<Element>, JsValue> {
    let Some(banner) = banner(*state.online.borrow(), *state.queued.borrow()) else {
        return Ok(None);
    };
    let class = match banner.tone {
        BannerTone::Offline => "banner banner--offline",
        BannerTone::Syncing => "banner banner--syncing",
    };
    Ok(Some(
        ElementBuilder::new("div")?
            .class(class)
            .attr("role", "status")?
            .text(&banner.text)
            .build(),
    ))
}

/// Lee red + cola persistida (la cola puede cambiar desde otra pestaña)
pub fn poll_connectivity(state: &AppState) {
    let raw = LocalStorage::raw().get_item(&CONFIG.queue.storage_key).ok().flatten();
    state.set_connectivity(network_monitor::is_online(), queued_count(raw.as_deref()));
}
