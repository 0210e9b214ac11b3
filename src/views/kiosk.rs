// ============================================================================
// KIOSK VIEW - Fichaje por tiles
// ============================================================================

use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::Element;

use crate::app::AppContext;
use crate::config::CONFIG;
use crate::dom::{append_child, clear_children, event_value, get_element_by_id, ElementBuilder};
use crate::services::offline_service::save_last_team;
use crate::state::app_state::ToggleFailure;
use crate::viewmodels::kiosk_viewmodel::{member_tiles, status_line, ToggleOutcome};
use crate::views::member_tile::render_member_tile;
use crate::views::shared::button;

const GRID_ID: &str = "kiosk-grid";

pub fn render_kiosk(ctx: &AppContext) -> Result<Element, JsValue> {
    if CONFIG.teams.is_empty() {
        return Ok(ElementBuilder::new("div")?
            .class("empty")
            .text("No teams configured.")
            .build());
    }

    let state = &ctx.state;
    let status = status_line(*state.online.borrow(), *state.queued.borrow());

    let mut section = ElementBuilder::new("section")?
        .class("kiosk")
        .child(render_toolbar(ctx)?)?
        .child(ElementBuilder::new("div")?.class("kiosk-status").text(&status).build())?;

    if *state.loading.borrow() {
        section = section.child(ElementBuilder::new("div")?.class("loading").text("Loading roster…").build())?;
    }

    let load_error = state.load_error.borrow().clone();
    if let Some(message) = load_error {
        let retry = {
            let ctx = ctx.clone();
            button("Retry", "btn btn-secondary", false, move || load_team(&ctx))?
        };
        section = section.child(error_box(&message, retry)?)?;
    }

    let kiosk_error = state.kiosk_error.borrow().clone();
    if let Some(failure) = kiosk_error {
        let retry = {
            let ctx = ctx.clone();
            let member_id = failure.member_id.clone();
            button("Retry", "btn btn-secondary", false, move || toggle_member(&ctx, member_id.clone()))?
        };
        section = section.child(error_box(&failure.message, retry)?)?;
    }

    let grid = ElementBuilder::new("div")?.class("kiosk-grid").id(GRID_ID)?.build();
    fill_grid(&grid, ctx)?;
    Ok(section.child(grid)?.build())
}

fn render_toolbar(ctx: &AppContext) -> Result<Element, JsValue> {
    let current = ctx.state.team();
    let chips = CONFIG
        .teams
        .iter()
        .map(|team| {
            let class = if team.id == current { "chip chip--active" } else { "chip" };
            let ctx = ctx.clone();
            let team_id = team.id.clone();
            button(&team.name, class, false, move || select_team(&ctx, &team_id))
        })
        .collect::<Result<Vec<_>, JsValue>>()?;

    // La búsqueda sólo repinta el grid para no perder el foco del input
    let search = {
        let ctx = ctx.clone();
        let value = ctx.state.search.borrow().clone();
        ElementBuilder::new("input")?
            .class("input search")
            .attr("type", "search")?
            .attr("placeholder", "Search student")?
            .attr("value", &value)?
            .on("input", move |event| {
                *ctx.state.search.borrow_mut() = event_value(&event).unwrap_or_default();
                if let Some(grid) = get_element_by_id(GRID_ID) {
                    clear_children(&grid);
                    if let Err(e) = fill_grid(&grid, &ctx) {
                        log::error!("❌ Error repintando el grid: {:?}", e);
                    }
                }
            })?
            .build()
    };

    Ok(ElementBuilder::new("div")?
        .class("kiosk-toolbar")
        .child(ElementBuilder::new("div")?.class("chips").children(chips)?.build())?
        .child(search)?
        .build())
}

fn fill_grid(grid: &Element, ctx: &AppContext) -> Result<(), JsValue> {
    let tiles = {
        let roster = ctx.state.roster.borrow();
        let board = ctx.state.board.borrow();
        let search = ctx.state.search.borrow();
        member_tiles(&roster, &board, &search)
    };
    for tile in &tiles {
        let ctx = ctx.clone();
        let member_id = tile.member_id.clone();
        let element = render_member_tile(tile, move || toggle_member(&ctx, member_id.clone()))?;
        append_child(grid, &element)?;
    }
    Ok(())
}

fn error_box(message: &str, retry: Element) -> Result<Element, JsValue> {
    Ok(ElementBuilder::new("div")?
        .class("error-box")
        .attr("role", "alert")?
        .child(ElementBuilder::new("span")?.text(message).build())?
        .child(retry)?
        .build())
}

fn select_team(ctx: &AppContext, team_id: &str) {
    if ctx.state.team() == team_id {
        return;
    }
    save_last_team(team_id);
    ctx.state.set_team(team_id);
    load_team(ctx);
}

/// Roster + estado del equipo actual
pub fn load_team(ctx: &AppContext) {
    let team = ctx.state.team();
    if team.is_empty() {
        return;
    }
    *ctx.state.loading.borrow_mut() = true;
    *ctx.state.load_error.borrow_mut() = None;
    ctx.state.notify_subscribers();

    let ctx = ctx.clone();
    spawn_local(async move {
        let result = ctx.kiosk.load_team(&team).await;
        *ctx.state.loading.borrow_mut() = false;

        // El usuario cambió de equipo mientras tanto
        if ctx.state.team() == team {
            match result {
                Ok(snapshot) => {
                    log::info!("👥 Equipo {}: {} miembros", team, snapshot.roster.len());
                    *ctx.state.roster.borrow_mut() = snapshot.roster;
                    *ctx.state.board.borrow_mut() = snapshot.board;
                }
                Err(e) => {
                    log::error!("❌ Error cargando equipo {}: {}", team, e);
                    *ctx.state.load_error.borrow_mut() = Some(format!("Could not load roster: {}", e));
                }
            }
        }
        ctx.state.notify_subscribers();
    });
}

/// Refresco periódico del estado; offline no se intenta
pub fn refresh_status(ctx: &AppContext) {
    let team = ctx.state.team();
    if team.is_empty() || !ctx.kiosk.queue().is_online() {
        return;
    }
    let ctx = ctx.clone();
    spawn_local(async move {
        match ctx.kiosk.refresh_status(&team).await {
            Ok(board) if ctx.state.team() == team => {
                *ctx.state.board.borrow_mut() = board;
                ctx.state.notify_subscribers();
            }
            Ok(_) => {}
            Err(e) => log::warn!("⚠️ No se pudo refrescar el estado: {}", e),
        }
    });
}

pub fn toggle_member(ctx: &AppContext, member_id: String) {
    let team = ctx.state.team();
    let ctx = ctx.clone();
    spawn_local(async move {
        match ctx.kiosk.toggle(&team, &member_id).await {
            Ok(ToggleOutcome::Queued(pending)) => {
                log::info!("📴 Toggle de {} guardado para más tarde", member_id);
                *ctx.state.queued.borrow_mut() = ctx.kiosk.queue().len();
                ctx.state.apply_queued_toggle(&pending);
            }
            Ok(ToggleOutcome::Applied { response, board }) => {
                log::info!("✅ {} -> {:?}", member_id, response.state);
                if let Some(board) = board {
                    if ctx.state.team() == team {
                        *ctx.state.board.borrow_mut() = board;
                    }
                }
                *ctx.state.kiosk_error.borrow_mut() = None;
                ctx.state.notify_subscribers();
            }
            Err(e) => {
                log::error!("❌ Toggle de {} falló: {}", member_id, e);
                *ctx.state.kiosk_error.borrow_mut() = Some(ToggleFailure {
                    member_id,
                    message: format!("Could not update attendance: {}", e),
                });
                ctx.state.notify_subscribers();
            }
        }
    });
}
