// ============================================================================
// ADMIN VIEW - Asistencia del día, aprobaciones offline e importación CSV
// ============================================================================

use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::Element;

use crate::app::AppContext;
use crate::dom::{event_value, ElementBuilder};
use crate::models::{OfflineHistoryEntry, ReviewAction};
use crate::state::app_state::Notice;
use crate::viewmodels::admin_viewmodel::HistoryFilter;
use crate::viewmodels::kiosk_viewmodel::since_label;
use crate::viewmodels::student_viewmodel::history_line;
use crate::views::shared::{button, option, render_notice, select, team_select};

pub fn render_admin(ctx: &AppContext) -> Result<Element, JsValue> {
    let mut section = ElementBuilder::new("section")?
        .class("admin")
        .child(render_attendance(ctx)?)?
        .child(render_approvals(ctx)?)?
        .child(render_import(ctx)?)?;
    if let Some(notice) = ctx.state.admin_notice.borrow().as_ref() {
        section = section.child(render_notice(notice)?)?;
    }
    Ok(section.build())
}

fn render_attendance(ctx: &AppContext) -> Result<Element, JsValue> {
    let state = &ctx.state;
    let busy = *state.admin_busy.borrow();

    let team = {
        let ctx = ctx.clone();
        team_select(&state.admin_team.borrow(), move |team_id| {
            *ctx.state.admin_team.borrow_mut() = team_id;
            *ctx.state.selected_member.borrow_mut() = None;
            ctx.state.admin_history.borrow_mut().clear();
            ctx.state.admin_roster.borrow_mut().clear();
            ctx.state.notify_subscribers();
            refresh_attendance(&ctx);
        })?
    };

    let clockout = {
        let ctx = ctx.clone();
        button(
            if busy { "Working…" } else { "Clock everyone out" },
            "btn btn-danger",
            busy,
            move || clockout_all(&ctx),
        )?
    };

    let cards = {
        let roster = state.admin_roster.borrow();
        let board = state.admin_board.borrow();
        roster
            .iter()
            .map(|member| {
                let status = if board.is_in(&member.member_id) {
                    let since = board
                        .started_at(&member.member_id)
                        .and_then(since_label)
                        .unwrap_or_else(|| "unknown".to_string());
                    format!("Clocked in since {}", since)
                } else {
                    "Clocked out".to_string()
                };
                let review = {
                    let ctx = ctx.clone();
                    let member_id = member.member_id.clone();
                    button("Review offline", "btn btn-accent btn-block", false, move || {
                        *ctx.state.selected_member.borrow_mut() = Some(member_id.clone());
                        ctx.state.notify_subscribers();
                        load_history(&ctx);
                    })?
                };
                Ok(ElementBuilder::new("div")?
                    .class("card")
                    .child(ElementBuilder::new("div")?.class("card-title").text(&member.display_name()).build())?
                    .child(ElementBuilder::new("div")?.class("hint").text(&status).build())?
                    .child(review)?
                    .build())
            })
            .collect::<Result<Vec<_>, JsValue>>()?
    };

    Ok(ElementBuilder::new("div")?
        .class("admin-block")
        .child(ElementBuilder::new("h2")?.text("Today's Attendance").build())?
        .child(ElementBuilder::new("div")?.class("toolbar").child(team)?.child(clockout)?.build())?
        .child(ElementBuilder::new("div")?.class("card-grid").children(cards)?.build())?
        .build())
}

fn render_approvals(ctx: &AppContext) -> Result<Element, JsValue> {
    let state = &ctx.state;
    let filter = *state.history_filter.borrow();
    let selected = state.selected_member.borrow().clone();

    let filter_select = {
        let options = HistoryFilter::ALL
            .iter()
            .map(|f| option(f.value(), f.label(), *f == filter))
            .collect::<Result<Vec<_>, JsValue>>()?;
        let state = state.clone();
        select(options, move |value| {
            *state.history_filter.borrow_mut() = HistoryFilter::from_value(&value);
            state.notify_subscribers();
        })?
    };

    let history = state.admin_history.borrow();
    let entries = filter.apply(&history);
    let summary = format!(
        "Showing {} entries for {}",
        entries.len(),
        selected.as_deref().unwrap_or("selected student")
    );

    let list = if entries.is_empty() {
        ElementBuilder::new("p")?.class("hint").text("No entries to review.").build()
    } else {
        let items = entries
            .iter()
            .map(|entry| render_review_item(ctx, entry))
            .collect::<Result<Vec<_>, JsValue>>()?;
        ElementBuilder::new("ul")?.class("review-list").children(items)?.build()
    };

    Ok(ElementBuilder::new("div")?
        .class("admin-block")
        .child(ElementBuilder::new("h2")?.text("Offline approvals").build())?
        .child(
            ElementBuilder::new("div")?
                .class("toolbar")
                .child(filter_select)?
                .child(ElementBuilder::new("span")?.class("hint").text(&summary).build())?
                .build(),
        )?
        .child(list)?
        .build())
}

fn render_review_item(ctx: &AppContext, entry: &OfflineHistoryEntry) -> Result<Element, JsValue> {
    let approve = {
        let ctx = ctx.clone();
        let session_id = entry.session_id.clone();
        button("Approve", "btn btn-success", false, move || {
            review(&ctx, session_id.clone(), ReviewAction::Approve)
        })?
    };
    let reject = {
        let ctx = ctx.clone();
        let session_id = entry.session_id.clone();
        button("Reject", "btn btn-danger", false, move || {
            review(&ctx, session_id.clone(), ReviewAction::Reject)
        })?
    };

    let mut item = ElementBuilder::new("li")?
        .class("review-item")
        .child(ElementBuilder::new("div")?.text(&history_line(entry)).build())?
        .child(ElementBuilder::new("div")?.class("actions").child(approve)?.child(reject)?.build())?;
    if let Some(note) = &entry.note {
        item = item.child(ElementBuilder::new("p")?.class("hint").text(&format!("Note: {}", note)).build())?;
    }
    Ok(item.build())
}

fn render_import(ctx: &AppContext) -> Result<Element, JsValue> {
    let state = &ctx.state;
    let busy = *state.admin_busy.borrow();

    let textarea = {
        let state = state.clone();
        let text = state.csv_text.borrow().clone();
        ElementBuilder::new("textarea")?
            .class("input")
            .attr("rows", "6")?
            .attr("placeholder", "Ada,A,ada@example.com,https://photos/ada.jpg")?
            .text(&text)
            .on("input", move |event| {
                *state.csv_text.borrow_mut() = event_value(&event).unwrap_or_default();
            })?
            .build()
    };

    let import = {
        let ctx = ctx.clone();
        button(
            if busy { "Working…" } else { "Import members" },
            "btn btn-primary",
            busy,
            move || import_csv(&ctx),
        )?
    };

    Ok(ElementBuilder::new("div")?
        .class("admin-block")
        .child(ElementBuilder::new("h2")?.text("Import members via CSV").build())?
        .child(
            ElementBuilder::new("p")?
                .class("hint")
                .text("Columns: first_name,last_initial,student_email?,photo_url?")
                .build(),
        )?
        .child(textarea)?
        .child(import)?
        .build())
}

pub fn load(ctx: &AppContext) {
    refresh_attendance(ctx);
    load_history(ctx);
}

/// Roster + estado del equipo del panel
pub fn refresh_attendance(ctx: &AppContext) {
    let team = ctx.state.admin_team.borrow().clone();
    if team.is_empty() {
        return;
    }
    let ctx = ctx.clone();
    spawn_local(async move {
        match ctx.admin.load_attendance(&team).await {
            Ok(snapshot) if *ctx.state.admin_team.borrow() == team => {
                *ctx.state.admin_roster.borrow_mut() = snapshot.roster;
                *ctx.state.admin_board.borrow_mut() = snapshot.board;
                ctx.state.notify_subscribers();
            }
            Ok(_) => {}
            Err(e) => log::warn!("⚠️ Asistencia de {} no disponible: {}", team, e),
        }
    });
}

fn load_history(ctx: &AppContext) {
    let Some(member_id) = ctx.state.selected_member.borrow().clone() else {
        return;
    };
    let ctx = ctx.clone();
    spawn_local(async move {
        match ctx.admin.history(&member_id).await {
            Ok(history) => {
                *ctx.state.admin_history.borrow_mut() = history;
                ctx.state.notify_subscribers();
            }
            Err(e) => {
                log::error!("❌ Historial de {} no disponible: {}", member_id, e);
                set_notice(&ctx, Notice::error(format!("Could not load offline history: {}", e)));
            }
        }
    });
}

fn set_busy(ctx: &AppContext, busy: bool) {
    *ctx.state.admin_busy.borrow_mut() = busy;
    if busy {
        *ctx.state.admin_notice.borrow_mut() = None;
    }
    ctx.state.notify_subscribers();
}

fn set_notice(ctx: &AppContext, notice: Notice) {
    *ctx.state.admin_notice.borrow_mut() = Some(notice);
    ctx.state.notify_subscribers();
}

fn clockout_all(ctx: &AppContext) {
    let team = ctx.state.admin_team.borrow().clone();
    if team.is_empty() || *ctx.state.admin_busy.borrow() {
        return;
    }
    set_busy(ctx, true);
    let ctx = ctx.clone();
    spawn_local(async move {
        let notice = match ctx.admin.clockout_all(&team).await {
            Ok((closed, board)) => {
                log::info!("🔒 {} sesiones cerradas en {}", closed, team);
                if *ctx.state.admin_team.borrow() == team {
                    *ctx.state.admin_board.borrow_mut() = board;
                }
                Notice::success(format!("Clocked out {} member(s).", closed))
            }
            Err(e) => Notice::error(format!("Clock out failed: {}", e)),
        };
        *ctx.state.admin_busy.borrow_mut() = false;
        set_notice(&ctx, notice);
    });
}

fn review(ctx: &AppContext, session_id: String, action: ReviewAction) {
    let ctx = ctx.clone();
    spawn_local(async move {
        match ctx.admin.review(&session_id, action, None).await {
            Ok(receipt) => {
                log::info!("📝 Sesión {} -> {}", session_id, receipt.status);
                load_history(&ctx);
            }
            Err(e) => set_notice(&ctx, Notice::error(format!("Review failed: {}", e))),
        }
    });
}

fn import_csv(ctx: &AppContext) {
    let team = ctx.state.admin_team.borrow().clone();
    if team.is_empty() || *ctx.state.admin_busy.borrow() {
        return;
    }
    let text = ctx.state.csv_text.borrow().clone();
    set_busy(ctx, true);
    let ctx = ctx.clone();
    spawn_local(async move {
        let notice = match ctx.admin.import_csv(&team, &text).await {
            Ok(Some(count)) => {
                ctx.state.csv_text.borrow_mut().clear();
                refresh_attendance(&ctx);
                Notice::success(format!("Roster updated! {} member(s) imported.", count))
            }
            Ok(None) => Notice::error("Nothing to import. Check CSV format."),
            Err(e) => {
                log::error!("❌ Importación falló: {}", e);
                Notice::error("Import failed. Check CSV format.")
            }
        };
        *ctx.state.admin_busy.borrow_mut() = false;
        set_notice(&ctx, notice);
    });
}
