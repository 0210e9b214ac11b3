// ============================================================================
// STUDENT VIEW - Registro de trabajo offline
// ============================================================================

use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::Element;

use crate::app::AppContext;
use crate::dom::{event_value, ElementBuilder};
use crate::state::app_state::Notice;
use crate::viewmodels::student_viewmodel::{
    eligible_members, history_line, MAX_MINUTES, MINUTES_STEP, MIN_MINUTES,
};
use crate::views::shared::{field, option, render_notice, select, team_select};

pub fn render_student(ctx: &AppContext) -> Result<Element, JsValue> {
    let state = &ctx.state;
    let form = state.form.borrow().clone();
    let submitting = *state.submitting.borrow();

    let intro = ElementBuilder::new("p")?
        .class("hint")
        .text("Sign in with your Google account when prompted. Offline work needs coach approval before it is added to your totals.")
        .build();

    let team = {
        let ctx = ctx.clone();
        team_select(&state.student_team.borrow(), move |team_id| {
            *ctx.state.student_team.borrow_mut() = team_id;
            ctx.state.form.borrow_mut().member_id.clear();
            ctx.state.student_history.borrow_mut().clear();
            ctx.state.notify_subscribers();
            load_roster(&ctx);
        })?
    };

    let member = {
        let roster = state.student_roster.borrow();
        let mut options = vec![option("", "Select your name…", form.member_id.is_empty())?];
        for m in eligible_members(&roster) {
            options.push(option(&m.member_id, &m.display_name(), m.member_id == form.member_id)?);
        }
        let ctx = ctx.clone();
        select(options, move |member_id| {
            ctx.state.form.borrow_mut().member_id = member_id;
            *ctx.state.student_notice.borrow_mut() = None;
            ctx.state.notify_subscribers();
            load_history(&ctx);
        })?
    };

    let category = {
        let options = ctx
            .student
            .categories()
            .iter()
            .map(|c| option(c, c, *c == form.category))
            .collect::<Result<Vec<_>, JsValue>>()?;
        let state = state.clone();
        select(options, move |category| state.form.borrow_mut().category = category)?
    };

    // Los inputs de texto escriben en el estado sin re-render
    let minutes = {
        let state = state.clone();
        ElementBuilder::new("input")?
            .class("input")
            .attr("type", "number")?
            .attr("min", &MIN_MINUTES.to_string())?
            .attr("max", &MAX_MINUTES.to_string())?
            .attr("step", &MINUTES_STEP.to_string())?
            .attr("value", &form.minutes)?
            .on("input", move |event| {
                state.form.borrow_mut().minutes = event_value(&event).unwrap_or_default();
            })?
            .build()
    };

    let note = {
        let state = state.clone();
        ElementBuilder::new("textarea")?
            .class("input")
            .attr("rows", "3")?
            .text(&form.note)
            .on("input", move |event| {
                state.form.borrow_mut().note = event_value(&event).unwrap_or_default();
            })?
            .build()
    };

    let submit = ElementBuilder::new("button")?
        .class("btn btn-success btn-block")
        .attr("type", "submit")?
        .flag("disabled", form.member_id.is_empty() || submitting)?
        .text(if submitting { "Submitting…" } else { "Submit for approval" })
        .build();

    let mut form_el = ElementBuilder::new("form")?
        .class("form")
        .child(field("Team", team)?)?
        .child(field("Student", member)?)?
        .child(field("Category", category)?)?
        .child(field("Minutes", minutes)?)?
        .child(field("Notes or links (optional)", note)?)?
        .child(submit)?;
    if let Some(notice) = state.student_notice.borrow().as_ref() {
        form_el = form_el.child(render_notice(notice)?)?;
    }
    let form_el = {
        let ctx = ctx.clone();
        form_el
            .on("submit", move |event| {
                event.prevent_default();
                submit_form(&ctx);
            })?
            .build()
    };

    let mut section = ElementBuilder::new("section")?
        .class("student")
        .child(ElementBuilder::new("h2")?.text("Log Offline Work").build())?
        .child(intro)?
        .child(form_el)?;
    if let Some(history) = render_history(ctx)? {
        section = section.child(history)?;
    }
    Ok(section.build())
}

fn render_history(ctx: &AppContext) -> Result<Option<Element>, JsValue> {
    let history = ctx.state.student_history.borrow();
    if history.is_empty() {
        return Ok(None);
    }

    let items = history
        .iter()
        .map(|entry| {
            let mut item = ElementBuilder::new("li")?
                .class("history-item")
                .child(ElementBuilder::new("div")?.text(&history_line(entry)).build())?;
            if let Some(note) = &entry.note {
                item = item.child(ElementBuilder::new("div")?.class("hint").text(&format!("Note: {}", note)).build())?;
            }
            Ok(item.build())
        })
        .collect::<Result<Vec<_>, JsValue>>()?;

    Ok(Some(
        ElementBuilder::new("div")?
            .class("history")
            .child(ElementBuilder::new("h3")?.text("Recent offline sessions").build())?
            .child(ElementBuilder::new("ul")?.children(items)?.build())?
            .build(),
    ))
}

pub fn load(ctx: &AppContext) {
    load_roster(ctx);
    load_history(ctx);
}

fn load_roster(ctx: &AppContext) {
    let team = ctx.state.student_team.borrow().clone();
    if team.is_empty() {
        return;
    }
    let ctx = ctx.clone();
    spawn_local(async move {
        match ctx.student.roster(&team).await {
            Ok(roster) if *ctx.state.student_team.borrow() == team => {
                *ctx.state.student_roster.borrow_mut() = roster;
                ctx.state.notify_subscribers();
            }
            Ok(_) => {}
            Err(e) => log::error!("❌ Error cargando roster de {}: {}", team, e),
        }
    });
}

fn load_history(ctx: &AppContext) {
    let member_id = ctx.state.form.borrow().member_id.clone();
    let ctx = ctx.clone();
    spawn_local(async move {
        match ctx.student.history(&member_id).await {
            Ok(history) if ctx.state.form.borrow().member_id == member_id => {
                *ctx.state.student_history.borrow_mut() = history;
                ctx.state.notify_subscribers();
            }
            Ok(_) => {}
            Err(e) => log::warn!("⚠️ Historial de {} no disponible: {}", member_id, e),
        }
    });
}

fn submit_form(ctx: &AppContext) {
    if *ctx.state.submitting.borrow() {
        return;
    }
    *ctx.state.submitting.borrow_mut() = true;
    *ctx.state.student_notice.borrow_mut() = None;
    ctx.state.notify_subscribers();

    let team = ctx.state.student_team.borrow().clone();
    let form = ctx.state.form.borrow().clone();
    let ctx = ctx.clone();
    spawn_local(async move {
        let notice = match ctx.student.submit(&team, &form).await {
            Ok(_) => {
                ctx.state.form.borrow_mut().reset_after_submit();
                load_history(&ctx);
                Notice::success("Submission received! A coach will review it soon.")
            }
            Err(e) => {
                log::error!("❌ Envío offline falló: {}", e);
                Notice::error(e.to_string())
            }
        };
        *ctx.state.submitting.borrow_mut() = false;
        *ctx.state.student_notice.borrow_mut() = Some(notice);
        ctx.state.notify_subscribers();
    });
}
