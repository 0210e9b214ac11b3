// ============================================================================
// SHARED - Controles reutilizados por las vistas
// ============================================================================

use wasm_bindgen::prelude::*;
use web_sys::Element;

use crate::config::CONFIG;
use crate::dom::{event_value, ElementBuilder};
use crate::state::app_state::{Notice, NoticeKind};

pub fn render_notice(notice: &Notice) -> Result<Element, JsValue> {
    let class = match notice.kind {
        NoticeKind::Success => "notice notice--success",
        NoticeKind::Error => "notice notice--error",
    };
    Ok(ElementBuilder::new("p")?.class(class).text(&notice.text).build())
}

pub fn option(value: &str, label: &str, selected: bool) -> Result<Element, JsValue> {
    Ok(ElementBuilder::new("option")?
        .attr("value", value)?
        .flag("selected", selected)?
        .text(label)
        .build())
}

/// `<select>` que avisa con el valor elegido
pub fn select<F>(options: Vec<Element>, on_change: F) -> Result<Element, JsValue>
where
    F: Fn(String) + 'static,
{
    Ok(ElementBuilder::new("select")?
        .class("input")
        .children(options)?
        .on("change", move |event| {
            if let Some(value) = event_value(&event) {
                on_change(value);
            }
        })?
        .build())
}

pub fn team_select<F>(current: &str, on_change: F) -> Result<Element, JsValue>
where
    F: Fn(String) + 'static,
{
    let options = CONFIG
        .teams
        .iter()
        .map(|team| option(&team.id, &team.name, team.id == current))
        .collect::<Result<Vec<_>, JsValue>>()?;
    select(options, on_change)
}

/// Label + control
pub fn field(label: &str, control: Element) -> Result<Element, JsValue> {
    let label = ElementBuilder::new("label")?.class("field-label").text(label).build();
    Ok(ElementBuilder::new("div")?
        .class("field")
        .child(label)?
        .child(control)?
        .build())
}

pub fn button<F>(label: &str, class: &str, disabled: bool, on_click: F) -> Result<Element, JsValue>
where
    F: Fn() + 'static,
{
    Ok(ElementBuilder::new("button")?
        .class(class)
        .attr("type", "button")?
        .flag("disabled", disabled)?
        .text(label)
        .on_click(move |_| on_click())?
        .build())
}
