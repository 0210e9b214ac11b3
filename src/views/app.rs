// ============================================================================
// APP VIEW - Layout: cabecera, banner, vista activa y pie
// ============================================================================

use wasm_bindgen::prelude::*;
use web_sys::Element;

use crate::app::AppContext;
use crate::config::CONFIG;
use crate::dom::ElementBuilder;
use crate::state::app_state::Route;
use crate::views::{admin, kiosk, offline_banner, student};

pub fn render_app(ctx: &AppContext) -> Result<Element, JsValue> {
    let route = *ctx.state.route.borrow();

    let mut layout = ElementBuilder::new("div")?
        .class("layout")
        .child(render_header(route)?)?;

    if let Some(banner) = offline_banner::render_offline_banner(&ctx.state)? {
        layout = layout.child(banner)?;
    }

    let view = match route {
        Route::Kiosk => kiosk::render_kiosk(ctx)?,
        Route::Student => student::render_student(ctx)?,
        Route::Admin => admin::render_admin(ctx)?,
    };
    let main = ElementBuilder::new("main")?.class("main").child(view)?.build();

    Ok(layout.child(main)?.child(render_footer()?)?.build())
}

fn render_header(active: Route) -> Result<Element, JsValue> {
    let links = Route::ALL
        .iter()
        .map(|route| {
            let class = if *route == active { "nav-link nav-link--active" } else { "nav-link" };
            Ok(ElementBuilder::new("a")?
                .class(class)
                .attr("href", route.hash())?
                .text(route.label())
                .build())
        })
        .collect::<Result<Vec<_>, JsValue>>()?;

    let nav = ElementBuilder::new("nav")?.class("nav").children(links)?.build();
    let title = ElementBuilder::new("h1")?.class("app-title").text("FTC Attendance Tracker").build();

    Ok(ElementBuilder::new("header")?
        .class("app-header")
        .child(title)?
        .child(nav)?
        .build())
}

fn render_footer() -> Result<Element, JsValue> {
    Ok(ElementBuilder::new("footer")?
        .class("app-footer")
        .text(&format!("Season: {} · GAS URL: {}", CONFIG.season_id, CONFIG.api_base_url))
        .build())
}
