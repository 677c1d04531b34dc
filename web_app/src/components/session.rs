//! Greeting with information about the current session.

use std::rc::Rc;

use leptos::{component, create_signal, on_cleanup, view, IntoView, SignalGet as _, SignalSet as _};
use miniapp_facade::{
    data_model::{EventKind, User},
    WebApp as _,
};

use super::common::SharedWebApp;

/// Greets the user and shows platform, host version and the current color scheme.
///
/// Color scheme follows `themeChanged` events.
#[component]
pub fn Session(web_app: SharedWebApp) -> impl IntoView {
    let name = web_app
        .init_data_unsafe()
        .user
        .as_ref()
        .map_or_else(|| "stranger".to_owned(), User::full_name);
    let (color_scheme, set_color_scheme) = create_signal(web_app.color_scheme());

    let subscription = web_app.subscribe(EventKind::ThemeChanged, {
        let web_app = Rc::downgrade(&web_app);
        move |_event| {
            if let Some(web_app) = web_app.upgrade() {
                set_color_scheme.set(web_app.color_scheme());
            }
        }
    });
    on_cleanup({
        let web_app = Rc::clone(&web_app);
        move || {
            let _removed = subscription.unsubscribe(&*web_app);
        }
    });

    view! {
        <h1>"Hello, " {name} "!"</h1>
        <p>
            "Running on " {web_app.platform()}
            " with Bot API " {web_app.version().to_string()}
        </p>
        <p>"Color scheme: " {move || color_scheme.get().to_string()}</p>
    }
}
