//! Counter of main button clicks.

use std::rc::Rc;

use leptos::{
    component, create_effect, create_signal, on_cleanup, view, IntoView, SignalGet as _,
    SignalSet as _, SignalUpdate as _,
};
use miniapp_facade::{Handler, WebApp as _};

use super::common::{with_errors, Error, SharedWebApp};

/// Shows the main button and counts clicks on it.
///
/// The button is hidden again when the component is removed.
#[component]
pub fn ClickCounter(web_app: SharedWebApp) -> impl IntoView {
    let (clicks, set_clicks) = create_signal(0_u32);
    let (result, set_result) = create_signal(Ok::<(), Error>(()));

    let handler = Handler::new(move |_event| {
        set_clicks.update(|clicks| *clicks = clicks.saturating_add(1));
    });
    web_app.main_button_control().on_click(handler.clone());

    create_effect({
        let web_app = Rc::clone(&web_app);
        move |_| {
            let text = format!("CLICKED {} TIMES", clicks.get());
            let control = web_app.main_button_control();
            if let Err(err) = control.set_text(text).and_then(|control| control.show()) {
                set_result.set(Err(err.into()));
            }
        }
    });

    on_cleanup(move || {
        let control = web_app.main_button_control();
        let _removed = control.off_click(&handler);
        let _ignored = control.hide();
    });

    view! {
        <p>"Press the main button below. Clicks so far: " {clicks}</p>
        { with_errors(move || result.get()) }
    }
}
