//! Demo Mini App showing the facade over `Telegram.WebApp` in action.

#![allow(clippy::empty_structs_with_brackets, clippy::same_name_method)] // Triggered by leptos
#![allow(clippy::missing_docs_in_private_items, clippy::expect_used)]

use std::rc::Rc;

use leptos::{component, view, CollectView as _, ErrorBoundary, IntoView, SignalGet as _};
use leptos_router::{Route, Router, Routes};
use miniapp_facade::{js::JsHost, Facade, WebApp as _};

mod components;

use components::{ClickCounter, Confirmation, Note, Session};

/// Main component.
#[component]
fn App() -> impl IntoView {
    let host = JsHost::from_window().expect("Telegram WebApp script is not loaded");
    let web_app = Facade::new(host);

    let startup = web_app.ready().and_then(|()| web_app.expand());

    view! {
        <Router>
            <Routes>
                <Route path="/" clone:web_app view = move || view! {
                    <Session web_app=Rc::clone(&web_app)/>
                    <ClickCounter web_app=Rc::clone(&web_app)/>
                    <Confirmation web_app=Rc::clone(&web_app)/>
                    <Note web_app=Rc::clone(&web_app)/>
                }/>
                <Route path="/*any" view=|| view! { <h1>"Not Found"</h1> }/>
            </Routes>
        </Router>
        <ErrorBoundary fallback=|errors| view! {
            <div class = "error">
                { move || {
                    errors.get()
                    .into_iter()
                    .map(|(_, e)| view! { <p>{e.to_string()}</p>})
                    .collect_view()
                }}
            </div>
        }>
            { startup }
        </ErrorBoundary>
    }
}

fn main() {
    leptos::mount_to_body(App)
}
