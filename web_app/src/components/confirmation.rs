//! Native confirmation popup.

use leptos::{
    component, create_signal, spawn_local, view, IntoView, SignalGet as _, SignalSet as _,
};
use miniapp_facade::{data_model::Outcome, ResponseFuture, WebApp as _};

use super::common::{with_errors, Error, Result, SharedWebApp};

/// Question asked in the popup.
const QUESTION: &str = "Do you like Rust?";

/// Button opening a confirmation popup and the last answer.
#[component]
pub fn Confirmation(web_app: SharedWebApp) -> impl IntoView {
    let (answer, set_answer) = create_signal(Ok::<Option<bool>, Error>(None));

    let on_click = move |_| {
        let response = web_app.show_confirm(web_app.next_token(), QUESTION.to_owned());
        spawn_local(async move {
            set_answer.set(ask(response).await.map(Some));
        });
    };

    let answer_text = move || {
        answer.get().map(|answer| match answer {
            None => "No answer yet",
            Some(true) => "You like Rust!",
            Some(false) => "You don't like Rust yet",
        })
    };

    view! {
        <button on:click=on_click>{QUESTION}</button>
        { with_errors(answer_text) }
    }
}

/// Wait for the user to close the popup.
async fn ask(response: miniapp_facade::Result<ResponseFuture>) -> Result<bool> {
    match response?.await?? {
        Outcome::Confirmed(confirmed) => Ok(confirmed),
        other => Err(other.into()),
    }
}
