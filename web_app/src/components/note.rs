//! Note persisted in the cloud storage.

use leptos::{
    component, create_node_ref, create_signal, ev::SubmitEvent, html::Input, spawn_local, view,
    IntoView, SignalGet as _, SignalSet as _,
};
use miniapp_facade::{
    data_model::{request::StorageKey, Outcome},
    ResponseFuture, WebApp as _,
};

use super::common::{with_errors, Error, Result, SharedWebApp};

/// Key the note is stored under.
const NOTE_KEY: &str = "note";

/// Form to edit a note kept in the cloud storage between sessions.
#[component]
pub fn Note(web_app: SharedWebApp) -> impl IntoView {
    let key: StorageKey = NOTE_KEY.parse().expect("Valid storage key");
    let note_element = create_node_ref::<Input>();
    let (note, set_note) = create_signal(String::new());
    let (status, set_status) = create_signal(Ok::<&'static str, Error>("Loading..."));

    let loaded = web_app
        .cloud_storage()
        .get_item(web_app.next_token(), key.clone());
    spawn_local(async move {
        match load(loaded).await {
            Ok(value) => {
                set_note.set(value);
                set_status.set(Ok("Loaded"));
            }
            Err(err) => set_status.set(Err(err)),
        }
    });

    let on_submit = move |event: SubmitEvent| {
        event.prevent_default(); // Prevent page reload

        let value = note_element.get().expect("No note element").value();
        let stored = web_app
            .cloud_storage()
            .set_item(web_app.next_token(), key.clone(), value);
        set_status.set(Ok("Saving..."));
        spawn_local(async move {
            set_status.set(save(stored).await.map(|()| "Saved"));
        });
    };

    view! {
        <form on:submit=on_submit>
            <label for="note">Note</label>
            <input type="text" id="note" prop:value=move || note.get() node_ref=note_element/>
            <input type="submit" value="Save"/>
        </form>
        { with_errors(move || status.get()) }
    }
}

/// Wait for the stored note.
async fn load(response: miniapp_facade::Result<ResponseFuture>) -> Result<String> {
    match response?.await?? {
        Outcome::Value(value) => Ok(value),
        other => Err(other.into()),
    }
}

/// Wait for the note to be stored.
async fn save(response: miniapp_facade::Result<ResponseFuture>) -> Result<()> {
    match response?.await?? {
        Outcome::Stored(true) => Ok(()),
        other => Err(other.into()),
    }
}
