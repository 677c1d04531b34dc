//! Module with [`SimulatedHost`] behaving like the real host without a browser.
//!
//! Used to test Mini App logic natively: commands are applied only when the test
//! [acknowledges](SimulatedHost::acknowledge) them and user interactions are triggered by the
//! test explicitly.

use std::{
    cell::{Cell, RefCell},
    collections::{BTreeMap, VecDeque},
};

use miniapp_data_model::{
    ColorScheme, Command, Event, HostState, Outcome, Request, Response, ThemeParams, Version,
    command::MainButtonCommand,
    control::{BiometricManager, MainButton, Viewport},
    event::payload,
    request::CloudStorageRequest,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{EventSink, Host, Reply};

/// Configuration of [`SimulatedHost`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Bot API version reported by the host.
    pub version: Version,
    /// Platform name, `unknown` by default.
    pub platform: String,
    /// Raw init data as it would be passed in the launch URL.
    pub init_data: String,
    /// Initial color scheme.
    pub color_scheme: ColorScheme,
    /// Initial theme.
    pub theme_params: ThemeParams,
    /// Viewport height in the initial half-screen state.
    pub viewport_height: f64,
    /// Viewport height after [`Command::Expand`].
    pub expanded_viewport_height: f64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            version: Version::new(7, 10),
            platform: "unknown".to_owned(),
            init_data: String::new(),
            color_scheme: ColorScheme::default(),
            theme_params: ThemeParams::default(),
            viewport_height: 400.0,
            expanded_viewport_height: 800.0,
        }
    }
}

/// In-memory host.
#[derive(Debug)]
pub struct SimulatedHost {
    /// Viewport height after [`Command::Expand`].
    expanded_viewport_height: f64,
    /// Current state as reported to the facade.
    state: RefCell<HostState>,
    /// Facade events are delivered to.
    sink: RefCell<Option<EventSink>>,
    /// Commands waiting for [`acknowledge()`](Self::acknowledge).
    queued: RefCell<VecDeque<Command>>,
    /// Applied commands, oldest first.
    executed: RefCell<Vec<Command>>,
    /// Requests waiting for a callback response.
    requests: RefCell<VecDeque<(Request, Reply)>>,
    /// Cloud storage contents.
    cloud_storage: RefCell<BTreeMap<String, String>>,
    /// Whether the Mini App was closed.
    closed: Cell<bool>,
}

impl SimulatedHost {
    /// Construct new [`SimulatedHost`] from `config`.
    #[must_use]
    pub fn new(config: HostConfig) -> Self {
        let background_color = config
            .theme_params
            .bg_color
            .as_ref()
            .map_or_else(|| "#ffffff".to_owned(), ToString::to_string);
        let state = HostState {
            init_data: config.init_data,
            version: config.version,
            platform: config.platform,
            color_scheme: config.color_scheme,
            theme_params: config.theme_params,
            viewport: Viewport {
                height: config.viewport_height,
                stable_height: config.viewport_height,
                is_expanded: false,
            },
            background_color,
            is_vertical_swipes_enabled: true,
            ..HostState::default()
        };

        Self {
            expanded_viewport_height: config.expanded_viewport_height,
            state: RefCell::new(state),
            sink: RefCell::default(),
            queued: RefCell::default(),
            executed: RefCell::default(),
            requests: RefCell::default(),
            cloud_storage: RefCell::default(),
            closed: Cell::new(false),
        }
    }

    /// Emit `event` as if it happened in the host.
    pub fn emit(&self, event: Event) {
        let sink = self.sink.borrow().clone();
        match sink {
            Some(sink) => sink.emit(event),
            None => trace!(kind = %event.kind(), "No facade attached, discarding event"),
        }
    }

    /// Apply all queued commands, emitting the events the real host would.
    ///
    /// Returns the number of applied commands.
    pub fn acknowledge(&self) -> usize {
        let mut applied = 0_usize;
        while let Some(command) = self.next_queued() {
            debug!(method = command.method(), "Applying command");
            let event = self.apply(&command);
            self.executed.borrow_mut().push(command);
            if let Some(event) = event {
                self.emit(event);
            }
            applied = applied.saturating_add(1);
        }
        applied
    }

    /// Pop the oldest queued command.
    fn next_queued(&self) -> Option<Command> {
        self.queued.borrow_mut().pop_front()
    }

    /// Apply `command` to the state, returning the event to emit.
    fn apply(&self, command: &Command) -> Option<Event> {
        let mut state = self.state.borrow_mut();
        match command {
            Command::Expand => {
                state.viewport = Viewport {
                    height: self.expanded_viewport_height,
                    stable_height: self.expanded_viewport_height,
                    is_expanded: true,
                };
                return Some(Event::ViewportChanged(payload::ViewportChanged {
                    is_state_stable: true,
                }));
            }
            Command::Close
            | Command::SendData(_)
            | Command::SwitchInlineQuery { .. }
            | Command::OpenTelegramLink(_) => self.closed.set(true),
            Command::SetHeaderColor(color) => state.header_color = color.clone(),
            Command::SetBackgroundColor(color) => state.background_color = color.to_string(),
            Command::SetClosingConfirmation(enabled) => {
                state.is_closing_confirmation_enabled = *enabled;
            }
            Command::SetVerticalSwipes(enabled) => state.is_vertical_swipes_enabled = *enabled,
            Command::CloseScanQrPopup => return Some(Event::ScanQrPopupClosed),
            Command::MainButton(command) => apply_main_button(&mut state.main_button, command),
            Command::BackButton(visibility) => {
                state.back_button.is_visible = visibility.is_visible();
            }
            Command::SettingsButton(visibility) => {
                state.settings_button.is_visible = visibility.is_visible();
            }
            Command::Ready
            | Command::OpenLink { .. }
            | Command::ShareToStory { .. }
            | Command::Haptic(_)
            | Command::OpenBiometricSettings => {}
        }
        None
    }

    /// Answer the oldest request waiting for a callback response with `response`.
    ///
    /// Returns the answered request or [`None`] if there are no requests.
    pub fn reply_next(&self, response: Response) -> Option<Request> {
        let (request, reply) = self.requests.borrow_mut().pop_front()?;
        reply.send(response);
        Some(request)
    }

    /// Requests waiting for a callback response, oldest first.
    #[must_use]
    pub fn pending_requests(&self) -> Vec<Request> {
        self.requests
            .borrow()
            .iter()
            .map(|(request, _reply)| request.clone())
            .collect()
    }

    /// Answer every queued cloud storage request from the in-memory storage.
    ///
    /// Other requests stay queued. Returns the number of answered requests.
    pub fn serve_cloud_storage(&self) -> usize {
        let served: Vec<_> = {
            let mut requests = self.requests.borrow_mut();
            let (served, rest): (Vec<_>, Vec<_>) = requests
                .drain(..)
                .partition(|(request, _reply)| matches!(request, Request::CloudStorage(_)));
            *requests = rest.into();
            served
        };

        let count = served.len();
        for (request, reply) in served {
            if let Request::CloudStorage(request) = request {
                let outcome = self.apply_cloud_storage(request);
                reply.send(Ok(outcome));
            }
        }
        count
    }

    /// Execute `request` on the in-memory storage.
    fn apply_cloud_storage(&self, request: CloudStorageRequest) -> Outcome {
        let mut storage = self.cloud_storage.borrow_mut();
        let value_of = |storage: &BTreeMap<String, String>, key: &str| {
            storage.get(key).cloned().unwrap_or_default()
        };

        match request {
            CloudStorageRequest::SetItem { key, value } => {
                storage.insert(key.to_string(), value);
                Outcome::Stored(true)
            }
            CloudStorageRequest::GetItem(key) => Outcome::Value(value_of(&storage, key.as_str())),
            CloudStorageRequest::GetItems(keys) => Outcome::Values(
                keys.iter()
                    .map(|key| (key.to_string(), value_of(&storage, key.as_str())))
                    .collect(),
            ),
            CloudStorageRequest::RemoveItem(key) => {
                storage.remove(key.as_str());
                Outcome::Removed(true)
            }
            CloudStorageRequest::RemoveItems(keys) => {
                for key in keys.iter() {
                    storage.remove(key.as_str());
                }
                Outcome::Removed(true)
            }
            CloudStorageRequest::GetKeys => Outcome::Keys(storage.keys().cloned().collect()),
        }
    }

    /// Applied commands, oldest first.
    #[must_use]
    pub fn executed(&self) -> Vec<Command> {
        self.executed.borrow().clone()
    }

    /// Commands waiting for [`acknowledge()`](Self::acknowledge), oldest first.
    #[must_use]
    pub fn queued(&self) -> Vec<Command> {
        self.queued.borrow().iter().cloned().collect()
    }

    /// Whether the Mini App was closed by a command.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }

    /// Switch to another theme, emitting `themeChanged`.
    pub fn set_theme(&self, color_scheme: ColorScheme, theme_params: ThemeParams) {
        {
            let mut state = self.state.borrow_mut();
            state.color_scheme = color_scheme;
            state.theme_params = theme_params;
        }
        self.emit(Event::ThemeChanged);
    }

    /// Change viewport height as if the user dragged the Mini App, emitting `viewportChanged`.
    pub fn resize_viewport(&self, height: f64, is_state_stable: bool) {
        {
            let mut state = self.state.borrow_mut();
            state.viewport.height = height;
            if is_state_stable {
                state.viewport.stable_height = height;
            }
        }
        self.emit(Event::ViewportChanged(payload::ViewportChanged {
            is_state_stable,
        }));
    }

    /// Click the main button.
    ///
    /// Returns `false` without emitting anything if the button is hidden or inactive.
    pub fn click_main_button(&self) -> bool {
        let clickable = {
            let state = self.state.borrow();
            state.main_button.is_visible && state.main_button.is_active
        };
        if clickable {
            self.emit(Event::MainButtonClicked);
        }
        clickable
    }

    /// Click the back button. Returns `false` if the button is hidden.
    pub fn click_back_button(&self) -> bool {
        let visible = self.state.borrow().back_button.is_visible;
        if visible {
            self.emit(Event::BackButtonClicked);
        }
        visible
    }

    /// Click the "Settings" menu item. Returns `false` if the item is hidden.
    pub fn click_settings_button(&self) -> bool {
        let visible = self.state.borrow().settings_button.is_visible;
        if visible {
            self.emit(Event::SettingsButtonClicked);
        }
        visible
    }

    /// Change the biometric manager state, emitting `biometricManagerUpdated`.
    pub fn update_biometric(&self, update: impl FnOnce(&mut BiometricManager)) {
        update(&mut self.state.borrow_mut().biometric_manager);
        self.emit(Event::BiometricManagerUpdated);
    }
}

/// Apply main button `command` to `button`.
fn apply_main_button(button: &mut MainButton, command: &MainButtonCommand) {
    match command {
        MainButtonCommand::SetText(text) => text.trim().clone_into(&mut button.text),
        MainButtonCommand::Visibility(visibility) => button.is_visible = visibility.is_visible(),
        MainButtonCommand::SetActive(active) => button.is_active = *active,
        MainButtonCommand::ShowProgress { leave_active } => {
            button.is_progress_visible = true;
            button.is_active = *leave_active;
        }
        MainButtonCommand::HideProgress => {
            button.is_progress_visible = false;
            button.is_active = true;
        }
        MainButtonCommand::SetParams(params) => {
            if let Some(text) = &params.text {
                text.trim().clone_into(&mut button.text);
            }
            if let Some(color) = &params.color {
                button.color = color.to_string();
            }
            if let Some(text_color) = &params.text_color {
                button.text_color = text_color.to_string();
            }
            if let Some(is_active) = params.is_active {
                button.is_active = is_active;
            }
            if let Some(is_visible) = params.is_visible {
                button.is_visible = is_visible;
            }
        }
    }
}

impl Host for SimulatedHost {
    fn state(&self) -> HostState {
        self.state.borrow().clone()
    }

    fn version(&self) -> Version {
        self.state.borrow().version.clone()
    }

    fn execute(&self, command: Command) {
        trace!(method = command.method(), "Command queued");
        self.queued.borrow_mut().push_back(command);
    }

    fn submit(&self, request: Request, reply: Reply) {
        trace!(method = request.method(), token = %reply.token(), "Request queued");
        self.requests.borrow_mut().push_back((request, reply));
    }

    fn attach(&self, sink: EventSink) {
        *self.sink.borrow_mut() = Some(sink);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "it's ok in tests")]

    use std::rc::Rc;

    use miniapp_data_model::{
        EventKind,
        command::{MainButtonParams, Visibility},
        theme::Color,
    };

    use super::*;
    use crate::{Facade, WebApp};

    fn facade() -> Rc<Facade<SimulatedHost>> {
        Facade::new(SimulatedHost::new(HostConfig::default()))
    }

    /// Record kinds of all events emitted for `kinds`.
    fn record(facade: &Facade<SimulatedHost>, kinds: &[EventKind]) -> Rc<RefCell<Vec<Event>>> {
        let events = Rc::new(RefCell::new(Vec::new()));
        for kind in kinds {
            let _handler = facade
                .subscribe(*kind, {
                    let events = Rc::clone(&events);
                    move |event| events.borrow_mut().push(event.clone())
                })
                .detach();
        }
        events
    }

    #[test]
    fn config_is_read_with_defaults() {
        let config: HostConfig =
            serde_json::from_str(r#"{"version": "6.9", "platform": "ios"}"#).unwrap();

        assert_eq!(config.version, Version::new(6, 9));
        assert_eq!(config.platform, "ios");
        assert_eq!(config.color_scheme, ColorScheme::Light);
        assert!((config.viewport_height - 400.0).abs() < f64::EPSILON);
    }

    #[test]
    fn expand_emits_stable_viewport_change() {
        let facade = facade();
        let events = record(&facade, &[EventKind::ViewportChanged]);

        facade.expand().unwrap();
        assert!(events.borrow().is_empty());
        assert!(!facade.viewport().is_expanded);

        facade.host().acknowledge();

        assert_eq!(
            *events.borrow(),
            [Event::ViewportChanged(payload::ViewportChanged {
                is_state_stable: true
            })]
        );
        let viewport = facade.viewport();
        assert!(viewport.is_expanded);
        assert!((viewport.stable_height - 800.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unstable_resize_keeps_stable_height() {
        let facade = facade();

        facade.host().resize_viewport(250.0, false);

        let viewport = facade.viewport();
        assert!((viewport.height - 250.0).abs() < f64::EPSILON);
        assert!((viewport.stable_height - 400.0).abs() < f64::EPSILON);
    }

    #[test]
    fn send_data_closes_mini_app() {
        let facade = facade();

        facade.send_data("{\"order\":42}".to_owned()).unwrap();
        assert!(!facade.host().is_closed());
        facade.host().acknowledge();

        assert!(facade.host().is_closed());
        assert_eq!(
            facade.host().executed(),
            [Command::SendData("{\"order\":42}".to_owned())]
        );
    }

    #[test]
    fn theme_change_is_visible_in_handler() {
        let facade = facade();
        let scheme = Rc::new(RefCell::new(None));
        let _handler = facade
            .subscribe(EventKind::ThemeChanged, {
                let facade = Rc::downgrade(&facade);
                let scheme = Rc::clone(&scheme);
                move |_event| {
                    *scheme.borrow_mut() = facade.upgrade().map(|facade| facade.color_scheme());
                }
            })
            .detach();

        facade.host().set_theme(
            ColorScheme::Dark,
            ThemeParams {
                bg_color: Some("#000".parse().unwrap()),
                ..ThemeParams::default()
            },
        );

        assert_eq!(*scheme.borrow(), Some(ColorScheme::Dark));
        assert_eq!(
            facade.theme_params().bg_color,
            Some("#000000".parse::<Color>().unwrap())
        );
    }

    #[test]
    fn hidden_buttons_are_not_clickable() {
        let facade = facade();
        let events = record(
            &facade,
            &[EventKind::BackButtonClicked, EventKind::SettingsButtonClicked],
        );

        assert!(!facade.host().click_back_button());
        assert!(!facade.host().click_settings_button());
        facade.back_button_control().show().unwrap();
        facade.settings_button_control().show().unwrap();
        facade.host().acknowledge();
        assert!(facade.host().click_back_button());
        assert!(facade.host().click_settings_button());

        assert_eq!(
            *events.borrow(),
            [Event::BackButtonClicked, Event::SettingsButtonClicked]
        );
    }

    #[test]
    fn inactive_main_button_is_not_clickable() {
        let facade = facade();
        facade
            .execute(Command::MainButton(MainButtonCommand::SetParams(
                MainButtonParams {
                    is_visible: Some(true),
                    is_active: Some(false),
                    ..MainButtonParams::default()
                },
            )))
            .unwrap();
        facade.host().acknowledge();
        assert!(!facade.host().click_main_button());

        facade.main_button_control().enable().unwrap();
        facade.host().acknowledge();
        assert!(facade.host().click_main_button());
    }

    #[test]
    fn hidden_progress_reactivates_main_button() {
        let facade = facade();
        facade
            .main_button_control()
            .show_progress(false)
            .unwrap()
            .hide_progress()
            .unwrap();
        facade.host().acknowledge();

        let button = facade.main_button();
        assert!(!button.is_progress_visible);
        assert!(button.is_active);
    }

    #[test]
    fn close_scan_qr_popup_emits_event() {
        let facade = facade();
        let events = record(&facade, &[EventKind::ScanQrPopupClosed]);

        facade.close_scan_qr_popup().unwrap();
        facade.host().acknowledge();

        assert_eq!(*events.borrow(), [Event::ScanQrPopupClosed]);
    }

    #[test]
    fn commands_issued_by_handlers_are_applied_in_same_acknowledgement() {
        let facade = facade();
        let _handler = facade
            .subscribe(EventKind::ViewportChanged, {
                let facade = Rc::downgrade(&facade);
                move |_event| {
                    if let Some(facade) = facade.upgrade() {
                        facade
                            .execute(Command::BackButton(Visibility::Show))
                            .unwrap();
                    }
                }
            })
            .detach();

        facade.expand().unwrap();

        assert_eq!(facade.host().acknowledge(), 2);
        assert!(facade.back_button().is_visible);
    }

    #[test]
    fn cloud_storage_leaves_other_requests_queued() {
        let facade = facade();
        let _alert = facade
            .show_alert(facade.next_token(), "Hi".to_owned())
            .unwrap();
        let _keys = facade.cloud_storage().get_keys(facade.next_token()).unwrap();

        assert_eq!(facade.host().serve_cloud_storage(), 1);

        assert_eq!(
            facade.host().pending_requests(),
            [Request::ShowAlert("Hi".to_owned())]
        );
    }

    #[test]
    fn events_are_discarded_before_attach() {
        let host = SimulatedHost::new(HostConfig::default());
        host.emit(Event::ThemeChanged);
        assert!(host.reply_next(Ok(Outcome::AlertClosed)).is_none());
    }
}
