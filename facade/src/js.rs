//! Module with [`JsHost`] forwarding everything to the real `window.Telegram.WebApp` object
//! injected by the [Telegram JS script](https://telegram.org/js/telegram-web-app.js).
//!
//! For all possible methods and fields see <https://core.telegram.org/bots/webapps#initializing-mini-apps>.

#![allow(non_snake_case, reason = "JS method names")]

use std::{
    cell::{Cell, RefCell},
    collections::BTreeMap,
    fmt,
    rc::Rc,
};

use js_sys::{JSON, Reflect};
use miniapp_data_model::{
    Command, Event, EventKind, HostError, HostState, Outcome, Request, Response, Version,
    command::{HapticFeedback, MainButtonCommand, Visibility},
    control::{BackButton, BiometricManager, MainButton, SettingsButton, Viewport},
    request::{CloudStorageRequest, StorageKey},
};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{trace, warn};
use wasm_bindgen::prelude::*;

use crate::{Error, EventSink, Host, Reply, Result};

#[wasm_bindgen]
extern "C" {
    /// `Telegram.WebApp` object.
    ///
    /// It's not a class, so only unchecked casts work.
    type RawWebApp;

    #[wasm_bindgen(method, getter, js_name = initData)]
    fn init_data(this: &RawWebApp) -> Option<String>;
    #[wasm_bindgen(method, getter)]
    fn version(this: &RawWebApp) -> Option<String>;
    #[wasm_bindgen(method, getter)]
    fn platform(this: &RawWebApp) -> Option<String>;
    #[wasm_bindgen(method, getter, js_name = colorScheme)]
    fn color_scheme(this: &RawWebApp) -> Option<String>;
    #[wasm_bindgen(method, getter, js_name = themeParams)]
    fn theme_params(this: &RawWebApp) -> JsValue;
    #[wasm_bindgen(method, getter, js_name = viewportHeight)]
    fn viewport_height(this: &RawWebApp) -> Option<f64>;
    #[wasm_bindgen(method, getter, js_name = viewportStableHeight)]
    fn viewport_stable_height(this: &RawWebApp) -> Option<f64>;
    #[wasm_bindgen(method, getter, js_name = isExpanded)]
    fn is_expanded(this: &RawWebApp) -> Option<bool>;
    #[wasm_bindgen(method, getter, js_name = headerColor)]
    fn header_color(this: &RawWebApp) -> Option<String>;
    #[wasm_bindgen(method, getter, js_name = backgroundColor)]
    fn background_color(this: &RawWebApp) -> Option<String>;
    #[wasm_bindgen(method, getter, js_name = isClosingConfirmationEnabled)]
    fn is_closing_confirmation_enabled(this: &RawWebApp) -> Option<bool>;
    #[wasm_bindgen(method, getter, js_name = isVerticalSwipesEnabled)]
    fn is_vertical_swipes_enabled(this: &RawWebApp) -> Option<bool>;

    #[wasm_bindgen(method, getter = MainButton)]
    fn main_button(this: &RawWebApp) -> RawMainButton;
    #[wasm_bindgen(method, getter = BackButton)]
    fn back_button(this: &RawWebApp) -> RawButton;
    #[wasm_bindgen(method, getter = SettingsButton)]
    fn settings_button(this: &RawWebApp) -> RawButton;
    #[wasm_bindgen(method, getter = HapticFeedback)]
    fn haptic_feedback(this: &RawWebApp) -> RawHapticFeedback;
    #[wasm_bindgen(method, getter = CloudStorage)]
    fn cloud_storage(this: &RawWebApp) -> RawCloudStorage;
    #[wasm_bindgen(method, getter = BiometricManager)]
    fn biometric_manager(this: &RawWebApp) -> RawBiometricManager;

    #[wasm_bindgen(method, catch)]
    fn ready(this: &RawWebApp) -> Result<(), JsValue>;
    #[wasm_bindgen(method, catch)]
    fn expand(this: &RawWebApp) -> Result<(), JsValue>;
    #[wasm_bindgen(method, catch)]
    fn close(this: &RawWebApp) -> Result<(), JsValue>;
    #[wasm_bindgen(method, catch)]
    fn setHeaderColor(this: &RawWebApp, color: &str) -> Result<(), JsValue>;
    #[wasm_bindgen(method, catch)]
    fn setBackgroundColor(this: &RawWebApp, color: &str) -> Result<(), JsValue>;
    #[wasm_bindgen(method, catch)]
    fn enableClosingConfirmation(this: &RawWebApp) -> Result<(), JsValue>;
    #[wasm_bindgen(method, catch)]
    fn disableClosingConfirmation(this: &RawWebApp) -> Result<(), JsValue>;
    #[wasm_bindgen(method, catch)]
    fn enableVerticalSwipes(this: &RawWebApp) -> Result<(), JsValue>;
    #[wasm_bindgen(method, catch)]
    fn disableVerticalSwipes(this: &RawWebApp) -> Result<(), JsValue>;
    #[wasm_bindgen(method, catch)]
    fn sendData(this: &RawWebApp, data: &str) -> Result<(), JsValue>;
    #[wasm_bindgen(method, catch)]
    fn switchInlineQuery(this: &RawWebApp, query: &str, chat_types: JsValue) -> Result<(), JsValue>;
    #[wasm_bindgen(method, catch)]
    fn openLink(this: &RawWebApp, url: &str, options: JsValue) -> Result<(), JsValue>;
    #[wasm_bindgen(method, catch)]
    fn openTelegramLink(this: &RawWebApp, url: &str) -> Result<(), JsValue>;
    #[wasm_bindgen(method, catch)]
    fn shareToStory(this: &RawWebApp, media_url: &str, params: JsValue) -> Result<(), JsValue>;
    #[wasm_bindgen(method, catch)]
    fn closeScanQrPopup(this: &RawWebApp) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch)]
    fn showPopup(this: &RawWebApp, params: JsValue, callback: JsValue) -> Result<(), JsValue>;
    #[wasm_bindgen(method, catch)]
    fn showAlert(this: &RawWebApp, message: &str, callback: JsValue) -> Result<(), JsValue>;
    #[wasm_bindgen(method, catch)]
    fn showConfirm(this: &RawWebApp, message: &str, callback: JsValue) -> Result<(), JsValue>;
    #[wasm_bindgen(method, catch)]
    fn showScanQrPopup(this: &RawWebApp, params: JsValue, callback: JsValue)
    -> Result<(), JsValue>;
    #[wasm_bindgen(method, catch)]
    fn readTextFromClipboard(this: &RawWebApp, callback: JsValue) -> Result<(), JsValue>;
    #[wasm_bindgen(method, catch)]
    fn requestWriteAccess(this: &RawWebApp, callback: JsValue) -> Result<(), JsValue>;
    #[wasm_bindgen(method, catch)]
    fn requestContact(this: &RawWebApp, callback: JsValue) -> Result<(), JsValue>;
    #[wasm_bindgen(method, catch)]
    fn openInvoice(this: &RawWebApp, url: &str, callback: JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(method)]
    fn onEvent(this: &RawWebApp, event_type: &str, handler: &JsValue);
    #[wasm_bindgen(method)]
    fn offEvent(this: &RawWebApp, event_type: &str, handler: &JsValue);

    /// `Telegram.WebApp.MainButton` object.
    type RawMainButton;

    #[wasm_bindgen(method, getter)]
    fn text(this: &RawMainButton) -> Option<String>;
    #[wasm_bindgen(method, getter)]
    fn color(this: &RawMainButton) -> Option<String>;
    #[wasm_bindgen(method, getter, js_name = textColor)]
    fn text_color(this: &RawMainButton) -> Option<String>;
    #[wasm_bindgen(method, getter, js_name = isVisible)]
    fn is_visible(this: &RawMainButton) -> Option<bool>;
    #[wasm_bindgen(method, getter, js_name = isActive)]
    fn is_active(this: &RawMainButton) -> Option<bool>;
    #[wasm_bindgen(method, getter, js_name = isProgressVisible)]
    fn is_progress_visible(this: &RawMainButton) -> Option<bool>;

    #[wasm_bindgen(method, catch)]
    fn setText(this: &RawMainButton, text: &str) -> Result<(), JsValue>;
    #[wasm_bindgen(method, catch)]
    fn show(this: &RawMainButton) -> Result<(), JsValue>;
    #[wasm_bindgen(method, catch)]
    fn hide(this: &RawMainButton) -> Result<(), JsValue>;
    #[wasm_bindgen(method, catch)]
    fn enable(this: &RawMainButton) -> Result<(), JsValue>;
    #[wasm_bindgen(method, catch)]
    fn disable(this: &RawMainButton) -> Result<(), JsValue>;
    #[wasm_bindgen(method, catch)]
    fn showProgress(this: &RawMainButton, leave_active: bool) -> Result<(), JsValue>;
    #[wasm_bindgen(method, catch)]
    fn hideProgress(this: &RawMainButton) -> Result<(), JsValue>;
    #[wasm_bindgen(method, catch)]
    fn setParams(this: &RawMainButton, params: JsValue) -> Result<(), JsValue>;

    /// `Telegram.WebApp.BackButton` and `Telegram.WebApp.SettingsButton` objects.
    type RawButton;

    #[wasm_bindgen(method, getter, js_name = isVisible)]
    fn is_visible(this: &RawButton) -> Option<bool>;
    #[wasm_bindgen(method, catch)]
    fn show(this: &RawButton) -> Result<(), JsValue>;
    #[wasm_bindgen(method, catch)]
    fn hide(this: &RawButton) -> Result<(), JsValue>;

    /// `Telegram.WebApp.HapticFeedback` object.
    type RawHapticFeedback;

    #[wasm_bindgen(method, catch)]
    fn impactOccurred(this: &RawHapticFeedback, style: &str) -> Result<(), JsValue>;
    #[wasm_bindgen(method, catch)]
    fn notificationOccurred(this: &RawHapticFeedback, kind: &str) -> Result<(), JsValue>;
    #[wasm_bindgen(method, catch)]
    fn selectionChanged(this: &RawHapticFeedback) -> Result<(), JsValue>;

    /// `Telegram.WebApp.CloudStorage` object. Every callback is error-first.
    type RawCloudStorage;

    #[wasm_bindgen(method, catch)]
    fn setItem(this: &RawCloudStorage, key: &str, value: &str, callback: JsValue)
    -> Result<(), JsValue>;
    #[wasm_bindgen(method, catch)]
    fn getItem(this: &RawCloudStorage, key: &str, callback: JsValue) -> Result<(), JsValue>;
    #[wasm_bindgen(method, catch)]
    fn getItems(this: &RawCloudStorage, keys: JsValue, callback: JsValue) -> Result<(), JsValue>;
    #[wasm_bindgen(method, catch)]
    fn removeItem(this: &RawCloudStorage, key: &str, callback: JsValue) -> Result<(), JsValue>;
    #[wasm_bindgen(method, catch)]
    fn removeItems(this: &RawCloudStorage, keys: JsValue, callback: JsValue)
    -> Result<(), JsValue>;
    #[wasm_bindgen(method, catch)]
    fn getKeys(this: &RawCloudStorage, callback: JsValue) -> Result<(), JsValue>;

    /// `Telegram.WebApp.BiometricManager` object.
    type RawBiometricManager;

    #[wasm_bindgen(method, getter, js_name = isInited)]
    fn is_inited(this: &RawBiometricManager) -> Option<bool>;
    #[wasm_bindgen(method, getter, js_name = isBiometricAvailable)]
    fn is_biometric_available(this: &RawBiometricManager) -> Option<bool>;
    #[wasm_bindgen(method, getter, js_name = biometricType)]
    fn biometric_type(this: &RawBiometricManager) -> Option<String>;
    #[wasm_bindgen(method, getter, js_name = isAccessRequested)]
    fn is_access_requested(this: &RawBiometricManager) -> Option<bool>;
    #[wasm_bindgen(method, getter, js_name = isAccessGranted)]
    fn is_access_granted(this: &RawBiometricManager) -> Option<bool>;
    #[wasm_bindgen(method, getter, js_name = isBiometricTokenSaved)]
    fn is_biometric_token_saved(this: &RawBiometricManager) -> Option<bool>;
    #[wasm_bindgen(method, getter, js_name = deviceId)]
    fn device_id(this: &RawBiometricManager) -> Option<String>;

    #[wasm_bindgen(method, catch)]
    fn init(this: &RawBiometricManager, callback: JsValue) -> Result<(), JsValue>;
    #[wasm_bindgen(method, catch)]
    fn requestAccess(this: &RawBiometricManager, params: JsValue, callback: JsValue)
    -> Result<(), JsValue>;
    #[wasm_bindgen(method, catch)]
    fn authenticate(this: &RawBiometricManager, params: JsValue, callback: JsValue)
    -> Result<(), JsValue>;
    #[wasm_bindgen(method, catch)]
    fn updateBiometricToken(this: &RawBiometricManager, token: &str, callback: JsValue)
    -> Result<(), JsValue>;
    #[wasm_bindgen(method, catch)]
    fn openSettings(this: &RawBiometricManager) -> Result<(), JsValue>;
}

/// Host backed by `window.Telegram.WebApp`.
pub struct JsHost {
    /// The host object.
    web_app: RawWebApp,
    /// JS closures registered with `onEvent`, one per event kind.
    handlers: RefCell<Vec<(EventKind, Closure<dyn Fn(JsValue)>)>>,
}

impl JsHost {
    /// Locate `window.Telegram.WebApp`.
    ///
    /// # Errors
    ///
    /// Fails if the Telegram JS script is not loaded.
    pub fn from_window() -> Result<Self> {
        let window =
            web_sys::window().ok_or_else(|| Error::HostUnavailable("no `window`".to_owned()))?;
        let telegram = property(&window, "Telegram")?;
        let web_app = property(&telegram, "WebApp")?;

        Ok(Self {
            web_app: web_app.unchecked_into::<RawWebApp>(),
            handlers: RefCell::default(),
        })
    }

    /// Apply `command` to the host object.
    fn apply(&self, command: Command) -> Result<(), JsValue> {
        let web_app = &self.web_app;
        match command {
            Command::Ready => web_app.ready(),
            Command::Expand => web_app.expand(),
            Command::Close => web_app.close(),
            Command::SetHeaderColor(color) => web_app.setHeaderColor(color.as_str()),
            Command::SetBackgroundColor(color) => web_app.setBackgroundColor(color.as_str()),
            Command::SetClosingConfirmation(true) => web_app.enableClosingConfirmation(),
            Command::SetClosingConfirmation(false) => web_app.disableClosingConfirmation(),
            Command::SetVerticalSwipes(true) => web_app.enableVerticalSwipes(),
            Command::SetVerticalSwipes(false) => web_app.disableVerticalSwipes(),
            // Host checks some properties of the data itself, so it's passed as a string
            Command::SendData(data) => web_app.sendData(&data),
            Command::SwitchInlineQuery { query, chat_types } => {
                let chat_types = if chat_types.is_empty() {
                    JsValue::UNDEFINED
                } else {
                    to_js(&chat_types)?
                };
                web_app.switchInlineQuery(&query, chat_types)
            }
            Command::OpenLink {
                url,
                try_instant_view,
            } => web_app.openLink(
                url.as_str(),
                to_js(&serde_json::json!({ "try_instant_view": try_instant_view }))?,
            ),
            Command::OpenTelegramLink(url) => web_app.openTelegramLink(url.as_str()),
            Command::ShareToStory { media_url, params } => {
                web_app.shareToStory(media_url.as_str(), to_js(&params)?)
            }
            Command::CloseScanQrPopup => web_app.closeScanQrPopup(),
            Command::MainButton(command) => {
                let button = web_app.main_button();
                match command {
                    MainButtonCommand::SetText(text) => button.setText(&text),
                    MainButtonCommand::Visibility(Visibility::Show) => button.show(),
                    MainButtonCommand::Visibility(Visibility::Hide) => button.hide(),
                    MainButtonCommand::SetActive(true) => button.enable(),
                    MainButtonCommand::SetActive(false) => button.disable(),
                    MainButtonCommand::ShowProgress { leave_active } => {
                        button.showProgress(leave_active)
                    }
                    MainButtonCommand::HideProgress => button.hideProgress(),
                    MainButtonCommand::SetParams(params) => button.setParams(to_js(&params)?),
                }
            }
            Command::BackButton(visibility) => toggle(&web_app.back_button(), visibility),
            Command::SettingsButton(visibility) => toggle(&web_app.settings_button(), visibility),
            Command::Haptic(feedback) => {
                let haptic = web_app.haptic_feedback();
                match feedback {
                    HapticFeedback::Impact(style) => haptic.impactOccurred(&style.to_string()),
                    HapticFeedback::Notification(kind) => {
                        haptic.notificationOccurred(&kind.to_string())
                    }
                    HapticFeedback::SelectionChanged => haptic.selectionChanged(),
                }
            }
            Command::OpenBiometricSettings => web_app.biometric_manager().openSettings(),
        }
    }

    /// Pass `request` to the host object together with a callback sending the response to
    /// `reply`.
    fn forward(&self, request: Request, reply: &SharedReply) -> Result<(), JsValue> {
        let web_app = &self.web_app;
        match request {
            Request::ShowPopup(params) => web_app.showPopup(
                to_js(&params)?,
                callback(reply, |button_id| {
                    Ok(Outcome::PopupClosed {
                        button_id: button_id.as_string().filter(|id| !id.is_empty()),
                    })
                }),
            ),
            Request::ShowAlert(message) => {
                web_app.showAlert(&message, callback(reply, |_| Ok(Outcome::AlertClosed)))
            }
            Request::ShowConfirm(message) => web_app.showConfirm(
                &message,
                callback(reply, |ok| Ok(Outcome::Confirmed(ok.is_truthy()))),
            ),
            Request::ShowScanQrPopup(params) => {
                let reply = Rc::clone(reply);
                let keep_open = params.keep_open;
                // Called for every scanned code, returning `true` closes the scanner.
                // A kept open scanner resolves the request with `scanQrPopupClosed` only.
                let callback = Closure::<dyn FnMut(JsValue) -> bool>::new(move |text: JsValue| {
                    if keep_open {
                        return false;
                    }
                    send(
                        &reply,
                        Ok(Outcome::QrText(text.as_string().unwrap_or_default())),
                    );
                    true
                });
                web_app.showScanQrPopup(to_js(&params)?, callback.into_js_value())
            }
            Request::ReadTextFromClipboard => web_app.readTextFromClipboard(callback(
                reply,
                |text| Ok(Outcome::ClipboardText(text.as_string())),
            )),
            Request::RequestWriteAccess => web_app.requestWriteAccess(callback(reply, |allowed| {
                Ok(Outcome::WriteAccess(allowed.is_truthy()))
            })),
            Request::RequestContact => web_app.requestContact(callback(reply, |sent| {
                Ok(Outcome::ContactShared(sent.is_truthy()))
            })),
            Request::OpenInvoice(url) => web_app.openInvoice(
                &url,
                callback(reply, |status| {
                    let status = status.as_string().unwrap_or_default();
                    status
                        .parse()
                        .map(Outcome::Invoice)
                        .map_err(|_err| HostError(format!("unknown invoice status `{status}`")))
                }),
            ),
            Request::BiometricInit => web_app
                .biometric_manager()
                .init(callback(reply, |_| Ok(Outcome::BiometricInited))),
            Request::BiometricRequestAccess(params) => web_app.biometric_manager().requestAccess(
                to_js(&params)?,
                callback(reply, |granted| Ok(Outcome::BiometricAccess(granted.is_truthy()))),
            ),
            Request::BiometricAuthenticate(params) => {
                let reply = Rc::clone(reply);
                let callback =
                    Closure::once_into_js(move |authenticated: JsValue, token: JsValue| {
                        send(
                            &reply,
                            Ok(Outcome::BiometricAuthenticated {
                                is_authenticated: authenticated.is_truthy(),
                                token: token.as_string(),
                            }),
                        );
                    });
                web_app
                    .biometric_manager()
                    .authenticate(to_js(&params)?, callback)
            }
            Request::BiometricUpdateToken(token) => {
                web_app.biometric_manager().updateBiometricToken(
                    &token,
                    callback(reply, |updated| {
                        Ok(Outcome::BiometricTokenUpdated(updated.is_truthy()))
                    }),
                )
            }
            Request::CloudStorage(request) => self.forward_cloud_storage(request, reply),
        }
    }

    fn forward_cloud_storage(
        &self,
        request: CloudStorageRequest,
        reply: &SharedReply,
    ) -> Result<(), JsValue> {
        let storage = self.web_app.cloud_storage();
        match request {
            CloudStorageRequest::SetItem { key, value } => storage.setItem(
                key.as_str(),
                &value,
                error_first(reply, |stored| Ok(Outcome::Stored(stored.is_truthy()))),
            ),
            CloudStorageRequest::GetItem(key) => storage.getItem(
                key.as_str(),
                error_first(reply, |value| {
                    Ok(Outcome::Value(value.as_string().unwrap_or_default()))
                }),
            ),
            CloudStorageRequest::GetItems(keys) => storage.getItems(
                to_js(&keys.iter().map(StorageKey::as_str).collect::<Vec<_>>())?,
                error_first(reply, |values| {
                    from_js::<BTreeMap<String, String>>(&values).map(Outcome::Values)
                }),
            ),
            CloudStorageRequest::RemoveItem(key) => storage.removeItem(
                key.as_str(),
                error_first(reply, |removed| Ok(Outcome::Removed(removed.is_truthy()))),
            ),
            CloudStorageRequest::RemoveItems(keys) => storage.removeItems(
                to_js(&keys.iter().map(StorageKey::as_str).collect::<Vec<_>>())?,
                error_first(reply, |removed| Ok(Outcome::Removed(removed.is_truthy()))),
            ),
            CloudStorageRequest::GetKeys => storage.getKeys(error_first(reply, |keys| {
                from_js::<Vec<String>>(&keys).map(Outcome::Keys)
            })),
        }
    }

    fn main_button_state(&self) -> MainButton {
        let button = self.web_app.main_button();
        let default = MainButton::default();
        MainButton {
            text: button.text().unwrap_or(default.text),
            color: button.color().unwrap_or(default.color),
            text_color: button.text_color().unwrap_or(default.text_color),
            is_visible: button.is_visible().unwrap_or_default(),
            is_active: button.is_active().unwrap_or(default.is_active),
            is_progress_visible: button.is_progress_visible().unwrap_or_default(),
        }
    }

    fn biometric_manager_state(&self) -> BiometricManager {
        let manager = self.web_app.biometric_manager();
        if manager.is_undefined() {
            return BiometricManager::default();
        }
        BiometricManager {
            is_inited: manager.is_inited().unwrap_or_default(),
            is_biometric_available: manager.is_biometric_available().unwrap_or_default(),
            biometric_type: manager
                .biometric_type()
                .and_then(|kind| kind.parse().ok())
                .unwrap_or_default(),
            is_access_requested: manager.is_access_requested().unwrap_or_default(),
            is_access_granted: manager.is_access_granted().unwrap_or_default(),
            is_biometric_token_saved: manager.is_biometric_token_saved().unwrap_or_default(),
            device_id: manager.device_id().unwrap_or_default(),
        }
    }
}

impl Host for JsHost {
    fn state(&self) -> HostState {
        let web_app = &self.web_app;
        let theme_params = from_js(&web_app.theme_params()).unwrap_or_else(|err| {
            warn!(%err, "Failed to read theme params");
            Default::default()
        });
        let button_visibility = |button: RawButton| {
            if button.is_undefined() {
                false
            } else {
                button.is_visible().unwrap_or_default()
            }
        };

        HostState {
            init_data: web_app.init_data().unwrap_or_default(),
            version: self.version(),
            platform: web_app.platform().unwrap_or_default(),
            color_scheme: web_app
                .color_scheme()
                .and_then(|scheme| scheme.parse().ok())
                .unwrap_or_default(),
            theme_params,
            viewport: Viewport {
                height: web_app.viewport_height().unwrap_or_default(),
                stable_height: web_app.viewport_stable_height().unwrap_or_default(),
                is_expanded: web_app.is_expanded().unwrap_or_default(),
            },
            header_color: web_app
                .header_color()
                .and_then(|color| color.parse().ok())
                .unwrap_or_default(),
            background_color: web_app.background_color().unwrap_or_default(),
            is_closing_confirmation_enabled: web_app
                .is_closing_confirmation_enabled()
                .unwrap_or_default(),
            is_vertical_swipes_enabled: web_app.is_vertical_swipes_enabled().unwrap_or(true),
            main_button: self.main_button_state(),
            back_button: BackButton {
                is_visible: button_visibility(web_app.back_button()),
            },
            settings_button: SettingsButton {
                is_visible: button_visibility(web_app.settings_button()),
            },
            biometric_manager: self.biometric_manager_state(),
        }
    }

    fn version(&self) -> Version {
        Version::lossy(&self.web_app.version().unwrap_or_default())
    }

    fn execute(&self, command: Command) {
        let method = command.method();
        if let Err(err) = self.apply(command) {
            warn!(method, ?err, "Host rejected command");
        }
    }

    fn submit(&self, request: Request, reply: Reply) {
        let method = request.method();
        let reply = Rc::new(Cell::new(Some(reply)));
        if let Err(err) = self.forward(request, &reply) {
            warn!(method, ?err, "Host rejected request");
            send(&reply, Err(HostError(describe(&err))));
        }
    }

    fn attach(&self, sink: EventSink) {
        let mut handlers = self.handlers.borrow_mut();
        for kind in EventKind::ALL {
            let sink = sink.clone();
            let handler = Closure::<dyn Fn(JsValue)>::new(move |payload: JsValue| {
                let payload = JSON::stringify(&payload)
                    .ok()
                    .and_then(|json| JsValue::from(json).as_string());
                match Event::from_json(kind, payload.as_deref()) {
                    Ok(event) => sink.emit(event),
                    Err(err) => warn!(%kind, %err, ?payload, "Failed to parse event payload"),
                }
            });
            self.web_app
                .onEvent(&kind.to_string(), handler.as_ref());
            handlers.push((kind, handler));
        }
        trace!(count = handlers.len(), "Event handlers registered");
    }
}

impl Drop for JsHost {
    fn drop(&mut self) {
        for (kind, handler) in self.handlers.get_mut().drain(..) {
            self.web_app
                .offEvent(&kind.to_string(), handler.as_ref());
        }
    }
}

impl fmt::Debug for JsHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsHost")
            .field("handlers", &self.handlers.borrow().len())
            .finish_non_exhaustive()
    }
}

/// Read `name` property of `target`, failing if it's absent.
fn property(target: &JsValue, name: &str) -> Result<JsValue> {
    let value = Reflect::get(target, &JsValue::from_str(name))
        .map_err(|err| Error::HostUnavailable(describe(&err)))?;
    if value.is_undefined() || value.is_null() {
        return Err(Error::HostUnavailable(format!("no `{name}` found")));
    }
    Ok(value)
}

fn toggle(button: &RawButton, visibility: Visibility) -> Result<(), JsValue> {
    match visibility {
        Visibility::Show => button.show(),
        Visibility::Hide => button.hide(),
    }
}

/// Convert `value` to a JS object through JSON.
///
/// Host checks argument types and lengths itself, so plain JSON objects work better than
/// something like `serde_wasm_bindgen`.
fn to_js(value: &impl Serialize) -> Result<JsValue, JsValue> {
    let json = serde_json::to_string(value).map_err(|err| JsValue::from_str(&err.to_string()))?;
    JSON::parse(&json)
}

/// Convert JS `value` through JSON.
fn from_js<T: DeserializeOwned>(value: &JsValue) -> Result<T, HostError> {
    let json = JSON::stringify(value)
        .ok()
        .and_then(|json| JsValue::from(json).as_string())
        .ok_or_else(|| HostError("value is not serializable".to_owned()))?;
    serde_json::from_str(&json).map_err(|err| HostError::from(err.to_string()))
}

/// Human-readable form of a JS exception.
fn describe(err: &JsValue) -> String {
    err.as_string()
        .or_else(|| {
            err.dyn_ref::<js_sys::Error>()
                .map(|err| String::from(err.message()))
        })
        .unwrap_or_else(|| format!("{err:?}"))
}

/// Reply shared by the JS callback and [`JsHost::submit()`] reporting a thrown exception.
///
/// Whoever comes first takes it.
type SharedReply = Rc<Cell<Option<Reply>>>;

fn send(reply: &SharedReply, response: Response) {
    if let Some(reply) = reply.take() {
        reply.send(response);
    }
}

/// JS callback sending the outcome built from its single argument to `reply`.
fn callback(reply: &SharedReply, outcome: impl FnOnce(JsValue) -> Response + 'static) -> JsValue {
    let reply = Rc::clone(reply);
    Closure::once_into_js(move |value: JsValue| send(&reply, outcome(value)))
}

/// Error-first JS callback sending the outcome built from its second argument to `reply`.
fn error_first(
    reply: &SharedReply,
    outcome: impl FnOnce(JsValue) -> Response + 'static,
) -> JsValue {
    let reply = Rc::clone(reply);
    Closure::once_into_js(move |err: JsValue, value: JsValue| {
        let response = if err.is_null() || err.is_undefined() {
            outcome(value)
        } else {
            Err(describe(&err).into())
        };
        send(&reply, response);
    })
}
