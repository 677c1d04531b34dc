//! Module with handles grouping operations on a single host-rendered control or service.
//!
//! Handles borrow the [`WebApp`] and hold no state of their own, so they are cheap to create
//! on every use.

use miniapp_data_model::{
    Command, EventKind, Request,
    command::{MainButtonCommand, MainButtonParams, Visibility},
    control::{BackButton, BiometricManager, MainButton, SettingsButton},
    request::{BiometricParams, CloudStorageRequest, StorageKey},
};
use nonempty::NonEmpty;

use crate::{Handler, RequestToken, ResponseFuture, Result, WebApp};

/// Button displayed at the bottom of the Mini App.
#[derive(Debug)]
pub struct MainButtonControl<'web_app, W: ?Sized> {
    /// Host capabilities.
    web_app: &'web_app W,
}

impl<'web_app, W: WebApp + ?Sized> MainButtonControl<'web_app, W> {
    pub(crate) const fn new(web_app: &'web_app W) -> Self {
        Self { web_app }
    }

    /// Current state of the button.
    pub fn state(&self) -> MainButton {
        self.web_app.main_button()
    }

    fn execute(&self, command: MainButtonCommand) -> Result<&Self> {
        self.web_app.execute(Command::MainButton(command))?;
        Ok(self)
    }

    /// # Errors
    ///
    /// Fails if `text` is empty or longer than 64 characters.
    pub fn set_text(&self, text: impl Into<String>) -> Result<&Self> {
        self.execute(MainButtonCommand::SetText(text.into()))
    }

    /// # Errors
    ///
    /// See [`WebApp::execute()`].
    pub fn show(&self) -> Result<&Self> {
        self.execute(MainButtonCommand::Visibility(Visibility::Show))
    }

    /// # Errors
    ///
    /// See [`WebApp::execute()`].
    pub fn hide(&self) -> Result<&Self> {
        self.execute(MainButtonCommand::Visibility(Visibility::Hide))
    }

    /// # Errors
    ///
    /// See [`WebApp::execute()`].
    pub fn enable(&self) -> Result<&Self> {
        self.execute(MainButtonCommand::SetActive(true))
    }

    /// # Errors
    ///
    /// See [`WebApp::execute()`].
    pub fn disable(&self) -> Result<&Self> {
        self.execute(MainButtonCommand::SetActive(false))
    }

    /// Show a loading indicator. The button is disabled unless `leave_active` is `true`.
    ///
    /// # Errors
    ///
    /// See [`WebApp::execute()`].
    pub fn show_progress(&self, leave_active: bool) -> Result<&Self> {
        self.execute(MainButtonCommand::ShowProgress { leave_active })
    }

    /// # Errors
    ///
    /// See [`WebApp::execute()`].
    pub fn hide_progress(&self) -> Result<&Self> {
        self.execute(MainButtonCommand::HideProgress)
    }

    /// # Errors
    ///
    /// Fails if the new text is empty or longer than 64 characters.
    pub fn set_params(&self, params: MainButtonParams) -> Result<&Self> {
        self.execute(MainButtonCommand::SetParams(params))
    }

    /// Call `handler` on every click.
    pub fn on_click(&self, handler: Handler) -> &Self {
        self.web_app.on_event(EventKind::MainButtonClicked, handler);
        self
    }

    /// Stop calling `handler` on clicks. Returns `false` if it wasn't registered.
    pub fn off_click(&self, handler: &Handler) -> bool {
        self.web_app.off_event(EventKind::MainButtonClicked, handler)
    }
}

/// Back button in the header of the Mini App.
#[derive(Debug)]
pub struct BackButtonControl<'web_app, W: ?Sized> {
    /// Host capabilities.
    web_app: &'web_app W,
}

impl<'web_app, W: WebApp + ?Sized> BackButtonControl<'web_app, W> {
    pub(crate) const fn new(web_app: &'web_app W) -> Self {
        Self { web_app }
    }

    /// Current state of the button.
    pub fn state(&self) -> BackButton {
        self.web_app.back_button()
    }

    /// # Errors
    ///
    /// See [`WebApp::execute()`].
    pub fn show(&self) -> Result<&Self> {
        self.web_app
            .execute(Command::BackButton(Visibility::Show))?;
        Ok(self)
    }

    /// # Errors
    ///
    /// See [`WebApp::execute()`].
    pub fn hide(&self) -> Result<&Self> {
        self.web_app
            .execute(Command::BackButton(Visibility::Hide))?;
        Ok(self)
    }

    /// Call `handler` on every click.
    pub fn on_click(&self, handler: Handler) -> &Self {
        self.web_app.on_event(EventKind::BackButtonClicked, handler);
        self
    }

    /// Stop calling `handler` on clicks. Returns `false` if it wasn't registered.
    pub fn off_click(&self, handler: &Handler) -> bool {
        self.web_app.off_event(EventKind::BackButtonClicked, handler)
    }
}

/// "Settings" item in the context menu of the Mini App.
#[derive(Debug)]
pub struct SettingsButtonControl<'web_app, W: ?Sized> {
    /// Host capabilities.
    web_app: &'web_app W,
}

impl<'web_app, W: WebApp + ?Sized> SettingsButtonControl<'web_app, W> {
    pub(crate) const fn new(web_app: &'web_app W) -> Self {
        Self { web_app }
    }

    /// Current state of the menu item.
    pub fn state(&self) -> SettingsButton {
        self.web_app.settings_button()
    }

    /// # Errors
    ///
    /// See [`WebApp::execute()`].
    pub fn show(&self) -> Result<&Self> {
        self.web_app
            .execute(Command::SettingsButton(Visibility::Show))?;
        Ok(self)
    }

    /// # Errors
    ///
    /// See [`WebApp::execute()`].
    pub fn hide(&self) -> Result<&Self> {
        self.web_app
            .execute(Command::SettingsButton(Visibility::Hide))?;
        Ok(self)
    }

    /// Call `handler` on every click.
    pub fn on_click(&self, handler: Handler) -> &Self {
        self.web_app
            .on_event(EventKind::SettingsButtonClicked, handler);
        self
    }

    /// Stop calling `handler` on clicks. Returns `false` if it wasn't registered.
    pub fn off_click(&self, handler: &Handler) -> bool {
        self.web_app
            .off_event(EventKind::SettingsButtonClicked, handler)
    }
}

/// Cloud storage of the bot, scoped to the current user.
///
/// Every operation resolves only through the completion callback.
#[derive(Debug)]
pub struct CloudStorage<'web_app, W: ?Sized> {
    /// Host capabilities.
    web_app: &'web_app W,
}

impl<'web_app, W: WebApp + ?Sized> CloudStorage<'web_app, W> {
    pub(crate) const fn new(web_app: &'web_app W) -> Self {
        Self { web_app }
    }

    fn request(&self, token: RequestToken, request: CloudStorageRequest) -> Result<ResponseFuture> {
        self.web_app.request(token, Request::CloudStorage(request))
    }

    /// Store `value` under `key`. Resolves with
    /// [`Outcome::Stored`](miniapp_data_model::Outcome::Stored).
    ///
    /// # Errors
    ///
    /// Fails if `value` is longer than 4096 characters.
    pub fn set_item(
        &self,
        token: RequestToken,
        key: StorageKey,
        value: impl Into<String>,
    ) -> Result<ResponseFuture> {
        self.request(
            token,
            CloudStorageRequest::SetItem {
                key,
                value: value.into(),
            },
        )
    }

    /// Resolves with [`Outcome::Value`](miniapp_data_model::Outcome::Value).
    ///
    /// # Errors
    ///
    /// See [`WebApp::submit()`].
    pub fn get_item(&self, token: RequestToken, key: StorageKey) -> Result<ResponseFuture> {
        self.request(token, CloudStorageRequest::GetItem(key))
    }

    /// Resolves with [`Outcome::Values`](miniapp_data_model::Outcome::Values).
    ///
    /// # Errors
    ///
    /// See [`WebApp::submit()`].
    pub fn get_items(
        &self,
        token: RequestToken,
        keys: NonEmpty<StorageKey>,
    ) -> Result<ResponseFuture> {
        self.request(token, CloudStorageRequest::GetItems(keys))
    }

    /// Resolves with [`Outcome::Removed`](miniapp_data_model::Outcome::Removed).
    ///
    /// # Errors
    ///
    /// See [`WebApp::submit()`].
    pub fn remove_item(&self, token: RequestToken, key: StorageKey) -> Result<ResponseFuture> {
        self.request(token, CloudStorageRequest::RemoveItem(key))
    }

    /// Resolves with [`Outcome::Removed`](miniapp_data_model::Outcome::Removed).
    ///
    /// # Errors
    ///
    /// See [`WebApp::submit()`].
    pub fn remove_items(
        &self,
        token: RequestToken,
        keys: NonEmpty<StorageKey>,
    ) -> Result<ResponseFuture> {
        self.request(token, CloudStorageRequest::RemoveItems(keys))
    }

    /// Resolves with [`Outcome::Keys`](miniapp_data_model::Outcome::Keys).
    ///
    /// # Errors
    ///
    /// See [`WebApp::submit()`].
    pub fn get_keys(&self, token: RequestToken) -> Result<ResponseFuture> {
        self.request(token, CloudStorageRequest::GetKeys)
    }
}

/// Biometric manager of the device.
///
/// Must be [initialized](Self::init) before any other operation.
#[derive(Debug)]
pub struct Biometrics<'web_app, W: ?Sized> {
    /// Host capabilities.
    web_app: &'web_app W,
}

impl<'web_app, W: WebApp + ?Sized> Biometrics<'web_app, W> {
    pub(crate) const fn new(web_app: &'web_app W) -> Self {
        Self { web_app }
    }

    /// Current state of the biometric manager.
    pub fn state(&self) -> BiometricManager {
        self.web_app.biometric_manager()
    }

    /// Resolves with [`Outcome::BiometricInited`](miniapp_data_model::Outcome::BiometricInited).
    ///
    /// # Errors
    ///
    /// See [`WebApp::submit()`].
    pub fn init(&self, token: RequestToken) -> Result<ResponseFuture> {
        self.web_app.request(token, Request::BiometricInit)
    }

    /// Ask the user for permission to use biometrics. Resolves with
    /// [`Outcome::BiometricAccess`](miniapp_data_model::Outcome::BiometricAccess).
    ///
    /// # Errors
    ///
    /// Fails if `params.reason` is longer than 128 characters.
    pub fn request_access(
        &self,
        token: RequestToken,
        params: BiometricParams,
    ) -> Result<ResponseFuture> {
        self.web_app
            .request(token, Request::BiometricRequestAccess(params))
    }

    /// Authenticate the user and read the token from the secure storage. Resolves with
    /// [`Outcome::BiometricAuthenticated`](miniapp_data_model::Outcome::BiometricAuthenticated).
    ///
    /// # Errors
    ///
    /// Fails if `params.reason` is longer than 128 characters.
    pub fn authenticate(
        &self,
        token: RequestToken,
        params: BiometricParams,
    ) -> Result<ResponseFuture> {
        self.web_app
            .request(token, Request::BiometricAuthenticate(params))
    }

    /// Replace the token in the secure storage. Empty `biometric_token` removes it.
    ///
    /// # Errors
    ///
    /// Fails if `biometric_token` is longer than 1024 characters.
    pub fn update_token(
        &self,
        token: RequestToken,
        biometric_token: impl Into<String>,
    ) -> Result<ResponseFuture> {
        self.web_app
            .request(token, Request::BiometricUpdateToken(biometric_token.into()))
    }

    /// Open the biometric access settings of the bot.
    ///
    /// # Errors
    ///
    /// See [`WebApp::execute()`].
    pub fn open_settings(&self) -> Result<()> {
        self.web_app.execute(Command::OpenBiometricSettings)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "it's ok in tests")]

    use std::{
        cell::Cell,
        collections::BTreeMap,
        rc::Rc,
    };

    use miniapp_data_model::{Outcome, Version};

    use super::*;
    use crate::{
        Error, Facade,
        simulated::{HostConfig, SimulatedHost},
    };

    fn facade() -> Rc<Facade<SimulatedHost>> {
        Facade::new(SimulatedHost::new(HostConfig::default()))
    }

    fn key(key: &str) -> StorageKey {
        key.parse().unwrap()
    }

    #[test]
    fn visibility_changes_only_after_acknowledgement() {
        let facade = facade();

        facade.main_button_control().show().unwrap();
        facade.back_button_control().show().unwrap();
        assert!(!facade.main_button().is_visible);
        assert!(!facade.back_button().is_visible);

        assert_eq!(facade.host().acknowledge(), 2);
        assert!(facade.main_button().is_visible);
        assert!(facade.back_button().is_visible);
    }

    #[test]
    fn main_button_commands_chain() {
        let facade = facade();

        facade
            .main_button_control()
            .set_text("Pay")
            .unwrap()
            .show()
            .unwrap()
            .show_progress(false)
            .unwrap();
        facade.host().acknowledge();

        let state = facade.main_button_control().state();
        assert_eq!(state.text, "Pay");
        assert!(state.is_visible);
        assert!(state.is_progress_visible);
        assert!(!state.is_active);
    }

    #[test]
    fn main_button_text_is_validated() {
        let facade = facade();

        assert!(matches!(
            facade.main_button_control().set_text("   "),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            facade.main_button_control().set_text("x".repeat(65)),
            Err(Error::Validation(_))
        ));
        assert!(facade.host().queued().is_empty());
    }

    #[test]
    fn main_button_click_reaches_handler_only_when_visible() {
        let facade = facade();
        let clicks = Rc::new(Cell::new(0_u32));
        let handler = Handler::new({
            let clicks = Rc::clone(&clicks);
            move |_event| clicks.set(clicks.get() + 1)
        });
        facade.main_button_control().on_click(handler.clone());

        assert!(!facade.host().click_main_button());
        facade.main_button_control().show().unwrap();
        facade.host().acknowledge();
        assert!(facade.host().click_main_button());

        assert_eq!(clicks.get(), 1);
        assert!(facade.main_button_control().off_click(&handler));
        assert!(facade.host().click_main_button());
        assert_eq!(clicks.get(), 1);
    }

    #[test]
    fn settings_button_requires_recent_host() {
        let facade = Facade::new(SimulatedHost::new(HostConfig {
            version: Version::new(6, 9),
            ..HostConfig::default()
        }));

        assert!(matches!(
            facade.settings_button_control().show(),
            Err(Error::Unsupported { .. })
        ));
    }

    #[tokio::test]
    async fn cloud_storage_round_trip() {
        let facade = facade();
        let storage = facade.cloud_storage();

        let stored = storage
            .set_item(facade.next_token(), key("greeting"), "hello")
            .unwrap();
        facade.host().serve_cloud_storage();
        assert_eq!(stored.await.unwrap(), Ok(Outcome::Stored(true)));

        let items = storage
            .get_items(
                facade.next_token(),
                NonEmpty {
                    head: key("greeting"),
                    tail: vec![key("missing")],
                },
            )
            .unwrap();
        let keys = storage.get_keys(facade.next_token()).unwrap();
        assert_eq!(facade.host().serve_cloud_storage(), 2);

        assert_eq!(
            items.await.unwrap(),
            Ok(Outcome::Values(BTreeMap::from([
                ("greeting".to_owned(), "hello".to_owned()),
                ("missing".to_owned(), String::new()),
            ])))
        );
        assert_eq!(keys.await.unwrap(), Ok(Outcome::Keys(vec!["greeting".to_owned()])));
    }

    #[tokio::test]
    async fn removed_item_reads_as_empty() {
        let facade = facade();
        let storage = facade.cloud_storage();

        let _stored = storage
            .set_item(facade.next_token(), key("a"), "1")
            .unwrap();
        let removed = storage.remove_item(facade.next_token(), key("a")).unwrap();
        let value = storage.get_item(facade.next_token(), key("a")).unwrap();
        facade.host().serve_cloud_storage();

        assert_eq!(removed.await.unwrap(), Ok(Outcome::Removed(true)));
        assert_eq!(value.await.unwrap(), Ok(Outcome::Value(String::new())));
    }

    #[test]
    fn too_long_storage_value_is_rejected() {
        let facade = facade();

        assert!(matches!(
            facade
                .cloud_storage()
                .set_item(facade.next_token(), key("a"), "x".repeat(4097)),
            Err(Error::Validation(_))
        ));
        assert!(facade.host().pending_requests().is_empty());
    }

    #[tokio::test]
    async fn biometric_access_is_read_from_state() {
        let facade = facade();
        let biometrics = facade.biometrics();

        let inited = biometrics.init(facade.next_token()).unwrap();
        facade.host().update_biometric(|manager| {
            manager.is_inited = true;
            manager.is_biometric_available = true;
        });
        assert_eq!(inited.await.unwrap(), Ok(Outcome::BiometricInited));

        let access = biometrics
            .request_access(facade.next_token(), BiometricParams::default())
            .unwrap();
        facade.host().update_biometric(|manager| {
            manager.is_access_requested = true;
            manager.is_access_granted = true;
        });

        assert_eq!(access.await.unwrap(), Ok(Outcome::BiometricAccess(true)));
        assert!(biometrics.state().is_access_granted);
    }
}
