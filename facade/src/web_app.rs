//! Module with [`WebApp`] trait describing everything a Mini App can do with its host.

use miniapp_data_model::{
    ColorScheme, Command, Event, EventKind, HostState, InitData, Request, ThemeParams, Version,
    command::{HapticFeedback, ImpactStyle, InlineQueryChatType, NotificationType, StoryShareParams},
    control::{BackButton, BiometricManager, MainButton, SettingsButton, Viewport},
    request::{PopupParams, ScanQrPopupParams},
    theme::{Color, HeaderColor},
};

use crate::{
    Completion, Handler, RequestToken, ResponseFuture, Result, Subscription,
    controls::{BackButtonControl, Biometrics, CloudStorage, MainButtonControl, SettingsButtonControl},
};

/// Capabilities of the Mini App host.
///
/// Getters return a snapshot taken at call time. Commands and requests return as soon as the
/// host accepted them: their effect is visible only in a later snapshot or event.
pub trait WebApp {
    /// Current snapshot of the host state.
    fn state(&self) -> HostState;

    /// Forward `command` to the host.
    ///
    /// # Errors
    ///
    /// Fails without contacting the host if the host version is too low or the arguments are
    /// invalid.
    fn execute(&self, command: Command) -> Result<()>;

    /// Register `handler` for events of `kind`.
    fn on_event(&self, kind: EventKind, handler: Handler);

    /// Remove the first registration of `handler` for `kind`.
    ///
    /// Returns `false` if `handler` wasn't registered.
    fn off_event(&self, kind: EventKind, handler: &Handler) -> bool;

    /// Forward `request` to the host. `completion` receives the response exactly once.
    ///
    /// # Errors
    ///
    /// Fails without contacting the host if the host version is too low, the arguments are
    /// invalid or `token` is already pending.
    fn submit(&self, token: RequestToken, request: Request, completion: Completion) -> Result<()>;

    /// Forget pending request `token`. The host isn't notified and may still show its UI.
    ///
    /// Returns `false` if the request is not pending.
    fn abandon(&self, token: RequestToken) -> bool;

    /// Version of the Bot API supported by the host.
    fn version(&self) -> Version {
        self.state().version
    }

    /// Whether the host supports at least `version`.
    fn is_version_at_least(&self, version: &Version) -> bool {
        self.version() >= *version
    }

    /// Raw init data. Must be [validated](https://core.telegram.org/bots/webapps#validating-data-received-via-the-mini-app)
    /// on the bot server before being trusted.
    fn init_data(&self) -> String {
        self.state().init_data
    }

    /// Parsed init data. Not validated, so should not be trusted.
    fn init_data_unsafe(&self) -> InitData {
        InitData::parse(&self.init_data())
    }

    /// Name of the platform the Mini App is running on, e.g. `android` or `tdesktop`.
    fn platform(&self) -> String {
        self.state().platform
    }

    /// Color scheme currently used by the host.
    fn color_scheme(&self) -> ColorScheme {
        self.state().color_scheme
    }

    /// Theme currently used by the host.
    fn theme_params(&self) -> ThemeParams {
        self.state().theme_params
    }

    /// Visible area of the Mini App.
    fn viewport(&self) -> Viewport {
        self.state().viewport
    }

    /// State of the main button.
    fn main_button(&self) -> MainButton {
        self.state().main_button
    }

    /// State of the back button.
    fn back_button(&self) -> BackButton {
        self.state().back_button
    }

    /// State of the "Settings" menu item.
    fn settings_button(&self) -> SettingsButton {
        self.state().settings_button
    }

    /// State of the biometric manager.
    fn biometric_manager(&self) -> BiometricManager {
        self.state().biometric_manager
    }

    /// Register `handler` for events of `kind`, returning a guard to remove it later.
    fn subscribe(&self, kind: EventKind, handler: impl Fn(&Event) + 'static) -> Subscription
    where
        Self: Sized,
    {
        let handler = Handler::new(handler);
        self.on_event(kind, handler.clone());
        Subscription::new(kind, handler)
    }

    /// Forward `request` to the host, returning a future resolving with the response.
    ///
    /// # Errors
    ///
    /// See [`submit()`](Self::submit).
    fn request(&self, token: RequestToken, request: Request) -> Result<ResponseFuture> {
        let (future, completion) = ResponseFuture::channel(token);
        self.submit(token, request, completion)?;
        Ok(future)
    }

    /// Inform the host that the Mini App is ready to be displayed.
    ///
    /// # Errors
    ///
    /// See [`execute()`](Self::execute).
    fn ready(&self) -> Result<()> {
        self.execute(Command::Ready)
    }

    /// # Errors
    ///
    /// See [`execute()`](Self::execute).
    fn expand(&self) -> Result<()> {
        self.execute(Command::Expand)
    }

    /// # Errors
    ///
    /// See [`execute()`](Self::execute).
    fn close(&self) -> Result<()> {
        self.execute(Command::Close)
    }

    /// # Errors
    ///
    /// See [`execute()`](Self::execute).
    fn set_header_color(&self, color: HeaderColor) -> Result<()> {
        self.execute(Command::SetHeaderColor(color))
    }

    /// # Errors
    ///
    /// See [`execute()`](Self::execute).
    fn set_background_color(&self, color: Color) -> Result<()> {
        self.execute(Command::SetBackgroundColor(color))
    }

    /// # Errors
    ///
    /// See [`execute()`](Self::execute).
    fn enable_closing_confirmation(&self) -> Result<()> {
        self.execute(Command::SetClosingConfirmation(true))
    }

    /// # Errors
    ///
    /// See [`execute()`](Self::execute).
    fn disable_closing_confirmation(&self) -> Result<()> {
        self.execute(Command::SetClosingConfirmation(false))
    }

    /// # Errors
    ///
    /// See [`execute()`](Self::execute).
    fn enable_vertical_swipes(&self) -> Result<()> {
        self.execute(Command::SetVerticalSwipes(true))
    }

    /// # Errors
    ///
    /// See [`execute()`](Self::execute).
    fn disable_vertical_swipes(&self) -> Result<()> {
        self.execute(Command::SetVerticalSwipes(false))
    }

    /// Send `data` to the bot. The host closes the Mini App afterwards.
    ///
    /// # Errors
    ///
    /// See [`execute()`](Self::execute).
    fn send_data(&self, data: String) -> Result<()> {
        self.execute(Command::SendData(data))
    }

    /// # Errors
    ///
    /// See [`execute()`](Self::execute).
    fn switch_inline_query(&self, query: String, chat_types: Vec<InlineQueryChatType>) -> Result<()> {
        self.execute(Command::SwitchInlineQuery { query, chat_types })
    }

    /// # Errors
    ///
    /// See [`execute()`](Self::execute).
    fn open_link(&self, url: url::Url, try_instant_view: bool) -> Result<()> {
        self.execute(Command::OpenLink {
            url,
            try_instant_view,
        })
    }

    /// # Errors
    ///
    /// See [`execute()`](Self::execute).
    fn open_telegram_link(&self, url: url::Url) -> Result<()> {
        self.execute(Command::OpenTelegramLink(url))
    }

    /// # Errors
    ///
    /// See [`execute()`](Self::execute).
    fn share_to_story(&self, media_url: url::Url, params: StoryShareParams) -> Result<()> {
        self.execute(Command::ShareToStory { media_url, params })
    }

    /// # Errors
    ///
    /// See [`execute()`](Self::execute).
    fn close_scan_qr_popup(&self) -> Result<()> {
        self.execute(Command::CloseScanQrPopup)
    }

    /// # Errors
    ///
    /// See [`execute()`](Self::execute).
    fn impact_occurred(&self, style: ImpactStyle) -> Result<()> {
        self.execute(Command::Haptic(HapticFeedback::Impact(style)))
    }

    /// # Errors
    ///
    /// See [`execute()`](Self::execute).
    fn notification_occurred(&self, kind: NotificationType) -> Result<()> {
        self.execute(Command::Haptic(HapticFeedback::Notification(kind)))
    }

    /// # Errors
    ///
    /// See [`execute()`](Self::execute).
    fn selection_changed(&self) -> Result<()> {
        self.execute(Command::Haptic(HapticFeedback::SelectionChanged))
    }

    /// Show a native popup. Resolves with
    /// [`Outcome::PopupClosed`](miniapp_data_model::Outcome::PopupClosed).
    ///
    /// # Errors
    ///
    /// See [`submit()`](Self::submit).
    fn show_popup(&self, token: RequestToken, params: PopupParams) -> Result<ResponseFuture> {
        self.request(token, Request::ShowPopup(params))
    }

    /// Show an alert. Resolves with
    /// [`Outcome::AlertClosed`](miniapp_data_model::Outcome::AlertClosed).
    ///
    /// # Errors
    ///
    /// See [`submit()`](Self::submit).
    fn show_alert(&self, token: RequestToken, message: String) -> Result<ResponseFuture> {
        self.request(token, Request::ShowAlert(message))
    }

    /// Show a confirmation. Resolves with
    /// [`Outcome::Confirmed`](miniapp_data_model::Outcome::Confirmed).
    ///
    /// # Errors
    ///
    /// See [`submit()`](Self::submit).
    fn show_confirm(&self, token: RequestToken, message: String) -> Result<ResponseFuture> {
        self.request(token, Request::ShowConfirm(message))
    }

    /// Show the QR code scanner. Resolves with the first scanned text or
    /// [`Outcome::ScanQrClosed`](miniapp_data_model::Outcome::ScanQrClosed).
    ///
    /// With [`ScanQrPopupParams::keep_open`] the scanner stays open after every code and
    /// the request resolves only with
    /// [`Outcome::ScanQrClosed`](miniapp_data_model::Outcome::ScanQrClosed).
    /// Scanned codes are then received by subscribing to [`EventKind::QrTextReceived`].
    ///
    /// # Errors
    ///
    /// See [`submit()`](Self::submit).
    fn show_scan_qr_popup(
        &self,
        token: RequestToken,
        params: ScanQrPopupParams,
    ) -> Result<ResponseFuture> {
        self.request(token, Request::ShowScanQrPopup(params))
    }

    /// # Errors
    ///
    /// See [`submit()`](Self::submit).
    fn read_clipboard(&self, token: RequestToken) -> Result<ResponseFuture> {
        self.request(token, Request::ReadTextFromClipboard)
    }

    /// # Errors
    ///
    /// See [`submit()`](Self::submit).
    fn request_write_access(&self, token: RequestToken) -> Result<ResponseFuture> {
        self.request(token, Request::RequestWriteAccess)
    }

    /// # Errors
    ///
    /// See [`submit()`](Self::submit).
    fn request_contact(&self, token: RequestToken) -> Result<ResponseFuture> {
        self.request(token, Request::RequestContact)
    }

    /// Open an invoice by its `url`. Resolves with
    /// [`Outcome::Invoice`](miniapp_data_model::Outcome::Invoice).
    ///
    /// # Errors
    ///
    /// See [`submit()`](Self::submit).
    fn open_invoice(&self, token: RequestToken, url: String) -> Result<ResponseFuture> {
        self.request(token, Request::OpenInvoice(url))
    }

    /// Handle to control the main button.
    fn main_button_control(&self) -> MainButtonControl<'_, Self> {
        MainButtonControl::new(self)
    }

    /// Handle to control the back button.
    fn back_button_control(&self) -> BackButtonControl<'_, Self> {
        BackButtonControl::new(self)
    }

    /// Handle to control the "Settings" menu item.
    fn settings_button_control(&self) -> SettingsButtonControl<'_, Self> {
        SettingsButtonControl::new(self)
    }

    /// Handle to the cloud storage of the bot.
    fn cloud_storage(&self) -> CloudStorage<'_, Self> {
        CloudStorage::new(self)
    }

    /// Handle to the biometric manager.
    fn biometrics(&self) -> Biometrics<'_, Self> {
        Biometrics::new(self)
    }
}
