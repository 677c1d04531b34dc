//! Module with modal and asynchronous [`Request`]s and their [`Outcome`]s.
//!
//! A request is resolved by the host either through the completion callback or through the
//! corresponding [`Event`]. Both may happen for the same request.

use std::collections::BTreeMap;

use nonempty::NonEmpty;
use parse_display::{Display, FromStr};
use serde::{Deserialize, Serialize};

use crate::{
    Event, HostState, ValidationError, Version, check_len, check_non_empty_len,
    event::{ContactStatus, PaymentStatus, WriteAccessStatus},
};

/// Maximum length of a cloud storage value.
pub const STORAGE_VALUE_MAX_LEN: usize = 4096;

/// Error reported by the host through the error-first callback argument.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::From, thiserror::Error, displaydoc::Display)]
/// Host reported an error: {0}
pub struct HostError(pub String);

/// Result of a [`Request`].
pub type Response = Result<Outcome, HostError>;

/// Request of a modal or asynchronous interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Show a native popup. Resolved with the identifier of the pressed button.
    ShowPopup(PopupParams),
    /// Show an alert with a single "Close" button.
    ShowAlert(String),
    /// Show a confirmation with "OK" and "Cancel" buttons.
    ShowConfirm(String),
    /// Show the native QR code scanner.
    ShowScanQrPopup(ScanQrPopupParams),
    /// Read text from the clipboard. Works only for Mini Apps launched from the attachment menu.
    ReadTextFromClipboard,
    /// Ask the user to allow the bot to message them.
    RequestWriteAccess,
    /// Ask the user to share their phone number with the bot.
    RequestContact,
    /// Open an invoice by its link.
    OpenInvoice(String),
    /// Initialize the biometric manager.
    BiometricInit,
    BiometricRequestAccess(BiometricParams),
    BiometricAuthenticate(BiometricParams),
    /// Update the token in the secure storage. Empty token removes it.
    BiometricUpdateToken(String),
    CloudStorage(CloudStorageRequest),
}

/// Request to the cloud storage of the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::missing_docs_in_private_items)]
pub enum CloudStorageRequest {
    SetItem { key: StorageKey, value: String },
    GetItem(StorageKey),
    GetItems(NonEmpty<StorageKey>),
    RemoveItem(StorageKey),
    RemoveItems(NonEmpty<StorageKey>),
    GetKeys,
}

/// Successful result of a [`Request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Popup closed. [`None`] if no button was pressed.
    PopupClosed { button_id: Option<String> },
    AlertClosed,
    /// Confirmation closed. `true` if "OK" was pressed.
    Confirmed(bool),
    /// Text from a scanned QR code.
    QrText(String),
    /// QR code scanner closed by the user.
    ScanQrClosed,
    /// Text from the clipboard. [`None`] if there is no text or access was denied.
    ClipboardText(Option<String>),
    /// `true` if write access was granted.
    WriteAccess(bool),
    /// `true` if the phone number was shared.
    ContactShared(bool),
    Invoice(PaymentStatus),
    BiometricInited,
    /// `true` if biometric access was granted.
    BiometricAccess(bool),
    BiometricAuthenticated {
        is_authenticated: bool,
        token: Option<String>,
    },
    /// `true` if the token was updated.
    BiometricTokenUpdated(bool),
    /// `true` if the value was stored.
    Stored(bool),
    /// `true` if the values were removed.
    Removed(bool),
    /// Value of a single key. Empty if the key is absent.
    Value(String),
    Values(BTreeMap<String, String>),
    Keys(Vec<String>),
}

impl Request {
    /// Name of the host method implementing this request. Used for logging.
    #[must_use]
    pub const fn method(&self) -> &'static str {
        match self {
            Self::ShowPopup(_) => "showPopup",
            Self::ShowAlert(_) => "showAlert",
            Self::ShowConfirm(_) => "showConfirm",
            Self::ShowScanQrPopup(_) => "showScanQrPopup",
            Self::ReadTextFromClipboard => "readTextFromClipboard",
            Self::RequestWriteAccess => "requestWriteAccess",
            Self::RequestContact => "requestContact",
            Self::OpenInvoice(_) => "openInvoice",
            Self::BiometricInit => "BiometricManager.init",
            Self::BiometricRequestAccess(_) => "BiometricManager.requestAccess",
            Self::BiometricAuthenticate(_) => "BiometricManager.authenticate",
            Self::BiometricUpdateToken(_) => "BiometricManager.updateBiometricToken",
            Self::CloudStorage(request) => request.method(),
        }
    }

    /// Minimal host version supporting this request.
    #[must_use]
    pub fn min_version(&self) -> Version {
        match self {
            Self::OpenInvoice(_) => Version::new(6, 1),
            Self::ShowPopup(_) | Self::ShowAlert(_) | Self::ShowConfirm(_) => Version::new(6, 2),
            Self::ShowScanQrPopup(_) | Self::ReadTextFromClipboard => Version::new(6, 4),
            Self::RequestWriteAccess | Self::RequestContact | Self::CloudStorage(_) => {
                Version::new(6, 9)
            }
            Self::BiometricInit
            | Self::BiometricRequestAccess(_)
            | Self::BiometricAuthenticate(_)
            | Self::BiometricUpdateToken(_) => Version::new(7, 2),
        }
    }

    /// Check the request arguments the same way the host does.
    ///
    /// # Errors
    ///
    /// Fails if any argument violates host limits.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::ShowPopup(params) => params.validate(),
            Self::ShowAlert(message) | Self::ShowConfirm(message) => {
                check_non_empty_len("popup message", message.trim(), 256)
            }
            Self::ShowScanQrPopup(params) => params
                .text
                .as_deref()
                .map_or(Ok(()), |text| check_len("scan QR text", text, 64)),
            Self::OpenInvoice(url) => {
                if url.is_empty() {
                    return Err(ValidationError::Empty("invoice url"));
                }
                Ok(())
            }
            Self::BiometricRequestAccess(params) | Self::BiometricAuthenticate(params) => params
                .reason
                .as_deref()
                .map_or(Ok(()), |reason| check_len("biometric reason", reason, 128)),
            Self::BiometricUpdateToken(token) => check_len("biometric token", token, 1024),
            Self::CloudStorage(CloudStorageRequest::SetItem { value, .. }) => {
                check_len("cloud storage value", value, STORAGE_VALUE_MAX_LEN)
            }
            Self::ReadTextFromClipboard
            | Self::RequestWriteAccess
            | Self::RequestContact
            | Self::BiometricInit
            | Self::CloudStorage(_) => Ok(()),
        }
    }

    /// Outcome of this request if `event` resolves it.
    ///
    /// `state` is queried only for events without enough payload to produce the outcome.
    /// Returns [`None`] if `event` is unrelated to this request.
    #[must_use]
    pub fn resolve_by(&self, event: &Event, state: impl FnOnce() -> HostState) -> Option<Response> {
        let outcome = match (self, event) {
            (Self::ShowPopup(_), Event::PopupClosed(closed)) => Outcome::PopupClosed {
                button_id: closed.button_id.clone(),
            },
            (Self::ShowAlert(_), Event::PopupClosed(_)) => Outcome::AlertClosed,
            (Self::ShowConfirm(_), Event::PopupClosed(closed)) => {
                Outcome::Confirmed(closed.button_id.as_deref() == Some(PopupParams::CONFIRM_ID))
            }
            (Self::ShowScanQrPopup(params), Event::QrTextReceived(received))
                if !params.keep_open =>
            {
                Outcome::QrText(received.data.clone())
            }
            (Self::ShowScanQrPopup(_), Event::ScanQrPopupClosed) => Outcome::ScanQrClosed,
            (Self::ReadTextFromClipboard, Event::ClipboardTextReceived(received)) => {
                Outcome::ClipboardText(received.data.clone())
            }
            (Self::RequestWriteAccess, Event::WriteAccessRequested(requested)) => {
                Outcome::WriteAccess(requested.status == WriteAccessStatus::Allowed)
            }
            (Self::RequestContact, Event::ContactRequested(requested)) => {
                Outcome::ContactShared(requested.status == ContactStatus::Sent)
            }
            (Self::OpenInvoice(url), Event::InvoiceClosed(closed)) if *url == closed.url => {
                Outcome::Invoice(closed.status)
            }
            (Self::BiometricInit, Event::BiometricManagerUpdated) => Outcome::BiometricInited,
            (Self::BiometricRequestAccess(_), Event::BiometricManagerUpdated) => {
                Outcome::BiometricAccess(state().biometric_manager.is_access_granted)
            }
            (Self::BiometricAuthenticate(_), Event::BiometricAuthRequested(requested)) => {
                Outcome::BiometricAuthenticated {
                    is_authenticated: requested.is_authenticated,
                    token: requested.biometric_token.clone(),
                }
            }
            (Self::BiometricUpdateToken(_), Event::BiometricTokenUpdated(updated)) => {
                Outcome::BiometricTokenUpdated(updated.is_updated)
            }
            _ => return None,
        };
        Some(Ok(outcome))
    }
}

impl CloudStorageRequest {
    /// Name of the host method implementing this request.
    #[must_use]
    pub const fn method(&self) -> &'static str {
        match self {
            Self::SetItem { .. } => "CloudStorage.setItem",
            Self::GetItem(_) => "CloudStorage.getItem",
            Self::GetItems(_) => "CloudStorage.getItems",
            Self::RemoveItem(_) => "CloudStorage.removeItem",
            Self::RemoveItems(_) => "CloudStorage.removeItems",
            Self::GetKeys => "CloudStorage.getKeys",
        }
    }
}

/// Type of a popup button.
#[derive(Debug, Default, Display, FromStr, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize)]
#[display(style = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PopupButtonType {
    /// Button with the default style. Requires text.
    #[default]
    Default,
    /// Button with the localized text "OK".
    Ok,
    /// Button with the localized text "Close".
    Close,
    /// Button with the localized text "Cancel".
    Cancel,
    /// Button with a style indicating a destructive action. Requires text.
    Destructive,
}

impl PopupButtonType {
    /// Whether the host requires text for buttons of this type.
    #[must_use]
    pub const fn requires_text(self) -> bool {
        matches!(self, Self::Default | Self::Destructive)
    }
}

/// Button of a native popup.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopupButton {
    /// Identifier passed back when the button is pressed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: PopupButtonType,
    /// Text of the button. Ignored for types with localized text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl PopupButton {
    /// Construct new button of `kind` with identifier `id`.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: PopupButtonType) -> Self {
        Self {
            id: Some(id.into()),
            kind,
            text: None,
        }
    }

    /// Set button text.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

/// Parameters of a native popup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopupParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub message: String,
    /// From 1 to 3 buttons.
    pub buttons: Vec<PopupButton>,
}

impl PopupParams {
    /// Identifier of the "OK" button of a confirmation.
    pub const CONFIRM_ID: &'static str = "ok";

    /// Construct new popup with `message` and a single "Close" button.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            title: None,
            message: message.into(),
            buttons: vec![PopupButton {
                kind: PopupButtonType::Close,
                ..PopupButton::default()
            }],
        }
    }

    /// Check limits of the native popup.
    ///
    /// # Errors
    ///
    /// Fails if the title, message or buttons are invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(title) = &self.title {
            check_len("popup title", title.trim(), 64)?;
        }
        check_non_empty_len("popup message", self.message.trim(), 256)?;

        if !(1..=3).contains(&self.buttons.len()) {
            return Err(ValidationError::ButtonCount(self.buttons.len()));
        }
        for button in &self.buttons {
            if let Some(id) = &button.id {
                check_len("popup button id", id, 64)?;
            }
            if button.kind.requires_text() {
                check_non_empty_len(
                    "popup button text",
                    button.text.as_deref().unwrap_or_default().trim(),
                    64,
                )?;
            }
        }
        Ok(())
    }
}

/// Parameters of the native QR code scanner.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanQrPopupParams {
    /// Text displayed under the scanner.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Keep scanning after the first code instead of closing the scanner.
    ///
    /// Every code is then delivered only with [`Event::QrTextReceived`] and the request is
    /// resolved when the scanner is closed.
    #[serde(skip)]
    pub keep_open: bool,
}

/// Parameters of biometric access request and authentication popups.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiometricParams {
    /// Text explaining why biometrics are needed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Key of the cloud storage: 1-128 characters of `A-Z`, `a-z`, `0-9`, `_` and `-`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StorageKey(String);

impl StorageKey {
    /// Key as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for StorageKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid_char = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-';
        if s.is_empty() || s.len() > 128 || !s.chars().all(valid_char) {
            return Err(ValidationError::StorageKey(s.to_owned()));
        }
        Ok(Self(s.to_owned()))
    }
}

impl std::fmt::Display for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "it's ok in tests")]

    use super::*;
    use crate::event::payload;

    fn popup(buttons: Vec<PopupButton>) -> PopupParams {
        PopupParams {
            buttons,
            ..PopupParams::new("Delete everything?")
        }
    }

    #[test]
    fn default_popup_is_valid() {
        PopupParams::new("Hello").validate().unwrap();
    }

    #[test]
    fn popup_button_count_is_limited() {
        assert_eq!(
            popup(vec![]).validate().unwrap_err(),
            ValidationError::ButtonCount(0)
        );

        let ok = PopupButton::new("ok", PopupButtonType::Ok);
        assert_eq!(
            popup(vec![ok.clone(), ok.clone(), ok.clone(), ok])
                .validate()
                .unwrap_err(),
            ValidationError::ButtonCount(4)
        );
    }

    #[test]
    fn destructive_button_requires_text() {
        let bare = PopupButton::new("delete", PopupButtonType::Destructive);
        popup(vec![bare.clone()]).validate().unwrap_err();
        popup(vec![bare.with_text("Delete")]).validate().unwrap();
        popup(vec![PopupButton::new("cancel", PopupButtonType::Cancel)])
            .validate()
            .unwrap();
    }

    #[test]
    fn popup_message_must_not_be_blank() {
        assert_eq!(
            PopupParams::new("  ").validate().unwrap_err(),
            ValidationError::Empty("popup message")
        );
        Request::ShowAlert("x".repeat(257)).validate().unwrap_err();
    }

    #[test]
    fn storage_keys() {
        "user_settings-1".parse::<StorageKey>().unwrap();
        "a".repeat(128).parse::<StorageKey>().unwrap();

        for raw in [String::new(), "a".repeat(129), "with space".to_owned(), "ключ".to_owned()] {
            assert_eq!(
                raw.parse::<StorageKey>().unwrap_err(),
                ValidationError::StorageKey(raw.clone())
            );
        }
    }

    #[test]
    fn storage_value_is_limited() {
        let key: StorageKey = "key".parse().unwrap();
        Request::CloudStorage(CloudStorageRequest::SetItem {
            key,
            value: "v".repeat(STORAGE_VALUE_MAX_LEN + 1),
        })
        .validate()
        .unwrap_err();
    }

    #[test]
    fn confirm_is_resolved_by_ok_button_only() {
        let confirm = Request::ShowConfirm("Sure?".to_owned());
        let closed = |button_id: Option<&str>| {
            Event::PopupClosed(payload::PopupClosed {
                button_id: button_id.map(ToOwned::to_owned),
            })
        };

        assert_eq!(
            confirm.resolve_by(&closed(Some("ok")), HostState::default),
            Some(Ok(Outcome::Confirmed(true)))
        );
        assert_eq!(
            confirm.resolve_by(&closed(Some("cancel")), HostState::default),
            Some(Ok(Outcome::Confirmed(false)))
        );
        assert_eq!(
            confirm.resolve_by(&closed(None), HostState::default),
            Some(Ok(Outcome::Confirmed(false)))
        );
    }

    #[test]
    fn invoice_is_resolved_by_matching_url_only() {
        let invoice = Request::OpenInvoice("https://t.me/$first".to_owned());
        let closed = |url: &str| {
            Event::InvoiceClosed(payload::InvoiceClosed {
                url: url.to_owned(),
                status: PaymentStatus::Paid,
            })
        };

        assert_eq!(
            invoice.resolve_by(&closed("https://t.me/$second"), HostState::default),
            None
        );
        assert_eq!(
            invoice.resolve_by(&closed("https://t.me/$first"), HostState::default),
            Some(Ok(Outcome::Invoice(PaymentStatus::Paid)))
        );
    }

    #[test]
    fn kept_open_scanner_is_resolved_only_when_closed() {
        let scan = |keep_open| {
            Request::ShowScanQrPopup(ScanQrPopupParams {
                keep_open,
                ..ScanQrPopupParams::default()
            })
        };
        let code = Event::QrTextReceived(payload::QrTextReceived {
            data: "code".to_owned(),
        });

        assert_eq!(
            scan(false).resolve_by(&code, HostState::default),
            Some(Ok(Outcome::QrText("code".to_owned())))
        );
        assert_eq!(scan(true).resolve_by(&code, HostState::default), None);
        assert_eq!(
            scan(true).resolve_by(&Event::ScanQrPopupClosed, HostState::default),
            Some(Ok(Outcome::ScanQrClosed))
        );
    }

    #[test]
    fn keep_open_is_not_sent_to_the_host() {
        let params = ScanQrPopupParams {
            text: Some("Scan".to_owned()),
            keep_open: true,
        };

        assert_eq!(serde_json::to_string(&params).unwrap(), r#"{"text":"Scan"}"#);
    }

    #[test]
    fn unrelated_events_do_not_resolve() {
        let contact = Request::RequestContact;
        assert_eq!(
            contact.resolve_by(&Event::MainButtonClicked, HostState::default),
            None
        );
        assert_eq!(
            Request::CloudStorage(CloudStorageRequest::GetKeys)
                .resolve_by(&Event::ThemeChanged, HostState::default),
            None
        );
    }

    #[test]
    fn biometric_access_reads_state() {
        let request = Request::BiometricRequestAccess(BiometricParams::default());
        let state = || {
            let mut state = HostState::default();
            state.biometric_manager.is_access_granted = true;
            state
        };

        assert_eq!(
            request.resolve_by(&Event::BiometricManagerUpdated, state),
            Some(Ok(Outcome::BiometricAccess(true)))
        );
    }
}
