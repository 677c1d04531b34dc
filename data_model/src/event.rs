//! Module with the closed set of events the host may emit and their payloads.

use parse_display::{Display, FromStr};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// Kind of event emitted by the host.
///
/// [`Display`] and [`FromStr`] use the names the host uses in `onEvent()`.
#[derive(Debug, Display, FromStr, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[display(style = "camelCase")]
#[allow(clippy::missing_docs_in_private_items)]
pub enum EventKind {
    ThemeChanged,
    ViewportChanged,
    MainButtonClicked,
    BackButtonClicked,
    SettingsButtonClicked,
    InvoiceClosed,
    PopupClosed,
    QrTextReceived,
    ScanQrPopupClosed,
    ClipboardTextReceived,
    WriteAccessRequested,
    ContactRequested,
    BiometricManagerUpdated,
    BiometricAuthRequested,
    BiometricTokenUpdated,
}

impl EventKind {
    /// All event kinds.
    pub const ALL: [Self; 15] = [
        Self::ThemeChanged,
        Self::ViewportChanged,
        Self::MainButtonClicked,
        Self::BackButtonClicked,
        Self::SettingsButtonClicked,
        Self::InvoiceClosed,
        Self::PopupClosed,
        Self::QrTextReceived,
        Self::ScanQrPopupClosed,
        Self::ClipboardTextReceived,
        Self::WriteAccessRequested,
        Self::ContactRequested,
        Self::BiometricManagerUpdated,
        Self::BiometricAuthRequested,
        Self::BiometricTokenUpdated,
    ];
}

/// Status of a closed invoice.
#[derive(Debug, Display, FromStr, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[display(style = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Invoice was paid successfully.
    Paid,
    /// User closed the invoice without paying.
    Cancelled,
    /// User tried to pay, but the payment failed.
    Failed,
    /// Payment is still processing.
    Pending,
}

/// Outcome of the write access request.
#[derive(Debug, Display, FromStr, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[display(style = "lowercase")]
#[serde(rename_all = "lowercase")]
#[allow(clippy::missing_docs_in_private_items)]
pub enum WriteAccessStatus {
    Allowed,
    Cancelled,
}

/// Outcome of the contact request.
#[derive(Debug, Display, FromStr, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[display(style = "lowercase")]
#[serde(rename_all = "lowercase")]
#[allow(clippy::missing_docs_in_private_items)]
pub enum ContactStatus {
    Sent,
    Cancelled,
}

pub mod payload {
    //! Module with payloads of [`Event`](super::Event)s.

    use super::{ContactStatus, Deserialize, PaymentStatus, Serialize, WriteAccessStatus};

    /// Payload of `viewportChanged`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ViewportChanged {
        /// False while the user is still resizing the viewport.
        #[serde(rename = "isStateStable")]
        pub is_state_stable: bool,
    }

    /// Payload of `invoiceClosed`.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct InvoiceClosed {
        /// Invoice link provided to `openInvoice()`.
        pub url: String,
        pub status: PaymentStatus,
    }

    /// Payload of `popupClosed`.
    #[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct PopupClosed {
        /// Identifier of the pressed button. [`None`] if the popup was dismissed without pressing any.
        #[serde(default)]
        pub button_id: Option<String>,
    }

    /// Payload of `qrTextReceived`.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct QrTextReceived {
        /// Text from the scanned QR code.
        pub data: String,
    }

    /// Payload of `clipboardTextReceived`.
    #[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ClipboardTextReceived {
        /// Text from the clipboard. [`None`] if the clipboard holds no text
        /// or access to it was denied.
        #[serde(default)]
        pub data: Option<String>,
    }

    /// Payload of `writeAccessRequested`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct WriteAccessRequested {
        pub status: WriteAccessStatus,
    }

    /// Payload of `contactRequested`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ContactRequested {
        pub status: ContactStatus,
    }

    /// Payload of `biometricAuthRequested`.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct BiometricAuthRequested {
        #[serde(rename = "isAuthenticated")]
        pub is_authenticated: bool,
        /// Token from the secure storage. Present only if authentication succeeded.
        #[serde(rename = "biometricToken", default)]
        pub biometric_token: Option<String>,
    }

    /// Payload of `biometricTokenUpdated`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct BiometricTokenUpdated {
        #[serde(rename = "isUpdated")]
        pub is_updated: bool,
    }
}

/// Event emitted by the host together with its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::missing_docs_in_private_items)]
pub enum Event {
    /// Theme changed. New theme is available via the state snapshot.
    ThemeChanged,
    ViewportChanged(payload::ViewportChanged),
    MainButtonClicked,
    BackButtonClicked,
    SettingsButtonClicked,
    InvoiceClosed(payload::InvoiceClosed),
    PopupClosed(payload::PopupClosed),
    QrTextReceived(payload::QrTextReceived),
    ScanQrPopupClosed,
    ClipboardTextReceived(payload::ClipboardTextReceived),
    WriteAccessRequested(payload::WriteAccessRequested),
    ContactRequested(payload::ContactRequested),
    /// Biometric manager state changed. New state is available via the state snapshot.
    BiometricManagerUpdated,
    BiometricAuthRequested(payload::BiometricAuthRequested),
    BiometricTokenUpdated(payload::BiometricTokenUpdated),
}

/// Macro to implement [`From`] for every [`Event`] variant with a payload.
macro_rules! from_payload {
    ($($variant:ident),+ $(,)?) => {$(
        impl From<payload::$variant> for Event {
            fn from(value: payload::$variant) -> Self {
                Self::$variant(value)
            }
        }
    )+};
}

from_payload!(
    ViewportChanged,
    InvoiceClosed,
    PopupClosed,
    QrTextReceived,
    ClipboardTextReceived,
    WriteAccessRequested,
    ContactRequested,
    BiometricAuthRequested,
    BiometricTokenUpdated,
);

impl Event {
    /// Kind of this event.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::ThemeChanged => EventKind::ThemeChanged,
            Self::ViewportChanged(_) => EventKind::ViewportChanged,
            Self::MainButtonClicked => EventKind::MainButtonClicked,
            Self::BackButtonClicked => EventKind::BackButtonClicked,
            Self::SettingsButtonClicked => EventKind::SettingsButtonClicked,
            Self::InvoiceClosed(_) => EventKind::InvoiceClosed,
            Self::PopupClosed(_) => EventKind::PopupClosed,
            Self::QrTextReceived(_) => EventKind::QrTextReceived,
            Self::ScanQrPopupClosed => EventKind::ScanQrPopupClosed,
            Self::ClipboardTextReceived(_) => EventKind::ClipboardTextReceived,
            Self::WriteAccessRequested(_) => EventKind::WriteAccessRequested,
            Self::ContactRequested(_) => EventKind::ContactRequested,
            Self::BiometricManagerUpdated => EventKind::BiometricManagerUpdated,
            Self::BiometricAuthRequested(_) => EventKind::BiometricAuthRequested,
            Self::BiometricTokenUpdated(_) => EventKind::BiometricTokenUpdated,
        }
    }

    /// Decode event of `kind` from the JSON payload the host passed to the handler.
    ///
    /// `payload` is ignored for kinds without one.
    ///
    /// # Errors
    ///
    /// Fails if `kind` requires a payload and `payload` is absent or malformed.
    pub fn from_json(kind: EventKind, payload: Option<&str>) -> Result<Self, serde_json::Error> {
        /// Decode required payload.
        fn decode<T: DeserializeOwned>(payload: Option<&str>) -> Result<T, serde_json::Error> {
            serde_json::from_str(payload.unwrap_or("null"))
        }

        /// Decode payload which the host may omit when all its fields are empty.
        fn decode_or_default<T: DeserializeOwned + Default>(
            payload: Option<&str>,
        ) -> Result<T, serde_json::Error> {
            match payload {
                None | Some("null" | "undefined") => Ok(T::default()),
                Some(raw) => serde_json::from_str(raw),
            }
        }

        Ok(match kind {
            EventKind::ThemeChanged => Self::ThemeChanged,
            EventKind::MainButtonClicked => Self::MainButtonClicked,
            EventKind::BackButtonClicked => Self::BackButtonClicked,
            EventKind::SettingsButtonClicked => Self::SettingsButtonClicked,
            EventKind::ScanQrPopupClosed => Self::ScanQrPopupClosed,
            EventKind::BiometricManagerUpdated => Self::BiometricManagerUpdated,
            EventKind::ViewportChanged => Self::ViewportChanged(decode(payload)?),
            EventKind::InvoiceClosed => Self::InvoiceClosed(decode(payload)?),
            EventKind::PopupClosed => Self::PopupClosed(decode_or_default(payload)?),
            EventKind::QrTextReceived => Self::QrTextReceived(decode(payload)?),
            EventKind::ClipboardTextReceived => {
                Self::ClipboardTextReceived(decode_or_default(payload)?)
            }
            EventKind::WriteAccessRequested => Self::WriteAccessRequested(decode(payload)?),
            EventKind::ContactRequested => Self::ContactRequested(decode(payload)?),
            EventKind::BiometricAuthRequested => Self::BiometricAuthRequested(decode(payload)?),
            EventKind::BiometricTokenUpdated => Self::BiometricTokenUpdated(decode(payload)?),
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "it's ok in tests")]

    use super::*;

    #[test]
    fn kinds_use_host_names() {
        assert_eq!(EventKind::ThemeChanged.to_string(), "themeChanged");
        assert_eq!(EventKind::QrTextReceived.to_string(), "qrTextReceived");
        assert_eq!(
            "biometricTokenUpdated".parse::<EventKind>().unwrap(),
            EventKind::BiometricTokenUpdated
        );
        "ThemeChanged".parse::<EventKind>().unwrap_err();
    }

    #[test]
    fn kind_names_are_unique_and_parse_back() {
        for kind in EventKind::ALL {
            assert_eq!(kind.to_string().parse::<EventKind>().unwrap(), kind);
        }
        let mut names: Vec<_> = EventKind::ALL.iter().map(ToString::to_string).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), EventKind::ALL.len());
    }

    #[test]
    fn payloadless_events_ignore_payload() {
        let event = Event::from_json(EventKind::MainButtonClicked, Some("{\"junk\": 1}")).unwrap();
        assert_eq!(event, Event::MainButtonClicked);
        assert_eq!(event.kind(), EventKind::MainButtonClicked);
    }

    #[test]
    fn invoice_closed_is_decoded() {
        let event = Event::from_json(
            EventKind::InvoiceClosed,
            Some(r#"{"url": "https://t.me/$abc", "status": "cancelled"}"#),
        )
        .unwrap();

        assert_eq!(
            event,
            Event::InvoiceClosed(payload::InvoiceClosed {
                url: "https://t.me/$abc".to_owned(),
                status: PaymentStatus::Cancelled,
            })
        );
    }

    #[test]
    fn popup_closed_without_button() {
        let dismissed = Event::from_json(EventKind::PopupClosed, None).unwrap();
        assert_eq!(dismissed, Event::PopupClosed(payload::PopupClosed::default()));

        let pressed =
            Event::from_json(EventKind::PopupClosed, Some(r#"{"button_id": "ok"}"#)).unwrap();
        assert_eq!(
            pressed,
            Event::PopupClosed(payload::PopupClosed {
                button_id: Some("ok".to_owned())
            })
        );
    }

    #[test]
    fn biometric_payload_uses_camel_case() {
        let event = Event::from_json(
            EventKind::BiometricAuthRequested,
            Some(r#"{"isAuthenticated": true, "biometricToken": "secret"}"#),
        )
        .unwrap();

        let Event::BiometricAuthRequested(auth) = event else {
            panic!("Unexpected event: {event:?}");
        };
        assert!(auth.is_authenticated);
        assert_eq!(auth.biometric_token.as_deref(), Some("secret"));
    }

    #[test]
    fn missing_required_payload_fails() {
        Event::from_json(EventKind::QrTextReceived, None).unwrap_err();
        Event::from_json(EventKind::ContactRequested, Some(r#"{"status": "maybe"}"#))
            .unwrap_err();
    }
}
