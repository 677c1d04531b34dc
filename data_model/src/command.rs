//! Module with fire-and-forget [`Command`]s.
//!
//! A command only *requests* a change. The host applies it later and reflects the result in
//! the next [`HostState`](crate::HostState) snapshot or an [`Event`](crate::Event).

use parse_display::{Display, FromStr};
use serde::{Deserialize, Serialize};

use crate::{
    ValidationError, Version, check_len, check_non_empty_len,
    theme::{Color, HeaderColor},
};

/// Maximum size of data sent to the bot in bytes.
pub const SEND_DATA_MAX_BYTES: usize = 4096;

/// Command changing the state of the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Inform the host that the Mini App is ready to be displayed.
    Ready,
    /// Expand the Mini App to the maximum available height.
    Expand,
    /// Close the Mini App.
    Close,
    SetHeaderColor(HeaderColor),
    SetBackgroundColor(Color),
    /// Enable or disable the confirmation dialog shown when the user closes the Mini App.
    SetClosingConfirmation(bool),
    /// Enable or disable closing and minimizing the Mini App with vertical swipes.
    SetVerticalSwipes(bool),
    /// Send data to the bot and close the Mini App.
    ///
    /// Available only for Mini Apps launched via a keyboard button.
    SendData(String),
    /// Insert the bot's username and `query` into the input field of a chosen chat.
    SwitchInlineQuery {
        query: String,
        /// Chat types the user may choose from. Empty means the current chat.
        chat_types: Vec<InlineQueryChatType>,
    },
    /// Open a link in an external browser.
    OpenLink {
        url: url::Url,
        /// Open the link in Instant View mode if possible.
        try_instant_view: bool,
    },
    /// Open a `t.me` link inside Telegram. The Mini App will be closed.
    OpenTelegramLink(url::Url),
    /// Open the native story editor with the media.
    ShareToStory {
        media_url: url::Url,
        params: StoryShareParams,
    },
    /// Close the QR code scanner opened with `showScanQrPopup`.
    CloseScanQrPopup,
    MainButton(MainButtonCommand),
    BackButton(Visibility),
    SettingsButton(Visibility),
    Haptic(HapticFeedback),
    /// Open the biometric access settings of the bot.
    OpenBiometricSettings,
}

impl Command {
    /// Name of the host method implementing this command. Used for logging.
    #[must_use]
    pub const fn method(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Expand => "expand",
            Self::Close => "close",
            Self::SetHeaderColor(_) => "setHeaderColor",
            Self::SetBackgroundColor(_) => "setBackgroundColor",
            Self::SetClosingConfirmation(true) => "enableClosingConfirmation",
            Self::SetClosingConfirmation(false) => "disableClosingConfirmation",
            Self::SetVerticalSwipes(true) => "enableVerticalSwipes",
            Self::SetVerticalSwipes(false) => "disableVerticalSwipes",
            Self::SendData(_) => "sendData",
            Self::SwitchInlineQuery { .. } => "switchInlineQuery",
            Self::OpenLink { .. } => "openLink",
            Self::OpenTelegramLink(_) => "openTelegramLink",
            Self::ShareToStory { .. } => "shareToStory",
            Self::CloseScanQrPopup => "closeScanQrPopup",
            Self::MainButton(_) => "MainButton",
            Self::BackButton(_) => "BackButton",
            Self::SettingsButton(_) => "SettingsButton",
            Self::Haptic(_) => "HapticFeedback",
            Self::OpenBiometricSettings => "BiometricManager.openSettings",
        }
    }

    /// Minimal host version supporting this command.
    #[must_use]
    pub fn min_version(&self) -> Version {
        match self {
            Self::Ready
            | Self::Expand
            | Self::Close
            | Self::SendData(_)
            | Self::OpenLink { .. }
            | Self::OpenTelegramLink(_)
            | Self::MainButton(_) => Version::new(6, 0),
            Self::SetHeaderColor(_)
            | Self::SetBackgroundColor(_)
            | Self::BackButton(_)
            | Self::Haptic(_) => Version::new(6, 1),
            Self::SetClosingConfirmation(_) => Version::new(6, 2),
            Self::CloseScanQrPopup => Version::new(6, 4),
            Self::SwitchInlineQuery { .. } => Version::new(6, 7),
            Self::SettingsButton(_) => Version::new(7, 0),
            Self::OpenBiometricSettings => Version::new(7, 2),
            Self::SetVerticalSwipes(_) => Version::new(7, 7),
            Self::ShareToStory { .. } => Version::new(7, 8),
        }
    }

    /// Check the command arguments the same way the host does.
    ///
    /// # Errors
    ///
    /// Fails if any argument violates host limits.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::SendData(data) => {
                if data.is_empty() {
                    return Err(ValidationError::Empty("data"));
                }
                if data.len() > SEND_DATA_MAX_BYTES {
                    return Err(ValidationError::TooLong {
                        field: "data",
                        len: data.len(),
                        max: SEND_DATA_MAX_BYTES,
                    });
                }
                Ok(())
            }
            Self::ShareToStory { params, .. } => params.validate(),
            Self::MainButton(MainButtonCommand::SetText(text)) => {
                check_non_empty_len("main button text", text.trim(), 64)
            }
            Self::MainButton(MainButtonCommand::SetParams(params)) => params
                .text
                .as_deref()
                .map_or(Ok(()), |text| check_non_empty_len("main button text", text.trim(), 64)),
            Self::Ready
            | Self::Expand
            | Self::Close
            | Self::SetHeaderColor(_)
            | Self::SetBackgroundColor(_)
            | Self::SetClosingConfirmation(_)
            | Self::SetVerticalSwipes(_)
            | Self::SwitchInlineQuery { .. }
            | Self::OpenLink { .. }
            | Self::OpenTelegramLink(_)
            | Self::CloseScanQrPopup
            | Self::MainButton(_)
            | Self::BackButton(_)
            | Self::SettingsButton(_)
            | Self::Haptic(_)
            | Self::OpenBiometricSettings => Ok(()),
        }
    }
}

/// Kind of chat available in `switchInlineQuery`.
#[derive(Debug, Display, FromStr, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[display(style = "lowercase")]
#[serde(rename_all = "lowercase")]
#[allow(clippy::missing_docs_in_private_items)]
pub enum InlineQueryChatType {
    Users,
    Bots,
    Groups,
    Channels,
}

/// Show or hide a control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(clippy::missing_docs_in_private_items)]
pub enum Visibility {
    Show,
    Hide,
}

impl Visibility {
    /// Whether the control is visible after this command.
    #[must_use]
    pub const fn is_visible(self) -> bool {
        matches!(self, Self::Show)
    }
}

/// Command for the main button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MainButtonCommand {
    SetText(String),
    Visibility(Visibility),
    /// Enable or disable the button.
    SetActive(bool),
    /// Show a loading indicator on the button.
    ShowProgress {
        /// Keep the button active while progress is shown.
        leave_active: bool,
    },
    HideProgress,
    /// Change several parameters at once.
    SetParams(MainButtonParams),
}

/// Parameters of [`MainButtonCommand::SetParams`]. [`None`] leaves the parameter unchanged.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MainButtonParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_visible: Option<bool>,
}

/// Haptic feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HapticFeedback {
    /// Impact occurred.
    Impact(ImpactStyle),
    /// A task or action succeeded, failed or produced a warning.
    Notification(NotificationType),
    /// User changed a selection.
    SelectionChanged,
}

/// Style of [`HapticFeedback::Impact`].
#[derive(Debug, Display, FromStr, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[display(style = "lowercase")]
#[serde(rename_all = "lowercase")]
#[allow(clippy::missing_docs_in_private_items)]
pub enum ImpactStyle {
    Light,
    Medium,
    Heavy,
    Rigid,
    Soft,
}

/// Type of [`HapticFeedback::Notification`].
#[derive(Debug, Display, FromStr, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[display(style = "lowercase")]
#[serde(rename_all = "lowercase")]
#[allow(clippy::missing_docs_in_private_items)]
pub enum NotificationType {
    Error,
    Success,
    Warning,
}

/// Additional sharing settings for the native story editor.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryShareParams {
    /// Caption added to the media.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Widget link included in the story. Only premium subscribers can post stories with links.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub widget_link: Option<StoryWidgetLink>,
}

impl StoryShareParams {
    /// Check limits of the story editor.
    ///
    /// # Errors
    ///
    /// Fails if the caption or the widget name is too long.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(text) = &self.text {
            check_len("story text", text, 2048)?;
        }
        if let Some(name) = self.widget_link.as_ref().and_then(|link| link.name.as_ref()) {
            check_len("widget link name", name, 48)?;
        }
        Ok(())
    }
}

/// Widget link included in a story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryWidgetLink {
    pub url: url::Url,
    /// Name displayed for the link.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "it's ok in tests")]

    use super::*;

    #[test]
    fn send_data_respects_size_limit() {
        Command::SendData("a".repeat(SEND_DATA_MAX_BYTES))
            .validate()
            .unwrap();

        assert_eq!(
            Command::SendData("a".repeat(SEND_DATA_MAX_BYTES + 1))
                .validate()
                .unwrap_err(),
            ValidationError::TooLong {
                field: "data",
                len: SEND_DATA_MAX_BYTES + 1,
                max: SEND_DATA_MAX_BYTES
            }
        );
        assert_eq!(
            Command::SendData(String::new()).validate().unwrap_err(),
            ValidationError::Empty("data")
        );
    }

    #[test]
    fn send_data_limit_counts_bytes() {
        // Two bytes per character
        let data = "й".repeat(SEND_DATA_MAX_BYTES / 2 + 1);
        Command::SendData(data).validate().unwrap_err();
    }

    #[test]
    fn main_button_text_must_not_be_blank() {
        Command::MainButton(MainButtonCommand::SetText("   ".to_owned()))
            .validate()
            .unwrap_err();
        Command::MainButton(MainButtonCommand::SetParams(MainButtonParams {
            text: Some(String::new()),
            ..MainButtonParams::default()
        }))
        .validate()
        .unwrap_err();
        Command::MainButton(MainButtonCommand::SetParams(MainButtonParams {
            is_visible: Some(true),
            ..MainButtonParams::default()
        }))
        .validate()
        .unwrap();
    }

    #[test]
    fn min_versions() {
        assert_eq!(Command::Expand.min_version(), Version::new(6, 0));
        assert_eq!(
            Command::SetClosingConfirmation(true).min_version(),
            Version::new(6, 2)
        );
        assert_eq!(
            Command::SettingsButton(Visibility::Show).min_version(),
            Version::new(7, 0)
        );
        assert_eq!(
            Command::SetVerticalSwipes(false).min_version(),
            Version::new(7, 7)
        );
    }

    #[test]
    fn method_names_follow_host() {
        assert_eq!(
            Command::SetClosingConfirmation(false).method(),
            "disableClosingConfirmation"
        );
        assert_eq!(
            Command::SetVerticalSwipes(true).method(),
            "enableVerticalSwipes"
        );
    }

    #[test]
    fn main_button_params_skip_unset_fields() {
        let params = MainButtonParams {
            text: Some("Pay".to_owned()),
            color: Some("#F00".parse().unwrap()),
            ..MainButtonParams::default()
        };

        assert_eq!(
            serde_json::to_string(&params).unwrap(),
            r##"{"text":"Pay","color":"#ff0000"}"##
        );
    }
}
