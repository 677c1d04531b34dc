//! Module with read-only descriptors of host-rendered controls and the overall [`HostState`].
//!
//! State is owned by the host. Consumers change it only by issuing
//! [`Command`](crate::Command)s and observe the result in a later snapshot.

use parse_display::{Display, FromStr};
use serde::{Deserialize, Serialize};

use crate::{ColorScheme, ThemeParams, Version, theme::HeaderColor};

/// Visible area of the Mini App.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Current height of the visible area in pixels. Changes while the user is dragging.
    pub height: f64,
    /// Height of the visible area in its last stable state.
    pub stable_height: f64,
    /// Whether the Mini App is expanded to the maximum available height.
    pub is_expanded: bool,
}

/// Button displayed at the bottom of the Mini App.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MainButton {
    pub text: String,
    pub color: String,
    pub text_color: String,
    pub is_visible: bool,
    pub is_active: bool,
    pub is_progress_visible: bool,
}

impl MainButton {
    /// Text the host uses until another one is set.
    pub const DEFAULT_TEXT: &'static str = "CONTINUE";
}

impl Default for MainButton {
    fn default() -> Self {
        Self {
            text: Self::DEFAULT_TEXT.to_owned(),
            color: "#2481cc".to_owned(),
            text_color: "#ffffff".to_owned(),
            is_visible: false,
            is_active: true,
            is_progress_visible: false,
        }
    }
}

/// Back button in the header of the Mini App.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackButton {
    pub is_visible: bool,
}

/// Item in the context menu of the Mini App.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsButton {
    pub is_visible: bool,
}

/// Type of biometrics available on the device.
#[derive(Debug, Default, Display, FromStr, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize)]
#[display(style = "lowercase")]
#[serde(rename_all = "lowercase")]
#[allow(clippy::missing_docs_in_private_items)]
pub enum BiometricType {
    Finger,
    Face,
    #[default]
    Unknown,
}

/// State of the biometric storage.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiometricManager {
    /// Whether the manager is initialized. Other fields are meaningful only after that.
    pub is_inited: bool,
    pub is_biometric_available: bool,
    pub biometric_type: BiometricType,
    /// Whether permission to use biometrics has been requested.
    pub is_access_requested: bool,
    pub is_access_granted: bool,
    /// Whether a token is saved in the secure storage on the device.
    pub is_biometric_token_saved: bool,
    /// Unique device identifier to check that the token is stored on the same device.
    pub device_id: String,
}

/// Snapshot of everything the host reports about the current session.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostState {
    /// Raw signed init data.
    pub init_data: String,
    pub version: Version,
    /// Name of the platform of the user, e.g. `android` or `tdesktop`.
    pub platform: String,
    pub color_scheme: ColorScheme,
    pub theme_params: ThemeParams,
    pub viewport: Viewport,
    pub header_color: HeaderColor,
    pub background_color: String,
    pub is_closing_confirmation_enabled: bool,
    pub is_vertical_swipes_enabled: bool,
    pub main_button: MainButton,
    pub back_button: BackButton,
    pub settings_button: SettingsButton,
    pub biometric_manager: BiometricManager,
}
