//! Module with theme descriptors.

use std::{fmt, str::FromStr};

use parse_display::{Display, FromStr};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ValidationError;

/// Color scheme currently used by the host.
#[derive(Debug, Default, Display, FromStr, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize)]
#[display(style = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    #[default]
    Light,
    Dark,
}

/// Color in the `#rrggbb` form.
///
/// Parsing accepts `#RRGGBB` and `#RGB` in any case and normalizes them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Color(String);

impl Color {
    /// Color as a `#rrggbb` string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Color {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::Color(s.to_owned());

        let digits = s.trim().strip_prefix('#').ok_or_else(invalid)?;
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let digits = digits.to_ascii_lowercase();
        match digits.len() {
            6 => Ok(Self(format!("#{digits}"))),
            3 => Ok(Self(digits.chars().fold(String::from("#"), |mut acc, c| {
                acc.push(c);
                acc.push(c);
                acc
            }))),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Header color of the Mini App.
///
/// Either one of the theme keywords or an explicit color.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub enum HeaderColor {
    /// `bg_color` of the current theme.
    #[default]
    Background,
    /// `secondary_bg_color` of the current theme.
    SecondaryBackground,
    /// Explicit color.
    Rgb(Color),
}

impl HeaderColor {
    /// Value passed to the host.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Background => "bg_color",
            Self::SecondaryBackground => "secondary_bg_color",
            Self::Rgb(color) => color.as_str(),
        }
    }
}

impl FromStr for HeaderColor {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bg_color" => Ok(Self::Background),
            "secondary_bg_color" => Ok(Self::SecondaryBackground),
            color => color.parse().map(Self::Rgb),
        }
    }
}

impl From<Color> for HeaderColor {
    fn from(color: Color) -> Self {
        Self::Rgb(color)
    }
}

impl fmt::Display for HeaderColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for HeaderColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for HeaderColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Mapping from semantic color roles to colors.
///
/// Replaced wholesale every time the host emits `themeChanged`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::missing_docs_in_private_items)]
pub struct ThemeParams {
    pub bg_color: Option<Color>,
    pub text_color: Option<Color>,
    pub hint_color: Option<Color>,
    pub link_color: Option<Color>,
    pub button_color: Option<Color>,
    pub button_text_color: Option<Color>,
    pub secondary_bg_color: Option<Color>,
    pub header_bg_color: Option<Color>,
    pub accent_text_color: Option<Color>,
    pub section_bg_color: Option<Color>,
    pub section_header_text_color: Option<Color>,
    pub section_separator_color: Option<Color>,
    pub subtitle_text_color: Option<Color>,
    pub destructive_text_color: Option<Color>,
}
