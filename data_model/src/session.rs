//! Module with session descriptors provided by the host when the Mini App is opened.

use parse_display::{Display, FromStr};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::warn;

/// User of the Mini App.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier of the user or bot.
    pub id: i64,
    /// True if this user is a bot. Returned in the `receiver` field only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_bot: Option<bool>,
    /// First name of the user or bot.
    pub first_name: String,
    /// Last name of the user or bot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Username of the user or bot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// [IETF language tag](https://en.wikipedia.org/wiki/IETF_language_tag) of the user's language.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
    /// True if this user is a Telegram Premium user.
    #[serde(default)]
    pub is_premium: bool,
    /// True if this user added the bot to the attachment menu.
    #[serde(default)]
    pub added_to_attachment_menu: bool,
    /// True if this user allowed the bot to message them.
    #[serde(default)]
    pub allows_write_to_pm: bool,
    /// True if the bot can be invited to groups.
    #[serde(default)]
    pub can_join_groups: bool,
    /// True if privacy mode is disabled for the bot.
    #[serde(default)]
    pub can_read_all_group_messages: bool,
    /// True if the bot supports inline queries.
    #[serde(default)]
    pub supports_inline_queries: bool,
    /// True if the bot can be connected to a Telegram Business account.
    #[serde(default)]
    pub can_connect_to_business: bool,
    /// True if the bot has a main Mini App.
    #[serde(default)]
    pub has_main_web_app: bool,
    /// URL of the user's profile photo. Only `.jpeg` and `.svg` formats.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

impl User {
    /// First and last name separated with a space.
    #[must_use]
    pub fn full_name(&self) -> String {
        match &self.last_name {
            Some(last_name) => format!("{} {last_name}", self.first_name),
            None => self.first_name.clone(),
        }
    }
}

/// Kind of a [`Chat`] the Mini App was launched from via the attachment menu.
#[derive(Debug, Display, FromStr, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[display(style = "lowercase")]
#[serde(rename_all = "lowercase")]
#[allow(clippy::missing_docs_in_private_items)]
pub enum ChatKind {
    Group,
    Supergroup,
    Channel,
}

/// Chat the Mini App was launched from via the attachment menu.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Chat {
    /// Unique identifier of the chat.
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: ChatKind,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

/// Type of the chat from which the Mini App was opened.
#[derive(Debug, Display, FromStr, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[display(style = "lowercase")]
#[serde(rename_all = "lowercase")]
#[allow(clippy::missing_docs_in_private_items)]
pub enum ChatType {
    /// Private chat of the user with the bot.
    Sender,
    Private,
    Group,
    Supergroup,
    Channel,
}

/// Data transferred to the Mini App when it is opened.
///
/// This is only a *view* of the data. It must not be trusted until the raw string it was
/// parsed from is verified by the bot backend, see `miniapp_auth`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitData {
    /// Unique identifier of the Mini App session, required for answering a web app query.
    pub query_id: Option<String>,
    pub user: Option<User>,
    /// Chat partner of the current user when the app was opened via the attachment menu.
    pub receiver: Option<User>,
    pub chat: Option<Chat>,
    pub chat_type: Option<ChatType>,
    /// Global identifier of the chat the app was opened from.
    pub chat_instance: Option<String>,
    /// Value of the `startattach` or `startapp` parameter of the launch link.
    pub start_param: Option<String>,
    /// Seconds after which a message can be sent via `answerWebAppQuery`.
    pub can_send_after: Option<u64>,
    /// Unix time when the form was opened.
    pub auth_date: Option<u64>,
    /// Hash of all passed parameters, used by the bot to check their validity.
    pub hash: String,
}

impl InitData {
    /// Parse raw init data as passed by the host in the form of a URL query string.
    ///
    /// Best effort: unknown keys are ignored, malformed values are skipped with a warning.
    /// Never fails, an absent `hash` results in an empty one.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let mut init_data = Self::default();

        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            match key.as_ref() {
                "query_id" => init_data.query_id = Some(value.into_owned()),
                "user" => init_data.user = parse_field(&key, &value, json),
                "receiver" => init_data.receiver = parse_field(&key, &value, json),
                "chat" => init_data.chat = parse_field(&key, &value, json),
                "chat_type" => init_data.chat_type = parse_field(&key, &value, from_str),
                "chat_instance" => init_data.chat_instance = Some(value.into_owned()),
                "start_param" => init_data.start_param = Some(value.into_owned()),
                "can_send_after" => {
                    init_data.can_send_after = parse_field(&key, &value, from_str);
                }
                "auth_date" => init_data.auth_date = parse_field(&key, &value, from_str),
                "hash" => init_data.hash = value.into_owned(),
                _ => {}
            }
        }

        init_data
    }
}

/// Parse a single init data field with `parser`, logging and skipping it on failure.
fn parse_field<T, E: std::fmt::Display>(
    key: &str,
    value: &str,
    parser: impl FnOnce(&str) -> Result<T, E>,
) -> Option<T> {
    parser(value)
        .inspect_err(|error| warn!(key, %error, "Skipping malformed init data field"))
        .ok()
}

/// Parse JSON-encoded field.
fn json<T: DeserializeOwned>(value: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(value)
}

/// Parse field with [`FromStr`](std::str::FromStr).
fn from_str<T: std::str::FromStr>(value: &str) -> Result<T, T::Err> {
    value.parse()
}
