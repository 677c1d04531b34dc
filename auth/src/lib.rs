//! Crate to check that Mini App init data was really issued by Telegram.
//!
//! Init data obtained on the client is untrusted until its signature is checked on the server
//! with the bot token, see
//! <https://core.telegram.org/bots/webapps#validating-data-received-via-the-mini-app>.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac as _};
use miniapp_data_model::InitData;
use sha2::Sha256;
use tracing::debug;

/// Key used to derive the secret from the bot token.
const SECRET_KEY: &[u8] = b"WebAppData";

/// Name of the field with the signature.
const HASH_FIELD: &str = "hash";

/// Name of the field with the creation time.
const AUTH_DATE_FIELD: &str = "auth_date";

type HmacSha256 = Hmac<Sha256>;

/// Init data validation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, displaydoc::Display)]
pub enum Error {
    /// Init data has no `hash` field
    MissingHash,
    /// `hash` field is not a hex string: {0}
    MalformedHash(String),
    /// Signature doesn't match, init data was forged or signed with another bot token
    SignatureMismatch,
    /// Init data has no `auth_date` field
    MissingAuthDate,
    /// `auth_date` field is not a Unix timestamp: `{0}`
    InvalidAuthDate(String),
    /// Init data was issued {age:?} ago, which exceeds the allowed {max_age:?}
    Expired {
        /// Time passed since the init data was issued.
        age: Duration,
        /// Maximal allowed age.
        max_age: Duration,
    },
}

/// Result of init data validation.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Check signature and freshness of `raw` init data at `now`.
///
/// `max_age` of [`None`] disables the freshness check.
/// Returns parsed init data on success.
///
/// # Errors
///
/// Fails if the signature is missing or wrong or if the init data is too old.
pub fn validate(
    raw: &str,
    bot_token: &str,
    max_age: Option<Duration>,
    now: SystemTime,
) -> Result<InitData> {
    let fields = decode(raw);

    let hash = fields
        .iter()
        .find_map(|(key, value)| (key == HASH_FIELD).then_some(value))
        .ok_or(Error::MissingHash)?;
    let hash = hex::decode(hash).map_err(|err| Error::MalformedHash(err.to_string()))?;

    signer(bot_token)
        .chain_update(data_check_string(&fields))
        .verify_slice(&hash)
        .map_err(|_err| Error::SignatureMismatch)?;

    let auth_date = fields
        .iter()
        .find_map(|(key, value)| (key == AUTH_DATE_FIELD).then_some(value))
        .ok_or(Error::MissingAuthDate)?;
    let auth_date = auth_date
        .parse::<u64>()
        .map_err(|_err| Error::InvalidAuthDate(auth_date.clone()))?;

    if let Some(max_age) = max_age {
        let issued_at = UNIX_EPOCH + Duration::from_secs(auth_date);
        // Init data from the future is fine: clocks are never perfectly synchronized
        let age = now.duration_since(issued_at).unwrap_or_default();
        if age > max_age {
            return Err(Error::Expired { age, max_age });
        }
    }

    debug!(auth_date, "Init data is valid");
    Ok(InitData::parse(raw))
}

/// Same as [`validate()`] at the current time.
///
/// # Errors
///
/// See [`validate()`].
pub fn validate_now(raw: &str, bot_token: &str, max_age: Option<Duration>) -> Result<InitData> {
    validate(raw, bot_token, max_age, SystemTime::now())
}

/// Sign `fields` with `bot_token` the same way Telegram does.
///
/// Returns URL-encoded init data with the `hash` field appended.
/// Useful to feed a simulated host or to test the server side.
#[must_use]
pub fn sign<'field>(
    fields: impl IntoIterator<Item = (&'field str, &'field str)>,
    bot_token: &str,
) -> String {
    let fields: Vec<_> = fields
        .into_iter()
        .filter(|(key, _value)| *key != HASH_FIELD)
        .map(|(key, value)| (key.to_owned(), value.to_owned()))
        .collect();
    let hash = hex::encode(
        signer(bot_token)
            .chain_update(data_check_string(&fields))
            .finalize()
            .into_bytes(),
    );

    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(&fields)
        .append_pair(HASH_FIELD, &hash)
        .finish()
}

/// Decode URL-encoded `raw` init data into key-value pairs.
fn decode(raw: &str) -> Vec<(String, String)> {
    url::form_urlencoded::parse(raw.as_bytes())
        .into_owned()
        .collect()
}

/// All fields except `hash` as `key=value` lines sorted by key.
fn data_check_string(fields: &[(String, String)]) -> String {
    let mut fields: Vec<_> = fields
        .iter()
        .filter(|(key, _value)| key != HASH_FIELD)
        .collect();
    fields.sort_by(|(left, _), (right, _)| left.cmp(right));
    fields
        .into_iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// HMAC keyed with the secret derived from `bot_token`.
#[expect(clippy::expect_used, reason = "HMAC accepts keys of any size")]
fn signer(bot_token: &str) -> HmacSha256 {
    let secret = HmacSha256::new_from_slice(SECRET_KEY)
        .expect("HMAC accepts keys of any size")
        .chain_update(bot_token.as_bytes())
        .finalize()
        .into_bytes();
    HmacSha256::new_from_slice(&secret).expect("HMAC accepts keys of any size")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "it's ok in tests")]

    use super::*;

    const BOT_TOKEN: &str = "5768337691:AAH5YkoiEuPk8-FZa32hStHTqXiLPtAEhx8";

    /// 2024-01-01T00:00:00Z
    const AUTH_DATE: u64 = 1_704_067_200;

    fn signed(auth_date: &str) -> String {
        sign(
            [
                ("query_id", "AAHdF6IQAAAAAN0XohDhrOrc"),
                (
                    "user",
                    r#"{"id":279058397,"first_name":"Vladislav","username":"vdkfrost","language_code":"ru","is_premium":true}"#,
                ),
                ("auth_date", auth_date),
            ],
            BOT_TOKEN,
        )
    }

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn signed_init_data_is_valid() {
        let raw = signed(&AUTH_DATE.to_string());

        let init_data = validate(&raw, BOT_TOKEN, None, at(AUTH_DATE)).unwrap();

        assert_eq!(init_data.auth_date, Some(AUTH_DATE));
        assert_eq!(init_data.query_id.as_deref(), Some("AAHdF6IQAAAAAN0XohDhrOrc"));
        assert_eq!(init_data.user.unwrap().id, 279_058_397);
    }

    #[test]
    fn field_order_does_not_matter() {
        let raw = signed(&AUTH_DATE.to_string());
        let mut fields: Vec<_> = raw.split('&').collect();
        fields.reverse();

        validate(&fields.join("&"), BOT_TOKEN, None, at(AUTH_DATE)).unwrap();
    }

    #[test]
    fn another_bot_token_is_rejected() {
        let raw = signed(&AUTH_DATE.to_string());

        assert_eq!(
            validate(&raw, "1234567890:another", None, at(AUTH_DATE)).unwrap_err(),
            Error::SignatureMismatch
        );
    }

    #[test]
    fn tampered_field_is_rejected() {
        let raw = signed(&AUTH_DATE.to_string()).replace("vdkfrost", "somebody");

        assert_eq!(
            validate(&raw, BOT_TOKEN, None, at(AUTH_DATE)).unwrap_err(),
            Error::SignatureMismatch
        );
    }

    #[test]
    fn missing_hash_is_rejected() {
        assert_eq!(
            validate("auth_date=1704067200", BOT_TOKEN, None, at(AUTH_DATE)).unwrap_err(),
            Error::MissingHash
        );
    }

    #[test]
    fn malformed_hash_is_rejected() {
        assert!(matches!(
            validate("auth_date=1&hash=xyz", BOT_TOKEN, None, at(AUTH_DATE)).unwrap_err(),
            Error::MalformedHash(_)
        ));
    }

    #[test]
    fn signed_garbage_auth_date_is_rejected() {
        let raw = signed("yesterday");

        assert_eq!(
            validate(&raw, BOT_TOKEN, None, at(AUTH_DATE)).unwrap_err(),
            Error::InvalidAuthDate("yesterday".to_owned())
        );
    }

    #[test]
    fn missing_auth_date_is_rejected() {
        let raw = sign([("query_id", "AAH")], BOT_TOKEN);

        assert_eq!(
            validate(&raw, BOT_TOKEN, None, at(AUTH_DATE)).unwrap_err(),
            Error::MissingAuthDate
        );
    }

    #[test]
    fn old_init_data_is_rejected() {
        let raw = signed(&AUTH_DATE.to_string());
        let max_age = Duration::from_secs(60 * 60);

        validate(&raw, BOT_TOKEN, Some(max_age), at(AUTH_DATE + 60 * 60)).unwrap();
        assert_eq!(
            validate(&raw, BOT_TOKEN, Some(max_age), at(AUTH_DATE + 60 * 60 + 1)).unwrap_err(),
            Error::Expired {
                age: Duration::from_secs(60 * 60 + 1),
                max_age,
            }
        );
    }

    #[test]
    fn init_data_from_the_future_is_accepted() {
        let raw = signed(&AUTH_DATE.to_string());

        validate(
            &raw,
            BOT_TOKEN,
            Some(Duration::from_secs(1)),
            at(AUTH_DATE - 30),
        )
        .unwrap();
    }

    #[test]
    fn sign_replaces_existing_hash() {
        let raw = sign([("auth_date", "1"), ("hash", "deadbeef")], BOT_TOKEN);

        assert_eq!(raw.matches("hash=").count(), 1);
        validate(&raw, BOT_TOKEN, None, at(1)).unwrap();
    }
}
