//! Telegram Mini App auth for the admin area.
//!
//! Admin requests carry `Authorization: tma <initData>`; the initData is
//! validated against the bot token per
//! <https://core.telegram.org/bots/webapps#validating-data-received-via-the-mini-app>
//! and the embedded user id is compared with the configured admin id.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::BTreeMap;

use crate::models::TelegramUser;

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of initData before it's considered expired (24 hours).
const MAX_AUTH_AGE_SECS: i64 = 86400;

/// Validates Telegram Mini App initData and extracts the user.
pub fn validate_init_data(init_data: &str, bot_token: &str) -> Option<TelegramUser> {
    let params: BTreeMap<String, String> = url::form_urlencoded::parse(init_data.as_bytes())
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    let hash = params.get("hash")?;

    // Reject stale initData (replay protection)
    if let Some(auth_date) = params.get("auth_date").and_then(|v| v.parse::<i64>().ok()) {
        let age = chrono::Utc::now().timestamp() - auth_date;
        if age > MAX_AUTH_AGE_SECS {
            tracing::warn!("initData expired: age={}s", age);
            return None;
        }
    }

    if compute_hash(&params, bot_token) != *hash {
        tracing::warn!("initData hash mismatch");
        return None;
    }

    let user_json = params.get("user")?;
    serde_json::from_str::<TelegramUser>(user_json).ok()
}

/// HMAC-SHA256 over the sorted key=value pairs (hash excluded), keyed by
/// HMAC-SHA256("WebAppData", bot_token).
fn compute_hash(params: &BTreeMap<String, String>, bot_token: &str) -> String {
    let data_check_string: String = params
        .iter()
        .filter(|(k, _)| k.as_str() != "hash")
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("\n");

    let mut secret_mac =
        HmacSha256::new_from_slice(b"WebAppData").expect("HMAC can take key of any size");
    secret_mac.update(bot_token.as_bytes());
    let secret_key = secret_mac.finalize().into_bytes();

    let mut mac = HmacSha256::new_from_slice(&secret_key).expect("HMAC can take key of any size");
    mac.update(data_check_string.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Extract a Telegram user from an `Authorization: tma <initData>` header.
pub fn extract_user_from_header(auth_header: &str, bot_token: &str) -> Option<TelegramUser> {
    let init_data = auth_header.strip_prefix("tma ")?;
    validate_init_data(init_data, bot_token)
}

/// The admin is the single configured `ADMIN_TG_ID`; unset means nobody.
pub fn is_admin(user: &TelegramUser, admin_tg_id: Option<i64>) -> bool {
    admin_tg_id == Some(user.id)
}

// ── Tests ──
