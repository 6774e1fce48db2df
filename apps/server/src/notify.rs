//! Best-effort Telegram delivery for booking events.
//!
//! Delivery is fire-and-forget relative to the HTTP response: handlers spawn
//! notification tasks onto the runtime and never await them, so a slow or
//! failing Telegram API cannot delay or fail a booking request. A spawned
//! task keeps running after the response is sent; callers must not assume
//! delivery succeeded.

use std::future::Future;
use std::time::Duration;

use serde_json::json;

use crate::models::BookingDetail;

/// Attempts per message before giving up.
const MAX_ATTEMPTS: u32 = 3;
/// Per-attempt timeout.
const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);
/// Linear backoff step: wait `attempt × BACKOFF_STEP` between attempts.
const BACKOFF_STEP: Duration = Duration::from_millis(1000);

/// Where a message goes. Numeric chat ids are deliverable; usernames are a
/// degraded fallback — the Bot API cannot resolve an arbitrary @username to a
/// chat id, delivery only works if the user already talked to the bot.
#[derive(Debug, Clone, PartialEq)]
pub enum Recipient {
    Id(i64),
    Username(String),
}

impl Recipient {
    /// Pick the recipient for a booking: numeric user id wins over username.
    pub fn for_booking(telegram_user_id: Option<i64>, client_telegram: Option<&str>) -> Option<Self> {
        if let Some(id) = telegram_user_id {
            return Some(Recipient::Id(id));
        }
        client_telegram
            .map(|u| u.trim().trim_start_matches('@'))
            .filter(|u| !u.is_empty())
            .map(|u| Recipient::Username(format!("@{u}")))
    }

    fn chat_id(&self) -> serde_json::Value {
        match self {
            Recipient::Id(id) => json!(id),
            Recipient::Username(u) => json!(u),
        }
    }
}

/// Telegram sender shared through `AppState`. Constructed once at startup;
/// missing configuration yields a disabled notifier that logs and reports
/// failure instead of erroring.
#[derive(Clone)]
pub struct Notifier {
    http: reqwest::Client,
    api_url: Option<String>,
    admin_chat_id: Option<i64>,
}

impl Notifier {
    pub fn new(bot_token: &str, admin_chat_id: Option<i64>) -> Self {
        let api_url = if bot_token.is_empty() {
            None
        } else {
            Some(format!("https://api.telegram.org/bot{bot_token}/sendMessage"))
        };
        Self {
            http: reqwest::Client::new(),
            api_url,
            admin_chat_id,
        }
    }

    /// Deliver `text` to `recipient`, retrying transport failures, timeouts
    /// and non-2xx responses alike. Never panics; `false` means all attempts
    /// failed and the message is lost.
    pub async fn send_message(&self, recipient: &Recipient, text: &str) -> bool {
        let Some(url) = &self.api_url else {
            tracing::warn!("BOT_TOKEN not configured — message dropped");
            return false;
        };

        let body = json!({
            "chat_id": recipient.chat_id(),
            "text": text,
            "parse_mode": "HTML",
        });

        send_with_retries(|attempt| {
            let request = self
                .http
                .post(url)
                .timeout(ATTEMPT_TIMEOUT)
                .json(&body);
            async move {
                match request.send().await {
                    Ok(resp) if resp.status().is_success() => true,
                    Ok(resp) => {
                        tracing::warn!(
                            "sendMessage attempt {}/{} got HTTP {}",
                            attempt,
                            MAX_ATTEMPTS,
                            resp.status()
                        );
                        false
                    }
                    Err(e) => {
                        tracing::warn!(
                            "sendMessage attempt {}/{} failed: {}",
                            attempt,
                            MAX_ATTEMPTS,
                            e
                        );
                        false
                    }
                }
            }
        })
        .await
    }

    /// New-booking notification to the configured admin.
    pub async fn notify_admin_about_booking(&self, b: &BookingDetail) -> bool {
        let Some(admin_id) = self.admin_chat_id else {
            tracing::warn!("ADMIN_TG_ID not configured — admin notification skipped");
            return false;
        };

        let mut text = format!(
            "🔔 <b>Новая запись!</b>\n\n\
             👤 <b>Клиент:</b> {}\n\
             📞 <b>Телефон:</b> {}\n",
            escape_html(&b.client_name),
            format_phone(&b.client_phone),
        );
        if let Some(tg) = &b.client_telegram {
            let username = tg.trim_start_matches('@');
            text.push_str(&format!("💬 <b>Telegram:</b> @{}\n", escape_html(username)));
        }
        text.push_str(&format!(
            "📅 <b>Дата:</b> {}\n\
             ⏰ <b>Время:</b> {}\n\
             💅 <b>Услуга:</b> {}\n",
            format_date_ru(&b.date),
            b.start_time,
            escape_html(&b.service_name),
        ));
        if let Some(design) = &b.design_name {
            text.push_str(&format!("🎨 <b>Дизайн:</b> {}\n", escape_html(design)));
        }
        text.push_str(&format!("💰 <b>Итого:</b> {} ₽\n", b.total_price));
        if let Some(notes) = b.notes.as_deref().filter(|n| !n.trim().is_empty()) {
            text.push_str(&format!("\n📝 <b>Комментарий:</b> {}", escape_html(notes)));
        }

        self.send_message(&Recipient::Id(admin_id), &text).await
    }

    /// Booking confirmation to the client, when a Telegram identifier exists.
    pub async fn notify_user_about_booking(&self, b: &BookingDetail) -> bool {
        let Some(recipient) =
            Recipient::for_booking(b.telegram_user_id, b.client_telegram.as_deref())
        else {
            tracing::warn!("booking {} has no Telegram contact — confirmation skipped", b.id);
            return false;
        };

        let mut text = format!(
            "✅ <b>Запись подтверждена!</b>\n\n\
             Здравствуйте, {}!\n\n\
             Ваша запись успешно создана:\n\n\
             💅 <b>Услуга:</b> {}\n",
            escape_html(&b.client_name),
            escape_html(&b.service_name),
        );
        if let Some(design) = &b.design_name {
            text.push_str(&format!("🎨 <b>Дизайн:</b> {}\n", escape_html(design)));
        }
        text.push_str(&format!(
            "📅 <b>Дата:</b> {}\n\
             ⏰ <b>Время:</b> {}\n\
             💰 <b>Итого:</b> {} ₽\n\n\
             Ждём вас! 💖",
            format_date_ru(&b.date),
            b.start_time,
            b.total_price,
        ));

        self.send_message(&recipient, &text).await
    }

    /// Day-before reminder to the client.
    pub async fn send_booking_reminder(&self, b: &BookingDetail) -> bool {
        let Some(recipient) =
            Recipient::for_booking(b.telegram_user_id, b.client_telegram.as_deref())
        else {
            tracing::warn!("booking {} has no Telegram contact — reminder skipped", b.id);
            return false;
        };

        let mut text = format!(
            "⏰ <b>Напоминание о записи</b>\n\n\
             Здравствуйте, {}!\n\n\
             Напоминаем, что завтра у вас запись:\n\n\
             💅 <b>Услуга:</b> {}\n",
            escape_html(&b.client_name),
            escape_html(&b.service_name),
        );
        if let Some(design) = &b.design_name {
            text.push_str(&format!("🎨 <b>Дизайн:</b> {}\n", escape_html(design)));
        }
        text.push_str(&format!(
            "📅 <b>Дата:</b> {}\n\
             ⏰ <b>Время:</b> {}\n\n\
             Будем рады вас видеть! 💖\n\n\
             <i>Если не сможете прийти, пожалуйста, предупредите нас заранее.</i>",
            format_date_ru(&b.date),
            b.start_time,
        ));

        self.send_message(&recipient, &text).await
    }
}

/// Run `attempt_fn` up to `MAX_ATTEMPTS` times. Sleeps `attempt × 1s` after
/// a failed attempt; no sleep after the last one.
async fn send_with_retries<F, Fut>(mut attempt_fn: F) -> bool
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = bool>,
{
    for attempt in 1..=MAX_ATTEMPTS {
        if attempt_fn(attempt).await {
            return true;
        }
        if attempt < MAX_ATTEMPTS {
            tokio::time::sleep(BACKOFF_STEP * attempt).await;
        }
    }
    false
}

// ── Formatting helpers ──

/// Escape interpolated fields so client-supplied text cannot inject Telegram
/// HTML markup.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#039;")
}

/// Render a digit-only phone readably: Russian 11-digit numbers as
/// +7 (XXX) XXX-XX-XX, anything else with a bare plus.
pub fn format_phone(digits: &str) -> String {
    if digits.len() == 11 && digits.starts_with('7') {
        format!(
            "+7 ({}) {}-{}-{}",
            &digits[1..4],
            &digits[4..7],
            &digits[7..9],
            &digits[9..11]
        )
    } else if digits.is_empty() {
        String::new()
    } else {
        format!("+{digits}")
    }
}

/// "2025-06-01" → "1 июня 2025".
pub fn format_date_ru(date: &str) -> String {
    const MONTHS: [&str; 12] = [
        "января", "февраля", "марта", "апреля", "мая", "июня",
        "июля", "августа", "сентября", "октября", "ноября", "декабря",
    ];
    let parts: Vec<&str> = date.split('-').collect();
    if parts.len() != 3 {
        return date.to_string();
    }
    let day: u32 = parts[2].parse().unwrap_or(0);
    let month = parts[1].parse::<usize>().unwrap_or(0);
    match month.checked_sub(1).and_then(|m| MONTHS.get(m)) {
        Some(name) => format!("{} {} {}", day, name, parts[0]),
        None => date.to_string(),
    }
}

// ── Tests ──
