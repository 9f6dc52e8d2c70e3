//! WhatsApp order messages.
//!
//! Customers order by opening a `wa.me` deep link with a prefilled message that
//! names the product, the quantity and the price. Nothing is persisted.

use url::form_urlencoded::byte_serialize;

use super::entities::ProductRecord;
use super::error::DomainError;

const WHATSAPP_BASE: &str = "https://wa.me/";
pub const MAX_QUANTITY: u32 = 99;

/// Format an amount in minor units with thousands separators, e.g. `IDR 450.000`.
///
/// Currencies without minor units in everyday use (IDR, JPY) drop the cents.
pub fn format_price(amount_cents: i64, currency: &str) -> String {
    let negative = amount_cents < 0;
    let cents = amount_cents.unsigned_abs();
    let whole = cents / 100;
    let fraction = cents % 100;

    let (thousands, decimal) = match currency {
        "IDR" | "EUR" => ('.', ','),
        _ => (',', '.'),
    };

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(thousands);
        }
        grouped.push(ch);
    }

    let sign = if negative { "-" } else { "" };
    if matches!(currency, "IDR" | "JPY") {
        format!("{currency} {sign}{grouped}")
    } else {
        format!("{currency} {sign}{grouped}{decimal}{fraction:02}")
    }
}

/// Strip everything but digits from a configured phone number.
pub fn normalize_phone(raw: &str) -> Result<String, DomainError> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() < 8 {
        return Err(DomainError::validation(
            "whatsapp phone number must contain at least 8 digits",
        ));
    }
    Ok(digits)
}

/// Return the first banned word that appears as a whole word in `text`.
pub fn find_banned_word<'a, I>(text: &str, banned: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let lowered = text.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|ch: char| !ch.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect();

    banned.into_iter().find_map(|candidate| {
        let candidate = candidate.trim().to_lowercase();
        let phrase: Vec<&str> = candidate
            .split(|ch: char| !ch.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .collect();
        if phrase.is_empty() {
            return None;
        }
        words
            .windows(phrase.len())
            .any(|window| window == phrase.as_slice())
            .then(|| candidate.clone())
    })
}

#[derive(Debug, Clone)]
pub struct OrderMessage<'a> {
    pub greeting: &'a str,
    pub product: &'a ProductRecord,
    pub quantity: u32,
    pub product_url: Option<String>,
    pub note: Option<&'a str>,
}

impl OrderMessage<'_> {
    pub fn render(&self) -> String {
        let mut lines = Vec::with_capacity(6);
        lines.push(self.greeting.trim().to_string());
        lines.push(format!("{} x{}", self.product.name, self.quantity));
        lines.push(format!(
            "Price: {}",
            format_price(self.product.price_cents, &self.product.currency)
        ));
        if self.quantity > 1 {
            let total = self
                .product
                .price_cents
                .saturating_mul(i64::from(self.quantity));
            lines.push(format!(
                "Total: {}",
                format_price(total, &self.product.currency)
            ));
        }
        if let Some(url) = self.product_url.as_ref() {
            lines.push(url.clone());
        }
        if let Some(note) = self.note.map(str::trim).filter(|note| !note.is_empty()) {
            lines.push(format!("Note: {note}"));
        }
        lines.join("\n")
    }
}

/// Build the `wa.me` link carrying `message` as prefilled text.
pub fn whatsapp_link(phone_digits: &str, message: &str) -> String {
    let encoded: String = byte_serialize(message.as_bytes()).collect();
    // wa.me expects %20 rather than `+` for spaces.
    let encoded = encoded.replace('+', "%20");
    format!("{WHATSAPP_BASE}{phone_digits}?text={encoded}")
}
