//! Method-name transforms for pubsub methods.
//!
//! `account_subscribe` → `accountSubscribe` → `accountUnsubscribe`, and
//! `account` → `accountNotification`.

use solrpc_core::error::TransportError;

const SUBSCRIBE: &str = "Subscribe";
const UNSUBSCRIBE: &str = "Unsubscribe";

/// Convert a snake_case name into the lowerCamelCase form used on the wire.
///
/// Empty segments (leading, trailing or doubled underscores) are skipped.
pub fn camel_case(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len());
    for (i, part) in snake.split('_').filter(|p| !p.is_empty()).enumerate() {
        if i == 0 {
            out.push_str(part);
            continue;
        }
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// Subscribe method for a kind, e.g. `"slots_updates"` → `"slotsUpdatesSubscribe"`.
pub fn subscribe_method(kind: &str) -> String {
    camel_case(&format!("{kind}_subscribe"))
}

/// Replace the `Subscribe` suffix with `Unsubscribe`.
pub fn unsubscribe_method(subscribe: &str) -> Result<String, TransportError> {
    match subscribe.strip_suffix(SUBSCRIBE) {
        Some(stem) if !stem.is_empty() && !stem.ends_with("Un") => {
            Ok(format!("{stem}{UNSUBSCRIBE}"))
        }
        _ => Err(TransportError::InvalidParams(format!(
            "'{subscribe}' is not a subscribe method"
        ))),
    }
}

/// Notification method pushed for a kind, e.g. `"account"` → `"accountNotification"`.
pub fn notification_method(kind: &str) -> String {
    camel_case(&format!("{kind}_notification"))
}
