// Discord commands module.
// Each feature gets its own command file.

pub mod birthday;

pub mod config;

pub mod pin;

pub mod tree;

pub mod welcome;

use crate::discord::{Context, Data, Error};

/// Every command the bot registers, in the order users see them.
pub fn all() -> Vec<poise::Command<Data, Error>> {
    vec![
        welcome::welcome(),
        config::config(),
        birthday::birthday(),
        tree::tree(),
        pin::pin_message(),
    ]
}

/// Discord user ID typed as text. Text options also reach users who have
/// left the guild or deleted their account.
pub fn user_id_from(raw: &str) -> Option<u64> {
    match raw.trim().parse::<u64>() {
        Ok(id) if id > 0 => Some(id),
        _ => None,
    }
}

/// Like [`user_id_from`], but tells the invoker when the ID is invalid.
pub async fn parse_user_id(ctx: Context<'_>, raw: &str) -> Result<Option<u64>, Error> {
    let id = user_id_from(raw);
    if id.is_none() {
        ctx.say("Please provide a valid Discord user ID.").await?;
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_from_text() {
        assert_eq!(user_id_from("1234567890"), Some(1234567890));
        assert_eq!(user_id_from("  42 "), Some(42));
        assert_eq!(user_id_from("0"), None);
        assert_eq!(user_id_from("<@42>"), None);
        assert_eq!(user_id_from(""), None);
    }
}
