// Daily birthday check. Every author gets a DM for each of their entries
// whose birthday falls on the current day.

use crate::core::birthdays::{Birthday, BirthdayService};
use crate::infra::birthdays::SqliteBirthdayStore;
use chrono::{DateTime, Days, TimeZone};
use chrono_tz::Tz;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use std::time::Duration;

/// Pause between two DMs so a busy day doesn't trip rate limits.
const DM_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy)]
pub struct ReminderSchedule {
    /// Hour of the day (0-23) the check runs at.
    pub hour: u32,
    pub timezone: Tz,
}

impl Default for ReminderSchedule {
    fn default() -> Self {
        Self {
            hour: 0,
            timezone: chrono_tz::UTC,
        }
    }
}

/// Start the background loop. Runs until the process exits.
pub fn spawn(
    http: Arc<serenity::Http>,
    birthdays: Arc<BirthdayService<SqliteBirthdayStore>>,
    schedule: ReminderSchedule,
) {
    tokio::spawn(async move {
        loop {
            let now = chrono::Utc::now().with_timezone(&schedule.timezone);
            let next = next_run_after(now, schedule.hour);
            let wait = (next - now).to_std().unwrap_or_default();

            tracing::info!(next_run = %next, "Next birthday check scheduled");
            tokio::time::sleep(wait).await;

            let today = chrono::Utc::now()
                .with_timezone(&schedule.timezone)
                .date_naive();
            match birthdays.due_on(today).await {
                Ok(due) => {
                    tracing::info!(count = due.len(), %today, "Running birthday check");
                    send_reminders(&http, &due).await;
                }
                Err(e) => tracing::error!("Failed to query birthdays: {}", e),
            }
        }
    });
}

async fn send_reminders(http: &serenity::Http, due: &[Birthday]) {
    for birthday in due {
        let author = serenity::UserId::new(birthday.author_id);

        match author.create_dm_channel(http).await {
            Ok(channel) => {
                if let Err(e) = channel.say(http, reminder_text(birthday)).await {
                    tracing::warn!(author_id = birthday.author_id, "Failed to send birthday reminder: {}", e);
                }
            }
            Err(e) => {
                tracing::warn!(author_id = birthday.author_id, "Could not open DMs: {}", e);
            }
        }

        tokio::time::sleep(DM_INTERVAL).await;
    }
}

pub fn reminder_text(birthday: &Birthday) -> String {
    format!(
        "Friendly Reminder: Today, {} (<@{}>, {}) was born!\n\nIt's their birthday 🎉🥳",
        birthday.name, birthday.user_id, birthday.user_id
    )
}

/// The first moment strictly after `now` whose local time is `hour:00`.
///
/// On days where that hour doesn't exist locally (spring-forward gaps) the
/// check runs an hour later instead.
pub fn next_run_after<Z: TimeZone>(now: DateTime<Z>, hour: u32) -> DateTime<Z> {
    let tz = now.timezone();
    let hour = hour.min(23);

    let mut day = now.date_naive();
    loop {
        let candidate = day
            .and_hms_opt(hour, 0, 0)
            .and_then(|at| tz.from_local_datetime(&at).earliest())
            .or_else(|| {
                day.and_hms_opt((hour + 1).min(23), 0, 0)
                    .and_then(|at| tz.from_local_datetime(&at).earliest())
            });

        if let Some(candidate) = candidate {
            if candidate > now {
                return candidate;
            }
        }

        day = match day.checked_add_days(Days::new(1)) {
            Some(next) => next,
            None => return now,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_reminder_text() {
        let birthday = Birthday {
            author_id: 1,
            user_id: 42,
            name: "Ann".to_string(),
            birth_month: 5,
            birth_day: 17,
        };

        assert_eq!(
            reminder_text(&birthday),
            "Friendly Reminder: Today, Ann (<@42>, 42) was born!\n\nIt's their birthday 🎉🥳"
        );
    }

    #[test]
    fn test_next_run_later_today() {
        let now = chrono::Utc.with_ymd_and_hms(2024, 3, 1, 6, 30, 0).unwrap();
        let next = next_run_after(now, 9);
        assert_eq!(next, chrono::Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_next_run_rolls_to_tomorrow() {
        let now = chrono::Utc.with_ymd_and_hms(2024, 12, 31, 9, 0, 0).unwrap();
        let next = next_run_after(now, 9);
        assert_eq!(next, chrono::Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_next_run_in_local_timezone() {
        let tz: Tz = "Europe/Zagreb".parse().unwrap();
        let now = tz.with_ymd_and_hms(2024, 7, 10, 23, 15, 0).unwrap();

        let next = next_run_after(now, 0);
        assert_eq!(next, tz.with_ymd_and_hms(2024, 7, 11, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_next_run_skips_missing_hour() {
        // Clocks jump from 02:00 to 03:00 on this day.
        let tz: Tz = "Europe/Zagreb".parse().unwrap();
        let now = tz.with_ymd_and_hms(2024, 3, 31, 0, 30, 0).unwrap();

        let next = next_run_after(now, 2);
        assert_eq!(next.hour(), 3);
        assert_eq!(next.date_naive(), now.date_naive());
    }
}
