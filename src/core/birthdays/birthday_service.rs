// Birthday tracking: CRUD for an author's entries, the ordered list view and
// the daily lookup used by the reminder task.
//
// Dates are (month, day) pairs with no year. Ordering is calendar order
// within a year, and "next" wraps around to January.

use super::birthday_models::{Birthday, BirthdayError, BirthdayListEntry, BirthdayUpdate};
use async_trait::async_trait;
use chrono::NaiveDate;

// A leap year, so February 29th is accepted.
const REFERENCE_YEAR: i32 = 2000;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

#[async_trait]
pub trait BirthdayStore: Send + Sync {
    async fn get(&self, author_id: u64, user_id: u64) -> Result<Option<Birthday>, BirthdayError>;
    async fn insert(&self, birthday: Birthday) -> Result<(), BirthdayError>;
    async fn update(
        &self,
        author_id: u64,
        user_id: u64,
        update: BirthdayUpdate,
    ) -> Result<(), BirthdayError>;
    async fn delete(&self, author_id: u64, user_id: u64) -> Result<(), BirthdayError>;
    async fn list_by_author(&self, author_id: u64) -> Result<Vec<Birthday>, BirthdayError>;
    async fn list_on_date(&self, month: u32, day: u32) -> Result<Vec<Birthday>, BirthdayError>;
}

pub struct BirthdayService<S: BirthdayStore> {
    store: S,
}

impl<S: BirthdayStore> BirthdayService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn add(
        &self,
        author_id: u64,
        user_id: u64,
        name: &str,
        month: u32,
        day: u32,
    ) -> Result<(), BirthdayError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(BirthdayError::EmptyName);
        }
        validate_date(month, day)?;

        if self.store.get(author_id, user_id).await?.is_some() {
            return Err(BirthdayError::AlreadyExists);
        }

        self.store
            .insert(Birthday {
                author_id,
                user_id,
                name: name.to_string(),
                birth_month: month,
                birth_day: day,
            })
            .await
    }

    pub async fn update(
        &self,
        author_id: u64,
        user_id: u64,
        update: BirthdayUpdate,
    ) -> Result<(), BirthdayError> {
        let Some(existing) = self.store.get(author_id, user_id).await? else {
            return Err(BirthdayError::NotFound);
        };

        let name = match update.name {
            Some(name) if name.trim().is_empty() => return Err(BirthdayError::EmptyName),
            Some(name) => Some(name.trim().to_string()),
            None => None,
        };

        // Only the merged date matters: moving the 31st into April is caught here.
        validate_date(
            update.birth_month.unwrap_or(existing.birth_month),
            update.birth_day.unwrap_or(existing.birth_day),
        )?;

        self.store
            .update(
                author_id,
                user_id,
                BirthdayUpdate {
                    name,
                    birth_month: update.birth_month,
                    birth_day: update.birth_day,
                },
            )
            .await
    }

    pub async fn remove(&self, author_id: u64, user_id: u64) -> Result<(), BirthdayError> {
        if self.store.get(author_id, user_id).await?.is_none() {
            return Err(BirthdayError::NotFound);
        }

        self.store.delete(author_id, user_id).await
    }

    /// The author's birthdays in calendar order, relative to `today`.
    pub async fn list(
        &self,
        author_id: u64,
        today: NaiveDate,
    ) -> Result<Vec<BirthdayListEntry>, BirthdayError> {
        use chrono::Datelike;

        let birthdays = self.store.list_by_author(author_id).await?;
        Ok(plan_birthday_list(birthdays, today.month(), today.day()))
    }

    /// Every stored birthday on `today`, across all authors.
    pub async fn due_on(&self, today: NaiveDate) -> Result<Vec<Birthday>, BirthdayError> {
        use chrono::Datelike;

        self.store.list_on_date(today.month(), today.day()).await
    }
}

pub fn validate_date(month: u32, day: u32) -> Result<(), BirthdayError> {
    NaiveDate::from_ymd_opt(REFERENCE_YEAR, month, day)
        .map(|_| ())
        .ok_or(BirthdayError::InvalidDate { month, day })
}

/// True if (m1, d1) comes strictly before (m2, d2) within a year.
pub fn compare_dates(m1: u32, d1: u32, m2: u32, d2: u32) -> bool {
    m1 < m2 || (m1 == m2 && d1 < d2)
}

pub fn same_date(m1: u32, d1: u32, m2: u32, d2: u32) -> bool {
    m1 == m2 && d1 == d2
}

/// Sort birthdays by date and mark today's entries and the next one coming up.
///
/// The next birthday is the first entry strictly after today. If every entry
/// is already behind us this year, it wraps to the first entry. An entry that
/// falls on today is flagged as today, not as next.
pub fn plan_birthday_list(
    mut birthdays: Vec<Birthday>,
    today_month: u32,
    today_day: u32,
) -> Vec<BirthdayListEntry> {
    birthdays.sort_by_key(|b| (b.birth_month, b.birth_day));

    let last_is_earlier = birthdays
        .last()
        .map(|b| compare_dates(b.birth_month, b.birth_day, today_month, today_day))
        .unwrap_or(false);

    let mut marked_next = false;

    birthdays
        .into_iter()
        .enumerate()
        .map(|(i, birthday)| {
            let is_today = same_date(today_month, today_day, birthday.birth_month, birthday.birth_day);
            let is_later =
                compare_dates(today_month, today_day, birthday.birth_month, birthday.birth_day);

            let is_next = !marked_next && ((last_is_earlier && i == 0) || is_later);
            marked_next |= is_next;

            BirthdayListEntry {
                birthday,
                is_today,
                is_next,
            }
        })
        .collect()
}

/// "1st", "2nd", "3rd", "4th", ..., "11th", "12th", "13th", "21st", ...
pub fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

pub fn month_name(month: u32) -> &'static str {
    month
        .checked_sub(1)
        .and_then(|i| MONTH_NAMES.get(i as usize))
        .copied()
        .unwrap_or("Unknown")
}
