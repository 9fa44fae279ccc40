use thiserror::Error;

/// A birthday someone asked to be reminded about.
///
/// Entries belong to the author who added them: two people can track the
/// same user without seeing each other's entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Birthday {
    pub author_id: u64,
    pub user_id: u64,
    pub name: String,
    pub birth_month: u32,
    pub birth_day: u32,
}

#[derive(Debug, Clone, Default)]
pub struct BirthdayUpdate {
    pub name: Option<String>,
    pub birth_month: Option<u32>,
    pub birth_day: Option<u32>,
}

/// One line of an author's birthday list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BirthdayListEntry {
    pub birthday: Birthday,
    pub is_today: bool,
    /// Set on exactly one entry, the next birthday coming up, if any.
    pub is_next: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BirthdayError {
    #[error("You've already added a birthday for this user.")]
    AlreadyExists,
    #[error("Birthday entry does not exist.")]
    NotFound,
    #[error("{month}/{day} is not a valid date.")]
    InvalidDate { month: u32, day: u32 },
    #[error("Names must not be empty.")]
    EmptyName,
    #[error("Storage error: {0}")]
    Storage(String),
}
