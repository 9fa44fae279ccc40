pub mod birthday_models;
pub mod birthday_service;

pub use birthday_models::{Birthday, BirthdayError, BirthdayListEntry, BirthdayUpdate};
pub use birthday_service::{month_name, ordinal, BirthdayService, BirthdayStore};
