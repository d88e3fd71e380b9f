use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::upcoming::Scheduled;

pub type Id = u64;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SeminarGroup {
    #[cfg_attr(feature = "serde", serde(default))]
    pub id: Id,
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub lead: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub description: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub default_difficulty: Option<u8>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub discord_role_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Seminar {
    #[cfg_attr(feature = "serde", serde(default))]
    pub id: Id,
    #[cfg_attr(feature = "serde", serde(default))]
    pub date: Option<NaiveDate>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub time: Option<NaiveTime>,
    #[cfg_attr(feature = "serde", serde(default, with = "crate::duration::option"))]
    pub duration: Option<TimeDelta>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub discord_channel_id: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub started: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub finished: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub group: Option<Id>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub difficulty: Option<u8>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub featured: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub special_guest: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub tutors: Vec<Id>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub theme: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub description: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub image: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub file: Option<String>,
}

/// A seminar whose date and time are both known.
///
/// Only planned seminars take part in scheduling: the upcoming selector,
/// reminders and the calendar feed never see a seminar without a start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Planned<'a> {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub seminar: &'a Seminar,
}

impl Seminar {
    pub fn planned(&self) -> Option<Planned<'_>> {
        Some(Planned {
            date: self.date?,
            time: self.time?,
            seminar: self,
        })
    }

    pub fn start(&self) -> Option<NaiveDateTime> {
        Some(self.date?.and_time(self.time?))
    }

    pub fn end(&self) -> Option<NaiveDateTime> {
        self.start()?.checked_add_signed(self.duration?)
    }
}

impl Scheduled for Planned<'_> {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn time(&self) -> NaiveTime {
        self.time
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ReminderKind {
    Invite,
    Feedback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Reminder {
    #[cfg_attr(feature = "serde", serde(default))]
    pub id: Id,
    pub seminar: Id,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: ReminderKind,
    pub date_time: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Post {
    #[cfg_attr(feature = "serde", serde(default))]
    pub id: Id,
    pub title: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub subtitle: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub authors: Vec<Id>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub content: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub file: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub images: Vec<Id>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PostImage {
    #[cfg_attr(feature = "serde", serde(default))]
    pub id: Id,
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct User {
    #[cfg_attr(feature = "serde", serde(default))]
    pub id: Id,
    pub username: String,
    pub email: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub surname: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub region: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub date_of_birth: Option<NaiveDate>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub problem_counter: i64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub profile_image: Option<String>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.surname)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LinkedAccount {
    #[cfg_attr(feature = "serde", serde(default))]
    pub id: Id,
    pub user: Id,
    pub external_id: String,
    pub platform: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub timestamp: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ActivityScore {
    #[cfg_attr(feature = "serde", serde(default))]
    pub id: Id,
    pub user: Id,
    pub change: i64,
    pub reason: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub timestamp: NaiveDateTime,
}
