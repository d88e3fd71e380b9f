//! Domain model and scheduling rules of the mikosite backend.
//!
//! Everything here is synchronous and free of I/O; the server crate feeds it
//! records fetched from its repository together with the current time.

pub mod display;
pub mod duration;
pub mod leaderboard;
pub mod reminders;
mod structs;
pub mod upcoming;

#[cfg(feature = "ics")]
mod ics;

#[cfg(feature = "ics")]
pub use self::ics::seminar_calendar;
pub use structs::{
    ActivityScore, Id, LinkedAccount, Planned, Post, PostImage, Reminder, ReminderKind, Seminar,
    SeminarGroup, User,
};
pub use upcoming::{select_upcoming, Scheduled, UPCOMING_MIN_COUNT};
