use chrono::{NaiveDateTime, TimeDelta};

use crate::{Reminder, ReminderKind, Seminar};

/// Hours before a seminar starts that its invitation goes out.
pub const INVITE_LEAD_HOURS: i64 = 1;
/// Hours after a seminar ends that the feedback request goes out.
pub const FEEDBACK_DELAY_HOURS: i64 = 0;

/// When a reminder of `kind` is due for `seminar`, if it can be known yet.
pub fn due_at(kind: ReminderKind, seminar: &Seminar) -> Option<NaiveDateTime> {
    match kind {
        ReminderKind::Invite => seminar
            .start()?
            .checked_sub_signed(TimeDelta::try_hours(INVITE_LEAD_HOURS)?),
        ReminderKind::Feedback => seminar
            .end()?
            .checked_add_signed(TimeDelta::try_hours(FEEDBACK_DELAY_HOURS)?),
    }
}

/// Every reminder due at the earliest instant strictly after `now`.
pub fn next_batch<'a, I>(reminders: I, now: NaiveDateTime) -> Vec<&'a Reminder>
where
    I: IntoIterator<Item = &'a Reminder>,
{
    let pending = reminders
        .into_iter()
        .filter(|reminder| reminder.date_time > now)
        .collect::<Vec<_>>();

    let Some(earliest) = pending.iter().map(|reminder| reminder.date_time).min() else {
        return Vec::new();
    };

    pending
        .into_iter()
        .filter(|reminder| reminder.date_time == earliest)
        .collect()
}
