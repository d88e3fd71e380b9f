use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Minimum number of events the homepage shows when enough are scheduled.
pub const UPCOMING_MIN_COUNT: usize = 3;

/// Anything with a calendar date and a time of day.
pub trait Scheduled {
    fn date(&self) -> NaiveDate;
    fn time(&self) -> NaiveTime;

    fn starts_at(&self) -> NaiveDateTime {
        self.date().and_time(self.time())
    }
}

impl<T: Scheduled + ?Sized> Scheduled for &T {
    fn date(&self) -> NaiveDate {
        (**self).date()
    }

    fn time(&self) -> NaiveTime {
        (**self).time()
    }
}

/// Picks the events to advertise as "upcoming" relative to `now`.
///
/// Every event on the nearest future date is returned. When that day holds
/// fewer than [`UPCOMING_MIN_COUNT`] events, the earliest later ones fill
/// the list up to that count. An event starting exactly at `now` is already
/// past. Events with equal start keep their input order.
pub fn select_upcoming<E, I>(events: I, now: NaiveDateTime) -> Vec<E>
where
    E: Scheduled,
    I: IntoIterator<Item = E>,
{
    let mut future = events
        .into_iter()
        .filter(|event| event.starts_at() > now)
        .collect::<Vec<_>>();

    future.sort_by_key(|event| (event.date(), event.time()));

    let Some(next_date) = future.first().map(|event| event.date()) else {
        return Vec::new();
    };

    let same_day = future
        .iter()
        .take_while(|event| event.date() == next_date)
        .count();

    future.truncate(same_day.max(UPCOMING_MIN_COUNT));
    future
}
