//! Wire format for seminar durations: `HH:MM:SS`, prefixed with `D ` when a
//! duration spans whole days.

use chrono::TimeDelta;

pub fn format(duration: &TimeDelta) -> String {
    let total = duration.num_seconds();
    let sign = if total < 0 { "-" } else { "" };
    let total = total.unsigned_abs();

    let days = total / 86_400;
    let hours = total % 86_400 / 3600;
    let minutes = total % 3600 / 60;
    let seconds = total % 60;

    if days > 0 {
        format!("{sign}{days} {hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{sign}{hours:02}:{minutes:02}:{seconds:02}")
    }
}

/// Accepts `[D ]HH:MM:SS`, `MM:SS` and a bare number of seconds.
pub fn parse(s: &str) -> Option<TimeDelta> {
    let s = s.trim();
    let (days, clock) = match s.split_once(' ') {
        Some((days, clock)) => (days.parse::<i64>().ok()?, clock.trim()),
        None => (0, s),
    };

    let mut parts = clock
        .split(':')
        .map(|part| part.parse::<u32>().ok())
        .collect::<Option<Vec<_>>>()?;
    let bounded = parts.len() > 1;

    while parts.len() < 3 {
        parts.insert(0, 0);
    }

    let [hours, minutes, seconds] = parts[..] else {
        return None;
    };

    if bounded && (minutes >= 60 || seconds >= 60) {
        return None;
    }

    let seconds = i64::from(hours) * 3600 + i64::from(minutes) * 60 + i64::from(seconds);
    TimeDelta::try_days(days)?.checked_add(&TimeDelta::try_seconds(seconds)?)
}

#[cfg(feature = "serde")]
pub mod option {
    use chrono::TimeDelta;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        duration: &Option<TimeDelta>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match duration {
            Some(duration) => serializer.serialize_str(&super::format(duration)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<TimeDelta>, D::Error> {
        let Some(raw) = Option::<String>::deserialize(deserializer)? else {
            return Ok(None);
        };

        super::parse(&raw)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid duration `{raw}`")))
    }
}
