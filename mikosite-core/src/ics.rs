use chrono::NaiveDateTime;
use ics::{
    parameters::TzIDParam,
    properties::{Description, DtEnd, DtStart, Organizer, RRule, Summary, TzName},
    Daylight, Standard, TimeZone,
};

use crate::{Planned, User};

const TZID: &str = "Europe/Warsaw";
const LOCAL_FORMAT: &str = "%Y%m%dT%H%M%S";
const UTC_FORMAT: &str = "%Y%m%dT%H%M%SZ";

fn warsaw() -> TimeZone<'static> {
    let mut cet_standard = Standard::new("19701025T030000", "+0200", "+0100");
    cet_standard.push(TzName::new("CET"));
    cet_standard.push(RRule::new("FREQ=YEARLY;BYMONTH=10;BYDAY=-1SU"));

    let mut cest_daylight = Daylight::new("19700329T020000", "+0100", "+0200");
    cest_daylight.push(TzName::new("CEST"));
    cest_daylight.push(RRule::new("FREQ=YEARLY;BYMONTH=3;BYDAY=-1SU"));

    let mut timezone = TimeZone::daylight(TZID, cest_daylight);
    timezone.add_standard(cet_standard);
    timezone
}

/// Builds the seminar calendar feed.
///
/// Seminar times are wall-clock Warsaw times. `stamp` is the generation time
/// in UTC. `tutors` resolves a seminar's tutor ids to users; unknown ids are
/// skipped.
#[must_use]
pub fn seminar_calendar<'a, F>(
    name: &'a str,
    seminars: &[Planned<'_>],
    stamp: NaiveDateTime,
    tutors: F,
) -> ics::ICalendar<'a>
where
    F: Fn(u64) -> Option<&'a User>,
{
    let mut icalendar = ics::ICalendar::new("2.0", name);
    icalendar.add_timezone(warsaw());

    for planned in seminars {
        let names = planned
            .seminar
            .tutors
            .iter()
            .filter_map(|&id| tutors(id))
            .map(User::full_name)
            .collect::<Vec<_>>();

        icalendar.add_event(planned.to_ics(name, &names, stamp));
    }

    icalendar
}

impl Planned<'_> {
    #[must_use]
    pub fn to_ics(&self, calendar: &str, tutors: &[String], stamp: NaiveDateTime) -> ics::Event<'static> {
        let seminar = self.seminar;

        let mut ics_event = ics::Event::new(
            format!("seminar-{}@{calendar}", seminar.id),
            stamp.format(UTC_FORMAT).to_string(),
        );

        let mut start = DtStart::new(self.date.and_time(self.time).format(LOCAL_FORMAT).to_string());
        start.add(TzIDParam::new(TZID));
        ics_event.push(start);

        if let Some(end) = seminar.end() {
            let mut end = DtEnd::new(end.format(LOCAL_FORMAT).to_string());
            end.add(TzIDParam::new(TZID));
            ics_event.push(end);
        }

        let title = seminar.theme.clone().unwrap_or_else(|| "Seminar".to_string());
        ics_event.push(Summary::new(title));

        if let Some(description) = &seminar.description {
            ics_event.push(Description::new(description.clone()));
        }

        if !tutors.is_empty() {
            ics_event.push(Organizer::new(tutors.join(", ")));
        }

        ics_event
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime, TimeDelta};

    use crate::Seminar;

    use super::*;

    #[test]
    fn feed_contains_one_event_per_seminar() {
        let tutor = User {
            id: 2,
            name: "Anna".into(),
            surname: "Nowak".into(),
            ..User::default()
        };
        let seminars = [
            Seminar {
                id: 1,
                date: NaiveDate::from_ymd_opt(2024, 10, 3),
                time: NaiveTime::from_hms_opt(17, 0, 0),
                duration: Some(TimeDelta::hours(2)),
                theme: Some("Geometria".into()),
                tutors: vec![2, 99],
                ..Seminar::default()
            },
            Seminar {
                id: 2,
                date: NaiveDate::from_ymd_opt(2024, 10, 4),
                time: NaiveTime::from_hms_opt(9, 30, 0),
                ..Seminar::default()
            },
        ];
        let planned = seminars.iter().filter_map(Seminar::planned).collect::<Vec<_>>();

        let stamp = NaiveDate::from_ymd_opt(2024, 9, 30)
            .unwrap()
            .and_hms_opt(8, 15, 0)
            .unwrap();

        let feed = seminar_calendar("mikosite", &planned, stamp, |id| (id == 2).then_some(&tutor)).to_string();

        assert_eq!(feed.matches("BEGIN:VEVENT").count(), 2);
        assert!(feed.contains("TZID:Europe/Warsaw"));
        assert!(feed.contains("UID:seminar-1@mikosite"));
        assert_eq!(feed.matches("DTSTAMP:20240930T081500Z").count(), 2);
        assert!(feed.contains("DTSTART;TZID=Europe/Warsaw:20241003T170000"));
        assert!(feed.contains("DTEND;TZID=Europe/Warsaw:20241003T190000"));
        assert!(feed.contains("DTSTART;TZID=Europe/Warsaw:20241004T093000"));
        assert!(feed.contains("SUMMARY:Geometria"));
        assert!(feed.contains("ORGANIZER:Anna Nowak"));
        assert!(feed.contains("SUMMARY:Seminar"));
    }
}
