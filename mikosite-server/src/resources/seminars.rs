use chrono::{NaiveDate, NaiveDateTime};
use mikosite_core::{
    display::DisplaySeminar, reminders, Id, Reminder, ReminderKind, Seminar, SeminarGroup,
};
use serde::Deserialize;
use serde_json::Value;

use super::{
    check_all_exist, check_difficulty, check_exists, check_length, Filter, Resource, Unfiltered,
    View,
};
use crate::{
    auth::Policy,
    cache,
    error::AppError,
    store::{Table, Tables},
};

impl Resource for SeminarGroup {
    const PATH: &'static str = "/api/seminar-groups";
    const LIST: Policy = Policy::Public;
    const RETRIEVE: Policy = Policy::Public;
    const INVALIDATES: &'static [&'static str] = &[cache::UPCOMING_SEMINARS, cache::SEMINAR_GROUPS];

    type Filter = Unfiltered;

    fn table(tables: &Tables) -> &Table<Self> {
        &tables.seminar_groups
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.seminar_groups
    }

    fn id(&self) -> Id {
        self.id
    }

    fn set_id(&mut self, id: Id) {
        self.id = id;
    }

    fn validate(&self, _tables: &Tables) -> Result<(), AppError> {
        check_length("name", &self.name, 1, 256)?;
        check_difficulty("default_difficulty", self.default_difficulty)
    }

    fn cascade(id: Id, tables: &mut Tables) {
        let orphaned = tables
            .seminars
            .iter()
            .filter(|seminar| seminar.group == Some(id))
            .map(|seminar| seminar.id)
            .collect::<Vec<_>>();

        for seminar in orphaned {
            tables.seminars.remove(seminar);
            Seminar::cascade(seminar, tables);
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SeminarFilter {
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    group: Option<Id>,
    date: Option<NaiveDate>,
}

impl SeminarFilter {
    fn matches(&self, seminar: &Seminar) -> bool {
        let on_or_after = |bound: Option<NaiveDate>, date: Option<NaiveDate>| match bound {
            Some(bound) => date.is_some_and(|date| date >= bound),
            None => true,
        };
        let on_or_before = |bound: Option<NaiveDate>, date: Option<NaiveDate>| match bound {
            Some(bound) => date.is_some_and(|date| date <= bound),
            None => true,
        };

        on_or_after(self.start_date, seminar.date)
            && on_or_before(self.end_date, seminar.date)
            && self.group.map_or(true, |group| seminar.group == Some(group))
            && self.date.map_or(true, |date| seminar.date == Some(date))
    }
}

impl Filter<Seminar> for SeminarFilter {
    fn apply(&self, mut records: Vec<Seminar>, _now: NaiveDateTime) -> Vec<Seminar> {
        records.retain(|seminar| self.matches(seminar));
        records
    }
}

impl Resource for Seminar {
    const PATH: &'static str = "/api/seminars";
    const LIST: Policy = Policy::Public;
    const RETRIEVE: Policy = Policy::Public;
    const INVALIDATES: &'static [&'static str] = &[cache::UPCOMING_SEMINARS];

    type Filter = SeminarFilter;

    fn table(tables: &Tables) -> &Table<Self> {
        &tables.seminars
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.seminars
    }

    fn id(&self) -> Id {
        self.id
    }

    fn set_id(&mut self, id: Id) {
        self.id = id;
    }

    fn validate(&self, tables: &Tables) -> Result<(), AppError> {
        if let Some(theme) = &self.theme {
            check_length("theme", theme, 0, 256)?;
        }
        check_difficulty("difficulty", self.difficulty)?;
        if let Some(group) = self.group {
            check_exists("group", &tables.seminar_groups, group)?;
        }
        check_all_exist("tutors", &tables.users, &self.tutors)
    }

    /// Moves this seminar's reminders along with its schedule, creating
    /// the ones that did not exist yet.
    fn after_save(&self, tables: &mut Tables) {
        for kind in [ReminderKind::Invite, ReminderKind::Feedback] {
            let Some(due) = reminders::due_at(kind, self) else {
                continue;
            };

            let mut found = false;
            for reminder in tables.reminders.iter_mut() {
                if reminder.seminar == self.id && reminder.kind == kind {
                    reminder.date_time = due;
                    found = true;
                }
            }

            if !found {
                let reminder = Reminder {
                    id: 0,
                    seminar: self.id,
                    kind,
                    date_time: due,
                };
                tables
                    .reminders
                    .insert_with(reminder, |reminder, id| reminder.id = id);
            }
        }
    }

    fn cascade(id: Id, tables: &mut Tables) {
        tables.reminders.retain(|reminder| reminder.seminar != id);
    }

    fn present(&self, tables: &Tables, view: View) -> Result<Value, AppError> {
        if !view.display {
            return Ok(serde_json::to_value(self)?);
        }

        let group = self.group.and_then(|group| tables.seminar_groups.get(group));
        let tutors = tables.users.pick(&self.tutors);
        Ok(serde_json::to_value(DisplaySeminar::new(self, group, &tutors))?)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ReminderFilter {
    only_next: Option<String>,
}

impl Filter<Reminder> for ReminderFilter {
    fn apply(&self, records: Vec<Reminder>, now: NaiveDateTime) -> Vec<Reminder> {
        if self.only_next.as_deref().map_or(true, str::is_empty) {
            return records;
        }

        reminders::next_batch(&records, now)
            .into_iter()
            .cloned()
            .collect()
    }
}

impl Resource for Reminder {
    const PATH: &'static str = "/api/reminders";
    const LIST: Policy = Policy::Admin;
    const RETRIEVE: Policy = Policy::Admin;

    type Filter = ReminderFilter;

    fn table(tables: &Tables) -> &Table<Self> {
        &tables.reminders
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.reminders
    }

    fn id(&self) -> Id {
        self.id
    }

    fn set_id(&mut self, id: Id) {
        self.id = id;
    }

    fn validate(&self, tables: &Tables) -> Result<(), AppError> {
        check_exists("seminar", &tables.seminars, self.seminar)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveTime, TimeDelta};

    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
    }

    fn seminar(id: Id, group: Option<Id>, day: Option<u32>) -> Seminar {
        Seminar {
            id,
            group,
            date: day.map(date),
            time: day.map(|_| NaiveTime::from_hms_opt(18, 0, 0).unwrap()),
            duration: Some(TimeDelta::try_hours(2).unwrap()),
            ..Seminar::default()
        }
    }

    fn tables() -> Tables {
        let mut tables = Tables::default();
        tables.seminar_groups.put(
            1,
            SeminarGroup {
                id: 1,
                name: "Kółko olimpijskie".into(),
                ..SeminarGroup::default()
            },
        );
        for seminar in [seminar(1, Some(1), Some(3)), seminar(2, None, Some(10)), seminar(3, Some(1), None)] {
            seminar.after_save(&mut tables);
            tables.seminars.put(seminar.id, seminar);
        }
        tables
    }

    #[test]
    fn saving_creates_both_reminders() {
        let tables = tables();
        let kinds = tables
            .reminders
            .iter()
            .filter(|reminder| reminder.seminar == 1)
            .map(|reminder| (reminder.kind, reminder.date_time))
            .collect::<Vec<_>>();

        assert_eq!(
            kinds,
            [
                (ReminderKind::Invite, date(3).and_hms_opt(17, 0, 0).unwrap()),
                (ReminderKind::Feedback, date(3).and_hms_opt(20, 0, 0).unwrap()),
            ]
        );
        // an unscheduled seminar gets none
        assert!(tables.reminders.iter().all(|reminder| reminder.seminar != 3));
    }

    #[test]
    fn rescheduling_moves_existing_reminders() {
        let mut tables = tables();
        let before = tables.reminders.len();

        let mut moved = seminar(1, Some(1), Some(4));
        moved.duration = None;
        moved.after_save(&mut tables);

        assert_eq!(tables.reminders.len(), before);
        let invite = tables
            .reminders
            .iter()
            .find(|reminder| reminder.seminar == 1 && reminder.kind == ReminderKind::Invite)
            .unwrap();
        assert_eq!(invite.date_time, date(4).and_hms_opt(17, 0, 0).unwrap());

        // without a duration the feedback time is unknown and stays put
        let feedback = tables
            .reminders
            .iter()
            .find(|reminder| reminder.seminar == 1 && reminder.kind == ReminderKind::Feedback)
            .unwrap();
        assert_eq!(feedback.date_time, date(3).and_hms_opt(20, 0, 0).unwrap());
    }

    #[test]
    fn deleting_a_group_takes_its_seminars_and_reminders() {
        let mut tables = tables();
        tables.seminar_groups.remove(1);
        SeminarGroup::cascade(1, &mut tables);

        assert_eq!(tables.seminars.iter().map(|seminar| seminar.id).collect::<Vec<_>>(), [2]);
        assert!(tables.reminders.iter().all(|reminder| reminder.seminar == 2));
    }

    #[test]
    fn date_filters_skip_unscheduled_seminars() {
        let all = tables().seminars.iter().cloned().collect::<Vec<_>>();
        let now = date(1).and_hms_opt(0, 0, 0).unwrap();

        let filter = SeminarFilter {
            start_date: Some(date(5)),
            ..SeminarFilter::default()
        };
        let ids = |records: Vec<Seminar>| records.iter().map(|seminar| seminar.id).collect::<Vec<_>>();
        assert_eq!(ids(filter.apply(all.clone(), now)), [2]);

        let filter = SeminarFilter {
            group: Some(1),
            ..SeminarFilter::default()
        };
        assert_eq!(ids(filter.apply(all.clone(), now)), [1, 3]);

        let filter = SeminarFilter {
            date: Some(date(3)),
            end_date: Some(date(3)),
            ..SeminarFilter::default()
        };
        assert_eq!(ids(filter.apply(all, now)), [1]);
    }

    #[test]
    fn only_next_keeps_the_earliest_pending_batch() {
        let tables = tables();
        let all = tables.reminders.iter().cloned().collect::<Vec<_>>();
        let now = date(3).and_hms_opt(17, 30, 0).unwrap();

        let filter = ReminderFilter {
            only_next: Some("1".into()),
        };
        let next = filter.apply(all.clone(), now);
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].kind, ReminderKind::Feedback);
        assert_eq!(next[0].seminar, 1);

        let filter = ReminderFilter { only_next: None };
        assert_eq!(filter.apply(all.clone(), now).len(), all.len());
    }

    #[test]
    fn rejects_unknown_references() {
        let tables = tables();
        let mut orphan = seminar(9, Some(42), Some(3));
        assert!(matches!(
            orphan.validate(&tables),
            Err(AppError::Validation { field: "group", .. })
        ));

        orphan.group = None;
        orphan.tutors = vec![5];
        assert!(matches!(
            orphan.validate(&tables),
            Err(AppError::Validation { field: "tutors", .. })
        ));
    }
}
