use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::Uri,
    routing::get,
    Json, Router,
};
use chrono::NaiveDateTime;
use mikosite_core::{
    leaderboard::{self, Standing},
    ActivityScore, Id, LinkedAccount, User,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{check_exists, check_length, Filter, Resource, Unfiltered, View};
use crate::{
    auth::{Access, Policy},
    cache,
    error::AppError,
    pagination::{Page, PageQuery},
    state::AppState,
    store::{Table, Tables},
};

/// What anyone may see about a user.
#[derive(Serialize)]
struct PublicProfile<'a> {
    id: Id,
    username: &'a str,
    full_name: String,
    profile_image: Option<&'a str>,
}

#[derive(Serialize)]
struct Profile<'a> {
    id: Id,
    username: &'a str,
    email: &'a str,
    name: &'a str,
    surname: &'a str,
    region: &'a str,
    profile_image: Option<&'a str>,
    linked_accounts: Vec<&'a LinkedAccount>,
}

impl Resource for User {
    const PATH: &'static str = "/api/users";
    const LIST: Policy = Policy::Admin;
    const RETRIEVE: Policy = Policy::Public;
    const INVALIDATES: &'static [&'static str] = &[cache::UPCOMING_SEMINARS, cache::HOMEPAGE_POSTS];

    type Filter = Unfiltered;

    fn table(tables: &Tables) -> &Table<Self> {
        &tables.users
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.users
    }

    fn id(&self) -> Id {
        self.id
    }

    fn set_id(&mut self, id: Id) {
        self.id = id;
    }

    fn validate(&self, tables: &Tables) -> Result<(), AppError> {
        check_length("username", &self.username, 5, 30)?;
        check_length("email", &self.email, 1, 255)?;
        if !self.email.contains('@') {
            return Err(AppError::invalid("email", "Enter a valid email address."));
        }
        check_length("name", &self.name, 0, 50)?;
        check_length("surname", &self.surname, 0, 50)?;
        if !self.region.is_empty() {
            check_length("region", &self.region, 5, 30)?;
        }

        let id = self.id;
        let others = || tables.users.iter().filter(move |user| user.id != id);
        if others().any(|user| user.username == self.username) {
            return Err(AppError::invalid(
                "username",
                "A user with that username already exists.",
            ));
        }
        if others().any(|user| user.email == self.email) {
            return Err(AppError::invalid("email", "A user with that email already exists."));
        }
        Ok(())
    }

    fn cascade(id: Id, tables: &mut Tables) {
        tables.linked_accounts.retain(|account| account.user != id);
        tables.activity_scores.retain(|score| score.user != id);
        for seminar in tables.seminars.iter_mut() {
            seminar.tutors.retain(|&tutor| tutor != id);
        }
        for post in tables.posts.iter_mut() {
            post.authors.retain(|&author| author != id);
        }
    }

    fn present(&self, tables: &Tables, view: View) -> Result<Value, AppError> {
        let profile_image = self.profile_image.as_deref();

        let shown = if view.access.is_admin() {
            serde_json::to_value(Profile {
                id: self.id,
                username: &self.username,
                email: &self.email,
                name: &self.name,
                surname: &self.surname,
                region: &self.region,
                profile_image,
                linked_accounts: tables
                    .linked_accounts
                    .iter()
                    .filter(|account| account.user == self.id)
                    .collect(),
            })?
        } else {
            serde_json::to_value(PublicProfile {
                id: self.id,
                username: &self.username,
                full_name: self.full_name(),
                profile_image,
            })?
        };

        Ok(shown)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LinkedAccountFilter {
    user: Option<Id>,
    external_id: Option<String>,
    platform: Option<String>,
}

impl Filter<LinkedAccount> for LinkedAccountFilter {
    fn apply(&self, mut records: Vec<LinkedAccount>, _now: NaiveDateTime) -> Vec<LinkedAccount> {
        records.retain(|account| {
            self.user.map_or(true, |user| account.user == user)
                && self
                    .external_id
                    .as_ref()
                    .map_or(true, |external_id| &account.external_id == external_id)
                && self
                    .platform
                    .as_ref()
                    .map_or(true, |platform| &account.platform == platform)
        });
        records
    }
}

impl Resource for LinkedAccount {
    const PATH: &'static str = "/api/linked-accounts";
    const LIST: Policy = Policy::Admin;
    const RETRIEVE: Policy = Policy::Admin;

    type Filter = LinkedAccountFilter;

    fn table(tables: &Tables) -> &Table<Self> {
        &tables.linked_accounts
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.linked_accounts
    }

    fn id(&self) -> Id {
        self.id
    }

    fn set_id(&mut self, id: Id) {
        self.id = id;
    }

    /// The link time tracks the latest change.
    fn prepare(&mut self, _previous: Option<&Self>, now: NaiveDateTime) {
        self.timestamp = now;
    }

    fn validate(&self, tables: &Tables) -> Result<(), AppError> {
        check_exists("user", &tables.users, self.user)?;
        check_length("external_id", &self.external_id, 1, 128)?;
        check_length("platform", &self.platform, 1, 50)?;

        let id = self.id;
        let others = || tables.linked_accounts.iter().filter(move |account| account.id != id);
        if others()
            .any(|account| account.external_id == self.external_id && account.platform == self.platform)
        {
            return Err(AppError::invalid(
                "non_field_errors",
                "The fields external_id, platform must make a unique set.",
            ));
        }
        if others().any(|account| account.user == self.user && account.platform == self.platform) {
            return Err(AppError::invalid(
                "non_field_errors",
                "The fields user, platform must make a unique set.",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ActivityScoreFilter {
    user: Option<Id>,
    start_timestamp: Option<NaiveDateTime>,
    end_timestamp: Option<NaiveDateTime>,
}

impl Filter<ActivityScore> for ActivityScoreFilter {
    fn apply(&self, mut records: Vec<ActivityScore>, _now: NaiveDateTime) -> Vec<ActivityScore> {
        records.retain(|score| {
            self.user.map_or(true, |user| score.user == user)
                && self.start_timestamp.map_or(true, |start| score.timestamp >= start)
                && self.end_timestamp.map_or(true, |end| score.timestamp <= end)
        });
        records
    }
}

impl Resource for ActivityScore {
    const PATH: &'static str = "/api/activity-scores";
    const LIST: Policy = Policy::Admin;
    const RETRIEVE: Policy = Policy::Admin;

    type Filter = ActivityScoreFilter;

    fn table(tables: &Tables) -> &Table<Self> {
        &tables.activity_scores
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.activity_scores
    }

    fn id(&self) -> Id {
        self.id
    }

    fn set_id(&mut self, id: Id) {
        self.id = id;
    }

    /// Stamped once, when the score is first recorded.
    fn prepare(&mut self, previous: Option<&Self>, now: NaiveDateTime) {
        self.timestamp = previous.map_or(now, |previous| previous.timestamp);
    }

    fn validate(&self, tables: &Tables) -> Result<(), AppError> {
        check_exists("user", &tables.users, self.user)?;
        check_length("reason", &self.reason, 1, 255)
    }
}

/// Read-only score totals per user.
pub fn activity_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/user-activity", get(standings))
        .route("/api/user-activity/:id", get(standing))
}

async fn standings(
    State(state): State<Arc<AppState>>,
    access: Access,
    uri: Uri,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<Standing>>, AppError> {
    access.require(Policy::Admin)?;

    let tables = state.store.read().await;
    let board = leaderboard::leaderboard(tables.users.iter(), tables.activity_scores.iter());

    Ok(Json(page.paginate(board, &uri)))
}

async fn standing(
    State(state): State<Arc<AppState>>,
    access: Access,
    Path(id): Path<Id>,
) -> Result<Json<Standing>, AppError> {
    access.require(Policy::Admin)?;

    let tables = state.store.read().await;
    let user = tables.users.get(id).ok_or(AppError::NotFound)?;
    let total = leaderboard::total_score(id, tables.activity_scores.iter());

    Ok(Json(Standing::new(user, total)))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use mikosite_core::{Post, Seminar};

    use super::*;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn user(id: Id, username: &str) -> User {
        User {
            id,
            username: username.into(),
            email: format!("{username}@example.com"),
            name: "Jan".into(),
            surname: "Kowalski".into(),
            ..User::default()
        }
    }

    fn account(id: Id, user: Id, external_id: &str, platform: &str) -> LinkedAccount {
        LinkedAccount {
            id,
            user,
            external_id: external_id.into(),
            platform: platform.into(),
            timestamp: at(0),
        }
    }

    fn tables() -> Tables {
        let mut tables = Tables::default();
        tables.users.put(1, user(1, "kowalski"));
        tables.users.put(2, user(2, "nowakowa"));
        tables.linked_accounts.put(1, account(1, 1, "123", "discord"));
        tables
    }

    #[test]
    fn usernames_and_emails_are_unique() {
        let tables = tables();

        let taken = user(3, "kowalski");
        assert!(matches!(
            taken.validate(&tables),
            Err(AppError::Validation { field: "username", .. })
        ));

        let mut same_mail = user(3, "wisniewski");
        same_mail.email = "nowakowa@example.com".into();
        assert!(matches!(
            same_mail.validate(&tables),
            Err(AppError::Validation { field: "email", .. })
        ));

        // saving a user over itself is fine
        assert!(user(1, "kowalski").validate(&tables).is_ok());
    }

    #[test]
    fn username_and_region_lengths() {
        let tables = tables();
        assert!(user(3, "abcd").validate(&tables).is_err());

        let mut regional = user(3, "wisniewski");
        regional.region = "Kraków".into();
        assert!(regional.validate(&tables).is_ok());
        regional.region = "Łódź".into();
        assert!(matches!(
            regional.validate(&tables),
            Err(AppError::Validation { field: "region", .. })
        ));
    }

    #[test]
    fn one_account_per_platform() {
        let tables = tables();

        assert!(account(2, 2, "456", "discord").validate(&tables).is_ok());
        assert!(account(2, 2, "123", "discord").validate(&tables).is_err());
        assert!(account(2, 1, "456", "discord").validate(&tables).is_err());
        assert!(account(1, 1, "123", "discord").validate(&tables).is_ok());
        assert!(account(2, 9, "456", "discord").validate(&tables).is_err());
    }

    #[test]
    fn score_timestamp_survives_updates() {
        let mut score = ActivityScore {
            id: 1,
            user: 1,
            change: 5,
            reason: "Rozwiązane zadanie".into(),
            timestamp: at(23),
        };
        score.prepare(None, at(8));
        assert_eq!(score.timestamp, at(8));

        let stored = score.clone();
        score.change = 7;
        score.prepare(Some(&stored), at(12));
        assert_eq!(score.timestamp, at(8));
    }

    #[test]
    fn profiles_depend_on_access() {
        let tables = tables();
        let kowalski = tables.users.get(1).unwrap();

        let public = kowalski
            .present(
                &tables,
                View {
                    access: Access::Anonymous,
                    display: false,
                },
            )
            .unwrap();
        assert_eq!(public["full_name"], "Jan Kowalski");
        assert!(public.get("email").is_none());

        let full = kowalski
            .present(
                &tables,
                View {
                    access: Access::Admin,
                    display: false,
                },
            )
            .unwrap();
        assert_eq!(full["email"], "kowalski@example.com");
        assert_eq!(full["linked_accounts"][0]["platform"], "discord");
    }

    #[test]
    fn deleting_a_user_detaches_everything() {
        let mut tables = tables();
        tables.seminars.put(
            1,
            Seminar {
                id: 1,
                tutors: vec![1, 2],
                ..Seminar::default()
            },
        );
        tables.posts.put(
            1,
            Post {
                id: 1,
                title: "Wyniki".into(),
                subtitle: String::new(),
                date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                time: at(0).time(),
                authors: vec![1],
                content: String::new(),
                file: None,
                images: Vec::new(),
            },
        );

        tables.users.remove(1);
        User::cascade(1, &mut tables);

        assert!(tables.linked_accounts.is_empty());
        assert_eq!(tables.seminars.get(1).unwrap().tutors, [2]);
        assert!(tables.posts.get(1).unwrap().authors.is_empty());
    }
}
