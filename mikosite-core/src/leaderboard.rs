use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::{ActivityScore, Id, User};

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Standing {
    pub id: Id,
    pub username: String,
    pub full_name: String,
    pub total_score: i64,
}

impl Standing {
    pub fn new(user: &User, total_score: i64) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            full_name: user.full_name(),
            total_score,
        }
    }
}

/// Sum of every score change recorded for `user`; zero when there are none.
pub fn total_score<'a, I>(user: Id, scores: I) -> i64
where
    I: IntoIterator<Item = &'a ActivityScore>,
{
    scores
        .into_iter()
        .filter(|score| score.user == user)
        .map(|score| score.change)
        .sum()
}

/// Users that have at least one score entry, best first.
///
/// Equal totals are ordered by user id.
pub fn leaderboard<'a, U, S>(users: U, scores: S) -> Vec<Standing>
where
    U: IntoIterator<Item = &'a User>,
    S: IntoIterator<Item = &'a ActivityScore>,
{
    let mut totals = BTreeMap::<Id, i64>::new();
    for score in scores {
        *totals.entry(score.user).or_default() += score.change;
    }

    let mut standings = users
        .into_iter()
        .filter_map(|user| Some(Standing::new(user, *totals.get(&user.id)?)))
        .collect::<Vec<_>>();

    standings.sort_by(|a, b| b.total_score.cmp(&a.total_score).then(a.id.cmp(&b.id)));
    standings
}
