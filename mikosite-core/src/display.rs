//! Display-ready shapes of seminars, groups and posts.
//!
//! Dates are spelled out in Polish (`1 stycznia`), times as `HH:mm`.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::{Id, Post, PostImage, Seminar, SeminarGroup, User};

const MONTHS_GENITIVE: [&str; 12] = [
    "stycznia",
    "lutego",
    "marca",
    "kwietnia",
    "maja",
    "czerwca",
    "lipca",
    "sierpnia",
    "września",
    "października",
    "listopada",
    "grudnia",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DifficultyBadge {
    pub label: &'static str,
    pub icon: &'static str,
}

pub fn difficulty_badge(level: u8) -> Option<DifficultyBadge> {
    let (label, icon) = match level {
        1 => ("początkujący", "signal_cellular_1_bar"),
        2 => ("poziom średni", "signal_cellular_2_bar"),
        3 => ("zaawansowany", "signal_cellular_3_bar"),
        4 => (
            "olimpiady międzynarodowe",
            "signal_cellular_connected_no_internet_4_bar",
        ),
        5 => ("akademicki", "school"),
        _ => return None,
    };

    Some(DifficultyBadge { label, icon })
}

/// The seminar's own difficulty, or its group's default.
pub fn effective_difficulty(seminar: &Seminar, group: Option<&SeminarGroup>) -> Option<u8> {
    seminar
        .difficulty
        .or_else(|| group.and_then(|group| group.default_difficulty))
}

/// `d MMMM`, e.g. `7 marca`.
pub fn day_month(date: NaiveDate) -> String {
    format!("{} {}", date.day(), MONTHS_GENITIVE[date.month0() as usize])
}

/// `d MMMM y`, e.g. `7 marca 2024`.
pub fn day_month_year(date: NaiveDate) -> String {
    format!("{} {}", day_month(date), date.year())
}

pub fn clock(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// `HH:mm-HH:mm`, or just the start when the duration is unknown.
pub fn time_range(start: NaiveTime, duration: Option<TimeDelta>) -> String {
    match duration {
        Some(duration) => {
            let (end, _) = start.overflowing_add_signed(duration);
            format!("{}-{}", clock(start), clock(end))
        }
        None => clock(start),
    }
}

fn names(users: &[&User]) -> Vec<String> {
    users.iter().map(|user| user.full_name()).collect()
}

/// Seminar as shown on the homepage and the seminar listing.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct SeminarCard {
    pub id: Id,
    pub theme: Option<String>,
    pub description: Option<String>,
    pub date_string: Option<String>,
    pub time_string: Option<String>,
    pub starts_at: Option<NaiveDateTime>,
    pub tutors: Vec<String>,
    pub image_url: Option<String>,
    pub file_url: Option<String>,
    pub featured: bool,
    pub special_guest: bool,
    pub group_name: Option<String>,
    pub difficulty_label: Option<&'static str>,
    pub difficulty_icon: Option<&'static str>,
}

impl SeminarCard {
    pub fn new(seminar: &Seminar, group: Option<&SeminarGroup>, tutors: &[&User]) -> Self {
        let badge = effective_difficulty(seminar, group).and_then(difficulty_badge);

        Self {
            id: seminar.id,
            theme: seminar.theme.clone(),
            description: seminar.description.clone(),
            date_string: seminar.date.map(day_month),
            time_string: seminar.time.map(|time| time_range(time, seminar.duration)),
            starts_at: seminar.start(),
            tutors: names(tutors),
            image_url: seminar.image.clone(),
            file_url: seminar.file.clone(),
            featured: seminar.featured,
            special_guest: seminar.special_guest,
            group_name: group.map(|group| group.name.clone()),
            difficulty_label: badge.map(|badge| badge.label),
            difficulty_icon: badge.map(|badge| badge.icon),
        }
    }
}

/// Seminar as returned by the API's display mode.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct DisplaySeminar {
    pub id: Id,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    #[cfg_attr(feature = "serde", serde(with = "crate::duration::option"))]
    pub duration: Option<TimeDelta>,
    pub group_name: Option<String>,
    pub theme: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub file: Option<String>,
    pub discord_channel_id: Option<String>,
    pub group_role_id: Option<String>,
    pub started: bool,
    pub finished: bool,
    pub featured: bool,
    pub special_guest: bool,
    pub tutors: Vec<String>,
    pub difficulty_label: Option<&'static str>,
}

impl DisplaySeminar {
    pub fn new(seminar: &Seminar, group: Option<&SeminarGroup>, tutors: &[&User]) -> Self {
        Self {
            id: seminar.id,
            date: seminar.date,
            time: seminar.time,
            duration: seminar.duration,
            group_name: group.map(|group| group.name.clone()),
            theme: seminar.theme.clone(),
            description: seminar.description.clone(),
            image: seminar.image.clone(),
            file: seminar.file.clone(),
            discord_channel_id: seminar.discord_channel_id.clone(),
            group_role_id: group.and_then(|group| group.discord_role_id.clone()),
            started: seminar.started,
            finished: seminar.finished,
            featured: seminar.featured,
            special_guest: seminar.special_guest,
            tutors: names(tutors),
            difficulty_label: effective_difficulty(seminar, group)
                .and_then(difficulty_badge)
                .map(|badge| badge.label),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct GroupCard {
    pub id: Id,
    pub name: String,
    pub lead: Option<String>,
    pub description: Option<String>,
    pub difficulty_label: Option<&'static str>,
    pub difficulty_icon: Option<&'static str>,
}

impl GroupCard {
    pub fn new(group: &SeminarGroup) -> Self {
        let badge = group.default_difficulty.and_then(difficulty_badge);

        Self {
            id: group.id,
            name: group.name.clone(),
            lead: group.lead.clone(),
            description: group.description.clone(),
            difficulty_label: badge.map(|badge| badge.label),
            difficulty_icon: badge.map(|badge| badge.icon),
        }
    }
}

/// Groups worth presenting: those with both a lead and a description,
/// easiest first, then by lead. Groups without a difficulty go last.
pub fn group_cards<'a, I>(groups: I) -> Vec<GroupCard>
where
    I: IntoIterator<Item = &'a SeminarGroup>,
{
    let filled = |text: &Option<String>| text.as_deref().is_some_and(|text| !text.is_empty());

    let mut shown = groups
        .into_iter()
        .filter(|group| filled(&group.lead) && filled(&group.description))
        .collect::<Vec<_>>();

    shown.sort_by(|a, b| {
        let key = |group: &SeminarGroup| (group.default_difficulty.is_none(), group.default_difficulty);
        key(*a).cmp(&key(*b)).then_with(|| a.lead.cmp(&b.lead))
    });

    shown.into_iter().map(GroupCard::new).collect()
}

/// Post as shown on the homepage.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct PostCard {
    pub id: Id,
    pub title: String,
    pub subtitle: String,
    pub authors: Vec<String>,
    pub file: Option<String>,
    pub images: Vec<PostImage>,
    pub content: String,
    pub date: String,
    pub time: String,
}

impl PostCard {
    pub fn new(post: &Post, authors: &[&User], images: &[&PostImage]) -> Self {
        Self {
            id: post.id,
            title: post.title.clone(),
            subtitle: post.subtitle.clone(),
            authors: names(authors),
            file: post.file.clone(),
            images: images.iter().map(|&image| image.clone()).collect(),
            content: post.content.clone(),
            date: day_month_year(post.date),
            time: clock(post.time),
        }
    }
}

/// Post as returned by the API's display mode.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct DisplayPost {
    pub id: Id,
    pub title: String,
    pub subtitle: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub content: String,
    pub authors: Vec<String>,
    pub file: Option<String>,
    pub images: Vec<PostImage>,
}

impl DisplayPost {
    pub fn new(post: &Post, authors: &[&User], images: &[&PostImage]) -> Self {
        Self {
            id: post.id,
            title: post.title.clone(),
            subtitle: post.subtitle.clone(),
            date: post.date,
            time: post.time,
            content: post.content.clone(),
            authors: names(authors),
            file: post.file.clone(),
            images: images.iter().map(|&image| image.clone()).collect(),
        }
    }
}
