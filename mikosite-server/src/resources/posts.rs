use chrono::{NaiveDate, NaiveDateTime};
use mikosite_core::{display::DisplayPost, Id, Post, PostImage};
use serde::Deserialize;
use serde_json::Value;

use super::{check_all_exist, check_length, Filter, Resource, Unfiltered, View};
use crate::{
    auth::Policy,
    cache,
    error::AppError,
    store::{Table, Tables},
};

#[derive(Debug, Default, Deserialize)]
pub struct PostFilter {
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
}

impl Filter<Post> for PostFilter {
    fn apply(&self, mut records: Vec<Post>, _now: NaiveDateTime) -> Vec<Post> {
        records.retain(|post| {
            self.start_date.map_or(true, |start| post.date >= start)
                && self.end_date.map_or(true, |end| post.date <= end)
        });
        records
    }
}

impl Resource for Post {
    const PATH: &'static str = "/api/posts";
    const LIST: Policy = Policy::Public;
    const RETRIEVE: Policy = Policy::Public;
    const INVALIDATES: &'static [&'static str] = &[cache::HOMEPAGE_POSTS];

    type Filter = PostFilter;

    fn table(tables: &Tables) -> &Table<Self> {
        &tables.posts
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.posts
    }

    fn id(&self) -> Id {
        self.id
    }

    fn set_id(&mut self, id: Id) {
        self.id = id;
    }

    fn validate(&self, tables: &Tables) -> Result<(), AppError> {
        check_length("title", &self.title, 1, 200)?;
        check_length("subtitle", &self.subtitle, 0, 500)?;
        check_length("content", &self.content, 0, 5000)?;
        if self.authors.is_empty() {
            return Err(AppError::invalid("authors", "This list may not be empty."));
        }
        check_all_exist("authors", &tables.users, &self.authors)?;
        check_all_exist("images", &tables.post_images, &self.images)
    }

    fn present(&self, tables: &Tables, view: View) -> Result<Value, AppError> {
        if !view.display {
            return Ok(serde_json::to_value(self)?);
        }

        let authors = tables.users.pick(&self.authors);
        let images = tables.post_images.pick(&self.images);
        Ok(serde_json::to_value(DisplayPost::new(self, &authors, &images))?)
    }
}

impl Resource for PostImage {
    const PATH: &'static str = "/api/post-images";
    const LIST: Policy = Policy::Public;
    const RETRIEVE: Policy = Policy::Public;
    const INVALIDATES: &'static [&'static str] = &[cache::HOMEPAGE_POSTS];

    type Filter = Unfiltered;

    fn table(tables: &Tables) -> &Table<Self> {
        &tables.post_images
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.post_images
    }

    fn id(&self) -> Id {
        self.id
    }

    fn set_id(&mut self, id: Id) {
        self.id = id;
    }

    fn validate(&self, _tables: &Tables) -> Result<(), AppError> {
        check_length("image", &self.image, 1, 255)
    }

    fn cascade(id: Id, tables: &mut Tables) {
        for post in tables.posts.iter_mut() {
            post.images.retain(|&image| image != id);
        }
    }
}
