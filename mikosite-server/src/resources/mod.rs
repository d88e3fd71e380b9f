//! REST resources: one generic set of CRUD handlers, specialised per record
//! type through [`Resource`].

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{StatusCode, Uri},
    routing::get,
    Json, Router,
};
use chrono::NaiveDateTime;
use mikosite_core::Id;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::{
    auth::{Access, Policy},
    error::AppError,
    pagination::{Page, PageQuery},
    state::AppState,
    store::{Table, Tables},
};

pub mod accounts;
pub mod posts;
pub mod seminars;

/// How a record should be rendered for the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct View {
    pub access: Access,
    pub display: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct DisplayQuery {
    display_only: Option<String>,
}

impl DisplayQuery {
    fn enabled(&self) -> bool {
        self.display_only.as_deref().is_some_and(|raw| !raw.is_empty())
    }
}

/// Narrows a listing according to query parameters.
pub trait Filter<R>: DeserializeOwned + Send + 'static {
    fn apply(&self, records: Vec<R>, now: NaiveDateTime) -> Vec<R>;
}

/// Accepts any query and keeps everything.
#[derive(Debug, Default, Deserialize)]
pub struct Unfiltered {}

impl<R> Filter<R> for Unfiltered {
    fn apply(&self, records: Vec<R>, _now: NaiveDateTime) -> Vec<R> {
        records
    }
}

pub trait Resource: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Collection path, e.g. `/api/seminars`.
    const PATH: &'static str;
    const LIST: Policy;
    const RETRIEVE: Policy;
    const WRITE: Policy = Policy::Admin;
    /// Cache keys that go stale whenever a record of this type changes.
    const INVALIDATES: &'static [&'static str] = &[];

    type Filter: Filter<Self>;

    fn table(tables: &Tables) -> &Table<Self>;
    fn table_mut(tables: &mut Tables) -> &mut Table<Self>;

    fn id(&self) -> Id;
    fn set_id(&mut self, id: Id);

    /// Fills in server-managed fields before validation.
    fn prepare(&mut self, _previous: Option<&Self>, _now: NaiveDateTime) {}

    fn validate(&self, tables: &Tables) -> Result<(), AppError>;

    /// Keeps dependent records in step after a save.
    fn after_save(&self, _tables: &mut Tables) {}

    /// Removes or detaches whatever refers to a deleted record.
    fn cascade(_id: Id, _tables: &mut Tables) {}

    fn present(&self, _tables: &Tables, _view: View) -> Result<Value, AppError> {
        Ok(serde_json::to_value(self)?)
    }
}

pub fn routes<R: Resource>() -> Router<Arc<AppState>> {
    Router::new()
        .route(R::PATH, get(list::<R>).post(create::<R>))
        .route(
            &format!("{}/:id", R::PATH),
            get(retrieve::<R>)
                .put(update::<R>)
                .patch(partial_update::<R>)
                .delete(destroy::<R>),
        )
}

async fn list<R: Resource>(
    State(state): State<Arc<AppState>>,
    access: Access,
    uri: Uri,
    Query(page): Query<PageQuery>,
    Query(filter): Query<R::Filter>,
    Query(display): Query<DisplayQuery>,
) -> Result<Json<Page<Value>>, AppError> {
    access.require(R::LIST)?;

    let view = View {
        access,
        display: display.enabled(),
    };
    let now = state.clock.now();
    let tables = state.store.read().await;

    let records = R::table(&tables).iter().cloned().collect::<Vec<_>>();
    let page = page.paginate(filter.apply(records, now), &uri);

    let results = page
        .results
        .iter()
        .map(|record| record.present(&tables, view))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(Page {
        count: page.count,
        next: page.next,
        previous: page.previous,
        results,
    }))
}

async fn retrieve<R: Resource>(
    State(state): State<Arc<AppState>>,
    access: Access,
    Path(id): Path<Id>,
    Query(display): Query<DisplayQuery>,
) -> Result<Json<Value>, AppError> {
    access.require(R::RETRIEVE)?;

    let view = View {
        access,
        display: display.enabled(),
    };
    let tables = state.store.read().await;
    let record = R::table(&tables).get(id).ok_or(AppError::NotFound)?;

    Ok(Json(record.present(&tables, view)?))
}

async fn create<R: Resource>(
    State(state): State<Arc<AppState>>,
    access: Access,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    access.require(R::WRITE)?;

    let record = parse_record::<R>(body)?;
    let body = save(&state, record, None, access).await?;
    Ok((StatusCode::CREATED, Json(body)))
}

async fn update<R: Resource>(
    State(state): State<Arc<AppState>>,
    access: Access,
    Path(id): Path<Id>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, AppError> {
    access.require(R::WRITE)?;

    let record = parse_record::<R>(body)?;
    Ok(Json(save(&state, record, Some(id), access).await?))
}

/// Fields present in the body replace the stored ones; `null` clears.
async fn partial_update<R: Resource>(
    State(state): State<Arc<AppState>>,
    access: Access,
    Path(id): Path<Id>,
    Json(changes): Json<Value>,
) -> Result<Json<Value>, AppError> {
    access.require(R::WRITE)?;

    let Value::Object(changes) = changes else {
        return Err(AppError::MalformedPayload("expected a JSON object".into()));
    };

    let mut merged = {
        let tables = state.store.read().await;
        let current = R::table(&tables).get(id).ok_or(AppError::NotFound)?;
        serde_json::to_value(current)?
    };

    if let Value::Object(fields) = &mut merged {
        fields.extend(changes);
    }

    let record = parse_record::<R>(merged)?;
    Ok(Json(save(&state, record, Some(id), access).await?))
}

/// Reads a request body into `R`, blaming the offending field when serde
/// rejects it.
fn parse_record<R: DeserializeOwned>(body: Value) -> Result<R, AppError> {
    let Value::Object(fields) = body else {
        return Err(AppError::MalformedPayload("expected a JSON object".into()));
    };

    match serde_json::from_value(Value::Object(fields.clone())) {
        Ok(record) => Ok(record),
        Err(err) => Err(field_error::<R>(&fields, err.to_string())),
    }
}

fn field_error<R: DeserializeOwned>(fields: &Map<String, Value>, message: String) -> AppError {
    if let Some(field) = missing_field(&message) {
        return AppError::BadField {
            field: field.to_string(),
            message: "This field is required.".into(),
        };
    }

    // serde_json does not track paths, so find the key whose removal changes
    // the outcome.
    let culprit = fields.keys().find(|key| {
        let mut rest = fields.clone();
        rest.remove(key.as_str());
        match serde_json::from_value::<R>(Value::Object(rest)) {
            Ok(_) => true,
            Err(other) => other.to_string() != message,
        }
    });

    match culprit {
        Some(field) => AppError::BadField {
            field: field.clone(),
            message,
        },
        None => AppError::MalformedPayload(message),
    }
}

fn missing_field(message: &str) -> Option<&str> {
    message
        .strip_prefix("missing field `")?
        .split('`')
        .next()
}

async fn destroy<R: Resource>(
    State(state): State<Arc<AppState>>,
    access: Access,
    Path(id): Path<Id>,
) -> Result<StatusCode, AppError> {
    access.require(R::WRITE)?;

    {
        let mut tables = state.store.write().await;
        let mut staged = tables.clone();
        R::table_mut(&mut staged)
            .remove(id)
            .ok_or(AppError::NotFound)?;
        R::cascade(id, &mut staged);
        state.store.commit(&mut tables, staged).await?;
    }

    state.invalidate(R::INVALIDATES);
    info!(path = R::PATH, id, "deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Validates and stores `record`, under `existing` when replacing one.
async fn save<R: Resource>(
    state: &AppState,
    mut record: R,
    existing: Option<Id>,
    access: Access,
) -> Result<Value, AppError> {
    let now = state.clock.now();
    let mut tables = state.store.write().await;

    let previous = match existing {
        Some(id) => Some(R::table(&tables).get(id).cloned().ok_or(AppError::NotFound)?),
        None => None,
    };

    let id = existing.unwrap_or_else(|| R::table(&tables).next_id());
    record.set_id(id);
    record.prepare(previous.as_ref(), now);
    record.validate(&tables)?;

    let mut staged = tables.clone();
    R::table_mut(&mut staged).put(id, record.clone());
    record.after_save(&mut staged);
    state.store.commit(&mut tables, staged).await?;

    let body = record.present(
        &tables,
        View {
            access,
            display: false,
        },
    )?;
    drop(tables);

    state.invalidate(R::INVALIDATES);
    info!(path = R::PATH, id = record.id(), created = existing.is_none(), "saved");
    Ok(body)
}

// Validation helpers shared by the resource modules.

pub(crate) fn check_length(
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), AppError> {
    let length = value.chars().count();
    if length < min {
        return Err(if min == 1 {
            AppError::invalid(field, "This field may not be blank.")
        } else {
            AppError::invalid(field, format!("Ensure this field has at least {min} characters."))
        });
    }
    if length > max {
        return Err(AppError::invalid(
            field,
            format!("Ensure this field has no more than {max} characters."),
        ));
    }
    Ok(())
}

pub(crate) fn check_exists<T>(field: &'static str, table: &Table<T>, id: Id) -> Result<(), AppError> {
    if table.contains(id) {
        Ok(())
    } else {
        Err(AppError::invalid(
            field,
            format!("Invalid pk \"{id}\" - object does not exist."),
        ))
    }
}

pub(crate) fn check_all_exist<T>(
    field: &'static str,
    table: &Table<T>,
    ids: &[Id],
) -> Result<(), AppError> {
    ids.iter().try_for_each(|&id| check_exists(field, table, id))
}

pub(crate) fn check_difficulty(field: &'static str, level: Option<u8>) -> Result<(), AppError> {
    match level {
        Some(level) if !(1..=5).contains(&level) => Err(AppError::invalid(
            field,
            "Ensure this value is between 1 and 5.",
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_bounds_are_inclusive() {
        assert!(check_length("title", "abc", 1, 3).is_ok());
        assert!(check_length("title", "", 1, 3).is_err());
        assert!(check_length("title", "abcd", 1, 3).is_err());
        assert!(check_length("title", "żółw", 1, 4).is_ok());
    }

    #[test]
    fn difficulty_range() {
        assert!(check_difficulty("difficulty", None).is_ok());
        assert!(check_difficulty("difficulty", Some(5)).is_ok());
        assert!(check_difficulty("difficulty", Some(0)).is_err());
        assert!(check_difficulty("difficulty", Some(6)).is_err());
    }

    #[test]
    fn display_flag_needs_a_value() {
        let query = |raw: Option<&str>| DisplayQuery {
            display_only: raw.map(String::from),
        };
        assert!(query(Some("1")).enabled());
        assert!(!query(Some("")).enabled());
        assert!(!query(None).enabled());
    }

    #[test]
    fn unreadable_bodies_name_the_field() {
        use mikosite_core::{Seminar, SeminarGroup};
        use serde_json::json;

        let missing = parse_record::<SeminarGroup>(json!({})).unwrap_err();
        assert!(matches!(missing, AppError::BadField { ref field, .. } if field == "name"));

        let mistyped = parse_record::<Seminar>(json!({ "duration": "soon", "theme": "x" })).unwrap_err();
        assert!(matches!(mistyped, AppError::BadField { ref field, .. } if field == "duration"));

        assert!(matches!(
            parse_record::<SeminarGroup>(json!([1, 2])),
            Err(AppError::MalformedPayload(_))
        ));
        assert!(parse_record::<SeminarGroup>(json!({ "name": "Olimpijska" })).is_ok());
    }
}
