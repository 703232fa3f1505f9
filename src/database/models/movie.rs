use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;
use uuid::Uuid;

use crate::filter::{FieldKind, FieldSpec};

pub const MOVIES_TABLE: &str = "movies";

/// Public attribute names and the columns behind them
pub static MOVIE_FIELDS: [FieldSpec; 16] = [
    FieldSpec::new("id", "id", FieldKind::Uuid),
    FieldSpec::new("name", "name", FieldKind::Text),
    FieldSpec::new("description", "description", FieldKind::Text),
    FieldSpec::new("duration", "duration", FieldKind::Integer),
    FieldSpec::new("ratings", "ratings", FieldKind::Float),
    FieldSpec::new("totalRatings", "total_ratings", FieldKind::Integer),
    FieldSpec::new("releaseYear", "release_year", FieldKind::Integer),
    FieldSpec::new("releaseDate", "release_date", FieldKind::Timestamp),
    FieldSpec::hidden("createdAt", "created_at", FieldKind::Timestamp),
    FieldSpec::new("genres", "genres", FieldKind::TextList),
    FieldSpec::new("directors", "directors", FieldKind::TextList),
    FieldSpec::new("coverImage", "cover_image", FieldKind::Text),
    FieldSpec::new("actors", "actors", FieldKind::TextList),
    FieldSpec::new("price", "price", FieldKind::Float),
    FieldSpec::new("createdBy", "created_by", FieldKind::Text),
    FieldSpec::hidden("version", "version", FieldKind::Integer),
];

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub duration: i32,
    pub ratings: Option<f64>,
    pub total_ratings: Option<i32>,
    pub release_year: i32,
    pub release_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub created_at: DateTime<Utc>,
    pub genres: Vec<String>,
    pub directors: Vec<String>,
    pub cover_image: String,
    pub actors: Vec<String>,
    pub price: f64,
    pub created_by: String,
    #[serde(skip_serializing)]
    pub version: i32,
}

impl Movie {
    /// Public representation including the computed `durationInHours`
    pub fn to_document(&self) -> Value {
        let mut doc = serde_json::to_value(self).unwrap_or(Value::Null);
        if let Value::Object(ref mut map) = doc {
            map.insert("durationInHours".to_string(), duration_in_hours(self.duration as f64));
        }
        doc
    }
}

/// Rename a `row_to_json` row from columns to public attribute names and add
/// `durationInHours` when the duration was projected.
pub fn document_from_row(row: Value) -> Value {
    let Value::Object(columns) = row else {
        return row;
    };

    let mut doc = Map::with_capacity(columns.len() + 1);
    for (column, value) in columns {
        let name = MOVIE_FIELDS
            .iter()
            .find(|f| f.column == column)
            .map(|f| f.api.to_string())
            .unwrap_or(column);
        doc.insert(name, value);
    }
    if let Some(minutes) = doc.get("duration").and_then(Value::as_f64) {
        doc.insert("durationInHours".to_string(), duration_in_hours(minutes));
    }
    Value::Object(doc)
}

fn duration_in_hours(minutes: f64) -> Value {
    serde_json::Number::from_f64(minutes / 60.0).map(Value::Number).unwrap_or(Value::Null)
}

/// Incoming movie attributes for create and update. Absent fields stay untouched on update.
/// Nullable columns use `Some(None)` for an explicit `null`, which clears them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieDraft {
    pub name: Option<String>,
    pub description: Option<String>,
    pub duration: Option<i32>,
    #[serde(default, deserialize_with = "present")]
    pub ratings: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present")]
    pub total_ratings: Option<Option<i32>>,
    pub release_year: Option<i32>,
    #[serde(default, deserialize_with = "present")]
    pub release_date: Option<Option<DateTime<Utc>>>,
    pub genres: Option<Vec<String>>,
    pub directors: Option<Vec<String>>,
    pub cover_image: Option<String>,
    pub actors: Option<Vec<String>>,
    pub price: Option<f64>,
    /// Stamped by the server, never taken from the request
    #[serde(skip_deserializing)]
    pub created_by: Option<String>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// One row of the per-release-year price and rating statistics
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MovieStats {
    pub release_year: i32,
    pub avg_rating: Option<f64>,
    pub avg_price: Option<f64>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub price_total: Option<f64>,
    pub min_rating: Option<f64>,
    pub max_rating: Option<f64>,
    pub rating_total: Option<f64>,
    pub movie_count: i64,
}

/// Titles grouped under one genre
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct GenreGroup {
    pub genre: String,
    pub movie_count: i64,
    pub movies: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Movie {
        Movie {
            id: Uuid::nil(),
            name: "Inception".into(),
            description: "Dreams".into(),
            duration: 150,
            ratings: Some(8.8),
            total_ratings: Some(1000),
            release_year: 2010,
            release_date: None,
            created_at: Utc::now(),
            genres: vec!["Sci-Fi".into()],
            directors: vec!["Christopher Nolan".into()],
            cover_image: "inception.jpg".into(),
            actors: vec!["Leonardo DiCaprio".into()],
            price: 20.0,
            created_by: "DIBAKAR".into(),
            version: 3,
        }
    }

    #[test]
    fn document_hides_internal_fields_and_adds_hours() {
        let doc = sample().to_document();
        assert_eq!(doc["durationInHours"], json!(2.5));
        assert_eq!(doc["coverImage"], "inception.jpg");
        assert!(doc.get("version").is_none());
        assert!(doc.get("createdAt").is_none());
    }

    #[test]
    fn rows_are_renamed_to_public_names() {
        let doc = document_from_row(json!({ "id": "x", "release_year": 2010, "duration": 90 }));
        assert_eq!(doc, json!({ "id": "x", "releaseYear": 2010, "duration": 90, "durationInHours": 1.5 }));
    }

    #[test]
    fn projection_without_duration_has_no_hours() {
        let doc = document_from_row(json!({ "id": "x", "name": "Up" }));
        assert!(doc.get("durationInHours").is_none());
    }

    #[test]
    fn drafts_ignore_created_by_from_clients() {
        let draft: MovieDraft =
            serde_json::from_value(json!({ "name": "Up", "createdBy": "mallory", "releaseYear": 2009 })).unwrap();
        assert_eq!(draft.created_by, None);
        assert_eq!(draft.release_year, Some(2009));
    }

    #[test]
    fn drafts_tell_null_from_absent() {
        let cleared: MovieDraft =
            serde_json::from_value(json!({ "ratings": null, "releaseDate": null })).unwrap();
        assert_eq!(cleared.ratings, Some(None));
        assert_eq!(cleared.release_date, Some(None));
        assert_eq!(cleared.total_ratings, None);

        let set: MovieDraft = serde_json::from_value(json!({ "totalRatings": 12 })).unwrap();
        assert_eq!(set.total_ratings, Some(Some(12)));
        assert_eq!(set.ratings, None);
    }
}
