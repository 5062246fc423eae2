//! Objects to manage the study spot markers that are placed on the map
use crate::{Database, Error, Result, core::loadable::Loadable};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite};
use strum_macros::{Display, EnumIter, EnumString};
use time::OffsetDateTime;
use tracing::debug;

/// The kind of venue that a marker represents
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Display,
    EnumString,
    EnumIter,
    Deserialize,
    Serialize,
    sqlx::Type,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum SpotType {
    Cafe,
    Library,
    Park,
    Coworking,
    #[default]
    Other,
}

/// A study spot that was placed on the map.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    /// A unique ID that identifies this marker in the database
    pub id: String,

    /// A short label for this spot
    pub title: String,

    pub spot_type: SpotType,

    /// Free-form notes about this spot
    pub notes: Option<String>,

    /// A rating for this spot. Any integer is accepted.
    pub rating: Option<i64>,

    pub latitude: f64,
    pub longitude: f64,

    pub has_wifi: bool,
    pub has_outlets: bool,
    pub has_indoor_seating: bool,
    pub has_outdoor_seating: bool,
    pub is_quiet: bool,
    pub has_food: bool,

    /// The time this marker was created. Markers are listed newest first.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// The mutable fields of a marker as they are supplied by a client. Any field
/// that is missing or "empty" (an empty string, a rating of 0, `false`) is
/// replaced by its default value when the fields are normalized, so it is not
/// possible to distinguish between a field that was left out and a field that
/// was explicitly set to its default.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerFields {
    pub title: Option<String>,
    pub spot_type: Option<String>,
    pub notes: Option<String>,
    pub rating: Option<i64>,
    pub has_wifi: Option<bool>,
    pub has_outlets: Option<bool>,
    pub has_indoor_seating: Option<bool>,
    pub has_outdoor_seating: Option<bool>,
    pub is_quiet: Option<bool>,
    pub has_food: Option<bool>,
}

/// The data needed to place a new marker on the map
#[derive(Debug, Default, Clone, Deserialize)]
pub struct NewMarker {
    #[serde(flatten)]
    pub fields: MarkerFields,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// The validated set of mutable fields of a marker with all defaults applied
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerValues {
    pub title: String,
    pub spot_type: SpotType,
    pub notes: Option<String>,
    pub rating: Option<i64>,
    pub has_wifi: bool,
    pub has_outlets: bool,
    pub has_indoor_seating: bool,
    pub has_outdoor_seating: bool,
    pub is_quiet: bool,
    pub has_food: bool,
}

impl MarkerFields {
    /// Check that all required fields are present and replace every empty
    /// optional field with its default value.
    pub fn normalize(self) -> Result<MarkerValues> {
        let title = self
            .title
            .filter(|t| !t.is_empty())
            .ok_or(Error::MissingField("title"))?;
        let spot_type = match self.spot_type.filter(|s| !s.is_empty()) {
            Some(s) => s.parse().map_err(|_| Error::InvalidSpotType(s))?,
            None => SpotType::default(),
        };
        Ok(MarkerValues {
            title,
            spot_type,
            notes: self.notes.filter(|n| !n.is_empty()),
            rating: self.rating.filter(|r| *r != 0),
            has_wifi: self.has_wifi.unwrap_or_default(),
            has_outlets: self.has_outlets.unwrap_or_default(),
            has_indoor_seating: self.has_indoor_seating.unwrap_or_default(),
            has_outdoor_seating: self.has_outdoor_seating.unwrap_or_default(),
            is_quiet: self.is_quiet.unwrap_or_default(),
            has_food: self.has_food.unwrap_or_default(),
        })
    }
}

#[async_trait]
impl Loadable for Marker {
    type Id = String;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    async fn load(id: &Self::Id, db: &Database) -> Result<Self> {
        sqlx::query_as("SELECT * FROM markers WHERE id=?")
            .bind(id)
            .fetch_optional(db.pool())
            .await?
            .ok_or_else(|| Error::MarkerNotFound(id.clone()))
    }

    async fn delete_id(id: &Self::Id, db: &Database) -> Result<Self> {
        debug!(id, "Deleting marker");
        sqlx::query_as("DELETE FROM markers WHERE id=? RETURNING *")
            .bind(id)
            .fetch_optional(db.pool())
            .await?
            .ok_or_else(|| Error::MarkerNotFound(id.clone()))
    }
}

impl Marker {
    fn build_query() -> QueryBuilder<'static, Sqlite> {
        // julianday() compares the timestamps chronologically rather than as
        // strings. Markers created within the same millisecond fall back to
        // insertion order.
        QueryBuilder::new("SELECT * FROM markers ORDER BY julianday(created_at) DESC, rowid DESC")
    }

    /// Loads all markers from the database, newest first
    pub async fn load_all(db: &Database) -> Result<Vec<Marker>> {
        Self::build_query()
            .build_query_as()
            .fetch_all(db.pool())
            .await
            .map_err(|e| e.into())
    }

    /// Creates a new marker object from the given values. It gets a freshly
    /// generated id and the current time as its creation time, but it is not
    /// stored in the database until [Marker::insert()] is called.
    pub fn new(values: MarkerValues, latitude: f64, longitude: f64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: values.title,
            spot_type: values.spot_type,
            notes: values.notes,
            rating: values.rating,
            latitude,
            longitude,
            has_wifi: values.has_wifi,
            has_outlets: values.has_outlets,
            has_indoor_seating: values.has_indoor_seating,
            has_outdoor_seating: values.has_outdoor_seating,
            is_quiet: values.is_quiet,
            has_food: values.has_food,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    /// Validate the client-supplied data and store a new marker in the
    /// database. Latitude and longitude are required, but any numeric value
    /// (including 0) is accepted.
    pub async fn create(new: NewMarker, db: &Database) -> Result<Marker> {
        let values = new.fields.normalize()?;
        let latitude = new.latitude.ok_or(Error::MissingField("latitude"))?;
        let longitude = new.longitude.ok_or(Error::MissingField("longitude"))?;
        let marker = Marker::new(values, latitude, longitude);
        marker.insert(db).await?;
        Ok(marker)
    }

    /// Add this marker to the database
    pub async fn insert(&self, db: &Database) -> Result<()> {
        debug!(id = self.id, title = self.title, "Inserting marker");
        sqlx::query(
            r#"INSERT INTO markers
            (id, title, spot_type, notes, rating, latitude, longitude,
             has_wifi, has_outlets, has_indoor_seating, has_outdoor_seating,
             is_quiet, has_food, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&self.id)
        .bind(&self.title)
        .bind(self.spot_type)
        .bind(&self.notes)
        .bind(self.rating)
        .bind(self.latitude)
        .bind(self.longitude)
        .bind(self.has_wifi)
        .bind(self.has_outlets)
        .bind(self.has_indoor_seating)
        .bind(self.has_outdoor_seating)
        .bind(self.is_quiet)
        .bind(self.has_food)
        .bind(self.created_at)
        .execute(db.pool())
        .await
        .map(|_| ())
        .map_err(|e| e.into())
    }

    /// Replace all mutable fields of the marker with the given id. Fields that
    /// were not supplied are reset to their defaults rather than left
    /// unchanged. The id, position and creation time of the marker never
    /// change.
    pub async fn update(id: &str, fields: MarkerFields, db: &Database) -> Result<Marker> {
        let values = fields.normalize()?;
        debug!(id, ?values, "Updating marker");
        sqlx::query_as(
            r#"UPDATE markers SET title=?, spot_type=?, notes=?, rating=?,
            has_wifi=?, has_outlets=?, has_indoor_seating=?, has_outdoor_seating=?,
            is_quiet=?, has_food=?
            WHERE id=? RETURNING *"#,
        )
        .bind(values.title)
        .bind(values.spot_type)
        .bind(values.notes)
        .bind(values.rating)
        .bind(values.has_wifi)
        .bind(values.has_outlets)
        .bind(values.has_indoor_seating)
        .bind(values.has_outdoor_seating)
        .bind(values.is_quiet)
        .bind(values.has_food)
        .bind(id)
        .fetch_optional(db.pool())
        .await?
        .ok_or_else(|| Error::MarkerNotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Pool;
    use strum::IntoEnumIterator;
    use test_log::test;

    fn new_marker(title: &str, latitude: Option<f64>, longitude: Option<f64>) -> NewMarker {
        NewMarker {
            fields: MarkerFields {
                title: Some(title.to_string()),
                ..Default::default()
            },
            latitude,
            longitude,
        }
    }

    #[test]
    fn test_spot_type_names() {
        for t in SpotType::iter() {
            let name = t.to_string();
            assert_eq!(name.parse::<SpotType>().expect("parse failed"), t);
            assert_eq!(
                serde_json::to_string(&t).expect("serialize failed"),
                format!("\"{name}\"")
            );
        }
        assert_eq!("Library".parse::<SpotType>().unwrap(), SpotType::Library);
        assert!("bar".parse::<SpotType>().is_err());
    }

    #[test]
    fn test_normalize_defaults() {
        let values = MarkerFields {
            title: Some("Cafe X".to_string()),
            spot_type: Some("".to_string()),
            notes: Some("".to_string()),
            rating: Some(0),
            has_wifi: Some(true),
            has_food: Some(false),
            ..Default::default()
        }
        .normalize()
        .expect("normalize failed");
        assert_eq!(
            values,
            MarkerValues {
                title: "Cafe X".to_string(),
                spot_type: SpotType::Other,
                notes: None,
                rating: None,
                has_wifi: true,
                has_outlets: false,
                has_indoor_seating: false,
                has_outdoor_seating: false,
                is_quiet: false,
                has_food: false,
            }
        );
    }

    #[test]
    fn test_normalize_rejects_bad_input() {
        assert!(matches!(
            MarkerFields::default().normalize(),
            Err(Error::MissingField("title"))
        ));
        assert!(matches!(
            MarkerFields {
                title: Some(String::new()),
                ..Default::default()
            }
            .normalize(),
            Err(Error::MissingField("title"))
        ));
        let res = MarkerFields {
            title: Some("Somewhere".to_string()),
            spot_type: Some("bar".to_string()),
            ..Default::default()
        }
        .normalize();
        assert!(matches!(res, Err(Error::InvalidSpotType(ref s)) if s == "bar"));
    }

    #[test]
    fn test_deserialize_new_marker() {
        let new: NewMarker = serde_json::from_str(
            r#"{"title": "Cafe X", "spotType": "cafe", "latitude": 0, "longitude": -79.4,
                "hasWifi": true, "rating": 5}"#,
        )
        .expect("failed to deserialize");
        assert_eq!(new.latitude, Some(0.0));
        assert_eq!(new.longitude, Some(-79.4));
        assert_eq!(new.fields.spot_type.as_deref(), Some("cafe"));
        assert_eq!(new.fields.has_wifi, Some(true));
        assert_eq!(new.fields.has_outlets, None);
        assert_eq!(new.fields.rating, Some(5));
    }

    #[test(sqlx::test(
        migrations = "../db/migrations/",
        fixtures(path = "../../db/fixtures", scripts("markers"))
    ))]
    async fn test_load_all_fixtures(pool: Pool<Sqlite>) {
        let db = Database::from(pool);
        let markers = Marker::load_all(&db).await.expect("Failed to load markers");
        let titles: Vec<_> = markers.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, ["Cafe Pamenar", "Queens Park", "Robarts Library"]);
        assert_eq!(markers[2].spot_type, SpotType::Library);
        assert_eq!(markers[2].rating, Some(4));
        assert!(markers[2].is_quiet);
        assert_eq!(markers[1].notes, None);
    }

    #[test(sqlx::test(migrations = "../db/migrations/"))]
    async fn test_create_and_load(pool: Pool<Sqlite>) {
        let db = Database::from(pool);
        let mut new = new_marker("Cafe X", Some(43.6), Some(-79.4));
        new.fields.spot_type = Some("cafe".to_string());
        new.fields.has_wifi = Some(true);
        let marker = Marker::create(new, &db).await.expect("Failed to create");
        assert_eq!(marker.spot_type, SpotType::Cafe);
        assert!(marker.has_wifi);
        assert!(!marker.has_outlets);
        assert_eq!(marker.notes, None);

        let loaded = Marker::load(&marker.id, &db)
            .await
            .expect("Failed to load inserted marker");
        assert_eq!(marker, loaded);

        let all = Marker::load_all(&db).await.expect("Failed to load markers");
        assert_eq!(all, vec![marker]);
    }

    #[test(sqlx::test(migrations = "../db/migrations/"))]
    async fn test_create_zero_coordinates(pool: Pool<Sqlite>) {
        let db = Database::from(pool);
        let marker = Marker::create(new_marker("Null Island", Some(0.0), Some(0.0)), &db)
            .await
            .expect("zero coordinates should be accepted");
        assert_eq!(marker.latitude, 0.0);
        assert_eq!(marker.longitude, 0.0);
    }

    #[test(sqlx::test(migrations = "../db/migrations/"))]
    async fn test_create_missing_fields(pool: Pool<Sqlite>) {
        let db = Database::from(pool);
        let res = Marker::create(new_marker("", Some(1.0), Some(1.0)), &db).await;
        assert!(matches!(res, Err(Error::MissingField("title"))));
        let res = Marker::create(new_marker("No latitude", None, Some(1.0)), &db).await;
        assert!(matches!(res, Err(Error::MissingField("latitude"))));
        let res = Marker::create(new_marker("No longitude", Some(1.0), None), &db).await;
        assert!(matches!(res, Err(Error::MissingField("longitude"))));
        assert!(Marker::load_all(&db).await.unwrap().is_empty());
    }

    #[test(sqlx::test(migrations = "../db/migrations/"))]
    async fn test_ordering(pool: Pool<Sqlite>) {
        let db = Database::from(pool);
        for title in ["A", "B", "C"] {
            Marker::create(new_marker(title, Some(1.0), Some(2.0)), &db)
                .await
                .expect("Failed to create");
        }
        let titles: Vec<_> = Marker::load_all(&db)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.title)
            .collect();
        assert_eq!(titles, ["C", "B", "A"]);
    }

    #[test(sqlx::test(
        migrations = "../db/migrations/",
        fixtures(path = "../../db/fixtures", scripts("markers"))
    ))]
    async fn test_update_replaces_fields(pool: Pool<Sqlite>) {
        let db = Database::from(pool);
        let id = "0b7d3c2e-1f0a-4b53-9a51-3d2f6f7b0a01".to_string();
        let before = Marker::load(&id, &db).await.expect("Failed to load");
        assert!(before.has_wifi);

        let updated = Marker::update(
            &id,
            MarkerFields {
                title: Some("Robarts".to_string()),
                has_food: Some(true),
                ..Default::default()
            },
            &db,
        )
        .await
        .expect("Failed to update");
        assert_eq!(updated.title, "Robarts");
        assert_eq!(updated.spot_type, SpotType::Other);
        assert_eq!(updated.notes, None);
        assert_eq!(updated.rating, None);
        assert!(!updated.has_wifi);
        assert!(updated.has_food);
        assert_eq!(updated.id, before.id);
        assert_eq!(updated.latitude, before.latitude);
        assert_eq!(updated.longitude, before.longitude);
        assert_eq!(updated.created_at, before.created_at);

        let loaded = Marker::load(&id, &db).await.expect("Failed to load");
        assert_eq!(updated, loaded);
    }

    #[test(sqlx::test(migrations = "../db/migrations/"))]
    async fn test_update_not_found(pool: Pool<Sqlite>) {
        let db = Database::from(pool);
        let res = Marker::update(
            "does-not-exist",
            MarkerFields {
                title: Some("Ghost".to_string()),
                ..Default::default()
            },
            &db,
        )
        .await;
        assert!(matches!(res, Err(Error::MarkerNotFound(ref id)) if id == "does-not-exist"));
        assert!(Marker::load_all(&db).await.unwrap().is_empty());

        // validation happens before the lookup
        let res = Marker::update("does-not-exist", MarkerFields::default(), &db).await;
        assert!(matches!(res, Err(Error::MissingField("title"))));
    }

    #[test(sqlx::test(
        migrations = "../db/migrations/",
        fixtures(path = "../../db/fixtures", scripts("markers"))
    ))]
    async fn test_delete_twice(pool: Pool<Sqlite>) {
        let db = Database::from(pool);
        let id = "0b7d3c2e-1f0a-4b53-9a51-3d2f6f7b0a02".to_string();
        let before = Marker::load(&id, &db).await.expect("Failed to load");
        let deleted = before.delete(&db).await.expect("Failed to delete");
        assert_eq!(before, deleted);
        assert!(matches!(
            Marker::delete_id(&id, &db).await,
            Err(Error::MarkerNotFound(_))
        ));
        assert!(matches!(
            Marker::load(&id, &db).await,
            Err(Error::MarkerNotFound(_))
        ));
        assert_eq!(Marker::load_all(&db).await.unwrap().len(), 2);
    }
}
