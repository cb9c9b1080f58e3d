// src/favorites.rs
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use strum_macros::{Display, EnumIter, EnumString};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::store::{self, KeyValueStore, FAVORITE_EXERCISES_KEY};
use crate::validation::ValidationError;

#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumIter, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Category {
    #[default]
    #[serde(alias = "strength")]
    #[strum(to_string = "gym", serialize = "strength")]
    Gym,
    Bodyweight,
    Flexibility,
    Cardio,
    Custom,
}

impl Category {
    /// Gym and bodyweight exercises track primary/secondary muscles separately.
    #[must_use]
    pub const fn splits_muscles(self) -> bool {
        matches!(self, Self::Gym | Self::Bodyweight)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Gym => "Gym",
            Self::Bodyweight => "Bodyweight",
            Self::Flexibility => "Flexibility",
            Self::Cardio => "Cardio",
            Self::Custom => "Custom",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, EnumIter, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Intensity {
    Low,
    Moderate,
    High,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteExercise {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_category: Option<String>,
    #[serde(default)]
    pub muscle_groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_muscles: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_muscles: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternatives: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_calories: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<Intensity>,
    #[serde(default = "Utc::now")]
    pub added_at: DateTime<Utc>,
}

impl FavoriteExercise {
    /// Category as shown to the user; custom categories show their own name.
    #[must_use]
    pub fn category_label(&self) -> &str {
        match (self.category, self.custom_category.as_deref()) {
            (Category::Custom, Some(custom)) if !custom.trim().is_empty() => custom,
            (category, _) => category.label(),
        }
    }

    /// Ordered instruction steps, blank lines dropped.
    #[must_use]
    pub fn instruction_steps(&self) -> Vec<&str> {
        self.instructions
            .as_deref()
            .map(|text| {
                text.lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Primary movers, falling back to the legacy list for records written before the split.
    #[must_use]
    pub fn primary_or_legacy_muscles(&self) -> &[String] {
        match &self.primary_muscles {
            Some(primary) if !primary.is_empty() => primary,
            _ => &self.muscle_groups,
        }
    }

    #[must_use]
    pub fn secondary(&self) -> &[String] {
        self.secondary_muscles.as_deref().unwrap_or_default()
    }

    fn mentions_muscle(&self, muscle: &str) -> bool {
        let needle = muscle.trim().to_lowercase();
        self.muscle_groups
            .iter()
            .chain(self.primary_muscles.iter().flatten())
            .chain(self.secondary_muscles.iter().flatten())
            .any(|m| m.to_lowercase().contains(&needle))
    }
}

/// Raw form input shared by the manual entry, edit and import paths.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExerciseForm {
    /// Id supplied from outside (imports). Ignored when editing.
    pub id: Option<String>,
    pub name: String,
    pub category: Category,
    pub custom_category: String,
    pub muscle_groups: Vec<String>,
    pub primary_muscles: Vec<String>,
    pub secondary_muscles: Vec<String>,
    /// Newline-delimited steps.
    pub instructions: String,
    pub notes: String,
    pub alternatives: Vec<String>,
    pub estimated_calories: Option<u32>,
    pub duration: String,
    pub intensity: Option<Intensity>,
}

impl ExerciseForm {
    /// Checks the required fields. Duplicate names are checked against the stored list separately.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::NameRequired);
        }
        if self.category == Category::Custom && self.custom_category.trim().is_empty() {
            return Err(ValidationError::CustomCategoryRequired);
        }
        if self.category != Category::Custom && self.all_muscles().is_empty() {
            return Err(ValidationError::MuscleGroupsRequired);
        }
        Ok(())
    }

    /// The record this form would produce, without storing it.
    #[must_use]
    pub fn preview(&self) -> FavoriteExercise {
        let id = self.id.clone().unwrap_or_else(generate_id);
        self.clone().into_record(id, Utc::now())
    }

    fn all_muscles(&self) -> Vec<String> {
        union_ignore_case([
            self.primary_muscles.as_slice(),
            self.secondary_muscles.as_slice(),
            self.muscle_groups.as_slice(),
        ])
    }

    fn into_record(self, id: String, added_at: DateTime<Utc>) -> FavoriteExercise {
        let muscle_groups = self.all_muscles();
        let (primary_muscles, secondary_muscles) = if self.category.splits_muscles() {
            (
                non_empty(clean_list(&self.primary_muscles)),
                non_empty(clean_list(&self.secondary_muscles)),
            )
        } else {
            (None, None)
        };
        let instructions = self
            .instructions
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        FavoriteExercise {
            id,
            name: self.name.trim().to_string(),
            category: self.category,
            custom_category: if self.category == Category::Custom {
                trimmed(&self.custom_category)
            } else {
                None
            },
            muscle_groups,
            primary_muscles,
            secondary_muscles,
            instructions: trimmed(&instructions),
            notes: trimmed(&self.notes),
            alternatives: non_empty(clean_list(&self.alternatives)),
            estimated_calories: self.estimated_calories,
            duration: trimmed(&self.duration),
            intensity: self.intensity,
            added_at,
        }
    }
}

// Prefills the edit form from a stored record.
impl From<&FavoriteExercise> for ExerciseForm {
    fn from(exercise: &FavoriteExercise) -> Self {
        let (primary_muscles, secondary_muscles, muscle_groups) = if exercise.category.splits_muscles() {
            (
                exercise.primary_or_legacy_muscles().to_vec(),
                exercise.secondary().to_vec(),
                Vec::new(),
            )
        } else {
            (Vec::new(), Vec::new(), exercise.muscle_groups.clone())
        };
        Self {
            id: Some(exercise.id.clone()),
            name: exercise.name.clone(),
            category: exercise.category,
            custom_category: exercise.custom_category.clone().unwrap_or_default(),
            muscle_groups,
            primary_muscles,
            secondary_muscles,
            instructions: exercise.instructions.clone().unwrap_or_default(),
            notes: exercise.notes.clone().unwrap_or_default(),
            alternatives: exercise.alternatives.clone().unwrap_or_default(),
            estimated_calories: exercise.estimated_calories,
            duration: exercise.duration.clone().unwrap_or_default(),
            intensity: exercise.intensity,
        }
    }
}

/// Which path a submitted form takes.
#[derive(Debug, Clone, PartialEq)]
pub enum ExerciseFormMode {
    Create,
    Edit(FavoriteExercise),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FavoriteToggle {
    Added(FavoriteExercise),
    Removed(FavoriteExercise),
}

#[derive(Error, Debug)]
pub enum FavoriteError {
    #[error("Favorite exercise not found: {0}")]
    NotFound(String),
    #[error("Stored favorites are unreadable: {0}")]
    Unreadable(String),
}

#[derive(Default, Debug)]
pub struct FavoriteFilters<'a> {
    pub category: Option<Category>,
    pub muscle: Option<&'a str>,
    pub search: Option<&'a str>,
}

/// The persisted array, kept as raw JSON so records this build cannot decode survive rewrites.
struct StoredFavorites {
    records: Vec<Value>,
}

impl StoredFavorites {
    /// Strict read used before every mutation: an unreadable array is never overwritten.
    /// Repaired ids are written back at once so later reads see the same ids.
    fn read(store: &dyn KeyValueStore) -> Result<Self> {
        let value: Option<Value> = store::get_json(store, FAVORITE_EXERCISES_KEY)
            .context("Failed to read favorite exercises")?;
        let records = match value {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(records)) => records,
            Some(other) => {
                return Err(FavoriteError::Unreadable(format!(
                    "expected a JSON array, found {}",
                    json_kind(&other)
                ))
                .into())
            }
        };
        let mut stored = Self { records };
        if repair_ids(&mut stored.records) {
            info!("Repaired missing or duplicate favorite exercise ids");
            stored.write(store)?;
        }
        Ok(stored)
    }

    fn exercises(&self) -> Vec<FavoriteExercise> {
        self.records
            .iter()
            .enumerate()
            .filter_map(|(index, record)| {
                match serde_json::from_value::<FavoriteExercise>(record.clone()) {
                    Ok(exercise) => Some(exercise),
                    Err(e) => {
                        warn!(index, error = %e, "Skipping malformed favorite exercise record");
                        None
                    }
                }
            })
            .collect()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.records
            .iter()
            .position(|record| record.get("id").and_then(Value::as_str) == Some(id))
    }

    fn write(&self, store: &dyn KeyValueStore) -> Result<()> {
        store::set_json(store, FAVORITE_EXERCISES_KEY, &self.records)
            .context("Failed to save favorite exercises. Please try again.")
    }

    fn remove_at(&mut self, store: &dyn KeyValueStore, index: usize) -> Result<FavoriteExercise> {
        let removed = self.records.remove(index);
        self.write(store)?;
        let removed: FavoriteExercise = serde_json::from_value(removed)
            .map_err(|e| FavoriteError::Unreadable(e.to_string()))?;
        info!(id = %removed.id, name = %removed.name, "Removed favorite exercise");
        Ok(removed)
    }
}

#[must_use]
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Gives every record a usable unique id. A record keeps its id only if the id is a
/// non-empty string not used by an earlier record; otherwise a fresh id is assigned.
/// Returns `true` when anything changed.
pub fn repair_ids(records: &mut [Value]) -> bool {
    let mut seen: HashSet<String> = HashSet::new();
    let mut changed = false;

    for record in records.iter_mut() {
        let Some(object) = record.as_object_mut() else {
            continue;
        };
        let keep = match object.get("id") {
            Some(Value::String(id)) if !id.trim().is_empty() && !seen.contains(id) => Some(id.clone()),
            _ => None,
        };
        let id = match keep {
            Some(id) => id,
            None => {
                let mut fresh = generate_id();
                while seen.contains(&fresh) {
                    fresh = generate_id();
                }
                object.insert("id".to_string(), Value::String(fresh.clone()));
                changed = true;
                fresh
            }
        };
        seen.insert(id);
    }
    changed
}

/// Loads the favorites list for display. Never fails: read or parse problems are logged and
/// an empty list is returned. Repaired ids are written back immediately.
pub fn load_favorites(store: &dyn KeyValueStore) -> Vec<FavoriteExercise> {
    let raw: Option<Value> = match store::get_json(store, FAVORITE_EXERCISES_KEY) {
        Ok(value) => value,
        Err(e) => {
            error!(error = %e, "Failed to load favorite exercises");
            return Vec::new();
        }
    };
    let records = match raw {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Array(records)) => records,
        Some(other) => {
            error!(found = json_kind(&other), "Favorite exercises are not stored as an array");
            return Vec::new();
        }
    };

    let mut stored = StoredFavorites { records };
    if repair_ids(&mut stored.records) {
        info!("Repaired missing or duplicate favorite exercise ids");
        if let Err(e) = stored.write(store) {
            error!(error = %e, "Failed to write repaired favorite exercises");
        }
    }
    stored.exercises()
}

/// Finds a record whose trimmed, lowercased name matches `name`, ignoring `exclude_id`.
pub fn find_duplicate<'a>(
    exercises: &'a [FavoriteExercise],
    name: &str,
    exclude_id: Option<&str>,
) -> Option<&'a FavoriteExercise> {
    let wanted = name.trim().to_lowercase();
    exercises.iter().find(|exercise| {
        Some(exercise.id.as_str()) != exclude_id && exercise.name.trim().to_lowercase() == wanted
    })
}

/// Resolves an identifier to a record: exact id first, then case-insensitive name.
pub fn resolve_favorite<'a>(
    exercises: &'a [FavoriteExercise],
    identifier: &str,
) -> Option<&'a FavoriteExercise> {
    let identifier = identifier.trim();
    exercises
        .iter()
        .find(|exercise| exercise.id == identifier)
        .or_else(|| find_duplicate(exercises, identifier, None))
}

pub fn filter_favorites<'a>(
    exercises: &'a [FavoriteExercise],
    filters: &FavoriteFilters,
) -> Vec<&'a FavoriteExercise> {
    exercises
        .iter()
        .filter(|exercise| filters.category.map_or(true, |c| exercise.category == c))
        .filter(|exercise| filters.muscle.map_or(true, |m| exercise.mentions_muscle(m)))
        .filter(|exercise| {
            filters.search.map_or(true, |s| {
                exercise.name.to_lowercase().contains(&s.trim().to_lowercase())
            })
        })
        .collect()
}

/// Validates the form, rejects duplicate names and appends a new record.
pub fn add_favorite(store: &dyn KeyValueStore, form: ExerciseForm) -> Result<FavoriteExercise> {
    form.validate()?;
    let mut stored = StoredFavorites::read(store)?;
    let existing = stored.exercises();
    if let Some(duplicate) = find_duplicate(&existing, &form.name, None) {
        return Err(ValidationError::DuplicateExercise(duplicate.name.clone()).into());
    }

    // A supplied id survives only if no stored record already uses it.
    let id = form
        .id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty() && stored.position(id).is_none())
        .map_or_else(generate_id, ToString::to_string);
    let exercise = form.into_record(id, Utc::now());
    stored
        .records
        .push(serde_json::to_value(&exercise).context("Failed to encode favorite exercise")?);
    stored.write(store)?;
    info!(id = %exercise.id, name = %exercise.name, "Added favorite exercise");
    Ok(exercise)
}

/// Replaces the record with `id`, keeping its id and `addedAt`.
pub fn update_favorite(
    store: &dyn KeyValueStore,
    id: &str,
    form: ExerciseForm,
) -> Result<FavoriteExercise> {
    form.validate()?;
    let mut stored = StoredFavorites::read(store)?;
    let index = stored
        .position(id)
        .ok_or_else(|| FavoriteError::NotFound(id.to_string()))?;
    let existing = stored.exercises();
    if let Some(duplicate) = find_duplicate(&existing, &form.name, Some(id)) {
        return Err(ValidationError::DuplicateExercise(duplicate.name.clone()).into());
    }

    let added_at = existing
        .iter()
        .find(|exercise| exercise.id == id)
        .map_or_else(Utc::now, |exercise| exercise.added_at);
    let exercise = form.into_record(id.to_string(), added_at);
    stored.records[index] =
        serde_json::to_value(&exercise).context("Failed to encode favorite exercise")?;
    stored.write(store)?;
    info!(id, name = %exercise.name, "Updated favorite exercise");
    Ok(exercise)
}

/// Removes the record with `id` and rewrites the list.
pub fn remove_favorite(store: &dyn KeyValueStore, id: &str) -> Result<FavoriteExercise> {
    let mut stored = StoredFavorites::read(store)?;
    let index = stored
        .position(id)
        .ok_or_else(|| FavoriteError::NotFound(id.to_string()))?;
    stored.remove_at(store, index)
}

/// Create or edit depending on where the form was opened from.
pub fn submit_form(
    store: &dyn KeyValueStore,
    mode: &ExerciseFormMode,
    form: ExerciseForm,
) -> Result<FavoriteExercise> {
    match mode {
        ExerciseFormMode::Create => add_favorite(store, form),
        ExerciseFormMode::Edit(original) => update_favorite(store, &original.id, form),
    }
}

/// Heart button on the detail screen: removes the exercise if it is already a favorite
/// (matched by id, then name), otherwise adds it.
pub fn toggle_favorite(store: &dyn KeyValueStore, exercise: &FavoriteExercise) -> Result<FavoriteToggle> {
    let mut stored = StoredFavorites::read(store)?;
    let existing = stored.exercises();
    let index = existing
        .iter()
        .find(|e| e.id == exercise.id)
        .or_else(|| find_duplicate(&existing, &exercise.name, None))
        .and_then(|current| stored.position(&current.id));

    match index {
        Some(index) => stored.remove_at(store, index).map(FavoriteToggle::Removed),
        None => add_favorite(store, ExerciseForm::from(exercise)).map(FavoriteToggle::Added),
    }
}

fn clean_list(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Ordered union of the lists, de-duplicated case-insensitively. First spelling wins.
fn union_ignore_case<const N: usize>(lists: [&[String]; N]) -> Vec<String> {
    let mut seen = HashSet::new();
    lists
        .into_iter()
        .flat_map(clean_list)
        .filter(|item| seen.insert(item.to_lowercase()))
        .collect()
}

fn non_empty(items: Vec<String>) -> Option<Vec<String>> {
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

fn trimmed(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
