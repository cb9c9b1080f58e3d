// src/import.rs
use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::path::Path;

use crate::favorites::{self, Category, ExerciseForm, FavoriteExercise, Intensity};
use crate::store::KeyValueStore;
use crate::validation::ValidationError;

/// Muscle list given to imported exercises that don't name any.
pub const DEFAULT_IMPORT_MUSCLES: &[&str] = &["Full Body"];

/// Parses pasted or file text into a form. Requires a JSON object with a non-empty `name`.
///
/// Missing `category` becomes `gym`; a category this app doesn't know becomes a custom
/// category with that label. A missing or empty muscle list becomes `["Full Body"]`.
pub fn parse_exercise_json(text: &str) -> Result<ExerciseForm, ValidationError> {
    let value: Value = serde_json::from_str(text.trim()).map_err(|e| {
        ValidationError::InvalidJson(format!("The text could not be parsed as JSON ({e})."))
    })?;
    let Value::Object(object) = value else {
        return Err(ValidationError::InvalidJson(
            "Expected a single exercise object.".to_string(),
        ));
    };

    let name = string_field(&object, "name").ok_or_else(|| {
        ValidationError::InvalidJson("The exercise must have a \"name\" field.".to_string())
    })?;

    let (category, custom_category) = match string_field(&object, "category") {
        None => (Category::Gym, String::new()),
        Some(raw) => match raw.parse::<Category>() {
            Ok(Category::Custom) => (
                Category::Custom,
                string_field(&object, "customCategory").unwrap_or_default(),
            ),
            Ok(category) => (category, String::new()),
            Err(_) => (Category::Custom, raw),
        },
    };

    let primary_muscles = list_field(&object, "primaryMuscles");
    let secondary_muscles = list_field(&object, "secondaryMuscles");
    let mut muscle_groups = list_field(&object, "muscleGroups");
    if muscle_groups.is_empty() && primary_muscles.is_empty() && secondary_muscles.is_empty() {
        muscle_groups = DEFAULT_IMPORT_MUSCLES.iter().map(ToString::to_string).collect();
    }

    Ok(ExerciseForm {
        id: string_field(&object, "id"),
        name,
        category,
        custom_category,
        muscle_groups,
        primary_muscles,
        secondary_muscles,
        instructions: list_field(&object, "instructions").join("\n"),
        notes: string_field(&object, "notes").unwrap_or_default(),
        alternatives: list_field(&object, "alternatives"),
        estimated_calories: object.get("estimatedCalories").and_then(as_calories),
        duration: string_field(&object, "duration").unwrap_or_default(),
        intensity: string_field(&object, "intensity").and_then(|s| s.parse::<Intensity>().ok()),
    })
}

/// Parses `text` and appends it through the regular duplicate-checked add path.
pub fn import_from_text(store: &dyn KeyValueStore, text: &str) -> Result<FavoriteExercise> {
    let form = parse_exercise_json(text)?;
    favorites::add_favorite(store, form)
}

/// Reads a picked `.json`/`.txt` file and imports it.
pub fn import_from_file(store: &dyn KeyValueStore, path: &Path) -> Result<FavoriteExercise> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read import file {path:?}"))?;
    import_from_text(store, &text)
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Accepts either an array of strings or a single (possibly newline-delimited) string.
fn list_field(object: &Map<String, Value>, key: &str) -> Vec<String> {
    match object.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
            .collect(),
        Some(Value::String(text)) => text
            .lines()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn as_calories(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| *v >= 0.0).map(|v| v.round() as u32),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
