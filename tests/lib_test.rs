use anyhow::Result;
use chrono::Utc;
use std::collections::HashSet;
use std::io::Write;

use fitness_planner_lib::{
    store::{EQUIPMENT_PREFERENCES_KEY, FAVORITE_EXERCISES_KEY},
    AppService, BlockSelection, BlockStatus, Category, Config, ConfigError,
    EquipmentPreferencesAnswers, EquipmentTag,
    ExerciseForm, FavoriteError, FavoriteFilters, FavoriteToggle, KeyValueStore, Palette,
    RestTime, SqliteStore, ValidationError, WizardOutcome, WizardState, WizardStep,
};

// Helper function to create a test service with an in-memory store
fn create_test_service() -> Result<AppService> {
    let store = SqliteStore::open_in_memory()?;

    Ok(AppService {
        config: Config::default(),
        store: Box::new(store),
        store_path: ":memory:".into(),
        config_path: "test_config.toml".into(),
    })
}

fn gym_form(name: &str, primary: &[&str]) -> ExerciseForm {
    ExerciseForm {
        name: name.to_string(),
        category: Category::Gym,
        primary_muscles: primary.iter().map(ToString::to_string).collect(),
        ..Default::default()
    }
}

const PROGRAM_JSON: &str = r#"{
    "name": "Strength Base",
    "mesocycles": [{
        "name": "Spring",
        "routines": [{
            "id": "upper-lower",
            "name": "Upper Lower",
            "blocks": [
                {"name": "Accumulation", "weeks": 2, "days": [
                    {"name": "Upper", "focus": "Push/Pull", "exercises": [{"name": "Bench Press", "sets": 4, "reps": "8"}]},
                    {"name": "Lower"}
                ]},
                {"name": "Peak", "weeks": 1, "days": [{"name": "Full"}]}
            ]
        }]
    }]
}"#;

fn duration_representations(answers: &EquipmentPreferencesAnswers) -> usize {
    usize::from(answers.ai_optimized_duration)
        + usize::from(answers.workout_duration > 0)
        + usize::from(!answers.custom_duration.is_empty())
}

fn write_program() -> Result<tempfile::NamedTempFile> {
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(PROGRAM_JSON.as_bytes())?;
    Ok(file)
}

#[test]
fn test_new_favorite_is_trimmed_and_stamped() -> Result<()> {
    let service = create_test_service()?;
    let before = Utc::now();

    let exercise = service.add_favorite(gym_form(" Deadlifts ", &["Hamstrings"]))?;

    assert_eq!(exercise.name, "Deadlifts");
    assert!(!exercise.id.is_empty());
    assert!(exercise.added_at >= before && exercise.added_at <= Utc::now());
    assert!(exercise.muscle_groups.contains(&"Hamstrings".to_string()));

    let listed = service.list_favorites(&FavoriteFilters::default());
    assert_eq!(listed, vec![exercise]);
    Ok(())
}

#[test]
fn test_duplicate_insert_leaves_stored_array_unchanged() -> Result<()> {
    let service = create_test_service()?;
    service.add_favorite(gym_form("Deadlifts", &["Hamstrings"]))?;
    let before = service.store.get(FAVORITE_EXERCISES_KEY)?;

    let err = service
        .add_favorite(gym_form("  DEADLIFTS", &["Glutes"]))
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ValidationError>(),
        Some(ValidationError::DuplicateExercise(_))
    ));
    assert_eq!(service.store.get(FAVORITE_EXERCISES_KEY)?, before);
    Ok(())
}

#[test]
fn test_edit_keeps_identity_and_allows_own_name() -> Result<()> {
    let service = create_test_service()?;
    let original = service.add_favorite(gym_form("Bench Press", &["Chest"]))?;

    let mut form = ExerciseForm::from(&original);
    form.name = "BENCH PRESS".to_string();
    form.notes = "Pause on chest".to_string();
    let edited = service.edit_favorite("bench press", form)?;

    assert_eq!(edited.id, original.id);
    assert_eq!(edited.added_at, original.added_at);
    assert_eq!(edited.name, "BENCH PRESS");
    assert_eq!(edited.notes.as_deref(), Some("Pause on chest"));
    assert_eq!(service.list_favorites(&FavoriteFilters::default()).len(), 1);
    Ok(())
}

#[test]
fn test_list_filters_and_remove() -> Result<()> {
    let service = create_test_service()?;
    service.add_favorite(gym_form("Squat", &["Quads", "Glutes"]))?;
    service.add_favorite(ExerciseForm {
        name: "Rowing".to_string(),
        category: Category::Cardio,
        muscle_groups: vec!["Full Body".to_string()],
        ..Default::default()
    })?;
    service.add_favorite(ExerciseForm {
        name: "Farmer Carry".to_string(),
        category: Category::Custom,
        custom_category: "Strongman".to_string(),
        ..Default::default()
    })?;

    let cardio = service.list_favorites(&FavoriteFilters {
        category: Some(Category::Cardio),
        ..Default::default()
    });
    assert_eq!(cardio.len(), 1);
    assert_eq!(cardio[0].name, "Rowing");

    let glutes = service.list_favorites(&FavoriteFilters {
        muscle: Some("glute"),
        ..Default::default()
    });
    assert_eq!(glutes.len(), 1);
    assert_eq!(glutes[0].name, "Squat");

    let carry = service.get_favorite("farmer carry")?;
    assert_eq!(carry.category_label(), "Strongman");

    let removed = service.remove_favorite(&carry.id)?;
    assert_eq!(removed.name, "Farmer Carry");
    let err = service.get_favorite("Farmer Carry").unwrap_err();
    assert!(matches!(
        err.downcast_ref::<FavoriteError>(),
        Some(FavoriteError::NotFound(_))
    ));
    Ok(())
}

#[test]
fn test_ids_repaired_on_read_and_repair_is_stable() -> Result<()> {
    let service = create_test_service()?;
    service.store.set(
        FAVORITE_EXERCISES_KEY,
        r#"[{"name":"A","addedAt":"2024-05-01T10:00:00Z"},
            {"id":"same","name":"B","addedAt":"2024-05-01T10:00:00Z"},
            {"id":"same","name":"C","addedAt":"2024-05-01T10:00:00Z"},
            {"id":"","name":"D","addedAt":"2024-05-01T10:00:00Z"}]"#,
    )?;

    let first = service.list_favorites(&FavoriteFilters::default());
    let ids: HashSet<&str> = first.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids.len(), 4);
    assert!(!ids.contains(""));
    assert_eq!(first[1].id, "same");

    let stored_after_first = service.store.get(FAVORITE_EXERCISES_KEY)?;
    let second = service.list_favorites(&FavoriteFilters::default());
    assert_eq!(first, second);
    assert_eq!(service.store.get(FAVORITE_EXERCISES_KEY)?, stored_after_first);
    Ok(())
}

#[test]
fn test_import_without_name_is_invalid_json() -> Result<()> {
    let service = create_test_service()?;
    service.add_favorite(gym_form("Deadlifts", &["Hamstrings"]))?;
    let before = service.store.get(FAVORITE_EXERCISES_KEY)?;

    let err = service
        .import_favorite_text(r#"{"category":"cardio"}"#)
        .unwrap_err();
    let validation = err
        .downcast_ref::<ValidationError>()
        .expect("validation error");
    assert_eq!(validation.title(), "Invalid JSON");
    assert_eq!(service.store.get(FAVORITE_EXERCISES_KEY)?, before);
    Ok(())
}

#[test]
fn test_import_from_file_and_export() -> Result<()> {
    let service = create_test_service()?;
    let dir = tempfile::tempdir()?;
    let import_path = dir.path().join("burpee.json");
    std::fs::write(
        &import_path,
        r#"{"name":"Burpee","category":"bodyweight","instructions":"Squat\nKick back\nJump","estimatedCalories":12}"#,
    )?;

    let imported = service.import_favorite_file(&import_path)?;
    assert_eq!(imported.category, Category::Bodyweight);
    assert_eq!(imported.muscle_groups, vec!["Full Body"]);
    assert_eq!(imported.instruction_steps(), vec!["Squat", "Kick back", "Jump"]);
    assert_eq!(imported.estimated_calories, Some(12));

    let export_path = dir.path().join("favorites.json");
    assert_eq!(service.export_favorites(&export_path)?, 1);
    let exported: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&export_path)?)?;
    assert_eq!(exported[0]["name"], "Burpee");
    assert_eq!(exported[0]["muscleGroups"][0], "Full Body");
    assert!(exported[0]["addedAt"].is_string());
    Ok(())
}

#[test]
fn test_toggle_favorite_from_detail() -> Result<()> {
    let service = create_test_service()?;
    let preview = gym_form("Pull-up", &["Lats"]).preview();
    assert!(!service.is_favorite(&preview));

    let added = match service.toggle_favorite(&preview)? {
        FavoriteToggle::Added(added) => added,
        FavoriteToggle::Removed(_) => panic!("expected the exercise to be added"),
    };
    assert!(service.is_favorite(&added));

    assert!(matches!(
        service.toggle_favorite(&preview)?,
        FavoriteToggle::Removed(_)
    ));
    assert!(service.list_favorites(&FavoriteFilters::default()).is_empty());
    Ok(())
}

#[test]
fn test_wizard_requires_equipment_on_first_step() -> Result<()> {
    let service = create_test_service()?;
    let mut wizard = service.preferences_wizard();

    let err = wizard.next().unwrap_err();
    assert_eq!(err.title(), "Equipment Required");
    assert_eq!(wizard.current_step(), Some(0));

    wizard.toggle_equipment(EquipmentTag::Dumbbells);
    wizard.next()?;
    assert_eq!(wizard.current_step(), Some(1));
    assert_eq!(service.saved_preferences()?.map(|a| a.current_step), Some(1));
    Ok(())
}

#[test]
fn test_ai_duration_clears_fixed_duration_without_restoring() -> Result<()> {
    let service = create_test_service()?;
    let mut wizard = service.preferences_wizard();
    wizard.select_fixed_duration(45)?;
    assert_eq!(wizard.answers().workout_duration, 45);

    wizard.set_ai_duration(true);
    assert!(wizard.answers().ai_optimized_duration);
    assert_eq!(wizard.answers().workout_duration, 0);

    wizard.set_ai_duration(false);
    assert!(!wizard.answers().ai_optimized_duration);
    assert_eq!(wizard.answers().workout_duration, 0);
    assert!(wizard.answers().custom_duration.is_empty());
    Ok(())
}

#[test]
fn test_duration_representations_stay_exclusive() -> Result<()> {
    let service = create_test_service()?;
    let mut wizard = service.preferences_wizard();

    wizard.set_custom_duration("40");
    assert_eq!(duration_representations(wizard.answers()), 1);
    wizard.select_fixed_duration(90)?;
    assert_eq!(duration_representations(wizard.answers()), 1);
    wizard.set_ai_duration(true);
    assert_eq!(duration_representations(wizard.answers()), 1);
    wizard.set_custom_duration("25");
    assert_eq!(duration_representations(wizard.answers()), 1);
    assert!(!wizard.answers().ai_optimized_duration);
    Ok(())
}

#[test]
fn test_wizard_entry_state_follows_completed_at() -> Result<()> {
    let service = create_test_service()?;
    {
        let mut wizard = service.preferences_wizard();
        wizard.toggle_equipment(EquipmentTag::BodyweightOnly);
        wizard.next()?;
        wizard.select_fixed_duration(30)?;
        wizard.select_rest_time(RestTime::Short);
        wizard.next()?;
    }

    // Draft: resumes on the saved step.
    let mut wizard = service.preferences_wizard();
    assert_eq!(
        wizard.state(),
        WizardState::Step(WizardStep::ExercisePreferences)
    );
    assert_eq!(wizard.next()?, WizardState::Results);
    assert_eq!(wizard.save_and_exit(), WizardOutcome::Exit);

    let answers = service.saved_preferences()?.expect("saved answers");
    assert!(answers.completed_at.is_some());
    assert_eq!(service.preferences_wizard().state(), WizardState::Results);

    service.reset_preferences()?;
    assert!(service.store.get(EQUIPMENT_PREFERENCES_KEY)?.is_none());
    assert_eq!(
        service.preferences_wizard().state(),
        WizardState::Step(WizardStep::Equipment)
    );
    Ok(())
}

#[test]
fn test_block_progress_flow() -> Result<()> {
    let service = create_test_service()?;
    let file = write_program()?;
    let program = service.load_program(Some(file.path()))?;
    let routine = program.find_routine("upper lower")?;
    let (_, accumulation) = routine.find_block("1")?;
    let (peak_index, peak) = routine.find_block("peak")?;

    assert_eq!(service.active_block(routine), 0);
    assert_eq!(service.block_status(routine, 0), BlockStatus::Active);
    assert_eq!(service.block_status(routine, peak_index), BlockStatus::Upcoming);

    for week in 1..=2 {
        assert!(service.toggle_day(accumulation, week, "Upper")?);
        assert!(service.toggle_day(accumulation, week, "lower")?);
    }
    assert!(service.block_progress(accumulation).is_complete());

    service.set_active_block(routine, peak_index)?;
    assert_eq!(service.block_status(routine, 0), BlockStatus::Completed);
    assert_eq!(service.block_status(routine, peak_index), BlockStatus::Active);

    let selection = BlockSelection {
        routine,
        block: peak,
        week: 1,
    };
    let days = service.week_days(&selection)?;
    assert_eq!(days.len(), 1);
    assert!(!days[0].completed);

    assert!(service.toggle_day(accumulation, 3, "Upper").is_err());
    assert!(service.set_active_block(routine, 5).is_err());

    service.reset_block(accumulation)?;
    assert_eq!(service.block_progress(accumulation).completed, 0);
    assert_eq!(service.week_progress(accumulation, 1).total, 2);
    Ok(())
}

#[test]
fn test_load_program_needs_a_path() -> Result<()> {
    let service = create_test_service()?;
    let err = service.load_program(None).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::ProgramNotSet)
    ));
    Ok(())
}

#[test]
fn test_config_setters_persist() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut service = create_test_service()?;
    service.config_path = dir.path().join("config.toml");

    service.set_palette(Palette::Pink)?;
    service.set_header_color("darkcyan")?;
    let file = write_program()?;
    service.set_default_program(Some(file.path().to_path_buf()))?;

    let saved: Config = toml::from_str(&std::fs::read_to_string(&service.config_path)?)?;
    assert_eq!(saved.theme.palette, Palette::Pink);
    assert_eq!(saved.theme.header_color, "DarkCyan");
    assert_eq!(service.load_program(None)?.name, "Strength Base");

    assert!(matches!(
        service.set_header_color("octarine"),
        Err(ConfigError::InvalidColor(_))
    ));
    Ok(())
}

#[test]
fn test_sqlite_store_persists_on_disk() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("data").join("store.sqlite");
    {
        let store = SqliteStore::open(&path)?;
        store.set("activeBlock_upper-lower", "1")?;
        store.set("activeBlock_upper-lower", "0")?;
    }
    let store = SqliteStore::open(&path)?;
    assert_eq!(store.get("activeBlock_upper-lower")?.as_deref(), Some("0"));
    store.remove("activeBlock_upper-lower")?;
    assert_eq!(store.get("activeBlock_upper-lower")?, None);
    Ok(())
}
