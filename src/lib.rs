use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

// --- Declare modules ---
mod config;
pub mod favorites;
pub mod import;
pub mod mesocycle;
pub mod preferences;
pub mod store;
mod validation;

// --- Expose public types ---
pub use config::{
    get_config_path as get_config_path_util, load as load_config_util, parse_color,
    save as save_config_util, Config, Error as ConfigError, Palette, StandardColor, Theme,
};
pub use favorites::{
    Category, ExerciseForm, ExerciseFormMode, FavoriteError, FavoriteExercise, FavoriteFilters,
    FavoriteToggle, Intensity,
};
pub use mesocycle::{
    Block, BlockSelection, BlockStatus, DayStatus, Error as MesocycleError, Program, Progress,
    Routine,
};
pub use preferences::{
    EquipmentPreferencesAnswers, EquipmentTag, ExplanationDetail, PreferencesWizard, RestTime,
    WizardOutcome, WizardState, WizardStep,
};
pub use store::{Error as StoreError, KeyValueStore, MemoryStore, SqliteStore};
pub use validation::ValidationError;

pub struct AppService {
    pub config: Config,
    pub store: Box<dyn KeyValueStore>,
    pub store_path: PathBuf,
    pub config_path: PathBuf,
}

impl AppService {
    /// Initializes the application service.
    /// # Errors
    /// Returns `anyhow::Error` if config/store path determination, loading, or opening fails.
    pub fn initialize() -> Result<Self> {
        let config_path =
            config::get_config_path().context("Failed to determine configuration file path")?;
        let config = config::load(&config_path)
            .with_context(|| format!("Failed to load config from {config_path:?}"))?;

        let store_path = match &config.store_path {
            Some(path) => path.clone(),
            None => store::get_store_path().context("Failed to determine store path")?,
        };
        let store = SqliteStore::open(&store_path)
            .with_context(|| format!("Failed to open store at {store_path:?}"))?;

        Ok(Self {
            config,
            store: Box::new(store),
            store_path,
            config_path,
        })
    }

    pub fn get_config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn get_store_path(&self) -> &Path {
        &self.store_path
    }

    fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    /// Saves the current configuration state.
    /// # Errors
    /// Returns `ConfigError` if saving fails.
    pub fn save_config(&self) -> Result<(), ConfigError> {
        config::save(&self.config_path, &self.config)
    }

    /// Switches the app-wide palette.
    /// # Errors
    /// Returns `ConfigError` variants if saving fails.
    pub fn set_palette(&mut self, palette: Palette) -> Result<(), ConfigError> {
        self.config.theme.palette = palette;
        self.save_config()
    }

    /// Sets the table header color used with the default palette.
    /// # Errors
    /// - `ConfigError::InvalidColor` if the name is not a known color.
    /// - `ConfigError` variants if saving fails.
    pub fn set_header_color(&mut self, color: &str) -> Result<(), ConfigError> {
        let parsed = parse_color(color)?;
        self.config.theme.header_color = format!("{parsed:?}");
        self.save_config()
    }

    /// Sets (or clears) the program file used when no `--program` is given.
    /// # Errors
    /// Returns `ConfigError` variants if saving fails.
    pub fn set_default_program(&mut self, path: Option<PathBuf>) -> Result<(), ConfigError> {
        self.config.default_program = path;
        self.save_config()
    }

    // --- Favorites ---

    /// Lists favorites, repairing stored ids on the way.
    pub fn list_favorites(&self, filters: &FavoriteFilters) -> Vec<FavoriteExercise> {
        let all = favorites::load_favorites(self.store());
        favorites::filter_favorites(&all, filters)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Finds a favorite by id or (case-insensitive) name.
    /// # Errors
    /// Returns `FavoriteError::NotFound` if nothing matches.
    pub fn get_favorite(&self, identifier: &str) -> Result<FavoriteExercise> {
        let trimmed = identifier.trim();
        if trimmed.is_empty() {
            bail!("Exercise identifier cannot be empty.");
        }
        let all = favorites::load_favorites(self.store());
        favorites::resolve_favorite(&all, trimmed)
            .cloned()
            .ok_or_else(|| FavoriteError::NotFound(trimmed.to_string()).into())
    }

    /// Manual entry.
    /// # Errors
    /// `ValidationError` for invalid or duplicate input, storage errors otherwise.
    pub fn add_favorite(&self, form: ExerciseForm) -> Result<FavoriteExercise> {
        favorites::submit_form(self.store(), &ExerciseFormMode::Create, form)
    }

    /// Edit screen: replaces the fields of an existing favorite.
    /// # Errors
    /// `FavoriteError::NotFound`, `ValidationError`, or storage errors.
    pub fn edit_favorite(&self, identifier: &str, form: ExerciseForm) -> Result<FavoriteExercise> {
        let original = self.get_favorite(identifier)?;
        favorites::submit_form(self.store(), &ExerciseFormMode::Edit(original), form)
    }

    /// # Errors
    /// `FavoriteError::NotFound` or storage errors.
    pub fn remove_favorite(&self, identifier: &str) -> Result<FavoriteExercise> {
        let exercise = self.get_favorite(identifier)?;
        favorites::remove_favorite(self.store(), &exercise.id)
    }

    /// Detail screen favorite button.
    /// # Errors
    /// `ValidationError` when re-adding invalid data, storage errors otherwise.
    pub fn toggle_favorite(&self, exercise: &FavoriteExercise) -> Result<FavoriteToggle> {
        favorites::toggle_favorite(self.store(), exercise)
    }

    /// Whether the exercise (by id, then name) is currently a favorite.
    pub fn is_favorite(&self, exercise: &FavoriteExercise) -> bool {
        let all = favorites::load_favorites(self.store());
        all.iter().any(|e| e.id == exercise.id)
            || favorites::find_duplicate(&all, &exercise.name, None).is_some()
    }

    /// # Errors
    /// `ValidationError::InvalidJson`, duplicate names, or storage errors.
    pub fn import_favorite_text(&self, text: &str) -> Result<FavoriteExercise> {
        import::import_from_text(self.store(), text)
    }

    /// # Errors
    /// I/O errors reading the file, plus everything `import_favorite_text` returns.
    pub fn import_favorite_file(&self, path: &Path) -> Result<FavoriteExercise> {
        import::import_from_file(self.store(), path)
    }

    /// Writes the whole favorites list as pretty JSON. Returns the number of records written.
    /// # Errors
    /// Serialization or I/O errors.
    pub fn export_favorites(&self, path: &Path) -> Result<usize> {
        let all = favorites::load_favorites(self.store());
        let text =
            serde_json::to_string_pretty(&all).context("Failed to encode favorite exercises")?;
        std::fs::write(path, text).with_context(|| format!("Failed to write {path:?}"))?;
        info!(count = all.len(), path = %path.display(), "Exported favorite exercises");
        Ok(all.len())
    }

    // --- Preferences questionnaire ---

    /// Opens the questionnaire on its entry state (resume, or summary when finished).
    pub fn preferences_wizard(&self) -> PreferencesWizard<'_> {
        PreferencesWizard::load(self.store())
    }

    /// Saved answers, draft or final.
    /// # Errors
    /// Storage or decoding errors.
    pub fn saved_preferences(&self) -> Result<Option<EquipmentPreferencesAnswers>> {
        store::get_json(self.store(), store::EQUIPMENT_PREFERENCES_KEY)
            .context("Failed to read saved preferences")
    }

    /// # Errors
    /// Storage errors.
    pub fn reset_preferences(&self) -> Result<()> {
        self.store()
            .remove(store::EQUIPMENT_PREFERENCES_KEY)
            .context("Failed to reset preferences")
    }

    // --- Programs & blocks ---

    /// Loads the program given on the command line, falling back to the configured default.
    /// # Errors
    /// `ConfigError::ProgramNotSet` if neither exists; read/parse errors otherwise.
    pub fn load_program(&self, path_override: Option<&Path>) -> Result<Program> {
        let path = path_override
            .or(self.config.default_program.as_deref())
            .ok_or(ConfigError::ProgramNotSet)?;
        Program::load(path)
    }

    pub fn active_block(&self, routine: &Routine) -> usize {
        mesocycle::active_block(self.store(), &routine.id)
    }

    /// # Errors
    /// `MesocycleError::BlockIndexOutOfRange` or storage errors.
    pub fn set_active_block(&self, routine: &Routine, index: usize) -> Result<()> {
        mesocycle::set_active_block(self.store(), routine, index)
    }

    pub fn block_status(&self, routine: &Routine, index: usize) -> BlockStatus {
        mesocycle::block_status(self.store(), routine, index)
    }

    pub fn block_progress(&self, block: &Block) -> Progress {
        mesocycle::block_progress(self.store(), block)
    }

    pub fn week_progress(&self, block: &Block, week: u32) -> Progress {
        mesocycle::week_progress(self.store(), block, week)
    }

    /// # Errors
    /// `MesocycleError::WeekOutOfRange`.
    pub fn week_days<'a>(&self, selection: &BlockSelection<'a>) -> Result<Vec<DayStatus<'a>>> {
        Ok(mesocycle::week_days(self.store(), selection)?)
    }

    /// Marks a day done (or not done) for a week. Returns the new state.
    /// # Errors
    /// Unknown day/week, or storage errors.
    pub fn toggle_day(&self, block: &Block, week: u32, day: &str) -> Result<bool> {
        mesocycle::toggle_day(self.store(), block, week, day)
    }

    /// # Errors
    /// Storage errors.
    pub fn reset_block(&self, block: &Block) -> Result<()> {
        mesocycle::reset_block(self.store(), block)
    }
}
