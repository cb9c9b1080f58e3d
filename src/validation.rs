// src/validation.rs
use thiserror::Error;

/// User-facing validation failures. Each one is shown as a blocking alert:
/// `title()` is the heading, the `Display` text is the body.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please select at least one equipment option to continue.")]
    EquipmentRequired,
    #[error("Please choose a workout duration, enter a custom duration, or let the AI decide.")]
    WorkoutDurationRequired,
    #[error("Please choose a rest time or let the AI decide.")]
    RestTimeRequired,
    #[error("{0} minutes is not one of the available workout durations.")]
    InvalidDuration(u32),
    #[error("Please enter an exercise name.")]
    NameRequired,
    #[error("Please enter a name for your custom category.")]
    CustomCategoryRequired,
    #[error("Please select at least one muscle group or area.")]
    MuscleGroupsRequired,
    #[error("An exercise named '{0}' is already in your favorites.")]
    DuplicateExercise(String),
    #[error("{0}")]
    InvalidJson(String),
}

impl ValidationError {
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::EquipmentRequired => "Equipment Required",
            Self::WorkoutDurationRequired => "Workout Duration Required",
            Self::RestTimeRequired => "Rest Time Required",
            Self::InvalidDuration(_) => "Invalid Duration",
            Self::NameRequired => "Name Required",
            Self::CustomCategoryRequired => "Custom Category Required",
            Self::MuscleGroupsRequired => "Muscle Groups Required",
            Self::DuplicateExercise(_) => "Duplicate Exercise",
            Self::InvalidJson(_) => "Invalid JSON",
        }
    }

    /// Heading and body in one line, the way the CLI prints alerts.
    #[must_use]
    pub fn alert(&self) -> String {
        format!("{}: {}", self.title(), self)
    }
}
