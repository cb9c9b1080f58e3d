// src/preferences.rs
//! Three-step equipment & preferences questionnaire.
//!
//! The answers live under a single store key. A record without `completedAt` is a draft
//! and reopening the questionnaire resumes at its saved step; a record with `completedAt`
//! is final and opens on the read-only summary until the user chooses to edit it again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use strum_macros::{Display, EnumIter, EnumString};
use tracing::{info, warn};

use crate::store::{self, KeyValueStore, EQUIPMENT_PREFERENCES_KEY};
use crate::validation::ValidationError;

/// Fixed workout lengths offered on the schedule step, in minutes.
pub const FIXED_DURATIONS: &[u32] = &[15, 30, 45, 60, 75, 90];

#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter, Display, EnumString,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum EquipmentTag {
    FullGym,
    Dumbbells,
    Barbell,
    Kettlebells,
    ResistanceBands,
    PullUpBar,
    Bench,
    CableMachine,
    CardioMachines,
    YogaMat,
    BodyweightOnly,
}

impl EquipmentTag {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::FullGym => "Full gym access",
            Self::Dumbbells => "Dumbbells",
            Self::Barbell => "Barbell & plates",
            Self::Kettlebells => "Kettlebells",
            Self::ResistanceBands => "Resistance bands",
            Self::PullUpBar => "Pull-up bar",
            Self::Bench => "Bench",
            Self::CableMachine => "Cable machine",
            Self::CardioMachines => "Cardio machines",
            Self::YogaMat => "Yoga mat",
            Self::BodyweightOnly => "Bodyweight only",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, EnumIter, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum RestTime {
    Short,
    Moderate,
    Long,
    Extended,
}

impl RestTime {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Short => "Short (30-60 seconds)",
            Self::Moderate => "Moderate (60-90 seconds)",
            Self::Long => "Long (2-3 minutes)",
            Self::Extended => "Extended (3-5 minutes)",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, EnumIter, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ExplanationDetail {
    Minimal,
    #[default]
    Standard,
    Detailed,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct EquipmentPreferencesAnswers {
    pub equipment: BTreeSet<EquipmentTag>,
    pub available_equipment_notes: String,
    pub unavailable_equipment_notes: String,

    pub ai_optimized_duration: bool,
    /// 0 means no fixed duration chosen.
    pub workout_duration: u32,
    pub custom_duration: String,

    pub ai_optimized_rest: bool,
    pub rest_time: Option<RestTime>,

    pub liked_exercises: String,
    pub disliked_exercises: String,
    pub has_fitness_tracker: bool,
    pub explanation_detail: ExplanationDetail,

    pub current_step: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl EquipmentPreferencesAnswers {
    #[must_use]
    pub const fn is_final(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Workout length in minutes as entered, if a concrete one was chosen.
    #[must_use]
    pub fn duration_minutes(&self) -> Option<u32> {
        if self.workout_duration > 0 {
            Some(self.workout_duration)
        } else {
            self.custom_duration.trim().parse().ok()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WizardStep {
    Equipment,
    Schedule,
    ExercisePreferences,
}

impl WizardStep {
    pub const COUNT: u8 = 3;

    #[must_use]
    pub const fn index(self) -> u8 {
        match self {
            Self::Equipment => 0,
            Self::Schedule => 1,
            Self::ExercisePreferences => 2,
        }
    }

    /// Out-of-range indices clamp to the last step.
    #[must_use]
    pub const fn from_index(index: u8) -> Self {
        match index {
            0 => Self::Equipment,
            1 => Self::Schedule,
            _ => Self::ExercisePreferences,
        }
    }

    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Equipment => "Equipment",
            Self::Schedule => "Workout Duration & Rest",
            Self::ExercisePreferences => "Exercise Preferences",
        }
    }

    const fn previous(self) -> Option<Self> {
        match self {
            Self::Equipment => None,
            Self::Schedule => Some(Self::Equipment),
            Self::ExercisePreferences => Some(Self::Schedule),
        }
    }

    const fn next(self) -> Option<Self> {
        match self {
            Self::Equipment => Some(Self::Schedule),
            Self::Schedule => Some(Self::ExercisePreferences),
            Self::ExercisePreferences => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardState {
    Step(WizardStep),
    Results,
}

/// What the caller should do after a navigation action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardOutcome {
    Stay(WizardState),
    Exit,
}

/// Checks the answers required to leave `step`.
pub fn validate_step(
    step: WizardStep,
    answers: &EquipmentPreferencesAnswers,
) -> Result<(), ValidationError> {
    match step {
        WizardStep::Equipment => {
            if answers.equipment.is_empty() {
                return Err(ValidationError::EquipmentRequired);
            }
        }
        WizardStep::Schedule => {
            let has_duration = answers.ai_optimized_duration
                || answers.workout_duration > 0
                || !answers.custom_duration.trim().is_empty();
            if !has_duration {
                return Err(ValidationError::WorkoutDurationRequired);
            }
            if !(answers.ai_optimized_rest || answers.rest_time.is_some()) {
                return Err(ValidationError::RestTimeRequired);
            }
        }
        WizardStep::ExercisePreferences => {}
    }
    Ok(())
}

pub struct PreferencesWizard<'a> {
    store: &'a dyn KeyValueStore,
    answers: EquipmentPreferencesAnswers,
    state: WizardState,
}

impl<'a> PreferencesWizard<'a> {
    /// Reads the saved record and picks the entry state. Storage problems are logged and the
    /// questionnaire starts empty.
    pub fn load(store: &'a dyn KeyValueStore) -> Self {
        let answers = match store::get_json::<EquipmentPreferencesAnswers>(store, EQUIPMENT_PREFERENCES_KEY) {
            Ok(Some(answers)) => answers,
            Ok(None) => EquipmentPreferencesAnswers::default(),
            Err(e) => {
                warn!(error = %e, "Failed to load saved preferences, starting fresh");
                EquipmentPreferencesAnswers::default()
            }
        };
        let state = if answers.is_final() {
            WizardState::Results
        } else {
            WizardState::Step(WizardStep::from_index(answers.current_step))
        };
        Self {
            store,
            answers,
            state,
        }
    }

    #[must_use]
    pub const fn state(&self) -> WizardState {
        self.state
    }

    #[must_use]
    pub const fn answers(&self) -> &EquipmentPreferencesAnswers {
        &self.answers
    }

    /// Index of the step on screen, `None` on the summary.
    #[must_use]
    pub const fn current_step(&self) -> Option<u8> {
        match self.state {
            WizardState::Step(step) => Some(step.index()),
            WizardState::Results => None,
        }
    }

    /// "Next" (or "Complete" on the last step). A rejected transition leaves the state as is.
    pub fn next(&mut self) -> Result<WizardState, ValidationError> {
        let WizardState::Step(step) = self.state else {
            return Ok(self.state);
        };
        validate_step(step, &self.answers)?;
        match step.next() {
            Some(next) => self.go_to(next),
            None => self.complete(),
        }
        Ok(self.state)
    }

    /// "Back": one step back, or leave the questionnaire from the first step or the summary.
    pub fn back(&mut self) -> WizardOutcome {
        match self.state {
            WizardState::Step(step) => match step.previous() {
                Some(previous) => {
                    self.go_to(previous);
                    WizardOutcome::Stay(self.state)
                }
                None => WizardOutcome::Exit,
            },
            WizardState::Results => WizardOutcome::Exit,
        }
    }

    /// "Let me make changes": back to the first step with every answer kept.
    pub fn reopen(&mut self) -> WizardState {
        if self.state == WizardState::Results {
            self.state = WizardState::Step(WizardStep::Equipment);
            self.answers.current_step = 0;
        }
        self.state
    }

    /// "Save" on the summary: commits the final record and leaves. Anywhere else it does
    /// nothing, so an unvalidated draft can't be marked complete.
    pub fn save_and_exit(&mut self) -> WizardOutcome {
        if self.state != WizardState::Results {
            return WizardOutcome::Stay(self.state);
        }
        if self.answers.completed_at.is_none() {
            self.answers.completed_at = Some(Utc::now());
        }
        self.persist(&self.answers);
        WizardOutcome::Exit
    }

    pub fn toggle_equipment(&mut self, tag: EquipmentTag) -> bool {
        let selected = if self.answers.equipment.remove(&tag) {
            false
        } else {
            self.answers.equipment.insert(tag);
            true
        };
        self.save_draft();
        selected
    }

    pub fn set_available_equipment_notes(&mut self, text: &str) {
        self.answers.available_equipment_notes = text.to_string();
        self.save_draft();
    }

    pub fn set_unavailable_equipment_notes(&mut self, text: &str) {
        self.answers.unavailable_equipment_notes = text.to_string();
        self.save_draft();
    }

    /// Turning AI duration on clears the fixed and custom durations. Turning it off
    /// restores nothing.
    pub fn set_ai_duration(&mut self, enabled: bool) {
        self.answers.ai_optimized_duration = enabled;
        if enabled {
            self.answers.workout_duration = 0;
            self.answers.custom_duration.clear();
        }
        self.save_draft();
    }

    pub fn select_fixed_duration(&mut self, minutes: u32) -> Result<(), ValidationError> {
        if !FIXED_DURATIONS.contains(&minutes) {
            return Err(ValidationError::InvalidDuration(minutes));
        }
        self.answers.workout_duration = minutes;
        self.answers.custom_duration.clear();
        self.answers.ai_optimized_duration = false;
        self.save_draft();
        Ok(())
    }

    pub fn set_custom_duration(&mut self, text: &str) {
        self.answers.custom_duration = text.to_string();
        self.answers.workout_duration = 0;
        self.answers.ai_optimized_duration = false;
        self.save_draft();
    }

    pub fn set_ai_rest(&mut self, enabled: bool) {
        self.answers.ai_optimized_rest = enabled;
        if enabled {
            self.answers.rest_time = None;
        }
        self.save_draft();
    }

    pub fn select_rest_time(&mut self, rest: RestTime) {
        self.answers.rest_time = Some(rest);
        self.answers.ai_optimized_rest = false;
        self.save_draft();
    }

    pub fn set_liked_exercises(&mut self, text: &str) {
        self.answers.liked_exercises = text.to_string();
        self.save_draft();
    }

    pub fn set_disliked_exercises(&mut self, text: &str) {
        self.answers.disliked_exercises = text.to_string();
        self.save_draft();
    }

    pub fn set_has_fitness_tracker(&mut self, has_tracker: bool) {
        self.answers.has_fitness_tracker = has_tracker;
        self.save_draft();
    }

    pub fn set_explanation_detail(&mut self, detail: ExplanationDetail) {
        self.answers.explanation_detail = detail;
        self.save_draft();
    }

    /// Labeled lines for the read-only summary.
    #[must_use]
    pub fn summary(&self) -> Vec<(&'static str, String)> {
        summarize(&self.answers)
    }

    fn go_to(&mut self, step: WizardStep) {
        self.state = WizardState::Step(step);
        self.answers.current_step = step.index();
        self.save_draft();
    }

    fn complete(&mut self) {
        self.answers.completed_at = Some(Utc::now());
        self.state = WizardState::Results;
        self.persist(&self.answers);
        info!("Preferences questionnaire completed");
    }

    /// Every edit rewrites the whole record in draft shape.
    fn save_draft(&mut self) {
        self.answers.completed_at = None;
        self.persist(&self.answers);
    }

    fn persist(&self, answers: &EquipmentPreferencesAnswers) {
        if let Err(e) = store::set_json(self.store, EQUIPMENT_PREFERENCES_KEY, answers) {
            warn!(error = %e, "Failed to save preferences");
        }
    }
}

/// Labeled summary lines for a set of answers.
#[must_use]
pub fn summarize(answers: &EquipmentPreferencesAnswers) -> Vec<(&'static str, String)> {
    let or_dash = |text: &str| {
        let text = text.trim();
        if text.is_empty() {
            "-".to_string()
        } else {
            text.to_string()
        }
    };

    let equipment = if answers.equipment.is_empty() {
        "-".to_string()
    } else {
        answers
            .equipment
            .iter()
            .map(|tag| tag.label())
            .collect::<Vec<_>>()
            .join(", ")
    };
    let duration = if answers.ai_optimized_duration {
        "AI optimized".to_string()
    } else {
        answers
            .duration_minutes()
            .map_or_else(|| or_dash(&answers.custom_duration), |m| format!("{m} minutes"))
    };
    let rest = if answers.ai_optimized_rest {
        "AI optimized".to_string()
    } else {
        answers
            .rest_time
            .map_or_else(|| "-".to_string(), |r| r.label().to_string())
    };

    vec![
        ("Equipment", equipment),
        ("Also available", or_dash(&answers.available_equipment_notes)),
        ("Not available", or_dash(&answers.unavailable_equipment_notes)),
        ("Workout duration", duration),
        ("Rest time", rest),
        ("Liked exercises", or_dash(&answers.liked_exercises)),
        ("Disliked exercises", or_dash(&answers.disliked_exercises)),
        (
            "Fitness tracker",
            if answers.has_fitness_tracker { "Yes" } else { "No" }.to_string(),
        ),
        ("Explanations", answers.explanation_detail.to_string()),
    ]
}
