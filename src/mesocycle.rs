// src/mesocycle.rs
//! Training programs, their mesocycle blocks and per-week day completion.
//!
//! Program definitions are read-only JSON files. Progress lives in the key-value store:
//! `activeBlock_<routineId>` holds the active block index and
//! `completed_<blockName>_week<N>` holds the days finished that week.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

use crate::store::{self, KeyValueStore};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("Routine not found: {0}")]
    RoutineNotFound(String),
    #[error("Block not found in routine '{routine}': {block}")]
    BlockNotFound { routine: String, block: String },
    #[error("Block index {index} is out of range (routine has {count} block(s))")]
    BlockIndexOutOfRange { index: usize, count: usize },
    #[error("Week {week} is out of range for block '{block}' (1-{weeks})")]
    WeekOutOfRange { block: String, week: u32, weeks: u32 },
    #[error("Day '{day}' is not part of block '{block}'")]
    DayNotFound { block: String, day: String },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Program {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub mesocycles: Vec<Mesocycle>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Mesocycle {
    pub name: String,
    #[serde(default)]
    pub routines: Vec<Routine>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Routine {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub blocks: Vec<Block>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Block {
    pub name: String,
    #[serde(default = "default_weeks")]
    pub weeks: u32,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub days: Vec<WorkoutDay>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WorkoutDay {
    pub name: String,
    #[serde(default)]
    pub focus: Option<String>,
    #[serde(default)]
    pub exercises: Vec<ProgramExercise>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProgramExercise {
    pub name: String,
    #[serde(default)]
    pub sets: Option<u32>,
    #[serde(default)]
    pub reps: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

const fn default_weeks() -> u32 {
    4
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.total > 0 && self.completed >= self.total
    }

    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 * 100.0 / self.total as f64
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStatus {
    Active,
    Completed,
    Upcoming,
}

/// The routine/block/week a block screen was opened for.
#[derive(Debug, Clone, Copy)]
pub struct BlockSelection<'a> {
    pub routine: &'a Routine,
    pub block: &'a Block,
    pub week: u32,
}

impl Program {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read program file {path:?}"))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse program file {path:?}"))
    }

    pub fn routines(&self) -> impl Iterator<Item = (&Mesocycle, &Routine)> {
        self.mesocycles
            .iter()
            .flat_map(|m| m.routines.iter().map(move |r| (m, r)))
    }

    /// Finds a routine by id, then by case-insensitive name.
    pub fn find_routine(&self, identifier: &str) -> Result<&Routine, Error> {
        let identifier = identifier.trim();
        self.routines()
            .map(|(_, r)| r)
            .find(|r| r.id == identifier)
            .or_else(|| {
                self.routines()
                    .map(|(_, r)| r)
                    .find(|r| r.name.eq_ignore_ascii_case(identifier))
            })
            .ok_or_else(|| Error::RoutineNotFound(identifier.to_string()))
    }
}

impl Routine {
    /// Finds a block by 1-based position or case-insensitive name.
    pub fn find_block(&self, identifier: &str) -> Result<(usize, &Block), Error> {
        let identifier = identifier.trim();
        let by_position = identifier
            .parse::<usize>()
            .ok()
            .filter(|n| *n >= 1)
            .and_then(|n| self.blocks.get(n - 1).map(|b| (n - 1, b)));
        by_position
            .or_else(|| {
                self.blocks
                    .iter()
                    .enumerate()
                    .find(|(_, b)| b.name.eq_ignore_ascii_case(identifier))
            })
            .ok_or_else(|| Error::BlockNotFound {
                routine: self.name.clone(),
                block: identifier.to_string(),
            })
    }
}

impl Block {
    pub fn check_week(&self, week: u32) -> Result<(), Error> {
        if week == 0 || week > self.weeks {
            return Err(Error::WeekOutOfRange {
                block: self.name.clone(),
                week,
                weeks: self.weeks,
            });
        }
        Ok(())
    }

    pub fn find_day(&self, day: &str) -> Result<&WorkoutDay, Error> {
        self.days
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(day.trim()))
            .ok_or_else(|| Error::DayNotFound {
                block: self.name.clone(),
                day: day.trim().to_string(),
            })
    }
}

/// Entry stored in a week's completion list.
#[must_use]
pub fn day_marker(day_name: &str, week: u32) -> String {
    format!("{day_name}_week{week}")
}

/// Active block index for a routine. Missing or unreadable values mean the first block.
pub fn active_block(store: &dyn KeyValueStore, routine_id: &str) -> usize {
    let key = store::active_block_key(routine_id);
    match store.get(&key) {
        Ok(Some(text)) => text.trim().parse().unwrap_or_else(|_| {
            warn!(key = %key, value = %text, "Ignoring unreadable active block index");
            0
        }),
        Ok(None) => 0,
        Err(e) => {
            warn!(key = %key, error = %e, "Failed to read active block");
            0
        }
    }
}

pub fn set_active_block(store: &dyn KeyValueStore, routine: &Routine, index: usize) -> Result<()> {
    if index >= routine.blocks.len() {
        return Err(Error::BlockIndexOutOfRange {
            index,
            count: routine.blocks.len(),
        }
        .into());
    }
    store
        .set(&store::active_block_key(&routine.id), &index.to_string())
        .context("Failed to save active block")
}

/// Completed day markers for one week of a block. Unreadable data counts as nothing done.
pub fn completed_days(store: &dyn KeyValueStore, block_name: &str, week: u32) -> BTreeSet<String> {
    let key = store::completed_days_key(block_name, week);
    match store::get_json::<Vec<String>>(store, &key) {
        Ok(days) => days.unwrap_or_default().into_iter().collect(),
        Err(e) => {
            warn!(key = %key, error = %e, "Failed to load completed days");
            BTreeSet::new()
        }
    }
}

/// Whether a day is done that week. The name matches case-insensitively, as in `toggle_day`;
/// a day not in the block is never done.
pub fn is_day_completed(store: &dyn KeyValueStore, block: &Block, week: u32, day_name: &str) -> bool {
    block.find_day(day_name).is_ok_and(|day| {
        completed_days(store, &block.name, week).contains(&day_marker(&day.name, week))
    })
}

/// Flips one day's completion for a week and rewrites that week's list. Returns the new state.
pub fn toggle_day(store: &dyn KeyValueStore, block: &Block, week: u32, day_name: &str) -> Result<bool> {
    block.check_week(week)?;
    let day = block.find_day(day_name)?;
    let marker = day_marker(&day.name, week);

    let mut days = completed_days(store, &block.name, week);
    let completed = if days.remove(&marker) {
        false
    } else {
        days.insert(marker);
        true
    };
    let list: Vec<&String> = days.iter().collect();
    store::set_json(store, &store::completed_days_key(&block.name, week), &list)
        .context("Failed to save completed days")?;
    debug!(block = %block.name, week, day = %day.name, completed, "Toggled workout day");
    Ok(completed)
}

pub fn week_progress(store: &dyn KeyValueStore, block: &Block, week: u32) -> Progress {
    let done = completed_days(store, &block.name, week);
    Progress {
        completed: block
            .days
            .iter()
            .filter(|d| done.contains(&day_marker(&d.name, week)))
            .count(),
        total: block.days.len(),
    }
}

pub fn block_progress(store: &dyn KeyValueStore, block: &Block) -> Progress {
    (1..=block.weeks).fold(Progress::default(), |acc, week| {
        let p = week_progress(store, block, week);
        Progress {
            completed: acc.completed + p.completed,
            total: acc.total + p.total,
        }
    })
}

pub fn block_status(store: &dyn KeyValueStore, routine: &Routine, index: usize) -> BlockStatus {
    if active_block(store, &routine.id) == index {
        return BlockStatus::Active;
    }
    match routine.blocks.get(index) {
        Some(block) if block_progress(store, block).is_complete() => BlockStatus::Completed,
        _ => BlockStatus::Upcoming,
    }
}

/// A day of the selected week with its completion state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayStatus<'a> {
    pub day: &'a WorkoutDay,
    pub completed: bool,
}

/// Days of the selected week in program order.
pub fn week_days<'a>(
    store: &dyn KeyValueStore,
    selection: &BlockSelection<'a>,
) -> Result<Vec<DayStatus<'a>>, Error> {
    selection.block.check_week(selection.week)?;
    debug!(
        routine = %selection.routine.id,
        block = %selection.block.name,
        week = selection.week,
        "Loading week days"
    );
    let done = completed_days(store, &selection.block.name, selection.week);
    Ok(selection
        .block
        .days
        .iter()
        .map(|day| DayStatus {
            day,
            completed: done.contains(&day_marker(&day.name, selection.week)),
        })
        .collect())
}

/// Clears every week's completion list for a block.
pub fn reset_block(store: &dyn KeyValueStore, block: &Block) -> Result<()> {
    for week in 1..=block.weeks {
        store
            .remove(&store::completed_days_key(&block.name, week))
            .with_context(|| format!("Failed to reset week {week} of block '{}'", block.name))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn routine() -> Routine {
        serde_json::from_str(
            r#"{
                "id": "ppl",
                "name": "Push Pull Legs",
                "blocks": [
                    {"name": "Foundation", "weeks": 2, "days": [{"name": "Push"}, {"name": "Pull"}]},
                    {"name": "Intensification", "days": [{"name": "Legs"}]}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn active_block_defaults_to_zero_and_validates_range() {
        let store = MemoryStore::new();
        let routine = routine();
        assert_eq!(active_block(&store, "ppl"), 0);

        set_active_block(&store, &routine, 1).unwrap();
        assert_eq!(active_block(&store, "ppl"), 1);
        assert_eq!(store.get("activeBlock_ppl").unwrap().as_deref(), Some("1"));
        assert!(set_active_block(&store, &routine, 2).is_err());

        store.set("activeBlock_ppl", "two").unwrap();
        assert_eq!(active_block(&store, "ppl"), 0);
    }

    #[test]
    fn toggling_days_updates_the_week_list() {
        let store = MemoryStore::new();
        let routine = routine();
        let block = &routine.blocks[0];

        assert!(toggle_day(&store, block, 1, "push").unwrap());
        assert_eq!(
            store.get("completed_Foundation_week1").unwrap().as_deref(),
            Some(r#"["Push_week1"]"#)
        );
        assert!(is_day_completed(&store, block, 1, "Push"));
        assert!(!is_day_completed(&store, block, 2, "Push"));

        assert!(!toggle_day(&store, block, 1, "Push").unwrap());
        assert!(!is_day_completed(&store, block, 1, "Push"));
    }

    #[test]
    fn completion_lookup_matches_day_names_like_toggle() {
        let store = MemoryStore::new();
        let routine = routine();
        let block = &routine.blocks[0];

        assert!(toggle_day(&store, block, 1, "push").unwrap());
        assert!(is_day_completed(&store, block, 1, "push"));
        assert!(is_day_completed(&store, block, 1, " PUSH "));
        assert!(!is_day_completed(&store, block, 1, "Legs"));
    }

    #[test]
    fn toggle_rejects_unknown_days_and_weeks() {
        let store = MemoryStore::new();
        let routine = routine();
        let block = &routine.blocks[0];
        assert!(toggle_day(&store, block, 3, "Push").is_err());
        assert!(toggle_day(&store, block, 0, "Push").is_err());
        assert!(toggle_day(&store, block, 1, "Legs").is_err());
    }

    #[test]
    fn progress_and_status() {
        let store = MemoryStore::new();
        let routine = routine();
        let block = &routine.blocks[0];

        assert_eq!(block_status(&store, &routine, 0), BlockStatus::Active);
        assert_eq!(block_progress(&store, block), Progress { completed: 0, total: 4 });

        for week in 1..=2 {
            toggle_day(&store, block, week, "Push").unwrap();
            toggle_day(&store, block, week, "Pull").unwrap();
        }
        assert!(week_progress(&store, block, 1).is_complete());
        assert!(block_progress(&store, block).is_complete());

        set_active_block(&store, &routine, 1).unwrap();
        assert_eq!(block_status(&store, &routine, 0), BlockStatus::Completed);
        assert_eq!(block_status(&store, &routine, 1), BlockStatus::Active);

        reset_block(&store, block).unwrap();
        assert_eq!(block_progress(&store, block).completed, 0);
        assert_eq!(block_status(&store, &routine, 0), BlockStatus::Upcoming);
    }

    #[test]
    fn week_days_follow_program_order() {
        let store = MemoryStore::new();
        let routine = routine();
        let block = &routine.blocks[0];
        toggle_day(&store, block, 2, "Pull").unwrap();

        let selection = BlockSelection { routine: &routine, block, week: 2 };
        let days = week_days(&store, &selection).unwrap();
        let view: Vec<(&str, bool)> = days.iter().map(|d| (d.day.name.as_str(), d.completed)).collect();
        assert_eq!(view, vec![("Push", false), ("Pull", true)]);

        let out_of_range = BlockSelection { week: 5, ..selection };
        assert!(week_days(&store, &out_of_range).is_err());
    }

    #[test]
    fn blocks_resolve_by_position_or_name() {
        let routine = routine();
        assert_eq!(routine.find_block("2").unwrap().0, 1);
        assert_eq!(routine.find_block("foundation").unwrap().0, 0);
        assert!(routine.find_block("0").is_err());
        assert_eq!(routine.blocks[1].weeks, 4);
    }
}
