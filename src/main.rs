//src/main.rs
mod cli; // Keep cli module for parsing args

use anyhow::{bail, Context, Result};
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use std::io::{self, stdin, stdout, Read, Write};
use strum::IntoEnumIterator;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fitness_planner_lib::{
    preferences::{summarize, FIXED_DURATIONS},
    AppService, BlockSelection, BlockStatus, Category, EquipmentPreferencesAnswers, EquipmentTag,
    ExerciseForm, ExplanationDetail, FavoriteExercise, FavoriteFilters, FavoriteToggle, Intensity,
    Palette, PreferencesWizard, Program, RestTime, ValidationError, WizardOutcome, WizardState,
    WizardStep,
};

fn main() -> Result<()> {
    // --- Check for completion generation request FIRST ---
    let cli_args = cli::parse_args();
    let export_csv = cli_args.export_csv;

    if let cli::Commands::GenerateCompletion { shell } = cli_args.command {
        let mut cmd = cli::build_cli_command();
        let bin_name = cmd.get_name().to_string();

        eprintln!("Generating completion script for {shell}...");
        clap_complete::generate(shell, &mut cmd, bin_name, &mut stdout());
        return Ok(());
    }

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with(fmt::layer().with_writer(io::stderr))
        .init();

    // Initialize the application service (loads config, opens the store)
    let mut service =
        AppService::initialize().context("Failed to initialize application service")?;
    let header_color: Color = service.config.theme.header_color().into();

    match cli_args.command {
        cli::Commands::GenerateCompletion { .. } => {
            unreachable!("Completion generation should have exited already");
        }

        // --- Favorite exercises ---
        cli::Commands::Add { name, fields } => {
            let mut form = ExerciseForm {
                name,
                ..Default::default()
            };
            apply_exercise_args(&mut form, fields);
            match service.add_favorite(form) {
                Ok(exercise) => println!(
                    "Added '{}' to favorites ({}). ID: {}",
                    exercise.name,
                    exercise.category_label(),
                    exercise.id
                ),
                Err(e) => bail!(describe_error("adding favorite", &e)),
            }
        }
        cli::Commands::Edit {
            identifier,
            name,
            fields,
        } => {
            let existing = service.get_favorite(&identifier)?;
            let mut form = ExerciseForm::from(&existing);
            if let Some(name) = name {
                form.name = name;
            }
            apply_exercise_args(&mut form, fields);
            match service.edit_favorite(&existing.id, form) {
                Ok(exercise) => println!("Updated favorite '{}' (ID: {}).", exercise.name, exercise.id),
                Err(e) => bail!(describe_error(&format!("editing '{identifier}'"), &e)),
            }
        }
        cli::Commands::Remove { identifiers } => {
            for identifier in identifiers {
                match service.remove_favorite(&identifier) {
                    Ok(removed) => println!("Removed '{}' from favorites.", removed.name),
                    Err(e) => bail!("Error removing '{}': {:#}", identifier, e),
                }
            }
        }
        cli::Commands::List {
            category,
            muscle,
            search,
        } => {
            let filters = FavoriteFilters {
                category: category.map(cli_category),
                muscle: muscle.as_deref(),
                search: search.as_deref(),
            };
            let exercises = service.list_favorites(&filters);
            if export_csv {
                print_favorites_csv(&exercises)?;
            } else if exercises.is_empty() {
                println!("No favorite exercises found.");
            } else {
                print_favorites_table(&exercises, header_color);
            }
        }
        cli::Commands::Show {
            identifier,
            file,
            toggle,
        } => {
            let exercise = match (identifier, file) {
                (_, Some(path)) => {
                    let text = std::fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read {path:?}"))?;
                    match fitness_planner_lib::import::parse_exercise_json(&text) {
                        Ok(form) => form.preview(),
                        Err(e) => bail!(e.alert()),
                    }
                }
                (Some(identifier), None) => service.get_favorite(&identifier)?,
                (None, None) => bail!("Pass an exercise ID/name or --file."),
            };
            print_exercise_detail(&exercise, service.is_favorite(&exercise), header_color);

            if toggle {
                match service.toggle_favorite(&exercise) {
                    Ok(FavoriteToggle::Added(added)) => {
                        println!("Added '{}' to favorites. ID: {}", added.name, added.id);
                    }
                    Ok(FavoriteToggle::Removed(removed)) => {
                        println!("Removed '{}' from favorites.", removed.name);
                    }
                    Err(e) => bail!(describe_error("updating favorites", &e)),
                }
            }
        }
        cli::Commands::Import { file, text } => {
            let result = match (file, text) {
                (Some(path), _) => service.import_favorite_file(&path),
                (None, Some(text)) => service.import_favorite_text(&text),
                (None, None) => {
                    eprintln!("Paste the exercise JSON, then press Ctrl-D:");
                    let mut buffer = String::new();
                    stdin()
                        .read_to_string(&mut buffer)
                        .context("Failed to read exercise JSON from stdin")?;
                    service.import_favorite_text(&buffer)
                }
            };
            match result {
                Ok(exercise) => println!(
                    "Imported '{}' into favorites ({}). ID: {}",
                    exercise.name,
                    exercise.category_label(),
                    exercise.id
                ),
                Err(e) => bail!(describe_error("importing exercise", &e)),
            }
        }
        cli::Commands::Export { path } => match service.export_favorites(&path) {
            Ok(count) => println!("Exported {count} favorite exercise(s) to {path:?}"),
            Err(e) => bail!("Error exporting favorites: {:#}", e),
        },

        // --- Preferences questionnaire ---
        cli::Commands::Questionnaire => {
            let mut wizard = service.preferences_wizard();
            run_questionnaire(&mut wizard)?;
        }
        cli::Commands::Preferences { action } => match action {
            cli::PreferencesAction::Show => match service.saved_preferences() {
                Ok(Some(answers)) => print_preferences(&answers, header_color),
                Ok(None) => println!("No saved preferences. Run 'questionnaire' to fill them in."),
                Err(e) => bail!("Error reading preferences: {:#}", e),
            },
            cli::PreferencesAction::Reset => match service.reset_preferences() {
                Ok(()) => println!("Saved preferences cleared."),
                Err(e) => bail!("Error resetting preferences: {:#}", e),
            },
        },

        // --- Programs & blocks ---
        cli::Commands::Program { program } => {
            let program = service.load_program(program.as_deref())?;
            if export_csv {
                print_program_csv(&service, &program)?;
            } else {
                print_program_table(&service, &program, header_color);
            }
        }
        cli::Commands::Block { action, program } => {
            let program = service.load_program(program.as_deref())?;
            match action {
                cli::BlockAction::Show {
                    routine,
                    block,
                    week,
                } => {
                    let routine = program.find_routine(&routine)?;
                    let (index, block) = match block {
                        Some(block) => routine.find_block(&block)?,
                        None => {
                            let index = service.active_block(routine);
                            match routine.blocks.get(index) {
                                Some(block) => (index, block),
                                None => bail!("Routine '{}' has no blocks.", routine.name),
                            }
                        }
                    };
                    let selection = BlockSelection {
                        routine,
                        block,
                        week,
                    };
                    let days = service.week_days(&selection)?;
                    if export_csv {
                        print_week_csv(&days)?;
                    } else {
                        print_block_header(&service, &selection, index);
                        if let Some(description) = &block.description {
                            println!("{description}");
                        }
                        print_week_table(&days, header_color);
                    }
                }
                cli::BlockAction::Activate { routine, block } => {
                    let routine = program.find_routine(&routine)?;
                    let (index, block) = routine.find_block(&block)?;
                    match service.set_active_block(routine, index) {
                        Ok(()) => println!(
                            "Block {} '{}' is now active for '{}'.",
                            index + 1,
                            block.name,
                            routine.name
                        ),
                        Err(e) => bail!("Error activating block: {:#}", e),
                    }
                }
                cli::BlockAction::Reset { routine, block } => {
                    let routine = program.find_routine(&routine)?;
                    let (_, block) = routine.find_block(&block)?;
                    match service.reset_block(block) {
                        Ok(()) => println!("Cleared all completed days of block '{}'.", block.name),
                        Err(e) => bail!("Error resetting block: {:#}", e),
                    }
                }
            }
        }
        cli::Commands::ToggleDay {
            routine,
            block,
            week,
            day,
            program,
        } => {
            let program = service.load_program(program.as_deref())?;
            let routine = program.find_routine(&routine)?;
            let (_, block) = routine.find_block(&block)?;
            match service.toggle_day(block, week, &day) {
                Ok(done) => {
                    let progress = service.week_progress(block, week);
                    println!(
                        "'{}' week {} marked {}. ({}/{} days done)",
                        day.trim(),
                        week,
                        if done { "done" } else { "not done" },
                        progress.completed,
                        progress.total
                    );
                }
                Err(e) => bail!("Error toggling day: {:#}", e),
            }
        }

        // --- Config/Path Commands ---
        cli::Commands::SetProgram { path } => {
            if let Some(path) = &path {
                let program = Program::load(path)?;
                println!("Using program '{}'.", program.name);
            }
            match service.set_default_program(path) {
                Ok(()) => println!("Config file updated: {:?}", service.get_config_path()),
                Err(e) => bail!("Error setting program: {}", e),
            }
        }
        cli::Commands::SetTheme { palette } => {
            let palette = match palette {
                cli::PaletteCli::Default => Palette::Default,
                cli::PaletteCli::Pink => Palette::Pink,
            };
            match service.set_palette(palette) {
                Ok(()) => {
                    println!("Successfully set palette to: {palette:?}");
                    println!("Config file updated: {:?}", service.get_config_path());
                }
                Err(e) => bail!("Error setting palette: {}", e),
            }
        }
        cli::Commands::SetHeaderColor { color } => match service.set_header_color(&color) {
            Ok(()) => {
                println!("Successfully set header color to: {}", service.config.theme.header_color);
                if service.config.theme.palette == Palette::Pink {
                    println!("Note: the pink palette overrides the header color.");
                }
            }
            Err(e) => bail!("Error setting header color: {}", e),
        },
        cli::Commands::StorePath => {
            println!("Store file is located at: {:?}", service.get_store_path());
        }
        cli::Commands::ConfigPath => {
            println!("Config file is located at: {:?}", service.get_config_path());
        }
    }

    Ok(())
}

// --- CLI Specific Helper Functions ---

fn cli_category(category: cli::CategoryCli) -> Category {
    match category {
        cli::CategoryCli::Gym | cli::CategoryCli::Strength => Category::Gym,
        cli::CategoryCli::Bodyweight => Category::Bodyweight,
        cli::CategoryCli::Flexibility => Category::Flexibility,
        cli::CategoryCli::Cardio => Category::Cardio,
        cli::CategoryCli::Custom => Category::Custom,
    }
}

fn cli_intensity(intensity: cli::IntensityCli) -> Intensity {
    match intensity {
        cli::IntensityCli::Low => Intensity::Low,
        cli::IntensityCli::Moderate => Intensity::Moderate,
        cli::IntensityCli::High => Intensity::High,
    }
}

/// Overlays the flags that were given onto a form.
fn apply_exercise_args(form: &mut ExerciseForm, fields: cli::ExerciseArgs) {
    if let Some(category) = fields.category {
        form.category = cli_category(category);
    }
    if let Some(custom) = fields.custom_category {
        form.custom_category = custom;
    }
    if let Some(primary) = fields.primary {
        form.primary_muscles = cli::split_list(&primary);
    }
    if let Some(secondary) = fields.secondary {
        form.secondary_muscles = cli::split_list(&secondary);
    }
    if let Some(muscles) = fields.muscles {
        form.muscle_groups = cli::split_list(&muscles);
    }
    if let Some(instructions) = fields.instructions {
        form.instructions = cli::split_steps(&instructions);
    }
    if let Some(notes) = fields.notes {
        form.notes = notes;
    }
    if let Some(alternatives) = fields.alternatives {
        form.alternatives = cli::split_list(&alternatives);
    }
    if fields.calories.is_some() {
        form.estimated_calories = fields.calories;
    }
    if let Some(duration) = fields.duration {
        form.duration = duration;
    }
    if let Some(intensity) = fields.intensity {
        form.intensity = Some(cli_intensity(intensity));
    }
}

/// Validation failures print as "Title: message"; everything else keeps its context chain.
fn describe_error(action: &str, error: &anyhow::Error) -> String {
    error.downcast_ref::<ValidationError>().map_or_else(
        || format!("Error {action}: {error:#}"),
        ValidationError::alert,
    )
}

const fn status_label(status: BlockStatus) -> &'static str {
    match status {
        BlockStatus::Active => "Active",
        BlockStatus::Completed => "Completed",
        BlockStatus::Upcoming => "Upcoming",
    }
}

fn or_dash(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}

// --- Questionnaire (interactive) ---

/// Reads one line. `None` on end of input.
fn prompt(message: &str) -> Result<Option<String>> {
    print!("{message}");
    stdout().flush()?;
    let mut input = String::new();
    if stdin().read_line(&mut input)? == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim().to_string()))
}

fn parse_on_off(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "yes" | "y" | "true" => Some(true),
        "off" | "no" | "n" | "false" => Some(false),
        _ => None,
    }
}

fn run_questionnaire(wizard: &mut PreferencesWizard) -> Result<()> {
    println!("Answers are saved as you go. Type 'q' to leave and resume later.");
    loop {
        let step = match wizard.state() {
            WizardState::Results => {
                println!();
                println!("Your preferences:");
                for (label, value) in wizard.summary() {
                    println!("  {label:<20} {value}");
                }
                let Some(input) = prompt("[s]ave, [e]dit, [b]ack: ")? else {
                    return Ok(());
                };
                match input.to_ascii_lowercase().as_str() {
                    "s" | "save" => {
                        wizard.save_and_exit();
                        println!("Preferences saved.");
                        return Ok(());
                    }
                    "e" | "edit" => {
                        wizard.reopen();
                    }
                    "b" | "back" | "q" => return Ok(()),
                    other => println!("Unknown choice '{other}'."),
                }
                continue;
            }
            WizardState::Step(step) => step,
        };

        println!();
        println!(
            "Step {} of {}: {}",
            step.index() + 1,
            WizardStep::COUNT,
            step.title()
        );
        print_step(step, wizard.answers());

        let Some(input) = prompt("> ")? else {
            return Ok(());
        };
        let (command, argument) = match input.split_once(' ') {
            Some((command, argument)) => (command.to_ascii_lowercase(), argument.trim()),
            None => (input.to_ascii_lowercase(), ""),
        };

        match command.as_str() {
            "" => {}
            "q" | "quit" => {
                println!("Progress saved. Run 'questionnaire' again to continue.");
                return Ok(());
            }
            "n" | "next" => {
                if let Err(e) = wizard.next() {
                    println!("{}", e.alert());
                }
            }
            "b" | "back" => {
                if wizard.back() == WizardOutcome::Exit {
                    return Ok(());
                }
            }
            _ => {
                if let Err(message) = apply_step_command(wizard, step, &command, argument) {
                    println!("{message}");
                }
            }
        }
    }
}

fn print_step(step: WizardStep, answers: &EquipmentPreferencesAnswers) {
    let mark = |selected: bool| if selected { "[x]" } else { "[ ]" };
    match step {
        WizardStep::Equipment => {
            for (number, tag) in EquipmentTag::iter().enumerate() {
                println!(
                    "  {:>2}. {} {}",
                    number + 1,
                    mark(answers.equipment.contains(&tag)),
                    tag.label()
                );
            }
            println!("  Also available: {}", answers.available_equipment_notes);
            println!("  Not available:  {}", answers.unavailable_equipment_notes);
            println!("Commands: <number> toggle, have <text>, missing <text>, n(ext), b(ack), q(uit)");
        }
        WizardStep::Schedule => {
            let durations = FIXED_DURATIONS
                .iter()
                .map(|m| format!("{} {m}", mark(answers.workout_duration == *m)))
                .collect::<Vec<_>>()
                .join("  ");
            println!("  {} Let AI decide the duration", mark(answers.ai_optimized_duration));
            println!("  Minutes: {durations}");
            println!("  Custom: {}", answers.custom_duration);
            println!("  {} Let AI decide rest time", mark(answers.ai_optimized_rest));
            for rest in RestTime::iter() {
                println!(
                    "  {} {:<9} {}",
                    mark(answers.rest_time == Some(rest)),
                    rest.to_string(),
                    rest.label()
                );
            }
            println!("Commands: minutes <n>, custom <text>, ai-duration on|off, rest <name>, ai-rest on|off, n(ext), b(ack), q(uit)");
        }
        WizardStep::ExercisePreferences => {
            println!("  Liked:      {}", answers.liked_exercises);
            println!("  Disliked:   {}", answers.disliked_exercises);
            println!(
                "  Tracker:    {}",
                if answers.has_fitness_tracker { "yes" } else { "no" }
            );
            println!("  Detail:     {}", answers.explanation_detail);
            println!("Commands: like <text>, dislike <text>, tracker yes|no, detail minimal|standard|detailed, n(ext)/complete, b(ack), q(uit)");
        }
    }
}

/// Applies one edit command on the current step. `Err` carries the message to show.
fn apply_step_command(
    wizard: &mut PreferencesWizard,
    step: WizardStep,
    command: &str,
    argument: &str,
) -> Result<(), String> {
    let unknown = || format!("Unknown command '{command}'.");
    match step {
        WizardStep::Equipment => match command {
            "have" => wizard.set_available_equipment_notes(argument),
            "missing" => wizard.set_unavailable_equipment_notes(argument),
            number => {
                let index = number.parse::<usize>().map_err(|_| unknown())?;
                let tag = index
                    .checked_sub(1)
                    .and_then(|i| EquipmentTag::iter().nth(i))
                    .ok_or_else(|| format!("No equipment option {index}."))?;
                wizard.toggle_equipment(tag);
            }
        },
        WizardStep::Schedule => match command {
            "minutes" => {
                let minutes = argument
                    .parse::<u32>()
                    .map_err(|_| format!("'{argument}' is not a number of minutes."))?;
                wizard
                    .select_fixed_duration(minutes)
                    .map_err(|e| e.alert())?;
            }
            "custom" => wizard.set_custom_duration(argument),
            "ai-duration" => {
                let enabled = parse_on_off(argument).ok_or("Use 'ai-duration on' or 'ai-duration off'.")?;
                wizard.set_ai_duration(enabled);
            }
            "rest" => {
                let rest = argument
                    .parse::<RestTime>()
                    .map_err(|_| format!("Unknown rest time '{argument}'."))?;
                wizard.select_rest_time(rest);
            }
            "ai-rest" => {
                let enabled = parse_on_off(argument).ok_or("Use 'ai-rest on' or 'ai-rest off'.")?;
                wizard.set_ai_rest(enabled);
            }
            _ => return Err(unknown()),
        },
        WizardStep::ExercisePreferences => match command {
            "like" => wizard.set_liked_exercises(argument),
            "dislike" => wizard.set_disliked_exercises(argument),
            "tracker" => {
                let has_tracker = parse_on_off(argument).ok_or("Use 'tracker yes' or 'tracker no'.")?;
                wizard.set_has_fitness_tracker(has_tracker);
            }
            "detail" => {
                let detail = argument
                    .parse::<ExplanationDetail>()
                    .map_err(|_| format!("Unknown detail level '{argument}'."))?;
                wizard.set_explanation_detail(detail);
            }
            "complete" => {
                wizard.next().map_err(|e| e.alert())?;
            }
            _ => return Err(unknown()),
        },
    }
    Ok(())
}

// --- Table Printing Functions ---

fn print_favorites_table(exercises: &[FavoriteExercise], header_color: Color) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").fg(header_color),
            Cell::new("Name").fg(header_color),
            Cell::new("Category").fg(header_color),
            Cell::new("Muscles").fg(header_color),
            Cell::new("Intensity").fg(header_color),
            Cell::new("Added").fg(header_color),
        ]);

    for exercise in exercises {
        table.add_row(vec![
            Cell::new(&exercise.id),
            Cell::new(&exercise.name),
            Cell::new(exercise.category_label()),
            Cell::new(or_dash(&exercise.muscle_groups)),
            Cell::new(exercise.intensity.map_or("-".to_string(), |i| i.to_string())),
            Cell::new(exercise.added_at.format("%Y-%m-%d").to_string()),
        ]);
    }
    println!("{table}");
}

fn print_exercise_detail(exercise: &FavoriteExercise, is_favorite: bool, header_color: Color) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new(&exercise.name)
                .fg(header_color)
                .add_attribute(Attribute::Bold),
            Cell::new(if is_favorite { "★ Favorite" } else { "☆ Not a favorite" }).fg(header_color),
        ]);

    table.add_row(vec![Cell::new("Category"), Cell::new(exercise.category_label())]);
    if exercise.category.splits_muscles() {
        table.add_row(vec![
            Cell::new("Primary muscles"),
            Cell::new(or_dash(exercise.primary_or_legacy_muscles())),
        ]);
        table.add_row(vec![
            Cell::new("Secondary muscles"),
            Cell::new(or_dash(exercise.secondary())),
        ]);
    } else {
        table.add_row(vec![
            Cell::new("Target areas"),
            Cell::new(or_dash(&exercise.muscle_groups)),
        ]);
    }

    let steps = exercise.instruction_steps();
    if !steps.is_empty() {
        let numbered = steps
            .iter()
            .enumerate()
            .map(|(i, step)| format!("{}. {step}", i + 1))
            .collect::<Vec<_>>()
            .join("\n");
        table.add_row(vec![Cell::new("Instructions"), Cell::new(numbered)]);
    }
    if let Some(notes) = &exercise.notes {
        table.add_row(vec![Cell::new("Notes"), Cell::new(notes)]);
    }
    if let Some(alternatives) = &exercise.alternatives {
        table.add_row(vec![Cell::new("Alternatives"), Cell::new(or_dash(alternatives))]);
    }
    if let Some(calories) = exercise.estimated_calories {
        table.add_row(vec![Cell::new("Est. calories"), Cell::new(calories.to_string())]);
    }
    if let Some(duration) = &exercise.duration {
        table.add_row(vec![Cell::new("Duration"), Cell::new(duration)]);
    }
    if let Some(intensity) = exercise.intensity {
        table.add_row(vec![Cell::new("Intensity"), Cell::new(intensity.to_string())]);
    }
    if is_favorite {
        table.add_row(vec![
            Cell::new("Added"),
            Cell::new(exercise.added_at.format("%Y-%m-%d %H:%M").to_string()),
        ]);
    }
    println!("{table}");
}

fn print_preferences(answers: &EquipmentPreferencesAnswers, header_color: Color) {
    let status = answers.completed_at.map_or_else(
        || {
            format!(
                "Draft (on step {} of {})",
                WizardStep::from_index(answers.current_step).index() + 1,
                WizardStep::COUNT
            )
        },
        |at| format!("Completed {}", at.format("%Y-%m-%d %H:%M")),
    );

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Preference").fg(header_color),
            Cell::new(status).fg(header_color),
        ]);
    for (label, value) in summarize(answers) {
        table.add_row(vec![Cell::new(label), Cell::new(value)]);
    }
    println!("{table}");
}

fn print_program_table(service: &AppService, program: &Program, header_color: Color) {
    println!("{}", program.name);
    if let Some(description) = &program.description {
        println!("{description}");
    }
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Mesocycle").fg(header_color),
            Cell::new("Routine").fg(header_color),
            Cell::new("#").fg(header_color),
            Cell::new("Block").fg(header_color),
            Cell::new("Weeks").fg(header_color),
            Cell::new("Status").fg(header_color),
            Cell::new("Progress").fg(header_color),
        ]);

    for (mesocycle, routine) in program.routines() {
        for (index, block) in routine.blocks.iter().enumerate() {
            let status = service.block_status(routine, index);
            let progress = service.block_progress(block);
            let status_cell = match status {
                BlockStatus::Active => Cell::new(status_label(status)).fg(header_color),
                _ => Cell::new(status_label(status)),
            };
            table.add_row(vec![
                Cell::new(&mesocycle.name),
                Cell::new(format!("{} ({})", routine.name, routine.id)),
                Cell::new((index + 1).to_string()),
                Cell::new(&block.name),
                Cell::new(block.weeks.to_string()),
                status_cell,
                Cell::new(format!(
                    "{}/{} ({:.0}%)",
                    progress.completed,
                    progress.total,
                    progress.percent()
                )),
            ]);
        }
    }
    println!("{table}");
}

fn print_block_header(service: &AppService, selection: &BlockSelection, index: usize) {
    let progress = service.week_progress(selection.block, selection.week);
    println!(
        "{}: block {} '{}' [{}], week {} of {} ({}/{} days done)",
        selection.routine.name,
        index + 1,
        selection.block.name,
        status_label(service.block_status(selection.routine, index)),
        selection.week,
        selection.block.weeks,
        progress.completed,
        progress.total
    );
}

fn print_week_table(days: &[fitness_planner_lib::DayStatus], header_color: Color) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Done").fg(header_color),
            Cell::new("Day").fg(header_color),
            Cell::new("Focus").fg(header_color),
            Cell::new("Exercises").fg(header_color),
        ]);

    for status in days {
        let exercises = status
            .day
            .exercises
            .iter()
            .map(|e| match (e.sets, e.reps.as_deref()) {
                (Some(sets), Some(reps)) => format!("{} {sets}x{reps}", e.name),
                (Some(sets), None) => format!("{} x{sets}", e.name),
                _ => e.name.clone(),
            })
            .collect::<Vec<_>>()
            .join("\n");
        table.add_row(vec![
            Cell::new(if status.completed { "✓" } else { " " }),
            Cell::new(&status.day.name),
            Cell::new(status.day.focus.as_deref().unwrap_or("-")),
            Cell::new(if exercises.is_empty() { "-".to_string() } else { exercises }),
        ]);
    }
    println!("{table}");
}

// --- CSV Printing Functions ---

fn print_favorites_csv(exercises: &[FavoriteExercise]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record([
        "ID",
        "Name",
        "Category",
        "Muscle_Groups",
        "Primary_Muscles",
        "Secondary_Muscles",
        "Intensity",
        "Added_At_UTC",
    ])?;

    for exercise in exercises {
        writer.write_record([
            exercise.id.clone(),
            exercise.name.clone(),
            exercise.category_label().to_string(),
            exercise.muscle_groups.join(";"),
            exercise.primary_muscles.as_deref().unwrap_or_default().join(";"),
            exercise.secondary().join(";"),
            exercise.intensity.map_or(String::new(), |i| i.to_string()),
            exercise.added_at.to_rfc3339(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

fn print_program_csv(service: &AppService, program: &Program) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record([
        "Mesocycle",
        "Routine_ID",
        "Routine",
        "Block_Number",
        "Block",
        "Weeks",
        "Status",
        "Completed_Days",
        "Total_Days",
    ])?;

    for (mesocycle, routine) in program.routines() {
        for (index, block) in routine.blocks.iter().enumerate() {
            let progress = service.block_progress(block);
            writer.write_record([
                mesocycle.name.clone(),
                routine.id.clone(),
                routine.name.clone(),
                (index + 1).to_string(),
                block.name.clone(),
                block.weeks.to_string(),
                status_label(service.block_status(routine, index)).to_string(),
                progress.completed.to_string(),
                progress.total.to_string(),
            ])?;
        }
    }

    writer.flush()?;
    Ok(())
}

fn print_week_csv(days: &[fitness_planner_lib::DayStatus]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record(["Day", "Focus", "Completed"])?;
    for status in days {
        writer.write_record([
            status.day.name.as_str(),
            status.day.focus.as_deref().unwrap_or(""),
            if status.completed { "true" } else { "false" },
        ])?;
    }
    writer.flush()?;
    Ok(())
}
