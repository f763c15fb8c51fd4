mod init;
pub use init::cmd_init;

use chrono::NaiveDate;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::cli::session;
use crate::engine::Engine;
use crate::io::config_io::{self, BOARD_DIR};
use crate::io::kv::FileStore;
use crate::model::task::{Column, Priority, TaskId};
use crate::ops::actions::UndoOutcome;
use crate::ops::filter::FilterState;
use crate::ops::store::{NewTask, TaskError};

type CliResult = Result<(), Box<dyn std::error::Error>>;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CliResult {
    let json = cli.json;
    let board_dir = cli.board_dir.clone();

    match cli.command {
        // Init is handled in main.rs before board discovery
        Some(Commands::Init(args)) => cmd_init(args),
        None => {
            // No subcommand → interactive session; undo history lives
            // for the length of the session
            let engine = load_engine(board_dir.as_deref())?;
            session::run(engine, json)
        }
        Some(cmd) => {
            let mut engine = load_engine(board_dir.as_deref())?;
            run_command(&mut engine, cmd, json)?;
            if let Some(warning) = engine.persist_warning() {
                eprintln!("warning: {}", warning);
            }
            Ok(())
        }
    }
}

/// Execute one command against a loaded engine. Shared between one-shot
/// dispatch and the interactive session.
pub fn run_command(engine: &mut Engine, cmd: Commands, json: bool) -> CliResult {
    match cmd {
        Commands::Init(_) => Err("already inside a board; run init at the top level".into()),
        Commands::List(args) => cmd_list(engine, args, json),
        Commands::Show(args) => cmd_show(engine, args, json),
        Commands::Counts(args) => cmd_counts(engine, args, json),
        Commands::History(args) => cmd_history(engine, args, json),
        Commands::Add(args) => cmd_add(engine, args),
        Commands::Mv(args) => cmd_mv(engine, args),
        Commands::Pri(args) => cmd_pri(engine, args),
        Commands::Tag(args) => cmd_tag(engine, args),
        Commands::Due(args) => cmd_due(engine, args),
        Commands::Timer(args) => cmd_timer(engine, args),
        Commands::Note(args) => cmd_note(engine, args),
        Commands::Title(args) => cmd_title(engine, args),
        Commands::Rm(args) => cmd_rm(engine, args),
        Commands::Undo => cmd_undo(engine),
        Commands::Redo => cmd_redo(engine),
        Commands::Trash(args) => cmd_trash(engine, args, json),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load_engine(board_dir: Option<&str>) -> Result<Engine, Box<dyn std::error::Error>> {
    let start = match board_dir {
        Some(dir) => std::fs::canonicalize(dir)
            .map_err(|e| format!("cannot resolve -C path '{}': {}", dir, e))?,
        None => std::env::current_dir()?,
    };
    let root = config_io::discover_board(&start)?;
    let config = config_io::load_config(&root)?;
    let kv = FileStore::new(&root.join(BOARD_DIR))?;
    Ok(Engine::new(config, Box::new(kv)))
}

fn parse_column(s: &str) -> Result<Column, TaskError> {
    Column::from_name(s).ok_or_else(|| TaskError::InvalidColumn(s.to_string()))
}

fn parse_priority(s: &str) -> Result<Priority, Box<dyn std::error::Error>> {
    Priority::from_name(s).ok_or_else(|| format!("invalid priority: {}", s).into())
}

fn parse_date(s: &str) -> Result<NaiveDate, Box<dyn std::error::Error>> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| format!("invalid date (expected YYYY-MM-DD): {}", s).into())
}

fn build_filter(
    column: Option<String>,
    tags: Vec<String>,
    search: Option<String>,
) -> Result<FilterState, Box<dyn std::error::Error>> {
    let column = match column {
        Some(name) => Some(parse_column(&name)?),
        None => None,
    };
    Ok(FilterState {
        search_term: search.unwrap_or_default(),
        column,
        tags,
    })
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_list(engine: &mut Engine, args: ListArgs, json: bool) -> CliResult {
    let filter = build_filter(args.column, args.tags, args.search)?;
    let counts = engine.counts(&filter);
    let filtered = filter.is_active();

    let mut sections: Vec<(Column, ColumnListJson, Vec<String>)> = Vec::new();
    for column in Column::ALL {
        if let Some(wanted) = filter.column
            && column != wanted
        {
            continue;
        }
        let visible: Vec<&crate::model::task::Task> = engine
            .sorted_column(column)
            .into_iter()
            .filter_map(|id| engine.task(id))
            .filter(|task| engine.is_visible(task, &filter))
            .collect();
        let lines: Vec<String> = visible.iter().map(|task| card_line(task)).collect();
        let cards: Vec<CardJson> = visible.iter().map(|task| card_to_json(task)).collect();
        sections.push((
            column,
            ColumnListJson {
                column: column.name().to_string(),
                count: count_label(counts[&column], filtered),
                cards,
            },
            lines,
        ));
    }

    if json {
        let out: Vec<&ColumnListJson> = sections.iter().map(|(_, section, _)| section).collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    for (column, section, lines) in &sections {
        println!("{} ({})", column.label(), section.count);
        for line in lines {
            println!("  {}", line);
        }
        println!();
    }
    Ok(())
}

fn cmd_show(engine: &mut Engine, args: ShowArgs, json: bool) -> CliResult {
    let id = TaskId(args.id);
    let task = engine.task(id).ok_or(TaskError::NotFound(id))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&card_to_json(task))?);
        return Ok(());
    }

    println!("{}", card_line(task));
    println!("  column: {}", task.column.label());
    println!("  priority: {}", task.priority.name());
    if task.deleted {
        println!("  deleted: yes (in trash)");
    }
    if !task.notes.is_empty() {
        println!("  notes:");
        for (index, note) in task.notes.iter().enumerate() {
            println!(
                "    [{}] {} - {}",
                index,
                note.at.format("%Y-%m-%d %H:%M"),
                crate::ops::filter::note_plain_text(&note.content)
            );
        }
    }
    Ok(())
}

fn cmd_counts(engine: &mut Engine, args: CountsArgs, json: bool) -> CliResult {
    let filter = build_filter(args.column, args.tags, args.search)?;
    let counts = engine.counts(&filter);
    let filtered = filter.is_active();

    if json {
        let out = CountsJson {
            columns: counts
                .iter()
                .map(|(column, count)| ColumnCountJson {
                    column: column.name().to_string(),
                    visible: count.visible,
                    total: count.total,
                })
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    for (column, count) in &counts {
        println!("{}: {}", column.label(), count_label(*count, filtered));
    }
    Ok(())
}

fn cmd_history(engine: &mut Engine, args: HistoryArgs, json: bool) -> CliResult {
    let id = TaskId(args.id);
    let task = engine.task(id).ok_or(TaskError::NotFound(id))?;

    if json {
        let entries: Vec<HistoryEntryJson> =
            task.history.iter().map(history_entry_to_json).collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for entry in &task.history {
        println!(
            "{} [{}] {}",
            entry.at.format("%Y-%m-%d %H:%M"),
            format!("{:?}", entry.kind).to_lowercase(),
            entry.text
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Write commands
// ---------------------------------------------------------------------------

fn cmd_add(engine: &mut Engine, args: AddArgs) -> CliResult {
    let column = match args.column {
        Some(name) => Some(parse_column(&name)?),
        None => None,
    };
    let priority = match args.priority {
        Some(name) => parse_priority(&name)?,
        None => Priority::None,
    };
    let due_date = match args.due {
        Some(date) => Some(parse_date(&date)?),
        None => None,
    };

    let task = engine.create_task(NewTask {
        title: args.title,
        column,
        priority,
        tags: args.tags,
        due_date,
    })?;
    println!("Created #{} '{}' in {}", task.id, task.title, task.column.label());
    Ok(())
}

fn cmd_mv(engine: &mut Engine, args: MvArgs) -> CliResult {
    let column = parse_column(&args.column)?;
    engine.move_task(TaskId(args.id), column)?;
    println!("Moved #{} to {}", args.id, column.label());
    Ok(())
}

fn cmd_pri(engine: &mut Engine, args: PriArgs) -> CliResult {
    let priority = parse_priority(&args.priority)?;
    engine.set_priority(TaskId(args.id), priority)?;
    println!("Set priority of #{} to {}", args.id, priority.name());
    Ok(())
}

fn cmd_tag(engine: &mut Engine, args: TagArgs) -> CliResult {
    let id = TaskId(args.id);
    if args.rm {
        engine.remove_tag(id, &args.tag)?;
        println!("Removed tag '{}' from #{}", args.tag, args.id);
    } else {
        engine.add_tag(id, &args.tag)?;
        println!("Tagged #{} with '{}'", args.id, args.tag);
    }
    Ok(())
}

fn cmd_due(engine: &mut Engine, args: DueArgs) -> CliResult {
    let id = TaskId(args.id);
    if args.clear {
        engine.set_due_date(id, None)?;
        println!("Cleared due date on #{}", args.id);
        return Ok(());
    }
    let date = match args.date {
        Some(date) => parse_date(&date)?,
        None => return Err("provide a date or --clear".into()),
    };
    engine.set_due_date(id, Some(date))?;
    println!("Due date of #{} set to {}", args.id, date);
    Ok(())
}

fn cmd_timer(engine: &mut Engine, args: TimerArgs) -> CliResult {
    let delta: i64 = args
        .minutes
        .parse()
        .map_err(|_| format!("invalid minutes: {}", args.minutes))?;
    let id = TaskId(args.id);
    engine.adjust_timer(id, delta)?;
    if let Some(task) = engine.task(id) {
        println!("Timer on #{} is now {}m", args.id, task.timer_minutes);
    }
    Ok(())
}

fn cmd_note(engine: &mut Engine, args: NoteArgs) -> CliResult {
    let id = TaskId(args.id);
    if let Some(index) = args.rm {
        engine.remove_note(id, index)?;
        println!("Removed note [{}] from #{}", index, args.id);
        return Ok(());
    }
    match args.text {
        Some(text) => {
            engine.add_note(id, &text)?;
            println!("Added a note to #{}", args.id);
        }
        None => {
            let task = engine.task(id).ok_or(TaskError::NotFound(id))?;
            if task.notes.is_empty() {
                println!("No notes on #{}", args.id);
            }
            for (index, note) in task.notes.iter().enumerate() {
                println!(
                    "[{}] {} - {}",
                    index,
                    note.at.format("%Y-%m-%d %H:%M"),
                    crate::ops::filter::note_plain_text(&note.content)
                );
            }
        }
    }
    Ok(())
}

fn cmd_title(engine: &mut Engine, args: TitleArgs) -> CliResult {
    engine.edit_title(TaskId(args.id), &args.title)?;
    println!("Renamed #{} to '{}'", args.id, args.title.trim());
    Ok(())
}

fn cmd_rm(engine: &mut Engine, args: RmArgs) -> CliResult {
    let id = TaskId(args.id);
    engine.delete_task(id)?;
    println!("Deleted #{} (now in trash; `pk trash restore {}` or undo)", args.id, args.id);
    Ok(())
}

fn cmd_undo(engine: &mut Engine) -> CliResult {
    match engine.undo()? {
        UndoOutcome::Applied { description, .. } => println!("Undid: {}", description),
        UndoOutcome::Nothing => println!("Nothing to undo."),
    }
    Ok(())
}

fn cmd_redo(engine: &mut Engine) -> CliResult {
    match engine.redo()? {
        UndoOutcome::Applied { description, .. } => println!("Redid: {}", description),
        UndoOutcome::Nothing => println!("Nothing to redo."),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Trash commands
// ---------------------------------------------------------------------------

fn cmd_trash(engine: &mut Engine, args: TrashCmd, json: bool) -> CliResult {
    match args.command {
        None => {
            if json {
                let entries: Vec<TrashEntryJson> = engine
                    .trash_entries()
                    .into_iter()
                    .map(trash_entry_to_json)
                    .collect();
                println!("{}", serde_json::to_string_pretty(&entries)?);
                return Ok(());
            }
            if engine.trash_count() == 0 {
                println!("Trash is empty.");
                return Ok(());
            }
            println!(
                "Trash ({} of {}):",
                engine.trash_count(),
                crate::ops::trash::TRASH_LIMIT
            );
            for entry in engine.trash_entries() {
                println!(
                    "  #{} {} (trashed {})",
                    entry.task.id,
                    entry.task.title,
                    entry.trashed_at.format("%Y-%m-%d %H:%M")
                );
            }
            Ok(())
        }
        Some(TrashCommands::Restore { id }) => {
            let task = engine.restore_from_trash(TaskId(id))?;
            println!("Restored #{} '{}' to {}", id, task.title, task.column.label());
            Ok(())
        }
        Some(TrashCommands::Purge { id }) => {
            if engine.permanently_delete(TaskId(id)) {
                println!("Permanently deleted #{}", id);
            } else {
                println!("#{} is not in the trash.", id);
            }
            Ok(())
        }
        Some(TrashCommands::Empty) => {
            let count = engine.trash_count();
            engine.empty_trash();
            println!("Emptied the trash ({} cards).", count);
            Ok(())
        }
    }
}
