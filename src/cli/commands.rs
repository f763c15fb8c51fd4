use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pk", about = concat!("[#] plank v", env!("CARGO_PKG_VERSION"), " - a kanban board that can take it back"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Run against a different board directory
    #[arg(short = 'C', long = "board-dir", global = true)]
    pub board_dir: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new board in the current directory
    Init(InitArgs),
    /// List cards, column by column
    List(ListArgs),
    /// Show one card in full
    Show(ShowArgs),
    /// Show per-column card counts
    Counts(CountsArgs),
    /// Add a card
    Add(AddArgs),
    /// Move a card to another column
    Mv(MvArgs),
    /// Set a card's priority
    Pri(PriArgs),
    /// Add a tag (or remove one with --rm)
    Tag(TagArgs),
    /// Set or clear a card's due date
    Due(DueArgs),
    /// Adjust a card's work timer by signed minutes
    Timer(TimerArgs),
    /// Add a note (or remove one with --rm)
    Note(NoteArgs),
    /// Rename a card
    Title(TitleArgs),
    /// Delete a card (soft delete; it lands in the trash)
    Rm(RmArgs),
    /// Undo the last change made in this session
    Undo,
    /// Redo the last undone change
    Redo,
    /// Show a card's audit history
    History(HistoryArgs),
    /// List the trash, or restore/purge/empty it
    Trash(TrashCmd),
}

// ---------------------------------------------------------------------------
// Init args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct InitArgs {
    /// Board name (default: inferred from directory name)
    #[arg(long)]
    pub name: Option<String>,
    /// Reinitialize even if .plank/ already exists
    #[arg(long)]
    pub force: bool,
}

// ---------------------------------------------------------------------------
// Read command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ListArgs {
    /// Only this column (todo, in-progress, on-hold, done)
    #[arg(long)]
    pub column: Option<String>,
    /// Filter by tag (repeatable; any match shows the card)
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    /// Filter by search text (title, notes, tags, priority)
    #[arg(long)]
    pub search: Option<String>,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Card id
    pub id: u64,
}

#[derive(Args)]
pub struct CountsArgs {
    /// Only this column
    #[arg(long)]
    pub column: Option<String>,
    /// Filter by tag (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    /// Filter by search text
    #[arg(long)]
    pub search: Option<String>,
}

#[derive(Args)]
pub struct HistoryArgs {
    /// Card id
    pub id: u64,
}

// ---------------------------------------------------------------------------
// Write command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct AddArgs {
    /// Card title
    pub title: String,
    /// Column to create the card in (default: todo)
    #[arg(long)]
    pub column: Option<String>,
    /// Priority (none, low, medium, high)
    #[arg(long)]
    pub priority: Option<String>,
    /// Tag to attach (repeatable, max 5)
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    /// Due date (YYYY-MM-DD)
    #[arg(long)]
    pub due: Option<String>,
}

#[derive(Args)]
pub struct MvArgs {
    /// Card id
    pub id: u64,
    /// Target column
    pub column: String,
}

#[derive(Args)]
pub struct PriArgs {
    /// Card id
    pub id: u64,
    /// Priority (none, low, medium, high)
    pub priority: String,
}

#[derive(Args)]
pub struct TagArgs {
    /// Card id
    pub id: u64,
    /// Tag id
    pub tag: String,
    /// Remove the tag instead of adding it
    #[arg(long)]
    pub rm: bool,
}

#[derive(Args)]
pub struct DueArgs {
    /// Card id
    pub id: u64,
    /// Due date (YYYY-MM-DD)
    pub date: Option<String>,
    /// Clear the due date
    #[arg(long)]
    pub clear: bool,
}

#[derive(Args)]
pub struct TimerArgs {
    /// Card id
    pub id: u64,
    /// Signed minutes, e.g. +25 or -10
    #[arg(allow_hyphen_values = true)]
    pub minutes: String,
}

#[derive(Args)]
pub struct NoteArgs {
    /// Card id
    pub id: u64,
    /// Note text (omit to list notes)
    pub text: Option<String>,
    /// Remove the note at this index instead
    #[arg(long)]
    pub rm: Option<usize>,
}

#[derive(Args)]
pub struct TitleArgs {
    /// Card id
    pub id: u64,
    /// New title
    pub title: String,
}

#[derive(Args)]
pub struct RmArgs {
    /// Card id
    pub id: u64,
}

// ---------------------------------------------------------------------------
// Trash args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct TrashCmd {
    #[command(subcommand)]
    pub command: Option<TrashCommands>,
}

#[derive(Subcommand)]
pub enum TrashCommands {
    /// Restore a trashed card to the board
    Restore {
        /// Card id
        id: u64,
    },
    /// Permanently delete a trashed card
    Purge {
        /// Card id
        id: u64,
    },
    /// Permanently delete everything in the trash
    Empty,
}
