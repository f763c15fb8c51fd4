use std::io::{self, BufRead, Write};

use clap::Parser;

use crate::cli::commands::{Cli, Commands};
use crate::cli::handlers;
use crate::engine::Engine;
use crate::ops::events::EngineEvent;

/// Interactive session: the same command grammar as the one-shot CLI,
/// against a single engine, so undo/redo history spans the whole session.
/// The event printer stands in for a renderer subscribing to the engine.
pub fn run(mut engine: Engine, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    engine.subscribe(Box::new(|event| match event {
        EngineEvent::TaskRestored { id } => println!("~ card #{} restored", id),
        EngineEvent::TaskRemoved { id } => println!("~ card #{} removed", id),
        EngineEvent::TaskUpdated { id, old_column } => match old_column {
            Some(column) => println!("~ card #{} updated (was in {})", id, column.label()),
            None => println!("~ card #{} updated", id),
        },
    }));

    println!(
        "[#] plank board '{}'. Commands as in `pk --help`; 'quit' leaves.",
        engine.config().board.name
    );

    let stdin = io::stdin();
    loop {
        print!("plank> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "exit" {
            break;
        }

        let argv = std::iter::once("pk".to_string()).chain(split_words(line));
        match Cli::try_parse_from(argv) {
            Ok(cli) => {
                let Some(cmd) = cli.command else { continue };
                if matches!(cmd, Commands::Init(_)) {
                    eprintln!("error: init is not available inside a session");
                    continue;
                }
                if let Err(e) = handlers::run_command(&mut engine, cmd, json || cli.json) {
                    eprintln!("error: {}", e);
                }
                if let Some(warning) = engine.persist_warning() {
                    eprintln!("warning: {}", warning);
                }
            }
            // clap's error output doubles as help ("help", "--help", typos)
            Err(e) => eprintln!("{}", e),
        }
    }
    Ok(())
}

/// Split a command line into words, honoring single and double quotes
fn split_words(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '\'' || c == '"' => quote = Some(c),
            None if c.is_whitespace() => {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            None => current.push(c),
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}
