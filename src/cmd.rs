//! Interactive command loop.
//!
//! Each menu selection is handled as its own load/mutate/save cycle against
//! the task file; nothing is cached between commands.

use std::io::{self, BufRead, Write};

use chrono::{DateTime, Local};
use tracing::Level;

use crate::config::Config;
use crate::db::{parse_id, validate_name, Completion};
use crate::error::StoreError;
use crate::logging::Diagnostics;
use crate::store::TaskStore;

const MENU: &str = "\tChoose an action:\n\
1. Add task\n\
2. List tasks\n\
3. Delete task\n\
4. Mark task as completed\n\
5. Exit";

/// A numbered entry of the main menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Add,
    List,
    Delete,
    Complete,
    Exit,
}

impl MenuChoice {
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim() {
            "1" => Some(MenuChoice::Add),
            "2" => Some(MenuChoice::List),
            "3" => Some(MenuChoice::Delete),
            "4" => Some(MenuChoice::Complete),
            "5" => Some(MenuChoice::Exit),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MenuChoice::Add => "add",
            MenuChoice::List => "list",
            MenuChoice::Delete => "delete",
            MenuChoice::Complete => "complete",
            MenuChoice::Exit => "exit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    MainMenu,
    Exiting,
}

/// Reads menu selections from `input`, writes prompts and results to `output`.
pub struct Dispatcher<'a, R, W> {
    store: TaskStore<'a>,
    diag: &'a dyn Diagnostics,
    input: R,
    output: W,
    handled: usize,
    started: DateTime<Local>,
}

impl<'a, R: BufRead, W: Write> Dispatcher<'a, R, W> {
    pub fn new(config: &Config, diag: &'a dyn Diagnostics, input: R, output: W) -> Self {
        Dispatcher {
            store: TaskStore::new(config.db_path.clone(), diag),
            diag,
            input,
            output,
            handled: 0,
            started: Local::now(),
        }
    }

    /// Run the menu loop until the user exits or input ends.
    pub fn run(&mut self) -> io::Result<()> {
        let path = self.store.path().display();
        let started = self.started.format("%Y-%m-%d %H:%M:%S");
        self.diag.log(
            Level::INFO,
            "Program started",
            &[("db", &path), ("at", &started)],
        );

        while self.step()? == State::MainMenu {}
        Ok(())
    }

    /// Show the menu, read one selection and handle it.
    pub fn step(&mut self) -> io::Result<State> {
        writeln!(self.output, "{MENU}")?;
        self.output.flush()?;

        let Some(line) = self.read_line()? else {
            self.diag.log(Level::WARN, "Input closed", &[]);
            return self.cmd_exit();
        };

        let Some(choice) = MenuChoice::parse(&line) else {
            let input = line.trim();
            self.diag.log(Level::WARN, "Invalid menu choice", &[("input", &input)]);
            writeln!(self.output, "Invalid choice. Try again.")?;
            return Ok(State::MainMenu);
        };

        self.handled += 1;
        self.diag.log(
            Level::INFO,
            "Menu selection",
            &[("choice", &choice.as_str())],
        );

        match choice {
            MenuChoice::Add => self.cmd_add()?,
            MenuChoice::List => self.cmd_list()?,
            MenuChoice::Delete => self.cmd_delete()?,
            MenuChoice::Complete => self.cmd_complete()?,
            MenuChoice::Exit => return self.cmd_exit(),
        }
        Ok(State::MainMenu)
    }

    /// Prompt for a name and append a new task.
    fn cmd_add(&mut self) -> io::Result<()> {
        let Some(raw) = self.prompt("Enter task name:")? else {
            return Ok(());
        };

        let name = match validate_name(&raw) {
            Ok(name) => name,
            Err(e) => {
                self.diag.log(Level::WARN, "Rejected task name", &[("error", &e)]);
                writeln!(self.output, "Task name cannot be empty.")?;
                return Ok(());
            }
        };

        let added = self.store.modify(|tasks| {
            let added = tasks.add(name.as_str()).map(|t| t.id);
            let changed = added.is_ok();
            (added, changed)
        });

        match added {
            Ok(Ok(id)) => {
                self.diag.log(
                    Level::INFO,
                    "Task added",
                    &[("id", &id), ("name", &name)],
                );
                writeln!(self.output, "Task added with id {id}.")
            }
            Ok(Err(e)) => {
                self.diag.log(Level::ERROR, "Task not added", &[("error", &e)]);
                writeln!(self.output, "Error: {e}. Nothing was changed.")
            }
            Err(e) => self.report_store_error(&e),
        }
    }

    /// Print every task in stored order.
    fn cmd_list(&mut self) -> io::Result<()> {
        let tasks = match self.store.load() {
            Ok(tasks) => tasks,
            Err(e) => return self.report_store_error(&e),
        };

        if tasks.is_empty() {
            self.diag.log(Level::INFO, "Task list is empty", &[]);
            writeln!(self.output, "Task list is empty.")?;
        }

        writeln!(self.output, "\n=== TASKS ===")?;
        for t in tasks.list() {
            writeln!(
                self.output,
                "Id: {}, Task: {}, Completed: {}",
                t.id, t.name, t.completed
            )?;
        }

        let count = tasks.len();
        let pending = tasks.pending_count();
        self.diag.log(
            Level::INFO,
            "Task list displayed",
            &[("count", &count), ("pending", &pending)],
        );
        Ok(())
    }

    /// Prompt for an id and remove that task.
    fn cmd_delete(&mut self) -> io::Result<()> {
        let Some(id) = self.prompt_id("Enter the id of the task to delete:")? else {
            return Ok(());
        };

        let removed = self.store.modify(|tasks| {
            let removed = tasks.delete(id);
            let changed = removed.is_some();
            (removed, changed)
        });

        match removed {
            Ok(Some(task)) => {
                self.diag.log(
                    Level::INFO,
                    "Task deleted",
                    &[("id", &id), ("name", &task.name)],
                );
                writeln!(self.output, "Task deleted.")
            }
            Ok(None) => {
                self.diag.log(Level::INFO, "Task not found", &[("id", &id)]);
                writeln!(self.output, "Task not found.")
            }
            Err(e) => self.report_store_error(&e),
        }
    }

    /// Prompt for an id and mark that task done.
    fn cmd_complete(&mut self) -> io::Result<()> {
        let Some(id) = self.prompt_id("Enter the id of the task to mark as completed:")? else {
            return Ok(());
        };

        let outcome = self.store.modify(|tasks| {
            let outcome = tasks.complete(id);
            (outcome, outcome == Completion::Marked)
        });

        match outcome {
            Ok(Completion::Marked) => {
                self.diag.log(Level::INFO, "Task marked as completed", &[("id", &id)]);
                writeln!(self.output, "Task marked as completed.")
            }
            Ok(Completion::AlreadyDone) => {
                self.diag.log(Level::INFO, "Task already completed", &[("id", &id)]);
                writeln!(self.output, "Task was already completed.")
            }
            Ok(Completion::NotFound) => {
                self.diag.log(Level::INFO, "Task not found", &[("id", &id)]);
                writeln!(self.output, "Task not found.")
            }
            Err(e) => self.report_store_error(&e),
        }
    }

    /// Tell the user a command was aborted by the task file.
    fn report_store_error(&mut self, e: &StoreError) -> io::Result<()> {
        let (stage, outcome) = if e.is_save_failure() {
            ("save", "The change was not saved.")
        } else {
            ("load", "Nothing was changed.")
        };
        self.diag.log(Level::WARN, "Command aborted", &[("stage", &stage)]);
        writeln!(self.output, "Error: {e}. {outcome}")
    }

    fn cmd_exit(&mut self) -> io::Result<State> {
        let elapsed = (Local::now() - self.started).num_seconds();
        let handled = self.handled;
        self.diag.log(
            Level::INFO,
            "Program exiting",
            &[("commands", &handled), ("session_secs", &elapsed)],
        );
        writeln!(self.output, "Goodbye.")?;
        self.output.flush()?;
        Ok(State::Exiting)
    }

    /// Ask for a task id. Invalid input is reported here and yields `None`.
    fn prompt_id(&mut self, question: &str) -> io::Result<Option<u64>> {
        let Some(raw) = self.prompt(question)? else {
            return Ok(None);
        };
        match parse_id(&raw) {
            Ok(id) => Ok(Some(id)),
            Err(e) => {
                self.diag.log(Level::WARN, "Invalid task id entered", &[("error", &e)]);
                writeln!(self.output, "Invalid id. Try again.")?;
                Ok(None)
            }
        }
    }

    fn prompt(&mut self, question: &str) -> io::Result<Option<String>> {
        writeln!(self.output, "{question}")?;
        self.output.flush()?;
        self.read_line()
    }

    /// Read one line without its terminator; `None` at end of input.
    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let len = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(len);
        Ok(Some(line))
    }
}
