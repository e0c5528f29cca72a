use std::io::{self, Write};

use anyhow::Result;
use clap::Parser;
use clap::error::ErrorKind;
use crossterm::cursor::MoveTo;
use crossterm::execute;
use crossterm::terminal::{Clear, ClearType};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Editor, Helper};

use crate::cli::{Commands, ShellLine, command_names};
use crate::commands::{Context, execute};

const PROMPT: &str = "minibrs> ";

const BANNER: &str = "
==========================================
   MiniBRS: student task tracking shell
==========================================
Hints:
  help               show the list of commands
  help <command>     help for one command
  exit               leave the shell
  clear              clear the screen
";

/// Completes the first word of a line against command names and aliases.
struct ShellHelper {
    commands: Vec<String>,
}

impl Completer for ShellHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let prefix = &line[..pos];
        let start = prefix.len() - prefix.trim_start().len();
        let word = &prefix[start..];
        if word.contains(char::is_whitespace) {
            return Ok((pos, Vec::new()));
        }
        let candidates = self
            .commands
            .iter()
            .filter(|name| name.starts_with(word))
            .map(|name| Pair {
                display: name.clone(),
                replacement: name.clone(),
            })
            .collect();
        Ok((start, candidates))
    }
}

impl Hinter for ShellHelper {
    type Hint = String;
}

impl Highlighter for ShellHelper {}

impl Validator for ShellHelper {}

impl Helper for ShellHelper {}

#[derive(Debug, PartialEq, Eq)]
pub enum LineOutcome {
    Continue,
    Clear,
    Exit,
}

/// Split a line on whitespace; a `"` toggles quoting and is dropped.
pub fn tokenize(input: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in input.chars() {
        if c == '"' {
            in_quotes = !in_quotes;
        } else if c.is_whitespace() && !in_quotes {
            if !current.is_empty() {
                args.push(std::mem::take(&mut current));
            }
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        args.push(current);
    }
    args
}

/// Handle one line of input. Command errors are printed, never returned.
pub fn run_line(line: &str, ctx: &mut Context, out: &mut impl Write) -> io::Result<LineOutcome> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(LineOutcome::Continue);
    }
    if trimmed.eq_ignore_ascii_case("exit") || trimmed.eq_ignore_ascii_case("quit") {
        writeln!(out, "Goodbye!")?;
        return Ok(LineOutcome::Exit);
    }
    if trimmed.eq_ignore_ascii_case("clear") {
        return Ok(LineOutcome::Clear);
    }

    let argv = tokenize(trimmed);
    if argv.is_empty() {
        return Ok(LineOutcome::Continue);
    }

    match ShellLine::try_parse_from(argv) {
        Ok(ShellLine {
            command: Commands::Shell,
        }) => writeln!(out, "Already in the interactive shell")?,
        Ok(parsed) => {
            if let Err(e) = execute(parsed.command, ctx, out) {
                tracing::debug!(error = ?e, "shell command failed");
                writeln!(out, "Error: {e}")?;
            }
        }
        // Help output arrives as a clap "error" too.
        Err(e) => {
            if !matches!(e.kind(), ErrorKind::DisplayHelp) {
                tracing::debug!(kind = ?e.kind(), "shell line rejected");
            }
            write!(out, "{}", e.render())?;
        }
    }
    Ok(LineOutcome::Continue)
}

fn clear_screen() -> io::Result<()> {
    let mut stdout = io::stdout();
    execute!(stdout, Clear(ClearType::All), MoveTo(0, 0))?;
    stdout.flush()
}

/// Interactive loop until `exit`, Ctrl-C or Ctrl-D.
pub fn run(ctx: &mut Context) -> Result<()> {
    let mut editor: Editor<ShellHelper, DefaultHistory> = Editor::new()?;
    editor.set_helper(Some(ShellHelper {
        commands: command_names(),
    }));

    let mut stdout = io::stdout();
    writeln!(stdout, "{BANNER}")?;

    loop {
        match editor.readline(PROMPT) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    editor.add_history_entry(line.as_str())?;
                }
                match run_line(&line, ctx, &mut stdout)? {
                    LineOutcome::Continue => {}
                    LineOutcome::Clear => clear_screen()?,
                    LineOutcome::Exit => break,
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
                writeln!(stdout, "\nGoodbye!")?;
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use minibrs_core::{AppConfig, Services, SqliteStorage, open_in_memory};

    fn context() -> Context {
        let storage = SqliteStorage::new(Arc::new(open_in_memory().unwrap()));
        Context::with_services(AppConfig::default(), false, Services::new(Arc::new(storage)))
    }

    fn run_text(ctx: &mut Context, line: &str) -> (LineOutcome, String) {
        let mut out = Vec::new();
        let outcome = run_line(line, ctx, &mut out).unwrap();
        (outcome, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_tokenize_groups_quoted_words() {
        assert_eq!(
            tokenize(r#"create-group "Software Engineering" 3"#),
            vec!["create-group", "Software Engineering", "3"]
        );
        assert_eq!(tokenize("  lg   "), vec!["lg"]);
        assert_eq!(tokenize(r#"cs "Ivan "Petrov abc"#), vec!["cs", "Ivan Petrov abc"]);
        assert!(tokenize(r#""""#).is_empty());
    }

    #[test]
    fn test_exit_and_clear() {
        let mut ctx = context();
        assert_eq!(run_text(&mut ctx, "EXIT"), (LineOutcome::Exit, "Goodbye!\n".to_string()));
        assert_eq!(run_text(&mut ctx, "quit").0, LineOutcome::Exit);
        assert_eq!(run_text(&mut ctx, " clear ").0, LineOutcome::Clear);
        assert_eq!(run_text(&mut ctx, "   "), (LineOutcome::Continue, String::new()));
    }

    #[test]
    fn test_quoted_group_name() {
        let mut ctx = context();
        let (outcome, out) = run_text(&mut ctx, r#"cg "Software Engineering" 3"#);
        assert_eq!(outcome, LineOutcome::Continue);
        assert!(out.starts_with("OK: Created group: Software Engineering"));

        let (_, out) = run_text(&mut ctx, "lg");
        assert!(out.contains("- Software Engineering (Course 3) - 0 students"));
    }

    #[test]
    fn test_errors_keep_the_loop_alive() {
        let mut ctx = context();
        let (outcome, out) = run_text(&mut ctx, "cg IT 9");
        assert_eq!(outcome, LineOutcome::Continue);
        assert!(out.starts_with("Error: Validation error: Course number must be between 1 and 6"));

        let (outcome, out) = run_text(&mut ctx, "frobnicate");
        assert_eq!(outcome, LineOutcome::Continue);
        assert!(out.contains("frobnicate"));
    }

    #[test]
    fn test_help_is_rendered() {
        let mut ctx = context();
        let (_, out) = run_text(&mut ctx, "help create-group");
        assert!(out.contains("Create a new group"));
    }

    #[test]
    fn test_completion_candidates() {
        let helper = ShellHelper {
            commands: command_names(),
        };
        let history = DefaultHistory::new();
        let rl_ctx = rustyline::Context::new(&history);

        let (start, pairs) = helper.complete("list-", 5, &rl_ctx).unwrap();
        assert_eq!(start, 0);
        let names: Vec<_> = pairs.iter().map(|p| p.replacement.as_str()).collect();
        assert_eq!(names, vec!["list-groups", "list-students", "list-tasks"]);

        let (_, pairs) = helper.complete("cg IT", 5, &rl_ctx).unwrap();
        assert!(pairs.is_empty());
    }
}
