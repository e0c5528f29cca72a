use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};

use minibrs_core::Backend;

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "minibrs",
    about = "MiniBRS: track student groups and their task submissions",
    version,
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file to use instead of ~/.config/minibrs/config.toml.
    #[arg(long, global = true, env = "MINIBRS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for scripts).
    /// Also enabled by setting MINIBRS_JSON=1.
    #[arg(long, global = true)]
    pub json: bool,

    /// Storage backend, overriding the config file.
    #[arg(long, global = true)]
    pub backend: Option<Backend>,

    /// Verbose logging to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// One line typed into the interactive shell.
#[derive(Parser, Debug)]
#[command(name = "minibrs", no_binary_name = true, disable_version_flag = true)]
pub struct ShellLine {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Create a new group.
    #[command(visible_alias = "cg", after_help = "Example:\n  create-group \"Software Engineering\" 3")]
    CreateGroup {
        /// Group name.
        name: String,
        /// Course number (1-6).
        #[arg(allow_negative_numbers = true)]
        course: i64,
    },

    /// List all groups with their student counts.
    #[command(visible_alias = "lg")]
    ListGroups,

    /// Delete a group with its students and their tasks.
    #[command(visible_alias = "dg")]
    DeleteGroup {
        /// Group UUID.
        group_id: String,
    },

    /// Rename a group and change its course.
    #[command(visible_alias = "ug", after_help = "Example:\n  update-group <uuid> \"New name\" 2")]
    UpdateGroup {
        /// Group UUID.
        group_id: String,
        /// New name.
        name: String,
        /// New course number (1-6).
        #[arg(allow_negative_numbers = true)]
        course: i64,
    },

    /// Show submission progress for every student in a group.
    #[command(visible_alias = "rg")]
    ReportGroup {
        /// Group UUID.
        group_id: String,
    },

    /// Add a student to a group.
    #[command(visible_alias = "cs", after_help = "Example:\n  create-student \"Ivan Petrov\" <groupUuid>")]
    CreateStudent {
        /// Student name.
        name: String,
        /// Group UUID.
        group_id: String,
    },

    /// List the students of a group.
    #[command(visible_alias = "ls")]
    ListStudents {
        /// Group UUID.
        group_id: String,
    },

    /// Delete a student and its tasks.
    #[command(visible_alias = "ds")]
    DeleteStudent {
        /// Student UUID.
        student_id: String,
    },

    /// Rename a student and move it to a group.
    #[command(visible_alias = "us", after_help = "Example:\n  update-student <uuid> \"New name\" <groupUuid>")]
    UpdateStudent {
        /// Student UUID.
        student_id: String,
        /// New name.
        name: String,
        /// Target group UUID.
        group_id: String,
    },

    /// Mark a task as submitted.
    #[command(visible_alias = "mt")]
    MarkTask {
        /// Student UUID.
        student_id: String,
        /// Task number (1-3).
        number: u32,
    },

    /// Reset a task to not submitted.
    #[command(visible_alias = "rt")]
    ResetTask {
        /// Student UUID.
        student_id: String,
        /// Task number (1-3).
        number: u32,
    },

    /// List the tasks of a student.
    #[command(visible_alias = "lt")]
    ListTasks {
        /// Student UUID.
        student_id: String,
    },

    /// Start the interactive shell (the default with no command).
    Shell,

    /// Config management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Run diagnostics.
    Doctor,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigAction {
    /// Show all config values.
    List,
    /// Get a specific config key.
    Get { key: String },
    /// Print the config file location.
    Path,
}

/// Command names and aliases offered by shell completion.
pub fn command_names() -> Vec<String> {
    let cmd = Cli::command();
    let mut names: Vec<String> = cmd
        .get_subcommands()
        .flat_map(|sub| {
            std::iter::once(sub.get_name().to_string())
                .chain(sub.get_visible_aliases().map(str::to_string))
        })
        .collect();
    names.extend(["help", "exit", "quit", "clear"].map(String::from));
    names.sort();
    names.dedup();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
        ShellLine::command().debug_assert();
    }

    #[test]
    fn test_aliases_parse() {
        let cli = Cli::try_parse_from(["minibrs", "cg", "IT-21", "2"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::CreateGroup {
                name: "IT-21".to_string(),
                course: 2
            })
        );

        let line = ShellLine::try_parse_from(["mt", "abc", "3"]).unwrap();
        assert_eq!(
            line.command,
            Commands::MarkTask {
                student_id: "abc".to_string(),
                number: 3
            }
        );
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["minibrs", "lg", "--json", "--backend", "json", "-v"]).unwrap();
        assert!(cli.json);
        assert!(cli.verbose);
        assert_eq!(cli.backend, Some(Backend::Json));
        assert!(Cli::try_parse_from(["minibrs", "--backend", "mysql"]).is_err());
    }

    #[test]
    fn test_negative_course_reaches_validation() {
        let cli = Cli::try_parse_from(["minibrs", "create-group", "IT", "-1"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::CreateGroup { course: -1, .. })));
    }

    #[test]
    fn test_command_names_include_aliases() {
        let names = command_names();
        for expected in ["create-group", "cg", "list-tasks", "lt", "exit", "clear", "doctor"] {
            assert!(names.iter().any(|n| n == expected), "missing {expected}");
        }
    }
}
