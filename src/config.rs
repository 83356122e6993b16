//! Command line configuration.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::codec::Encoding;
use crate::editor::DEFAULT_FIELD_NAME;
use crate::preview::PreviewFormat;

pub const LOG_FILE_NAME: &str = "codequiz-builder.log";

#[derive(Debug, Parser)]
#[command(
    name = "codequiz-builder",
    version,
    about = "Compose code-quiz tasks from segments",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    /// Serialization used for task documents in this deployment
    #[arg(long, global = true, env = "CODEQUIZ_ENCODING", value_enum, default_value_t = Encoding::Typed)]
    pub encoding: Encoding,

    /// Where the interactive editor writes its log
    #[arg(long, global = true, env = "CODEQUIZ_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Task to edit when no subcommand is given
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Command {
    /// Open a task in the interactive editor
    Edit {
        file: PathBuf,

        /// Name of the output field the task is stored under
        #[arg(long, default_value = DEFAULT_FIELD_NAME)]
        field: String,
    },
    /// Re-encode a stored task with another serialization
    Convert {
        file: PathBuf,

        #[arg(long, value_enum)]
        to: Encoding,

        /// Write the result here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Write the result next to FILE as `<stem>.<encoding>.json`
        #[arg(long, conflicts_with = "output")]
        write: bool,
    },
    /// Print the participant view of a task
    Preview {
        file: PathBuf,

        #[arg(long, value_enum, default_value_t = PreviewFormat::Markdown)]
        format: PreviewFormat,

        /// Include the solutions
        #[arg(long)]
        solutions: bool,
    },
    /// Check participant answers against a task
    Grade {
        file: PathBuf,

        /// JSON object of answers keyed by segment number
        #[arg(value_name = "ANSWERS")]
        submissions: PathBuf,
    },
}

impl Cli {
    /// The subcommand to run; a bare `FILE` means `edit FILE`.
    pub fn resolved_command(&self) -> Option<Command> {
        match (&self.command, &self.file) {
            (Some(command), _) => Some(command.clone()),
            (None, Some(file)) => Some(Command::Edit {
                file: file.clone(),
                field: DEFAULT_FIELD_NAME.to_string(),
            }),
            (None, None) => None,
        }
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(LOG_FILE_NAME))
    }
}
