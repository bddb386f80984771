//! Command-line argument parsing.

use std::path::PathBuf;

use docdash::JobId;
use thiserror::Error;

pub const USAGE: &str = "\
Usage: docdash [--config <path>] <command> [args]

Commands:
  upload <file>...   Upload documents and follow them until processed
  jobs               List processed and in-flight jobs
  watch              List jobs and follow them until every job is finished
  show <id>          Show the summary of a job
  delete <id>        Delete a job
  chat <id>          Ask questions about a processed document (reads stdin)
  help               Show this message

Options:
  -c, --config <path>  Config file (default: <config dir>/docdash/config.yaml)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Upload { files: Vec<PathBuf> },
    Jobs,
    Watch,
    Show { id: JobId },
    Delete { id: JobId },
    Chat { id: JobId },
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cli {
    pub config: Option<PathBuf>,
    pub command: Command,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ArgsError {
    #[error("No command given")]
    MissingCommand,

    #[error("Unknown command '{0}'")]
    UnknownCommand(String),

    #[error("Unknown option '{0}'")]
    UnknownOption(String),

    #[error("'{command}' requires {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    #[error("'{0}' is not a valid job id")]
    InvalidJobId(String),

    #[error("Unexpected argument '{0}'")]
    UnexpectedArgument(String),
}

/// Parses everything after the program name.
pub fn parse_args<I, S>(args: I) -> Result<Cli, ArgsError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut config = None;
    let mut positional = Vec::new();
    let mut args = args.into_iter().map(Into::into);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-c" | "--config" => {
                let path = args.next().ok_or(ArgsError::MissingArgument {
                    command: "--config",
                    argument: "a path",
                })?;
                config = Some(PathBuf::from(path));
            }
            "-h" | "--help" => positional.insert(0, "help".to_string()),
            _ if arg.starts_with("--config=") => {
                config = Some(PathBuf::from(&arg["--config=".len()..]));
            }
            _ if arg.starts_with('-') && arg.len() > 1 && positional.is_empty() => {
                return Err(ArgsError::UnknownOption(arg));
            }
            _ => positional.push(arg),
        }
    }

    let mut positional = positional.into_iter();
    let name = positional.next().ok_or(ArgsError::MissingCommand)?;
    let rest: Vec<String> = positional.collect();

    let command = match name.as_str() {
        "upload" => {
            if rest.is_empty() {
                return Err(ArgsError::MissingArgument {
                    command: "upload",
                    argument: "at least one file",
                });
            }
            Command::Upload {
                files: rest.into_iter().map(PathBuf::from).collect(),
            }
        }
        "jobs" | "list" => {
            no_more(&rest)?;
            Command::Jobs
        }
        "watch" => {
            no_more(&rest)?;
            Command::Watch
        }
        "show" => Command::Show {
            id: single_id("show", &rest)?,
        },
        "delete" => Command::Delete {
            id: single_id("delete", &rest)?,
        },
        "chat" => Command::Chat {
            id: single_id("chat", &rest)?,
        },
        "help" => Command::Help,
        _ => return Err(ArgsError::UnknownCommand(name)),
    };

    Ok(Cli { config, command })
}

fn no_more(rest: &[String]) -> Result<(), ArgsError> {
    match rest.first() {
        Some(extra) => Err(ArgsError::UnexpectedArgument(extra.clone())),
        None => Ok(()),
    }
}

fn single_id(command: &'static str, rest: &[String]) -> Result<JobId, ArgsError> {
    let raw = rest.first().ok_or(ArgsError::MissingArgument {
        command,
        argument: "a job id",
    })?;
    no_more(&rest[1..])?;
    raw.trim_start_matches('#')
        .parse::<JobId>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ArgsError::InvalidJobId(raw.clone()))
}
