//! Argument parsing helpers shared by the `gardenctl` subcommands.  Each helper either
//! returns the parsed value or exits with a message and usage hint.

use crate::cli_utils;
use crate::commands::errors::UserError;
use handled::Handle;
use serde_json::Value;
use std::str::FromStr;

/// Parses `input` or exits with the user-facing form of the parse error.
pub fn parse_or_exit<T, E>(input: &str, what: &str) -> T
where
    T: FromStr<Err = E>,
    E: Handle<UserError> + std::fmt::Display,
{
    input.parse().unwrap_or_else(|e: E| {
        if let Some(user_error) = e.handle() {
            if let Some(ref hint) = user_error.usage_hint {
                cli_utils::exit_with_usage_error(&user_error.message, hint);
            } else {
                cli_utils::exit_with_error(&user_error.message);
            }
        } else {
            cli_utils::exit_with_error(&format!("Invalid {}: {}", what, e));
        }
    })
}

/// Parses a JSON object argument or exits with a hint.
pub fn parse_json_object_or_exit(input: &str) -> Value {
    match serde_json::from_str::<Value>(input) {
        Ok(value @ Value::Object(_)) => value,
        Ok(_) => cli_utils::exit_with_error("Record data must be a JSON object"),
        Err(e) => {
            let user_error = e.handle().unwrap_or_else(|| UserError {
                message: e.to_string(),
                usage_hint: None,
            });
            match user_error.usage_hint {
                Some(hint) => cli_utils::exit_with_usage_error(&user_error.message, &hint),
                None => cli_utils::exit_with_error(&user_error.message),
            }
        }
    }
}

/// Exits with `usage` unless `args` (subcommand included) holds between `min_count` and
/// `max_count` entries.
pub fn validate_args_count_or_exit(
    args: &[String],
    min_count: usize,
    max_count: usize,
    command: &str,
    usage: &str,
) {
    if args.len() < min_count {
        cli_utils::exit_with_usage_error(
            &format!("{} command requires more arguments", command),
            usage,
        );
    }
    if args.len() > max_count {
        cli_utils::exit_with_usage_error(
            &format!("{} command has too many arguments", command),
            usage,
        );
    }
}

/// Matches the first argument against the subcommand table and awaits its handler.
macro_rules! dispatch_command {
    ($command_name:expr, $usage:expr, $args:expr, $client:expr, $output_format:expr, {
        $($subcommand:expr => $handler:expr),* $(,)?
    }) => {
        if $args.is_empty() {
            crate::cli_utils::exit_with_usage_error(
                &format!("{} command requires a subcommand", $command_name),
                $usage,
            );
        }

        match $args[0].as_str() {
            $(
                $subcommand => $handler($args, $client, $output_format).await,
            )*
            _ => {
                let available_subcommands = vec![$($subcommand),*];
                crate::cli_utils::exit_with_error(&format!(
                    "Unknown {} subcommand '{}'. Available subcommands: {}",
                    $command_name,
                    $args[0],
                    available_subcommands.join(", ")
                ));
            }
        }
    };
}

pub(crate) use dispatch_command;
