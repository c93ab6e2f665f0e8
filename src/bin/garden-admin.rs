//! Account administration for garden.
//!
//! Works directly against the database, so the first superuser can be created before the
//! server hands out any token.

use arrrg::CommandLine;
use arrrg_derive::CommandLine;

use garden::commands::{handle_createuser_command, handle_token_command};
use garden::{GardenConfig, PgStore, cli_utils};

#[derive(CommandLine, Default, PartialEq, Eq)]
struct Options {
    #[arrrg(optional, "PostgreSQL database URL (default: DATABASE_URL or POSTGRES_*)")]
    database_url: String,
    #[arrrg(flag, "Create the account as a superuser")]
    superuser: bool,
}

const USAGE: &str = r#"Usage: garden-admin [options] <command> [args...]

Options:
  --database-url <URL>   PostgreSQL database URL (default: DATABASE_URL or POSTGRES_*)
  --superuser            Create the account as a superuser

Commands:
  createuser <username> <password>   Create an account
  token <username>                   Print the API token of an account, creating it if needed"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (options, free) = Options::from_command_line_relaxed("USAGE: garden-admin <command> [args...]");

    if free.is_empty() {
        cli_utils::exit_with_usage_error("No command specified", USAGE);
    }

    let database_url = if options.database_url.is_empty() {
        match GardenConfig::from_env()?.database_url {
            Some(url) => url,
            None => cli_utils::exit_with_usage_error("No database configured", USAGE),
        }
    } else {
        options.database_url
    };
    let store = PgStore::connect(&database_url).await?;

    match free[0].as_str() {
        "createuser" => handle_createuser_command(&store, &free[1..], options.superuser).await,
        "token" => handle_token_command(&store, &free[1..]).await,
        other => cli_utils::exit_with_usage_error(&format!("Unknown command '{}'", other), USAGE),
    }

    Ok(())
}
