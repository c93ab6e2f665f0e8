use arrrg::CommandLine;
use arrrg_derive::CommandLine;

use garden::commands::{Collection, handle_record_command, handle_upload_command};
use garden::{
    RecordKind,
    cli_utils::{self, OutputFormat},
    http_utils,
};

#[derive(CommandLine, Default, PartialEq, Eq)]
struct Options {
    #[arrrg(optional, "Base URL of the garden server")]
    base_url: String,
    #[arrrg(optional, "API token (default: GARDEN_TOKEN)")]
    token: String,
    #[arrrg(
        optional,
        "Output format for get/list commands: json or yaml (default: json)"
    )]
    output: OutputFormat,
}

const USAGE: &str = r#"Usage: gardenctl [options] <command> [args...]

Options:
  --base-url <url>     Base URL of the garden server (default: http://localhost:8000)
  --token <key>        API token (default: GARDEN_TOKEN)
  --output <format>    Output format for get/list commands: json or yaml (default: json)

Commands:
  <collection> list                  List all records
  <collection> get <id>              Get a record
  <collection> create <json>         Create a record (superuser)
  <collection> update <id> <json>    Replace a record (superuser)
  <collection> patch <id> <json>     Change some fields of a record
  <collection> delete <id>           Delete a record and what links to it (superuser)
  upload <flora-id> <file>           Upload the picture of a flora (superuser)

Collections:
  floras, taxons, collect_places, coords, herbariums, labels, comments"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (options, free) = Options::from_command_line_relaxed("USAGE: gardenctl <command> [args...]");

    if free.is_empty() {
        cli_utils::exit_with_usage_error("No command specified", USAGE);
    }

    let base_url = if options.base_url.is_empty() {
        "http://localhost:8000".to_string()
    } else {
        options.base_url
    };
    let token = if options.token.is_empty() {
        std::env::var("GARDEN_TOKEN").ok()
    } else {
        Some(options.token)
    };

    let client = http_utils::GardenClient::new(base_url, token);

    match free[0].as_str() {
        "upload" => {
            handle_upload_command(&free[1..], &client, options.output).await;
        }
        name => match name.parse::<RecordKind>() {
            Ok(kind) => {
                let collection = Collection {
                    kind,
                    client: &client,
                };
                handle_record_command(&free[1..], &collection, options.output).await;
            }
            Err(_) => {
                cli_utils::exit_with_usage_error(&format!("Unknown command '{}'", name), USAGE);
            }
        },
    }

    Ok(())
}
