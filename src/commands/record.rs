//! # Record Command Handler
//!
//! This module handles `gardenctl <collection> ...` commands: listing, reading, creating,
//! replacing, patching and deleting records of one collection over the REST API.

use serde_json::Value;
use uuid::Uuid;

use crate::{
    cli_utils,
    commands::shared::{
        dispatch_command, parse_json_object_or_exit, parse_or_exit, validate_args_count_or_exit,
    },
    http_utils,
    record::RecordKind,
};

const RECORD_USAGE: &str =
    "Usage: gardenctl <collection> <list|get|create|update|patch|delete> [args...]";

/// One collection of the API, as addressed by a command.
pub struct Collection<'a> {
    /// The record kind behind the collection.
    pub kind: RecordKind,
    /// HTTP client for API communication.
    pub client: &'a http_utils::GardenClient,
}

impl Collection<'_> {
    fn path(&self) -> String {
        format!("{}/", self.kind.collection())
    }

    fn item_path(&self, id: Uuid) -> String {
        format!("{}/{}/", self.kind.collection(), id)
    }

    fn usage(&self, rest: &str) -> String {
        format!("Usage: gardenctl {} {}", self.kind.collection(), rest)
    }
}

/// Handles all record commands for one collection.
///
/// # Arguments
/// * `args` - Command arguments (first element is the subcommand)
/// * `collection` - The collection and the client to reach it
/// * `output_format` - Output format for get/list commands
pub async fn handle_record_command(
    args: &[String],
    collection: &Collection<'_>,
    output_format: cli_utils::OutputFormat,
) {
    dispatch_command!(collection.kind.collection(), RECORD_USAGE, args, collection, output_format, {
        "list" => handle_list,
        "get" => handle_get,
        "create" => handle_create,
        "update" => handle_update,
        "patch" => handle_patch,
        "delete" => handle_delete,
    });
}

async fn handle_list(
    args: &[String],
    collection: &Collection<'_>,
    output_format: cli_utils::OutputFormat,
) {
    validate_args_count_or_exit(args, 1, 1, "list", &collection.usage("list"));
    let path = collection.path();
    let records = http_utils::execute_or_exit(
        || collection.client.get::<Vec<Value>>(&path),
        &format!("List {}", collection.kind.collection()),
    )
    .await;

    if records.is_empty() {
        println!("No {} found", collection.kind.collection());
    } else {
        cli_utils::print_formatted_or_exit(&records, output_format, collection.kind.collection());
    }
}

async fn handle_get(
    args: &[String],
    collection: &Collection<'_>,
    output_format: cli_utils::OutputFormat,
) {
    validate_args_count_or_exit(args, 2, 2, "get", &collection.usage("get <id>"));
    let id: Uuid = parse_or_exit(&args[1], "record id");
    let path = collection.item_path(id);
    let record = http_utils::execute_or_exit(
        || collection.client.get::<Value>(&path),
        &format!("Get {}", collection.kind.singular()),
    )
    .await;
    cli_utils::print_formatted_or_exit(&record, output_format, collection.kind.singular());
}

async fn handle_create(
    args: &[String],
    collection: &Collection<'_>,
    output_format: cli_utils::OutputFormat,
) {
    validate_args_count_or_exit(args, 2, 2, "create", &collection.usage("create <json>"));
    let data = parse_json_object_or_exit(&args[1]);
    let path = collection.path();
    let record = http_utils::execute_or_exit(
        || collection.client.post::<Value, Value>(&path, &data),
        &format!("Create {}", collection.kind.singular()),
    )
    .await;
    cli_utils::print_formatted_or_exit(&record, output_format, collection.kind.singular());
}

async fn handle_update(
    args: &[String],
    collection: &Collection<'_>,
    output_format: cli_utils::OutputFormat,
) {
    validate_args_count_or_exit(args, 3, 3, "update", &collection.usage("update <id> <json>"));
    let id: Uuid = parse_or_exit(&args[1], "record id");
    let data = parse_json_object_or_exit(&args[2]);
    let path = collection.item_path(id);
    let record = http_utils::execute_or_exit(
        || collection.client.put::<Value, Value>(&path, &data),
        &format!("Update {}", collection.kind.singular()),
    )
    .await;
    cli_utils::print_formatted_or_exit(&record, output_format, collection.kind.singular());
}

async fn handle_patch(
    args: &[String],
    collection: &Collection<'_>,
    output_format: cli_utils::OutputFormat,
) {
    validate_args_count_or_exit(args, 3, 3, "patch", &collection.usage("patch <id> <json>"));
    let id: Uuid = parse_or_exit(&args[1], "record id");
    let data = parse_json_object_or_exit(&args[2]);
    let path = collection.item_path(id);
    let record = http_utils::execute_or_exit(
        || collection.client.patch::<Value, Value>(&path, &data),
        &format!("Patch {}", collection.kind.singular()),
    )
    .await;
    cli_utils::print_formatted_or_exit(&record, output_format, collection.kind.singular());
}

async fn handle_delete(
    args: &[String],
    collection: &Collection<'_>,
    _output_format: cli_utils::OutputFormat,
) {
    validate_args_count_or_exit(args, 2, 2, "delete", &collection.usage("delete <id>"));
    let id: Uuid = parse_or_exit(&args[1], "record id");
    let path = collection.item_path(id);
    http_utils::execute_or_exit(
        || collection.client.delete(&path),
        &format!("Delete {}", collection.kind.singular()),
    )
    .await;
    cli_utils::print_success(&format!("Deleted {} {}", collection.kind.singular(), id));
}

/// Handles `gardenctl upload <flora-id> <file>`.
pub async fn handle_upload_command(
    args: &[String],
    client: &http_utils::GardenClient,
    output_format: cli_utils::OutputFormat,
) {
    const UPLOAD_USAGE: &str = "Usage: gardenctl upload <flora-id> <file>";
    validate_args_count_or_exit(args, 2, 2, "upload", UPLOAD_USAGE);
    let id: Uuid = parse_or_exit(&args[0], "flora id");
    let path = std::path::Path::new(&args[1]);
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) => cli_utils::exit_with_error(&crate::commands::errors::format_cli_error(&e)),
    };
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("upload");
    let picture_path = format!("floras/{}/picture/", id);
    let query = [("filename", filename)];
    let record = http_utils::execute_or_exit(
        || client.put_bytes::<Value>(&picture_path, &query, data),
        "Upload picture",
    )
    .await;
    cli_utils::print_formatted_or_exit(&record, output_format, "flora");
}
