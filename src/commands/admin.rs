//! # Account Administration
//!
//! `garden-admin` talks to the database directly rather than through the API, so it can
//! bootstrap the first superuser before any token exists.

use handled::Handle;

use crate::account::{Account, AccountError, issue_token};
use crate::cli_utils;
use crate::commands::errors::UserError;
use crate::commands::shared::validate_args_count_or_exit;
use crate::data_store::AccountStore;
use crate::errors::StoreError;

/// Errors raised by account administration commands.
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    /// No account has the username.
    #[error("no account named {0:?}")]
    UnknownUser(String),

    /// The username is taken.
    #[error("an account named {0:?} already exists")]
    UsernameTaken(String),

    /// The account could not be built.
    #[error(transparent)]
    Account(#[from] AccountError),

    /// The account store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Handle<UserError> for AdminError {
    fn handle(&self) -> Option<UserError> {
        let usage_hint = match self {
            AdminError::UnknownUser(_) => {
                Some("Create the account first with garden-admin createuser.".to_string())
            }
            AdminError::UsernameTaken(_) => {
                Some("Pick another username or use the existing account.".to_string())
            }
            AdminError::Account(AccountError::InvalidUsername(_)) => Some(
                "Usernames are 1 to 150 letters, digits and @ . + - _ characters.".to_string(),
            ),
            AdminError::Account(_) | AdminError::Store(_) => None,
        };
        Some(UserError {
            message: self.to_string(),
            usage_hint,
        })
    }
}

/// Creates an account.
pub async fn create_user(
    store: &dyn AccountStore,
    username: &str,
    password: &str,
    is_superuser: bool,
) -> Result<Account, AdminError> {
    let account = Account::new(username, password, is_superuser)?;
    match store.create_account(&account).await {
        Ok(()) => {
            tracing::info!(username = %username, superuser = is_superuser, "created account");
            Ok(account)
        }
        Err(StoreError::AlreadyExists) => Err(AdminError::UsernameTaken(username.to_string())),
        Err(e) => Err(e.into()),
    }
}

/// Returns the API token of `username`, creating one on first use.
pub async fn token_for_username(store: &dyn AccountStore, username: &str) -> Result<String, AdminError> {
    let account = store
        .account_by_username(username)
        .await?
        .ok_or_else(|| AdminError::UnknownUser(username.to_string()))?;
    Ok(issue_token(store, &account).await?)
}

fn exit_with_admin_error(error: &AdminError) -> ! {
    let user_error = error.handle().unwrap_or_else(|| UserError {
        message: error.to_string(),
        usage_hint: None,
    });
    match user_error.usage_hint {
        Some(hint) => cli_utils::exit_with_usage_error(&user_error.message, &hint),
        None => cli_utils::exit_with_error(&user_error.message),
    }
}

/// Handles `garden-admin createuser <username> <password>`.
pub async fn handle_createuser_command(store: &dyn AccountStore, args: &[String], superuser: bool) {
    validate_args_count_or_exit(
        args,
        2,
        2,
        "createuser",
        "Usage: garden-admin [--superuser] createuser <username> <password>",
    );
    match create_user(store, &args[0], &args[1], superuser).await {
        Ok(account) => cli_utils::print_success(&format!(
            "Created {} {} ({})",
            if account.is_superuser { "superuser" } else { "user" },
            account.username,
            account.id
        )),
        Err(e) => exit_with_admin_error(&e),
    }
}

/// Handles `garden-admin token <username>`.
pub async fn handle_token_command(store: &dyn AccountStore, args: &[String]) {
    validate_args_count_or_exit(args, 1, 1, "token", "Usage: garden-admin token <username>");
    match token_for_username(store, &args[0]).await {
        Ok(token) => cli_utils::print_success(&token),
        Err(e) => exit_with_admin_error(&e),
    }
}
