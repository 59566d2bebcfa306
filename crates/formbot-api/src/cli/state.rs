//! `formbot state`: operator access to stored wizard states.

use formbot_types::error::RepositoryError;

use crate::state::AppState;

/// Prints the live form of `user_id` as JSON, or a notice when there is none.
pub async fn show_state(state: &AppState, user_id: i64, json: bool) -> anyhow::Result<()> {
    let form = state
        .dispatcher
        .engine()
        .storage()
        .get_current_state(user_id)
        .await?;

    match (form, json) {
        (Some(form), _) => println!("{}", serde_json::to_string_pretty(&form)?),
        (None, true) => println!("null"),
        (None, false) => println!("No active wizard for user {user_id}."),
    }
    Ok(())
}

/// Deletes the live form of `user_id`.
pub async fn clear_state(state: &AppState, user_id: i64, json: bool) -> anyhow::Result<()> {
    let cleared = match state.dispatcher.engine().storage().delete_state(user_id).await {
        Ok(()) => true,
        Err(RepositoryError::NotFound) => false,
        Err(err) => return Err(err.into()),
    };

    if json {
        println!("{}", serde_json::json!({ "user_id": user_id, "cleared": cleared }));
    } else if cleared {
        println!("Cleared wizard state of user {user_id}.");
    } else {
        println!("No active wizard for user {user_id}.");
    }
    Ok(())
}

/// Removes every expired state.
pub async fn purge_states(state: &AppState, json: bool) -> anyhow::Result<()> {
    let purged = state.storage.purge_expired().await?;
    if json {
        println!("{}", serde_json::json!({ "purged": purged }));
    } else {
        println!("Purged {purged} expired wizard state(s).");
    }
    Ok(())
}
