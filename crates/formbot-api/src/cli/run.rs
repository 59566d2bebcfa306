//! `formbot run`: updates in on stdin, replies out on stdout.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use formbot_types::event::Update;

use crate::state::AppState;

/// Counts of input lines seen by [`run_lines`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub accepted: usize,
    pub rejected: usize,
}

/// Dispatches one update per JSON line until EOF, then waits for every
/// accepted update to finish. Blank lines are ignored; malformed ones are
/// logged and skipped.
pub async fn run_lines<R>(state: &AppState, reader: R) -> anyhow::Result<RunStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut stats = RunStats::default();
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Update>(line) {
            Ok(update) => {
                stats.accepted += 1;
                state.dispatcher.handle_update(update);
            }
            Err(err) => {
                stats.rejected += 1;
                tracing::warn!(error = %err, "skipping malformed update");
            }
        }
    }

    state.shutdown().await;
    tracing::info!(accepted = stats.accepted, rejected = stats.rejected, "input exhausted");
    Ok(stats)
}

/// Runs against the process's stdin.
pub async fn run(state: &AppState) -> anyhow::Result<RunStats> {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    run_lines(state, stdin).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Bot, RecordingTransport};

    #[tokio::test]
    async fn test_run_lines_dispatches_and_drains() {
        let transport = RecordingTransport::default();
        let bot = Bot::memory(transport.clone()).await;

        let input = concat!(
            r#"{"message":{"message_id":1,"chat_id":100,"from":{"id":42},"text":"/profile Ada"}}"#,
            "\n\n",
            "not json\n",
            r#"{"message":{"message_id":2,"chat_id":100,"from":{"id":7},"text":"hello"}}"#,
            "\n",
        );

        let stats = run_lines(&bot.state, input.as_bytes()).await.unwrap();

        assert_eq!(stats, RunStats { accepted: 2, rejected: 1 });
        assert_eq!(bot.state.dispatcher.in_flight(), 0);

        let texts = transport.texts();
        assert_eq!(texts.len(), 2);
        assert!(texts.contains(&"profile.prompts.role".to_string()));
        assert!(texts.contains(&"commands.default.message".to_string()));
    }
}
