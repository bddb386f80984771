//! Interactive chat command.

use docdash::{ChatError, Dashboard, JobId};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use super::CommandError;

/// Reads prompts line by line from stdin until EOF or `/quit`.
pub async fn run_chat(dashboard: &Dashboard, id: JobId) -> Result<(), CommandError> {
    let detail = dashboard.job_detail(id).await?;
    if !detail.chat_available() {
        return Err(CommandError::Unfinished(format!(
            "Job #{} is {}; chat is only available for processed documents",
            id,
            detail.status()
        )));
    }

    println!("Chatting about {}. Type /quit to leave.", detail.display_name());
    let mut session = dashboard.chat_session(id);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim() == "/quit" {
            break;
        }

        match session.send_message(&line).await {
            Ok(reply) => println!("{}", reply.content),
            Err(ChatError::EmptyPrompt) => continue,
            // Already reported through the notification printer.
            Err(ChatError::Api(e)) => log::debug!("Chat turn failed: {}", e),
        }
    }
    Ok(())
}
