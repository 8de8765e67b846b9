// Interactive terminal chat: one session, one line per message.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{info, warn};

use crate::session::ChatSession;
use crate::transcript::Role;

const EXIT_COMMAND: &str = "/exit";
const RESET_COMMAND: &str = "/reset";

/// Run a chat over stdin/stdout until EOF or `/exit`.
pub async fn run_chat(session: ChatSession) -> Result<()> {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    run_chat_loop(session, stdin, stdout).await
}

pub async fn run_chat_loop<R, W>(mut session: ChatSession, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let session_id = session.id();
    info!(session = %session_id, model = %session.model(), "Starting terminal chat");
    write_all_turns(&session, &mut writer).await?;

    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        match line.trim() {
            EXIT_COMMAND => break,
            RESET_COMMAND => {
                session.reset();
                write_all_turns(&session, &mut writer).await?;
                continue;
            }
            "" => continue,
            _ => {}
        }

        writer.write_all(b"Thinking...\n").await?;
        writer.flush().await?;
        match session.submit(&line).await {
            Ok(turns) => {
                if let Some(reply) = turns.last() {
                    write_turn(reply.role(), reply.content(), &mut writer).await?;
                }
            }
            Err(e) => warn!(session = %session_id, "Message rejected: {}", e),
        }
    }

    info!(session = %session_id, turns = session.transcript().len(), "Chat session finished");
    Ok(())
}

async fn write_all_turns<W: AsyncWrite + Unpin>(session: &ChatSession, writer: &mut W) -> Result<()> {
    for turn in session.transcript() {
        write_turn(turn.role(), turn.content(), writer).await?;
    }
    Ok(())
}

async fn write_turn<W: AsyncWrite + Unpin>(role: Role, content: &str, writer: &mut W) -> Result<()> {
    let label = match role {
        Role::User => "you",
        Role::Assistant => "coach",
    };
    writer
        .write_all(format!("{}> {}\n", label, content).as_bytes())
        .await
        .context("Failed to write to output")?;
    writer.flush().await?;
    Ok(())
}
