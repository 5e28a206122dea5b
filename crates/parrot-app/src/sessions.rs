//! `parrot sessions ...` administration commands.

use std::io::Write;

use anyhow::{bail, Result};
use parrot_storage::ChatRepository;

use crate::cli::SessionCommand;

pub fn run(repo: &ChatRepository, command: &SessionCommand, out: &mut impl Write) -> Result<()> {
    match command {
        SessionCommand::List { limit, offset } => {
            let sessions = repo.list_sessions(*limit, *offset)?;
            if sessions.is_empty() {
                writeln!(out, "No sessions.")?;
                return Ok(());
            }
            writeln!(out, "{} of {} sessions", sessions.len(), repo.count_sessions()?)?;
            for session in sessions {
                let messages = repo.get_session_messages(session.id)?.len();
                writeln!(
                    out,
                    "{}  {}  {:>4} msgs  {}",
                    session.id,
                    session.updated_at.format("%Y-%m-%d %H:%M:%S"),
                    messages,
                    session.title.as_deref().unwrap_or("(untitled)")
                )?;
            }
        }
        SessionCommand::Show { id } => {
            let Some((session, messages)) = repo.load_conversation(*id)? else {
                bail!("session not found: {}", id);
            };
            writeln!(
                out,
                "{}  {}",
                session.id,
                session.title.as_deref().unwrap_or("(untitled)")
            )?;
            for message in messages {
                writeln!(
                    out,
                    "[{}] {}: {}",
                    message.sequence, message.sender, message.raw_content
                )?;
            }
        }
        SessionCommand::Delete { id } => {
            if !repo.delete_session(*id)? {
                bail!("session not found: {}", id);
            }
            writeln!(out, "Deleted session {}", id)?;
        }
        SessionCommand::Rename { id, title } => {
            let Some(session) = repo.update_session_title(*id, title)? else {
                bail!("session not found: {}", id);
            };
            writeln!(
                out,
                "Renamed session {} to {:?}",
                session.id,
                session.title.unwrap_or_default()
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use parrot_storage::Database;
    use uuid::Uuid;

    fn repo_with_session() -> (ChatRepository, Uuid) {
        let repo = ChatRepository::new(Arc::new(Database::in_memory().unwrap()));
        let session = repo
            .save_conversation(
                &[
                    ("You".to_string(), "What is total revenue?".to_string()),
                    ("Parrot".to_string(), "$42,000".to_string()),
                ],
                Some("Revenue"),
                None,
            )
            .unwrap();
        (repo, session.id)
    }

    fn run_to_string(repo: &ChatRepository, command: SessionCommand) -> Result<String> {
        let mut out = Vec::new();
        run(repo, &command, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_list_sessions() {
        let (repo, id) = repo_with_session();
        let text = run_to_string(&repo, SessionCommand::List { limit: 20, offset: 0 }).unwrap();
        assert!(text.starts_with("1 of 1 sessions"));
        assert!(text.contains(&id.to_string()));
        assert!(text.contains("   2 msgs  Revenue"));
    }

    #[test]
    fn test_list_empty() {
        let repo = ChatRepository::new(Arc::new(Database::in_memory().unwrap()));
        let text = run_to_string(&repo, SessionCommand::List { limit: 20, offset: 0 }).unwrap();
        assert_eq!(text, "No sessions.\n");
    }

    #[test]
    fn test_show_session() {
        let (repo, id) = repo_with_session();
        let text = run_to_string(&repo, SessionCommand::Show { id }).unwrap();
        assert!(text.contains("[1] You: What is total revenue?\n"));
        assert!(text.contains("[2] Parrot: $42,000\n"));
    }

    #[test]
    fn test_rename_then_delete() {
        let (repo, id) = repo_with_session();
        let text = run_to_string(
            &repo,
            SessionCommand::Rename {
                id,
                title: "Q3 revenue".to_string(),
            },
        )
        .unwrap();
        assert!(text.contains("\"Q3 revenue\""));

        run_to_string(&repo, SessionCommand::Delete { id }).unwrap();
        assert!(repo.get_session(id).unwrap().is_none());
        assert!(repo.get_session_messages(id).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_session_errors() {
        let (repo, _) = repo_with_session();
        let missing = Uuid::new_v4();
        for command in [
            SessionCommand::Show { id: missing },
            SessionCommand::Delete { id: missing },
            SessionCommand::Rename {
                id: missing,
                title: "x".to_string(),
            },
        ] {
            let err = run_to_string(&repo, command).unwrap_err();
            assert!(err.to_string().contains("session not found"));
        }
    }
}
