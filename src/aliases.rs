//! Maps alias tokens (or already-qualified `agent:<...>` keys) to session
//! keys.

use crate::error::StoreError;
use crate::models::AgentAlias;
use rusqlite::{params, Connection};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMention {
    pub alias: String,
    pub session_key: String,
}

/// Upsert: last write wins for a given alias. Inputs are trimmed; empty
/// alias or session key is rejected.
pub fn upsert_agent_alias(
    conn: &Connection,
    alias: &str,
    session_key: &str,
) -> Result<AgentAlias, StoreError> {
    let alias = alias.trim();
    let session_key = session_key.trim();
    if alias.is_empty() {
        return Err(StoreError::InvalidInput("alias must not be empty".into()));
    }
    if session_key.is_empty() {
        return Err(StoreError::InvalidInput(
            "session_key must not be empty".into(),
        ));
    }

    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO agent_aliases (alias, session_key, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?3)
         ON CONFLICT(alias) DO UPDATE SET
            session_key = excluded.session_key,
            updated_at = excluded.updated_at",
        params![alias, session_key, &now],
    )?;

    Ok(AgentAlias {
        alias: alias.to_string(),
        session_key: session_key.to_string(),
        created_at: now.clone(),
        updated_at: now,
    })
}

/// Resolve parsed mention tokens to concrete delivery targets.
///
/// - `agent:<...>` tokens are accepted verbatim as session keys, bypassing
///   the alias table.
/// - Otherwise look up by exact `alias`; on miss, try a case-insensitive
///   match.
/// - Unresolvable tokens are silently dropped.
/// - Results are deduplicated by `session_key`; the first alias token that
///   produced a given session key is the one kept.
pub fn resolve_mentions(conn: &Connection, mentions: &[String]) -> Vec<ResolvedMention> {
    let mut out = Vec::new();
    let mut seen_keys = std::collections::HashSet::new();

    for token in mentions {
        let resolved = if let Some(rest) = token.strip_prefix("agent:") {
            Some(format!("agent:{rest}"))
        } else {
            lookup_alias(conn, token)
        };

        if let Some(session_key) = resolved {
            if seen_keys.insert(session_key.clone()) {
                out.push(ResolvedMention {
                    alias: token.clone(),
                    session_key,
                });
            }
        }
    }

    out
}

fn lookup_alias(conn: &Connection, alias: &str) -> Option<String> {
    if let Ok(key) = conn.query_row(
        "SELECT session_key FROM agent_aliases WHERE alias = ?1",
        params![alias],
        |row| row.get(0),
    ) {
        return Some(key);
    }

    conn.query_row(
        "SELECT session_key FROM agent_aliases WHERE LOWER(alias) = LOWER(?1) LIMIT 1",
        params![alias],
        |row| row.get(0),
    )
    .ok()
}
