//! Reference resolution for sportsbooks and accounts.
//!
//! Both resolvers run on the caller's connection, normally a transaction,
//! so a sportsbook created here is visible to the caller's later writes
//! and disappears with them on rollback.

use serde::Serialize;
use sqlx::SqliteConnection;
use tracing::{debug, info};

use crate::adapters::LedgerStore;
use crate::domain::{NewSportsbook, Reference};
use crate::error::Result;

/// A resolved row id with the label the caller sees
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolved {
    pub id: i64,
    pub label: String,
}

/// Find a sportsbook by id or case-insensitive name, creating it when the
/// name is new.
///
/// An id that misses falls through to a name lookup with its decimal text.
/// Repeated calls with the same new name on one connection return the same
/// id.
pub async fn resolve_sportsbook(
    conn: &mut SqliteConnection,
    reference: Option<&Reference>,
) -> Result<Option<Resolved>> {
    let Some(reference) = reference else {
        return Ok(None);
    };

    if let Reference::ById(id) = reference {
        if let Some(sb) = LedgerStore::find_sportsbook(&mut *conn, *id).await? {
            return Ok(Some(Resolved { id: sb.id, label: sb.name }));
        }
    }

    let name = reference.lookup_text();
    if let Some(sb) = LedgerStore::find_sportsbook_by_name(&mut *conn, &name).await? {
        debug!(name = %name, id = sb.id, "Resolved sportsbook by name");
        return Ok(Some(Resolved { id: sb.id, label: sb.name }));
    }

    let id = LedgerStore::insert_sportsbook(&mut *conn, &NewSportsbook::named(&name)).await?;
    info!(name = %name, id, "Auto-created sportsbook");
    Ok(Some(Resolved { id, label: name }))
}

/// Find an account by id or exact identifier. Never creates one; an
/// unknown reference resolves to `None`.
pub async fn resolve_account(
    conn: &mut SqliteConnection,
    reference: Option<&Reference>,
) -> Result<Option<Resolved>> {
    let Some(reference) = reference else {
        return Ok(None);
    };

    if let Reference::ById(id) = reference {
        if let Some(account) = LedgerStore::find_account(&mut *conn, *id).await? {
            return Ok(Some(Resolved {
                id: account.id,
                label: account.account_identifier,
            }));
        }
    }

    let identifier = reference.lookup_text();
    let resolved = LedgerStore::find_account_by_identifier(&mut *conn, &identifier)
        .await?
        .map(|account| Resolved {
            id: account.id,
            label: account.account_identifier,
        });
    if resolved.is_none() {
        debug!(identifier = %identifier, "Account reference did not resolve");
    }
    Ok(resolved)
}
