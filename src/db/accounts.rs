//! Account record helpers.

use chrono::NaiveDateTime;
use diesel::{prelude::*, result::QueryResult};
use diesel_async::RunQueryDsl;

use super::connection::DbConnection;
use crate::models::{Account, AccountProfile, NewAccount};

/// Look up an account by username.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn get_account_by_username(
    conn: &mut DbConnection,
    name: &str,
) -> QueryResult<Option<Account>> {
    use crate::schema::accounts::dsl::{accounts, username};
    accounts
        .filter(username.eq(name))
        .first::<Account>(conn)
        .await
        .optional()
}

/// Look up an account by primary key.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn get_account(conn: &mut DbConnection, account_id: i32) -> QueryResult<Option<Account>> {
    use crate::schema::accounts::dsl::accounts;
    accounts
        .find(account_id)
        .first::<Account>(conn)
        .await
        .optional()
}

/// Insert a new account and return the stored row.
///
/// # Errors
/// Returns any error produced by the insertion, including unique violations
/// on `username`.
#[must_use = "handle the result"]
pub async fn create_account(conn: &mut DbConnection, account: &NewAccount<'_>) -> QueryResult<Account> {
    use crate::schema::accounts::dsl::accounts;
    diesel::insert_into(accounts)
        .values(account)
        .returning(Account::as_returning())
        .get_result(conn)
        .await
}

/// Flip a pending account to active and activated.
///
/// Only rows that are not yet activated are touched, so the returned count is
/// `1` for the call that performed the transition and `0` otherwise.
///
/// # Errors
/// Returns any error produced by the update.
#[must_use = "handle the result"]
pub async fn mark_activated(conn: &mut DbConnection, account_id: i32) -> QueryResult<usize> {
    use crate::schema::accounts::dsl::{accounts, id, is_activated, is_active};
    diesel::update(accounts.filter(id.eq(account_id)).filter(is_activated.eq(false)))
        .set((is_active.eq(true), is_activated.eq(true)))
        .execute(conn)
        .await
}

/// Overwrite the self-service profile columns.
///
/// # Errors
/// Returns any error produced by the update, including unique violations on
/// `username`.
#[must_use = "handle the result"]
pub async fn update_profile(
    conn: &mut DbConnection,
    account_id: i32,
    profile: &AccountProfile<'_>,
) -> QueryResult<Account> {
    use crate::schema::accounts::dsl::accounts;
    diesel::update(accounts.find(account_id))
        .set(profile)
        .returning(Account::as_returning())
        .get_result(conn)
        .await
}

/// Replace the stored password hash.
///
/// # Errors
/// Returns any error produced by the update.
#[must_use = "handle the result"]
pub async fn set_password_hash(conn: &mut DbConnection, account_id: i32, hash: &str) -> QueryResult<usize> {
    use crate::schema::accounts::dsl::{accounts, password};
    diesel::update(accounts.find(account_id))
        .set(password.eq(hash))
        .execute(conn)
        .await
}

/// Record a successful sign-in.
///
/// # Errors
/// Returns any error produced by the update.
#[must_use = "handle the result"]
pub async fn touch_last_login(conn: &mut DbConnection, account_id: i32, at: NaiveDateTime) -> QueryResult<usize> {
    use crate::schema::accounts::dsl::{accounts, last_login};
    diesel::update(accounts.find(account_id))
        .set(last_login.eq(Some(at)))
        .execute(conn)
        .await
}

/// Accounts that registered but never completed activation.
///
/// When `joined_before` is given only accounts created strictly earlier are
/// returned. Results are ordered oldest first.
///
/// # Errors
/// Returns any error produced by the query.
#[must_use = "handle the result"]
pub async fn list_pending_activation(
    conn: &mut DbConnection,
    joined_before: Option<NaiveDateTime>,
) -> QueryResult<Vec<Account>> {
    use crate::schema::accounts::dsl::{accounts, date_joined, id, is_activated, is_active};
    let mut query = accounts
        .filter(is_active.eq(false))
        .filter(is_activated.eq(false))
        .into_boxed();
    if let Some(cutoff) = joined_before {
        query = query.filter(date_joined.lt(cutoff));
    }
    query
        .order((date_joined.asc(), id.asc()))
        .load::<Account>(conn)
        .await
}

/// Accounts that completed activation, ordered by username.
///
/// # Errors
/// Returns any error produced by the query.
#[must_use = "handle the result"]
pub async fn list_activated(conn: &mut DbConnection) -> QueryResult<Vec<Account>> {
    use crate::schema::accounts::dsl::{accounts, is_activated, is_active, username};
    accounts
        .filter(is_active.eq(true))
        .filter(is_activated.eq(true))
        .order(username.asc())
        .load::<Account>(conn)
        .await
}

/// Fetch the accounts whose ids appear in `ids`, ordered by id.
///
/// # Errors
/// Returns any error produced by the query.
#[must_use = "handle the result"]
pub async fn get_accounts(conn: &mut DbConnection, ids: &[i32]) -> QueryResult<Vec<Account>> {
    use crate::schema::accounts::dsl::{accounts, id};
    accounts
        .filter(id.eq_any(ids))
        .order(id.asc())
        .load::<Account>(conn)
        .await
}

/// Delete the account row only. Owned articles must already be gone; see
/// [`super::delete_account_cascade`].
pub(super) async fn delete_account_row(conn: &mut DbConnection, account_id: i32) -> QueryResult<usize> {
    use crate::schema::accounts::dsl::accounts;
    diesel::delete(accounts.find(account_id)).execute(conn).await
}
