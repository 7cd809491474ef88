//! Users, session tokens, share links, tags and the event log.

use chrono::{Duration, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::models::{ShareLink, ShareableEntity, Tag, TokenPermissions, User};
use crate::schema::{auth_tokens, event_log, share_links, tag_types, tags, users};

use super::pool::{DieselError, SqlitePool};
use super::records::{
    AuthTokenRecord, NewAuthToken, NewEvent, NewShareLink, NewUser, ShareLinkRecord, TagRecord,
    UserRecord,
};
use super::now_str;

/// Session token length in characters.
const TOKEN_LENGTH: usize = 30;
/// Tokens idle longer than this are invalid.
const TOKEN_EXPIRY_DAYS: i64 = 30;
/// Share link suffix length in characters.
const SHARE_LINK_LENGTH: usize = 24;
/// Tag autocomplete result bound.
const TAG_AUTOCOMPLETE_LIMIT: i64 = 10;

fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ========================================================================
    // Users
    // ========================================================================

    pub async fn user_by_email(&self, email: &str) -> Result<Option<User>, DieselError> {
        let mut conn = self.pool.get().await?;
        let record: Option<UserRecord> = users::table
            .filter(users::email.eq(email))
            .first(&mut conn)
            .await
            .optional()?;
        Ok(record.map(UserRecord::into_user))
    }

    pub async fn list_users(&self) -> Result<Vec<User>, DieselError> {
        let mut conn = self.pool.get().await?;
        let records: Vec<UserRecord> = users::table.order(users::id.asc()).load(&mut conn).await?;
        Ok(records.into_iter().map(UserRecord::into_user).collect())
    }

    pub async fn insert_user(
        &self,
        email: &str,
        password_hash: &str,
        admin: bool,
    ) -> Result<i64, DieselError> {
        let mut conn = self.pool.get().await?;
        let now = now_str();
        diesel::insert_into(users::table)
            .values(NewUser {
                create_date: &now,
                update_date: &now,
                email,
                password_hash: Some(password_hash),
                locked: 0,
                admin: admin as i32,
                login_attempts: 0,
            })
            .execute(&mut conn)
            .await?;
        users::table
            .filter(users::email.eq(email))
            .select(users::id)
            .first(&mut conn)
            .await
    }

    /// Record one failed login; locks the account past the threshold.
    pub async fn record_login_failure(&self, user_id: i64, max_failures: i32) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;
        let attempts: i32 = users::table
            .find(user_id)
            .select(users::login_attempts)
            .first(&mut conn)
            .await?;
        let attempts = attempts + 1;
        diesel::update(users::table.find(user_id))
            .set((
                users::login_attempts.eq(attempts),
                users::locked.eq((attempts >= max_failures) as i32),
                users::update_date.eq(now_str()),
            ))
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    pub async fn record_login_success(&self, user_id: i64) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;
        let now = now_str();
        diesel::update(users::table.find(user_id))
            .set((
                users::login_attempts.eq(0),
                users::last_login.eq(&now),
                users::update_date.eq(&now),
            ))
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    // ========================================================================
    // Session tokens
    // ========================================================================

    /// Issue a fresh session token for a user.
    pub async fn issue_token(&self, user_id: i64) -> Result<String, DieselError> {
        let mut conn = self.pool.get().await?;
        let token = random_string(TOKEN_LENGTH);
        let now = now_str();
        diesel::insert_into(auth_tokens::table)
            .values(NewAuthToken {
                create_date: &now,
                user_id,
                token: &token,
                last_use: &now,
            })
            .execute(&mut conn)
            .await?;
        Ok(token)
    }

    /// Validate a session token and slide its expiry window.
    pub async fn check_token(&self, token: &str) -> Result<TokenPermissions, DieselError> {
        let mut conn = self.pool.get().await?;
        let row: Option<(AuthTokenRecord, UserRecord)> = auth_tokens::table
            .inner_join(users::table)
            .filter(auth_tokens::token.eq(token))
            .first(&mut conn)
            .await
            .optional()?;

        let Some((token_record, user_record)) = row else {
            return Ok(TokenPermissions::denied());
        };
        if user_record.locked != 0 {
            return Ok(TokenPermissions::denied());
        }
        let last_use = super::parse_datetime(&token_record.last_use);
        if last_use < Utc::now() - Duration::days(TOKEN_EXPIRY_DAYS) {
            return Ok(TokenPermissions::denied());
        }

        diesel::update(auth_tokens::table.find(token_record.id))
            .set(auth_tokens::last_use.eq(now_str()))
            .execute(&mut conn)
            .await?;

        Ok(TokenPermissions {
            valid: true,
            admin: user_record.admin != 0,
            user_id: Some(user_record.id),
        })
    }

    pub async fn remove_token(&self, token: &str) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;
        diesel::delete(auth_tokens::table.filter(auth_tokens::token.eq(token)))
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    // ========================================================================
    // Share links
    // ========================================================================

    pub async fn create_share_link(
        &self,
        user_id: i64,
        entity: ShareableEntity,
        entity_id: i64,
    ) -> Result<String, DieselError> {
        let mut conn = self.pool.get().await?;
        let suffix = random_string(SHARE_LINK_LENGTH);
        let now = now_str();
        diesel::insert_into(share_links::table)
            .values(NewShareLink {
                create_date: &now,
                update_date: &now,
                created_by_user_id: user_id,
                entity: entity.as_str(),
                entity_id,
                valid: 1,
                link_suffix: &suffix,
            })
            .execute(&mut conn)
            .await?;
        Ok(suffix)
    }

    /// Existing valid link for one entity, if any.
    pub async fn share_link_for_entity(
        &self,
        entity: ShareableEntity,
        entity_id: i64,
    ) -> Result<Option<ShareLink>, DieselError> {
        let mut conn = self.pool.get().await?;
        let record: Option<ShareLinkRecord> = share_links::table
            .filter(share_links::entity.eq(entity.as_str()))
            .filter(share_links::entity_id.eq(entity_id))
            .filter(share_links::valid.eq(1))
            .first(&mut conn)
            .await
            .optional()?;
        Ok(record.and_then(ShareLinkRecord::into_share_link))
    }

    pub async fn share_link_by_suffix(
        &self,
        suffix: &str,
    ) -> Result<Option<ShareLink>, DieselError> {
        let mut conn = self.pool.get().await?;
        let record: Option<ShareLinkRecord> = share_links::table
            .filter(share_links::link_suffix.eq(suffix))
            .first(&mut conn)
            .await
            .optional()?;
        Ok(record.and_then(ShareLinkRecord::into_share_link))
    }

    pub async fn invalidate_share_link(&self, suffix: &str) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;
        diesel::update(share_links::table.filter(share_links::link_suffix.eq(suffix)))
            .set((
                share_links::valid.eq(0),
                share_links::update_date.eq(now_str()),
            ))
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    // ========================================================================
    // Tags
    // ========================================================================

    /// Prefix autocomplete over tag names, bounded to ten results.
    pub async fn autocomplete_tags(&self, query: &str) -> Result<Vec<Tag>, DieselError> {
        let mut conn = self.pool.get().await?;
        let pattern = format!("{}%", query.replace(['%', '_'], ""));
        let rows: Vec<(TagRecord, Option<String>)> = tags::table
            .left_join(tag_types::table)
            .filter(tags::name.like(pattern))
            .order(tags::name.asc())
            .limit(TAG_AUTOCOMPLETE_LIMIT)
            .select((TagRecord::as_select(), tag_types::name.nullable()))
            .load(&mut conn)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(record, type_name)| record.into_tag(type_name))
            .collect())
    }

    // ========================================================================
    // Event log
    // ========================================================================

    /// Append one event row. Failures are swallowed; logging must never
    /// break the request path.
    pub async fn log_event(
        &self,
        event_type: &str,
        user_id: Option<i64>,
        path: Option<&str>,
        details: Option<&str>,
    ) {
        let result: Result<(), DieselError> = async {
            let mut conn = self.pool.get().await?;
            let now = now_str();
            diesel::insert_into(event_log::table)
                .values(NewEvent {
                    create_date: &now,
                    event_type,
                    user_id,
                    path,
                    details,
                })
                .execute(&mut conn)
                .await?;
            Ok(())
        }
        .await;
        if let Err(err) = result {
            tracing::warn!(event_type, error = %err, "failed to write event log row");
        }
    }
}
