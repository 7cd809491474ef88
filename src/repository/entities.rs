//! Entity persistence: canonical and archive-scoped rows.
//!
//! One archive session's entities are written inside a single transaction;
//! a failure rolls back every insert for that session. Within the
//! transaction accounts are written first, then posts (so the account
//! canonical id is available for the foreign key), then media.

use std::collections::HashMap;

use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};

use crate::entities::reconcile::{reconcile_account, reconcile_media, reconcile_post};
use crate::models::{
    Account, Annotation, ExtractedEntities, Media, MediaPart, Post,
};
use crate::schema::{
    account_archives, account_tags, accounts, media, media_archives, media_parts, media_tags,
    post_archives, post_tags, posts,
};

use super::pool::{DieselError, SqliteConn, SqlitePool};
use super::records::{
    AccountArchiveRecord, AccountRecord, MediaArchiveRecord, MediaPartRecord, MediaRecord,
    NewAccount, NewAccountArchive, NewMedia, NewMediaArchive, NewMediaPart, NewPost,
    NewPostArchive, PostArchiveRecord, PostRecord,
};
use super::{json_to_text, now_str};

/// Counts of archive rows written for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistStats {
    pub accounts: usize,
    pub posts: usize,
    pub media: usize,
}

impl PersistStats {
    pub fn total(&self) -> usize {
        self.accounts + self.posts + self.media
    }
}

/// Repository for accounts, posts, media and media parts.
#[derive(Clone)]
pub struct EntityRepository {
    pool: SqlitePool,
}

impl EntityRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ========================================================================
    // Canonical lookups
    // ========================================================================

    pub async fn account_by_id(&self, id: i64) -> Result<Option<Account>, DieselError> {
        let mut conn = self.pool.get().await?;
        let record: Option<AccountRecord> = accounts::table
            .find(id)
            .first(&mut conn)
            .await
            .optional()?;
        Ok(record.map(AccountRecord::into_account))
    }

    pub async fn account_by_url(&self, url: &str) -> Result<Option<Account>, DieselError> {
        let mut conn = self.pool.get().await?;
        let record: Option<AccountRecord> = accounts::table
            .filter(accounts::url.eq(url))
            .first(&mut conn)
            .await
            .optional()?;
        Ok(record.map(AccountRecord::into_account))
    }

    pub async fn post_by_url(&self, url: &str) -> Result<Option<Post>, DieselError> {
        let mut conn = self.pool.get().await?;
        let record: Option<PostRecord> = posts::table
            .filter(posts::url.eq(url))
            .first(&mut conn)
            .await
            .optional()?;
        Ok(record.map(PostRecord::into_post))
    }

    pub async fn media_by_url(&self, url: &str) -> Result<Option<Media>, DieselError> {
        let mut conn = self.pool.get().await?;
        let record: Option<MediaRecord> = media::table
            .filter(media::url.eq(url))
            .first(&mut conn)
            .await
            .optional()?;
        Ok(record.map(MediaRecord::into_media))
    }

    pub async fn post_by_id(&self, id: i64) -> Result<Option<Post>, DieselError> {
        let mut conn = self.pool.get().await?;
        let record: Option<PostRecord> =
            posts::table.find(id).first(&mut conn).await.optional()?;
        Ok(record.map(PostRecord::into_post))
    }

    pub async fn media_by_id(&self, id: i64) -> Result<Option<Media>, DieselError> {
        let mut conn = self.pool.get().await?;
        let record: Option<MediaRecord> =
            media::table.find(id).first(&mut conn).await.optional()?;
        Ok(record.map(MediaRecord::into_media))
    }

    pub async fn posts_by_account(&self, account_id: i64) -> Result<Vec<Post>, DieselError> {
        let mut conn = self.pool.get().await?;
        let records: Vec<PostRecord> = posts::table
            .filter(posts::account_id.eq(account_id))
            .order(posts::publication_date.desc())
            .load(&mut conn)
            .await?;
        Ok(records.into_iter().map(PostRecord::into_post).collect())
    }

    pub async fn media_by_posts(&self, post_ids: &[i64]) -> Result<Vec<Media>, DieselError> {
        if post_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.pool.get().await?;
        let records: Vec<MediaRecord> = media::table
            .filter(media::post_id.eq_any(post_ids.iter().copied()))
            .load(&mut conn)
            .await?;
        Ok(records.into_iter().map(MediaRecord::into_media).collect())
    }

    // ========================================================================
    // Archive-scoped reads
    // ========================================================================

    /// All per-session observations of one archive session, with canonical
    /// references resolved for nesting.
    pub async fn session_entities(
        &self,
        session_id: i64,
    ) -> Result<(Vec<Account>, Vec<Post>, Vec<Media>), DieselError> {
        let mut conn = self.pool.get().await?;

        let account_rows: Vec<AccountArchiveRecord> = account_archives::table
            .filter(account_archives::archive_session_id.eq(session_id))
            .load(&mut conn)
            .await?;
        let post_rows: Vec<PostArchiveRecord> = post_archives::table
            .filter(post_archives::archive_session_id.eq(session_id))
            .load(&mut conn)
            .await?;
        let media_rows: Vec<MediaArchiveRecord> = media_archives::table
            .filter(media_archives::archive_session_id.eq(session_id))
            .load(&mut conn)
            .await?;

        // Resolve canonical account/post references for the nested view.
        let post_ids: Vec<i64> = post_rows.iter().map(|r| r.canonical_id).collect();
        let account_refs: HashMap<i64, Option<i64>> = posts::table
            .filter(posts::id.eq_any(post_ids.iter().copied()))
            .select((posts::id, posts::account_id))
            .load::<(i64, Option<i64>)>(&mut conn)
            .await?
            .into_iter()
            .collect();
        let media_ids: Vec<i64> = media_rows.iter().map(|r| r.canonical_id).collect();
        let post_refs: HashMap<i64, Option<i64>> = media::table
            .filter(media::id.eq_any(media_ids.iter().copied()))
            .select((media::id, media::post_id))
            .load::<(i64, Option<i64>)>(&mut conn)
            .await?
            .into_iter()
            .collect();

        let accounts_out = account_rows
            .into_iter()
            .map(AccountArchiveRecord::into_account)
            .collect();
        let posts_out = post_rows
            .into_iter()
            .map(|r| {
                let canonical = r.canonical_id;
                let mut post = r.into_post();
                post.account_id = account_refs.get(&canonical).copied().flatten();
                post
            })
            .collect();
        let media_out = media_rows
            .into_iter()
            .map(|r| {
                let canonical = r.canonical_id;
                let mut m = r.into_media();
                m.post_id = post_refs.get(&canonical).copied().flatten();
                m
            })
            .collect();
        Ok((accounts_out, posts_out, media_out))
    }

    /// Archive session ids that observed one canonical account.
    pub async fn sessions_for_account(&self, canonical_id: i64) -> Result<Vec<i64>, DieselError> {
        let mut conn = self.pool.get().await?;
        account_archives::table
            .filter(account_archives::canonical_id.eq(canonical_id))
            .select(account_archives::archive_session_id)
            .distinct()
            .load(&mut conn)
            .await
    }

    pub async fn sessions_for_post(&self, canonical_id: i64) -> Result<Vec<i64>, DieselError> {
        let mut conn = self.pool.get().await?;
        post_archives::table
            .filter(post_archives::canonical_id.eq(canonical_id))
            .select(post_archives::archive_session_id)
            .distinct()
            .load(&mut conn)
            .await
    }

    pub async fn sessions_for_media(&self, canonical_id: i64) -> Result<Vec<i64>, DieselError> {
        let mut conn = self.pool.get().await?;
        media_archives::table
            .filter(media_archives::canonical_id.eq(canonical_id))
            .select(media_archives::archive_session_id)
            .distinct()
            .load(&mut conn)
            .await
    }

    // ========================================================================
    // Media parts
    // ========================================================================

    pub async fn media_part_by_id(&self, id: i64) -> Result<Option<MediaPart>, DieselError> {
        let mut conn = self.pool.get().await?;
        let record: Option<MediaPartRecord> = media_parts::table
            .find(id)
            .first(&mut conn)
            .await
            .optional()?;
        Ok(record.map(MediaPartRecord::into_media_part))
    }

    pub async fn media_parts_for_media(&self, media_id: i64) -> Result<Vec<MediaPart>, DieselError> {
        let mut conn = self.pool.get().await?;
        let records: Vec<MediaPartRecord> = media_parts::table
            .filter(media_parts::media_id.eq(media_id))
            .load(&mut conn)
            .await?;
        Ok(records
            .into_iter()
            .map(MediaPartRecord::into_media_part)
            .collect())
    }

    pub async fn insert_media_part(&self, part: &MediaPart) -> Result<i64, DieselError> {
        let mut conn = self.pool.get().await?;
        let now = now_str();
        diesel::insert_into(media_parts::table)
            .values(NewMediaPart {
                create_date: &now,
                update_date: &now,
                media_id: part.media_id,
                time_start_ms: part.time_start_ms,
                time_end_ms: part.time_end_ms,
                crop_x: part.crop_x,
                crop_y: part.crop_y,
                crop_w: part.crop_w,
                crop_h: part.crop_h,
                notes: part.notes.as_deref(),
            })
            .execute(&mut conn)
            .await?;
        media_parts::table
            .order(media_parts::id.desc())
            .select(media_parts::id)
            .first(&mut conn)
            .await
    }

    pub async fn update_media_part(&self, part: &MediaPart) -> Result<bool, DieselError> {
        let mut conn = self.pool.get().await?;
        let rows = diesel::update(media_parts::table.find(part.id))
            .set((
                media_parts::update_date.eq(now_str()),
                media_parts::time_start_ms.eq(part.time_start_ms),
                media_parts::time_end_ms.eq(part.time_end_ms),
                media_parts::crop_x.eq(part.crop_x),
                media_parts::crop_y.eq(part.crop_y),
                media_parts::crop_w.eq(part.crop_w),
                media_parts::crop_h.eq(part.crop_h),
                media_parts::notes.eq(part.notes.as_deref()),
            ))
            .execute(&mut conn)
            .await?;
        Ok(rows > 0)
    }

    pub async fn delete_media_part(&self, id: i64) -> Result<bool, DieselError> {
        let mut conn = self.pool.get().await?;
        let rows = diesel::delete(media_parts::table.find(id))
            .execute(&mut conn)
            .await?;
        Ok(rows > 0)
    }

    // ========================================================================
    // Annotations
    // ========================================================================

    pub async fn annotate_account(
        &self,
        id: i64,
        annotation: &Annotation,
    ) -> Result<bool, DieselError> {
        let mut conn = self.pool.get().await?;
        let rows = diesel::update(accounts::table.find(id))
            .set((
                accounts::notes.eq(annotation.notes.as_deref()),
                accounts::update_date.eq(now_str()),
            ))
            .execute(&mut conn)
            .await?;
        if rows == 0 {
            return Ok(false);
        }
        diesel::delete(account_tags::table.filter(account_tags::account_id.eq(id)))
            .execute(&mut conn)
            .await?;
        for tag_id in &annotation.tags {
            diesel::insert_into(account_tags::table)
                .values((
                    account_tags::account_id.eq(id),
                    account_tags::tag_id.eq(*tag_id),
                ))
                .execute(&mut conn)
                .await?;
        }
        Ok(true)
    }

    pub async fn annotate_post(&self, id: i64, annotation: &Annotation) -> Result<bool, DieselError> {
        let mut conn = self.pool.get().await?;
        let rows = diesel::update(posts::table.find(id))
            .set((
                posts::notes.eq(annotation.notes.as_deref()),
                posts::update_date.eq(now_str()),
            ))
            .execute(&mut conn)
            .await?;
        if rows == 0 {
            return Ok(false);
        }
        diesel::delete(post_tags::table.filter(post_tags::post_id.eq(id)))
            .execute(&mut conn)
            .await?;
        for tag_id in &annotation.tags {
            diesel::insert_into(post_tags::table)
                .values((post_tags::post_id.eq(id), post_tags::tag_id.eq(*tag_id)))
                .execute(&mut conn)
                .await?;
        }
        Ok(true)
    }

    pub async fn annotate_media(&self, id: i64, annotation: &Annotation) -> Result<bool, DieselError> {
        let mut conn = self.pool.get().await?;
        let rows = diesel::update(media::table.find(id))
            .set((
                media::notes.eq(annotation.notes.as_deref()),
                media::update_date.eq(now_str()),
            ))
            .execute(&mut conn)
            .await?;
        if rows == 0 {
            return Ok(false);
        }
        diesel::delete(media_tags::table.filter(media_tags::media_id.eq(id)))
            .execute(&mut conn)
            .await?;
        for tag_id in &annotation.tags {
            diesel::insert_into(media_tags::table)
                .values((media_tags::media_id.eq(id), media_tags::tag_id.eq(*tag_id)))
                .execute(&mut conn)
                .await?;
        }
        Ok(true)
    }

    // ========================================================================
    // Thumbnails
    // ========================================================================

    /// Next media rows with a local file but no thumbnail yet.
    pub async fn media_missing_thumbnails(&self, limit: i64) -> Result<Vec<Media>, DieselError> {
        let mut conn = self.pool.get().await?;
        let records: Vec<MediaRecord> = media::table
            .filter(media::thumbnail_path.is_null())
            .filter(media::local_path.is_not_null())
            .filter(media::media_type.eq_any(vec!["image", "video"]))
            .limit(limit)
            .load(&mut conn)
            .await?;
        Ok(records.into_iter().map(MediaRecord::into_media).collect())
    }

    /// Idempotent single-row thumbnail path update (also used for the
    /// `error: ...` negative cache).
    pub async fn set_thumbnail_path(&self, media_id: i64, path: &str) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;
        diesel::update(media::table.find(media_id))
            .set((
                media::thumbnail_path.eq(path),
                media::update_date.eq(now_str()),
            ))
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    // ========================================================================
    // Session persistence
    // ========================================================================

    /// Write one session's mapped entities.
    ///
    /// The whole session is bracketed by a single transaction; each entity
    /// is reconciled twice, once into its canonical row and once into its
    /// archive-scoped row.
    pub async fn persist_session_entities(
        &self,
        entities: &ExtractedEntities,
        session_id: i64,
    ) -> Result<PersistStats, DieselError> {
        // Merge in-session duplicates so each identity yields exactly one
        // archive row per session.
        let mut account_candidates: Vec<Account> = Vec::new();
        let mut account_index: HashMap<String, usize> = HashMap::new();
        for account in &entities.accounts {
            match account_index.get(&account.url) {
                Some(&i) => {
                    let existing = account_candidates[i].clone();
                    account_candidates[i] = reconcile_account(account.clone(), Some(existing));
                }
                None => {
                    account_index.insert(account.url.clone(), account_candidates.len());
                    account_candidates.push(account.clone());
                }
            }
        }

        let mut post_candidates: Vec<Post> = Vec::new();
        let mut post_index: HashMap<String, usize> = HashMap::new();
        let mut media_candidates: Vec<Media> = Vec::new();
        let mut media_index: HashMap<String, usize> = HashMap::new();
        for extracted in &entities.posts {
            match post_index.get(&extracted.post.url) {
                Some(&i) => {
                    let existing = post_candidates[i].clone();
                    post_candidates[i] = reconcile_post(extracted.post.clone(), Some(existing));
                }
                None => {
                    post_index.insert(extracted.post.url.clone(), post_candidates.len());
                    post_candidates.push(extracted.post.clone());
                }
            }
            for m in &extracted.media {
                match media_index.get(&m.url) {
                    Some(&i) => {
                        let existing = media_candidates[i].clone();
                        media_candidates[i] = reconcile_media(m.clone(), Some(existing));
                    }
                    None => {
                        media_index.insert(m.url.clone(), media_candidates.len());
                        media_candidates.push(m.clone());
                    }
                }
            }
        }

        let mut conn = self.pool.get().await?;
        conn.transaction(|conn| {
            Box::pin(async move {
                let mut stats = PersistStats::default();
                let mut account_ids: HashMap<String, i64> = HashMap::new();
                let mut post_ids: HashMap<String, i64> = HashMap::new();

                for account in account_candidates {
                    let id = upsert_canonical_account(conn, &account).await?;
                    upsert_archive_account(conn, &account, session_id, id).await?;
                    account_ids.insert(account.url.clone(), id);
                    stats.accounts += 1;
                }

                for mut post in post_candidates {
                    post.account_id = match post.account_url.as_deref() {
                        Some(url) => match account_ids.get(url) {
                            Some(id) => Some(*id),
                            None => lookup_account_id(conn, url).await?,
                        },
                        None => None,
                    };
                    let id = upsert_canonical_post(conn, &post).await?;
                    upsert_archive_post(conn, &post, session_id, id).await?;
                    post_ids.insert(post.url.clone(), id);
                    stats.posts += 1;
                }

                for mut m in media_candidates {
                    m.post_id = match m.post_url.as_deref() {
                        Some(url) => match post_ids.get(url) {
                            Some(id) => Some(*id),
                            None => lookup_post_id(conn, url).await?,
                        },
                        None => None,
                    };
                    let id = upsert_canonical_media(conn, &m).await?;
                    upsert_archive_media(conn, &m, session_id, id).await?;
                    stats.media += 1;
                }

                Ok(stats)
            })
        })
        .await
    }
}

async fn lookup_account_id(conn: &mut SqliteConn, url: &str) -> Result<Option<i64>, DieselError> {
    accounts::table
        .filter(accounts::url.eq(url))
        .select(accounts::id)
        .first(conn)
        .await
        .optional()
}

async fn lookup_post_id(conn: &mut SqliteConn, url: &str) -> Result<Option<i64>, DieselError> {
    posts::table
        .filter(posts::url.eq(url))
        .select(posts::id)
        .first(conn)
        .await
        .optional()
}

async fn upsert_canonical_account(
    conn: &mut SqliteConn,
    account: &Account,
) -> Result<i64, DieselError> {
    let existing: Option<AccountRecord> = accounts::table
        .filter(accounts::url.eq(&account.url))
        .first(conn)
        .await
        .optional()?;
    let now = now_str();

    match existing {
        Some(record) => {
            let id = record.id;
            let merged = reconcile_account(account.clone(), Some(record.into_account()));
            let data = json_to_text(&merged.data);
            diesel::update(accounts::table.find(id))
                .set((
                    accounts::platform_id.eq(merged.platform_id.as_deref()),
                    accounts::display_name.eq(merged.display_name.as_deref()),
                    accounts::bio.eq(merged.bio.as_deref()),
                    accounts::data.eq(data.as_deref()),
                    accounts::notes.eq(merged.notes.as_deref()),
                    accounts::update_date.eq(&now),
                ))
                .execute(conn)
                .await?;
            Ok(id)
        }
        None => {
            let data = json_to_text(&account.data);
            diesel::insert_into(accounts::table)
                .values(NewAccount {
                    create_date: &now,
                    update_date: &now,
                    url: &account.url,
                    platform_id: account.platform_id.as_deref(),
                    display_name: account.display_name.as_deref(),
                    bio: account.bio.as_deref(),
                    data: data.as_deref(),
                    notes: account.notes.as_deref(),
                })
                .execute(conn)
                .await?;
            accounts::table
                .filter(accounts::url.eq(&account.url))
                .select(accounts::id)
                .first(conn)
                .await
        }
    }
}

async fn upsert_archive_account(
    conn: &mut SqliteConn,
    account: &Account,
    session_id: i64,
    canonical_id: i64,
) -> Result<(), DieselError> {
    let existing: Option<AccountArchiveRecord> = account_archives::table
        .filter(account_archives::url.eq(&account.url))
        .filter(account_archives::archive_session_id.eq(session_id))
        .first(conn)
        .await
        .optional()?;
    let now = now_str();

    match existing {
        Some(record) => {
            let id = record.id;
            let merged = reconcile_account(account.clone(), Some(record.into_account()));
            let data = json_to_text(&merged.data);
            diesel::update(account_archives::table.find(id))
                .set((
                    account_archives::canonical_id.eq(canonical_id),
                    account_archives::platform_id.eq(merged.platform_id.as_deref()),
                    account_archives::display_name.eq(merged.display_name.as_deref()),
                    account_archives::bio.eq(merged.bio.as_deref()),
                    account_archives::data.eq(data.as_deref()),
                    account_archives::update_date.eq(&now),
                ))
                .execute(conn)
                .await?;
        }
        None => {
            let data = json_to_text(&account.data);
            diesel::insert_into(account_archives::table)
                .values(NewAccountArchive {
                    create_date: &now,
                    update_date: &now,
                    canonical_id,
                    archive_session_id: session_id,
                    url: &account.url,
                    platform_id: account.platform_id.as_deref(),
                    display_name: account.display_name.as_deref(),
                    bio: account.bio.as_deref(),
                    data: data.as_deref(),
                    notes: account.notes.as_deref(),
                })
                .execute(conn)
                .await?;
        }
    }
    Ok(())
}

async fn upsert_canonical_post(conn: &mut SqliteConn, post: &Post) -> Result<i64, DieselError> {
    let existing: Option<PostRecord> = posts::table
        .filter(posts::url.eq(&post.url))
        .first(conn)
        .await
        .optional()?;
    let now = now_str();

    match existing {
        Some(record) => {
            let id = record.id;
            let merged = reconcile_post(post.clone(), Some(record.into_post()));
            let data = json_to_text(&merged.data);
            let publication = merged.publication_date.map(|d| d.to_rfc3339());
            diesel::update(posts::table.find(id))
                .set((
                    posts::platform_id.eq(merged.platform_id.as_deref()),
                    posts::account_id.eq(merged.account_id),
                    posts::account_url.eq(merged.account_url.as_deref()),
                    posts::publication_date.eq(publication.as_deref()),
                    posts::caption.eq(merged.caption.as_deref()),
                    posts::data.eq(data.as_deref()),
                    posts::notes.eq(merged.notes.as_deref()),
                    posts::update_date.eq(&now),
                ))
                .execute(conn)
                .await?;
            Ok(id)
        }
        None => {
            let data = json_to_text(&post.data);
            let publication = post.publication_date.map(|d| d.to_rfc3339());
            diesel::insert_into(posts::table)
                .values(NewPost {
                    create_date: &now,
                    update_date: &now,
                    url: &post.url,
                    platform_id: post.platform_id.as_deref(),
                    account_id: post.account_id,
                    account_url: post.account_url.as_deref(),
                    publication_date: publication.as_deref(),
                    caption: post.caption.as_deref(),
                    data: data.as_deref(),
                    notes: post.notes.as_deref(),
                })
                .execute(conn)
                .await?;
            posts::table
                .filter(posts::url.eq(&post.url))
                .select(posts::id)
                .first(conn)
                .await
        }
    }
}

async fn upsert_archive_post(
    conn: &mut SqliteConn,
    post: &Post,
    session_id: i64,
    canonical_id: i64,
) -> Result<(), DieselError> {
    let existing: Option<PostArchiveRecord> = post_archives::table
        .filter(post_archives::url.eq(&post.url))
        .filter(post_archives::archive_session_id.eq(session_id))
        .first(conn)
        .await
        .optional()?;
    let now = now_str();

    match existing {
        Some(record) => {
            let id = record.id;
            let merged = reconcile_post(post.clone(), Some(record.into_post()));
            let data = json_to_text(&merged.data);
            let publication = merged.publication_date.map(|d| d.to_rfc3339());
            diesel::update(post_archives::table.find(id))
                .set((
                    post_archives::canonical_id.eq(canonical_id),
                    post_archives::platform_id.eq(merged.platform_id.as_deref()),
                    post_archives::account_url.eq(merged.account_url.as_deref()),
                    post_archives::publication_date.eq(publication.as_deref()),
                    post_archives::caption.eq(merged.caption.as_deref()),
                    post_archives::data.eq(data.as_deref()),
                    post_archives::update_date.eq(&now),
                ))
                .execute(conn)
                .await?;
        }
        None => {
            let data = json_to_text(&post.data);
            let publication = post.publication_date.map(|d| d.to_rfc3339());
            diesel::insert_into(post_archives::table)
                .values(NewPostArchive {
                    create_date: &now,
                    update_date: &now,
                    canonical_id,
                    archive_session_id: session_id,
                    url: &post.url,
                    platform_id: post.platform_id.as_deref(),
                    account_url: post.account_url.as_deref(),
                    publication_date: publication.as_deref(),
                    caption: post.caption.as_deref(),
                    data: data.as_deref(),
                    notes: post.notes.as_deref(),
                })
                .execute(conn)
                .await?;
        }
    }
    Ok(())
}

async fn upsert_canonical_media(conn: &mut SqliteConn, m: &Media) -> Result<i64, DieselError> {
    let existing: Option<MediaRecord> = media::table
        .filter(media::url.eq(&m.url))
        .first(conn)
        .await
        .optional()?;
    let now = now_str();

    match existing {
        Some(record) => {
            let id = record.id;
            let merged = reconcile_media(m.clone(), Some(record.into_media()));
            let data = json_to_text(&merged.data);
            diesel::update(media::table.find(id))
                .set((
                    media::platform_id.eq(merged.platform_id.as_deref()),
                    media::post_id.eq(merged.post_id),
                    media::post_url.eq(merged.post_url.as_deref()),
                    media::local_path.eq(merged.local_path.as_deref()),
                    media::media_type.eq(merged.kind.as_str()),
                    media::data.eq(data.as_deref()),
                    media::notes.eq(merged.notes.as_deref()),
                    media::update_date.eq(&now),
                ))
                .execute(conn)
                .await?;
            Ok(id)
        }
        None => {
            let data = json_to_text(&m.data);
            diesel::insert_into(media::table)
                .values(NewMedia {
                    create_date: &now,
                    update_date: &now,
                    url: &m.url,
                    platform_id: m.platform_id.as_deref(),
                    post_id: m.post_id,
                    post_url: m.post_url.as_deref(),
                    local_path: m.local_path.as_deref(),
                    media_type: m.kind.as_str(),
                    data: data.as_deref(),
                    thumbnail_path: m.thumbnail_path.as_deref(),
                    notes: m.notes.as_deref(),
                })
                .execute(conn)
                .await?;
            media::table
                .filter(media::url.eq(&m.url))
                .select(media::id)
                .first(conn)
                .await
        }
    }
}

async fn upsert_archive_media(
    conn: &mut SqliteConn,
    m: &Media,
    session_id: i64,
    canonical_id: i64,
) -> Result<(), DieselError> {
    let existing: Option<MediaArchiveRecord> = media_archives::table
        .filter(media_archives::url.eq(&m.url))
        .filter(media_archives::archive_session_id.eq(session_id))
        .first(conn)
        .await
        .optional()?;
    let now = now_str();

    match existing {
        Some(record) => {
            let id = record.id;
            let merged = reconcile_media(m.clone(), Some(record.into_media()));
            let data = json_to_text(&merged.data);
            diesel::update(media_archives::table.find(id))
                .set((
                    media_archives::canonical_id.eq(canonical_id),
                    media_archives::platform_id.eq(merged.platform_id.as_deref()),
                    media_archives::post_url.eq(merged.post_url.as_deref()),
                    media_archives::local_path.eq(merged.local_path.as_deref()),
                    media_archives::media_type.eq(merged.kind.as_str()),
                    media_archives::data.eq(data.as_deref()),
                    media_archives::update_date.eq(&now),
                ))
                .execute(conn)
                .await?;
        }
        None => {
            let data = json_to_text(&m.data);
            diesel::insert_into(media_archives::table)
                .values(NewMediaArchive {
                    create_date: &now,
                    update_date: &now,
                    canonical_id,
                    archive_session_id: session_id,
                    url: &m.url,
                    platform_id: m.platform_id.as_deref(),
                    post_url: m.post_url.as_deref(),
                    local_path: m.local_path.as_deref(),
                    media_type: m.kind.as_str(),
                    data: data.as_deref(),
                    notes: m.notes.as_deref(),
                })
                .execute(conn)
                .await?;
        }
    }
    Ok(())
}
