//! Diesel ORM models for database tables.
//!
//! Row records mirror the column order of `crate::schema`; the `into_*`
//! conversions translate storage text columns (datetimes, JSON) into the
//! domain models.

use diesel::prelude::*;

use crate::models::{
    Account, ArchiveSession, Media, MediaKind, MediaPart, Post, ShareLink, ShareableEntity,
    SourceType, Tag, User,
};
use crate::schema;

use super::{parse_datetime, parse_datetime_opt, text_to_json};

/// Canonical account row.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::accounts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AccountRecord {
    pub id: i64,
    pub create_date: String,
    pub update_date: String,
    pub url: String,
    pub platform_id: Option<String>,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub data: Option<String>,
    pub notes: Option<String>,
}

impl AccountRecord {
    pub fn into_account(self) -> Account {
        Account {
            id: self.id,
            url: self.url,
            platform_id: self.platform_id,
            display_name: self.display_name,
            bio: self.bio,
            data: text_to_json(self.data.as_deref()),
            notes: self.notes,
            create_date: Some(parse_datetime(&self.create_date)),
            update_date: Some(parse_datetime(&self.update_date)),
        }
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = schema::accounts)]
pub struct NewAccount<'a> {
    pub create_date: &'a str,
    pub update_date: &'a str,
    pub url: &'a str,
    pub platform_id: Option<&'a str>,
    pub display_name: Option<&'a str>,
    pub bio: Option<&'a str>,
    pub data: Option<&'a str>,
    pub notes: Option<&'a str>,
}

/// Per-session account observation row.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::account_archives)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AccountArchiveRecord {
    pub id: i64,
    pub create_date: String,
    pub update_date: String,
    pub canonical_id: i64,
    pub archive_session_id: i64,
    pub url: String,
    pub platform_id: Option<String>,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub data: Option<String>,
    pub notes: Option<String>,
}

impl AccountArchiveRecord {
    pub fn into_account(self) -> Account {
        Account {
            id: self.canonical_id,
            url: self.url,
            platform_id: self.platform_id,
            display_name: self.display_name,
            bio: self.bio,
            data: text_to_json(self.data.as_deref()),
            notes: self.notes,
            create_date: Some(parse_datetime(&self.create_date)),
            update_date: Some(parse_datetime(&self.update_date)),
        }
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = schema::account_archives)]
pub struct NewAccountArchive<'a> {
    pub create_date: &'a str,
    pub update_date: &'a str,
    pub canonical_id: i64,
    pub archive_session_id: i64,
    pub url: &'a str,
    pub platform_id: Option<&'a str>,
    pub display_name: Option<&'a str>,
    pub bio: Option<&'a str>,
    pub data: Option<&'a str>,
    pub notes: Option<&'a str>,
}

/// Canonical post row.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::posts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PostRecord {
    pub id: i64,
    pub create_date: String,
    pub update_date: String,
    pub url: String,
    pub platform_id: Option<String>,
    pub account_id: Option<i64>,
    pub account_url: Option<String>,
    pub publication_date: Option<String>,
    pub caption: Option<String>,
    pub data: Option<String>,
    pub notes: Option<String>,
}

impl PostRecord {
    pub fn into_post(self) -> Post {
        Post {
            id: self.id,
            url: self.url,
            platform_id: self.platform_id,
            account_id: self.account_id,
            account_url: self.account_url,
            publication_date: parse_datetime_opt(self.publication_date.as_deref()),
            caption: self.caption,
            data: text_to_json(self.data.as_deref()),
            notes: self.notes,
            create_date: Some(parse_datetime(&self.create_date)),
            update_date: Some(parse_datetime(&self.update_date)),
        }
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = schema::posts)]
pub struct NewPost<'a> {
    pub create_date: &'a str,
    pub update_date: &'a str,
    pub url: &'a str,
    pub platform_id: Option<&'a str>,
    pub account_id: Option<i64>,
    pub account_url: Option<&'a str>,
    pub publication_date: Option<&'a str>,
    pub caption: Option<&'a str>,
    pub data: Option<&'a str>,
    pub notes: Option<&'a str>,
}

/// Per-session post observation row.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::post_archives)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PostArchiveRecord {
    pub id: i64,
    pub create_date: String,
    pub update_date: String,
    pub canonical_id: i64,
    pub archive_session_id: i64,
    pub url: String,
    pub platform_id: Option<String>,
    pub account_url: Option<String>,
    pub publication_date: Option<String>,
    pub caption: Option<String>,
    pub data: Option<String>,
    pub notes: Option<String>,
}

impl PostArchiveRecord {
    pub fn into_post(self) -> Post {
        Post {
            id: self.canonical_id,
            url: self.url,
            platform_id: self.platform_id,
            account_id: None,
            account_url: self.account_url,
            publication_date: parse_datetime_opt(self.publication_date.as_deref()),
            caption: self.caption,
            data: text_to_json(self.data.as_deref()),
            notes: self.notes,
            create_date: Some(parse_datetime(&self.create_date)),
            update_date: Some(parse_datetime(&self.update_date)),
        }
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = schema::post_archives)]
pub struct NewPostArchive<'a> {
    pub create_date: &'a str,
    pub update_date: &'a str,
    pub canonical_id: i64,
    pub archive_session_id: i64,
    pub url: &'a str,
    pub platform_id: Option<&'a str>,
    pub account_url: Option<&'a str>,
    pub publication_date: Option<&'a str>,
    pub caption: Option<&'a str>,
    pub data: Option<&'a str>,
    pub notes: Option<&'a str>,
}

/// Canonical media row.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::media)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct MediaRecord {
    pub id: i64,
    pub create_date: String,
    pub update_date: String,
    pub url: String,
    pub platform_id: Option<String>,
    pub post_id: Option<i64>,
    pub post_url: Option<String>,
    pub local_path: Option<String>,
    pub media_type: String,
    pub data: Option<String>,
    pub thumbnail_path: Option<String>,
    pub notes: Option<String>,
}

impl MediaRecord {
    pub fn into_media(self) -> Media {
        Media {
            id: self.id,
            url: self.url,
            platform_id: self.platform_id,
            post_id: self.post_id,
            post_url: self.post_url,
            local_path: self.local_path,
            kind: MediaKind::from_str(&self.media_type).unwrap_or(MediaKind::Image),
            data: text_to_json(self.data.as_deref()),
            thumbnail_path: self.thumbnail_path,
            notes: self.notes,
            create_date: Some(parse_datetime(&self.create_date)),
            update_date: Some(parse_datetime(&self.update_date)),
        }
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = schema::media)]
pub struct NewMedia<'a> {
    pub create_date: &'a str,
    pub update_date: &'a str,
    pub url: &'a str,
    pub platform_id: Option<&'a str>,
    pub post_id: Option<i64>,
    pub post_url: Option<&'a str>,
    pub local_path: Option<&'a str>,
    pub media_type: &'a str,
    pub data: Option<&'a str>,
    pub thumbnail_path: Option<&'a str>,
    pub notes: Option<&'a str>,
}

/// Per-session media observation row.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::media_archives)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct MediaArchiveRecord {
    pub id: i64,
    pub create_date: String,
    pub update_date: String,
    pub canonical_id: i64,
    pub archive_session_id: i64,
    pub url: String,
    pub platform_id: Option<String>,
    pub post_url: Option<String>,
    pub local_path: Option<String>,
    pub media_type: String,
    pub data: Option<String>,
    pub notes: Option<String>,
}

impl MediaArchiveRecord {
    pub fn into_media(self) -> Media {
        Media {
            id: self.canonical_id,
            url: self.url,
            platform_id: self.platform_id,
            post_id: None,
            post_url: self.post_url,
            local_path: self.local_path,
            kind: MediaKind::from_str(&self.media_type).unwrap_or(MediaKind::Image),
            data: text_to_json(self.data.as_deref()),
            thumbnail_path: None,
            notes: self.notes,
            create_date: Some(parse_datetime(&self.create_date)),
            update_date: Some(parse_datetime(&self.update_date)),
        }
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = schema::media_archives)]
pub struct NewMediaArchive<'a> {
    pub create_date: &'a str,
    pub update_date: &'a str,
    pub canonical_id: i64,
    pub archive_session_id: i64,
    pub url: &'a str,
    pub platform_id: Option<&'a str>,
    pub post_url: Option<&'a str>,
    pub local_path: Option<&'a str>,
    pub media_type: &'a str,
    pub data: Option<&'a str>,
    pub notes: Option<&'a str>,
}

/// Media part row.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::media_parts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct MediaPartRecord {
    pub id: i64,
    pub create_date: String,
    pub update_date: String,
    pub media_id: i64,
    pub time_start_ms: Option<i64>,
    pub time_end_ms: Option<i64>,
    pub crop_x: Option<i64>,
    pub crop_y: Option<i64>,
    pub crop_w: Option<i64>,
    pub crop_h: Option<i64>,
    pub notes: Option<String>,
}

impl MediaPartRecord {
    pub fn into_media_part(self) -> MediaPart {
        MediaPart {
            id: self.id,
            media_id: self.media_id,
            time_start_ms: self.time_start_ms,
            time_end_ms: self.time_end_ms,
            crop_x: self.crop_x,
            crop_y: self.crop_y,
            crop_w: self.crop_w,
            crop_h: self.crop_h,
            notes: self.notes,
        }
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = schema::media_parts)]
pub struct NewMediaPart<'a> {
    pub create_date: &'a str,
    pub update_date: &'a str,
    pub media_id: i64,
    pub time_start_ms: Option<i64>,
    pub time_end_ms: Option<i64>,
    pub crop_x: Option<i64>,
    pub crop_y: Option<i64>,
    pub crop_w: Option<i64>,
    pub crop_h: Option<i64>,
    pub notes: Option<&'a str>,
}

/// Archive session row.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::archive_sessions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ArchiveSessionRecord {
    pub id: i64,
    pub create_date: String,
    pub update_date: String,
    pub external_id: String,
    pub archive_location: String,
    pub archived_url: Option<String>,
    pub archiving_timestamp: Option<String>,
    pub archiving_timezone: Option<String>,
    pub parsed_version: Option<i32>,
    pub extracted_version: Option<i32>,
    pub structures: Option<String>,
    pub metadata: Option<String>,
    pub attachments: Option<String>,
    pub extraction_error: Option<String>,
    pub source_type: i32,
}

impl ArchiveSessionRecord {
    pub fn into_session(self) -> ArchiveSession {
        ArchiveSession {
            id: self.id,
            external_id: self.external_id,
            archive_location: self.archive_location,
            archived_url: self.archived_url,
            archiving_timestamp: parse_datetime_opt(self.archiving_timestamp.as_deref()),
            archiving_timezone: self.archiving_timezone,
            parsed_version: self.parsed_version,
            extracted_version: self.extracted_version,
            structures: text_to_json(self.structures.as_deref()),
            metadata: text_to_json(self.metadata.as_deref()),
            attachments: text_to_json(self.attachments.as_deref()),
            extraction_error: self.extraction_error,
            source_type: SourceType::from_i32(self.source_type),
            create_date: Some(parse_datetime(&self.create_date)),
            update_date: Some(parse_datetime(&self.update_date)),
        }
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = schema::archive_sessions)]
pub struct NewArchiveSession<'a> {
    pub create_date: &'a str,
    pub update_date: &'a str,
    pub external_id: &'a str,
    pub archive_location: &'a str,
    pub source_type: i32,
}

/// User row.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct UserRecord {
    pub id: i64,
    pub create_date: String,
    pub update_date: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub locked: i32,
    pub admin: i32,
    pub login_attempts: i32,
    pub last_login: Option<String>,
}

impl UserRecord {
    pub fn into_user(self) -> User {
        User {
            id: self.id,
            email: self.email,
            password_hash: self.password_hash,
            locked: self.locked != 0,
            admin: self.admin != 0,
            login_attempts: self.login_attempts,
            last_login: parse_datetime_opt(self.last_login.as_deref()),
        }
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = schema::users)]
pub struct NewUser<'a> {
    pub create_date: &'a str,
    pub update_date: &'a str,
    pub email: &'a str,
    pub password_hash: Option<&'a str>,
    pub locked: i32,
    pub admin: i32,
    pub login_attempts: i32,
}

/// Auth token row.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::auth_tokens)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AuthTokenRecord {
    pub id: i64,
    pub create_date: String,
    pub user_id: i64,
    pub token: String,
    pub last_use: String,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = schema::auth_tokens)]
pub struct NewAuthToken<'a> {
    pub create_date: &'a str,
    pub user_id: i64,
    pub token: &'a str,
    pub last_use: &'a str,
}

/// Share link row.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::share_links)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ShareLinkRecord {
    pub id: i64,
    pub create_date: String,
    pub update_date: String,
    pub created_by_user_id: i64,
    pub entity: String,
    pub entity_id: i64,
    pub valid: i32,
    pub link_suffix: String,
}

impl ShareLinkRecord {
    pub fn into_share_link(self) -> Option<ShareLink> {
        Some(ShareLink {
            id: self.id,
            created_by_user_id: self.created_by_user_id,
            entity: ShareableEntity::from_str(&self.entity)?,
            entity_id: self.entity_id,
            valid: self.valid != 0,
            link_suffix: self.link_suffix,
        })
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = schema::share_links)]
pub struct NewShareLink<'a> {
    pub create_date: &'a str,
    pub update_date: &'a str,
    pub created_by_user_id: i64,
    pub entity: &'a str,
    pub entity_id: i64,
    pub valid: i32,
    pub link_suffix: &'a str,
}

/// Tag row.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::tags)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TagRecord {
    pub id: i64,
    pub tag_type_id: Option<i64>,
    pub name: String,
    pub description: Option<String>,
}

impl TagRecord {
    pub fn into_tag(self, tag_type_name: Option<String>) -> Tag {
        Tag {
            id: self.id,
            name: self.name,
            description: self.description,
            tag_type_id: self.tag_type_id,
            tag_type_name,
        }
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = schema::event_log)]
pub struct NewEvent<'a> {
    pub create_date: &'a str,
    pub event_type: &'a str,
    pub user_id: Option<i64>,
    pub path: Option<&'a str>,
    pub details: Option<&'a str>,
}
