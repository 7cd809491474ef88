//! Schema initialization.
//!
//! The full DDL is applied idempotently with `CREATE TABLE IF NOT EXISTS`,
//! matching the table definitions in `crate::schema`.

use diesel_async::SimpleAsyncConnection;

use super::pool::{DieselError, SqliteConn, SqlitePool};

/// Create all tables and indexes if they do not exist.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), DieselError> {
    let mut conn = pool.get().await?;
    init_schema_on(&mut conn).await
}

pub(crate) async fn init_schema_on(conn: &mut SqliteConn) -> Result<(), DieselError> {
    conn.batch_execute(
        r#"
        -- Canonical entities
        CREATE TABLE IF NOT EXISTS accounts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            create_date TEXT NOT NULL,
            update_date TEXT NOT NULL,
            url TEXT NOT NULL UNIQUE,
            platform_id TEXT,
            display_name TEXT,
            bio TEXT,
            data TEXT,
            notes TEXT
        );

        CREATE TABLE IF NOT EXISTS posts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            create_date TEXT NOT NULL,
            update_date TEXT NOT NULL,
            url TEXT NOT NULL UNIQUE,
            platform_id TEXT,
            account_id INTEGER REFERENCES accounts(id),
            account_url TEXT,
            publication_date TEXT,
            caption TEXT,
            data TEXT,
            notes TEXT
        );

        CREATE TABLE IF NOT EXISTS media (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            create_date TEXT NOT NULL,
            update_date TEXT NOT NULL,
            url TEXT NOT NULL UNIQUE,
            platform_id TEXT,
            post_id INTEGER REFERENCES posts(id),
            post_url TEXT,
            local_path TEXT,
            media_type TEXT NOT NULL,
            data TEXT,
            thumbnail_path TEXT,
            notes TEXT
        );

        -- Per-session observations, one row per entity per archive session
        CREATE TABLE IF NOT EXISTS account_archives (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            create_date TEXT NOT NULL,
            update_date TEXT NOT NULL,
            canonical_id INTEGER NOT NULL REFERENCES accounts(id),
            archive_session_id INTEGER NOT NULL REFERENCES archive_sessions(id),
            url TEXT NOT NULL,
            platform_id TEXT,
            display_name TEXT,
            bio TEXT,
            data TEXT,
            notes TEXT,
            UNIQUE (url, archive_session_id)
        );

        CREATE TABLE IF NOT EXISTS post_archives (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            create_date TEXT NOT NULL,
            update_date TEXT NOT NULL,
            canonical_id INTEGER NOT NULL REFERENCES posts(id),
            archive_session_id INTEGER NOT NULL REFERENCES archive_sessions(id),
            url TEXT NOT NULL,
            platform_id TEXT,
            account_url TEXT,
            publication_date TEXT,
            caption TEXT,
            data TEXT,
            notes TEXT,
            UNIQUE (url, archive_session_id)
        );

        CREATE TABLE IF NOT EXISTS media_archives (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            create_date TEXT NOT NULL,
            update_date TEXT NOT NULL,
            canonical_id INTEGER NOT NULL REFERENCES media(id),
            archive_session_id INTEGER NOT NULL REFERENCES archive_sessions(id),
            url TEXT NOT NULL,
            platform_id TEXT,
            post_url TEXT,
            local_path TEXT,
            media_type TEXT NOT NULL,
            data TEXT,
            notes TEXT,
            UNIQUE (url, archive_session_id)
        );

        CREATE TABLE IF NOT EXISTS media_parts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            create_date TEXT NOT NULL,
            update_date TEXT NOT NULL,
            media_id INTEGER NOT NULL REFERENCES media(id),
            time_start_ms INTEGER,
            time_end_ms INTEGER,
            crop_x INTEGER,
            crop_y INTEGER,
            crop_w INTEGER,
            crop_h INTEGER,
            notes TEXT
        );

        -- Archive sessions
        CREATE TABLE IF NOT EXISTS archive_sessions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            create_date TEXT NOT NULL,
            update_date TEXT NOT NULL,
            external_id TEXT NOT NULL UNIQUE,
            archive_location TEXT NOT NULL,
            archived_url TEXT,
            archiving_timestamp TEXT,
            archiving_timezone TEXT,
            parsed_version INTEGER,
            extracted_version INTEGER,
            structures TEXT,
            metadata TEXT,
            attachments TEXT,
            extraction_error TEXT,
            source_type INTEGER NOT NULL DEFAULT 0
        );

        -- Users and sessions
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            create_date TEXT NOT NULL,
            update_date TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT,
            locked INTEGER NOT NULL DEFAULT 0,
            admin INTEGER NOT NULL DEFAULT 0,
            login_attempts INTEGER NOT NULL DEFAULT 0,
            last_login TEXT
        );

        CREATE TABLE IF NOT EXISTS auth_tokens (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            create_date TEXT NOT NULL,
            user_id INTEGER NOT NULL REFERENCES users(id),
            token TEXT NOT NULL UNIQUE,
            last_use TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS share_links (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            create_date TEXT NOT NULL,
            update_date TEXT NOT NULL,
            created_by_user_id INTEGER NOT NULL REFERENCES users(id),
            entity TEXT NOT NULL,
            entity_id INTEGER NOT NULL,
            valid INTEGER NOT NULL DEFAULT 1,
            link_suffix TEXT NOT NULL UNIQUE
        );

        -- Tags
        CREATE TABLE IF NOT EXISTS tag_types (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            description TEXT
        );

        CREATE TABLE IF NOT EXISTS tags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tag_type_id INTEGER REFERENCES tag_types(id),
            name TEXT NOT NULL,
            description TEXT
        );

        CREATE TABLE IF NOT EXISTS account_tags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            account_id INTEGER NOT NULL REFERENCES accounts(id),
            tag_id INTEGER NOT NULL REFERENCES tags(id)
        );

        CREATE TABLE IF NOT EXISTS post_tags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            post_id INTEGER NOT NULL REFERENCES posts(id),
            tag_id INTEGER NOT NULL REFERENCES tags(id)
        );

        CREATE TABLE IF NOT EXISTS media_tags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            media_id INTEGER NOT NULL REFERENCES media(id),
            tag_id INTEGER NOT NULL REFERENCES tags(id)
        );

        CREATE TABLE IF NOT EXISTS event_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            create_date TEXT NOT NULL,
            event_type TEXT NOT NULL,
            user_id INTEGER,
            path TEXT,
            details TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_posts_account_id ON posts(account_id);
        CREATE INDEX IF NOT EXISTS idx_media_post_id ON media(post_id);
        CREATE INDEX IF NOT EXISTS idx_account_archives_session ON account_archives(archive_session_id);
        CREATE INDEX IF NOT EXISTS idx_post_archives_session ON post_archives(archive_session_id);
        CREATE INDEX IF NOT EXISTS idx_media_archives_session ON media_archives(archive_session_id);
        CREATE INDEX IF NOT EXISTS idx_auth_tokens_token ON auth_tokens(token);
        CREATE INDEX IF NOT EXISTS idx_share_links_suffix ON share_links(link_suffix);
        "#,
    )
    .await
}
