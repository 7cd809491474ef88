//! Request handlers for the query service.

mod account;
mod annotate;
mod files;
mod login;
mod media;
mod media_part;
mod post;
mod search;
mod session;
mod share;
mod tags;

pub use account::{account_data, account_sessions, get_account};
pub use annotate::annotate_entity;
pub use files::serve_file;
pub use login::{login, logout};
pub use media::{get_media, media_data, media_parts, media_sessions};
pub use media_part::{delete_media_part, upsert_media_part};
pub use post::{get_post, post_data, post_sessions};
pub use search::search_entities;
pub use session::get_archiving_session;
pub use share::{delete_share_link, get_share_link, issue_share_link};
pub use tags::autocomplete_tags;
