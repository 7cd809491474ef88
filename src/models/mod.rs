//! Data models for Harbor.

mod entity;
mod session;
mod user;

pub use entity::{
    Account, Annotation, ExtractedEntities, ExtractedPost, Media, MediaKind, MediaPart, Post,
};
pub use session::{ArchiveSession, SessionAttachments, SessionMetadata, SourceType};
pub use user::{ShareLink, ShareableEntity, Tag, TokenPermissions, User};
