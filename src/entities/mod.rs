//! Entity mapping and reconciliation.
//!
//! Turns typed structures into candidate accounts, posts and media, then
//! merges repeated observations of the same logical entity.

pub mod mapper;
pub mod reconcile;
pub mod shortcode;
