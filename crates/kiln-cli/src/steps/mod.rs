//! Pipeline step implementations.
//!
//! Each step is an async fn over `&BuildContext` that resolves when its
//! output is fully written. Steps know nothing about each other; whatever
//! one step needs from another travels through the filesystem (the bundle
//! manifest, the temporary tree).

pub mod assets;
pub mod clean;
pub mod images;
pub mod inject;
pub mod publish;
pub mod templates;
