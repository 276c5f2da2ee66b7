pub mod resolve;
pub mod rewriter;

pub use resolve::resolve_reference;
pub use rewriter::{ManifestLine, rewrite_manifest};
