// Resume API: parse, enhance, field rewrites, achievement bullets, LaTeX generation,
// cover letters and career objectives.
// Each request costs one credit; see operations.rs.

pub mod handlers;
pub mod operations;
pub mod upload;
