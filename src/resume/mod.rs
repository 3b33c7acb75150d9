//! JSON Resume parsing, font resolution, and PDF rendering.

pub mod fonts;
pub mod generator;
pub mod models;

pub use generator::ResumeGenerator;
pub use models::Resume;
