pub mod batch;
pub mod config;
pub mod db;
pub mod learning;
pub mod session;
pub mod structure;
pub mod text;
pub mod transpose;

/// Chord sheet file extensions picked up by batch rendering
pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "cho", "chopro", "crd"];

/// Application name for XDG paths
pub const APP_NAME: &str = "songsheet";
