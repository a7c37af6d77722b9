pub mod library;
pub mod preview;
pub mod variant;
