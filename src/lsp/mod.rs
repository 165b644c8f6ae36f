pub mod backend;
pub mod document;
pub mod features;
pub mod position;
