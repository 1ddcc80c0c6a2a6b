pub mod codec;
pub mod document_store;
pub mod pdf;
pub mod placement;
pub mod screens;
pub mod signature;
