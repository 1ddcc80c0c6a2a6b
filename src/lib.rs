pub mod config;
pub mod controller;
pub mod error;
pub mod features;
mod logging;
mod router;
mod state;
mod ui;

pub use config::SigningConfig;
pub use controller::{Effect, Event, Mode, Session, Transition};
pub use error::{Result, SignError};
pub use features::document_store::{Document, DocumentStore};
pub use features::placement::{
    compute_embed_rect, place_signature, EmbedRect, PageSize, PlacementPolicy, PlacementRequest,
    Platform, TapPoint, VerticalReference, Viewport,
};
