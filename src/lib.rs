//! Mattress Configurator - Configuration State Engine
//!
//! # The Five Rules (Non-Negotiable)
//! 1. The URL Is The Only Persisted State
//! 2. Height Decides Slots, Size Decides Price
//! 3. Repair Happens Inside The Height Change
//! 4. Price, Description And Path Are Projections
//! 5. Untrusted Paths Never Crash The Engine

pub mod catalog;
pub mod selection;
pub mod compatibility;
pub mod url_codec;
pub mod pricing;
pub mod description;
pub mod hashing;
pub mod engine;
pub mod loader;
pub mod cart;

pub use catalog::{Catalog, CatalogItem, Height, ItemId, Size, SizeKind, Slot};
pub use selection::Selection;
pub use compatibility::{active_slots, is_available, repair, validate, Repair, SelectionChecker, SelectionViolation};
pub use url_codec::{decode, encode, DecodedPath, UrlMapping};
pub use pricing::{price, total};
pub use description::{aggregate, Description, DescriptionBlock, DescriptionCatalog};
pub use engine::{Action, ConfigState, ConfigView, Configurator, EngineError, EngineSettings};
pub use loader::{CatalogBundle, LoadError, Session, SessionStatus};
pub use cart::{Cart, CartError, CartLine};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
