//! tacstore - headless CoT/TAK situational-awareness client core
//!
//! Keeps a canonical `uid -> Item` map in sync with a TAK-style backend:
//! full and partial snapshots arrive over REST, single-item deltas over a
//! WebSocket push channel. Every apply reports exactly which items were
//! added, updated or removed so a rendering layer can do minimal updates.
//!
//! ## Modules
//!
//! - **store**: the reconciliation core ([`store::ItemStore`])
//! - **model**: map-entity records and the wire patch shape
//! - **messages**: WebSocket push envelope and event routing
//! - **catalog**: CoT type tree and SIDC derivation
//! - **geo**: haversine distance/bearing and polyline navigation
//! - **transport**: REST client and WebSocket reader task

pub mod catalog;
pub mod config;
pub mod geo;
pub mod messages;
pub mod model;
pub mod store;
pub mod transport;

pub use config::Args;
pub use messages::{apply_event, WsEvent, WsMessage};
pub use model::{Category, Item, ItemUpdate};
pub use store::{ItemDiff, ItemStore};
pub use transport::{RestClient, TransportError};
