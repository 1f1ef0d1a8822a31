pub mod base;
pub mod codec;
pub mod collection;
pub mod connection;
pub mod error;
pub mod registry;
pub mod state;
pub mod translator;
pub mod types;
pub mod wrapper;

pub use base::{BaseTranslator, Handshake};
pub use codec::*;
pub use collection::{resize_collection, Retain};
pub use connection::{Connection, ConnectionReader, ConnectionWriter};
pub use error::*;
pub use registry::{PacketHandler, PacketRegistry, RegistryBuilder};
pub use state::*;
pub use translator::{build_registry, VersionTranslator};
pub use wrapper::{Dispatched, PacketWrapper};
