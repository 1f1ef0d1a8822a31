use crate::registry::{PacketRegistry, RegistryBuilder};
use burrow_types::ProtocolVersion;
use tracing::info;

/// Trait for a translation layer between two protocol versions.
/// Each supported version pair implements this trait.
pub trait VersionTranslator: Send + Sync {
    /// Version spoken by the connecting client.
    fn client_version(&self) -> ProtocolVersion;

    /// Version spoken by the backend server.
    fn server_version(&self) -> ProtocolVersion;

    /// Add this layer's packet handlers.
    fn register_packets(&self, registry: &mut RegistryBuilder);
}

/// Register each layer in order and freeze the result.
/// A later layer's handler replaces an earlier one for the same packet.
pub fn build_registry(layers: &[&dyn VersionTranslator]) -> PacketRegistry {
    let mut builder = RegistryBuilder::new();
    for layer in layers {
        layer.register_packets(&mut builder);
        info!(
            "Registered translation layer {} -> {}",
            layer.server_version(),
            layer.client_version()
        );
    }
    builder.build()
}
