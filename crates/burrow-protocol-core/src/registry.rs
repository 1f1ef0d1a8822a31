use crate::error::{TransformError, TransformResult};
use crate::state::{Direction, PacketType};
use crate::wrapper::{Dispatched, PacketWrapper};
use bytes::{Bytes, BytesMut};
use std::collections::HashMap;
use tracing::{error, trace, warn};

/// A packet transform. Runs once per packet against a fresh wrapper.
pub type PacketHandler = Box<dyn Fn(&mut PacketWrapper) -> TransformResult<()> + Send + Sync>;

/// Collects handlers while translation layers initialize.
///
/// Registering twice for the same direction and packet replaces the first handler,
/// which is how a later layer overrides an earlier one.
#[derive(Default)]
pub struct RegistryBuilder {
    handlers: HashMap<(Direction, PacketType), PacketHandler>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, direction: Direction, packet: PacketType, handler: F)
    where
        F: Fn(&mut PacketWrapper) -> TransformResult<()> + Send + Sync + 'static,
    {
        if self
            .handlers
            .insert((direction, packet), Box::new(handler))
            .is_some()
        {
            warn!("{:?} handler for {} replaced", direction, packet);
        }
    }

    pub fn register_clientbound<F>(&mut self, packet: PacketType, handler: F)
    where
        F: Fn(&mut PacketWrapper) -> TransformResult<()> + Send + Sync + 'static,
    {
        self.register(Direction::Clientbound, packet, handler);
    }

    pub fn register_serverbound<F>(&mut self, packet: PacketType, handler: F)
    where
        F: Fn(&mut PacketWrapper) -> TransformResult<()> + Send + Sync + 'static,
    {
        self.register(Direction::Serverbound, packet, handler);
    }

    pub fn is_registered(&self, direction: Direction, packet: PacketType) -> bool {
        self.handlers.contains_key(&(direction, packet))
    }

    /// Freeze the table. Nothing can be registered afterwards.
    pub fn build(self) -> PacketRegistry {
        PacketRegistry {
            handlers: self.handlers,
        }
    }
}

/// Immutable handler table, shared by every connection.
pub struct PacketRegistry {
    handlers: HashMap<(Direction, PacketType), PacketHandler>,
}

impl PacketRegistry {
    /// Run the handler for this packet, or forward it untouched if there is none.
    pub fn dispatch(
        &self,
        direction: Direction,
        packet: PacketType,
        data: Bytes,
    ) -> TransformResult<Dispatched> {
        let Some(handler) = self.handlers.get(&(direction, packet)) else {
            return Ok(Dispatched::Forward(BytesMut::from(&data[..])));
        };

        let mut wrapper = PacketWrapper::new(data);
        if let Err(e) = handler(&mut wrapper) {
            if let TransformError::Precondition(violation) = &e {
                error!(
                    "{:?} handler for {} misused the packet wrapper: {}",
                    direction, packet, violation
                );
            }
            return Err(e);
        }

        let result = wrapper.finish();
        trace!(
            "{:?} {} -> {}",
            direction,
            packet,
            match &result {
                Dispatched::Forward(bytes) => format!("{} bytes", bytes.len()),
                Dispatched::Cancelled => "cancelled".to_string(),
            }
        );
        Ok(result)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}
