use std::fmt;

/// The state of a Minecraft protocol connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Handshaking,
    Status,
    Login,
    Play,
}

impl ConnectionState {
    pub fn from_handshake_next(next: i32) -> Option<Self> {
        match next {
            1 => Some(ConnectionState::Status),
            2 => Some(ConnectionState::Login),
            _ => None,
        }
    }
}

/// Which way a packet travels through the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Server to client.
    Clientbound,
    /// Client to server.
    Serverbound,
}

/// Identity of a packet: its numeric ID within a connection state.
/// IDs are those of the version the packet is read in (the server's for
/// clientbound packets, the client's for serverbound ones).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PacketType {
    pub state: ConnectionState,
    pub id: i32,
}

impl PacketType {
    pub const fn new(state: ConnectionState, id: i32) -> Self {
        Self { state, id }
    }

    pub const fn play(id: i32) -> Self {
        Self::new(ConnectionState::Play, id)
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}/0x{:02X}", self.state, self.id)
    }
}
