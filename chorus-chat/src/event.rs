//! Events emitted by the chat client for the orchestrator to consume.

/// Events that the client emits to the consumer.
#[derive(Debug, Clone)]
pub enum Event {
    /// TCP (and TLS, if enabled) connection established.
    Connected,

    /// Registration complete. `nick` is our confirmed nick. The turn loop
    /// may start once this fires.
    Registered { nick: String },

    /// Joined a channel.
    Joined { channel: String, nick: String },

    /// Someone left a channel.
    Parted { channel: String, nick: String },

    /// A message in a channel or private message.
    Message {
        from: String,
        target: String,
        text: String,
    },

    /// Someone quit the server.
    UserQuit { nick: String, reason: String },

    /// Connection was closed.
    Disconnected { reason: String },

    /// Raw server line (for debugging).
    RawLine(String),
}
