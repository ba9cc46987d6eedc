//! Networking for the Trackway server: line framing, the TAOnline protocol
//! codec, the ordered command channel, the session registry and the TCP
//! accept loop, plus a small client.

pub mod channel;
pub mod framing;
pub mod handshake;
pub mod messages;
pub mod routing;
pub mod session;
pub mod tcp_client;
pub mod tcp_server;

pub use channel::{CommandReceiver, CommandSender, Envelope, Event, Origin, command_channel};
pub use framing::{LineConfig, LineError, read_line, write_line};
pub use handshake::{HandshakeError, UNKNOWN_HANDSHAKE, accept_handshake, connect_handshake};
pub use messages::{ClientCommand, ConsoleCommand, ParseError, ServerMessage};
pub use routing::Dispatcher;
pub use session::{ClientLink, Departed, LobbyLimits, RegisterError, ServerStatus, SessionRegistry};
pub use tcp_client::{ClientConfig, ClientError, ConnectionState, ConnectionStateWatch, GameClient};
pub use tcp_server::{GameServer, IdGenerator, ServerConfig};
