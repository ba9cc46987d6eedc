//! TAOnline line protocol: inbound commands, outbound messages and operator
//! console commands.
//!
//! Lines are whitespace-delimited tokens. Inbound lines are parsed with
//! [`str::parse`]; outbound messages are encoded with [`Display`](fmt::Display).

use std::fmt;
use std::str::FromStr;

use trackway_game::{Direction, PlayerId};

/// Protocol name exchanged during the handshake.
pub const PROTOCOL_NAME: &str = "TAOnline";

/// Greeting keyword sent by the client.
pub const HANDSHAKE: &str = "HANDSHAKE";

/// Handshake acknowledgement keyword.
pub const ACK: &str = "ACK";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why an inbound line was not understood.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The line holds no tokens.
    #[error("empty line")]
    Empty,
    /// The first token is not a known command.
    #[error("unknown command {0:?}")]
    UnknownCommand(String),
    /// Known command, wrong number of arguments.
    #[error("{command} expects {expected} argument(s), got {got}")]
    WrongArity {
        /// Command keyword.
        command: &'static str,
        /// Expected argument count.
        expected: usize,
        /// Received argument count.
        got: usize,
    },
    /// A coordinate is not an integer.
    #[error("invalid integer {0:?}")]
    BadInteger(String),
    /// A direction is not one of `NW NE E W SW SE`.
    #[error("invalid direction {0:?}")]
    BadDirection(String),
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// A command sent by a connected client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    /// Chat text, tokens re-joined with single spaces.
    Msg(String),
    /// Keepalive. Ignored.
    Ping,
    /// The client is ready for the next round.
    Ready,
    /// Choose a base vertex.
    SetStart {
        /// Column.
        x: i32,
        /// Row.
        y: i32,
    },
    /// Lay a rail on the edge leaving `(x, y)` towards `direction`.
    PlaceRail {
        /// Column.
        x: i32,
        /// Row.
        y: i32,
        /// Edge direction.
        direction: Direction,
    },
}

impl FromStr for ClientCommand {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let (&command, args) = tokens.split_first().ok_or(ParseError::Empty)?;

        match command {
            "MSG" => {
                if args.is_empty() {
                    return Err(ParseError::WrongArity {
                        command: "MSG",
                        expected: 1,
                        got: 0,
                    });
                }
                // text is relayed as typed, inner spacing included
                let text = line
                    .trim_start()
                    .split_once(char::is_whitespace)
                    .map_or("", |(_, text)| text);
                Ok(ClientCommand::Msg(text.to_string()))
            }
            "PING" => {
                expect_arity("PING", args, 0)?;
                Ok(ClientCommand::Ping)
            }
            "READY" => {
                expect_arity("READY", args, 0)?;
                Ok(ClientCommand::Ready)
            }
            "SETSTART" => {
                expect_arity("SETSTART", args, 2)?;
                Ok(ClientCommand::SetStart {
                    x: parse_int(args[0])?,
                    y: parse_int(args[1])?,
                })
            }
            "PLACERAIL" => {
                expect_arity("PLACERAIL", args, 3)?;
                Ok(ClientCommand::PlaceRail {
                    x: parse_int(args[0])?,
                    y: parse_int(args[1])?,
                    direction: args[2]
                        .parse()
                        .map_err(|_| ParseError::BadDirection(args[2].to_string()))?,
                })
            }
            other => Err(ParseError::UnknownCommand(other.to_string())),
        }
    }
}

fn expect_arity(command: &'static str, args: &[&str], expected: usize) -> Result<(), ParseError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(ParseError::WrongArity {
            command,
            expected,
            got: args.len(),
        })
    }
}

fn parse_int(token: &str) -> Result<i32, ParseError> {
    token
        .parse()
        .map_err(|_| ParseError::BadInteger(token.to_string()))
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// A line sent by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Handshake greeting accepted.
    Accept,
    /// Handshake or registration refused.
    Error(String),
    /// Registration complete; carries the assigned id.
    Ack(PlayerId),
    /// Another client joined.
    Connected(PlayerId, String),
    /// A client left.
    Disconnected(PlayerId, String),
    /// Every connected client.
    ClientList(Vec<(PlayerId, String)>),
    /// Connected clients that are ready.
    ReadyList(Vec<(PlayerId, String)>),
    /// A round is about to begin.
    Starting,
    /// Round participants.
    Players(Vec<(PlayerId, String)>),
    /// A new round was created.
    NewRound,
    /// One player's dealt cities, as `<id> <city;city;...;>`.
    Cities(String),
    /// A base was selected.
    SetStart {
        /// Selecting player.
        player: PlayerId,
        /// Column.
        x: i32,
        /// Row.
        y: i32,
    },
    /// A rail was laid.
    PlaceRail {
        /// Placing player.
        player: PlayerId,
        /// Column.
        x: i32,
        /// Row.
        y: i32,
        /// Edge direction.
        direction: Direction,
    },
    /// The round was aborted.
    Quit(String),
    /// The round was won.
    Finished(Vec<PlayerId>),
    /// A client declared itself ready.
    Ready(PlayerId),
    /// Sent to a client removed by the operator.
    Kicked,
    /// Chat relay.
    Msg {
        /// Sender's display name.
        sender: String,
        /// Chat text.
        text: String,
    },
}

fn write_roster(f: &mut fmt::Formatter<'_>, keyword: &str, roster: &[(PlayerId, String)]) -> fmt::Result {
    f.write_str(keyword)?;
    for (id, name) in roster {
        write!(f, " {id} {name}")?;
    }
    Ok(())
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::Accept => write!(f, "ACCEPT {PROTOCOL_NAME}"),
            ServerMessage::Error(reason) => write!(f, "ERROR {reason}"),
            ServerMessage::Ack(id) => write!(f, "{ACK} {id}"),
            ServerMessage::Connected(id, name) => write!(f, "CONNECTED {id} {name}"),
            ServerMessage::Disconnected(id, name) => write!(f, "DISCONNECTED {id} {name}"),
            ServerMessage::ClientList(roster) => write_roster(f, "CLIST", roster),
            ServerMessage::ReadyList(roster) => write_roster(f, "RLIST", roster),
            ServerMessage::Starting => f.write_str("STARTING"),
            ServerMessage::Players(roster) => write_roster(f, "PLAYERS", roster),
            ServerMessage::NewRound => f.write_str("NEWROUND"),
            ServerMessage::Cities(line) => write!(f, "CITIES {line}"),
            ServerMessage::SetStart { player, x, y } => write!(f, "SETSTART {player} {x} {y}"),
            ServerMessage::PlaceRail {
                player,
                x,
                y,
                direction,
            } => write!(f, "PLACERAIL {player} {x} {y} {direction}"),
            ServerMessage::Quit(reason) => write!(f, "QUIT {reason}"),
            ServerMessage::Finished(winners) => {
                f.write_str("FINISHED")?;
                for id in winners {
                    write!(f, " {id}")?;
                }
                Ok(())
            }
            ServerMessage::Ready(id) => write!(f, "READY {id}"),
            ServerMessage::Kicked => f.write_str("KICKED"),
            ServerMessage::Msg { sender, text } => write!(f, "MSG {sender} {text}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Operator console
// ---------------------------------------------------------------------------

/// A command typed on the server's standard input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Log the connected clients.
    List,
    /// Disconnect the named client.
    Kick(String),
    /// Stop the server.
    Exit,
}

impl FromStr for ConsoleCommand {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let (&command, args) = tokens.split_first().ok_or(ParseError::Empty)?;

        match command {
            "LIST" => {
                expect_arity("LIST", args, 0)?;
                Ok(ConsoleCommand::List)
            }
            "KICK" => {
                expect_arity("KICK", args, 1)?;
                Ok(ConsoleCommand::Kick(args[0].to_string()))
            }
            "EXIT" => {
                expect_arity("EXIT", args, 0)?;
                Ok(ConsoleCommand::Exit)
            }
            other => Err(ParseError::UnknownCommand(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!("READY".parse(), Ok(ClientCommand::Ready));
        assert_eq!("PING".parse(), Ok(ClientCommand::Ping));
        assert_eq!(
            "SETSTART 3 1".parse(),
            Ok(ClientCommand::SetStart { x: 3, y: 1 })
        );
        assert_eq!(
            "PLACERAIL 7 7 SW".parse(),
            Ok(ClientCommand::PlaceRail {
                x: 7,
                y: 7,
                direction: Direction::SouthWest
            })
        );
    }

    #[test]
    fn test_msg_keeps_text() {
        assert_eq!(
            "MSG good   luck all".parse(),
            Ok(ClientCommand::Msg("good   luck all".into()))
        );
        assert!(matches!(
            "MSG".parse::<ClientCommand>(),
            Err(ParseError::WrongArity { command: "MSG", .. })
        ));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!("".parse::<ClientCommand>(), Err(ParseError::Empty));
        assert_eq!("   ".parse::<ClientCommand>(), Err(ParseError::Empty));
        assert_eq!(
            "JUMP 1".parse::<ClientCommand>(),
            Err(ParseError::UnknownCommand("JUMP".into()))
        );
        assert_eq!(
            "READY now".parse::<ClientCommand>(),
            Err(ParseError::WrongArity {
                command: "READY",
                expected: 0,
                got: 1
            })
        );
        assert_eq!(
            "SETSTART 3".parse::<ClientCommand>(),
            Err(ParseError::WrongArity {
                command: "SETSTART",
                expected: 2,
                got: 1
            })
        );
        assert_eq!(
            "SETSTART three 1".parse::<ClientCommand>(),
            Err(ParseError::BadInteger("three".into()))
        );
        assert_eq!(
            "PLACERAIL 1 2 N".parse::<ClientCommand>(),
            Err(ParseError::BadDirection("N".into()))
        );
        // keywords are case-sensitive
        assert!("ready".parse::<ClientCommand>().is_err());
    }

    #[test]
    fn test_negative_coordinates_parse() {
        // range is the rules engine's concern
        assert_eq!(
            "SETSTART -1 40".parse(),
            Ok(ClientCommand::SetStart { x: -1, y: 40 })
        );
    }

    #[test]
    fn test_encode_roster_messages() {
        let roster = vec![(PlayerId(1), "ada".to_string()), (PlayerId(3), "bo".to_string())];
        assert_eq!(
            ServerMessage::ClientList(roster.clone()).to_string(),
            "CLIST 1 ada 3 bo"
        );
        assert_eq!(ServerMessage::Players(roster).to_string(), "PLAYERS 1 ada 3 bo");
        assert_eq!(ServerMessage::ReadyList(vec![]).to_string(), "RLIST");
    }

    #[test]
    fn test_encode_game_messages() {
        assert_eq!(ServerMessage::Accept.to_string(), "ACCEPT TAOnline");
        assert_eq!(ServerMessage::Ack(PlayerId(4)).to_string(), "ACK 4");
        assert_eq!(
            ServerMessage::PlaceRail {
                player: PlayerId(2),
                x: 5,
                y: 6,
                direction: Direction::NorthWest
            }
            .to_string(),
            "PLACERAIL 2 5 6 NW"
        );
        assert_eq!(
            ServerMessage::Finished(vec![PlayerId(1), PlayerId(2)]).to_string(),
            "FINISHED 1 2"
        );
        assert_eq!(
            ServerMessage::Cities("1 Seattle;Boston;".into()).to_string(),
            "CITIES 1 Seattle;Boston;"
        );
        assert_eq!(
            ServerMessage::Msg {
                sender: "ada".into(),
                text: "hi all".into()
            }
            .to_string(),
            "MSG ada hi all"
        );
    }

    #[test]
    fn test_console_commands() {
        assert_eq!("LIST".parse(), Ok(ConsoleCommand::List));
        assert_eq!("KICK ada".parse(), Ok(ConsoleCommand::Kick("ada".into())));
        assert_eq!("EXIT".parse(), Ok(ConsoleCommand::Exit));
        assert!("KICK".parse::<ConsoleCommand>().is_err());
        assert!("SHUTDOWN".parse::<ConsoleCommand>().is_err());
    }
}
