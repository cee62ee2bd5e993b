//! UCI wire format: outbound command builders and inbound message parsing.

use crate::info::SearchInfo;
use crate::options::{self, EngineOption};
use crate::{GoSpec, ProtocolError};

/// Messages an engine sends to the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum UciMessage {
    /// `id name <...>` or `id author <...>`.
    Id {
        /// Which identity field this line carries.
        field: IdField,
        /// The field's value.
        value: String,
    },
    /// Handshake complete.
    UciOk,
    /// Synchronization pong.
    ReadyOk,
    /// Declared engine option.
    Option(EngineOption),
    /// Search telemetry.
    Info(SearchInfo),
    /// Terminal event for the current computation.
    BestMove {
        /// Best move in coordinate notation.
        mv: String,
        /// Predicted reply, if the engine suggests one.
        ponder: Option<String>,
    },
    /// `copyprotection` / `registration` status, logged only.
    Status(String),
    /// Anything else; kept verbatim for the log.
    Unknown(String),
}

/// Which field an `id` line carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdField {
    /// `id name`.
    Name,
    /// `id author`.
    Author,
}

/// Parses one line of engine output.
///
/// Unrecognized lines are returned as [`UciMessage::Unknown`] rather than
/// an error; engines routinely print banners the protocol does not cover.
pub fn parse(line: &str) -> Result<UciMessage, ProtocolError> {
    let line = line.trim();
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim_start()),
        None => (line, ""),
    };

    match head {
        "uciok" => Ok(UciMessage::UciOk),
        "readyok" => Ok(UciMessage::ReadyOk),
        "id" => {
            let (field, value) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| ProtocolError::Malformed {
                    kind: "id",
                    line: line.to_string(),
                })?;
            let field = match field {
                "name" => IdField::Name,
                "author" => IdField::Author,
                _ => {
                    return Err(ProtocolError::Malformed {
                        kind: "id",
                        line: line.to_string(),
                    })
                }
            };
            Ok(UciMessage::Id {
                field,
                value: value.trim().to_string(),
            })
        }
        "option" => Ok(UciMessage::Option(options::parse_option(rest)?)),
        "info" => Ok(match SearchInfo::parse(rest) {
            Some(info) => UciMessage::Info(info),
            None => UciMessage::Unknown(line.to_string()),
        }),
        "bestmove" => {
            let mut tokens = rest.split_whitespace();
            let mv = tokens.next().ok_or_else(|| ProtocolError::Malformed {
                kind: "bestmove",
                line: line.to_string(),
            })?;
            let ponder = match (tokens.next(), tokens.next()) {
                (Some("ponder"), Some(p)) => Some(p.to_string()),
                _ => None,
            };
            Ok(UciMessage::BestMove {
                mv: mv.to_string(),
                ponder,
            })
        }
        "copyprotection" | "registration" => Ok(UciMessage::Status(line.to_string())),
        _ => Ok(UciMessage::Unknown(line.to_string())),
    }
}

/// `setoption name <N> value <V>`. Buttons take no value.
pub fn set_option(option: &EngineOption) -> String {
    match option.kind {
        crate::OptionKind::Button => format!("setoption name {}", option.name),
        _ => format!(
            "setoption name {} value {}",
            option.name,
            option.effective_value()
        ),
    }
}

/// `position (startpos | fen <FEN>) [moves m1 m2 ...]`.
///
/// `extra_move` is appended after the history; the ponder launch uses it
/// for the hypothetical opponent move.
pub fn position(start_fen: Option<&str>, moves: &[String], extra_move: Option<&str>) -> String {
    let mut cmd = match start_fen {
        Some(fen) => format!("position fen {}", fen),
        None => "position startpos".to_string(),
    };
    if !moves.is_empty() || extra_move.is_some() {
        cmd.push_str(" moves");
        for mv in moves {
            cmd.push(' ');
            cmd.push_str(mv);
        }
        if let Some(mv) = extra_move {
            cmd.push(' ');
            cmd.push_str(mv);
        }
    }
    cmd
}

/// `go <params>`, with the `ponder` prefix when speculating.
pub fn go(spec: &GoSpec, ponder: bool) -> String {
    let mut cmd = String::from("go ");
    if ponder {
        cmd.push_str("ponder ");
    }
    match *spec {
        GoSpec::Infinite => cmd.push_str("infinite"),
        GoSpec::Depth(d) => cmd.push_str(&format!("depth {}", d)),
        GoSpec::MoveTime(ms) => cmd.push_str(&format!("movetime {}", ms)),
        GoSpec::Clock {
            wtime_ms,
            btime_ms,
            winc_ms,
            binc_ms,
            movestogo,
        } => {
            cmd.push_str(&format!(
                "wtime {} btime {} winc {} binc {}",
                wtime_ms, btime_ms, winc_ms, binc_ms
            ));
            if let Some(n) = movestogo {
                cmd.push_str(&format!(" movestogo {}", n));
            }
        }
    }
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OptionKind;

    #[test]
    fn parse_handshake_lines() {
        assert_eq!(parse("uciok").unwrap(), UciMessage::UciOk);
        assert_eq!(parse("readyok").unwrap(), UciMessage::ReadyOk);
        assert_eq!(
            parse("id name Stockfish 16").unwrap(),
            UciMessage::Id {
                field: IdField::Name,
                value: "Stockfish 16".to_string()
            }
        );
        assert_eq!(
            parse("id author the Stockfish developers").unwrap(),
            UciMessage::Id {
                field: IdField::Author,
                value: "the Stockfish developers".to_string()
            }
        );
    }

    #[test]
    fn parse_bestmove_with_ponder() {
        assert_eq!(
            parse("bestmove e2e4 ponder e7e5").unwrap(),
            UciMessage::BestMove {
                mv: "e2e4".to_string(),
                ponder: Some("e7e5".to_string())
            }
        );
        assert_eq!(
            parse("bestmove a1a8").unwrap(),
            UciMessage::BestMove {
                mv: "a1a8".to_string(),
                ponder: None
            }
        );
    }

    #[test]
    fn parse_option_line() {
        match parse("option name Hash type spin default 16 min 1 max 1024").unwrap() {
            UciMessage::Option(opt) => {
                assert_eq!(opt.name, "Hash");
                assert!(matches!(opt.kind, OptionKind::Spin { default: 16, .. }));
            }
            other => panic!("expected option, got {:?}", other),
        }
    }

    #[test]
    fn info_banner_falls_through_to_unknown() {
        assert!(matches!(
            parse("info string loading network").unwrap(),
            UciMessage::Unknown(_)
        ));
        assert!(matches!(
            parse("info depth 8 score cp 12").unwrap(),
            UciMessage::Info(_)
        ));
    }

    #[test]
    fn copyprotection_is_status_only() {
        assert!(matches!(
            parse("copyprotection checking").unwrap(),
            UciMessage::Status(_)
        ));
        assert!(matches!(
            parse("registration ok").unwrap(),
            UciMessage::Status(_)
        ));
    }

    #[test]
    fn position_rendering() {
        assert_eq!(position(None, &[], None), "position startpos");
        assert_eq!(
            position(None, &["e2e4".to_string(), "e7e5".to_string()], None),
            "position startpos moves e2e4 e7e5"
        );
        assert_eq!(
            position(Some("8/8/8/8/8/8/8/K6k w - - 0 1"), &[], None),
            "position fen 8/8/8/8/8/8/8/K6k w - - 0 1"
        );
        // Ponder launch from the start position still needs a moves clause.
        assert_eq!(
            position(None, &[], Some("e2e4")),
            "position startpos moves e2e4"
        );
    }

    #[test]
    fn go_rendering() {
        assert_eq!(go(&GoSpec::Infinite, false), "go infinite");
        assert_eq!(go(&GoSpec::Depth(12), false), "go depth 12");
        assert_eq!(go(&GoSpec::MoveTime(100), false), "go movetime 100");
        assert_eq!(
            go(
                &GoSpec::Clock {
                    wtime_ms: 60000,
                    btime_ms: 59000,
                    winc_ms: 1000,
                    binc_ms: 1000,
                    movestogo: Some(12),
                },
                false
            ),
            "go wtime 60000 btime 59000 winc 1000 binc 1000 movestogo 12"
        );
        assert_eq!(go(&GoSpec::MoveTime(100), true), "go ponder movetime 100");
    }

    #[test]
    fn setoption_rendering() {
        let mut opt =
            crate::options::parse_option("name Hash type spin default 16 min 1 max 1024").unwrap();
        opt.value = Some("256".to_string());
        assert_eq!(set_option(&opt), "setoption name Hash value 256");

        let button = crate::options::parse_option("name Clear Hash type button").unwrap();
        assert_eq!(set_option(&button), "setoption name Clear Hash");
    }
}
