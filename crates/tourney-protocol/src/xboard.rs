//! xboard (CECP) wire format.
//!
//! The controller plays the GUI role of protocol version 2: it greets with
//! `xboard` + `protover 2`, collects the engine's `feature` declarations,
//! answers each with `accepted`/`rejected`, and then drives the game with
//! `new`/`force`/`setboard`/`usermove`/`go`. Moves come back as plain
//! `move <m>` lines. Engines that do not declare `ping=1` get no
//! synchronization pings and are treated as caught-up after each write.

use crate::{GoSpec, ProtocolError};

/// Messages an engine sends to the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum XbMessage {
    /// `move <m>` in coordinate notation.
    Move(String),
    /// `pong <n>` replying to an earlier `ping <n>`.
    Pong(u64),
    /// `feature` declarations, in declaration order.
    Features(Vec<Feature>),
    /// The engine resigns the game.
    Resign,
    /// The engine offers a draw.
    OfferDraw,
    /// `Illegal move:` / `Error` complaint from the engine.
    Complaint(String),
    /// Anything else; kept verbatim for the log.
    Unknown(String),
}

/// One `name=value` pair from a `feature` line.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Feature name, e.g. `ping` or `myname`.
    pub name: String,
    /// Declared value.
    pub value: FeatureValue,
}

/// A feature value: quoted features carry strings, the rest integers.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    /// Numeric value, typically 0 or 1.
    Int(i64),
    /// Quoted string value.
    Text(String),
}

impl FeatureValue {
    /// Whether this value is the integer 1.
    pub fn is_on(&self) -> bool {
        matches!(self, FeatureValue::Int(1))
    }
}

/// The feature set the controller cares about, with protocol-v1 defaults.
#[derive(Debug, Clone)]
pub struct FeatureSet {
    /// Moves are sent prefixed with `usermove`.
    pub usermove: bool,
    /// `setboard <fen>` is understood (otherwise only the start position).
    pub setboard: bool,
    /// `ping`/`pong` synchronization is available.
    pub ping: bool,
    /// Engine reuse across games is allowed.
    pub reuse: bool,
    /// Engine announced its name via `myname`.
    pub myname: Option<String>,
    /// The engine finished declaring features (`done=1`).
    pub done: bool,
}

impl Default for FeatureSet {
    fn default() -> Self {
        FeatureSet {
            usermove: false,
            setboard: false,
            ping: false,
            reuse: true,
            myname: None,
            done: false,
        }
    }
}

impl FeatureSet {
    /// Folds one declaration into the set, returning whether the
    /// controller accepts it.
    pub fn apply(&mut self, feature: &Feature) -> bool {
        match feature.name.as_str() {
            "usermove" => {
                self.usermove = feature.value.is_on();
                true
            }
            "setboard" => {
                self.setboard = feature.value.is_on();
                true
            }
            "ping" => {
                self.ping = feature.value.is_on();
                true
            }
            "reuse" => {
                self.reuse = feature.value.is_on();
                true
            }
            "myname" => {
                if let FeatureValue::Text(name) = &feature.value {
                    self.myname = Some(name.clone());
                }
                true
            }
            "done" => {
                self.done = feature.value.is_on();
                true
            }
            "san" => !feature.value.is_on(),
            "sigint" | "sigterm" => true,
            _ => false,
        }
    }
}

/// Splits a `feature` line body into pairs, honoring quoted values.
fn parse_features(body: &str) -> Result<Vec<Feature>, ProtocolError> {
    let malformed = || ProtocolError::Malformed {
        kind: "feature",
        line: body.to_string(),
    };

    let mut features = Vec::new();
    let mut rest = body.trim();
    while !rest.is_empty() {
        let eq = rest.find('=').ok_or_else(malformed)?;
        let name = rest[..eq].trim().to_string();
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(malformed());
        }
        rest = &rest[eq + 1..];

        let value = if let Some(stripped) = rest.strip_prefix('"') {
            let end = stripped.find('"').ok_or_else(malformed)?;
            let text = stripped[..end].to_string();
            rest = stripped[end + 1..].trim_start();
            FeatureValue::Text(text)
        } else {
            let end = rest
                .find(char::is_whitespace)
                .unwrap_or(rest.len());
            let int = rest[..end].parse::<i64>().map_err(|_| malformed())?;
            rest = rest[end..].trim_start();
            FeatureValue::Int(int)
        };

        features.push(Feature { name, value });
    }
    Ok(features)
}

/// Parses one line of engine output.
pub fn parse(line: &str) -> Result<XbMessage, ProtocolError> {
    let line = line.trim();
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };

    match head {
        "move" if !rest.is_empty() => Ok(XbMessage::Move(rest.to_string())),
        "pong" => {
            let n = rest.parse().map_err(|_| ProtocolError::Malformed {
                kind: "pong",
                line: line.to_string(),
            })?;
            Ok(XbMessage::Pong(n))
        }
        "feature" => Ok(XbMessage::Features(parse_features(rest)?)),
        "resign" => Ok(XbMessage::Resign),
        "offer" if rest == "draw" => Ok(XbMessage::OfferDraw),
        "Illegal" | "Error" => Ok(XbMessage::Complaint(line.to_string())),
        _ => Ok(XbMessage::Unknown(line.to_string())),
    }
}

/// `usermove <m>` or the bare move, depending on negotiated features.
pub fn usermove(features: &FeatureSet, mv: &str) -> String {
    if features.usermove {
        format!("usermove {}", mv)
    } else {
        mv.to_string()
    }
}

/// The time-control commands for one game under `spec`.
///
/// `level` wants the base in minutes, or `M:SS` when it does not divide
/// evenly; `st` wants seconds; `sd` plies. Infinite search has no CECP
/// equivalent, so it sends nothing and relies on `?` to move.
pub fn level_commands(spec: &GoSpec) -> Vec<String> {
    match *spec {
        GoSpec::Infinite => Vec::new(),
        GoSpec::Depth(d) => vec![format!("sd {}", d)],
        GoSpec::MoveTime(ms) => vec![format!("st {}", ms.div_ceil(1000))],
        GoSpec::Clock { .. } => Vec::new(),
    }
}

/// `level <moves> <base> <inc>` from a standard control's parameters.
pub fn level(moves: u32, base_sec: u64, inc_sec: u64) -> String {
    let base = if base_sec % 60 == 0 {
        format!("{}", base_sec / 60)
    } else {
        format!("{}:{:02}", base_sec / 60, base_sec % 60)
    };
    format!("level {} {} {}", moves, base, inc_sec)
}

/// `time <cs>` / `otim <cs>` clock updates, in centiseconds.
pub fn clock_update(own_ms: u64, opponent_ms: u64) -> Vec<String> {
    vec![
        format!("time {}", own_ms / 10),
        format!("otim {}", opponent_ms / 10),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_move_line() {
        assert_eq!(
            parse("move e2e4").unwrap(),
            XbMessage::Move("e2e4".to_string())
        );
        assert_eq!(
            parse("move e7e8q").unwrap(),
            XbMessage::Move("e7e8q".to_string())
        );
    }

    #[test]
    fn parse_pong() {
        assert_eq!(parse("pong 7").unwrap(), XbMessage::Pong(7));
        assert!(parse("pong seven").is_err());
    }

    #[test]
    fn parse_feature_line() {
        let msg =
            parse(r#"feature usermove=1 setboard=1 ping=1 myname="Crafty 25.2" done=1"#).unwrap();
        let XbMessage::Features(features) = msg else {
            panic!("expected features");
        };
        assert_eq!(features.len(), 5);
        assert_eq!(features[0].name, "usermove");
        assert!(features[0].value.is_on());
        assert_eq!(
            features[3].value,
            FeatureValue::Text("Crafty 25.2".to_string())
        );

        let mut set = FeatureSet::default();
        for f in &features {
            set.apply(f);
        }
        assert!(set.usermove && set.setboard && set.ping && set.done);
        assert_eq!(set.myname.as_deref(), Some("Crafty 25.2"));
    }

    #[test]
    fn san_feature_is_rejected() {
        let mut set = FeatureSet::default();
        assert!(!set.apply(&Feature {
            name: "san".to_string(),
            value: FeatureValue::Int(1),
        }));
        assert!(set.apply(&Feature {
            name: "san".to_string(),
            value: FeatureValue::Int(0),
        }));
    }

    #[test]
    fn unterminated_quote_is_malformed() {
        assert!(parse(r#"feature myname="Broken"#).is_err());
    }

    #[test]
    fn usermove_respects_feature() {
        let mut features = FeatureSet::default();
        assert_eq!(usermove(&features, "e2e4"), "e2e4");
        features.usermove = true;
        assert_eq!(usermove(&features, "e2e4"), "usermove e2e4");
    }

    #[test]
    fn level_rendering() {
        assert_eq!(level(40, 300, 0), "level 40 5 0");
        assert_eq!(level(0, 90, 2), "level 0 1:30 2");
    }

    #[test]
    fn level_commands_by_mode() {
        assert_eq!(level_commands(&GoSpec::Depth(9)), vec!["sd 9"]);
        assert_eq!(level_commands(&GoSpec::MoveTime(1500)), vec!["st 2"]);
        assert!(level_commands(&GoSpec::Infinite).is_empty());
    }

    #[test]
    fn clock_update_is_centiseconds() {
        assert_eq!(clock_update(61230, 45000), vec!["time 6123", "otim 4500"]);
    }
}
