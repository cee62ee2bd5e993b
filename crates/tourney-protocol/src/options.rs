//! Engine option declarations and overrides.
//!
//! UCI engines announce their options during the handshake with lines like
//! `option name Hash type spin default 16 min 1 max 4096`. The parser here
//! is a small hand-written tokenizer keyed on the literal keywords `name`,
//! `type`, `default`, `min`, `max` and `var`, which copes with option names
//! containing spaces and with `var` lists in any order.

use crate::ProtocolError;

/// The payload of one engine option, by declared type.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionKind {
    /// Boolean toggle.
    Check {
        /// Declared default.
        default: bool,
    },
    /// Integer in an inclusive range.
    Spin {
        /// Declared default.
        default: i64,
        /// Smallest accepted value.
        min: i64,
        /// Largest accepted value.
        max: i64,
    },
    /// One choice from a fixed list.
    Combo {
        /// Declared default, always one of `choices`.
        default: String,
        /// Accepted values.
        choices: Vec<String>,
    },
    /// Stateless action, no value.
    Button,
    /// Free-form text. A declared default of `<empty>` means the empty string.
    Text {
        /// Declared default.
        default: String,
    },
}

/// One option an engine declared, plus any configured override.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOption {
    /// Option name as declared (may contain spaces).
    pub name: String,
    /// Declared type and defaults.
    pub kind: OptionKind,
    /// Configured override, if the tournament config sets one.
    pub value: Option<String>,
}

impl EngineOption {
    /// Whether the configured value differs from the declared default.
    ///
    /// Buttons are never considered overridden; options without a
    /// configured value are at their default by definition.
    pub fn is_overridden(&self) -> bool {
        let Some(value) = &self.value else {
            return false;
        };
        match &self.kind {
            OptionKind::Button => false,
            OptionKind::Check { default } => value != if *default { "true" } else { "false" },
            OptionKind::Spin { default, .. } => value.parse::<i64>() != Ok(*default),
            OptionKind::Combo { default, .. } | OptionKind::Text { default } => value != default,
        }
    }

    /// The value to send to the engine: the override if set, else the default.
    pub fn effective_value(&self) -> String {
        if let Some(v) = &self.value {
            return v.clone();
        }
        match &self.kind {
            OptionKind::Check { default } => default.to_string(),
            OptionKind::Spin { default, .. } => default.to_string(),
            OptionKind::Combo { default, .. } | OptionKind::Text { default } => default.clone(),
            OptionKind::Button => String::new(),
        }
    }
}

/// Keyword boundaries inside an `option` line.
const KEYWORDS: [&str; 6] = ["name", "type", "default", "min", "max", "var"];

/// Splits an option line body into `(keyword, argument)` pairs.
///
/// Tokens that are not keywords are glued onto the current keyword's
/// argument, which is how names like `Debug Log File` survive.
fn keyword_fields(body: &str) -> Vec<(String, String)> {
    let mut fields: Vec<(String, String)> = Vec::new();
    for token in body.split_whitespace() {
        if KEYWORDS.contains(&token) {
            fields.push((token.to_string(), String::new()));
            continue;
        }
        match fields.last_mut() {
            Some((_, arg)) => {
                if !arg.is_empty() {
                    arg.push(' ');
                }
                arg.push_str(token);
            }
            None => return Vec::new(),
        }
    }
    fields
}

/// Parses the body of an `option` line (everything after the `option` token).
pub fn parse_option(body: &str) -> Result<EngineOption, ProtocolError> {
    let malformed = || ProtocolError::Malformed {
        kind: "option",
        line: body.to_string(),
    };

    let fields = keyword_fields(body);
    let field = |key: &str| {
        fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    };

    let name = field("name").filter(|n| !n.is_empty()).ok_or_else(malformed)?;
    let type_name = field("type").ok_or_else(malformed)?;

    let kind = match type_name {
        "button" => OptionKind::Button,
        "check" => OptionKind::Check {
            default: field("default") == Some("true"),
        },
        "string" => {
            let default = match field("default") {
                None | Some("<empty>") => String::new(),
                Some(d) => d.to_string(),
            };
            OptionKind::Text { default }
        }
        "spin" => {
            let number = |key: &str| {
                field(key)
                    .and_then(|v| v.parse::<i64>().ok())
                    .ok_or_else(malformed)
            };
            let (default, min, max) = (number("default")?, number("min")?, number("max")?);
            if min > max || default < min || default > max {
                return Err(malformed());
            }
            OptionKind::Spin { default, min, max }
        }
        "combo" => {
            // The first var-delimited token after `default` names the
            // default; the remaining `var` arguments are the choices.
            let default = field("default").ok_or_else(malformed)?.to_string();
            let choices: Vec<String> = fields
                .iter()
                .filter(|(k, _)| k == "var")
                .map(|(_, v)| v.clone())
                .collect();
            if choices.is_empty() {
                return Err(malformed());
            }
            OptionKind::Combo { default, choices }
        }
        _ => return Err(malformed()),
    };

    Ok(EngineOption {
        name: name.to_string(),
        kind,
        value: None,
    })
}
