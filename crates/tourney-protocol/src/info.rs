//! Search telemetry parsed from engine `info` lines.

/// Information extracted from one `info` line during search.
///
/// Only the keys the controller acts on are kept; unknown keys are skipped
/// so engines with exotic output still parse.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchInfo {
    /// Search depth in plies.
    pub depth: Option<u32>,
    /// Selective search depth.
    pub seldepth: Option<u32>,
    /// Nodes searched.
    pub nodes: Option<u64>,
    /// Nodes per second.
    pub nps: Option<u64>,
    /// Time spent searching in milliseconds.
    pub time_ms: Option<u64>,
    /// Centipawn score from the engine's point of view.
    pub score_cp: Option<i32>,
    /// Mate distance, positive when the engine is winning.
    pub score_mate: Option<i32>,
    /// Principal variation in coordinate notation.
    pub pv: Vec<String>,
}

impl SearchInfo {
    /// Parses the body of an `info` line (everything after the `info` token).
    ///
    /// Returns `None` for bodies carrying none of the recognized keys, such
    /// as `info string ...` banners.
    pub fn parse(body: &str) -> Option<Self> {
        let parts: Vec<&str> = body.split_whitespace().collect();
        let mut info = SearchInfo::default();
        let mut any = false;

        let mut i = 0;
        while i < parts.len() {
            match parts[i] {
                "depth" => {
                    i += 1;
                    info.depth = parts.get(i).and_then(|s| s.parse().ok());
                    any |= info.depth.is_some();
                }
                "seldepth" => {
                    i += 1;
                    info.seldepth = parts.get(i).and_then(|s| s.parse().ok());
                }
                "nodes" => {
                    i += 1;
                    info.nodes = parts.get(i).and_then(|s| s.parse().ok());
                    any |= info.nodes.is_some();
                }
                "nps" => {
                    i += 1;
                    info.nps = parts.get(i).and_then(|s| s.parse().ok());
                }
                "time" => {
                    i += 1;
                    info.time_ms = parts.get(i).and_then(|s| s.parse().ok());
                }
                "score" => {
                    i += 1;
                    match parts.get(i) {
                        Some(&"cp") => {
                            i += 1;
                            info.score_cp = parts.get(i).and_then(|s| s.parse().ok());
                        }
                        Some(&"mate") => {
                            i += 1;
                            info.score_mate = parts.get(i).and_then(|s| s.parse().ok());
                        }
                        _ => {}
                    }
                    any |= info.score_cp.is_some() || info.score_mate.is_some();
                }
                "pv" => {
                    info.pv = parts[i + 1..].iter().map(|s| s.to_string()).collect();
                    any |= !info.pv.is_empty();
                    break;
                }
                "string" => return if any { Some(info) } else { None },
                _ => {}
            }
            i += 1;
        }

        any.then_some(info)
    }

    /// Score on the centipawn ledger: `score cp` as-is, `score mate n`
    /// rendered as `±100·n`.
    pub fn ledger_score(&self) -> Option<i32> {
        if let Some(mate) = self.score_mate {
            return Some(mate.saturating_mul(100));
        }
        self.score_cp
    }
}
