//! PGN rendering for stored games.

use crate::adjudicator::Outcome;

/// The Seven Tag Roster. `Result` is derived from the game outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tags {
    pub event: String,
    pub site: String,
    /// `YYYY.MM.DD`, with `??` for unknown parts.
    pub date: String,
    pub round: String,
    pub white: String,
    pub black: String,
}

impl Default for Tags {
    fn default() -> Self {
        Self {
            event: "Casual Game".to_string(),
            site: "?".to_string(),
            date: "????.??.??".to_string(),
            round: "-".to_string(),
            white: "?".to_string(),
            black: "?".to_string(),
        }
    }
}

/// PGN result token: `1-0`, `0-1`, `1/2-1/2` or `*` for an unfinished game.
pub fn result_token(outcome: Option<Outcome>) -> &'static str {
    match outcome {
        Some(Outcome::White) => "1-0",
        Some(Outcome::Black) => "0-1",
        Some(Outcome::Draw) => "1/2-1/2",
        None => "*",
    }
}

/// Render a game played from the standard starting position.
pub fn render(tags: &Tags, sans: &[String], outcome: Option<Outcome>) -> String {
    let result = result_token(outcome);
    let mut out = String::new();
    for (name, value) in [
        ("Event", tags.event.as_str()),
        ("Site", tags.site.as_str()),
        ("Date", tags.date.as_str()),
        ("Round", tags.round.as_str()),
        ("White", tags.white.as_str()),
        ("Black", tags.black.as_str()),
        ("Result", result),
    ] {
        out.push_str(&format!("[{name} \"{}\"]\n", escape(value)));
    }
    out.push('\n');
    out.push_str(&movetext(sans));
    if !sans.is_empty() {
        out.push(' ');
    }
    out.push_str(result);
    out.push('\n');
    out
}

/// Numbered movetext, e.g. `1. e4 e5 2. Nf3`.
pub fn movetext(sans: &[String]) -> String {
    let mut parts = Vec::with_capacity(sans.len() + sans.len() / 2 + 1);
    for (i, san) in sans.iter().enumerate() {
        if i % 2 == 0 {
            parts.push(format!("{}.", i / 2 + 1));
        }
        parts.push(san.clone());
    }
    parts.join(" ")
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sans(moves: &[&str]) -> Vec<String> {
        moves.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn renders_seven_tag_roster() {
        let tags = Tags {
            date: "2026.10.18".into(),
            white: "Alice".into(),
            black: "Bob".into(),
            ..Tags::default()
        };
        let pgn = render(&tags, &sans(&["f3", "e5", "g4", "Qh4#"]), Some(Outcome::Black));
        assert_eq!(
            pgn,
            "[Event \"Casual Game\"]\n\
             [Site \"?\"]\n\
             [Date \"2026.10.18\"]\n\
             [Round \"-\"]\n\
             [White \"Alice\"]\n\
             [Black \"Bob\"]\n\
             [Result \"0-1\"]\n\
             \n\
             1. f3 e5 2. g4 Qh4# 0-1\n"
        );
    }

    #[test]
    fn unfinished_game_without_moves() {
        let pgn = render(&Tags::default(), &[], None);
        assert!(pgn.ends_with("[Result \"*\"]\n\n*\n"));
    }

    #[test]
    fn header_values_are_escaped() {
        let tags = Tags {
            white: "The \"Hammer\"".into(),
            ..Tags::default()
        };
        let pgn = render(&tags, &[], None);
        assert!(pgn.contains(r#"[White "The \"Hammer\""]"#));
    }

    #[test]
    fn movetext_numbers_odd_lengths() {
        assert_eq!(movetext(&sans(&["e4", "e5", "Nf3"])), "1. e4 e5 2. Nf3");
        assert_eq!(movetext(&[]), "");
    }
}
