//! PGN reading, re-serialization, and FIDE id filtering.
//!
//! Games are read with a [`pgn_reader::Visitor`] that keeps the tag pairs
//! and rebuilds the movetext (move numbers, SAN, NAGs, comments, and
//! variations). Header values are kept in their raw escaped form, so a game
//! written back out reads the same tags again.

use std::fmt::Write as _;

use pgn_reader::{BufferedReader, Nag, Outcome, RawComment, RawHeader, SanPlus, Skip, Visitor};

use crate::error::PgnError;

/// Result marker of a game still in progress.
pub const ONGOING_RESULT: &str = "*";

/// One game: tag pairs in source order plus movetext and result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PgnGame {
    headers: Vec<(String, String)>,
    movetext: String,
    result: String,
}

impl PgnGame {
    /// Value of the first tag named `key`.
    #[must_use]
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    /// Tag pairs in source order.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Movetext without the result marker.
    #[must_use]
    pub fn movetext(&self) -> &str {
        &self.movetext
    }

    /// Result marker closing the movetext.
    #[must_use]
    pub fn result(&self) -> &str {
        &self.result
    }

    /// `true` when the `Result` tag is missing or `*`.
    #[must_use]
    pub fn is_ongoing(&self) -> bool {
        self.header("Result")
            .is_none_or(|result| result.trim() == ONGOING_RESULT)
    }

    fn fide_id(&self, key: &str) -> Option<u64> {
        self.header(key)?.trim().parse().ok()
    }

    /// Render the game as PGN text without a trailing newline.
    #[must_use]
    pub fn to_pgn(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.headers {
            let _ = writeln!(out, "[{key} \"{value}\"]");
        }
        if !self.headers.is_empty() {
            out.push('\n');
        }
        if !self.movetext.is_empty() {
            out.push_str(&self.movetext);
            out.push(' ');
        }
        out.push_str(&self.result);
        out
    }
}

/// Read every game in `text`.
///
/// # Errors
///
/// Returns [`PgnError::Read`] when the reader fails.
pub fn parse_games(text: &str) -> Result<Vec<PgnGame>, PgnError> {
    let mut reader = BufferedReader::new_cursor(text.as_bytes());
    let mut visitor = GameCollector::default();
    let mut games = Vec::new();
    while let Some(game) = reader
        .read_game(&mut visitor)
        .map_err(|source| PgnError::Read { source })?
    {
        if !game.headers.is_empty() || !game.movetext.is_empty() {
            games.push(game);
        }
    }
    Ok(games)
}

/// Join games into one PGN document, separated by blank lines.
#[must_use]
pub fn write_games(games: &[PgnGame]) -> String {
    games
        .iter()
        .map(PgnGame::to_pgn)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Values of every `GameId` tag, in game order.
#[must_use]
pub fn game_ids(games: &[PgnGame]) -> Vec<String> {
    games
        .iter()
        .filter_map(|game| game.header("GameId"))
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// Keep games played by the given FIDE ids.
///
/// With a single id, a game matches when either player carries it. With more,
/// ids are read as (white, black) pairs and a game matches a pair in either
/// orientation; a trailing unpaired id is ignored. With `first_ongoing`,
/// unfinished games move ahead of finished ones, keeping relative order.
#[must_use]
pub fn filter_by_fide_ids(games: Vec<PgnGame>, ids: &[u64], first_ongoing: bool) -> Vec<PgnGame> {
    let mut matched: Vec<PgnGame> = games
        .into_iter()
        .filter(|game| {
            let white = game.fide_id("WhiteFideId");
            let black = game.fide_id("BlackFideId");
            match ids {
                [] => false,
                [single] => white == Some(*single) || black == Some(*single),
                pairs => pairs.chunks_exact(2).any(|pair| {
                    let (first, second) = (Some(pair[0]), Some(pair[1]));
                    (white == first && black == second) || (white == second && black == first)
                }),
            }
        })
        .collect();
    if first_ongoing {
        matched.sort_by_key(|game| !game.is_ongoing());
    }
    matched
}

#[derive(Default)]
struct GameCollector {
    game: PgnGame,
    ply: u32,
    ply_stack: Vec<u32>,
    force_number: bool,
}

impl GameCollector {
    fn push_token(&mut self, token: &str) {
        let movetext = &mut self.game.movetext;
        if !movetext.is_empty() && !movetext.ends_with('(') && token != ")" {
            movetext.push(' ');
        }
        movetext.push_str(token);
    }

    fn starting_ply(&self) -> u32 {
        let Some(fen) = self.game.header("FEN") else {
            return 0;
        };
        let fields: Vec<&str> = fen.split_whitespace().collect();
        let black_to_move = fields.get(1) == Some(&"b");
        let fullmove = fields
            .get(5)
            .and_then(|field| field.parse::<u32>().ok())
            .unwrap_or(1)
            .max(1);
        (fullmove - 1) * 2 + u32::from(black_to_move)
    }
}

impl Visitor for GameCollector {
    type Result = PgnGame;

    fn begin_game(&mut self) {
        self.game = PgnGame::default();
        self.ply = 0;
        self.ply_stack.clear();
        self.force_number = true;
    }

    fn header(&mut self, key: &[u8], value: RawHeader<'_>) {
        self.game.headers.push((
            String::from_utf8_lossy(key).into_owned(),
            String::from_utf8_lossy(value.as_bytes()).into_owned(),
        ));
    }

    fn end_headers(&mut self) -> Skip {
        self.ply = self.starting_ply();
        Skip(false)
    }

    fn san(&mut self, san_plus: SanPlus) {
        let number = self.ply / 2 + 1;
        if self.ply % 2 == 0 {
            self.push_token(&format!("{number}."));
        } else if self.force_number {
            self.push_token(&format!("{number}..."));
        }
        self.push_token(&san_plus.to_string());
        self.ply += 1;
        self.force_number = false;
    }

    fn nag(&mut self, nag: Nag) {
        self.push_token(&format!("${}", nag.0));
    }

    fn comment(&mut self, comment: RawComment<'_>) {
        let text = String::from_utf8_lossy(comment.as_bytes());
        self.push_token(&format!("{{{}}}", text.trim()));
        self.force_number = true;
    }

    fn begin_variation(&mut self) -> Skip {
        self.push_token("(");
        self.ply_stack.push(self.ply);
        self.ply = self.ply.saturating_sub(1);
        self.force_number = true;
        Skip(false)
    }

    fn end_variation(&mut self) {
        self.push_token(")");
        if let Some(ply) = self.ply_stack.pop() {
            self.ply = ply;
        }
        self.force_number = true;
    }

    fn outcome(&mut self, outcome: Option<Outcome>) {
        self.game.result = outcome.map_or_else(|| ONGOING_RESULT.to_string(), |o| o.to_string());
    }

    fn end_game(&mut self) -> Self::Result {
        let mut game = std::mem::take(&mut self.game);
        if game.result.is_empty() {
            game.result = game
                .header("Result")
                .map_or(ONGOING_RESULT, str::trim)
                .to_string();
        }
        game
    }
}
