use std::collections::HashMap;

use crate::{
    constants::{NUM_BOARDS, START_FEN},
    movegen::generate_moves,
    position::Position,
    types::{BitBoard, CastlingRights, Move, MoveFlag, Piece, PieceKind, Square},
};

/// Everything needed to restore the state before a move
#[derive(Clone, Debug)]
struct Snapshot {
    position: Position,
    white_to_move: bool,
    castling: CastlingRights,
    en_passant: Option<Square>,
    halfmove_clock: u32,
    fullmove_number: u32,
}

/// The full state of a game: the board position, the side to move, castling
/// rights, the en-passant target, the clocks, a repetition count per seen
/// position, and the undo history.
#[derive(Clone, Debug)]
pub struct GameState {
    position: Position,
    white_to_move: bool,
    castling: CastlingRights,
    en_passant: Option<Square>,
    halfmove_clock: u32,
    fullmove_number: u32,
    repeats: HashMap<[u64; NUM_BOARDS], u32>,
    history: Vec<Snapshot>,
}

impl Default for GameState {
    fn default() -> Self {
        GameState::from_fen(START_FEN).expect("the start position FEN is valid")
    }
}

impl GameState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a full six-field FEN string
    pub fn from_fen(fen: &str) -> Result<Self, String> {
        let fields: Vec<&str> = fen.split_whitespace().collect();

        if fields.len() != 6 {
            return Err(format!(
                "Invalid FEN: expected 6 fields, found {}",
                fields.len()
            ));
        }

        let position = Position::from_fen_board(fields[0])?;

        let white_to_move = match fields[1] {
            "w" => true,
            "b" => false,
            other => return Err(format!("Invalid FEN side to move: '{}'", other)),
        };

        let mut castling = CastlingRights::none();
        if fields[2] != "-" {
            for letter in fields[2].chars() {
                match letter {
                    'K' => castling.white_kingside = true,
                    'Q' => castling.white_queenside = true,
                    'k' => castling.black_kingside = true,
                    'q' => castling.black_queenside = true,
                    other => {
                        return Err(format!("Invalid FEN castling rights: '{}'", other));
                    }
                }
            }
        }

        let en_passant = match fields[3] {
            "-" => None,
            algebraic => Some(Square::from_algebraic(algebraic)?),
        };

        let halfmove_clock = fields[4]
            .parse::<u32>()
            .map_err(|_| format!("Invalid FEN halfmove clock: '{}'", fields[4]))?;

        let fullmove_number = fields[5]
            .parse::<u32>()
            .map_err(|_| format!("Invalid FEN fullmove number: '{}'", fields[5]))?;

        Ok(Self::from_parts(
            position,
            white_to_move,
            castling,
            en_passant,
            halfmove_clock,
            fullmove_number,
        ))
    }

    /// Fully explicit constructor
    pub fn from_parts(
        position: Position,
        white_to_move: bool,
        castling: CastlingRights,
        en_passant: Option<Square>,
        halfmove_clock: u32,
        fullmove_number: u32,
    ) -> Self {
        Self {
            position,
            white_to_move,
            castling,
            en_passant,
            halfmove_clock,
            fullmove_number,
            repeats: HashMap::new(),
            history: Vec::new(),
        }
    }

    #[inline]
    pub fn whites_move(&self) -> bool {
        self.white_to_move
    }

    #[inline]
    pub fn position(&self) -> &Position {
        &self.position
    }

    #[inline]
    pub fn castling(&self) -> CastlingRights {
        self.castling
    }

    #[inline]
    pub fn en_passant(&self) -> Option<Square> {
        self.en_passant
    }

    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    pub fn fullmove_number(&self) -> u32 {
        self.fullmove_number
    }

    /// How many times the current position has occurred since the initial one
    pub fn repetition_count(&self) -> u32 {
        *self.repeats.get(&self.position.board_key()).unwrap_or(&0)
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Apply a move: snapshot, board mutation, castling rights, en-passant
    /// target, clocks, repetition count, side to move.
    pub fn make_move(&mut self, m: Move) {
        self.history.push(Snapshot {
            position: self.position.clone(),
            white_to_move: self.white_to_move,
            castling: self.castling,
            en_passant: self.en_passant,
            halfmove_clock: self.halfmove_clock,
            fullmove_number: self.fullmove_number,
        });

        self.position.make_move(m);

        self.update_castling_rights(m);

        // The en-passant target only survives for the reply to a double push
        self.en_passant = if m.flag == MoveFlag::PawnDouble {
            let offset = if m.piece.is_white() { -8 } else { 8 };
            Some(
                Square::try_from(m.to as i32 + offset)
                    .expect("the square behind a double push is on the board"),
            )
        } else {
            None
        };

        if m.piece.kind() == Some(PieceKind::Pawn) || m.is_capture() {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock += 1;
        }

        if !self.white_to_move {
            self.fullmove_number += 1;
        }

        *self.repeats.entry(self.position.board_key()).or_insert(0) += 1;

        self.white_to_move = !self.white_to_move;
    }

    fn update_castling_rights(&mut self, m: Move) {
        match m.piece {
            Piece::WhiteKing => {
                self.castling.white_kingside = false;
                self.castling.white_queenside = false;
            }
            Piece::BlackKing => {
                self.castling.black_kingside = false;
                self.castling.black_queenside = false;
            }
            Piece::WhiteRook => match m.from {
                Square::A1 => self.castling.white_queenside = false,
                Square::H1 => self.castling.white_kingside = false,
                _ => {}
            },
            Piece::BlackRook => match m.from {
                Square::A8 => self.castling.black_queenside = false,
                Square::H8 => self.castling.black_kingside = false,
                _ => {}
            },
            _ => {}
        }

        // A capture landing on a home corner takes the victim's right with it
        if m.is_capture() {
            match m.to {
                Square::A1 => self.castling.white_queenside = false,
                Square::H1 => self.castling.white_kingside = false,
                Square::A8 => self.castling.black_queenside = false,
                Square::H8 => self.castling.black_kingside = false,
                _ => {}
            }
        }
    }

    /// Take back the last move. The repetition count of the current position
    /// is decremented before the snapshot is restored, so no stale entry is
    /// left behind.
    pub fn undo_move(&mut self) {
        let Some(snapshot) = self.history.pop() else {
            return;
        };

        let key = self.position.board_key();
        if let Some(count) = self.repeats.get_mut(&key) {
            *count -= 1;
            if *count == 0 {
                self.repeats.remove(&key);
            }
        }

        self.position = snapshot.position;
        self.white_to_move = snapshot.white_to_move;
        self.castling = snapshot.castling;
        self.en_passant = snapshot.en_passant;
        self.halfmove_clock = snapshot.halfmove_clock;
        self.fullmove_number = snapshot.fullmove_number;
    }

    /// Toggle the side to move without touching anything else. Used by the
    /// evaluator to measure the opponent's mobility; never enters the
    /// undo history.
    pub fn flip_move(&mut self) {
        self.white_to_move = !self.white_to_move;
    }

    /// The squares that must not be attacked for the side to move to castle
    /// kingside, including the king's starting square. Zero without the right.
    pub fn castle_through_kingside(&self) -> BitBoard {
        if self.white_to_move && self.castling.white_kingside {
            BitBoard(Square::E1.as_bit() | Square::F1.as_bit() | Square::G1.as_bit())
        } else if !self.white_to_move && self.castling.black_kingside {
            BitBoard(Square::E8.as_bit() | Square::F8.as_bit() | Square::G8.as_bit())
        } else {
            BitBoard(0)
        }
    }

    /// Queenside counterpart of `castle_through_kingside`. The b-file square
    /// is not part of the mask; it must be empty but may be attacked.
    pub fn castle_through_queenside(&self) -> BitBoard {
        if self.white_to_move && self.castling.white_queenside {
            BitBoard(Square::C1.as_bit() | Square::D1.as_bit() | Square::E1.as_bit())
        } else if !self.white_to_move && self.castling.black_queenside {
            BitBoard(Square::C8.as_bit() | Square::D8.as_bit() | Square::E8.as_bit())
        } else {
            BitBoard(0)
        }
    }

    /// Resolve a UCI move string like "e2e4" or "e7e8q" against the legal
    /// moves of the current state, recovering the full flag from context.
    pub fn convert_move(&self, move_str: &str) -> Result<Move, String> {
        if move_str.len() < 4 || move_str.len() > 5 {
            return Err(format!("Invalid move string length: {}", move_str));
        }

        let from = Square::from_algebraic(&move_str[0..2])
            .map_err(|e| format!("Invalid from square: {}", e))?;
        let to = Square::from_algebraic(&move_str[2..4])
            .map_err(|e| format!("Invalid to square: {}", e))?;

        let promote = match move_str.chars().nth(4) {
            None => None,
            Some('q') => Some(PieceKind::Queen),
            Some('r') => Some(PieceKind::Rook),
            Some('b') => Some(PieceKind::Bishop),
            Some('n') => Some(PieceKind::Knight),
            Some(other) => return Err(format!("Invalid promotion piece: {}", other)),
        };

        generate_moves(self)
            .into_iter()
            .find(|m| m.from == from && m.to == to && m.flag.promotion_kind() == promote)
            .ok_or_else(|| format!("Illegal move: {}", move_str))
    }

    /// Serialize the whole state to FEN
    pub fn fen_string(&self) -> String {
        let mut castle = String::new();
        if self.castling.white_kingside {
            castle.push('K');
        }
        if self.castling.white_queenside {
            castle.push('Q');
        }
        if self.castling.black_kingside {
            castle.push('k');
        }
        if self.castling.black_queenside {
            castle.push('q');
        }
        if castle.is_empty() {
            castle.push('-');
        }

        let en_passant = match self.en_passant {
            Some(square) => square.to_algebraic(),
            None => "-".to_string(),
        };

        format!(
            "{} {} {} {} {} {}",
            self.position.fen_board(),
            if self.white_to_move { "w" } else { "b" },
            castle,
            en_passant,
            self.halfmove_clock,
            self.fullmove_number,
        )
    }
}

impl std::fmt::Display for GameState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.fen_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_round_trips_to_the_start_fen() {
        let gs = GameState::new();
        assert_eq!(gs.fen_string(), START_FEN);
        assert!(gs.whites_move());
        assert_eq!(gs.fullmove_number(), 1);
    }

    #[test]
    fn fen_round_trips() {
        let fens = [
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
            "k7/8/2p5/3Pp3/8/8/8/7K w - e6 0 1",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
        ];

        for fen in fens {
            let gs = GameState::from_fen(fen).unwrap();
            assert_eq!(gs.fen_string(), fen);
        }
    }

    #[test]
    fn explicit_constructor_round_trips() {
        let position = Position::from_fen_board("r3k2r/8/8/8/8/8/8/R3K2R").unwrap();
        let gs = GameState::from_parts(position, false, CastlingRights::all(), None, 3, 17);

        assert_eq!(gs.fen_string(), "r3k2r/8/8/8/8/8/8/R3K2R b KQkq - 3 17");
    }

    #[test]
    fn rejects_malformed_fens() {
        assert!(GameState::from_fen("invalid fen string").is_err());
        assert!(GameState::from_fen("8/8/8/8/8/8/8/8 x - - 0 1").is_err());
        assert!(GameState::from_fen("8/8/8/8/8/8/8/9 w - - 0 1").is_err());
        assert!(GameState::from_fen("8/8/8/8/8/8/8/8 w KX - 0 1").is_err());
        assert!(GameState::from_fen("8/8/8/8/8/8/8/8 w - j9 0 1").is_err());
        assert!(GameState::from_fen("8/8/8/8/8/8/8/8 w - - x 1").is_err());
    }

    #[test]
    fn double_push_sets_the_en_passant_target() {
        let mut gs = GameState::new();
        gs.make_move(gs.convert_move("e2e4").unwrap());

        assert_eq!(gs.en_passant(), Some(Square::E3));
        assert!(!gs.whites_move());

        gs.make_move(gs.convert_move("g8f6").unwrap());
        assert_eq!(gs.en_passant(), None);
    }

    #[test]
    fn halfmove_clock_resets_on_pawn_moves_and_captures() {
        let mut gs = GameState::new();

        gs.make_move(gs.convert_move("g1f3").unwrap());
        assert_eq!(gs.halfmove_clock(), 1);

        gs.make_move(gs.convert_move("e7e5").unwrap());
        assert_eq!(gs.halfmove_clock(), 0);

        gs.make_move(gs.convert_move("b1c3").unwrap());
        assert_eq!(gs.halfmove_clock(), 1);

        gs.make_move(gs.convert_move("e5e4").unwrap());
        assert_eq!(gs.halfmove_clock(), 0);

        gs.make_move(gs.convert_move("f3e5").unwrap());
        assert_eq!(gs.halfmove_clock(), 1);

        gs.make_move(gs.convert_move("d7d6").unwrap());
        assert_eq!(gs.halfmove_clock(), 0);

        // A capture resets as well
        gs.make_move(gs.convert_move("e5f7").unwrap());
        assert_eq!(gs.halfmove_clock(), 0);
    }

    #[test]
    fn fullmove_number_increments_after_black() {
        let mut gs = GameState::new();
        assert_eq!(gs.fullmove_number(), 1);

        gs.make_move(gs.convert_move("e2e4").unwrap());
        assert_eq!(gs.fullmove_number(), 1);

        gs.make_move(gs.convert_move("e7e5").unwrap());
        assert_eq!(gs.fullmove_number(), 2);
    }

    #[test]
    fn make_and_undo_restore_the_exact_state() {
        let fens = [
            START_FEN,
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "k7/8/2p5/3Pp3/8/8/8/7K w - e6 0 1",
        ];

        for fen in fens {
            let mut gs = GameState::from_fen(fen).unwrap();
            let before_fen = gs.fen_string();
            let before_repeats = gs.repeats.clone();
            let before_history = gs.history_len();

            for m in generate_moves(&gs) {
                gs.make_move(m);
                assert_ne!(gs.whites_move(), fen.contains(" w "), "side must flip");
                gs.undo_move();

                assert_eq!(gs.fen_string(), before_fen, "undo of {} broke the state", m);
                assert_eq!(gs.repeats, before_repeats);
                assert_eq!(gs.history_len(), before_history);
            }
        }
    }

    #[test]
    fn repetition_counts_track_revisits() {
        let mut gs = GameState::new();
        assert_eq!(gs.repetition_count(), 0);

        for _ in 0..2 {
            gs.make_move(gs.convert_move("g1f3").unwrap());
            gs.make_move(gs.convert_move("g8f6").unwrap());
            gs.make_move(gs.convert_move("f3g1").unwrap());
            gs.make_move(gs.convert_move("f6g8").unwrap());
        }

        // The start position has now been revisited twice
        assert_eq!(gs.repetition_count(), 2);

        gs.undo_move();
        gs.undo_move();
        gs.undo_move();
        gs.undo_move();
        assert_eq!(gs.repetition_count(), 1);
    }

    #[test]
    fn capturing_a_home_corner_rook_clears_the_right() {
        // White bishop can take the h8 rook
        let mut gs =
            GameState::from_fen("r3k2r/8/8/8/8/8/1B6/R3K2R w KQkq - 0 1").unwrap();

        gs.make_move(gs.convert_move("b2h8").unwrap());

        assert!(!gs.castling().black_kingside);
        assert!(gs.castling().black_queenside);
    }

    #[test]
    fn king_and_rook_moves_clear_rights() {
        let mut gs = GameState::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();

        gs.make_move(gs.convert_move("e1e2").unwrap());
        assert!(!gs.castling().white_kingside);
        assert!(!gs.castling().white_queenside);

        gs.make_move(gs.convert_move("a8a7").unwrap());
        assert!(!gs.castling().black_queenside);
        assert!(gs.castling().black_kingside);
    }

    #[test]
    fn convert_move_rejects_illegal_requests() {
        let gs = GameState::new();

        assert!(gs.convert_move("e2e5").is_err());
        assert!(gs.convert_move("e2").is_err());
        assert!(gs.convert_move("i2i4").is_err());
        assert!(gs.convert_move("e7e8x").is_err());

        let m = gs.convert_move("b1c3").unwrap();
        assert_eq!(m.piece, Piece::WhiteKnight);
        assert_eq!(m.flag, MoveFlag::Quiet);
    }

    #[test]
    fn convert_move_recovers_flags_from_context() {
        let gs = GameState::from_fen("k7/8/2p5/3Pp3/8/8/8/7K w - e6 0 1").unwrap();

        assert_eq!(gs.convert_move("d5d6").unwrap().flag, MoveFlag::Quiet);
        assert_eq!(gs.convert_move("d5c6").unwrap().flag, MoveFlag::Capture);
        assert_eq!(
            gs.convert_move("d5e6").unwrap().flag,
            MoveFlag::CaptureEnPassant
        );

        let gs = GameState::from_fen("k7/8/8/8/8/8/1p6/R6K b - - 0 1").unwrap();
        assert_eq!(
            gs.convert_move("b2b1n").unwrap().flag,
            MoveFlag::PromoteKnight
        );
        assert_eq!(
            gs.convert_move("b2a1q").unwrap().flag,
            MoveFlag::PromoteQueenCapture
        );
    }
}
