use crate::{
    constants::{NUM_BOARDS, NUM_FILES, NUM_PIECE_SETS, NUM_RANKS},
    types::{BitBoard, Move, MoveFlag, Piece, Square},
};

/// A layout of pieces on the board: one bitboard per label, plus a square
/// set per specific piece for fast iteration. The square sets always mirror
/// the bit positions of the corresponding boards.
#[derive(Clone, Debug)]
pub struct Position {
    boards: [BitBoard; NUM_BOARDS],
    piece_sets: [Vec<Square>; NUM_PIECE_SETS],
}

/// The boards are the whole identity; the square sets only mirror them.
impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        self.boards == other.boards
    }
}

impl Eq for Position {}

impl Position {
    pub fn empty() -> Self {
        Self {
            boards: [BitBoard(0); NUM_BOARDS],
            piece_sets: std::array::from_fn(|_| Vec::new()),
        }
    }

    /// Parse the board portion of a FEN string (rank 8 first, '/'-separated)
    pub fn from_fen_board(board: &str) -> Result<Self, String> {
        let mut position = Position::empty();
        let ranks: Vec<&str> = board.split('/').collect();

        if ranks.len() != NUM_RANKS {
            return Err(format!(
                "Invalid FEN board: expected 8 ranks, found {}",
                ranks.len()
            ));
        }

        for (i, rank) in ranks.iter().enumerate() {
            let rank_index = 7 - i as u8;
            let mut file = 0u8;

            for letter in rank.chars() {
                if let Some(count) = letter.to_digit(10) {
                    file += count as u8;
                    continue;
                }

                if file >= NUM_FILES as u8 {
                    return Err(format!("Invalid FEN board: rank '{}' is too long", rank));
                }

                let piece = Piece::from_fen_char(letter)?;
                let square = Square::try_from(rank_index * 8 + file)
                    .expect("rank and file were range-checked");

                position.place_piece(square, piece);
                file += 1;
            }

            if file != NUM_FILES as u8 {
                return Err(format!(
                    "Invalid FEN board: rank '{}' covers {} files",
                    rank, file
                ));
            }
        }

        Ok(position)
    }

    /// Put a piece on a square. The caller must ensure the square is empty.
    pub fn place_piece(&mut self, square: Square, piece: Piece) {
        self.boards[piece as usize].set_bit(square);
        self.boards[Piece::all_for(piece.is_white()) as usize].set_bit(square);
        self.boards[Piece::BothAll as usize].set_bit(square);

        if (piece as usize) < NUM_PIECE_SETS {
            self.piece_sets[piece as usize].push(square);
        }
    }

    /// Remove a piece from a square. A no-op if the piece is not there, but
    /// callers must only remove the piece they know is present: removing a
    /// label while a different piece occupies the square corrupts the boards.
    pub fn remove_piece(&mut self, square: Square, piece: Piece) {
        self.boards[piece as usize].clear_bit(square);
        self.boards[Piece::WhiteAll as usize].clear_bit(square);
        self.boards[Piece::BlackAll as usize].clear_bit(square);
        self.boards[Piece::BothAll as usize].clear_bit(square);

        if (piece as usize) < NUM_PIECE_SETS {
            let set = &mut self.piece_sets[piece as usize];
            if let Some(index) = set.iter().position(|&s| s == square) {
                set.swap_remove(index);
            }
        }
    }

    #[inline]
    pub fn piece_at(&self, square: Square, piece: Piece) -> bool {
        self.boards[piece as usize].is_bit_set(square)
    }

    #[inline]
    pub fn get_board(&self, piece: Piece) -> BitBoard {
        self.boards[piece as usize]
    }

    /// The occupied squares of a specific piece
    #[inline]
    pub fn find_piece(&self, piece: Piece) -> &[Square] {
        &self.piece_sets[piece as usize]
    }

    /// The specific piece standing on a square, if any
    pub fn colored_piece_at(&self, square: Square) -> Option<Piece> {
        if !self.boards[Piece::BothAll as usize].is_bit_set(square) {
            return None;
        }

        Piece::specific_iter().find(|&piece| self.piece_at(square, piece))
    }

    /// The boards array, used as the repetition key
    pub fn board_key(&self) -> [u64; NUM_BOARDS] {
        std::array::from_fn(|i| self.boards[i].0)
    }

    /// Apply a move to the boards: capture removal first (one rank behind
    /// the destination for en passant), then the mover, then the promotion
    /// piece or the mover itself, then the rook relocation for castling.
    pub fn make_move(&mut self, m: Move) {
        if m.is_capture() {
            let captured_square = if m.flag == MoveFlag::CaptureEnPassant {
                let offset = if m.piece.is_white() { -8 } else { 8 };
                Square::try_from(m.to as i32 + offset)
                    .expect("en passant capture squares are always on the board")
            } else {
                m.to
            };

            for index in 0..NUM_PIECE_SETS as u8 {
                let piece = Piece::try_from(index).expect("piece set indices are in range");
                self.remove_piece(captured_square, piece);
            }
        }

        self.remove_piece(m.from, m.piece);

        if let Some(kind) = m.flag.promotion_kind() {
            self.place_piece(m.to, Piece::of_kind(kind, m.piece.is_white()));
        } else {
            self.place_piece(m.to, m.piece);
        }

        match m.flag {
            MoveFlag::KingCastle => {
                if m.piece.is_white() {
                    self.remove_piece(Square::H1, Piece::WhiteRook);
                    self.place_piece(Square::F1, Piece::WhiteRook);
                } else {
                    self.remove_piece(Square::H8, Piece::BlackRook);
                    self.place_piece(Square::F8, Piece::BlackRook);
                }
            }
            MoveFlag::QueenCastle => {
                if m.piece.is_white() {
                    self.remove_piece(Square::A1, Piece::WhiteRook);
                    self.place_piece(Square::D1, Piece::WhiteRook);
                } else {
                    self.remove_piece(Square::A8, Piece::BlackRook);
                    self.place_piece(Square::D8, Piece::BlackRook);
                }
            }
            _ => {}
        }
    }

    /// Produce the board portion of a FEN string
    pub fn fen_board(&self) -> String {
        let mut result = String::new();

        for rank in (0..NUM_RANKS as u8).rev() {
            let mut empty_counter = 0;

            for file in 0..NUM_FILES as u8 {
                let square =
                    Square::try_from(rank * 8 + file).expect("rank and file are in range");

                match self.colored_piece_at(square) {
                    Some(piece) => {
                        if empty_counter > 0 {
                            result.push_str(&empty_counter.to_string());
                            empty_counter = 0;
                        }
                        result.push(piece.to_fen_char().expect("specific pieces have letters"));
                    }
                    None => empty_counter += 1,
                }
            }

            if empty_counter > 0 {
                result.push_str(&empty_counter.to_string());
            }

            if rank > 0 {
                result.push('/');
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_position() -> Position {
        let mut p = Position::empty();
        p.place_piece(Square::A1, Piece::WhiteRook);
        p.place_piece(Square::B1, Piece::WhiteKnight);
        p.place_piece(Square::C1, Piece::WhiteBishop);
        p.place_piece(Square::D1, Piece::WhiteQueen);
        p.place_piece(Square::E1, Piece::WhiteKing);
        p.place_piece(Square::A2, Piece::WhitePawn);
        p.place_piece(Square::H8, Piece::BlackRook);
        p.place_piece(Square::G8, Piece::BlackKnight);
        p.place_piece(Square::F8, Piece::BlackBishop);
        p.place_piece(Square::E8, Piece::BlackKing);
        p.place_piece(Square::D8, Piece::BlackQueen);
        p.place_piece(Square::H7, Piece::BlackPawn);
        p
    }

    #[test]
    fn placed_pieces_show_in_fen() {
        let mut p = small_position();
        assert_eq!(p.fen_board(), "3qkbnr/7p/8/8/8/8/P7/RNBQK3");

        p.place_piece(Square::H1, Piece::WhiteRook);
        p.place_piece(Square::A8, Piece::BlackRook);
        p.place_piece(Square::E4, Piece::WhitePawn);
        assert_eq!(p.fen_board(), "r2qkbnr/7p/8/8/4P3/8/P7/RNBQK2R");
    }

    #[test]
    fn removed_pieces_disappear() {
        let mut p = small_position();
        p.remove_piece(Square::A1, Piece::WhiteRook);
        p.remove_piece(Square::A2, Piece::WhitePawn);
        assert_eq!(p.fen_board(), "3qkbnr/7p/8/8/8/8/8/1NBQK3");
    }

    #[test]
    fn removing_absent_pieces_is_a_no_op() {
        let mut p = small_position();
        p.remove_piece(Square::E4, Piece::WhitePawn);
        p.remove_piece(Square::A1, Piece::WhiteBishop);
        assert_eq!(p.fen_board(), "3qkbnr/7p/8/8/8/8/P7/RNBQK3");
    }

    #[test]
    fn piece_occupation_queries() {
        let p = small_position();
        assert!(p.piece_at(Square::A1, Piece::WhiteRook));
        assert!(p.piece_at(Square::H7, Piece::BlackPawn));
        assert!(!p.piece_at(Square::E4, Piece::WhitePawn));
        assert!(!p.piece_at(Square::A1, Piece::WhitePawn));
    }

    #[test]
    fn aggregates_are_the_union_of_their_pieces() {
        let p = Position::from_fen_board("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR").unwrap();

        let mut white = 0u64;
        let mut black = 0u64;

        for piece in Piece::specific_iter() {
            if piece.is_white() {
                white |= p.get_board(piece).0;
            } else {
                black |= p.get_board(piece).0;
            }
        }

        assert_eq!(p.get_board(Piece::WhiteAll).0, white);
        assert_eq!(p.get_board(Piece::BlackAll).0, black);
        assert_eq!(p.get_board(Piece::BothAll).0, white | black);
    }

    #[test]
    fn piece_sets_mirror_the_boards() {
        let mut p = Position::from_fen_board("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR").unwrap();

        p.make_move(Move::new(
            Square::E2,
            Square::E4,
            Piece::WhitePawn,
            MoveFlag::PawnDouble,
        ));

        for piece in Piece::specific_iter() {
            let mut from_set: Vec<Square> = p.find_piece(piece).to_vec();
            from_set.sort();

            let from_board: Vec<Square> = p.get_board(piece).squares().collect();
            assert_eq!(from_set, from_board, "mismatch for {:?}", piece);
        }
    }

    #[test]
    fn fen_board_round_trip() {
        let boards = [
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR",
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8",
        ];

        for board in boards {
            let position = Position::from_fen_board(board).unwrap();
            assert_eq!(position.fen_board(), board);
        }
    }

    #[test]
    fn en_passant_capture_removes_the_bypassed_pawn() {
        let mut p = Position::from_fen_board("k7/8/8/3Pp3/8/8/8/7K").unwrap();

        p.make_move(Move::new(
            Square::D5,
            Square::E6,
            Piece::WhitePawn,
            MoveFlag::CaptureEnPassant,
        ));

        assert_eq!(p.fen_board(), "k7/8/4P3/8/8/8/8/7K");
    }

    #[test]
    fn castling_relocates_the_rook() {
        let mut p = Position::from_fen_board("r3k2r/8/8/8/8/8/8/R3K2R").unwrap();

        p.make_move(Move::new(
            Square::E1,
            Square::G1,
            Piece::WhiteKing,
            MoveFlag::KingCastle,
        ));
        assert_eq!(p.fen_board(), "r3k2r/8/8/8/8/8/8/R4RK1");

        p.make_move(Move::new(
            Square::E8,
            Square::C8,
            Piece::BlackKing,
            MoveFlag::QueenCastle,
        ));
        assert_eq!(p.fen_board(), "2kr3r/8/8/8/8/8/8/R4RK1");
    }
}
