use crate::{
    attacks::attack_tables,
    gamestate::GameState,
    position::Position,
    types::{BitBoard, Move, MoveFlag, Piece, PieceKind, Square},
};

/// Generate the strictly legal moves for the side to move: pseudo-legal
/// generation per piece, then a filter that applies each move to a copy of
/// the position and rejects it if the mover's king is left attacked.
pub fn generate_moves(gs: &GameState) -> Vec<Move> {
    let mut moves = generate_pseudolegal_moves(gs);

    let white_to_move = gs.whites_move();
    moves.retain(|&m| {
        let mut position = gs.position().clone();
        position.make_move(m);
        !in_check(white_to_move, &position)
    });

    moves
}

/// Whether the given side's king is attacked
pub fn in_check(white_to_move: bool, position: &Position) -> bool {
    let king = Piece::of_kind(PieceKind::King, white_to_move);

    let Some(&king_square) = position.find_piece(king).first() else {
        return false;
    };

    let occupancy = position.get_board(Piece::BothAll).0;
    !get_attacks_to(position, king_square, !white_to_move, occupancy).is_empty()
}

/// A bitboard of the given side's pieces attacking the target square
pub fn get_attacks_to(
    position: &Position,
    target: Square,
    by_white: bool,
    occupancy: u64,
) -> BitBoard {
    let tables = attack_tables();
    let square = target as usize;

    let knights = position.get_board(Piece::of_kind(PieceKind::Knight, by_white));
    let king = position.get_board(Piece::of_kind(PieceKind::King, by_white));
    let rooks = position.get_board(Piece::of_kind(PieceKind::Rook, by_white));
    let bishops = position.get_board(Piece::of_kind(PieceKind::Bishop, by_white));
    let queens = position.get_board(Piece::of_kind(PieceKind::Queen, by_white));

    let mut attackers = tables.knight_moves[square].0 & knights.0;
    attackers |= tables.king_moves[square].0 & king.0;
    attackers |= tables.rook_attacks(target, occupancy).0 & (rooks.0 | queens.0);
    attackers |= tables.bishop_attacks(target, occupancy).0 & (bishops.0 | queens.0);

    // Pawns attack the target from one rank behind it, one file to each side
    let pawn = Piece::of_kind(PieceKind::Pawn, by_white);
    let file = target.file();
    let index = target as i32;

    let candidates = if by_white {
        [(index - 9, file > 0), (index - 7, file < 7)]
    } else {
        [(index + 7, file > 0), (index + 9, file < 7)]
    };

    for (pawn_index, file_ok) in candidates {
        if file_ok {
            if let Ok(pawn_square) = Square::try_from(pawn_index) {
                if position.piece_at(pawn_square, pawn) {
                    attackers |= pawn_square.as_bit();
                }
            }
        }
    }

    BitBoard(attackers)
}

fn generate_pseudolegal_moves(gs: &GameState) -> Vec<Move> {
    let mut moves = Vec::with_capacity(48);

    append_king_moves(gs, &mut moves);
    append_castling_moves(gs, &mut moves);
    append_en_passant_moves(gs, &mut moves);
    append_pawn_moves(gs, &mut moves);
    append_knight_moves(gs, &mut moves);
    append_sliding_moves(gs, &mut moves);

    moves
}

/// Emit quiet moves and captures from one origin to every set destination
fn append_moves_from(
    from: Square,
    destinations: BitBoard,
    piece: Piece,
    opponent_pieces: BitBoard,
    moves: &mut Vec<Move>,
) {
    for to in destinations.squares() {
        let flag = if opponent_pieces.is_bit_set(to) {
            MoveFlag::Capture
        } else {
            MoveFlag::Quiet
        };

        moves.push(Move::new(from, to, piece, flag));
    }
}

fn append_king_moves(gs: &GameState, moves: &mut Vec<Move>) {
    let white = gs.whites_move();
    let position = gs.position();
    let king = Piece::of_kind(PieceKind::King, white);

    let Some(&king_square) = position.find_piece(king).first() else {
        return;
    };

    let own_pieces = position.get_board(Piece::all_for(white));
    let opponent_pieces = position.get_board(Piece::all_for(!white));

    let destinations =
        BitBoard(attack_tables().king_moves[king_square as usize].0 & !own_pieces.0);

    append_moves_from(king_square, destinations, king, opponent_pieces, moves);
}

/// Castling: the pass-through squares (king start, transit, destination)
/// must all be unattacked and empty apart from the king itself; the
/// queenside b-file square must additionally be empty, though it may be
/// attacked.
fn append_castling_moves(gs: &GameState, moves: &mut Vec<Move>) {
    let white = gs.whites_move();
    let position = gs.position();
    let king = Piece::of_kind(PieceKind::King, white);
    let king_start = if white { Square::E1 } else { Square::E8 };

    if !position.piece_at(king_start, king) {
        return;
    }

    let occupancy = position.get_board(Piece::BothAll).0;

    let kingside = gs.castle_through_kingside();
    if !kingside.is_empty()
        && occupancy & kingside.0 == king_start.as_bit()
        && !any_attacked(position, kingside, !white, occupancy)
    {
        let to = if white { Square::G1 } else { Square::G8 };
        moves.push(Move::new(king_start, to, king, MoveFlag::KingCastle));
    }

    let queenside = gs.castle_through_queenside();
    let b_file_square = if white { Square::B1 } else { Square::B8 };

    if !queenside.is_empty()
        && occupancy & queenside.0 == king_start.as_bit()
        && occupancy & b_file_square.as_bit() == 0
        && !any_attacked(position, queenside, !white, occupancy)
    {
        let to = if white { Square::C1 } else { Square::C8 };
        moves.push(Move::new(king_start, to, king, MoveFlag::QueenCastle));
    }
}

fn any_attacked(position: &Position, squares: BitBoard, by_white: bool, occupancy: u64) -> bool {
    squares
        .squares()
        .any(|square| !get_attacks_to(position, square, by_white, occupancy).is_empty())
}

fn append_en_passant_moves(gs: &GameState, moves: &mut Vec<Move>) {
    let Some(target) = gs.en_passant() else {
        return;
    };

    let white = gs.whites_move();
    let position = gs.position();
    let pawn = Piece::of_kind(PieceKind::Pawn, white);
    let file = target.file();
    let index = target as i32;

    let candidates = if white {
        [(index - 9, file > 0), (index - 7, file < 7)]
    } else {
        [(index + 7, file > 0), (index + 9, file < 7)]
    };

    for (pawn_index, file_ok) in candidates {
        if !file_ok {
            continue;
        }

        if let Ok(from) = Square::try_from(pawn_index) {
            if position.piece_at(from, pawn) {
                moves.push(Move::new(from, target, pawn, MoveFlag::CaptureEnPassant));
            }
        }
    }
}

fn append_pawn_moves(gs: &GameState, moves: &mut Vec<Move>) {
    let white = gs.whites_move();
    let position = gs.position();
    let pawn = Piece::of_kind(PieceKind::Pawn, white);
    let opponent_pieces = position.get_board(Piece::all_for(!white));
    let occupancy = position.get_board(Piece::BothAll);

    let (forward, start_rank, promote_rank) = if white { (8, 1, 6) } else { (-8, 6, 1) };

    for &from in position.find_piece(pawn) {
        let index = from as i32;
        let rank = from.rank();
        let file = from.file();
        let promoting = rank == promote_rank;

        // Diagonal captures; forward-1 shifts a file toward 'a', forward+1 toward 'h'
        for (capture_offset, file_ok) in [(forward - 1, file > 0), (forward + 1, file < 7)] {
            if !file_ok {
                continue;
            }

            let Ok(to) = Square::try_from(index + capture_offset) else {
                continue;
            };

            if opponent_pieces.is_bit_set(to) {
                if promoting {
                    append_promotions(from, to, pawn, true, moves);
                } else {
                    moves.push(Move::new(from, to, pawn, MoveFlag::Capture));
                }
            }
        }

        // Single push, and the double push from the starting rank
        let Ok(to) = Square::try_from(index + forward) else {
            continue;
        };

        if !occupancy.is_bit_set(to) {
            if promoting {
                append_promotions(from, to, pawn, false, moves);
            } else {
                moves.push(Move::new(from, to, pawn, MoveFlag::Quiet));
            }

            if rank == start_rank {
                let double = Square::try_from(index + 2 * forward)
                    .expect("the double push from the start rank is on the board");

                if !occupancy.is_bit_set(double) {
                    moves.push(Move::new(from, double, pawn, MoveFlag::PawnDouble));
                }
            }
        }
    }
}

fn append_promotions(from: Square, to: Square, pawn: Piece, capture: bool, moves: &mut Vec<Move>) {
    for kind in [
        PieceKind::Knight,
        PieceKind::Bishop,
        PieceKind::Rook,
        PieceKind::Queen,
    ] {
        moves.push(Move::new(
            from,
            to,
            pawn,
            MoveFlag::promotion(kind, capture),
        ));
    }
}

fn append_knight_moves(gs: &GameState, moves: &mut Vec<Move>) {
    let white = gs.whites_move();
    let position = gs.position();
    let knight = Piece::of_kind(PieceKind::Knight, white);
    let own_pieces = position.get_board(Piece::all_for(white));
    let opponent_pieces = position.get_board(Piece::all_for(!white));

    for &from in position.find_piece(knight) {
        let destinations =
            BitBoard(attack_tables().knight_moves[from as usize].0 & !own_pieces.0);

        append_moves_from(from, destinations, knight, opponent_pieces, moves);
    }
}

fn append_sliding_moves(gs: &GameState, moves: &mut Vec<Move>) {
    let white = gs.whites_move();
    let position = gs.position();
    let tables = attack_tables();
    let own_pieces = position.get_board(Piece::all_for(white));
    let opponent_pieces = position.get_board(Piece::all_for(!white));
    let occupancy = position.get_board(Piece::BothAll).0;

    let bishop = Piece::of_kind(PieceKind::Bishop, white);
    for &from in position.find_piece(bishop) {
        let destinations = BitBoard(tables.bishop_attacks(from, occupancy).0 & !own_pieces.0);
        append_moves_from(from, destinations, bishop, opponent_pieces, moves);
    }

    let rook = Piece::of_kind(PieceKind::Rook, white);
    for &from in position.find_piece(rook) {
        let destinations = BitBoard(tables.rook_attacks(from, occupancy).0 & !own_pieces.0);
        append_moves_from(from, destinations, rook, opponent_pieces, moves);
    }

    // Queens combine both attack sets at the queen's square
    let queen = Piece::of_kind(PieceKind::Queen, white);
    for &from in position.find_piece(queen) {
        let destinations = BitBoard(tables.queen_attacks(from, occupancy).0 & !own_pieces.0);
        append_moves_from(from, destinations, queen, opponent_pieces, moves);
    }
}
