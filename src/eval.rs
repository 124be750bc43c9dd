use crate::{
    gamestate::GameState,
    movegen::generate_moves,
    types::{Piece, PieceKind},
};

/// A position evaluation strategy. Implemented as a trait so evaluators can
/// keep internal state; checkmate is the search's concern, not the
/// evaluator's.
pub trait Evaluator {
    fn initialize(&mut self, _gs: &GameState) {}

    /// Guess how likely each side is to win, normalized to the value of a
    /// pawn. Positive numbers favor white.
    fn evaluate_position(&mut self, gs: &mut GameState) -> f64;
}

/// Material, mobility, the bishop pair, and pawn structure. Simple, but
/// enough to play reasonable moves.
pub struct BasicEvaluator;

impl Evaluator for BasicEvaluator {
    fn evaluate_position(&mut self, gs: &mut GameState) -> f64 {
        material_score(gs) + mobility_score(gs) + bishop_pair_score(gs) + structure_score(gs)
    }
}

fn count(gs: &GameState, kind: PieceKind, white: bool) -> f64 {
    gs.position().find_piece(Piece::of_kind(kind, white)).len() as f64
}

fn material_score(gs: &GameState) -> f64 {
    PieceKind::iter()
        .map(|kind| kind.value() * (count(gs, kind, true) - count(gs, kind, false)))
        .sum()
}

/// 0.1 pawns per legal move of advantage. The opponent's mobility is
/// measured by flipping the side to move and flipping it back.
fn mobility_score(gs: &mut GameState) -> f64 {
    let to_move_mobility = generate_moves(gs).len() as f64;
    gs.flip_move();
    let other_mobility = generate_moves(gs).len() as f64;
    gs.flip_move();

    let (white_mobility, black_mobility) = if gs.whites_move() {
        (to_move_mobility, other_mobility)
    } else {
        (other_mobility, to_move_mobility)
    };

    0.1 * (white_mobility - black_mobility)
}

/// The bishop pair is thought to be worth roughly half a pawn
fn bishop_pair_score(gs: &GameState) -> f64 {
    let white_pair = if count(gs, PieceKind::Bishop, true) == 2.0 { 1.0 } else { 0.0 };
    let black_pair = if count(gs, PieceKind::Bishop, false) == 2.0 { 1.0 } else { 0.0 };

    0.5 * (white_pair - black_pair)
}

/// Penalize doubled and isolated pawns, half a pawn each
fn structure_score(gs: &GameState) -> f64 {
    let mut white_files = [0u32; 8];
    let mut black_files = [0u32; 8];

    for &square in gs.position().find_piece(Piece::WhitePawn) {
        white_files[square.file() as usize] += 1;
    }
    for &square in gs.position().find_piece(Piece::BlackPawn) {
        black_files[square.file() as usize] += 1;
    }

    let mut score = 0.0;

    for file in 0..8usize {
        if white_files[file] >= 2 {
            score -= 0.5;
        }
        if black_files[file] >= 2 {
            score += 0.5;
        }

        let isolated = |files: &[u32; 8]| {
            files[file] >= 1
                && (file == 0 || files[file - 1] == 0)
                && (file == 7 || files[file + 1] == 0)
        };

        if isolated(&white_files) {
            score -= 0.5;
        }
        if isolated(&black_files) {
            score += 0.5;
        }
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubled_and_isolated_pawns_are_penalized() {
        // White: doubled pawns on c2/c3, isolated as well (no b- or d-file pawns).
        // Black: healthy a7/b7 pair.
        let gs = GameState::from_fen("k7/pp6/8/8/8/2P5/2P5/K7 w - - 0 1").unwrap();

        // Material is even; the c-pawns are doubled (-0.5) and both isolated (-0.5)
        let score = structure_score(&gs);
        assert!((score - (-1.0)).abs() < 1e-9);
        assert!(material_score(&gs).abs() < 1e-9);
    }

    #[test]
    fn bishop_pair_requires_exactly_two() {
        let gs = GameState::from_fen("k7/8/8/8/8/8/8/KBB5 w - - 0 1").unwrap();
        assert!((bishop_pair_score(&gs) - 0.5).abs() < 1e-9);

        let gs = GameState::from_fen("k7/8/8/8/8/8/8/KB6 w - - 0 1").unwrap();
        assert!(bishop_pair_score(&gs).abs() < 1e-9);
    }
}
