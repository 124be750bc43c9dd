use lodestone::attacks::initialize_attack_tables;
use lodestone::eval::{BasicEvaluator, Evaluator};
use lodestone::gamestate::GameState;

fn evaluate(fen: &str) -> f64 {
    initialize_attack_tables();
    let mut gs =
        GameState::from_fen(fen).unwrap_or_else(|e| panic!("Failed to load FEN '{}': {}", fen, e));

    BasicEvaluator.evaluate_position(&mut gs)
}

// ============================================================================
// Symmetric positions
// ============================================================================

#[test]
fn starting_position_is_balanced() {
    let score = evaluate("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
    assert!(score.abs() <= 1e-3, "start position scored {}", score);
}

#[test]
fn symmetric_italian_structure_is_balanced() {
    let score =
        evaluate("r2qk2r/ppp2ppp/2np1n2/2b1p1b1/2B1P1B1/2NP1N2/PPP2PPP/R2QK2R w KQkq - 0 1");
    assert!(score.abs() <= 1e-3, "symmetric position scored {}", score);
}

#[test]
fn mirrored_positions_have_opposite_scores() {
    // The second FEN is the first with colors swapped and ranks flipped
    let score_white = evaluate("rnbq1rk1/pp1n1pbp/3p2p1/1BpP4/P3PP2/2N5/1P4PP/R1BQK1NR w KQkq - 0 1");
    let score_black = evaluate("r1bqk1nr/1p4pp/2n5/p3pp2/1bPp4/3P2P1/PP1N1PBP/RNBQ1RK1 b KQkq - 0 1");

    assert!(
        (score_white + score_black).abs() <= 1e-3,
        "mirror scores {} and {} do not cancel",
        score_white,
        score_black
    );
}

#[test]
fn evaluation_ignores_the_side_to_move() {
    // The score is from white's perspective either way
    let white_to_move = evaluate("rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 1");
    let black_to_move = evaluate("rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1");

    assert!(white_to_move.abs() <= 1e-3);
    assert!(black_to_move.abs() <= 1e-3);
}

// ============================================================================
// Known imbalances
// ============================================================================

#[test]
fn mobility_advantage_is_worth_a_pawn_here() {
    // Material is even, both sides keep the bishop pair, and the pawn
    // structures are clean; white is up exactly ten legal moves (40 to 30)
    let score = evaluate("rnbq1rk1/pp1n1pbp/3p2p1/1BpP4/P3PP2/2N5/1P4PP/R1BQK1NR w KQkq - 0 1");
    assert!(
        (score - 1.0).abs() <= 1e-3,
        "expected +1.0, scored {}",
        score
    );
}

#[test]
fn an_extra_queen_dominates_the_score() {
    let score = evaluate("3qk3/8/8/8/8/8/8/3QK2Q w - - 0 1");
    assert!(score > 8.0, "two queens against one scored only {}", score);
}

#[test]
fn material_counts_follow_traditional_values() {
    // White is up a rook and down a pawn; the material edge must dwarf the
    // mobility and structure terms
    let score = evaluate("4k3/pppp4/8/8/8/8/PPP5/4K2R w - - 0 1");
    assert!(score > 2.0, "up a rook for a pawn but scored {}", score);
}
