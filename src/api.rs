#[cfg(feature = "api")]
use serde::{Deserialize, Serialize};

use crate::engine::Engine;
use crate::search::SearchLimits;

#[cfg_attr(feature = "api", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct AnalyzeRequest {
    pub fen: String,
    pub depth: Option<u32>,
    pub movetime_ms: Option<u64>,
    pub nodes: Option<u64>,
}

#[cfg_attr(feature = "api", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct AnalyzeResponse {
    pub best_move: String,      // The best move in UCI format (e.g., e2e4)
    pub evaluation: f64,        // Position evaluation in pawn units, white-positive
    pub depth: u32,             // Search depth reached
    pub nodes: u64,             // Total nodes searched
    pub pv: Vec<String>,        // Principal variation (best line of play)
    pub time_ms: u64,           // Time spent searching in milliseconds
    pub fen_after_move: String, // FEN string after applying the best move
}

/// Main entry point for API consumers: analyze a position and return the
/// best move.
pub fn analyze_position(request: AnalyzeRequest) -> Result<AnalyzeResponse, String> {
    crate::attacks::initialize_attack_tables();

    let mut engine =
        Engine::from_fen(&request.fen).map_err(|e| format!("Invalid FEN: {}", e))?;

    let limits = SearchLimits {
        depth_limit: request.depth,
        timeout_ms: request.movetime_ms,
        node_limit: request.nodes,
        ..SearchLimits::default()
    };

    let (evaluation, best_move) = engine.search_blocking(limits)?;

    let info = engine.info();
    let pv: Vec<String> = info.pv().iter().map(|m| m.to_uci_string()).collect();

    // Apply the best move to report the resulting position, then restore
    engine.game_state.make_move(best_move);
    let fen_after_move = engine.game_state.fen_string();
    engine.game_state.undo_move();

    Ok(AnalyzeResponse {
        best_move: best_move.to_uci_string(),
        evaluation,
        depth: info.depth(),
        nodes: info.nodes(),
        pv,
        time_ms: info.time_ms(),
        fen_after_move,
    })
}

/// Simpler interface with just FEN and depth
pub fn get_best_move(fen: &str, depth: u32) -> Result<AnalyzeResponse, String> {
    analyze_position(AnalyzeRequest {
        fen: fen.to_string(),
        depth: Some(depth),
        movetime_ms: None,
        nodes: None,
    })
}
