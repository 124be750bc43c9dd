use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex;

use crate::{
    constants::{DEFAULT_MAX_DEPTH, MATE_SCORE, MATE_THRESHOLD, MAX_PLY},
    eval::Evaluator,
    gamestate::GameState,
    movegen::{generate_moves, in_check},
    position::Position,
    types::{Move, MoveFlag, Piece, PieceKind},
};

/// Optional bounds on a search. Unset fields do not constrain it.
#[derive(Clone, Debug, Default)]
pub struct SearchLimits {
    /// Hard wall-clock cap, enforced by the reporter thread
    pub timeout_ms: Option<u64>,
    /// Abort once this many nodes have been visited
    pub node_limit: Option<u64>,
    /// Maximum iterative-deepening depth, in ply
    pub depth_limit: Option<u32>,
    /// Search for a mate in this many moves; caps the depth at twice the value
    pub mate_in: Option<u32>,
    /// Restrict the root to this move set
    pub moves: Option<Vec<Move>>,
}

impl SearchLimits {
    fn max_depth(&self) -> u32 {
        let mate_depth = self.mate_in.map(|moves| 2 * moves);

        match (self.depth_limit, mate_depth) {
            (Some(depth), Some(mate)) => depth.min(mate),
            (Some(depth), None) => depth,
            (None, Some(mate)) => mate,
            (None, None) => {
                // With a time or node budget, deepen until it runs out
                if self.timeout_ms.is_some() || self.node_limit.is_some() {
                    MAX_PLY
                } else {
                    DEFAULT_MAX_DEPTH
                }
            }
        }
    }
}

/// Live search telemetry, shared between the search thread and the reporter.
/// The scalar fields are best-effort; the PV is only read or replaced while
/// holding its lock.
#[derive(Default)]
pub struct SearchInfo {
    score: AtomicU64, // f64 bits, from white's perspective
    depth: AtomicU32,
    nodes: AtomicU64,
    time_ms: AtomicU64,
    pv: Mutex<Vec<Move>>,
}

impl SearchInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn score(&self) -> f64 {
        f64::from_bits(self.score.load(Ordering::Relaxed))
    }

    pub fn set_score(&self, score: f64) {
        self.score.store(score.to_bits(), Ordering::Relaxed);
    }

    pub fn depth(&self) -> u32 {
        self.depth.load(Ordering::Relaxed)
    }

    pub fn set_depth(&self, depth: u32) {
        self.depth.store(depth, Ordering::Relaxed);
    }

    pub fn nodes(&self) -> u64 {
        self.nodes.load(Ordering::Relaxed)
    }

    /// Count one visited node, returning the new total
    fn add_node(&self) -> u64 {
        self.nodes.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn time_ms(&self) -> u64 {
        self.time_ms.load(Ordering::Relaxed)
    }

    pub fn set_time_ms(&self, time_ms: u64) {
        self.time_ms.store(time_ms, Ordering::Relaxed);
    }

    pub fn pv(&self) -> Vec<Move> {
        self.pv.lock().expect("pv lock is never poisoned").clone()
    }

    pub fn set_pv(&self, pv: &[Move]) {
        let mut guard = self.pv.lock().expect("pv lock is never poisoned");
        guard.clear();
        guard.extend_from_slice(pv);
    }

    pub fn best_move(&self) -> Option<Move> {
        self.pv
            .lock()
            .expect("pv lock is never poisoned")
            .first()
            .copied()
    }
}

/// A search algorithm. A trait so searchers can keep internal state between
/// calls.
pub trait Searcher {
    fn initialize(&mut self, _gs: &GameState) {}

    /// Find the best move and its score. The score is from white's
    /// perspective; cancellation is requested through `stop`, and progress
    /// is published to `info` as it is made.
    fn search(
        &mut self,
        gs: &mut GameState,
        limits: &SearchLimits,
        info: &SearchInfo,
        stop: &AtomicBool,
    ) -> Result<(f64, Move), String>;
}

/// Iterative-deepening negamax with alpha-beta pruning, a quiescence
/// extension, and PV-first MVV-LVA move ordering.
pub struct AlphaBetaSearcher {
    evaluator: Box<dyn Evaluator + Send>,
}

impl AlphaBetaSearcher {
    pub fn new(evaluator: Box<dyn Evaluator + Send>) -> Self {
        Self { evaluator }
    }
}

impl Searcher for AlphaBetaSearcher {
    fn search(
        &mut self,
        gs: &mut GameState,
        limits: &SearchLimits,
        info: &SearchInfo,
        stop: &AtomicBool,
    ) -> Result<(f64, Move), String> {
        let max_depth = limits.max_depth();
        let max_nodes = limits.node_limit.unwrap_or(u64::MAX);

        let mut root_moves = generate_moves(gs);
        if let Some(allowed) = &limits.moves {
            root_moves.retain(|m| allowed.contains(m));
        }

        if root_moves.is_empty() {
            stop.store(true, Ordering::Relaxed);
            return Err("No legal moves in position".to_string());
        }

        let white_at_root = gs.whites_move();
        let mut pv_hint: Vec<Move> = Vec::new();
        let mut committed: Option<(f64, Move)> = None;

        for depth in 1..=max_depth {
            let Some((score, pv)) =
                self.root(gs, depth, &root_moves, &pv_hint, info, stop, max_nodes)
            else {
                // Cancelled mid-iteration: discard and keep the last full result
                break;
            };

            info.set_depth(depth);
            info.set_score(white_perspective(score, white_at_root));
            info.set_pv(&pv);

            committed = Some((score, pv[0]));
            pv_hint = pv;

            if score.abs() >= MATE_THRESHOLD {
                break;
            }
        }

        // The search owns completion signalling; the reporter exits on this
        stop.store(true, Ordering::Relaxed);

        if let Some((score, best_move)) = committed {
            return Ok((white_perspective(score, white_at_root), best_move));
        }

        // A partial first iteration still produced a usable move
        match info.best_move() {
            Some(best_move) => Ok((info.score(), best_move)),
            None => Err("Search was stopped before a best move was found".to_string()),
        }
    }
}

impl AlphaBetaSearcher {
    /// One full-window pass over the root moves. Like an interior node, but
    /// every improvement is committed to the shared info immediately so the
    /// reporter can publish partial progress.
    #[allow(clippy::too_many_arguments)]
    fn root(
        &mut self,
        gs: &mut GameState,
        depth: u32,
        root_moves: &[Move],
        pv_hint: &[Move],
        info: &SearchInfo,
        stop: &AtomicBool,
        max_nodes: u64,
    ) -> Option<(f64, Vec<Move>)> {
        let mut alpha = f64::NEG_INFINITY;
        let beta = f64::INFINITY;
        let mut pv: Vec<Move> = Vec::new();
        let white_at_root = gs.whites_move();

        for m in order_moves(root_moves, pv_hint.first().copied(), gs.position()) {
            gs.make_move(m);
            let hint_tail = pv_tail(pv_hint, m);
            let child = self.alpha_beta(gs, depth - 1, -beta, -alpha, hint_tail, info, stop, max_nodes);
            gs.undo_move();

            let (child_score, child_pv) = child?;
            let score = -child_score;

            if score > alpha {
                alpha = score;
                pv.clear();
                pv.push(m);
                pv.extend(child_pv);

                info.set_score(white_perspective(alpha, white_at_root));
                info.set_pv(&pv);
            }
        }

        Some((alpha, pv))
    }

    /// Negamax alpha-beta. Returns None when cancelled or out of nodes;
    /// the caller discards the partial result. A beta cutoff returns the
    /// bound with an empty PV.
    #[allow(clippy::too_many_arguments)]
    fn alpha_beta(
        &mut self,
        gs: &mut GameState,
        depth: u32,
        mut alpha: f64,
        beta: f64,
        pv_hint: &[Move],
        info: &SearchInfo,
        stop: &AtomicBool,
        max_nodes: u64,
    ) -> Option<(f64, Vec<Move>)> {
        if stop.load(Ordering::Relaxed) {
            return None;
        }

        if depth == 0 {
            return self
                .quiescence(gs, alpha, beta, info, stop, max_nodes)
                .map(|score| (score, Vec::new()));
        }

        if info.add_node() > max_nodes {
            return None;
        }

        let moves = generate_moves(gs);
        if moves.is_empty() {
            return Some((terminal_score(gs), Vec::new()));
        }

        let mut pv: Vec<Move> = Vec::new();

        for m in order_moves(&moves, pv_hint.first().copied(), gs.position()) {
            gs.make_move(m);
            let hint_tail = pv_tail(pv_hint, m);
            let child =
                self.alpha_beta(gs, depth - 1, -beta, -alpha, hint_tail, info, stop, max_nodes);
            gs.undo_move();

            let (child_score, child_pv) = child?;
            let score = -child_score;

            if score >= beta {
                return Some((beta, Vec::new()));
            }

            if score > alpha {
                alpha = score;
                pv.clear();
                pv.push(m);
                pv.extend(child_pv);
            }
        }

        Some((alpha, pv))
    }

    /// Quiescence: stand pat on the static evaluation as a lower bound, then
    /// search captures only, until no tactically unstable move remains.
    fn quiescence(
        &mut self,
        gs: &mut GameState,
        mut alpha: f64,
        beta: f64,
        info: &SearchInfo,
        stop: &AtomicBool,
        max_nodes: u64,
    ) -> Option<f64> {
        if stop.load(Ordering::Relaxed) {
            return None;
        }

        if info.add_node() > max_nodes {
            return None;
        }

        // Mate and stalemate are detected on the full move list
        let moves = generate_moves(gs);
        if moves.is_empty() {
            return Some(terminal_score(gs));
        }

        let stand_pat = signed_evaluation(&mut *self.evaluator, gs);
        if stand_pat >= beta {
            return Some(beta);
        }
        if stand_pat > alpha {
            alpha = stand_pat;
        }

        let captures: Vec<Move> = moves.into_iter().filter(|m| m.is_capture()).collect();

        for m in order_moves(&captures, None, gs.position()) {
            gs.make_move(m);
            let child = self.quiescence(gs, -beta, -alpha, info, stop, max_nodes);
            gs.undo_move();

            let score = -child?;

            if score >= beta {
                return Some(beta);
            }

            if score > alpha {
                alpha = score;
            }
        }

        Some(alpha)
    }
}

/// Mate or stalemate value for a position with no legal moves, from the
/// mover's perspective.
fn terminal_score(gs: &GameState) -> f64 {
    if in_check(gs.whites_move(), gs.position()) {
        -MATE_SCORE
    } else {
        0.0
    }
}

/// The static evaluation from the side to move's perspective
fn signed_evaluation(evaluator: &mut dyn Evaluator, gs: &mut GameState) -> f64 {
    let score = evaluator.evaluate_position(gs);
    if gs.whites_move() {
        score
    } else {
        -score
    }
}

fn white_perspective(score: f64, white_to_move: bool) -> f64 {
    if white_to_move {
        score
    } else {
        -score
    }
}

/// The remaining hint after following its first move, or nothing if the
/// search left the hinted line.
fn pv_tail(pv_hint: &[Move], played: Move) -> &[Move] {
    match pv_hint.first() {
        Some(&first) if first == played => &pv_hint[1..],
        _ => &[],
    }
}

/// A move with its ordering priority. Higher priorities sort first; equal
/// priorities keep generation order, so the ordering is stable.
struct RankedMove {
    m: Move,
    priority: i32,
    index: usize,
}

impl PartialEq for RankedMove {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.index == other.index
    }
}

impl Eq for RankedMove {}

impl PartialOrd for RankedMove {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RankedMove {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.priority
            .cmp(&other.priority)
            .then(other.index.cmp(&self.index))
    }
}

/// Order moves through a priority queue: the PV hint first, then captures by
/// MVV-LVA, then everything else in generation order.
fn order_moves(moves: &[Move], hint: Option<Move>, position: &Position) -> Vec<Move> {
    let mut queue: BinaryHeap<RankedMove> = moves
        .iter()
        .enumerate()
        .map(|(index, &m)| RankedMove {
            m,
            priority: move_priority(m, hint, position),
            index,
        })
        .collect();

    let mut ordered = Vec::with_capacity(moves.len());
    while let Some(ranked) = queue.pop() {
        ordered.push(ranked.m);
    }

    ordered
}

fn move_priority(m: Move, hint: Option<Move>, position: &Position) -> i32 {
    if Some(m) == hint {
        return i32::MAX;
    }

    if m.is_capture() {
        let victim = if m.flag == MoveFlag::CaptureEnPassant {
            PieceKind::Pawn
        } else {
            position
                .colored_piece_at(m.to)
                .and_then(Piece::kind)
                .unwrap_or(PieceKind::Pawn)
        };

        let attacker = m.piece.kind().unwrap_or(PieceKind::Pawn);

        // Most valuable victim first, least valuable attacker as tiebreak
        return 1_000 + (10.0 * victim.value() - attacker.value()) as i32;
    }

    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Square;

    #[test]
    fn capture_ordering_prefers_valuable_victims() {
        // White pawn d4 can take the queen on e5; the knight on c3 can take
        // the pawn on b5.
        let gs = GameState::from_fen("k7/8/8/1p2q3/3P4/2N5/8/K7 w - - 0 1").unwrap();
        let moves = generate_moves(&gs);

        let ordered = order_moves(&moves, None, gs.position());

        assert_eq!(ordered[0].from, Square::D4);
        assert_eq!(ordered[0].to, Square::E5);
        assert_eq!(ordered[1].from, Square::C3);
        assert_eq!(ordered[1].to, Square::B5);
        assert!(!ordered[2].is_capture());
    }

    #[test]
    fn hint_outranks_captures() {
        let gs = GameState::from_fen("k7/8/8/1p2q3/3P4/2N5/8/K7 w - - 0 1").unwrap();
        let moves = generate_moves(&gs);

        let hint = moves.iter().copied().find(|m| !m.is_capture()).unwrap();
        let ordered = order_moves(&moves, Some(hint), gs.position());

        assert_eq!(ordered[0], hint);
    }

    #[test]
    fn non_captures_keep_generation_order() {
        let gs = GameState::from_fen("k7/8/8/8/8/8/8/K7 w - - 0 1").unwrap();
        let moves = generate_moves(&gs);
        let ordered = order_moves(&moves, None, gs.position());

        assert_eq!(moves, ordered);
    }
}
