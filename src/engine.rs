use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::{
    eval::BasicEvaluator,
    gamestate::GameState,
    reporter::Reporter,
    search::{AlphaBetaSearcher, SearchInfo, SearchLimits, Searcher},
    types::Move,
};

/// The engine facade a front-end talks to: it owns the game state and, while
/// a search is running, the search thread and its reporter.
pub struct Engine {
    pub game_state: GameState,
    info: Arc<SearchInfo>,
    stop_flag: Arc<AtomicBool>,
    search_thread: Option<JoinHandle<Result<(f64, Move), String>>>,
    reporter: Option<Reporter>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self {
            game_state: GameState::new(),
            info: Arc::new(SearchInfo::new()),
            stop_flag: Arc::new(AtomicBool::new(false)),
            search_thread: None,
            reporter: None,
        }
    }

    pub fn from_fen(fen: &str) -> Result<Self, String> {
        let mut engine = Self::new();
        engine.game_state = GameState::from_fen(fen)?;
        Ok(engine)
    }

    pub fn new_game(&mut self) {
        self.game_state = GameState::new();
    }

    pub fn info(&self) -> Arc<SearchInfo> {
        Arc::clone(&self.info)
    }

    /// Apply a move given in UCI notation, verifying it is legal
    pub fn make_uci_move(&mut self, move_str: &str) -> Result<(), String> {
        let m = self.game_state.convert_move(move_str)?;
        self.game_state.make_move(m);
        Ok(())
    }

    pub fn undo_move(&mut self) {
        self.game_state.undo_move();
    }

    /// Start a search in a background thread, with a reporter watching it.
    /// A search already in flight is stopped first.
    pub fn go(&mut self, limits: SearchLimits) {
        if self.search_thread.is_some() {
            let _ = self.stop();
        }

        self.info = Arc::new(SearchInfo::new());
        self.stop_flag = Arc::new(AtomicBool::new(false));

        let info = Arc::clone(&self.info);
        let stop = Arc::clone(&self.stop_flag);
        let mut gs = self.game_state.clone();
        let thread_limits = limits.clone();

        self.search_thread = Some(thread::spawn(move || {
            let mut searcher = AlphaBetaSearcher::new(Box::new(BasicEvaluator));
            searcher.search(&mut gs, &thread_limits, &info, &stop)
        }));

        self.reporter = Some(Reporter::spawn(
            Arc::clone(&self.info),
            Arc::clone(&self.stop_flag),
            limits.timeout_ms,
        ));
    }

    /// Raise the stop flag and collect the result. Fails if the search had
    /// not yet settled on any move.
    pub fn stop(&mut self) -> Result<(f64, Move), String> {
        self.stop_flag.store(true, Ordering::Relaxed);
        self.wait()
    }

    /// Block until the running search finishes and return its result
    pub fn wait(&mut self) -> Result<(f64, Move), String> {
        let handle = self
            .search_thread
            .take()
            .ok_or_else(|| "No search is running".to_string())?;

        let result = handle
            .join()
            .map_err(|_| "Search thread panicked".to_string());

        // The search raises the flag on its way out, but make sure the
        // reporter cannot outlive this call on any path
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(reporter) = self.reporter.take() {
            reporter.join();
        }

        result?
    }

    /// Run a search to completion on the calling thread's schedule
    pub fn search_blocking(&mut self, limits: SearchLimits) -> Result<(f64, Move), String> {
        self.go(limits);
        self.wait()
    }
}
