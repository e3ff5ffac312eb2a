//! Background search with cancellation.
//!
//! A [`SearchWorker`] runs each search on its own thread and streams progress
//! back over a channel. At most one search is in flight: a new request cancels
//! the previous one and waits for its thread to finish. Every event carries
//! the generation of the request that produced it, and events of superseded
//! requests are dropped on the receiving side.
//!
//! While a search runs, each improvement of the best candidate is published
//! and followed by a pause of
//! [`best_move_delay`](crate::config::Pacing::best_move_delay), so that a
//! viewer can follow the search. Cancelling cuts the pause short.
//!
//! # Example
//!
//! ```
//! use stackbot_engine::{GameState, PieceCycle, PieceKind};
//! use stackbot_search::{
//!     config::{BotConfig, Pacing},
//!     move_search::MoveSearch,
//!     worker::SearchWorker,
//! };
//!
//! let config = BotConfig {
//!     pacing: Pacing::NONE,
//!     ..BotConfig::default()
//! };
//! let mut worker = SearchWorker::new(MoveSearch::new(config));
//!
//! let mut game = GameState::new(PieceCycle::new([PieceKind::O]));
//! game.start();
//! worker.request(&game.snapshot()).expect("a piece is previewed");
//!
//! let best = worker.wait_for_best().expect("search was not cancelled");
//! assert_eq!(best.rotation(), 0);
//! ```

use std::{
    ops::ControlFlow,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::{self, RecvTimeoutError},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use stackbot_engine::{BitGrid, GameSnapshot, Shape};
use tracing::{debug, warn};

use crate::move_search::{MoveDescriptor, MoveSearch, SearchObserver};

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Progress of a search request.
#[derive(Debug, Clone, Copy, PartialEq, derive_more::IsVariant)]
pub enum SearchEvent {
    /// The best candidate so far improved.
    Candidate {
        generation: u64,
        descriptor: MoveDescriptor,
    },
    Finished {
        generation: u64,
        descriptor: MoveDescriptor,
    },
    /// The request was cancelled before the search completed.
    Cancelled { generation: u64 },
}

impl SearchEvent {
    #[must_use]
    pub fn generation(&self) -> u64 {
        match self {
            Self::Candidate { generation, .. }
            | Self::Finished { generation, .. }
            | Self::Cancelled { generation } => *generation,
        }
    }
}

#[derive(Debug)]
struct InFlight {
    cancel: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

#[derive(Debug)]
pub struct SearchWorker {
    search: Arc<MoveSearch>,
    tx: mpsc::Sender<SearchEvent>,
    rx: mpsc::Receiver<SearchEvent>,
    generation: u64,
    in_flight: Option<InFlight>,
}

impl SearchWorker {
    #[must_use]
    pub fn new(search: MoveSearch) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            search: Arc::new(search),
            tx,
            rx,
            generation: 0,
            in_flight: None,
        }
    }

    #[must_use]
    pub fn search(&self) -> &MoveSearch {
        &self.search
    }

    /// Generation of the latest request, 0 before the first one.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn is_searching(&self) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|in_flight| !in_flight.handle.is_finished())
    }

    /// Starts searching the position of a running game, superseding any
    /// earlier request.
    ///
    /// Returns the generation of the new request, or `None` when no piece is
    /// being previewed (the earlier request is left alone then).
    pub fn request(&mut self, snapshot: &GameSnapshot) -> Option<u64> {
        let current = snapshot.current()?.shape().clone();
        Some(self.request_position(snapshot.stack(), current, snapshot.lookahead().clone()))
    }

    /// Starts searching `board` for `current` followed by `lookahead`,
    /// superseding any earlier request.
    pub fn request_position(&mut self, board: BitGrid, current: Shape, lookahead: Shape) -> u64 {
        self.cancel();
        self.generation += 1;
        let generation = self.generation;

        let cancel = Arc::new(AtomicBool::new(false));
        let handle = {
            let cancel = Arc::clone(&cancel);
            let search = Arc::clone(&self.search);
            let tx = self.tx.clone();
            thread::spawn(move || {
                let mut observer = Publisher {
                    generation,
                    delay: search.config().pacing.best_move_delay,
                    cancel: &cancel,
                    tx: &tx,
                };
                let best = search.search_with(&board, &current, &lookahead, &mut observer);
                let event = if cancel.load(Ordering::Relaxed) {
                    SearchEvent::Cancelled { generation }
                } else {
                    SearchEvent::Finished {
                        generation,
                        descriptor: best,
                    }
                };
                let _ = tx.send(event);
            })
        };
        debug!(generation, "search requested");
        self.in_flight = Some(InFlight { cancel, handle });
        generation
    }

    /// Cancels the in-flight search, if any, and waits for its thread.
    pub fn cancel(&mut self) {
        if let Some(in_flight) = &self.in_flight {
            in_flight.cancel.store(true, Ordering::Relaxed);
        }
        self.join();
    }

    fn join(&mut self) {
        if let Some(in_flight) = self.in_flight.take()
            && in_flight.handle.join().is_err()
        {
            warn!(generation = self.generation, "search thread panicked");
        }
    }

    /// Waits for the next event of the latest request.
    ///
    /// Events of superseded requests are skipped. Returns `None` once the
    /// latest request has nothing more to report.
    pub fn next_event(&mut self) -> Option<SearchEvent> {
        loop {
            let event = match self.rx.recv_timeout(POLL_INTERVAL) {
                Ok(event) => event,
                Err(RecvTimeoutError::Timeout) => {
                    if self.is_searching() {
                        continue;
                    }
                    // the thread is gone, so everything it sent is queued
                    if let Ok(event) = self.rx.try_recv() {
                        event
                    } else {
                        self.join();
                        return None;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => return None,
            };

            if event.generation() != self.generation {
                warn!(
                    stale = event.generation(),
                    latest = self.generation,
                    "ignoring stale search result"
                );
                continue;
            }
            if !event.is_candidate() {
                self.join();
            }
            return Some(event);
        }
    }

    /// Waits for the latest request to finish and returns its best move, or
    /// `None` if it was cancelled.
    pub fn wait_for_best(&mut self) -> Option<MoveDescriptor> {
        while let Some(event) = self.next_event() {
            match event {
                SearchEvent::Candidate { .. } => {}
                SearchEvent::Finished { descriptor, .. } => return Some(descriptor),
                SearchEvent::Cancelled { .. } => return None,
            }
        }
        None
    }
}

impl Drop for SearchWorker {
    fn drop(&mut self) {
        self.cancel();
    }
}

struct Publisher<'a> {
    generation: u64,
    delay: Duration,
    cancel: &'a AtomicBool,
    tx: &'a mpsc::Sender<SearchEvent>,
}

impl Publisher<'_> {
    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    fn pause(&self) {
        let deadline = Instant::now() + self.delay;
        while !self.cancelled() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep(POLL_INTERVAL.min(deadline - now));
        }
    }
}

impl SearchObserver for Publisher<'_> {
    fn on_candidate(&mut self, candidate: &MoveDescriptor) -> ControlFlow<()> {
        let event = SearchEvent::Candidate {
            generation: self.generation,
            descriptor: *candidate,
        };
        if self.tx.send(event).is_err() {
            return ControlFlow::Break(());
        }
        self.pause();
        if self.cancelled() {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }

    fn should_stop(&self) -> bool {
        self.cancelled()
    }
}

#[cfg(test)]
mod tests {
    use stackbot_engine::{GameState, PieceCycle, PieceKind};

    use super::*;
    use crate::config::{BotConfig, Pacing};

    fn worker(best_move_delay: Duration) -> SearchWorker {
        let config = BotConfig {
            pacing: Pacing {
                best_move_delay,
                move_delay: Duration::ZERO,
            },
            ..BotConfig::default()
        };
        SearchWorker::new(MoveSearch::new(config))
    }

    fn started_game() -> GameState {
        let mut game = GameState::new(PieceCycle::new([PieceKind::T, PieceKind::S]));
        game.start();
        game
    }

    #[test]
    fn test_result_matches_direct_search() {
        let game = started_game();
        let mut worker = worker(Duration::ZERO);
        assert_eq!(worker.generation(), 0);
        assert_eq!(worker.request(&game.snapshot()), Some(1));

        let mut candidates = vec![];
        let mut finished = None;
        while let Some(event) = worker.next_event() {
            assert_eq!(event.generation(), 1);
            match event {
                SearchEvent::Candidate { descriptor, .. } => candidates.push(descriptor),
                SearchEvent::Finished { descriptor, .. } => finished = Some(descriptor),
                SearchEvent::Cancelled { .. } => panic!("unexpected cancel"),
            }
        }

        let expected = worker.search().search_snapshot(&game.snapshot()).unwrap();
        assert_eq!(finished, Some(expected));
        assert_eq!(candidates.last(), Some(&expected));
        assert!(!worker.is_searching());
    }

    #[test]
    fn test_request_without_piece() {
        let game = GameState::new(PieceCycle::new([PieceKind::T]));
        let mut worker = worker(Duration::ZERO);
        assert_eq!(worker.request(&game.snapshot()), None);
        assert_eq!(worker.generation(), 0);
        assert_eq!(worker.next_event(), None);
    }

    #[test]
    fn test_new_request_supersedes_old_one() {
        let game = started_game();
        let mut worker = worker(Duration::from_secs(60));
        let started = Instant::now();

        let first = worker.request(&game.snapshot()).unwrap();
        let second = worker.request(&game.snapshot()).unwrap();
        assert!(second > first);
        worker.cancel();

        let mut events = vec![];
        while let Some(event) = worker.next_event() {
            events.push(event);
        }
        assert!(events.iter().all(|event| event.generation() == second));
        assert_eq!(
            events.last(),
            Some(&SearchEvent::Cancelled { generation: second })
        );
        assert!(started.elapsed() < Duration::from_secs(30));
    }

    #[test]
    fn test_wait_for_best_after_cancel() {
        let game = started_game();
        let mut worker = worker(Duration::from_secs(60));
        worker.request(&game.snapshot()).unwrap();
        worker.cancel();
        assert_eq!(worker.wait_for_best(), None);
    }
}
