use crate::config::SolverConfig;
use crate::core::cancel::CancelToken;
use crate::core::cryptogram::CryptogramModel;
use crate::core::index::WordIndex;
use crate::core::ranking::SolutionSet;
use crate::core::solution::Solution;
use crate::core::types::{CryptogramWord, DictionaryWord};
use serde::Serialize;
use std::mem;
use std::panic;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle, Scope};
use tracing::debug;

/// Solves cryptograms against one dictionary.
///
/// The search is a backtracking walk over the unique code words of a line,
/// fewest dictionary candidates first. Branch points fork into their own
/// scoped threads while admission slots are free and run inline otherwise.
pub struct Solver {
    index: Arc<WordIndex>,
    config: SolverConfig,
}

/// Counters of one finished search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SearchReport {
    pub branches: u64,
    pub spawned: u64,
    pub emitted: u64,
    pub cancelled: bool,
}

/// A running search: a stream of solutions plus the worker to join.
///
/// The channel closes only after every branch task has finished, so draining
/// `iter` to the end is a full join.
pub struct SearchHandle {
    receiver: Receiver<Solution>,
    worker: JoinHandle<SearchReport>,
    cancel: CancelToken,
}

/// Result of `Solver::rank`.
pub struct RankOutcome {
    pub set: SolutionSet,
    pub report: SearchReport,
    /// Solutions the set accepted while the search ran.
    pub accepted: usize,
}

impl Solver {
    pub fn new(index: Arc<WordIndex>, config: SolverConfig) -> Self {
        Self { index, config }
    }

    pub fn index(&self) -> &Arc<WordIndex> {
        &self.index
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Starts a search on a background thread. Solutions arrive on the
    /// returned handle in no particular order.
    pub fn solve(&self, model: Arc<CryptogramModel>, max_unsolved: usize, cancel: CancelToken) -> SearchHandle {
        // Rendezvous channel: a branch waits until the collector takes its solution.
        let (sender, receiver) = mpsc::sync_channel(0);
        let index = Arc::clone(&self.index);
        let slots = self.config.admission_slots();
        let allow_self_mapping = self.config.allow_self_mapping;
        let evaluate_partials = self.config.evaluate_partials;
        let token = cancel.clone();

        let worker = thread::spawn(move || {
            let search = Search {
                index: &index,
                model: &model,
                max_unsolved,
                allow_self_mapping,
                evaluate_partials,
                admission: AdmissionPool::new(slots),
                cancel: token,
                counters: Counters::default(),
            };
            search.run(sender);
            let report = search.report();
            debug!(
                branches = report.branches,
                spawned = report.spawned,
                emitted = report.emitted,
                cancelled = report.cancelled,
                "search finished"
            );
            report
        });

        SearchHandle { receiver, worker, cancel }
    }

    /// Runs a search to completion and keeps the configured top solutions.
    pub fn rank(&self, model: Arc<CryptogramModel>, cancel: CancelToken) -> RankOutcome {
        self.rank_with(model, cancel, |_| {})
    }

    /// Like `rank`, calling `on_accept` each time the set takes a solution.
    /// Reaching `max_solutions` accepted solutions cancels the search.
    pub fn rank_with<F>(&self, model: Arc<CryptogramModel>, cancel: CancelToken, mut on_accept: F) -> RankOutcome
    where
        F: FnMut(&SolutionSet),
    {
        let mut set = SolutionSet::new(self.config.top_n, Arc::clone(&model), Arc::clone(&self.index));
        let handle = self.solve(model, self.config.max_unsolved, cancel);
        let mut accepted = 0;

        // Keep receiving after cancellation: late arrivals are still ranked.
        for solution in handle.iter() {
            if set.add(solution) {
                accepted += 1;
                on_accept(&set);
                if self.config.max_solutions.map_or(false, |max| accepted >= max) {
                    handle.cancel_token().cancel();
                }
            }
        }

        let report = handle.join();
        RankOutcome { set, report, accepted }
    }
}

impl SearchHandle {
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Next solution, or `None` once the search has finished.
    pub fn recv(&self) -> Option<Solution> {
        self.receiver.recv().ok()
    }

    pub fn iter(&self) -> mpsc::Iter<'_, Solution> {
        self.receiver.iter()
    }

    /// Waits for every branch task. Solutions not yet received are dropped.
    pub fn join(self) -> SearchReport {
        let SearchHandle { receiver, worker, .. } = self;
        // Blocked senders fail once the receiver is gone and stop the search.
        drop(receiver);
        match worker.join() {
            Ok(report) => report,
            Err(payload) => panic::resume_unwind(payload),
        }
    }
}

// --- Admission slots: bound the number of branch tasks ---

struct AdmissionPool {
    free: AtomicUsize,
}

/// Returns its slot to the pool when dropped.
struct Slot<'p> {
    pool: &'p AdmissionPool,
}

impl AdmissionPool {
    fn new(slots: usize) -> Self {
        Self { free: AtomicUsize::new(slots) }
    }

    /// Never waits: `None` means run the branch inline.
    fn try_acquire(&self) -> Option<Slot<'_>> {
        self.free
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .ok()
            .map(|_| Slot { pool: self })
    }
}

impl Drop for Slot<'_> {
    fn drop(&mut self) {
        self.pool.free.fetch_add(1, Ordering::Release);
    }
}

#[derive(Default)]
struct Counters {
    branches: AtomicU64,
    spawned: AtomicU64,
    emitted: AtomicU64,
}

// --- The search itself ---

struct Search<'a> {
    index: &'a WordIndex,
    model: &'a CryptogramModel,
    max_unsolved: usize,
    allow_self_mapping: bool,
    evaluate_partials: bool,
    admission: AdmissionPool,
    cancel: CancelToken,
    counters: Counters,
}

impl<'a> Search<'a> {
    fn run(&self, sender: SyncSender<Solution>) {
        if self.cancel.is_cancelled() {
            return;
        }
        let index: &'a WordIndex = self.index;
        let words = self.ordered_words();
        let Some(first) = words.first() else {
            return;
        };
        let root = Solution::new(self.model.initial_key());

        // Every task spawned below is joined before `scope` returns.
        thread::scope(|scope| {
            for candidate in index.for_pattern(first.pattern) {
                self.fork(scope, &sender, root.clone(), &words, Some(candidate));
            }
            if self.max_unsolved > 0 {
                self.fork(scope, &sender, root, &words, None);
            }
        });
    }

    /// Unique code words, fewest dictionary candidates first. The sort is
    /// stable, so ties keep their order of appearance.
    fn ordered_words(&self) -> Vec<&'a CryptogramWord> {
        let model: &'a CryptogramModel = self.model;
        let mut words: Vec<&'a CryptogramWord> = model.unique_words().collect();
        words.sort_by_key(|w| self.index.candidate_count(w.pattern));
        words
    }

    /// Runs a branch as its own task when a slot is free, inline otherwise.
    fn fork<'scope, 'env>(
        &'env self,
        scope: &'scope Scope<'scope, 'env>,
        sender: &SyncSender<Solution>,
        solution: Solution,
        words: &'env [&'a CryptogramWord],
        candidate: Option<&'a DictionaryWord>,
    ) {
        match self.admission.try_acquire() {
            Some(slot) => {
                self.counters.spawned.fetch_add(1, Ordering::Relaxed);
                let sender = sender.clone();
                scope.spawn(move || {
                    let _slot = slot;
                    self.branch(scope, &sender, solution, words, candidate);
                });
            }
            None => self.branch(scope, sender, solution, words, candidate),
        }
    }

    /// One step of the backtracking search: `words[0]` is resolved with
    /// `candidate` (`None` leaves it unknown), determined followers are
    /// checked, and the search forks over the next undetermined word.
    fn branch<'scope, 'env>(
        &'env self,
        scope: &'scope Scope<'scope, 'env>,
        sender: &SyncSender<Solution>,
        mut solution: Solution,
        words: &'env [&'a CryptogramWord],
        candidate: Option<&'a DictionaryWord>,
    ) {
        self.counters.branches.fetch_add(1, Ordering::Relaxed);
        let index: &'a WordIndex = self.index;
        let Some((head, mut rest)) = words.split_first() else {
            return;
        };

        let mut tried_unknown = false;
        if !solution.try_word(head, candidate, self.allow_self_mapping) {
            if !self.charge_unsolved(&mut solution, sender) {
                return;
            }
            tried_unknown = true;
        }

        // Words whose letters are all assigned need no branching, only a
        // dictionary check.
        while let Some((next, tail)) = rest.split_first() {
            let Some(plain) = solution.key().decode_word(next.bytes()) else {
                break;
            };
            if !index.contains(&plain) && !self.charge_unsolved(&mut solution, sender) {
                return;
            }
            rest = tail;
        }

        let Some(next) = rest.first() else {
            self.emit(sender, solution);
            return;
        };
        if self.cancel.is_cancelled() {
            return;
        }

        for word in index.for_pattern(next.pattern) {
            self.fork(scope, sender, solution.clone(), rest, Some(word));
        }
        if solution.unsolved() < self.max_unsolved && !tried_unknown {
            self.fork(scope, sender, solution, rest, None);
        }
    }

    /// Counts one more unmatched word. Returns `false` when the branch is
    /// over budget and must stop.
    fn charge_unsolved(&self, solution: &mut Solution, sender: &SyncSender<Solution>) -> bool {
        if solution.charge_unsolved() <= self.max_unsolved {
            return true;
        }
        if self.evaluate_partials {
            self.emit(sender, mem::take(solution));
        }
        false
    }

    fn emit(&self, sender: &SyncSender<Solution>, solution: Solution) {
        if self.cancel.is_cancelled() {
            return;
        }
        match sender.send(solution) {
            Ok(()) => {
                self.counters.emitted.fetch_add(1, Ordering::Relaxed);
            }
            // The collector hung up; nobody wants more solutions.
            Err(_) => self.cancel.cancel(),
        }
    }

    fn report(&self) -> SearchReport {
        SearchReport {
            branches: self.counters.branches.load(Ordering::Relaxed),
            spawned: self.counters.spawned.load(Ordering::Relaxed),
            emitted: self.counters.emitted.load(Ordering::Relaxed),
            cancelled: self.cancel.is_cancelled(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::keymap::KeyMap;

    fn solver(pairs: &[(&str, u64)], config: SolverConfig) -> Solver {
        Solver::new(Arc::new(WordIndex::from_pairs(pairs.iter().copied())), config)
    }

    fn collect(handle: SearchHandle, model: &CryptogramModel) -> Vec<String> {
        let mut texts: Vec<String> = handle
            .iter()
            .map(|mut s| {
                s.decode(model);
                s.decoded_text().unwrap_or_default()
            })
            .collect();
        handle.join();
        texts.sort();
        texts
    }

    #[test]
    fn finds_the_only_matching_word() {
        let solver = solver(&[("HELLO", 100), ("WORLD", 90)], SolverConfig::default());
        let model = Arc::new(CryptogramModel::parse("XZYYA"));
        let handle = solver.solve(Arc::clone(&model), 0, CancelToken::new());
        let first = handle.recv().unwrap();
        let key = *first.key();
        assert!(handle.recv().is_none());
        let report = handle.join();

        assert_eq!(key.get(b'X'), Some(b'H'));
        assert_eq!(key.get(b'Z'), Some(b'E'));
        assert_eq!(key.get(b'Y'), Some(b'L'));
        assert_eq!(key.get(b'A'), Some(b'O'));
        assert_eq!(report.emitted, 1);
        assert!(!report.cancelled);
    }

    #[test]
    fn shared_letters_constrain_later_words() {
        let solver = solver(&[("THE", 1000), ("CAT", 300), ("HAT", 200), ("TEA", 50)], SolverConfig::default());
        let model = Arc::new(CryptogramModel::parse("QWE RWE"));
        let texts = collect(solver.solve(Arc::clone(&model), 0, CancelToken::new()), &model);
        assert_eq!(texts, ["CAT HAT", "HAT CAT"]);
    }

    #[test]
    fn unknown_words_need_budget() {
        let solver = solver(&[("HELLO", 100), ("WORLD", 90)], SolverConfig::default());
        let model = Arc::new(CryptogramModel::parse("XZYYA QQQ"));

        let strict = collect(solver.solve(Arc::clone(&model), 0, CancelToken::new()), &model);
        assert!(strict.is_empty());

        let lenient = collect(solver.solve(Arc::clone(&model), 1, CancelToken::new()), &model);
        assert_eq!(lenient, ["HELLO ___"]);
    }

    #[test]
    fn determined_words_are_checked_against_the_dictionary() {
        // Once XZYYA is HELLO, AYX is fully determined as "OLH", which is not a word.
        let pairs = [("HELLO", 100), ("THE", 50), ("CAT", 40)];
        let solver = solver(&pairs, SolverConfig::default());
        let model = Arc::new(CryptogramModel::parse("XZYYA AYX"));
        assert!(collect(solver.solve(Arc::clone(&model), 0, CancelToken::new()), &model).is_empty());
        assert_eq!(
            collect(solver.solve(Arc::clone(&model), 1, CancelToken::new()), &model),
            ["E_HHT THE", "HELLO OLH", "T_AAC CAT"]
        );
    }

    #[test]
    fn partial_solutions_are_reported_when_enabled() {
        let config = SolverConfig { evaluate_partials: true, ..SolverConfig::default() };
        let solver = solver(&[("HELLO", 100), ("THE", 50), ("CAT", 40)], config);
        let model = Arc::new(CryptogramModel::parse("XZYYA AYX"));
        let texts = collect(solver.solve(Arc::clone(&model), 0, CancelToken::new()), &model);
        assert_eq!(texts, ["HELLO OLH"]);
    }

    #[test]
    fn initial_key_restricts_the_search() {
        let solver = solver(&[("CAT", 300), ("HAT", 200), ("BAT", 100)], SolverConfig::default());
        let key = KeyMap::parse_partial("Q=B").unwrap();
        let model = Arc::new(CryptogramModel::parse("QWE").with_initial_key(key));
        assert_eq!(collect(solver.solve(Arc::clone(&model), 0, CancelToken::new()), &model), ["BAT"]);
    }

    #[test]
    fn cancelled_search_emits_nothing() {
        let solver = solver(&[("HELLO", 100)], SolverConfig::default());
        let model = Arc::new(CryptogramModel::parse("XZYYA"));
        let token = CancelToken::new();
        token.cancel();
        let handle = solver.solve(Arc::clone(&model), 0, token);
        assert!(handle.recv().is_none());
        assert!(handle.join().cancelled);
    }

    #[test]
    fn deadline_stops_a_running_search() {
        // Every three-letter word over A–L: far too many branches to finish.
        let letters = b"ABCDEFGHIJKL";
        let mut words = Vec::new();
        for &a in letters {
            for &b in letters {
                for &c in letters {
                    if a != b && b != c && a != c {
                        words.push(String::from_utf8(vec![a, b, c]).unwrap());
                    }
                }
            }
        }
        let index = WordIndex::from_pairs(words.iter().map(|w| (w.as_str(), 1)));
        let solver = Solver::new(Arc::new(index), SolverConfig::default());
        let model = Arc::new(CryptogramModel::parse("ABC DEF GHI JKL MNO PQR"));

        let started = std::time::Instant::now();
        let handle = solver.solve(model, 0, CancelToken::with_timeout(std::time::Duration::from_millis(50)));
        assert_eq!(handle.iter().count(), 0);
        let report = handle.join();

        assert!(report.cancelled);
        assert!(report.branches > 0);
        assert!(started.elapsed() < std::time::Duration::from_secs(30));
    }

    #[test]
    fn slot_count_does_not_change_the_result() {
        let pairs = [("THE", 1000), ("CAT", 300), ("HAT", 200), ("BAT", 150), ("RAT", 120), ("TEA", 50), ("ATE", 40)];
        let model = Arc::new(CryptogramModel::parse("QWE RWE ZWE"));
        let narrow = solver(&pairs, SolverConfig { parallelism: 1, ..SolverConfig::default() });
        let wide = solver(&pairs, SolverConfig { parallelism: 16, ..SolverConfig::default() });

        let a = collect(narrow.solve(Arc::clone(&model), 0, CancelToken::new()), &model);
        let b = collect(wide.solve(Arc::clone(&model), 0, CancelToken::new()), &model);
        assert_eq!(a, b);
        // Four ?AT words in three slots, and R may not decode to itself.
        assert_eq!(a.len(), 18);
    }

    #[test]
    fn admission_slots_are_returned() {
        assert!(AdmissionPool::new(0).try_acquire().is_none());
        let pool = AdmissionPool::new(1);
        let slot = pool.try_acquire();
        assert!(slot.is_some());
        assert!(pool.try_acquire().is_none());
        drop(slot);
        assert!(pool.try_acquire().is_some());
    }

    #[test]
    fn rank_stops_after_max_solutions() {
        let config = SolverConfig { max_solutions: Some(1), top_n: 5, ..SolverConfig::default() };
        let solver = solver(&[("CAT", 300), ("HAT", 200), ("BAT", 100)], config);
        let model = Arc::new(CryptogramModel::parse("QWE"));
        let outcome = solver.rank(model, CancelToken::new());
        assert!(outcome.accepted >= 1);
        assert!(outcome.report.cancelled);
        assert!(!outcome.set.is_empty());
    }

    #[test]
    fn rank_orders_by_word_score() {
        let solver = solver(&[("CAT", 300), ("HAT", 200), ("BAT", 100)], SolverConfig::default());
        let model = Arc::new(CryptogramModel::parse("QWE"));
        let outcome = solver.rank(model, CancelToken::new());
        let texts: Vec<String> = outcome.set.reports().into_iter().map(|r| r.text).collect();
        assert_eq!(texts, ["CAT", "HAT", "BAT"]);
        assert_eq!(outcome.accepted, 3);
        assert_eq!(outcome.report.emitted, 3);
    }
}
