use std::sync::Arc;

use connector_core::{DiffSource, SnapshotSource};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use metrics::{create_metrics, SharedMetrics};
use orderbook::{DepthCache, PriceLevel};
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::SyncConfig;
use crate::events::SyncEvent;
use crate::worker::SymbolWorker;

pub(crate) type SharedCache = Arc<RwLock<DepthCache>>;

struct SymbolEntry {
    cache: SharedCache,
    task: JoinHandle<()>,
}

/// Keeps one [`DepthCache`] per tracked symbol in sync with the exchange.
///
/// Every tracked symbol gets its own task that alone mutates that symbol's
/// cache. Reads take a short read lock and return copies, so callers never
/// observe a half-applied event.
///
/// Instances are independent; dropping one stops all of its tasks.
pub struct DepthCacheManager<S, D> {
    snapshot_source: Arc<S>,
    diff_source: Arc<D>,
    config: SyncConfig,
    symbols: DashMap<String, SymbolEntry>,
    events: broadcast::Sender<SyncEvent>,
    metrics: SharedMetrics,
}

impl<S: SnapshotSource, D: DiffSource> DepthCacheManager<S, D> {
    pub fn new(snapshot_source: S, diff_source: D) -> Self {
        Self::with_config(snapshot_source, diff_source, SyncConfig::default())
    }

    pub fn with_config(snapshot_source: S, diff_source: D, config: SyncConfig) -> Self {
        Self::from_shared(Arc::new(snapshot_source), Arc::new(diff_source), config)
    }

    /// Build from sources that are also used elsewhere.
    pub fn from_shared(snapshot_source: Arc<S>, diff_source: Arc<D>, config: SyncConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_channel_capacity.max(1));
        Self {
            snapshot_source,
            diff_source,
            config,
            symbols: DashMap::new(),
            events,
            metrics: create_metrics(),
        }
    }

    /// Record counters into `metrics` instead of a private collector.
    pub fn with_metrics(mut self, metrics: SharedMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &SharedMetrics {
        &self.metrics
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Start keeping the given symbols in sync.
    ///
    /// Each symbol reads as an empty cache right away and fills once its
    /// snapshot lands. A symbol that is already syncing is left alone; one
    /// whose task has stopped is restarted on top of its last cache state.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start_tracking<I, T>(&self, symbols: I)
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        for symbol in symbols {
            let symbol = normalize(symbol.as_ref());

            match self.symbols.entry(symbol.clone()) {
                Entry::Occupied(mut occupied) => {
                    if occupied.get().task.is_finished() {
                        info!(symbol = %symbol, "Restarting depth cache synchronization");
                        let cache = occupied.get().cache.clone();
                        occupied.get_mut().task = self.spawn_worker(symbol, cache);
                    } else {
                        debug!(symbol = %symbol, "Symbol already tracked");
                    }
                }
                Entry::Vacant(vacant) => {
                    info!(symbol = %symbol, "Tracking depth cache");
                    let cache: SharedCache = Arc::new(RwLock::new(DepthCache::new()));
                    let task = self.spawn_worker(symbol, cache.clone());
                    vacant.insert(SymbolEntry { cache, task });
                }
            }
        }
    }

    /// Stop tracking `symbol` and discard its cache.
    ///
    /// Pending snapshot requests, buffered events and the diff subscription
    /// are dropped with the task. Returns whether the symbol was tracked.
    pub fn stop_tracking(&self, symbol: &str) -> bool {
        match self.symbols.remove(&normalize(symbol)) {
            Some((symbol, entry)) => {
                if !entry.task.is_finished() {
                    self.metrics.inc_subscriptions_closed();
                }
                entry.task.abort();
                info!(symbol = %symbol, "Stopped tracking depth cache");
                true
            }
            None => false,
        }
    }

    /// Stop every tracked symbol.
    pub fn stop_all(&self) {
        for symbol in self.tracked_symbols() {
            self.stop_tracking(&symbol);
        }
    }

    pub fn is_tracking(&self, symbol: &str) -> bool {
        self.symbols.contains_key(&normalize(symbol))
    }

    /// Tracked symbols in alphabetical order.
    pub fn tracked_symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.symbols.iter().map(|e| e.key().clone()).collect();
        symbols.sort();
        symbols
    }

    /// Whether the task of a tracked symbol is still running.
    pub fn is_syncing(&self, symbol: &str) -> bool {
        self.symbols
            .get(&normalize(symbol))
            .map(|entry| !entry.task.is_finished())
            .unwrap_or(false)
    }

    /// Copy of the symbol's cache; empty when the symbol is not tracked.
    pub fn get_cache(&self, symbol: &str) -> DepthCache {
        self.read(symbol, DepthCache::clone).unwrap_or_default()
    }

    /// Bids best first; empty when the symbol is not tracked.
    pub fn sorted_bids(&self, symbol: &str) -> Vec<PriceLevel> {
        self.read(symbol, DepthCache::sorted_bids).unwrap_or_default()
    }

    /// Asks best first; empty when the symbol is not tracked.
    pub fn sorted_asks(&self, symbol: &str) -> Vec<PriceLevel> {
        self.read(symbol, DepthCache::sorted_asks).unwrap_or_default()
    }

    pub fn best_bid(&self, symbol: &str) -> Option<PriceLevel> {
        self.read(symbol, DepthCache::best_bid).flatten()
    }

    pub fn best_ask(&self, symbol: &str) -> Option<PriceLevel> {
        self.read(symbol, DepthCache::best_ask).flatten()
    }

    /// Receive [`SyncEvent`]s for every tracked symbol.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    fn read<R>(&self, symbol: &str, f: impl FnOnce(&DepthCache) -> R) -> Option<R> {
        let cache = self.symbols.get(&normalize(symbol))?.cache.clone();
        let guard = cache.read();
        Some(f(&guard))
    }

    fn spawn_worker(&self, symbol: String, cache: SharedCache) -> JoinHandle<()> {
        let worker = SymbolWorker {
            symbol,
            snapshot_source: self.snapshot_source.clone(),
            diff_source: self.diff_source.clone(),
            cache,
            config: self.config.clone(),
            events: self.events.clone(),
            metrics: self.metrics.clone(),
        };
        tokio::spawn(worker.run())
    }
}

impl<S, D> Drop for DepthCacheManager<S, D> {
    fn drop(&mut self) {
        for entry in self.symbols.iter() {
            entry.task.abort();
        }
    }
}

impl<S, D> std::fmt::Debug for DepthCacheManager<S, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut symbols: Vec<String> = self.symbols.iter().map(|e| e.key().clone()).collect();
        symbols.sort();
        f.debug_struct("DepthCacheManager")
            .field("symbols", &symbols)
            .field("config", &self.config)
            .finish()
    }
}

/// Exchange symbols are upper case; accept any case from callers.
fn normalize(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}
