//! The cart store.
//!
//! [`CartStore`] owns the live cart. Every mutation runs the same pipeline:
//!
//! 1. compute the next snapshot from the current one (pure, in `core`)
//! 2. swap it in, so `snapshot()` sees it immediately
//! 3. hand it to the background writer
//! 4. call every subscriber, synchronously, with the new snapshot
//!
//! Mutations that match no line change nothing, so they skip steps 2-4.
//!
//! A store only exists once [`CartStore::open`] has restored the persisted
//! cart, so there is no way to reach the cart before it is initialised.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use go_marketplace_core::{CartSnapshot, CartSummary, NewLineItem, ProductId};
use tracing::{debug, info, instrument, warn};

use crate::codec;
use crate::config::{CartConfig, DEFAULT_STORAGE_KEY, StorageBackend};
use crate::error::{CartError, Result};
use crate::persist::PersistWriter;
use crate::storage::{FileStore, KeyValueStore};

/// What to do when the persisted cart cannot be read or decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestorePolicy {
    /// Log a warning and start with an empty cart.
    #[default]
    Discard,
    /// Fail [`CartStore::open`] with the underlying error.
    Strict,
}

/// Options for opening a [`CartStore`].
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Key the snapshot is stored under.
    pub key: String,
    /// Handling of unreadable persisted data.
    pub restore_policy: RestorePolicy,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            key: DEFAULT_STORAGE_KEY.to_string(),
            restore_policy: RestorePolicy::default(),
        }
    }
}

/// Identifies a registered subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

type Observer = Arc<dyn Fn(&Arc<CartSnapshot>) + Send + Sync>;

/// The cart store.
///
/// Cheaply cloneable via `Arc`; clones share the same cart.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

struct CartStoreInner {
    key: String,
    storage: Arc<dyn KeyValueStore>,
    restore_policy: RestorePolicy,
    /// Held while a mutation swaps and submits; guards the current revision.
    revision: Mutex<u64>,
    current: RwLock<Arc<CartSnapshot>>,
    observers: RwLock<Vec<(Subscription, Observer)>>,
    next_subscription: AtomicU64,
    writer: PersistWriter,
}

impl fmt::Debug for CartStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartStore")
            .field("key", &self.inner.key)
            .field("lines", &self.snapshot().len())
            .finish_non_exhaustive()
    }
}

impl CartStore {
    /// Open a store, restoring the cart persisted under `options.key`.
    ///
    /// Missing data yields an empty cart. Unreadable data is handled
    /// according to `options.restore_policy`.
    ///
    /// Must be called within a Tokio runtime; the background writer is
    /// spawned here.
    ///
    /// # Errors
    ///
    /// With [`RestorePolicy::Strict`], returns `CartError::Storage` or
    /// `CartError::Codec` if the persisted cart cannot be read.
    #[instrument(skip(storage, options), fields(key = %options.key))]
    pub async fn open(storage: Arc<dyn KeyValueStore>, options: StoreOptions) -> Result<Self> {
        let snapshot =
            restore(storage.as_ref(), &options.key, options.restore_policy).await?;
        info!(lines = snapshot.len(), "Cart restored");

        let writer = PersistWriter::spawn(Arc::clone(&storage), options.key.clone(), 0);

        Ok(Self {
            inner: Arc::new(CartStoreInner {
                key: options.key,
                storage,
                restore_policy: options.restore_policy,
                revision: Mutex::new(0),
                current: RwLock::new(Arc::new(snapshot)),
                observers: RwLock::new(Vec::new()),
                next_subscription: AtomicU64::new(0),
                writer,
            }),
        })
    }

    /// Open a store over the backend named in `config`.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the backend cannot be reached, or any
    /// error [`open`](Self::open) returns.
    pub async fn from_config(config: &CartConfig) -> Result<Self> {
        let storage = connect(&config.backend).await?;
        Self::open(
            storage,
            StoreOptions {
                key: config.storage_key.clone(),
                restore_policy: config.restore_policy,
            },
        )
        .await
    }

    /// The current cart.
    ///
    /// Reflects every mutation that has returned, whether or not it has been
    /// persisted yet.
    #[must_use]
    pub fn snapshot(&self) -> Arc<CartSnapshot> {
        Arc::clone(
            &self
                .inner
                .current
                .read()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }

    /// Item count and subtotal of the current cart.
    #[must_use]
    pub fn summary(&self) -> CartSummary {
        CartSummary::from(&*self.snapshot())
    }

    /// The key the cart is persisted under.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.inner.key
    }

    /// Add one unit of `candidate`, merging with an existing line for the
    /// same product.
    #[instrument(skip(self, candidate), fields(product_id = %candidate.id))]
    pub fn add_to_cart(&self, candidate: NewLineItem) {
        self.apply("add_to_cart", |cart| Some(cart.with_added(candidate)));
    }

    /// Add one unit to the line for `id`. No-op if the product is not in the
    /// cart.
    #[instrument(skip(self, id), fields(product_id = %id))]
    pub fn increment(&self, id: &ProductId) {
        self.apply("increment", |cart| cart.with_incremented(id));
    }

    /// Take one unit off the line for `id`, removing the line when it reaches
    /// zero. No-op if the product is not in the cart.
    #[instrument(skip(self, id), fields(product_id = %id))]
    pub fn decrement(&self, id: &ProductId) {
        self.apply("decrement", |cart| cart.with_decremented(id));
    }

    /// Set the quantity of the line for `id`; zero removes the line. No-op if
    /// the product is not in the cart.
    #[instrument(skip(self, id), fields(product_id = %id))]
    pub fn set_quantity(&self, id: &ProductId, quantity: u32) {
        self.apply("set_quantity", |cart| cart.with_quantity(id, quantity));
    }

    /// Remove the line for `id` whatever its quantity. No-op if the product
    /// is not in the cart.
    #[instrument(skip(self, id), fields(product_id = %id))]
    pub fn remove(&self, id: &ProductId) {
        self.apply("remove", |cart| cart.with_removed(id));
    }

    /// Empty the cart.
    #[instrument(skip(self))]
    pub fn clear(&self) {
        self.apply("clear", |cart| {
            (!cart.is_empty()).then(CartSnapshot::empty)
        });
    }

    /// Register `observer` to be called with every new snapshot.
    ///
    /// Observers run synchronously on the mutating thread, in registration
    /// order, before the mutation returns. An observer may mutate the store;
    /// the nested change is published before the outer call returns. A
    /// panicking observer is logged and skipped.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&Arc<CartSnapshot>) + Send + Sync + 'static,
    {
        let subscription =
            Subscription(self.inner.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.inner
            .observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((subscription, Arc::new(observer)));
        debug!(subscription = subscription.0, "Subscriber registered");
        subscription
    }

    /// Remove a subscriber. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        let mut observers = self
            .inner
            .observers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = observers.len();
        observers.retain(|(id, _)| *id != subscription);
        observers.len() != before
    }

    /// Wait until the cart as of this call has been written to storage.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Persist` if the latest write attempt failed, or
    /// `CartError::WriterStopped` after [`shutdown`](Self::shutdown).
    pub async fn flush(&self) -> Result<()> {
        self.inner.writer.wait_for(self.revision()).await
    }

    /// Replace the in-memory cart with the persisted one.
    ///
    /// Pending writes are flushed first so the reload cannot observe an older
    /// cart than this store last published. Subscribers are notified if the
    /// persisted cart differs from the current one. If the cart is mutated
    /// while the read is in flight, the in-memory cart is kept.
    ///
    /// # Errors
    ///
    /// Returns any error [`flush`](Self::flush) returns, or a read/decode
    /// error under [`RestorePolicy::Strict`].
    #[instrument(skip(self), fields(key = %self.inner.key))]
    pub async fn reload(&self) -> Result<()> {
        let base = self.revision();
        self.inner.writer.wait_for(base).await?;
        let restored = restore(
            self.inner.storage.as_ref(),
            &self.inner.key,
            self.inner.restore_policy,
        )
        .await?;

        self.publish("reload", Some(base), |cart| {
            (*cart != restored).then_some(restored)
        });
        Ok(())
    }

    /// Flush pending writes and stop the background writer.
    ///
    /// Mutations after shutdown still update memory and notify subscribers,
    /// but are no longer persisted.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Persist` if the final write failed.
    pub async fn shutdown(&self) -> Result<()> {
        let flushed = self.flush().await;
        self.inner.writer.stop().await;
        flushed
    }

    fn revision(&self) -> u64 {
        *self
            .inner
            .revision
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn apply(&self, operation: &str, f: impl FnOnce(&CartSnapshot) -> Option<CartSnapshot>) {
        self.publish(operation, None, f);
    }

    /// Swap in `f`'s result, submit it, then notify.
    ///
    /// With `base` set, nothing happens unless the cart is still at that
    /// revision.
    fn publish(
        &self,
        operation: &str,
        base: Option<u64>,
        f: impl FnOnce(&CartSnapshot) -> Option<CartSnapshot>,
    ) {
        let next = {
            let mut revision = self
                .inner
                .revision
                .lock()
                .unwrap_or_else(PoisonError::into_inner);

            if let Some(base) = base.filter(|base| *base != *revision) {
                debug!(
                    operation,
                    base,
                    revision = *revision,
                    "Cart changed meanwhile, keeping it"
                );
                return;
            }

            let current = self.snapshot();
            let Some(next) = f(&current) else {
                debug!(operation, "No matching line, cart unchanged");
                return;
            };

            *revision += 1;
            let next = Arc::new(next);
            *self
                .inner
                .current
                .write()
                .unwrap_or_else(PoisonError::into_inner) = Arc::clone(&next);
            debug!(operation, revision = *revision, lines = next.len(), "Cart updated");

            self.inner.writer.submit(*revision, Arc::clone(&next));
            next
        };

        self.notify(&next);
    }

    fn notify(&self, snapshot: &Arc<CartSnapshot>) {
        // Clone the list so observers may (un)subscribe while being called.
        let observers: Vec<(Subscription, Observer)> = self
            .inner
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(subscription, observer)| (*subscription, Arc::clone(observer)))
            .collect();

        for (subscription, observer) in observers {
            if catch_unwind(AssertUnwindSafe(|| observer(snapshot))).is_err() {
                warn!(subscription = subscription.0, "Cart subscriber panicked");
            }
        }
    }
}

/// Read and decode the persisted cart, applying `policy` to failures.
async fn restore(
    storage: &dyn KeyValueStore,
    key: &str,
    policy: RestorePolicy,
) -> Result<CartSnapshot> {
    let decoded = match storage.get(key).await {
        Ok(None) => return Ok(CartSnapshot::empty()),
        Ok(Some(blob)) => codec::decode(&blob).map_err(CartError::from),
        Err(e) => Err(CartError::from(e)),
    };

    match (decoded, policy) {
        (Ok(snapshot), _) => Ok(snapshot),
        (Err(e), RestorePolicy::Strict) => Err(e),
        (Err(e), RestorePolicy::Discard) => {
            warn!(key, error = %e, "Could not restore cart, starting empty");
            Ok(CartSnapshot::empty())
        }
    }
}

/// Build the storage backend named by `backend`.
#[cfg_attr(not(feature = "postgres"), allow(clippy::unused_async))]
async fn connect(backend: &StorageBackend) -> Result<Arc<dyn KeyValueStore>> {
    match backend {
        StorageBackend::File { dir } => Ok(Arc::new(FileStore::new(dir.clone()))),
        #[cfg(feature = "postgres")]
        StorageBackend::Postgres { database_url } => {
            let pool = crate::storage::create_pool(database_url).await?;
            Ok(Arc::new(crate::storage::PgStore::new(pool)))
        }
        #[cfg(not(feature = "postgres"))]
        StorageBackend::Postgres { .. } => Err(crate::config::ConfigError::InvalidEnvVar(
            "CART_STORAGE_BACKEND".to_string(),
            "postgres support is not compiled in (enable the `postgres` feature)".to_string(),
        )
        .into()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use std::time::Duration;

    use async_trait::async_trait;
    use go_marketplace_core::Price;
    use tokio::sync::Notify;

    use super::*;
    use crate::error::StorageError;
    use crate::storage::MemoryStore;

    const KEY: &str = DEFAULT_STORAGE_KEY;

    fn id(s: &str) -> ProductId {
        ProductId::parse(s).unwrap()
    }

    fn candidate(s: &str, cents: u32) -> NewLineItem {
        NewLineItem::new(id(s), format!("Product {s}"), "u", Price::from_cents(cents))
    }

    async fn open(storage: &MemoryStore) -> CartStore {
        CartStore::open(Arc::new(storage.clone()), StoreOptions::default())
            .await
            .unwrap()
    }

    fn persisted(storage: &MemoryStore) -> CartSnapshot {
        codec::decode(&storage.peek(KEY).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_open_without_data_is_empty() {
        let storage = MemoryStore::new();
        let store = open(&storage).await;
        assert!(store.snapshot().is_empty());
        assert_eq!(store.key(), KEY);
        assert_eq!(storage.write_count(), 0);
    }

    #[tokio::test]
    async fn test_mutation_visible_before_persisted() {
        let storage = MemoryStore::new();
        let store = open(&storage).await;

        store.add_to_cart(candidate("a", 1000));
        assert_eq!(store.snapshot().items()[0].quantity, 1);

        store.flush().await.unwrap();
        assert_eq!(persisted(&storage), *store.snapshot());
    }

    #[tokio::test]
    async fn test_persisted_state_is_post_mutation() {
        let storage = MemoryStore::new();
        let store = open(&storage).await;

        store.add_to_cart(candidate("a", 1000));
        store.flush().await.unwrap();
        store.add_to_cart(candidate("a", 1000));
        store.flush().await.unwrap();

        let stored = persisted(&storage);
        assert_eq!(stored.items()[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_rapid_mutations_converge_on_latest() {
        let storage = MemoryStore::new();
        let store = open(&storage).await;

        for _ in 0..50 {
            store.add_to_cart(candidate("a", 100));
            store.add_to_cart(candidate("b", 100));
        }
        store.decrement(&id("b"));
        store.flush().await.unwrap();

        assert_eq!(persisted(&storage), *store.snapshot());
        assert_eq!(store.summary().item_count, 99);
    }

    #[tokio::test]
    async fn test_subscribers_notified_synchronously() {
        let store = open(&MemoryStore::new()).await;
        let seen: Arc<Mutex<Vec<u64>>> = Arc::default();

        let sink = Arc::clone(&seen);
        store.subscribe(move |cart| {
            sink.lock()
                .unwrap()
                .push(go_marketplace_core::total_quantity(&**cart));
        });

        store.add_to_cart(candidate("a", 100));
        assert_eq!(*seen.lock().unwrap(), vec![1]);
        store.increment(&id("a"));
        store.decrement(&id("a"));
        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 1]);
    }

    #[tokio::test]
    async fn test_subscriber_sees_published_snapshot() {
        let store = open(&MemoryStore::new()).await;
        let reader = store.clone();
        let matched = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&matched);
        store.subscribe(move |cart| {
            if Arc::ptr_eq(cart, &reader.snapshot()) {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        store.add_to_cart(candidate("a", 100));
        store.add_to_cart(candidate("b", 100));
        assert_eq!(matched.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_miss_does_not_notify_or_persist() {
        let storage = MemoryStore::new();
        let store = open(&storage).await;
        store.add_to_cart(candidate("a", 100));
        store.flush().await.unwrap();
        let writes = storage.write_count();

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        store.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let before = store.snapshot();
        store.increment(&id("missing"));
        store.decrement(&id("missing"));
        store.remove(&id("missing"));
        store.set_quantity(&id("missing"), 3);
        store.flush().await.unwrap();

        assert!(Arc::ptr_eq(&before, &store.snapshot()));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(storage.write_count(), writes);
    }

    #[tokio::test]
    async fn test_unsubscribe() {
        let store = open(&MemoryStore::new()).await;
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let subscription = store.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        store.add_to_cart(candidate("a", 100));
        assert!(store.unsubscribe(subscription));
        assert!(!store.unsubscribe(subscription));
        store.add_to_cart(candidate("a", 100));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_remove_set_quantity_and_clear() {
        let storage = MemoryStore::new();
        let store = open(&storage).await;
        store.add_to_cart(candidate("a", 100));
        store.add_to_cart(candidate("b", 250));

        store.set_quantity(&id("b"), 4);
        assert_eq!(store.summary().subtotal, Price::from_cents(1100));

        store.remove(&id("a"));
        assert_eq!(store.snapshot().len(), 1);

        store.clear();
        assert!(store.snapshot().is_empty());
        store.flush().await.unwrap();
        assert!(persisted(&storage).is_empty());
    }

    #[tokio::test]
    async fn test_restore_existing_cart() {
        let blob = r#"[{"id":"a","title":"Shirt","image_url":"u","price":10,"quantity":2}]"#;
        let storage = MemoryStore::with_entry(KEY, blob);
        let store = open(&storage).await;

        let cart = store.snapshot();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.items()[0].quantity, 2);
        assert_eq!(cart.items()[0].title, "Shirt");
    }

    #[tokio::test]
    async fn test_restore_malformed_discards_by_default() {
        let storage = MemoryStore::with_entry(KEY, "{not json");
        let store = open(&storage).await;
        assert!(store.snapshot().is_empty());
        // The bad blob is left alone until the next mutation.
        assert_eq!(storage.peek(KEY).as_deref(), Some("{not json"));
    }

    #[tokio::test]
    async fn test_restore_malformed_strict_fails() {
        let storage = MemoryStore::with_entry(KEY, "{not json");
        let result = CartStore::open(
            Arc::new(storage),
            StoreOptions {
                restore_policy: RestorePolicy::Strict,
                ..StoreOptions::default()
            },
        )
        .await;
        assert!(matches!(result, Err(CartError::Codec(_))));
    }

    #[tokio::test]
    async fn test_write_failure_keeps_memory_state() {
        let storage = MemoryStore::new();
        storage.fail_writes(true);
        let store = open(&storage).await;

        store.add_to_cart(candidate("a", 100));
        assert_eq!(store.snapshot().len(), 1);
        assert!(matches!(
            store.flush().await,
            Err(CartError::Persist { revision: 1, .. })
        ));
        assert_eq!(store.snapshot().len(), 1);

        storage.fail_writes(false);
        store.increment(&id("a"));
        store.flush().await.unwrap();
        assert_eq!(persisted(&storage).items()[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_reload_picks_up_external_changes() {
        let storage = MemoryStore::new();
        let store = open(&storage).await;
        store.add_to_cart(candidate("a", 100));
        store.flush().await.unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        store.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        // Unchanged storage: nothing to publish.
        store.reload().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let other = open(&storage).await;
        other.add_to_cart(candidate("b", 100));
        other.shutdown().await.unwrap();

        store.reload().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.snapshot().len(), 2);
    }

    #[tokio::test]
    async fn test_shutdown_flushes_and_stops_writer() {
        let storage = MemoryStore::new();
        let store = open(&storage).await;
        store.add_to_cart(candidate("a", 100));
        store.shutdown().await.unwrap();
        assert_eq!(persisted(&storage).len(), 1);

        store.add_to_cart(candidate("b", 100));
        assert_eq!(store.snapshot().len(), 2);
        assert!(matches!(store.flush().await, Err(CartError::WriterStopped)));
    }

    #[tokio::test]
    async fn test_panicking_subscriber_does_not_stall_persistence() {
        let storage = MemoryStore::new();
        let store = open(&storage).await;
        let later = Arc::new(AtomicUsize::new(0));

        store.subscribe(|_| panic!("subscriber failed"));
        let counter = Arc::clone(&later);
        store.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        store.add_to_cart(candidate("a", 100));
        assert_eq!(later.load(Ordering::SeqCst), 1);

        tokio::time::timeout(Duration::from_secs(2), store.flush())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(persisted(&storage).len(), 1);
    }

    #[tokio::test]
    async fn test_subscriber_may_mutate_store() {
        let storage = MemoryStore::new();
        let store = open(&storage).await;

        let inner = store.clone();
        store.subscribe(move |cart| {
            if let Some(line) = cart.get(&id("a")) {
                if line.quantity < 3 {
                    inner.increment(&id("a"));
                }
            }
        });

        store.add_to_cart(candidate("a", 100));
        assert_eq!(store.snapshot().items()[0].quantity, 3);

        tokio::time::timeout(Duration::from_secs(2), store.flush())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(persisted(&storage).items()[0].quantity, 3);
    }

    /// Storage whose reads can be held open until released.
    #[derive(Clone)]
    struct HeldReads {
        inner: MemoryStore,
        hold: Arc<AtomicBool>,
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl KeyValueStore for HeldReads {
        async fn get(&self, key: &str) -> std::result::Result<Option<String>, StorageError> {
            if self.hold.load(Ordering::SeqCst) {
                self.entered.notify_one();
                self.release.notified().await;
            }
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> std::result::Result<(), StorageError> {
            self.inner.set(key, value).await
        }
    }

    #[tokio::test]
    async fn test_reload_keeps_mutation_made_during_read() {
        let memory = MemoryStore::new();
        let storage = HeldReads {
            inner: memory.clone(),
            hold: Arc::default(),
            entered: Arc::default(),
            release: Arc::default(),
        };
        let store = CartStore::open(Arc::new(storage.clone()), StoreOptions::default())
            .await
            .unwrap();
        store.add_to_cart(candidate("a", 100));
        store.flush().await.unwrap();

        memory.fail_writes(true);
        storage.hold.store(true, Ordering::SeqCst);
        let reloading = tokio::spawn({
            let store = store.clone();
            async move { store.reload().await }
        });

        storage.entered.notified().await;
        store.add_to_cart(candidate("b", 100));
        storage.release.notify_one();
        reloading.await.unwrap().unwrap();

        let cart = store.snapshot();
        let ids: Vec<&str> = cart.items().iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(persisted(&memory).len(), 1);
    }
}
