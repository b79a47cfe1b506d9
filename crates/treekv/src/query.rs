//! Partial-key queries.
//!
//! A query is a [`KeyPath`] whose levels may be partial. The engine lists
//! the store below the longest path the query renders to, decodes every
//! child name back into a key, keeps the children consistent with the
//! query, and descends until it reaches files. Each file whose key matches
//! the query is one result.
//!
//! Traversal is depth-first in the store's listing order and driven by an
//! explicit work stack, so a [`Resolve`] iterator only lists a directory
//! when it needs the next result.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use treekv_key::KeyPath;
use treekv_store::path::{file_name, join, normalize};
use treekv_store::{BlobStore, StoreError};

use crate::error::{KvError, KvResult};
use crate::payload::Payload;
use crate::record::Record;

/// What to do with a stored name that does not decode as a key level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedPolicy {
    /// Yield a [`KvError::Key`] in place of that subtree, then carry on with
    /// its siblings.
    #[default]
    Surface,
    /// Log the name at `warn` and leave it out.
    Skip,
}

/// Engine settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub on_malformed: MalformedPolicy,
    /// Treat a listing whose only entry equals the listed path's last
    /// component as a file. Some stores list a file that way instead of
    /// refusing to list it. Only disable this for stores that report
    /// [`StoreError::NotADirectory`].
    pub echo_leaf_detection: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            on_malformed: MalformedPolicy::Surface,
            echo_leaf_detection: true,
        }
    }
}

/// Runs partial-key queries against a store.
#[derive(Clone)]
pub struct QueryEngine {
    store: Arc<dyn BlobStore>,
    config: QueryConfig,
}

impl QueryEngine {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self::with_config(store, QueryConfig::default())
    }

    pub fn with_config(store: Arc<dyn BlobStore>, config: QueryConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn BlobStore> {
        &self.store
    }

    /// Every stored key that matches `query`, lazily.
    ///
    /// Nothing is listed until the iterator is first advanced. Calling
    /// `resolve` again starts a fresh traversal.
    pub fn resolve(&self, query: &KeyPath) -> Resolve {
        Resolve {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
            has_prefix: query.prefix().is_some(),
            query: query.clone(),
            stack: vec![Frame::Visit(query.clone())],
        }
    }

    /// Collect every key matching `query`.
    pub fn keys(&self, query: &KeyPath) -> KvResult<Vec<KeyPath>> {
        self.resolve(query).collect()
    }

    /// Every record matching `query`, each with its payload already read.
    pub fn records<P: Payload>(
        &self,
        query: &KeyPath,
    ) -> impl Iterator<Item = KvResult<Record<P>>> {
        let store = Arc::clone(&self.store);
        self.resolve(query).map(move |key| {
            let mut record = Record::new(key?, Arc::clone(&store));
            record.read()?;
            Ok(record)
        })
    }
}

impl std::fmt::Debug for QueryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

enum Frame {
    /// A key to list: resolved levels found so far over the query's deeper
    /// levels.
    Visit(KeyPath),
    /// A child that failed to decode, reported in listing order.
    Failed(KvError),
}

/// Iterator returned by [`QueryEngine::resolve`].
pub struct Resolve {
    store: Arc<dyn BlobStore>,
    config: QueryConfig,
    has_prefix: bool,
    query: KeyPath,
    stack: Vec<Frame>,
}

impl Resolve {
    /// List one pending key. Returns the key if it turned out to be a
    /// matching file; otherwise pushes its matching children.
    fn visit(&mut self, pending: KeyPath) -> KvResult<Option<KeyPath>> {
        let path = pending.to_path();
        let children = match self.store.list_children(&path) {
            Ok(children) => children,
            Err(StoreError::NotADirectory { path: at }) if same_path(&at, &path) => {
                return self.leaf(&path)
            }
            Err(StoreError::NotADirectory { path: at }) => {
                debug!(path = %path, file = %at, "query path runs through a file");
                return Ok(None);
            }
            Err(StoreError::NotFound { .. }) => {
                debug!(path = %path, "nothing stored under query path");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path, count = children.len(), "listed");

        if self.config.echo_leaf_detection && is_echo(&path, &children) {
            return self.leaf(&path);
        }

        let mut frames = Vec::with_capacity(children.len());
        for child in &children {
            let child_path = join(&path, child);
            match KeyPath::from_path(&child_path, self.has_prefix) {
                Ok(candidate) => {
                    if self.query.matches_resolved(&candidate) {
                        frames.push(Frame::Visit(candidate.overlay(&self.query)));
                    }
                }
                Err(e) => match self.config.on_malformed {
                    MalformedPolicy::Surface => frames.push(Frame::Failed(e.into())),
                    MalformedPolicy::Skip => {
                        warn!(path = %child_path, error = %e, "skipping malformed child")
                    }
                },
            }
        }
        // Reversed so the first listed child is popped first.
        self.stack.extend(frames.into_iter().rev());
        Ok(None)
    }

    fn leaf(&self, path: &str) -> KvResult<Option<KeyPath>> {
        let key = match KeyPath::from_path(path, self.has_prefix) {
            Ok(key) => key,
            Err(e) if self.config.on_malformed == MalformedPolicy::Skip => {
                warn!(path = %path, error = %e, "skipping malformed leaf");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        if self.query.matches(&key) {
            debug!(path = %path, "leaf");
            Ok(Some(key))
        } else {
            Ok(None)
        }
    }
}

impl Iterator for Resolve {
    type Item = KvResult<KeyPath>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(frame) = self.stack.pop() {
            let pending = match frame {
                Frame::Visit(pending) => pending,
                Frame::Failed(err) => return Some(Err(err)),
            };
            match self.visit(pending) {
                Ok(Some(key)) => return Some(Ok(key)),
                Ok(None) => {}
                Err(err) => return Some(Err(err)),
            }
        }
        None
    }
}

impl std::fmt::Debug for Resolve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolve")
            .field("query", &self.query.to_path())
            .field("pending", &self.stack.len())
            .finish_non_exhaustive()
    }
}

fn same_path(a: &str, b: &str) -> bool {
    matches!((normalize(a), normalize(b)), (Ok(a), Ok(b)) if a == b)
}

/// A listing of `path` that holds exactly one entry named like `path`
/// itself.
fn is_echo(path: &str, children: &[String]) -> bool {
    match (children, file_name(path)) {
        ([only], Some(name)) => only == name,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use treekv_key::{FieldMap, Level};
    use treekv_store::{InMemoryBlobStore, StoreResult};

    const B1: &str = "loan/borrower_B1.lender_L1/loan_LN1/payment_P1";
    const B2: &str = "loan/borrower_B2.lender_L1/loan_LN1/payment_P1";

    /// Delegates to an inner store and counts listings.
    struct Counting {
        inner: InMemoryBlobStore,
        listings: AtomicUsize,
    }

    impl Counting {
        fn listings(&self) -> usize {
            self.listings.load(Ordering::SeqCst)
        }
    }

    impl BlobStore for Counting {
        fn mkdir(&self, path: &str) -> StoreResult<()> {
            self.inner.mkdir(path)
        }
        fn exists(&self, path: &str) -> StoreResult<bool> {
            self.inner.exists(path)
        }
        fn read(&self, path: &str) -> StoreResult<Vec<u8>> {
            self.inner.read(path)
        }
        fn write(&self, path: &str, data: &[u8]) -> StoreResult<()> {
            self.inner.write(path, data)
        }
        fn create(&self, path: &str, data: &[u8]) -> StoreResult<()> {
            self.inner.create(path, data)
        }
        fn list_children(&self, path: &str) -> StoreResult<Vec<String>> {
            self.listings.fetch_add(1, Ordering::SeqCst);
            self.inner.list_children(path)
        }
        fn delete(&self, path: &str, recursive: bool) -> StoreResult<()> {
            self.inner.delete(path, recursive)
        }
    }

    /// Lists a file as a directory holding only itself, and lists
    /// directories in reverse name order.
    struct Echoing(InMemoryBlobStore);

    impl BlobStore for Echoing {
        fn mkdir(&self, path: &str) -> StoreResult<()> {
            self.0.mkdir(path)
        }
        fn exists(&self, path: &str) -> StoreResult<bool> {
            self.0.exists(path)
        }
        fn read(&self, path: &str) -> StoreResult<Vec<u8>> {
            self.0.read(path)
        }
        fn write(&self, path: &str, data: &[u8]) -> StoreResult<()> {
            self.0.write(path, data)
        }
        fn create(&self, path: &str, data: &[u8]) -> StoreResult<()> {
            self.0.create(path, data)
        }
        fn list_children(&self, path: &str) -> StoreResult<Vec<String>> {
            match self.0.list_children(path) {
                Err(StoreError::NotADirectory { .. }) => {
                    Ok(file_name(path).map(str::to_string).into_iter().collect())
                }
                Ok(mut names) => {
                    names.reverse();
                    Ok(names)
                }
                Err(e) => Err(e),
            }
        }
        fn delete(&self, path: &str, recursive: bool) -> StoreResult<()> {
            self.0.delete(path, recursive)
        }
    }

    /// Every listing fails.
    struct Unreachable;

    impl BlobStore for Unreachable {
        fn mkdir(&self, _: &str) -> StoreResult<()> {
            Err(StoreError::Backend("connection refused".into()))
        }
        fn exists(&self, _: &str) -> StoreResult<bool> {
            Err(StoreError::Backend("connection refused".into()))
        }
        fn read(&self, _: &str) -> StoreResult<Vec<u8>> {
            Err(StoreError::Backend("connection refused".into()))
        }
        fn write(&self, _: &str, _: &[u8]) -> StoreResult<()> {
            Err(StoreError::Backend("connection refused".into()))
        }
        fn create(&self, _: &str, _: &[u8]) -> StoreResult<()> {
            Err(StoreError::Backend("connection refused".into()))
        }
        fn list_children(&self, _: &str) -> StoreResult<Vec<String>> {
            Err(StoreError::Backend("connection refused".into()))
        }
        fn delete(&self, _: &str, _: bool) -> StoreResult<()> {
            Err(StoreError::Backend("connection refused".into()))
        }
    }

    fn seeded() -> InMemoryBlobStore {
        let store = InMemoryBlobStore::new();
        store.write(B1, b"b1").unwrap();
        store.write(B2, b"b2").unwrap();
        store
    }

    fn fields(pairs: &[(&str, &str)]) -> FieldMap {
        FieldMap::from_pairs(pairs.iter().copied()).unwrap()
    }

    fn loan_query(root: Level) -> KeyPath {
        KeyPath::with_prefix("loan", root).unwrap()
    }

    fn paths(keys: &[KeyPath]) -> Vec<String> {
        keys.iter().map(KeyPath::to_path).collect()
    }

    #[test]
    fn exact_root_selects_one_borrower() {
        let engine = QueryEngine::new(Arc::new(seeded()));
        let query = loan_query(Level::new(fields(&[("borrower", "B1"), ("lender", "L1")])));
        let keys = engine.keys(&query).unwrap();
        assert_eq!(paths(&keys), vec![B1]);
        assert_eq!(keys[0].metadata().get("payment"), Some("P1"));
    }

    #[test]
    fn partial_root_filters_children() {
        let engine = QueryEngine::new(Arc::new(seeded()));

        let by_borrower = loan_query(Level::partial(fields(&[("borrower", "B2")]), 2).unwrap());
        assert_eq!(paths(&engine.keys(&by_borrower).unwrap()), vec![B2]);

        let by_lender = loan_query(Level::partial(fields(&[("lender", "L1")]), 2).unwrap());
        assert_eq!(paths(&engine.keys(&by_lender).unwrap()), vec![B1, B2]);

        let nobody = loan_query(Level::partial(fields(&[("borrower", "B3")]), 2).unwrap());
        assert!(engine.keys(&nobody).unwrap().is_empty());
    }

    #[test]
    fn deeper_query_levels_apply_below_partial_root() {
        let store = seeded();
        store
            .write("loan/borrower_B1.lender_L1/loan_LN2/payment_P1", b"")
            .unwrap();
        store
            .write("loan/borrower_B1.lender_L1/loan_LN2/payment_P2", b"")
            .unwrap();
        let engine = QueryEngine::new(Arc::new(store));

        let query = loan_query(Level::partial(fields(&[("borrower", "B1")]), 2).unwrap())
            .then(Level::new(fields(&[("loan", "LN2")])));
        assert_eq!(
            paths(&engine.keys(&query).unwrap()),
            vec![
                "loan/borrower_B1.lender_L1/loan_LN2/payment_P1",
                "loan/borrower_B1.lender_L1/loan_LN2/payment_P2",
            ]
        );

        let query = loan_query(Level::partial(fields(&[("lender", "L1")]), 2).unwrap())
            .then(Level::any())
            .then(Level::new(fields(&[("payment", "P2")])));
        assert_eq!(
            paths(&engine.keys(&query).unwrap()),
            vec!["loan/borrower_B1.lender_L1/loan_LN2/payment_P2"]
        );
    }

    #[test]
    fn full_key_resolves_to_itself() {
        let engine = QueryEngine::new(Arc::new(seeded()));
        let query = KeyPath::from_path(B2, true).unwrap();
        assert_eq!(engine.keys(&query).unwrap(), vec![query]);
    }

    #[test]
    fn missing_prefix_yields_nothing() {
        let engine = QueryEngine::new(Arc::new(seeded()));
        let query = KeyPath::with_prefix("identity", Level::any()).unwrap();
        assert!(engine.keys(&query).unwrap().is_empty());
    }

    #[test]
    fn query_through_file_finds_nothing() {
        let store = InMemoryBlobStore::new();
        store.write("loan/borrower_B1.lender_L1", b"").unwrap();
        let engine = QueryEngine::new(Arc::new(store));

        let query = loan_query(Level::new(fields(&[("borrower", "B1"), ("lender", "L1")])))
            .then(Level::new(fields(&[("loan", "LN1")])));
        assert!(engine.keys(&query).unwrap().is_empty());
    }

    #[test]
    fn query_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = treekv_store::FsBlobStore::open(dir.path()).unwrap();
        store.write(B1, b"b1").unwrap();
        store.write(B2, b"b2").unwrap();
        // A file where the borrower directory would be.
        store.write("loan/borrower_B3.lender_L1", b"b3").unwrap();
        let engine = QueryEngine::new(Arc::new(store));

        let by_lender = loan_query(Level::partial(fields(&[("lender", "L1")]), 2).unwrap());
        assert_eq!(
            paths(&engine.keys(&by_lender).unwrap()),
            vec![B1, B2, "loan/borrower_B3.lender_L1"]
        );

        // Descending into the file finds nothing rather than failing.
        let by_loan = loan_query(Level::partial(fields(&[("lender", "L1")]), 2).unwrap())
            .then(Level::new(fields(&[("loan", "LN1")])));
        assert_eq!(paths(&engine.keys(&by_loan).unwrap()), vec![B1, B2]);

        let records: Vec<Record<String>> = engine
            .records::<String>(&by_loan)
            .collect::<KvResult<_>>()
            .unwrap();
        assert_eq!(records[1].payload(), "b2");
    }

    #[test]
    fn unprefixed_query_lists_store_root() {
        let store = InMemoryBlobStore::new();
        store.write("tenant_T1/doc_D1", b"").unwrap();
        store.write("tenant_T2/doc_D1", b"").unwrap();
        let engine = QueryEngine::new(Arc::new(store));

        let query = KeyPath::new(Level::any()).then(Level::new(fields(&[("doc", "D1")])));
        assert_eq!(
            paths(&engine.keys(&query).unwrap()),
            vec!["tenant_T1/doc_D1", "tenant_T2/doc_D1"]
        );
    }

    #[test]
    fn echoed_leaf_and_listing_order() {
        let engine = QueryEngine::new(Arc::new(Echoing(seeded())));
        let query = loan_query(Level::partial(fields(&[("lender", "L1")]), 2).unwrap());
        // The echoing store lists in reverse, and results follow its order.
        assert_eq!(paths(&engine.keys(&query).unwrap()), vec![B2, B1]);
    }

    #[test]
    fn lazy_and_restartable() {
        let inner = InMemoryBlobStore::new();
        for borrower in ["B1", "B2", "B3"] {
            for loan in ["LN1", "LN2"] {
                inner
                    .write(
                        &format!("loan/borrower_{borrower}.lender_L1/loan_{loan}/payment_P1"),
                        b"",
                    )
                    .unwrap();
            }
        }
        let store = Arc::new(Counting {
            inner,
            listings: AtomicUsize::new(0),
        });
        let engine = QueryEngine::new(store.clone());
        let query = loan_query(Level::partial(fields(&[("lender", "L1")]), 2).unwrap());

        let mut results = engine.resolve(&query);
        assert_eq!(store.listings(), 0);

        let first = results.next().unwrap().unwrap();
        assert_eq!(first.to_path(), "loan/borrower_B1.lender_L1/loan_LN1/payment_P1");
        // loan/, the borrower directory, the loan directory, the file.
        assert_eq!(store.listings(), 4);
        drop(results);
        assert_eq!(store.listings(), 4);

        assert_eq!(engine.keys(&query).unwrap().len(), 6);
        assert_eq!(engine.keys(&query).unwrap().len(), 6);
    }

    #[test]
    fn malformed_child_is_surfaced_in_place() {
        let store = seeded();
        store.write("loan/garbage", b"").unwrap();
        let engine = QueryEngine::new(Arc::new(store));
        let query = loan_query(Level::partial(fields(&[("lender", "L1")]), 2).unwrap());

        let results: Vec<_> = engine.resolve(&query).collect();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().to_path(), B1);
        assert_eq!(results[1].as_ref().unwrap().to_path(), B2);
        match &results[2] {
            Err(KvError::Key(treekv_key::KeyError::Parse { path, prefix, .. })) => {
                assert_eq!(path, "loan/garbage");
                assert_eq!(prefix.as_deref(), Some("loan"));
            }
            other => panic!("expected parse error, got: {other:?}"),
        }
        assert!(engine.keys(&query).is_err());
    }

    #[test]
    fn malformed_child_can_be_skipped() {
        let store = seeded();
        store.write("loan/garbage", b"").unwrap();
        store.write("loan/borrower_B1.lender_L1/notes", b"").unwrap();
        let config = QueryConfig {
            on_malformed: MalformedPolicy::Skip,
            ..QueryConfig::default()
        };
        let engine = QueryEngine::with_config(Arc::new(store), config);
        let query = loan_query(Level::partial(fields(&[("lender", "L1")]), 2).unwrap());
        assert_eq!(paths(&engine.keys(&query).unwrap()), vec![B1, B2]);
    }

    #[test]
    fn store_errors_pass_through() {
        let engine = QueryEngine::new(Arc::new(Unreachable));
        let query = loan_query(Level::any());
        match engine.keys(&query) {
            Err(KvError::Store(StoreError::Backend(msg))) => assert_eq!(msg, "connection refused"),
            other => panic!("expected backend error, got: {other:?}"),
        }
    }

    #[test]
    fn records_are_read() {
        let engine = QueryEngine::new(Arc::new(seeded()));
        let query = loan_query(Level::partial(fields(&[("lender", "L1")]), 2).unwrap());
        let records: Vec<Record<String>> = engine
            .records::<String>(&query)
            .collect::<KvResult<_>>()
            .unwrap();
        let payloads: Vec<&str> = records.iter().map(|r| r.payload().as_str()).collect();
        assert_eq!(payloads, vec!["b1", "b2"]);
    }

    #[test]
    fn config_from_json() {
        let config: QueryConfig = serde_json::from_str(r#"{"on_malformed":"skip"}"#).unwrap();
        assert_eq!(config.on_malformed, MalformedPolicy::Skip);
        assert!(config.echo_leaf_detection);
    }
}
