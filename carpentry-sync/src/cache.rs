//! Build cache
//!
//! In-memory, two-level store: builders, and for each builder a bucket of
//! builds keyed by build id. Views only read from it; pollers and mutating
//! operations write to it.
//!
//! Writes are ordered by [`FetchTicket`]s. A ticket is issued when a request
//! is *initiated*; a response only lands if its ticket is newer than whatever
//! the entry already reflects, so a slow response can never overwrite the
//! result of a request that started after it.

use carpentry_core::domain::build::Build;
use carpentry_core::domain::builder::Builder;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

/// Position of a request in initiation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FetchTicket(u64);

/// One cached build slot
///
/// `snapshot` is `None` for a placeholder created by `get_or_create_build`
/// before anything was fetched. A fetched build with empty output is
/// `Some(build)` with `build.stdout == ""`.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedBuild {
    pub builder_id: Uuid,
    pub build_id: Uuid,
    pub snapshot: Option<Build>,
    applied: u64,
}

impl CachedBuild {
    fn placeholder(builder_id: Uuid, build_id: Uuid) -> Self {
        Self {
            builder_id,
            build_id,
            snapshot: None,
            applied: 0,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.snapshot.is_none()
    }
}

/// All cached builds of one builder
#[derive(Debug, Clone, PartialEq)]
pub struct BuilderBucket {
    pub builder_id: Uuid,
    builds: BTreeMap<Uuid, CachedBuild>,
}

impl BuilderBucket {
    fn empty(builder_id: Uuid) -> Self {
        Self {
            builder_id,
            builds: BTreeMap::new(),
        }
    }

    pub fn get(&self, build_id: Uuid) -> Option<&CachedBuild> {
        self.builds.get(&build_id)
    }

    /// Fetched builds, skipping placeholders
    pub fn builds(&self) -> impl Iterator<Item = &Build> {
        self.builds.values().filter_map(|entry| entry.snapshot.as_ref())
    }

    pub fn len(&self) -> usize {
        self.builds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builds.is_empty()
    }
}

#[derive(Debug, Default)]
struct CacheState {
    builders: BTreeMap<Uuid, Builder>,
    builders_applied: u64,
    buckets: HashMap<Uuid, BuilderBucket>,
    /// Per-builder floor: responses to requests initiated before the last
    /// clear or bulk replace are stale
    floors: HashMap<Uuid, u64>,
    /// Per-build floor left by a delete, keyed by build id
    deleted: HashMap<Uuid, u64>,
}

impl CacheState {
    fn floor(&self, builder_id: Uuid) -> u64 {
        self.floors.get(&builder_id).copied().unwrap_or(0)
    }

    /// Whether a response fetched under `ticket` predates the deletion of `build_id`
    fn deleted_after(&self, build_id: Uuid, ticket: u64) -> bool {
        self.deleted
            .get(&build_id)
            .is_some_and(|&deleted| ticket <= deleted)
    }
}

/// Shared handle to the cache
///
/// Cloning is cheap; all clones see the same data.
#[derive(Debug, Clone, Default)]
pub struct BuildCache {
    state: Arc<RwLock<CacheState>>,
    sequence: Arc<AtomicU64>,
}

impl BuildCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, CacheState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Issue a ticket for a request that is about to be sent
    pub fn issue_ticket(&self) -> FetchTicket {
        FetchTicket(self.sequence.fetch_add(1, Ordering::SeqCst) + 1)
    }

    // =============================================================================
    // Builds
    // =============================================================================

    /// Returns the bucket of a builder, creating an empty one if needed
    pub fn get_or_create_builder_bucket(&self, builder_id: Uuid) -> BuilderBucket {
        self.write()
            .buckets
            .entry(builder_id)
            .or_insert_with(|| BuilderBucket::empty(builder_id))
            .clone()
    }

    /// Returns the bucket of a builder, or `None` if nothing is cached
    pub fn get_builder_bucket(&self, builder_id: Uuid) -> Option<BuilderBucket> {
        self.read().buckets.get(&builder_id).cloned()
    }

    /// Returns the cached slot of a build, creating a placeholder if needed
    pub fn get_or_create_build(&self, builder_id: Uuid, build_id: Uuid) -> CachedBuild {
        self.write()
            .buckets
            .entry(builder_id)
            .or_insert_with(|| BuilderBucket::empty(builder_id))
            .builds
            .entry(build_id)
            .or_insert_with(|| CachedBuild::placeholder(builder_id, build_id))
            .clone()
    }

    /// Returns the cached slot of a build, or `None` if it is not cached
    pub fn get_build(&self, builder_id: Uuid, build_id: Uuid) -> Option<CachedBuild> {
        self.read()
            .buckets
            .get(&builder_id)
            .and_then(|bucket| bucket.builds.get(&build_id))
            .cloned()
    }

    /// Latest fetched snapshot of a build, skipping placeholders
    pub fn snapshot(&self, builder_id: Uuid, build_id: Uuid) -> Option<Build> {
        self.get_build(builder_id, build_id)
            .and_then(|entry| entry.snapshot)
    }

    /// Store a fetched build
    ///
    /// # Returns
    /// `false` if the response was stale and discarded
    pub fn apply_build(&self, ticket: FetchTicket, build: Build) -> bool {
        let mut state = self.write();
        if ticket.0 <= state.floor(build.builder_id) || state.deleted_after(build.id, ticket.0) {
            return false;
        }

        let builder_id = build.builder_id;
        let build_id = build.id;
        let entry = state
            .buckets
            .entry(builder_id)
            .or_insert_with(|| BuilderBucket::empty(builder_id))
            .builds
            .entry(build_id)
            .or_insert_with(|| CachedBuild::placeholder(builder_id, build_id));

        if ticket.0 <= entry.applied {
            return false;
        }

        entry.snapshot = Some(build);
        entry.applied = ticket.0;
        true
    }

    /// Replace every build of a builder with a fresh listing
    pub fn replace_builder_builds(&self, builder_id: Uuid, builds: Vec<Build>) {
        let ticket = self.issue_ticket();
        self.replace_builder_builds_from(ticket, builder_id, builds);
    }

    /// Replace every build of a builder with a listing fetched under `ticket`
    ///
    /// The new bucket is swapped in under one write lock, so readers see
    /// either the old or the new bucket. Builds whose entry was refreshed by
    /// a request initiated after `ticket` keep that newer snapshot.
    ///
    /// # Returns
    /// `false` if the listing was stale and discarded
    pub fn replace_builder_builds_from(
        &self,
        ticket: FetchTicket,
        builder_id: Uuid,
        builds: Vec<Build>,
    ) -> bool {
        let mut state = self.write();
        if ticket.0 <= state.floor(builder_id) {
            return false;
        }

        let mut previous = state
            .buckets
            .remove(&builder_id)
            .map(|bucket| bucket.builds)
            .unwrap_or_default();

        let mut bucket = BuilderBucket::empty(builder_id);
        let listed = builds
            .into_iter()
            .filter(|b| b.builder_id == builder_id && !state.deleted_after(b.id, ticket.0));
        for build in listed {
            let entry = match previous.remove(&build.id) {
                Some(newer) if newer.applied > ticket.0 => newer,
                _ => CachedBuild {
                    builder_id,
                    build_id: build.id,
                    snapshot: Some(build),
                    applied: ticket.0,
                },
            };
            bucket.builds.insert(entry.build_id, entry);
        }

        state.buckets.insert(builder_id, bucket);
        state.floors.insert(builder_id, ticket.0);
        true
    }

    /// Drop the bucket of a builder
    ///
    /// Responses to requests initiated before the clear are discarded.
    pub fn clear(&self, builder_id: Uuid) -> bool {
        let floor = self.issue_ticket();
        let mut state = self.write();
        state.floors.insert(builder_id, floor.0);
        state.buckets.remove(&builder_id).is_some()
    }

    /// Forget a single deleted build
    ///
    /// Responses for it to requests initiated before the delete, including
    /// listings that still carry it, are discarded.
    pub fn remove_build(&self, builder_id: Uuid, build_id: Uuid) -> Option<Build> {
        let floor = self.issue_ticket();
        let mut state = self.write();
        state.deleted.insert(build_id, floor.0);
        state
            .buckets
            .get_mut(&builder_id)
            .and_then(|bucket| bucket.builds.remove(&build_id))
            .and_then(|entry| entry.snapshot)
    }

    // =============================================================================
    // Builders
    // =============================================================================

    /// All known builders, ordered by id
    pub fn builders(&self) -> Vec<Builder> {
        self.read().builders.values().cloned().collect()
    }

    pub fn builder(&self, builder_id: Uuid) -> Option<Builder> {
        self.read().builders.get(&builder_id).cloned()
    }

    /// Replace the builder index with a fresh listing
    pub fn replace_builders(&self, builders: Vec<Builder>) {
        let ticket = self.issue_ticket();
        self.replace_builders_from(ticket, builders);
    }

    /// Replace the builder index with a listing fetched under `ticket`
    ///
    /// # Returns
    /// `false` if the listing was stale and discarded
    pub fn replace_builders_from(&self, ticket: FetchTicket, builders: Vec<Builder>) -> bool {
        let mut state = self.write();
        if ticket.0 <= state.builders_applied {
            return false;
        }
        state.builders = builders.into_iter().map(|b| (b.id, b)).collect();
        state.builders_applied = ticket.0;
        true
    }

    /// Insert or update a single builder after a create or edit
    pub fn upsert_builder(&self, builder: Builder) {
        let ticket = self.issue_ticket();
        let mut state = self.write();
        state.builders.insert(builder.id, builder);
        state.builders_applied = ticket.0;
    }

    /// Forget a deleted builder and its builds
    pub fn remove_builder(&self, builder_id: Uuid) -> Option<Builder> {
        let ticket = self.issue_ticket();
        let mut state = self.write();
        state.buckets.remove(&builder_id);
        state.floors.insert(builder_id, ticket.0);
        state.builders_applied = ticket.0;
        state.builders.remove(&builder_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carpentry_core::domain::build::BuildStatus;

    fn build(builder_id: Uuid, build_id: Uuid, stdout: &str) -> Build {
        Build {
            id: build_id,
            builder_id,
            status: BuildStatus::Running,
            stdout: stdout.to_string(),
            done: false,
            commit: None,
            author_name: None,
            author_email: None,
            code: None,
            date_created: None,
            date_finished: None,
        }
    }

    fn builder(id: Uuid, name: &str) -> Builder {
        Builder {
            id,
            name: name.to_string(),
            git_uri: format!("git@github.com:example/{}.git", name),
            shell_script: "make test".to_string(),
            generate_ssh_keys: false,
            status: None,
            branch: None,
            id_rsa_public: None,
        }
    }

    #[test]
    fn test_get_or_create_build_is_stable() {
        let cache = BuildCache::new();
        let (builder_id, build_id) = (Uuid::new_v4(), Uuid::new_v4());

        let first = cache.get_or_create_build(builder_id, build_id);
        let second = cache.get_or_create_build(builder_id, build_id);

        assert_eq!(first, second);
        assert!(first.is_placeholder());
    }

    #[test]
    fn test_absent_build_is_explicit() {
        let cache = BuildCache::new();
        let (builder_id, build_id) = (Uuid::new_v4(), Uuid::new_v4());

        assert!(cache.get_build(builder_id, build_id).is_none());
        assert!(cache.get_builder_bucket(builder_id).is_none());

        cache.get_or_create_build(builder_id, build_id);
        let entry = cache.get_build(builder_id, build_id).unwrap();
        assert!(entry.is_placeholder());
        assert!(cache.snapshot(builder_id, build_id).is_none());
    }

    #[test]
    fn test_empty_output_is_not_a_placeholder() {
        let cache = BuildCache::new();
        let (builder_id, build_id) = (Uuid::new_v4(), Uuid::new_v4());

        let ticket = cache.issue_ticket();
        assert!(cache.apply_build(ticket, build(builder_id, build_id, "")));

        let entry = cache.get_or_create_build(builder_id, build_id);
        assert!(!entry.is_placeholder());
        assert_eq!(entry.snapshot.unwrap().stdout, "");
    }

    #[test]
    fn test_get_or_create_bucket_never_overwrites() {
        let cache = BuildCache::new();
        let (builder_id, build_id) = (Uuid::new_v4(), Uuid::new_v4());

        cache.apply_build(cache.issue_ticket(), build(builder_id, build_id, "x"));
        let bucket = cache.get_or_create_builder_bucket(builder_id);

        assert_eq!(bucket.len(), 1);
        assert_eq!(bucket.get(build_id).unwrap().snapshot.as_ref().unwrap().stdout, "x");
    }

    #[test]
    fn test_stale_response_is_discarded() {
        let cache = BuildCache::new();
        let (builder_id, build_id) = (Uuid::new_v4(), Uuid::new_v4());

        let older = cache.issue_ticket();
        let newer = cache.issue_ticket();

        assert!(cache.apply_build(newer, build(builder_id, build_id, "line1\nline2")));
        assert!(!cache.apply_build(older, build(builder_id, build_id, "line1")));

        assert_eq!(
            cache.snapshot(builder_id, build_id).unwrap().stdout,
            "line1\nline2"
        );
    }

    #[test]
    fn test_replace_builder_builds_drops_stale_entries() {
        let cache = BuildCache::new();
        let builder_id = Uuid::new_v4();
        let (kept, dropped) = (Uuid::new_v4(), Uuid::new_v4());

        cache.apply_build(cache.issue_ticket(), build(builder_id, kept, "old"));
        cache.apply_build(cache.issue_ticket(), build(builder_id, dropped, "gone"));

        cache.replace_builder_builds(builder_id, vec![build(builder_id, kept, "new")]);

        let bucket = cache.get_builder_bucket(builder_id).unwrap();
        assert_eq!(bucket.len(), 1);
        assert!(bucket.get(dropped).is_none());
        assert_eq!(cache.snapshot(builder_id, kept).unwrap().stdout, "new");
    }

    #[test]
    fn test_replace_keeps_snapshots_fetched_after_listing_started() {
        let cache = BuildCache::new();
        let (builder_id, build_id) = (Uuid::new_v4(), Uuid::new_v4());

        let listing = cache.issue_ticket();
        let output = cache.issue_ticket();
        cache.apply_build(output, build(builder_id, build_id, "line1\nline2"));

        assert!(cache.replace_builder_builds_from(
            listing,
            builder_id,
            vec![build(builder_id, build_id, "line1")],
        ));

        assert_eq!(
            cache.snapshot(builder_id, build_id).unwrap().stdout,
            "line1\nline2"
        );
    }

    #[test]
    fn test_clear_discards_in_flight_responses() {
        let cache = BuildCache::new();
        let (builder_id, build_id) = (Uuid::new_v4(), Uuid::new_v4());

        cache.apply_build(cache.issue_ticket(), build(builder_id, build_id, "x"));
        let in_flight = cache.issue_ticket();

        assert!(cache.clear(builder_id));
        assert!(cache.get_builder_bucket(builder_id).is_none());

        assert!(!cache.apply_build(in_flight, build(builder_id, build_id, "x")));
        assert!(cache.get_build(builder_id, build_id).is_none());

        assert!(!cache.clear(builder_id));
    }

    #[test]
    fn test_get_or_create_changes_after_replace() {
        let cache = BuildCache::new();
        let (builder_id, build_id) = (Uuid::new_v4(), Uuid::new_v4());

        let before = cache.get_or_create_build(builder_id, build_id);
        cache.replace_builder_builds(builder_id, vec![build(builder_id, build_id, "done")]);
        let after = cache.get_or_create_build(builder_id, build_id);

        assert_ne!(before, after);
        assert!(!after.is_placeholder());
    }

    #[test]
    fn test_builder_index() {
        let cache = BuildCache::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        let stale = cache.issue_ticket();
        cache.replace_builders(vec![builder(a, "alpha"), builder(b, "beta")]);
        assert!(!cache.replace_builders_from(stale, vec![]));
        assert_eq!(cache.builders().len(), 2);

        let mut renamed = builder(a, "alpha-2");
        renamed.branch = Some("main".to_string());
        cache.upsert_builder(renamed);
        assert_eq!(cache.builder(a).unwrap().name, "alpha-2");

        cache.apply_build(cache.issue_ticket(), build(b, Uuid::new_v4(), "x"));
        assert_eq!(cache.remove_builder(b).unwrap().name, "beta");
        assert!(cache.builder(b).is_none());
        assert!(cache.get_builder_bucket(b).is_none());
    }

    #[test]
    fn test_remove_build() {
        let cache = BuildCache::new();
        let (builder_id, build_id) = (Uuid::new_v4(), Uuid::new_v4());

        cache.apply_build(cache.issue_ticket(), build(builder_id, build_id, "x"));
        assert!(cache.remove_build(builder_id, build_id).is_some());
        assert!(cache.get_build(builder_id, build_id).is_none());
        assert!(cache.remove_build(builder_id, build_id).is_none());
    }

    #[test]
    fn test_removed_build_ignores_in_flight_response() {
        let cache = BuildCache::new();
        let (builder_id, build_id) = (Uuid::new_v4(), Uuid::new_v4());

        cache.apply_build(cache.issue_ticket(), build(builder_id, build_id, "a"));
        let in_flight = cache.issue_ticket();
        cache.remove_build(builder_id, build_id);

        assert!(!cache.apply_build(in_flight, build(builder_id, build_id, "a\nb")));
        assert!(cache.snapshot(builder_id, build_id).is_none());

        assert!(cache.replace_builder_builds_from(
            in_flight,
            builder_id,
            vec![build(builder_id, build_id, "a\nb")],
        ));
        assert!(cache.get_build(builder_id, build_id).is_none());

        // a request started after the delete is not affected
        assert!(cache.apply_build(cache.issue_ticket(), build(builder_id, build_id, "c")));
        assert_eq!(cache.snapshot(builder_id, build_id).unwrap().stdout, "c");
    }
}
