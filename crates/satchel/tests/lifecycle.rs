// Copyright (c) The Satchel Project Authors.
// Licensed under the MIT License.

//! Integration tests for lifecycle notification and cascading eviction.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};
use std::sync::Arc;

use satchel::{
    ActivationAware, AttributeCodec, CoarseAttributesFactory, FineAttributesFactory, JsonCodec, MemoryStore,
    SessionAttributesFactory, SessionEntry, SessionId, SessionKey, SessionMetadata, SessionValue, direct_notifiers,
};
use satchel_store::SessionStore;
use serde::{Deserialize, Serialize};

type Entry = SessionEntry<serde_json::Value>;
type Store = MemoryStore<SessionKey, Entry>;

fn block_on<F: Future>(f: F) -> F::Output {
    futures::executor::block_on(f)
}

/// An attribute value whose callbacks record into a process-wide journal.
///
/// Decoding creates fresh instances, so the journal is keyed by tag; each
/// test uses tags of its own.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct Tracked {
    tag: String,
}

impl Tracked {
    fn new(tag: &str) -> Self {
        Self { tag: tag.to_string() }
    }
}

fn journal() -> &'static Mutex<Vec<(String, &'static str)>> {
    static JOURNAL: OnceLock<Mutex<Vec<(String, &'static str)>>> = OnceLock::new();
    JOURNAL.get_or_init(|| Mutex::new(Vec::new()))
}

fn record(tag: &str, transition: &'static str) {
    journal().lock().expect("journal").push((tag.to_string(), transition));
}

fn transitions_for(tag: &str) -> Vec<&'static str> {
    journal()
        .lock()
        .expect("journal")
        .iter()
        .filter(|(entry, _)| entry == tag)
        .map(|(_, transition)| *transition)
        .collect()
}

impl ActivationAware for Tracked {
    fn on_pre_passivate(&self) {
        record(&self.tag, "pre_passivate");
    }

    fn on_post_activate(&self) {
        record(&self.tag, "post_activate");
    }
}

impl SessionValue for Tracked {
    fn activation_aware(&self) -> Option<&dyn ActivationAware> {
        Some(self)
    }
}

fn store(persistent: bool) -> Store {
    Store::builder().persistent(persistent).build()
}

fn coarse_factory(store: &Store) -> CoarseAttributesFactory<JsonCodec<Tracked>, Store> {
    CoarseAttributesFactory::new(Arc::new(store.clone()), Arc::new(JsonCodec::new()), direct_notifiers())
}

fn fine_factory(store: &Store) -> FineAttributesFactory<JsonCodec<Tracked>, Store> {
    FineAttributesFactory::new(Arc::new(store.clone()), Arc::new(JsonCodec::new()), direct_notifiers())
}

async fn seed_session<F>(factory: &F, store: &Store, id: &SessionId, tags: &[&str])
where
    F: SessionAttributesFactory<Tracked>,
{
    store
        .insert(&SessionKey::metadata(id.clone()), SessionEntry::Metadata(SessionMetadata::existing()))
        .await
        .expect("seed metadata");

    let attributes = factory.create_value(id).await.expect("create");
    let handle = factory
        .create_session_attributes(id, attributes, &SessionMetadata::existing())
        .expect("handle");
    for tag in tags {
        handle.attributes().insert(*tag, Tracked::new(tag));
    }
    handle.release().await.expect("release");
}

#[test]
fn metadata_eviction_cascades_to_attributes() {
    block_on(async {
        let store = store(false);
        let factory = coarse_factory(&store);
        let id = SessionId::new("cascade-1");
        seed_session(&factory, &store, &id, &["cascade-1/x"]).await;

        store.evict(&SessionKey::metadata(id.clone())).await.expect("evict metadata");

        assert!(store.is_passivated(&SessionKey::attributes(id.clone())));
        assert!(store.is_passivated(&SessionKey::metadata(id)));
    });
}

#[test]
fn attribute_eviction_never_touches_metadata() {
    block_on(async {
        let store = store(false);
        let factory = coarse_factory(&store);
        let id = SessionId::new("cascade-2");
        seed_session(&factory, &store, &id, &["cascade-2/x"]).await;

        store.evict(&SessionKey::attributes(id.clone())).await.expect("evict attributes");

        assert!(store.is_passivated(&SessionKey::attributes(id.clone())));
        assert!(!store.is_passivated(&SessionKey::metadata(id)));
    });
}

#[test]
fn coarse_callbacks_fire_exactly_once_per_cycle() {
    block_on(async {
        let store = store(false);
        let factory = coarse_factory(&store);
        let id = SessionId::new("coarse-cycle");
        let tag = "coarse-cycle/x";
        seed_session(&factory, &store, &id, &[tag]).await;

        let key = SessionKey::attributes(id.clone());
        store.evict(&key).await.expect("evict");
        assert_eq!(transitions_for(tag), vec!["pre_passivate"]);

        // A second eviction of the already passivated entry fires nothing.
        store.evict(&key).await.expect("evict again");
        assert_eq!(transitions_for(tag), vec!["pre_passivate"]);

        let _ = store.get(&key).await.expect("activate");
        assert_eq!(transitions_for(tag), vec!["pre_passivate", "post_activate"]);
    });
}

#[test]
fn fine_callbacks_fire_per_attribute() {
    block_on(async {
        let store = store(false);
        let factory = fine_factory(&store);
        let id = SessionId::new("fine-cycle");
        seed_session(&factory, &store, &id, &["fine-cycle/a", "fine-cycle/b"]).await;

        store.evict(&SessionKey::attributes(id.clone())).await.expect("evict");

        assert_eq!(transitions_for("fine-cycle/a"), vec!["pre_passivate"]);
        assert_eq!(transitions_for("fine-cycle/b"), vec!["pre_passivate"]);
    });
}

#[test]
fn fine_decode_failure_skips_only_the_corrupt_attribute() {
    block_on(async {
        let store = store(false);
        let _factory = fine_factory(&store);
        let id = SessionId::new("fine-partial");
        let key = SessionKey::attributes(id.clone());

        let codec = JsonCodec::<Tracked>::new();
        let mut stored = HashMap::new();
        stored.insert("x".to_string(), serde_json::json!(42));
        stored.insert(
            "y".to_string(),
            codec.encode_value(&Tracked::new("fine-partial/y")).expect("encode"),
        );
        store.insert(&key, SessionEntry::Fine(stored)).await.expect("seed");

        store.evict(&key).await.expect("evict");

        // "y" is notified even though "x" cannot be decoded.
        assert_eq!(transitions_for("fine-partial/y"), vec!["pre_passivate"]);
        // Event delivery never purges; the corrupt entry is still there.
        assert!(store.is_passivated(&key));
    });
}

#[test]
fn fine_find_value_still_rejects_the_whole_corrupt_session() {
    block_on(async {
        let store = store(false);
        let factory = fine_factory(&store);
        let id = SessionId::new("fine-corrupt");
        let key = SessionKey::attributes(id.clone());

        let codec = JsonCodec::<Tracked>::new();
        let mut stored = HashMap::new();
        stored.insert("x".to_string(), serde_json::json!(42));
        stored.insert(
            "y".to_string(),
            codec.encode_value(&Tracked::new("fine-corrupt/y")).expect("encode"),
        );
        store.insert(&key, SessionEntry::Fine(stored)).await.expect("seed");

        let found = factory.find_value(&id).await.expect("find");
        assert!(found.is_none());
        assert!(!store.contains_key(&key));
    });
}

#[test]
fn persistent_store_dispatches_through_the_handle_notifier() {
    block_on(async {
        let store = store(true);
        let factory = coarse_factory(&store);
        let id = SessionId::new("persist-1");
        let tag = "persist-1/x";

        let attributes = factory.create_value(&id).await.expect("create");
        attributes.insert(tag, Tracked::new(tag));

        // Creating the handle is the observable activation point.
        let handle = factory
            .create_session_attributes(&id, attributes, &SessionMetadata::existing())
            .expect("handle");
        assert_eq!(transitions_for(tag), vec!["post_activate"]);

        handle.release().await.expect("release");
        assert_eq!(transitions_for(tag), vec!["post_activate", "pre_passivate"]);
    });
}

#[test]
fn persistent_store_subscribes_no_event_dispatch() {
    block_on(async {
        let store = store(true);
        let factory = coarse_factory(&store);
        let id = SessionId::new("persist-2");
        let tag = "persist-2/x";
        seed_session(&factory, &store, &id, &[tag]).await;

        // The handle notifier fired during seeding; store events must add
        // nothing on a persistent store.
        let after_seed = transitions_for(tag).len();

        let key = SessionKey::attributes(id.clone());
        store.evict(&key).await.expect("evict");
        let _ = store.get(&key).await.expect("activate");

        assert_eq!(transitions_for(tag).len(), after_seed);
    });
}

#[test]
fn non_persistent_handles_carry_no_notifier() {
    block_on(async {
        let store = store(false);
        let factory = coarse_factory(&store);
        let id = SessionId::new("inmem-1");
        let tag = "inmem-1/x";

        let attributes = factory.create_value(&id).await.expect("create");
        attributes.insert(tag, Tracked::new(tag));

        let handle = factory
            .create_session_attributes(&id, attributes, &SessionMetadata::existing())
            .expect("handle");
        handle.release().await.expect("release");

        // Passivation of an in-memory session is a store event, not a
        // request-lifecycle event.
        assert_eq!(transitions_for(tag), Vec::<&str>::new());
    });
}

#[test]
fn closed_factory_dispatches_nothing() {
    block_on(async {
        let store = store(false);
        let factory = coarse_factory(&store);
        let id = SessionId::new("closed-1");
        let tag = "closed-1/x";
        seed_session(&factory, &store, &id, &[tag]).await;

        factory.close();
        store.evict(&SessionKey::attributes(id)).await.expect("evict");

        assert_eq!(transitions_for(tag), Vec::<&str>::new());
    });
}

#[test]
fn fine_cascade_evicts_the_entry_as_a_whole() {
    block_on(async {
        let store = store(false);
        let factory = fine_factory(&store);
        let id = SessionId::new("fine-cascade");
        seed_session(&factory, &store, &id, &["fine-cascade/a", "fine-cascade/b"]).await;

        store.evict(&SessionKey::metadata(id.clone())).await.expect("evict metadata");

        assert!(store.is_passivated(&SessionKey::attributes(id)));
        assert_eq!(transitions_for("fine-cascade/a"), vec!["pre_passivate"]);
        assert_eq!(transitions_for("fine-cascade/b"), vec!["pre_passivate"]);
    });
}
