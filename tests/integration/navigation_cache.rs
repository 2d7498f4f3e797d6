use crate::integration::support::{
    assert_quiet, cache_with_events, names, next_event, next_listing, sample_remote, wait_until,
    ScriptedRemote,
};
use drivenav::model::Entry;
use drivenav::tree::{NavEvent, NavigationListener};
use drivenav::types::ROOT_ID;
use parking_lot::Mutex;
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

/// Listener that records callbacks and is slow to handle `on_loading`
///
/// Its first `on_loading` lets the held fetch of `release` proceed, so the
/// fetch completes while the callback is still running.
struct SlowRecorder {
    remote: Arc<ScriptedRemote>,
    release: &'static str,
    calls: Mutex<Vec<String>>,
}

impl SlowRecorder {
    fn new(remote: &Arc<ScriptedRemote>, release: &'static str) -> Self {
        Self {
            remote: Arc::clone(remote),
            release,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

impl NavigationListener for SlowRecorder {
    fn on_loading(&self) {
        self.remote.release(self.release);
        std::thread::sleep(Duration::from_millis(100));
        self.calls.lock().push("loading".to_string());
    }

    fn on_success(&self, _items: &[Entry], from_cache: bool) {
        self.calls.lock().push(format!("success({})", from_cache));
    }

    fn on_error(&self, message: &str) {
        self.calls.lock().push(format!("error({})", message));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn init_loads_root_and_root_has_no_back_target() {
    let remote = sample_remote();
    let (cache, mut events) = cache_with_events(&remote);

    cache.init();
    assert_eq!(next_event(&mut events).await, NavEvent::Loading);
    let (items, from_cache) = next_listing(&mut events).await;
    assert!(!from_cache);
    assert_eq!(names(&items), vec!["Docs", "Photos", "readme.txt"]);

    assert!(!cache.can_go_back());
    assert!(!cache.go_back());
    assert_eq!(cache.current_id(), ROOT_ID);
    assert_quiet(&mut events).await;
    assert_eq!(remote.fetch_count(ROOT_ID), 1);
    assert_eq!(remote.total_fetches(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn renavigating_a_cached_folder_is_served_from_cache() {
    let remote = sample_remote();
    let (cache, mut events) = cache_with_events(&remote);
    cache.init();
    next_listing(&mut events).await;

    let docs = Entry::folder("docs", "Docs");
    cache.navigate_to(&docs);
    let (_, from_cache) = next_listing(&mut events).await;
    assert!(!from_cache);

    cache.navigate_to(&docs);
    // cache hits are delivered before navigate_to returns
    match events.try_recv() {
        Ok(NavEvent::Loaded { items, from_cache }) => {
            assert!(from_cache);
            assert_eq!(names(&items), vec!["2024", "cv.pdf"]);
        }
        other => panic!("expected a cached listing, got {:?}", other),
    }
    assert_eq!(remote.fetch_count("docs"), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn revisiting_a_folder_from_another_path_reuses_its_node() {
    let remote = sample_remote();
    // Photos also lists Docs, so Docs is reachable from two places
    remote.set_listing("photos", vec![Entry::folder("docs", "Docs")]);
    let (cache, mut events) = cache_with_events(&remote);
    cache.init();
    next_listing(&mut events).await;

    cache.navigate_to(&Entry::folder("docs", "Docs"));
    next_listing(&mut events).await;
    assert!(cache.go_back());
    next_listing(&mut events).await;

    cache.navigate_to(&Entry::folder("photos", "Photos"));
    next_listing(&mut events).await;
    cache.navigate_to(&Entry::folder("docs", "Docs"));
    let (items, from_cache) = next_listing(&mut events).await;

    assert!(from_cache);
    assert_eq!(names(&items), vec!["2024", "cv.pdf"]);
    assert_eq!(cache.node_count(), 3);
    assert_eq!(remote.fetch_count("docs"), 1);
    // parent stays the folder it was first entered from
    assert_eq!(
        cache.node("docs").unwrap().parent.as_deref(),
        Some(ROOT_ID)
    );
    assert_eq!(cache.current_path(), "Drive/Docs");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn going_back_restores_parent_listing_without_fetch() {
    let remote = sample_remote();
    let (cache, mut events) = cache_with_events(&remote);
    cache.init();
    next_listing(&mut events).await;

    cache.navigate_to(&Entry::folder("docs", "Docs"));
    next_listing(&mut events).await;
    assert!(cache.can_go_back());

    assert!(cache.go_back());
    let (items, from_cache) = next_listing(&mut events).await;
    assert!(from_cache);
    assert_eq!(names(&items), vec!["Docs", "Photos", "readme.txt"]);
    assert_eq!(remote.fetch_count(ROOT_ID), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn refresh_always_hits_the_network() {
    let remote = sample_remote();
    let (cache, mut events) = cache_with_events(&remote);
    cache.init();
    next_listing(&mut events).await;
    cache.navigate_to(&Entry::folder("docs", "Docs"));
    next_listing(&mut events).await;
    assert!(cache.is_cached("docs"));

    remote.set_listing("docs", vec![Entry::file("new", "new.txt", None)]);
    cache.refresh();
    assert_eq!(next_event(&mut events).await, NavEvent::Loading);
    let (items, from_cache) = next_listing(&mut events).await;

    assert!(!from_cache);
    assert_eq!(names(&items), vec!["new.txt"]);
    assert!(cache.is_cached("docs"));
    assert_eq!(remote.fetch_count("docs"), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn current_path_joins_names_from_root() {
    let remote = sample_remote();
    let (cache, mut events) = cache_with_events(&remote);
    cache.init();
    next_listing(&mut events).await;
    assert_eq!(cache.current_path(), "Drive");

    cache.navigate_to(&Entry::folder("docs", "Docs"));
    next_listing(&mut events).await;
    cache.navigate_to(&Entry::folder("2024", "2024"));
    next_listing(&mut events).await;

    assert_eq!(cache.current_path(), "Drive/Docs/2024");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_fetch_leaves_current_at_target_until_retry() {
    let remote = sample_remote();
    remote.fail_next("docs", "backend unavailable");
    let (cache, mut events) = cache_with_events(&remote);
    cache.init();
    next_listing(&mut events).await;

    cache.navigate_to(&Entry::folder("docs", "Docs"));
    assert_eq!(next_event(&mut events).await, NavEvent::Loading);
    match next_event(&mut events).await {
        NavEvent::Failed(message) => {
            assert!(message.contains("503"));
            assert!(message.contains("backend unavailable"));
        }
        other => panic!("expected a failure, got {:?}", other),
    }
    assert_eq!(cache.current_id(), "docs");
    assert!(!cache.is_cached("docs"));
    assert!(!cache.is_loading());
    assert_eq!(cache.current_items(), None);

    cache.refresh();
    let (items, from_cache) = next_listing(&mut events).await;
    assert!(!from_cache);
    assert_eq!(names(&items), vec!["2024", "cv.pdf"]);
    assert!(cache.is_cached("docs"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stale_completion_updates_cache_without_notifying() {
    let remote = sample_remote();
    let (cache, mut events) = cache_with_events(&remote);
    cache.init();
    next_listing(&mut events).await;

    remote.hold("docs");
    cache.navigate_to(&Entry::folder("docs", "Docs"));
    assert_eq!(next_event(&mut events).await, NavEvent::Loading);

    // leave before the listing arrives
    assert!(cache.go_back());
    let (_, from_cache) = next_listing(&mut events).await;
    assert!(from_cache);

    remote.release("docs");
    wait_until(|| cache.is_cached("docs")).await;
    assert_quiet(&mut events).await;
    assert_eq!(cache.current_id(), ROOT_ID);

    cache.navigate_to(&Entry::folder("docs", "Docs"));
    let (items, from_cache) = next_listing(&mut events).await;
    assert!(from_cache);
    assert_eq!(names(&items), vec!["2024", "cv.pdf"]);
    assert_eq!(remote.fetch_count("docs"), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn returning_to_a_loading_folder_attaches_to_its_fetch() {
    let remote = sample_remote();
    let (cache, mut events) = cache_with_events(&remote);
    cache.init();
    next_listing(&mut events).await;

    remote.hold("docs");
    cache.navigate_to(&Entry::folder("docs", "Docs"));
    assert_eq!(next_event(&mut events).await, NavEvent::Loading);
    cache.go_back();
    next_listing(&mut events).await;

    cache.navigate_to(&Entry::folder("docs", "Docs"));
    assert_eq!(next_event(&mut events).await, NavEvent::Loading);
    assert!(cache.is_loading());

    remote.release("docs");
    let (items, from_cache) = next_listing(&mut events).await;
    assert!(!from_cache);
    assert_eq!(names(&items), vec!["2024", "cv.pdf"]);
    assert_eq!(remote.fetch_count("docs"), 1);
    assert_quiet(&mut events).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn attached_fetch_reports_loading_before_its_listing() {
    let remote = sample_remote();
    let (cache, mut events) = cache_with_events(&remote);
    cache.init();
    next_listing(&mut events).await;

    remote.hold("docs");
    cache.navigate_to(&Entry::folder("docs", "Docs"));
    assert_eq!(next_event(&mut events).await, NavEvent::Loading);
    cache.go_back();
    next_listing(&mut events).await;

    let recorder = Arc::new(SlowRecorder::new(&remote, "docs"));
    cache.set_listener(recorder.clone());
    cache.navigate_to(&Entry::folder("docs", "Docs"));

    wait_until(|| recorder.calls().len() == 2).await;
    assert_eq!(recorder.calls(), vec!["loading", "success(false)"]);
    assert_eq!(remote.fetch_count("docs"), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn invalidating_a_loading_folder_discards_its_fetch() {
    let remote = sample_remote();
    let (cache, mut events) = cache_with_events(&remote);
    cache.init();
    next_listing(&mut events).await;

    remote.hold("docs");
    cache.navigate_to(&Entry::folder("docs", "Docs"));
    assert_eq!(next_event(&mut events).await, NavEvent::Loading);
    cache.go_back();
    next_listing(&mut events).await;

    assert!(cache.invalidate("docs"));
    remote.release("docs");
    assert_quiet(&mut events).await;
    assert!(!cache.is_cached("docs"));
    assert!(!cache.is_loading());

    remote.release("docs");
    cache.navigate_to(&Entry::folder("docs", "Docs"));
    assert_eq!(next_event(&mut events).await, NavEvent::Loading);
    let (items, from_cache) = next_listing(&mut events).await;
    assert!(!from_cache);
    assert_eq!(names(&items), vec!["2024", "cv.pdf"]);
    assert_eq!(remote.fetch_count("docs"), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn overlapping_refreshes_deliver_once() {
    let remote = sample_remote();
    let (cache, mut events) = cache_with_events(&remote);
    cache.init();
    next_listing(&mut events).await;

    remote.hold(ROOT_ID);
    cache.refresh();
    assert_eq!(next_event(&mut events).await, NavEvent::Loading);
    cache.refresh();
    assert_eq!(next_event(&mut events).await, NavEvent::Loading);

    remote.release(ROOT_ID);
    remote.release(ROOT_ID);
    let (_, from_cache) = next_listing(&mut events).await;
    assert!(!from_cache);
    wait_until(|| remote.fetch_count(ROOT_ID) == 3).await;
    assert_quiet(&mut events).await;
    assert!(!cache.is_loading());
    assert!(cache.is_cached(ROOT_ID));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn navigating_into_a_file_is_ignored() {
    let remote = sample_remote();
    let (cache, mut events) = cache_with_events(&remote);
    cache.init();
    next_listing(&mut events).await;

    cache.navigate_to(&Entry::file("readme", "readme.txt", None));
    assert_eq!(cache.current_id(), ROOT_ID);
    assert_eq!(cache.node_count(), 1);
    assert_quiet(&mut events).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn invalidated_folder_is_refetched_on_next_visit() {
    let remote = sample_remote();
    let (cache, mut events) = cache_with_events(&remote);
    cache.init();
    next_listing(&mut events).await;
    cache.navigate_to(&Entry::folder("docs", "Docs"));
    next_listing(&mut events).await;
    cache.go_back();
    next_listing(&mut events).await;

    assert!(cache.invalidate("docs"));
    assert!(!cache.invalidate("never-visited"));
    assert!(!cache.is_cached("docs"));

    cache.navigate_to(&Entry::folder("docs", "Docs"));
    let (_, from_cache) = next_listing(&mut events).await;
    assert!(!from_cache);
    assert_eq!(remote.fetch_count("docs"), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn refreshed_parent_updates_visited_child_names() {
    let remote = sample_remote();
    let (cache, mut events) = cache_with_events(&remote);
    cache.init();
    next_listing(&mut events).await;
    cache.navigate_to(&Entry::folder("docs", "Docs"));
    next_listing(&mut events).await;
    cache.go_back();
    next_listing(&mut events).await;

    remote.set_listing(
        ROOT_ID,
        vec![
            Entry::folder("docs", "Documents"),
            Entry::folder("photos", "Photos"),
        ],
    );
    cache.refresh();
    next_listing(&mut events).await;

    cache.navigate_to(&Entry::folder("docs", "Documents"));
    let (_, from_cache) = next_listing(&mut events).await;
    assert!(from_cache);
    assert_eq!(cache.current_path(), "Drive/Documents");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn owner_of_prefers_current_folder() {
    let remote = sample_remote();
    let (cache, mut events) = cache_with_events(&remote);
    cache.init();
    next_listing(&mut events).await;
    cache.navigate_to(&Entry::folder("docs", "Docs"));
    next_listing(&mut events).await;

    assert_eq!(cache.owner_of("cv").as_deref(), Some("docs"));
    assert_eq!(cache.owner_of("readme").as_deref(), Some(ROOT_ID));
    assert_eq!(cache.owner_of("missing"), None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cache_keeps_working_without_a_listener() {
    let remote = sample_remote();
    let (cache, mut events) = cache_with_events(&remote);
    cache.clear_listener();

    cache.init();
    wait_until(|| cache.is_cached(ROOT_ID)).await;
    assert_eq!(cache.current_items().map(|items| items.len()), Some(3));
    assert_quiet(&mut events).await;
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn path_lists_every_folder_from_root(folder_names in prop::collection::vec("[A-Za-z0-9 _.-]{1,12}", 0..6)) {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();
        let path = runtime.block_on(async {
            // root -> f0 -> f1 -> ... each folder listing only the next one
            let remote = ScriptedRemote::new();
            let mut parent = ROOT_ID.to_string();
            for (i, name) in folder_names.iter().enumerate() {
                let id = format!("f{}", i);
                remote.set_listing(&parent, vec![Entry::folder(id.clone(), name.clone())]);
                parent = id;
            }
            remote.set_listing(&parent, Vec::new());

            let (cache, mut events) = cache_with_events(&remote);
            cache.init();
            let (mut items, _) = next_listing(&mut events).await;
            for _ in &folder_names {
                let next = items[0].clone();
                cache.navigate_to(&next);
                items = next_listing(&mut events).await.0;
            }
            cache.current_path()
        });

        let expected = std::iter::once("Drive")
            .chain(folder_names.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join("/");
        prop_assert_eq!(path, expected);
    }
}
