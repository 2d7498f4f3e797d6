//! Navigation Cache
//!
//! Owns the folder graph for one browsing session, the current location, and
//! the cache-or-fetch policy behind navigate / back / refresh.
//!
//! Nodes live in an arena keyed by item identifier, so revisiting a folder from
//! any path reuses the same node and its listing. `parent` is stored as an
//! identifier, fixed when the node is first created.
//!
//! Operations never block on the network. A cache hit is delivered to the
//! listener before the call returns; a miss spawns the fetch on the runtime
//! handle and returns. Every fetch carries a ticket:
//! - a completion whose ticket is no longer the node's newest fetch is dropped,
//! - a current completion always updates the node's listing, but is only
//!   reported to the listener if it is the delivery the listener is waiting for.
//! A second request for a node whose fetch is still outstanding attaches to it
//! instead of issuing a duplicate.
//!
//! Listener callbacks are serialized by a delivery lock, taken before the state
//! lock, so a fetch cannot report its listing ahead of the `on_loading` of an
//! operation that attached to it.

use crate::error::DriveError;
use crate::model::Entry;
use crate::remote::RemoteListing;
use crate::tree::node::FolderNode;
use crate::types::{ItemId, Ticket, ROOT_ID};
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Presentation-side callbacks
///
/// Exactly one of `on_success` / `on_error` follows each `on_loading`, unless
/// the user navigates elsewhere before the fetch completes.
pub trait NavigationListener: Send + Sync {
    fn on_loading(&self);
    fn on_success(&self, items: &[Entry], from_cache: bool);
    fn on_error(&self, message: &str);
}

/// Listener callback captured as a value
#[derive(Debug, Clone, PartialEq)]
pub enum NavEvent {
    Loading,
    Loaded { items: Vec<Entry>, from_cache: bool },
    Failed(String),
}

impl NavEvent {
    /// Loaded and Failed end a navigation; Loading does not
    pub fn is_terminal(&self) -> bool {
        !matches!(self, NavEvent::Loading)
    }
}

/// Listener that forwards every callback into an unbounded channel
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<NavEvent>,
}

impl ChannelListener {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<NavEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NavigationListener for ChannelListener {
    fn on_loading(&self) {
        let _ = self.tx.send(NavEvent::Loading);
    }

    fn on_success(&self, items: &[Entry], from_cache: bool) {
        let _ = self.tx.send(NavEvent::Loaded {
            items: items.to_vec(),
            from_cache,
        });
    }

    fn on_error(&self, message: &str) {
        let _ = self.tx.send(NavEvent::Failed(message.to_string()));
    }
}

/// An outstanding listing request
#[derive(Debug, Clone, PartialEq, Eq)]
struct FetchRequest {
    item_id: ItemId,
    ticket: Ticket,
}

/// What to tell the listener once the state lock is released
#[derive(Debug, PartialEq)]
enum Delivery {
    Cached(Vec<Entry>),
    /// A fetch for the node is already outstanding
    Attach,
    Fetch(FetchRequest),
}

struct NavState {
    nodes: HashMap<ItemId, FolderNode>,
    root: ItemId,
    current: ItemId,
    next_ticket: Ticket,
    /// Newest outstanding fetch per node
    in_flight: HashMap<ItemId, Ticket>,
    /// Fetch whose completion the listener is waiting for
    awaiting: Option<Ticket>,
}

impl NavState {
    fn new(root: Entry) -> Self {
        let root_id = root.id.clone();
        let mut nodes = HashMap::new();
        nodes.insert(root_id.clone(), FolderNode::new(root, None));
        Self {
            nodes,
            root: root_id.clone(),
            current: root_id,
            next_ticket: 0,
            in_flight: HashMap::new(),
            awaiting: None,
        }
    }

    fn issue_ticket(&mut self, item_id: &str) -> Ticket {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        self.in_flight.insert(item_id.to_string(), ticket);
        ticket
    }

    /// Serve the current node from cache, attach to its fetch, or start one
    fn plan_delivery(&mut self) -> Delivery {
        let id = self.current.clone();
        if let Some(items) = self.nodes.get(&id).and_then(FolderNode::cached_items) {
            let items = items.to_vec();
            self.awaiting = None;
            return Delivery::Cached(items);
        }
        if let Some(&ticket) = self.in_flight.get(&id) {
            self.awaiting = Some(ticket);
            return Delivery::Attach;
        }
        let ticket = self.issue_ticket(&id);
        self.awaiting = Some(ticket);
        Delivery::Fetch(FetchRequest {
            item_id: id,
            ticket,
        })
    }

    /// Store a fetched listing and refresh the entries of already-visited children
    fn store_listing(&mut self, item_id: &str, items: &[Entry]) {
        if let Some(node) = self.nodes.get_mut(item_id) {
            node.cache(items);
        }
        for item in items.iter().filter(|e| e.is_folder()) {
            if item.id == self.root {
                continue;
            }
            if let Some(child) = self.nodes.get_mut(&item.id) {
                child.entry = item.clone();
            }
        }
    }

    fn path(&self) -> String {
        let mut names = Vec::new();
        let mut cursor = Some(self.current.as_str());
        while let Some(id) = cursor {
            let Some(node) = self.nodes.get(id) else {
                break;
            };
            names.push(node.entry.name.as_str());
            cursor = node.parent.as_deref();
        }
        names.reverse();
        names.join("/")
    }
}

struct Inner {
    /// Held from planning a delivery until its callbacks have run; reentrant
    /// so a listener may call back into the cache
    delivery: ReentrantMutex<()>,
    state: Mutex<NavState>,
    client: Arc<dyn RemoteListing>,
    listener: RwLock<Option<Arc<dyn NavigationListener>>>,
    runtime: Handle,
}

/// Folder-tree navigation cache
///
/// Cheap to clone; clones share the same graph and location.
#[derive(Clone)]
pub struct NavigationCache {
    inner: Arc<Inner>,
}

impl NavigationCache {
    /// Create a cache positioned at `root`; fetches run on `runtime`
    pub fn new(root: Entry, client: Arc<dyn RemoteListing>, runtime: Handle) -> Self {
        Self {
            inner: Arc::new(Inner {
                delivery: ReentrantMutex::new(()),
                state: Mutex::new(NavState::new(root)),
                client,
                listener: RwLock::new(None),
                runtime,
            }),
        }
    }

    pub fn set_listener(&self, listener: Arc<dyn NavigationListener>) {
        *self.inner.listener.write() = Some(listener);
    }

    pub fn clear_listener(&self) {
        *self.inner.listener.write() = None;
    }

    /// Load the root listing; called once at startup
    pub fn init(&self) {
        let _delivering = self.inner.delivery.lock();
        let delivery = {
            let mut state = self.inner.state.lock();
            state.current = state.root.clone();
            state.plan_delivery()
        };
        info!("Initializing navigation at root");
        self.dispatch(delivery);
    }

    /// Enter a folder from the current listing
    ///
    /// `current` moves to the target before any fetch starts and stays there
    /// if the fetch fails.
    pub fn navigate_to(&self, entry: &Entry) {
        if !entry.is_folder() {
            warn!(item_id = %entry.id, name = %entry.name, "Ignoring navigation into a non-folder entry");
            return;
        }

        let _delivering = self.inner.delivery.lock();
        let delivery = {
            let mut state = self.inner.state.lock();
            if !state.nodes.contains_key(&entry.id) {
                let parent = state.current.clone();
                debug!(item_id = %entry.id, parent = %parent, "Materializing folder node");
                state
                    .nodes
                    .insert(entry.id.clone(), FolderNode::new(entry.clone(), Some(parent)));
            }
            state.current = entry.id.clone();
            state.plan_delivery()
        };
        self.dispatch(delivery);
    }

    /// Move to the parent of the current folder; returns false at the root
    pub fn go_back(&self) -> bool {
        let _delivering = self.inner.delivery.lock();
        let delivery = {
            let mut state = self.inner.state.lock();
            let parent = state
                .nodes
                .get(&state.current)
                .and_then(|node| node.parent.clone());
            match parent {
                Some(parent) => {
                    state.current = parent;
                    state.plan_delivery()
                }
                None => return false,
            }
        };
        self.dispatch(delivery);
        true
    }

    /// Drop the current folder's listing and fetch it again
    pub fn refresh(&self) {
        let _delivering = self.inner.delivery.lock();
        let request = {
            let mut state = self.inner.state.lock();
            let id = state.current.clone();
            if let Some(node) = state.nodes.get_mut(&id) {
                node.clear_cache();
            }
            let ticket = state.issue_ticket(&id);
            state.awaiting = Some(ticket);
            FetchRequest {
                item_id: id,
                ticket,
            }
        };
        debug!(item_id = %request.item_id, ticket = request.ticket, "Refreshing folder");
        self.dispatch(Delivery::Fetch(request));
    }

    /// Forget a node's listing so the next visit re-fetches it
    ///
    /// Returns false if the folder was never visited.
    pub fn invalidate(&self, item_id: &str) -> bool {
        let mut state = self.inner.state.lock();
        if item_id != state.current {
            state.in_flight.remove(item_id);
        }
        match state.nodes.get_mut(item_id) {
            Some(node) => {
                node.clear_cache();
                true
            }
            None => false,
        }
    }

    pub fn can_go_back(&self) -> bool {
        let state = self.inner.state.lock();
        state
            .nodes
            .get(&state.current)
            .map(|node| node.parent.is_some())
            .unwrap_or(false)
    }

    /// Slash-delimited display path from the root to the current folder
    pub fn current_path(&self) -> String {
        self.inner.state.lock().path()
    }

    pub fn current_id(&self) -> ItemId {
        self.inner.state.lock().current.clone()
    }

    /// Snapshot of the current node
    pub fn current(&self) -> Option<FolderNode> {
        let state = self.inner.state.lock();
        state.nodes.get(&state.current).cloned()
    }

    pub fn current_items(&self) -> Option<Vec<Entry>> {
        let state = self.inner.state.lock();
        state
            .nodes
            .get(&state.current)
            .and_then(FolderNode::cached_items)
            .map(<[Entry]>::to_vec)
    }

    /// Snapshot of a visited node
    pub fn node(&self, item_id: &str) -> Option<FolderNode> {
        self.inner.state.lock().nodes.get(item_id).cloned()
    }

    pub fn is_cached(&self, item_id: &str) -> bool {
        self.inner
            .state
            .lock()
            .nodes
            .get(item_id)
            .map(FolderNode::is_cached)
            .unwrap_or(false)
    }

    pub fn node_count(&self) -> usize {
        self.inner.state.lock().nodes.len()
    }

    /// Whether the listener is waiting on a fetch
    pub fn is_loading(&self) -> bool {
        self.inner.state.lock().awaiting.is_some()
    }

    /// Visited folder whose cached listing contains `item_id`, preferring the current one
    pub fn owner_of(&self, item_id: &str) -> Option<ItemId> {
        let state = self.inner.state.lock();
        if state
            .nodes
            .get(&state.current)
            .map(|node| node.lists(item_id))
            .unwrap_or(false)
        {
            return Some(state.current.clone());
        }
        state
            .nodes
            .values()
            .find(|node| node.lists(item_id))
            .map(|node| node.id().to_string())
    }

    fn listener(&self) -> Option<Arc<dyn NavigationListener>> {
        self.inner.listener.read().clone()
    }

    fn dispatch(&self, delivery: Delivery) {
        let listener = self.listener();
        match delivery {
            Delivery::Cached(items) => {
                debug!(count = items.len(), from_cache = true, "Serving listing from cache");
                if let Some(listener) = listener {
                    listener.on_success(&items, true);
                }
            }
            Delivery::Attach => {
                debug!("Attaching to outstanding fetch");
                if let Some(listener) = listener {
                    listener.on_loading();
                }
            }
            Delivery::Fetch(request) => {
                if let Some(listener) = listener {
                    listener.on_loading();
                }
                self.spawn_fetch(request);
            }
        }
    }

    fn spawn_fetch(&self, request: FetchRequest) {
        debug!(item_id = %request.item_id, ticket = request.ticket, "Fetching folder listing");
        let cache = self.clone();
        let client = Arc::clone(&self.inner.client);
        self.inner.runtime.spawn(async move {
            let result = if request.item_id == ROOT_ID {
                client.list_root().await
            } else {
                client.list_children(&request.item_id).await
            };
            cache.complete_fetch(request, result);
        });
    }

    fn complete_fetch(&self, request: FetchRequest, result: Result<Vec<Entry>, DriveError>) {
        let _delivering = self.inner.delivery.lock();
        {
            let mut state = self.inner.state.lock();
            if state.in_flight.get(&request.item_id) != Some(&request.ticket) {
                debug!(
                    item_id = %request.item_id,
                    ticket = request.ticket,
                    "Dropping superseded fetch result"
                );
                return;
            }
            state.in_flight.remove(&request.item_id);

            if let Ok(items) = &result {
                state.store_listing(&request.item_id, items);
            }

            let expected =
                state.awaiting == Some(request.ticket) && state.current == request.item_id;
            if !expected {
                debug!(
                    item_id = %request.item_id,
                    ticket = request.ticket,
                    "Suppressing stale delivery"
                );
                return;
            }
            state.awaiting = None;
        }

        let listener = self.listener();
        match result {
            Ok(items) => {
                debug!(item_id = %request.item_id, count = items.len(), from_cache = false, "Folder listing fetched");
                if let Some(listener) = listener {
                    listener.on_success(&items, false);
                }
            }
            Err(e) => {
                warn!(item_id = %request.item_id, error = %e, "Folder listing failed");
                if let Some(listener) = listener {
                    listener.on_error(&e.to_string());
                }
            }
        }
    }
}
