//! On-demand loading of split keyword files
//!
//! Large reports move the keyword children of some tests and keywords into
//! separate files. The loader asks the host for a file the first time any node
//! needs it and queues every later request for the same file, so each file is
//! requested and decoded once. The host hands the parsed content back through
//! [`SplitFileLoader::announce`].

use crate::error::{Error, Result};
use crate::raw::Raw;
use crate::strings::StringStore;
use futures::channel::oneshot;
use serde::Deserialize;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::future::Future;
use std::path::Path;
use std::rc::Rc;
use tracing::{debug, warn};

/// Content of one split file: a keyword list with its own string table
#[derive(Debug)]
pub struct SplitPayload {
    pub keywords: Rc<[Raw]>,
    pub strings: Rc<StringStore>,
}

#[derive(Deserialize)]
struct SplitPayloadData {
    keywords: Raw,
    strings: Vec<String>,
}

impl SplitPayload {
    pub fn new(keywords: Rc<[Raw]>, strings: Vec<String>) -> Self {
        Self {
            keywords,
            strings: Rc::new(StringStore::new(strings)),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let data: SplitPayloadData = serde_json::from_str(json)?;
        Ok(Self::new(data.keywords.list_rc("split keywords")?, data.strings))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}

/// Host hook that starts fetching a split file.
///
/// The host must eventually call [`SplitFileLoader::announce`] with the
/// file's content; it may do so before `request` returns.
pub trait SplitSource {
    fn request(&self, file_name: &str);
}

type Waiter = Box<dyn FnOnce(&Rc<SplitPayload>)>;

enum FileState {
    Pending(Vec<Waiter>),
    Loaded(Rc<SplitPayload>),
}

pub struct SplitFileLoader {
    source: Box<dyn SplitSource>,
    files: RefCell<HashMap<String, FileState>>,
    requests: Cell<usize>,
}

impl SplitFileLoader {
    pub fn new(source: impl SplitSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            files: RefCell::new(HashMap::new()),
            requests: Cell::new(0),
        }
    }

    /// Run `on_ready` with the file's payload, requesting it on first use.
    ///
    /// Runs synchronously when the file is already loaded; otherwise waiters
    /// fire in registration order once the file is announced.
    pub fn ensure_loaded(&self, file_name: &str, on_ready: impl FnOnce(&Rc<SplitPayload>) + 'static) {
        let mut files = self.files.borrow_mut();
        match files.get_mut(file_name) {
            Some(FileState::Loaded(payload)) => {
                let payload = Rc::clone(payload);
                drop(files);
                on_ready(&payload);
            }
            Some(FileState::Pending(waiters)) => {
                waiters.push(Box::new(on_ready));
                debug!(file = file_name, waiters = waiters.len(), "split file already requested");
            }
            None => {
                files.insert(
                    file_name.to_string(),
                    FileState::Pending(vec![Box::new(on_ready)]),
                );
                drop(files);
                self.requests.set(self.requests.get() + 1);
                debug!(file = file_name, "requesting split file");
                self.source.request(file_name);
            }
        }
    }

    /// Deliver a file's content and release everything waiting on it.
    ///
    /// A second announcement of a loaded file is ignored.
    pub fn announce(&self, file_name: &str, payload: SplitPayload) {
        let payload = Rc::new(payload);
        let waiters = {
            let mut files = self.files.borrow_mut();
            if let Some(FileState::Loaded(_)) = files.get(file_name) {
                warn!(file = file_name, "split file announced twice; keeping the first");
                return;
            }
            match files.insert(file_name.to_string(), FileState::Loaded(Rc::clone(&payload))) {
                Some(FileState::Pending(waiters)) => waiters,
                _ => Vec::new(),
            }
        };
        debug!(file = file_name, waiters = waiters.len(), "split file announced");
        for waiter in waiters {
            waiter(&payload);
        }
    }

    /// Future form of [`ensure_loaded`](Self::ensure_loaded)
    pub fn loaded(&self, file_name: &str) -> impl Future<Output = Result<Rc<SplitPayload>>> {
        let (tx, rx) = oneshot::channel();
        self.ensure_loaded(file_name, move |payload| {
            let _ = tx.send(Rc::clone(payload));
        });
        let file_name = file_name.to_string();
        async move { rx.await.map_err(|_| Error::LoadAbandoned(file_name)) }
    }

    pub fn is_loaded(&self, file_name: &str) -> bool {
        matches!(self.files.borrow().get(file_name), Some(FileState::Loaded(_)))
    }

    pub fn is_requested(&self, file_name: &str) -> bool {
        self.files.borrow().contains_key(file_name)
    }

    /// Number of requests issued to the source
    pub fn request_count(&self) -> usize {
        self.requests.get()
    }

    /// Files requested but not yet announced
    pub fn pending_files(&self) -> Vec<String> {
        let mut pending: Vec<String> = self
            .files
            .borrow()
            .iter()
            .filter(|(_, state)| matches!(state, FileState::Pending(_)))
            .map(|(name, _)| name.clone())
            .collect();
        pending.sort();
        pending
    }

    /// Drop every waiter still queued on an unannounced file
    pub(crate) fn abandon_pending(&self) {
        let abandoned: Vec<Waiter> = {
            let mut files = self.files.borrow_mut();
            let names: Vec<String> = files
                .iter()
                .filter(|(_, state)| matches!(state, FileState::Pending(_)))
                .map(|(name, _)| name.clone())
                .collect();
            names
                .into_iter()
                .filter_map(|name| match files.remove(&name) {
                    Some(FileState::Pending(waiters)) => Some(waiters),
                    _ => None,
                })
                .flatten()
                .collect()
        };
        if !abandoned.is_empty() {
            debug!(waiters = abandoned.len(), "abandoning pending split file waiters");
        }
    }
}

impl fmt::Debug for SplitFileLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SplitFileLoader")
            .field("requests", &self.requests.get())
            .field("pending", &self.pending_files())
            .finish_non_exhaustive()
    }
}

/// Source that queues requested file names for a host pump loop
#[derive(Debug, Clone, Default)]
pub struct RequestQueue {
    queue: Rc<RefCell<VecDeque<String>>>,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pop(&self) -> Option<String> {
        self.queue.borrow_mut().pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    /// Answer queued requests from files in `dir` until none are left.
    ///
    /// Announcing a file can trigger further requests; they are served in the
    /// same loop. Returns the number of files served.
    pub fn serve_from_dir(&self, loader: &SplitFileLoader, dir: &Path) -> Result<usize> {
        let mut served = 0;
        while let Some(file_name) = self.pop() {
            let payload = SplitPayload::from_path(&dir.join(&file_name))?;
            loader.announce(&file_name, payload);
            served += 1;
        }
        Ok(served)
    }
}

impl SplitSource for RequestQueue {
    fn request(&self, file_name: &str) {
        self.queue.borrow_mut().push_back(file_name.to_string());
    }
}
