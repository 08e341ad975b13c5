// src/mirror/engine.rs
// =============================================================================
// This module walks a remote directory tree and mirrors it to disk.
//
// How it works:
// 1. The root response (already fetched by the caller) is the first task
// 2. A queue holds pending tasks; at most `concurrency` of them run at once
// 3. A task for a discovered link fetches it. If the FINAL url (after
//    redirects) ends with '/', it is a directory: the local directory is
//    created, the listing is scanned for links, and every child link
//    becomes a new task. Otherwise the body is streamed into a file.
// 4. A failing branch is recorded in the report; siblings carry on
//
// Three sets keep the walk finite and the disk consistent:
//   - `seen`: every url ever scheduled for a fetch (no link fetched twice)
//   - `listed`: every directory url ever listed, keyed by FINAL url, which
//     catches listings that redirect back to an ancestor
//   - `claimed`: every local file path handed to a writer. Different urls
//     can map to one name ("f.bin" and "f.bin?v=2", or two links that
//     redirect to the same file); only the first one is written.
//
// All of that state lives in the scheduling loop. The tasks themselves only
// get owned inputs and hand back a Visit, so no locks are needed.
// =============================================================================

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, info, warn};
use url::Url;

use super::links::{canonical_key, extract_hrefs, resolve_child, segment_name};
use super::report::{DownloadedFile, Failure, FailureKind, Report};
use super::sink::{self, ChunkWriter, SinkError};
use crate::fetch::{FetchError, FetchResult, Fetcher};

#[derive(Debug, Clone)]
pub struct MirrorConfig {
    /// Maximum number of tasks in flight (fetching, listing or writing)
    pub concurrency: usize,
    /// Per-request timeout handed to the Fetcher
    pub timeout: Duration,
    /// Deepest directory level to descend into (root listing = 0)
    pub max_depth: Option<usize>,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            timeout: Duration::from_secs(30),
            max_depth: None,
        }
    }
}

// One unit of work for the pool
enum Task {
    /// A link found in a listing, not fetched yet
    Fetch { url: Url, parent: PathBuf, depth: usize },
    /// A fetched directory, to be created locally and scanned for links
    List { result: FetchResult, parent: PathBuf, depth: usize },
    /// A fetched file, to be streamed to an already claimed path
    Save { result: FetchResult, path: PathBuf },
}

// What a finished task hands back to the scheduling loop
enum Visit {
    Directory { result: FetchResult, parent: PathBuf, depth: usize },
    File { result: FetchResult, parent: PathBuf },
    Listed { dir: PathBuf, children: Vec<Url>, depth: usize },
    Saved(DownloadedFile),
    Failed(Failure),
}

pub struct Mirror {
    fetcher: Fetcher,
    config: MirrorConfig,
}

// Bookkeeping owned by the scheduling loop
#[derive(Default)]
struct Walk {
    queue: VecDeque<Task>,
    seen: HashSet<String>,
    listed: HashSet<String>,
    claimed: HashSet<PathBuf>,
    report: Report,
}

impl Mirror {
    pub fn new(fetcher: Fetcher, config: MirrorConfig) -> Self {
        Self { fetcher, config }
    }

    // Mirrors everything reachable from `root` into `dest`
    //
    // Parameters:
    //   root: the already fetched root response (its body not read yet)
    //   dest: existing local directory to mirror into
    //
    // Returns: a Report of every directory, file and failure
    //
    // A directory root lands in dest/<name>/..., a file root in dest/<name>.
    // Never fails as a whole: every problem ends up in Report::failures.
    pub async fn run(&self, root: FetchResult, dest: &Path) -> Report {
        info!(root = %root.final_url(), dest = %dest.display(), "mirroring");

        let mut walk = Walk::default();

        // The root counts as seen, so a listing linking to itself is skipped
        walk.seen.insert(canonical_key(root.final_url()));

        // Same classification as for every other node: trailing slash or not
        if root.is_directory() {
            walk.accept_directory(root, dest.to_path_buf(), 0, self.config.max_depth);
        } else {
            walk.accept_file(root, dest);
        }

        // A zero from a caller would stall the loop forever
        let concurrency = self.config.concurrency.max(1);

        // The "worker pool": every future in here is one running task
        let mut in_flight = FuturesUnordered::new();

        loop {
            // Top the pool up from the queue
            while in_flight.len() < concurrency {
                match walk.queue.pop_front() {
                    Some(task) => in_flight.push(self.visit(task)),
                    None => break,
                }
            }

            // Nothing running and nothing queued: the walk is over
            let Some(visit) = in_flight.next().await else {
                break;
            };

            match visit {
                Visit::Directory { result, parent, depth } => {
                    walk.accept_directory(result, parent, depth, self.config.max_depth);
                }
                Visit::File { result, parent } => {
                    walk.accept_file(result, &parent);
                }
                Visit::Listed { dir, children, depth } => {
                    walk.report.directories += 1;

                    // Queue every child we have not scheduled before
                    for child in children {
                        if walk.seen.insert(canonical_key(&child)) {
                            walk.queue.push_back(Task::Fetch {
                                url: child,
                                parent: dir.clone(),
                                depth: depth + 1,
                            });
                        }
                    }
                }
                Visit::Saved(file) => walk.report.files.push(file),
                Visit::Failed(failure) => walk.record(failure),
            }
        }

        info!(
            directories = walk.report.directories,
            files = walk.report.files.len(),
            failures = walk.report.failures.len(),
            "mirror finished"
        );
        walk.report
    }

    // Runs one task to completion
    //
    // Parameters:
    //   task: the work item popped from the queue (owned, moved in)
    //
    // Returns: a Visit telling the loop what happened. Fetch tasks only
    // classify; directories and files go back to the loop, which decides
    // whether they are listed or written.
    async fn visit(&self, task: Task) -> Visit {
        match task {
            Task::Fetch { url, parent, depth } => match self.fetcher.fetch(&url).await {
                // The FINAL url decides, not the href we requested
                Ok(result) if result.is_directory() => Visit::Directory {
                    result,
                    parent,
                    depth,
                },
                Ok(result) => Visit::File { result, parent },
                Err(e) => Visit::Failed(fetch_failure(&url, &e)),
            },
            Task::List {
                result,
                parent,
                depth,
            } => match list_directory(result, &parent).await {
                Ok((dir, children)) => Visit::Listed {
                    dir,
                    children,
                    depth,
                },
                Err(failure) => Visit::Failed(failure),
            },
            Task::Save { result, path } => match save_file(result, path).await {
                Ok(file) => Visit::Saved(file),
                Err(failure) => Visit::Failed(failure),
            },
        }
    }
}

impl Walk {
    // Schedules a fetched directory for listing, unless it was listed before
    // or lies deeper than max_depth
    //
    // Parameters:
    //   result: the directory response, body still unread
    //   parent: local directory the new directory goes into
    //   depth: 0 for the root listing, +1 per level below it
    //   max_depth: the --max-depth limit, if any
    fn accept_directory(
        &mut self,
        result: FetchResult,
        parent: PathBuf,
        depth: usize,
        max_depth: Option<usize>,
    ) {
        let url = result.final_url().to_string();

        // Keyed by the final url: catches redirects back to an ancestor
        if !self.listed.insert(canonical_key(result.final_url())) {
            debug!(%url, "directory already listed, skipping");
            return;
        }

        if max_depth.is_some_and(|max| depth > max) {
            debug!(%url, depth, "beyond max depth, skipping");
            self.report.failures.push(Failure {
                url,
                kind: FailureKind::DepthLimit,
                status: None,
                message: format!("not descended: depth {} exceeds --max-depth", depth),
            });
            return;
        }

        // Listing tasks hold an open response; run them before new fetches
        self.queue.push_front(Task::List {
            result,
            parent,
            depth,
        });
    }

    // Schedules a fetched file for writing, unless its local path is taken
    //
    // Parameters:
    //   result: the file response, body still unread
    //   parent: local directory the file goes into
    //
    // A path is claimed here, before any writer exists, so two urls that
    // decode to the same name can never write the same file at once.
    fn accept_file(&mut self, result: FetchResult, parent: &Path) {
        let url = result.final_url().clone();

        // Names like ".." or "a/b" never reach the filesystem
        let path = match sink::child_path(parent, &segment_name(&url)) {
            Ok(path) => path,
            Err(e) => {
                self.record(sink_failure(&url, &e));
                return;
            }
        };

        if !self.claimed.insert(path.clone()) {
            self.record(Failure {
                url: url.to_string(),
                kind: FailureKind::NameCollision,
                status: None,
                message: format!("{} is already written from another url", path.display()),
            });
            return;
        }

        // Same reason as listings: the response is open, write it next
        self.queue.push_front(Task::Save { result, path });
    }

    fn record(&mut self, failure: Failure) {
        warn!(url = %failure.url, "{}", failure.message);
        self.report.failures.push(failure);
    }
}

// Creates the local directory for a listing and returns its child links
//
// Parameters:
//   result: the directory response (consumed: its body is the listing)
//   parent: local directory to create the new directory in
//
// Returns: (the local directory, absolute urls of its children)
async fn list_directory(result: FetchResult, parent: &Path) -> Result<(PathBuf, Vec<Url>), Failure> {
    let url = result.final_url().clone();
    debug!(%url, status = result.status(), content_type = result.content_type(), "directory");

    // The directory must exist before any child is written into it
    let dir = sink::child_path(parent, &segment_name(&url)).map_err(|e| sink_failure(&url, &e))?;
    sink::ensure_dir(&dir)
        .await
        .map_err(|e| sink_failure(&url, &e))?;

    // A directory that is not an HTML listing has nothing to descend into
    if !result.is_html() {
        debug!(%url, "not an HTML listing, nothing to descend into");
        return Ok((dir, Vec::new()));
    }

    let html = result.text().await.map_err(|e| fetch_failure(&url, &e))?;
    let children: Vec<Url> = extract_hrefs(&html)
        .iter()
        .filter_map(|href| resolve_child(&url, href))
        .collect();

    info!(%url, links = children.len(), "listed {}", dir.display());
    Ok((dir, children))
}

// Streams a response body into an already claimed path
//
// Parameters:
//   result: the file response (consumed: its body is written out)
//   path: where to write it; created or truncated
//
// Returns: what was written, or the failure. On any failure after the file
// was created (body read or disk write) the partial file is removed, so the
// mirror never holds a silently truncated file.
async fn save_file(mut result: FetchResult, path: PathBuf) -> Result<DownloadedFile, Failure> {
    let url = result.final_url().clone();

    let mut writer = ChunkWriter::create(path.clone())
        .await
        .map_err(|e| sink_failure(&url, &e))?;

    let written = match copy_body(&mut result, &mut writer, &url).await {
        Ok(()) => writer.finish().await.map_err(|e| sink_failure(&url, &e)),
        Err(failure) => {
            // Close the file before removing it
            drop(writer);
            Err(failure)
        }
    };

    let written = match written {
        Ok(written) => written,
        Err(failure) => {
            remove_partial(&path).await;
            return Err(failure);
        }
    };

    info!(%url, bytes = written.bytes, "saved {}", written.path.display());

    Ok(DownloadedFile {
        url: url.to_string(),
        path: written.path.display().to_string(),
        bytes: written.bytes,
        chunks: written.chunks,
    })
}

// Pumps body chunks from the network into the writer until the body ends
async fn copy_body(result: &mut FetchResult, writer: &mut ChunkWriter, url: &Url) -> Result<(), Failure> {
    while let Some(chunk) = result.chunk().await.map_err(|e| fetch_failure(url, &e))? {
        writer.push(&chunk).await.map_err(|e| sink_failure(url, &e))?;
    }
    Ok(())
}

async fn remove_partial(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!(path = %path.display(), "could not remove partial file: {}", e);
    }
}

fn fetch_failure(url: &Url, error: &FetchError) -> Failure {
    Failure {
        url: url.to_string(),
        kind: FailureKind::Fetch,
        status: error.status(),
        message: error.to_string(),
    }
}

fn sink_failure(url: &Url, error: &SinkError) -> Failure {
    Failure {
        url: url.to_string(),
        kind: FailureKind::Filesystem,
        status: None,
        message: error.to_string(),
    }
}


// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. What is FuturesUnordered?
//    - A set of futures polled together; next() yields whichever finishes first
//    - Here it is the "worker pool": its length is the number of tasks in flight
//    - Unlike tokio::spawn, the futures may borrow `self`, so no Arc is needed
//
// 2. Why do tasks return a Visit instead of touching the queue?
//    - Only the loop owns the queue, the visited sets and the report
//    - A single owner means plain HashSet/VecDeque, no Mutex
//
// 3. What is let-else?
//    - `let Some(x) = expr else { break; };` binds x or runs the else block
//    - The else block must leave the scope (break, return, continue)
//
// 4. Why push_front for listings and saves?
//    - A fetched directory or file holds an open HTTP response
//    - Handling it soon frees the connection for the next fetch
// -----------------------------------------------------------------------------
