// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Completion handles
//!
//! A [`JobHandle`] completes exactly once. Work that must follow it is
//! registered as a continuation and launched by whichever thread completes
//! the handle, so worker threads never block on one another. Only
//! [`JobHandle::wait`] blocks, and it is meant for the driving thread.

use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Identifier of a scheduled job
pub type JobId = u64;

type Continuation = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct State {
    done: bool,
    continuations: Vec<Continuation>,
}

#[derive(Default)]
struct Completion {
    state: Mutex<State>,
    signal: Condvar,
}

/// Shared completion flag of one job or of a group of jobs
#[derive(Clone)]
pub struct JobHandle {
    completion: Arc<Completion>,
    /// In-flight jobs this handle waits for, itself included
    covers: Arc<[JobId]>,
}

impl JobHandle {
    /// A handle that is already complete
    pub fn completed() -> Self {
        let handle = JobHandle::pending(Vec::new());
        handle.completion.state.lock().done = true;
        handle
    }

    pub(crate) fn pending(covers: Vec<JobId>) -> Self {
        JobHandle {
            completion: Arc::new(Completion::default()),
            covers: covers.into(),
        }
    }

    /// Check completion without blocking
    pub fn is_complete(&self) -> bool {
        self.completion.state.lock().done
    }

    /// Block until complete
    pub fn wait(&self) {
        let mut state = self.completion.state.lock();
        while !state.done {
            self.completion.signal.wait(&mut state);
        }
    }

    /// Handle that completes once both inputs have completed
    pub fn combine(a: &JobHandle, b: &JobHandle) -> JobHandle {
        JobHandle::combine_all([a, b])
    }

    /// Handle that completes once every input has completed
    ///
    /// An empty input yields a completed handle.
    pub fn combine_all<'a, I>(handles: I) -> JobHandle
    where
        I: IntoIterator<Item = &'a JobHandle>,
    {
        let handles: Vec<&JobHandle> = handles.into_iter().collect();
        let mut covers: Vec<JobId> = handles.iter().flat_map(|h| h.covers.iter().copied()).collect();
        covers.sort_unstable();
        covers.dedup();

        let combined = JobHandle::pending(covers);
        if handles.is_empty() {
            combined.complete();
            return combined;
        }

        let remaining = Arc::new(AtomicUsize::new(handles.len()));
        for handle in handles {
            let remaining = Arc::clone(&remaining);
            let combined = combined.clone();
            handle.on_complete(move || {
                if remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
                    combined.complete();
                }
            });
        }
        combined
    }

    /// Jobs this handle transitively waits for that were still in flight
    /// when it was created
    pub(crate) fn covers(&self) -> &[JobId] {
        &self.covers
    }

    /// Run `f` once this handle completes; immediately if it already has
    pub(crate) fn on_complete(&self, f: impl FnOnce() + Send + 'static) {
        let mut state = self.completion.state.lock();
        if state.done {
            drop(state);
            f();
        } else {
            state.continuations.push(Box::new(f));
        }
    }

    /// Mark complete, wake waiters and run continuations outside the lock
    pub(crate) fn complete(&self) {
        let continuations = {
            let mut state = self.completion.state.lock();
            if state.done {
                return;
            }
            state.done = true;
            std::mem::take(&mut state.continuations)
        };
        self.completion.signal.notify_all();
        for continuation in continuations {
            continuation();
        }
    }
}

impl Default for JobHandle {
    fn default() -> Self {
        JobHandle::completed()
    }
}

impl fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobHandle")
            .field("complete", &self.is_complete())
            .field("covers", &self.covers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn test_completed_handle() {
        let handle = JobHandle::completed();
        assert!(handle.is_complete());
        handle.wait();
    }

    #[test]
    fn test_continuation_runs_on_complete() {
        let handle = JobHandle::pending(vec![1]);
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        handle.on_complete(move || flag.store(true, Ordering::SeqCst));

        assert!(!ran.load(Ordering::SeqCst));
        handle.complete();
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_continuation_on_completed_runs_inline() {
        let handle = JobHandle::completed();
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        handle.on_complete(move || flag.store(true, Ordering::SeqCst));
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_combine_waits_for_all() {
        let a = JobHandle::pending(vec![1]);
        let b = JobHandle::pending(vec![2]);
        let both = JobHandle::combine(&a, &b);
        assert_eq!(both.covers(), &[1, 2]);

        a.complete();
        assert!(!both.is_complete());
        b.complete();
        assert!(both.is_complete());
    }

    #[test]
    fn test_combine_all_empty_is_complete() {
        let none: Vec<JobHandle> = Vec::new();
        assert!(JobHandle::combine_all(&none).is_complete());
    }

    #[test]
    fn test_wait_across_threads() {
        let handle = JobHandle::pending(vec![7]);
        let remote = handle.clone();
        let worker = std::thread::spawn(move || remote.complete());
        handle.wait();
        assert!(handle.is_complete());
        worker.join().unwrap();
    }
}
