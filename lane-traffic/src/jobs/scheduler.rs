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
//! Dependency-tracked job scheduler
//!
//! Jobs are closures with a declared [`Access`] and a dependency handle.
//! A job is launched onto the worker pool as soon as its dependency
//! completes; jobs whose dependencies are already complete may run
//! concurrently with each other.
//!
//! Ordering between conflicting jobs is never inferred. Scheduling a job
//! whose access conflicts with an in-flight job that its dependency does not
//! cover is rejected with [`ScheduleError::MissingDependency`].
//!
//! With the `parallel` feature the pool is a Rayon [`ThreadPool`]; without
//! it jobs run inline on the thread that completes their dependency.

use crate::error::ScheduleError;
use crate::jobs::access::Access;
use crate::jobs::handle::{JobHandle, JobId};
use parking_lot::Mutex;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[cfg(feature = "parallel")]
use rayon::ThreadPool;

struct InFlight {
    id: JobId,
    name: &'static str,
    access: Access,
}

/// Launches ready jobs
#[derive(Clone)]
struct Launcher {
    #[cfg(feature = "parallel")]
    pool: Arc<ThreadPool>,
}

impl Launcher {
    fn launch(&self, job: impl FnOnce() + Send + 'static) {
        #[cfg(feature = "parallel")]
        {
            self.pool.spawn(job);
        }
        #[cfg(not(feature = "parallel"))]
        {
            job();
        }
    }
}

/// Runs jobs on a worker pool honoring declared dependencies
pub struct JobScheduler {
    launcher: Launcher,
    in_flight: Arc<Mutex<Vec<InFlight>>>,
    next_id: AtomicU64,
}

impl JobScheduler {
    /// Create a scheduler; `worker_threads == 0` lets Rayon pick the count
    pub fn new(worker_threads: usize) -> Result<Self, ScheduleError> {
        #[cfg(feature = "parallel")]
        let launcher = {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(worker_threads)
                .thread_name(|i| format!("traffic-worker-{}", i))
                .build()
                .map_err(|e| ScheduleError::PoolBuild(e.to_string()))?;
            log::info!("job scheduler started with {} worker threads", pool.current_num_threads());
            Launcher { pool: Arc::new(pool) }
        };
        #[cfg(not(feature = "parallel"))]
        let launcher = {
            let _ = worker_threads;
            log::info!("job scheduler running jobs inline");
            Launcher {}
        };

        Ok(JobScheduler {
            launcher,
            in_flight: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(0),
        })
    }

    /// Number of worker threads; 1 when jobs run inline
    pub fn thread_count(&self) -> usize {
        #[cfg(feature = "parallel")]
        {
            self.launcher.pool.current_num_threads()
        }
        #[cfg(not(feature = "parallel"))]
        {
            1
        }
    }

    /// Number of scheduled jobs that have not finished yet
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Schedule `task` to run after `depends_on` completes
    ///
    /// The returned handle completes after the task has run, even if it
    /// panicked; the panic is logged and does not propagate.
    pub fn schedule<F>(
        &self,
        name: &'static str,
        access: Access,
        depends_on: &JobHandle,
        task: F,
    ) -> Result<JobHandle, ScheduleError>
    where
        F: FnOnce() + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let handle = {
            let mut in_flight = self.in_flight.lock();
            for job in in_flight.iter() {
                if let Some(kind) = access.conflicts_with(&job.access) {
                    if !depends_on.covers().contains(&job.id) {
                        return Err(ScheduleError::MissingDependency {
                            job: name,
                            conflicting: job.name,
                            kind: kind.name(),
                        });
                    }
                }
            }

            let mut covers: Vec<JobId> = depends_on
                .covers()
                .iter()
                .copied()
                .filter(|covered| in_flight.iter().any(|job| job.id == *covered))
                .collect();
            covers.push(id);
            in_flight.push(InFlight { id, name, access });
            JobHandle::pending(covers)
        };

        let done = handle.clone();
        let in_flight = Arc::clone(&self.in_flight);
        let launcher = self.launcher.clone();
        depends_on.on_complete(move || {
            launcher.launch(move || {
                if let Err(payload) = catch_unwind(AssertUnwindSafe(task)) {
                    log::error!("job '{}' panicked: {}", name, panic_message(payload.as_ref()));
                }
                in_flight.lock().retain(|job| job.id != id);
                done.complete();
            });
        });

        Ok(handle)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "<non-string panic payload>"
    }
}
