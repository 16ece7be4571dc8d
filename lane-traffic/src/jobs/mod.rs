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
//! Job scheduling
//!
//! - [`JobHandle`]: completion flag with `combine` / `combine_all`
//! - [`Access`]: component kinds a job reads and writes
//! - [`JobScheduler`]: runs jobs on a worker pool once their dependencies
//!   complete, rejecting undeclared conflicting access

mod access;
mod handle;
mod scheduler;

pub use access::Access;
pub use handle::{JobHandle, JobId};
pub use scheduler::JobScheduler;
