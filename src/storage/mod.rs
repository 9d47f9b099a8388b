// Copyright 2025 Stoolap Contributors
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

//! Group storage
//!
//! - [`GroupStore`] - the row source operators read from and write to
//! - [`IndexScanRequest`] - key range, ordering and level selection of an index scan
//! - [`MemoryStore`] - B-tree backed store used by tests and embedders

pub mod memory;
pub mod request;
pub mod traits;

pub use memory::MemoryStore;
pub use request::{IndexScanRequest, IndexScanSelector, KeyBound, KeyRange};
pub use traits::{GroupStore, RowStream, StoreRef, VecRowStream};
