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

//! Query context
//!
//! Shared, cheaply cloned state every cursor of one execution can see: the
//! store, the executor configuration and a cancellation flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::core::{Error, Result, Schema};
use crate::storage::StoreRef;

use super::config::ExecutorConfig;

#[derive(Clone)]
pub struct QueryContext {
    store: StoreRef,
    config: Arc<ExecutorConfig>,
    /// Cancellation flag
    cancelled: Arc<AtomicBool>,
}

impl QueryContext {
    pub fn new(store: StoreRef) -> Self {
        Self::with_config(store, ExecutorConfig::default())
    }

    pub fn with_config(store: StoreRef, config: ExecutorConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn store(&self) -> &StoreRef {
        &self.store
    }

    pub fn schema(&self) -> &Arc<Schema> {
        self.store.schema()
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn cancellation_handle(&self) -> CancellationHandle {
        CancellationHandle {
            cancelled: Arc::clone(&self.cancelled),
        }
    }

    /// Check for cancellation and return an error if cancelled
    pub fn check_cancelled(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Debug for QueryContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryContext")
            .field("config", &self.config)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Handle for cancelling a query from another thread
#[derive(Debug, Clone)]
pub struct CancellationHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancellationHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DataType, SchemaBuilder, TableSpec};
    use crate::storage::MemoryStore;

    fn context() -> QueryContext {
        let schema = SchemaBuilder::new()
            .table(TableSpec::new("t").add_primary_key("id", DataType::Integer))
            .build()
            .unwrap();
        QueryContext::new(Arc::new(MemoryStore::new(schema)))
    }

    #[test]
    fn test_context_cancellation() {
        let ctx = context();
        assert!(ctx.check_cancelled().is_ok());

        let handle = ctx.cancellation_handle();
        handle.cancel();
        assert!(ctx.is_cancelled());
        assert_eq!(ctx.check_cancelled(), Err(Error::Cancelled));
    }
}
