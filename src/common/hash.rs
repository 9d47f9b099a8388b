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

//! Key hashing shared by bloom filters and duplicate suppression

use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

use crate::core::{CollatorRef, Value};

/// Hash a composite key. Text fields with a collator hash by their
/// collation key, so collator-equal strings hash alike.
pub fn hash_key<'a>(
    values: impl IntoIterator<Item = &'a Value>,
    collators: Option<&[Option<CollatorRef>]>,
) -> u64 {
    let mut hasher = FxHasher::default();
    for (i, value) in values.into_iter().enumerate() {
        let collator = collators.and_then(|c| c.get(i)).and_then(|c| c.as_ref());
        match (collator, value) {
            (Some(c), Value::Text(s)) => {
                3u8.hash(&mut hasher);
                c.hash_key(s).hash(&mut hasher);
            }
            _ => value.hash(&mut hasher),
        }
    }
    // bloom bit indexes read the high half, so mix it in
    let h = hasher.finish();
    let h = (h ^ (h >> 33)).wrapping_mul(0xff51_afd7_ed55_8ccd);
    let h = (h ^ (h >> 33)).wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    h ^ (h >> 33)
}
