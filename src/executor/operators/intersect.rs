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

//! Ordered intersection
//!
//! Merges two inputs sorted on their comparison fields and emits the rows
//! of one side (the output side) that have a match on the other side.
//! Several output rows may match the same probe row, so the probe side
//! only advances past keys smaller than the current output key.
//!
//! An outer join type keeps unmatched output rows as well: `Left` with
//! `OutputLeft`, `Right` with `OutputRight`.
//!
//! `SkipScan` is accepted but runs as a sequential scan: cursors cannot
//! seek, so skipping would still read every row.

use std::cmp::Ordering;

use crate::core::{
    Error, IntersectOption, IntersectOptions, JoinType, Result, Row, RowTypeRef,
};
use crate::executor::bindings::QueryBindings;
use crate::executor::context::QueryContext;
use crate::executor::cursor::{managed, Cursor, CursorBody};
use crate::executor::plan::{OperatorRef, PlanNode};
use crate::executor::utils::compare_directed;

use super::union::{next_of_type, MergeKey};

#[derive(Debug)]
pub struct IntersectOrdered {
    left: OperatorRef,
    right: OperatorRef,
    left_type: RowTypeRef,
    right_type: RowTypeRef,
    left_key: MergeKey,
    right_key: MergeKey,
    ascending: Vec<bool>,
    join_type: JoinType,
    options: IntersectOptions,
}

impl IntersectOrdered {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        left: OperatorRef,
        right: OperatorRef,
        left_type: RowTypeRef,
        right_type: RowTypeRef,
        left_ordering_fields: usize,
        right_ordering_fields: usize,
        ascending: Vec<bool>,
        join_type: JoinType,
        options: IntersectOptions,
    ) -> Result<Self> {
        let output_left = options.contains(IntersectOption::OutputLeft);
        let output_right = options.contains(IntersectOption::OutputRight);
        if output_left == output_right {
            return Err(Error::invalid_argument(format!(
                "intersect must output exactly one side: {:?}",
                options
            )));
        }
        if options.contains(IntersectOption::SequentialScan)
            && options.contains(IntersectOption::SkipScan)
        {
            return Err(Error::invalid_argument(
                "intersect cannot use both sequential and skip scans",
            ));
        }
        match join_type {
            JoinType::Inner => {}
            JoinType::Left if output_left => {}
            JoinType::Right if output_right => {}
            _ => {
                return Err(Error::invalid_argument(format!(
                    "{} intersect cannot output {:?}",
                    join_type, options
                )))
            }
        }
        let left_key = MergeKey::new(&left_type, left_ordering_fields, ascending.len())?;
        let right_key = MergeKey::new(&right_type, right_ordering_fields, ascending.len())?;
        Ok(Self {
            left,
            right,
            left_type,
            right_type,
            left_key,
            right_key,
            ascending,
            join_type,
            options,
        })
    }
}

impl PlanNode for IntersectOrdered {
    fn name(&self) -> &'static str {
        "Intersect_Ordered"
    }

    fn cursor(&self, ctx: &QueryContext) -> Result<Box<dyn Cursor>> {
        let left = Side {
            input: self.left.cursor(ctx)?,
            row_type: self.left_type.id(),
            key: self.left_key.clone(),
            current: None,
        };
        let right = Side {
            input: self.right.cursor(ctx)?,
            row_type: self.right_type.id(),
            key: self.right_key.clone(),
            current: None,
        };
        let (output, probe) = if self.options.contains(IntersectOption::OutputLeft) {
            (left, right)
        } else {
            (right, left)
        };
        Ok(managed(IntersectCursor {
            output,
            probe,
            ascending: self.ascending.clone(),
            keep_unmatched: self.join_type != JoinType::Inner,
            matched: 0,
        }))
    }

    fn inputs(&self) -> Vec<&OperatorRef> {
        vec![&self.left, &self.right]
    }

    fn describe(&self) -> String {
        format!(
            "{} {} ascending {:?} {} {:?}",
            self.left_type, self.right_type, self.ascending, self.join_type, self.options
        )
    }
}

struct Side {
    input: Box<dyn Cursor>,
    row_type: u32,
    key: MergeKey,
    current: Option<Row>,
}

impl Side {
    fn advance(&mut self, bindings: &mut QueryBindings) -> Result<()> {
        self.current = next_of_type(self.input.as_mut(), self.row_type, bindings)?;
        Ok(())
    }
}

struct IntersectCursor {
    output: Side,
    probe: Side,
    ascending: Vec<bool>,
    keep_unmatched: bool,
    matched: usize,
}

impl CursorBody for IntersectCursor {
    fn name(&self) -> &'static str {
        "Intersect_Ordered"
    }

    fn open(&mut self, bindings: &mut QueryBindings) -> Result<()> {
        self.matched = 0;
        self.output.input.open(bindings)?;
        self.probe.input.open(bindings)?;
        self.output.advance(bindings)?;
        self.probe.advance(bindings)
    }

    fn next(&mut self, bindings: &mut QueryBindings) -> Result<Option<Row>> {
        loop {
            let ord = match (&self.output.current, &self.probe.current) {
                (None, _) => return Ok(None),
                (Some(_), None) if self.keep_unmatched => Ordering::Less,
                (Some(_), None) => return Ok(None),
                (Some(out), Some(probe)) => compare_directed(
                    self.output.key.key(out),
                    self.probe.key.key(probe),
                    &self.ascending,
                ),
            };
            match ord {
                Ordering::Greater => self.probe.advance(bindings)?,
                Ordering::Less if !self.keep_unmatched => self.output.advance(bindings)?,
                _ => {
                    if ord == Ordering::Equal {
                        self.matched += 1;
                    }
                    let row = self.output.current.take();
                    self.output.advance(bindings)?;
                    return Ok(row);
                }
            }
        }
    }

    fn release(&mut self) {
        log::debug!("Intersect_Ordered matched {} rows", self.matched);
        self.output.current = None;
        self.probe.current = None;
        self.output.input.close();
        self.probe.input.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DataType;
    use crate::executor::operators::test_support::Fixture;
    use crate::expression::literal;

    fn input(f: &Fixture, row_type: &RowTypeRef, rows: &[(&str, i64)]) -> OperatorRef {
        let rows = rows
            .iter()
            .map(|(tag, k)| vec![literal(*tag), literal(*k)])
            .collect();
        f.api.values_scan(row_type.clone(), rows).unwrap()
    }

    fn tags(rows: &[Row]) -> Vec<String> {
        rows.iter().map(|r| r[0].to_string()).collect()
    }

    #[test]
    fn test_output_left_matches() {
        let f = Fixture::new();
        let t = f.api.schema().values_type(vec![DataType::Text, DataType::Integer]);
        let left = input(&f, &t, &[("a", 1), ("b", 2), ("c", 2), ("d", 4), ("e", 5)]);
        let right = input(&f, &t, &[("x", 2), ("y", 3), ("z", 5)]);
        let op = f
            .api
            .intersect_ordered(
                left,
                right,
                t.clone(),
                t.clone(),
                1,
                1,
                &[true],
                JoinType::Inner,
                IntersectOptions::of(&[IntersectOption::OutputLeft]),
            )
            .unwrap();
        assert_eq!(tags(&f.run(&op)), vec!["b", "c", "e"]);
    }

    #[test]
    fn test_output_right_descending() {
        let f = Fixture::new();
        let t = f.api.schema().values_type(vec![DataType::Text, DataType::Integer]);
        let left = input(&f, &t, &[("a", 5), ("b", 3), ("c", 1)]);
        let right = input(&f, &t, &[("x", 5), ("y", 4), ("z", 1)]);
        let op = f
            .api
            .intersect_ordered(
                left,
                right,
                t.clone(),
                t.clone(),
                1,
                1,
                &[false],
                JoinType::Inner,
                IntersectOptions::of(&[IntersectOption::OutputRight, IntersectOption::SkipScan]),
            )
            .unwrap();
        assert_eq!(tags(&f.run(&op)), vec!["x", "z"]);
    }

    #[test]
    fn test_left_join_keeps_unmatched() {
        let f = Fixture::new();
        let t = f.api.schema().values_type(vec![DataType::Text, DataType::Integer]);
        let left = input(&f, &t, &[("a", 1), ("b", 2), ("c", 9)]);
        let right = input(&f, &t, &[("x", 2)]);
        let op = f
            .api
            .intersect_ordered(
                left,
                right,
                t.clone(),
                t.clone(),
                1,
                1,
                &[true],
                JoinType::Left,
                IntersectOptions::of(&[IntersectOption::OutputLeft]),
            )
            .unwrap();
        assert_eq!(tags(&f.run(&op)), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_option_validation() {
        let f = Fixture::new();
        let t = f.api.schema().values_type(vec![DataType::Text, DataType::Integer]);
        let build = |join: JoinType, options: &[IntersectOption]| {
            f.api.intersect_ordered(
                input(&f, &t, &[]),
                input(&f, &t, &[]),
                t.clone(),
                t.clone(),
                1,
                1,
                &[true],
                join,
                IntersectOptions::of(options),
            )
        };
        use IntersectOption::*;
        assert!(build(JoinType::Inner, &[]).is_err());
        assert!(build(JoinType::Inner, &[OutputLeft, OutputRight]).is_err());
        assert!(build(JoinType::Inner, &[OutputLeft, SequentialScan, SkipScan]).is_err());
        assert!(build(JoinType::Left, &[OutputRight]).is_err());
        assert!(build(JoinType::Right, &[OutputLeft]).is_err());
        assert!(build(JoinType::Full, &[OutputLeft]).is_err());
        assert!(build(JoinType::Right, &[OutputRight, SequentialScan]).is_ok());
    }
}
