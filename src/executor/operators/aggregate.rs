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

//! Partial aggregation
//!
//! Groups runs of consecutive rows that agree on their leading group-by
//! fields, so the input must already be sorted (or clustered) on them.
//! Output rows hold the group-by values followed by one value per
//! aggregator. With no group-by fields, an empty input still produces one
//! row (COUNT 0, other aggregates NULL).

use std::fmt;

use crate::core::{DataType, Error, Result, Row, RowTypeRef, Schema, Value};
use crate::executor::bindings::QueryBindings;
use crate::executor::context::QueryContext;
use crate::executor::cursor::{managed, Cursor, CursorBody};
use crate::executor::plan::{OperatorRef, PlanNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    /// Non-NULL values of a field
    Count,
    CountStar,
    Sum,
    Min,
    Max,
    Avg,
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AggregateFunction::Count => "COUNT",
            AggregateFunction::CountStar => "COUNT(*)",
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Min => "MIN",
            AggregateFunction::Max => "MAX",
            AggregateFunction::Avg => "AVG",
        };
        f.write_str(name)
    }
}

/// An aggregate function applied to one input field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aggregator {
    pub function: AggregateFunction,
    /// Input field; ignored by `CountStar`
    pub field: usize,
}

impl Aggregator {
    pub fn new(function: AggregateFunction, field: usize) -> Self {
        Self { function, field }
    }

    pub fn count_star() -> Self {
        Self::new(AggregateFunction::CountStar, 0)
    }

    fn result_type(&self, input_type: &RowTypeRef) -> Result<DataType> {
        if self.function == AggregateFunction::CountStar {
            return Ok(DataType::Integer);
        }
        let field_type = input_type.field_type(self.field).ok_or_else(|| {
            Error::invalid_argument(format!(
                "{} of field {} but {} has {} fields",
                self.function,
                self.field,
                input_type,
                input_type.field_count()
            ))
        })?;
        match self.function {
            AggregateFunction::Count | AggregateFunction::CountStar => Ok(DataType::Integer),
            AggregateFunction::Min | AggregateFunction::Max => Ok(field_type),
            AggregateFunction::Sum | AggregateFunction::Avg if !field_type.is_numeric() => Err(
                Error::invalid_argument(format!("{} of non-numeric {}", self.function, field_type)),
            ),
            AggregateFunction::Sum => Ok(field_type),
            AggregateFunction::Avg => Ok(DataType::Float),
        }
    }
}

/// Running state of one aggregator over the current group
#[derive(Debug, Clone)]
enum Accumulator {
    Count(i64),
    Sum(Option<Value>),
    Min(Option<Value>),
    Max(Option<Value>),
    Avg { sum: f64, count: i64 },
}

impl Accumulator {
    fn new(function: AggregateFunction) -> Self {
        match function {
            AggregateFunction::Count | AggregateFunction::CountStar => Accumulator::Count(0),
            AggregateFunction::Sum => Accumulator::Sum(None),
            AggregateFunction::Min => Accumulator::Min(None),
            AggregateFunction::Max => Accumulator::Max(None),
            AggregateFunction::Avg => Accumulator::Avg { sum: 0.0, count: 0 },
        }
    }

    fn accumulate(&mut self, aggregator: &Aggregator, row: &Row) -> Result<()> {
        if aggregator.function == AggregateFunction::CountStar {
            if let Accumulator::Count(n) = self {
                *n += 1;
            }
            return Ok(());
        }
        let value = row.value(aggregator.field)?;
        // aggregates ignore NULLs
        if value.is_null() {
            return Ok(());
        }
        match self {
            Accumulator::Count(n) => *n += 1,
            Accumulator::Sum(sum) => {
                *sum = Some(match sum.take() {
                    Some(s) => s.add(value)?,
                    None => value.clone(),
                });
            }
            Accumulator::Min(min) => {
                if min.as_ref().map_or(true, |m| value < m) {
                    *min = Some(value.clone());
                }
            }
            Accumulator::Max(max) => {
                if max.as_ref().map_or(true, |m| value > m) {
                    *max = Some(value.clone());
                }
            }
            Accumulator::Avg { sum, count } => {
                *sum += value.as_float64().ok_or_else(|| {
                    Error::type_error(format!("AVG of {}", value.data_type()))
                })?;
                *count += 1;
            }
        }
        Ok(())
    }

    fn result(&self, data_type: DataType) -> Value {
        match self {
            Accumulator::Count(n) => Value::integer(*n),
            Accumulator::Sum(v) | Accumulator::Min(v) | Accumulator::Max(v) => {
                v.clone().unwrap_or(Value::null(data_type))
            }
            Accumulator::Avg { count: 0, .. } => Value::null(DataType::Float),
            Accumulator::Avg { sum, count } => Value::float(*sum / *count as f64),
        }
    }
}

#[derive(Debug)]
pub struct AggregatePartial {
    input: OperatorRef,
    input_type: RowTypeRef,
    group_by: usize,
    aggregators: Vec<Aggregator>,
    output_type: RowTypeRef,
}

impl AggregatePartial {
    pub fn new(
        schema: &Schema,
        input: OperatorRef,
        input_type: RowTypeRef,
        group_by: usize,
        aggregators: Vec<Aggregator>,
    ) -> Result<Self> {
        if group_by > input_type.field_count() {
            return Err(Error::invalid_argument(format!(
                "grouping on {} fields of {} with {} fields",
                group_by,
                input_type,
                input_type.field_count()
            )));
        }
        if aggregators.is_empty() && group_by == 0 {
            return Err(Error::invalid_argument("aggregation without group-by or aggregators"));
        }
        let mut fields = input_type.fields()[..group_by].to_vec();
        for aggregator in &aggregators {
            fields.push(aggregator.result_type(&input_type)?);
        }
        Ok(Self {
            output_type: schema.aggregated_type(fields),
            input,
            input_type,
            group_by,
            aggregators,
        })
    }
}

impl PlanNode for AggregatePartial {
    fn name(&self) -> &'static str {
        "Aggregate_Partial"
    }

    fn cursor(&self, ctx: &QueryContext) -> Result<Box<dyn Cursor>> {
        Ok(managed(AggregateCursor {
            input: self.input.cursor(ctx)?,
            input_type: self.input_type.id(),
            group_by: self.group_by,
            aggregators: self.aggregators.clone(),
            output_type: self.output_type.clone(),
            current: None,
            emitted: 0,
            done: false,
        }))
    }

    fn inputs(&self) -> Vec<&OperatorRef> {
        vec![&self.input]
    }

    fn output_type(&self) -> Option<RowTypeRef> {
        Some(self.output_type.clone())
    }

    fn describe(&self) -> String {
        let aggregates: Vec<String> = self
            .aggregators
            .iter()
            .map(|a| match a.function {
                AggregateFunction::CountStar => a.function.to_string(),
                f => format!("{}(${})", f, a.field),
            })
            .collect();
        format!(
            "{} group by {} fields: {}",
            self.input_type,
            self.group_by,
            aggregates.join(", ")
        )
    }
}

struct Group {
    key: Vec<Value>,
    accumulators: Vec<Accumulator>,
}

struct AggregateCursor {
    input: Box<dyn Cursor>,
    input_type: u32,
    group_by: usize,
    aggregators: Vec<Aggregator>,
    output_type: RowTypeRef,
    current: Option<Group>,
    emitted: usize,
    done: bool,
}

impl AggregateCursor {
    fn start_group(&self, key: Vec<Value>) -> Group {
        Group {
            key,
            accumulators: self
                .aggregators
                .iter()
                .map(|a| Accumulator::new(a.function))
                .collect(),
        }
    }

    fn finish_group(&mut self, group: Group) -> Row {
        self.emitted += 1;
        let mut values = group.key;
        let result_types = &self.output_type.fields()[self.group_by..];
        for (acc, data_type) in group.accumulators.iter().zip(result_types) {
            values.push(acc.result(*data_type));
        }
        Row::new(self.output_type.clone(), values)
    }
}

impl CursorBody for AggregateCursor {
    fn name(&self) -> &'static str {
        "Aggregate_Partial"
    }

    fn open(&mut self, bindings: &mut QueryBindings) -> Result<()> {
        self.current = None;
        self.emitted = 0;
        self.done = false;
        self.input.open(bindings)
    }

    fn next(&mut self, bindings: &mut QueryBindings) -> Result<Option<Row>> {
        if self.done {
            return Ok(None);
        }
        while let Some(row) = self.input.next(bindings)? {
            if row.row_type().id() != self.input_type {
                continue;
            }
            let key = &row.values()[..self.group_by];
            let same_group =
                matches!(&self.current, Some(group) if group.key.as_slice() == key);
            let finished = if same_group {
                None
            } else {
                let next = self.start_group(key.to_vec());
                self.current.replace(next)
            };
            if let Some(group) = self.current.as_mut() {
                for (acc, aggregator) in group.accumulators.iter_mut().zip(&self.aggregators) {
                    acc.accumulate(aggregator, &row)?;
                }
            }
            if let Some(group) = finished {
                return Ok(Some(self.finish_group(group)));
            }
        }
        self.done = true;
        if let Some(group) = self.current.take() {
            return Ok(Some(self.finish_group(group)));
        }
        if self.group_by == 0 && self.emitted == 0 {
            let empty = self.start_group(Vec::new());
            return Ok(Some(self.finish_group(empty)));
        }
        Ok(None)
    }

    fn release(&mut self) {
        log::debug!("Aggregate_Partial emitted {} groups", self.emitted);
        self.current = None;
        self.input.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::operators::test_support::Fixture;
    use crate::expression::literal;

    fn values_input(f: &Fixture, rows: &[(i64, Option<i64>)]) -> (OperatorRef, RowTypeRef) {
        let row_type = f
            .api
            .schema()
            .values_type(vec![DataType::Integer, DataType::Integer]);
        let rows = rows
            .iter()
            .map(|(k, v)| {
                let v = match v {
                    Some(v) => Value::integer(*v),
                    None => Value::null(DataType::Integer),
                };
                vec![literal(*k), literal(v)]
            })
            .collect();
        (f.api.values_scan(row_type.clone(), rows).unwrap(), row_type)
    }

    #[test]
    fn test_grouped_runs() {
        let f = Fixture::new();
        let (input, row_type) =
            values_input(&f, &[(1, Some(10)), (1, Some(5)), (2, None), (2, Some(4)), (1, Some(1))]);
        let op = f
            .api
            .aggregate_partial(
                input,
                row_type,
                1,
                vec![
                    Aggregator::count_star(),
                    Aggregator::new(AggregateFunction::Count, 1),
                    Aggregator::new(AggregateFunction::Sum, 1),
                    Aggregator::new(AggregateFunction::Max, 1),
                    Aggregator::new(AggregateFunction::Avg, 1),
                ],
            )
            .unwrap();
        let rows = f.run(&op);
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[0].values(),
            &[
                Value::integer(1),
                Value::integer(2),
                Value::integer(2),
                Value::integer(15),
                Value::integer(10),
                Value::float(7.5)
            ]
        );
        assert_eq!(rows[1][2], Value::integer(1));
        assert_eq!(rows[1][3], Value::integer(4));
        assert_eq!(rows[2][0], Value::integer(1));
    }

    #[test]
    fn test_scalar_aggregate_on_empty_input() {
        let f = Fixture::new();
        let (input, row_type) = values_input(&f, &[]);
        let op = f
            .api
            .aggregate_partial(
                input,
                row_type,
                0,
                vec![Aggregator::count_star(), Aggregator::new(AggregateFunction::Min, 1)],
            )
            .unwrap();
        let rows = f.run(&op);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0], Value::integer(0));
        assert!(rows[0][1].is_null());
    }

    #[test]
    fn test_aggregate_validation() {
        let f = Fixture::new();
        let customer = f.row_type("customer");
        assert!(f
            .api
            .aggregate_partial(f.scan(), customer.clone(), 3, vec![Aggregator::count_star()])
            .is_err());
        assert!(f
            .api
            .aggregate_partial(f.scan(), customer.clone(), -1, vec![Aggregator::count_star()])
            .is_err());
        assert!(f
            .api
            .aggregate_partial(
                f.scan(),
                customer.clone(),
                0,
                vec![Aggregator::new(AggregateFunction::Sum, 1)]
            )
            .is_err());
        assert!(f
            .api
            .aggregate_partial(
                f.scan(),
                customer,
                0,
                vec![Aggregator::new(AggregateFunction::Max, 5)]
            )
            .is_err());
    }
}
