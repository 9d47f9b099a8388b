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

//! Projection
//!
//! Rows of the input type are replaced by the values of the projection
//! expressions; other rows pass through. The hKey of the input row is kept,
//! so a projected stream stays hKey-ordered.

use crate::core::{Error, Result, Row, RowTypeRef};
use crate::executor::bindings::QueryBindings;
use crate::executor::context::QueryContext;
use crate::executor::cursor::{managed, Cursor, CursorBody};
use crate::executor::plan::{OperatorRef, PlanNode};
use crate::expression::ExpressionRef;

#[derive(Debug)]
pub struct Project {
    input: OperatorRef,
    input_type: RowTypeRef,
    output_type: RowTypeRef,
    projections: Vec<ExpressionRef>,
}

impl Project {
    pub fn new(
        input: OperatorRef,
        input_type: RowTypeRef,
        output_type: RowTypeRef,
        projections: Vec<ExpressionRef>,
    ) -> Result<Self> {
        if projections.len() != output_type.field_count() {
            return Err(Error::invalid_argument(format!(
                "{} projections for {} with {} fields",
                projections.len(),
                output_type,
                output_type.field_count()
            )));
        }
        for (i, p) in projections.iter().enumerate() {
            let expected = output_type.field_type(i).unwrap_or_default();
            if !expected.accepts(p.result_type()) {
                return Err(Error::invalid_argument(format!(
                    "projection {} yields {}, {} expects {}",
                    i,
                    p.result_type(),
                    output_type,
                    expected
                )));
            }
        }
        Ok(Self {
            input,
            input_type,
            output_type,
            projections,
        })
    }
}

impl PlanNode for Project {
    fn name(&self) -> &'static str {
        "Project_Default"
    }

    fn cursor(&self, ctx: &QueryContext) -> Result<Box<dyn Cursor>> {
        Ok(managed(ProjectCursor {
            input: self.input.cursor(ctx)?,
            input_type: self.input_type.id(),
            output_type: self.output_type.clone(),
            projections: self.projections.clone(),
        }))
    }

    fn inputs(&self) -> Vec<&OperatorRef> {
        vec![&self.input]
    }

    fn output_type(&self) -> Option<RowTypeRef> {
        Some(self.output_type.clone())
    }

    fn describe(&self) -> String {
        format!("{} -> {}", self.input_type, self.output_type)
    }
}

struct ProjectCursor {
    input: Box<dyn Cursor>,
    input_type: u32,
    output_type: RowTypeRef,
    projections: Vec<ExpressionRef>,
}

impl CursorBody for ProjectCursor {
    fn name(&self) -> &'static str {
        "Project_Default"
    }

    fn open(&mut self, bindings: &mut QueryBindings) -> Result<()> {
        self.input.open(bindings)
    }

    fn next(&mut self, bindings: &mut QueryBindings) -> Result<Option<Row>> {
        let row = match self.input.next(bindings)? {
            Some(row) => row,
            None => return Ok(None),
        };
        if row.row_type().id() != self.input_type {
            return Ok(Some(row));
        }
        let values = self
            .projections
            .iter()
            .map(|p| p.evaluate(Some(&row), bindings))
            .collect::<Result<Vec<_>>>()?;
        let mut projected = Row::new(self.output_type.clone(), values);
        projected.set_hkey(row.hkey().cloned());
        Ok(Some(projected))
    }

    fn release(&mut self) {
        self.input.close();
    }
}

#[cfg(test)]
mod tests {
    use crate::core::{DataType, Value};
    use crate::executor::operators::test_support::Fixture;
    use crate::expression::{field, literal};

    #[test]
    fn test_project_passes_other_types() {
        let f = Fixture::new();
        let order = f.row_type("order");
        let input = f.api.filter(f.scan(), &[f.row_type("customer"), order.clone()]).unwrap();
        let op = f
            .api
            .project(input, order.clone(), vec![field(&order, 2), literal("x")])
            .unwrap();
        let rows = f.run(&op);
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].row_type().name(), "customer");
        assert_eq!(rows[1].values(), &[Value::integer(100), Value::text("x")]);
        assert_eq!(rows[1].row_type().fields(), &[DataType::Integer, DataType::Text]);
        assert!(rows[1].hkey().is_some());
    }

    #[test]
    fn test_project_table_arity() {
        let f = Fixture::new();
        let customer = f.row_type("customer");
        let order = f.row_type("order");
        assert!(f
            .api
            .project_table(f.scan(), order.clone(), customer.clone(), vec![field(&order, 1)])
            .is_err());
        let op = f
            .api
            .project_table(f.scan(), order.clone(), customer.clone(), vec![field(&order, 1), literal("o")])
            .unwrap();
        let rows = f.run(&op);
        assert_eq!(rows.iter().filter(|r| r.row_type() == &customer).count(), 6);
    }
}
