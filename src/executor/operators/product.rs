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

//! Nested product
//!
//! Pairs the outer row bound by an enclosing nested loop with every inner
//! row of the inner type. Usually built through
//! [`Api::product_nested_loops`](crate::executor::Api::product_nested_loops).

use crate::core::{Error, Result, Row, RowTypeRef, Schema};
use crate::executor::bindings::QueryBindings;
use crate::executor::context::QueryContext;
use crate::executor::cursor::{managed, Cursor, CursorBody};
use crate::executor::plan::{OperatorRef, PlanNode};

#[derive(Debug)]
pub struct ProductNested {
    input: OperatorRef,
    outer_type: RowTypeRef,
    inner_type: RowTypeRef,
    output_type: RowTypeRef,
    binding_position: usize,
}

impl ProductNested {
    pub fn new(
        schema: &Schema,
        input: OperatorRef,
        outer_type: RowTypeRef,
        inner_type: RowTypeRef,
        binding_position: usize,
    ) -> Result<Self> {
        if outer_type == inner_type {
            return Err(Error::invalid_argument(format!(
                "product of {} with itself",
                outer_type
            )));
        }
        Ok(Self {
            output_type: schema.product_type(&outer_type, &inner_type),
            input,
            outer_type,
            inner_type,
            binding_position,
        })
    }
}

impl PlanNode for ProductNested {
    fn name(&self) -> &'static str {
        "Product_Nested"
    }

    fn cursor(&self, ctx: &QueryContext) -> Result<Box<dyn Cursor>> {
        Ok(managed(ProductCursor {
            input: self.input.cursor(ctx)?,
            outer_type: self.outer_type.clone(),
            inner_type: self.inner_type.id(),
            output_type: self.output_type.clone(),
            binding_position: self.binding_position,
        }))
    }

    fn inputs(&self) -> Vec<&OperatorRef> {
        vec![&self.input]
    }

    fn output_type(&self) -> Option<RowTypeRef> {
        Some(self.output_type.clone())
    }

    fn describe(&self) -> String {
        format!(
            "{} x {} at binding {}",
            self.outer_type, self.inner_type, self.binding_position
        )
    }
}

struct ProductCursor {
    input: Box<dyn Cursor>,
    outer_type: RowTypeRef,
    inner_type: u32,
    output_type: RowTypeRef,
    binding_position: usize,
}

impl CursorBody for ProductCursor {
    fn name(&self) -> &'static str {
        "Product_Nested"
    }

    fn open(&mut self, bindings: &mut QueryBindings) -> Result<()> {
        self.input.open(bindings)
    }

    fn next(&mut self, bindings: &mut QueryBindings) -> Result<Option<Row>> {
        let row = match self.input.next(bindings)? {
            Some(row) => row,
            None => return Ok(None),
        };
        if row.row_type().id() != self.inner_type {
            return Ok(Some(row));
        }
        let outer = bindings.row(self.binding_position)?;
        if outer.row_type() != &self.outer_type {
            return Err(Error::row_type_mismatch(&self.outer_type, outer.row_type()));
        }
        Ok(Some(Row::combine(
            self.output_type.clone(),
            outer.values(),
            row.values(),
            row.hkey().cloned(),
        )))
    }

    fn release(&mut self) {
        self.input.close();
    }
}

#[cfg(test)]
mod tests {
    use crate::core::InputPreservation;
    use crate::executor::operators::test_support::Fixture;

    #[test]
    fn test_product_nested_loops() {
        let f = Fixture::new();
        let customer = f.row_type("customer");
        let address = f.row_type("address");
        let outer = f.api.filter(f.scan(), &[customer.clone()]).unwrap();
        let inner = f
            .api
            .branch_lookup_nested(0, customer.clone(), &address, None, InputPreservation::DiscardInput, 0)
            .unwrap();
        let op = f
            .api
            .product_nested_loops(outer, inner, customer.clone(), address, 0, 1)
            .unwrap();
        let rows = f.run(&op);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].len(), 5);
        assert_eq!(rows[1][1].to_string(), "carol");
        assert_eq!(rows[1][4].to_string(), "rome");
    }
}
