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

// Integration tests for scans, selection, flattening and lookups driven
// through the public query cursor

use std::sync::Arc;

use groupflow::executor::{IndexKeyRange, IndexOrdering};
use groupflow::expression::{bound_field, bound_value, compare, field, literal};
use groupflow::{
    Api, CompareOp, DataType, FlattenOptions, IndexScanSelector, IndexSpec, InputPreservation,
    JoinType, MemoryStore, MultipleBindingsCursor, QueryBindings, QueryContext, QueryCursor, Row,
    SchemaBuilder, TableSpec, Value,
};

struct Setup {
    api: Api,
    store: Arc<MemoryStore>,
    ctx: QueryContext,
}

fn setup() -> Setup {
    let _ = env_logger::builder().is_test(true).try_init();
    let schema = SchemaBuilder::new()
        .table(
            TableSpec::new("customer")
                .add_primary_key("cid", DataType::Integer)
                .add("name", DataType::Text),
        )
        .table(
            TableSpec::new("order")
                .child_of("customer", &["cid"])
                .add_primary_key("oid", DataType::Integer)
                .add("cid", DataType::Integer)
                .add("total", DataType::Integer),
        )
        .table(
            TableSpec::new("item")
                .child_of("order", &["oid"])
                .add_primary_key("iid", DataType::Integer)
                .add("oid", DataType::Integer)
                .add("sku", DataType::Text),
        )
        .table(
            TableSpec::new("address")
                .child_of("customer", &["cid"])
                .add_primary_key("aid", DataType::Integer)
                .add("cid", DataType::Integer)
                .add("city", DataType::Text),
        )
        .index(IndexSpec::new("customer_name").column("customer", "name"))
        .build()
        .expect("schema");

    let store = Arc::new(MemoryStore::new(Arc::clone(&schema)));
    let int = Value::integer;
    for (cid, name) in [(1, "alice"), (2, "bob"), (3, "carol")] {
        store.insert("customer", vec![int(cid), Value::text(name)]).unwrap();
    }
    for (oid, cid, total) in [(10, 1, 100), (11, 1, 50), (20, 2, 75)] {
        store.insert("order", vec![int(oid), int(cid), int(total)]).unwrap();
    }
    for (iid, oid, sku) in [(100, 10, "a"), (101, 10, "b"), (110, 11, "c"), (200, 20, "d")] {
        store.insert("item", vec![int(iid), int(oid), Value::text(sku)]).unwrap();
    }
    for (aid, cid, city) in [(1000, 1, "paris"), (3000, 3, "rome")] {
        store.insert("address", vec![int(aid), int(cid), Value::text(city)]).unwrap();
    }

    let ctx = QueryContext::new(store.clone());
    Setup {
        api: Api::new(schema),
        store,
        ctx,
    }
}

fn run(s: &Setup, op: &groupflow::OperatorRef) -> Vec<Row> {
    QueryCursor::single(op, &s.ctx, QueryBindings::new())
        .unwrap()
        .collect_rows()
        .unwrap()
}

fn describe(rows: &[Row]) -> Vec<String> {
    rows.iter()
        .map(|r| format!("{} {}", r.row_type().name(), r[0]))
        .collect()
}

#[test]
fn test_group_scan_is_hkey_ordered() {
    let s = setup();
    let rows = run(&s, &s.api.group_scan(0).unwrap());
    assert_eq!(
        describe(&rows),
        vec![
            "customer 1",
            "order 10",
            "item 100",
            "item 101",
            "order 11",
            "item 110",
            "address 1000",
            "customer 2",
            "order 20",
            "item 200",
            "customer 3",
            "address 3000",
        ]
    );
    assert!(rows.windows(2).all(|w| w[0].hkey() < w[1].hkey()));
    assert_eq!(s.store.outstanding_requests(), 0);
}

#[test]
fn test_select_drops_descendants_of_rejected_rows() {
    let s = setup();
    let customer = s.api.schema().table_type("customer").unwrap();
    let predicate = compare(field(&customer, 1), CompareOp::Eq, literal("bob"));
    let op = s
        .api
        .select_hkey_ordered(s.api.group_scan(0).unwrap(), customer, predicate)
        .unwrap();
    assert_eq!(describe(&run(&s, &op)), vec!["customer 2", "order 20", "item 200"]);
}

#[test]
fn test_flatten_then_project() {
    let s = setup();
    let customer = s.api.schema().table_type("customer").unwrap();
    let order = s.api.schema().table_type("order").unwrap();
    let input = s
        .api
        .filter(s.api.group_scan(0).unwrap(), &[customer.clone(), order.clone()])
        .unwrap();
    let flatten = s
        .api
        .flatten_hkey_ordered(input, customer, order, JoinType::Inner, FlattenOptions::empty())
        .unwrap();
    let flat_type = flatten.output_type().unwrap();
    let project = s
        .api
        .project(flatten, flat_type.clone(), vec![field(&flat_type, 1), field(&flat_type, 4)])
        .unwrap();
    let rows = run(&s, &project);
    let pairs: Vec<(String, String)> = rows
        .iter()
        .map(|r| (r[0].to_string(), r[1].to_string()))
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("alice".to_string(), "100".to_string()),
            ("alice".to_string(), "50".to_string()),
            ("bob".to_string(), "75".to_string()),
        ]
    );
}

#[test]
fn test_index_scan_then_ancestor_lookup() {
    let s = setup();
    let index_type = s.api.schema().index_type("customer_name").unwrap();
    let index = s.api.schema().index_by_name("customer_name").unwrap().clone();
    let scan = s
        .api
        .index_scan(
            &index_type,
            IndexKeyRange::all(),
            IndexOrdering::new().column(false),
            IndexScanSelector::inner(&index),
        )
        .unwrap();
    let customer = s.api.schema().table_type("customer").unwrap();
    let lookup = s
        .api
        .ancestor_lookup(scan, 0, index_type, &[customer], InputPreservation::DiscardInput, 2)
        .unwrap();
    let names: Vec<String> = run(&s, &lookup).iter().map(|r| r[1].to_string()).collect();
    assert_eq!(names, vec!["carol", "bob", "alice"]);
}

#[test]
fn test_branch_lookup_pipelining_does_not_change_results() {
    let s = setup();
    let customer = s.api.schema().table_type("customer").unwrap();
    let order = s.api.schema().table_type("order").unwrap();
    let build = |quantum| {
        let input = s.api.filter(s.api.group_scan(0).unwrap(), &[customer.clone()]).unwrap();
        s.api
            .branch_lookup(input, 0, customer.clone(), &order, InputPreservation::KeepInput, quantum)
            .unwrap()
    };
    let sequential = run(&s, &build(1));
    assert_eq!(sequential.len(), 10);
    for quantum in [2, 5, 100] {
        assert_eq!(run(&s, &build(quantum)), sequential);
    }
    assert_eq!(s.store.outstanding_requests(), 0);
}

#[test]
fn test_query_cursor_runs_once_per_binding_set() {
    let s = setup();
    let order = s.api.schema().table_type("order").unwrap();
    let predicate = compare(field(&order, 2), CompareOp::Gte, bound_value(0, DataType::Integer));
    let select = s
        .api
        .select_hkey_ordered(s.api.group_scan(0).unwrap(), order.clone(), predicate)
        .unwrap();
    let orders = s.api.filter(select, &[order]).unwrap();

    let sets = [100, 60].map(|min| {
        let mut b = QueryBindings::new();
        b.set_value(0, Value::integer(min));
        b
    });
    let cursor =
        QueryCursor::new(&orders, &s.ctx, Box::new(MultipleBindingsCursor::new(sets))).unwrap();
    let rows: Vec<Row> = cursor.collect::<groupflow::Result<_>>().unwrap();
    assert_eq!(describe(&rows), vec!["order 10", "order 10", "order 20"]);
}

#[test]
fn test_map_correlates_inner_plan_with_outer_row() {
    let s = setup();
    let customer = s.api.schema().table_type("customer").unwrap();
    let order = s.api.schema().table_type("order").unwrap();
    let outer = s.api.filter(s.api.group_scan(0).unwrap(), &[customer.clone()]).unwrap();
    let predicate = compare(field(&order, 1), CompareOp::Eq, bound_field(0, &customer, 0));
    let select = s
        .api
        .select_hkey_ordered(s.api.group_scan(0).unwrap(), order.clone(), predicate)
        .unwrap();
    let inner = s.api.filter(select, &[order]).unwrap();
    let op = s.api.map_nested_loops(outer, inner, 0, 2).unwrap();
    assert_eq!(describe(&run(&s, &op)), vec!["order 10", "order 11", "order 20"]);
}

#[test]
fn test_explain_lists_operator_tree() {
    let s = setup();
    let customer = s.api.schema().table_type("customer").unwrap();
    let op = s.api.filter(s.api.group_scan(0).unwrap(), &[customer]).unwrap();
    let plan = op.explain();
    let lines: Vec<&str> = plan.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("Filter_Default"));
    assert!(lines[1].starts_with("  GroupScan_Default"));
}
