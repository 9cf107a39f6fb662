//! End-to-end JSONPath query checks against a representative document.

use serde_json::{Value, json};
use stencil::{JsonPath, QueryOptions, ResultType};

fn document() -> Value {
    json!({
        "store": {
            "book": [
                { "author": "Nigel Rees", "price": 8.95 },
                { "author": "Evelyn Waugh", "price": 12.99 },
                { "author": "Herman Melville", "price": 8.99 },
                { "author": "J. R. R. Tolkien", "price": 22.99 },
                { "author": "Frank Herbert", "price": 6.50 }
            ],
            "bicycle": { "color": "red", "price": 19.95 }
        },
        "expensive": 10
    })
}

#[test]
fn wildcard_preserves_array_order() {
    let result = JsonPath::default()
        .query("$.store.book[*].author", &document())
        .unwrap();
    assert_eq!(
        result,
        json!([
            "Nigel Rees",
            "Evelyn Waugh",
            "Herman Melville",
            "J. R. R. Tolkien",
            "Frank Herbert"
        ])
    );
}

#[test]
fn unwrapped_scalar_match_returns_bare_value() {
    let engine = JsonPath::new(QueryOptions {
        wrap: false,
        ..QueryOptions::default()
    });
    assert_eq!(
        engine.query("$.store.bicycle.color", &document()).unwrap(),
        json!("red")
    );
}

#[test]
fn slice_bounds_are_end_exclusive_and_wrap() {
    let data = json!({ "xs": [0, 1, 2, 3, 4] });
    let engine = JsonPath::default();
    assert_eq!(engine.query("$.xs[1:3]", &data).unwrap(), json!([1, 2]));
    assert_eq!(engine.query("$.xs[-2:]", &data).unwrap(), json!([3, 4]));
}

#[test]
fn recursive_descent_finds_every_price_in_preorder() {
    // pre-order over serde_json's sorted maps: the bicycle subtree sorts
    // before the book array
    let result = JsonPath::default().query("$..price", &document()).unwrap();
    assert_eq!(result, json!([19.95, 8.95, 12.99, 8.99, 22.99, 6.50]));
}

#[test]
fn filters_select_matching_children() {
    let result = JsonPath::default()
        .query("$.store.book[?(@.price < 9)].author", &document())
        .unwrap();
    assert_eq!(
        result,
        json!(["Nigel Rees", "Herman Melville", "Frank Herbert"])
    );
}

#[test]
fn result_shaping_paths_and_pointers() {
    let engine = JsonPath::new(QueryOptions {
        result_type: ResultType::Path,
        ..QueryOptions::default()
    });
    assert_eq!(
        engine.query("$.store.book[2].author", &document()).unwrap(),
        json!(["$['store']['book'][2]['author']"])
    );

    let engine = JsonPath::new(QueryOptions {
        result_type: ResultType::Pointer,
        ..QueryOptions::default()
    });
    assert_eq!(
        engine.query("$.store.book[2].author", &document()).unwrap(),
        json!(["/store/book/2/author"])
    );
}

#[test]
fn repeated_compilation_yields_identical_segments() {
    let engine = JsonPath::default();
    let a = engine.compile("$.store.book[*].author").unwrap();
    engine.compile("$..price").unwrap();
    engine.compile("$.store.bicycle").unwrap();
    let b = engine.compile("$.store.book[*].author").unwrap();
    assert_eq!(a, b);
}
