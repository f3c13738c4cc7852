//! Query performance benchmarks.
//!
//! Measures latency for the Query Engine's read operations against a
//! synthetically populated store — a fixed-size class/function/call-graph
//! fixture built once per benchmark group.
//!
//! Run with: cargo bench --bench queries

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::time::Duration;

use cxx_index_engine::model::{Access, CallSite, Symbol, SymbolKind};
use cxx_index_engine::query::{self, SearchFilters};
use cxx_index_engine::store::Store;

const CLASS_COUNT: usize = 2_000;
const FUNCTION_COUNT: usize = 5_000;

fn make_class(i: usize) -> Symbol {
    let base_classes = if i > 0 && i % 7 == 0 {
        vec![format!("bench::Class{}", i - 1)]
    } else {
        Vec::new()
    };
    Symbol {
        usr: format!("c:@S@Class{i}"),
        name: format!("Class{i}"),
        qualified_name: format!("bench::Class{i}"),
        namespace: "bench".into(),
        kind: SymbolKind::Class,
        file: format!("/proj/include/class{}.h", i % 100),
        line: 1,
        column: 1,
        signature: String::new(),
        is_project: true,
        access: Access::Public,
        parent_class: None,
        base_classes,
        brief: None,
        doc_comment: None,
        is_template: false,
        template_kind: None,
        template_parameters: Vec::new(),
        primary_template_usr: None,
    }
}

fn make_function(i: usize) -> Symbol {
    Symbol {
        usr: format!("c:@F@fn{i}"),
        name: format!("fn{i}"),
        qualified_name: format!("bench::fn{i}"),
        namespace: "bench".into(),
        kind: SymbolKind::Function,
        file: format!("/proj/src/fn{}.cpp", i % 300),
        line: 10,
        column: 1,
        signature: format!("void fn{i}()"),
        is_project: true,
        access: Access::Public,
        parent_class: None,
        base_classes: Vec::new(),
        brief: None,
        doc_comment: None,
        is_template: false,
        template_kind: None,
        template_parameters: Vec::new(),
        primary_template_usr: None,
    }
}

fn build_fixture() -> Store {
    let mut store = Store::open_in_memory().unwrap();
    let classes: Vec<Symbol> = (0..CLASS_COUNT).map(make_class).collect();
    let functions: Vec<Symbol> = (0..FUNCTION_COUNT).map(make_function).collect();
    store.insert_symbols_batch(&classes).unwrap();
    store.insert_symbols_batch(&functions).unwrap();

    let call_sites: Vec<CallSite> = (0..FUNCTION_COUNT - 1)
        .map(|i| CallSite {
            caller_usr: format!("c:@F@fn{i}"),
            callee_usr: Some(format!("c:@F@fn{}", i + 1)),
            callee_name: format!("fn{}", i + 1),
            file: format!("/proj/src/fn{}.cpp", i % 300),
            line: 11,
            column: 5,
            in_method_of: None,
        })
        .collect();
    store.save_call_sites_batch(&call_sites).unwrap();

    store
}

fn bench_search_classes(c: &mut Criterion) {
    let store = build_fixture();
    let filters = SearchFilters::project_only_default();

    let mut group = c.benchmark_group("search_classes");
    group.measurement_time(Duration::from_secs(10));

    for pattern in ["bench::Class1", "Class99", "Class.*9"] {
        group.bench_with_input(BenchmarkId::new("pattern", pattern), pattern, |b, pattern| {
            b.iter(|| {
                let _ = query::search_classes(&store, black_box(pattern), &filters).unwrap();
            });
        });
    }

    group.finish();
}

fn bench_search_functions(c: &mut Criterion) {
    let store = build_fixture();
    let filters = SearchFilters::default();

    let mut group = c.benchmark_group("search_functions");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("prefix_regex", |b| {
        b.iter(|| {
            let _ = query::search_functions(&store, black_box("fn1.*"), &filters).unwrap();
        });
    });

    group.finish();
}

fn bench_get_class_info(c: &mut Criterion) {
    let store = build_fixture();

    let mut group = c.benchmark_group("get_class_info");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("single_class", |b| {
        b.iter(|| {
            let _ = query::get_class_info(&store, black_box("bench::Class500")).unwrap();
        });
    });

    group.finish();
}

fn bench_get_derived_classes(c: &mut Criterion) {
    let store = build_fixture();

    let mut group = c.benchmark_group("get_derived_classes");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("single_class", |b| {
        b.iter(|| {
            let _ = query::get_derived_classes(&store, black_box("bench::Class0")).unwrap();
        });
    });

    group.finish();
}

fn bench_get_call_path(c: &mut Criterion) {
    let store = build_fixture();

    let mut group = c.benchmark_group("get_call_path");
    group.sample_size(30);
    group.measurement_time(Duration::from_secs(15));

    group.bench_function("long_chain", |b| {
        b.iter(|| {
            let _ = query::get_call_path(
                &store,
                black_box("bench::fn0"),
                black_box("bench::fn4999"),
                FUNCTION_COUNT,
            )
            .unwrap();
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_search_classes,
    bench_search_functions,
    bench_get_class_info,
    bench_get_derived_classes,
    bench_get_call_path,
);
criterion_main!(benches);
