//! Benchmarks for a full analysis pass
//!
//! Measures the stages run on every document change:
//! - parsing
//! - diagnostic rules
//! - variable and route extraction
//! - the whole pipeline through the document store

use std::time::Duration;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use tower_lsp::lsp_types::Url;

use kamailio_language_server::diagnostics::DiagnosticAnalyzer;
use kamailio_language_server::lsp::document::DocumentStore;
use kamailio_language_server::parsers::ParserAdapter;
use kamailio_language_server::parsers::kamailio::LANGUAGE;
use kamailio_language_server::settings::{AnalysisSettings, ServerSettings};
use kamailio_language_server::symbols::{RouteIndex, VariableExtractor};

const ROUTE_BLOCK: &str = r#"
route[RELAY_N] {
    # legacy comment
    if (is_method("INVITE") && !has_totag()) {
        $avp(caller) = $fU;
        $var(attempt) = $var(attempt) + 1;
        t_on_failure("MANAGE_FAILURE");
    }
    switch ($rU) {
        case "100":
            xlog("L_INFO", "forward to $rU\n");
            break;
        default:
            sl_send_reply("404", "Not Found");
            exit;
    }
    if (!t_relay()) {
        sl_reply_error();
    }
    exit;
}
"#;

/// A script with a header and `routes` route blocks.
fn script(routes: usize) -> String {
    let mut text = String::from(
        "#!KAMAILIO\ndebug=2\nloadmodule \"tm.so\"\nmodparam(\"tm\", \"fr_timer\", 30000)\n\
         request_route {\n    route(RELAY_0);\n}\n",
    );
    for n in 0..routes {
        text.push_str(&ROUTE_BLOCK.replace("RELAY_N", &format!("RELAY_{}", n)));
    }
    text
}

fn bench_parsing(c: &mut Criterion) {
    let parser = ParserAdapter::kamailio().unwrap();
    let mut group = c.benchmark_group("parsing");

    for routes in [1, 10, 100] {
        let text = script(routes);
        group.bench_with_input(BenchmarkId::from_parameter(routes), &text, |b, text| {
            b.iter(|| black_box(parser.parse(text)))
        });
    }

    group.finish();
}

fn bench_stages(c: &mut Criterion) {
    let parser = ParserAdapter::kamailio().unwrap();
    let analyzer = DiagnosticAnalyzer::new(&LANGUAGE);
    let extractor = VariableExtractor::new(&LANGUAGE);
    let tree = parser.parse(&script(50));
    let settings = AnalysisSettings::all();
    let mut group = c.benchmark_group("stages");

    group.bench_function("diagnostics", |b| {
        b.iter(|| black_box(analyzer.analyze(&tree, &settings)))
    });

    group.bench_function("variables", |b| b.iter(|| black_box(extractor.extract(&tree))));

    group.bench_function("routes", |b| b.iter(|| black_box(RouteIndex::from_tree(&tree))));

    group.finish();
}

fn bench_document_change(c: &mut Criterion) {
    let uri = Url::parse("file:///etc/kamailio/kamailio.cfg").unwrap();
    let mut store = DocumentStore::new(ServerSettings::default()).unwrap();
    let texts = [script(50), script(51)];
    store.open(&uri, 0, &texts[0]);
    let mut version = 0;

    c.bench_function("document_change", |b| {
        b.iter(|| {
            version += 1;
            let text = &texts[(version % 2) as usize];
            black_box(store.change(&uri, version, text))
        })
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .sample_size(50)
        .measurement_time(Duration::from_secs(5));
    targets =
        bench_parsing,
        bench_stages,
        bench_document_change
}

criterion_main!(benches);
