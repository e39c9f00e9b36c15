// Performance benchmarks for the transform pipeline
//
// Run with: cargo bench -p groovy-sandbox-scripting --bench pipeline_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use groovy_sandbox_config::SandboxConfig;
use groovy_sandbox_core::ScriptRequest;
use groovy_sandbox_scripting::{normalize_imports, rewrite, TransformEngine};
use serde_json::json;

const GENERIC_SCRIPT: &str = r#"
def pares = body.numeros.findAll { it % 2 == 0 }
def total = pares.inject(0) { acc, n -> acc + n }
body.resumen = [pares: pares, total: total ?: 0]
return body
"#;

const HOST_SCRIPT: &str = r#"
import com.sap.gateway.ip.core.customdev.util.Message
import groovy.json.JsonSlurper
import groovy.json.JsonOutput

Message processData(Message message) {
    def json = new JsonSlurper().parseText(message.getBody(String))
    json.items.each { item ->
        item.total = item.price * item.qty
    }
    message.setHeader("X-Count", json.items.size())
    message.setBody(JsonOutput.toJson(json))
    return message
}
"#;

fn benchmark_rewrite(c: &mut Criterion) {
    let mut group = c.benchmark_group("rewrite");
    for (name, script) in [("generic", GENERIC_SCRIPT), ("host_style", HOST_SCRIPT)] {
        let normalized = normalize_imports(script);
        group.bench_with_input(BenchmarkId::from_parameter(name), &normalized, |b, src| {
            b.iter(|| rewrite(black_box(src), "body"))
        });
    }
    group.finish();
}

fn benchmark_execute(c: &mut Criterion) {
    let engine = TransformEngine::new(SandboxConfig::default());
    let mut group = c.benchmark_group("execute");

    let generic = ScriptRequest::new(GENERIC_SCRIPT, json!({"numeros": (1..=100).collect::<Vec<_>>()}));
    group.bench_function("generic", |b| b.iter(|| engine.execute(black_box(&generic))));

    let items: Vec<_> = (0..20).map(|i| json!({"price": i, "qty": 2})).collect();
    let host = ScriptRequest::new(HOST_SCRIPT, json!({"items": items}));
    group.bench_function("host_style", |b| b.iter(|| engine.execute(black_box(&host))));

    group.finish();
}

criterion_group!(benches, benchmark_rewrite, benchmark_execute);
criterion_main!(benches);
