//! Benchmarks for the syntax tokenizer.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use devterm_syntax::Highlighter;

const JS_SAMPLE: &str = r#"import { greet } from './utils.js';

// Entry point
export function main(argv) {
  const name = argv[0] ?? "world";
  let count = 0;
  for (const arg of argv) {
    count += arg.length * 2;
  }
  console.log(`Hello, ${name}! (${count})`);
  return new Result(count);
}
"#;

fn bench_highlight_uncached(c: &mut Criterion) {
    let mut group = c.benchmark_group("highlight_uncached");

    for repeat in [1, 10, 50] {
        let code = JS_SAMPLE.repeat(repeat);
        group.bench_function(BenchmarkId::new("javascript", code.len()), |b| {
            let mut hl = Highlighter::new(0).unwrap();
            b.iter(|| hl.highlight(&code, "javascript"));
        });
    }

    group.finish();
}

fn bench_highlight_cached(c: &mut Criterion) {
    let mut hl = Highlighter::new(16).unwrap();
    hl.highlight(JS_SAMPLE, "javascript");
    c.bench_function("highlight_cache_hit", |b| {
        b.iter(|| hl.highlight(JS_SAMPLE, "javascript"));
    });
}

fn bench_detect(c: &mut Criterion) {
    let hl = Highlighter::new(0).unwrap();
    c.bench_function("detect_language", |b| {
        b.iter(|| hl.detect_language(JS_SAMPLE));
    });
}

criterion_group!(benches, bench_highlight_uncached, bench_highlight_cached, bench_detect);
criterion_main!(benches);
