use criterion::{black_box, criterion_group, criterion_main, Criterion};
use enactc::compile;

/// A realistic Enact module mixing structs, traits, impls, and functions so
/// every pipeline phase (lex, parse, `SemaDecls`, `SemaDefs`) gets exercised.
fn make_enact_module(index: usize) -> String {
    format!(
        r#"
trait Shape_{i} {{
    func area() float;
}}

struct Point_{i} {{
    x float;
    y float;
}}

struct Rect_{i} {{
    origin Point_{i};
    width float;
    height float;
}}

impl Shape_{i} for Rect_{i} {{
    func area() float {{ this.width * this.height }}
}}

func distance_{i}(a Point_{i}, b Point_{i}) float {{
    imm dx = a.x - b.x;
    imm dy = a.y - b.y;
    (dx * dx + dy * dy)
}}

func classify_{i}(n int) string {{
    switch n {{
        case 0 => "zero";
        case 1 => "one";
        default => "many";
    }}
}}

func main_{i}() int {{
    imm p = Point_{i}(0.0, 0.0);
    imm r = Rect_{i}(p, 2.0, 3.0);
    imm total = distance_{i}(p, p) + r.area();
    imm label = classify_{i}(2);
    0
}}
"#,
        i = index
    )
}

fn bench_compile(c: &mut Criterion) {
    let modules: Vec<String> = (0..50).map(make_enact_module).collect();

    c.bench_function("compile_50_modules", |b| {
        b.iter(|| {
            for src in &modules {
                let (_, _, outcome) = compile(black_box(src));
                black_box(outcome);
            }
        });
    });

    let big_source: String = (0..200).map(make_enact_module).collect::<Vec<_>>().join("\n");

    c.bench_function("compile_single_large_module", |b| {
        b.iter(|| {
            let (_, _, outcome) = compile(black_box(&big_source));
            black_box(outcome);
        });
    });
}

criterion_group!(benches, bench_compile);
criterion_main!(benches);
