use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use minic_parser::lexer::Lexer;
use minic_parser::parser::Parser;

fn program(source: &str) {
    let source = source.into();
    let _ast = Parser::new(&source).parse_program();
    assert!(source.has_no_errors());
}

fn long_expr(c: &mut Criterion) {
    let mut group = c.benchmark_group("long-expr");

    let mut source = "int f(void) { return 1".to_string();
    for _i in 0..1000 {
        source.push_str(" + 1");
    }
    source.push_str("; }");
    group.throughput(Throughput::Bytes(source.len() as u64));
    group.bench_function("long-expr", |b| b.iter(|| program(&source)));
}

fn stress_precedence(c: &mut Criterion) {
    let mut group = c.benchmark_group("stress-precedence");

    let mut source = "bool f(void) { return 1 < 2".to_string();
    for _i in 0..200 {
        source.push_str(" == 2 < 3 + 5 * 5 || true && false");
    }
    source.push_str("; }");
    group.throughput(Throughput::Bytes(source.len() as u64));
    group.bench_function("stress-precedence", |b| b.iter(|| program(&source)));
}

fn many_functions(c: &mut Criterion) {
    let mut group = c.benchmark_group("many-functions");

    let mut source = String::from("extern int print_int(int x);\n");
    for i in 0..500 {
        source.push_str(&format!(
            "int f{i}(int n) {{ int acc; acc = 0; while (n > 0) {{ acc = acc + n; n = n - 1; }} if (acc > {i}) {{ print_int(acc); }} return acc; }}\n",
            i = i
        ));
    }
    group.throughput(Throughput::Bytes(source.len() as u64));
    group.bench_function("lex", |b| b.iter(|| Lexer::new(&source).tokenize()));
    group.bench_function("parse", |b| b.iter(|| program(&source)));
}

criterion_group!(benches, long_expr, stress_precedence, many_functions);
criterion_main!(benches);
