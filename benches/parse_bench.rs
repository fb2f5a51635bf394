use criterion::{criterion_group, criterion_main, Criterion};
use ledgerfmt::Journal;
use std::fmt::Write;

fn synthetic_journal(transactions: usize) -> String {
    let mut src = String::new();
    for i in 0..transactions {
        writeln!(src, "2020/01/{:02} * Payee {}", i % 28 + 1, i).unwrap();
        writeln!(src, "    Expenses:Category:Sub{}   ${}.{:02}", i % 7, i % 90 + 1, i % 100).unwrap();
        writeln!(src, "    Assets:Checking  $-{}.{:02}", i % 90 + 1, i % 100).unwrap();
        writeln!(src).unwrap();
    }
    src
}

fn criterion_benchmark(c: &mut Criterion) {
    let input = synthetic_journal(1000);
    c.bench_function("decode journal", |b| b.iter(|| Journal::decode_str(&input)));
    let (journal, _) = Journal::decode_str(&input);
    c.bench_function("encode journal", |b| {
        b.iter(|| {
            let mut buf = Vec::new();
            journal.encode(&mut buf).unwrap();
            buf
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
