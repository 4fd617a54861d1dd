use codspeed_criterion_compat::{
    Criterion, Throughput, black_box, criterion_group, criterion_main,
};
use weft_syntax::TokenSequence;
use weft_tokenizer::Tokenizer;

static STATEMENTS: &str = "
let total = (first + second) * third; // running sum
let scaled = total / 4 - offset; /* adjust */
let list = [a, [b, c], d];
fn helper { let inner = 1 + 2; inner; }
";

static IDENTIFIERS: &str = "It was the year when they finally immanentized the Eschaton It was \
     the year when they finally immanentized the Eschaton It was the year when they finally \
     immanentized the Eschaton It was the year when they finally immanentized the Eschaton";

fn bench_lex(c: &mut Criterion) {
    let db = salsa::DatabaseImpl::new();
    let statements = STATEMENTS.repeat(32);
    let candidates = [("identifiers", IDENTIFIERS), ("statements", statements.as_str())];

    let mut group = c.benchmark_group("lex");
    for (name, source) in candidates {
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(name, &source, |b, &s| {
            b.iter(|| black_box(TokenSequence::lex(&db, s, &mut Tokenizer::new())))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_lex);
criterion_main!(benches);
