use bson_streaming::{doc, frame, reduce, DateTime, Document, FrameReader, FrameWriter};
use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use rand::{rngs::StdRng, Rng, SeedableRng};

pub trait Generate {
    fn generate<R: Rng>(rng: &mut R) -> Self;
}

/// An access log line, keyed by the user it belongs to.
pub struct Log {
    pub userid: &'static str,
    pub address: [u8; 4],
    pub code: i32,
    pub when: DateTime,
    pub request: String,
    pub size: i64,
}

impl Generate for Log {
    fn generate<R: Rng>(rand: &mut R) -> Self {
        const USERID: [&str; 9] = [
            "-", "alice", "bob", "carmen", "david", "eric", "frank", "george", "harry",
        ];
        const CODES: [i32; 12] = [200, 201, 204, 301, 302, 304, 400, 401, 403, 404, 500, 503];
        const METHODS: [&str; 5] = ["GET", "POST", "PUT", "UPDATE", "DELETE"];
        const ROUTES: [&str; 7] = [
            "/favicon.ico",
            "/css/index.css",
            "/css/font-awsome.min.css",
            "/img/logo-full.svg",
            "/img/splash.jpg",
            "/api/login",
            "/api/logout",
        ];
        const PROTOCOLS: [&str; 4] = ["HTTP/1.0", "HTTP/1.1", "HTTP/2", "HTTP/3"];
        let request = format!(
            "{} {} {}",
            METHODS[rand.gen_range(0..5)],
            ROUTES[rand.gen_range(0..7)],
            PROTOCOLS[rand.gen_range(0..4)],
        );
        Self {
            userid: USERID[rand.gen_range(0..USERID.len())],
            address: rand.gen(),
            code: CODES[rand.gen_range(0..CODES.len())],
            when: DateTime::from_millis(rand.gen_range(0..1_650_000_000_000)),
            request,
            size: rand.gen_range(0..100_000_000),
        }
    }
}

impl From<Log> for Document {
    fn from(log: Log) -> Self {
        doc! {
            "_id": log.userid,
            "address": log.address.to_vec(),
            "code": log.code,
            "when": log.when,
            "request": log.request,
            "size": log.size,
        }
    }
}

fn generate_docs(count: usize) -> Vec<Document> {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    (0..count)
        .map(|_| Document::from(Log::generate(&mut rng)))
        .collect()
}

fn encode_stream(docs: &[Document]) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut writer = FrameWriter::new(&mut buf);
    writer.write_all(docs).unwrap();
    buf
}

const LOGS: usize = 10_000;

fn codec(c: &mut Criterion) {
    let docs = generate_docs(LOGS);
    let frames: Vec<Vec<u8>> = docs.iter().map(|d| frame::encode(d).unwrap()).collect();
    let bytes: usize = frames.iter().map(Vec::len).sum();

    let mut group = c.benchmark_group("codec");
    group.throughput(Throughput::Bytes(bytes as u64));
    group.bench_function("encode", |b| {
        let mut buf = Vec::with_capacity(bytes);
        b.iter(|| {
            buf.clear();
            for doc in &docs {
                frame::encode_into(&mut buf, doc).unwrap();
            }
            buf.len()
        })
    });
    group.bench_function("decode", |b| {
        b.iter(|| {
            frames
                .iter()
                .map(|f| frame::decode(f).unwrap().len())
                .sum::<usize>()
        })
    });
    group.finish();
}

fn reader(c: &mut Criterion) {
    let stream = encode_stream(&generate_docs(LOGS));
    let mut group = c.benchmark_group("reader");
    group.throughput(Throughput::Bytes(stream.len() as u64));
    for chunk_size in [512, 4096, 64 * 1024] {
        group.bench_with_input(
            BenchmarkId::from_parameter(chunk_size),
            &chunk_size,
            |b, &chunk_size| {
                b.iter(|| {
                    FrameReader::new(stream.as_slice())
                        .chunk_size(chunk_size)
                        .try_fold(0usize, |n, doc| doc.map(|_| n + 1))
                        .unwrap()
                })
            },
        );
    }
    group.finish();
}

fn reducer(c: &mut Criterion) {
    let mut docs = generate_docs(LOGS);
    docs.sort_by(|a, b| a.get_str("_id").cmp(&b.get_str("_id")));
    let stream = encode_stream(&docs);
    let mut group = c.benchmark_group("reducer");
    group.throughput(Throughput::Elements(LOGS as u64));
    group.bench_function("bytes_per_user", |b| {
        b.iter_batched(
            || Vec::with_capacity(1024),
            |mut out| {
                reduce(
                    |key, docs| {
                        let total: i64 = docs.iter().filter_map(|d| d.get_i64("size")).sum();
                        Ok(doc! { "_id": key, "size": total })
                    },
                    FrameReader::new(stream.as_slice()),
                    FrameWriter::new(&mut out),
                )
                .unwrap();
                out
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

criterion_group!(benches, codec, reader, reducer);
criterion_main!(benches);

