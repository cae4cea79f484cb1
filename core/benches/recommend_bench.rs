use cinematch_core::{build_index, IndexConfig, Item, Strategy};
use criterion::{criterion_group, criterion_main, Criterion};

const GENRES: &[&str] = &["Action", "Drama", "Comedy", "Horror", "Romance", "Science Fiction", "Thriller"];
const WORDS: &[&str] = &[
    "hero", "city", "love", "war", "space", "ship", "family", "secret", "killer", "island",
    "robot", "detective", "summer", "wedding", "ghost", "heist", "prison", "king", "storm", "dream",
];

fn synthetic(n: usize) -> Vec<Item> {
    (0..n)
        .map(|i| {
            let mut it = Item::new(i as u64, format!("Movie {i}"));
            it.genres = vec![GENRES[i % GENRES.len()].to_string(), GENRES[(i / 7) % GENRES.len()].to_string()];
            it.director = Some(format!("Director {}", i % 40));
            it.top_cast = (0..5).map(|c| format!("Actor {}", (i * 3 + c) % 200)).collect();
            it.overview = (0..12).map(|w| WORDS[(i * 7 + w * 3) % WORDS.len()]).collect::<Vec<_>>().join(" ");
            it
        })
        .collect()
}

fn bench_build(c: &mut Criterion) {
    let items = synthetic(1000);
    c.bench_function("build_index_1000_precomputed", |b| {
        b.iter(|| build_index(items.clone(), &IndexConfig::default()).unwrap())
    });
}

fn bench_query(c: &mut Criterion) {
    let items = synthetic(2000);
    for strategy in [Strategy::Precomputed, Strategy::OnDemand] {
        let index = build_index(items.clone(), &IndexConfig { strategy, ..Default::default() }).unwrap();
        c.bench_function(&format!("recommend_2000_{strategy:?}"), |b| {
            b.iter(|| index.recommend("Movie 42", 10).unwrap())
        });
    }
}

criterion_group!(benches, bench_build, bench_query);
criterion_main!(benches);
