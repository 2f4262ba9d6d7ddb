use criterion::{black_box, criterion_group, criterion_main, Criterion};

use donned::codec;
use donned::index::{Donnable, TraitIndex};
use donned::signature::TypeSignature;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
pub struct Tag {
    name: String,
    code: TypeSignature,
}
impl Tag {
    fn new(name: &str, code: TypeSignature) -> Self {
        Self { name: name.into(), code }
    }
}
impl Donnable for Tag {
    fn signature(&self) -> &TypeSignature { &self.code }
    fn trait_name(&self) -> &str { &self.name }
}

// a chain of n traits where trait i carries bits 0..=i
fn chain(n: u32) -> TraitIndex<Tag> {
    let mut index = TraitIndex::new(TypeSignature::new());
    for i in 0..n {
        let code: TypeSignature = (0..=i).collect();
        let name = format!("t{i}");
        index.put(&name, Tag::new(&name, code));
    }
    index
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let wide_a: TypeSignature = (0..10_000).collect();
    let wide_b: TypeSignature = (0..9_999).collect();
    c.bench_function("containment 10k bits", |b| {
        b.iter(|| black_box(&wide_a).is_subtype_of(black_box(&wide_b)))
    });

    for n in [10u32, 100, 1_000] {
        let index = chain(n);
        let mid: TypeSignature = (0..n / 2).collect();
        c.bench_function(&format!("immediate parents {n}"), |b| {
            b.iter(|| index.lattice().immediate_parents(black_box(&mid)))
        });
        c.bench_function(&format!("lower descendants {n}"), |b| {
            b.iter(|| index.lattice().lower_descendants(black_box(&mid)))
        });
    }

    let mut index = chain(100);
    c.bench_function("most specific cached", |b| {
        b.iter(|| index.most_specific_traits())
    });

    let index = chain(100);
    c.bench_function("snapshot write 100", |b| {
        b.iter(|| codec::to_bytes(black_box(&index)).unwrap())
    });
    let bytes = codec::to_bytes(&index).unwrap();
    c.bench_function("snapshot read 100", |b| {
        b.iter(|| codec::from_bytes::<Tag>(black_box(&bytes)).unwrap())
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
