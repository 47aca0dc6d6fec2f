//! Benchmarks for commit-time validation.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use conceptdb::concept::{ThingConcept, TypeConcept};
use conceptdb::database::{Database, DatabaseConfig, Transaction, TransactionType};
use conceptdb::graph::ValueType;

fn populate(tx: &Transaction<'_>, people: i64) {
    let concepts = tx.concepts();
    let person = concepts.put_entity_type("person").unwrap();
    let email = concepts.put_attribute_type("email", ValueType::String).unwrap();
    let age = concepts.put_attribute_type("age", ValueType::Long).unwrap();
    person.set_owns(tx, &email, true).unwrap();
    person.set_owns(tx, &age, false).unwrap();
    for i in 0..people {
        let p = person.create(tx).unwrap();
        p.has(tx, &email.put(tx, format!("p{i}@example.com")).unwrap()).unwrap();
        p.has(tx, &age.put(tx, i % 90).unwrap()).unwrap();
    }
}

fn bench_validate_things(c: &mut Criterion) {
    let db = Database::open(DatabaseConfig::default()).unwrap();
    let tx = db.transaction(TransactionType::Write).unwrap();
    populate(&tx, 1_000);

    c.bench_function("validate_things_1k", |bench| {
        bench.iter(|| black_box(tx.concepts().validate_things().unwrap()))
    });
}

fn bench_validate_types(c: &mut Criterion) {
    let db = Database::open(DatabaseConfig::default()).unwrap();
    let tx = db.transaction(TransactionType::Write).unwrap();
    for i in 0..200 {
        tx.concepts().put_entity_type(&format!("type-{i}")).unwrap();
    }

    c.bench_function("validate_types_200", |bench| {
        bench.iter(|| black_box(tx.concepts().validate_types().unwrap()))
    });
}

fn bench_commit(c: &mut Criterion) {
    c.bench_function("commit_100", |bench| {
        bench.iter(|| {
            let db = Database::open(DatabaseConfig::default()).unwrap();
            let tx = db.transaction(TransactionType::Write).unwrap();
            populate(&tx, 100);
            tx.commit().unwrap();
        })
    });
}

criterion_group!(benches, bench_validate_things, bench_validate_types, bench_commit);
criterion_main!(benches);
