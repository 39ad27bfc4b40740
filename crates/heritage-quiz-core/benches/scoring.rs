use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use heritage_quiz_core::model::{Answer, Question};
use heritage_quiz_core::scoring::{percentage, score};

fn make_questions(n: usize) -> Vec<Question> {
    (0..n)
        .map(|i| {
            Question::new(
                format!("q{i}"),
                format!("Question {i}"),
                vec!["a".into(), "b".into(), "c".into(), "d".into()],
                i % 4,
            )
            .unwrap()
        })
        .collect()
}

fn make_answers(questions: &[Question]) -> Vec<Answer> {
    questions
        .iter()
        .enumerate()
        .map(|(i, q)| match i % 3 {
            0 => Answer::chosen(q, q.correct_index(), Duration::from_secs(4)).unwrap(),
            1 => Answer::chosen(q, (q.correct_index() + 1) % 4, Duration::from_secs(7)).unwrap(),
            _ => Answer::unanswered(q, Duration::from_secs(30)),
        })
        .collect()
}

fn bench_percentage(c: &mut Criterion) {
    let mut group = c.benchmark_group("percentage");

    group.bench_function("4/5", |b| {
        b.iter(|| percentage(black_box(4), black_box(5)))
    });

    group.bench_function("2/3", |b| {
        b.iter(|| percentage(black_box(2), black_box(3)))
    });

    group.finish();
}

fn bench_score(c: &mut Criterion) {
    let mut group = c.benchmark_group("score");

    for n in [5, 50, 500] {
        let questions = make_questions(n);
        let answers = make_answers(&questions);
        group.bench_function(format!("questions={n}"), |b| {
            b.iter(|| score(black_box(&answers), black_box(&questions), black_box(70)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_percentage, bench_score);
criterion_main!(benches);
