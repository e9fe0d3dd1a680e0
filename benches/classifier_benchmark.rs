use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use charcls::{
    Architecture, Corpus, LabelIndex, LabeledDataset, Sgd, Trainer, TrainedClassifier, TrainingConfig, VectorizeMode,
    Vectorizer, Vocabulary,
};

const TEXTS: [(&str, &str); 6] = [
    ("帮我导航到北京", "Navigation"),
    ("导航去最近的加油站", "Navigation"),
    ("播放周杰伦的音乐", "Music-Play"),
    ("来一首轻音乐", "Music-Play"),
    ("查询明天北京的天气", "Weather-Query"),
    ("后天上海会下雨吗", "Weather-Query"),
];

fn corpus(copies: usize) -> Corpus {
    Corpus::from_pairs((0..copies).flat_map(|_| TEXTS.iter().copied()))
}

fn bench_vectorization(c: &mut Criterion) {
    let vocab = Arc::new(Vocabulary::build(TEXTS.iter().map(|(t, _)| t)));
    let mut group = c.benchmark_group("Vectorization");
    group.sample_size(50);
    group.warm_up_time(std::time::Duration::from_secs(1));

    for mode in [VectorizeMode::Sequence, VectorizeMode::BagOfWords] {
        let vectorizer = Vectorizer::new(Arc::clone(&vocab), 40, mode).unwrap();
        group.bench_function(format!("{:?}", mode), |b| {
            b.iter(|| vectorizer.encode(black_box("帮我查一下明天从北京导航到上海要多久")))
        });
    }

    group.finish();
}

fn bench_training_pass(c: &mut Criterion) {
    let corpus = corpus(20);
    let vocab = Arc::new(Vocabulary::build(corpus.texts()));
    let labels = LabelIndex::build(corpus.labels()).unwrap();
    let targets = labels.encode(corpus.labels()).unwrap();
    let texts: Vec<String> = corpus.texts().map(str::to_owned).collect();

    let mut group = c.benchmark_group("TrainingPass");
    group.sample_size(20);
    group.warm_up_time(std::time::Duration::from_secs(1));

    let config = TrainingConfig::default().with_epochs(1).with_batch_size(32).with_seed(0);
    for arch in [Architecture::feed_forward([128]), Architecture::gru(64, 128)] {
        let vectorizer = Vectorizer::new(Arc::clone(&vocab), 40, arch.input_mode()).unwrap();
        let dataset = LabeledDataset::new(texts.clone(), targets.clone(), vectorizer).unwrap();
        let mut model = arch.instantiate(vocab.len(), labels.len(), 0).unwrap();
        let mut optimizer = Sgd::new(0.01);
        let trainer = Trainer::new(config.clone());

        group.bench_function(arch.to_string(), |b| {
            b.iter(|| trainer.fit(&dataset, model.as_mut(), &mut optimizer, &mut ()).unwrap())
        });
    }

    group.finish();
}

fn bench_prediction(c: &mut Criterion) {
    let mut group = c.benchmark_group("Prediction");
    group.sample_size(50);
    group.warm_up_time(std::time::Duration::from_secs(1));

    for arch in [Architecture::feed_forward([512, 128, 32]), Architecture::gru(64, 128)] {
        let classifier = TrainedClassifier::builder()
            .with_architecture(arch.clone())
            .with_training_config(TrainingConfig::default().with_epochs(1))
            .with_seed(0)
            .build(&corpus(1))
            .unwrap();

        group.bench_function(arch.to_string(), |b| {
            b.iter(|| classifier.predict(black_box("查询明天北京的天气")).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_vectorization, bench_training_pass, bench_prediction);
criterion_main!(benches);
