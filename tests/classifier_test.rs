use std::sync::Arc;
use std::thread;

use charcls::{
    compare_architectures, train_architectures, Architecture, ClassifierError, Corpus, LossComparison,
    OptimizerConfig, Storage, TrainedClassifier, TrainingConfig,
};

fn travel_and_music() -> Corpus {
    Corpus::from_pairs([("帮我导航到北京", "Travel-Query"), ("播放音乐", "Music-Play")])
}

fn intents() -> Corpus {
    Corpus::from_pairs([
        ("帮我导航到北京", "Travel-Query"),
        ("导航去最近的加油站", "Travel-Query"),
        ("去上海怎么走", "Travel-Query"),
        ("播放音乐", "Music-Play"),
        ("来一首周杰伦的歌", "Music-Play"),
        ("播放轻音乐", "Music-Play"),
        ("查询明天北京的天气", "Weather-Query"),
        ("后天会下雨吗", "Weather-Query"),
        ("今天天气怎么样", "Weather-Query"),
    ])
}

#[test]
fn test_two_record_scenario() -> Result<(), ClassifierError> {
    let classifier = TrainedClassifier::builder()
        .with_architecture(Architecture::feed_forward([16]))
        .with_max_len(5)
        .with_training_config(TrainingConfig::default().with_epochs(5))
        .with_seed(1)
        .build(&travel_and_music())?;

    let vocab = classifier.vocab();
    assert_eq!(vocab.len(), 12);
    for (expected, ch) in "帮我导航到北京播放音乐".chars().enumerate() {
        assert_eq!(vocab.id(ch), expected + 1);
    }

    let info = classifier.info();
    assert_eq!(info.max_len, 5);
    assert_eq!(info.class_labels, vec!["Music-Play", "Travel-Query"]);

    let history = classifier.history();
    assert_eq!(history.epochs(), 5);
    assert!(history.losses.iter().all(|l| l.is_finite() && *l >= 0.0));
    Ok(())
}

#[test]
fn test_predict_training_texts() -> Result<(), ClassifierError> {
    let corpus = intents();
    for architecture in [Architecture::feed_forward([32]), Architecture::gru(16, 16)] {
        let classifier = TrainedClassifier::builder()
            .with_architecture(architecture)
            .with_max_len(10)
            .with_training_config(TrainingConfig::default().with_epochs(3).with_batch_size(4))
            .with_seed(5)
            .build(&corpus)?;
        for record in corpus.records() {
            let label = classifier.predict(&record.text)?;
            assert!(corpus.labels().any(|l| l == label));
        }
    }
    Ok(())
}

#[test]
fn test_feed_forward_fits_small_corpus() -> Result<(), ClassifierError> {
    let corpus = intents();
    let classifier = TrainedClassifier::builder()
        .with_architecture(Architecture::feed_forward([64]))
        .with_max_len(10)
        .with_optimizer(OptimizerConfig::sgd(0.2))
        .with_training_config(TrainingConfig::default().with_epochs(300).with_batch_size(3))
        .with_seed(3)
        .build(&corpus)?;

    let history = classifier.history();
    assert!(history.final_loss().unwrap() < history.losses[0]);
    assert_eq!(classifier.predict("播放轻音乐")?, "Music-Play");
    Ok(())
}

#[test]
fn test_unseen_characters() -> Result<(), ClassifierError> {
    let classifier = TrainedClassifier::builder()
        .with_architecture(Architecture::gru(8, 8))
        .with_max_len(6)
        .with_training_config(TrainingConfig::default().with_epochs(1))
        .with_seed(2)
        .build(&intents())?;
    let (label, scores) = classifier.predict_with_scores("完全没见过的字")?;
    assert!(scores.contains_key(&label));
    assert_eq!(scores.len(), 3);
    Ok(())
}

#[test]
fn test_concurrent_prediction() -> Result<(), Box<dyn std::error::Error>> {
    let classifier = Arc::new(
        TrainedClassifier::builder()
            .with_training_config(TrainingConfig::default().with_epochs(2))
            .with_seed(8)
            .build(&intents())?,
    );
    let expected = classifier.predict("导航到北京")?;

    let mut handles = vec![];
    for _ in 0..4 {
        let classifier = Arc::clone(&classifier);
        handles.push(thread::spawn(move || classifier.predict("导航到北京").unwrap()));
    }
    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
    Ok(())
}

#[test]
fn test_compare_architectures() -> Result<(), ClassifierError> {
    let architectures = [
        Architecture::feed_forward([8]),
        Architecture::feed_forward([8, 4]),
        Architecture::gru(4, 8),
    ];
    let training = TrainingConfig::default().with_epochs(2).with_seed(4);
    let comparison = compare_architectures(&intents(), &architectures, 8, &training, None)?;

    assert_eq!(comparison.runs.len(), 3);
    assert!(comparison.runs.iter().all(|r| r.epochs() == 2));
    assert_eq!(comparison.runs[2].label, "gru (embedding 4, hidden 8)");

    let table = comparison.to_string();
    assert_eq!(table.lines().count(), 4);

    let json = serde_json::to_value(&comparison).unwrap();
    assert_eq!(json["runs"].as_array().unwrap().len(), 3);
    assert!(json["runs"][0]["num_parameters"].as_u64().unwrap() > 0);
    assert_eq!(json["max_len"], 8);
    Ok(())
}

#[test]
fn test_compared_classifiers_predict() -> Result<(), ClassifierError> {
    let corpus = intents();
    let architectures = [Architecture::feed_forward([8]), Architecture::gru(4, 8)];
    let training = TrainingConfig::default().with_epochs(2).with_seed(6);
    let classifiers = train_architectures(&corpus, &architectures, 8, &training, None)?;
    assert_eq!(classifiers.len(), 2);

    for (classifier, architecture) in classifiers.iter().zip(&architectures) {
        assert_eq!(classifier.architecture(), architecture);
        assert_eq!(classifier.history().num_parameters, classifier.info().num_parameters);
        for text in ["帮我导航到北京", "查询明天北京的天气"] {
            let label = classifier.predict(text)?;
            assert!(corpus.labels().any(|l| l == label));
        }
    }

    let comparison = LossComparison::from_classifiers(8, &training, &classifiers);
    assert_eq!(comparison.runs[1].num_parameters, classifiers[1].info().num_parameters);
    let table = comparison.to_string();
    let gru_row = table.lines().nth(2).unwrap();
    assert!(gru_row.contains(&classifiers[1].info().num_parameters.to_string()));
    Ok(())
}

#[test]
fn test_storage_policy_does_not_change_training() -> Result<(), ClassifierError> {
    let train = |storage: Storage| {
        TrainedClassifier::builder()
            .with_architecture(Architecture::gru(4, 8))
            .with_max_len(8)
            .with_training_config(TrainingConfig::default().with_epochs(2).with_batch_size(4))
            .with_seed(9)
            .with_storage(storage)
            .build(&intents())
    };
    let eager = train(Storage::Eager)?;
    let lazy = train(Storage::Lazy)?;
    assert_eq!(eager.history(), lazy.history());
    assert_eq!(eager.probabilities("播放音乐")?, lazy.probabilities("播放音乐")?);
    Ok(())
}
