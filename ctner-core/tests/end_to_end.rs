use ctner_core::dataset::{DatasetBuilder, Partition, SplitConfig};
use ctner_core::format::{inference_header, InferenceRow, TrainingSample};
use ctner_core::{AggregatorConfig, InferencePipeline, LexiconPredictor, Transformer};

const LEXICON: &str = "\
# termos de teste
heart failure\tword_scores:condition
HbA1c\tword_scores:lab
";

fn pipeline() -> InferencePipeline<LexiconPredictor> {
    let xfmr = Transformer::default();
    let lexicon =
        LexiconPredictor::from_reader(LEXICON.as_bytes(), &xfmr, "word_scores:NoLabel").unwrap();
    InferencePipeline::new(xfmr, lexicon, AggregatorConfig::default())
}

#[test]
fn annotation_line_becomes_training_line() {
    let mut builder = DatasetBuilder::new(
        Transformer::default(),
        SplitConfig {
            test_ratio: 0.0,
            seed: Some(1),
        },
    );
    let (partition, sample) = builder
        .push_line("NCT1\t1:4:lab,7:13:cond\tA1c < stroke")
        .unwrap()
        .unwrap();
    assert_eq!(partition, Partition::Train);

    let line = sample.to_line();
    assert_eq!(line, "1:4:lab,7:13:cond\ta1c < stroke");

    let parsed = TrainingSample::parse(&line).unwrap();
    assert_eq!(
        parsed.0.labeled_slices(),
        vec![("a1c", "lab"), ("stroke", "cond")]
    );
}

#[test]
fn training_file_statistics() {
    let annotations = [
        "NCT1\t15:21:condition\tNo history of stroke",
        "NCT1\t15:21:condition\tNo history of stroke",
        "NCT2\t1:6:lab\tHbA1c >= 7%",
        "broken line",
    ];
    let mut builder = DatasetBuilder::new(Transformer::default(), SplitConfig::default());
    let samples: Vec<String> = annotations
        .iter()
        .filter_map(|line| builder.push_line(line).unwrap())
        .map(|(_, sample)| sample.to_line())
        .collect();
    assert_eq!(
        samples,
        vec![
            "15:21:condition\tno history of stroke",
            "1:6:lab\thba1c ≥ @NUMBER %",
        ]
    );

    let report = builder.report();
    assert_eq!(report.line_count, 4);
    assert_eq!(report.sample_count, 2);
    assert_eq!(report.trial_count, 2);
    assert_eq!(report.train_count + report.test_count, 2);
}

#[test]
fn inference_row_gets_detected_slots() {
    let pipeline = pipeline();
    let row = InferenceRow::parse("NCT9\tinclusion\tHistory of heart failure; HbA1c > 7%").unwrap();
    let detected = pipeline.detect(row.text()).unwrap();
    let line = row.to_line(&detected).unwrap();

    let (prefix, json) = line.rsplit_once('\t').unwrap();
    assert_eq!(prefix, "NCT9\tinclusion\tHistory of heart failure; HbA1c > 7%");

    let value: serde_json::Value = serde_json::from_str(json).unwrap();
    let object = value.as_object().unwrap();
    assert_eq!(object.len(), 2);
    assert!(!object.contains_key("word_scores:NoLabel"));

    let condition = &object["word_scores:condition"][0];
    assert_eq!(condition[1], "heart failure");
    let score = condition[0].as_f64().unwrap();
    assert!(score > 0.9 && score <= 1.0);
    assert_eq!(object["word_scores:lab"][0][1], "hba1c");
}

#[test]
fn inference_without_matches_is_empty_object() {
    let pipeline = pipeline();
    let row = InferenceRow::parse("NCT9\texclusion\tPregnant women").unwrap();
    let line = row.to_line(&pipeline.detect(row.text()).unwrap()).unwrap();
    assert_eq!(line, "NCT9\texclusion\tPregnant women\t{}");
    assert_eq!(
        inference_header("id\ttype\tcriterion"),
        "id\ttype\tcriterion\tdetected_slots"
    );
}
