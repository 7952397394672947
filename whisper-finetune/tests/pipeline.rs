//! End-to-end tests: corpus on disk to collated batch to word error rate.

use hound::{SampleFormat, WavSpec, WavWriter};
use ndarray::Array2;
use std::path::{Path, PathBuf};
use whisper_finetune::collate::DataCollatorSpeechSeq2SeqWithPadding;
use whisper_finetune::dataset::{Manifest, prepare_split, read_jsonl, write_jsonl};
use whisper_finetune::feature_extractor::{WhisperFeatureConfig, WhisperFeatureExtractor};
use whisper_finetune::metrics::{EvalPrediction, WerMetric};
use whisper_finetune::prepare::SamplePreparer;
use whisper_finetune::processor::WhisperProcessor;
use whisper_finetune::tokenizer::{Task, WhisperTokenizer};
use whisper_finetune::traits::TextTokenizer;
use whisper_finetune::types::{IGNORE_INDEX, ModelRepo, RawSample};

const FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/tokenizer.json");

fn tokenizer() -> WhisperTokenizer {
    WhisperTokenizer::from_file(FIXTURE, "hi".parse().unwrap(), Task::Transcribe).unwrap()
}

fn short_chunk_extractor() -> WhisperFeatureExtractor {
    WhisperFeatureExtractor::new(WhisperFeatureConfig {
        chunk_length: 1,
        ..Default::default()
    })
    .unwrap()
}

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(name);
    if dir.exists() {
        std::fs::remove_dir_all(&dir).ok();
    }
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_tone(path: &Path, len: usize) {
    let spec = WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec).unwrap();
    for i in 0..len {
        let t = i as f32 / 16000.0;
        let sample = (t * 440.0 * 2.0 * std::f32::consts::PI).sin() * 0.3;
        writer.write_sample((sample * i16::MAX as f32) as i16).unwrap();
    }
    writer.finalize().unwrap();
}

#[test]
fn hindi_transcript_round_trips_through_labels() {
    let tokenizer = tokenizer();
    let extractor = WhisperFeatureExtractor::default();
    let preparer = SamplePreparer::new(&extractor, &tokenizer);

    let sample = RawSample::new(vec![0.0; 8000], 16000, "नमस्ते दुनिया");
    let prepared = preparer.prepare(&sample).unwrap();

    assert_eq!(prepared.input_features.dim(), (80, 3000));
    assert_eq!(prepared.labels.first(), Some(&tokenizer.start_token_id()));
    assert_eq!(prepared.labels.last(), Some(&tokenizer.pad_token_id()));
    assert_eq!(
        tokenizer.decode(&prepared.labels, true).unwrap(),
        "नमस्ते दुनिया"
    );
}

#[test]
fn corpus_to_batch_to_metric() {
    let dir = temp_dir("wft-pipeline");
    std::fs::create_dir_all(dir.join("clips")).unwrap();

    let rows = [
        ("one.mp3", "hello world"),
        ("two.mp3", "the cat sat on the mat"),
    ];
    let mut tsv = String::from("client_id\tpath\tsentence\tlocale\n");
    for (i, (clip, sentence)) in rows.iter().enumerate() {
        write_tone(
            &dir.join("clips").join(clip).with_extension("wav"),
            4000 * (i + 1),
        );
        tsv.push_str(&format!("c{i}\t{clip}\t{sentence}\thi\n"));
    }
    std::fs::write(dir.join("train.tsv"), tsv).unwrap();

    let tokenizer = tokenizer();
    let extractor = short_chunk_extractor();
    let preparer = SamplePreparer::new(&extractor, &tokenizer);

    let manifest = Manifest::from_corpus(&dir, "train").unwrap();
    let prepared = prepare_split(preparer, &manifest, 2).unwrap();

    let jsonl = dir.join("prepared/train.jsonl");
    write_jsonl(&jsonl, &prepared).unwrap();
    let reloaded = read_jsonl(&jsonl).unwrap();
    assert_eq!(reloaded, prepared);

    let collator = DataCollatorSpeechSeq2SeqWithPadding::new(&extractor, &tokenizer);
    let batch = collator.collate(&reloaded).unwrap();

    // prefix tail (3) + words + end token, start token stripped
    assert_eq!(batch.input_features.input_features.dim(), (2, 80, 100));
    assert_eq!(batch.labels.dim(), (2, 10));
    assert_eq!(
        batch.labels.row(0).iter().filter(|&&id| id == IGNORE_INDEX).count(),
        4
    );

    // A model that gets one word of each transcript wrong
    let predictions = Array2::from_shape_vec(
        (2, 11),
        vec![
            12, 14, 16, 17, 1, 3, 11, 11, 11, 11, 11, //
            12, 14, 16, 17, 6, 7, 8, 9, 6, 6, 11,
        ],
    )
    .unwrap();
    let eval = EvalPrediction {
        predictions,
        label_ids: batch.labels,
    };

    let result = WerMetric::new(&tokenizer).compute(&eval).unwrap();
    assert!((result.wer - 25.0).abs() < 1e-9);

    std::fs::remove_dir_all(dir).ok();
}

#[test]
fn processor_saved_to_output_dir_reloads() {
    let dir = temp_dir("wft-pipeline-processor");
    let processor = WhisperProcessor::new(short_chunk_extractor(), tokenizer());
    processor.save_pretrained(&dir).unwrap();

    let repo = ModelRepo::Path(dir.clone());
    let reloaded = WhisperProcessor::from_repo(&repo, "Hindi".parse().unwrap(), Task::Transcribe)
        .unwrap();

    assert_eq!(reloaded.feature_extractor.config().chunk_length, 1);
    assert_eq!(
        reloaded.tokenizer.prefix_tokens(),
        processor.tokenizer.prefix_tokens()
    );

    std::fs::remove_dir_all(dir).ok();
}
