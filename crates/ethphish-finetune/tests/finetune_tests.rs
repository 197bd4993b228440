//! End-to-end tests of the training and evaluation phases on a tiny model

use candle_core::Device;
use ethphish_core::Error;
use ethphish_finetune::{evaluate, run, train, FinetuneConfig};
use serde_json::{json, Map, Value};
use std::path::Path;
use tempfile::TempDir;

const SEQ_LEN: usize = 4;
const PHISHERS: [i32; 2] = [1, 2];

fn record_line(address: i32) -> String {
    let label = if PHISHERS.contains(&address) { 1.0 } else { 0.0 };
    let mut fields = Map::new();
    fields.insert("address".into(), json!(address));
    fields.insert("label".into(), json!(label));

    for (prefix, shift) in [("in", 1), ("out", 2), ("all", 3)] {
        let token = |i: i32| (address + shift * i) % 10;
        fields.insert(format!("{prefix}_token_ids"), json!([address, token(1), token(2), 0]));
        fields.insert(format!("{prefix}_positions"), json!([0, 1, 2, 3]));
        fields.insert(format!("{prefix}_io_flags"), json!([0, 1, 2, 0]));
        fields.insert(format!("{prefix}_counts"), json!([1, address, 3, 0]));
        fields.insert(format!("{prefix}_values"), json!([2, 4, address, 0]));
        fields.insert(format!("{prefix}_mask"), json!([1, 1, 1, 0]));
    }
    Value::Object(fields).to_string()
}

fn write_records(path: &Path, addresses: &[i32]) {
    let lines: Vec<String> = addresses.iter().map(|&a| record_line(a)).collect();
    std::fs::write(path, lines.join("\n") + "\n").unwrap();
}

/// Lays out every input file of a run under a temp dir
fn fixture() -> (TempDir, FinetuneConfig) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    std::fs::write(
        root.join("bert_config.json"),
        json!({
            "vocab_size": 10,
            "hidden_size": 8,
            "num_hidden_layers": 1,
            "num_attention_heads": 2,
            "intermediate_size": 8,
            "max_position_embeddings": SEQ_LEN,
        })
        .to_string(),
    )
    .unwrap();

    let token_to_ids: Map<String, Value> =
        (1..10).map(|id| (format!("0xaddr{id}"), json!(id))).collect();
    std::fs::write(
        root.join("vocab.exp"),
        json!({ "token_to_ids": token_to_ids }).to_string(),
    )
    .unwrap();

    std::fs::write(root.join("phisher_account.txt"), "0xaddr1\n0xaddr2,extra\n\n").unwrap();

    write_records(&root.join("train.jsonl.exp"), &[1, 3, 2, 4, 5, 1, 6, 7]);
    write_records(&root.join("test.jsonl.exp"), &[1, 3, 2, 3, 5, 6, 1]);

    let config = FinetuneConfig {
        bizdate: "exp".to_string(),
        epoch: 2,
        batch_size: 3,
        max_seq_length: SEQ_LEN,
        train_input_file: root.join("train.jsonl"),
        test_input_file: root.join("test.jsonl"),
        data_dir: format!("{}/", root.display()),
        vocab_filename: "vocab".to_string(),
        phisher_account_file: root.join("phisher_account.txt"),
        bert_config_file: root.join("bert_config.json"),
        checkpoint_dir: root.join("ckpt"),
        learning_rate: 1e-3,
        num_train_steps: 100,
        num_warmup_steps: 2,
        hidden_size: 4,
        num_cpu_threads: 2,
        log_every: 1,
        ..Default::default()
    };
    (dir, config)
}

#[test]
fn test_training_consumes_every_epoch_and_saves() {
    let (_dir, config) = fixture();

    let summary = train(&config, &Device::Cpu).unwrap();

    // 16 records in batches of 3: five full batches and a final partial one
    assert_eq!(summary.records, 16);
    assert_eq!(summary.steps, 6);
    assert!(summary.final_loss.unwrap().is_finite());
    assert_eq!(summary.checkpoint, config.checkpoint_path());
    assert!(summary.checkpoint.exists());
}

#[test]
fn test_repeated_evaluation_is_identical() {
    let (_dir, config) = fixture();
    train(&config, &Device::Cpu).unwrap();

    let first = evaluate(&config, &Device::Cpu).unwrap();
    let second = evaluate(&config, &Device::Cpu).unwrap();

    assert_eq!(first.num_records, 7);
    let order: Vec<i32> = first.addresses.iter().map(|a| a.address).collect();
    assert_eq!(order, vec![1, 3, 2, 5, 6]);
    assert_eq!(first.labels, vec![1.0, 0.0, 1.0, 0.0, 0.0]);
    assert_eq!(first.addresses[0].records, 2);

    assert_eq!(first.scores(), second.scores());
    assert_eq!(first.auc, second.auc);
    assert!(first.auc.is_some());
}

#[test]
fn test_run_both_phases_and_write_report() {
    let (dir, mut config) = fixture();
    let report_path = dir.path().join("reports").join("eval.json");
    config.report_output = Some(report_path.clone());

    let outcome = run(&config).unwrap();

    assert!(outcome.training.is_some());
    let report = outcome.report.unwrap();
    assert_eq!(report.thresholds.len(), 19);

    let written: Value =
        serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(written["num_records"], json!(7));
    assert_eq!(written["label_sum"], json!(2.0));
}

#[test]
fn test_evaluation_requires_finetuned_checkpoint() {
    let (_dir, mut config) = fixture();
    config.do_train = false;

    let err = evaluate(&config, &Device::Cpu).unwrap_err();
    assert!(matches!(err, Error::Checkpoint(_)));
}

#[test]
fn test_init_from_pretrained_checkpoint() {
    let (dir, config) = fixture();
    let pretrained = train(&config, &Device::Cpu).unwrap().checkpoint;

    let config = FinetuneConfig {
        init_checkpoint: Some(pretrained),
        checkpoint_dir: dir.path().join("ckpt2"),
        ..config
    };
    let summary = train(&config, &Device::Cpu).unwrap();

    assert_eq!(
        summary.checkpoint,
        dir.path().join("ckpt2").join("bert_finetune_exp.safetensors")
    );
    assert!(summary.checkpoint.exists());
}

#[test]
fn test_malformed_record_aborts_training() {
    let (dir, config) = fixture();
    std::fs::write(
        dir.path().join("train.jsonl.exp"),
        format!("{}\n{{\"address\": 1}}\n", record_line(1)),
    )
    .unwrap();

    let err = train(&config, &Device::Cpu).unwrap_err();
    assert!(matches!(err, Error::Decode(_)));
    assert!(!config.checkpoint_path().exists());
}
