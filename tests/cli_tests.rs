//! Integration tests for the stallscope binary

use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Pipeline16 rows for `iterations` runs of a 2-instruction loop,
/// iteration k covering cycles `[10k, 10k+5)`
fn loop_trace(iterations: u64) -> String {
    let mut log = String::from(
        "pc,asm,fetch,preDecode,decode,dispatch,issue,readOp,execute,execute1,execute2,writeBack,writeBackROB,commit,lastCmt,is_branch\n",
    );
    for k in 0..iterations {
        let t = 10 * k;
        log.push_str(&format!(
            "0x80000000,\"lw a0, 0(a1)\",{t},{t},{t},{t},{t},{t},{t},{t},{t},{},{},{},{t},0\n",
            t + 2,
            t + 2,
            t + 3
        ));
        log.push_str(&format!(
            "0x80000004,\"bne a0, zero, -4\",{t},{t},{t},{t},{t},{t},{t},{t},{t},{},{},{},{},1\n",
            t + 4,
            t + 4,
            t + 5,
            t + 1
        ));
    }
    log
}

const EVENTS: &str = "5,4,0x80000900\n12,30,0x8000e000\n25,11,\n30,2,0x1\ngarbage\n";

struct Fixture {
    dir: TempDir,
    trace: PathBuf,
    events: PathBuf,
}

fn fixture(iterations: u64) -> Fixture {
    let dir = TempDir::new().unwrap();
    let trace = dir.path().join("trace.csv");
    let events = dir.path().join("events.log");
    fs::write(&trace, loop_trace(iterations)).unwrap();
    fs::write(&events, EVENTS).unwrap();
    Fixture { dir, trace, events }
}

fn command(f: &Fixture) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("stallscope");
    cmd.arg("--trace")
        .arg(&f.trace)
        .arg("--events")
        .arg(&f.events);
    cmd
}

#[test]
fn test_csv_report_on_stdout() {
    let f = fixture(6);
    command(&f)
        .args(["--group-size", "4", "--sublayer-size", "2"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("block_id,group_index,sublayer_index"))
        .stdout(predicate::str::contains(
            "0,0,0,0,1,2,0,15,15,2,34,2.266667,1,4,0,0,0,0,1,30,0,0,0,0",
        ))
        .stdout(predicate::str::contains("0,1,0,2,5,6,40,55,15,0,0,0.000000"));
}

#[test]
fn test_json_report() {
    let f = fixture(6);
    let output = command(&f)
        .args(["--group-size", "4", "--sublayer-size", "2", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["rows"].as_array().map(Vec::len), Some(3));
    assert_eq!(parsed["rows"][1]["unclassified_high"]["duration"], 11);
    assert_eq!(parsed["drops"]["events_dropped"], 1);
}

#[test]
fn test_sublayer_must_divide_group() {
    let f = fixture(2);
    command(&f)
        .args(["--group-size", "10", "--sublayer-size", "3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not divide"));
}

#[test]
fn test_missing_trace_file_names_path() {
    let f = fixture(1);
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("stallscope");
    cmd.arg("--trace")
        .arg(f.dir.path().join("absent.csv"))
        .arg("--events")
        .arg(&f.events)
        .assert()
        .failure()
        .stderr(predicate::str::contains("absent.csv"));
}

#[test]
fn test_config_file_and_flag_override() {
    let f = fixture(6);
    let config = f.dir.path().join("stallscope.toml");
    fs::write(
        &config,
        "latency_threshold = 50\n\n[hierarchy]\ngroup_size = 6\nsublayer_size = 6\n",
    )
    .unwrap();

    // Threshold 50 makes the 30-cycle regionB event low-latency
    command(&f)
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "0,0,0,0,1,6,0,55,55,4,47,0.854545,1,4,0,0,1,30,0,0,2,13,0,0",
        ));

    command(&f)
        .arg("--config")
        .arg(&config)
        .args(["--sublayer-size", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0,0,1,1,4,6,30,55,25,"));
}

#[test]
fn test_output_and_side_reports_written_to_files() {
    let f = fixture(6);
    let report = f.dir.path().join("report.csv");
    let blocks = f.dir.path().join("blocks.csv");
    let stages = f.dir.path().join("stages.csv");

    command(&f)
        .arg("--output")
        .arg(&report)
        .arg("--blocks-summary")
        .arg(&blocks)
        .arg("--stages")
        .arg(&stages)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let report = fs::read_to_string(report).unwrap();
    assert_eq!(report.lines().count(), 2);

    let blocks = fs::read_to_string(blocks).unwrap();
    assert!(blocks.starts_with("# blocks=1,"));
    assert!(blocks.contains("0,0x80000000,6,12,30,"));

    let stages = fs::read_to_string(stages).unwrap();
    assert!(stages.starts_with("Stage,PC,ASM,Count,Total_Cycles,Avg_Cycles"));
    assert!(stages.contains("ALL_STAGES_TOTAL,"));
    assert!(stages.contains("_Load_TOTAL,"));
}

#[test]
fn test_pc_stats_file() {
    let f = fixture(3);
    let pc_stats = f.dir.path().join("pc_stats.csv");

    command(&f).arg("--pc-stats").arg(&pc_stats).assert().success();

    let csv = fs::read_to_string(pc_stats).unwrap();
    let lines: Vec<_> = csv.lines().collect();
    assert_eq!(lines[0], "pc,asm,count,total_cycles,avg_cycles");
    assert_eq!(lines[1], "0x80000004,\"bne a0, zero, -4\",3,12.000000,4.000000");
    assert_eq!(lines[2], "0x80000000,\"lw a0, 0(a1)\",3,9.000000,3.000000");
    assert!(csv.contains("TOTAL_Cycles,21.000000"));
    assert!(csv.contains("Load,3,9.000000,3.000000,7.5"));
}

#[test]
fn test_rejects_unknown_format() {
    let f = fixture(1);
    command(&f).args(["--format", "text"]).assert().failure();
}
