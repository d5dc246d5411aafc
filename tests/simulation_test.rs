use std::process::{Command, Output};

fn run_headless(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_delivery_sim"))
        .args(args)
        .env("RUST_LOG", "warn,delivery_sim=info")
        .output()
        .expect("Failed to execute simulation")
}

/// Test that the simulation runs in headless mode without crashing
#[test]
fn test_headless_simulation_runs() {
    let output = run_headless(&["--ticks", "200", "--runs", "2", "--seed", "5", "--orders", "40"]);

    assert!(
        output.status.success(),
        "Simulation failed to run in headless mode. stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("SIMULATION COMPLETE"),
        "Simulation did not complete properly. stderr: {}",
        stderr
    );
}

/// Test that run statistics and averaged scores are logged
#[test]
fn test_simulation_scores_logged() {
    let output = run_headless(&["--ticks", "150", "--runs", "1", "--seed", "9", "--orders", "30"]);
    assert!(output.status.success(), "Simulation failed to run");

    let stderr = String::from_utf8_lossy(&output.stderr);
    for expected in [
        "Orders received:",
        "Orders delivered:",
        "Delivery rate:",
        "Average IN_TIME:",
        "Average TRAVEL_DISTANCE:",
        "Average AMOUNT_DELIVERED:",
    ] {
        assert!(stderr.contains(expected), "Missing '{}' in output", expected);
    }
}

/// Test that intermediate summaries follow the requested interval
#[test]
fn test_periodic_summaries() {
    let output = run_headless(&[
        "--ticks",
        "100",
        "--runs",
        "1",
        "--seed",
        "2",
        "--orders",
        "20",
        "--summary-every",
        "25",
    ]);
    assert!(output.status.success(), "Simulation failed to run");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--- After tick 25 ---"));
    assert!(stderr.contains("--- After tick 75 ---"));
    assert!(!stderr.contains("--- After tick 100 ---"));
}

#[test]
fn test_invalid_capacity_fails() {
    let output = run_headless(&["--ticks", "10", "--runs", "1", "--capacity", "0"]);
    assert!(!output.status.success());
}
