use std::process::{Command, Output};

fn run_simulation(extra: &[&str]) -> Output {
    let mut args = vec!["run", "--", "--ticks", "2000", "--seed", "42"];
    args.extend_from_slice(extra);
    Command::new("cargo")
        .args(&args)
        .env("RUST_LOG", "warn,traffic_manager=info")
        .output()
        .expect("Failed to execute simulation")
}

/// Value logged after `label` on the first matching line
fn logged_value<'a>(stderr: &'a str, label: &str) -> &'a str {
    let line = stderr
        .lines()
        .find(|line| line.contains(label))
        .unwrap_or_else(|| panic!("Could not find '{}' line", label));

    // Handle log format with timestamp and target
    line.split(label)
        .nth(1)
        .map(str::trim)
        .unwrap_or_else(|| panic!("Could not parse value from line: {}", line))
}

/// Test that the headless simulation runs to completion
#[test]
fn test_headless_simulation_runs() {
    let output = run_simulation(&[]);

    assert!(
        output.status.success(),
        "Simulation failed to run. stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("SIMULATION COMPLETE"),
        "Simulation did not complete properly. stderr: {}",
        stderr
    );
}

/// Test that the summary statistics are logged
#[test]
fn test_simulation_statistics_logged() {
    let output = run_simulation(&[]);
    assert!(output.status.success(), "Simulation failed to run");

    let stderr = String::from_utf8_lossy(&output.stderr);
    for label in [
        "Total vehicles dispatched:",
        "Total arrivals:",
        "Total crashed:",
        "In transit:",
        "Lane changes:",
        "Arrival rate:",
        "Roads:",
    ] {
        assert!(stderr.contains(label), "Missing '{}' statistic", label);
    }
}

/// Test that commuters leave home during the morning
#[test]
fn test_vehicles_dispatched_during_simulation() {
    let output = run_simulation(&[]);
    assert!(output.status.success(), "Simulation failed to run");

    let stderr = String::from_utf8_lossy(&output.stderr);
    let dispatched: u32 = logged_value(&stderr, "Total vehicles dispatched:")
        .parse()
        .expect("Could not parse dispatched count");
    let arrived: u32 = logged_value(&stderr, "Total arrivals:")
        .parse()
        .expect("Could not parse arrival count");

    assert!(dispatched > 0, "No vehicles were dispatched during simulation");
    assert!(arrived <= dispatched);
}

/// Test the wave and economy flags together
#[test]
fn test_waves_with_economy() {
    let output = run_simulation(&["--waves", "--economy"]);
    assert!(
        output.status.success(),
        "Simulation failed with waves. stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Wave 1 started"), "First wave never started");
    assert!(stderr.contains("Money:"), "Missing economy summary");

    let rate = logged_value(&stderr, "Arrival rate:");
    let rate: f32 = rate
        .strip_suffix('%')
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or_else(|| panic!("Could not parse '{}' as a percentage", rate));
    assert!((0.0..=100.0).contains(&rate), "Arrival rate out of range: {}%", rate);
}

/// Unknown policies are rejected
#[test]
fn test_unknown_policy_fails() {
    let output = run_simulation(&["--policy", "teleport"]);
    assert!(!output.status.success(), "Unknown policy should fail");
}
