use std::process::Command;

fn main() {
    println!("cargo::rerun-if-changed=../../.git/HEAD");
    println!("cargo::rerun-if-env-changed=PLANNER_COMMIT_HASH");

    let from_env = std::env::var("PLANNER_COMMIT_HASH")
        .ok()
        .filter(|hash| !hash.trim().is_empty());
    let commit = from_env
        .or_else(|| {
            let output = Command::new("git")
                .args(["rev-parse", "--short", "HEAD"])
                .output()
                .ok()?;
            output
                .status
                .success()
                .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo::rustc-env=PLANNER_COMMIT_HASH={}", commit);
}
