use std::process::Command;

fn main() {
    // Build date shown in the startup banner
    let now = chrono::Utc::now().format("%Y-%m-%d").to_string();
    println!("cargo:rustc-env=KWM_BUILD_DATE={}", now);

    // Short commit hash, when building from a checkout
    if let Ok(output) = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
    {
        if output.status.success() {
            let commit = String::from_utf8_lossy(&output.stdout).trim().to_string();
            println!("cargo:rustc-env=KWM_GIT_COMMIT={}", commit);
        }
    }

    println!("cargo:rerun-if-changed=.git/HEAD");
}
