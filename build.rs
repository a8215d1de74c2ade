use std::process::Command;

fn main() {
    // Git hash (short) of the docstamp sources themselves
    let git_hash = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .and_then(|o| {
            if o.status.success() {
                Some(String::from_utf8_lossy(&o.stdout).trim().to_string())
            } else {
                None
            }
        })
        .unwrap_or_else(|| "unknown".to_string());
    println!("cargo:rustc-env=DOCSTAMP_GIT_HASH={}", git_hash);
    // Dirty flag
    let dirty = Command::new("git")
        .args(["diff", "--quiet"])
        .status()
        .map(|s| match s.code() {
            Some(0) => "clean",
            Some(1) => "dirty",
            // 129 and friends: not a checkout, or git itself failed
            _ => "unknown",
        })
        .unwrap_or("unknown");
    println!("cargo:rustc-env=DOCSTAMP_GIT_DIRTY={}", dirty);
}
