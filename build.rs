use std::process::Command;

/// Прокидывает короткий хэш коммита в `REGIONBUS_GIT_COMMIT`; вне
/// git-репозитория подставляется `unknown`.
fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-env-changed=REGIONBUS_GIT_COMMIT");

    let commit = std::env::var("REGIONBUS_GIT_COMMIT")
        .ok()
        .or_else(git_short_hash)
        .unwrap_or_else(|| "unknown".to_string());
    println!("cargo:rustc-env=REGIONBUS_GIT_COMMIT={}", commit.trim());
}

fn git_short_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8(output.stdout).ok())
        .flatten()
}
