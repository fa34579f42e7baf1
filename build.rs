use std::process::Command;

#[allow(unused)]
macro_rules! warn {
    ($($tokens: tt)*) => {
        println!("cargo:warning={}", format!($($tokens)*))
    }
}

/// Set environment varibles for build.rs
/// set_env!(NAME=xfy);
macro_rules! set_env {
    ($($tokens: tt)*) => {
        println!("cargo:rustc-env={}", format!($($tokens)*))
    };
}

fn main() {
    rustc_info();
    commit_info();
}

fn rustc_info() {
    let rustc_output = Command::new("rustc")
        .args(["-vV"])
        .output()
        .expect("detect rustc info failed")
        .stdout;
    let info_str = String::from_utf8_lossy(&rustc_output);
    let info_arr = info_str
        .split('\n')
        .filter(|info| !info.is_empty())
        .collect::<Vec<_>>();

    set_env!("SW_COMPILER={}", info_arr[0]);
}

/// 构建时的 git 提交，非 git 目录下为 unknown
fn commit_info() {
    let commit = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string())
        .filter(|commit| !commit.is_empty())
        .unwrap_or_else(|| "unknown".to_string());

    set_env!("SW_COMMIT={}", commit);
}
