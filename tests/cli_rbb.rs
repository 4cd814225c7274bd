use assert_cmd::Command;
use std::path::PathBuf;

fn get_path(filename: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests/blast");
    path.push(filename);
    path
}

#[test]
fn command_rbb() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("hitgff")?;
    cmd.arg("rbb")
        .arg(get_path("rbb_ab.tsv"))
        .arg(get_path("rbb_ba.tsv"))
        .assert()
        .success()
        .stdout("a1\tb1\na3\tb3\n");

    Ok(())
}

#[test]
fn command_rbb_all_detailed() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("hitgff")?;
    let output = cmd
        .arg("rbb")
        .arg(get_path("rbb_ab.tsv"))
        .arg(get_path("rbb_ba.tsv"))
        .arg("--all")
        .arg("--detailed")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert_eq!(
        stdout,
        "a1\tb1\ttrue\t1.00e-30\t150\na2\tb2\tfalse\t1.00e-30\t150\na3\tb3\ttrue\t1.00e-20\t120\n"
    );

    Ok(())
}

#[test]
fn command_rbb_evalue() -> anyhow::Result<()> {
    // a stricter cutoff removes the a3/b3 pair on both sides
    let mut cmd = Command::cargo_bin("hitgff")?;
    cmd.arg("rbb")
        .arg(get_path("rbb_ab.tsv"))
        .arg(get_path("rbb_ba.tsv"))
        .arg("--evalue")
        .arg("1e-25")
        .assert()
        .success()
        .stdout("a1\tb1\n");

    Ok(())
}

#[test]
fn command_rbb_needs_two_files() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("hitgff")?;
    cmd.arg("rbb").arg(get_path("rbb_ab.tsv")).assert().failure();

    Ok(())
}
