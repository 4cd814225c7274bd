use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

fn get_path(filename: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push(filename);
    path
}

#[test]
fn command_invalid() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("hitgff")?;
    cmd.arg("foobar");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("recognized"));

    Ok(())
}

#[test]
fn command_cluster() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("hitgff")?;
    let output = cmd
        .arg("cluster")
        .arg(get_path("blast/exons.tsv"))
        .output()?;

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    let expected = std::fs::read_to_string(get_path("blast/exons.gff3"))?;
    assert_eq!(stdout.replace("\r\n", "\n"), expected.replace("\r\n", "\n"));

    Ok(())
}

#[test]
fn command_cluster_evalue() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("hitgff")?;
    let output = cmd
        .arg("cluster")
        .arg(get_path("blast/exons.tsv"))
        .arg("--evalue")
        .arg("1")
        .arg("--prefix")
        .arg("est")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;

    // the weak est1 hit on scaffold_2 is kept and sorts first
    assert_eq!(stdout.lines().count(), 7);
    assert!(stdout.lines().nth(1).unwrap().starts_with(
        "scaffold_2\tBLAST\tmatch\t751\t800\t40\t-\t.\tID=est1;Name=est1;"
    ));

    Ok(())
}

#[test]
fn command_cluster_on_query() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("hitgff")?;
    let output = cmd
        .arg("cluster")
        .arg(get_path("blast/exons.tsv"))
        .arg("--on")
        .arg("query")
        .arg("--source")
        .arg("blastn")
        .arg("--type")
        .arg("EST_match")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;
    let lines: Vec<&str> = stdout.lines().collect();

    assert_eq!(lines.len(), 6);
    assert_eq!(
        lines[1],
        "est1\tblastn\tEST_match\t1\t100\t180\t+\t.\tID=match1;Name=scaffold_10;EValue=1.00e-40;Target=scaffold_10 5001 5100"
    );
    assert!(lines[3].starts_with("est2\tblastn\tEST_match\t1\t80\t140\t+\t"));
    assert!(lines[5].starts_with("est3\t"));

    Ok(())
}

#[test]
fn command_cluster_parallel() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("hitgff")?;
    let output = cmd
        .arg("cluster")
        .arg(get_path("blast/exons.tsv"))
        .arg("--parallel")
        .arg("3")
        .output()?;

    let stdout = String::from_utf8(output.stdout)?;
    let expected = std::fs::read_to_string(get_path("blast/exons.gff3"))?;
    assert_eq!(stdout.replace("\r\n", "\n"), expected.replace("\r\n", "\n"));

    Ok(())
}

#[test]
fn command_cluster_xml() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;
    let outfile = tempdir.path().join("blastx.gff3");

    let mut cmd = Command::cargo_bin("hitgff")?;
    cmd.arg("cluster")
        .arg(get_path("blast/blastx.xml"))
        .arg("--format")
        .arg("xml")
        .arg("--on")
        .arg("query")
        .arg("--prefix")
        .arg("prot")
        .arg("-o")
        .arg(&outfile)
        .assert()
        .success();

    let content = std::fs::read_to_string(&outfile)?;
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(
        lines,
        vec![
            "##gff-version 3",
            "scaffold_1\tBLAST\tmatch\t1001\t1300\t120.5\t+\t.\tID=prot1;Name=AT1G01010.1;EValue=3.20e-30;Target=AT1G01010.1 1 100",
            "scaffold_1\tBLAST\tmatch\t2500\t2800\t60\t+\t.\tID=prot1;Name=AT1G01010.1;EValue=1.00e-10;Target=AT1G01010.1 101 200",
        ]
    );

    Ok(())
}

#[test]
fn command_cluster_missing_file() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("hitgff")?;
    cmd.arg("cluster")
        .arg(get_path("blast/not_there.tsv"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Could not find"));

    Ok(())
}

#[test]
fn command_cluster_bad_row() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;
    let infile = tempdir.path().join("bad.tsv");
    std::fs::write(
        &infile,
        "q1\ts1\t98.5\t100\t1\t0\t1\t100\t500\t401\t1e-50\t200\nq1\ts1\t98.5\t100\t1\t0\t1\tten\t500\t401\t1e-50\t200\n",
    )?;

    let mut cmd = Command::cargo_bin("hitgff")?;
    cmd.arg("cluster")
        .arg(&infile)
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("record 2"));

    Ok(())
}
