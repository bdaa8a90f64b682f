#![cfg(unix)]

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn runs_file_and_report_pipelines_over_a_tree() {
    let work = tempfile::tempdir().unwrap();
    let src = work.path().join("evidence");
    fs::create_dir_all(src.join("docs")).unwrap();
    fs::write(src.join("a.txt"), "alpha").unwrap();
    fs::write(src.join("docs/b.txt"), "beta").unwrap();

    let lister = work.path().join("list.sh");
    fs::write(&lister, "echo \"$1\"\n").unwrap();
    let summary = work.path().join("summary.sh");
    fs::write(&summary, "echo done\n").unwrap();
    let pc = work.path().join("pipelines.xml");
    fs::write(&pc,
              format!(r#"<PIPELINE_CONFIG>
          <PIPELINE type="FileAnalysis">
            <MODULE order="1" type="executable" location="/bin/sh" arguments="{} @FILE_NAME" output="@OUT/names.txt"/>
          </PIPELINE>
          <PIPELINE type="Report">
            <MODULE order="1" type="executable" location="/bin/sh" arguments="{}" output="@OUT/report.txt"/>
          </PIPELINE>
        </PIPELINE_CONFIG>"#,
                      lister.display(),
                      summary.display())).unwrap();
    let out = work.path().join("out");

    Command::cargo_bin("analyze-dir").unwrap()
                                     .env_remove("DATABASE_URL")
                                     .arg("-p")
                                     .arg(&pc)
                                     .arg("-d")
                                     .arg(&out)
                                     .arg(&src)
                                     .assert()
                                     .success()
                                     .stdout(predicate::str::contains("analyzed: 2, skipped: 2"));

    let names = fs::read_to_string(out.join("names.txt")).unwrap();
    let mut lines: Vec<_> = names.lines().collect();
    lines.sort();
    assert_eq!(lines, vec!["a.txt", "b.txt"]);
    assert_eq!(fs::read_to_string(out.join("report.txt")).unwrap(), "done\n");
}

#[test]
fn existing_output_directory_is_rejected() {
    let work = tempfile::tempdir().unwrap();
    let src = work.path().join("src");
    fs::create_dir(&src).unwrap();
    let out = work.path().join("out");
    fs::create_dir(&out).unwrap();
    Command::cargo_bin("analyze-dir").unwrap()
                                     .env_remove("DATABASE_URL")
                                     .arg("-d")
                                     .arg(&out)
                                     .arg(&src)
                                     .assert()
                                     .failure()
                                     .stderr(predicate::str::contains("output directory already exists"));
}

#[test]
fn missing_pipeline_config_is_reported_and_leaves_no_output_dir() {
    let work = tempfile::tempdir().unwrap();
    let src = work.path().join("src");
    fs::create_dir(&src).unwrap();
    let out = work.path().join("out");
    let pc = work.path().join("pipelines.xml");
    let analyze = || {
        let mut cmd = Command::cargo_bin("analyze-dir").unwrap();
        cmd.env_remove("DATABASE_URL").arg("-p").arg(&pc).arg("-d").arg(&out).arg(&src);
        cmd
    };

    analyze().assert()
             .failure()
             .stderr(predicate::str::contains("Error opening pipeline config file"));
    assert!(!out.exists());

    // Con la configuración corregida, el reintento no choca con `out`.
    fs::write(&pc,
              r#"<PIPELINE_CONFIG><PIPELINE type="FileAnalysis"><MODULE order="1" type="executable" location="/bin/sh" arguments="-c true"/></PIPELINE></PIPELINE_CONFIG>"#).unwrap();
    analyze().assert().success();
    assert!(out.is_dir());
}
