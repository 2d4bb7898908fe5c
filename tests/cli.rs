use assert_cmd::prelude::*;
use predicates::str::contains;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

fn scene_file(xml: &str) -> NamedTempFile {
    let mut tmp = NamedTempFile::new().expect("temp scene");
    tmp.write_all(xml.as_bytes()).expect("write scene");
    tmp
}

fn binary() -> Command {
    Command::cargo_bin("deferred-lights").expect("binary exists")
}

#[test]
fn describe_prints_the_default_demo() {
    binary()
        .arg("--describe")
        .assert()
        .success()
        .stdout(contains("Scene with 2 objects"))
        .stdout(contains(" - Cube (cube) pos=(0.00, 0.00, 0.00)"))
        .stdout(contains(" - Ground (plane) pos=(0.00, -2.00, 0.00) scale=(40.00, 1.00, 40.00)"))
        .stdout(contains("0: shadow -> ShadowMap"))
        .stdout(contains("2: lighting/point -> Surface clear=true"))
        .stdout(contains("3: lighting/directional -> Surface clear=false"))
        .stdout(contains(" - point: 1 lights, 48 bytes (binding 0)"))
        .stdout(contains(" - spot: 1 lights, 64 bytes (binding 2)"));
}

#[test]
fn describe_clamps_light_counts() {
    binary()
        .args(["--describe", "--points", "500", "--spots", "-3", "--directionals", "7"])
        .assert()
        .success()
        .stdout(contains(" - point: 100 lights, 3216 bytes"))
        .stdout(contains(" - directional: 7 lights, 240 bytes"))
        .stdout(contains(" - spot: 0 lights, 16 bytes"));
}

#[test]
fn describe_clamps_counts_beyond_integer_range() {
    binary()
        .args(["--describe", "--points", "99999999999999999999"])
        .assert()
        .success()
        .stdout(contains(" - point: 100 lights, 3216 bytes"));
}

#[test]
fn describe_reads_a_scene_file() {
    let scene = scene_file(
        r#"<scene>
  <material><specular_power>8</specular_power></material>
  <object>
    <name>Pillar</name>
    <mesh>cube</mesh>
    <position>2 0 -1</position>
    <scale>1 4 1</scale>
  </object>
</scene>
"#,
    );
    binary()
        .arg("--describe")
        .arg("--scene")
        .arg(scene.path())
        .assert()
        .success()
        .stdout(contains("Scene with 1 objects"))
        .stdout(contains("specular power 8"))
        .stdout(contains(" - Pillar (cube) pos=(2.00, 0.00, -1.00) scale=(1.00, 4.00, 1.00)"));
}

#[test]
fn unknown_arguments_fail() {
    binary()
        .arg("--fullscreen")
        .assert()
        .failure()
        .code(1)
        .stderr(contains("Unknown argument: --fullscreen"));
}

#[test]
fn non_numeric_counts_fail() {
    binary()
        .args(["--describe", "--points", "lots"])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("--points expects an integer"));
}

#[test]
fn missing_scene_file_fails() {
    let dir = tempfile::tempdir().expect("temp dir");
    binary()
        .arg("--describe")
        .arg("--scene")
        .arg(dir.path().join("nowhere.xml"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("failed to read scene"));
}

#[test]
fn malformed_scene_fails() {
    let scene = scene_file("<scene><object><name>Broken</name><mesh>torus</mesh></object></scene>");
    binary()
        .arg("--describe")
        .arg("--scene")
        .arg(scene.path())
        .assert()
        .failure()
        .code(1)
        .stderr(contains("failed to parse scene"))
        .stderr(contains("unknown mesh 'torus'"));
}
