use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

fn runtime() -> Command {
    Command::cargo_bin("portfolio-runtime").expect("binary exists")
}

fn content_file() -> NamedTempFile {
    let xml = r#"<site>
  <profile><name>Ada</name><tagline>Engines</tagline></profile>
  <project>
    <title>Difference Engine</title>
    <description>Tables of polynomials</description>
    <tech>Brass, Gears</tech>
  </project>
  <skills category="Mathematics">
    <skill level="90">Analysis</skill>
    <skill level="80">Notes</skill>
  </skills>
  <education><degree>Tutoring</degree><school>Home</school><period>1820s</period></education>
  <contact kind="email"><label>Email</label><value>ada@example.com</value></contact>
</site>
"#;
    let mut tmp = NamedTempFile::new().expect("temp content");
    tmp.write_all(xml.as_bytes()).expect("write content");
    tmp
}

#[test]
fn headless_run_mounts_renders_and_unmounts() {
    runtime()
        .arg("--headless")
        .assert()
        .success()
        .stdout(contains(
            "Loaded content for Muhammad Talhah: 6 project(s), 21 skill(s), 3 education entries, 3 position(s), 7 contact(s)",
        ))
        .stdout(contains("Hero mounted at 800x600"))
        .stdout(contains("Rendered 3 frame(s)"))
        .stdout(contains("Revealed sections: none"))
        .stdout(contains("Hero unmounted; outstanding frames: 0, surfaces: 0"))
        .stdout(contains("Viewport state: scrolled=false menu_open=false"));
}

#[test]
fn zero_sized_resize_keeps_the_last_size() {
    runtime()
        .args(["--headless", "--frames", "0"])
        .args(["--resize", "1024x768", "--resize", "0x0"])
        .assert()
        .success()
        .stdout(contains("Resized to 1024x768 (aspect 1.333)").count(2))
        .stdout(contains("Rendered 2 frame(s)"));
}

#[test]
fn scrolling_past_the_threshold_marks_the_page_scrolled() {
    runtime()
        .args(["--headless", "--scroll", "5", "--scroll", "11"])
        .assert()
        .success()
        .stdout(contains("Scrolled to 5: scrolled=false"))
        .stdout(contains("Scrolled to 11: scrolled=true"));
}

#[test]
fn navigating_closes_the_menu_and_lands_on_the_section() {
    runtime()
        .args(["--headless", "--toggle-menu", "--navigate", "Projects"])
        .assert()
        .success()
        .stdout(contains("Menu open: true"))
        .stdout(contains("Navigated to Projects (offset 1200 after"))
        .stdout(contains("Revealed sections: About, Projects"))
        .stdout(contains("Viewport state: scrolled=true menu_open=false"));
}

#[test]
fn unknown_section_fails() {
    runtime()
        .args(["--headless", "--navigate", "blog"])
        .assert()
        .failure()
        .stderr(contains("cannot navigate to \"blog\""))
        .stderr(contains("unknown section name"));
}

#[test]
fn content_file_replaces_the_built_in_page() {
    let content = content_file();
    runtime()
        .arg("--summary-only")
        .arg("--content")
        .arg(content.path())
        .assert()
        .success()
        .stdout(contains(
            "Loaded content for Ada: 1 project(s), 2 skill(s), 1 education entry, 0 position(s), 1 contact(s)",
        ))
        .stdout(contains("Hero mounted").not());
}

#[test]
fn missing_content_file_is_reported() {
    runtime()
        .args(["--summary-only", "--content", "/nonexistent/site.xml"])
        .assert()
        .failure()
        .stderr(contains("failed to load content from /nonexistent/site.xml"));
}

#[test]
fn unknown_argument_prints_usage() {
    runtime()
        .arg("--fullscreen")
        .assert()
        .failure()
        .stderr(contains("Unknown argument: --fullscreen"))
        .stderr(contains("Usage: portfolio-runtime"));
}
