use std::path::PathBuf;
use std::process::{Command, Output};

use kd_test_fixture::{fixture_dir, TempProject};

fn sample() -> PathBuf {
    fixture_dir("skin.sample")
}

fn kodidevkit(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_kodidevkit"))
        .args(args)
        .output()
        .expect("cli should execute")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn check_reports_every_pass_on_the_sample_skin() {
    let root = sample();
    let output = kodidevkit(&["check", root.to_string_lossy().as_ref()]);
    let text = stdout(&output);
    assert_eq!(output.status.code(), Some(2), "stdout:\n{}", text);
    assert!(text.starts_with("RESULT:OK"));
    for expected in [
        "DIAGNOSTIC:1080i/Includes.xml:8|include|\"Unused include: UnusedInclude\"",
        "DIAGNOSTIC:1080i/Home.xml:22|font|\"Font not defined: font99\"",
        "DIAGNOSTIC:1080i/Font.xml:9|font|\"Unused font: font_unused\"",
        "DIAGNOSTIC:1080i/Home.xml:24|visible|\"Brackets do not match: [Player.HasVideo\"",
    ] {
        assert!(text.contains(expected), "missing {}\nstdout:\n{}", expected, text);
    }
    assert!(text.trim_end().ends_with("COUNT:4"), "stdout:\n{}", text);
}

#[test]
fn check_emits_json_on_request() {
    let root = sample();
    let output = kodidevkit(&[
        "check",
        root.to_string_lossy().as_ref(),
        "--kind",
        "font",
        "--format",
        "json",
    ]);
    assert_eq!(output.status.code(), Some(2));
    let parsed: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("json output");
    let items = parsed.as_array().expect("array");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["message"], "Font not defined: font99");
    assert_eq!(items[0]["type"], "font");
}

#[test]
fn resolve_explains_labels_and_positions() {
    let home = sample().join("1080i").join("Home.xml");
    let home = home.to_string_lossy().to_string();
    let label = kodidevkit(&["resolve", &home, "--line", "14", "--column", "11"]);
    assert_eq!(label.status.code(), Some(0));
    let text = stdout(&label);
    assert!(text.contains("KIND:label"), "stdout:\n{}", text);
    assert!(text.contains("Home<br>"), "stdout:\n{}", text);

    let position = kodidevkit(&["resolve", &home, "--line", "9", "--column", "3"]);
    let text = stdout(&position);
    assert!(text.contains("KIND:position"), "stdout:\n{}", text);
    assert!(text.contains("<b>posx:</b> 60 + 20 = 80<br>"), "stdout:\n{}", text);

    let image = kodidevkit(&[
        "resolve",
        &sample().join("1080i").join("Includes.xml").to_string_lossy(),
        "--line",
        "5",
        "--column",
        "15",
    ]);
    assert!(stdout(&image).contains("<b>Dimensions:</b> 8x4<br>"));
}

#[test]
fn goto_and_missing_windows() {
    let root = sample();
    let root = root.to_string_lossy().to_string();
    let goto = kodidevkit(&["goto", &root, "font13"]);
    let text = stdout(&goto);
    assert_eq!(goto.status.code(), Some(0));
    assert!(text.contains("Font.xml:4"), "stdout:\n{}", text);

    let missing = kodidevkit(&["goto", &root, "31001"]);
    assert!(stdout(&missing).contains("strings.po:"));

    let windows = kodidevkit(&["missing-windows", &root]);
    let text = stdout(&windows);
    assert!(text.contains("MISSING:1080i|Settings.xml"));
    assert!(!text.contains("MISSING:1080i|Home.xml"));
}

#[test]
fn new_label_writes_the_primary_catalog() {
    let skin = TempProject::skin("cli-new-label", &["1080i"]);
    skin.write("1080i/Home.xml", "<window/>\n");
    let root = skin.root().to_string_lossy().to_string();
    let output = kodidevkit(&[
        "new-label",
        &root,
        "--text",
        "Weather",
        "--file",
        "1080i/Home.xml",
    ]);
    let text = stdout(&output);
    assert_eq!(output.status.code(), Some(0), "stdout:\n{}", text);
    assert!(text.contains("LABEL_ID:31000"));
    assert!(text.contains("REFERENCE_JSON:\"$LOCALIZE[31000]\""));
    assert!(skin
        .path("language/resource.language.en_gb/strings.po")
        .is_file());
}

#[test]
fn errors_use_the_error_protocol() {
    let scratch = TempProject::new("cli-error");
    let output = kodidevkit(&["check", scratch.root().to_string_lossy().as_ref()]);
    let text = stdout(&output);
    assert_eq!(output.status.code(), Some(1));
    assert!(text.contains("RESULT:ERROR"));
    assert!(text.contains("ERROR_CODE:NOT_A_PROJECT"));
}
