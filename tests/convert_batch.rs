use elsevier_xml_json_parse::{run, ConverterConfig};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const EXPECTED_KEYS: [&str; 10] = [
    "title",
    "abstract",
    "body",
    "citations",
    "references",
    "datasets",
    "authors",
    "publication date",
    "keywords",
    "institution",
];

fn words(n: usize) -> String {
    (0..n).map(|i| format!("word{}", i)).collect::<Vec<_>>().join(" ")
}

fn article(title: &str, abstract_text: &str, paragraphs: &[String]) -> String {
    let paras: String = paragraphs
        .iter()
        .map(|p| format!("<ce:para>{}</ce:para>", p))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<full-text-retrieval-response xmlns="http://www.elsevier.com/xml/svapi/article/dtd"
    xmlns:dc="http://purl.org/dc/elements/1.1/"
    xmlns:dcterms="http://purl.org/dc/terms/"
    xmlns:prism="http://prismstandard.org/namespaces/basic/2.0/"
    xmlns:ce="http://www.elsevier.com/xml/common/dtd"
    xmlns:sa="http://www.elsevier.com/xml/common/struct-aff/dtd">
  <coredata>
    <dc:title>{}</dc:title>
    <dc:description>{}</dc:description>
    <prism:coverDate>2020-01-31</prism:coverDate>
    <dc:creator>Alice</dc:creator>
    <dc:creator>Bob</dc:creator>
    <dcterms:subject>Chemistry</dcterms:subject>
  </coredata>
  <originalText>
    <ce:doi>10.1016/j.test.2020.01.001</ce:doi>
    <ce:affiliation><sa:affiliation><sa:organization>MIT</sa:organization></sa:affiliation></ce:affiliation>
    {}
  </originalText>
</full-text-retrieval-response>
"#,
        title, abstract_text, paras
    )
}

fn config(input: &Path, output: &Path) -> ConverterConfig {
    let mut config = ConverterConfig::new(input, output);
    config.show_progress = false;
    config
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn missing_input_directory_fails_without_creating_output() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("does-not-exist");
    let output = tmp.path().join("json_output");

    let result = run(&config(&input, &output));

    assert!(result.is_err());
    assert!(!output.exists());
}

#[test]
fn directory_without_matching_files_produces_nothing() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("xml_files");
    let output = tmp.path().join("json_output");
    fs::create_dir(&input).unwrap();
    fs::write(input.join("notes.txt"), "not xml").unwrap();
    fs::write(input.join("paper.XML"), article("T", &words(60), &[])).unwrap();

    let summary = run(&config(&input, &output)).unwrap();

    assert_eq!(summary.files_found, 0);
    assert_eq!(summary.processed, 0);
    assert_eq!(summary.skipped(), 0);
    assert_eq!(fs::read_dir(&output).unwrap().count(), 0);
}

#[test]
fn converts_long_articles_and_skips_short_or_broken_ones() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("xml_files");
    let output = tmp.path().join("json_output");
    fs::create_dir(&input).unwrap();

    fs::write(
        input.join("long.xml"),
        article("  Deep Learning  ", &words(20), &[words(20), words(10)]),
    )
    .unwrap();
    fs::write(input.join("short.xml"), article("Short", &words(5), &[words(10)])).unwrap();
    fs::write(input.join("broken.xml"), "<root><dc:title>oops</root>").unwrap();

    let summary = run(&config(&input, &output)).unwrap();

    assert_eq!(summary.files_found, 3);
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.skipped_below_threshold, 1);
    assert_eq!(summary.skipped_failed, 1);
    assert_eq!(summary.skipped(), 2);
    assert_eq!(summary.failed_files, vec![input.join("broken.xml")]);

    assert!(!output.join("short.json").exists());
    assert!(!output.join("broken.json").exists());

    let json = read_json(&output.join("long.json"));
    let object = json.as_object().unwrap();
    assert_eq!(object.len(), EXPECTED_KEYS.len());
    for key in EXPECTED_KEYS {
        assert!(object.contains_key(key), "missing key {}", key);
    }
    assert_eq!(json["title"], "Deep Learning");
    assert_eq!(json["authors"], serde_json::json!(["Alice", "Bob"]));
    assert_eq!(json["institution"], "MIT");
    assert_eq!(json["publication date"], "2020-01-31");
    assert_eq!(json["keywords"], serde_json::json!(["Chemistry"]));
    assert_eq!(json["datasets"], serde_json::json!(["10.1016/j.test.2020.01.001"]));
    assert_eq!(json["citations"], serde_json::json!([]));
    assert_eq!(json["body"], format!("{} {}", words(20), words(10)));
}

#[test]
fn output_keys_follow_the_fixed_order() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in");
    let output = tmp.path().join("out");
    fs::create_dir(&input).unwrap();
    fs::write(input.join("a.xml"), article("A", &words(60), &[])).unwrap();

    run(&config(&input, &output)).unwrap();

    let contents = fs::read_to_string(output.join("a.json")).unwrap();
    let positions: Vec<usize> = EXPECTED_KEYS
        .iter()
        .map(|key| contents.find(&format!("\n    \"{}\": ", key)).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn body_only_articles_pass_on_body_words() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in");
    let output = tmp.path().join("out");
    fs::create_dir(&input).unwrap();
    let xml = article("Body only", "", &[words(50)]);
    fs::write(input.join("b.xml"), xml).unwrap();

    let summary = run(&config(&input, &output)).unwrap();

    assert_eq!(summary.processed, 1);
    let json = read_json(&output.join("b.json"));
    assert_eq!(json["abstract"], "No abstract");
}

#[test]
fn threshold_is_configurable() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in");
    let output = tmp.path().join("out");
    fs::create_dir(&input).unwrap();
    fs::write(input.join("tiny.xml"), article("Tiny", "Three word abstract", &[])).unwrap();

    let mut cfg = config(&input, &output);
    cfg.min_word_count = 3;
    let summary = run(&cfg).unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(read_json(&output.join("tiny.json"))["body"], "No body text");
}

#[test]
fn rerun_overwrites_existing_output() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in");
    let output = tmp.path().join("out");
    fs::create_dir(&input).unwrap();
    fs::create_dir(&output).unwrap();
    fs::write(output.join("paper.json"), "stale contents that are much longer than anything else").unwrap();
    fs::write(input.join("paper.xml"), article("First", &words(60), &[])).unwrap();

    run(&config(&input, &output)).unwrap();
    assert_eq!(read_json(&output.join("paper.json"))["title"], "First");

    fs::write(input.join("paper.xml"), article("Second", &words(60), &[])).unwrap();
    let summary = run(&config(&input, &output)).unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(read_json(&output.join("paper.json"))["title"], "Second");
}

#[test]
fn non_ascii_text_is_written_literally() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in");
    let output = tmp.path().join("out");
    fs::create_dir(&input).unwrap();
    fs::write(input.join("u.xml"), article("Étude über Graphen", &words(60), &[])).unwrap();

    run(&config(&input, &output)).unwrap();

    let contents = fs::read_to_string(output.join("u.json")).unwrap();
    assert!(contents.contains("\"title\": \"Étude über Graphen\""));
}

#[test]
fn writes_report_when_requested() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in");
    let output = tmp.path().join("out");
    fs::create_dir(&input).unwrap();
    fs::write(input.join("a.xml"), article("A", &words(60), &[])).unwrap();
    fs::write(input.join("b.xml"), article("B", &words(2), &[])).unwrap();

    let mut cfg = config(&input, &output);
    let report_path = tmp.path().join("reports").join("run.csv");
    cfg.report_path = Some(report_path.clone());
    run(&cfg).unwrap();

    let report = fs::read_to_string(&report_path).unwrap();
    let lines: Vec<&str> = report.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("a.xml,converted,0,60,60,"));
    assert!(lines[2].starts_with("b.xml,below_threshold,0,2,2,"));
}
