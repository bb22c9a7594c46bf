//! End-to-end tests of the generation pipeline
//!
//! Declarations go in as YAML, units come out of a sink, and the report and
//! diagnostics are checked against what a batch run promises.

use declgen::format::format_rust;
use declgen::{
    ArtifactKind, Config, DeclarationSource, Diagnostics, EmitError, FileSink, GeneratedArtifact,
    MemorySink, Outcome, OutputSink, Pipeline, Severity,
};
use pretty_assertions::assert_eq;
use std::io;
use std::path::PathBuf;

const SHAPES: &str = include_str!("fixtures/shapes.decl.yaml");

fn source(yaml: &str) -> DeclarationSource {
    DeclarationSource::from_yaml(yaml, Some(PathBuf::from("shapes.decl.yaml"))).unwrap()
}

fn run(config: Config, yaml: &str) -> (declgen::GenerationReport, MemorySink, Diagnostics) {
    let sink = MemorySink::new();
    let diagnostics = Diagnostics::new();
    let report = Pipeline::new(config)
        .run(&[source(yaml)], &sink, &diagnostics)
        .unwrap();
    (report, sink, diagnostics)
}

fn messages(diagnostics: &Diagnostics) -> Vec<String> {
    diagnostics.entries().iter().map(|d| d.message()).collect()
}

#[test]
fn test_shapes_fixture_generates_cleanly() {
    let (report, sink, diagnostics) = run(Config::default(), SHAPES);
    assert!(report.is_success(), "{}", diagnostics.to_report());
    assert!(!diagnostics.has_errors());
    assert_eq!(
        sink.names(),
        vec![
            "counter_builder.rs",
            "counter_converter.rs",
            "counter_subclass.rs",
            "label_subclass.rs",
            "polygon_builder.rs",
            "polygon_converter.rs",
            "polygon_subclass.rs",
        ]
    );
    assert_eq!(report.written_files().len(), 7);
}

const CHECKED_IN: [(&str, &str); 7] = [
    (
        "counter_subclass.rs",
        include_str!("fixtures/generated/counter_subclass.rs"),
    ),
    (
        "counter_builder.rs",
        include_str!("fixtures/generated/counter_builder.rs"),
    ),
    (
        "counter_converter.rs",
        include_str!("fixtures/generated/counter_converter.rs"),
    ),
    (
        "polygon_subclass.rs",
        include_str!("fixtures/generated/polygon_subclass.rs"),
    ),
    (
        "polygon_builder.rs",
        include_str!("fixtures/generated/polygon_builder.rs"),
    ),
    (
        "polygon_converter.rs",
        include_str!("fixtures/generated/polygon_converter.rs"),
    ),
    (
        "label_subclass.rs",
        include_str!("fixtures/generated/label_subclass.rs"),
    ),
];

#[test]
fn test_checked_in_units_match_generator_output() {
    let config = Config {
        provenance: false,
        ..Config::default()
    };
    let (report, sink, _) = run(config, SHAPES);
    assert!(report.is_success());
    assert_eq!(sink.names().len(), CHECKED_IN.len());

    for (name, checked_in) in CHECKED_IN {
        let generated = sink.get(name).unwrap();
        assert_eq!(
            format_rust(&generated).unwrap(),
            format_rust(checked_in).unwrap(),
            "{name} differs from the generator output"
        );
    }
}

#[test]
fn test_derived_fields_are_computed_after_input_contracts() {
    let (_, sink, _) = run(Config::default(), SHAPES);
    let subclass = sink.get("counter_subclass.rs").unwrap();
    let check = subclass.find("value % 2 == 0").unwrap();
    let derive = subclass.find("let double: i64 = value * 2;").unwrap();
    assert!(check < derive);
    assert!(subclass.contains("The value has to be even but was {:?}."));
    assert!(subclass.contains("step: Option<i64>"));
}

#[test]
fn test_builder_reports_every_missing_field() {
    let (_, sink, _) = run(Config::default(), SHAPES);
    let builder = sink.get("polygon_builder.rs").unwrap();
    assert!(builder.contains("missing.push(\"name\");"));
    assert!(builder.contains("missing.push(\"sides\");"));
    assert!(builder.contains("BuildError::missing(\"Polygon\", missing)"));
}

#[test]
fn test_converter_delegates_to_nested_converter() {
    let (_, sink, _) = run(Config::default(), SHAPES);
    let converter = sink.get("polygon_converter.rs").unwrap();
    assert!(converter.contains("CounterConverter::encode"));
    assert!(converter.contains("CounterConverter::decode"));
}

#[test]
fn test_cache_arity_limit_fails_only_that_declaration() {
    let yaml = r#"
declarations:
  - name: Wide
    generate: [subclass]
    members:
      - field: base
        type: i64
    methods:
      - name: sum
        parameters:
          - { name: a, type: i64 }
          - { name: b, type: i64 }
          - { name: c, type: i64 }
          - { name: d, type: i64 }
          - { name: e, type: i64 }
          - { name: f, type: i64 }
          - { name: g, type: i64 }
          - { name: h, type: i64 }
          - { name: i, type: i64 }
        returns: i64
        interceptors: [cached]
        body: "self.base + a + b + c + d + e + f + g + h + i"
  - name: Narrow
    generate: [subclass]
    members:
      - field: base
        type: i64
"#;
    let (report, sink, diagnostics) = run(Config::default(), yaml);
    assert_eq!(report.outcome("Wide").unwrap().outcome, Outcome::Failed);
    assert_eq!(report.outcome("Narrow").unwrap().outcome, Outcome::Generated);
    assert!(messages(&diagnostics)
        .contains(&"Cannot cache more than 8 parameters (method: sum).".to_string()));
    assert_eq!(sink.names(), vec!["narrow_subclass.rs"]);
}

#[test]
fn test_cache_arity_limit_is_configurable() {
    let yaml = r#"
declarations:
  - name: Pair
    generate: [subclass]
    members:
      - field: base
        type: i64
    methods:
      - name: sum
        parameters:
          - { name: a, type: i64 }
          - { name: b, type: i64 }
        returns: i64
        interceptors: [cached]
        body: "self.base + a + b"
"#;
    let config = Config {
        max_cache_arity: 1,
        ..Config::default()
    };
    let (report, _, diagnostics) = run(config, yaml);
    assert_eq!(report.outcome("Pair").unwrap().outcome, Outcome::Failed);
    assert!(messages(&diagnostics)
        .contains(&"Cannot cache more than 1 parameters (method: sum).".to_string()));

    let (report, _, _) = run(Config::default(), yaml);
    assert!(report.is_success());
}

#[test]
fn test_cache_arity_is_capped_whatever_the_config_says() {
    let params: Vec<String> = (0..13).map(|i| format!("p{i}")).collect();
    let mut yaml = String::from(
        "declarations:\n  - name: Huge\n    generate: [subclass]\n    members:\n",
    );
    yaml.push_str("      - field: base\n        type: i64\n");
    yaml.push_str("    methods:\n      - name: sum\n        parameters:\n");
    for param in &params {
        yaml.push_str(&format!("          - {{ name: {param}, type: i64 }}\n"));
    }
    yaml.push_str("        returns: i64\n        interceptors: [cached]\n");
    yaml.push_str(&format!("        body: \"self.base + {}\"\n", params.join(" + ")));

    let config = Config {
        max_cache_arity: 20,
        ..Config::default()
    };
    let (report, _, diagnostics) = run(config, &yaml);
    assert_eq!(report.outcome("Huge").unwrap().outcome, Outcome::Failed);
    assert!(messages(&diagnostics)
        .contains(&"Cannot cache more than 12 parameters (method: sum).".to_string()));
}

#[test]
fn test_converter_field_without_encoding_fails_the_declaration() {
    let yaml = r#"
declarations:
  - name: Ledger
    members:
      - field: total
        type: BigInt
      - field: ids
        type: BTreeSet<u8>
  - name: Tally
    members:
      - field: ids
        type: BTreeSet<u8>
      - field: counts
        type: HashMap<String, u32>
"#;
    let (report, sink, diagnostics) = run(Config::default(), yaml);
    assert_eq!(report.outcome("Ledger").unwrap().outcome, Outcome::Failed);
    assert_eq!(report.outcome("Tally").unwrap().outcome, Outcome::Generated);
    assert_eq!(
        messages(&diagnostics)
            .into_iter()
            .filter(|m| m.contains("cannot be converted"))
            .collect::<Vec<_>>(),
        vec![
            "The field total of type BigInt cannot be converted: BigInt has no structural \
             encoding."
                .to_string()
        ]
    );
    assert_eq!(
        sink.names(),
        vec!["tally_builder.rs", "tally_converter.rs", "tally_subclass.rs"]
    );
    let converter = sink.get("tally_converter.rs").unwrap();
    assert!(converter.contains("reader.leaf::<HashMap<String, u32>>(\"counts\")?"));
}

#[test]
fn test_keyword_member_names_fail_the_declaration() {
    let yaml = r#"
declarations:
  - name: Reserved
    generate: [subclass]
    members:
      - field: type
        type: String
    methods:
      - name: describe
        parameters:
          - { name: self, type: i64 }
        returns: String
        body: "String::new()"
  - name: Plain
    generate: [subclass]
    members:
      - field: kind
        type: String
"#;
    let (report, sink, diagnostics) = run(Config::default(), yaml);
    assert_eq!(report.outcome("Reserved").unwrap().outcome, Outcome::Failed);
    assert_eq!(
        messages(&diagnostics),
        vec![
            "`type` is not a valid identifier".to_string(),
            "`self` is not a valid identifier".to_string(),
        ]
    );
    assert_eq!(sink.names(), vec!["plain_subclass.rs"]);
}

#[test]
fn test_unknown_validator_is_a_declaration_error() {
    let yaml = r#"
declarations:
  - name: Broken
    members:
      - accessor: get_x
        type: i64
        validators: [bogus]
  - name: Fine
    generate: [subclass]
    members:
      - accessor: get_x
        type: i64
"#;
    let (report, sink, diagnostics) = run(Config::default(), yaml);
    assert_eq!(report.outcome("Broken").unwrap().outcome, Outcome::Failed);
    assert!(report.outcome("Broken").unwrap().artifacts.is_empty());
    assert_eq!(sink.names(), vec!["fine_subclass.rs"]);

    let entries = diagnostics.entries();
    let error = entries.iter().find(|d| d.is_error()).unwrap();
    assert_eq!(error.message(), "Unknown validator `bogus`.");
    assert_eq!(error.location.declaration.as_deref(), Some("Broken"));
    assert_eq!(error.location.file, Some(PathBuf::from("shapes.decl.yaml")));
}

#[test]
fn test_inapplicable_validator_is_reported() {
    let yaml = r#"
declarations:
  - name: Named
    generate: [subclass]
    members:
      - accessor: get_name
        type: String
        validators: [even]
"#;
    let (_, _, diagnostics) = run(Config::default(), yaml);
    let entries = diagnostics.entries();
    assert!(entries
        .iter()
        .any(|d| d.severity == Severity::Error
            && d.message().starts_with("The validator even cannot be applied to")));
}

#[test]
fn test_generation_is_deterministic() {
    let (_, first, _) = run(Config::default(), SHAPES);
    let (_, second, _) = run(Config::default(), SHAPES);
    assert_eq!(first.into_files(), second.into_files());
}

#[test]
fn test_parallel_run_matches_sequential_run() {
    let sequential = run(Config::default(), SHAPES);
    let config = Config {
        jobs: 4,
        ..Config::default()
    };
    let parallel = run(config, SHAPES);

    assert_eq!(sequential.0, parallel.0);
    let order: Vec<&str> = parallel
        .0
        .declarations
        .iter()
        .map(|d| d.declaration.as_str())
        .collect();
    assert_eq!(order, vec!["Counter", "Polygon", "Label"]);
    assert_eq!(sequential.1.into_files(), parallel.1.into_files());
}

#[test]
fn test_diagnostics_of_one_declaration_stay_together_in_parallel_runs() {
    let mut yaml = String::from("declarations:\n");
    for i in 0..12 {
        yaml.push_str(&format!("  - name: D{i}\n    generate: [subclass]\n    members:\n"));
        for member in ["a", "b"] {
            yaml.push_str(&format!("      - accessor: get_{member}\n        type: i64\n"));
            yaml.push_str(&format!("        validators: [nope_{member}]\n"));
        }
    }
    let config = Config {
        jobs: 3,
        ..Config::default()
    };
    let (report, _, diagnostics) = run(config, &yaml);
    assert_eq!(report.count(Outcome::Failed), 12);

    let entries = diagnostics.entries();
    assert_eq!(entries.len(), 24);
    for pair in entries.chunks(2) {
        assert_eq!(pair[0].location.declaration, pair[1].location.declaration);
        assert_eq!(pair[0].message(), "Unknown validator `nope_a`.");
        assert_eq!(pair[1].message(), "Unknown validator `nope_b`.");
    }
}

#[test]
fn test_file_sink_writes_units() {
    let temp = tempfile::TempDir::new().unwrap();
    let out = temp.path().join("out");
    let sink = FileSink::new(&out);
    let diagnostics = Diagnostics::new();
    let report = Pipeline::default()
        .run(&[source(SHAPES)], &sink, &diagnostics)
        .unwrap();
    assert!(report.is_success());

    let unit = std::fs::read_to_string(out.join("counter_subclass.rs")).unwrap();
    assert!(unit.starts_with("// Generated by declgen"));
    assert!(unit.contains("// declaration: Counter (subclass)"));
    assert!(unit.contains("pub struct CounterSubclass"));
}

struct RejectingSink {
    inner: MemorySink,
    reject: &'static str,
}

impl OutputSink for RejectingSink {
    fn write(&self, name: &str, contents: &str) -> io::Result<()> {
        if name == self.reject {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"));
        }
        self.inner.write(name, contents)
    }
}

#[test]
fn test_failed_write_leaves_the_declaration_incomplete() {
    let sink = RejectingSink {
        inner: MemorySink::new(),
        reject: "counter_builder.rs",
    };
    let diagnostics = Diagnostics::new();
    let report = Pipeline::default()
        .run(&[source(SHAPES)], &sink, &diagnostics)
        .unwrap();

    let counter = report.outcome("Counter").unwrap();
    assert_eq!(counter.outcome, Outcome::Incomplete);
    let written: Vec<(ArtifactKind, bool)> = counter
        .artifacts
        .iter()
        .map(|a| (a.kind, a.written))
        .collect();
    assert_eq!(
        written,
        vec![
            (ArtifactKind::Subclass, true),
            (ArtifactKind::Builder, false),
            (ArtifactKind::Converter, true),
        ]
    );
    assert_eq!(report.outcome("Polygon").unwrap().outcome, Outcome::Generated);
    assert_eq!(diagnostics.error_count(), 1);
    assert!(messages(&diagnostics)[0].starts_with("The CounterBuilder could not be written"));
}

#[test]
fn test_writing_an_artifact_twice_is_fatal() {
    let sink = MemorySink::new();
    let mut artifact = GeneratedArtifact::new(
        ArtifactKind::Subclass,
        "Point",
        "PointSubclass".to_string(),
        "point_subclass.rs".to_string(),
    );
    artifact.populate("pub struct PointSubclass;".to_string()).unwrap();
    artifact.write(&sink).unwrap();

    let err = artifact.write(&sink).unwrap_err();
    assert!(matches!(err, EmitError::AlreadyWritten(_)));
    assert!(err.is_fatal());
    assert_eq!(sink.names(), vec!["point_subclass.rs"]);
}
