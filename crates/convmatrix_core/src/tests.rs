use super::*;
use std::cell::RefCell;
use std::fs;

/// Answers from a fixed diagnostic stream instead of running a compiler.
struct RecordedProbe {
    stderr: String,
    seen: RefCell<Option<String>>,
}

impl RecordedProbe {
    fn new(stderr: impl Into<String>) -> Self {
        Self {
            stderr: stderr.into(),
            seen: RefCell::new(None),
        }
    }
}

impl ConversionProbe for RecordedProbe {
    fn rejected_pairs(
        &self,
        program: &GeneratedProgram,
        catalog: &Catalog,
    ) -> Result<FailureSet, PipelineError> {
        *self.seen.borrow_mut() = Some(program.source.text().to_string());
        Ok(diagnostics::extract_failures(
            &self.stderr,
            &DiagnosticPattern::pinned(),
            catalog,
        )?)
    }
}

#[test]
fn pipeline_writes_source_then_classifies() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("output").join("conversions.go");
    let catalog = Catalog::new(["int", "string", "bool"]).unwrap();
    let probe = RecordedProbe::new(
        "# command-line-arguments\n\
         output/conversions.go:12:8: cannot convert p.string (variable of type string) to type int\n\
         output/conversions.go:13:8: cannot convert p.int (variable of type int) to type bool\n",
    );

    let pipeline = Pipeline::new(catalog, &path, probe);
    let outcome = pipeline.run().expect("pipeline run");

    let written = fs::read_to_string(&path).unwrap();
    assert_eq!(written, outcome.program.source.text());
    assert_eq!(
        pipeline.probe().seen.borrow().as_deref(),
        Some(written.as_str())
    );

    assert_eq!(outcome.failures.len(), 2);
    assert_eq!(outcome.matrix.is_convertible("int", "string"), Some(true));
    assert_eq!(outcome.matrix.is_convertible("string", "int"), Some(false));
    assert_eq!(outcome.matrix.is_convertible("int", "bool"), Some(false));
    assert_eq!(outcome.matrix.is_convertible("bool", "bool"), Some(true));
    assert_eq!(outcome.matrix.rejected_count(), 2);
}

#[test]
fn pipeline_surfaces_extraction_stage() {
    let dir = tempfile::tempdir().unwrap();
    let probe = RecordedProbe::new("x.go:1:1: cannot convert something odd\n");
    let pipeline = Pipeline::new(Catalog::go_primitives(), dir.path().join("c.go"), probe);

    let error = pipeline.run().expect_err("malformed line");
    assert_eq!(error.stage(), "extraction");
    assert!(error.to_string().starts_with("extracting conversion failures failed"));
}

#[test]
fn pipeline_surfaces_synthesis_stage() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    fs::write(&blocker, "file").unwrap();

    let pipeline = Pipeline::new(
        Catalog::go_primitives(),
        blocker.join("conversions.go"),
        RecordedProbe::new(""),
    );
    let error = pipeline.run().expect_err("parent is a file");
    assert_eq!(error.stage(), "synthesis");
}

#[test]
fn synthesizer_for_loads_template() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("conversions.tmpl");
    fs::write(
        &template,
        "// {{generator}}\npackage main\n\nvar p struct {\n{{fields}}}\n\nfunc main() {\n{{conversions}}}\n",
    )
    .unwrap();

    let config = ProbeConfig {
        template_path: Some(template),
        catalog: Catalog::new(["int"]).unwrap(),
        ..ProbeConfig::default()
    };
    let source = synthesizer_for(&config).unwrap().render(&config.catalog);
    assert!(source.text().starts_with("// convmatrix\npackage main"));
}

#[test]
fn go_build_probe_from_config_rejects_bad_override() {
    let config = ProbeConfig {
        go_path: Some(PathBuf::from("/non/existent/go")),
        ..ProbeConfig::default()
    };
    assert!(matches!(
        GoBuildProbe::from_config(&config),
        Err(HarvestError::InvalidOverride { .. })
    ));
}
