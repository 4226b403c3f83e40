mod common;

use runtime::{Capability, Engine, ErrorKind, Value};
use std::path::Path;
use tempfile::TempDir;

fn write(dir: &Path, name: &str, source: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, source).unwrap();
    format!("{:?}", path.display().to_string())
}

fn reader() -> Engine {
    Engine::builder().grant(Capability::FileRead).build()
}

#[test]
fn test_import_binds_exported_names() {
    common::init_tracing();
    let dir = TempDir::new().unwrap();
    let path = write(
        dir.path(),
        "geometry.aether",
        r#"
PI = 3
Func square(x) { x * x }
Func area(r) { PI * square(r) }
Export PI
Export area
"#,
    );

    let mut engine = reader();
    let value = engine
        .eval(&format!("Import area, PI As pi From {path}\n[area(2), pi]"))
        .unwrap();
    assert_eq!(value.to_string(), "[12, 3]");

    // Module globals stay inside the module.
    assert_eq!(engine.global("square"), None);
    assert_eq!(engine.global("PI"), None);
}

#[test]
fn test_extension_is_optional() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "util.aether", "Func twice(x) { x * 2 }\nExport twice");
    let spec = format!("{:?}", dir.path().join("util").display().to_string());

    let mut engine = reader();
    let value = engine
        .eval(&format!("Import twice From {spec}\ntwice(21)"))
        .unwrap();
    assert_eq!(value, Value::from(42.0));
}

#[test]
fn test_import_requires_file_read() {
    let dir = TempDir::new().unwrap();
    let path = write(dir.path(), "m.aether", "x = 1\nExport x");

    let mut engine = Engine::new();
    let err = engine.eval(&format!("Import x From {path}")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    assert_eq!(err.missing_capability(), Some(Capability::FileRead));
    assert!(err.to_string().starts_with("Import requires capability FileRead (scope: "));
}

#[test]
fn test_module_runs_once_per_engine() {
    let dir = TempDir::new().unwrap();
    let path = write(dir.path(), "noisy.aether", "TRACE(\"loaded\")\nv = 7\nExport v");

    let mut engine = reader();
    engine.eval(&format!("Import v From {path}")).unwrap();
    engine
        .eval(&format!("Import v As w From {path}\nw"))
        .unwrap();
    assert_eq!(engine.take_trace(), vec!["loaded"]);

    // Dropping bindings forgets loaded modules too.
    engine.reset();
    engine.eval(&format!("Import v From {path}")).unwrap();
    assert_eq!(engine.take_trace(), vec!["loaded"]);
}

#[test]
fn test_nested_imports_resolve_from_module_directory() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir(dir.path().join("lib")).unwrap();
    write(&dir.path().join("lib"), "base.aether", "one = 1\nExport one");
    let top = write(
        &dir.path().join("lib"),
        "top.aether",
        "Import one From \"base\"\ntwo = one + 1\nExport two",
    );

    let mut engine = reader();
    let value = engine.eval(&format!("Import two From {top}\ntwo")).unwrap();
    assert_eq!(value, Value::from(2.0));
}

#[test]
fn test_import_errors() {
    let dir = TempDir::new().unwrap();
    let private = write(dir.path(), "private.aether", "hidden = 1");
    let broken = write(dir.path(), "broken.aether", "x = (");
    let failing = write(dir.path(), "failing.aether", "1 / 0");
    let a = write(dir.path(), "a.aether", "Import b From \"b\"\nb = 1\nExport b");
    write(dir.path(), "b.aether", "Import b From \"a\"\nExport b");
    let missing = format!("{:?}", dir.path().join("nope.aether").display().to_string());

    let mut engine = reader();
    let cases = [
        (format!("Import hidden From {private}"), "is not exported by"),
        (format!("Import x From {broken}"), "import failed: in '"),
        (format!("Import b From {a}"), "circular import of"),
        (format!("Import x From {missing}"), "cannot open module"),
        (r#"Import x From "http://example.com/m""#.to_string(), "invalid module path"),
        ("Export y".to_string(), "import failed: Export outside of a module"),
    ];
    for (source, fragment) in cases {
        let err = engine.eval(&source).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Runtime, "{source}");
        assert!(err.to_string().contains(fragment), "{source}: {err}");
    }

    // Errors raised by module code keep their own message.
    let err = engine.eval(&format!("Import x From {failing}")).unwrap_err();
    assert_eq!(err.to_string(), "division by zero");

    // A failed load leaves the importer's bindings intact.
    engine.eval("kept = 1").unwrap();
    assert!(engine.eval(&format!("Import x From {failing}")).is_err());
    assert_eq!(engine.eval("kept").unwrap(), Value::from(1.0));
}
