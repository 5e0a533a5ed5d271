//! Integration tests for TOML manifests

use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use viewsmith::{args, Args, Configurator, Error, Manifest, Value};

const SITE: &str = "tests/fixtures/site/viewsmith.toml";

fn load_site() -> Configurator<Args> {
    let manifest = Manifest::from_file(Path::new(SITE)).expect("Should load manifest");
    let mut views = Configurator::new();
    manifest.apply(&mut views).expect("Should register methods");
    views
}

#[test]
fn test_manifest_registers_all_methods() {
    let views = load_site();
    assert_eq!(
        views.method_names().collect::<Vec<_>>(),
        vec!["badge", "layout", "page"]
    );
    assert_eq!(views.contract("page").unwrap().describe(), r#"(heading, lead = "")"#);
}

#[test]
fn test_page_renders_inside_layout() {
    let views = load_site();
    let out = views
        .call(&Args::new(), "page", args! { "heading" => "Hi", "lead" => "Welcome" })
        .unwrap();
    assert_eq!(
        out,
        "<title>Viewsmith</title>\n<body><h1>Hi</h1><p class=\"lead\">Welcome</p></body>\n"
    );
}

#[test]
fn test_inline_method_reads_arguments() {
    let views = load_site();
    let user = Value::Map(args! { "name" => "Ann" });
    assert_eq!(
        views.call(&Args::new(), "badge", args! { "user" => user }).unwrap(),
        r#"<span class="badge">Ann</span>"#
    );
}

#[test]
fn test_manifest_validation_errors_surface() {
    let views = load_site();
    let err = views.call(&Args::new(), "page", args!()).unwrap_err();
    assert_eq!(err.to_string(), "missing keywords: heading");
}

#[test]
fn test_manifest_without_cache_rereads_templates() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("views.toml"),
        "cache = false\n\n[methods.note]\ntemplate = \"note.erb\"\n",
    )
    .unwrap();
    fs::write(dir.path().join("note.erb"), "v1").unwrap();

    let manifest = Manifest::from_file(&dir.path().join("views.toml")).unwrap();
    let mut views: Configurator<()> = Configurator::new();
    manifest.apply(&mut views).unwrap();
    assert_eq!(views.call(&(), "note", args!()).unwrap(), "v1");

    fs::write(dir.path().join("note.erb"), "v2").unwrap();
    assert_eq!(views.call(&(), "note", args!()).unwrap(), "v2");
}

#[test]
fn test_manifest_missing_template() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("views.toml"),
        "[methods.note]\ntemplate = \"absent.slim\"\n",
    )
    .unwrap();

    let manifest = Manifest::from_file(&dir.path().join("views.toml")).unwrap();
    let mut views: Configurator<()> = Configurator::new();
    let err = manifest.apply(&mut views).unwrap_err();
    assert!(matches!(err, Error::Io { path, .. } if path.ends_with("absent.slim")));
}

#[test]
fn test_scope_values_from_toml() {
    let scope: Args = toml::from_str("site = \"docs\"").unwrap();
    let manifest = Manifest::from_str("[methods.footer]\ninline = { erb = \"(c) <%= site %>\" }").unwrap();
    let mut views: Configurator<Args> = Configurator::new();
    manifest.apply(&mut views).unwrap();
    assert_eq!(views.call(&scope, "footer", args!()).unwrap(), "(c) docs");
}
