//! Integration tests for helper resolution and the project index.

use std::path::PathBuf;

use pyslice::{ExtractOptions, Extraction, Extractor, Helper, ProjectIndex, WalkOptions};

fn project_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("testdata")
        .join("project")
}

fn options(aggressive: bool) -> ExtractOptions {
    ExtractOptions {
        include_helpers: true,
        aggressive,
        ..Default::default()
    }
}

fn run(rel: &str, name: &str, aggressive: bool) -> Extraction {
    let root = project_root();
    Extractor::default()
        .extract(&root.join(rel), name, &root, options(aggressive))
        .expect("extraction should succeed")
}

fn helpers(rel: &str, name: &str, aggressive: bool) -> Vec<String> {
    run(rel, name, aggressive)
        .helpers
        .iter()
        .map(|h| h.name().to_string())
        .collect()
}

#[test]
fn test_helpers_are_plain_paths_without_detailed() {
    let out = run("pkg/a.py", "outer", false);
    assert!(out.helpers.iter().all(|h| matches!(h, Helper::Path(_))));
}

#[test]
fn test_parameters_shadow_imports() {
    // `slugify` and `u` are both imported and both parameters.
    assert!(helpers("pkg/a.py", "shadowed", false).is_empty());
    assert!(helpers("pkg/a.py", "shadowed", true).is_empty());
}

#[test]
fn test_same_file_definition_wins() {
    assert_eq!(helpers("pkg/a.py", "prefers_local", false), vec!["pkg.a.helper"]);
    // Proven calls never pick up same-name functions elsewhere.
    assert_eq!(helpers("pkg/a.py", "prefers_local", true), vec!["pkg.a.helper"]);
}

#[test]
fn test_module_alias_and_relative_from_import() {
    assert_eq!(helpers("pkg/a.py", "via_alias", false), vec!["pkg.util.slugify"]);
    assert_eq!(helpers("pkg/a.py", "via_from", false), vec!["pkg.util.slugify"]);
}

#[test]
fn test_parent_relative_import() {
    assert_eq!(helpers("pkg/sub/deep.py", "clean", false), vec!["pkg.util.slugify"]);
}

#[test]
fn test_relative_import_above_root_is_dropped() {
    assert!(helpers("pkg/sub/deep.py", "far", false).is_empty());
    // No project function is named `nowhere`.
    assert!(helpers("pkg/sub/deep.py", "far", true).is_empty());
}

#[test]
fn test_reexport_dotted_import_and_alias() {
    assert_eq!(
        helpers("app/main.py", "run", false),
        vec!["pkg.b.helper", "pkg.impl.exported", "pkg.util.slugify"]
    );
}

#[test]
fn test_aggressive_fallback_adds_same_name_matches() {
    // `helper()` is unbound in app/main.py. The vendored copy under venv/
    // is never indexed.
    assert_eq!(
        helpers("app/main.py", "run", true),
        vec![
            "pkg.a.helper",
            "pkg.b.helper",
            "pkg.impl.exported",
            "pkg.util.helper",
            "pkg.util.slugify"
        ]
    );
}

#[test]
fn test_aggressive_fallback_never_returns_the_target() {
    let root = project_root();
    for (rel, name, own) in [
        ("pkg/cycle.py", "ping", "pkg.cycle.ping"),
        ("pkg/b.py", "helper", "pkg.b.helper"),
        ("pkg/a.py", "outer", "pkg.a.outer"),
    ] {
        for aggressive in [false, true] {
            let out = Extractor::default()
                .extract(&root.join(rel), name, &root, options(aggressive))
                .unwrap();
            assert!(
                out.helpers.iter().all(|h| h.name() != own),
                "{own} listed itself"
            );
        }
    }
}

#[test]
fn test_index_skips_excluded_dirs_and_broken_files() {
    let root = project_root();
    let index = ProjectIndex::build(&root, &WalkOptions::default());

    assert_eq!(index.files_indexed(), 10);
    assert_eq!(index.diagnostics().len(), 1);
    assert!(index.diagnostics()[0].path.ends_with("pkg/broken.py"));

    assert!(index.contains("pkg.a.outer"));
    assert!(index.contains("pkg.sub.deep.clean"));
    assert!(index.contains("app.main.run"));
    // Methods are not top-level functions.
    assert!(!index.contains("pkg.widgets.slug"));
    assert!(index.qualified_names().all(|q| !q.starts_with("venv")));
    assert_eq!(index.by_name("helper").len(), 3);
}

#[test]
fn test_index_follows_package_reexport() {
    let index = ProjectIndex::build(&project_root(), &WalkOptions::default());
    let found = index.follow("pkg.exported").expect("re-export should resolve");
    assert_eq!(found.qualified_name(), "pkg.impl.exported");
    assert!(index.lookup("pkg.exported").is_none());
}

#[test]
fn test_custom_exclusions() {
    let walk = WalkOptions::new(&["app".to_string()], &["**/cycle.py".to_string()]).unwrap();
    let index = ProjectIndex::build(&project_root(), &walk);

    assert_eq!(index.files_indexed(), 8);
    assert!(!index.contains("app.main.run"));
    assert!(!index.contains("pkg.cycle.ping"));
}
