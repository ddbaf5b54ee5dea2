//! Integration tests for configuration aggregation
//!
//! Exercise rescan over real temporary workspaces: origin discovery,
//! folder expansion, error isolation, and the merged mapping.

use foldersync::config::CONFIG_FILE_NAME;
use foldersync::scan;
use foldersync::tree::SyncTree;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_config(root: &Path, body: &str) {
    fs::write(root.join(CONFIG_FILE_NAME), body).unwrap();
}

#[tokio::test]
async fn test_rescan_expands_config_folder_pairs() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::create_dir_all(root.join("src/nested")).unwrap();
    fs::create_dir_all(root.join("dst")).unwrap();
    fs::write(root.join("src/f.txt"), "x").unwrap();
    fs::write(root.join("src/nested/g.txt"), "y").unwrap();
    write_config(root, r#"{ "folders": [["src", "dst"]] }"#);

    let scan = scan::rescan(None, &[root.to_path_buf()]).await;

    // Two relative paths, both one-sided, tracked in both directions
    assert_eq!(scan.mapping.len(), 4);
    assert_eq!(
        scan.mapping.counterpart(&root.join("src/f.txt")),
        Some(root.join("dst/f.txt").as_path())
    );
    assert_eq!(
        scan.mapping.counterpart(&root.join("src/nested/g.txt")),
        Some(root.join("dst/nested/g.txt").as_path())
    );
}

#[tokio::test]
async fn test_rescan_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::create_dir_all(root.join("a")).unwrap();
    fs::create_dir_all(root.join("b")).unwrap();
    fs::write(root.join("a/one.txt"), "1").unwrap();
    fs::write(root.join("b/two.txt"), "2").unwrap();
    write_config(root, r#"{ "folders": [["a", "b"]] }"#);

    let first = scan::rescan(None, &[root.to_path_buf()]).await;
    let second = scan::rescan(None, &[root.to_path_buf()]).await;

    assert_eq!(first.mapping.logical_pairs(), second.mapping.logical_pairs());
}

#[tokio::test]
async fn test_mapping_symmetry_invariant() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::create_dir_all(root.join("left")).unwrap();
    fs::create_dir_all(root.join("right")).unwrap();
    fs::write(root.join("left/a.txt"), "a").unwrap();
    fs::write(root.join("right/b.txt"), "b").unwrap();
    write_config(
        root,
        r#"{ "folders": [["left", "right"]], "files": [["left/a.txt", "elsewhere.txt"]] }"#,
    );

    let scan = scan::rescan(None, &[root.to_path_buf()]).await;

    assert!(!scan.mapping.is_empty());
    for (key, value) in scan.mapping.iter() {
        assert_eq!(
            scan.mapping.counterpart(value),
            Some(key.as_path()),
            "mapping must stay symmetric for {} -> {}",
            key.display(),
            value.display()
        );
    }
}

#[tokio::test]
async fn test_malformed_config_is_skipped_not_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let bad_root = temp_dir.path().join("bad");
    let good_root = temp_dir.path().join("good");
    fs::create_dir_all(bad_root.join("x")).unwrap();
    fs::create_dir_all(good_root.join("a")).unwrap();
    fs::create_dir_all(good_root.join("b")).unwrap();
    fs::write(good_root.join("a/f.txt"), "f").unwrap();

    write_config(&bad_root, "{ not json");
    write_config(&good_root, r#"{ "folders": [["a", "b"]] }"#);

    let scan = scan::rescan(None, &[bad_root.clone(), good_root.clone()]).await;

    assert_eq!(
        scan.mapping.counterpart(&good_root.join("a/f.txt")),
        Some(good_root.join("b/f.txt").as_path())
    );
    assert_eq!(scan.mapping.len(), 2);
}

#[tokio::test]
async fn test_config_missing_folders_array_is_skipped() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_config(root, r#"{ "files": [["a.txt", "b.txt"]] }"#);

    let scan = scan::rescan(None, &[root.to_path_buf()]).await;

    assert!(scan.mapping.is_empty());
}

#[tokio::test]
async fn test_missing_folder_produces_error_node() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::create_dir_all(root.join("present")).unwrap();
    write_config(root, r#"{ "folders": [["present", "absent"]] }"#);

    let scan = scan::rescan(None, &[root.to_path_buf()]).await;

    assert!(scan.mapping.is_empty());
    let error_nodes = count_error_nodes(&scan.tree);
    assert_eq!(error_nodes, 1);
}

#[tokio::test]
async fn test_workspace_settings_origin() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::create_dir_all(root.join("wsa")).unwrap();
    fs::create_dir_all(root.join("wsb")).unwrap();
    fs::write(root.join("wsa/doc.md"), "doc").unwrap();

    let workspace_path = root.join("team.code-workspace");
    fs::write(
        &workspace_path,
        r#"{ "settings": { "foldersync.folders": [["wsa", "wsb"]] } }"#,
    )
    .unwrap();

    let scan = scan::rescan(Some(&workspace_path), &[root.to_path_buf()]).await;

    assert_eq!(
        scan.mapping.counterpart(&root.join("wsa/doc.md")),
        Some(root.join("wsb/doc.md").as_path())
    );
    // Workspace origin renders under its own container
    assert!(scan.tree.iter().any(|node| node.name() == "from workspace"));
}

#[tokio::test]
async fn test_config_file_origin_overwrites_workspace_origin() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::create_dir_all(root.join("shared")).unwrap();
    fs::create_dir_all(root.join("ws-dst")).unwrap();
    fs::create_dir_all(root.join("cfg-dst")).unwrap();
    fs::write(root.join("shared/f.txt"), "f").unwrap();

    let workspace_path = root.join("team.code-workspace");
    fs::write(
        &workspace_path,
        r#"{ "settings": { "foldersync.folders": [["shared", "ws-dst"]] } }"#,
    )
    .unwrap();
    write_config(root, r#"{ "folders": [["shared", "cfg-dst"]] }"#);

    let scan = scan::rescan(Some(&workspace_path), &[root.to_path_buf()]).await;

    // Config files are read after workspace settings; last write wins
    assert_eq!(
        scan.mapping.counterpart(&root.join("shared/f.txt")),
        Some(root.join("cfg-dst/f.txt").as_path())
    );
}

#[tokio::test]
async fn test_tree_groups_origins_and_folders() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::create_dir_all(root.join("a")).unwrap();
    fs::create_dir_all(root.join("b")).unwrap();
    fs::write(root.join("a/f.txt"), "f").unwrap();
    write_config(root, r#"{ "folders": [["a", "b"]] }"#);

    let scan = scan::rescan(None, &[root.to_path_buf()]).await;

    let config_container = scan
        .tree
        .iter()
        .find(|node| node.name() == "from config files")
        .expect("config files container");
    let per_file = &config_container.children()[0];
    assert!(per_file.name().starts_with("from config file: "));

    let folder = &per_file.children()[0];
    assert!(matches!(folder, SyncTree::Folder { .. }));
    assert_eq!(folder.children()[0].name(), "f.txt <-> f.txt");
}

#[tokio::test]
async fn test_empty_folder_pair_gets_placeholder_node() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::create_dir_all(root.join("a")).unwrap();
    fs::create_dir_all(root.join("b")).unwrap();
    write_config(root, r#"{ "folders": [["a", "b"]] }"#);

    let scan = scan::rescan(None, &[root.to_path_buf()]).await;

    let config_container = scan
        .tree
        .iter()
        .find(|node| node.name() == "from config files")
        .expect("config files container");
    let folder = &config_container.children()[0].children()[0];
    assert_eq!(folder.children()[0].name(), "(empty)");
}

fn count_error_nodes(nodes: &[SyncTree]) -> usize {
    nodes
        .iter()
        .map(|node| usize::from(node.is_error()) + count_error_nodes(node.children()))
        .sum()
}
