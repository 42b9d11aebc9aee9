use std::path::{Path, PathBuf};

use pixi_conda::{
    EnvironmentsFile, PrefixStore, Registry, RegistryError, StoreError, UnregisterOutcome,
};
use pixi_consts::consts;
use rstest::{fixture, rstest};
use tempfile::TempDir;

fn touch(path: &Path) {
    fs_err::create_dir_all(path.parent().unwrap()).unwrap();
    fs_err::write(path, "").unwrap();
}

struct Workspace {
    dir: TempDir,
    registry: Registry,
}

impl Workspace {
    fn environments_file(&self) -> PathBuf {
        self.dir.path().join(".conda").join(consts::ENVIRONMENTS_TXT)
    }

    fn count(&self) -> usize {
        self.registry.list_all_known_prefixes().unwrap().len()
    }
}

#[fixture]
fn workspace() -> Workspace {
    let dir = tempfile::tempdir().unwrap();
    let registry = Registry::new(
        dir.path().join("envs"),
        EnvironmentsFile::new(dir.path().join(".conda").join(consts::ENVIRONMENTS_TXT)),
    );
    Workspace { dir, registry }
}

/// Registers two pre-existing environments so the scenario does not start
/// from an empty registry.
fn seed(workspace: &Workspace) -> usize {
    for name in ["base", "py312"] {
        let prefix = workspace.dir.path().join("existing").join(name);
        touch(
            &prefix
                .join(consts::CONDA_META_DIR)
                .join(consts::CONDA_HISTORY_FILE),
        );
        workspace.registry.register_env(&prefix).unwrap();
    }
    workspace.count()
}

#[rstest]
fn test_register_unregister_lifecycle(workspace: Workspace) {
    let n = seed(&workspace);
    assert_eq!(n, 2);

    // A prefix without any metadata is pruned on the next listing.
    let missing = workspace.dir.path().join("some").join("env");
    workspace.registry.register_env(&missing).unwrap();
    assert_eq!(workspace.count(), n);

    // A prefix with only the history file can be registered and unregistered.
    let prefix = workspace
        .dir
        .path()
        .join("some_test_folder")
        .join("other_env");
    let meta_dir = prefix.join(consts::CONDA_META_DIR);
    touch(&meta_dir.join(consts::CONDA_HISTORY_FILE));

    workspace.registry.register_env(&prefix).unwrap();
    assert_eq!(workspace.count(), n + 1);

    workspace.registry.unregister_env(&prefix).unwrap();
    assert_eq!(workspace.count(), n);

    // Any other file in conda-meta pins the environment.
    touch(&meta_dir.join("other_file"));

    workspace.registry.register_env(&prefix).unwrap();
    assert_eq!(workspace.count(), n + 1);

    assert_eq!(
        workspace.registry.unregister_env(&prefix).unwrap(),
        UnregisterOutcome::Pinned
    );
    assert_eq!(workspace.count(), n + 1);
}

#[rstest]
fn test_listing_rewrites_the_file(workspace: Workspace) {
    let n = seed(&workspace);
    let stale = workspace.dir.path().join("stale");
    workspace.registry.register_env(&stale).unwrap();

    let contents = fs_err::read_to_string(workspace.environments_file()).unwrap();
    assert_eq!(contents.lines().count(), n + 1);

    // Listing is expected to drop the stale entry from the file itself, not
    // just from the returned list.
    workspace.registry.list_all_known_prefixes().unwrap();
    let contents = fs_err::read_to_string(workspace.environments_file()).unwrap();
    assert_eq!(contents.lines().count(), n);
    assert!(!contents.contains("stale"));
}

#[rstest]
fn test_registering_twice_is_idempotent(workspace: Workspace) {
    let prefix = workspace.dir.path().join("env");
    touch(
        &prefix
            .join(consts::CONDA_META_DIR)
            .join(consts::CONDA_HISTORY_FILE),
    );

    workspace.registry.register_env(&prefix).unwrap();
    let once = workspace.registry.list_all_known_prefixes().unwrap();
    workspace.registry.register_env(&prefix).unwrap();
    let twice = workspace.registry.list_all_known_prefixes().unwrap();

    assert_eq!(once, twice);
    assert_eq!(workspace.registry.store().load().unwrap().len(), 1);
}

#[rstest]
fn test_registry_survives_reopening(workspace: Workspace) {
    let prefix = workspace.dir.path().join("env");
    touch(
        &prefix
            .join(consts::CONDA_META_DIR)
            .join(consts::CONDA_HISTORY_FILE),
    );
    workspace.registry.register_env(&prefix).unwrap();

    let reopened = Registry::new(
        workspace.dir.path().join("envs"),
        EnvironmentsFile::new(workspace.environments_file()),
    );
    assert_eq!(reopened.list_all_known_prefixes().unwrap(), vec![prefix]);
}

#[cfg(unix)]
#[rstest]
fn test_reads_files_written_by_other_tools(workspace: Workspace) {
    let prefix = workspace.dir.path().join("env");
    touch(
        &prefix
            .join(consts::CONDA_META_DIR)
            .join(consts::CONDA_HISTORY_FILE),
    );
    touch(&workspace.environments_file());
    fs_err::write(
        workspace.environments_file(),
        format!("\n{0}/\n  {0}\n", prefix.display()),
    )
    .unwrap();

    assert_eq!(
        workspace.registry.list_all_known_prefixes().unwrap(),
        vec![prefix.clone()]
    );
    assert_eq!(
        fs_err::read_to_string(workspace.environments_file()).unwrap(),
        format!("{}\n", prefix.display())
    );
}

#[cfg(target_os = "linux")]
#[rstest]
fn test_non_utf8_prefix_stays_registered(workspace: Workspace) {
    use std::{ffi::OsStr, os::unix::ffi::OsStrExt};

    let mut name = b"env-".to_vec();
    name.push(0xff);
    let prefix = workspace.dir.path().join(OsStr::from_bytes(&name));
    touch(
        &prefix
            .join(consts::CONDA_META_DIR)
            .join(consts::CONDA_HISTORY_FILE),
    );

    workspace.registry.register_env(&prefix).unwrap();
    assert_eq!(
        workspace.registry.list_all_known_prefixes().unwrap(),
        vec![prefix.clone()]
    );

    let contents = fs_err::read(workspace.environments_file()).unwrap();
    let mut expected = prefix.as_os_str().as_bytes().to_vec();
    expected.push(b'\n');
    assert_eq!(contents, expected);
}

#[cfg(unix)]
#[rstest]
fn test_foreign_undecodable_entry_is_not_fatal(workspace: Workspace) {
    let prefix = workspace.dir.path().join("env");
    touch(
        &prefix
            .join(consts::CONDA_META_DIR)
            .join(consts::CONDA_HISTORY_FILE),
    );
    touch(&workspace.environments_file());

    let mut contents = format!("{}\n", prefix.display()).into_bytes();
    contents.extend_from_slice(b"/opt/\xff\n");
    fs_err::write(workspace.environments_file(), contents).unwrap();

    // The undecodable entry is not an environment and gets pruned.
    assert_eq!(
        workspace.registry.list_all_known_prefixes().unwrap(),
        vec![prefix.clone()]
    );
    assert_eq!(
        fs_err::read(workspace.environments_file()).unwrap(),
        format!("{}\n", prefix.display()).into_bytes()
    );
}

#[cfg(unix)]
#[rstest]
fn test_unreadable_store_is_an_error(workspace: Workspace) {
    fs_err::create_dir_all(workspace.environments_file()).unwrap();

    assert!(matches!(
        workspace.registry.list_all_known_prefixes(),
        Err(RegistryError::Store(StoreError::Read { .. }))
    ));
    assert!(matches!(
        workspace.registry.register_env(&workspace.dir.path().join("env")),
        Err(RegistryError::Store(StoreError::Read { .. }))
    ));
}

#[cfg(unix)]
#[rstest]
fn test_unreadable_metadata_blocks_unregister(workspace: Workspace) {
    let prefix = workspace.dir.path().join("env");
    touch(&prefix.join(consts::CONDA_META_DIR));
    workspace.registry.register_env(&prefix).unwrap();

    assert_eq!(
        workspace.registry.unregister_env(&prefix).unwrap(),
        UnregisterOutcome::Pinned
    );
    assert!(workspace.registry.store().load().unwrap().contains(&prefix));
}

#[rstest]
fn test_listing_fresh_registry_leaves_no_trace(workspace: Workspace) {
    assert!(workspace.registry.list_all_known_prefixes().unwrap().is_empty());
    assert!(!workspace.dir.path().join(".conda").exists());
}
