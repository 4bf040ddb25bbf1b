//! End-to-end runs: patch the host units, execute them, and check the cache.

use std::path::Path;

use stasis_cache::{ActiveComponent, CacheSettings, CommitOutcome, ComponentSnapshot, Stage};
use stasis_common::Role;
use stasis_host::Lifecycle;
use stasis_patch::hooks::{
    HEADLESS_METHOD, HEADLESS_UNIT, INTERACTIVE_METHOD, INTERACTIVE_UNIT, LOADER_METHOD,
    LOADER_UNIT,
};
use stasis_unit::{decode, encode, CompiledMethod, CompiledUnit, Instruction};

fn op(code: u8) -> Instruction {
    Instruction::opaque(code, vec![code])
}

fn components(pairs: &[(&str, &str)]) -> Vec<ActiveComponent> {
    pairs
        .iter()
        .map(|(id, v)| ActiveComponent::new(*id, *v))
        .collect()
}

fn host_unit(name: &str, method: &str) -> Vec<u8> {
    encode(&CompiledUnit::new(
        name,
        vec![
            CompiledMethod::new("<init>", vec![op(0x2a), Instruction::Return]),
            CompiledMethod::new(
                method,
                vec![
                    op(0x10),
                    op(0x99),
                    Instruction::call("host/Log.info"),
                    op(0x11),
                    Instruction::Return,
                ],
            ),
        ],
    ))
    .unwrap()
}

/// Runs `method` of a transformed unit, forwarding hook calls to the lifecycle.
fn execute(lc: &mut Lifecycle<Vec<ActiveComponent>>, unit_name: &str, method: &str, original: &[u8]) {
    let bytes = lc.transform(unit_name, original).into_owned();
    let unit = decode(&bytes).unwrap();
    let id = unit.find_methods(method)[0];
    for insn in &unit.method(id).unwrap().instructions {
        match insn {
            Instruction::Return => return,
            Instruction::Call { target } => {
                lc.dispatch_call(target);
            }
            Instruction::Opaque { .. } => {}
        }
    }
}

fn seed(settings: &CacheSettings, pairs: &[(&str, &str)]) -> Vec<u8> {
    std::fs::create_dir_all(&settings.cache_dir).unwrap();
    let bytes = ComponentSnapshot::capture(&components(pairs))
        .to_bytes()
        .unwrap();
    std::fs::write(&settings.cache_file, &bytes).unwrap();
    bytes
}

fn settings(root: &Path) -> CacheSettings {
    CacheSettings::new(root.join("caches"))
}

fn load(settings: &CacheSettings) -> ComponentSnapshot {
    ComponentSnapshot::load(&settings.cache_file).unwrap()
}

#[test]
fn scenario_a_identical_run_is_consistent_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path());
    let before = seed(&settings, &[("core", "1.0"), ("addon", "2.1")]);

    let mut lc = Lifecycle::new(
        components(&[("addon", "2.1"), ("core", "1.0")]),
        Role::Interactive,
        settings.clone(),
    );
    execute(&mut lc, LOADER_UNIT, LOADER_METHOD, &host_unit(LOADER_UNIT, LOADER_METHOD));

    let session = lc.session().unwrap();
    assert!(session.is_consistent());
    assert!(session.temp_cache_file().is_none());

    assert_eq!(lc.after_run_finished_successfully(), Some(CommitOutcome::Unchanged));
    assert_eq!(std::fs::read(&settings.cache_file).unwrap(), before);
}

#[test]
fn scenario_b_first_run_creates_cache() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path());

    let mut lc = Lifecycle::new(components(&[("core", "1.0")]), Role::Interactive, settings.clone());
    execute(&mut lc, LOADER_UNIT, LOADER_METHOD, &host_unit(LOADER_UNIT, LOADER_METHOD));
    assert!(!lc.session().unwrap().is_consistent());
    assert!(!settings.cache_file.exists());

    execute(
        &mut lc,
        INTERACTIVE_UNIT,
        INTERACTIVE_METHOD,
        &host_unit(INTERACTIVE_UNIT, INTERACTIVE_METHOD),
    );
    assert!(lc.session().is_none());

    let mut expected = ComponentSnapshot::new();
    expected.insert("core", "1.0");
    assert_eq!(load(&settings), expected);
}

#[test]
fn scenario_c_changed_version_is_overwritten_on_headless_path() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path());
    seed(&settings, &[("core", "1.0")]);

    let mut lc = Lifecycle::new(components(&[("core", "1.1")]), Role::Headless, settings.clone());
    execute(&mut lc, LOADER_UNIT, LOADER_METHOD, &host_unit(LOADER_UNIT, LOADER_METHOD));
    assert!(!lc.session().unwrap().is_consistent());

    // The interactive finisher is not patched for a headless role.
    execute(
        &mut lc,
        INTERACTIVE_UNIT,
        INTERACTIVE_METHOD,
        &host_unit(INTERACTIVE_UNIT, INTERACTIVE_METHOD),
    );
    assert_eq!(lc.session().unwrap().stage(), Stage::Staged);

    execute(
        &mut lc,
        HEADLESS_UNIT,
        HEADLESS_METHOD,
        &host_unit(HEADLESS_UNIT, HEADLESS_METHOD),
    );
    let loaded = load(&settings);
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded.version_of("core"), Some("1.1"));
}

#[test]
fn scenario_d_crash_before_finish_keeps_prior_cache() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path());
    let before = seed(&settings, &[("core", "1.0")]);

    {
        let mut lc = Lifecycle::new(
            components(&[("core", "1.0"), ("addon", "0.9")]),
            Role::Interactive,
            settings.clone(),
        );
        execute(&mut lc, LOADER_UNIT, LOADER_METHOD, &host_unit(LOADER_UNIT, LOADER_METHOD));
        assert_eq!(lc.session().unwrap().stage(), Stage::Staged);
        assert_eq!(std::fs::read(&settings.cache_file).unwrap(), before);
        // Startup fails here: the finish trigger never fires.
    }

    assert_eq!(std::fs::read(&settings.cache_file).unwrap(), before);
    let leftovers: Vec<_> = std::fs::read_dir(&settings.cache_dir)
        .unwrap()
        .filter_map(Result::ok)
        .map(|e| e.file_name())
        .collect();
    assert_eq!(leftovers, vec![std::ffi::OsString::from("components.bin")]);
}

#[test]
fn next_run_after_commit_is_consistent() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path());
    let finisher = host_unit(INTERACTIVE_UNIT, INTERACTIVE_METHOD);
    let loader = host_unit(LOADER_UNIT, LOADER_METHOD);

    for expect_consistent in [false, true] {
        let mut lc = Lifecycle::new(
            components(&[("core", "1.0"), ("addon", "2.1")]),
            Role::Interactive,
            settings.clone(),
        );
        execute(&mut lc, LOADER_UNIT, LOADER_METHOD, &loader);
        assert_eq!(lc.session().unwrap().is_consistent(), expect_consistent);
        execute(&mut lc, INTERACTIVE_UNIT, INTERACTIVE_METHOD, &finisher);
    }
}

#[test]
fn unpatched_units_pass_through_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let lc = Lifecycle::new(components(&[]), Role::Interactive, settings(dir.path()));
    let other = host_unit("host.render.Window", "draw");
    assert_eq!(&*lc.transform("host.render.Window", &other), &other[..]);
}
