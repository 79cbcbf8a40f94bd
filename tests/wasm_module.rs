//! End-to-end tests of the wasmtime adapter against the text-format fixture module.

use std::path::PathBuf;

use modcheck::exports::{ArrayKind, ExportSurface};
use modcheck::harness::{self, HarnessConfig, HarnessError, JsonReporter, checks, run_checks};
use modcheck::loader::{self, ArtifactSource, ImportConfig, LoadError, WasmModule};
use modcheck::runtime::{ManagedRuntime, ModuleExports, Ref, RuntimeError, TypeId};
use proptest::prelude::*;

const FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/demo.wat");

fn fixture() -> ArtifactSource {
    ArtifactSource::Path(PathBuf::from(FIXTURE))
}

async fn load_fixture() -> WasmModule {
    loader::load(&fixture(), &ImportConfig::default()).await.unwrap()
}

/// Load the fixture outside an async context, for property tests that share one instance.
fn load_fixture_blocking() -> WasmModule {
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
    runtime.block_on(load_fixture())
}

fn live_objects(module: &WasmModule) -> i32 {
    module.call("liveObjects", &[]).unwrap().unwrap()
}

#[tokio::test]
async fn test_full_run_passes() {
    let config = HarnessConfig::new().with_artifact(fixture());
    let mut reporter = JsonReporter::new(Vec::new());
    let summary = harness::run(&config, &mut reporter).await.unwrap();

    assert_eq!(summary.total, 6);
    assert_eq!(summary.passed, 6);
    assert!(summary.is_success());

    let out = String::from_utf8(reporter.into_inner()).unwrap();
    assert_eq!(out.lines().count(), 8);
    assert!(out.lines().last().unwrap().contains("\"failed\":0"));
}

#[tokio::test]
async fn test_full_run_releases_every_hold() {
    let module = load_fixture().await;
    let mut reporter = JsonReporter::new(Vec::new());
    run_checks(&module, &checks::all(), &mut reporter).unwrap();
    assert_eq!(live_objects(&module), 0);
}

#[tokio::test]
async fn test_unicode_string_round_trip() {
    let module = load_fixture().await;
    let exports = ExportSurface::new(&module);
    let text = exports.retain_string("héllo 🌍").unwrap();

    assert_eq!(module.read_string(text.get()).unwrap(), "héllo 🌍");
    // The emoji is a surrogate pair.
    assert_eq!(exports.strlen(&text).unwrap(), 8);

    text.release().unwrap();
    assert_eq!(live_objects(&module), 0);
}

#[tokio::test]
async fn test_guard_drop_releases() {
    let module = load_fixture().await;
    let exports = ExportSurface::new(&module);
    {
        let _array = exports.retain_array(ArrayKind::ArrayI32, &[1, 2]).unwrap();
        assert_eq!(live_objects(&module), 2);
    }
    assert_eq!(live_objects(&module), 0);
}

#[tokio::test]
async fn test_instance_of_distinguishes_array_kinds() {
    let module = load_fixture().await;
    let exports = ExportSurface::new(&module);
    let typed = exports.type_id(ArrayKind::Int32Array).unwrap();
    let growable = exports.type_id(ArrayKind::ArrayI32).unwrap();

    let array = exports.retain_array(ArrayKind::Int32Array, &[9]).unwrap();
    assert!(module.instance_of(array.get(), typed).unwrap());
    assert!(!module.instance_of(array.get(), growable).unwrap());
    // Both derive from ArrayBufferView.
    assert!(module.instance_of(array.get(), TypeId(2)).unwrap());
    array.release().unwrap();
}

#[tokio::test]
async fn test_alloc_array_rejects_non_array_type() {
    let module = load_fixture().await;
    assert_eq!(
        module.alloc_array(TypeId(1), &[1]),
        Err(RuntimeError::NotAnArray(1))
    );
    assert_eq!(
        module.alloc_array(TypeId(42), &[1]),
        Err(RuntimeError::InvalidTypeId(42))
    );
}

#[tokio::test]
async fn test_garbage_header_id_is_an_error() {
    let module = load_fixture().await;
    // Inside the static "invalid length" payload, so the header id is text.
    let bogus = Ref(120);
    assert_eq!(module.read_array(bogus), Err(RuntimeError::InvalidTypeId(0x006e_0069)));
    assert!(!module.instance_of(bogus, TypeId(3)).unwrap());
    // Past the end of a 256-page memory.
    assert!(matches!(module.read_array(Ref(u32::MAX)), Err(RuntimeError::Memory(_))));
}

#[tokio::test]
async fn test_abort_is_reported_with_location() {
    let module = load_fixture().await;
    let exports = ExportSurface::new(&module);
    let array = exports.retain_array(ArrayKind::ArrayI32, &[1, 2, 3]).unwrap();

    let err = exports.change_length(&array, -1).unwrap_err();
    let RuntimeError::Aborted { export, info } = err else {
        panic!("expected an abort, got {err:?}");
    };
    assert_eq!(export, "changeLength");
    assert_eq!(info.message.as_deref(), Some("invalid length"));
    assert_eq!(info.file.as_deref(), Some("demo.ts"));
    assert_eq!((info.line, info.column), (3, 5));

    // The instance stays usable after a trap.
    exports.change_length(&array, 1).unwrap();
    assert_eq!(module.read_array(array.get()).unwrap(), vec![1]);
    array.release().unwrap();
}

#[tokio::test]
async fn test_release_of_unheld_object_traps() {
    let module = load_fixture().await;
    let ptr = module.alloc_string("x").unwrap();
    let err = module.release(ptr).unwrap_err();
    assert!(matches!(err, RuntimeError::Trap { ref export, .. } if export == "__release"));
}

#[tokio::test]
async fn test_argument_count_is_set_before_each_call() {
    let module = load_fixture().await;
    assert_eq!(module.call("varadd", &[2, 3]).unwrap(), Some(5));
    assert_eq!(module.global("argc").unwrap(), 2);
    module.call("Car#get:numDoors", &[module.call("Car#constructor", &[0, 4]).unwrap().unwrap()]).unwrap();
    assert_eq!(module.global("argc").unwrap(), 1);
}

#[tokio::test]
async fn test_signature_mismatch() {
    let module = load_fixture().await;
    let err = module.call("varadd", &[1]).unwrap_err();
    assert!(matches!(err, RuntimeError::Signature { ref name, .. } if name == "varadd"));
    assert_eq!(
        module.call("missing", &[]),
        Err(RuntimeError::MissingExport("missing".to_string()))
    );
}

#[tokio::test]
async fn test_trace_messages_are_collected() {
    let module = load_fixture().await;
    module.call("dotrace", &[0]).unwrap();
    module.call("dotrace", &[2]).unwrap();
    assert_eq!(module.traces(), vec!["trace".to_string(), "trace 1, 2".to_string()]);
}

#[tokio::test]
async fn test_static_motto_needs_no_hold() {
    let module = load_fixture().await;
    let motto = Ref(module.global("LIFE_MOTTO").unwrap());
    assert_eq!(module.read_string(motto).unwrap(), "YOLO");
    module.retain(motto).unwrap();
    module.release(motto).unwrap();
    module.release(motto).unwrap();
}

#[tokio::test]
async fn test_missing_artifact_is_a_read_error() {
    let source = ArtifactSource::Path(PathBuf::from("does/not/exist.wasm"));
    let err = loader::load(&source, &ImportConfig::default()).await.err().unwrap();
    assert!(matches!(err, LoadError::Read { .. }));
}

#[tokio::test]
async fn test_garbage_bytes_fail_to_compile() {
    let source = ArtifactSource::Bytes {
        label: "garbage".to_string(),
        bytes: vec![0xde, 0xad, 0xbe, 0xef],
    };
    let err = loader::load(&source, &ImportConfig::default()).await.err().unwrap();
    assert!(matches!(err, LoadError::Compile(_)));
}

#[tokio::test]
async fn test_module_without_runtime_is_rejected() {
    let source = ArtifactSource::Bytes {
        label: "empty".to_string(),
        bytes: b"(module)".to_vec(),
    };
    let err = loader::load(&source, &ImportConfig::default()).await.err().unwrap();
    assert!(matches!(err, LoadError::MissingRuntimeExport("__alloc")));
}

#[tokio::test]
async fn test_unknown_import_traps_only_when_called() {
    let wat = br#"(module
        (import "env" "seed" (func $seed (result i32)))
        (func (export "__alloc") (param i32 i32) (result i32) (i32.const 0))
        (func (export "__retain") (param i32) (result i32) (local.get 0))
        (func (export "__release") (param i32))
        (global (export "__rtti_base") i32 (i32.const 0))
        (func (export "seeded") (result i32) (call $seed)))"#;
    let source = ArtifactSource::Bytes {
        label: "seed".to_string(),
        bytes: wat.to_vec(),
    };

    let module = loader::load(&source, &ImportConfig::default()).await.unwrap();
    assert!(matches!(module.call("seeded", &[]), Err(RuntimeError::Trap { .. })));

    let strict = ImportConfig::default().with_trap_unknown_imports(false);
    let err = loader::load(&source, &strict).await.err().unwrap();
    assert!(matches!(err, LoadError::Instantiate(_)));
}

#[tokio::test]
async fn test_load_failure_surfaces_as_harness_error() {
    let config = HarnessConfig::new().with_artifact(ArtifactSource::Path(PathBuf::from("nope.wasm")));
    let mut reporter = JsonReporter::new(Vec::new());
    let err = harness::run(&config, &mut reporter).await.unwrap_err();
    assert!(matches!(err, HarnessError::Load(LoadError::Read { .. })));
    assert!(reporter.into_inner().is_empty());
}

#[test]
fn test_strings_round_trip_through_module_memory() {
    let module = load_fixture_blocking();
    let exports = ExportSurface::new(&module);
    proptest!(ProptestConfig::with_cases(128), |(text in any::<String>())| {
        let retained = exports.retain_string(&text).unwrap();
        prop_assert_eq!(module.read_string(retained.get()).unwrap(), text.clone());
        prop_assert_eq!(exports.strlen(&retained).unwrap() as usize, text.encode_utf16().count());
        retained.release().unwrap();
        prop_assert_eq!(live_objects(&module), 0);
    });
}

#[test]
fn test_arrays_round_trip_through_module_memory() {
    let module = load_fixture_blocking();
    let exports = ExportSurface::new(&module);
    proptest!(
        ProptestConfig::with_cases(128),
        |(values in proptest::collection::vec(any::<i32>(), 0..256), growable in any::<bool>())| {
            let kind = if growable { ArrayKind::ArrayI32 } else { ArrayKind::Int32Array };
            let array = exports.retain_array(kind, &values).unwrap();
            prop_assert!(module.instance_of(array.get(), exports.type_id(kind).unwrap()).unwrap());
            prop_assert_eq!(module.read_array(array.get()).unwrap(), values.clone());
            if kind == ArrayKind::Int32Array {
                let expected = values.iter().fold(0i32, |acc, v| acc.wrapping_add(*v));
                prop_assert_eq!(exports.sum(&array).unwrap(), expected);
            }
            array.release().unwrap();
            prop_assert_eq!(live_objects(&module), 0);
        }
    );
}

#[test]
fn test_empty_values_round_trip_through_module_memory() {
    let module = load_fixture_blocking();
    let exports = ExportSurface::new(&module);

    let text = exports.retain_string("").unwrap();
    assert_eq!(module.read_string(text.get()).unwrap(), "");
    assert_eq!(exports.strlen(&text).unwrap(), 0);
    text.release().unwrap();

    for kind in [ArrayKind::Int32Array, ArrayKind::ArrayI32] {
        let array = exports.retain_array(kind, &[]).unwrap();
        assert_eq!(module.read_array(array.get()).unwrap(), Vec::<i32>::new());
        array.release().unwrap();
    }
    assert_eq!(live_objects(&module), 0);
}
