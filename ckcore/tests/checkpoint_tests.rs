use ckcore::{
    checkpoint::{CheckpointPass, CheckpointStats},
    config::{CheckpointConfig, EntryWrapping},
    pass::{FunctionPass, ModulePass, PassOutcome, PerFunction},
    tests_utils::{callees, declaration, leaf, sample_program, string_arg, two_exits},
    utils::error::{CkError, FaultKind, StructuralFault},
};
use ckinstr::{
    modules::{Function, Linkage, Module, symbol::Signature},
    types::TypeRegistry,
};

fn run(module: &mut Module, registry: &TypeRegistry, config: CheckpointConfig) -> CheckpointStats {
    let mut pass = PerFunction(CheckpointPass::new(config));
    let outcome = pass.run_on_module(module, registry).unwrap();
    assert_eq!(outcome, PassOutcome::Modified);
    pass.into_inner().stats()
}

fn function<'a>(module: &'a Module, name: &str) -> &'a Function {
    module.function_by_name(name).unwrap()
}

/// `(callee, first string argument, second string argument)` for every
/// instruction of every block.
type Shape = Vec<Vec<(Option<String>, Option<String>, Option<String>)>>;

fn shape(module: &Module, name: &str) -> Shape {
    function(module, name)
        .body
        .iter()
        .map(|bb| {
            callees(module, &bb.instructions)
                .into_iter()
                .zip(bb.instructions.iter())
                .map(|(callee, instr)| {
                    (
                        callee.map(str::to_string),
                        string_arg(module, instr, 0),
                        string_arg(module, instr, 1),
                    )
                })
                .collect()
        })
        .collect()
}

fn call(callee: &str) -> (Option<String>, Option<String>, Option<String>) {
    (Some(callee.to_string()), None, None)
}

fn checkpoint(tag: &str, name: &str) -> (Option<String>, Option<String>, Option<String>) {
    (
        Some("checkpoint".to_string()),
        Some(tag.to_string()),
        Some(name.to_string()),
    )
}

const OTHER: (Option<String>, Option<String>, Option<String>) = (None, None, None);

#[test]
fn test_exported_function_gets_one_entry_and_one_exit_per_return() {
    let registry = TypeRegistry::default();
    let mut module = sample_program(&registry);
    run(&mut module, &registry, CheckpointConfig::default());

    assert_eq!(
        shape(&module, "helper"),
        vec![vec![
            checkpoint("Entering ", "helper"),
            OTHER,
            checkpoint("Exiting ", "helper"),
        ]]
    );
}

#[test]
fn test_internal_function_is_untouched() {
    let registry = TypeRegistry::default();
    let mut module = sample_program(&registry);
    let before = function(&module, "local").clone();

    run(&mut module, &registry, CheckpointConfig::default());

    assert_eq!(function(&module, "local"), &before);
    assert!(function(&module, "puts").is_declaration());
}

#[test]
fn test_entry_function_is_wrapped() {
    let registry = TypeRegistry::default();
    let mut module = sample_program(&registry);
    run(&mut module, &registry, CheckpointConfig::default());

    assert_eq!(
        shape(&module, "main"),
        vec![
            // meta-assumption stays first
            vec![
                OTHER,
                call("initialize"),
                checkpoint("Entering ", "main"),
                OTHER,
            ],
            vec![call("finalize"), checkpoint("Exiting ", "main")],
            vec![OTHER, call("finalize"), checkpoint("Exiting ", "main")],
            vec![],
        ]
    );
    assert!(function(&module, "main").body[3].terminator.is_trap());
}

#[test]
fn test_stats() {
    let registry = TypeRegistry::default();
    let mut module = sample_program(&registry);
    let stats = run(&mut module, &registry, CheckpointConfig::default());

    assert_eq!(
        stats,
        CheckpointStats {
            functions_instrumented: 2,
            functions_skipped: 1,
            // main: 2 at entry + 2 per return site, helper: 2
            calls_inserted: 8,
        }
    );
}

#[test]
fn test_initialize_is_idempotent() {
    let registry = TypeRegistry::default();
    let mut module = sample_program(&registry);
    let mut pass = CheckpointPass::new(CheckpointConfig::default());

    assert_eq!(
        pass.initialize(&mut module, &registry).unwrap(),
        PassOutcome::Modified
    );
    let strings = module.pool.num_strings();
    let declarations = module.pool.num_declarations();
    let first = pass.context().cloned().unwrap();

    assert_eq!(
        pass.initialize(&mut module, &registry).unwrap(),
        PassOutcome::Unchanged
    );
    assert_eq!(module.pool.num_strings(), strings);
    assert_eq!(module.pool.num_declarations(), declarations);
    assert_eq!(pass.context(), Some(&first));

    // two tags and the names of main, helper and local
    assert_eq!(strings, 5);
    assert_eq!(declarations, 3);
    assert_eq!(first.names.len(), 3);
}

#[test]
fn test_hooks_are_declared_with_fixed_signatures() {
    let registry = TypeRegistry::default();
    let mut module = sample_program(&registry);
    let mut pass = CheckpointPass::new(CheckpointConfig::default());
    pass.initialize(&mut module, &registry).unwrap();

    let ptr = registry.ptr();
    let decl = module.pool.declaration_by_name("checkpoint").unwrap();
    assert_eq!(decl.signature, Signature::void(vec![ptr, ptr]));
    for hook in ["initialize", "finalize"] {
        let decl = module.pool.declaration_by_name(hook).unwrap();
        assert_eq!(decl.signature, Signature::void(vec![]));
    }
}

#[test]
fn test_deferred_wrapping_matches_inline() {
    let registry = TypeRegistry::default();
    let original = sample_program(&registry);

    let mut inline = original.clone();
    let inline_stats = run(&mut inline, &registry, CheckpointConfig::default());

    let mut deferred = original.clone();
    let deferred_stats = run(
        &mut deferred,
        &registry,
        CheckpointConfig {
            entry_wrapping: EntryWrapping::Deferred,
            ..Default::default()
        },
    );

    for name in ["main", "helper", "local"] {
        assert_eq!(shape(&inline, name), shape(&deferred, name), "{}", name);
    }
    assert_eq!(inline_stats, deferred_stats);
}

#[test]
fn test_deferred_transform_leaves_entry_unwrapped_until_finalize() {
    let registry = TypeRegistry::default();
    let mut module = sample_program(&registry);
    let mut pass = CheckpointPass::new(CheckpointConfig {
        entry_wrapping: EntryWrapping::Deferred,
        ..Default::default()
    });
    pass.initialize(&mut module, &registry).unwrap();

    let uuid = function(&module, "main").uuid;
    pass.run_on_function(module.function_mut(uuid).unwrap())
        .unwrap();
    assert_eq!(
        shape(&module, "main")[1],
        vec![checkpoint("Exiting ", "main")]
    );

    assert_eq!(pass.finalize(&mut module).unwrap(), PassOutcome::Modified);
    assert_eq!(
        shape(&module, "main")[1],
        vec![call("finalize"), checkpoint("Exiting ", "main")]
    );
}

#[test]
fn test_deferred_finalize_requires_instrumented_entry() {
    let registry = TypeRegistry::default();
    let mut module = sample_program(&registry);
    let mut pass = CheckpointPass::new(CheckpointConfig {
        entry_wrapping: EntryWrapping::Deferred,
        ..Default::default()
    });
    pass.initialize(&mut module, &registry).unwrap();

    let err = pass.finalize(&mut module).unwrap_err();
    assert!(matches!(
        err,
        CkError::Structural(StructuralFault::MalformedFunction { ref function, .. }) if function == "main"
    ));
}

#[test]
fn test_internal_entry_function_is_not_wrapped() {
    let registry = TypeRegistry::default();
    let mut module = Module::new();
    module
        .add_function(two_exits(&registry, "main", Linkage::Internal))
        .unwrap();
    let before = module.clone();

    for wrapping in [EntryWrapping::Inline, EntryWrapping::Deferred] {
        let mut module = before.clone();
        let mut pass = PerFunction(CheckpointPass::new(CheckpointConfig {
            entry_wrapping: wrapping,
            ..Default::default()
        }));
        pass.run_on_module(&mut module, &registry).unwrap();
        assert_eq!(function(&module, "main"), function(&before, "main"));
        assert_eq!(pass.into_inner().stats().calls_inserted, 0);
    }
}

#[test]
fn test_custom_hook_names() {
    let registry = TypeRegistry::default();
    let mut module = sample_program(&registry);
    run(
        &mut module,
        &registry,
        CheckpointConfig {
            finalize_hook: "print_results".to_string(),
            exit_tag: "Leaving ".to_string(),
            ..Default::default()
        },
    );

    assert_eq!(
        shape(&module, "main")[1],
        vec![
            call("print_results"),
            (
                Some("checkpoint".to_string()),
                Some("Leaving ".to_string()),
                Some("main".to_string())
            ),
        ]
    );
    assert!(module.pool.declaration_by_name("finalize").is_none());
}

#[test]
fn test_conflicting_hook_declaration_aborts() {
    let registry = TypeRegistry::default();
    let mut module = sample_program(&registry);
    // A local `checkpoint` that does not match `void (ptr, ptr)`.
    module
        .add_function(leaf(&registry, "checkpoint", Linkage::External))
        .unwrap();
    let before = module.functions.clone();

    let mut pass = PerFunction(CheckpointPass::new(CheckpointConfig::default()));
    let err = pass.run_on_module(&mut module, &registry).unwrap_err();

    assert_eq!(err.fault_kind(), FaultKind::Declaration);
    assert!(!err.is_recoverable());
    assert_eq!(module.functions, before);
}

#[test]
fn test_unknown_function_fault_is_not_rolled_back() {
    let registry = TypeRegistry::default();
    let mut module = sample_program(&registry);
    let mut pass = CheckpointPass::new(CheckpointConfig::default());
    pass.initialize(&mut module, &registry).unwrap();

    // Added after the name index was built.
    let late = module
        .add_function(leaf(&registry, "late", Linkage::External))
        .unwrap();
    let helper = function(&module, "helper").uuid;

    pass.run_on_function(module.function_mut(helper).unwrap())
        .unwrap();
    let err = pass
        .run_on_function(module.function_mut(late).unwrap())
        .unwrap_err();

    assert!(matches!(
        err,
        CkError::Structural(StructuralFault::UnknownFunction { ref function }) if function == "late"
    ));
    // The function transformed before the fault keeps its checkpoints.
    assert_eq!(shape(&module, "helper")[0].len(), 3);
    assert_eq!(shape(&module, "late")[0].len(), 1);
}

#[test]
fn test_declarations_are_not_indexed() {
    let registry = TypeRegistry::default();
    let mut module = sample_program(&registry);
    let mut pass = CheckpointPass::new(CheckpointConfig::default());
    pass.initialize(&mut module, &registry).unwrap();

    let mut puts = declaration(&registry, "puts");
    puts.uuid = function(&module, "puts").uuid;
    let err = pass.run_on_function(&mut puts).unwrap_err();
    assert!(err.is_structural());
}

#[test]
fn test_transform_without_initialize_fails() {
    let registry = TypeRegistry::default();
    let mut function = leaf(&registry, "helper", Linkage::External);
    let before = function.clone();
    let mut pass = CheckpointPass::new(CheckpointConfig::default());

    let err = pass.run_on_function(&mut function).unwrap_err();
    assert_eq!(err.fault_kind(), FaultKind::Structural);
    assert_eq!(function, before);
}
