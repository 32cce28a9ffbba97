//! Checkpoint instrumentation.
//!
//! Inserts calls to an external profiling runtime around every exported
//! function:
//!
//! - `checkpoint(enter_tag, name)` before the first non-metadata
//!   instruction of the entry block;
//! - `checkpoint(exit_tag, name)` before every `ret`.
//!
//! The program entry (`main` by default) is additionally wrapped with
//! `initialize()` before its entry checkpoint and `finalize()` before each
//! of its exit checkpoints. Functions with internal linkage are left
//! untouched.
//!
//! The pass runs in three phases. [`FunctionPass::initialize`] pools the tag
//! strings, declares the hooks and builds the [`NameIndex`]; it can be
//! repeated without duplicating pool entries. Functions are then
//! transformed independently. [`FunctionPass::finalize`] only does work when
//! the entry wrapping is [`EntryWrapping::Deferred`].
use std::collections::BTreeMap;

use ckinstr::{
    modules::{
        Function, InsertPoint, Linkage, Module, Slot,
        instructions::CkInstr,
        misc::Invoke,
        operand::Operand,
        pool::StrRef,
        symbol::{FunctionPointer, Signature},
    },
    types::TypeRegistry,
};
use log::{debug, info, trace};
use smallvec::{SmallVec, smallvec};
use uuid::Uuid;

use crate::{
    config::{CheckpointConfig, EntryWrapping},
    locate::{entry_point, exit_points},
    pass::{FunctionPass, PassOutcome},
    utils::error::{CkResult, StructuralFault},
};

/// Pooled name constant of every function that has a body.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NameIndex {
    names: BTreeMap<Uuid, StrRef>,
}

impl NameIndex {
    /// Intern the name of every defined function of `module`.
    pub fn build(module: &mut Module, registry: &TypeRegistry) -> Self {
        let Module { functions, pool } = module;
        let names = functions
            .values()
            .filter(|function| !function.is_declaration())
            .map(|function| (function.uuid, pool.intern(registry, &function.name)))
            .collect();
        Self { names }
    }

    /// Name constant of `function`.
    ///
    /// Failing here means the function was added after the index was built
    /// or has no body.
    pub fn lookup(&self, function: &Function) -> CkResult<StrRef> {
        self.names.get(&function.uuid).copied().ok_or_else(|| {
            StructuralFault::UnknownFunction {
                function: function.name.clone(),
            }
            .into()
        })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Module-level data shared by every function transformation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointContext {
    pub checkpoint: FunctionPointer,
    pub initialize: FunctionPointer,
    pub finalize: FunctionPointer,
    pub enter_tag: StrRef,
    pub exit_tag: StrRef,
    pub names: NameIndex,
}

impl CheckpointContext {
    /// Pool the tags, declare the three hooks and index function names.
    pub fn initialize(
        module: &mut Module,
        registry: &TypeRegistry,
        config: &CheckpointConfig,
    ) -> CkResult<Self> {
        let ptr = registry.ptr();

        let enter_tag = module.pool.intern(registry, &config.enter_tag);
        let exit_tag = module.pool.intern(registry, &config.exit_tag);

        let checkpoint =
            module.declare_external(&config.checkpoint_hook, Signature::void(vec![ptr, ptr]))?;
        let initialize = module.declare_external(&config.initialize_hook, Signature::void(vec![]))?;
        let finalize = module.declare_external(&config.finalize_hook, Signature::void(vec![]))?;

        let names = NameIndex::build(module, registry);

        Ok(Self {
            checkpoint,
            initialize,
            finalize,
            enter_tag,
            exit_tag,
            names,
        })
    }

    fn checkpoint_call(&self, tag: StrRef, name: StrRef) -> CkInstr {
        Invoke::void_call(self.checkpoint, vec![Operand::Str(tag), Operand::Str(name)]).into()
    }

    fn hook_call(&self, hook: FunctionPointer) -> CkInstr {
        Invoke::void_call(hook, vec![]).into()
    }

    /// `true` if `instr` is `checkpoint(exit_tag, _)`.
    fn is_exit_checkpoint(&self, instr: &CkInstr) -> bool {
        match instr {
            CkInstr::Invoke(invoke) => {
                invoke.callee() == Some(self.checkpoint)
                    && invoke.args.first() == Some(&Operand::Str(self.exit_tag))
            }
            _ => false,
        }
    }
}

/// Counters accumulated over a pass run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointStats {
    pub functions_instrumented: usize,
    pub functions_skipped: usize,
    pub calls_inserted: usize,
}

/// Insert `instrs` in order, all immediately before `point`.
fn insert_sequence(
    function: &mut Function,
    point: InsertPoint,
    instrs: impl IntoIterator<Item = CkInstr>,
) -> CkResult<usize> {
    let mut count = 0;
    for instr in instrs {
        let slot = match point.slot {
            Slot::Instr(i) => Slot::Instr(i + count),
            Slot::Terminator => Slot::Terminator,
        };
        trace!(
            "Inserting call in `{}` at block #{}, {:?}",
            function.name, point.block, slot
        );
        function.insert_before(
            InsertPoint {
                block: point.block,
                slot,
            },
            instr,
        )?;
        count += 1;
    }
    Ok(count)
}

pub struct CheckpointPass {
    config: CheckpointConfig,
    context: Option<CheckpointContext>,
    stats: CheckpointStats,
}

impl CheckpointPass {
    pub const NAME: &'static str = "checkpoint";

    pub fn new(config: CheckpointConfig) -> Self {
        Self {
            config,
            context: None,
            stats: CheckpointStats::default(),
        }
    }

    pub fn config(&self) -> &CheckpointConfig {
        &self.config
    }

    /// Context built by the last initialization, if any.
    pub fn context(&self) -> Option<&CheckpointContext> {
        self.context.as_ref()
    }

    pub fn stats(&self) -> CheckpointStats {
        self.stats
    }

    fn wraps_entry_inline(&self, function: &Function) -> bool {
        self.config.entry_wrapping == EntryWrapping::Inline
            && function.name == self.config.entry_function
    }

    /// Insert `initialize()` before the entry checkpoint and `finalize()`
    /// before every exit checkpoint of an already instrumented entry
    /// function.
    fn wrap_entry(context: &CheckpointContext, function: &mut Function) -> CkResult<usize> {
        let mut inserted = 0;

        let entry = entry_point(function)?;
        inserted += insert_sequence(function, entry, [context.hook_call(context.initialize)])?;

        for exit in exit_points(function) {
            let block = &function.body[exit.block];
            let last = block.instructions.len().checked_sub(1);
            let instrumented = last
                .map(|i| context.is_exit_checkpoint(&block.instructions[i]))
                .unwrap_or(false);
            let Some(last) = last.filter(|_| instrumented) else {
                return Err(StructuralFault::MalformedFunction {
                    function: function.name.clone(),
                    reason: format!(
                        "the return of block #{} is not preceded by an exit checkpoint",
                        exit.block
                    ),
                }
                .into());
            };

            inserted += insert_sequence(
                function,
                InsertPoint {
                    block: exit.block,
                    slot: Slot::Instr(last),
                },
                [context.hook_call(context.finalize)],
            )?;
        }

        Ok(inserted)
    }
}

impl FunctionPass for CheckpointPass {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn initialize(
        &mut self,
        module: &mut Module,
        registry: &TypeRegistry,
    ) -> CkResult<PassOutcome> {
        let pool_len = module.pool.len();
        let context = CheckpointContext::initialize(module, registry, &self.config)?;
        debug!(
            "Checkpoint context ready: {} indexed function(s), {} pooled constant(s)",
            context.names.len(),
            module.pool.len()
        );
        self.context = Some(context);
        self.stats = CheckpointStats::default();

        if module.pool.len() != pool_len {
            Ok(PassOutcome::Modified)
        } else {
            Ok(PassOutcome::Unchanged)
        }
    }

    fn run_on_function(&mut self, function: &mut Function) -> CkResult<PassOutcome> {
        if function.linkage == Linkage::Internal {
            debug!("Skipping internal function `{}`", function.name);
            self.stats.functions_skipped += 1;
            return Ok(PassOutcome::Unchanged);
        }

        let wrap = self.wraps_entry_inline(function);
        let Some(context) = self.context.as_ref() else {
            return Err(StructuralFault::UnknownFunction {
                function: function.name.clone(),
            }
            .into());
        };

        debug!("Adding checkpoints to `{}`", function.name);
        let name = context.names.lookup(function)?;
        let entry = entry_point(function)?;
        let exits = exit_points(function);

        let mut entry_calls: SmallVec<[CkInstr; 2]> = smallvec![];
        if wrap {
            entry_calls.push(context.hook_call(context.initialize));
        }
        entry_calls.push(context.checkpoint_call(context.enter_tag, name));
        let mut inserted = insert_sequence(function, entry, entry_calls)?;

        for exit in exits {
            let mut exit_calls: SmallVec<[CkInstr; 2]> = smallvec![];
            if wrap {
                exit_calls.push(context.hook_call(context.finalize));
            }
            exit_calls.push(context.checkpoint_call(context.exit_tag, name));
            inserted += insert_sequence(function, exit, exit_calls)?;
        }

        self.stats.functions_instrumented += 1;
        self.stats.calls_inserted += inserted;
        Ok(PassOutcome::Modified)
    }

    fn finalize(&mut self, module: &mut Module) -> CkResult<PassOutcome> {
        let mut outcome = PassOutcome::Unchanged;

        if self.config.entry_wrapping == EntryWrapping::Deferred
            && let Some(context) = self.context.as_ref()
        {
            let entry = module
                .functions
                .values_mut()
                .find(|function| function.name == self.config.entry_function);
            match entry {
                Some(function)
                    if function.linkage != Linkage::Internal && !function.is_declaration() =>
                {
                    debug!("Wrapping entry function `{}`", function.name);
                    self.stats.calls_inserted += Self::wrap_entry(context, function)?;
                    outcome = PassOutcome::Modified;
                }
                _ => debug!(
                    "No instrumented entry function `{}` to wrap",
                    self.config.entry_function
                ),
            }
        }

        info!(
            "Checkpoint pass: {} function(s) instrumented, {} skipped, {} call(s) inserted",
            self.stats.functions_instrumented,
            self.stats.functions_skipped,
            self.stats.calls_inserted
        );
        Ok(outcome)
    }
}
