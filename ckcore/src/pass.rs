//! Pass traits and a minimal pass manager.
//!
//! A [`ModulePass`] sees the whole module at once. A [`FunctionPass`] is
//! driven through three phases (initialize, one call per defined function,
//! finalize) and is turned into a module pass with [`PerFunction`].
//! Passes mutate the module in place; a fault stops the run and leaves the
//! module as it was at that point.
use std::ops::{BitOr, BitOrAssign};

use ckinstr::{
    modules::{Function, Module},
    types::TypeRegistry,
};
use log::{debug, error, info};
use strum::EnumIs;

use crate::{
    checkpoint::CheckpointPass,
    config::PassConfig,
    makecalls::MakecallsPass,
    utils::error::{CkError, CkResult},
};

/// Whether a pass changed the IR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIs)]
pub enum PassOutcome {
    Unchanged,
    Modified,
}

impl BitOr for PassOutcome {
    type Output = PassOutcome;

    fn bitor(self, rhs: Self) -> Self::Output {
        if self.is_modified() || rhs.is_modified() {
            PassOutcome::Modified
        } else {
            PassOutcome::Unchanged
        }
    }
}

impl BitOrAssign for PassOutcome {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = *self | rhs;
    }
}

/// A transformation over an entire module.
pub trait ModulePass {
    /// Name under which the pass is registered.
    fn name(&self) -> &'static str;

    fn run_on_module(
        &mut self,
        module: &mut Module,
        registry: &TypeRegistry,
    ) -> CkResult<PassOutcome>;
}

/// A transformation applied to every function independently.
///
/// `run_on_function` only receives the function being transformed; any
/// module-level data it needs is prepared by `initialize`.
pub trait FunctionPass {
    fn name(&self) -> &'static str;

    /// Prepare module-level state. Called once before any function.
    fn initialize(&mut self, module: &mut Module, registry: &TypeRegistry)
    -> CkResult<PassOutcome>;

    fn run_on_function(&mut self, function: &mut Function) -> CkResult<PassOutcome>;

    /// Called once after every function was transformed.
    fn finalize(&mut self, _module: &mut Module) -> CkResult<PassOutcome> {
        Ok(PassOutcome::Unchanged)
    }
}

/// Runs a [`FunctionPass`] over every defined function of a module.
pub struct PerFunction<P>(pub P);

impl<P: FunctionPass> PerFunction<P> {
    pub fn into_inner(self) -> P {
        self.0
    }
}

impl<P: FunctionPass> ModulePass for PerFunction<P> {
    fn name(&self) -> &'static str {
        self.0.name()
    }

    fn run_on_module(
        &mut self,
        module: &mut Module,
        registry: &TypeRegistry,
    ) -> CkResult<PassOutcome> {
        let mut outcome = self.0.initialize(module, registry)?;

        for function in module.functions.values_mut() {
            if function.is_declaration() {
                continue;
            }
            outcome |= self.0.run_on_function(function)?;
        }

        outcome |= self.0.finalize(module)?;
        Ok(outcome)
    }
}

/// Ordered list of module passes.
#[derive(Default)]
pub struct PassManager {
    passes: Vec<Box<dyn ModulePass>>,
}

impl PassManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a pipeline from registered pass names, in order.
    ///
    /// Known passes are `checkpoint` and `makecalls`. `config` is validated
    /// before any pass is built.
    pub fn from_names<S: AsRef<str>>(names: &[S], config: &PassConfig) -> CkResult<Self> {
        config.validate()?;
        let mut manager = Self::new();
        for name in names {
            match name.as_ref() {
                CheckpointPass::NAME => {
                    manager.add(PerFunction(CheckpointPass::new(config.checkpoint.clone())));
                }
                MakecallsPass::NAME => {
                    manager.add(MakecallsPass::new(config.makecalls.clone()));
                }
                unknown => return Err(CkError::UnknownPass(unknown.to_string())),
            }
        }
        Ok(manager)
    }

    pub fn add(&mut self, pass: impl ModulePass + 'static) -> &mut Self {
        self.passes.push(Box::new(pass));
        self
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Names of the scheduled passes, in execution order.
    pub fn pass_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.passes.iter().map(|pass| pass.name())
    }

    /// Run every pass in order, stopping at the first fault.
    pub fn run(&mut self, module: &mut Module, registry: &TypeRegistry) -> CkResult<PassOutcome> {
        let mut outcome = PassOutcome::Unchanged;
        for pass in self.passes.iter_mut() {
            debug!("Running pass `{}`", pass.name());
            match pass.run_on_module(module, registry) {
                Ok(result) => outcome |= result,
                Err(err) => {
                    error!("Pass `{}` failed: {}", pass.name(), err);
                    return Err(err);
                }
            }
        }
        info!(
            "Pipeline of {} pass(es) finished, module {}",
            self.passes.len(),
            if outcome.is_modified() {
                "modified"
            } else {
                "unchanged"
            }
        );
        Ok(outcome)
    }
}
