//! Call-site synthesis.
//!
//! Given a module holding a single `nounwind` function of one integer
//! parameter, adds a driver function that calls it with evenly spaced
//! arguments covering the parameter's unsigned range. All preconditions are
//! checked before the module is touched.
use ckinstr::{
    consts::IConst,
    modules::{
        BasicBlock, Function, FunctionAttributes, Linkage, Module,
        misc::Invoke,
        operand::{Label, Operand},
        symbol::FunctionPointer,
        terminator::Ret,
    },
    types::{TypeRegistry, Typeref, primary::IType},
};
use log::{debug, info, warn};
use uuid::Uuid;

use crate::{
    config::MakecallsConfig,
    magic::MAX_SAMPLED_WIDTH,
    pass::{ModulePass, PassOutcome},
    utils::error::{CkError, CkResult, PreconditionFault},
};

/// `count` evenly spaced values starting at 0 in `[0, 2^width - 1]`.
///
/// The spacing is `floor((2^width - 1) / count)`. When the range is
/// narrower than `count`, the spacing is 0 and every sample is 0. `width`
/// is clamped to `1..=64`.
pub fn sample_domain(width: u32, count: u32) -> Vec<u64> {
    if count == 0 {
        return Vec::new();
    }
    let width = width.clamp(1, MAX_SAMPLED_WIDTH);
    let max = u64::MAX >> (64 - width);
    let step = max / u64::from(count);
    (0..u64::from(count)).map(|i| i * step).collect()
}

/// The function selected for sampling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplingTarget {
    pub uuid: Uuid,
    pub name: String,
    pub param_type: IType,
    /// Return type of the target, carried by every synthesized call.
    pub return_type: Option<Typeref>,
}

/// Check every precondition of [`synthesize`] without mutating `module`.
pub fn validate(
    module: &Module,
    registry: &TypeRegistry,
    config: &MakecallsConfig,
) -> CkResult<SamplingTarget> {
    if config.sample_count == 0 {
        return Err(CkError::InvalidConfig {
            key: "makecalls.sample_count",
            reason: "at least one call site must be generated".to_string(),
        });
    }

    let mut functions = module.functions.values();
    let function = match (functions.next(), functions.next()) {
        (Some(function), None) => function,
        _ => {
            return Err(PreconditionFault::MultipleFunctions {
                count: module.functions.len(),
            }
            .into());
        }
    };

    if !function.attributes.contains(FunctionAttributes::NO_UNWIND) {
        return Err(PreconditionFault::MayUnwind {
            function: function.name.clone(),
        }
        .into());
    }

    let [(_, param)] = function.params.as_slice() else {
        return Err(PreconditionFault::WrongArity {
            function: function.name.clone(),
            count: function.params.len(),
        }
        .into());
    };

    let Some(param_type) = registry.int_type(*param) else {
        return Err(PreconditionFault::NonIntegerParameter {
            function: function.name.clone(),
            ty: registry.fmt(*param).to_string(),
        }
        .into());
    };

    if param_type.num_bits() > MAX_SAMPLED_WIDTH {
        return Err(PreconditionFault::WidthOverflow {
            function: function.name.clone(),
            bits: param_type.num_bits(),
        }
        .into());
    }

    if function.name == config.driver_name {
        return Err(PreconditionFault::DriverNameTaken {
            name: config.driver_name.clone(),
        }
        .into());
    }

    Ok(SamplingTarget {
        uuid: function.uuid,
        name: function.name.clone(),
        param_type,
        return_type: function.return_type,
    })
}

/// Build the driver `i32 driver_name()` calling `target` once per sample,
/// in increasing order, then returning 0. Returned values are discarded.
pub fn synthesize(
    target: &SamplingTarget,
    registry: &TypeRegistry,
    config: &MakecallsConfig,
) -> Function {
    let i32_ty = registry.int(IType::I32);
    let mut driver = Function::new(config.driver_name.clone(), vec![], Some(i32_ty));
    driver.linkage = Linkage::External;
    driver.attributes = FunctionAttributes::NO_UNWIND;

    let mut block = BasicBlock::new(
        Label::NIL,
        Ret {
            value: Some(Operand::Imm(IConst {
                ty: IType::I32,
                value: 0,
            })),
        },
    );
    block.instructions = sample_domain(target.param_type.num_bits(), config.sample_count)
        .into_iter()
        .map(|value| {
            Invoke {
                function: Operand::Func(FunctionPointer::Internal(target.uuid)),
                args: vec![Operand::Imm(IConst {
                    ty: target.param_type,
                    value,
                })],
                dest: None,
                ty: target.return_type,
            }
            .into()
        })
        .collect();

    driver.body.push(block);
    driver
}

pub struct MakecallsPass {
    config: MakecallsConfig,
}

impl MakecallsPass {
    pub const NAME: &'static str = "makecalls";

    pub fn new(config: MakecallsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MakecallsConfig {
        &self.config
    }
}

impl ModulePass for MakecallsPass {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn run_on_module(
        &mut self,
        module: &mut Module,
        registry: &TypeRegistry,
    ) -> CkResult<PassOutcome> {
        let target = validate(module, registry, &self.config).inspect_err(|err| {
            if let CkError::Precondition(fault) = err {
                warn!("Cannot synthesize call sites: {}", fault);
            }
        })?;
        debug!(
            "Sampling `{}` over {} with {} call(s)",
            target.name, target.param_type, self.config.sample_count
        );

        let driver = synthesize(&target, registry, &self.config);
        let num_calls = driver.num_instructions();
        module.add_function(driver)?;

        info!(
            "Synthesized driver `{}` with {} call(s) to `{}`",
            self.config.driver_name, num_calls, target.name
        );
        Ok(PassOutcome::Modified)
    }
}
