//! Module builders shared by unit and integration tests.
use ckinstr::{
    consts::IConst,
    modules::{
        BasicBlock, Function, FunctionAttributes, Linkage, Module,
        instructions::CkInstr,
        int::{IAdd, ICmp, ICmpVariant},
        misc::{Invoke, MetaAssume},
        operand::{Label, Name, Operand},
        terminator::{CBranch, Ret, Trap},
    },
    types::{TypeRegistry, Typeref, primary::IType},
};

fn imm(ty: IType, value: u64) -> Operand {
    Operand::Imm(IConst { ty, value })
}

/// `i32 name(i32 %0)` returning `%0 + 1` from a single block.
pub fn leaf(registry: &TypeRegistry, name: &str, linkage: Linkage) -> Function {
    let i32_ty = registry.int(IType::I32);
    let mut function = Function::new(name, vec![(Name(0), i32_ty)], Some(i32_ty));
    function.linkage = linkage;

    let mut entry = BasicBlock::new(
        Label::NIL,
        Ret {
            value: Some(Operand::Reg(Name(1))),
        },
    );
    entry.instructions.push(
        IAdd {
            dest: Name(1),
            ty: i32_ty,
            lhs: Operand::Reg(Name(0)),
            rhs: imm(IType::I32, 1),
        }
        .into(),
    );
    function.body.push(entry);
    function
}

/// `i32 name(i32 %0)` with two return blocks and an unreachable trap block.
///
/// The entry block starts with a meta-assumption, so its first real
/// instruction is at index 1.
pub fn two_exits(registry: &TypeRegistry, name: &str, linkage: Linkage) -> Function {
    let i1 = registry.int(IType::I1);
    let i32_ty = registry.int(IType::I32);
    let mut function = Function::new(name, vec![(Name(0), i32_ty)], Some(i32_ty));
    function.linkage = linkage;

    let mut entry = BasicBlock::new(
        Label(0),
        CBranch {
            cond: Operand::Reg(Name(1)),
            target_true: Label(1),
            target_false: Label(2),
        },
    );
    entry.instructions.push(
        MetaAssume {
            condition: imm(IType::I1, 1),
        }
        .into(),
    );
    entry.instructions.push(
        ICmp {
            dest: Name(1),
            ty: i1,
            lhs: Operand::Reg(Name(0)),
            rhs: imm(IType::I32, 0),
            variant: ICmpVariant::Eq,
        }
        .into(),
    );

    let early = BasicBlock::new(
        Label(1),
        Ret {
            value: Some(imm(IType::I32, 0)),
        },
    );

    let mut late = BasicBlock::new(
        Label(2),
        Ret {
            value: Some(Operand::Reg(Name(2))),
        },
    );
    late.instructions.push(
        IAdd {
            dest: Name(2),
            ty: i32_ty,
            lhs: Operand::Reg(Name(0)),
            rhs: Operand::Reg(Name(0)),
        }
        .into(),
    );

    function.body.extend([entry, early, late, BasicBlock::new(Label(3), Trap)]);
    function
}

/// Body-less function, defined elsewhere.
pub fn declaration(registry: &TypeRegistry, name: &str) -> Function {
    Function::new(name, vec![(Name(0), registry.ptr())], Some(registry.int(IType::I32)))
}

/// A small program:
///
/// - `main`: exported, two return sites;
/// - `helper`: exported, one return site;
/// - `local`: internal, must never be instrumented;
/// - `puts`: declaration.
pub fn sample_program(registry: &TypeRegistry) -> Module {
    let mut module = Module::new();
    for function in [
        two_exits(registry, "main", Linkage::External),
        leaf(registry, "helper", Linkage::External),
        leaf(registry, "local", Linkage::Internal),
        declaration(registry, "puts"),
    ] {
        module
            .add_function(function)
            .expect("sample program has unique names");
    }
    module
}

/// Module with one `nounwind` function `target` taking the given parameters.
pub fn sampling_module(params: &[Typeref]) -> Module {
    let mut function = Function::new(
        "target",
        params
            .iter()
            .enumerate()
            .map(|(i, ty)| (Name(i as u32), *ty))
            .collect(),
        None,
    );
    function.attributes = FunctionAttributes::NO_UNWIND;
    function.body.push(BasicBlock::new(Label::NIL, Ret { value: None }));

    let mut module = Module::new();
    module
        .add_function(function)
        .expect("single function module");
    module
}

/// Symbol names of the direct calls in `instrs`, in order. Other
/// instructions are reported as `None`.
pub fn callees<'a>(module: &'a Module, instrs: &'a [CkInstr]) -> Vec<Option<&'a str>> {
    instrs
        .iter()
        .map(|instr| match instr {
            CkInstr::Invoke(invoke) => invoke
                .callee()
                .and_then(|fptr| module.symbol_name(&fptr)),
            _ => None,
        })
        .collect()
}

/// String constant passed as argument `index` of a call, if any.
pub fn string_arg(module: &Module, instr: &CkInstr, index: usize) -> Option<String> {
    let CkInstr::Invoke(Invoke { args, .. }) = instr else {
        return None;
    };
    match args.get(index)? {
        Operand::Str(str_ref) => module.pool.string(*str_ref).map(|s| s.to_string_lossy()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_program() {
        let registry = TypeRegistry::default();
        let module = sample_program(&registry);
        assert_eq!(module.functions.len(), 4);
        assert_eq!(module.defined_functions().count(), 3);
        assert!(module.pool.is_empty());
    }
}
