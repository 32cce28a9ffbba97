use ckinstr::{
    consts::IConst,
    modules::{
        BasicBlock, Function, InsertPoint, Linkage, Module, Slot,
        instructions::{CkInstr, Instruction},
        int::{IAdd, ICmp, ICmpVariant, IMul, ISub},
        misc::{Invoke, MetaAssert, MetaAssume, Phi, Select},
        operand::{Label, Name, Operand},
        symbol::{FunctionPointer, Signature},
        terminator::{Jump, Ret},
    },
    types::{TypeRegistry, primary::IType},
    utils::Error,
};

fn add_one(registry: &TypeRegistry) -> Function {
    let i32_ty = registry.int(IType::I32);
    let mut function = Function::new("add_one", vec![(Name(0), i32_ty)], Some(i32_ty));
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
            rhs: Operand::Imm(IConst::new(IType::I32, 1).unwrap()),
        }
        .into(),
    );
    function.push_block(entry).unwrap();
    function
}

#[test]
fn test_add_function_rejects_duplicate_names() {
    let registry = TypeRegistry::default();
    let mut module = Module::new();
    module.add_function(add_one(&registry)).unwrap();

    let err = module.add_function(add_one(&registry)).unwrap_err();
    assert_eq!(
        err,
        Error::DuplicateFunctionName {
            name: "add_one".to_string()
        }
    );
    assert_eq!(module.functions.len(), 1);
}

#[test]
fn test_intern_deduplicates_strings() {
    let registry = TypeRegistry::default();
    let mut module = Module::new();

    let a = module.pool.intern(&registry, "Entering ");
    let b = module.pool.intern(&registry, "Exiting ");
    let c = module.pool.intern(&registry, "Entering ");

    assert_eq!(a, c);
    assert_ne!(a, b);
    assert_eq!(module.pool.num_strings(), 2);
    assert_eq!(module.pool.string(a).unwrap().to_string_lossy(), "Entering ");
}

#[test]
fn test_declare_external_is_get_or_insert() {
    let registry = TypeRegistry::default();
    let mut module = Module::new();
    let sig = Signature::void(vec![registry.ptr(), registry.ptr()]);

    let first = module.declare_external("checkpoint", sig.clone()).unwrap();
    let second = module.declare_external("checkpoint", sig).unwrap();

    assert_eq!(first, second);
    assert!(matches!(first, FunctionPointer::External(_)));
    assert_eq!(module.pool.num_declarations(), 1);
    assert_eq!(module.symbol_name(&first), Some("checkpoint"));
}

#[test]
fn test_declare_external_conflicting_signature() {
    let registry = TypeRegistry::default();
    let mut module = Module::new();
    module
        .declare_external("initialize", Signature::void(vec![]))
        .unwrap();

    let err = module
        .declare_external("initialize", Signature::void(vec![registry.ptr()]))
        .unwrap_err();
    assert!(err.is_inconsistent_declaration());
    assert_eq!(module.pool.num_declarations(), 1);
}

#[test]
fn test_declare_external_resolves_local_definition() {
    let registry = TypeRegistry::default();
    let mut module = Module::new();
    let function = add_one(&registry);
    let signature = function.signature();
    let uuid = module.add_function(function).unwrap();

    let fptr = module.declare_external("add_one", signature).unwrap();
    assert_eq!(fptr, FunctionPointer::Internal(uuid));
    assert!(module.pool.is_empty());

    let err = module
        .declare_external("add_one", Signature::void(vec![]))
        .unwrap_err();
    assert!(err.is_inconsistent_declaration());
}

#[test]
fn test_insert_before_shifts_following_instructions() {
    let registry = TypeRegistry::default();
    let mut module = Module::new();
    let callee = module
        .declare_external("probe", Signature::void(vec![]))
        .unwrap();
    let mut function = add_one(&registry);

    let point = InsertPoint {
        block: 0,
        slot: Slot::Instr(0),
    };
    function
        .insert_before(point, Invoke::void_call(callee, vec![]))
        .unwrap();
    function
        .insert_before(
            InsertPoint {
                block: 0,
                slot: Slot::Terminator,
            },
            Invoke::void_call(callee, vec![]),
        )
        .unwrap();

    let instructions = &function.body[0].instructions;
    assert_eq!(instructions.len(), 3);
    assert!(instructions[0].is_invoke());
    assert!(matches!(instructions[1], CkInstr::IAdd(_)));
    assert!(instructions[2].is_invoke());
    assert!(function.body[0].terminator.is_return());
}

#[test]
fn test_insert_before_out_of_range() {
    let registry = TypeRegistry::default();
    let mut function = add_one(&registry);
    let snapshot = function.clone();

    for point in [
        InsertPoint {
            block: 1,
            slot: Slot::Terminator,
        },
        InsertPoint {
            block: 0,
            slot: Slot::Instr(1),
        },
    ] {
        let err = function
            .insert_before(point, MetaAssume {
                condition: Operand::Imm(IConst::new(IType::I1, 1).unwrap()),
            })
            .unwrap_err();
        assert!(err.is_invalid_insert_point());
    }
    assert_eq!(function, snapshot);
}

#[test]
fn test_first_non_metadata_skips_phi_and_meta() {
    let registry = TypeRegistry::default();
    let i32_ty = registry.int(IType::I32);
    let mut block = BasicBlock::new(Label(1), Jump { target: Label(2) });
    block.instructions.push(CkInstr::Phi(Phi {
        dest: Name(3),
        ty: i32_ty,
        values: vec![(Label::NIL, Operand::Reg(Name(0)))],
    }));
    block.instructions.push(CkInstr::MetaAssume(MetaAssume {
        condition: Operand::Imm(IConst::new(IType::I1, 1).unwrap()),
    }));
    assert_eq!(block.first_non_metadata(), Slot::Terminator);

    block.instructions.push(
        IAdd {
            dest: Name(4),
            ty: i32_ty,
            lhs: Operand::Reg(Name(3)),
            rhs: Operand::Reg(Name(3)),
        }
        .into(),
    );
    assert_eq!(block.first_non_metadata(), Slot::Instr(2));
    assert!(block.instructions[0].is_metadata());
    assert!(!block.instructions[2].is_metadata());
}

#[test]
fn test_next_available_name_and_label() {
    let registry = TypeRegistry::default();
    let mut function = add_one(&registry);
    assert_eq!(function.next_available_name(), Name(2));
    assert_eq!(function.next_available_label(), Label(1));

    let err = function
        .push_block(BasicBlock::new(Label::NIL, Ret { value: None }))
        .unwrap_err();
    assert!(err.is_block_label_already_exists());

    let empty = Function::new("decl", vec![], None);
    assert!(empty.is_declaration());
    assert_eq!(empty.next_available_name(), Name(0));
    assert_eq!(empty.next_available_label(), Label::NIL);
}

#[test]
fn test_module_printing() {
    let registry = TypeRegistry::default();
    let mut module = Module::new();
    let tag = module.pool.intern(&registry, "Entering ");
    let hook = module
        .declare_external("checkpoint", Signature::void(vec![registry.ptr(), registry.ptr()]))
        .unwrap();

    let mut function = add_one(&registry);
    function.linkage = Linkage::Internal;
    function
        .insert_before(
            InsertPoint {
                block: 0,
                slot: Slot::Instr(0),
            },
            Invoke::void_call(hook, vec![Operand::Str(tag), Operand::Str(tag)]),
        )
        .unwrap();
    module.add_function(function).unwrap();

    let text = module.fmt(&registry).to_string();
    assert!(text.contains("@str.0 = constant [10 x i8] c\"Entering \\00\""));
    assert!(text.contains("declare @checkpoint: void (ptr, ptr)"));
    assert!(text.contains("define internal i32 @add_one(%0: i32) {"));
    assert!(text.contains("  invoke @checkpoint, ptr @str.0, ptr @str.0"));
    assert!(text.contains("  %1: i32 = iadd %0, i32 1"));
    assert!(text.contains("  ret %1"));
}

#[test]
fn test_instruction_printing() {
    let registry = TypeRegistry::default();
    let i1 = registry.int(IType::I1);
    let i32_ty = registry.int(IType::I32);
    let ten = Operand::Imm(IConst::new(IType::I32, 10).unwrap());

    let instrs: Vec<CkInstr> = vec![
        ISub {
            dest: Name(1),
            ty: i32_ty,
            lhs: Operand::Reg(Name(0)),
            rhs: ten.clone(),
        }
        .into(),
        IMul {
            dest: Name(2),
            ty: i32_ty,
            lhs: Operand::Reg(Name(1)),
            rhs: Operand::Reg(Name(1)),
        }
        .into(),
        ICmp {
            dest: Name(3),
            ty: i1,
            lhs: Operand::Reg(Name(0)),
            rhs: ten,
            variant: ICmpVariant::Ult,
        }
        .into(),
        Select {
            dest: Name(4),
            condition: Operand::Reg(Name(3)),
            true_value: Operand::Reg(Name(1)),
            false_value: Operand::Reg(Name(2)),
            ty: i32_ty,
        }
        .into(),
        MetaAssert {
            condition: Operand::Reg(Name(3)),
        }
        .into(),
    ];

    let lines: Vec<String> = instrs
        .iter()
        .map(|instr| instr.fmt(&registry, None).to_string())
        .collect();
    assert_eq!(
        lines,
        vec![
            "%1: i32 = isub %0, i32 10",
            "%2: i32 = imul %1, %1",
            "%3: i1 = icmp.ult %0, i32 10",
            "%4: i32 = select %3, %1, %2",
            "!assert %3",
        ]
    );

    assert!(instrs[3].is_select());
    assert_eq!(instrs[3].operands().count(), 3);
    assert_eq!(instrs[3].destination_type(), Some(i32_ty));
    assert!(instrs[4].is_metadata());
    assert_eq!(instrs[4].destination(), None);
}
