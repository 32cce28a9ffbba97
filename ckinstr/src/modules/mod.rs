//! Module, function and basic-block structure of the IR.
//!
//! A [`Module`] owns its defined functions and a [`ConstantPool`] holding the
//! string constants and external declarations the functions refer to. Each
//! [`Function`] is a control-flow graph stored as an ordered list of
//! [`BasicBlock`]s, the first one being the entry block. Submodules:
//!
//! - `operand`: SSA names, labels and operands
//! - `int` / `misc`: concrete instruction forms
//! - `instructions`: the [`CkInstr`] tagged union and the [`Instruction`] trait
//! - `terminator`: block terminators
//! - `symbol`: signatures, external functions, function pointers
//! - `pool`: the per-module constant pool
//! - `fmt`: textual rendering
use std::collections::BTreeMap;

use bitflags::bitflags;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    modules::{
        instructions::{CkInstr, Instruction},
        operand::{Label, Name},
        pool::ConstantPool,
        symbol::{FunctionPointer, Signature},
        terminator::Terminator,
    },
    types::Typeref,
    utils::Error,
};

pub mod fmt;
pub mod instructions;
pub mod int;
pub mod misc;
pub mod operand;
pub mod pool;
pub mod symbol;
pub mod terminator;

/// Symbol linkage of a function.
#[derive(Debug, Default, Clone, Copy, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Linkage {
    /// Only reachable from within this module and absent from the object's
    /// symbol table.
    Private,

    /// Local symbol, the `static` of C.
    Internal,

    /// Visible to, and possibly defined by, other modules.
    #[default]
    External,
}

impl Linkage {
    pub fn to_str(&self) -> &'static str {
        match self {
            Linkage::Private => "private",
            Linkage::Internal => "internal",
            Linkage::External => "external",
        }
    }
}

/// Calling convention of a function or declaration.
#[derive(Debug, Default, Clone, Copy, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CallingConvention {
    /// Target C calling convention.
    #[default]
    C,
    /// Pass as much as possible in registers.
    FastC,
    /// Optimize the caller for calls that are rarely executed.
    ColdC,
    /// Guaranteed tail calls.
    TailC,
    /// Target-specific convention by number.
    Numbered(u32),
}

bitflags! {
    /// Function-level guarantees.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct FunctionAttributes: u32 {
        /// The function never unwinds into its caller.
        const NO_UNWIND = 1 << 0;
    }
}

/// A straight-line sequence of instructions closed by one terminator.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BasicBlock {
    pub label: Label,
    pub instructions: Vec<CkInstr>,
    pub terminator: Terminator,
}

impl BasicBlock {
    pub fn new(label: Label, terminator: impl Into<Terminator>) -> Self {
        Self {
            label,
            instructions: Vec::new(),
            terminator: terminator.into(),
        }
    }

    /// Index of the first instruction that is neither a phi node nor a
    /// meta-instruction, or [`Slot::Terminator`] if there is none.
    pub fn first_non_metadata(&self) -> Slot {
        self.instructions
            .iter()
            .position(|instr| !instr.is_metadata())
            .map(Slot::Instr)
            .unwrap_or(Slot::Terminator)
    }
}

/// Position inside a basic block.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Slot {
    /// The instruction at this index.
    Instr(usize),
    /// The block terminator.
    Terminator,
}

/// Reference to an instruction or terminator of a function. New
/// instructions are inserted immediately before the referenced one.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InsertPoint {
    /// Index of the block in declaration order.
    pub block: usize,
    pub slot: Slot,
}

/// A function made of basic blocks and parameter metadata.
///
/// `body` is kept in declaration order and its first block is the entry.
/// An empty body marks a declaration whose definition lives elsewhere.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Function {
    pub uuid: Uuid,
    pub name: String,
    pub linkage: Linkage,
    pub attributes: FunctionAttributes,
    pub params: Vec<(Name, Typeref)>,
    pub return_type: Option<Typeref>,
    pub cconv: CallingConvention,
    pub body: Vec<BasicBlock>,
}

impl Function {
    /// Empty function (a declaration until blocks are pushed).
    pub fn new(
        name: impl Into<String>,
        params: Vec<(Name, Typeref)>,
        return_type: Option<Typeref>,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            linkage: Linkage::default(),
            attributes: FunctionAttributes::default(),
            params,
            return_type,
            cconv: CallingConvention::default(),
            body: Vec::new(),
        }
    }

    /// `true` if the function has no body.
    pub fn is_declaration(&self) -> bool {
        self.body.is_empty()
    }

    /// Prototype of this function.
    pub fn signature(&self) -> Signature {
        Signature {
            param_types: self.params.iter().map(|(_, ty)| *ty).collect(),
            return_type: self.return_type,
            cconv: self.cconv,
        }
    }

    pub fn entry_block(&self) -> Option<&BasicBlock> {
        self.body.first()
    }

    pub fn block(&self, label: Label) -> Option<&BasicBlock> {
        self.body.iter().find(|bb| bb.label == label)
    }

    /// Number of instructions over all blocks, terminators excluded.
    pub fn num_instructions(&self) -> usize {
        self.body.iter().map(|bb| bb.instructions.len()).sum()
    }

    /// Smallest SSA name not used by any parameter or destination.
    pub fn next_available_name(&self) -> Name {
        let params = self.params.iter().map(|(name, _)| name.0);
        let dests = self
            .body
            .iter()
            .flat_map(|bb| bb.instructions.iter())
            .filter_map(|instr| instr.destination())
            .map(|name| name.0);
        params
            .chain(dests)
            .max()
            .map(|max| Name(max + 1))
            .unwrap_or(Name(0))
    }

    /// Smallest label not used by any block.
    pub fn next_available_label(&self) -> Label {
        self.body
            .iter()
            .map(|bb| bb.label.0)
            .max()
            .map(|max| Label(max + 1))
            .unwrap_or(Label::NIL)
    }

    /// Insert `instr` immediately before the instruction at `point`.
    ///
    /// Inserting before `Slot::Instr(i)` shifts that instruction and every
    /// following one by one position; terminator slots never move.
    pub fn insert_before(
        &mut self,
        point: InsertPoint,
        instr: impl Into<CkInstr>,
    ) -> Result<(), Error> {
        let name = &self.name;
        let bb = self
            .body
            .get_mut(point.block)
            .ok_or_else(|| Error::InvalidInsertPoint {
                function: name.clone(),
                point,
            })?;
        match point.slot {
            Slot::Instr(i) if i < bb.instructions.len() => bb.instructions.insert(i, instr.into()),
            Slot::Instr(_) => {
                return Err(Error::InvalidInsertPoint {
                    function: name.clone(),
                    point,
                });
            }
            Slot::Terminator => bb.instructions.push(instr.into()),
        }
        Ok(())
    }

    /// Append a block at the end of the body.
    pub fn push_block(&mut self, block: BasicBlock) -> Result<(), Error> {
        if self.body.iter().any(|bb| bb.label == block.label) {
            return Err(Error::BlockLabelAlreadyExists {
                function: self.name.clone(),
                label: block.label,
            });
        }
        self.body.push(block);
        Ok(())
    }
}

/// A compilation unit: defined functions plus the constant pool.
///
/// Function names are unique within a module; [`Module::add_function`]
/// enforces it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Module {
    pub functions: BTreeMap<Uuid, Function>,
    pub pool: ConstantPool,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `function`, failing if its name is already taken.
    pub fn add_function(&mut self, function: Function) -> Result<Uuid, Error> {
        if self.function_by_name(&function.name).is_some() {
            return Err(Error::DuplicateFunctionName {
                name: function.name,
            });
        }
        let uuid = function.uuid;
        self.functions.insert(uuid, function);
        Ok(uuid)
    }

    pub fn function(&self, uuid: Uuid) -> Option<&Function> {
        self.functions.get(&uuid)
    }

    pub fn function_mut(&mut self, uuid: Uuid) -> Option<&mut Function> {
        self.functions.get_mut(&uuid)
    }

    pub fn function_by_name(&self, name: &str) -> Option<&Function> {
        self.functions.values().find(|f| f.name == name)
    }

    /// Functions with a body.
    pub fn defined_functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.values().filter(|f| !f.is_declaration())
    }

    /// Get-or-insert a declaration for `name`.
    ///
    /// A function of this module with the same name and signature resolves
    /// to itself; otherwise the request goes to the constant pool. A name
    /// clash with a different signature is an
    /// [`Error::InconsistentDeclaration`].
    pub fn declare_external(
        &mut self,
        name: &str,
        signature: Signature,
    ) -> Result<FunctionPointer, Error> {
        if let Some(function) = self.function_by_name(name) {
            let existing = function.signature();
            if existing != signature {
                return Err(Error::InconsistentDeclaration {
                    name: name.to_string(),
                    existing: Box::new(existing),
                    requested: Box::new(signature),
                });
            }
            return Ok(FunctionPointer::Internal(function.uuid));
        }
        self.pool.declare(name, signature)
    }

    /// Symbol name behind `fptr`, internal or external.
    pub fn symbol_name(&self, fptr: &FunctionPointer) -> Option<&str> {
        match fptr {
            FunctionPointer::Internal(uuid) => self.functions.get(uuid).map(|f| f.name.as_str()),
            FunctionPointer::External(uuid) => {
                self.pool.declaration(*uuid).map(|d| d.name.as_str())
            }
        }
    }
}
