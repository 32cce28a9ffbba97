//! Pretty-print helpers for instructions, functions and modules.
use crate::{
    modules::{
        CallingConvention, Function, Linkage, Module,
        instructions::{CkInstr, Instruction},
    },
    types::TypeRegistry,
};

impl std::fmt::Display for CallingConvention {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallingConvention::C => write!(f, "ccc"),
            CallingConvention::FastC => write!(f, "fastcc"),
            CallingConvention::ColdC => write!(f, "coldcc"),
            CallingConvention::TailC => write!(f, "tailcc"),
            CallingConvention::Numbered(n) => write!(f, "cc{}", n),
        }
    }
}

impl std::fmt::Display for Linkage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

impl CkInstr {
    /// Build a formatting helper that renders the instruction using the supplied registries.
    pub fn fmt<'a>(
        &'a self,
        registry: &'a TypeRegistry,
        module: Option<&'a Module>,
    ) -> impl std::fmt::Display + Copy + 'a {
        #[derive(Clone, Copy)]
        struct Fmt<'a> {
            instr: &'a CkInstr,
            registry: &'a TypeRegistry,
            module: Option<&'a Module>,
        }

        impl Fmt<'_> {
            /// Returns `true` when the operands were already written.
            fn specific_fmt(
                &self,
                f: &mut std::fmt::Formatter<'_>,
            ) -> Result<bool, std::fmt::Error> {
                match self.instr {
                    CkInstr::ICmp(cmp) => {
                        write!(f, ".{}", cmp.variant.to_str())?;
                        Ok(false)
                    }
                    CkInstr::Phi(phi) => {
                        write!(f, " ")?;
                        for (i, (label, operand)) in phi.values.iter().enumerate() {
                            if i > 0 {
                                write!(f, ", ")?;
                            }
                            write!(f, "[{}, {}]", operand.fmt(self.module), label)?;
                        }
                        Ok(true)
                    }
                    CkInstr::Invoke(invoke) => {
                        write!(f, " {}", invoke.function.fmt(self.module))?;
                        for arg in &invoke.args {
                            write!(f, ", {}", arg.fmt(self.module))?;
                        }
                        Ok(true)
                    }
                    _ => Ok(false),
                }
            }
        }

        impl std::fmt::Display for Fmt<'_> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                if let Some(dest) = self.instr.destination() {
                    match self.instr.destination_type() {
                        Some(ty) => write!(f, "{}: {} = ", dest, self.registry.fmt(ty))?,
                        None => write!(f, "{} = ", dest)?,
                    }
                }
                write!(f, "{}", self.instr.op().opname())?;

                if self.specific_fmt(f)? {
                    return Ok(());
                }

                write!(f, " ")?;
                for (i, operand) in self.instr.operands().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", operand.fmt(self.module))?;
                }
                Ok(())
            }
        }

        Fmt {
            instr: self,
            registry,
            module,
        }
    }
}

impl Function {
    /// Build a formatting helper that renders the function in textual form.
    ///
    /// Declarations (no body) render as a single `declare` line.
    pub fn fmt<'a>(
        &'a self,
        registry: &'a TypeRegistry,
        module: Option<&'a Module>,
    ) -> impl std::fmt::Display + 'a {
        struct Fmt<'a> {
            function: &'a Function,
            registry: &'a TypeRegistry,
            module: Option<&'a Module>,
        }

        impl std::fmt::Display for Fmt<'_> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let function = self.function;
                write!(
                    f,
                    "{} {}",
                    if function.is_declaration() {
                        "declare"
                    } else {
                        "define"
                    },
                    function.linkage
                )?;
                if function.cconv != CallingConvention::C {
                    write!(f, " {}", function.cconv)?;
                }
                match function.return_type {
                    Some(ty) => write!(f, " {}", self.registry.fmt(ty))?,
                    None => write!(f, " void")?,
                }
                write!(f, " @{}(", function.name)?;
                for (i, (name, ty)) in function.params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, self.registry.fmt(*ty))?;
                }
                write!(f, ")")?;
                if !function.attributes.is_empty() {
                    write!(f, " #{:?}", function.attributes)?;
                }

                if function.is_declaration() {
                    return writeln!(f);
                }

                writeln!(f, " {{")?;
                for block in &function.body {
                    writeln!(f, "{}:", block.label)?;
                    for instr in &block.instructions {
                        writeln!(f, "  {}", instr.fmt(self.registry, self.module))?;
                    }
                    writeln!(f, "  {}", block.terminator.fmt(self.module))?;
                }
                writeln!(f, "}}")
            }
        }

        Fmt {
            function: self,
            registry,
            module,
        }
    }
}

impl Module {
    /// Build a formatting helper that renders the constant pool followed by
    /// every function of the module.
    pub fn fmt<'a>(&'a self, registry: &'a TypeRegistry) -> impl std::fmt::Display + 'a {
        struct Fmt<'a> {
            module: &'a Module,
            registry: &'a TypeRegistry,
        }

        impl std::fmt::Display for Fmt<'_> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                for (str_ref, constant) in self.module.pool.strings() {
                    writeln!(
                        f,
                        "{} = constant {} {}",
                        str_ref,
                        self.registry.fmt(constant.ty),
                        constant.escaped()
                    )?;
                }
                for decl in self.module.pool.declarations() {
                    writeln!(f, "declare @{}: {}", decl.name, decl.signature.fmt(self.registry))?;
                }
                if !self.module.pool.is_empty() {
                    writeln!(f)?;
                }
                for function in self.module.functions.values() {
                    writeln!(f, "{}", function.fmt(self.registry, Some(self.module)))?;
                }
                Ok(())
            }
        }

        Fmt {
            module: self,
            registry,
        }
    }
}
