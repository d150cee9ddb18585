//! Module, function and basic block IR.

use rustc_hash::FxHashMap;

use crate::instr::{InstKind, Instruction};
use crate::types::Type;
use crate::value::Operand;

/// Symbol linkage, reduced to what matters for identity across modules.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Linkage {
    /// Visible across modules (the same name is the same function).
    #[default]
    External,
    /// `internal` or `private`: local to the defining module.
    Internal,
}

/// Global variable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Global {
    pub name: String,
    /// Value type of the global.
    pub ty: Type,
    /// Initializer, if the global is defined in this module.
    pub initializer: Option<Operand>,
    /// `constant` rather than `global`.
    pub is_constant: bool,
}

/// Function parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Param {
    pub ty: Type,
    /// Local name without the `%` sigil.
    pub name: String,
}

/// IR for a basic block (sequence of instructions).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BasicBlock {
    /// Block label, if printed.
    pub label: Option<String>,
    /// Instructions in the block.
    pub instructions: Vec<Instruction>,
}

impl BasicBlock {
    /// Create a new block.
    pub fn new(label: Option<String>) -> Self {
        Self {
            label,
            instructions: Vec::new(),
        }
    }

    /// Get number of instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Check if block is empty.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

/// Where a local value is defined.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueDef {
    /// Function parameter by position.
    Param(usize),
    /// Instruction result.
    Inst { block: usize, index: usize },
}

/// Function definition or declaration.
#[derive(Clone, Debug)]
pub struct Function {
    pub name: String,
    pub linkage: Linkage,
    pub params: Vec<Param>,
    /// Basic blocks in source order; empty for declarations.
    pub blocks: Vec<BasicBlock>,
    defs: FxHashMap<String, ValueDef>,
}

impl Function {
    /// Create a function and index its local definitions.
    pub fn new(name: String, linkage: Linkage, params: Vec<Param>, blocks: Vec<BasicBlock>) -> Self {
        let mut defs = FxHashMap::default();
        for (i, param) in params.iter().enumerate() {
            defs.insert(param.name.clone(), ValueDef::Param(i));
        }
        for (b, block) in blocks.iter().enumerate() {
            for (i, inst) in block.instructions.iter().enumerate() {
                if let Some(result) = &inst.result {
                    defs.insert(result.clone(), ValueDef::Inst { block: b, index: i });
                }
            }
        }
        Self {
            name,
            linkage,
            params,
            blocks,
            defs,
        }
    }

    /// Check if this is a declaration (no body).
    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Look up where a local value is defined.
    pub fn definition(&self, name: &str) -> Option<ValueDef> {
        self.defs.get(name).copied()
    }

    /// Instruction defining a local value, if it is an instruction result.
    pub fn defining_instruction(&self, name: &str) -> Option<&Instruction> {
        match self.definition(name)? {
            ValueDef::Inst { block, index } => self.instruction(block, index),
            ValueDef::Param(_) => None,
        }
    }

    /// Instruction by position.
    pub fn instruction(&self, block: usize, index: usize) -> Option<&Instruction> {
        self.blocks.get(block)?.instructions.get(index)
    }

    /// Total instruction count across all blocks.
    pub fn instruction_count(&self) -> usize {
        self.blocks.iter().map(BasicBlock::len).sum()
    }
}

/// A direct call site.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallSite {
    /// Index of the calling function in the module.
    pub function: usize,
    pub block: usize,
    pub index: usize,
}

/// Parsed IR module.
#[derive(Clone, Debug)]
pub struct Module {
    name: String,
    source_filename: Option<String>,
    globals: Vec<Global>,
    functions: Vec<Function>,
    global_index: FxHashMap<String, usize>,
    function_index: FxHashMap<String, usize>,
    call_sites: FxHashMap<String, Vec<CallSite>>,
}

impl Module {
    /// Build a module and its lookup indexes.
    pub fn new(
        name: impl Into<String>,
        source_filename: Option<String>,
        globals: Vec<Global>,
        functions: Vec<Function>,
    ) -> Self {
        let global_index = globals
            .iter()
            .enumerate()
            .map(|(i, g)| (g.name.clone(), i))
            .collect();

        let mut function_index = FxHashMap::default();
        let mut call_sites: FxHashMap<String, Vec<CallSite>> = FxHashMap::default();
        for (f, func) in functions.iter().enumerate() {
            // A definition wins over an earlier declaration of the same name
            if !func.is_declaration() || !function_index.contains_key(&func.name) {
                function_index.insert(func.name.clone(), f);
            }
            for (b, block) in func.blocks.iter().enumerate() {
                for (i, inst) in block.instructions.iter().enumerate() {
                    if let InstKind::Call { callee, .. } = &inst.kind {
                        if let Some(target) = callee.name() {
                            call_sites.entry(target.to_string()).or_default().push(CallSite {
                                function: f,
                                block: b,
                                index: i,
                            });
                        }
                    }
                }
            }
        }

        Self {
            name: name.into(),
            source_filename,
            globals,
            functions,
            global_index,
            function_index,
            call_sites,
        }
    }

    /// Module name (usually the input path).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `source_filename` from the module header.
    pub fn source_filename(&self) -> Option<&str> {
        self.source_filename.as_deref()
    }

    /// All functions in module order.
    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    /// All globals in module order.
    pub fn globals(&self) -> &[Global] {
        &self.globals
    }

    /// Index of a function by name.
    pub fn function_index(&self, name: &str) -> Option<usize> {
        self.function_index.get(name).copied()
    }

    /// Look up a function by name.
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.function_index(name).map(|i| &self.functions[i])
    }

    /// Look up a global by name.
    pub fn global(&self, name: &str) -> Option<&Global> {
        self.global_index.get(name).map(|&i| &self.globals[i])
    }

    /// Direct call sites targeting `callee`, in module order.
    pub fn call_sites(&self, callee: &str) -> &[CallSite] {
        self.call_sites.get(callee).map_or(&[], Vec::as_slice)
    }

    /// Instruction at a call site.
    pub fn call_site_instruction(&self, site: CallSite) -> Option<&Instruction> {
        self.functions.get(site.function)?.instruction(site.block, site.index)
    }

    /// Iterate over functions that have a body.
    pub fn defined_functions(&self) -> impl Iterator<Item = (usize, &Function)> {
        self.functions
            .iter()
            .enumerate()
            .filter(|(_, f)| !f.is_declaration())
    }
}
