//! Depth-first call-graph walk.
//!
//! Instructions are visited in static program order. A direct call to a
//! function with a body that has not been walked yet is entered immediately,
//! before the caller's next instruction. The walk uses an explicit frame
//! stack, so call-graph depth is bounded only by memory.

use regscan_ir::{Callee, Function, InstKind, Instruction, Linkage, Module};
use rustc_hash::FxHashSet;
use tracing::{debug, trace};

use crate::config::AnalysisConfig;

/// Identity of a walked function within a session.
///
/// Internal functions are private to their module, so two modules may each
/// define one with the same name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FunctionKey {
    External(String),
    Internal { module: usize, name: String },
}

impl FunctionKey {
    pub fn new(module: usize, func: &Function) -> Self {
        match func.linkage {
            Linkage::External => Self::External(func.name.clone()),
            Linkage::Internal => Self::Internal {
                module,
                name: func.name.clone(),
            },
        }
    }
}

/// One instruction reached by the walk.
#[derive(Clone, Copy, Debug)]
pub struct InstSite<'m> {
    pub function: &'m Function,
    pub block: usize,
    pub index: usize,
    pub inst: &'m Instruction,
}

/// What the visitor did with a site.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visit {
    /// Continue normally, entering the callee of a call.
    Continue,
    /// Do not enter the callee of this call.
    SkipCallee,
}

#[derive(Clone, Copy, Debug)]
struct Frame {
    function: usize,
    block: usize,
    index: usize,
}

impl Frame {
    const fn new(function: usize) -> Self {
        Self {
            function,
            block: 0,
            index: 0,
        }
    }
}

/// Root functions of a module walk, in walk order.
pub fn walk_roots(module: &Module, config: &AnalysisConfig) -> Vec<usize> {
    let entry = module
        .function_index(&config.entry_point)
        .filter(|&i| !module.functions()[i].is_declaration());

    let Some(entry) = entry else {
        debug!(
            module = module.name(),
            entry = config.entry_point.as_str(),
            "entry point not defined, walking every function"
        );
        return module.defined_functions().map(|(i, _)| i).collect();
    };

    let mut roots = vec![entry];
    if config.include_unreachable {
        roots.extend(module.defined_functions().map(|(i, _)| i).filter(|&i| i != entry));
    }
    roots
}

/// Walk `module` from `roots`, calling `visit` on every instruction of every
/// function not yet in `visited`. Returns the number of functions walked.
pub fn walk<'m>(
    module: &'m Module,
    module_id: usize,
    roots: &[usize],
    visited: &mut FxHashSet<FunctionKey>,
    mut visit: impl FnMut(InstSite<'m>) -> Visit,
) -> usize {
    let functions = module.functions();
    let mut walked = 0;
    let mut enter = |index: usize, visited: &mut FxHashSet<FunctionKey>| {
        let func = &functions[index];
        if func.is_declaration() || !visited.insert(FunctionKey::new(module_id, func)) {
            return false;
        }
        trace!("enter {}", func.name);
        walked += 1;
        true
    };

    let mut stack: Vec<Frame> = Vec::new();
    for &root in roots {
        if !enter(root, visited) {
            continue;
        }
        stack.push(Frame::new(root));

        while let Some(frame) = stack.last_mut() {
            let function = &functions[frame.function];
            let Some(block) = function.blocks.get(frame.block) else {
                stack.pop();
                continue;
            };
            let Some(inst) = block.instructions.get(frame.index) else {
                frame.block += 1;
                frame.index = 0;
                continue;
            };
            let site = InstSite {
                function,
                block: frame.block,
                index: frame.index,
                inst,
            };
            frame.index += 1;

            if visit(site) == Visit::SkipCallee {
                continue;
            }
            if let InstKind::Call {
                callee: Callee::Direct(name),
                ..
            } = &inst.kind
            {
                if let Some(callee) = module.function_index(name) {
                    if enter(callee, visited) {
                        stack.push(Frame::new(callee));
                    }
                }
            }
        }
    }
    walked
}

#[cfg(test)]
mod tests {
    use super::*;
    use regscan_ir::parse_module;

    const MODULE: &str = r"
define internal void @leaf() {
  store volatile i32 1, ptr null, align 4
  ret void
}

define void @a() {
  call void @leaf()
  store volatile i32 2, ptr null, align 4
  ret void
}

define void @b() {
  call void @leaf()
  ret void
}

define void @orphan() {
  ret void
}

define i32 @main() {
entry:
  call void @a()
  br label %next

next:
  call void @b()
  call void @missing()
  ret i32 0
}

declare void @missing()
";

    fn trace_walk(module: &Module, config: &AnalysisConfig) -> Vec<String> {
        let mut visited = FxHashSet::default();
        let mut order = Vec::new();
        walk(module, 0, &walk_roots(module, config), &mut visited, |site| {
            order.push(format!("{}:{}:{}", site.function.name, site.block, site.index));
            Visit::Continue
        });
        order
    }

    #[test]
    fn test_preorder_with_immediate_descent() {
        let module = parse_module(MODULE, "w.ll").unwrap();
        let order = trace_walk(&module, &AnalysisConfig::default());
        assert_eq!(
            order,
            vec![
                "main:0:0", "a:0:0", "leaf:0:0", "leaf:0:1", "a:0:1", "a:0:2", "main:0:1",
                "main:1:0", "b:0:0", "b:0:1", "main:1:1", "main:1:2",
            ]
        );
    }

    #[test]
    fn test_unreachable_and_missing_entry() {
        let module = parse_module(MODULE, "w.ll").unwrap();
        let order = trace_walk(&module, &AnalysisConfig::default().with_unreachable(true));
        assert_eq!(order.last().map(String::as_str), Some("orphan:0:0"));

        let order = trace_walk(&module, &AnalysisConfig::default().with_entry_point("reset"));
        // Every defined function is a root, in module order
        assert_eq!(order.first().map(String::as_str), Some("leaf:0:0"));
        assert_eq!(order.len(), 12 + 1);
    }

    #[test]
    fn test_skip_callee_and_visited_keys() {
        let module = parse_module(MODULE, "w.ll").unwrap();
        let mut visited = FxHashSet::default();
        let walked = walk(&module, 0, &walk_roots(&module, &AnalysisConfig::default()), &mut visited, |site| {
            if site.inst.is_call() {
                Visit::SkipCallee
            } else {
                Visit::Continue
            }
        });
        assert_eq!(walked, 1);

        let leaf = module.function("leaf").unwrap();
        assert_eq!(
            FunctionKey::new(3, leaf),
            FunctionKey::Internal {
                module: 3,
                name: "leaf".into()
            }
        );
        assert_eq!(
            FunctionKey::new(3, module.function("a").unwrap()),
            FunctionKey::External("a".into())
        );
    }
}
