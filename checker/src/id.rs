// id.rs: Arena identifiers for flow IR programs
//
// Modules live in `Program::modules` and functions in `Module::functions`;
// these IDs index those vectors. They are assigned in declaration order, so
// iterating IDs in ascending order is the same as a declaration-order scan.

/// Index of a module within `Program::modules`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(pub u32);

/// A function, addressed by its owning module and its index within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId {
    pub module: ModuleId,
    pub index: u32,
}

impl ModuleId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl FunctionId {
    pub fn new(module: ModuleId, index: usize) -> Self {
        Self {
            module,
            index: index as u32,
        }
    }
}
