//! In-memory representation of a decoded unit and method lookup by name.

use crate::instruction::Instruction;

/// Index of a method within its [`CompiledUnit`], in declaration order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct MethodId(u32);

impl MethodId {
    /// Creates an ID from a raw declaration index.
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw declaration index.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

/// A method: its name, opaque flags, and owned instruction sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledMethod {
    /// Method name. Overloads share a name and are not distinguished.
    pub name: String,
    /// Access flags, carried through without interpretation.
    pub flags: u16,
    /// The method body in execution order.
    pub instructions: Vec<Instruction>,
}

impl CompiledMethod {
    /// Creates a method with no flags.
    pub fn new(name: impl Into<String>, instructions: Vec<Instruction>) -> Self {
        Self {
            name: name.into(),
            flags: 0,
            instructions,
        }
    }
}

/// A decoded compiled unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledUnit {
    /// Fully qualified unit name, e.g. `host.loader.LoadController`.
    pub name: String,
    /// Methods in declaration order.
    pub methods: Vec<CompiledMethod>,
}

impl CompiledUnit {
    /// Creates a unit from its name and methods.
    pub fn new(name: impl Into<String>, methods: Vec<CompiledMethod>) -> Self {
        Self {
            name: name.into(),
            methods,
        }
    }

    /// Returns every method whose name equals `name` exactly, in declaration order.
    ///
    /// Matching is case-sensitive and ignores signatures, so all overloads of
    /// a name are returned. An empty result is a normal outcome.
    pub fn find_methods(&self, name: &str) -> Vec<MethodId> {
        self.methods
            .iter()
            .enumerate()
            .filter(|(_, m)| m.name == name)
            .map(|(i, _)| MethodId(i as u32))
            .collect()
    }

    /// Returns the method with the given ID.
    pub fn method(&self, id: MethodId) -> Option<&CompiledMethod> {
        self.methods.get(id.0 as usize)
    }

    /// Returns the method with the given ID for modification.
    pub fn method_mut(&mut self, id: MethodId) -> Option<&mut CompiledMethod> {
        self.methods.get_mut(id.0 as usize)
    }
}
