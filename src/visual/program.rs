//! CPU-side program state: uniforms and filter hooks.
//!
//! GPU submission lives behind [`RenderBackend`](crate::backend::RenderBackend);
//! a `Program` only records what a draw needs — the bound transform, the
//! color, and the shader statement hooks filters insert into. Each view of a
//! visual instantiates its own `Program`; geometry is never duplicated, it
//! stays in the [`VisualShare`](super::VisualShare).

use std::collections::HashMap;

use crate::color::Color;
use crate::transform::Transform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPosition {
    Pre,
    Post,
}

/// A program input value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Uniform {
    Mat4(Transform),
    Color(Color),
    Float(f32),
}

/// An ordered list of shader statements inserted at one hook point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementList {
    statements: Vec<String>,
}

impl StatementList {
    pub fn push(&mut self, statement: impl Into<String>) {
        self.statements.push(statement.into());
    }

    pub fn remove(&mut self, statement: &str) -> bool {
        if let Some(pos) = self.statements.iter().position(|s| s == statement) {
            self.statements.remove(pos);
            true
        } else {
            false
        }
    }

    pub fn statements(&self) -> &[String] {
        &self.statements
    }
}

/// Per-view program instantiation.
#[derive(Debug, Clone, Default)]
pub struct Program {
    uniforms: HashMap<String, Uniform>,
    hooks: HashMap<(ShaderStage, HookPosition), StatementList>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_uniform(&mut self, name: impl Into<String>, value: Uniform) {
        self.uniforms.insert(name.into(), value);
    }

    pub fn uniform(&self, name: &str) -> Option<&Uniform> {
        self.uniforms.get(name)
    }

    /// The bound visual→render transform, identity until bound.
    pub fn transform(&self) -> Transform {
        match self.uniforms.get("transform") {
            Some(Uniform::Mat4(tr)) => *tr,
            _ => Transform::IDENTITY,
        }
    }

    /// The bound flat color, white until bound.
    pub fn color(&self) -> Color {
        match self.uniforms.get("color") {
            Some(Uniform::Color(c)) => *c,
            _ => Color::WHITE,
        }
    }

    /// Get-or-create the statement list at a hook point. Idempotent: the
    /// same key always yields the same list.
    pub fn hook(&mut self, stage: ShaderStage, position: HookPosition) -> &mut StatementList {
        self.hooks.entry((stage, position)).or_default()
    }

    #[cfg(test)]
    pub(crate) fn hook_statements(
        &self,
        stage: ShaderStage,
        position: HookPosition,
    ) -> Option<&StatementList> {
        self.hooks.get(&(stage, position))
    }
}

/// A filter modifies the appearance or behavior of a visual by inserting a
/// statement into one of its program's hooks.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    name: String,
    stage: ShaderStage,
    position: HookPosition,
    statement: String,
}

impl Filter {
    pub fn new(
        name: impl Into<String>,
        stage: ShaderStage,
        position: HookPosition,
        statement: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            stage,
            position,
            statement: statement.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn apply(&self, program: &mut Program) {
        program.hook(self.stage, self.position).push(&self.statement);
    }

    pub(crate) fn remove(&self, program: &mut Program) {
        if let Some(list) = program.hooks.get_mut(&(self.stage, self.position)) {
            list.remove(&self.statement);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hook_is_idempotent() {
        let mut program = Program::new();
        program
            .hook(ShaderStage::Fragment, HookPosition::Post)
            .push("a");
        program
            .hook(ShaderStage::Fragment, HookPosition::Post)
            .push("b");
        let list = program
            .hook_statements(ShaderStage::Fragment, HookPosition::Post)
            .unwrap();
        assert_eq!(list.statements(), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_filter_apply_remove() {
        let mut program = Program::new();
        let filter = Filter::new(
            "alpha",
            ShaderStage::Fragment,
            HookPosition::Post,
            "color.a *= 0.5;",
        );
        filter.apply(&mut program);
        assert_eq!(
            program
                .hook_statements(ShaderStage::Fragment, HookPosition::Post)
                .unwrap()
                .statements()
                .len(),
            1
        );
        filter.remove(&mut program);
        assert!(program
            .hook_statements(ShaderStage::Fragment, HookPosition::Post)
            .unwrap()
            .statements()
            .is_empty());
    }

    #[test]
    fn test_default_uniforms() {
        let program = Program::new();
        assert!(program.transform().is_identity());
        assert_eq!(program.color(), Color::WHITE);
    }
}
