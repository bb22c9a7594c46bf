//! Concrete type generator
//!
//! ```text
//! pub struct PointSubclass { x: i64, double_x: i64, pub label: String }
//! impl PointSubclass {
//!     pub fn new(x: i64, label: Option<String>) -> Result<Self, ContractViolation> { ... }
//! }
//! impl Point for PointSubclass { fn get_x(&self) -> i64 { self.x } ... }
//! ```
//!
//! Defaults are applied first, then input contracts are checked, then
//! derived fields are computed once and their contracts checked.

use super::{GenerateError, GenerationContext, Generator};
use crate::declaration::ArtifactKind;
use crate::emit::{BlockKind, CodeEmitter};
use crate::intercept::{rewrite, RewrittenMethod, StateField};
use crate::model::{AccessStrategy, FieldInfo, FieldRole};

pub struct SubclassGenerator;

impl SubclassGenerator {
    /// Constructor parameter type; defaulted fields are optional
    pub(crate) fn parameter_type(field: &FieldInfo) -> String {
        match field.role {
            FieldRole::Defaulted(_) => format!("Option<{}>", field.ty),
            _ => field.ty.to_string(),
        }
    }
}

impl Generator for SubclassGenerator {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Subclass
    }

    fn generate(&self, ctx: &GenerationContext<'_>) -> Result<String, GenerateError> {
        let model = ctx.model;
        let name = ctx.output_name(ArtifactKind::Subclass);
        let intercept = ctx.intercept_context();

        let mut rewritten: Vec<RewrittenMethod> = Vec::new();
        for method in model.rewritten_methods() {
            rewritten.push(rewrite(method, ctx.contracts, &intercept)?);
        }
        let state: Vec<&StateField> = rewritten.iter().flat_map(|m| &m.state_fields).collect();

        let mut e = CodeEmitter::new();

        // struct
        if let Some(description) = &model.description {
            for line in description.lines() {
                e.attribute(&format!("/// {}", line))?;
            }
        }
        if state.is_empty() {
            e.attribute("#[derive(Debug, Clone, PartialEq)]")?;
        } else {
            e.attribute("#[derive(Debug, Clone)]")?;
        }
        e.begin(BlockKind::Struct, &format!("pub struct {}", name))?;
        for field in &model.fields {
            if let Some(description) = &field.description {
                for line in description.lines() {
                    e.attribute(&format!("/// {}", line))?;
                }
            }
            let visibility = match field.access {
                AccessStrategy::DirectField => "pub ",
                AccessStrategy::AccessorCall { .. } => "",
            };
            e.field(&format!("{}{}: {}", visibility, field.name, field.ty))?;
        }
        for field in &state {
            e.field(&format!("{}: {}", field.name, field.ty))?;
        }
        e.end()?;
        e.blank();

        // constructor
        e.begin(BlockKind::Impl, &format!("impl {}", name))?;
        let inputs: Vec<&FieldInfo> = model.input_fields().collect();
        if inputs.len() > 7 {
            e.attribute("#[allow(clippy::too_many_arguments)]")?;
        }
        let params: Vec<String> = inputs
            .iter()
            .map(|f| format!("{}: {}", f.name, Self::parameter_type(f)))
            .collect();
        e.begin(
            BlockKind::Function,
            &format!(
                "pub fn new({}) -> Result<Self, {}>",
                params.join(", "),
                ctx.runtime("ContractViolation")
            ),
        )?;
        for field in &inputs {
            if let Some(default) = field.default_expr() {
                e.statement(&format!(
                    "let {name}: {ty} = {name}.unwrap_or_else(|| {default});",
                    name = field.name,
                    ty = field.ty,
                    default = default
                ))?;
            }
        }
        for field in &inputs {
            for contract in ctx.contracts.for_field(&field.name) {
                e.statement(&contract.violation_check(ctx.runtime_path))?;
            }
        }
        for field in model.derived_fields() {
            if let Some(derive) = field.derive_expr() {
                e.statement(&format!("let {}: {} = {};", field.name, field.ty, derive))?;
            }
        }
        for field in model.derived_fields() {
            for contract in ctx.contracts.for_field(&field.name) {
                e.statement(&contract.violation_check(ctx.runtime_path))?;
            }
        }
        let mut init: Vec<String> = model.fields.iter().map(|f| f.name.clone()).collect();
        init.extend(
            state
                .iter()
                .map(|s| format!("{}: ::std::default::Default::default()", s.name)),
        );
        e.statement(&format!("Ok(Self {{ {} }})", init.join(", ")))?;
        e.end()?;
        e.end()?;
        e.blank();

        // trait implementation
        e.begin(
            BlockKind::Impl,
            &format!("impl {} for {}", model.trait_path, name),
        )?;
        for field in &model.fields {
            let Some(accessor) = field.accessor() else {
                continue;
            };
            e.begin(
                BlockKind::Function,
                &format!("fn {}(&self) -> {}", accessor, field.ty),
            )?;
            if field.ty.is_copy() {
                e.statement(&format!("self.{}", field.name))?;
            } else {
                e.statement(&format!("self.{}.clone()", field.name))?;
            }
            e.end()?;
        }
        for method in &rewritten {
            e.begin(BlockKind::Function, &method.signature)?;
            for statement in &method.statements {
                e.statement(statement)?;
            }
            e.end()?;
        }
        e.end()?;

        // equality without interceptor state
        if !state.is_empty() {
            e.blank();
            e.begin(BlockKind::Impl, &format!("impl PartialEq for {}", name))?;
            e.begin(BlockKind::Function, "fn eq(&self, other: &Self) -> bool")?;
            let comparisons: Vec<String> = model
                .fields
                .iter()
                .map(|f| format!("self.{0} == other.{0}", f.name))
                .collect();
            if comparisons.is_empty() {
                e.statement("let _ = other;\ntrue")?;
            } else {
                e.statement(&comparisons.join(" && "))?;
            }
            e.end()?;
            e.end()?;
        }

        Ok(e.finish()?)
    }
}

#[cfg(test)]
mod tests {
    use crate::generate::render;
    use crate::declaration::ArtifactKind;

    fn generate(yaml: &str) -> String {
        render(yaml, ArtifactKind::Subclass)
    }

    #[test]
    fn defaults_apply_before_contracts_and_derivations() {
        let text = generate(
            r#"
declarations:
  - name: Point
    members:
      - accessor: get_x
        type: i64
        validators: [even]
      - accessor: get_double_x
        type: i64
        derive: "2 * x"
      - field: label
        type: String
        default: "String::from(\"origin\")"
"#,
        );
        assert!(text.contains("#[derive(Debug, Clone, PartialEq)]"));
        assert!(text.contains("pub label: String,"));
        assert!(text.contains("    x: i64,"));
        assert!(text.contains("pub fn new("));
        assert!(text.contains("label: Option<String>"));
        assert!(text.contains("Result<Self, ::declgen::runtime::ContractViolation>"));
        let default = text.find("label.unwrap_or_else").unwrap();
        let check = text.find("x % 2 == 0").unwrap();
        let derive = text.find("let double_x: i64 = 2 * x;").unwrap();
        assert!(default < check && check < derive);
        assert!(text.contains("impl Point for PointSubclass"));
        assert!(text.contains("fn get_x(&self) -> i64"));
        assert!(!text.contains("fn get_label"));
    }

    #[test]
    fn cached_methods_add_state_and_manual_equality() {
        let text = generate(
            r#"
declarations:
  - name: Circle
    implements: shapes::Circle
    members:
      - accessor: get_name
        type: String
    methods:
      - name: describe
        parameters:
          - name: prefix
            type: "&str"
        returns: String
        interceptors: [cached]
        body: "format!(\"{}{}\", prefix, self.name)"
"#,
        );
        assert!(text.contains("#[derive(Debug, Clone)]"));
        assert!(text.contains("describe_cache: ::std::cell::RefCell<"));
        assert!(text.contains("describe_cache: ::std::default::Default::default()"));
        assert!(text.contains("self.name.clone()"));
        assert!(text.contains("impl PartialEq for CircleSubclass"));
        assert!(text.contains("self.name == other.name"));
        assert!(text.contains("impl shapes::Circle for CircleSubclass"));
    }
}
