//! Builder generator
//!
//! One `Option` slot per input field. Defaulted slots start populated, so
//! only settable non-nullable fields can be missing. `build()` reports every
//! missing field at once before delegating to the concrete type's
//! constructor, which checks the contracts.

use super::{GenerateError, GenerationContext, Generator};
use crate::declaration::ArtifactKind;
use crate::emit::{BlockKind, CodeEmitter};
use crate::model::{FieldInfo, FieldRole};
use crate::util::rust_string_literal;

pub struct BuilderGenerator;

impl BuilderGenerator {
    /// Setter order: required fields first, then the rest, each in declaration order
    pub fn setter_order<'a>(fields: impl Iterator<Item = &'a FieldInfo>) -> Vec<&'a FieldInfo> {
        let (required, optional): (Vec<&FieldInfo>, Vec<&FieldInfo>) =
            fields.filter(|f| f.is_input()).partition(|f| f.is_required());
        required.into_iter().chain(optional).collect()
    }

    /// Expression handing a slot to the constructor
    fn argument(field: &FieldInfo) -> String {
        match field.role {
            FieldRole::Defaulted(_) => format!("self.{}", field.name),
            _ if field.is_required() => field.name.clone(),
            _ => format!("self.{}.flatten()", field.name),
        }
    }
}

impl Generator for BuilderGenerator {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Builder
    }

    fn generate(&self, ctx: &GenerationContext<'_>) -> Result<String, GenerateError> {
        let model = ctx.model;
        let name = ctx.output_name(ArtifactKind::Builder);
        let target = ctx.output_name(ArtifactKind::Subclass);
        let inputs: Vec<&FieldInfo> = model.input_fields().collect();
        let required: Vec<&FieldInfo> =
            inputs.iter().copied().filter(|f| f.is_required()).collect();

        let mut e = CodeEmitter::new();
        e.attribute(&format!("/// Step-wise construction of [`{}`]", target))?;
        e.attribute("#[derive(Debug, Clone)]")?;
        e.begin(BlockKind::Struct, &format!("pub struct {}", name))?;
        for field in &inputs {
            e.field(&format!("{}: Option<{}>", field.name, field.ty))?;
        }
        e.end()?;
        e.blank();

        e.begin(BlockKind::Impl, &format!("impl Default for {}", name))?;
        e.begin(BlockKind::Function, "fn default() -> Self")?;
        e.statement("Self::new()")?;
        e.end()?;
        e.end()?;
        e.blank();

        e.begin(BlockKind::Impl, &format!("impl {}", name))?;
        e.begin(BlockKind::Function, "pub fn new() -> Self")?;
        let slots: Vec<String> = inputs
            .iter()
            .map(|f| match f.default_expr() {
                Some(default) => format!("{}: Some({})", f.name, default),
                None => format!("{}: None", f.name),
            })
            .collect();
        e.statement(&format!("Self {{ {} }}", slots.join(", ")))?;
        e.end()?;

        for field in Self::setter_order(inputs.iter().copied()) {
            e.blank();
            e.begin(
                BlockKind::Function,
                &format!(
                    "pub fn with_{name}(mut self, {name}: {ty}) -> Self",
                    name = field.name,
                    ty = field.ty
                ),
            )?;
            e.statement(&format!("self.{0} = Some({0});", field.name))?;
            e.statement("self")?;
            e.end()?;
        }

        e.blank();
        e.begin(
            BlockKind::Function,
            &format!(
                "pub fn build(self) -> Result<{}, {}>",
                target,
                ctx.runtime("BuildError")
            ),
        )?;
        if !required.is_empty() {
            let missing = format!(
                "return Err({}::missing({}, missing));",
                ctx.runtime("BuildError"),
                rust_string_literal(&model.name)
            );
            e.statement("let mut missing = Vec::new();")?;
            for field in &required {
                e.begin(BlockKind::If, &format!("if self.{}.is_none()", field.name))?;
                e.statement(&format!("missing.push({});", rust_string_literal(&field.name)))?;
                e.end()?;
            }
            e.begin(BlockKind::If, "if !missing.is_empty()")?;
            e.statement(&missing)?;
            e.end()?;
            let names: Vec<&str> = required.iter().map(|f| f.name.as_str()).collect();
            let slots: Vec<String> = required.iter().map(|f| format!("self.{}", f.name)).collect();
            let patterns: Vec<String> = names.iter().map(|n| format!("Some({})", n)).collect();
            let (pattern, scrutinee) = if names.len() == 1 {
                (patterns[0].clone(), slots[0].clone())
            } else {
                (
                    format!("({})", patterns.join(", ")),
                    format!("({})", slots.join(", ")),
                )
            };
            e.statement(&format!(
                "let {} = {} else {{\n    return Err({}::missing({}, vec![{}]));\n}};",
                pattern,
                scrutinee,
                ctx.runtime("BuildError"),
                rust_string_literal(&model.name),
                names
                    .iter()
                    .map(|n| rust_string_literal(n))
                    .collect::<Vec<_>>()
                    .join(", ")
            ))?;
        }
        let arguments: Vec<String> = inputs.iter().map(|f| Self::argument(f)).collect();
        e.statement(&format!("Ok({}::new({})?)", target, arguments.join(", ")))?;
        e.end()?;
        e.end()?;

        Ok(e.finish()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::render;

    const ORDER: &str = r#"
declarations:
  - name: Order
    members:
      - field: note
        type: Option<String>
      - accessor: get_id
        type: u64
      - field: currency
        type: String
        default: "String::from(\"EUR\")"
      - accessor: get_total
        type: i64
        validators: [non_negative]
      - accessor: get_total_cents
        type: i64
        derive: "total * 100"
"#;

    #[test]
    fn required_setters_come_first() {
        let text = render(ORDER, ArtifactKind::Builder);
        let positions: Vec<usize> = ["with_id", "with_total(", "with_note", "with_currency"]
            .iter()
            .map(|s| text.find(s).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{}", text);
        assert!(!text.contains("with_total_cents"));
    }

    #[test]
    fn defaults_are_prepopulated() {
        let text = render(ORDER, ArtifactKind::Builder);
        assert!(text.contains("currency: Some(String::from(\"EUR\"))"));
        assert!(text.contains("note: None"));
    }

    #[test]
    fn build_collects_missing_fields_then_delegates() {
        let text = render(ORDER, ArtifactKind::Builder);
        assert!(text.contains("missing.push(\"id\");"));
        assert!(text.contains("missing.push(\"total\");"));
        assert!(!text.contains("missing.push(\"note\")"));
        assert!(text.contains("let (Some(id), Some(total)) = (self.id, self.total) else {"));
        assert!(text.contains("OrderSubclass::new(self.note.flatten(), id, self.currency, total)"));
    }

    #[test]
    fn builders_without_required_fields_skip_the_check() {
        let text = render(
            r#"
declarations:
  - name: Flags
    members:
      - field: verbose
        type: bool
        default: "false"
"#,
            ArtifactKind::Builder,
        );
        assert!(!text.contains("missing"));
        assert!(text.contains("Ok(FlagsSubclass::new(self.verbose)?)"));
    }
}
