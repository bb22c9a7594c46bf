//! Converter generator
//!
//! `encode` writes every field, derived ones included, as a record entry in
//! declaration order. `decode` reads the entries back in the same order and
//! goes through the builder, so a decoded value passes the same contracts as
//! a constructed one. Nested declaration fields delegate to that
//! declaration's converter.

use super::{GenerateError, GenerationContext, Generator};
use crate::declaration::ArtifactKind;
use crate::emit::{BlockKind, CodeEmitter};
use crate::model::{FieldInfo, NestedShape};
use crate::util::rust_string_literal;

pub struct ConverterGenerator;

impl ConverterGenerator {
    fn encode_entry(ctx: &GenerationContext<'_>, field: &FieldInfo) -> String {
        let value = format!("instance.{}", field.name);
        let encoded = match &field.nested {
            None => format!("{}.to_value()", value),
            Some(nested) => {
                let converter = ctx.name_of(&nested.declaration, ArtifactKind::Converter);
                match nested.shape {
                    NestedShape::Plain => format!("{}::encode(&{})", converter, value),
                    NestedShape::Optional => format!(
                        "match &{} {{ Some(value) => {}::encode(value), None => {}::Null }}",
                        value,
                        converter,
                        ctx.runtime("Value")
                    ),
                    NestedShape::List => format!(
                        "{}::List({}.iter().map({}::encode).collect())",
                        ctx.runtime("Value"),
                        value,
                        converter
                    ),
                }
            }
        };
        format!("({}.to_string(), {})", rust_string_literal(&field.name), encoded)
    }

    fn read_entry(ctx: &GenerationContext<'_>, field: &FieldInfo) -> String {
        let name = rust_string_literal(&field.name);
        match &field.nested {
            None => format!("reader.leaf::<{}>({})?", field.ty, name),
            Some(nested) => {
                let converter = ctx.name_of(&nested.declaration, ArtifactKind::Converter);
                let method = match nested.shape {
                    NestedShape::Plain => "nested",
                    NestedShape::Optional => "optional",
                    NestedShape::List => "list",
                };
                format!("reader.{}({}, {}::decode)?", method, name, converter)
            }
        }
    }
}

impl Generator for ConverterGenerator {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Converter
    }

    fn generate(&self, ctx: &GenerationContext<'_>) -> Result<String, GenerateError> {
        let model = ctx.model;
        let name = ctx.output_name(ArtifactKind::Converter);
        let target = ctx.output_name(ArtifactKind::Subclass);
        let builder = ctx.output_name(ArtifactKind::Builder);
        let value = ctx.runtime("Value");
        let conversion_error = ctx.runtime("ConversionError");

        let mut e = CodeEmitter::new();
        if model.fields.iter().any(|f| f.nested.is_none()) {
            e.import(&format!("{} as _", ctx.runtime("Leaf")));
        }
        e.attribute(&format!("/// Structural encoding of [`{}`]", target))?;
        e.item(&format!("pub struct {};", name))?;
        e.blank();

        e.begin(BlockKind::Impl, &format!("impl {}", name))?;
        e.begin(
            BlockKind::Function,
            &format!("pub fn encode(instance: &{}) -> {}", target, value),
        )?;
        if model.fields.is_empty() {
            e.statement("let _ = instance;")?;
        }
        let entries: Vec<String> = model
            .fields
            .iter()
            .map(|f| Self::encode_entry(ctx, f))
            .collect();
        e.statement(&format!("{}::Record(vec![{}])", value, entries.join(", ")))?;
        e.end()?;
        e.blank();

        e.begin(
            BlockKind::Function,
            &format!(
                "pub fn decode(value: &{}) -> Result<{}, {}>",
                value, target, conversion_error
            ),
        )?;
        let mutable = if model.fields.is_empty() { "" } else { "mut " };
        e.statement(&format!(
            "let {}reader = {}::new({}, value)?;",
            mutable,
            ctx.runtime("RecordReader"),
            rust_string_literal(&model.name)
        ))?;
        let inputs = model.input_fields().count();
        let mutable = if inputs == 0 { "" } else { "mut " };
        e.statement(&format!("let {}builder = {}::new();", mutable, builder))?;
        for field in &model.fields {
            if field.is_derived() {
                e.statement(&format!("reader.skip({});", rust_string_literal(&field.name)))?;
                continue;
            }
            e.begin(
                BlockKind::If,
                &format!("if let Some(value) = {}", Self::read_entry(ctx, field)),
            )?;
            e.statement(&format!("builder = builder.with_{}(value);", field.name))?;
            e.end()?;
        }
        e.statement("reader.finish()?;")?;
        e.statement("Ok(builder.build()?)")?;
        e.end()?;
        e.end()?;

        Ok(e.finish()?)
    }
}
