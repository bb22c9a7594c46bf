use ::declgen::runtime::Leaf as _;
/// Structural encoding of [`PolygonSubclass`]
pub struct PolygonConverter;
impl PolygonConverter {
    pub fn encode(instance: &PolygonSubclass) -> ::declgen::runtime::Value {
        ::declgen::runtime::Value::Record(
            vec![
                ("name".to_string(), instance.name.to_value()),
                ("sides".to_string(), instance.sides.to_value()),
                (
                    "origin".to_string(),
                    match &instance.origin {
                        Some(value) => CounterConverter::encode(value),
                        None => ::declgen::runtime::Value::Null
                    }
                ),
                ("tags".to_string(), instance.tags.to_value())
            ]
        )
    }
    pub fn decode(
        value: &::declgen::runtime::Value
    ) -> Result<PolygonSubclass, ::declgen::runtime::ConversionError> {
        let mut reader = ::declgen::runtime::RecordReader::new("Polygon", value)?;
        let mut builder = PolygonBuilder::new();
        if let Some(value) = reader.leaf::<String>("name")? {
            builder = builder.with_name(value);
        }
        if let Some(value) = reader.leaf::<u32>("sides")? {
            builder = builder.with_sides(value);
        }
        if let Some(value) = reader.optional("origin", CounterConverter::decode)? {
            builder = builder.with_origin(value);
        }
        if let Some(value) = reader.leaf::<Vec<String>>("tags")? {
            builder = builder.with_tags(value);
        }
        reader.finish()?;
        Ok(builder.build()?)
    }
}
