use ::declgen::runtime::Leaf as _;
/// Structural encoding of [`CounterSubclass`]
pub struct CounterConverter;
impl CounterConverter {
    pub fn encode(instance: &CounterSubclass) -> ::declgen::runtime::Value {
        ::declgen::runtime::Value::Record(
            vec![
                ("value".to_string(), instance.value.to_value()),
                ("double".to_string(), instance.double.to_value()),
                ("step".to_string(), instance.step.to_value())
            ]
        )
    }
    pub fn decode(
        value: &::declgen::runtime::Value
    ) -> Result<CounterSubclass, ::declgen::runtime::ConversionError> {
        let mut reader = ::declgen::runtime::RecordReader::new("Counter", value)?;
        let mut builder = CounterBuilder::new();
        if let Some(value) = reader.leaf::<i64>("value")? {
            builder = builder.with_value(value);
        }
        reader.skip("double");
        if let Some(value) = reader.leaf::<i64>("step")? {
            builder = builder.with_step(value);
        }
        reader.finish()?;
        Ok(builder.build()?)
    }
}
