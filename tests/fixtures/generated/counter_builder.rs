/// Step-wise construction of [`CounterSubclass`]
#[derive(Debug, Clone)]
pub struct CounterBuilder {
    value: Option<i64>,
    step: Option<i64>,
}
impl Default for CounterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
impl CounterBuilder {
    pub fn new() -> Self {
        Self { value: None, step: Some(2) }
    }
    pub fn with_value(mut self, value: i64) -> Self {
        self.value = Some(value);
        self
    }
    pub fn with_step(mut self, step: i64) -> Self {
        self.step = Some(step);
        self
    }
    pub fn build(self) -> Result<CounterSubclass, ::declgen::runtime::BuildError> {
        let mut missing = Vec::new();
        if self.value.is_none() {
            missing.push("value");
        }
        if !missing.is_empty() {
            return Err(::declgen::runtime::BuildError::missing("Counter", missing));
        }
        let Some(value) = self.value else {
            return Err(::declgen::runtime::BuildError::missing("Counter", vec!["value"]));
        };
        Ok(CounterSubclass::new(value, self.step)?)
    }
}
