/// Step-wise construction of [`PolygonSubclass`]
#[derive(Debug, Clone)]
pub struct PolygonBuilder {
    name: Option<String>,
    sides: Option<u32>,
    origin: Option<Option<CounterSubclass>>,
    tags: Option<Vec<String>>,
}
impl Default for PolygonBuilder {
    fn default() -> Self {
        Self::new()
    }
}
impl PolygonBuilder {
    pub fn new() -> Self {
        Self {
            name: None,
            sides: None,
            origin: None,
            tags: Some(Vec::new()),
        }
    }
    pub fn with_name(mut self, name: String) -> Self {
        self.name = Some(name);
        self
    }
    pub fn with_sides(mut self, sides: u32) -> Self {
        self.sides = Some(sides);
        self
    }
    pub fn with_origin(mut self, origin: Option<CounterSubclass>) -> Self {
        self.origin = Some(origin);
        self
    }
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }
    pub fn build(self) -> Result<PolygonSubclass, ::declgen::runtime::BuildError> {
        let mut missing = Vec::new();
        if self.name.is_none() {
            missing.push("name");
        }
        if self.sides.is_none() {
            missing.push("sides");
        }
        if !missing.is_empty() {
            return Err(::declgen::runtime::BuildError::missing("Polygon", missing));
        }
        let (Some(name), Some(sides)) = (self.name, self.sides) else {
            return Err(
                ::declgen::runtime::BuildError::missing("Polygon", vec!["name", "sides"]),
            );
        };
        Ok(PolygonSubclass::new(name, sides, self.origin.flatten(), self.tags)?)
    }
}
