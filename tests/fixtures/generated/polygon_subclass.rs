#[derive(Debug, Clone, PartialEq)]
pub struct PolygonSubclass {
    name: String,
    pub sides: u32,
    pub origin: Option<CounterSubclass>,
    pub tags: Vec<String>,
}
impl PolygonSubclass {
    pub fn new(
        name: String,
        sides: u32,
        origin: Option<CounterSubclass>,
        tags: Option<Vec<String>>
    ) -> Result<Self, ::declgen::runtime::ContractViolation> {
        let tags: Vec<String> = tags.unwrap_or_else(|| Vec::new());
        if !(name.len() != 0) {
            return Err(
                ::declgen::runtime::ContractViolation::new(
                    "name",
                    format!("The size of name has to be not zero but was {:?}.", name.len())
                )
            );
        }
        if !(sides > 2) {
            return Err(
                ::declgen::runtime::ContractViolation::new(
                    "sides",
                    format!("The sides has to be greater than 2 but was {:?}.", sides)
                )
            );
        }
        Ok(Self { name, sides, origin, tags })
    }
}
impl Polygon for PolygonSubclass {
    fn get_name(&self) -> String {
        self.name.clone()
    }
}
