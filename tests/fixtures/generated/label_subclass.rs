#[derive(Debug, Clone, PartialEq)]
pub struct LabelSubclass {
    pub text: String,
}
impl LabelSubclass {
    pub fn new(text: String) -> Result<Self, ::declgen::runtime::ContractViolation> {
        if !(::declgen::runtime::matches_regex("[a-z]+", &text)) {
            return Err(
                ::declgen::runtime::ContractViolation::new(
                    "text",
                    format!(
                        r#"The text has to match the regular expression "[a-z]+" but was {:?}."#,
                        text
                    )
                )
            );
        }
        Ok(Self { text })
    }
}
impl Label for LabelSubclass {
}
