//! Contract synthesis
//!
//! Turns a validator descriptor attached to a field, parameter or method
//! result into a [`Contract`]: a boolean condition over the element plus a
//! failure message template. Synthesis is pure. Problems with how a validator
//! is applied are returned as [`Finding`]s for the caller to report; only an
//! unknown validator kind is an error.
//!
//! ```text
//! even on `x: i64`            x % 2 == 0
//! even on `x: BigInt`         x.trailing_zeros() != Some(0)
//! even on `x: Option<i64>`    x.as_ref().map_or(true, |x| (*x) % 2 == 0)
//! non_empty on `x: &str`      (*x).len() != 0
//! ```

use crate::declaration::{ValidatorArgument, ValidatorDescriptor};
use crate::diagnostics::{DiagnosticBuffer, SourceLocation};
use crate::model::{
    assignability, Assignability, DeclarationModel, FieldInfo, MethodInfo, ParameterInfo,
    TypeHierarchy, TypeInfo,
};
use crate::util::{escape_placeholders, rust_string_literal, template_to_format_string};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SynthesisError {
    #[error("Unknown validator `{0}`.")]
    UnknownValidator(String),
}

/// The closed set of validator kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidatorKind {
    Even,
    Uneven,
    MultipleOf,
    Positive,
    NonNegative,
    Negative,
    NonPositive,
    GreaterThan,
    GreaterThanOrEqualTo,
    LessThan,
    LessThanOrEqualTo,
    NonEmpty,
    Empty,
    EmptyOrSingle,
    MaxSize,
    MinSize,
    Regex,
    StrictlyAscending,
    StrictlyDescending,
    NonNullableElements,
    AssignableTo,
}

impl ValidatorKind {
    pub const ALL: [ValidatorKind; 21] = [
        ValidatorKind::Even,
        ValidatorKind::Uneven,
        ValidatorKind::MultipleOf,
        ValidatorKind::Positive,
        ValidatorKind::NonNegative,
        ValidatorKind::Negative,
        ValidatorKind::NonPositive,
        ValidatorKind::GreaterThan,
        ValidatorKind::GreaterThanOrEqualTo,
        ValidatorKind::LessThan,
        ValidatorKind::LessThanOrEqualTo,
        ValidatorKind::NonEmpty,
        ValidatorKind::Empty,
        ValidatorKind::EmptyOrSingle,
        ValidatorKind::MaxSize,
        ValidatorKind::MinSize,
        ValidatorKind::Regex,
        ValidatorKind::StrictlyAscending,
        ValidatorKind::StrictlyDescending,
        ValidatorKind::NonNullableElements,
        ValidatorKind::AssignableTo,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            ValidatorKind::Even => "even",
            ValidatorKind::Uneven => "uneven",
            ValidatorKind::MultipleOf => "multiple_of",
            ValidatorKind::Positive => "positive",
            ValidatorKind::NonNegative => "non_negative",
            ValidatorKind::Negative => "negative",
            ValidatorKind::NonPositive => "non_positive",
            ValidatorKind::GreaterThan => "greater_than",
            ValidatorKind::GreaterThanOrEqualTo => "greater_than_or_equal_to",
            ValidatorKind::LessThan => "less_than",
            ValidatorKind::LessThanOrEqualTo => "less_than_or_equal_to",
            ValidatorKind::NonEmpty => "non_empty",
            ValidatorKind::Empty => "empty",
            ValidatorKind::EmptyOrSingle => "empty_or_single",
            ValidatorKind::MaxSize => "max_size",
            ValidatorKind::MinSize => "min_size",
            ValidatorKind::Regex => "regex",
            ValidatorKind::StrictlyAscending => "strictly_ascending",
            ValidatorKind::StrictlyDescending => "strictly_descending",
            ValidatorKind::NonNullableElements => "non_nullable_elements",
            ValidatorKind::AssignableTo => "assignable_to",
        }
    }

    fn needs_argument(self) -> bool {
        matches!(
            self,
            ValidatorKind::MultipleOf
                | ValidatorKind::GreaterThan
                | ValidatorKind::GreaterThanOrEqualTo
                | ValidatorKind::LessThan
                | ValidatorKind::LessThanOrEqualTo
                | ValidatorKind::MaxSize
                | ValidatorKind::MinSize
                | ValidatorKind::Regex
                | ValidatorKind::AssignableTo
        )
    }

    fn is_size(self) -> bool {
        matches!(
            self,
            ValidatorKind::NonEmpty
                | ValidatorKind::Empty
                | ValidatorKind::EmptyOrSingle
                | ValidatorKind::MaxSize
                | ValidatorKind::MinSize
        )
    }
}

impl FromStr for ValidatorKind {
    type Err = SynthesisError;

    /// Tags are matched case-insensitively with `-` and `_` interchangeable
    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        let normalized = tag.trim().to_ascii_lowercase().replace('-', "_");
        let alias = match normalized.as_str() {
            "odd" => "uneven",
            "not_empty" => "non_empty",
            "regex_match" | "matches" => "regex",
            "assignable" => "assignable_to",
            other => other,
        };
        ValidatorKind::ALL
            .into_iter()
            .find(|k| k.tag() == alias)
            .ok_or_else(|| SynthesisError::UnknownValidator(tag.to_string()))
    }
}

impl fmt::Display for ValidatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// What a validator is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Field,
    Parameter,
    Result,
}

/// The annotated element as seen by the synthesizer
#[derive(Debug, Clone, Copy)]
pub struct Element<'a> {
    pub kind: ElementKind,
    /// Name used in messages
    pub label: &'a str,
    /// Variable holding the value in generated code
    pub binding: &'a str,
    pub ty: &'a TypeInfo,
}

impl<'a> Element<'a> {
    pub fn field(field: &'a FieldInfo) -> Self {
        Self {
            kind: ElementKind::Field,
            label: &field.name,
            binding: &field.name,
            ty: &field.ty,
        }
    }

    pub fn parameter(param: &'a ParameterInfo) -> Self {
        Self {
            kind: ElementKind::Parameter,
            label: &param.name,
            binding: &param.name,
            ty: &param.ty,
        }
    }

    /// The result of a method, bound to `result`
    pub fn result(method: &'a MethodInfo, label: &'a str) -> Self {
        Self {
            kind: ElementKind::Result,
            label,
            binding: RESULT_BINDING,
            ty: &method.returns,
        }
    }
}

/// Variable holding a rewritten method's result
pub const RESULT_BINDING: &str = "result";

/// Inputs shared by every synthesis call of a batch
#[derive(Clone, Copy)]
pub struct SynthesisContext<'a> {
    pub hierarchy: &'a dyn TypeHierarchy,
    /// Path generated code uses for runtime support
    pub runtime_path: &'a str,
}

/// A runtime guard
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Contract {
    /// Name of the checked element
    pub subject: String,
    pub condition: String,
    /// `$` placeholders, `$$` for a literal dollar
    pub message: String,
    /// Expressions substituted into the message
    pub arguments: Vec<String>,
}

impl Contract {
    /// Format string and arguments for `format!`-like macros
    pub fn format_args(&self) -> String {
        let mut out = rust_string_literal(&template_to_format_string(&self.message));
        for arg in &self.arguments {
            out.push_str(", ");
            out.push_str(arg);
        }
        out
    }

    /// Panicking check for method pre- and postconditions
    pub fn assertion(&self) -> String {
        format!("assert!({}, {});", self.condition, self.format_args())
    }

    /// Early return of a `ContractViolation` for constructors
    pub fn violation_check(&self, runtime_path: &str) -> String {
        format!(
            "if !({}) {{\n    return Err({}::ContractViolation::new({}, format!({})));\n}}",
            self.condition,
            runtime_path,
            rust_string_literal(&self.subject),
            self.format_args()
        )
    }
}

/// A usage problem found during synthesis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub template: String,
    pub arguments: Vec<String>,
}

impl Finding {
    fn new(template: &str, arguments: Vec<String>) -> Self {
        Self {
            template: template.to_string(),
            arguments,
        }
    }
}

/// Outcome of synthesizing one validator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Synthesis {
    Runtime {
        contract: Contract,
        findings: Vec<Finding>,
    },
    /// Checked during generation only; nothing runs at runtime
    CompileTimeOnly { findings: Vec<Finding> },
}

impl Synthesis {
    pub fn contract(&self) -> Option<&Contract> {
        match self {
            Synthesis::Runtime { contract, .. } => Some(contract),
            Synthesis::CompileTimeOnly { .. } => None,
        }
    }

    pub fn findings(&self) -> &[Finding] {
        match self {
            Synthesis::Runtime { findings, .. } | Synthesis::CompileTimeOnly { findings } => {
                findings
            }
        }
    }
}

const INAPPLICABLE: &str = "The validator $ cannot be applied to $ of type $ ($ expected).";
const MISSING_ARGUMENT: &str = "The validator $ on $ requires an argument.";
const BAD_ARGUMENT: &str = "The validator $ on $ has an invalid argument $ ($ expected).";
const INVALID_REGEX: &str = "The regular expression $ on $ is invalid: $";
const NOT_ASSIGNABLE: &str = "The $ of type $ is not assignable to $.";

/// Synthesize the contract for one validator on one element
pub fn synthesize(
    element: &Element<'_>,
    descriptor: &ValidatorDescriptor,
    ctx: &SynthesisContext<'_>,
) -> Result<Synthesis, SynthesisError> {
    let kind: ValidatorKind = descriptor.tag.parse()?;
    let mut findings = Vec::new();

    if kind.needs_argument() && descriptor.argument.is_none() {
        findings.push(Finding::new(
            MISSING_ARGUMENT,
            vec![kind.to_string(), element.label.to_string()],
        ));
        return Ok(Synthesis::CompileTimeOnly { findings });
    }

    if kind == ValidatorKind::AssignableTo {
        check_assignable(element, descriptor, ctx, &mut findings);
        return Ok(Synthesis::CompileTimeOnly { findings });
    }

    let nullable = element.ty.is_nullable();
    let (ty, subject) = if nullable {
        (
            element.ty.value_type().dereferenced(),
            format!("(*{})", element.binding),
        )
    } else if element.ty.is_reference() {
        (element.ty.dereferenced(), format!("(*{})", element.binding))
    } else {
        (element.ty, element.binding.to_string())
    };

    check_applicability(kind, ty, element, &mut findings);

    let Some(rule) = rule(kind, descriptor, ty, &subject, element, ctx, &mut findings) else {
        return Ok(Synthesis::CompileTimeOnly { findings });
    };

    let condition = if nullable {
        format!(
            "{b}.as_ref().map_or(true, |{b}| {c})",
            b = element.binding,
            c = rule.condition
        )
    } else {
        rule.condition
    };
    let label = escape_placeholders(element.label);
    let (message, argument) = match (kind.is_size(), nullable) {
        (true, false) => (
            format!("The size of {} has to be {} but was $.", label, rule.phrase),
            format!("{}.len()", subject),
        ),
        (true, true) => (
            format!(
                "The {} has to be None or have a size of {} but was $.",
                label, rule.phrase
            ),
            element.binding.to_string(),
        ),
        (false, false) => (
            format!(
                "The {} has to {}{} but was $.",
                label,
                if rule.be { "be " } else { "" },
                rule.phrase
            ),
            element.binding.to_string(),
        ),
        (false, true) => (
            format!("The {} has to be None or {} but was $.", label, rule.phrase),
            element.binding.to_string(),
        ),
    };

    Ok(Synthesis::Runtime {
        contract: Contract {
            subject: element.label.to_string(),
            condition,
            message,
            arguments: vec![argument],
        },
        findings,
    })
}

struct Rule {
    condition: String,
    /// Message phrase, escaped for placeholder substitution
    phrase: String,
    /// Whether the phrase reads after "be"
    be: bool,
}

impl Rule {
    fn be(condition: String, phrase: impl Into<String>) -> Self {
        Self {
            condition,
            phrase: phrase.into(),
            be: true,
        }
    }

    fn verb(condition: String, phrase: impl Into<String>) -> Self {
        Self {
            condition,
            phrase: phrase.into(),
            be: false,
        }
    }
}

fn rule(
    kind: ValidatorKind,
    descriptor: &ValidatorDescriptor,
    ty: &TypeInfo,
    s: &str,
    element: &Element<'_>,
    ctx: &SynthesisContext<'_>,
    findings: &mut Vec<Finding>,
) -> Option<Rule> {
    let argument = descriptor.argument.as_ref();
    let zero = zero_literal(ty);
    let compare = |op: &str, phrase: &str, findings: &mut Vec<Finding>| -> Option<Rule> {
        let arg = argument?;
        let literal = numeric_literal(arg, ty, kind, element, findings);
        Some(Rule::be(
            format!("{} {} {}", s, op, literal),
            format!("{} {}", phrase, escape_placeholders(&arg.to_string())),
        ))
    };
    let size = |op: &str, phrase: &str, findings: &mut Vec<Finding>| -> Option<Rule> {
        let arg = argument?;
        let n = match arg.as_integer() {
            Some(n) if n >= 0 => n,
            _ => {
                findings.push(Finding::new(
                    BAD_ARGUMENT,
                    vec![
                        kind.to_string(),
                        element.label.to_string(),
                        arg.to_string(),
                        "non-negative integer".into(),
                    ],
                ));
                return None;
            }
        };
        Some(Rule::be(
            format!("{}.len() {} {}", s, op, n),
            format!("{} {}", phrase, n),
        ))
    };

    match kind {
        ValidatorKind::Even if ty.is_big_integer() => Some(Rule::be(
            format!("{}.trailing_zeros() != Some(0)", s),
            "even",
        )),
        ValidatorKind::Even => Some(Rule::be(format!("{} % 2 == 0", s), "even")),
        ValidatorKind::Uneven if ty.is_big_integer() => Some(Rule::be(
            format!("{}.trailing_zeros() == Some(0)", s),
            "uneven",
        )),
        ValidatorKind::Uneven => Some(Rule::be(format!("{} % 2 != 0", s), "uneven")),
        ValidatorKind::MultipleOf => {
            let arg = argument?;
            if arg.as_integer() == Some(0) {
                findings.push(Finding::new(
                    BAD_ARGUMENT,
                    vec![
                        kind.to_string(),
                        element.label.to_string(),
                        "0".into(),
                        "non-zero number".into(),
                    ],
                ));
                return None;
            }
            let literal = numeric_literal(arg, ty, kind, element, findings);
            let dividend = if ty.is_big_integer() {
                format!("&{}", s)
            } else {
                s.to_string()
            };
            Some(Rule::be(
                format!("{} % {} == {}", dividend, literal, zero),
                format!("a multiple of {}", escape_placeholders(&arg.to_string())),
            ))
        }
        ValidatorKind::Positive => Some(Rule::be(format!("{} > {}", s, zero), "positive")),
        ValidatorKind::NonNegative => {
            Some(Rule::be(format!("{} >= {}", s, zero), "non-negative"))
        }
        ValidatorKind::Negative => Some(Rule::be(format!("{} < {}", s, zero), "negative")),
        ValidatorKind::NonPositive => {
            Some(Rule::be(format!("{} <= {}", s, zero), "non-positive"))
        }
        ValidatorKind::GreaterThan => compare(">", "greater than", findings),
        ValidatorKind::GreaterThanOrEqualTo => {
            compare(">=", "greater than or equal to", findings)
        }
        ValidatorKind::LessThan => compare("<", "less than", findings),
        ValidatorKind::LessThanOrEqualTo => compare("<=", "less than or equal to", findings),
        ValidatorKind::NonEmpty => Some(Rule::be(format!("{}.len() != 0", s), "not zero")),
        ValidatorKind::Empty => Some(Rule::be(format!("{}.len() == 0", s), "zero")),
        ValidatorKind::EmptyOrSingle => {
            Some(Rule::be(format!("{}.len() <= 1", s), "zero or one"))
        }
        ValidatorKind::MaxSize => size("<=", "at most", findings),
        ValidatorKind::MinSize => size(">=", "at least", findings),
        ValidatorKind::Regex => {
            let arg = argument?;
            let Some(pattern) = arg.as_text() else {
                findings.push(Finding::new(
                    BAD_ARGUMENT,
                    vec![
                        kind.to_string(),
                        element.label.to_string(),
                        arg.to_string(),
                        "pattern string".into(),
                    ],
                ));
                return None;
            };
            if let Err(e) = regex::Regex::new(pattern) {
                findings.push(Finding::new(
                    INVALID_REGEX,
                    vec![pattern.to_string(), element.label.to_string(), e.to_string()],
                ));
            }
            Some(Rule::verb(
                format!(
                    "{}::matches_regex({}, &{})",
                    ctx.runtime_path,
                    rust_string_literal(pattern),
                    s
                ),
                format!(
                    "match the regular expression \"{}\"",
                    escape_placeholders(pattern)
                ),
            ))
        }
        ValidatorKind::StrictlyAscending => Some(Rule::be(
            format!("{s}.iter().zip({s}.iter().skip(1)).all(|(a, b)| a < b)", s = s),
            "strictly ascending",
        )),
        ValidatorKind::StrictlyDescending => Some(Rule::be(
            format!("{s}.iter().zip({s}.iter().skip(1)).all(|(a, b)| a > b)", s = s),
            "strictly descending",
        )),
        ValidatorKind::NonNullableElements => Some(Rule::verb(
            format!("{}.iter().all(Option::is_some)", s),
            "contain no None elements",
        )),
        ValidatorKind::AssignableTo => None,
    }
}

fn zero_literal(ty: &TypeInfo) -> String {
    if ty.is_big_integer() {
        format!("{}::from(0)", ty.qualified_name())
    } else if ty.is_float() {
        "0.0".to_string()
    } else {
        "0".to_string()
    }
}

/// Render a threshold in the element's numeric type
fn numeric_literal(
    arg: &ValidatorArgument,
    ty: &TypeInfo,
    kind: ValidatorKind,
    element: &Element<'_>,
    findings: &mut Vec<Finding>,
) -> String {
    let mistyped = |expected: &str, findings: &mut Vec<Finding>| {
        findings.push(Finding::new(
            BAD_ARGUMENT,
            vec![
                kind.to_string(),
                element.label.to_string(),
                arg.to_string(),
                expected.to_string(),
            ],
        ));
    };
    match arg {
        ValidatorArgument::Integer(i) if ty.is_big_integer() => {
            format!("{}::from({})", ty.qualified_name(), i)
        }
        ValidatorArgument::Integer(i) if ty.is_float() => format!("{:?}", *i as f64),
        ValidatorArgument::Integer(i) => i.to_string(),
        ValidatorArgument::Float(f) if ty.is_float() => format!("{:?}", f),
        ValidatorArgument::Float(f) => {
            mistyped("integer", findings);
            format!("{:?}", f)
        }
        other => {
            mistyped("number", findings);
            other.to_literal()
        }
    }
}

fn check_applicability(
    kind: ValidatorKind,
    ty: &TypeInfo,
    element: &Element<'_>,
    findings: &mut Vec<Finding>,
) {
    let expected = match kind {
        ValidatorKind::Even | ValidatorKind::Uneven | ValidatorKind::MultipleOf
            if !(ty.is_integer() || ty.is_big_integer()) =>
        {
            "integer type"
        }
        ValidatorKind::Positive
        | ValidatorKind::NonNegative
        | ValidatorKind::Negative
        | ValidatorKind::NonPositive
        | ValidatorKind::GreaterThan
        | ValidatorKind::GreaterThanOrEqualTo
        | ValidatorKind::LessThan
        | ValidatorKind::LessThanOrEqualTo
            if !ty.is_numeric() =>
        {
            "numeric type"
        }
        k if k.is_size() && !ty.is_sized() => "type with a length",
        ValidatorKind::Regex if !ty.is_text() => "text type",
        ValidatorKind::StrictlyAscending | ValidatorKind::StrictlyDescending
            if !ty.is_collection() || ty.is_map() =>
        {
            "ordered collection"
        }
        ValidatorKind::NonNullableElements
            if ty.is_map() || !ty.element_type().is_some_and(TypeInfo::is_nullable) =>
        {
            "collection of Option"
        }
        _ => return,
    };
    findings.push(Finding::new(
        INAPPLICABLE,
        vec![
            kind.to_string(),
            element.label.to_string(),
            element.ty.to_string(),
            expected.to_string(),
        ],
    ));
}

fn check_assignable(
    element: &Element<'_>,
    descriptor: &ValidatorDescriptor,
    ctx: &SynthesisContext<'_>,
    findings: &mut Vec<Finding>,
) {
    let Some(arg) = descriptor.argument.as_ref() else {
        return;
    };
    let target = match arg.as_text().map(TypeInfo::parse) {
        Some(Ok(target)) => target,
        _ => {
            findings.push(Finding::new(
                BAD_ARGUMENT,
                vec![
                    ValidatorKind::AssignableTo.to_string(),
                    element.label.to_string(),
                    arg.to_string(),
                    "type".into(),
                ],
            ));
            return;
        }
    };
    if assignability(element.ty, &target, ctx.hierarchy) == Assignability::NotAssignable {
        findings.push(Finding::new(
            NOT_ASSIGNABLE,
            vec![
                element.label.to_string(),
                element.ty.to_string(),
                target.to_string(),
            ],
        ));
    }
}

/// Every contract of one declaration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractTable {
    fields: BTreeMap<String, Vec<Contract>>,
    parameters: BTreeMap<(String, String), Vec<Contract>>,
    results: BTreeMap<String, Vec<Contract>>,
}

impl ContractTable {
    /// Synthesize every validator of a model
    ///
    /// Findings are reported as usage errors at the element's location. An
    /// unknown validator is reported as a declaration error; all elements are
    /// still examined and the first such error is returned.
    pub fn synthesize(
        model: &DeclarationModel,
        ctx: &SynthesisContext<'_>,
        buffer: &mut DiagnosticBuffer,
    ) -> Result<Self, SynthesisError> {
        let mut table = ContractTable::default();
        let mut first_error = None;
        let mut run = |element: Element<'_>,
                       validators: &[ValidatorDescriptor],
                       location: &SourceLocation,
                       buffer: &mut DiagnosticBuffer|
         -> Vec<Contract> {
            let mut contracts = Vec::new();
            for descriptor in validators {
                match synthesize(&element, descriptor, ctx) {
                    Ok(synthesis) => {
                        for finding in synthesis.findings() {
                            buffer.usage_error(
                                &finding.template,
                                location.clone(),
                                finding.arguments.clone(),
                            );
                        }
                        if let Some(contract) = synthesis.contract() {
                            contracts.push(contract.clone());
                        }
                    }
                    Err(e) => {
                        let SynthesisError::UnknownValidator(tag) = &e;
                        buffer.declaration_error(
                            "Unknown validator `$`.",
                            location.clone(),
                            vec![tag.clone()],
                        );
                        first_error.get_or_insert(e);
                    }
                }
            }
            contracts
        };

        for field in &model.fields {
            let contracts = run(Element::field(field), &field.validators, &field.location, buffer);
            if !contracts.is_empty() {
                table.fields.insert(field.name.clone(), contracts);
            }
        }
        for method in &model.methods {
            for param in &method.parameters {
                let contracts = run(
                    Element::parameter(param),
                    &param.validators,
                    &param.location,
                    buffer,
                );
                if !contracts.is_empty() {
                    table
                        .parameters
                        .insert((method.name.clone(), param.name.clone()), contracts);
                }
            }
            let label = format!("result of {}", method.name);
            let contracts = run(
                Element::result(method, &label),
                &method.validators,
                &method.location,
                buffer,
            );
            if !contracts.is_empty() {
                table.results.insert(method.name.clone(), contracts);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(table),
        }
    }

    pub fn for_field(&self, field: &str) -> &[Contract] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn for_parameter(&self, method: &str, parameter: &str) -> &[Contract] {
        self.parameters
            .get(&(method.to_string(), parameter.to_string()))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn for_result(&self, method: &str) -> &[Contract] {
        self.results
            .get(method)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.parameters.is_empty() && self.results.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn with_parameter_contract(
        mut self,
        method: &str,
        parameter: &str,
        contract: Contract,
    ) -> Self {
        self.parameters
            .entry((method.to_string(), parameter.to_string()))
            .or_default()
            .push(contract);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    struct NoHierarchy;

    impl TypeHierarchy for NoHierarchy {
        fn supertypes_of(&self, _name: &str) -> Option<Vec<String>> {
            None
        }
    }

    fn ctx() -> SynthesisContext<'static> {
        SynthesisContext {
            hierarchy: &NoHierarchy,
            runtime_path: "::declgen::runtime",
        }
    }

    fn run(ty: &str, descriptor: ValidatorDescriptor) -> Synthesis {
        let ty = TypeInfo::parse(ty).unwrap();
        let element = Element {
            kind: ElementKind::Field,
            label: "x",
            binding: "x",
            ty: &ty,
        };
        synthesize(&element, &descriptor, &ctx()).unwrap()
    }

    fn condition(ty: &str, descriptor: ValidatorDescriptor) -> String {
        run(ty, descriptor).contract().unwrap().condition.clone()
    }

    fn arg(tag: &str, arg: ValidatorArgument) -> ValidatorDescriptor {
        ValidatorDescriptor::new(tag, Some(arg))
    }

    #[rstest]
    #[case("i64", "even", "x % 2 == 0")]
    #[case("num_bigint::BigInt", "even", "x.trailing_zeros() != Some(0)")]
    #[case("BigUint", "uneven", "x.trailing_zeros() == Some(0)")]
    #[case("u8", "odd", "x % 2 != 0")]
    #[case("f64", "positive", "x > 0.0")]
    #[case("BigInt", "negative", "x < BigInt::from(0)")]
    #[case("&i32", "non_negative", "(*x) >= 0")]
    #[case("Option<i64>", "even", "x.as_ref().map_or(true, |x| (*x) % 2 == 0)")]
    #[case("Vec<String>", "non-empty", "x.len() != 0")]
    #[case("&str", "empty_or_single", "(*x).len() <= 1")]
    #[case("Vec<u8>", "strictly_ascending", "x.iter().zip(x.iter().skip(1)).all(|(a, b)| a < b)")]
    #[case("Vec<Option<u8>>", "non_nullable_elements", "x.iter().all(Option::is_some)")]
    fn simple_conditions(#[case] ty: &str, #[case] tag: &str, #[case] expected: &str) {
        assert_eq!(condition(ty, ValidatorDescriptor::tag(tag)), expected);
    }

    #[rstest]
    #[case("i64", "greater_than", ValidatorArgument::Integer(3), "x > 3")]
    #[case("f32", "less_than_or_equal_to", ValidatorArgument::Integer(2), "x <= 2.0")]
    #[case("i64", "multiple_of", ValidatorArgument::Integer(5), "x % 5 == 0")]
    #[case(
        "BigInt",
        "multiple_of",
        ValidatorArgument::Integer(3),
        "&x % BigInt::from(3) == BigInt::from(0)"
    )]
    #[case("String", "max_size", ValidatorArgument::Integer(10), "x.len() <= 10")]
    #[case(
        "String",
        "regex",
        ValidatorArgument::Text("^a+$".into()),
        "::declgen::runtime::matches_regex(\"^a+$\", &x)"
    )]
    fn parameterized_conditions(
        #[case] ty: &str,
        #[case] tag: &str,
        #[case] argument: ValidatorArgument,
        #[case] expected: &str,
    ) {
        assert_eq!(condition(ty, arg(tag, argument)), expected);
    }

    #[test]
    fn messages_name_the_element_and_the_value() {
        let synthesis = run("i64", ValidatorDescriptor::tag("even"));
        let contract = synthesis.contract().unwrap();
        assert_eq!(contract.message, "The x has to be even but was $.");
        assert_eq!(contract.arguments, vec!["x".to_string()]);
        assert!(synthesis.findings().is_empty());

        let size = run("Vec<u8>", ValidatorDescriptor::tag("non_empty"));
        assert_eq!(
            size.contract().unwrap().message,
            "The size of x has to be not zero but was $."
        );
        assert_eq!(size.contract().unwrap().arguments, vec!["x.len()".to_string()]);

        let optional = run("Option<String>", arg("regex", ValidatorArgument::Text("^$".into())));
        assert_eq!(
            optional.contract().unwrap().message,
            "The x has to be None or match the regular expression \"^$$\" but was $."
        );
    }

    #[test]
    fn rendered_checks_use_format_strings() {
        let synthesis = run("i64", ValidatorDescriptor::tag("even"));
        let contract = synthesis.contract().unwrap();
        assert_eq!(
            contract.assertion(),
            "assert!(x % 2 == 0, \"The x has to be even but was {:?}.\", x);"
        );
        assert!(contract
            .violation_check("::declgen::runtime")
            .contains("::declgen::runtime::ContractViolation::new(\"x\", format!("));
    }

    #[test]
    fn invalid_regex_is_reported_but_still_emitted() {
        let synthesis = run("String", arg("regex", ValidatorArgument::Text("a(".into())));
        assert!(synthesis.contract().is_some());
        assert_eq!(synthesis.findings().len(), 1);
        assert_eq!(synthesis.findings()[0].template, INVALID_REGEX);
    }

    #[test]
    fn inapplicable_validators_are_findings() {
        let synthesis = run("String", ValidatorDescriptor::tag("even"));
        assert!(synthesis.contract().is_some());
        assert_eq!(synthesis.findings()[0].arguments[3], "integer type");

        let synthesis = run("bool", ValidatorDescriptor::tag("non_empty"));
        assert_eq!(synthesis.findings()[0].arguments[3], "type with a length");
    }

    #[test]
    fn missing_arguments_yield_no_contract() {
        let synthesis = run("i64", ValidatorDescriptor::tag("greater_than"));
        assert!(synthesis.contract().is_none());
        assert_eq!(synthesis.findings()[0].template, MISSING_ARGUMENT);
    }

    #[test]
    fn assignable_to_is_compile_time_only() {
        let ok = run("i64", arg("assignable_to", ValidatorArgument::Text("Display".into())));
        assert_eq!(ok, Synthesis::CompileTimeOnly { findings: vec![] });

        let bad = run("f64", arg("assignable_to", ValidatorArgument::Text("Eq".into())));
        assert!(bad.contract().is_none());
        assert_eq!(bad.findings()[0].template, NOT_ASSIGNABLE);

        let unknown = run(
            "my::Thing",
            arg("assignable_to", ValidatorArgument::Text("Serialize".into())),
        );
        assert!(unknown.findings().is_empty());
    }

    #[test]
    fn unknown_validators_are_errors() {
        let ty = TypeInfo::parse("i64").unwrap();
        let element = Element {
            kind: ElementKind::Field,
            label: "x",
            binding: "x",
            ty: &ty,
        };
        let err = synthesize(&element, &ValidatorDescriptor::tag("prime"), &ctx()).unwrap_err();
        assert_eq!(err, SynthesisError::UnknownValidator("prime".into()));
    }

    #[test]
    fn synthesis_is_deterministic() {
        for kind in ValidatorKind::ALL {
            let descriptor =
                ValidatorDescriptor::new(kind.tag(), Some(ValidatorArgument::Integer(2)));
            assert_eq!(run("Vec<u8>", descriptor.clone()), run("Vec<u8>", descriptor));
        }
    }
}
