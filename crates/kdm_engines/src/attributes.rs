#![forbid(unsafe_code)]

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeLayer {
    Base,
    Gear,
    Tokens,
}

impl AttributeLayer {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Gear => "gear",
            Self::Tokens => "tokens",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "base" => Some(Self::Base),
            "gear" => Some(Self::Gear),
            "tokens" => Some(Self::Tokens),
            _ => None,
        }
    }

    /// Id of the numeric input for this layer, e.g. `gear_value_Movement_controller`.
    pub fn input_id(self, attribute: &str) -> String {
        format!("{}_value_{}_controller", self.as_str(), attribute)
    }
}

pub fn total_class(attribute: &str) -> String {
    format!("synthetic_attrib_total_{attribute}")
}

/// Missing layers count as zero.
pub fn attribute_total(base: Option<i64>, gear: Option<i64>, tokens: Option<i64>) -> i64 {
    [base, gear, tokens]
        .into_iter()
        .map(|v| v.unwrap_or(0))
        .fold(0_i64, i64::saturating_add)
}
