use propwise_core::ANY_FILTER;
use serde::{Deserialize, Serialize};

/// Hard constraint on a text column: either a wildcard or a case-insensitive match.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    #[default]
    Any,
    Exact(String),
}

impl Filter {
    pub fn exact(value: impl Into<String>) -> Self {
        Self::Exact(value.into())
    }

    pub fn matches(&self, value: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(expected) => value.trim().to_lowercase() == expected.trim().to_lowercase(),
        }
    }
}

impl From<&str> for Filter {
    fn from(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value == ANY_FILTER {
            Self::Any
        } else {
            Self::Exact(value.to_owned())
        }
    }
}

impl std::str::FromStr for Filter {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(value))
    }
}
