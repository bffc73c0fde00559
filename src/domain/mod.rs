pub mod access_code;
pub mod donation;
pub mod order;
pub mod outbox;
pub mod pricing;
pub mod user;

pub use access_code::*;
pub use donation::*;
pub use order::*;
pub use outbox::*;
pub use pricing::*;
pub use user::*;

use serde::{Deserialize, Serialize};

/// Site languages. German is the festival's primary language; Kurdish and
/// English content mirrors it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    De,
    En,
    Ku,
}

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::De => "de",
            Locale::En => "en",
            Locale::Ku => "ku",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "de" => Some(Locale::De),
            "en" => Some(Locale::En),
            "ku" => Some(Locale::Ku),
            _ => None,
        }
    }
}
