/*!
 * The six-form pronoun set value type.
 *
 * A set is written as six slash-separated tokens in the order
 * subjective/objective/progressive/possessive adjective/possessive pronoun/reflexive,
 * e.g. `she/her/she's/her/hers/herself`.
 */

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::errors::PronounSetError;

/// Number of grammatical forms in a set
pub const FORM_COUNT: usize = 6;

/// An immutable set of the six grammatical forms of a pronoun choice
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PronounSet {
    subjective: String,
    objective: String,
    progressive: String,
    possessive_adjective: String,
    possessive_pronoun: String,
    reflexive: String,
}

impl PronounSet {
    /// Build a set from its six forms
    pub fn new(
        subjective: impl Into<String>,
        objective: impl Into<String>,
        progressive: impl Into<String>,
        possessive_adjective: impl Into<String>,
        possessive_pronoun: impl Into<String>,
        reflexive: impl Into<String>,
    ) -> Self {
        Self {
            subjective: subjective.into(),
            objective: objective.into(),
            progressive: progressive.into(),
            possessive_adjective: possessive_adjective.into(),
            possessive_pronoun: possessive_pronoun.into(),
            reflexive: reflexive.into(),
        }
    }

    /// Parse a six-token slash-separated set
    pub fn parse(input: &str) -> Result<Self, PronounSetError> {
        let tokens: Vec<&str> = input.split('/').map(str::trim).collect();
        if tokens.len() != FORM_COUNT {
            return Err(PronounSetError::TokenCount { found: tokens.len() });
        }
        if let Some(index) = tokens.iter().position(|t| t.is_empty()) {
            return Err(PronounSetError::EmptyToken { index });
        }

        Ok(Self::new(
            tokens[0], tokens[1], tokens[2], tokens[3], tokens[4], tokens[5],
        ))
    }

    pub fn subjective(&self) -> &str {
        &self.subjective
    }

    pub fn objective(&self) -> &str {
        &self.objective
    }

    pub fn progressive(&self) -> &str {
        &self.progressive
    }

    pub fn possessive_adjective(&self) -> &str {
        &self.possessive_adjective
    }

    pub fn possessive_pronoun(&self) -> &str {
        &self.possessive_pronoun
    }

    pub fn reflexive(&self) -> &str {
        &self.reflexive
    }

    /// Short display form, e.g. `She/Her`
    pub fn formatted(&self) -> String {
        format!("{}/{}", capitalise(&self.subjective), capitalise(&self.objective))
    }
}

impl fmt::Display for PronounSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}/{}/{}",
            self.subjective,
            self.objective,
            self.progressive,
            self.possessive_adjective,
            self.possessive_pronoun,
            self.reflexive
        )
    }
}

impl FromStr for PronounSet {
    type Err = PronounSetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for PronounSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PronounSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

fn capitalise(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
