//! Canonical forms for the categorical fields of the results table
//!
//! Free text (municipality names) is folded to a trimmed, unaccented,
//! upper-case form. Household stratum is mapped onto a fixed ordinal domain
//! of six levels; anything outside that domain is treated as missing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::utils::AnalysisError;

/// Canonicalize a free-text value: upper-case, strip diacritics, trim
///
/// Idempotent: `normalize_text(&normalize_text(x)) == normalize_text(x)`.
pub fn normalize_text(raw: &str) -> String {
    // Upper-casing first so marks introduced by case mapping are stripped too
    raw.to_uppercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Missing-propagating variant of [`normalize_text`]
pub fn normalize_opt(raw: Option<&str>) -> Option<String> {
    raw.map(normalize_text)
}

/// Household socioeconomic stratum, ordered from 1 to 6
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stratum {
    #[serde(rename = "Estrato 1")]
    E1,
    #[serde(rename = "Estrato 2")]
    E2,
    #[serde(rename = "Estrato 3")]
    E3,
    #[serde(rename = "Estrato 4")]
    E4,
    #[serde(rename = "Estrato 5")]
    E5,
    #[serde(rename = "Estrato 6")]
    E6,
}

impl Stratum {
    /// All levels in canonical order
    pub const ALL: [Stratum; 6] = [
        Stratum::E1,
        Stratum::E2,
        Stratum::E3,
        Stratum::E4,
        Stratum::E5,
        Stratum::E6,
    ];

    /// Numeric level (1..=6)
    pub fn level(self) -> u8 {
        self as u8 + 1
    }

    pub fn from_level(level: u8) -> Option<Self> {
        Self::ALL.get(usize::from(level).checked_sub(1)?).copied()
    }

    /// Map a raw table value onto the domain
    ///
    /// Lossy by policy: unrecognized labels (e.g. "Estrato 9", "Sin Estrato")
    /// return `None` rather than an error or a nearby level.
    pub fn parse_label(raw: &str) -> Option<Self> {
        let canonical = normalize_text(raw);
        let digits = canonical.strip_prefix("ESTRATO")?.trim();
        if digits.len() != 1 {
            return None;
        }
        Self::from_level(digits.parse().ok()?)
    }

    pub fn label(self) -> &'static str {
        match self {
            Stratum::E1 => "Estrato 1",
            Stratum::E2 => "Estrato 2",
            Stratum::E3 => "Estrato 3",
            Stratum::E4 => "Estrato 4",
            Stratum::E5 => "Estrato 5",
            Stratum::E6 => "Estrato 6",
        }
    }

    /// Tier group this level belongs to
    pub fn tier(self) -> Tier {
        match self {
            Stratum::E1 | Stratum::E2 => Tier::Low,
            Stratum::E3 | Stratum::E4 => Tier::Mid,
            Stratum::E5 | Stratum::E6 => Tier::High,
        }
    }
}

impl fmt::Display for Stratum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Strict parse for user selections; accepts "Estrato 3", "estrato 3" or "3"
impl FromStr for Stratum {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let by_level = trimmed.parse::<u8>().ok().and_then(Self::from_level);
        by_level
            .or_else(|| Self::parse_label(trimmed))
            .ok_or_else(|| AnalysisError::ConfigError(format!("unknown stratum: {:?}", s)))
    }
}

/// Socioeconomic tier: pairs of adjacent strata
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Low,
    Mid,
    High,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Low, Tier::Mid, Tier::High];

    /// Strata assigned to this tier
    pub fn strata(self) -> [Stratum; 2] {
        match self {
            Tier::Low => [Stratum::E1, Stratum::E2],
            Tier::Mid => [Stratum::E3, Stratum::E4],
            Tier::High => [Stratum::E5, Stratum::E6],
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Low => f.write_str("low"),
            Tier::Mid => f.write_str("mid"),
            Tier::High => f.write_str("high"),
        }
    }
}

/// Which parent's education level feeds the cross-tab view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EducationVariable {
    #[default]
    Mother,
    Father,
}

impl EducationVariable {
    pub fn as_str(self) -> &'static str {
        match self {
            EducationVariable::Mother => "mother",
            EducationVariable::Father => "father",
        }
    }
}

impl fmt::Display for EducationVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts the English names, the Spanish ones and the Saber 11 column names
impl FromStr for EducationVariable {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_text(s).as_str() {
            "MOTHER" | "MADRE" | "FAMI_EDUCACIONMADRE" => Ok(EducationVariable::Mother),
            "FATHER" | "PADRE" | "FAMI_EDUCACIONPADRE" => Ok(EducationVariable::Father),
            _ => Err(AnalysisError::ConfigError(format!(
                "unknown education variable: {:?} (expected mother or father)",
                s
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text_folds_accents_and_case() {
        assert_eq!(normalize_text("  Manizales "), "MANIZALES");
        assert_eq!(normalize_text("Villamaría"), "VILLAMARIA");
        assert_eq!(normalize_text("SAMANÁ"), "SAMANA");
        assert_eq!(normalize_text("la dorada"), "LA DORADA");
    }

    #[test]
    fn test_normalize_text_idempotent() {
        let inputs = [
            "  Villamaría ",
            "Aguadas",
            "ǰ",
            "ß",
            "\u{0301}Chinchiná",
            "",
            "   ",
            "Ånström Ω",
        ];
        for input in inputs {
            let once = normalize_text(input);
            assert_eq!(normalize_text(&once), once, "input {:?}", input);
        }
    }

    #[test]
    fn test_normalize_opt_propagates_missing() {
        assert_eq!(normalize_opt(None), None);
        assert_eq!(normalize_opt(Some("Neira")), Some("NEIRA".to_string()));
    }

    #[test]
    fn test_stratum_parse_label() {
        assert_eq!(Stratum::parse_label("Estrato 1"), Some(Stratum::E1));
        assert_eq!(Stratum::parse_label(" estrato 6 "), Some(Stratum::E6));
        assert_eq!(Stratum::parse_label("ESTRATO 4"), Some(Stratum::E4));
    }

    #[test]
    fn test_stratum_parse_label_rejects_out_of_domain() {
        assert_eq!(Stratum::parse_label("Estrato 9"), None);
        assert_eq!(Stratum::parse_label("Estrato 0"), None);
        assert_eq!(Stratum::parse_label("Estrato 12"), None);
        assert_eq!(Stratum::parse_label("Sin Estrato"), None);
        assert_eq!(Stratum::parse_label("3"), None);
        assert_eq!(Stratum::parse_label(""), None);
    }

    #[test]
    fn test_stratum_from_str_for_selections() {
        assert_eq!("3".parse::<Stratum>().unwrap(), Stratum::E3);
        assert_eq!("Estrato 5".parse::<Stratum>().unwrap(), Stratum::E5);
        assert!("Estrato 7".parse::<Stratum>().is_err());
        assert!("rich".parse::<Stratum>().is_err());
    }

    #[test]
    fn test_stratum_order_and_level() {
        let mut shuffled = vec![Stratum::E4, Stratum::E1, Stratum::E6, Stratum::E2];
        shuffled.sort();
        assert_eq!(shuffled, vec![Stratum::E1, Stratum::E2, Stratum::E4, Stratum::E6]);
        for (i, s) in Stratum::ALL.iter().enumerate() {
            assert_eq!(usize::from(s.level()), i + 1);
            assert_eq!(Stratum::from_level(s.level()), Some(*s));
        }
        assert_eq!(Stratum::from_level(0), None);
        assert_eq!(Stratum::from_level(7), None);
    }

    #[test]
    fn test_tiers_partition_strata() {
        let mut seen = Vec::new();
        for tier in Tier::ALL {
            for stratum in tier.strata() {
                assert_eq!(stratum.tier(), tier);
                seen.push(stratum);
            }
        }
        seen.sort();
        assert_eq!(seen, Stratum::ALL.to_vec());
    }

    #[test]
    fn test_education_variable_from_str() {
        assert_eq!("mother".parse::<EducationVariable>().unwrap(), EducationVariable::Mother);
        assert_eq!("Padre".parse::<EducationVariable>().unwrap(), EducationVariable::Father);
        assert_eq!(
            "fami_educacionmadre".parse::<EducationVariable>().unwrap(),
            EducationVariable::Mother
        );
        let err = "grandmother".parse::<EducationVariable>().unwrap_err();
        assert!(err.to_string().contains("unknown education variable"));
    }

    #[test]
    fn test_stratum_serializes_as_label() {
        let json = serde_json::to_string(&Stratum::E2).unwrap();
        assert_eq!(json, "\"Estrato 2\"");
    }
}
