//! Text normalization for the free-text columns of the decisions log.
//!
//! Both normalizers are total (never fail, null in → canonical value out)
//! and idempotent: feeding a normalized value back in returns it unchanged.

use polars::prelude::*;
use serde::Serialize;
use tracing::debug;
use unicode_normalization::UnicodeNormalization;

use crate::error::Result;
use crate::schema::{decisions, outcome, sentinel};

/// Tri-state result of the "Conseguiu fazer contato?" column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ContactOutcome {
    Yes,
    No,
    Unknown,
}

impl ContactOutcome {
    pub const ALL: [ContactOutcome; 3] = [Self::Yes, Self::No, Self::Unknown];

    /// Map a raw cell to the tri-state, case and accent-composition insensitive.
    pub fn normalize(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::Unknown;
        };
        let folded: String = raw.trim().nfc().collect::<String>().to_lowercase();
        match folded.as_str() {
            "sim" => Self::Yes,
            "não" | "nao" => Self::No,
            _ => Self::Unknown,
        }
    }

    /// Canonical label written back into the frame.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Yes => outcome::YES,
            Self::No => outcome::NO,
            Self::Unknown => outcome::UNKNOWN,
        }
    }
}

/// Canonicalize a neighborhood cell.
///
/// Whitespace runs (including NBSP, figure space and narrow NBSP) collapse to
/// a single ASCII space, the result is NFC-composed, and blanks or the `--`
/// placeholder become [`sentinel::NOT_INFORMED`].
pub fn normalize_neighborhood(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return sentinel::NOT_INFORMED.to_string();
    };
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let composed: String = collapsed.nfc().collect();
    if composed.is_empty() || composed == sentinel::NEIGHBORHOOD_PLACEHOLDER {
        sentinel::NOT_INFORMED.to_string()
    } else {
        composed
    }
}

/// Rewrite the neighborhood and contact-outcome columns in canonical form.
pub fn normalize_decisions(mut df: DataFrame) -> Result<DataFrame> {
    let neighborhoods: Vec<String> = df
        .column(decisions::NEIGHBORHOOD)?
        .str()?
        .into_iter()
        .map(normalize_neighborhood)
        .collect();

    let outcomes: Vec<&str> = df
        .column(decisions::CONTACT_OUTCOME)?
        .str()?
        .into_iter()
        .map(|v| ContactOutcome::normalize(v).as_str())
        .collect();

    df.with_column(Column::new(decisions::NEIGHBORHOOD.into(), neighborhoods))?;
    df.with_column(Column::new(decisions::CONTACT_OUTCOME.into(), outcomes))?;

    debug!(rows = df.height(), "normalized decisions frame");
    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neighborhood_placeholders_become_sentinel() {
        let raw = [
            Some("Copacabana"),
            Some("Copacabana\u{00A0}"),
            Some(""),
            Some("--"),
            None,
            Some(" \u{2007}\u{202F} "),
        ];
        let out: Vec<String> = raw.iter().map(|v| normalize_neighborhood(*v)).collect();
        assert_eq!(
            out,
            vec![
                "Copacabana",
                "Copacabana",
                "Não informado",
                "Não informado",
                "Não informado",
                "Não informado",
            ]
        );
    }

    #[test]
    fn neighborhood_collapses_inner_whitespace_and_composes() {
        // "Jardim Botânico" with a decomposed circumflex and a NBSP between words
        let raw = "  Jardim\u{00A0}\u{00A0}Bota\u{0302}nico ";
        assert_eq!(normalize_neighborhood(Some(raw)), "Jardim Botânico");
    }

    #[test]
    fn neighborhood_is_idempotent() {
        for raw in ["Tijuca", "  Vila\tIsabel ", "--", "", "Não informado", "Bota\u{0302}fogo"] {
            let once = normalize_neighborhood(Some(raw));
            assert_eq!(normalize_neighborhood(Some(&once)), once, "input {raw:?}");
        }
    }

    #[test]
    fn outcome_mapping_is_case_and_accent_insensitive() {
        assert_eq!(ContactOutcome::normalize(Some("Sim")), ContactOutcome::Yes);
        assert_eq!(ContactOutcome::normalize(Some(" SIM ")), ContactOutcome::Yes);
        assert_eq!(ContactOutcome::normalize(Some("Não")), ContactOutcome::No);
        assert_eq!(ContactOutcome::normalize(Some("nao")), ContactOutcome::No);
        assert_eq!(ContactOutcome::normalize(Some("Na\u{0303}o")), ContactOutcome::No);
        assert_eq!(ContactOutcome::normalize(Some("talvez")), ContactOutcome::Unknown);
        assert_eq!(ContactOutcome::normalize(None), ContactOutcome::Unknown);
    }

    #[test]
    fn outcome_is_idempotent_through_labels() {
        for outcome in ContactOutcome::ALL {
            assert_eq!(ContactOutcome::normalize(Some(outcome.as_str())), outcome);
        }
    }

    #[test]
    fn frame_normalization_rewrites_both_columns() {
        let df = df! {
            decisions::NEIGHBORHOOD => [Some("Centro "), Some("--"), None],
            decisions::CONTACT_OUTCOME => [Some("sim"), Some("NÃO"), None],
        }
        .unwrap();

        let df = normalize_decisions(df).unwrap();
        let bairros: Vec<Option<&str>> =
            df.column(decisions::NEIGHBORHOOD).unwrap().str().unwrap().into_iter().collect();
        let outcomes: Vec<Option<&str>> =
            df.column(decisions::CONTACT_OUTCOME).unwrap().str().unwrap().into_iter().collect();

        assert_eq!(bairros, vec![Some("Centro"), Some("Não informado"), Some("Não informado")]);
        assert_eq!(outcomes, vec![Some("Sim"), Some("Não"), Some("Não informado")]);
    }
}
