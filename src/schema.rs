/// Column-name constants and fixed label tables for the BRIDGE report.
/// Single source of truth - exported to Python via PyO3.

// ── Decisions log columns (spreadsheet headers) ─────────────────────────────
pub mod decisions {
    pub const WHEN: &str = "Quando";
    pub const DECISION: &str = "Decisão";
    pub const CONTACT_OUTCOME: &str = "Conseguiu fazer contato?";
    pub const AGE: &str = "Idade";
    pub const NEIGHBORHOOD: &str = "Bairro";
    pub const KEY: &str = "Chave";

    pub const REQUIRED: [&str; 5] = [WHEN, DECISION, CONTACT_OUTCOME, AGE, NEIGHBORHOOD];

    pub const DEFAULT_SHEET: &str = "2025 Consolidado";
}

// ── Participants list columns ───────────────────────────────────────────────
pub mod participants {
    pub const KEY: &str = "Telefone";
}

// ── Canonical values produced by normalization ──────────────────────────────
pub mod sentinel {
    /// Neighborhood placeholder for blank / "--" entries.
    pub const NOT_INFORMED: &str = "Não informado";
    pub const NEIGHBORHOOD_PLACEHOLDER: &str = "--";
}

pub mod outcome {
    pub const YES: &str = "Sim";
    pub const NO: &str = "Não";
    pub const UNKNOWN: &str = "Não informado";
}

// ── Funnel chart legend ─────────────────────────────────────────────────────
pub mod funnel_stages {
    pub const ALL_SUCCESSES: &str = "Total Contatos Sucesso";
    pub const PARTICIPANT_SUCCESSES: &str = "Participantes do Start Contato Sucesso";
}

// ── Internal helper columns ─────────────────────────────────────────────────
pub mod internal {
    /// Marker attached to the participants frame before the funnel join.
    pub const MATCHED: &str = "_matched";

    /// Aggregation result columns.
    pub const COUNT: &str = "_count";
    pub const YES_COUNT: &str = "_yes";
    pub const NO_COUNT: &str = "_no";
}

// ── Age buckets ─────────────────────────────────────────────────────────────
pub mod age_buckets {
    /// Right-closed ranges `(lower, upper]`; the first range also admits 0.
    pub const BUCKETS: [(f64, f64, &str); 8] = [
        (0.0, 8.0, "Kids"),
        (8.0, 12.0, "Connect"),
        (12.0, 17.0, "Nexteen"),
        (17.0, 26.0, "Jovens"),
        (26.0, 39.0, "Adultos 27-39"),
        (39.0, 49.0, "Adultos 40-49"),
        (49.0, 59.0, "Adultos 50-59"),
        (59.0, 100.0, "Melhor Idade"),
    ];

    pub const MIN_AGE: f64 = 0.0;
    pub const MAX_AGE: f64 = 100.0;
}

// ── Date formats accepted for `Quando`, tried in order (day-first) ──────────
pub mod date_formats {
    pub const DATETIME: [&str; 8] = [
        "%d/%m/%Y %H:%M:%S",
        "%d/%m/%Y %H:%M",
        "%d/%m/%y %H:%M:%S",
        "%d/%m/%y %H:%M",
        "%d-%m-%Y %H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
    ];

    pub const DATE: [&str; 5] = ["%d/%m/%Y", "%d/%m/%y", "%d-%m-%Y", "%d.%m.%Y", "%Y-%m-%d"];

    /// `%Y` accepts 1 to 4 digits; parses landing before this year are
    /// treated as misreads of a two-digit year and rejected.
    pub const MIN_YEAR: i32 = 1900;

    pub const MONTH_KEY: &str = "%Y-%m";
    pub const DAY_KEY: &str = "%Y-%m-%d";
}
