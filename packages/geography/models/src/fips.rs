//! US state FIPS code utilities.
//!
//! Maps between two-digit FIPS codes, two-letter postal codes, and full
//! state names for the 50 US states, DC, and Puerto Rico.

/// One row of the state table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct State {
    /// Two-digit FIPS code.
    pub fips: &'static str,
    /// Two-letter postal code.
    pub abbr: &'static str,
    /// Full name.
    pub name: &'static str,
}

const fn state(fips: &'static str, abbr: &'static str, name: &'static str) -> State {
    State { fips, abbr, name }
}

/// The 50 states, DC, and Puerto Rico, in FIPS order.
pub const STATES: &[State] = &[
    state("01", "AL", "Alabama"),
    state("02", "AK", "Alaska"),
    state("04", "AZ", "Arizona"),
    state("05", "AR", "Arkansas"),
    state("06", "CA", "California"),
    state("08", "CO", "Colorado"),
    state("09", "CT", "Connecticut"),
    state("10", "DE", "Delaware"),
    state("11", "DC", "District of Columbia"),
    state("12", "FL", "Florida"),
    state("13", "GA", "Georgia"),
    state("15", "HI", "Hawaii"),
    state("16", "ID", "Idaho"),
    state("17", "IL", "Illinois"),
    state("18", "IN", "Indiana"),
    state("19", "IA", "Iowa"),
    state("20", "KS", "Kansas"),
    state("21", "KY", "Kentucky"),
    state("22", "LA", "Louisiana"),
    state("23", "ME", "Maine"),
    state("24", "MD", "Maryland"),
    state("25", "MA", "Massachusetts"),
    state("26", "MI", "Michigan"),
    state("27", "MN", "Minnesota"),
    state("28", "MS", "Mississippi"),
    state("29", "MO", "Missouri"),
    state("30", "MT", "Montana"),
    state("31", "NE", "Nebraska"),
    state("32", "NV", "Nevada"),
    state("33", "NH", "New Hampshire"),
    state("34", "NJ", "New Jersey"),
    state("35", "NM", "New Mexico"),
    state("36", "NY", "New York"),
    state("37", "NC", "North Carolina"),
    state("38", "ND", "North Dakota"),
    state("39", "OH", "Ohio"),
    state("40", "OK", "Oklahoma"),
    state("41", "OR", "Oregon"),
    state("42", "PA", "Pennsylvania"),
    state("44", "RI", "Rhode Island"),
    state("45", "SC", "South Carolina"),
    state("46", "SD", "South Dakota"),
    state("47", "TN", "Tennessee"),
    state("48", "TX", "Texas"),
    state("49", "UT", "Utah"),
    state("50", "VT", "Vermont"),
    state("51", "VA", "Virginia"),
    state("53", "WA", "Washington"),
    state("54", "WV", "West Virginia"),
    state("55", "WI", "Wisconsin"),
    state("56", "WY", "Wyoming"),
    state("72", "PR", "Puerto Rico"),
];

/// Looks up a state by two-digit FIPS code. A single digit is accepted
/// for codes below 10 (`"6"` is California).
#[must_use]
pub fn by_fips(fips: &str) -> Option<&'static State> {
    let fips = fips.trim();
    let padded;
    let fips = if fips.len() == 1 {
        padded = format!("0{fips}");
        padded.as_str()
    } else {
        fips
    };
    STATES.iter().find(|s| s.fips == fips)
}

/// Looks up a state by postal code, ignoring case.
#[must_use]
pub fn by_abbr(abbr: &str) -> Option<&'static State> {
    let abbr = abbr.trim();
    STATES.iter().find(|s| s.abbr.eq_ignore_ascii_case(abbr))
}

/// Looks up a state by either a postal code or a FIPS code.
#[must_use]
pub fn lookup(code: &str) -> Option<&'static State> {
    let code = code.trim();
    if code.chars().all(|c| c.is_ascii_digit()) {
        by_fips(code)
    } else {
        by_abbr(code)
    }
}

/// Maps a two-digit FIPS code to the corresponding postal code.
#[must_use]
pub fn state_abbr(fips: &str) -> Option<&'static str> {
    by_fips(fips).map(|s| s.abbr)
}

/// Maps a two-digit FIPS code to the full state name.
#[must_use]
pub fn state_name(fips: &str) -> Option<&'static str> {
    by_fips(fips).map(|s| s.name)
}

/// Maps a postal code to the corresponding FIPS code.
#[must_use]
pub fn abbr_to_fips(abbr: &str) -> Option<&'static str> {
    by_abbr(abbr).map(|s| s.fips)
}
