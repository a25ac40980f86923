//! Fixed fuel and technology classification codes.
//!
//! The two-level fuel/technology catalog is reference data: a technology
//! code is only legal for the fuel category that lists it.

pub const FUEL_TYPES: &[(&str, &str)] = &[
    ("ES100", "Solar"),
    ("ES200", "Wind"),
    ("ES300", "Hydro"),
    ("ES400", "Biomass"),
    ("ES500", "Geothermal"),
    ("ES510", "Municipal Waste"),
];

const BIOMASS_TECHNOLOGIES: &[(&str, &str)] = &[
    (
        "TC410",
        "Combined cycle gas turbine with heat recovery: Non CHP",
    ),
    ("TC411", "Combined cycle gas turbine with heat recovery: CHP"),
    (
        "TC421",
        "Steam turbine with back-pressure turbine (open cycle): Non CHP",
    ),
    (
        "TC422",
        "Steam turbine with back-pressure turbine (open cycle): CHP",
    ),
    (
        "TC423",
        "Steam turbine with condensation turbine (closed cycle): Non CHP",
    ),
    (
        "TC424",
        "Steam turbine with condensation turbine (closed cycle): CHP",
    ),
    ("TC431", "Gas turbine with heat recovery: Non CHP"),
    ("TC432", "Gas turbine with heat recovery: CHP"),
    ("TC441", "Internal combustion engine: Non CHP"),
    ("TC442", "Internal combustion engine: CHP"),
    ("TC482", "Steam engine: CHP"),
];

/// Technology codes permitted for a fuel type. Unknown fuel types map to an
/// empty slice.
pub fn technology_options(fuel_type: &str) -> &'static [(&'static str, &'static str)] {
    match fuel_type {
        "ES100" => &[
            ("TC110", "PV Ground mounted"),
            ("TC120", "PV Roof Mounted (single installation)"),
            ("TC130", "PV Floating"),
            ("TC140", "PV Aggregated"),
            ("TC150", "Solar Thermal Concentration"),
        ],
        "ES200" => &[("TC210", "Onshore"), ("TC220", "Offshore")],
        "ES300" => &[
            ("TC310", "Dam"),
            ("TC320", "Run of river"),
            ("TC330", "Pumped Hydro Storage (Natural in-flow only)"),
        ],
        "ES400" => BIOMASS_TECHNOLOGIES,
        "ES500" => &[
            ("TC510", "Dry Steam Plant"),
            ("TC520", "Flash Steam Plant"),
            ("TC530", "Binary Cycle Plant"),
        ],
        // Municipal waste shares the biomass conversion technologies except
        // the steam engine.
        "ES510" => &BIOMASS_TECHNOLOGIES[..BIOMASS_TECHNOLOGIES.len() - 1],
        _ => &[],
    }
}

pub fn is_valid_fuel_type(fuel_type: &str) -> bool {
    FUEL_TYPES.iter().any(|(code, _)| *code == fuel_type)
}

/// Whether `technology_type` belongs to the fixed set of codes valid for
/// `fuel_type`.
pub fn is_valid_combination(fuel_type: &str, technology_type: &str) -> bool {
    technology_options(fuel_type)
        .iter()
        .any(|(code, _)| *code == technology_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solar_accepts_only_solar_technologies() {
        assert!(is_valid_combination("ES100", "TC110"));
        assert!(is_valid_combination("ES100", "TC150"));
        // TC210 is a wind code
        assert!(!is_valid_combination("ES100", "TC210"));
    }

    #[test]
    fn unknown_fuel_has_no_technologies() {
        assert!(technology_options("ES999").is_empty());
        assert!(!is_valid_combination("ES999", "TC110"));
    }

    #[test]
    fn municipal_waste_shares_biomass_codes_without_steam_engine() {
        assert!(is_valid_combination("ES510", "TC410"));
        assert!(is_valid_combination("ES510", "TC442"));
        assert!(is_valid_combination("ES400", "TC482"));
        assert!(!is_valid_combination("ES510", "TC482"));
    }

    #[test]
    fn every_fuel_type_lists_technologies() {
        for (code, _) in FUEL_TYPES {
            assert!(!technology_options(code).is_empty());
        }
    }
}
