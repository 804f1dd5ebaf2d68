use serde::{Deserialize, Serialize};

/// Scenario the interface time series are requested for.
///
/// Each scenario optionally maps onto the generator scenario used when
/// importing future generation into a grid.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
pub enum Scenario {
    #[serde(rename = "Status Quo")]
    #[strum(serialize = "Status Quo")]
    StatusQuo,
    #[serde(rename = "NEP 2035")]
    #[strum(serialize = "NEP 2035")]
    Nep2035,
    #[serde(rename = "eGo100")]
    #[strum(serialize = "eGo100")]
    EGo100,
}

impl Scenario {
    /// Generator scenario name, `None` for the status quo
    pub fn generator_scenario(&self) -> Option<&'static str> {
        match self {
            Scenario::StatusQuo => None,
            Scenario::Nep2035 => Some("nep2035"),
            Scenario::EGo100 => Some("ego100"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Status Quo", Scenario::StatusQuo, None)]
    #[case("NEP 2035", Scenario::Nep2035, Some("nep2035"))]
    #[case("eGo100", Scenario::EGo100, Some("ego100"))]
    fn test_scenario_names(
        #[case] name: &str,
        #[case] expected: Scenario,
        #[case] generator: Option<&str>,
    ) {
        let scenario: Scenario = name.parse().unwrap();
        assert_eq!(scenario, expected);
        assert_eq!(scenario.generator_scenario(), generator);
        assert_eq!(scenario.to_string(), name);
    }

    #[test]
    fn test_unknown_scenario() {
        assert!("NEP 2050".parse::<Scenario>().is_err());
    }
}
