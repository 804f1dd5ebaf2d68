use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use std::collections::HashSet;

use crate::domain::{ExternalId, InterfaceSeries, Scenario, TimeSeries};
use crate::provider::{InterfaceProvider, ProviderError};

/// Reproducible interface series, seeded by bus id and scenario
#[derive(Debug, Clone)]
pub struct SimulatedInterfaceProvider {
    start: DateTime<Utc>,
    snapshots: usize,
    unknown_buses: HashSet<ExternalId>,
}

impl Default for SimulatedInterfaceProvider {
    fn default() -> Self {
        Self {
            start: Utc.with_ymd_and_hms(2011, 1, 1, 0, 0, 0).single().unwrap_or_default(),
            snapshots: 24,
            unknown_buses: HashSet::new(),
        }
    }
}

impl SimulatedInterfaceProvider {
    pub fn new(snapshots: usize) -> Self {
        Self {
            snapshots,
            ..Self::default()
        }
    }

    /// Buses the provider reports no data for
    pub fn with_unknown_buses(mut self, buses: impl IntoIterator<Item = ExternalId>) -> Self {
        self.unknown_buses.extend(buses);
        self
    }

    fn seed(bus_id: ExternalId, scenario: Scenario) -> u64 {
        let scenario_salt = match scenario {
            Scenario::StatusQuo => 0x11,
            Scenario::Nep2035 => 0x35,
            Scenario::EGo100 => 0x64,
        };
        bus_id.0.wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ scenario_salt
    }

    fn generate(&self, bus_id: ExternalId, scenario: Scenario) -> Result<InterfaceSeries, ProviderError> {
        let malformed = |e: rand_distr::NormalError| ProviderError::Malformed {
            bus_id,
            reason: e.to_string(),
        };
        let mut rng = StdRng::seed_from_u64(Self::seed(bus_id, scenario));
        let cloud = Normal::new(0.0, 0.1).map_err(malformed)?;
        let wind_noise = Normal::new(0.0, 0.15).map_err(malformed)?;

        let index: Vec<_> = (0..self.snapshots)
            .map(|h| self.start + Duration::hours(h as i64))
            .collect();

        let wind_base: f64 = rng.gen_range(0.2..0.6);
        let mut solar = Vec::with_capacity(self.snapshots);
        let mut wind = Vec::with_capacity(self.snapshots);
        let mut gas = Vec::with_capacity(self.snapshots);
        for h in 0..self.snapshots {
            let hour = (h % 24) as f64;
            let daylight = (std::f64::consts::PI * (hour - 6.0) / 12.0).sin().max(0.0);
            solar.push((daylight * (1.0 + cloud.sample(&mut rng))).clamp(0.0, 1.0));
            wind.push((wind_base + wind_noise.sample(&mut rng)).clamp(0.0, 1.0));
            gas.push(rng.gen_range(0.0..1.0));
        }

        let potential = TimeSeries::new(index.clone())
            .with_column("solar", solar)
            .with_column("wind", wind);
        let conv_dispatch = TimeSeries::new(index.clone()).with_column("gas", gas);
        let series = InterfaceSeries {
            potential,
            conv_dispatch,
            curtailment_abs: TimeSeries::new(index),
        };
        series.validate().map_err(|reason| ProviderError::Malformed { bus_id, reason })?;
        Ok(series)
    }
}

#[async_trait]
impl InterfaceProvider for SimulatedInterfaceProvider {
    async fn get_interface_series(
        &self,
        bus_id: ExternalId,
        scenario: Scenario,
    ) -> Result<InterfaceSeries, ProviderError> {
        if self.unknown_buses.contains(&bus_id) {
            return Err(ProviderError::NotFound { bus_id, scenario });
        }
        self.generate(bus_id, scenario)
    }
}
