pub mod http;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{ExternalId, InterfaceSeries, Scenario};

pub use http::HttpInterfaceProvider;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("no interface data for bus {bus_id} in scenario '{scenario}'")]
    NotFound { bus_id: ExternalId, scenario: Scenario },

    #[error("interface data for bus {bus_id} is malformed: {reason}")]
    Malformed { bus_id: ExternalId, reason: String },

    #[error("interface provider unavailable: {0}")]
    Unavailable(String),
}

/// Source of the boundary time series (feed-in potential, conventional
/// dispatch, curtailment) computed for the transmission grid.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InterfaceProvider: Send + Sync {
    async fn get_interface_series(
        &self,
        bus_id: ExternalId,
        scenario: Scenario,
    ) -> Result<InterfaceSeries, ProviderError>;
}
