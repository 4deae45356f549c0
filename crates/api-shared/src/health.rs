use crate::wire::HealthRes;

/// Simple health service for the QuickCode APIs.
///
/// Provides a standardised way to check that the service is up. It holds no state.
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    /// Check health without creating an instance.
    ///
    /// # Returns
    /// A `HealthRes` indicating the service is healthy.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "QuickCode is alive".into(),
        }
    }
}
