use crate::models::HealthRes;

/// Simple health service shared by every API surface.
///
/// The gateway is stateless, so being able to answer at all means it is healthy. The
/// upstream repository is deliberately not probed.
#[derive(Clone)]
pub struct HealthService;

impl HealthService {
    pub fn new() -> Self {
        Self
    }

    /// Static method to check health without creating an instance.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "Gateway is alive".into(),
        }
    }
}

impl Default for HealthService {
    fn default() -> Self {
        Self::new()
    }
}
