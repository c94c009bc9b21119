pub const READINESS_BANNER: &str = "identity-service is ready";

/// Plain-text liveness probe; touches no dependency.
pub async fn readiness() -> &'static str {
    READINESS_BANNER
}
