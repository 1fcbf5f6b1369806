/// Liveness probe handler.
///
/// Returns "OK" while the process is serving requests. Checks no
/// collaborators.
pub async fn health_check() -> &'static str {
    "OK"
}
