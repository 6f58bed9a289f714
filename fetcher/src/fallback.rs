/// Supplies the payload returned once every endpoint of a route has failed.
///
/// The payload lives in-process: producing it does no I/O and cannot fail,
/// so a route always has something renderable to return.
pub trait FallbackProvider<T>: Send + Sync {
    fn fallback(&self) -> T;
}

/// A fixed payload, cloned for each use.
#[derive(Clone, Debug)]
pub struct StaticFallback<T>(T);

impl<T> StaticFallback<T> {
    pub fn new(payload: T) -> Self {
        Self(payload)
    }
}

impl<T> FallbackProvider<T> for StaticFallback<T>
where
    T: Clone + Send + Sync,
{
    fn fallback(&self) -> T {
        self.0.clone()
    }
}

/// Computed payloads, e.g. ones stamped with the current time.
impl<F, T> FallbackProvider<T> for F
where
    F: Fn() -> T + Send + Sync,
{
    fn fallback(&self) -> T {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_fallback() {
        let provider = StaticFallback::new(vec!["Jazz".to_string(), "Rock".to_string()]);
        assert_eq!(provider.fallback(), provider.fallback());
        assert_eq!(provider.fallback().len(), 2);
    }

    #[test]
    fn test_computed_fallback() {
        let provider = || format!("fallback-{}", 1);
        assert_eq!(provider.fallback(), "fallback-1");
    }
}
